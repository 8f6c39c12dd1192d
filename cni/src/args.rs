// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The `CNI_*` environment of an invocation.

use crate::error::{ConfigError, PluginError};
use ipnet::IpNet;
use net::interface::InterfaceName;
use std::ffi::OsString;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::str::FromStr;

pub use clap::Parser;

/// The key of the container address in `CNI_ARGS`.
pub const IP_KEY: &str = "IP";

/// The CNI environment.
///
/// The runtime passes everything through environment variables; the matching flags exist for
/// manual testing.
#[derive(Debug, Default, Parser)]
#[command(name = "vxlan")]
#[command(version)]
#[command(about = "CNI plugin attaching containers to a vxlan overlay network", long_about = None)]
pub struct CmdArgs {
    #[arg(long, env = "CNI_COMMAND", help = "ADD, DEL, CHECK or VERSION")]
    command: Option<String>,
    #[arg(long, env = "CNI_CONTAINERID", help = "Container id")]
    container_id: Option<String>,
    #[arg(long, env = "CNI_NETNS", help = "Path of the container network namespace")]
    netns: Option<PathBuf>,
    #[arg(long, env = "CNI_IFNAME", help = "Interface name to create in the container")]
    ifname: Option<String>,
    #[arg(long, env = "CNI_ARGS", help = "Extra arguments (key=value;...)")]
    args: Option<String>,
    #[arg(long, env = "CNI_PATH", help = "Plugin search path")]
    path: Option<String>,
}

/// The operation requested by `CNI_COMMAND`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Command {
    /// Attach a container.
    Add,
    /// Detach a container.
    Del,
    /// Verify an attachment.
    Check,
    /// Report the supported CNI versions.
    Version,
}

impl FromStr for Command {
    type Err = PluginError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ADD" => Ok(Command::Add),
            "DEL" => Ok(Command::Del),
            "CHECK" => Ok(Command::Check),
            "VERSION" => Ok(Command::Version),
            other => Err(PluginError::UnknownCommand(other.to_string())),
        }
    }
}

impl Display for Command {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::Add => write!(f, "ADD"),
            Command::Del => write!(f, "DEL"),
            Command::Check => write!(f, "CHECK"),
            Command::Version => write!(f, "VERSION"),
        }
    }
}

/// A validated ADD, DEL, or CHECK request.
#[derive(Clone, Debug)]
pub struct Request {
    /// The operation.
    pub command: Command,
    /// The container id.
    pub container_id: String,
    /// The container network namespace.
    /// Only DEL may go without one.
    pub netns: Option<PathBuf>,
    /// The interface name to use inside the container.
    pub if_name: InterfaceName,
    /// The parsed `CNI_ARGS`.
    pub args: PluginArgs,
}

impl CmdArgs {
    /// Build the arguments from explicit values (as the runtime would set them in the environment).
    #[must_use]
    pub fn new(
        command: &str,
        container_id: &str,
        netns: Option<PathBuf>,
        ifname: &str,
        args: &str,
    ) -> Self {
        let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());
        CmdArgs {
            command: non_empty(command),
            container_id: non_empty(container_id),
            netns,
            ifname: non_empty(ifname),
            args: non_empty(args),
            path: None,
        }
    }

    /// Parse the command line `args`, completed by the `CNI_*` environment.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Environment`] if they can not be parsed (or if help was requested).
    pub fn try_from_args<I, T>(args: I) -> Result<Self, PluginError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        CmdArgs::try_parse_from(args).map_err(PluginError::Environment)
    }

    /// The requested command.
    ///
    /// # Errors
    ///
    /// Returns an error if `CNI_COMMAND` is unset or unknown.
    pub fn command(&self) -> Result<Command, PluginError> {
        self.command
            .as_deref()
            .ok_or(PluginError::MissingEnv("CNI_COMMAND"))?
            .parse()
    }

    /// Validate the environment of an ADD, DEL, or CHECK.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::MissingEnv`] if a variable `command` needs is unset, or a
    /// [`ConfigError`] if the interface name or `CNI_ARGS` are malformed.
    pub fn request(&self, command: Command) -> Result<Request, PluginError> {
        let container_id = self
            .container_id
            .clone()
            .ok_or(PluginError::MissingEnv("CNI_CONTAINERID"))?;
        let netns = self.netns.clone().filter(|path| !path.as_os_str().is_empty());
        if netns.is_none() && command != Command::Del {
            return Err(PluginError::MissingEnv("CNI_NETNS"));
        }
        let if_name = self
            .ifname
            .as_deref()
            .ok_or(PluginError::MissingEnv("CNI_IFNAME"))?;
        let if_name = InterfaceName::try_from(if_name).map_err(ConfigError::from)?;
        let args = PluginArgs::parse(self.args.as_deref().unwrap_or_default())?;
        Ok(Request {
            command,
            container_id,
            netns,
            if_name,
            args,
        })
    }
}

/// The `key=value` pairs of `CNI_ARGS`, in order.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PluginArgs {
    pairs: Vec<(String, String)>,
}

impl PluginArgs {
    /// Parse a `;` separated list of `key=value` pairs.
    ///
    /// The empty string is the empty list.
    /// Every segment must contain `=` and a non-empty key; an empty segment (e.g. a trailing `;`)
    /// is malformed.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MalformedArg`] naming the first malformed segment.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        if raw.is_empty() {
            return Ok(PluginArgs::default());
        }
        let pairs = raw
            .split(';')
            .map(|segment| match segment.split_once('=') {
                Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
                _ => Err(ConfigError::MalformedArg(segment.to_string())),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(PluginArgs { pairs })
    }

    /// The value of `key` (the last one if repeated).
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .rev()
            .find_map(|(k, v)| (k == key).then_some(v.as_str()))
    }

    /// The container address (`IP`), in CIDR notation.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingArg`] if `IP` is absent and [`ConfigError::InvalidAddress`]
    /// if it is not in CIDR notation.
    pub fn ip(&self) -> Result<IpNet, ConfigError> {
        let raw = self.get(IP_KEY).ok_or(ConfigError::MissingArg(IP_KEY))?;
        raw.parse().map_err(|err: ipnet::AddrParseError| ConfigError::InvalidAddress {
            key: IP_KEY,
            value: raw.to_string(),
            reason: err.to_string(),
        })
    }
}
