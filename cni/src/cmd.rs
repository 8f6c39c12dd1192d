// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Dispatch of a CNI invocation.

use crate::args::{CmdArgs, Command};
use crate::config::NetworkDescriptor;
use crate::error::{ConfigError, PluginError};
use crate::plugin::{Plugin, PluginOptions};
use crate::result::{CniResult, ErrorResult, VersionResult, peek_cni_version};
use serde::Serialize;
use tracectl::get_trace_ctl;
use tracing::debug;

/// What the plugin answers on stdout.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Response {
    /// The result of ADD.
    Attached(CniResult),
    /// The answer to VERSION.
    Version(VersionResult),
    /// DEL and CHECK print nothing on success.
    Empty,
}

impl Response {
    /// The JSON text to print, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the response can not be serialized.
    pub fn to_json(&self) -> Result<Option<String>, serde_json::Error> {
        match self {
            Response::Empty => Ok(None),
            response => serde_json::to_string(response).map(Some),
        }
    }
}

/// Run the command described by `args` with the network configuration `stdin`.
///
/// VERSION is answered without looking at the rest of the input.
/// Otherwise the descriptor and the environment are validated before anything is changed, and the
/// operation runs to completion on a single threaded runtime.
///
/// # Errors
///
/// Returns the first failure; its [`PluginError::code`] is the CNI error code to report.
pub fn run(args: &CmdArgs, stdin: &[u8]) -> Result<Response, PluginError> {
    let command = args.command()?;
    if command == Command::Version {
        return Ok(Response::Version(VersionResult::new(&peek_cni_version(
            stdin,
        ))));
    }

    let descriptor = NetworkDescriptor::parse(stdin)?;
    descriptor.check_version()?;
    configure_tracing(&descriptor)?;
    let request = args.request(command)?;
    debug!(
        "{command} for container {} (network {}, interface {})",
        request.container_id, descriptor.name, request.if_name
    );

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_io()
        .build()
        .map_err(PluginError::Runtime)?;
    runtime.block_on(async {
        let plugin = Plugin::connect(PluginOptions::from(&descriptor))?;
        match (command, request.netns.as_deref()) {
            (Command::Add, Some(netns)) => plugin
                .add(&descriptor, netns, &request.if_name, &request.args)
                .await
                .map(|attachment| {
                    Response::Attached(CniResult::new(&descriptor.cni_version, &attachment))
                }),
            (Command::Check, Some(netns)) => plugin
                .check(&descriptor, netns, &request.if_name, &request.args)
                .await
                .map(|()| Response::Empty),
            (Command::Del, netns) => plugin
                .del(&descriptor, netns, &request.if_name)
                .await
                .map(|()| Response::Empty),
            (_, _) => Err(PluginError::MissingEnv("CNI_NETNS")),
        }
    })
}

/// The error object for `err`, in the version of the request.
#[must_use]
pub fn error_response(stdin: &[u8], err: &PluginError) -> ErrorResult {
    ErrorResult::new(&peek_cni_version(stdin), err)
}

fn configure_tracing(descriptor: &NetworkDescriptor) -> Result<(), ConfigError> {
    let tctl = get_trace_ctl();
    if let Some(config) = &descriptor.log_level {
        tctl.setup_from_string(config)?;
    } else if descriptor.debug {
        tctl.setup_from_string("default=debug,all=debug")?;
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::{Response, error_response, run};
    use crate::args::CmdArgs;
    use crate::error::{
        CODE_DECODE, CODE_INCOMPATIBLE_VERSION, CODE_INVALID_CONFIG, CODE_INVALID_ENVIRONMENT,
    };
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::path::PathBuf;

    const OV1: &str = r#"{
        "cniVersion": "0.4.0",
        "name": "ov1",
        "type": "vxlan",
        "dev": "eth0",
        "vni": 42,
        "group": "239.1.1.1",
        "dstPort": 4789,
        "cidr": "10.1.0.0/24"
    }"#;

    fn add(args: &str) -> CmdArgs {
        CmdArgs::new("ADD", "c1", Some(PathBuf::from("/run/netns/c1")), "eth0", args)
    }

    #[test]
    fn version_needs_no_descriptor() {
        let args = CmdArgs::new("VERSION", "", None, "", "");
        let response = run(&args, br#"{"cniVersion":"0.3.1"}"#).unwrap();
        let json = response.to_json().unwrap().unwrap();
        assert_eq!(
            serde_json::from_str::<serde_json::Value>(&json).unwrap(),
            json!({
                "cniVersion": "0.3.1",
                "supportedVersions": ["0.3.0", "0.3.1", "0.4.0", "1.0.0"]
            })
        );
        let response = run(&args, b"").unwrap();
        assert!(matches!(response, Response::Version(v) if v.cni_version == "1.0.0"));
    }

    #[test]
    fn empty_responses_print_nothing() {
        assert_eq!(Response::Empty.to_json().unwrap(), None);
    }

    #[test]
    fn unknown_commands_are_environment_errors() {
        let args = CmdArgs::new("STATUS", "c1", None, "eth0", "");
        let err = run(&args, OV1.as_bytes()).unwrap_err();
        assert_eq!(err.code(), CODE_INVALID_ENVIRONMENT);
    }

    #[test]
    fn missing_environment_is_reported() {
        let args = CmdArgs::new("ADD", "c1", None, "eth0", "IP=10.1.0.5/24");
        let err = run(&args, OV1.as_bytes()).unwrap_err();
        assert_eq!(err.code(), CODE_INVALID_ENVIRONMENT);
        assert_eq!(
            err.to_string(),
            "required environment variable CNI_NETNS is not set"
        );
    }

    #[test]
    fn undecodable_descriptors_are_decode_errors() {
        let err = run(&add("IP=10.1.0.5/24"), b"{\"name\": ").unwrap_err();
        assert_eq!(err.code(), CODE_DECODE);
        let error = error_response(b"{\"name\": ", &err);
        assert_eq!(error.cni_version, "1.0.0");
        assert_eq!(error.code, CODE_DECODE);
    }

    #[test]
    fn unsupported_versions_are_rejected() {
        let stdin = OV1.replace("0.4.0", "0.1.0");
        let err = run(&add("IP=10.1.0.5/24"), stdin.as_bytes()).unwrap_err();
        assert_eq!(err.code(), CODE_INCOMPATIBLE_VERSION);
        assert_eq!(error_response(stdin.as_bytes(), &err).cni_version, "0.1.0");
    }

    #[test]
    fn malformed_arguments_are_config_errors() {
        let err = run(&add("A=1;B"), OV1.as_bytes()).unwrap_err();
        assert_eq!(err.code(), CODE_INVALID_CONFIG);
    }

    #[test]
    fn bad_log_levels_are_config_errors() {
        let stdin = OV1.replace("\"cidr\"", "\"logLevel\": \"cni=loud\", \"cidr\"");
        let err = run(&add("IP=10.1.0.5/24"), stdin.as_bytes()).unwrap_err();
        assert_eq!(err.code(), CODE_INVALID_CONFIG);
    }
}
