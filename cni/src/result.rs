// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The JSON objects written on stdout.

use crate::config::DEFAULT_CNI_VERSION;
use crate::error::PluginError;
use ipnet::IpNet;
use net::interface::{InterfaceName, Mac};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// The CNI versions this plugin speaks.
pub const SUPPORTED_VERSIONS: [&str; 4] = ["0.3.0", "0.3.1", "0.4.0", "1.0.0"];

/// The outcome of a successful attach.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AttachmentResult {
    /// The container side interface.
    pub interface: InterfaceName,
    /// The network namespace holding it.
    pub sandbox: PathBuf,
    /// Its hardware address.
    pub mac: Mac,
    /// The address assigned to it.
    pub address: IpNet,
}

/// One interface of a CNI result.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ResultInterface {
    /// The interface name.
    pub name: String,
    /// The hardware address, `xx:xx:xx:xx:xx:xx`.
    pub mac: String,
    /// The namespace path; absent for host interfaces.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sandbox: Option<String>,
}

/// One address of a CNI result.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ResultIp {
    /// `"4"` or `"6"`; only versions before 1.0.0 carry it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<&'static str>,
    /// The address in CIDR notation.
    pub address: IpNet,
    /// Index into the interface list.
    pub interface: usize,
}

/// The result of ADD.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CniResult {
    /// Echoes the version of the request.
    pub cni_version: String,
    /// The interfaces created.
    pub interfaces: Vec<ResultInterface>,
    /// The addresses assigned.
    pub ips: Vec<ResultIp>,
}

impl CniResult {
    /// Describe `attachment` in the result format of `cni_version`.
    #[must_use]
    pub fn new(cni_version: &str, attachment: &AttachmentResult) -> Self {
        let legacy = cni_version.starts_with("0.");
        let version = match attachment.address {
            IpNet::V4(_) => "4",
            IpNet::V6(_) => "6",
        };
        CniResult {
            cni_version: cni_version.to_string(),
            interfaces: vec![ResultInterface {
                name: attachment.interface.to_string(),
                mac: attachment.mac.to_string(),
                sandbox: Some(attachment.sandbox.display().to_string()),
            }],
            ips: vec![ResultIp {
                version: legacy.then_some(version),
                address: attachment.address,
                interface: 0,
            }],
        }
    }
}

/// The answer to VERSION.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionResult {
    /// The version of the request (or the newest supported one).
    pub cni_version: String,
    /// Every version this plugin speaks.
    pub supported_versions: Vec<&'static str>,
}

impl VersionResult {
    /// The version report, answering in `cni_version`.
    #[must_use]
    pub fn new(cni_version: &str) -> Self {
        VersionResult {
            cni_version: cni_version.to_string(),
            supported_versions: SUPPORTED_VERSIONS.to_vec(),
        }
    }
}

/// The error object written in place of a result.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResult {
    /// The version of the request, if it could be determined.
    pub cni_version: String,
    /// The CNI error code.
    pub code: u32,
    /// A short message.
    pub msg: String,
    /// The full chain of causes.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub details: String,
}

impl ErrorResult {
    /// Describe `err`.
    #[must_use]
    pub fn new(cni_version: &str, err: &PluginError) -> Self {
        let mut details = vec![];
        let mut source = std::error::Error::source(err);
        while let Some(cause) = source {
            details.push(cause.to_string());
            source = cause.source();
        }
        ErrorResult {
            cni_version: cni_version.to_string(),
            code: err.code(),
            msg: err.to_string(),
            details: details.join(": "),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VersionPeek {
    cni_version: Option<String>,
}

/// The `cniVersion` of a request, read without validating the rest of it.
///
/// Falls back to the default version if the input is not a JSON object or does not name one.
#[must_use]
pub fn peek_cni_version(raw: &[u8]) -> String {
    serde_json::from_slice::<VersionPeek>(raw)
        .ok()
        .and_then(|peek| peek.cni_version)
        .unwrap_or_else(|| DEFAULT_CNI_VERSION.to_string())
}
