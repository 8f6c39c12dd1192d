// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

#![deny(clippy::all, clippy::pedantic)]
#![deny(rustdoc::all)]
#![allow(rustdoc::missing_crate_level_docs)]

use std::io::Read;
use std::process::ExitCode;
use tracectl::get_trace_ctl;
use tracing::{error, info};
use vxlan_cni::args::CmdArgs;
use vxlan_cni::cmd::{error_response, run};
use vxlan_cni::error::{ConfigError, PluginError};

fn read_stdin() -> Result<Vec<u8>, PluginError> {
    let mut input = vec![];
    std::io::stdin()
        .read_to_end(&mut input)
        .map_err(ConfigError::Stdin)?;
    Ok(input)
}

/// Report `err` as a CNI error object on stdout.
fn fail(input: &[u8], err: &PluginError) -> ExitCode {
    error!("{err}");
    let response = error_response(input, err);
    info!("reporting error code {}", response.code);
    match serde_json::to_string(&response) {
        Ok(json) => println!("{json}"),
        Err(err) => error!("failed to serialize error response: {err}"),
    }
    ExitCode::FAILURE
}

fn main() -> ExitCode {
    /* logs go to stderr, stdout carries the response */
    get_trace_ctl();
    let args = match CmdArgs::try_from_args(std::env::args_os()) {
        Ok(args) => args,
        // --help and --version
        Err(PluginError::Environment(err)) if !err.use_stderr() => err.exit(),
        Err(err) => return fail(&[], &err),
    };

    let input = match read_stdin() {
        Ok(input) => input,
        Err(err) => return fail(&[], &err),
    };

    match run(&args, &input) {
        Ok(response) => match response.to_json() {
            Ok(Some(json)) => {
                println!("{json}");
                ExitCode::SUCCESS
            }
            Ok(None) => ExitCode::SUCCESS,
            Err(err) => {
                error!("failed to serialize response: {err}");
                ExitCode::FAILURE
            }
        },
        Err(err) => fail(&input, &err),
    }
}
