// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! [VXLAN][RFC7348] types.
//!
//! [RFC7348]: https://datatracker.ietf.org/doc/html/rfc7348#section-5

mod vni;

pub use vni::{InvalidVni, Vni};
