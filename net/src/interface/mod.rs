// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Data structures describing (observed) network interfaces

use serde::{Deserialize, Serialize};
use std::convert::TryFrom;
use std::fmt::{Debug, Display, Formatter};
use std::num::NonZero;

mod mac;
mod veth;
mod vtep;

#[allow(unused_imports)] // re-export
pub use mac::*;
#[allow(unused_imports)] // re-export
pub use veth::*;
#[allow(unused_imports)] // re-export
pub use vtep::*;

/// A network interface id (also known as ifindex in linux).
///
/// These are 32-bit values assigned by the linux kernel.
/// They are only meaningful within a single network namespace.
#[repr(transparent)]
#[derive(Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InterfaceIndex(NonZero<u32>);

impl Debug for InterfaceIndex {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        <_ as Debug>::fmt(&self.0, f)
    }
}

impl Display for InterfaceIndex {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        <_ as Display>::fmt(&self.0, f)
    }
}

/// Errors which may occur when creating an [`InterfaceIndex`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum InterfaceIndexError {
    /// The provided value was zero.
    #[error("interface index must not be zero")]
    Zero,
}

impl InterfaceIndex {
    /// Treat the provided `NonZero<u32>` as an [`InterfaceIndex`].
    #[must_use]
    pub fn new(raw: NonZero<u32>) -> InterfaceIndex {
        InterfaceIndex(raw)
    }

    /// Treat the provided `u32` as an [`InterfaceIndex`].
    ///
    /// # Errors
    ///
    /// Returns an error if the provided value is zero.
    pub fn try_new(raw: u32) -> Result<Self, InterfaceIndexError> {
        raw.try_into()
    }

    /// Treat this [`InterfaceIndex`] as a `u32`.
    #[must_use]
    pub fn to_u32(self) -> u32 {
        self.0.get()
    }
}

impl TryFrom<u32> for InterfaceIndex {
    type Error = InterfaceIndexError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match NonZero::new(value) {
            Some(raw) => Ok(InterfaceIndex::new(raw)),
            None => Err(InterfaceIndexError::Zero),
        }
    }
}

impl From<InterfaceIndex> for u32 {
    fn from(value: InterfaceIndex) -> Self {
        value.to_u32()
    }
}

/// A string which has been checked to be a legal linux network interface name.
///
/// Legal network interface names are composed only of alphanumeric ASCII characters, `.`, `-`, and
/// `_`.
///
/// The kernel reserves 16 bytes for the name including the terminating null, so the effective
/// maximum length is 15 bytes.
#[repr(transparent)]
#[derive(Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
#[derive(Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug)]
pub struct InterfaceName(String);

impl Display for InterfaceName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl InterfaceName {
    /// The maximum legal length of a linux network interface name (excluding the trailing NUL)
    pub const MAX_LEN: usize = 15;

    /// Build the name of a derived link by joining `prefix` and `base` with a dash.
    ///
    /// This is how the overlay names its bridge (`br-<name>`) and vxlan (`vxlan-<name>`) links.
    ///
    /// # Errors
    ///
    /// Returns [`IllegalInterfaceName`] if the joined name is not a legal interface name.
    pub fn derived(prefix: &str, base: &str) -> Result<Self, IllegalInterfaceName> {
        Self::try_from(format!("{prefix}-{base}"))
    }
}

/// Errors which may occur when mapping a general `String` into an `InterfaceName`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, thiserror::Error)]
pub enum IllegalInterfaceName {
    /// An empty string was submitted.
    #[error("interface name must be at least one character")]
    Empty,
    /// You can't make an interface named `.` or `..`
    #[error("name must not be . or ..")]
    MustNotIncludeOnlyDots(String),
    /// A string which is longer than 15 bytes was submitted.
    #[error("interface name {0} is too long")]
    TooLong(String),
    /// The string must not contain an interior null character.
    #[error("interface name {0} contains interior null characters")]
    InteriorNull(String),
    /// The supplied string is not legal ASCII.
    #[error("interface name {0} is not ascii")]
    NotAscii(String),
    /// The supplied string contains an illegal character.
    #[error(
        "interface name {0} contains illegal characters (only alphanumeric ASCII and .-_ are permitted)"
    )]
    IllegalCharacters(String),
}

impl TryFrom<String> for InterfaceName {
    type Error = IllegalInterfaceName;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        const LEGAL_PUNCT: [char; 3] = ['.', '-', '_'];
        if value.is_empty() {
            return Err(IllegalInterfaceName::Empty);
        }
        if value == "." || value == ".." {
            return Err(IllegalInterfaceName::MustNotIncludeOnlyDots(value));
        }
        if value.contains('\0') {
            return Err(IllegalInterfaceName::InteriorNull(value));
        }
        if !value.is_ascii() {
            return Err(IllegalInterfaceName::NotAscii(value));
        }
        if !value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || LEGAL_PUNCT.contains(&c))
        {
            return Err(IllegalInterfaceName::IllegalCharacters(value));
        }
        if value.len() > InterfaceName::MAX_LEN {
            return Err(IllegalInterfaceName::TooLong(value));
        }
        Ok(InterfaceName(value))
    }
}

impl TryFrom<&str> for InterfaceName {
    type Error = IllegalInterfaceName;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::try_from(value.to_string())
    }
}

impl From<InterfaceName> for String {
    fn from(value: InterfaceName) -> Self {
        value.0
    }
}

impl AsRef<str> for InterfaceName {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

/// The administrative state of a network interface.
#[derive(Copy, Clone, Debug, Hash, Ord, PartialOrd, Eq, PartialEq, Serialize, Deserialize)]
#[repr(u8)]
pub enum AdminState {
    /// The interface is set to down
    Down = 0,
    /// The interface is set to the up state.
    Up = 1,
}

/// The kind of a network link, as reported by the kernel's `IFLA_INFO_KIND` attribute.
///
/// Only the kinds the overlay manipulates are distinguished.
#[derive(Copy, Clone, Debug, Hash, Ord, PartialOrd, Eq, PartialEq, Serialize, Deserialize)]
pub enum LinkKind {
    /// A linux bridge
    Bridge,
    /// A vxlan device
    Vxlan,
    /// One end of a veth pair
    Veth,
    /// Anything else (physical NICs, loopback, dummies, ...)
    Other,
}

impl Display for LinkKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            LinkKind::Bridge => write!(f, "bridge"),
            LinkKind::Vxlan => write!(f, "vxlan link"),
            LinkKind::Veth => write!(f, "veth"),
            LinkKind::Other => write!(f, "other link"),
        }
    }
}

/// An "observed" network interface.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Deserialize, Serialize)]
pub struct Interface {
    /// The index of the interface.
    pub index: InterfaceIndex,
    /// The name of the interface.
    pub name: InterfaceName,
    /// The MAC (if any) associated with this network interface.
    pub mac: Option<Mac>,
    /// The MTU of the interface.
    pub mtu: Option<u32>,
    /// The `AdminState` of the interface.
    pub admin_state: AdminState,
    /// The controller (i.e., the bridge this interface is a port of).
    pub controller: Option<InterfaceIndex>,
    /// The type-specific properties of this interface.
    pub properties: InterfaceProperties,
}

impl Interface {
    /// The [`LinkKind`] of this interface.
    #[must_use]
    pub fn kind(&self) -> LinkKind {
        self.properties.kind()
    }

    /// Tell if [`Interface`] is a bridge interface
    #[must_use]
    pub fn is_bridge(&self) -> bool {
        matches!(self.properties, InterfaceProperties::Bridge)
    }

    /// Tell if [`Interface`] is a veth
    #[must_use]
    pub fn is_veth(&self) -> bool {
        matches!(self.properties, InterfaceProperties::Veth(_))
    }

    /// Tell if the interface is administratively up
    #[must_use]
    pub fn is_up(&self) -> bool {
        self.admin_state == AdminState::Up
    }
}

/// Interface-specific properties.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Deserialize, Serialize)]
pub enum InterfaceProperties {
    /// Bridges (no properties of interest)
    Bridge,
    /// Properties of VTEPs (vxlan devices)
    Vtep(VtepProperties),
    /// Properties of veth ends
    Veth(VethProperties),
    /// Properties of something we don't currently manipulate
    Other,
}

impl InterfaceProperties {
    /// The discriminant of these properties.
    #[must_use]
    pub fn kind(&self) -> LinkKind {
        match self {
            InterfaceProperties::Bridge => LinkKind::Bridge,
            InterfaceProperties::Vtep(_) => LinkKind::Vxlan,
            InterfaceProperties::Veth(_) => LinkKind::Veth,
            InterfaceProperties::Other => LinkKind::Other,
        }
    }
}

#[cfg(any(test, feature = "bolero"))]
mod contract {
    use crate::interface::InterfaceName;
    use bolero::{Driver, TypeGenerator};

    impl TypeGenerator for InterfaceName {
        fn generate<D: Driver>(driver: &mut D) -> Option<Self> {
            const LEGAL_CHARS: &[u8] =
                b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789._-";
            let target_length = 1 + (driver.produce::<u8>()? as usize % InterfaceName::MAX_LEN);
            let mut name = String::with_capacity(target_length);
            for _ in 0..target_length {
                let selected = driver.produce::<u8>()? as usize % LEGAL_CHARS.len();
                name.push(char::from(LEGAL_CHARS[selected]));
            }
            if name == "." || name == ".." {
                name.replace_range(0..1, "_");
            }
            InterfaceName::try_from(name).ok()
        }
    }
}
