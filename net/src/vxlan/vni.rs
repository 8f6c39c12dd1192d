// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

use core::fmt::Display;
use std::fmt::Formatter;

/// A [VXLAN][RFC7348] Network Identifier.
///
/// A `Vni` is a 24-bit value that identifies a VXLAN overlay network.
///
/// # Legal values
///
/// * Every value from `0` through the maximum is accepted, as the kernel does.
/// * The maximum legal value is <var>2<sup>24</sup> - 1 = `0x00_FF_FF_FF`</var>.
///
/// Use [`Vni::new_checked`] (or the `TryFrom<u32>` impl) to create a `Vni`.
///
/// [RFC7348]: https://datatracker.ietf.org/doc/html/rfc7348#section-5
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(serde::Deserialize, serde::Serialize)]
#[serde(try_from = "u32", into = "u32")]
#[repr(transparent)]
pub struct Vni(u32);

impl Display for Vni {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Vni {
    /// The minimum legal [`Vni`] value.
    pub const MIN: u32 = 0;
    /// The maximum legal [`Vni`] value (2<sup>24</sup> - 1).
    pub const MAX: u32 = 0x00_FF_FF_FF;

    /// Create a new [`Vni`] from a `u32`.
    ///
    /// # Errors
    ///
    /// Returns an [`InvalidVni`] error if the value is greater than [`Vni::MAX`].
    pub fn new_checked(vni: u32) -> Result<Vni, InvalidVni> {
        if vni > Vni::MAX {
            return Err(InvalidVni::TooLarge(vni));
        }
        Ok(Vni(vni))
    }

    /// Get the value of the [`Vni`] as a `u32`.
    #[must_use]
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

/// Errors that can occur when converting a `u32` to a [`Vni`]
#[must_use]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, thiserror::Error)]
pub enum InvalidVni {
    /// The (illegal) value used to attempt creation of a [`Vni`].
    #[error("The value {0} is too large to be a Vni (max is {MAX})", MAX = Vni::MAX)]
    TooLarge(u32),
}

impl From<Vni> for u32 {
    fn from(vni: Vni) -> u32 {
        vni.as_u32()
    }
}

impl TryFrom<u32> for Vni {
    type Error = InvalidVni;

    fn try_from(vni: u32) -> Result<Vni, Self::Error> {
        Vni::new_checked(vni)
    }
}

#[cfg(any(test, feature = "bolero"))]
mod contract {
    use crate::vxlan::Vni;
    use bolero::{Driver, TypeGenerator};

    impl TypeGenerator for Vni {
        fn generate<D: Driver>(u: &mut D) -> Option<Self> {
            let raw: u32 = u.produce::<u32>()? & Vni::MAX;
            Vni::new_checked(raw).ok()
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn zero_is_a_legal_vni() {
        assert_eq!(Vni::new_checked(0).unwrap().as_u32(), 0);
    }

    #[test]
    fn vni_max_is_a_legal_vni() {
        assert_eq!(Vni::new_checked(Vni::MAX).unwrap().as_u32(), Vni::MAX);
    }

    #[test]
    fn vni_max_plus_one_is_not_a_legal_vni() {
        assert_eq!(
            Vni::new_checked(Vni::MAX + 1).unwrap_err(),
            InvalidVni::TooLarge(Vni::MAX + 1)
        );
    }

    #[test]
    fn deserializes_from_plain_integer() {
        let vni: Vni = serde_json::from_str("42").unwrap();
        assert_eq!(vni.as_u32(), 42);
        assert_eq!(serde_json::from_str::<Vni>("0").unwrap().as_u32(), 0);
        assert!(serde_json::from_str::<Vni>("16777216").is_err());
    }

    #[test]
    fn try_from_complies_with_contract() {
        bolero::check!()
            .with_type()
            .cloned()
            .for_each(|raw: u32| match Vni::try_from(raw) {
                Ok(vni) => {
                    assert_eq!(u32::from(vni), raw);
                    assert!((Vni::MIN..=Vni::MAX).contains(&raw));
                }
                Err(InvalidVni::TooLarge(too_large)) => {
                    assert_eq!(raw, too_large);
                    assert!(raw > Vni::MAX);
                }
            });
    }
}
