//! Color temperature control.

use serde::{Deserialize, Serialize};

use crate::errors::EncodeError;

/// Color temperature in Kelvin, with valid values from 2500K to 9000K.
///
/// Lower values produce warmer (more yellow/orange) light, while higher
/// values produce cooler (more blue) light. Typical values:
/// - 2700K: Warm white (incandescent-like)
/// - 4000K: Neutral white
/// - 6500K: Daylight
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct Kelvin {
    pub(crate) kelvin: u16,
}

impl Default for Kelvin {
    fn default() -> Self {
        Self::new()
    }
}

impl Kelvin {
    pub const MIN: u16 = 2500;
    pub const MAX: u16 = 9000;

    /// Create a new Kelvin with the lowest valid value (2500K).
    ///
    /// # Examples
    ///
    /// ```
    /// use lifx_lan_rs::Kelvin;
    ///
    /// assert_eq!(Kelvin::new().kelvin(), 2500);
    /// ```
    pub fn new() -> Self {
        Kelvin { kelvin: Self::MIN }
    }

    /// Get the kelvin value.
    pub fn kelvin(&self) -> u16 {
        self.kelvin
    }

    /// Create a new Kelvin with the given value.
    ///
    /// Returns `None` if value is outside the valid range (2500-9000).
    ///
    /// # Examples
    ///
    /// ```
    /// use lifx_lan_rs::Kelvin;
    ///
    /// assert!(Kelvin::create(2499).is_none());
    /// assert!(Kelvin::create(2500).is_some());
    /// assert!(Kelvin::create(9000).is_some());
    /// assert!(Kelvin::create(9001).is_none());
    /// ```
    pub fn create(kelvin: u16) -> Option<Self> {
        Self::check(kelvin).ok().map(|kelvin| Kelvin { kelvin })
    }

    /// Validate a raw temperature before it is written to the wire.
    pub(crate) fn check(kelvin: u16) -> Result<u16, EncodeError> {
        if (Self::MIN..=Self::MAX).contains(&kelvin) {
            Ok(kelvin)
        } else {
            Err(EncodeError::KelvinOutOfRange(kelvin))
        }
    }
}

impl From<Kelvin> for u16 {
    fn from(kelvin: Kelvin) -> Self {
        kelvin.kelvin
    }
}
