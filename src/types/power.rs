//! Power level for device and light power control.

use byteorder::{ByteOrder, LittleEndian};
use serde::{Deserialize, Serialize};

use crate::errors::EncodeError;

/// Power level of a device.
///
/// The protocol only accepts `0` (standby) and `65535` (enabled) when setting
/// power. Devices may report any value, so a decoded level is kept as-is and is
/// only checked again if it is sent back.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PowerLevel(pub(crate) u16);

impl PowerLevel {
    pub const STANDBY: PowerLevel = PowerLevel(0);
    pub const ENABLED: PowerLevel = PowerLevel(u16::MAX);

    /// Returns `None` for anything but 0 or 65535.
    ///
    /// # Examples
    ///
    /// ```
    /// use lifx_lan_rs::PowerLevel;
    ///
    /// assert_eq!(PowerLevel::create(0), Some(PowerLevel::STANDBY));
    /// assert_eq!(PowerLevel::create(65535), Some(PowerLevel::ENABLED));
    /// assert!(PowerLevel::create(1).is_none());
    /// ```
    pub fn create(level: u16) -> Option<Self> {
        Self::check(level).ok().map(PowerLevel)
    }

    /// Wrap a raw level without validation.
    pub fn from_raw(level: u16) -> Self {
        PowerLevel(level)
    }

    pub fn level(&self) -> u16 {
        self.0
    }

    pub fn is_on(&self) -> bool {
        self.0 != 0
    }

    pub(crate) fn encode_into(&self, buf: &mut [u8]) -> Result<(), EncodeError> {
        Self::check(self.0)?;
        self.write(buf);
        Ok(())
    }

    pub(crate) fn write(&self, buf: &mut [u8]) {
        LittleEndian::write_u16(&mut buf[0..2], self.0);
    }

    pub(crate) fn decode(buf: &[u8]) -> Self {
        PowerLevel(LittleEndian::read_u16(&buf[0..2]))
    }

    fn check(level: u16) -> Result<u16, EncodeError> {
        match level {
            0 | u16::MAX => Ok(level),
            other => Err(EncodeError::InvalidPowerLevel(other)),
        }
    }
}

impl From<bool> for PowerLevel {
    fn from(on: bool) -> Self {
        if on {
            PowerLevel::ENABLED
        } else {
            PowerLevel::STANDBY
        }
    }
}
