//! Hue, saturation, brightness and kelvin color representation.

use byteorder::{ByteOrder, LittleEndian};
use serde::{Deserialize, Serialize};

use super::Kelvin;
use crate::errors::EncodeError;

/// A color as sent to and reported by LIFX lights.
///
/// Hue, saturation and brightness use the full `u16` range (hue 0..=65535 maps to
/// 0..360 degrees). `kelvin` is only validated when the color is encoded, so a
/// color decoded from a device is kept exactly as reported.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hsbk {
    pub hue: u16,
    pub saturation: u16,
    pub brightness: u16,
    pub kelvin: u16,
}

impl Hsbk {
    /// Size of an encoded color in bytes.
    pub const SIZE: usize = 8;

    pub fn new(hue: u16, saturation: u16, brightness: u16, kelvin: Kelvin) -> Self {
        Hsbk {
            hue,
            saturation,
            brightness,
            kelvin: kelvin.kelvin(),
        }
    }

    /// Create a color from a hue angle (0-360 degrees) and saturation and
    /// brightness percentages (0-100).
    ///
    /// Returns `None` if values are outside valid ranges.
    ///
    /// # Examples
    ///
    /// ```
    /// use lifx_lan_rs::{Hsbk, Kelvin};
    ///
    /// let red = Hsbk::from_degrees(0, 100, 100, Kelvin::new()).unwrap();
    /// assert_eq!(red.saturation, 0xffff);
    /// assert!(Hsbk::from_degrees(361, 50, 50, Kelvin::new()).is_none());
    /// assert!(Hsbk::from_degrees(180, 101, 50, Kelvin::new()).is_none());
    /// ```
    pub fn from_degrees(hue: u16, saturation: u8, brightness: u8, kelvin: Kelvin) -> Option<Self> {
        if hue > 360 || saturation > 100 || brightness > 100 {
            return None;
        }
        let scale = |value: u32, max: u32| (value * u16::MAX as u32 / max) as u16;
        Some(Hsbk {
            hue: scale(hue as u32 % 360, 360),
            saturation: scale(saturation as u32, 100),
            brightness: scale(brightness as u32, 100),
            kelvin: kelvin.kelvin(),
        })
    }

    /// A white color at the given temperature and full brightness.
    pub fn white(kelvin: Kelvin) -> Self {
        Hsbk {
            hue: 0,
            saturation: 0,
            brightness: u16::MAX,
            kelvin: kelvin.kelvin(),
        }
    }

    pub(crate) fn encode_into(&self, buf: &mut [u8]) -> Result<(), EncodeError> {
        Kelvin::check(self.kelvin)?;
        self.write(buf);
        Ok(())
    }

    /// Write without validating, for colors reported by a device.
    pub(crate) fn write(&self, buf: &mut [u8]) {
        LittleEndian::write_u16(&mut buf[0..2], self.hue);
        LittleEndian::write_u16(&mut buf[2..4], self.saturation);
        LittleEndian::write_u16(&mut buf[4..6], self.brightness);
        LittleEndian::write_u16(&mut buf[6..8], self.kelvin);
    }

    pub(crate) fn decode(buf: &[u8]) -> Self {
        Hsbk {
            hue: LittleEndian::read_u16(&buf[0..2]),
            saturation: LittleEndian::read_u16(&buf[2..4]),
            brightness: LittleEndian::read_u16(&buf[4..6]),
            kelvin: LittleEndian::read_u16(&buf[6..8]),
        }
    }
}
