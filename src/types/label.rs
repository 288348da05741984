//! Fixed-width device labels.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::EncodeError;

/// A device, location or group label.
///
/// Labels travel as 32 bytes padded with NULs. Longer labels are rejected when
/// encoded rather than truncated.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Label(String);

impl Label {
    /// Encoded width of a label in bytes.
    pub const SIZE: usize = 32;

    pub fn new(label: &str) -> Self {
        Label(label.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub(crate) fn encode_into(&self, buf: &mut [u8]) -> Result<(), EncodeError> {
        let bytes = self.0.as_bytes();
        if bytes.len() > Self::SIZE {
            return Err(EncodeError::LabelTooLong(bytes.len()));
        }
        buf[..bytes.len()].copy_from_slice(bytes);
        buf[bytes.len()..Self::SIZE].fill(0);
        Ok(())
    }

    pub(crate) fn decode(buf: &[u8]) -> Self {
        let field = &buf[..Self::SIZE];
        let end = field.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
        Label(String::from_utf8_lossy(&field[..end]).into_owned())
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Label {
    fn from(label: &str) -> Self {
        Label::new(label)
    }
}

impl PartialEq<str> for Label {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}
