//! Services advertised in discovery replies.

use serde::{Deserialize, Serialize};
use strum_macros::{Display, FromRepr};

/// A transport service a device exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, FromRepr)]
#[repr(u8)]
pub enum Service {
    Udp = 1,
}

impl Service {
    pub fn create(value: u8) -> Option<Self> {
        Service::from_repr(value)
    }

    pub fn id(&self) -> u8 {
        *self as u8
    }
}
