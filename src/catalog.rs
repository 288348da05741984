//! The closed table of message types understood by this crate.

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, FromRepr};

use crate::types::{Hsbk, Label};

/// Every message type in the LAN protocol catalog, by wire code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter, FromRepr)]
#[repr(u16)]
pub enum MessageType {
    GetService = 2,
    StateService = 3,
    GetHostInfo = 12,
    StateHostInfo = 13,
    GetHostFirmware = 14,
    StateHostFirmware = 15,
    GetWifiInfo = 16,
    StateWifiInfo = 17,
    GetWifiFirmware = 18,
    StateWifiFirmware = 19,
    GetPower = 20,
    SetPower = 21,
    StatePower = 22,
    GetLabel = 23,
    SetLabel = 24,
    StateLabel = 25,
    GetVersion = 32,
    StateVersion = 33,
    GetInfo = 34,
    StateInfo = 35,
    Acknowledgement = 45,
    GetLocation = 48,
    StateLocation = 50,
    GetGroup = 51,
    StateGroup = 53,
    EchoRequest = 58,
    EchoResponse = 59,
    LightGet = 101,
    LightSetColor = 102,
    LightState = 107,
    LightGetPower = 116,
    LightSetPower = 117,
    LightStatePower = 118,
}

/// Whether a type travels client → device or device → client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Sendable,
    Receivable,
}

/// Static description of one message type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogEntry {
    pub kind: MessageType,
    pub direction: Direction,
    /// Fixed payload length in bytes.
    pub payload_size: usize,
    /// Whether the type may be sent tagged to every device at once.
    pub broadcast: bool,
}

const ECHO_SIZE: usize = 64;
const GROUP_SIZE: usize = 16 + Label::SIZE + 8;

impl MessageType {
    /// Look up a wire code.
    ///
    /// # Examples
    ///
    /// ```
    /// use lifx_lan_rs::MessageType;
    ///
    /// assert_eq!(MessageType::from_code(3), Some(MessageType::StateService));
    /// assert_eq!(MessageType::from_code(4), None);
    /// ```
    pub fn from_code(code: u16) -> Option<Self> {
        MessageType::from_repr(code)
    }

    pub fn code(&self) -> u16 {
        *self as u16
    }

    /// The catalog entry for this type.
    pub const fn entry(self) -> CatalogEntry {
        use Direction::{Receivable, Sendable};
        use MessageType::*;

        let (direction, payload_size, broadcast) = match self {
            GetService => (Sendable, 0, true),
            StateService => (Receivable, 5, false),
            GetHostInfo => (Sendable, 0, true),
            StateHostInfo => (Receivable, 12, false),
            GetHostFirmware => (Sendable, 0, true),
            StateHostFirmware => (Receivable, 12, false),
            GetWifiInfo => (Sendable, 0, true),
            StateWifiInfo => (Receivable, 12, false),
            GetWifiFirmware => (Sendable, 0, true),
            StateWifiFirmware => (Receivable, 12, false),
            GetPower => (Sendable, 0, true),
            SetPower => (Sendable, 2, true),
            StatePower => (Receivable, 2, false),
            GetLabel => (Sendable, 0, true),
            // Every device would end up with the same name.
            SetLabel => (Sendable, Label::SIZE, false),
            StateLabel => (Receivable, Label::SIZE, false),
            GetVersion => (Sendable, 0, true),
            StateVersion => (Receivable, 12, false),
            GetInfo => (Sendable, 0, true),
            StateInfo => (Receivable, 24, false),
            Acknowledgement => (Receivable, 0, false),
            GetLocation => (Sendable, 0, true),
            StateLocation => (Receivable, GROUP_SIZE, false),
            GetGroup => (Sendable, 0, true),
            StateGroup => (Receivable, GROUP_SIZE, false),
            EchoRequest => (Sendable, ECHO_SIZE, false),
            EchoResponse => (Receivable, ECHO_SIZE, false),
            LightGet => (Sendable, 0, true),
            LightSetColor => (Sendable, 1 + Hsbk::SIZE + 4, true),
            LightState => (Receivable, Hsbk::SIZE + 2 + Label::SIZE, false),
            LightGetPower => (Sendable, 0, true),
            LightSetPower => (Sendable, 6, true),
            LightStatePower => (Receivable, 2, false),
        };

        CatalogEntry {
            kind: self,
            direction,
            payload_size,
            broadcast,
        }
    }

    pub fn is_sendable(&self) -> bool {
        self.entry().direction == Direction::Sendable
    }

    pub fn is_receivable(&self) -> bool {
        self.entry().direction == Direction::Receivable
    }

    pub fn is_broadcastable(&self) -> bool {
        self.entry().broadcast
    }

    pub fn payload_size(&self) -> usize {
        self.entry().payload_size
    }
}

/// Iterate the whole catalog in wire-code order.
pub fn catalog() -> impl Iterator<Item = CatalogEntry> {
    MessageType::iter().map(MessageType::entry)
}
