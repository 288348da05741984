//! Typed message payloads.
//!
//! [`Payload`] is a closed union with one variant per [`MessageType`]. Encoding
//! and decoding are exhaustive matches over it, so adding a type to the catalog
//! without teaching the codec about it does not compile.

use byteorder::{ByteOrder, LittleEndian};
use serde::{Deserialize, Serialize};

use crate::catalog::MessageType;
use crate::errors::{DecodeError, EncodeError};
use crate::types::{Hsbk, Label, PowerLevel, Service, Timestamp};

type EncodeResult<T> = std::result::Result<T, EncodeError>;

/// Reply to a service query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateService {
    pub service: u8,
    pub port: u32,
}

impl StateService {
    /// The advertised service, if it is one this crate knows.
    pub fn service(&self) -> Option<Service> {
        Service::create(self.service)
    }
}

/// Host or wifi radio statistics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalInfo {
    /// Signal strength in milliwatts.
    pub signal: f32,
    pub tx: u32,
    pub rx: u32,
}

/// Host or wifi firmware build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirmwareInfo {
    pub build: Timestamp,
    pub version: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionInfo {
    pub vendor: u32,
    pub product: u32,
    pub version: u32,
}

/// Device clock and run-time counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeInfo {
    pub time: Timestamp,
    /// Nanoseconds since power on.
    pub uptime: u64,
    /// Nanoseconds spent off during the last power cycle.
    pub downtime: u64,
}

/// Location or group membership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupInfo {
    pub id: [u8; 16],
    pub label: Label,
    pub updated_at: Timestamp,
}

/// Opaque bytes echoed back by a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EchoPayload(pub [u8; 64]);

impl EchoPayload {
    pub const SIZE: usize = 64;

    /// Copy up to 64 bytes of `data`, zero-filling the rest.
    pub fn new(data: &[u8]) -> Self {
        let mut payload = [0u8; Self::SIZE];
        let len = data.len().min(Self::SIZE);
        payload[..len].copy_from_slice(&data[..len]);
        EchoPayload(payload)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightSetColor {
    pub color: Hsbk,
    /// Transition time in milliseconds.
    pub duration: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightState {
    pub color: Hsbk,
    pub power: PowerLevel,
    pub label: Label,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightSetPower {
    pub level: PowerLevel,
    /// Transition time in milliseconds.
    pub duration: u32,
}

/// The body of a message, one variant per catalog entry.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    GetService,
    StateService(StateService),
    GetHostInfo,
    StateHostInfo(SignalInfo),
    GetHostFirmware,
    StateHostFirmware(FirmwareInfo),
    GetWifiInfo,
    StateWifiInfo(SignalInfo),
    GetWifiFirmware,
    StateWifiFirmware(FirmwareInfo),
    GetPower,
    SetPower(PowerLevel),
    StatePower(PowerLevel),
    GetLabel,
    SetLabel(Label),
    StateLabel(Label),
    GetVersion,
    StateVersion(VersionInfo),
    GetInfo,
    StateInfo(TimeInfo),
    Acknowledgement,
    GetLocation,
    StateLocation(GroupInfo),
    GetGroup,
    StateGroup(GroupInfo),
    EchoRequest(EchoPayload),
    EchoResponse(EchoPayload),
    LightGet,
    LightSetColor(LightSetColor),
    LightState(LightState),
    LightGetPower,
    LightSetPower(LightSetPower),
    LightStatePower(PowerLevel),
}

impl Payload {
    /// The catalog type of this payload.
    pub fn kind(&self) -> MessageType {
        match self {
            Payload::GetService => MessageType::GetService,
            Payload::StateService(_) => MessageType::StateService,
            Payload::GetHostInfo => MessageType::GetHostInfo,
            Payload::StateHostInfo(_) => MessageType::StateHostInfo,
            Payload::GetHostFirmware => MessageType::GetHostFirmware,
            Payload::StateHostFirmware(_) => MessageType::StateHostFirmware,
            Payload::GetWifiInfo => MessageType::GetWifiInfo,
            Payload::StateWifiInfo(_) => MessageType::StateWifiInfo,
            Payload::GetWifiFirmware => MessageType::GetWifiFirmware,
            Payload::StateWifiFirmware(_) => MessageType::StateWifiFirmware,
            Payload::GetPower => MessageType::GetPower,
            Payload::SetPower(_) => MessageType::SetPower,
            Payload::StatePower(_) => MessageType::StatePower,
            Payload::GetLabel => MessageType::GetLabel,
            Payload::SetLabel(_) => MessageType::SetLabel,
            Payload::StateLabel(_) => MessageType::StateLabel,
            Payload::GetVersion => MessageType::GetVersion,
            Payload::StateVersion(_) => MessageType::StateVersion,
            Payload::GetInfo => MessageType::GetInfo,
            Payload::StateInfo(_) => MessageType::StateInfo,
            Payload::Acknowledgement => MessageType::Acknowledgement,
            Payload::GetLocation => MessageType::GetLocation,
            Payload::StateLocation(_) => MessageType::StateLocation,
            Payload::GetGroup => MessageType::GetGroup,
            Payload::StateGroup(_) => MessageType::StateGroup,
            Payload::EchoRequest(_) => MessageType::EchoRequest,
            Payload::EchoResponse(_) => MessageType::EchoResponse,
            Payload::LightGet => MessageType::LightGet,
            Payload::LightSetColor(_) => MessageType::LightSetColor,
            Payload::LightState(_) => MessageType::LightState,
            Payload::LightGetPower => MessageType::LightGetPower,
            Payload::LightSetPower(_) => MessageType::LightSetPower,
            Payload::LightStatePower(_) => MessageType::LightStatePower,
        }
    }

    /// Encode into exactly `self.kind().payload_size()` bytes.
    ///
    /// # Examples
    ///
    /// ```
    /// use lifx_lan_rs::{Payload, PowerLevel};
    ///
    /// assert_eq!(Payload::SetPower(PowerLevel::ENABLED).encode().unwrap(), vec![0xff, 0xff]);
    /// assert!(Payload::SetPower(PowerLevel::from_raw(1)).encode().is_err());
    /// ```
    pub fn encode(&self) -> EncodeResult<Vec<u8>> {
        let mut buf = vec![0u8; self.kind().payload_size()];

        match self {
            Payload::GetService
            | Payload::GetHostInfo
            | Payload::GetHostFirmware
            | Payload::GetWifiInfo
            | Payload::GetWifiFirmware
            | Payload::GetPower
            | Payload::GetLabel
            | Payload::GetVersion
            | Payload::GetInfo
            | Payload::Acknowledgement
            | Payload::GetLocation
            | Payload::GetGroup
            | Payload::LightGet
            | Payload::LightGetPower => {}
            Payload::StateService(state) => {
                buf[0] = state.service;
                LittleEndian::write_u32(&mut buf[1..5], state.port);
            }
            Payload::StateHostInfo(info) | Payload::StateWifiInfo(info) => {
                LittleEndian::write_f32(&mut buf[0..4], info.signal);
                LittleEndian::write_u32(&mut buf[4..8], info.tx);
                LittleEndian::write_u32(&mut buf[8..12], info.rx);
            }
            Payload::StateHostFirmware(info) | Payload::StateWifiFirmware(info) => {
                LittleEndian::write_u64(&mut buf[0..8], info.build.nanos());
                LittleEndian::write_u32(&mut buf[8..12], info.version);
            }
            Payload::SetPower(level) => level.encode_into(&mut buf)?,
            Payload::StatePower(level) | Payload::LightStatePower(level) => level.write(&mut buf),
            Payload::SetLabel(label) | Payload::StateLabel(label) => label.encode_into(&mut buf)?,
            Payload::StateVersion(info) => {
                LittleEndian::write_u32(&mut buf[0..4], info.vendor);
                LittleEndian::write_u32(&mut buf[4..8], info.product);
                LittleEndian::write_u32(&mut buf[8..12], info.version);
            }
            Payload::StateInfo(info) => {
                LittleEndian::write_u64(&mut buf[0..8], info.time.nanos());
                LittleEndian::write_u64(&mut buf[8..16], info.uptime);
                LittleEndian::write_u64(&mut buf[16..24], info.downtime);
            }
            Payload::StateLocation(info) | Payload::StateGroup(info) => {
                buf[0..16].copy_from_slice(&info.id);
                info.label.encode_into(&mut buf[16..48])?;
                LittleEndian::write_u64(&mut buf[48..56], info.updated_at.nanos());
            }
            Payload::EchoRequest(echo) | Payload::EchoResponse(echo) => buf.copy_from_slice(&echo.0),
            Payload::LightSetColor(set) => {
                // buf[0] is reserved
                set.color.encode_into(&mut buf[1..9])?;
                LittleEndian::write_u32(&mut buf[9..13], set.duration);
            }
            Payload::LightState(state) => {
                state.color.write(&mut buf[0..8]);
                state.power.write(&mut buf[8..10]);
                state.label.encode_into(&mut buf[10..42])?;
            }
            Payload::LightSetPower(set) => {
                set.level.encode_into(&mut buf[0..2])?;
                LittleEndian::write_u32(&mut buf[2..6], set.duration);
            }
        }

        Ok(buf)
    }

    /// Decode the payload of a message of type `kind`.
    ///
    /// Only the length is checked; field values are taken as reported. Bytes
    /// beyond the fixed payload size are ignored.
    pub fn decode(kind: MessageType, buf: &[u8]) -> Result<Payload, DecodeError> {
        let needed = kind.payload_size();
        if buf.len() < needed {
            return Err(DecodeError::PayloadTooShort {
                kind,
                needed,
                have: buf.len(),
            });
        }

        let signal = |buf: &[u8]| SignalInfo {
            signal: LittleEndian::read_f32(&buf[0..4]),
            tx: LittleEndian::read_u32(&buf[4..8]),
            rx: LittleEndian::read_u32(&buf[8..12]),
        };
        let firmware = |buf: &[u8]| FirmwareInfo {
            build: Timestamp(LittleEndian::read_u64(&buf[0..8])),
            version: LittleEndian::read_u32(&buf[8..12]),
        };
        let group = |buf: &[u8]| {
            let mut id = [0u8; 16];
            id.copy_from_slice(&buf[0..16]);
            GroupInfo {
                id,
                label: Label::decode(&buf[16..48]),
                updated_at: Timestamp(LittleEndian::read_u64(&buf[48..56])),
            }
        };
        let echo = |buf: &[u8]| EchoPayload::new(&buf[..EchoPayload::SIZE]);

        let payload = match kind {
            MessageType::GetService => Payload::GetService,
            MessageType::StateService => Payload::StateService(StateService {
                service: buf[0],
                port: LittleEndian::read_u32(&buf[1..5]),
            }),
            MessageType::GetHostInfo => Payload::GetHostInfo,
            MessageType::StateHostInfo => Payload::StateHostInfo(signal(buf)),
            MessageType::GetHostFirmware => Payload::GetHostFirmware,
            MessageType::StateHostFirmware => Payload::StateHostFirmware(firmware(buf)),
            MessageType::GetWifiInfo => Payload::GetWifiInfo,
            MessageType::StateWifiInfo => Payload::StateWifiInfo(signal(buf)),
            MessageType::GetWifiFirmware => Payload::GetWifiFirmware,
            MessageType::StateWifiFirmware => Payload::StateWifiFirmware(firmware(buf)),
            MessageType::GetPower => Payload::GetPower,
            MessageType::SetPower => Payload::SetPower(PowerLevel::decode(buf)),
            MessageType::StatePower => Payload::StatePower(PowerLevel::decode(buf)),
            MessageType::GetLabel => Payload::GetLabel,
            MessageType::SetLabel => Payload::SetLabel(Label::decode(buf)),
            MessageType::StateLabel => Payload::StateLabel(Label::decode(buf)),
            MessageType::GetVersion => Payload::GetVersion,
            MessageType::StateVersion => Payload::StateVersion(VersionInfo {
                vendor: LittleEndian::read_u32(&buf[0..4]),
                product: LittleEndian::read_u32(&buf[4..8]),
                version: LittleEndian::read_u32(&buf[8..12]),
            }),
            MessageType::GetInfo => Payload::GetInfo,
            MessageType::StateInfo => Payload::StateInfo(TimeInfo {
                time: Timestamp(LittleEndian::read_u64(&buf[0..8])),
                uptime: LittleEndian::read_u64(&buf[8..16]),
                downtime: LittleEndian::read_u64(&buf[16..24]),
            }),
            MessageType::Acknowledgement => Payload::Acknowledgement,
            MessageType::GetLocation => Payload::GetLocation,
            MessageType::StateLocation => Payload::StateLocation(group(buf)),
            MessageType::GetGroup => Payload::GetGroup,
            MessageType::StateGroup => Payload::StateGroup(group(buf)),
            MessageType::EchoRequest => Payload::EchoRequest(echo(buf)),
            MessageType::EchoResponse => Payload::EchoResponse(echo(buf)),
            MessageType::LightGet => Payload::LightGet,
            MessageType::LightSetColor => Payload::LightSetColor(LightSetColor {
                color: Hsbk::decode(&buf[1..9]),
                duration: LittleEndian::read_u32(&buf[9..13]),
            }),
            MessageType::LightState => Payload::LightState(LightState {
                color: Hsbk::decode(&buf[0..8]),
                power: PowerLevel::decode(&buf[8..10]),
                label: Label::decode(&buf[10..42]),
            }),
            MessageType::LightGetPower => Payload::LightGetPower,
            MessageType::LightSetPower => Payload::LightSetPower(LightSetPower {
                level: PowerLevel::decode(&buf[0..2]),
                duration: LittleEndian::read_u32(&buf[2..6]),
            }),
            MessageType::LightStatePower => Payload::LightStatePower(PowerLevel::decode(buf)),
        };

        Ok(payload)
    }
}
