//! Complete messages and the builder used to address them.

use crate::catalog::MessageType;
use crate::errors::{DecodeError, EncodeError};
use crate::header::{HEADER_SIZE, Header};
use crate::payload::{EchoPayload, LightSetColor, LightSetPower, Payload};
use crate::types::{Hsbk, Label, PowerLevel};

/// A header and its typed payload.
///
/// The header's `size` and `message_type` are kept in step with the payload:
/// both are recomputed whenever a payload is attached.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub header: Header,
    pub payload: Payload,
}

impl Message {
    /// Wrap `payload` in a default header.
    ///
    /// # Examples
    ///
    /// ```
    /// use lifx_lan_rs::{Message, MessageType, Payload};
    ///
    /// let msg = Message::new(Payload::GetService);
    /// assert_eq!(msg.header.size, 36);
    /// assert_eq!(msg.kind(), MessageType::GetService);
    /// ```
    pub fn new(payload: Payload) -> Self {
        let mut msg = Message {
            header: Header::default(),
            payload: Payload::GetService,
        };
        msg.set_payload(payload);
        msg
    }

    /// Replace the payload, updating the header size and type code.
    pub fn set_payload(&mut self, payload: Payload) {
        let kind = payload.kind();
        self.header.size = (HEADER_SIZE + kind.payload_size()) as u16;
        self.header.message_type = kind.code();
        self.payload = payload;
    }

    pub fn kind(&self) -> MessageType {
        self.payload.kind()
    }

    /// Address the message to every device: tagged, target zero.
    pub fn set_broadcast(&mut self) {
        self.header.tagged = true;
        self.header.target = 0;
    }

    /// Address the message to one device: untagged, target `identity`.
    ///
    /// Target zero means every device, so `identity == 0` leaves the message
    /// tagged.
    pub fn set_unicast(&mut self, identity: u64) {
        self.header.tagged = identity == 0;
        self.header.target = identity;
    }

    /// Encode header and payload into one datagram.
    pub fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        let payload = self.payload.encode()?;

        let mut header = self.header;
        header.size = (HEADER_SIZE + payload.len()) as u16;
        header.message_type = self.kind().code();

        let mut buf = Vec::with_capacity(HEADER_SIZE + payload.len());
        buf.extend_from_slice(&header.encode());
        buf.extend_from_slice(&payload);
        Ok(buf)
    }

    /// Decode one datagram.
    ///
    /// The size field bounds the message; trailing bytes past it are ignored.
    pub fn decode(buf: &[u8]) -> Result<Self, DecodeError> {
        let header = Header::decode(buf)?;

        let size = header.size as usize;
        if size < HEADER_SIZE {
            return Err(DecodeError::BadSize(header.size));
        }
        if size > buf.len() {
            return Err(DecodeError::Truncated {
                needed: size,
                have: buf.len(),
            });
        }

        let kind = MessageType::from_code(header.message_type)
            .ok_or(DecodeError::UnknownType(header.message_type))?;
        let payload = Payload::decode(kind, &buf[HEADER_SIZE..size])?;

        Ok(Message { header, payload })
    }
}

/// Builds outbound messages with a common set of header fields.
///
/// Only client-to-device types can be built. Addressing (`tagged`/`target`) is
/// normally left to the connector; setting a target here marks the message as
/// unicast.
///
/// # Examples
///
/// ```
/// use lifx_lan_rs::{MessageBuilder, PowerLevel};
///
/// let msg = MessageBuilder::new()
///     .source(42)
///     .res_required(true)
///     .set_power(PowerLevel::ENABLED);
/// assert_eq!(msg.header.source, 42);
/// assert!(msg.header.tagged);
/// assert_eq!(msg.header.size, 38);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct MessageBuilder {
    source: u32,
    target: u64,
    ack_required: bool,
    res_required: bool,
    sequence: u8,
}

impl Default for MessageBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageBuilder {
    pub fn new() -> Self {
        MessageBuilder {
            source: 0,
            target: 0,
            ack_required: false,
            res_required: false,
            sequence: 0,
        }
    }

    pub fn source(mut self, source: u32) -> Self {
        self.source = source;
        self
    }

    pub fn target(mut self, target: u64) -> Self {
        self.target = target;
        self
    }

    pub fn ack_required(mut self, ack_required: bool) -> Self {
        self.ack_required = ack_required;
        self
    }

    pub fn res_required(mut self, res_required: bool) -> Self {
        self.res_required = res_required;
        self
    }

    pub fn sequence(mut self, sequence: u8) -> Self {
        self.sequence = sequence;
        self
    }

    /// Build a message around any sendable payload.
    pub fn build(&self, payload: Payload) -> Result<Message, EncodeError> {
        let kind = payload.kind();
        if !kind.is_sendable() {
            return Err(EncodeError::NotSendable(kind));
        }
        Ok(self.wrap(payload))
    }

    fn wrap(&self, payload: Payload) -> Message {
        let mut msg = Message::new(payload);
        msg.header.source = self.source;
        msg.header.ack_required = self.ack_required;
        msg.header.res_required = self.res_required;
        msg.header.sequence = self.sequence;
        if self.target == 0 {
            msg.set_broadcast();
        } else {
            msg.set_unicast(self.target);
        }
        msg
    }

    pub fn get_service(&self) -> Message {
        self.wrap(Payload::GetService)
    }

    pub fn get_host_info(&self) -> Message {
        self.wrap(Payload::GetHostInfo)
    }

    pub fn get_host_firmware(&self) -> Message {
        self.wrap(Payload::GetHostFirmware)
    }

    pub fn get_wifi_info(&self) -> Message {
        self.wrap(Payload::GetWifiInfo)
    }

    pub fn get_wifi_firmware(&self) -> Message {
        self.wrap(Payload::GetWifiFirmware)
    }

    pub fn get_power(&self) -> Message {
        self.wrap(Payload::GetPower)
    }

    pub fn set_power(&self, level: PowerLevel) -> Message {
        self.wrap(Payload::SetPower(level))
    }

    pub fn get_label(&self) -> Message {
        self.wrap(Payload::GetLabel)
    }

    /// Label length is checked when the message is encoded.
    pub fn set_label(&self, label: &str) -> Message {
        self.wrap(Payload::SetLabel(Label::new(label)))
    }

    pub fn get_version(&self) -> Message {
        self.wrap(Payload::GetVersion)
    }

    pub fn get_info(&self) -> Message {
        self.wrap(Payload::GetInfo)
    }

    pub fn get_location(&self) -> Message {
        self.wrap(Payload::GetLocation)
    }

    pub fn get_group(&self) -> Message {
        self.wrap(Payload::GetGroup)
    }

    pub fn echo_request(&self, data: &[u8]) -> Message {
        self.wrap(Payload::EchoRequest(EchoPayload::new(data)))
    }

    pub fn light_get(&self) -> Message {
        self.wrap(Payload::LightGet)
    }

    /// `duration` is the transition time in milliseconds.
    pub fn light_set_color(&self, color: Hsbk, duration: u32) -> Message {
        self.wrap(Payload::LightSetColor(LightSetColor { color, duration }))
    }

    pub fn light_get_power(&self) -> Message {
        self.wrap(Payload::LightGetPower)
    }

    pub fn light_set_power(&self, level: PowerLevel, duration: u32) -> Message {
        self.wrap(Payload::LightSetPower(LightSetPower { level, duration }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::{
        FirmwareInfo, GroupInfo, LightState, SignalInfo, StateService, TimeInfo, VersionInfo,
    };
    use crate::types::{Kelvin, Timestamp};
    use strum::IntoEnumIterator;

    fn sample(kind: MessageType) -> Payload {
        let signal = SignalInfo {
            signal: 1.5e-6,
            tx: 1024,
            rx: 4096,
        };
        let firmware = FirmwareInfo {
            build: Timestamp(1_467_178_139_000_000_000),
            version: 0x0002_0001,
        };
        let group = GroupInfo {
            id: [0xab; 16],
            label: Label::new("upstairs"),
            updated_at: Timestamp(1_500_000_000_000_000_000),
        };
        let color = Hsbk::new(0x5555, 0xffff, 0x8000, Kelvin::create(3500).unwrap());

        match kind {
            MessageType::GetService => Payload::GetService,
            MessageType::StateService => Payload::StateService(StateService {
                service: 1,
                port: 56700,
            }),
            MessageType::GetHostInfo => Payload::GetHostInfo,
            MessageType::StateHostInfo => Payload::StateHostInfo(signal),
            MessageType::GetHostFirmware => Payload::GetHostFirmware,
            MessageType::StateHostFirmware => Payload::StateHostFirmware(firmware),
            MessageType::GetWifiInfo => Payload::GetWifiInfo,
            MessageType::StateWifiInfo => Payload::StateWifiInfo(signal),
            MessageType::GetWifiFirmware => Payload::GetWifiFirmware,
            MessageType::StateWifiFirmware => Payload::StateWifiFirmware(firmware),
            MessageType::GetPower => Payload::GetPower,
            MessageType::SetPower => Payload::SetPower(PowerLevel::ENABLED),
            MessageType::StatePower => Payload::StatePower(PowerLevel::from_raw(0x1234)),
            MessageType::GetLabel => Payload::GetLabel,
            MessageType::SetLabel => Payload::SetLabel(Label::new("kitchen")),
            MessageType::StateLabel => Payload::StateLabel(Label::new(&"z".repeat(32))),
            MessageType::GetVersion => Payload::GetVersion,
            MessageType::StateVersion => Payload::StateVersion(VersionInfo {
                vendor: 1,
                product: 27,
                version: 0,
            }),
            MessageType::GetInfo => Payload::GetInfo,
            MessageType::StateInfo => Payload::StateInfo(TimeInfo {
                time: Timestamp(u64::MAX),
                uptime: 3_600_000_000_000,
                downtime: 0,
            }),
            MessageType::Acknowledgement => Payload::Acknowledgement,
            MessageType::GetLocation => Payload::GetLocation,
            MessageType::StateLocation => Payload::StateLocation(group.clone()),
            MessageType::GetGroup => Payload::GetGroup,
            MessageType::StateGroup => Payload::StateGroup(group),
            MessageType::EchoRequest => Payload::EchoRequest(EchoPayload([0x5a; 64])),
            MessageType::EchoResponse => Payload::EchoResponse(EchoPayload::new(b"pong")),
            MessageType::LightGet => Payload::LightGet,
            MessageType::LightSetColor => Payload::LightSetColor(LightSetColor {
                color,
                duration: 1500,
            }),
            MessageType::LightState => Payload::LightState(LightState {
                color,
                power: PowerLevel::ENABLED,
                label: Label::new("desk"),
            }),
            MessageType::LightGetPower => Payload::LightGetPower,
            MessageType::LightSetPower => Payload::LightSetPower(LightSetPower {
                level: PowerLevel::STANDBY,
                duration: u32::MAX,
            }),
            MessageType::LightStatePower => Payload::LightStatePower(PowerLevel::ENABLED),
        }
    }

    #[test]
    fn test_every_type_round_trips() {
        for kind in MessageType::iter() {
            for (source, target) in [(0, 0), (u32::MAX, u64::MAX), (7, 0xd073_d500_1234)] {
                let mut msg = Message::new(sample(kind));
                msg.header.source = source;
                msg.set_unicast(target);
                msg.header.sequence = 0xff;
                msg.header.res_required = true;

                let bytes = msg.encode().unwrap();
                assert_eq!(bytes.len(), HEADER_SIZE + kind.payload_size(), "{kind}");
                assert_eq!(msg.header.size as usize, bytes.len(), "{kind}");
                assert_eq!(Message::decode(&bytes).unwrap(), msg, "{kind}");
            }
        }
    }

    #[test]
    fn test_set_payload_recomputes_size() {
        let mut msg = Message::new(Payload::GetLabel);
        assert_eq!(msg.header.size, 36);
        msg.set_payload(Payload::SetLabel(Label::new("den")));
        assert_eq!(msg.header.size, 68);
        assert_eq!(msg.header.message_type, 24);
    }

    #[test]
    fn test_decode_rejects_small_size_field() {
        let mut bytes = Message::new(Payload::GetService).encode().unwrap();
        bytes[0] = 35;
        assert_eq!(Message::decode(&bytes), Err(DecodeError::BadSize(35)));
    }

    #[test]
    fn test_decode_rejects_size_past_datagram() {
        let mut bytes = Message::new(Payload::GetService).encode().unwrap();
        bytes[0] = 40;
        assert_eq!(
            Message::decode(&bytes),
            Err(DecodeError::Truncated {
                needed: 40,
                have: 36
            })
        );
    }

    #[test]
    fn test_decode_ignores_trailing_bytes() {
        let msg = Message::new(Payload::StatePower(PowerLevel::ENABLED));
        let mut bytes = msg.encode().unwrap();
        bytes.extend_from_slice(&[0xee; 10]);
        assert_eq!(Message::decode(&bytes).unwrap(), msg);
    }

    #[test]
    fn test_decode_unknown_type() {
        let mut bytes = Message::new(Payload::GetService).encode().unwrap();
        bytes[32] = 0xff;
        bytes[33] = 0x1f;
        assert_eq!(
            Message::decode(&bytes),
            Err(DecodeError::UnknownType(0x1fff))
        );
    }

    #[test]
    fn test_builder_addressing() {
        let msg = MessageBuilder::new().get_power();
        assert!(msg.header.tagged);
        assert_eq!(msg.header.target, 0);

        let msg = MessageBuilder::new().target(0xd073_d512_3456).get_power();
        assert!(!msg.header.tagged);
        assert_eq!(msg.header.target, 0xd073_d512_3456);
    }

    #[test]
    fn test_unicast_to_zero_stays_tagged() {
        let mut msg = Message::new(Payload::GetPower);
        msg.set_unicast(0xd073_d512_3456);
        assert!(!msg.header.tagged);

        msg.set_unicast(0);
        assert!(msg.header.tagged);
        assert_eq!(msg.header.target, 0);
    }

    #[test]
    fn test_builder_rejects_receivable() {
        let err = MessageBuilder::new()
            .build(Payload::StatePower(PowerLevel::ENABLED))
            .unwrap_err();
        assert_eq!(err, EncodeError::NotSendable(MessageType::StatePower));
    }

    #[test]
    fn test_builder_fields() {
        let msg = MessageBuilder::new()
            .source(0x1fffffff)
            .ack_required(true)
            .res_required(true)
            .sequence(0x1f)
            .light_set_power(PowerLevel::ENABLED, 250);
        let bytes = msg.encode().unwrap();
        assert_eq!(&bytes[4..8], &[0xff, 0xff, 0xff, 0x1f]);
        assert_eq!(bytes[22], 0x03);
        assert_eq!(bytes[23], 0x1f);
        assert_eq!(&bytes[32..34], &[117, 0]);
        assert_eq!(bytes.len(), 42);
    }
}
