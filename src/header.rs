//! The fixed 36-byte header that precedes every message.
//!
//! Layout (absolute offsets, little-endian):
//!
//! | bytes  | field                                        |
//! |--------|----------------------------------------------|
//! | 0..2   | size (header + payload)                      |
//! | 2      | protocol bits `0x18`, tagged bit `0x20`      |
//! | 4..8   | source                                       |
//! | 8..16  | target (6- or 8-byte form)                   |
//! | 22     | bit 1 ack-required, bit 0 res-required       |
//! | 23     | sequence                                     |
//! | 32..34 | message type                                 |
//!
//! Everything else is reserved and written as zero.

use byteorder::{ByteOrder, LittleEndian};
use serde::{Deserialize, Serialize};

use crate::errors::DecodeError;

/// Size of an encoded header in bytes.
pub const HEADER_SIZE: usize = 36;

const PROTOCOL_BITS: u8 = 0x18;
const TAGGED_BIT: u8 = 0x20;
const ACK_REQUIRED_BIT: u8 = 0x02;
const RES_REQUIRED_BIT: u8 = 0x01;

const TARGET: std::ops::Range<usize> = 8..16;
/// Largest identity that fits the 6-byte target form.
const MAX_SHORT_TARGET: u64 = 0xffff_ffff_ffff;

/// Which wire form a target identity uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetWidth {
    /// 48-bit identity, top two bytes of the field zero.
    Six,
    /// Full 64-bit identity.
    Eight,
}

/// A decoded or to-be-encoded message header.
///
/// `message_type` is kept as the raw code so that headers of unknown types can
/// still be inspected.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Header {
    pub size: u16,
    pub tagged: bool,
    pub source: u32,
    pub target: u64,
    pub ack_required: bool,
    pub res_required: bool,
    pub sequence: u8,
    pub message_type: u16,
}

impl Header {
    /// Encode into exactly [`HEADER_SIZE`] bytes.
    ///
    /// # Examples
    ///
    /// ```
    /// use lifx_lan_rs::Header;
    ///
    /// let header = Header { size: 36, tagged: true, message_type: 2, ..Header::default() };
    /// let bytes = header.encode();
    /// assert_eq!(bytes.len(), 36);
    /// assert_eq!(bytes[2], 0x38);
    /// ```
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];

        LittleEndian::write_u16(&mut buf[0..2], self.size);

        buf[2] = PROTOCOL_BITS;
        if self.tagged {
            buf[2] |= TAGGED_BIT;
        }

        LittleEndian::write_u32(&mut buf[4..8], self.source);

        encode_target(self.target, &mut buf[TARGET]);

        if self.ack_required {
            buf[22] |= ACK_REQUIRED_BIT;
        }
        if self.res_required {
            buf[22] |= RES_REQUIRED_BIT;
        }
        buf[23] = self.sequence;

        LittleEndian::write_u16(&mut buf[32..34], self.message_type);

        buf
    }

    /// Decode the first [`HEADER_SIZE`] bytes of `buf`.
    ///
    /// Does not check the size field against `buf`; see [`crate::Message::decode`].
    pub fn decode(buf: &[u8]) -> Result<Self, DecodeError> {
        if buf.len() < HEADER_SIZE {
            return Err(DecodeError::Truncated {
                needed: HEADER_SIZE,
                have: buf.len(),
            });
        }

        let (target, _) = decode_target(&buf[TARGET]);

        Ok(Header {
            size: LittleEndian::read_u16(&buf[0..2]),
            tagged: buf[2] & TAGGED_BIT != 0,
            source: LittleEndian::read_u32(&buf[4..8]),
            target,
            ack_required: buf[22] & ACK_REQUIRED_BIT != 0,
            res_required: buf[22] & RES_REQUIRED_BIT != 0,
            sequence: buf[23],
            message_type: LittleEndian::read_u16(&buf[32..34]),
        })
    }

    /// The form [`Header::encode`] uses for this header's target.
    pub fn target_width(&self) -> TargetWidth {
        if self.target > MAX_SHORT_TARGET {
            TargetWidth::Eight
        } else {
            TargetWidth::Six
        }
    }
}

fn encode_target(target: u64, field: &mut [u8]) {
    if target > MAX_SHORT_TARGET {
        LittleEndian::write_u64(field, target);
    } else {
        LittleEndian::write_uint(&mut field[..6], target, 6);
        field[6..8].fill(0);
    }
}

/// Decode an 8-byte target field.
///
/// The wire format does not say which form was written, so the top two bytes
/// decide: nonzero means the 8-byte form, zero means the 6-byte form. An 8-byte
/// identity whose top two bytes are zero is therefore reported as
/// [`TargetWidth::Six`]; the numeric value is the same either way.
pub fn decode_target(field: &[u8]) -> (u64, TargetWidth) {
    if field[6] != 0 || field[7] != 0 {
        (LittleEndian::read_u64(&field[..8]), TargetWidth::Eight)
    } else {
        (LittleEndian::read_uint(&field[..6], 6), TargetWidth::Six)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CANONICAL: [u8; HEADER_SIZE] = [
        0xff, 0x1f, 0x38, 0x00, 0xff, 0xff, 0xff, 0x1f, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
        0x1f, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x03, 0x1f, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00, 0xff, 0x1f, 0x00, 0x00,
    ];

    fn canonical_header() -> Header {
        Header {
            size: 0x1fff,
            tagged: true,
            source: 0x1fffffff,
            target: 0x1fffffffffffffff,
            ack_required: true,
            res_required: true,
            sequence: 0x1f,
            message_type: 0x1fff,
        }
    }

    #[test]
    fn test_encode_canonical() {
        assert_eq!(canonical_header().encode(), CANONICAL);
    }

    #[test]
    fn test_decode_canonical() {
        assert_eq!(Header::decode(&CANONICAL).unwrap(), canonical_header());
    }

    #[test]
    fn test_untagged_frame_bits() {
        let header = Header {
            tagged: false,
            ..canonical_header()
        };
        let bytes = header.encode();
        assert_eq!(bytes[2], 0x18);
        assert_eq!(bytes[3], 0x00);
        assert!(!Header::decode(&bytes).unwrap().tagged);
    }

    #[test]
    fn test_flag_combinations() {
        let header = Header {
            ack_required: false,
            res_required: true,
            ..canonical_header()
        };
        let bytes = header.encode();
        assert_eq!(bytes[22], 0x01);

        let header = Header {
            ack_required: true,
            res_required: false,
            ..canonical_header()
        };
        assert_eq!(header.encode()[22], 0x02);
    }

    #[test]
    fn test_extreme_values_round_trip() {
        for (source, target) in [(0, 0), (u32::MAX, u64::MAX), (0, u64::MAX), (u32::MAX, 0)] {
            let header = Header {
                source,
                target,
                ..canonical_header()
            };
            assert_eq!(Header::decode(&header.encode()).unwrap(), header);
        }
    }

    #[test]
    fn test_short_target_form() {
        let header = Header {
            target: 0xd073_d512_3456,
            ..Header::default()
        };
        assert_eq!(header.target_width(), TargetWidth::Six);
        let bytes = header.encode();
        assert_eq!(&bytes[8..16], &[0x56, 0x34, 0x12, 0xd5, 0x73, 0xd0, 0x00, 0x00]);
        assert_eq!(decode_target(&bytes[8..16]), (0xd073_d512_3456, TargetWidth::Six));
    }

    #[test]
    fn test_long_target_form() {
        let header = Header {
            target: 0x0001_d073_d512_3456,
            ..Header::default()
        };
        assert_eq!(header.target_width(), TargetWidth::Eight);
        let bytes = header.encode();
        assert_eq!(
            decode_target(&bytes[8..16]),
            (0x0001_d073_d512_3456, TargetWidth::Eight)
        );
    }

    // Known limitation: an identity written in the 8-byte form whose top two
    // bytes are zero cannot be told apart from the 6-byte form.
    #[test]
    fn test_eight_byte_target_with_zero_high_bytes_reads_as_six() {
        let mut field = [0u8; 8];
        LittleEndian::write_u64(&mut field, 0x0000_1234_5678_9abc);
        assert_eq!(
            decode_target(&field),
            (0x0000_1234_5678_9abc, TargetWidth::Six)
        );
    }

    #[test]
    fn test_decode_truncated() {
        assert_eq!(
            Header::decode(&CANONICAL[..35]),
            Err(DecodeError::Truncated {
                needed: 36,
                have: 35
            })
        );
    }
}
