//! Protobuf wire-format primitives.
//!
//! Tag and varint codecs shared by the cursor (read side) and the output
//! buffer (write side). Only the four classic wire types are recognized;
//! group markers and anything newer are rejected by the stripper.
//!
//! # Invariants
//! - Varint reads are bounded: 5 bytes for 32-bit values (tags, lengths),
//!   10 bytes for 64-bit field values. Longer runs are malformed.
//! - Value bits past the target width are discarded, the way protobuf
//!   readers truncate oversized encodings.

use std::fmt;

use crate::buffer::Cursor;

/// Maximum encoded length of a 32-bit varint.
pub const MAX_VARINT32_BYTES: usize = 5;

/// Maximum encoded length of a 64-bit varint.
pub const MAX_VARINT64_BYTES: usize = 10;

/// Wire framing of a protobuf field payload.
///
/// The discriminants are the on-wire values; 3 and 4 (the deprecated group
/// markers) are deliberately unrepresentable.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum WireType {
    /// Variable-length integer payload.
    Varint = 0,
    /// Eight-byte fixed-width payload.
    Fixed64 = 1,
    /// Length-prefixed payload (strings, bytes, nested messages).
    LengthDelimited = 2,
    /// Four-byte fixed-width payload.
    Fixed32 = 5,
}

impl WireType {
    /// Decodes a raw 3-bit wire type, rejecting values this format does
    /// not define.
    #[inline]
    #[must_use]
    pub fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::Varint),
            1 => Some(Self::Fixed64),
            2 => Some(Self::LengthDelimited),
            5 => Some(Self::Fixed32),
            _ => None,
        }
    }

    /// Returns the on-wire value.
    #[inline]
    #[must_use]
    pub fn as_raw(self) -> u8 {
        self as u8
    }
}

/// Packs a field id and wire type into a tag value.
#[inline]
#[must_use]
pub fn encode_tag(field_id: u32, wire_type: WireType) -> u32 {
    (field_id << 3) | u32::from(wire_type.as_raw())
}

/// Splits a tag value into `(field_id, raw_wire_type)`.
///
/// The wire type comes back raw so the caller can report unknown values
/// with full context.
#[inline]
#[must_use]
pub fn decode_tag(tag: u32) -> (u32, u8) {
    (tag >> 3, (tag & 0x7) as u8)
}

/// Returns the encoded length of `value` as a varint.
#[inline]
#[must_use]
pub fn varint32_len(value: u32) -> usize {
    match value {
        0..=0x7f => 1,
        0x80..=0x3fff => 2,
        0x4000..=0x1f_ffff => 3,
        0x20_0000..=0xfff_ffff => 4,
        _ => 5,
    }
}

/// Wire-level decode errors.
///
/// These carry no field context; the stripper converts them into its own
/// error type when they surface mid-walk.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum WireError {
    /// Input ended inside a varint.
    Truncated,
    /// A varint ran past the byte cap for its width.
    VarintTooLong,
}

impl fmt::Display for WireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Truncated => write!(f, "truncated varint"),
            Self::VarintTooLong => write!(f, "varint exceeds byte cap"),
        }
    }
}

impl std::error::Error for WireError {}

/// Reads an unsigned 32-bit varint from `cursor`, advancing past it.
///
/// # Errors
/// - `WireError::Truncated` if the input ends before the final byte.
/// - `WireError::VarintTooLong` after 5 continuation bytes.
pub fn read_varint32(cursor: &mut Cursor<'_>) -> Result<u32, WireError> {
    let mut value: u32 = 0;
    for group in 0..MAX_VARINT32_BYTES {
        let byte = cursor.read_byte().ok_or(WireError::Truncated)?;
        value |= u32::from(byte & 0x7f) << (7 * group as u32);
        if byte & 0x80 == 0 {
            return Ok(value);
        }
    }
    Err(WireError::VarintTooLong)
}

/// Reads an unsigned 64-bit varint from `cursor`, advancing past it.
///
/// Field values use this reader: real streams carry 64-bit integers and
/// sign-extended negatives, both up to 10 bytes on the wire.
///
/// # Errors
/// - `WireError::Truncated` if the input ends before the final byte.
/// - `WireError::VarintTooLong` after 10 continuation bytes.
pub fn read_varint64(cursor: &mut Cursor<'_>) -> Result<u64, WireError> {
    let mut value: u64 = 0;
    for group in 0..MAX_VARINT64_BYTES {
        let byte = cursor.read_byte().ok_or(WireError::Truncated)?;
        value |= u64::from(byte & 0x7f) << (7 * group as u32);
        if byte & 0x80 == 0 {
            return Ok(value);
        }
    }
    Err(WireError::VarintTooLong)
}
