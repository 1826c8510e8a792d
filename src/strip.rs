//! Policy-driven field stripping over raw protobuf bytes.
//!
//! Walks one encoded message field by field without a schema, consulting a
//! `FieldPolicy` tree and a `PrivacySpec` to decide keep-or-drop, and
//! re-emits the surviving bytes with correct headers and length prefixes.
//!
//! # Algorithm
//!
//! Per field: read the tag, look up the field's policy, then:
//!
//! - Leaf (no policy node, scalar, or message treated as a unit): compute
//!   the payload length for the wire type and either copy the field
//!   verbatim or advance past it.
//! - Message with per-subfield overrides: re-encode. Read the declared
//!   payload length, recurse into a fresh nested buffer until exactly that
//!   many input bytes are consumed, then emit the outer header with the
//!   *new* nested length followed by the nested bytes.
//!
//! Nested sizes are fully known before the outer header is written
//! (measure-then-write), so no length prefix is ever backpatched.
//!
//! # Invariants
//! - Every error aborts the whole strip; partial output is never returned.
//! - The input cursor lands exactly on the next field's tag (or the end of
//!   the buffer) after each successful per-field step.
//! - Re-encode recursion is bounded by `StripLimits::max_depth`.

use std::fmt;

use crate::buffer::{ChunkedBuffer, Cursor};
use crate::limits::StripLimits;
use crate::policy::{FieldPolicy, PrivacySpec};
use crate::wire::{decode_tag, read_varint32, read_varint64, WireError, WireType};

/// Strip error taxonomy.
///
/// All variants except `DepthLimitExceeded` mean the input bytes are not a
/// well-formed message; see [`StripError::is_malformed_input`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum StripError {
    /// Input ended inside a tag, length, value, or payload.
    Truncated,
    /// A varint ran past the byte cap for its width.
    VarintTooLong,
    /// A tag carried a wire type this format does not define.
    UnknownWireType { field_id: u32, wire_type: u8 },
    /// A field with per-subfield policy overrides was not length-delimited.
    MessageNotLengthDelimited { field_id: u32, wire_type: u8 },
    /// A nested message's fields ran past its declared length.
    LengthOverrun {
        field_id: u32,
        declared: usize,
        consumed: usize,
    },
    /// Message nesting exceeded `StripLimits::max_depth`.
    DepthLimitExceeded { max: u16 },
}

impl StripError {
    /// True if the error describes malformed input bytes, as opposed to a
    /// resource cap firing on pathological-but-decodable nesting.
    #[must_use]
    pub fn is_malformed_input(&self) -> bool {
        !matches!(self, Self::DepthLimitExceeded { .. })
    }
}

impl fmt::Display for StripError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Truncated => write!(f, "input truncated mid-field"),
            Self::VarintTooLong => write!(f, "varint exceeds byte cap"),
            Self::UnknownWireType { field_id, wire_type } => {
                write!(f, "field {field_id} has unknown wire type {wire_type}")
            }
            Self::MessageNotLengthDelimited { field_id, wire_type } => {
                write!(
                    f,
                    "field {field_id} has sub-field policies but wire type {wire_type}"
                )
            }
            Self::LengthOverrun {
                field_id,
                declared,
                consumed,
            } => {
                write!(
                    f,
                    "field {field_id} declared {declared} bytes, consumed {consumed}"
                )
            }
            Self::DepthLimitExceeded { max } => {
                write!(f, "message nesting exceeded depth limit {max}")
            }
        }
    }
}

impl std::error::Error for StripError {}

impl From<WireError> for StripError {
    fn from(err: WireError) -> Self {
        match err {
            WireError::Truncated => Self::Truncated,
            WireError::VarintTooLong => Self::VarintTooLong,
        }
    }
}

/// Counters for one strip operation.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct StripStats {
    /// Fields visited, including fields inside re-encoded messages.
    pub fields_seen: u64,
    /// Fields dropped by policy.
    pub fields_dropped: u64,
    /// Message fields re-encoded with a recomputed length prefix.
    pub messages_reencoded: u64,
    /// Input bytes walked.
    pub bytes_in: u64,
    /// Output bytes written.
    pub bytes_out: u64,
}

impl StripStats {
    /// Folds another operation's counters into this one.
    pub fn merge(&mut self, other: &StripStats) {
        self.fields_seen += other.fields_seen;
        self.fields_dropped += other.fields_dropped;
        self.messages_reencoded += other.messages_reencoded;
        self.bytes_in += other.bytes_in;
        self.bytes_out += other.bytes_out;
    }
}

/// Result of a successful strip: the surviving bytes plus counters.
#[derive(Clone, Debug)]
pub struct StripOutput {
    /// The filtered, re-encoded message bytes.
    pub buffer: ChunkedBuffer,
    /// Counters for the operation.
    pub stats: StripStats,
}

/// Strips fields from encoded messages according to one policy tree and
/// one requested visibility level.
///
/// The filter borrows the policy tree and is cheap to construct per
/// request; the tree itself is built once and shared read-only.
#[derive(Clone, Debug)]
pub struct PrivacyFilter<'p> {
    root: &'p FieldPolicy,
    spec: PrivacySpec,
    limits: StripLimits,
}

impl<'p> PrivacyFilter<'p> {
    /// Creates a filter over `root` for the level `spec` requests, with
    /// default limits.
    #[must_use]
    pub fn new(root: &'p FieldPolicy, spec: PrivacySpec) -> Self {
        Self::with_limits(root, spec, StripLimits::DEFAULT)
    }

    /// Creates a filter with explicit limits.
    #[must_use]
    pub fn with_limits(root: &'p FieldPolicy, spec: PrivacySpec, limits: StripLimits) -> Self {
        limits.validate();
        Self { root, spec, limits }
    }

    /// The spec this filter applies.
    #[inline]
    #[must_use]
    pub fn spec(&self) -> &PrivacySpec {
        &self.spec
    }

    /// Strips every field of the encoded message in `input`.
    ///
    /// The whole input is consumed; trailing garbage that does not decode
    /// as fields is an error, never silently dropped.
    ///
    /// # Errors
    /// Any `StripError` aborts the operation; no partial output is
    /// returned.
    pub fn strip(&self, input: &ChunkedBuffer) -> Result<StripOutput, StripError> {
        let mut out = ChunkedBuffer::new();
        let mut stats = StripStats::default();
        let mut cursor = input.cursor();
        while !cursor.at_end() {
            self.strip_field(&mut cursor, self.root, &mut out, 0, &mut stats)?;
        }
        stats.bytes_in = input.len() as u64;
        stats.bytes_out = out.len() as u64;
        Ok(StripOutput { buffer: out, stats })
    }

    /// Convenience wrapper over [`strip`](Self::strip) for contiguous
    /// input, returning the flattened output bytes.
    ///
    /// # Errors
    /// Same as [`strip`](Self::strip).
    pub fn strip_bytes(&self, input: &[u8]) -> Result<Vec<u8>, StripError> {
        let buf = ChunkedBuffer::from_slice(input);
        Ok(self.strip(&buf)?.buffer.to_vec())
    }

    /// Consumes exactly one field from `cursor`, writing it to `out` if
    /// the policy keeps it.
    ///
    /// On success the cursor sits on the next field's tag byte or at the
    /// end of the buffer.
    fn strip_field(
        &self,
        cursor: &mut Cursor<'_>,
        parent: &FieldPolicy,
        out: &mut ChunkedBuffer,
        depth: u16,
        stats: &mut StripStats,
    ) -> Result<(), StripError> {
        let tag = read_varint32(cursor)?;
        let (field_id, raw_type) = decode_tag(tag);
        stats.fields_seen += 1;

        let policy = parent.lookup(field_id);
        if let Some(node) = policy {
            if node.is_message() && node.has_children() {
                return self.reencode_message(cursor, node, out, field_id, raw_type, depth, stats);
            }
        }

        // Leaf: no policy node, a scalar, or a message kept or dropped as
        // a unit. The payload is never re-parsed.
        let wire_type = WireType::from_raw(raw_type).ok_or(StripError::UnknownWireType {
            field_id,
            wire_type: raw_type,
        })?;
        let keep = self.spec.passes(policy);
        if !keep {
            stats.fields_dropped += 1;
        }

        match wire_type {
            WireType::Varint => {
                let value = read_varint64(cursor)?;
                if keep {
                    out.write_header(field_id, wire_type);
                    out.write_varint64(value);
                }
            }
            WireType::Fixed64 => self.copy_or_skip(cursor, out, field_id, wire_type, 8, keep)?,
            WireType::Fixed32 => self.copy_or_skip(cursor, out, field_id, wire_type, 4, keep)?,
            WireType::LengthDelimited => {
                // The length varint is consumed whether or not the field
                // survives; it frames the payload to step over.
                let len = read_varint32(cursor)? as usize;
                if keep {
                    out.write_header(field_id, wire_type);
                    out.write_varint32(len as u32);
                    copy_bytes(cursor, out, len)?;
                } else if !cursor.advance(len) {
                    return Err(StripError::Truncated);
                }
            }
        }
        Ok(())
    }

    /// Re-encodes one message field whose policy carries per-subfield
    /// overrides, recomputing its length prefix.
    #[allow(clippy::too_many_arguments)]
    fn reencode_message(
        &self,
        cursor: &mut Cursor<'_>,
        node: &FieldPolicy,
        out: &mut ChunkedBuffer,
        field_id: u32,
        raw_type: u8,
        depth: u16,
        stats: &mut StripStats,
    ) -> Result<(), StripError> {
        if raw_type != WireType::LengthDelimited.as_raw() {
            return Err(StripError::MessageNotLengthDelimited {
                field_id,
                wire_type: raw_type,
            });
        }
        if depth >= self.limits.max_depth {
            return Err(StripError::DepthLimitExceeded {
                max: self.limits.max_depth,
            });
        }

        let declared = read_varint32(cursor)? as usize;
        let sub_start = cursor.snapshot();
        let mut nested = ChunkedBuffer::new();
        loop {
            let consumed = sub_start.distance_to(cursor);
            if consumed == declared {
                break;
            }
            if consumed > declared {
                return Err(StripError::LengthOverrun {
                    field_id,
                    declared,
                    consumed,
                });
            }
            self.strip_field(cursor, node, &mut nested, depth + 1, stats)?;
        }

        // Sub-walk complete: the nested size is final, so the outer header
        // and length prefix are written in one forward pass.
        out.write_header(field_id, WireType::LengthDelimited);
        out.write_varint32(nested.len() as u32);
        out.append_buffer(&nested);
        stats.messages_reencoded += 1;
        Ok(())
    }

    fn copy_or_skip(
        &self,
        cursor: &mut Cursor<'_>,
        out: &mut ChunkedBuffer,
        field_id: u32,
        wire_type: WireType,
        len: usize,
        keep: bool,
    ) -> Result<(), StripError> {
        if keep {
            out.write_header(field_id, wire_type);
            copy_bytes(cursor, out, len)?;
        } else if !cursor.advance(len) {
            return Err(StripError::Truncated);
        }
        Ok(())
    }
}

/// Copies `len` bytes from `cursor` into `out`, one chunk run at a time.
fn copy_bytes(
    cursor: &mut Cursor<'_>,
    out: &mut ChunkedBuffer,
    mut len: usize,
) -> Result<(), StripError> {
    while len > 0 {
        let run = cursor.chunk_run(len).ok_or(StripError::Truncated)?;
        let taken = run.len();
        out.extend_from_slice(run);
        cursor.advance(taken);
        len -= taken;
    }
    Ok(())
}
