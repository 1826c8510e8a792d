//! Privacy filtering for protobuf byte streams.
//!
//! ## Scope
//! This crate takes a serialized protobuf message, a per-field privacy
//! policy tree, and a requested visibility level, and produces a new,
//! policy-compliant byte stream with disallowed fields removed. It walks
//! the wire format directly; no schema or reflection library is involved.
//!
//! ## Key invariants
//! - Output is valid protobuf: headers and length prefixes are rewritten
//!   for nested messages whose contents shrank.
//! - Nested sizes are measured before the enclosing header is written, so
//!   no length prefix is ever backpatched.
//! - Varint reads are byte-capped and message nesting is depth-capped;
//!   malformed or pathological input fails with a typed error, never a
//!   panic, and never yields partial output.
//! - Stripping at a level every field passes returns the input bytes
//!   unchanged, and stripping is idempotent per spec level.
//!
//! ## Strip flow (one message)
//! 1) Read a field tag from the cursor and look up its policy node.
//! 2) Leaf fields (scalars, unannotated fields, opaque messages) are
//!    copied verbatim or skipped whole, by wire type.
//! 3) Message fields with per-subfield policies are re-encoded: recurse
//!    into a fresh buffer, then emit the header with the reduced length.
//! 4) Repeat until the input is exhausted.
//!
//! ## Notable entry points
//! - `PrivacyFilter`: policy tree + spec + limits; `strip` / `strip_bytes`.
//! - `FieldPolicy` / `PrivacySpec`: the policy tree and requested level.
//! - `ChunkedBuffer` / `Cursor`: chunked byte storage and forward-only
//!   snapshot-able reads.
//! - `StripLimits`: nesting-depth hardening.

pub mod buffer;
pub mod limits;
pub mod policy;
pub mod strip;
pub mod wire;

pub use buffer::{ChunkedBuffer, Cursor};
pub use limits::StripLimits;
pub use policy::{Destination, FieldPolicy, PrivacySpec};
pub use strip::{PrivacyFilter, StripError, StripOutput, StripStats};
pub use wire::{WireError, WireType};
