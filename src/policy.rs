//! Per-field privacy policy tree and requested-visibility spec.
//!
//! A `FieldPolicy` tree mirrors the shape of the message it governs: one
//! node per annotated field, with child nodes for message-typed fields
//! that carry per-subfield overrides. The tree is built once, then shared
//! read-only across any number of strip operations.
//!
//! Policy construction from config files is a caller concern; this module
//! only defines the in-memory shape and the lookup contract the stripper
//! consumes.
//!
//! # Invariants
//! - A node with children is message-typed (enforced by construction).
//! - Children are sorted by field id with no duplicates; `lookup` is a
//!   binary search.

use serde::{Deserialize, Serialize};

/// How widely a field's value may be disclosed.
///
/// The ordering is total: `Local < Explicit < Automatic`. A field passes a
/// requested level when its own destination is at least as broad.
#[derive(
    Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
pub enum Destination {
    /// May only be written to storage on the device.
    Local,
    /// May leave the device after an explicit user approval.
    Explicit,
    /// May be shared automatically, without per-report approval.
    Automatic,
}

impl Destination {
    /// Returns the wire-compatible raw value (0 / 100 / 200).
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        match self {
            Self::Local => 0,
            Self::Explicit => 100,
            Self::Automatic => 200,
        }
    }

    /// Decodes a raw destination value.
    #[must_use]
    pub fn from_u8(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::Local),
            100 => Some(Self::Explicit),
            200 => Some(Self::Automatic),
            _ => None,
        }
    }
}

/// Privacy policy for one field, with child policies for message-typed
/// fields that carry per-subfield overrides.
#[derive(Clone, Debug)]
pub struct FieldPolicy {
    field_id: u32,
    is_message: bool,
    dest: Option<Destination>,
    children: Vec<FieldPolicy>,
}

impl FieldPolicy {
    /// Policy for a scalar field.
    #[must_use]
    pub fn leaf(field_id: u32, dest: Destination) -> Self {
        Self {
            field_id,
            is_message: false,
            dest: Some(dest),
            children: Vec::new(),
        }
    }

    /// Policy for a message-typed field treated as a unit: no per-subfield
    /// overrides, so its payload is kept or dropped verbatim.
    #[must_use]
    pub fn opaque_message(field_id: u32, dest: Destination) -> Self {
        Self {
            field_id,
            is_message: true,
            dest: Some(dest),
            children: Vec::new(),
        }
    }

    /// Policy for a message-typed field with per-subfield overrides.
    ///
    /// Children are sorted by field id. Subfields without a child node
    /// inherit the spec's default destination during stripping.
    ///
    /// # Panics
    /// Panics if two children share a field id (a configuration bug).
    #[must_use]
    pub fn message(field_id: u32, mut children: Vec<FieldPolicy>) -> Self {
        children.sort_by_key(|child| child.field_id);
        for pair in children.windows(2) {
            assert!(
                pair[0].field_id != pair[1].field_id,
                "duplicate policy for field id {}",
                pair[0].field_id
            );
        }
        Self {
            field_id,
            is_message: true,
            dest: None,
            children,
        }
    }

    /// Root policy for a top-level message. The field id is unused at the
    /// root; it exists so the root is an ordinary message node.
    #[must_use]
    pub fn root(children: Vec<FieldPolicy>) -> Self {
        Self::message(0, children)
    }

    /// Protobuf field number this node governs.
    #[inline]
    #[must_use]
    pub fn field_id(&self) -> u32 {
        self.field_id
    }

    /// True if the field's payload is itself an encoded message.
    #[inline]
    #[must_use]
    pub fn is_message(&self) -> bool {
        self.is_message
    }

    /// True if at least one subfield carries its own policy.
    #[inline]
    #[must_use]
    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    /// This node's destination, if one was set.
    #[inline]
    #[must_use]
    pub fn dest(&self) -> Option<Destination> {
        self.dest
    }

    /// Looks up the child policy for `field_id`, if any.
    #[must_use]
    pub fn lookup(&self, field_id: u32) -> Option<&FieldPolicy> {
        self.children
            .binary_search_by_key(&field_id, |child| child.field_id)
            .ok()
            .map(|idx| &self.children[idx])
    }
}

/// The visibility level a caller requests for one strip operation.
///
/// `default_dest` governs fields with no policy node (and container nodes
/// with no destination of their own). The default is `Automatic`, which
/// passes unannotated fields through; privacy-hardened callers can set it
/// to `Local` to drop anything unannotated instead.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct PrivacySpec {
    dest: Destination,
    default_dest: Destination,
}

impl PrivacySpec {
    /// Spec requesting `dest`, with unannotated fields passing through.
    #[must_use]
    pub fn new(dest: Destination) -> Self {
        Self {
            dest,
            default_dest: Destination::Automatic,
        }
    }

    /// Spec requesting `dest` with an explicit default for fields that
    /// carry no policy.
    #[must_use]
    pub fn with_default_dest(dest: Destination, default_dest: Destination) -> Self {
        Self { dest, default_dest }
    }

    /// The requested destination level.
    #[inline]
    #[must_use]
    pub fn dest(&self) -> Destination {
        self.dest
    }

    /// The destination assumed for fields without a policy node.
    #[inline]
    #[must_use]
    pub fn default_dest(&self) -> Destination {
        self.default_dest
    }

    /// Whether a field governed by `policy` may appear in a report bound
    /// for this spec's destination.
    #[must_use]
    pub fn passes(&self, policy: Option<&FieldPolicy>) -> bool {
        let effective = policy
            .and_then(FieldPolicy::dest)
            .unwrap_or(self.default_dest);
        effective >= self.dest
    }
}
