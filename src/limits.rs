//! Hard caps for strip operations.
//!
//! Strip work is bounded by the input size plus these explicit caps.
//! Exceeding a cap surfaces as an error rather than silent truncation.
//!
//! # Design Notes
//! - Limits are validated at construction; invalid configurations are
//!   treated as programmer errors (panic in `validate`).
//! - The depth cap exists so adversarially nested input fails cleanly
//!   instead of exhausting the call stack.

use serde::{Deserialize, Serialize};

/// Hard caps for one strip operation.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct StripLimits {
    /// Maximum nesting depth of re-encoded messages.
    ///
    /// Depth counts message-with-overrides recursion only; opaque message
    /// payloads are copied without re-parsing and cost no depth.
    pub max_depth: u16,
}

impl StripLimits {
    /// Defaults suitable for real incident reports.
    pub const DEFAULT: Self = Self { max_depth: 64 };

    /// Restrictive caps for tests or constrained environments.
    pub const RESTRICTIVE: Self = Self { max_depth: 8 };

    /// Validates that the limits are usable.
    ///
    /// # Panics
    ///
    /// Panics if limits are invalid (indicates a configuration bug).
    #[track_caller]
    pub const fn validate(&self) {
        assert!(self.max_depth > 0, "must allow at least one nesting level");
        assert!(self.max_depth <= 1024, "unreasonably deep nesting limit");
    }
}

impl Default for StripLimits {
    fn default() -> Self {
        Self::DEFAULT
    }
}

const _: () = StripLimits::DEFAULT.validate();
const _: () = StripLimits::RESTRICTIVE.validate();
