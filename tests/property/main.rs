//! Property-based tests for the strip engine.
//!
//! Run with: `cargo test --test property`

mod strip_props;
