//! Shared helpers.
//!
//! - [`hash`]: FxHash and blake3 hex digests
//! - [`html`]: HTML entity escaping

pub mod hash;
pub mod html;
