//! Unified hashing utilities.
//!
//! Uses `rustc_hash::FxHasher` for fast non-cryptographic fingerprints and
//! `blake3` where a digest ends up in a filename or a cache key.
//!
//! # Usage
//!
//! ```ignore
//! use crate::utils::hash;
//!
//! let h = hash::compute("some content"); // -> u64
//! let digest = hash::digest_hex(HashFunction::Blake3, "html"); // -> 64 hex chars
//! ```

use rustc_hash::FxHasher;
use std::hash::Hasher;

/// Compute 64-bit hash from byte data.
#[inline]
pub fn compute<T: AsRef<[u8]> + ?Sized>(data: &T) -> u64 {
    let mut hasher = FxHasher::default();
    hasher.write(data.as_ref());
    hasher.finish()
}

/// Hash functions selectable from `[templatehash:fxhash]`-style placeholders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HashFunction {
    #[default]
    Blake3,
    Fx,
}

impl HashFunction {
    /// Look up a hash function by placeholder name (`blake3`, `fxhash`).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "blake3" => Some(Self::Blake3),
            "fx" | "fxhash" => Some(Self::Fx),
            _ => None,
        }
    }
}

/// Full hex digest of `data` with the given function.
pub fn digest_hex<T: AsRef<[u8]> + ?Sized>(function: HashFunction, data: &T) -> String {
    match function {
        HashFunction::Blake3 => blake3::hash(data.as_ref()).to_hex().to_string(),
        HashFunction::Fx => format!("{:016x}", compute(data)),
    }
}
