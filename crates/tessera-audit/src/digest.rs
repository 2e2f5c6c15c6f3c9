//! Hash function adapter.
//!
//! Wraps a SHA-2 digest behind `digest(bytes) -> lowercase hex`.  The
//! chain's tamper evidence reduces to the collision resistance of this
//! function, so only SHA-256 and SHA-512 are offered.

use sha2::{Digest, Sha256, Sha512};

use tessera_config::HashAlgorithm;

/// A collision-resistant digest rendered as lowercase hex.
pub trait HashFunction: Send + Sync {
    fn name(&self) -> &'static str;

    /// Length of `digest_hex` output in characters.
    fn hex_len(&self) -> usize;

    fn digest_hex(&self, parts: &[&[u8]]) -> String;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Hash;

impl HashFunction for Sha256Hash {
    fn name(&self) -> &'static str {
        "sha256"
    }

    fn hex_len(&self) -> usize {
        64
    }

    fn digest_hex(&self, parts: &[&[u8]]) -> String {
        let mut hasher = Sha256::new();
        for part in parts {
            hasher.update(part);
        }
        hex::encode(hasher.finalize())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Sha512Hash;

impl HashFunction for Sha512Hash {
    fn name(&self) -> &'static str {
        "sha512"
    }

    fn hex_len(&self) -> usize {
        128
    }

    fn digest_hex(&self, parts: &[&[u8]]) -> String {
        let mut hasher = Sha512::new();
        for part in parts {
            hasher.update(part);
        }
        hex::encode(hasher.finalize())
    }
}

/// The adapter configured by `[hashing] algorithm`.
pub fn hash_function(algorithm: HashAlgorithm) -> Box<dyn HashFunction> {
    match algorithm {
        HashAlgorithm::Sha256 => Box::new(Sha256Hash),
        HashAlgorithm::Sha512 => Box::new(Sha512Hash),
    }
}
