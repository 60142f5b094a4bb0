//! Tenant credential hashing
//!
//! API keys are stored only as SHA-256 hex digests; lookup happens by
//! digest so the plaintext key never reaches the store.

use sha2::{Digest, Sha256};

/// Hash an API key to its stored form
pub fn hash_credential(api_key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(api_key.as_bytes());
    format!("{:x}", hasher.finalize())
}
