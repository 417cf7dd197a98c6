//! Commitment hashing.
//!
//! Layout matches Solidity `keccak256(abi.encodePacked(uint256 option, bytes32 salt))`.

use sha3::{Digest, Keccak256};

use crate::entities::{Hash, Salt};

/// Keccak-256 of `data`.
pub fn keccak256(data: &[u8]) -> Hash {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Hash committed for `(option, salt)`.
pub fn commitment_hash(option: u32, salt: &Salt) -> Hash {
    let mut preimage = [0u8; 64];
    preimage[28..32].copy_from_slice(&option.to_be_bytes());
    preimage[32..].copy_from_slice(salt);
    keccak256(&preimage)
}
