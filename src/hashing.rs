//! Token hashing and base58 encoding.
//!
//! Raw capability tokens are 64 uniformly random bytes. They are
//! handed to clients as base58 text and indexed internally by
//! `sha256d` of the raw bytes.

use crate::error::{Error, Result};
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Number of random bytes in a raw capability token.
pub const TOKEN_LEN: usize = 64;

/// `SHA-256(SHA-256(x))`.
pub fn sha256d(bytes: &[u8]) -> [u8; 32] {
    let first = Sha256::digest(bytes);
    let second = Sha256::digest(first);
    second.into()
}

/// Generate a fresh raw token using the OS RNG.
pub fn generate_raw_token() -> [u8; TOKEN_LEN] {
    let mut buf = [0u8; TOKEN_LEN];
    rand::rngs::OsRng.fill_bytes(&mut buf);
    buf
}

/// Encode a raw token as base58 text for the client.
pub fn encode_token(raw: &[u8]) -> String {
    bs58::encode(raw).into_string()
}

/// Decode a base58 token string back to raw bytes.
///
/// Does not enforce [`TOKEN_LEN`] on its own; callers that need the
/// canonical 64-byte shape should check the decoded length.
pub fn decode_token(token: &str) -> Result<Vec<u8>> {
    bs58::decode(token)
        .into_vec()
        .map_err(|_| Error::TokenInvalid)
}

/// Decode a base58 token and hash it in one step. This is the
/// operation every authenticated endpoint performs on its `token`
/// field.
pub fn hash_token(token: &str) -> Result<[u8; 32]> {
    let raw = decode_token(token)?;
    Ok(sha256d(&raw))
}
