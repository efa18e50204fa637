//! Envelope encryption for cimbar payloads.
//!
//! The wire envelope is byte-exact across implementations:
//! `0xCB 0x42 | version | reserved | salt[16] | iv[12] | ciphertext || tag[16]`.
//! Keys are derived with PBKDF2-HMAC-SHA256; the AEAD is AES-256-GCM with a
//! 96-bit nonce, a 128-bit appended tag and empty associated data.

mod envelope;
mod strength;

pub use envelope::{
    decrypt, encrypt, CryptoError, ENVELOPE_MAGIC, ENVELOPE_VERSION, IV_LEN, MIN_ENVELOPE_LEN,
    PBKDF2_ITERATIONS, SALT_LEN, TAG_LEN,
};
pub use strength::strength_score;
