use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Nonce};
use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;

/// First two envelope bytes.
pub const ENVELOPE_MAGIC: [u8; 2] = [0xcb, 0x42];
/// Only supported envelope version.
pub const ENVELOPE_VERSION: u8 = 0x01;
/// PBKDF2 salt length in bytes.
pub const SALT_LEN: usize = 16;
/// AES-GCM nonce length in bytes.
pub const IV_LEN: usize = 12;
/// AES-GCM authentication tag length in bytes.
pub const TAG_LEN: usize = 16;
/// Header + salt + iv + tag: the shortest well-formed envelope.
pub const MIN_ENVELOPE_LEN: usize = 4 + SALT_LEN + IV_LEN + TAG_LEN;

/// Fixed by the wire format; not negotiated between peers.
pub const PBKDF2_ITERATIONS: u32 = 150_000;

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CryptoError {
    #[error("envelope of {0} bytes is shorter than the {MIN_ENVELOPE_LEN}-byte minimum")]
    TooShort(usize),
    #[error("bad envelope magic")]
    BadMagic,
    #[error("unsupported envelope version {0}")]
    UnsupportedVersion(u8),
    /// Wrong passphrase, tampered ciphertext and a truncated tag are
    /// deliberately indistinguishable to callers.
    #[error("authentication failed")]
    AuthFailed,
}

fn derive_key(passphrase: &str, salt: &[u8]) -> [u8; 32] {
    let mut key = [0u8; 32];
    pbkdf2_hmac::<Sha256>(passphrase.as_bytes(), salt, PBKDF2_ITERATIONS, &mut key);
    key
}

/// Seal `plaintext` into a wire envelope with a fresh salt and nonce.
pub fn encrypt(plaintext: &[u8], passphrase: &str) -> Result<Vec<u8>, CryptoError> {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    let mut iv = [0u8; IV_LEN];
    OsRng.fill_bytes(&mut iv);

    let key = derive_key(passphrase, &salt);
    let cipher = Aes256Gcm::new_from_slice(&key).map_err(|_| CryptoError::AuthFailed)?;
    let sealed = cipher
        .encrypt(Nonce::from_slice(&iv), plaintext)
        .map_err(|_| CryptoError::AuthFailed)?;

    let mut out = Vec::with_capacity(MIN_ENVELOPE_LEN + plaintext.len());
    out.extend_from_slice(&ENVELOPE_MAGIC);
    out.push(ENVELOPE_VERSION);
    out.push(0x00);
    out.extend_from_slice(&salt);
    out.extend_from_slice(&iv);
    out.extend_from_slice(&sealed);
    Ok(out)
}

/// Open a wire envelope. Header problems surface individually; anything
/// that fails the AEAD comes back as [`CryptoError::AuthFailed`].
pub fn decrypt(envelope: &[u8], passphrase: &str) -> Result<Vec<u8>, CryptoError> {
    if envelope.len() < MIN_ENVELOPE_LEN {
        return Err(CryptoError::TooShort(envelope.len()));
    }
    if envelope[..2] != ENVELOPE_MAGIC {
        return Err(CryptoError::BadMagic);
    }
    if envelope[2] != ENVELOPE_VERSION {
        return Err(CryptoError::UnsupportedVersion(envelope[2]));
    }

    let salt = &envelope[4..4 + SALT_LEN];
    let iv = &envelope[4 + SALT_LEN..4 + SALT_LEN + IV_LEN];
    let sealed = &envelope[4 + SALT_LEN + IV_LEN..];

    let key = derive_key(passphrase, salt);
    let cipher = Aes256Gcm::new_from_slice(&key).map_err(|_| CryptoError::AuthFailed)?;
    cipher
        .decrypt(Nonce::from_slice(iv), sealed)
        .map_err(|_| CryptoError::AuthFailed)
}
