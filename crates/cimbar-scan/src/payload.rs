//! Assembled payload -> decrypted file.

use cimbar_core::read_be32;
use cimbar_crypto::{decrypt, CryptoError};

/// A recovered file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodeResult {
    pub filename: String,
    pub data: Vec<u8>,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PayloadError {
    #[error("payload stream is truncated")]
    Truncated,
    #[error("embedded filename is not valid UTF-8")]
    InvalidFilename,
    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

/// Open an assembled frame stream: length prefix, envelope, filename
/// framing, file bytes.
pub fn decode_payload(stream: &[u8], passphrase: &str) -> Result<DecodeResult, PayloadError> {
    let payload_len = read_be32(stream).ok_or(PayloadError::Truncated)? as usize;
    let envelope = stream
        .get(4..4 + payload_len)
        .ok_or(PayloadError::Truncated)?;

    let plaintext = decrypt(envelope, passphrase)?;

    let name_len = read_be32(&plaintext).ok_or(PayloadError::Truncated)? as usize;
    let name = plaintext
        .get(4..4 + name_len)
        .ok_or(PayloadError::Truncated)?;
    let filename = std::str::from_utf8(name)
        .map_err(|_| PayloadError::InvalidFilename)?
        .to_owned();
    let data = plaintext[4 + name_len..].to_vec();

    Ok(DecodeResult { filename, data })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cimbar_render::encode_payload;

    #[test]
    fn round_trips_an_encoded_file() {
        let payload = encode_payload("hello.txt", b"Hello, CimBar!", "test123").unwrap();
        let result = decode_payload(&payload, "test123").unwrap();
        assert_eq!(result.filename, "hello.txt");
        assert_eq!(result.data, b"Hello, CimBar!");
    }

    #[test]
    fn trailing_frame_padding_is_ignored() {
        let mut payload = encode_payload("x.bin", &[9u8; 100], "pw").unwrap();
        payload.extend_from_slice(&[0u8; 500]);
        let result = decode_payload(&payload, "pw").unwrap();
        assert_eq!(result.data, vec![9u8; 100]);
    }

    #[test]
    fn wrong_passphrase_surfaces_auth_failure() {
        let payload = encode_payload("s.txt", b"secret", "correct-password").unwrap();
        assert_eq!(
            decode_payload(&payload, "wrong-password"),
            Err(PayloadError::Crypto(CryptoError::AuthFailed))
        );
    }

    #[test]
    fn truncated_streams_are_rejected() {
        let payload = encode_payload("t.txt", b"data", "pw").unwrap();
        assert_eq!(
            decode_payload(&payload[..payload.len() - 10], "pw"),
            Err(PayloadError::Truncated)
        );
        assert_eq!(decode_payload(&[0, 0], "pw"), Err(PayloadError::Truncated));
    }

    #[test]
    fn unicode_filenames_survive() {
        let payload = encode_payload("résumé-π.pdf", b"bytes", "pw").unwrap();
        let result = decode_payload(&payload, "pw").unwrap();
        assert_eq!(result.filename, "résumé-π.pdf");
    }
}
