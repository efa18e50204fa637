use cimbar_crypto::CryptoError;
use cimbar_decode::PipelineError;
use cimbar_ecc::{InterleaveError, RsError};
use cimbar_locate::LocateError;
use cimbar_scan::{AssembleError, PayloadError};

/// Every way a decode can fail at the public boundary.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("no barcode found in the input")]
    BarcodeNotFound,
    #[error("no supported frame size matched the input")]
    FrameSizeMismatch,
    #[error("Reed-Solomon decoding failed")]
    RsUncorrectable,
    #[error("bad envelope magic")]
    BadMagic,
    #[error("unsupported envelope version {0}")]
    UnsupportedVersion(u8),
    #[error("wrong passphrase or corrupted data")]
    AuthFailed,
    #[error("payload is truncated")]
    Truncated,
    #[error("frame chain is incomplete")]
    ChainIncomplete,
    #[cfg(feature = "image")]
    #[error("unreadable input image: {0}")]
    BadImage(String),
}

impl From<LocateError> for DecodeError {
    fn from(_: LocateError) -> Self {
        DecodeError::BarcodeNotFound
    }
}

impl From<PipelineError> for DecodeError {
    fn from(_: PipelineError) -> Self {
        DecodeError::FrameSizeMismatch
    }
}

impl From<RsError> for DecodeError {
    fn from(_: RsError) -> Self {
        DecodeError::RsUncorrectable
    }
}

impl From<InterleaveError> for DecodeError {
    fn from(_: InterleaveError) -> Self {
        DecodeError::RsUncorrectable
    }
}

impl From<CryptoError> for DecodeError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::TooShort(_) => DecodeError::Truncated,
            CryptoError::BadMagic => DecodeError::BadMagic,
            CryptoError::UnsupportedVersion(v) => DecodeError::UnsupportedVersion(v),
            CryptoError::AuthFailed => DecodeError::AuthFailed,
        }
    }
}

impl From<PayloadError> for DecodeError {
    fn from(err: PayloadError) -> Self {
        match err {
            PayloadError::Truncated | PayloadError::InvalidFilename => DecodeError::Truncated,
            PayloadError::Crypto(inner) => inner.into(),
        }
    }
}

impl From<AssembleError> for DecodeError {
    fn from(_: AssembleError) -> Self {
        DecodeError::ChainIncomplete
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crypto_errors_map_to_their_exit_codes() {
        assert_eq!(DecodeError::from(CryptoError::TooShort(3)), DecodeError::Truncated);
        assert_eq!(DecodeError::from(CryptoError::BadMagic), DecodeError::BadMagic);
        assert_eq!(
            DecodeError::from(CryptoError::UnsupportedVersion(2)),
            DecodeError::UnsupportedVersion(2)
        );
        assert_eq!(DecodeError::from(CryptoError::AuthFailed), DecodeError::AuthFailed);
    }

    #[test]
    fn assembly_errors_collapse_to_chain_incomplete() {
        assert_eq!(
            DecodeError::from(AssembleError::IncompleteChain { have: 1, need: 3 }),
            DecodeError::ChainIncomplete
        );
        assert_eq!(
            DecodeError::from(AssembleError::CycleDetected),
            DecodeError::ChainIncomplete
        );
    }
}
