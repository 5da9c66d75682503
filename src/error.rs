//! Error types shared by every module.

use thiserror::Error;

/// Represents errors that can occur while building, encoding or decoding certificates.
///
/// Every failure is returned to the caller. Nothing in the crate retries: signing and
/// encoding are deterministic for valid input, so a failure points at a defect in the
/// input or the key material.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CertForgeError {
    /// A field value is not valid for its ASN.1 type (zero serial, empty name,
    /// inverted validity window, ...).
    #[error("Failed to encode data: {0}")]
    EncodingFailure(String),

    /// Input bytes could not be decoded into the expected structure.
    #[error("Failed to decode data: {0}")]
    DecodingFailure(#[from] DecodingFailure),

    /// A leaf certificate was requested but the issuer has no subject key identifier.
    #[error("Issuer has no subject key identifier to reference")]
    MissingIssuerIdentifier,

    /// The signing service reported a fault.
    #[error("Signing failed: {0}")]
    SigningFailure(String),

    /// The requested extensions contradict the extension policy.
    #[error("Extension policy violation: {0}")]
    PolicyViolation(String),

    /// A signature did not verify against the expected public key.
    #[error("Signature verification failed: {0}")]
    VerificationFailure(String),

    /// Error during key generation.
    #[error("Key generation error: {0}")]
    KeyGenerationError(String),

    /// Error due to invalid input.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Why a byte sequence could not be decoded.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodingFailure {
    /// A tag, length or nested structure did not match the expected schema.
    #[error("malformed encoding: {0}")]
    MalformedEncoding(String),

    /// Fewer bytes are present than the encoding declares.
    #[error("truncated input: {expected} bytes declared, {available} available")]
    TruncatedInput { expected: usize, available: usize },
}

impl CertForgeError {
    pub(crate) fn encoding(err: impl std::fmt::Display) -> Self {
        CertForgeError::EncodingFailure(err.to_string())
    }

    pub(crate) fn malformed(err: impl std::fmt::Display) -> Self {
        CertForgeError::DecodingFailure(DecodingFailure::MalformedEncoding(err.to_string()))
    }
}

impl From<der::Error> for CertForgeError {
    /// Converts a `der::Error` raised while decoding into a `CertForgeError`.
    fn from(err: der::Error) -> Self {
        match err.kind() {
            der::ErrorKind::Incomplete {
                expected_len,
                actual_len,
            } => DecodingFailure::TruncatedInput {
                expected: usize::try_from(expected_len).unwrap_or(usize::MAX),
                available: usize::try_from(actual_len).unwrap_or_default(),
            }
            .into(),
            _ => CertForgeError::malformed(err),
        }
    }
}

impl From<rsa::Error> for CertForgeError {
    fn from(err: rsa::Error) -> Self {
        CertForgeError::InvalidInput(err.to_string())
    }
}

impl From<rsa::pkcs1::Error> for CertForgeError {
    fn from(err: rsa::pkcs1::Error) -> Self {
        CertForgeError::malformed(err)
    }
}

impl From<pkcs8::Error> for CertForgeError {
    fn from(err: pkcs8::Error) -> Self {
        CertForgeError::malformed(err)
    }
}

impl From<pem::PemError> for CertForgeError {
    fn from(err: pem::PemError) -> Self {
        CertForgeError::malformed(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_incomplete_der_maps_to_truncated_input() {
        let err = der::Error::new(
            der::ErrorKind::Incomplete {
                expected_len: der::Length::new(10),
                actual_len: der::Length::new(4),
            },
            der::Length::ZERO,
        );
        assert_eq!(
            CertForgeError::from(err),
            CertForgeError::DecodingFailure(DecodingFailure::TruncatedInput {
                expected: 10,
                available: 4,
            })
        );
    }

    #[test]
    fn test_other_der_errors_are_malformed() {
        let err = der::Error::from(der::ErrorKind::TrailingData {
            decoded: der::Length::new(2),
            remaining: der::Length::new(1),
        });
        assert!(matches!(
            CertForgeError::from(err),
            CertForgeError::DecodingFailure(DecodingFailure::MalformedEncoding(_))
        ));
    }
}
