use der::asn1::{BitString, Uint};
use pkcs8::{DecodePrivateKey, EncodePrivateKey, LineEnding};
use rsa::pkcs1::{DecodeRsaPrivateKey, EncodeRsaPrivateKey};
use rsa::traits::PublicKeyParts;
use rsa::{BigUint, RsaPrivateKey, RsaPublicKey};
use sha1::Sha1;

use crate::cert::SignatureAlgorithm;
use crate::codec::{self, Result};
use crate::error::CertForgeError;
use crate::oid;
use crate::tbs_certificate::{AlgorithmIdentifier, RsaPublicKeyDer, SubjectPublicKeyInfo};

/// Smallest RSA modulus [`KeyPair::generate_rsa`] accepts.
pub const MIN_RSA_BITS: usize = 1024;

/// The capability a certificate builder needs from key material.
///
/// The builder hashes the TBS encoding itself and hands only the digest over, so an
/// implementation can live behind an HSM or a remote signer. A returned error is
/// treated as fatal for the certificate being built.
///
/// Implementations are shared across threads that issue concurrently, so they must
/// be `Send + Sync`.
pub trait SigningService: Send + Sync {
    /// The public half, as it will appear in a SubjectPublicKeyInfo.
    fn public_key(&self) -> PublicKey;

    /// Produces a PKCS#1 v1.5 signature over a precomputed `digest` made with
    /// `algorithm`'s hash.
    fn sign_digest(&self, algorithm: SignatureAlgorithm, digest: &[u8]) -> Result<Vec<u8>>;
}

/// An RSA key pair.
#[derive(Clone, Debug)]
pub struct KeyPair {
    private: Box<RsaPrivateKey>,
    public: RsaPublicKey,
}

impl KeyPair {
    /// Generate an RSA key pair with the specified number of bits.
    ///
    /// This is the slow step of building a chain; do it before any certificate work.
    pub fn generate_rsa(bits: usize) -> Result<Self> {
        if bits < MIN_RSA_BITS {
            return Err(CertForgeError::KeyGenerationError(format!(
                "{bits}-bit RSA keys are too small, use at least {MIN_RSA_BITS}"
            )));
        }
        let mut rng = rand_core::OsRng;
        let private = RsaPrivateKey::new(&mut rng, bits)
            .map_err(|e| CertForgeError::KeyGenerationError(e.to_string()))?;
        tracing::debug!(bits, "generated RSA key pair");
        Ok(Self::from_private(private))
    }

    fn from_private(private: RsaPrivateKey) -> Self {
        let public = RsaPublicKey::from(&private);
        Self {
            private: Box::new(private),
            public,
        }
    }

    /// Imports a PKCS#1 `RSAPrivateKey` DER blob.
    pub fn import_from_pkcs1_der(der: &[u8]) -> Result<Self> {
        Ok(Self::from_private(RsaPrivateKey::from_pkcs1_der(der)?))
    }

    /// Exports the private key as a PKCS#1 `RSAPrivateKey` DER blob.
    pub fn export_pkcs1_der(&self) -> Result<Vec<u8>> {
        let doc = self
            .private
            .to_pkcs1_der()
            .map_err(CertForgeError::encoding)?;
        Ok(doc.as_bytes().to_vec())
    }

    /// Imports a PKCS#8 `PRIVATE KEY` PEM document.
    pub fn import_from_pkcs8_pem(pem: &str) -> Result<Self> {
        Ok(Self::from_private(RsaPrivateKey::from_pkcs8_pem(pem)?))
    }

    /// Exports the private key as a PKCS#8 `PRIVATE KEY` PEM document.
    pub fn export_pkcs8_pem(&self) -> Result<String> {
        let pem = self
            .private
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(CertForgeError::encoding)?;
        Ok(pem.to_string())
    }
}

impl SigningService for KeyPair {
    fn public_key(&self) -> PublicKey {
        PublicKey(self.public.clone())
    }

    fn sign_digest(&self, algorithm: SignatureAlgorithm, digest: &[u8]) -> Result<Vec<u8>> {
        self.private
            .sign(algorithm.padding(), digest)
            .map_err(|e| CertForgeError::SigningFailure(e.to_string()))
    }
}

/// An RSA public key: modulus and public exponent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublicKey(RsaPublicKey);

impl PublicKey {
    pub fn from_key_pair(key_pair: &KeyPair) -> Self {
        key_pair.public_key()
    }

    /// Builds a key from big-endian modulus and exponent bytes.
    pub fn from_components(modulus: &[u8], exponent: &[u8]) -> Result<Self> {
        let key = RsaPublicKey::new(BigUint::from_bytes_be(modulus), BigUint::from_bytes_be(exponent))?;
        Ok(Self(key))
    }

    pub fn modulus(&self) -> Vec<u8> {
        self.0.n().to_bytes_be()
    }

    pub fn exponent(&self) -> Vec<u8> {
        self.0.e().to_bytes_be()
    }

    /// Size of the modulus in bits.
    pub fn bits(&self) -> usize {
        self.0.size() * 8
    }

    /// DER encoding of the PKCS#1 `RSAPublicKey` structure.
    pub fn to_pkcs1_der(&self) -> Result<Vec<u8>> {
        codec::encode(&RsaPublicKeyDer {
            modulus: Uint::new(&self.modulus()).map_err(CertForgeError::encoding)?,
            public_exponent: Uint::new(&self.exponent()).map_err(CertForgeError::encoding)?,
        })
    }

    /// Wraps the key in an `rsaEncryption` SubjectPublicKeyInfo.
    pub fn to_spki(&self) -> Result<SubjectPublicKeyInfo> {
        Ok(SubjectPublicKeyInfo {
            algorithm: AlgorithmIdentifier::with_null_parameters(oid::RSA_ENCRYPTION)?,
            subject_public_key: BitString::from_bytes(&self.to_pkcs1_der()?)
                .map_err(CertForgeError::encoding)?,
        })
    }

    /// Reads the key back out of an `rsaEncryption` SubjectPublicKeyInfo.
    pub fn from_spki(spki: &SubjectPublicKeyInfo) -> Result<Self> {
        if spki.algorithm.oid != oid::RSA_ENCRYPTION {
            return Err(CertForgeError::InvalidInput(format!(
                "unsupported public key algorithm {}",
                oid::name_of(&spki.algorithm.oid)
            )));
        }
        let bytes = spki.subject_public_key.as_bytes().ok_or_else(|| {
            CertForgeError::malformed("public key BIT STRING has unused bits")
        })?;
        let der: RsaPublicKeyDer = codec::decode(bytes)?;
        Self::from_components(der.modulus.as_bytes(), der.public_exponent.as_bytes())
    }

    /// SHA-1 over the SubjectPublicKeyInfo BIT STRING contents, the conventional
    /// key identifier (RFC 5280 Section 4.2.1.2, method 1).
    pub fn key_identifier(&self) -> Result<Vec<u8>> {
        let spki = self.to_spki()?;
        Ok(key_identifier_of(&spki))
    }

    /// Checks `signature` over `message` with `algorithm`.
    pub fn verify(
        &self,
        algorithm: SignatureAlgorithm,
        message: &[u8],
        signature: &[u8],
    ) -> Result<()> {
        let digest = algorithm.digest(message);
        self.0
            .verify(algorithm.padding(), &digest, signature)
            .map_err(|e| CertForgeError::VerificationFailure(e.to_string()))
    }
}

/// SHA-1 of the raw SubjectPublicKeyInfo BIT STRING contents.
pub fn key_identifier_of(spki: &SubjectPublicKeyInfo) -> Vec<u8> {
    <Sha1 as sha1::Digest>::digest(spki.subject_public_key.raw_bytes()).to_vec()
}
