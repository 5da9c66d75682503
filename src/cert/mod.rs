pub mod extensions;
pub mod params;

use der::Sequence;
use der::asn1::BitString;
use der::oid::ObjectIdentifier;
use rsa::Pkcs1v15Sign;
use sha2::{Digest, Sha256, Sha384, Sha512};

use crate::codec::{self, Result};
use crate::error::CertForgeError;
use crate::issuer::Issuer;
use crate::key::{KeyPair, PublicKey, SigningService};
use crate::oid;
use crate::pem_utils;
use crate::tbs_certificate::{AlgorithmIdentifier, Extension, Name, TbsCertificate};
use extensions::{
    AuthorityKeyIdentifier, BasicConstraints, KeyUsage, KeyUsages, ParsedExtension,
    SubjectKeyIdentifier, ToAndFromX509Extension,
};
use params::{CertificateParams, DistinguishedName};

/// Represents the supported signature algorithms for certificates.
///
/// All of them are RSASSA-PKCS1-v1_5; they differ in the digest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SignatureAlgorithm {
    /// SHA-256 with RSA encryption.
    #[default]
    Sha256WithRsa,
    /// SHA-384 with RSA encryption.
    Sha384WithRsa,
    /// SHA-512 with RSA encryption.
    Sha512WithRsa,
}

impl SignatureAlgorithm {
    pub fn oid(self) -> ObjectIdentifier {
        match self {
            SignatureAlgorithm::Sha256WithRsa => oid::SHA_256_WITH_RSA_ENCRYPTION,
            SignatureAlgorithm::Sha384WithRsa => oid::SHA_384_WITH_RSA_ENCRYPTION,
            SignatureAlgorithm::Sha512WithRsa => oid::SHA_512_WITH_RSA_ENCRYPTION,
        }
    }

    pub fn from_oid(oid: &ObjectIdentifier) -> Result<Self> {
        [
            SignatureAlgorithm::Sha256WithRsa,
            SignatureAlgorithm::Sha384WithRsa,
            SignatureAlgorithm::Sha512WithRsa,
        ]
        .into_iter()
        .find(|algorithm| algorithm.oid() == *oid)
        .ok_or_else(|| {
            CertForgeError::InvalidInput(format!(
                "unsupported signature algorithm {}",
                oid::name_of(oid)
            ))
        })
    }

    /// The AlgorithmIdentifier with the NULL parameters RFC 4055 requires.
    pub fn algorithm_identifier(self) -> Result<AlgorithmIdentifier> {
        AlgorithmIdentifier::with_null_parameters(self.oid())
    }

    /// Hashes `message` with this algorithm's digest.
    pub fn digest(self, message: &[u8]) -> Vec<u8> {
        match self {
            SignatureAlgorithm::Sha256WithRsa => Sha256::digest(message).to_vec(),
            SignatureAlgorithm::Sha384WithRsa => Sha384::digest(message).to_vec(),
            SignatureAlgorithm::Sha512WithRsa => Sha512::digest(message).to_vec(),
        }
    }

    pub(crate) fn padding(self) -> Pkcs1v15Sign {
        match self {
            SignatureAlgorithm::Sha256WithRsa => Pkcs1v15Sign::new::<Sha256>(),
            SignatureAlgorithm::Sha384WithRsa => Pkcs1v15Sign::new::<Sha384>(),
            SignatureAlgorithm::Sha512WithRsa => Pkcs1v15Sign::new::<Sha512>(),
        }
    }
}

/// Represents an X.509 certificate.
///
/// ```text
/// Certificate ::= SEQUENCE {
///     tbsCertificate       TBSCertificate,
///     signatureAlgorithm   AlgorithmIdentifier,
///     signature            BIT STRING
/// }
/// ```
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct Certificate {
    pub tbs_certificate: TbsCertificate,
    pub signature_algorithm: AlgorithmIdentifier,
    pub signature: BitString,
}

impl Certificate {
    /// Encodes the certificate into DER format.
    pub fn to_der(&self) -> Result<Vec<u8>> {
        codec::encode(self)
    }

    /// Decodes a DER certificate. The input must hold exactly one certificate.
    pub fn from_der(der: &[u8]) -> Result<Self> {
        codec::decode(der)
    }

    /// Encodes the certificate into PEM format.
    pub fn to_pem(&self) -> Result<String> {
        Ok(pem_utils::der_to_pem(&self.to_der()?, pem_utils::CERTIFICATE_LABEL))
    }

    pub fn from_pem(pem: &str) -> Result<Self> {
        Self::from_der(&pem_utils::pem_to_der(pem, pem_utils::CERTIFICATE_LABEL)?)
    }

    pub fn subject(&self) -> &Name {
        &self.tbs_certificate.subject
    }

    pub fn issuer(&self) -> &Name {
        &self.tbs_certificate.issuer
    }

    pub fn subject_public_key(&self) -> Result<PublicKey> {
        PublicKey::from_spki(&self.tbs_certificate.subject_public_key_info)
    }

    /// The subject as a [`DistinguishedName`].
    pub fn subject_dn(&self) -> DistinguishedName {
        DistinguishedName::from_name(self.subject())
    }

    pub fn extension(&self, oid: &ObjectIdentifier) -> Option<&Extension> {
        self.tbs_certificate.extension(oid)
    }

    fn decoded_extension<E: ToAndFromX509Extension>(&self) -> Result<Option<E>> {
        self.extension(&E::OID)
            .map(|ext| E::from_x509_extension_value(ext.extn_value.as_bytes()))
            .transpose()
    }

    pub fn basic_constraints(&self) -> Result<Option<BasicConstraints>> {
        self.decoded_extension()
    }

    pub fn key_usage(&self) -> Result<Option<KeyUsage>> {
        self.decoded_extension()
    }

    pub fn subject_key_identifier(&self) -> Result<Option<SubjectKeyIdentifier>> {
        self.decoded_extension()
    }

    pub fn authority_key_identifier(&self) -> Result<Option<AuthorityKeyIdentifier>> {
        self.decoded_extension()
    }

    /// Decodes every extension, in certificate order.
    pub fn parsed_extensions(&self) -> Result<Vec<ParsedExtension>> {
        self.tbs_certificate
            .extensions
            .iter()
            .flatten()
            .map(ParsedExtension::from_extension)
            .collect()
    }

    /// A certificate is a CA when Basic Constraints asserts `cA`.
    pub fn is_ca(&self) -> Result<bool> {
        Ok(self.basic_constraints()?.is_some_and(|bc| bc.is_ca))
    }

    /// Checks the signature over the TBS encoding against `public_key`.
    pub fn verify_signature(&self, public_key: &PublicKey) -> Result<()> {
        if self.signature_algorithm != self.tbs_certificate.signature {
            return Err(CertForgeError::VerificationFailure(
                "outer signature algorithm differs from the TBS signature field".to_string(),
            ));
        }
        let algorithm = SignatureAlgorithm::from_oid(&self.signature_algorithm.oid)?;
        let signature = self
            .signature
            .as_bytes()
            .ok_or_else(|| CertForgeError::malformed("signature BIT STRING has unused bits"))?;
        let tbs_der = self.tbs_certificate.to_der()?;
        public_key
            .verify(algorithm, &tbs_der, signature)
            .inspect_err(|err| {
                tracing::warn!(subject = %self.subject(), %err, "certificate signature did not verify");
            })
    }

    /// Checks that `issuer` issued this certificate: names chain, key identifiers
    /// agree when both are present, and the signature verifies under the issuer key.
    pub fn verify_issued_by(&self, issuer: &Certificate) -> Result<()> {
        if self.issuer() != issuer.subject() {
            return Err(CertForgeError::VerificationFailure(format!(
                "issuer {} does not match {}",
                self.issuer(),
                issuer.subject()
            )));
        }
        if let (Some(aki), Some(ski)) = (
            self.authority_key_identifier()?,
            issuer.subject_key_identifier()?,
        ) {
            if aki.key_identifier != ski.0 {
                return Err(CertForgeError::VerificationFailure(
                    "authority key identifier does not match issuer subject key identifier"
                        .to_string(),
                ));
            }
        }
        self.verify_signature(&issuer.subject_public_key()?)
    }

    /// Issuer equals subject and the certificate verifies under its own key.
    pub fn is_self_signed(&self) -> bool {
        self.verify_issued_by(self).is_ok()
    }

    /// Creates a new self-signed certificate.
    ///
    /// The issuer name is the subject name and `key` signs. `key` must be the key
    /// named by `params.subject_public_key`.
    pub fn new_self_signed(params: &CertificateParams, key: &KeyPair) -> Result<Self> {
        if params.subject_public_key != key.public_key() {
            return Err(CertForgeError::InvalidInput(
                "self-signed certificate must be signed by the subject key".to_string(),
            ));
        }
        let self_issuer = SelfIssuer {
            name: params.subject.as_name()?,
            key,
        };
        self_issuer.issue(params)
    }
}

// Helper struct for self-signed certificates
struct SelfIssuer<'a> {
    name: Name,
    key: &'a KeyPair,
}

impl Issuer for SelfIssuer<'_> {
    fn issuer_name(&self) -> Result<Name> {
        Ok(self.name.clone())
    }

    fn signing_key(&self) -> &dyn SigningService {
        self.key
    }

    fn key_identifier(&self) -> Result<Option<Vec<u8>>> {
        self.key.public_key().key_identifier().map(Some)
    }
}

/// A CA certificate together with the key it certifies.
#[derive(Debug, Clone)]
pub struct CertificateWithPrivateKey {
    pub cert: Certificate,
    pub key: KeyPair,
}

impl CertificateWithPrivateKey {
    /// Pairs `cert` with `key`, failing when the key is not the one the certificate
    /// certifies.
    pub fn new(cert: Certificate, key: KeyPair) -> Result<Self> {
        let pair = Self { cert, key };
        pair.check_key_matches()?;
        Ok(pair)
    }

    fn check_key_matches(&self) -> Result<()> {
        if self.cert.subject_public_key()? != self.key.public_key() {
            return Err(CertForgeError::InvalidInput(format!(
                "private key does not belong to certificate {}",
                self.cert.subject()
            )));
        }
        Ok(())
    }
}

impl Issuer for CertificateWithPrivateKey {
    fn issuer_name(&self) -> Result<Name> {
        // The name of the issuer is the subject of the certificate
        Ok(self.cert.subject().clone())
    }

    fn signing_key(&self) -> &dyn SigningService {
        &self.key
    }

    fn key_identifier(&self) -> Result<Option<Vec<u8>>> {
        Ok(self.cert.subject_key_identifier()?.map(|ski| ski.0))
    }

    fn ensure_can_issue(&self) -> Result<()> {
        self.check_key_matches()?;
        if !self.cert.is_ca()? {
            return Err(CertForgeError::PolicyViolation(format!(
                "{} is not a CA certificate",
                self.cert.subject()
            )));
        }
        if let Some(ku) = self.cert.key_usage()? {
            if !ku.contains(KeyUsages::KeyCertSign) {
                return Err(CertForgeError::PolicyViolation(format!(
                    "{} may not sign certificates",
                    self.cert.subject()
                )));
            }
        }
        Ok(())
    }
}
