use der::asn1::{BitString, OctetString};
use der::flagset::{FlagSet, flags};
use der::oid::ObjectIdentifier;
use der::Sequence;

use super::params::{ExtensionParam, ExtensionPolicy};
use crate::codec::{self, Result};
use crate::error::CertForgeError;
use crate::key::key_identifier_of;
use crate::oid::{self, ExtensionKind};
use crate::tbs_certificate::{Extension, SubjectPublicKeyInfo};

/// Trait for converting to and from X.509 extensions.
///
/// This trait provides methods to encode and decode X.509 extension values.
///
/// # Example
/// ```
/// use certforge::cert::extensions::{BasicConstraints, ToAndFromX509Extension};
/// let bc = BasicConstraints { is_ca: true, max_path_length: Some(0) };
/// let encoded = bc.to_x509_extension_value().unwrap();
/// assert_eq!(encoded, [0x30, 0x06, 0x01, 0x01, 0xff, 0x02, 0x01, 0x00]);
/// let decoded = BasicConstraints::from_x509_extension_value(&encoded).unwrap();
/// assert_eq!(bc, decoded);
/// ```
pub trait ToAndFromX509Extension {
    /// The Object Identifier (OID) for the extension.
    const OID: ObjectIdentifier;

    /// Encodes the extension into a DER-encoded byte vector.
    fn to_x509_extension_value(&self) -> Result<Vec<u8>>;

    /// Decodes the extension from a DER-encoded byte slice.
    fn from_x509_extension_value(extension: &[u8]) -> Result<Self>
    where
        Self: Sized;
}

/// Represents the Basic Constraints extension.
///
/// ```text
/// BasicConstraints ::= SEQUENCE {
///     cA                      BOOLEAN DEFAULT FALSE,
///     pathLenConstraint       INTEGER (0..MAX) OPTIONAL }
/// ```
///
/// # Fields
/// * `is_ca` - Indicates if the certificate is a CA.
/// * `max_path_length` - The maximum number of intermediate CAs allowed below this one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Sequence)]
pub struct BasicConstraints {
    #[asn1(default = "Default::default")]
    pub is_ca: bool,
    pub max_path_length: Option<u8>,
}

impl ToAndFromX509Extension for BasicConstraints {
    const OID: ObjectIdentifier = oid::BASIC_CONSTRAINTS;

    fn to_x509_extension_value(&self) -> Result<Vec<u8>> {
        if self.max_path_length.is_some() && !self.is_ca {
            return Err(CertForgeError::EncodingFailure(
                "pathLenConstraint is only meaningful when cA is set".to_string(),
            ));
        }
        codec::encode(self)
    }

    fn from_x509_extension_value(der_bytes: &[u8]) -> Result<Self> {
        codec::decode(der_bytes)
    }
}

flags! {
    /// Key usage bits, numbered as in RFC 5280 Section 4.2.1.3.
    pub enum KeyUsages: u16 {
        DigitalSignature = 1 << 0,
        NonRepudiation = 1 << 1,
        KeyEncipherment = 1 << 2,
        DataEncipherment = 1 << 3,
        KeyAgreement = 1 << 4,
        KeyCertSign = 1 << 5,
        CRLSign = 1 << 6,
        EncipherOnly = 1 << 7,
        DecipherOnly = 1 << 8,
    }
}

/// Represents the Key Usage extension.
///
/// Bit `n` of the flag set is bit `n` of the BIT STRING, counted from the most
/// significant bit of the first octet. Trailing zero bits are dropped on encode, so
/// the unused-bits count always points just past the highest asserted usage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyUsage(pub FlagSet<KeyUsages>);

impl KeyUsage {
    pub fn contains(&self, usage: KeyUsages) -> bool {
        self.0.contains(usage)
    }

    fn to_bit_string(self) -> Result<BitString> {
        let bits = self.0.bits();
        if bits == 0 {
            return Err(CertForgeError::EncodingFailure(
                "key usage must assert at least one bit".to_string(),
            ));
        }
        let used = (u16::BITS - bits.leading_zeros()) as usize;
        let mut bytes = vec![0u8; used.div_ceil(8)];
        for bit in 0..used {
            if bits & (1 << bit) != 0 {
                bytes[bit / 8] |= 0x80 >> (bit % 8);
            }
        }
        let unused_bits = (bytes.len() * 8 - used) as u8;
        BitString::new(unused_bits, bytes).map_err(CertForgeError::encoding)
    }

    fn from_bit_string(bit_string: &BitString) -> Result<Self> {
        let mut bits = 0u16;
        let mut last_set = None;
        for (index, set) in bit_string.bits().enumerate() {
            if !set {
                continue;
            }
            if index >= 9 {
                return Err(CertForgeError::malformed(format!(
                    "unknown key usage bit {index}"
                )));
            }
            bits |= 1 << index;
            last_set = Some(index);
        }
        if last_set.map(|i| i + 1) != Some(bit_string.bit_len()) {
            return Err(CertForgeError::malformed(
                "key usage BIT STRING is empty or not trimmed",
            ));
        }
        let flags = FlagSet::new(bits)
            .map_err(|_| CertForgeError::malformed(format!("invalid key usage bits {bits:#x}")))?;
        Ok(Self(flags))
    }
}

impl ToAndFromX509Extension for KeyUsage {
    const OID: ObjectIdentifier = oid::KEY_USAGE;

    fn to_x509_extension_value(&self) -> Result<Vec<u8>> {
        codec::encode(&self.to_bit_string()?)
    }

    fn from_x509_extension_value(extension: &[u8]) -> Result<Self> {
        let bit_string: BitString = codec::decode(extension)?;
        Self::from_bit_string(&bit_string)
    }
}

/// Represents the Subject Key Identifier extension: `KeyIdentifier ::= OCTET STRING`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectKeyIdentifier(pub Vec<u8>);

impl SubjectKeyIdentifier {
    /// SHA-1 of the SubjectPublicKeyInfo BIT STRING contents.
    pub fn from_spki(spki: &SubjectPublicKeyInfo) -> Self {
        Self(key_identifier_of(spki))
    }
}

impl ToAndFromX509Extension for SubjectKeyIdentifier {
    const OID: ObjectIdentifier = oid::SUBJECT_KEY_IDENTIFIER;

    fn to_x509_extension_value(&self) -> Result<Vec<u8>> {
        codec::encode(&OctetString::new(self.0.clone()).map_err(CertForgeError::encoding)?)
    }

    fn from_x509_extension_value(extension: &[u8]) -> Result<Self> {
        let octets: OctetString = codec::decode(extension)?;
        Ok(Self(octets.into_bytes()))
    }
}

#[derive(Sequence)]
struct AuthorityKeyIdentifierDer {
    #[asn1(context_specific = "0", tag_mode = "IMPLICIT", optional = "true")]
    key_identifier: Option<OctetString>,
}

/// Represents the Authority Key Identifier extension.
///
/// ```text
/// AuthorityKeyIdentifier ::= SEQUENCE {
///     keyIdentifier             [0] KeyIdentifier           OPTIONAL,
///     authorityCertIssuer       [1] GeneralNames            OPTIONAL,
///     authorityCertSerialNumber [2] CertificateSerialNumber OPTIONAL  }
/// ```
///
/// Only `keyIdentifier` is produced; it carries the issuer's subject key identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorityKeyIdentifier {
    pub key_identifier: Vec<u8>,
}

impl ToAndFromX509Extension for AuthorityKeyIdentifier {
    const OID: ObjectIdentifier = oid::AUTHORITY_KEY_IDENTIFIER;

    fn to_x509_extension_value(&self) -> Result<Vec<u8>> {
        let aki = AuthorityKeyIdentifierDer {
            key_identifier: Some(
                OctetString::new(self.key_identifier.clone()).map_err(CertForgeError::encoding)?,
            ),
        };
        codec::encode(&aki)
    }

    fn from_x509_extension_value(extension: &[u8]) -> Result<Self> {
        let aki: AuthorityKeyIdentifierDer = codec::decode(extension)?;
        let key_identifier = aki
            .key_identifier
            .ok_or_else(|| CertForgeError::malformed("authority key identifier has no keyIdentifier"))?;
        Ok(Self {
            key_identifier: key_identifier.into_bytes(),
        })
    }
}

/// An extension decoded according to its OID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedExtension {
    BasicConstraints(BasicConstraints),
    KeyUsage(KeyUsage),
    SubjectKeyIdentifier(SubjectKeyIdentifier),
    AuthorityKeyIdentifier(AuthorityKeyIdentifier),
    /// An extension this crate does not interpret, kept opaque.
    Unrecognized(ObjectIdentifier),
}

impl ParsedExtension {
    pub fn from_extension(extension: &Extension) -> Result<Self> {
        let value = extension.extn_value.as_bytes();
        let Some(kind) = oid::extension_kind(&extension.extn_id) else {
            return Ok(ParsedExtension::Unrecognized(extension.extn_id));
        };
        Ok(match kind {
            ExtensionKind::BasicConstraints => {
                Self::BasicConstraints(BasicConstraints::from_x509_extension_value(value)?)
            }
            ExtensionKind::KeyUsage => Self::KeyUsage(KeyUsage::from_x509_extension_value(value)?),
            ExtensionKind::SubjectKeyIdentifier => {
                Self::SubjectKeyIdentifier(SubjectKeyIdentifier::from_x509_extension_value(value)?)
            }
            ExtensionKind::AuthorityKeyIdentifier => Self::AuthorityKeyIdentifier(
                AuthorityKeyIdentifier::from_x509_extension_value(value)?,
            ),
        })
    }
}

/// Basic Constraints for a CA: `cA` set, critical, with an optional depth bound.
pub fn basic_constraints_extension(max_path_length: Option<u8>) -> Result<ExtensionParam> {
    let bc = BasicConstraints {
        is_ca: true,
        max_path_length,
    };
    ExtensionParam::from_extension(bc, true)
}

/// Key usage fixed by the policy, always critical.
pub fn key_usage_extension(policy: ExtensionPolicy) -> Result<ExtensionParam> {
    ExtensionParam::from_extension(KeyUsage(policy.key_usages()), true)
}

/// Subject Key Identifier derived from the certificate's own key, non-critical.
pub fn subject_key_identifier_extension(spki: &SubjectPublicKeyInfo) -> Result<ExtensionParam> {
    ExtensionParam::from_extension(SubjectKeyIdentifier::from_spki(spki), false)
}

/// Authority Key Identifier pointing at the issuer's subject key identifier.
pub fn authority_key_identifier_extension(
    issuer_key_identifier: Option<&[u8]>,
) -> Result<ExtensionParam> {
    let key_identifier = issuer_key_identifier
        .filter(|id| !id.is_empty())
        .ok_or(CertForgeError::MissingIssuerIdentifier)?;
    let aki = AuthorityKeyIdentifier {
        key_identifier: key_identifier.to_vec(),
    };
    ExtensionParam::from_extension(aki, false)
}
