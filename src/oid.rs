//! Named object identifiers used by the certificate builder.
//!
//! Every OID the crate emits or recognizes is declared here once. Extension
//! dispatch goes through [`extension_kind`] rather than ad hoc comparisons.

use const_oid::ObjectIdentifier;
use const_oid::db::{rfc5280, rfc5912};

/// `rsaEncryption` (1.2.840.113549.1.1.1)
pub const RSA_ENCRYPTION: ObjectIdentifier = rfc5912::RSA_ENCRYPTION;
/// `sha256WithRSAEncryption` (1.2.840.113549.1.1.11)
pub const SHA_256_WITH_RSA_ENCRYPTION: ObjectIdentifier = rfc5912::SHA_256_WITH_RSA_ENCRYPTION;
/// `sha384WithRSAEncryption` (1.2.840.113549.1.1.12)
pub const SHA_384_WITH_RSA_ENCRYPTION: ObjectIdentifier = rfc5912::SHA_384_WITH_RSA_ENCRYPTION;
/// `sha512WithRSAEncryption` (1.2.840.113549.1.1.13)
pub const SHA_512_WITH_RSA_ENCRYPTION: ObjectIdentifier = rfc5912::SHA_512_WITH_RSA_ENCRYPTION;

pub const COUNTRY_NAME: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.6");
pub const STATE_OR_PROVINCE_NAME: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.8");
pub const LOCALITY_NAME: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.7");
pub const ORGANIZATION_NAME: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.10");
pub const ORGANIZATIONAL_UNIT_NAME: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.11");
pub const COMMON_NAME: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.3");

pub const BASIC_CONSTRAINTS: ObjectIdentifier = rfc5280::ID_CE_BASIC_CONSTRAINTS;
pub const KEY_USAGE: ObjectIdentifier = rfc5280::ID_CE_KEY_USAGE;
pub const SUBJECT_KEY_IDENTIFIER: ObjectIdentifier = rfc5280::ID_CE_SUBJECT_KEY_IDENTIFIER;
pub const AUTHORITY_KEY_IDENTIFIER: ObjectIdentifier = rfc5280::ID_CE_AUTHORITY_KEY_IDENTIFIER;
// Recognized by name only; no builder emits them.
pub const EXTENDED_KEY_USAGE: ObjectIdentifier = rfc5280::ID_CE_EXT_KEY_USAGE;
pub const SUBJECT_ALT_NAME: ObjectIdentifier = rfc5280::ID_CE_SUBJECT_ALT_NAME;
pub const CRL_DISTRIBUTION_POINTS: ObjectIdentifier = rfc5280::ID_CE_CRL_DISTRIBUTION_POINTS;

/// Extensions the crate knows how to build and decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtensionKind {
    BasicConstraints,
    KeyUsage,
    SubjectKeyIdentifier,
    AuthorityKeyIdentifier,
}

const EXTENSIONS: &[(ObjectIdentifier, ExtensionKind)] = &[
    (BASIC_CONSTRAINTS, ExtensionKind::BasicConstraints),
    (KEY_USAGE, ExtensionKind::KeyUsage),
    (SUBJECT_KEY_IDENTIFIER, ExtensionKind::SubjectKeyIdentifier),
    (AUTHORITY_KEY_IDENTIFIER, ExtensionKind::AuthorityKeyIdentifier),
];

const NAMES: &[(ObjectIdentifier, &str)] = &[
    (RSA_ENCRYPTION, "rsaEncryption"),
    (SHA_256_WITH_RSA_ENCRYPTION, "sha256WithRSAEncryption"),
    (SHA_384_WITH_RSA_ENCRYPTION, "sha384WithRSAEncryption"),
    (SHA_512_WITH_RSA_ENCRYPTION, "sha512WithRSAEncryption"),
    (COUNTRY_NAME, "C"),
    (STATE_OR_PROVINCE_NAME, "ST"),
    (LOCALITY_NAME, "L"),
    (ORGANIZATION_NAME, "O"),
    (ORGANIZATIONAL_UNIT_NAME, "OU"),
    (COMMON_NAME, "CN"),
    (BASIC_CONSTRAINTS, "basicConstraints"),
    (KEY_USAGE, "keyUsage"),
    (SUBJECT_KEY_IDENTIFIER, "subjectKeyIdentifier"),
    (AUTHORITY_KEY_IDENTIFIER, "authorityKeyIdentifier"),
    (EXTENDED_KEY_USAGE, "extKeyUsage"),
    (SUBJECT_ALT_NAME, "subjectAltName"),
    (CRL_DISTRIBUTION_POINTS, "cRLDistributionPoints"),
];

/// Returns the extension kind registered for `oid`, if any.
pub fn extension_kind(oid: &ObjectIdentifier) -> Option<ExtensionKind> {
    EXTENSIONS
        .iter()
        .find(|(known, _)| known == oid)
        .map(|(_, kind)| *kind)
}

/// Returns a short human readable name for `oid`.
///
/// Falls back to the `const-oid` database, and finally to the dotted form.
pub fn name_of(oid: &ObjectIdentifier) -> String {
    NAMES
        .iter()
        .find(|(known, _)| known == oid)
        .map(|(_, name)| (*name).to_string())
        .or_else(|| const_oid::db::DB.by_oid(oid).map(str::to_string))
        .unwrap_or_else(|| oid.to_string())
}
