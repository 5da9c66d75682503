use bon::Builder;
use const_oid::ObjectIdentifier;
use der::asn1::OctetString;
use der::flagset::FlagSet;
use time::Duration;
use time::OffsetDateTime;

use super::SignatureAlgorithm;
use super::extensions::{KeyUsages, ToAndFromX509Extension};
use crate::codec::{Result, SerialNumber};
use crate::error::CertForgeError;
use crate::key::PublicKey;
use crate::oid;
use crate::tbs_certificate::{Extension, Name};

/// Which fixed extension set a certificate receives.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExtensionPolicy {
    /// Self-signed trust anchor: Basic Constraints `cA`, `keyCertSign | cRLSign`.
    CaRoot,
    /// TLS server end entity: `digitalSignature | keyEncipherment`, no Basic Constraints.
    ServerLeaf,
}

impl ExtensionPolicy {
    pub fn key_usages(self) -> FlagSet<KeyUsages> {
        match self {
            ExtensionPolicy::CaRoot => KeyUsages::KeyCertSign | KeyUsages::CRLSign,
            ExtensionPolicy::ServerLeaf => {
                KeyUsages::DigitalSignature | KeyUsages::KeyEncipherment
            }
        }
    }

    pub fn is_ca(self) -> bool {
        matches!(self, ExtensionPolicy::CaRoot)
    }
}

/// Parameters for building an X.509 certificate.
///
/// # Fields
/// * `subject` - The distinguished name of the certificate subject.
/// * `subject_public_key` - The public key of the certificate subject.
/// * `policy` - The fixed extension set to emit.
/// * `validity` - Defaults to 365 days starting now.
/// * `serial_number` - A random 128-bit serial is generated when absent.
/// * `path_len_constraint` - Only valid for [`ExtensionPolicy::CaRoot`].
/// * `signature_algorithm` - Defaults to SHA-256 with RSA.
/// * `extensions` - Additional X.509 extensions, appended after the policy set.
#[derive(Clone, Debug, Builder)]
pub struct CertificateParams {
    pub subject: DistinguishedName,
    pub subject_public_key: PublicKey,
    pub policy: ExtensionPolicy,
    #[builder(default = ValidityWindow::for_days(365))]
    pub validity: ValidityWindow,
    pub serial_number: Option<SerialNumber>,
    pub path_len_constraint: Option<u8>,
    #[builder(default)]
    pub signature_algorithm: SignatureAlgorithm,
    #[builder(default)]
    pub extensions: Vec<ExtensionParam>,
}

/// Distinguished name parameters for building an X.509 certificate.
///
/// Attributes are emitted in the order C, ST, L, O, OU, CN, one per RDN.
/// Empty values are skipped.
///
/// # Fields
/// * `common_name` - The common name (CN).
/// * `country` - The country (C).
/// * `state` - The state or province (ST).
/// * `locality` - The locality or city (L).
/// * `organization` - The organization (O).
/// * `organization_unit` - The organizational unit (OU).
#[derive(Clone, Debug, Builder, Default, PartialEq, Eq)]
pub struct DistinguishedName {
    pub common_name: String,
    pub country: Option<String>,
    pub state: Option<String>,
    pub locality: Option<String>,
    pub organization: Option<String>,
    pub organization_unit: Option<String>,
}

impl DistinguishedName {
    /// Converts the distinguished name to its ASN.1 form.
    pub fn as_name(&self) -> Result<Name> {
        let attributes = [
            (oid::COUNTRY_NAME, self.country.as_deref()),
            (oid::STATE_OR_PROVINCE_NAME, self.state.as_deref()),
            (oid::LOCALITY_NAME, self.locality.as_deref()),
            (oid::ORGANIZATION_NAME, self.organization.as_deref()),
            (oid::ORGANIZATIONAL_UNIT_NAME, self.organization_unit.as_deref()),
            (oid::COMMON_NAME, Some(self.common_name.as_str())),
        ];
        Name::from_attributes(
            attributes
                .into_iter()
                .filter_map(|(oid, value)| value.filter(|v| !v.is_empty()).map(|v| (oid, v))),
        )
    }

    /// Reads the supported attributes back out of an ASN.1 name.
    ///
    /// Attributes other than C, ST, L, O, OU and CN are ignored.
    pub fn from_name(name: &Name) -> Self {
        let get = |oid| name.get(&oid).map(str::to_string);
        DistinguishedName {
            common_name: get(oid::COMMON_NAME).unwrap_or_default(),
            country: get(oid::COUNTRY_NAME),
            state: get(oid::STATE_OR_PROVINCE_NAME),
            locality: get(oid::LOCALITY_NAME),
            organization: get(oid::ORGANIZATION_NAME),
            organization_unit: get(oid::ORGANIZATIONAL_UNIT_NAME),
        }
    }
}

/// Certificate validity period.
///
/// # Fields
/// * `not_before` - The start of the validity period.
/// * `not_after` - The end of the validity period.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ValidityWindow {
    pub not_before: OffsetDateTime,
    pub not_after: OffsetDateTime,
}

impl ValidityWindow {
    pub fn new(not_before: OffsetDateTime, not_after: OffsetDateTime) -> Self {
        Self {
            not_before,
            not_after,
        }
    }

    /// Creates a validity period starting now for the given number of days.
    pub fn for_days(days: i64) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            not_before: now,
            not_after: now + Duration::days(days),
        }
    }
}

/// Represents an X.509 extension.
///
/// # Fields
/// * `oid` - The object identifier of the extension.
/// * `critical` - Indicates if the extension is critical.
/// * `value` - The DER-encoded value of the extension.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtensionParam {
    pub oid: ObjectIdentifier,
    pub critical: bool,
    /// DER-encoded extension value
    pub value: Vec<u8>,
}

impl ExtensionParam {
    /// Creates an `ExtensionParam` from a specific extension.
    pub fn from_extension<E: ToAndFromX509Extension>(extension: E, critical: bool) -> Result<Self> {
        Ok(Self {
            oid: E::OID,
            critical,
            value: extension.to_x509_extension_value()?,
        })
    }

    /// Decodes an `ExtensionParam` into a specific extension.
    pub fn to_extension<E: ToAndFromX509Extension>(&self) -> Result<E> {
        if self.oid != E::OID {
            return Err(CertForgeError::InvalidInput(format!(
                "extension is {}, not {}",
                oid::name_of(&self.oid),
                oid::name_of(&E::OID)
            )));
        }
        E::from_x509_extension_value(&self.value)
    }

    pub fn to_x509_extension(&self) -> Result<Extension> {
        Ok(Extension {
            extn_id: self.oid,
            critical: self.critical,
            extn_value: OctetString::new(self.value.clone()).map_err(CertForgeError::encoding)?,
        })
    }
}

impl From<&Extension> for ExtensionParam {
    fn from(extension: &Extension) -> Self {
        Self {
            oid: extension.extn_id,
            critical: extension.critical,
            value: extension.extn_value.as_bytes().to_vec(),
        }
    }
}
