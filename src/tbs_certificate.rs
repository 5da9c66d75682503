use der::asn1::{Any, BitString, OctetString, PrintableStringRef, SetOfVec, Uint};
use der::oid::ObjectIdentifier;
use der::{
    DecodeValue, EncodeValue, Enumerated, FixedTag, Header, Length, Reader, Sequence, Tag, Tagged,
    ValueOrd, Writer,
};

use crate::codec::{self, Result, SerialNumber, Time};
use crate::error::CertForgeError;
use crate::oid;

/// Certificate `Version` as defined in RFC 5280 Section 4.1.2.1.
///
/// ```text
/// Version  ::=  INTEGER  {  v1(0), v2(1), v3(2)  }
/// ```
#[derive(Clone, Debug, Copy, PartialEq, Eq, Enumerated)]
#[asn1(type = "INTEGER")]
#[repr(u8)]
pub enum Version {
    V1 = 0,
    V2 = 1,
    V3 = 2,
}

impl Default for Version {
    fn default() -> Self {
        Self::V1
    }
}

/// Represents the "To Be Signed" (TBS) portion of an X.509 certificate.
///
/// ```text
/// TBSCertificate  ::=  SEQUENCE  {
///     version         [0]  EXPLICIT Version DEFAULT v1,
///     serialNumber         CertificateSerialNumber,
///     signature            AlgorithmIdentifier,
///     issuer               Name,
///     validity             Validity,
///     subject              Name,
///     subjectPublicKeyInfo SubjectPublicKeyInfo,
///     issuerUniqueID  [1]  IMPLICIT UniqueIdentifier OPTIONAL,
///     subjectUniqueID [2]  IMPLICIT UniqueIdentifier OPTIONAL,
///     extensions      [3]  EXPLICIT Extensions OPTIONAL
/// }
/// ```
///
/// The signature covers the DER encoding of this structure, so every field here
/// must re-encode byte for byte after a decode.
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct TbsCertificate {
    #[asn1(context_specific = "0", tag_mode = "EXPLICIT", default = "Default::default")]
    pub version: Version,
    pub serial_number: SerialNumber,
    pub signature: AlgorithmIdentifier,
    pub issuer: Name,
    pub validity: Validity,
    pub subject: Name,
    pub subject_public_key_info: SubjectPublicKeyInfo,
    #[asn1(context_specific = "1", tag_mode = "IMPLICIT", optional = "true")]
    pub issuer_unique_id: Option<BitString>,
    #[asn1(context_specific = "2", tag_mode = "IMPLICIT", optional = "true")]
    pub subject_unique_id: Option<BitString>,
    #[asn1(context_specific = "3", tag_mode = "EXPLICIT", optional = "true")]
    pub extensions: Option<Vec<Extension>>,
}

impl TbsCertificate {
    /// Encodes the `TbsCertificate` into DER format.
    pub fn to_der(&self) -> Result<Vec<u8>> {
        codec::encode(self)
    }

    /// Looks up an extension by OID.
    pub fn extension(&self, oid: &ObjectIdentifier) -> Option<&Extension> {
        self.extensions
            .as_deref()
            .unwrap_or_default()
            .iter()
            .find(|ext| ext.extn_id == *oid)
    }
}

/// ```text
/// AlgorithmIdentifier  ::=  SEQUENCE  {
///     algorithm   OBJECT IDENTIFIER,
///     parameters  ANY DEFINED BY algorithm OPTIONAL
/// }
/// ```
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct AlgorithmIdentifier {
    pub oid: ObjectIdentifier,
    pub parameters: Option<Any>,
}

impl AlgorithmIdentifier {
    /// An identifier with explicit NULL parameters, as the RSA family requires.
    pub fn with_null_parameters(oid: ObjectIdentifier) -> Result<Self> {
        Ok(Self {
            oid,
            parameters: Some(codec::decode::<Any>(&[0x05, 0x00])?),
        })
    }
}

/// ```text
/// SubjectPublicKeyInfo  ::=  SEQUENCE  {
///     algorithm            AlgorithmIdentifier,
///     subjectPublicKey     BIT STRING
/// }
/// ```
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct SubjectPublicKeyInfo {
    pub algorithm: AlgorithmIdentifier,
    pub subject_public_key: BitString,
}

/// PKCS#1 `RSAPublicKey ::= SEQUENCE { modulus INTEGER, publicExponent INTEGER }`,
/// the payload of an RSA SubjectPublicKeyInfo BIT STRING.
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct RsaPublicKeyDer {
    pub modulus: Uint,
    pub public_exponent: Uint,
}

/// `Validity ::= SEQUENCE { notBefore Time, notAfter Time }`
#[derive(Copy, Clone, Debug, Eq, PartialEq, Sequence)]
pub struct Validity {
    pub not_before: Time,
    pub not_after: Time,
}

impl Validity {
    /// Builds the encoded validity period, rejecting windows where `not_after` does
    /// not come strictly after `not_before` at second precision.
    pub fn new(not_before: time::OffsetDateTime, not_after: time::OffsetDateTime) -> Result<Self> {
        let validity = Self {
            not_before: Time::from_offset_date_time(not_before)?,
            not_after: Time::from_offset_date_time(not_after)?,
        };
        if validity.not_after.unix_seconds() <= validity.not_before.unix_seconds() {
            return Err(CertForgeError::EncodingFailure(format!(
                "notAfter ({not_after}) must be later than notBefore ({not_before})"
            )));
        }
        Ok(validity)
    }
}

/// ```text
/// Extension  ::=  SEQUENCE  {
///     extnID      OBJECT IDENTIFIER,
///     critical    BOOLEAN DEFAULT FALSE,
///     extnValue   OCTET STRING
/// }
/// ```
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct Extension {
    pub extn_id: ObjectIdentifier,
    #[asn1(default = "Default::default")]
    pub critical: bool,
    pub extn_value: OctetString,
}

/// `AttributeTypeAndValue ::= SEQUENCE { type OBJECT IDENTIFIER, value ANY }`
#[derive(Clone, Debug, Eq, PartialEq, Sequence, ValueOrd)]
pub struct AttributeTypeAndValue {
    pub oid: ObjectIdentifier,
    pub value: Any,
}

impl AttributeTypeAndValue {
    /// Encodes `value` as a PrintableString when its alphabet allows, otherwise as a
    /// UTF8String.
    pub fn new(oid: ObjectIdentifier, value: &str) -> Result<Self> {
        let tag = if PrintableStringRef::new(value).is_ok() {
            Tag::PrintableString
        } else {
            Tag::Utf8String
        };
        let value = Any::new(tag, value.as_bytes()).map_err(CertForgeError::encoding)?;
        Ok(Self { oid, value })
    }

    /// The attribute value as text, for the string types a Name may carry.
    pub fn value_str(&self) -> Result<&str> {
        match self.value.tag() {
            Tag::PrintableString | Tag::Utf8String | Tag::Ia5String => {
                std::str::from_utf8(self.value.value()).map_err(CertForgeError::malformed)
            }
            tag => Err(CertForgeError::malformed(format!(
                "unsupported attribute value type {tag}"
            ))),
        }
    }
}

/// `RelativeDistinguishedName ::= SET SIZE (1..MAX) OF AttributeTypeAndValue`
pub type RelativeDistinguishedName = SetOfVec<AttributeTypeAndValue>;

/// `Name ::= SEQUENCE OF RelativeDistinguishedName`
///
/// RDNs keep insertion order; only the attributes inside one SET are subject to DER
/// ordering, and this crate puts exactly one attribute in each SET.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Name(pub Vec<RelativeDistinguishedName>);

impl Name {
    /// Builds a name with one single-attribute RDN per entry, in the given order.
    pub fn from_attributes<'s>(
        attributes: impl IntoIterator<Item = (ObjectIdentifier, &'s str)>,
    ) -> Result<Self> {
        let rdns = attributes
            .into_iter()
            .map(|(oid, value)| {
                let atv = AttributeTypeAndValue::new(oid, value)?;
                SetOfVec::try_from(vec![atv]).map_err(CertForgeError::encoding)
            })
            .collect::<Result<Vec<_>>>()?;
        if rdns.is_empty() {
            return Err(CertForgeError::EncodingFailure(
                "a name needs at least one attribute".to_string(),
            ));
        }
        Ok(Self(rdns))
    }

    pub fn attributes(&self) -> impl Iterator<Item = &AttributeTypeAndValue> {
        self.0.iter().flat_map(|rdn| rdn.iter())
    }

    /// Returns the first attribute value of type `oid`.
    pub fn get(&self, oid: &ObjectIdentifier) -> Option<&str> {
        self.attributes()
            .find(|atv| atv.oid == *oid)
            .and_then(|atv| atv.value_str().ok())
    }

    pub fn common_name(&self) -> Option<&str> {
        self.get(&oid::COMMON_NAME)
    }
}

impl std::fmt::Display for Name {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for atv in self.attributes() {
            if !first {
                f.write_str(", ")?;
            }
            first = false;
            write!(f, "{}={}", oid::name_of(&atv.oid), atv.value_str().unwrap_or("<binary>"))?;
        }
        Ok(())
    }
}

impl FixedTag for Name {
    const TAG: Tag = Tag::Sequence;
}

impl EncodeValue for Name {
    fn value_len(&self) -> der::Result<Length> {
        self.0.value_len()
    }

    fn encode_value(&self, writer: &mut impl Writer) -> der::Result<()> {
        self.0.encode_value(writer)
    }
}

impl<'a> DecodeValue<'a> for Name {
    fn decode_value<R: Reader<'a>>(reader: &mut R, header: Header) -> der::Result<Self> {
        Vec::decode_value(reader, header).map(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;
    use time::macros::datetime;

    #[test]
    fn test_version_is_explicitly_tagged() {
        #[derive(Sequence)]
        struct Wrapper {
            #[asn1(context_specific = "0", tag_mode = "EXPLICIT", default = "Default::default")]
            version: Version,
        }
        let der = codec::encode(&Wrapper {
            version: Version::V3,
        })
        .unwrap();
        assert_eq!(der, hex!("3005a003020102"));

        // v1 is the DEFAULT and therefore omitted
        let der = codec::encode(&Wrapper {
            version: Version::V1,
        })
        .unwrap();
        assert_eq!(der, hex!("3000"));
    }

    #[test]
    fn test_name_is_sequence_of_single_attribute_sets_in_insertion_order() {
        let name = Name::from_attributes([
            (oid::COMMON_NAME, "My CA"),
            (oid::COUNTRY_NAME, "JP"),
        ])
        .unwrap();
        let der = codec::encode(&name).unwrap();
        assert_eq!(
            der,
            hex!(
                "301d"
                "310e300c060355040313054d79204341"
                "310b300906035504061302" "4a50"
            )
        );
        let decoded: Name = codec::decode(&der).unwrap();
        assert_eq!(decoded, name);
        assert_eq!(decoded.to_string(), "CN=My CA, C=JP");
    }

    #[test]
    fn test_non_printable_attribute_uses_utf8_string() {
        let atv = AttributeTypeAndValue::new(oid::COMMON_NAME, "café_1").unwrap();
        assert_eq!(atv.value.tag(), Tag::Utf8String);
        assert_eq!(atv.value_str().unwrap(), "café_1");
    }

    #[test]
    fn test_empty_name_is_rejected() {
        assert!(matches!(
            Name::from_attributes(Vec::<(ObjectIdentifier, &str)>::new()),
            Err(CertForgeError::EncodingFailure(_))
        ));
    }

    #[test]
    fn test_validity_must_be_increasing() {
        let now = datetime!(2026-01-01 00:00:00 UTC);
        assert!(Validity::new(now, now + time::Duration::days(1)).is_ok());
        assert!(matches!(
            Validity::new(now, now),
            Err(CertForgeError::EncodingFailure(_))
        ));
        assert!(matches!(
            Validity::new(now, now - time::Duration::days(1)),
            Err(CertForgeError::EncodingFailure(_))
        ));
        // equal once truncated to whole seconds
        assert!(Validity::new(now, now + time::Duration::milliseconds(500)).is_err());
    }

    #[test]
    fn test_validity_mixes_time_types_across_2050() {
        let validity = Validity::new(
            datetime!(2049-06-01 00:00:00 UTC),
            datetime!(2051-06-01 00:00:00 UTC),
        )
        .unwrap();
        assert!(matches!(validity.not_before, Time::UtcTime(_)));
        assert!(matches!(validity.not_after, Time::GeneralTime(_)));
        let decoded: Validity = codec::decode(&codec::encode(&validity).unwrap()).unwrap();
        assert_eq!(decoded, validity);
    }

    #[test]
    fn test_null_parameters() {
        let alg = AlgorithmIdentifier::with_null_parameters(oid::RSA_ENCRYPTION).unwrap();
        assert_eq!(
            codec::encode(&alg).unwrap(),
            hex!("300d06092a864886f70d0101010500")
        );
    }

    #[test]
    fn test_extension_critical_defaults_to_absent() {
        let ext = Extension {
            extn_id: oid::SUBJECT_KEY_IDENTIFIER,
            critical: false,
            extn_value: OctetString::new(vec![0x04, 0x01, 0xaa]).unwrap(),
        };
        assert_eq!(codec::encode(&ext).unwrap(), hex!("300a0603551d0e040304" "01aa"));
    }

    #[test]
    fn test_explicit_default_values_are_rejected() {
        use crate::error::DecodingFailure;

        // critical = FALSE spelled out
        let err = codec::decode::<Extension>(&hex!("300d0603551d0e0101000403" "0401aa")).unwrap_err();
        assert!(matches!(
            err,
            CertForgeError::DecodingFailure(DecodingFailure::MalformedEncoding(_))
        ));
        let ext: Extension = codec::decode(&hex!("300a0603551d0e040304" "01aa")).unwrap();
        assert!(!ext.critical);

        // critical = TRUE is not the DEFAULT and stays
        let ext: Extension = codec::decode(&hex!("300d0603551d0e0101ff0403" "0401aa")).unwrap();
        assert!(ext.critical);
    }
}
