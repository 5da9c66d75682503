//! DER encode/decode entry points and the scalar ASN.1 types the certificate
//! structures share: [`Time`] and [`SerialNumber`].
//!
//! Structured types derive their encoders from `der`; this module owns the error
//! mapping and the value rules `der` does not enforce on its own (positive serials,
//! the UTCTime/GeneralizedTime cut-over, truncation detection).

use der::asn1::{GeneralizedTime, Uint, UtcTime};
use der::{
    Choice, DateTime, Decode, DecodeValue, Encode, EncodeValue, FixedTag, Header, Length, Reader,
    SliceReader, Tag, Writer,
};
use time::{OffsetDateTime, UtcOffset};

use crate::error::{CertForgeError, DecodingFailure};

pub type Result<T> = std::result::Result<T, CertForgeError>;

/// RFC 5280 caps serial numbers at 20 content octets.
pub const MAX_SERIAL_LEN: usize = 20;

/// Encodes `value` as DER.
pub fn encode<T: Encode>(value: &T) -> Result<Vec<u8>> {
    let der = value.to_der().map_err(CertForgeError::encoding)?;
    tracing::trace!(len = der.len(), "encoded DER value");
    Ok(der)
}

/// Decodes a single DER value of type `T` occupying all of `bytes`.
///
/// Fails with [`DecodingFailure::TruncatedInput`] when the outer header declares more
/// bytes than are present, and with [`DecodingFailure::MalformedEncoding`] for any
/// other mismatch, trailing data included.
///
/// The decoded value must re-encode to exactly `bytes`. `der` accepts some BER-isms
/// such as an explicitly encoded DEFAULT value; those are rejected here, since a
/// signature over the received bytes would not cover the re-encoded ones.
pub fn decode<'a, T: Decode<'a> + Encode>(bytes: &'a [u8]) -> Result<T> {
    check_declared_length(bytes)?;
    let value = T::from_der(bytes)?;
    let reencoded = value.to_der().map_err(CertForgeError::malformed)?;
    if reencoded != bytes {
        tracing::trace!(
            input_len = bytes.len(),
            reencoded_len = reencoded.len(),
            "rejected non-canonical DER"
        );
        return Err(CertForgeError::malformed("encoding is not canonical DER"));
    }
    Ok(value)
}

fn check_declared_length(bytes: &[u8]) -> Result<()> {
    let mut reader = SliceReader::new(bytes)?;
    let header = Header::decode(&mut reader)?;
    let declared = usize::try_from((header.encoded_len()? + header.length)?)?;
    if declared > bytes.len() {
        return Err(DecodingFailure::TruncatedInput {
            expected: declared,
            available: bytes.len(),
        }
        .into());
    }
    Ok(())
}

/// `Time ::= CHOICE { utcTime UTCTime, generalTime GeneralizedTime }`
#[derive(Choice, Copy, Clone, Debug, Eq, PartialEq)]
pub enum Time {
    #[asn1(type = "UTCTime")]
    UtcTime(UtcTime),

    #[asn1(type = "GeneralizedTime")]
    GeneralTime(GeneralizedTime),
}

impl Time {
    /// Picks the encoding RFC 5280 requires for the instant: UTCTime through 2049,
    /// GeneralizedTime from 2050 on. Sub-second precision is dropped.
    pub fn from_offset_date_time(value: OffsetDateTime) -> Result<Self> {
        let utc = value.to_offset(UtcOffset::UTC);
        let year = u16::try_from(utc.year())
            .ok()
            .filter(|year| *year >= 1970)
            .ok_or_else(|| {
                CertForgeError::EncodingFailure(format!("year {} is not representable", utc.year()))
            })?;
        let date_time = DateTime::new(
            year,
            u8::from(utc.month()),
            utc.day(),
            utc.hour(),
            utc.minute(),
            utc.second(),
        )
        .map_err(|e| CertForgeError::EncodingFailure(format!("unrepresentable time {utc}: {e}")))?;

        if (1950..2050).contains(&year) {
            Ok(Time::UtcTime(
                UtcTime::from_date_time(date_time).map_err(CertForgeError::encoding)?,
            ))
        } else {
            Ok(Time::GeneralTime(GeneralizedTime::from_date_time(date_time)))
        }
    }

    pub fn to_date_time(&self) -> DateTime {
        match self {
            Time::UtcTime(t) => t.to_date_time(),
            Time::GeneralTime(t) => t.to_date_time(),
        }
    }

    pub fn to_offset_date_time(&self) -> Result<OffsetDateTime> {
        let secs = self.unix_seconds();
        OffsetDateTime::from_unix_timestamp(secs).map_err(CertForgeError::malformed)
    }

    pub fn unix_seconds(&self) -> i64 {
        self.to_date_time().unix_duration().as_secs() as i64
    }
}

// Content length includes the sign octet a high magnitude bit forces.
fn fits_serial_len(value: &Uint) -> bool {
    value
        .value_len()
        .ok()
        .and_then(|len| usize::try_from(len).ok())
        .is_some_and(|len| len <= MAX_SERIAL_LEN)
}

/// `CertificateSerialNumber ::= INTEGER`, restricted to positive values of at most
/// [`MAX_SERIAL_LEN`] content octets.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SerialNumber(Uint);

impl SerialNumber {
    /// Builds a serial from big-endian magnitude bytes.
    pub fn new(bytes: &[u8]) -> Result<Self> {
        let significant = bytes.iter().position(|b| *b != 0).map(|i| &bytes[i..]);
        let Some(significant) = significant else {
            return Err(CertForgeError::EncodingFailure(
                "serial number must be positive".to_string(),
            ));
        };
        let value = Uint::new(significant).map_err(CertForgeError::encoding)?;
        if !fits_serial_len(&value) {
            return Err(CertForgeError::EncodingFailure(format!(
                "serial number longer than {MAX_SERIAL_LEN} content octets"
            )));
        }
        Ok(Self(value))
    }

    /// A random positive 128-bit serial.
    pub fn generate() -> Result<Self> {
        let mut bytes: [u8; 16] = rand::random();
        // top bit clear keeps the encoding at 16 octets; 0x40 keeps it non-zero
        bytes[0] &= 0x7f;
        bytes[0] |= 0x40;
        Self::new(&bytes)
    }

    /// Big-endian magnitude without the sign octet.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl TryFrom<u64> for SerialNumber {
    type Error = CertForgeError;

    fn try_from(value: u64) -> Result<Self> {
        Self::new(&value.to_be_bytes())
    }
}

impl TryFrom<i64> for SerialNumber {
    type Error = CertForgeError;

    fn try_from(value: i64) -> Result<Self> {
        if value <= 0 {
            return Err(CertForgeError::EncodingFailure(format!(
                "serial number must be positive, got {value}"
            )));
        }
        Self::new(&value.to_be_bytes())
    }
}

impl FixedTag for SerialNumber {
    const TAG: Tag = Tag::Integer;
}

impl EncodeValue for SerialNumber {
    fn value_len(&self) -> der::Result<Length> {
        self.0.value_len()
    }

    fn encode_value(&self, writer: &mut impl Writer) -> der::Result<()> {
        self.0.encode_value(writer)
    }
}

impl<'a> DecodeValue<'a> for SerialNumber {
    fn decode_value<R: Reader<'a>>(reader: &mut R, header: Header) -> der::Result<Self> {
        let value = Uint::decode_value(reader, header)?;
        if value.as_bytes().iter().all(|b| *b == 0) || !fits_serial_len(&value) {
            return Err(Tag::Integer.value_error());
        }
        Ok(Self(value))
    }
}
