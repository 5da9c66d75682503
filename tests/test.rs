mod util;

use certforge::builder::{IssuerIdentity, build_certificate};
use certforge::cert::extensions::{BasicConstraints, KeyUsages, ParsedExtension, ToAndFromX509Extension};
use certforge::cert::params::{ExtensionParam, ValidityWindow};
use certforge::cert::{Certificate, CertificateWithPrivateKey};
use certforge::error::{CertForgeError, DecodingFailure};
use certforge::issuer::Issuer;
use certforge::key::{KeyPair, SigningService};
use certforge::pem_utils;
use certforge::tbs_certificate::Name;
use der::Encode;
use hex_literal::hex;
use sha1::{Digest, Sha1};
use time::macros::datetime;

pub type Result<T> = std::result::Result<T, CertForgeError>;

/// Builds the CA and server certificates and checks that they chain.
#[test]
fn generate_chain() -> Result<()> {
    let ca = util::generate_ca_cert();
    let server_cert = ca.issue(&util::server_params())?;

    assert_eq!(ca.cert.subject().common_name(), Some("My CA"));
    assert_eq!(server_cert.subject().common_name(), Some("localhost"));
    assert_eq!(server_cert.issuer(), ca.cert.subject());
    assert_eq!(server_cert.tbs_certificate.serial_number.as_bytes(), &[2]);

    server_cert.verify_issued_by(&ca.cert)?;
    ca.cert.verify_issued_by(&ca.cert)?;
    Ok(())
}

/// The leaf AKI equals SHA-1 over the CA's SPKI BIT STRING contents.
#[test]
fn leaf_authority_key_identifier_is_ca_key_hash() -> Result<()> {
    let ca = util::generate_ca_cert();
    let server_cert = ca.issue(&util::server_params())?;

    let ca_spki = &ca.cert.tbs_certificate.subject_public_key_info;
    let expected = Sha1::digest(ca_spki.subject_public_key.raw_bytes()).to_vec();

    let aki = server_cert.authority_key_identifier()?.unwrap();
    let ski = ca.cert.subject_key_identifier()?.unwrap();
    assert_eq!(aki.key_identifier, expected);
    assert_eq!(ski.0, expected);
    Ok(())
}

#[test]
fn ca_extensions() -> Result<()> {
    let ca = util::generate_ca_cert();
    let bc = ca.cert.extension(&BasicConstraints::OID).unwrap();
    assert!(bc.critical);
    assert_eq!(bc.extn_value.as_bytes(), hex!("30060101ff020100"));

    let ku = ca.cert.extension(&certforge::oid::KEY_USAGE).unwrap();
    assert!(ku.critical);
    assert_eq!(ku.extn_value.as_bytes(), hex!("03020106"));
    assert!(ca.cert.key_usage()?.unwrap().contains(KeyUsages::KeyCertSign));

    let parsed = ca.cert.parsed_extensions()?;
    assert_eq!(parsed.len(), 4);
    assert!(matches!(parsed[0], ParsedExtension::BasicConstraints(_)));
    Ok(())
}

#[test]
fn server_extensions() -> Result<()> {
    let ca = util::generate_ca_cert();
    let server_cert = ca.issue(&util::server_params())?;

    assert!(server_cert.extension(&BasicConstraints::OID).is_none());
    let ku = server_cert.extension(&certforge::oid::KEY_USAGE).unwrap();
    assert!(ku.critical);
    assert_eq!(ku.extn_value.as_bytes(), hex!("030205a0"));
    Ok(())
}

#[test]
fn der_round_trip_is_byte_identical() -> Result<()> {
    let ca = util::generate_ca_cert();
    let server_cert = ca.issue(&util::server_params())?;

    for cert in [&ca.cert, &server_cert] {
        let der = cert.to_der()?;
        let decoded = Certificate::from_der(&der)?;
        assert_eq!(&decoded, cert);
        assert_eq!(decoded.to_der()?, der);
    }
    Ok(())
}

#[test]
fn altered_tbs_byte_fails_verification() -> Result<()> {
    let ca = util::generate_ca_cert();
    let server_cert = ca.issue(&util::server_params())?;
    let ca_key = ca.cert.subject_public_key()?;
    server_cert.verify_signature(&ca_key)?;

    // flip one bit of the subject common name
    let mut tampered = server_cert.clone();
    let cn = Name::from_attributes([(certforge::oid::COMMON_NAME, "localhosu")])?;
    tampered.tbs_certificate.subject = cn;
    assert!(matches!(
        tampered.verify_signature(&ca_key),
        Err(CertForgeError::VerificationFailure(_))
    ));

    // the same through raw DER: alter the last byte of the TBS encoding
    let encoded_len = |len: der::Length| usize::try_from(len).unwrap();
    let tail = encoded_len(server_cert.signature_algorithm.encoded_len().unwrap())
        + encoded_len(server_cert.signature.encoded_len().unwrap());
    let mut der = server_cert.to_der()?;
    let last_tbs_byte = der.len() - tail - 1;
    der[last_tbs_byte] ^= 0x01;
    match Certificate::from_der(&der) {
        Ok(cert) => assert!(cert.verify_signature(&ca_key).is_err()),
        Err(CertForgeError::DecodingFailure(_)) => {}
        Err(e) => panic!("unexpected error: {e}"),
    }
    Ok(())
}

#[test]
fn self_signed_issuer_equals_subject() -> Result<()> {
    let ca = util::generate_ca_cert();
    assert_eq!(ca.cert.issuer(), ca.cert.subject());
    assert!(ca.cert.is_self_signed());
    assert!(ca.cert.is_ca()?);
    Ok(())
}

/// The `selfsigned` demo flow: a `localhost` leaf certifying its own key.
#[test]
fn self_signed_leaf() -> Result<()> {
    let mut params = util::server_params();
    params.serial_number = Some(1u64.try_into()?);
    let cert = Certificate::new_self_signed(&params, util::server_key())?;

    assert!(cert.is_self_signed());
    assert!(!cert.is_ca()?);
    assert!(cert.extension(&BasicConstraints::OID).is_none());
    assert_eq!(cert.tbs_certificate.serial_number.as_bytes(), &[1]);
    assert_eq!(
        cert.authority_key_identifier()?.unwrap().key_identifier,
        cert.subject_key_identifier()?.unwrap().0
    );

    let reloaded = Certificate::from_pem(&cert.to_pem()?)?;
    assert_eq!(reloaded, cert);
    let key_pem = util::server_key().export_pkcs8_pem()?;
    assert_eq!(
        KeyPair::import_from_pkcs8_pem(&key_pem)?.public_key(),
        reloaded.subject_public_key()?
    );
    Ok(())
}

#[test]
fn server_leaf_cannot_claim_ca() {
    let ca = util::generate_ca_cert();
    let mut params = util::server_params();
    params.extensions.push(
        ExtensionParam::from_extension(
            BasicConstraints {
                is_ca: true,
                max_path_length: None,
            },
            true,
        )
        .unwrap(),
    );
    assert!(matches!(
        ca.issue(&params),
        Err(CertForgeError::PolicyViolation(_))
    ));
}

#[test]
fn inverted_validity_is_rejected() {
    let ca = util::generate_ca_cert();
    let mut params = util::server_params();
    params.validity = ValidityWindow::new(
        datetime!(2031-01-01 00:00 UTC),
        datetime!(2030-01-01 00:00 UTC),
    );
    assert!(matches!(
        ca.issue(&params),
        Err(CertForgeError::EncodingFailure(_))
    ));
}

#[test]
fn validity_after_2049_uses_generalized_time() -> Result<()> {
    let ca = util::generate_ca_cert();
    let mut params = util::server_params();
    params.validity = ValidityWindow::new(
        datetime!(2049-06-01 00:00 UTC),
        datetime!(2051-06-01 00:00 UTC),
    );
    let cert = ca.issue(&params)?;
    let validity = cert.tbs_certificate.validity;
    assert!(matches!(validity.not_before, certforge::codec::Time::UtcTime(_)));
    assert!(matches!(validity.not_after, certforge::codec::Time::GeneralTime(_)));
    assert_eq!(
        validity.not_after.to_offset_date_time()?,
        datetime!(2051-06-01 00:00 UTC)
    );
    Ok(())
}

#[test]
fn missing_issuer_identifier() {
    let ca = util::generate_ca_cert();
    let identity = IssuerIdentity {
        name: ca.cert.subject().clone(),
        key_identifier: None,
    };
    assert_eq!(
        build_certificate(&util::server_params(), &identity, &ca.key).unwrap_err(),
        CertForgeError::MissingIssuerIdentifier
    );
}

#[test]
fn truncated_and_garbage_input() -> Result<()> {
    let der = util::generate_ca_cert().cert.to_der()?;
    assert!(matches!(
        Certificate::from_der(&der[..der.len() - 10]),
        Err(CertForgeError::DecodingFailure(DecodingFailure::TruncatedInput { .. }))
    ));
    assert!(matches!(
        Certificate::from_der(&hex!("0403010203")),
        Err(CertForgeError::DecodingFailure(DecodingFailure::MalformedEncoding(_)))
    ));
    let mut trailing = der.clone();
    trailing.push(0);
    assert!(matches!(
        Certificate::from_der(&trailing),
        Err(CertForgeError::DecodingFailure(DecodingFailure::MalformedEncoding(_)))
    ));
    Ok(())
}

#[test]
fn pem_artifacts() -> Result<()> {
    let ca = util::generate_ca_cert();
    let pem = ca.cert.to_pem()?;
    assert!(pem.starts_with("-----BEGIN CERTIFICATE-----\n"));
    assert!(pem.lines().all(|line| line.len() <= 64));
    assert_eq!(pem_utils::pem_to_der(&pem, pem_utils::CERTIFICATE_LABEL)?, ca.cert.to_der()?);

    let key_pem = ca.key.export_pkcs8_pem()?;
    assert!(pem_utils::pem_to_der(&key_pem, pem_utils::PRIVATE_KEY_LABEL).is_ok());
    assert!(Certificate::from_pem(&key_pem).is_err());
    Ok(())
}

#[test]
fn reloaded_ca_can_issue() -> Result<()> {
    let ca = util::generate_ca_cert();
    let cert = Certificate::from_pem(&ca.cert.to_pem()?)?;
    let key = KeyPair::import_from_pkcs1_der(&ca.key.export_pkcs1_der()?)?;
    let reloaded = CertificateWithPrivateKey::new(cert, key)?;
    let server_cert = reloaded.issue(&util::server_params())?;
    server_cert.verify_issued_by(&ca.cert)?;
    Ok(())
}

#[test]
fn concurrent_builds() {
    let ca = util::generate_ca_cert();
    let certs: Vec<Certificate> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                scope.spawn(|| {
                    let mut params = util::server_params();
                    params.serial_number = None;
                    ca.issue(&params).unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    for cert in &certs {
        cert.verify_issued_by(&ca.cert).unwrap();
    }
    assert_ne!(
        certs[0].tbs_certificate.serial_number,
        certs[1].tbs_certificate.serial_number
    );
}

/// A signer behind `&dyn SigningService` can be handed to several threads at once.
#[test]
fn shared_signer_across_threads() {
    let ca = util::generate_ca_cert();
    let signer: &dyn SigningService = &ca.key;
    let identity = IssuerIdentity {
        name: ca.cert.subject().clone(),
        key_identifier: ca.cert.subject_key_identifier().unwrap().map(|ski| ski.0),
    };
    std::thread::scope(|scope| {
        let handles: Vec<_> = (1..=3u64)
            .map(|serial| {
                let identity = &identity;
                scope.spawn(move || {
                    let mut params = util::server_params();
                    params.serial_number = Some(serial.try_into().unwrap());
                    build_certificate(&params, identity, signer).unwrap()
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap().verify_issued_by(&ca.cert).unwrap();
        }
    });
}

#[test]
fn independent_parser_accepts_chain() -> Result<()> {
    use der::Decode;

    let ca = util::generate_ca_cert();
    let server_cert = ca.issue(&util::server_params())?;

    for cert in [&ca.cert, &server_cert] {
        let parsed = x509_cert::Certificate::from_der(&cert.to_der()?).unwrap();
        assert_eq!(parsed.tbs_certificate.version, x509_cert::Version::V3);
        assert_eq!(
            parsed.signature_algorithm.oid,
            certforge::oid::SHA_256_WITH_RSA_ENCRYPTION
        );
        assert!(parsed.tbs_certificate.extensions.as_ref().is_some_and(|exts| exts.len() >= 3));
    }

    let parsed = x509_cert::Certificate::from_der(&server_cert.to_der()?).unwrap();
    assert_eq!(parsed.tbs_certificate.subject.to_string(), "CN=localhost");
    assert_eq!(parsed.tbs_certificate.issuer.to_string(), "CN=My CA");
    Ok(())
}
