//! Assembles, digests and signs a TBSCertificate.
//!
//! [`build_certificate`] is the single code path behind both
//! [`Certificate::new_self_signed`] and [`Issuer::issue`](crate::issuer::Issuer::issue).
//! It performs no I/O; the only call leaving the crate is
//! [`SigningService::sign_digest`].

use std::collections::HashSet;

use der::asn1::BitString;
use der::oid::ObjectIdentifier;

use crate::cert::Certificate;
use crate::cert::extensions::{
    self, BasicConstraints, KeyUsage, KeyUsages, ToAndFromX509Extension,
};
use crate::cert::params::{CertificateParams, ExtensionParam, ExtensionPolicy};
use crate::codec::{Result, SerialNumber};
use crate::error::CertForgeError;
use crate::key::{SigningService, key_identifier_of};
use crate::oid;
use crate::tbs_certificate::{Extension, Name, SubjectPublicKeyInfo, TbsCertificate, Validity, Version};

/// Who signs: the issuer's name and subject key identifier.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IssuerIdentity {
    pub name: Name,
    /// Required for every policy; a missing identifier fails with
    /// [`CertForgeError::MissingIssuerIdentifier`].
    pub key_identifier: Option<Vec<u8>>,
}

/// Builds and signs a certificate for `params`, issued by `issuer` and signed by
/// `signer`.
///
/// The policy's fixed extensions come first (Basic Constraints for a CA, then Key
/// Usage, Subject Key Identifier and Authority Key Identifier), followed by the
/// caller's extensions in the order given.
pub fn build_certificate(
    params: &CertificateParams,
    issuer: &IssuerIdentity,
    signer: &dyn SigningService,
) -> Result<Certificate> {
    let issuer_key_id = issuer_key_identifier(issuer)?;
    let spki = params.subject_public_key.to_spki()?;
    let subject_key_id = key_identifier_of(&spki);
    check_policy(params, issuer, &subject_key_id)?;
    check_signer(issuer, issuer_key_id, signer)?;

    let extensions = assemble_extensions(params, issuer, &spki)?;
    let serial_number = match &params.serial_number {
        Some(serial) => serial.clone(),
        None => SerialNumber::generate()?,
    };
    let algorithm = params.signature_algorithm;

    let tbs_certificate = TbsCertificate {
        version: Version::V3,
        serial_number,
        signature: algorithm.algorithm_identifier()?,
        issuer: issuer.name.clone(),
        validity: Validity::new(params.validity.not_before, params.validity.not_after)?,
        subject: params.subject.as_name()?,
        subject_public_key_info: spki,
        issuer_unique_id: None,
        subject_unique_id: None,
        extensions: Some(extensions),
    };

    let tbs_der = tbs_certificate.to_der()?;
    let digest = algorithm.digest(&tbs_der);
    let signature = signer.sign_digest(algorithm, &digest)?;

    let cert = Certificate {
        tbs_certificate,
        signature_algorithm: algorithm.algorithm_identifier()?,
        signature: BitString::from_bytes(&signature).map_err(CertForgeError::encoding)?,
    };
    tracing::debug!(
        subject = %cert.subject(),
        issuer = %cert.issuer(),
        policy = ?params.policy,
        tbs_len = tbs_der.len(),
        "built certificate"
    );
    Ok(cert)
}

fn policy_oids(policy: ExtensionPolicy) -> &'static [ObjectIdentifier] {
    match policy {
        ExtensionPolicy::CaRoot => &[
            oid::BASIC_CONSTRAINTS,
            oid::KEY_USAGE,
            oid::SUBJECT_KEY_IDENTIFIER,
            oid::AUTHORITY_KEY_IDENTIFIER,
        ],
        ExtensionPolicy::ServerLeaf => &[
            oid::KEY_USAGE,
            oid::SUBJECT_KEY_IDENTIFIER,
            oid::AUTHORITY_KEY_IDENTIFIER,
        ],
    }
}

fn check_policy(
    params: &CertificateParams,
    issuer: &IssuerIdentity,
    subject_key_id: &[u8],
) -> Result<()> {
    match params.policy {
        ExtensionPolicy::CaRoot => {
            if issuer.key_identifier.as_deref() != Some(subject_key_id) {
                return Err(CertForgeError::PolicyViolation(
                    "a CA root must be self-signed".to_string(),
                ));
            }
        }
        ExtensionPolicy::ServerLeaf => {
            if params.path_len_constraint.is_some() {
                return Err(CertForgeError::PolicyViolation(
                    "a server leaf cannot carry a path length constraint".to_string(),
                ));
            }
            for ext in &params.extensions {
                check_leaf_extension(ext)?;
            }
        }
    }

    let mut seen: HashSet<ObjectIdentifier> = policy_oids(params.policy).iter().copied().collect();
    for ext in &params.extensions {
        if !seen.insert(ext.oid) {
            return Err(CertForgeError::PolicyViolation(format!(
                "duplicate {} extension",
                oid::name_of(&ext.oid)
            )));
        }
    }
    Ok(())
}

fn check_leaf_extension(ext: &ExtensionParam) -> Result<()> {
    if ext.oid == BasicConstraints::OID && ext.to_extension::<BasicConstraints>()?.is_ca {
        return Err(CertForgeError::PolicyViolation(
            "a server leaf cannot assert cA".to_string(),
        ));
    }
    if ext.oid == KeyUsage::OID {
        let ku = ext.to_extension::<KeyUsage>()?;
        if ku.contains(KeyUsages::KeyCertSign) || ku.contains(KeyUsages::CRLSign) {
            return Err(CertForgeError::PolicyViolation(
                "a server leaf cannot assert keyCertSign or cRLSign".to_string(),
            ));
        }
    }
    Ok(())
}

// Checked before any policy rule so every policy reports a missing identifier alike.
fn issuer_key_identifier(issuer: &IssuerIdentity) -> Result<&[u8]> {
    match issuer.key_identifier.as_deref() {
        Some(id) if !id.is_empty() => Ok(id),
        _ => Err(CertForgeError::MissingIssuerIdentifier),
    }
}

fn check_signer(
    issuer: &IssuerIdentity,
    expected: &[u8],
    signer: &dyn SigningService,
) -> Result<()> {
    if signer.public_key().key_identifier()? != expected {
        return Err(CertForgeError::InvalidInput(format!(
            "signing key does not match the key identifier of {}",
            issuer.name
        )));
    }
    Ok(())
}

fn assemble_extensions(
    params: &CertificateParams,
    issuer: &IssuerIdentity,
    spki: &SubjectPublicKeyInfo,
) -> Result<Vec<Extension>> {
    let mut fixed = Vec::with_capacity(4);
    if params.policy.is_ca() {
        fixed.push(extensions::basic_constraints_extension(params.path_len_constraint)?);
    }
    fixed.push(extensions::key_usage_extension(params.policy)?);
    fixed.push(extensions::subject_key_identifier_extension(spki)?);
    fixed.push(extensions::authority_key_identifier_extension(
        issuer.key_identifier.as_deref(),
    )?);
    tracing::debug!(
        policy = ?params.policy,
        fixed = fixed.len(),
        extra = params.extensions.len(),
        "assembled extensions"
    );

    fixed
        .iter()
        .chain(&params.extensions)
        .map(ExtensionParam::to_x509_extension)
        .collect()
}
