//! Writes keys and certificates to disk. Three modes:
//!
//! - `privkey <path>`: a fresh RSA key as `<path>.der` (PKCS#1) / `<path>.pem` (PKCS#8)
//! - `selfsigned <prefix>`: a key and a self-signed `localhost` certificate, as
//!   `<prefix>-key.{der,pem}` and `<prefix>-cert.{der,pem}`
//! - `certified <prefix>` (the default): a CA and a `localhost` server certificate
//!   signed by it, as `<prefix>-cacert.{der,pem}`, `<prefix>-key.{der,pem}` and
//!   `<prefix>-cert.{der,pem}`
//!
//! Run with `cargo run --example generate -- selfsigned out/demo`. Set
//! `RUST_LOG=certforge=debug` to see each certificate as it is built.

use std::path::Path;

use anyhow::Context;
use certforge::cert::params::{CertificateParams, DistinguishedName, ExtensionPolicy};
use certforge::cert::{Certificate, CertificateWithPrivateKey};
use certforge::codec::SerialNumber;
use certforge::issuer::Issuer;
use certforge::key::{KeyPair, SigningService};
use certforge::pem_utils::{CERTIFICATE_LABEL, der_to_pem};
use tracing_subscriber::EnvFilter;

const KEY_BITS: usize = 2048;

fn write_der_and_pem(prefix: &str, der: &[u8], pem: &str) -> anyhow::Result<()> {
    if let Some(dir) = Path::new(prefix).parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }
    std::fs::write(format!("{prefix}.der"), der).with_context(|| format!("writing {prefix}.der"))?;
    std::fs::write(format!("{prefix}.pem"), pem).with_context(|| format!("writing {prefix}.pem"))?;
    tracing::info!(path = prefix, "wrote DER and PEM");
    Ok(())
}

fn write_cert(prefix: &str, cert: &Certificate) -> anyhow::Result<()> {
    let der = cert.to_der()?;
    write_der_and_pem(prefix, &der, &der_to_pem(&der, CERTIFICATE_LABEL))
}

fn write_key(path: &str, key: &KeyPair) -> anyhow::Result<()> {
    write_der_and_pem(path, &key.export_pkcs1_der()?, &key.export_pkcs8_pem()?)
}

fn localhost() -> DistinguishedName {
    DistinguishedName::builder()
        .common_name("localhost".to_string())
        .build()
}

fn privkey(path: &str) -> anyhow::Result<()> {
    let key = KeyPair::generate_rsa(KEY_BITS)?;
    write_key(path, &key)?;
    println!("{}", key.export_pkcs8_pem()?);
    Ok(())
}

/// A leaf certifying its own key: issuer equals subject, AKI equals SKI.
fn selfsigned(prefix: &str) -> anyhow::Result<()> {
    let key = KeyPair::generate_rsa(KEY_BITS)?;
    write_key(&format!("{prefix}-key"), &key)?;
    let params = CertificateParams::builder()
        .subject(localhost())
        .subject_public_key(key.public_key())
        .policy(ExtensionPolicy::ServerLeaf)
        .serial_number(SerialNumber::try_from(1u64)?)
        .build();
    let cert = Certificate::new_self_signed(&params, &key)?;
    cert.verify_issued_by(&cert)?;
    write_cert(&format!("{prefix}-cert"), &cert)?;

    println!("{}", cert.to_pem()?);
    Ok(())
}

fn certified(prefix: &str) -> anyhow::Result<()> {
    // CA certificate
    let ca_key = KeyPair::generate_rsa(KEY_BITS)?;
    let ca_params = CertificateParams::builder()
        .subject(
            DistinguishedName::builder()
                .common_name("My CA".to_string())
                .build(),
        )
        .subject_public_key(ca_key.public_key())
        .policy(ExtensionPolicy::CaRoot)
        .path_len_constraint(0)
        .serial_number(SerialNumber::try_from(1u64)?)
        .build();
    let ca_cert = Certificate::new_self_signed(&ca_params, &ca_key)?;
    // The CA key is only needed to sign the server certificate
    write_cert(&format!("{prefix}-cacert"), &ca_cert)?;
    let ca = CertificateWithPrivateKey::new(ca_cert, ca_key)?;

    // Server certificate
    let server_key = KeyPair::generate_rsa(KEY_BITS)?;
    write_key(&format!("{prefix}-key"), &server_key)?;
    let server_params = CertificateParams::builder()
        .subject(localhost())
        .subject_public_key(server_key.public_key())
        .policy(ExtensionPolicy::ServerLeaf)
        .serial_number(SerialNumber::try_from(2u64)?)
        .build();
    let server_cert = ca.issue(&server_params)?;
    server_cert.verify_issued_by(&ca.cert)?;
    write_cert(&format!("{prefix}-cert"), &server_cert)?;

    println!("{}", server_cert.to_pem()?);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("certforge=info".parse()?),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let mode = args.next().unwrap_or_else(|| "certified".to_string());
    let target = args.next().unwrap_or_else(|| "certforge".to_string());
    match mode.as_str() {
        "privkey" => privkey(&target),
        "selfsigned" => selfsigned(&target),
        "certified" => certified(&target),
        other => anyhow::bail!("unknown mode {other:?}; expected privkey, selfsigned or certified"),
    }
}
