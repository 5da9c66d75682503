#![allow(dead_code)]

use std::sync::OnceLock;

use certforge::cert::params::{CertificateParams, DistinguishedName, ExtensionPolicy};
use certforge::cert::{Certificate, CertificateWithPrivateKey};
use certforge::codec::SerialNumber;
use certforge::key::{KeyPair, SigningService};

pub const TEST_KEY_BITS: usize = 1024;

pub fn ca_key() -> &'static KeyPair {
    static KEY: OnceLock<KeyPair> = OnceLock::new();
    KEY.get_or_init(|| KeyPair::generate_rsa(TEST_KEY_BITS).unwrap())
}

pub fn server_key() -> &'static KeyPair {
    static KEY: OnceLock<KeyPair> = OnceLock::new();
    KEY.get_or_init(|| KeyPair::generate_rsa(TEST_KEY_BITS).unwrap())
}

pub fn ca_params() -> CertificateParams {
    CertificateParams::builder()
        .subject(
            DistinguishedName::builder()
                .common_name("My CA".to_string())
                .build(),
        )
        .subject_public_key(ca_key().public_key())
        .policy(ExtensionPolicy::CaRoot)
        .path_len_constraint(0)
        .serial_number(SerialNumber::try_from(1u64).unwrap())
        .build()
}

pub fn server_params() -> CertificateParams {
    CertificateParams::builder()
        .subject(
            DistinguishedName::builder()
                .common_name("localhost".to_string())
                .build(),
        )
        .subject_public_key(server_key().public_key())
        .policy(ExtensionPolicy::ServerLeaf)
        .serial_number(SerialNumber::try_from(2u64).unwrap())
        .build()
}

pub fn generate_ca_cert() -> CertificateWithPrivateKey {
    let cert = Certificate::new_self_signed(&ca_params(), ca_key()).unwrap();
    CertificateWithPrivateKey::new(cert, ca_key().clone()).unwrap()
}
