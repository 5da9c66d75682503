//! # certforge - X.509v3 certificates built from scratch
//!
//! certforge assembles RFC 5280 certificate structures directly in DER, attaches the
//! standard extensions a small PKI needs and signs them with RSA PKCS#1 v1.5. It is
//! built on the rustcrypto `der` and `rsa` crates; no certificate-authority library
//! is involved.
//!
//! ## Supported Key Types
//!
//! - **RSA**: 1024 bits and up, signed with SHA-256 (default), SHA-384 or SHA-512
//!
//! ## Supported Certificate Formats
//!
//! - **DER**: Distinguished Encoding Rules (binary format)
//! - **PEM**: base64 DER in `-----BEGIN CERTIFICATE-----` armor
//!
//! ## Extensions
//!
//! Every certificate gets a fixed extension set chosen by its
//! [`ExtensionPolicy`](cert::params::ExtensionPolicy):
//!
//! | Policy       | Basic Constraints       | Key Usage                              | SKI | AKI |
//! |--------------|-------------------------|----------------------------------------|-----|-----|
//! | `CaRoot`     | `cA`, critical          | `keyCertSign`, `cRLSign`, critical     | yes | yes |
//! | `ServerLeaf` | absent                  | `digitalSignature`, `keyEncipherment`  | yes | yes |
//!
//! A leaf's Authority Key Identifier always equals its issuer's Subject Key Identifier.
//!
//! ## Quick Start
//!
//! ### Creating a Certificate Chain
//!
//! ```rust,no_run
//! use certforge::{
//!     key::{KeyPair, SigningService},
//!     cert::{Certificate, CertificateWithPrivateKey, params::{CertificateParams, DistinguishedName, ExtensionPolicy}},
//!     issuer::Issuer,
//! };
//!
//! # fn main() -> Result<(), certforge::error::CertForgeError> {
//! // Keys first: generation is the slow part
//! let ca_key = KeyPair::generate_rsa(2048)?;
//! let server_key = KeyPair::generate_rsa(2048)?;
//!
//! let ca_params = CertificateParams::builder()
//!     .subject(DistinguishedName::builder().common_name("My CA".to_string()).build())
//!     .subject_public_key(ca_key.public_key())
//!     .policy(ExtensionPolicy::CaRoot)
//!     .path_len_constraint(0)
//!     .build();
//! let ca = CertificateWithPrivateKey::new(Certificate::new_self_signed(&ca_params, &ca_key)?, ca_key)?;
//!
//! let server_params = CertificateParams::builder()
//!     .subject(DistinguishedName::builder().common_name("localhost".to_string()).build())
//!     .subject_public_key(server_key.public_key())
//!     .policy(ExtensionPolicy::ServerLeaf)
//!     .build();
//! let server_cert = ca.issue(&server_params)?;
//!
//! server_cert.verify_issued_by(&ca.cert)?;
//! println!("{}", server_cert.to_pem()?);
//! # Ok(())
//! # }
//! ```
//!
//! ### Bringing Your Own Signer
//!
//! [`builder::build_certificate`] only needs a [`key::SigningService`], so the private
//! key can live in an HSM or behind a remote API.
//!
//! ## Error Handling
//!
//! ```rust
//! use certforge::{cert::Certificate, error::{CertForgeError, DecodingFailure}};
//!
//! match Certificate::from_der(&[0x30, 0x05, 0x02]) {
//!     Ok(_) => unreachable!(),
//!     Err(CertForgeError::DecodingFailure(DecodingFailure::TruncatedInput { .. })) => {}
//!     Err(e) => panic!("unexpected error: {e}"),
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`key`]: RSA key pairs and the signing service contract
//! - [`cert`]: Certificates, parameters and extensions
//! - [`builder`]: TBS assembly, policy checks and signing
//! - [`issuer`]: Certificate issuing functionality
//! - [`codec`]: DER entry points, times and serial numbers
//! - [`tbs_certificate`]: Low-level certificate structures
//! - [`oid`]: Object identifier table
//! - [`pem_utils`]: PEM armor
//! - [`error`]: Error types

pub mod builder;
pub mod cert;
pub mod codec;
pub mod error;
pub mod issuer;
pub mod key;
pub mod oid;
pub mod pem_utils;
pub mod tbs_certificate;
