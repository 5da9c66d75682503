use crate::builder::{IssuerIdentity, build_certificate};
use crate::cert::Certificate;
use crate::cert::params::CertificateParams;
use crate::codec::Result;
use crate::key::SigningService;
use crate::tbs_certificate::Name;

/// Represents an entity capable of issuing certificates.
///
/// This trait provides methods to retrieve issuer details and issue certificates.
pub trait Issuer {
    /// Returns the distinguished name of the issuer.
    fn issuer_name(&self) -> Result<Name>;

    /// Returns the signing key of the issuer.
    fn signing_key(&self) -> &dyn SigningService;

    /// Returns the issuer's subject key identifier, referenced by the Authority Key
    /// Identifier of every certificate it issues.
    fn key_identifier(&self) -> Result<Option<Vec<u8>>>;

    /// Rejects issuers that may not sign certificates. Called before every issue.
    fn ensure_can_issue(&self) -> Result<()> {
        Ok(())
    }

    /// Issues a certificate based on the provided parameters.
    fn issue(&self, params: &CertificateParams) -> Result<Certificate> {
        self.ensure_can_issue()?;
        let identity = IssuerIdentity {
            name: self.issuer_name()?,
            key_identifier: self.key_identifier()?,
        };
        build_certificate(params, &identity, self.signing_key())
    }
}
