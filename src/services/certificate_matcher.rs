//! Certificate selection
//!
//! Picks a certificate from the directory for the alternate domains of a
//! distribution.

use crate::domain::Certificate;
use crate::errors::{EdgeplaneError, Result};
use crate::storage::CertificateRepository;
use chrono::Utc;
use tracing::{debug, instrument};

/// Whether `certificate` covers `domain`.
///
/// The primary domain or an alternative name must equal the domain, or an
/// alternative name `*.rest` must have `rest` equal to the domain with its
/// first label stripped.
pub fn covers(certificate: &Certificate, domain: &str) -> bool {
    if certificate.domain_name.eq_ignore_ascii_case(domain) {
        return true;
    }

    let parent = domain.split_once('.').map(|(_, rest)| rest);
    certificate.subject_alternative_names.iter().any(|name| {
        if name.eq_ignore_ascii_case(domain) {
            return true;
        }
        match (name.strip_prefix("*."), parent) {
            (Some(suffix), Some(parent)) => suffix.eq_ignore_ascii_case(parent),
            _ => false,
        }
    })
}

/// First certificate, in input order, covering any of the target domains.
pub fn select<'a>(certificates: &'a [Certificate], domains: &[String]) -> Option<&'a Certificate> {
    certificates.iter().find(|cert| domains.iter().any(|domain| covers(cert, domain)))
}

/// Resolves certificates against the certificate directory.
pub struct CertificateMatcher<'a> {
    repository: &'a dyn CertificateRepository,
}

impl<'a> CertificateMatcher<'a> {
    pub fn new(repository: &'a dyn CertificateRepository) -> Self {
        Self { repository }
    }

    /// Find a usable certificate for the given domains.
    ///
    /// Fails with a build error when nothing matches.
    #[instrument(skip(self), name = "match_certificate")]
    pub async fn find(&self, domains: &[String]) -> Result<Certificate> {
        let now = Utc::now();
        let candidates =
            self.repository.find_by_filter(&|cert: &Certificate| cert.is_usable(now)).await?;

        debug!(candidates = candidates.len(), "Certificate candidates loaded");

        select(&candidates, domains).cloned().ok_or_else(|| {
            EdgeplaneError::build(format!(
                "no matching certificate for domains [{}]",
                domains.join(", ")
            ))
        })
    }
}
