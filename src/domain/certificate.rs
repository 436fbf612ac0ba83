//! Certificate directory entries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status reported by the certificate directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CertificateStatus {
    PendingValidation,
    Issued,
    Expired,
    Revoked,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certificate {
    pub arn: String,
    /// Primary domain of the certificate
    pub domain_name: String,
    pub subject_alternative_names: Vec<String>,
    pub status: CertificateStatus,
    pub not_after: Option<DateTime<Utc>>,
}

impl Certificate {
    pub fn issued(arn: impl Into<String>, domain_name: impl Into<String>) -> Self {
        Self {
            arn: arn.into(),
            domain_name: domain_name.into(),
            subject_alternative_names: vec![],
            status: CertificateStatus::Issued,
            not_after: None,
        }
    }

    pub fn with_alternative_name(mut self, name: impl Into<String>) -> Self {
        self.subject_alternative_names.push(name.into());
        self
    }

    /// Issued and not past its expiry at `now`
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        self.status == CertificateStatus::Issued && self.not_after.map_or(true, |t| t > now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn usable_requires_issued_and_unexpired() {
        let now = Utc::now();
        let cert = Certificate::issued("arn:cert", "example.com");
        assert!(cert.is_usable(now));

        let expired = Certificate { not_after: Some(now - Duration::days(1)), ..cert.clone() };
        assert!(!expired.is_usable(now));

        let pending = Certificate { status: CertificateStatus::PendingValidation, ..cert };
        assert!(!pending.is_usable(now));
    }
}
