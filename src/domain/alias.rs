//! DNS alias domain types
//!
//! [`AliasSet`] is what the reconciler asks the alias repository to converge;
//! [`RecordSet`] and [`RecordChange`] are the record-level vocabulary the
//! ownership protocol speaks to the DNS store.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// DNS record types the engine reads or writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RecordType {
    A,
    #[serde(rename = "AAAA")]
    Aaaa,
    #[serde(rename = "TXT")]
    Txt,
}

impl RecordType {
    /// Address records carry the alias to the distribution
    pub fn is_address(&self) -> bool {
        matches!(self, RecordType::A | RecordType::Aaaa)
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordType::A => write!(f, "A"),
            RecordType::Aaaa => write!(f, "AAAA"),
            RecordType::Txt => write!(f, "TXT"),
        }
    }
}

/// One domain and the address record types it should carry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasEntry {
    pub domain: String,
    pub record_types: BTreeSet<RecordType>,
}

impl AliasEntry {
    /// Entry with A records, plus AAAA when IPv6 is enabled
    pub fn for_domain(domain: impl Into<String>, ipv6_enabled: bool) -> Self {
        let mut record_types = BTreeSet::from([RecordType::A]);
        if ipv6_enabled {
            record_types.insert(RecordType::Aaaa);
        }
        Self { domain: domain.into(), record_types }
    }
}

/// Alias records pointing a set of domains at one target.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasSet {
    /// DNS name of the distribution
    pub target: String,
    pub entries: Vec<AliasEntry>,
}

impl AliasSet {
    pub fn new(target: impl Into<String>, entries: Vec<AliasEntry>) -> Self {
        Self { target: target.into(), entries }
    }

    /// Desired aliases for the given domains
    pub fn desired<'a>(
        target: impl Into<String>,
        domains: impl IntoIterator<Item = &'a String>,
        ipv6_enabled: bool,
    ) -> Self {
        let entries =
            domains.into_iter().map(|d| AliasEntry::for_domain(d.clone(), ipv6_enabled)).collect();
        Self::new(target, entries)
    }

    /// Persisted domains that are no longer desired.
    ///
    /// Deletion always covers both address record types; the protocol only
    /// deletes the ones that actually exist.
    pub fn to_delete<'a>(
        persisted: impl IntoIterator<Item = &'a String>,
        desired: &BTreeSet<String>,
    ) -> Self {
        let entries = persisted
            .into_iter()
            .filter(|domain| !desired.contains(*domain))
            .map(|domain| AliasEntry::for_domain(domain.clone(), true))
            .collect();
        Self::new(String::new(), entries)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn domains(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.domain.as_str())
    }
}

/// A DNS record set as stored by the DNS backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSet {
    pub name: String,
    pub record_type: RecordType,
    /// Alias target for address records
    pub alias_target: Option<String>,
    /// Record values; for TXT records each value is one ownership token
    pub values: Vec<String>,
}

impl RecordSet {
    pub fn alias(name: impl Into<String>, record_type: RecordType, target: impl Into<String>) -> Self {
        Self { name: name.into(), record_type, alias_target: Some(target.into()), values: vec![] }
    }

    pub fn txt(name: impl Into<String>, values: Vec<String>) -> Self {
        Self { name: name.into(), record_type: RecordType::Txt, alias_target: None, values }
    }
}

/// Mutation applied to one record set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeAction {
    Upsert,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordChange {
    pub action: ChangeAction,
    pub record: RecordSet,
}

/// Changes submitted to the DNS backend as one atomic batch.
pub type ChangeBatch = Vec<RecordChange>;
