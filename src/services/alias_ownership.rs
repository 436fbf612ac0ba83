//! DNS alias ownership protocol
//!
//! Every address record this system manages is paired with a TXT record at
//! the same name whose values include this system's ownership token. An
//! address record without such a TXT record belongs to someone else and is
//! never touched. TXT records may carry tokens of several owners; only our
//! own token is ever added or removed.
//!
//! Each alias entry is planned from the records currently stored at its name
//! and submitted as one change batch. Entries fail independently.
//!
//! Deleting a name that no longer carries our token releases it without any
//! DNS change: the records belong to someone else now, and our claim ends.

use crate::domain::{
    AliasEntry, AliasSet, ChangeAction, ChangeBatch, RecordChange, RecordSet, RecordType,
};
use crate::errors::{EdgeplaneError, Result};
use crate::storage::{AliasRepository, AliasSyncReport, DnsRecordRepository};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Resource type of conflicts raised when another owner holds the name
pub const OWNERSHIP_CONFLICT: &str = "dns_ownership";

/// Resource type of conflicts raised for address records nobody claims
pub const UNMANAGED_RECORD: &str = "dns_unmanaged_record";

/// Alias repository enforcing TXT-token ownership over a raw DNS store.
pub struct AliasOwnershipProtocol {
    dns: Arc<dyn DnsRecordRepository>,
    ownership_token: String,
}

impl AliasOwnershipProtocol {
    pub fn new(dns: Arc<dyn DnsRecordRepository>, ownership_token: impl Into<String>) -> Self {
        Self { dns, ownership_token: ownership_token.into() }
    }

    #[instrument(skip(self, entry), fields(domain = %entry.domain), name = "upsert_alias")]
    async fn upsert_entry(&self, target: &str, entry: &AliasEntry) -> Result<()> {
        let existing = self.dns.list_record_sets(&entry.domain).await?;
        let batch = plan_upsert(&existing, target, entry, &self.ownership_token)?;
        self.submit(batch).await
    }

    #[instrument(skip(self, entry), fields(domain = %entry.domain), name = "delete_alias")]
    async fn delete_entry(&self, entry: &AliasEntry) -> Result<()> {
        let existing = self.dns.list_record_sets(&entry.domain).await?;
        match plan_delete(&existing, entry, &self.ownership_token) {
            DeletePlan::Release(batch) => self.submit(batch).await,
            DeletePlan::NotOwned(reason) => {
                warn!(reason = %reason, "Alias no longer owned; released without DNS changes");
                Ok(())
            }
        }
    }

    async fn submit(&self, batch: ChangeBatch) -> Result<()> {
        if batch.is_empty() {
            debug!("No DNS changes required");
            return Ok(());
        }
        debug!(changes = batch.len(), "Submitting DNS change batch");
        self.dns.apply(batch).await
    }
}

#[async_trait]
impl AliasRepository for AliasOwnershipProtocol {
    async fn upsert(&self, aliases: &AliasSet) -> AliasSyncReport {
        let mut report = AliasSyncReport::default();
        for entry in &aliases.entries {
            match self.upsert_entry(&aliases.target, entry).await {
                Ok(()) => report.succeeded.push(entry.domain.clone()),
                Err(error) => {
                    warn!(domain = %entry.domain, error = %error, "Alias upsert failed");
                    report.errors.push(error);
                }
            }
        }
        info!(
            target = %aliases.target,
            upserted = report.succeeded.len(),
            failed = report.errors.len(),
            "Alias records upserted"
        );
        report
    }

    async fn delete(&self, aliases: &AliasSet) -> AliasSyncReport {
        let mut report = AliasSyncReport::default();
        for entry in &aliases.entries {
            match self.delete_entry(entry).await {
                Ok(()) => report.succeeded.push(entry.domain.clone()),
                Err(error) => {
                    warn!(domain = %entry.domain, error = %error, "Alias delete failed");
                    report.errors.push(error);
                }
            }
        }
        info!(
            deleted = report.succeeded.len(),
            failed = report.errors.len(),
            "Alias records deleted"
        );
        report
    }
}

fn find_txt(existing: &[RecordSet]) -> Option<&RecordSet> {
    existing.iter().find(|r| r.record_type == RecordType::Txt)
}

fn address_records(existing: &[RecordSet]) -> impl Iterator<Item = &RecordSet> {
    existing.iter().filter(|r| r.record_type.is_address())
}

fn ownership_conflict(domain: &str, txt: &RecordSet) -> EdgeplaneError {
    EdgeplaneError::conflict(
        format!(
            "TXT record at '{}' is owned by another system ({})",
            domain,
            txt.values.join(", ")
        ),
        OWNERSHIP_CONFLICT,
    )
}

fn unmanaged_records(domain: &str) -> EdgeplaneError {
    EdgeplaneError::conflict(
        format!("address records at '{}' exist without an ownership TXT record", domain),
        UNMANAGED_RECORD,
    )
}

/// Changes that make `entry` alias `target`, or an error when the name is not ours.
pub fn plan_upsert(
    existing: &[RecordSet],
    target: &str,
    entry: &AliasEntry,
    token: &str,
) -> Result<ChangeBatch> {
    let txt = find_txt(existing);
    match txt {
        Some(txt) if !txt.values.iter().any(|v| v == token) => {
            return Err(ownership_conflict(&entry.domain, txt));
        }
        None if address_records(existing).next().is_some() => {
            return Err(unmanaged_records(&entry.domain));
        }
        _ => {}
    }

    let mut batch: ChangeBatch = entry
        .record_types
        .iter()
        .map(|record_type| RecordChange {
            action: ChangeAction::Upsert,
            record: RecordSet::alias(&entry.domain, *record_type, target),
        })
        .collect();

    // Address types we own but no longer want (IPv6 switched off).
    batch.extend(
        address_records(existing)
            .filter(|r| !entry.record_types.contains(&r.record_type))
            .map(|r| RecordChange { action: ChangeAction::Delete, record: r.clone() }),
    );

    let mut tokens: Vec<String> = txt.map(|t| t.values.clone()).unwrap_or_default();
    if !tokens.iter().any(|v| v == token) {
        tokens.push(token.to_string());
    }
    batch.push(RecordChange {
        action: ChangeAction::Upsert,
        record: RecordSet::txt(&entry.domain, tokens),
    });

    Ok(batch)
}

/// Outcome of planning an alias deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeletePlan {
    /// The name is ours; apply these changes (possibly none) to release it
    Release(ChangeBatch),
    /// The records at the name are not ours to touch
    NotOwned(String),
}

/// Changes that release `entry`.
pub fn plan_delete(existing: &[RecordSet], entry: &AliasEntry, token: &str) -> DeletePlan {
    let txt = match find_txt(existing) {
        Some(txt) if !txt.values.iter().any(|v| v == token) => {
            return DeletePlan::NotOwned(ownership_conflict(&entry.domain, txt).to_string());
        }
        None if address_records(existing).next().is_some() => {
            return DeletePlan::NotOwned(unmanaged_records(&entry.domain).to_string());
        }
        None => return DeletePlan::Release(vec![]),
        Some(txt) => txt,
    };

    let mut batch: ChangeBatch = address_records(existing)
        .filter(|r| entry.record_types.contains(&r.record_type))
        .map(|r| RecordChange { action: ChangeAction::Delete, record: r.clone() })
        .collect();

    let others: Vec<String> = txt.values.iter().filter(|v| *v != token).cloned().collect();
    if others.is_empty() {
        batch.push(RecordChange { action: ChangeAction::Delete, record: txt.clone() });
    } else {
        batch.push(RecordChange {
            action: ChangeAction::Upsert,
            record: RecordSet::txt(&entry.domain, others),
        });
    }

    DeletePlan::Release(batch)
}
