//! Output formatting for CLI commands

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::Serialize;

use crate::domain::ReconciliationStatus;

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
    Table,
}

/// Print data as JSON or YAML
pub fn print_structured<T: Serialize>(data: &T, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(data),
        OutputFormat::Yaml => print_yaml(data),
        OutputFormat::Table => anyhow::bail!("Table output is not available for this command"),
    }
}

pub fn print_json<T: Serialize>(data: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(data).context("Failed to serialize to JSON")?;
    println!("{}", json);
    Ok(())
}

pub fn print_yaml<T: Serialize>(data: &T) -> Result<()> {
    let yaml = serde_yaml::to_string(data).context("Failed to serialize to YAML")?;
    println!("{}", yaml);
    Ok(())
}

/// One row per status record
pub fn status_table(statuses: &[ReconciliationStatus]) -> String {
    let mut out = format!(
        "{:<20} {:<16} {:<36} {:<8} {:<6}\n",
        "Group", "Distribution", "Address", "Synced", "Aliases"
    );
    out.push_str(&"-".repeat(90));
    out.push('\n');

    for status in statuses {
        let synced = status.descriptors.values().filter(|synced| **synced).count();
        out.push_str(&format!(
            "{:<20} {:<16} {:<36} {:<8} {:<6}\n",
            truncate(status.group.as_str(), 20),
            status.distribution_id.as_ref().map(|id| id.as_str()).unwrap_or("-"),
            truncate(status.address.as_deref().unwrap_or("-"), 36),
            format!("{}/{}", synced, status.descriptors.len()),
            status.aliases.len()
        ));
    }
    out
}

/// Truncate string to maximum length with ellipsis
fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        format!("{}...", &s[..max_len.saturating_sub(3)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DescriptorRef, GroupName};

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello world", 8), "hello...");
    }

    #[test]
    fn test_status_table_rows() {
        let mut status = ReconciliationStatus::new(GroupName::new("public"));
        status.record_sync(&DescriptorRef::new("default", "web"), true);
        status.record_sync(&DescriptorRef::new("default", "api"), false);

        let table = status_table(&[status]);
        let row = table.lines().nth(2).unwrap();
        assert!(row.starts_with("public"));
        assert!(row.contains("1/2"));
    }

    #[test]
    fn test_table_rejected_for_structured_output() {
        assert!(print_structured(&"x", OutputFormat::Table).is_err());
        assert!(print_structured(&"x", OutputFormat::Json).is_ok());
    }
}
