//! Shared output formatting utilities for CLI commands

use anyhow::{Context, Result};
use serde::Serialize;

use crate::domain::SecretRecord;
use crate::storage::MigrationInfo;

/// Print data as pretty JSON
pub fn print_json<T: Serialize>(data: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(data).context("Failed to serialize to JSON")?;
    println!("{}", json);
    Ok(())
}

/// Truncate string to maximum length with ellipsis
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Print a table header
pub fn print_table_header(columns: &[(&str, usize)]) {
    println!();
    let header: String =
        columns.iter().map(|(name, width)| format!("{:<width$} ", name, width = width)).collect();
    println!("{}", header.trim_end());
    let width: usize = columns.iter().map(|(_, w)| w + 1).sum();
    println!("{}", "-".repeat(width));
}

/// Print secret listings without values
pub fn print_secrets_table(records: &[SecretRecord]) {
    if records.is_empty() {
        println!("No secrets stored");
        return;
    }

    print_table_header(&[("Name", 30), ("Category", 12), ("Origin", 14), ("Description", 40)]);
    for record in records {
        println!(
            "{:<30} {:<12} {:<14} {}",
            truncate(&record.display_name, 30),
            truncate(&record.category, 12),
            record.origin,
            truncate(&record.description, 40)
        );
    }
    println!();
}

/// Print migrations in a formatted table
pub fn print_migrations_table(migrations: &[MigrationInfo]) {
    print_table_header(&[("Version", 15), ("Description", 50), ("Applied On", 20), ("Time (ms)", 10)]);

    for migration in migrations {
        println!(
            "{:<15} {:<50} {:<20} {:<10}",
            migration.version,
            truncate(&migration.description, 48),
            migration.installed_on.format("%Y-%m-%d %H:%M:%S"),
            migration.execution_time_ms
        );
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("this is a very long string", 10), "this is...");
        assert_eq!(truncate("ééééééé", 5), "éé...");
    }

    #[test]
    fn test_print_json() {
        assert!(print_json(&serde_json::json!({"name": "API Key"})).is_ok());
    }
}
