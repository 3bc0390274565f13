use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use iohelper_platform::FileEntry;

/// Display order for directory listings. Backends return entries unordered;
/// ordering is purely a presentation concern.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingOrder {
    #[default]
    Filesystem,
    DirsFirst,
}

pub fn sort_entries(entries: &mut [FileEntry], order: ListingOrder) {
    match order {
        ListingOrder::Filesystem => {}
        // Sort: directories first, then alphabetically
        ListingOrder::DirsFirst => entries.sort_by(|a, b| {
            b.is_dir
                .cmp(&a.is_dir)
                .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        }),
    }
}

/// RFC 3339 UTC rendering of an epoch-seconds timestamp, `-` when unknown.
pub fn format_modified(modified: Option<u64>) -> String {
    modified
        .and_then(|secs| i64::try_from(secs).ok())
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_else(|| "-".to_string())
}

pub fn format_bytes(bytes: u64) -> String {
    if bytes == 0 {
        return "0 B".to_string();
    }
    let units = ["B", "KB", "MB", "GB", "TB"];
    let i = (bytes as f64).log(1024.0).floor() as usize;
    let i = i.min(units.len() - 1);
    let val = bytes as f64 / 1024f64.powi(i as i32);
    if i == 0 {
        format!("{} {}", val as u64, units[i])
    } else {
        format!("{:.1} {}", val, units[i])
    }
}

/// One table row: name, type, human size, last modified.
pub fn format_entry(entry: &FileEntry) -> String {
    format!(
        "{:<32} {:<9} {:>10} {}",
        entry.name,
        entry.kind_label(),
        format_bytes(entry.size),
        format_modified(entry.modified),
    )
}

pub fn format_table(entries: &[FileEntry]) -> String {
    let mut out = format!("{:<32} {:<9} {:>10} {}\n", "NAME", "TYPE", "SIZE", "MODIFIED");
    for entry in entries {
        out.push_str(&format_entry(entry));
        out.push('\n');
    }
    out
}

/// Multi-line stat report for a single entry.
pub fn format_stat(entry: &FileEntry) -> String {
    format!(
        "File Name: {}\nSize: {}\nPermissions: {}\nLast Modified: {}\nIs Directory: {}\n",
        entry.name,
        entry.size,
        entry.permissions.as_deref().unwrap_or("-"),
        format_modified(entry.modified),
        entry.is_dir,
    )
}

/// Split text into lines. A trailing newline does not yield an empty last
/// row and `\r\n` endings are accepted.
pub fn rows(content: &str) -> Vec<&str> {
    content.lines().collect()
}
