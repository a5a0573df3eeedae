//! Incoming rating records and the intermediate ratings file.
//!
//! The export step persists one record per line, four fields joined by `||`:
//!
//! ```text
//! source_path||rating(0-5)||play_date(ISO-8601 or empty)||play_count
//! ```
//!
//! The file doubles as a cache: if it exists, `segue sync` consumes it
//! directly instead of re-running the AppleScript export. Malformed lines
//! are logged and skipped; they never abort a run.

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use log::{debug, warn};
use std::fs;
use std::path::Path;

/// Field delimiter of the ratings file. `|` never occurs in catalog paths.
pub const FIELD_DELIMITER: &str = "||";

/// Timestamp layout used in the ratings file and the annotation store.
/// Lexicographic order on this layout is chronological order, which the
/// merge statement relies on.
pub const ISO_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// One track's listening metadata as exported from the source catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct IncomingRecord {
    /// Source-catalog path: colon-separated, starting with a volume label.
    pub source_path: String,
    /// Star rating on the 0-5 scale, 0 meaning unrated.
    pub rating: u8,
    /// Most recent play, if the track was ever played.
    pub play_date: Option<NaiveDateTime>,
    /// Cumulative play count reported by the source catalog.
    pub play_count: u32,
}

impl IncomingRecord {
    /// Scale the source catalog's native 0-100 rating down to 0-5 stars.
    #[must_use]
    pub fn rating_from_native(native: u32) -> u8 {
        (native / 20).min(5) as u8
    }

    /// Parse one line of the ratings file.
    ///
    /// Returns `None` (after logging a warning) for lines that fail
    /// field-count or numeric validation, so a damaged line costs one
    /// record and not the batch.
    pub fn parse_line(line: &str) -> Option<Self> {
        let parts: Vec<&str> = line.split(FIELD_DELIMITER).collect();
        if parts.len() != 4 {
            warn!(
                "Skipping malformed record (expected 4 fields, got {}): {line}",
                parts.len()
            );
            return None;
        }

        let rating: u8 = match parts[1].parse() {
            Ok(r) if r <= 5 => r,
            Ok(r) => {
                warn!("Skipping record with out-of-range rating {r}: {}", parts[0]);
                return None;
            }
            Err(_) => {
                warn!("Skipping record with non-numeric rating '{}': {}", parts[1], parts[0]);
                return None;
            }
        };

        let play_count: u32 = match parts[3].parse() {
            Ok(c) => c,
            Err(_) => {
                warn!(
                    "Skipping record with non-numeric play count '{}': {}",
                    parts[3], parts[0]
                );
                return None;
            }
        };

        let play_date = if parts[2].is_empty() {
            None
        } else {
            match NaiveDateTime::parse_from_str(parts[2], ISO_FORMAT) {
                Ok(dt) => Some(dt),
                Err(_) => {
                    warn!(
                        "Skipping record with unparseable play date '{}': {}",
                        parts[2], parts[0]
                    );
                    return None;
                }
            }
        };

        Some(Self {
            source_path: parts[0].to_string(),
            rating,
            play_date,
            play_count,
        })
    }

    /// Serialize into the four-field line format.
    #[must_use]
    pub fn to_line(&self) -> String {
        let play_date = self
            .play_date
            .map(|d| d.format(ISO_FORMAT).to_string())
            .unwrap_or_default();
        [
            self.source_path.clone(),
            self.rating.to_string(),
            play_date,
            self.play_count.to_string(),
        ]
        .join(FIELD_DELIMITER)
    }
}

/// Read all well-formed records from the ratings file at `path`.
pub fn read_records(path: &Path) -> Result<Vec<IncomingRecord>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read ratings file at {}", path.display()))?;

    let records: Vec<IncomingRecord> = contents
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(IncomingRecord::parse_line)
        .collect();

    debug!("Read {} records from {}", records.len(), path.display());
    Ok(records)
}

/// Write `records` to the ratings file at `path`, one line each.
pub fn write_records(path: &Path, records: &[IncomingRecord]) -> Result<()> {
    let mut contents = String::new();
    for record in records {
        contents.push_str(&record.to_line());
        contents.push('\n');
    }

    fs::write(path, contents)
        .with_context(|| format!("Failed to write ratings file at {}", path.display()))?;

    debug!("Wrote {} records to {}", records.len(), path.display());
    Ok(())
}
