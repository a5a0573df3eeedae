//! Extraction of listening metadata from the source catalog.
//!
//! Apple Music exposes per-track ratings and play history to AppleScript
//! only, so the export shells out to `osascript` with an embedded script
//! and parses what it prints. `osascript` joins the returned list items
//! with `", "`, a sequence that also occurs inside localized play dates,
//! so the volume label of the source library is the only reliable record
//! boundary. Splitting on `", <volume>:"` eats that label from every
//! record but the first; it is re-attached here so each record carries a
//! full source path.

use crate::locale::{self, DateLocale};
use crate::record::{IncomingRecord, FIELD_DELIMITER};
use anyhow::{bail, Context, Result};
use log::{debug, info, warn};
use std::process::Command;

/// AppleScript that walks the source library and prints one
/// `location||rating||played date||played count` item per track.
const EXPORT_SCRIPT: &str = r#"
tell application "Music"
    set track_list to {}
    repeat with t in tracks of library playlist 1
        try
            set track_location to location of t as text
            set track_rating to rating of t
            set track_played_date to played date of t
            set track_play_count to played count of t
            set end of track_list to (track_location & "||" & track_rating & "||" & track_played_date & "||" & track_play_count)
        on error errMsg
            log "Error processing track: " & errMsg
        end try
    end repeat
    return track_list
end tell
"#;

/// Play-date value AppleScript prints for tracks that were never played.
const MISSING_VALUE: &str = "missing value";

/// Run the AppleScript export and parse its output into records.
///
/// `volume` is the name of the disk the source library lives on; it
/// anchors record splitting and is re-attached so every record carries a
/// full path. `date_locale` must match the display locale of the system
/// the export runs on.
pub fn extract_records(volume: &str, date_locale: DateLocale) -> Result<Vec<IncomingRecord>> {
    info!("Extracting ratings from the source catalog via osascript...");

    let output = Command::new("osascript")
        .args(["-e", EXPORT_SCRIPT])
        .output()
        .context("Failed to run osascript. The export step requires macOS with the Music app available.")?;

    if !output.status.success() {
        bail!(
            "osascript exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stdout = stdout.trim();
    if stdout.is_empty() {
        bail!("osascript returned no data");
    }

    let records = parse_export_output(stdout, volume, date_locale);
    info!("Extracted {} ratings from the source catalog.", records.len());
    Ok(records)
}

/// Split the joined osascript output into records.
pub fn parse_export_output(
    output: &str,
    volume: &str,
    date_locale: DateLocale,
) -> Vec<IncomingRecord> {
    let boundary = format!(", {volume}:");
    let prefix = format!("{volume}:");

    let mut records = Vec::new();
    for (i, chunk) in output.split(boundary.as_str()).enumerate() {
        // Only the first chunk still carries the volume label.
        let item = if i == 0 {
            chunk.to_string()
        } else {
            format!("{prefix}{chunk}")
        };
        if let Some(record) = parse_export_item(&item, date_locale) {
            records.push(record);
        }
    }
    records
}

/// Parse one `location||rating||played date||played count` item.
fn parse_export_item(item: &str, date_locale: DateLocale) -> Option<IncomingRecord> {
    let parts: Vec<&str> = item.split(FIELD_DELIMITER).collect();
    if parts.len() != 4 {
        warn!(
            "Skipping export item (expected 4 fields, got {}): {item}",
            parts.len()
        );
        return None;
    }

    let native_rating: u32 = match parts[1].parse() {
        Ok(r) => r,
        Err(_) => {
            warn!("Skipping track with non-numeric rating '{}': {}", parts[1], parts[0]);
            return None;
        }
    };
    let play_count: u32 = match parts[3].parse() {
        Ok(c) => c,
        Err(_) => {
            warn!(
                "Skipping track with non-numeric play count '{}': {}",
                parts[3], parts[0]
            );
            return None;
        }
    };

    let play_date = if parts[2] == MISSING_VALUE {
        None
    } else {
        let parsed = locale::parse_played_date(parts[2], date_locale);
        if parsed.is_none() {
            // A play count without a date is still worth keeping.
            warn!("Could not parse played date '{}' for {}", parts[2], parts[0]);
        }
        parsed
    };

    debug!("Parsed export item for {}", parts[0]);
    Some(IncomingRecord {
        source_path: parts[0].to_string(),
        rating: IncomingRecord::rating_from_native(native_rating),
        play_date,
        play_count,
    })
}
