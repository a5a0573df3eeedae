//! Annotation upserts against the target catalog.
//!
//! The target server keeps per-user listening metadata in an `annotation`
//! table keyed by `(user_id, item_id, item_type)`. Merging never discards
//! better information already present: a rating only fills the unrated
//! sentinel (0), the play date only moves forward, the play count only
//! grows. The whole policy lives in one `ON CONFLICT` statement evaluated
//! against the pre-existing row, so applying the same record twice is a
//! no-op and merges for one key converge regardless of order.

use crate::record::{IncomingRecord, ISO_FORMAT};
use crate::resolver::{Resolution, Resolver};
use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use log::{debug, info, warn};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use std::fmt;

/// `annotation.item_type` value for rows annotating `media_file` entries.
pub const ITEM_TYPE_MEDIA_FILE: &str = "media_file";

/// Single statement carrying the whole conflict policy:
/// - rating: keep existing unless it is the unrated sentinel 0
/// - play_date: adopt when existing is NULL or incoming is strictly later
/// - play_count: adopt when incoming is strictly greater
const UPSERT_SQL: &str = "
    INSERT INTO annotation (user_id, item_id, item_type, rating, play_date, play_count)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6)
    ON CONFLICT(user_id, item_id, item_type) DO UPDATE SET
        rating = CASE WHEN annotation.rating = 0
            THEN excluded.rating ELSE annotation.rating END,
        play_date = CASE WHEN annotation.play_date IS NULL
                OR excluded.play_date > annotation.play_date
            THEN excluded.play_date ELSE annotation.play_date END,
        play_count = CASE WHEN excluded.play_count > annotation.play_count
            THEN excluded.play_count ELSE annotation.play_count END";

/// A stored annotation row, as read back from the target catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    pub user_id: String,
    pub item_id: String,
    pub item_type: String,
    /// 0 means "unrated", never "rated zero stars".
    pub rating: u8,
    pub play_date: Option<NaiveDateTime>,
    pub play_count: u32,
}

/// Counters for one sync run.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    /// Records read from the ratings file.
    pub records: usize,
    /// Records resolved and merged into the annotation store.
    pub merged: usize,
    /// Records whose source path matched no target row.
    pub missed: usize,
    /// Records skipped because several target rows matched.
    pub ambiguous: usize,
}

impl fmt::Display for SyncSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} records: {} merged, {} unmatched, {} ambiguous",
            self.records, self.merged, self.missed, self.ambiguous
        )
    }
}

/// Merge one resolved record into the annotation store.
///
/// One idempotent statement; the conflict rules only ever improve on what
/// is already stored.
pub fn merge(
    conn: &Connection,
    user_id: &str,
    item_id: &str,
    record: &IncomingRecord,
) -> Result<()> {
    let play_date = record
        .play_date
        .map(|d| d.format(ISO_FORMAT).to_string());

    conn.execute(
        UPSERT_SQL,
        params![
            user_id,
            item_id,
            ITEM_TYPE_MEDIA_FILE,
            record.rating,
            play_date,
            record.play_count
        ],
    )
    .with_context(|| format!("Invalid SQL statement when UPSERTing annotation for item {item_id}"))?;

    Ok(())
}

/// Read back the annotation for a `(user, item)` key, if one exists.
pub fn fetch(conn: &Connection, user_id: &str, item_id: &str) -> Result<Option<Annotation>> {
    let mut stmt = conn
        .prepare(
            "SELECT user_id, item_id, item_type, rating, play_date, play_count
             FROM annotation WHERE user_id = ?1 AND item_id = ?2 AND item_type = ?3",
        )
        .context("Invalid SQL statement when SELECTing from annotation")?;

    let row = stmt
        .query_row(params![user_id, item_id, ITEM_TYPE_MEDIA_FILE], |row| {
            Ok((
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
                row.get::<_, Option<String>>(4)?,
                row.get(5)?,
            ))
        })
        .optional()
        .context("Cannot query annotation")?;

    Ok(row.map(
        |(user_id, item_id, item_type, rating, play_date, play_count)| Annotation {
            user_id,
            item_id,
            item_type,
            rating,
            play_date: play_date
                .and_then(|d| NaiveDateTime::parse_from_str(&d, ISO_FORMAT).ok()),
            play_count,
        },
    ))
}

/// Resolve and merge a whole batch inside a single transaction.
///
/// Records are processed sequentially in input order. Per-record problems
/// (no match, ambiguous match) are logged and counted, never fatal; the
/// batch itself either commits completely or not at all. Re-running the
/// same batch converges on the same stored state.
pub fn sync_records(
    conn: &mut Connection,
    records: &[IncomingRecord],
    resolver: &Resolver,
    user_id: &str,
) -> Result<SyncSummary> {
    let mut summary = SyncSummary {
        records: records.len(),
        ..SyncSummary::default()
    };

    let tx = conn
        .transaction()
        .context("Could not start annotation transaction")?;

    for record in records {
        match resolver.resolve(&tx, &record.source_path)? {
            Resolution::Match { item_id } => {
                merge(&tx, user_id, &item_id, record)?;
                debug!(
                    "Merged rating {} / count {} into item {item_id}",
                    record.rating, record.play_count
                );
                summary.merged += 1;
            }
            Resolution::Miss => {
                warn!(
                    "No match found in media_file for {}",
                    resolver.normalize(&record.source_path)
                );
                summary.missed += 1;
            }
            Resolution::Ambiguous { count } => {
                warn!(
                    "{count} media_file rows match {}; skipping rather than guessing",
                    resolver.normalize(&record.source_path)
                );
                summary.ambiguous += 1;
            }
        }
    }

    tx.commit()
        .context("Committing annotation transaction failed")?;

    info!("Annotation update complete: {summary}");
    Ok(summary)
}
