//! # Integration Tests for Segue
//!
//! End-to-end tests for resolution and merging against a real SQLite store
//! shaped like the target server's library database (`media_file` +
//! `annotation` tables).

use anyhow::Result;
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::Connection;
use std::path::PathBuf;
use tempfile::TempDir;

use segue::annotate::{self, ITEM_TYPE_MEDIA_FILE};
use segue::record::IncomingRecord;
use segue::resolver::{MatchStrategy, Resolution, Resolver};

const USER_ID: &str = "2d5d1ad";

/// Test helper to create a target-catalog database with sample rows.
///
/// The schema mirrors what the target server's own indexer creates; this
/// tool never creates these tables in production.
fn create_target_store() -> Result<(TempDir, PathBuf)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("target.db");

    let conn = Connection::open(&db_path)?;
    conn.execute(
        "CREATE TABLE media_file (
            id   TEXT PRIMARY KEY,
            path TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE TABLE annotation (
            user_id    TEXT NOT NULL,
            item_id    TEXT NOT NULL,
            item_type  TEXT NOT NULL,
            rating     INTEGER NOT NULL DEFAULT 0,
            play_date  TEXT,
            play_count INTEGER NOT NULL DEFAULT 0,
            UNIQUE(user_id, item_id, item_type)
        )",
        [],
    )?;

    conn.execute(
        "INSERT INTO media_file (id, path) VALUES
         ('mf-1', '/srv/music/Music/Tune.mp3'),
         ('mf-2', '/srv/music/Music/Artist/Album/Song.flac'),
         ('mf-3', '/srv/music/Music/Bjo\u{0308}rk/Jo\u{0301}ga.mp3'),
         ('mf-4', '/srv/music/Music/S\u{00e9}bastien/T\u{00e9}l.ogg'),
         ('mf-5', '/srv/music/Live/Common.mp3'),
         ('mf-6', '/srv/music/Studio/Common.mp3')",
        [],
    )?;

    Ok((temp_dir, db_path))
}

fn default_resolver() -> Resolver {
    Resolver::new(
        vec!["Macintosh HD:Users:me:Music:".to_string()],
        MatchStrategy::Substring,
    )
}

fn record(
    source_path: &str,
    rating: u8,
    play_date: Option<NaiveDateTime>,
    play_count: u32,
) -> IncomingRecord {
    IncomingRecord {
        source_path: source_path.to_string(),
        rating,
        play_date,
        play_count,
    }
}

fn date(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, mo, d)
        .unwrap()
        .and_hms_opt(h, mi, s)
        .unwrap()
}

mod resolver_tests {
    use super::*;

    #[test]
    fn test_resolves_plain_ascii_path() -> Result<()> {
        let (_tmp, db_path) = create_target_store()?;
        let conn = Connection::open(&db_path)?;

        let resolution = default_resolver().resolve(
            &conn,
            "Macintosh HD:Users:me:Music:Artist:Album:Song.flac",
        )?;
        assert_eq!(
            resolution,
            Resolution::Match {
                item_id: "mf-2".to_string()
            }
        );
        Ok(())
    }

    #[test]
    fn test_resolves_nfc_source_against_nfd_store() -> Result<()> {
        let (_tmp, db_path) = create_target_store()?;
        let conn = Connection::open(&db_path)?;

        // mf-3 is stored decomposed; the export hands us composed names.
        let resolution = default_resolver().resolve(
            &conn,
            "Macintosh HD:Users:me:Music:Bj\u{00f6}rk:J\u{00f3}ga.mp3",
        )?;
        assert_eq!(
            resolution,
            Resolution::Match {
                item_id: "mf-3".to_string()
            }
        );
        Ok(())
    }

    #[test]
    fn test_resolves_nfd_source_against_nfc_store() -> Result<()> {
        let (_tmp, db_path) = create_target_store()?;
        let conn = Connection::open(&db_path)?;

        // mf-4 is stored composed; feed decomposed names.
        let resolution = default_resolver().resolve(
            &conn,
            "Macintosh HD:Users:me:Music:Se\u{0301}bastien:Te\u{0301}l.ogg",
        )?;
        assert_eq!(
            resolution,
            Resolution::Match {
                item_id: "mf-4".to_string()
            }
        );
        Ok(())
    }

    #[test]
    fn test_unmatched_path_is_a_miss() -> Result<()> {
        let (_tmp, db_path) = create_target_store()?;
        let conn = Connection::open(&db_path)?;

        let resolution = default_resolver()
            .resolve(&conn, "Macintosh HD:Users:me:Music:Nowhere.mp3")?;
        assert_eq!(resolution, Resolution::Miss);
        Ok(())
    }

    #[test]
    fn test_multi_match_fails_closed() -> Result<()> {
        let (_tmp, db_path) = create_target_store()?;
        let conn = Connection::open(&db_path)?;

        // "Common.mp3" is contained in both mf-5 and mf-6 and equals
        // neither, so there is nothing to break the tie with.
        let resolution =
            default_resolver().resolve(&conn, "Macintosh HD:Users:me:Music:Common.mp3")?;
        assert_eq!(resolution, Resolution::Ambiguous { count: 2 });
        Ok(())
    }

    #[test]
    fn test_unique_exact_equality_breaks_ties() -> Result<()> {
        let (_tmp, db_path) = create_target_store()?;
        let conn = Connection::open(&db_path)?;
        conn.execute(
            "INSERT INTO media_file (id, path) VALUES ('mf-7', 'Studio/Common.mp3')",
            [],
        )?;

        // Two rows contain "Studio/Common.mp3"; exactly one IS it.
        let resolver = Resolver::new(vec!["Macintosh HD:".to_string()], MatchStrategy::Substring);
        let resolution = resolver.resolve(&conn, "Macintosh HD:Studio:Common.mp3")?;
        assert_eq!(
            resolution,
            Resolution::Match {
                item_id: "mf-7".to_string()
            }
        );
        Ok(())
    }

    #[test]
    fn test_exact_strategy_requires_full_path() -> Result<()> {
        let (_tmp, db_path) = create_target_store()?;
        let conn = Connection::open(&db_path)?;

        let resolver = Resolver::new(vec![], MatchStrategy::Exact);
        assert_eq!(
            resolver.resolve(&conn, "/srv/music/Music/Tune.mp3".replace('/', ":").as_str())?,
            Resolution::Match {
                item_id: "mf-1".to_string()
            }
        );
        assert_eq!(
            resolver.resolve(&conn, "Music:Tune.mp3")?,
            Resolution::Miss
        );
        Ok(())
    }

    #[test]
    fn test_suffix_strategy_anchors_at_the_end() -> Result<()> {
        let (_tmp, db_path) = create_target_store()?;
        let conn = Connection::open(&db_path)?;

        let resolver = Resolver::new(
            vec!["Macintosh HD:Users:me:".to_string()],
            MatchStrategy::Suffix,
        );
        assert_eq!(
            resolver.resolve(&conn, "Macintosh HD:Users:me:Music:Tune.mp3")?,
            Resolution::Match {
                item_id: "mf-1".to_string()
            }
        );
        // A mid-path fragment is not a suffix.
        assert_eq!(
            resolver.resolve(&conn, "Macintosh HD:Users:me:Music:Artist:Album")?,
            Resolution::Miss
        );
        Ok(())
    }

    #[test]
    fn test_resolve_is_read_only() -> Result<()> {
        let (_tmp, db_path) = create_target_store()?;
        let conn = Connection::open(&db_path)?;

        let _ = default_resolver().resolve(&conn, "Macintosh HD:Users:me:Music:Nowhere.mp3")?;

        let annotations: i64 =
            conn.query_row("SELECT COUNT(*) FROM annotation", [], |row| row.get(0))?;
        assert_eq!(annotations, 0);
        Ok(())
    }
}

mod merge_tests {
    use super::*;

    #[test]
    fn test_sync_creates_annotation_with_incoming_values() -> Result<()> {
        let (_tmp, db_path) = create_target_store()?;
        let mut conn = Connection::open(&db_path)?;

        let records = vec![record(
            "Macintosh HD:Users:me:Music:Tune.mp3",
            4,
            Some(date(2018, 7, 6, 22, 31, 45)),
            12,
        )];
        let summary =
            annotate::sync_records(&mut conn, &records, &default_resolver(), USER_ID)?;

        assert_eq!(summary.records, 1);
        assert_eq!(summary.merged, 1);
        assert_eq!(summary.missed, 0);

        let stored = annotate::fetch(&conn, USER_ID, "mf-1")?.expect("annotation should exist");
        assert_eq!(stored.rating, 4);
        assert_eq!(stored.play_date, Some(date(2018, 7, 6, 22, 31, 45)));
        assert_eq!(stored.play_count, 12);
        assert_eq!(stored.item_type, ITEM_TYPE_MEDIA_FILE);
        Ok(())
    }

    #[test]
    fn test_sync_twice_is_idempotent() -> Result<()> {
        let (_tmp, db_path) = create_target_store()?;
        let mut conn = Connection::open(&db_path)?;

        let records = vec![record(
            "Macintosh HD:Users:me:Music:Tune.mp3",
            4,
            Some(date(2018, 7, 6, 22, 31, 45)),
            12,
        )];

        annotate::sync_records(&mut conn, &records, &default_resolver(), USER_ID)?;
        let first = annotate::fetch(&conn, USER_ID, "mf-1")?;
        annotate::sync_records(&mut conn, &records, &default_resolver(), USER_ID)?;
        let second = annotate::fetch(&conn, USER_ID, "mf-1")?;

        assert_eq!(first, second);

        let rows: i64 = conn.query_row("SELECT COUNT(*) FROM annotation", [], |row| row.get(0))?;
        assert_eq!(rows, 1);
        Ok(())
    }

    #[test]
    fn test_lower_incoming_play_count_is_ignored() -> Result<()> {
        let (_tmp, db_path) = create_target_store()?;
        let mut conn = Connection::open(&db_path)?;

        let resolver = default_resolver();
        let first = vec![record("Macintosh HD:Users:me:Music:Tune.mp3", 4, None, 12)];
        let second = vec![record("Macintosh HD:Users:me:Music:Tune.mp3", 4, None, 8)];

        annotate::sync_records(&mut conn, &first, &resolver, USER_ID)?;
        annotate::sync_records(&mut conn, &second, &resolver, USER_ID)?;

        assert_eq!(annotate::fetch(&conn, USER_ID, "mf-1")?.unwrap().play_count, 12);
        Ok(())
    }

    #[test]
    fn test_play_metadata_is_monotone_across_syncs() -> Result<()> {
        let (_tmp, db_path) = create_target_store()?;
        let mut conn = Connection::open(&db_path)?;
        let resolver = default_resolver();

        let batches = [
            vec![record(
                "Macintosh HD:Users:me:Music:Tune.mp3",
                0,
                Some(date(2018, 7, 6, 22, 31, 45)),
                5,
            )],
            vec![record(
                "Macintosh HD:Users:me:Music:Tune.mp3",
                0,
                Some(date(2016, 1, 1, 0, 0, 0)),
                2,
            )],
            vec![record(
                "Macintosh HD:Users:me:Music:Tune.mp3",
                0,
                Some(date(2021, 5, 5, 12, 0, 0)),
                9,
            )],
        ];

        let mut last_count = 0;
        let mut last_date = None;
        for batch in &batches {
            annotate::sync_records(&mut conn, batch, &resolver, USER_ID)?;
            let stored = annotate::fetch(&conn, USER_ID, "mf-1")?.unwrap();
            assert!(stored.play_count >= last_count);
            assert!(stored.play_date >= last_date);
            last_count = stored.play_count;
            last_date = stored.play_date;
        }

        let stored = annotate::fetch(&conn, USER_ID, "mf-1")?.unwrap();
        assert_eq!(stored.play_count, 9);
        assert_eq!(stored.play_date, Some(date(2021, 5, 5, 12, 0, 0)));
        Ok(())
    }

    #[test]
    fn test_zero_rating_never_overwrites_existing() -> Result<()> {
        let (_tmp, db_path) = create_target_store()?;
        let mut conn = Connection::open(&db_path)?;
        let resolver = default_resolver();

        let rated = vec![record("Macintosh HD:Users:me:Music:Tune.mp3", 3, None, 0)];
        let unrated = vec![record("Macintosh HD:Users:me:Music:Tune.mp3", 0, None, 0)];

        annotate::sync_records(&mut conn, &rated, &resolver, USER_ID)?;
        annotate::sync_records(&mut conn, &unrated, &resolver, USER_ID)?;

        assert_eq!(annotate::fetch(&conn, USER_ID, "mf-1")?.unwrap().rating, 3);
        Ok(())
    }

    #[test]
    fn test_rating_adopted_over_unrated_sentinel() -> Result<()> {
        let (_tmp, db_path) = create_target_store()?;
        let mut conn = Connection::open(&db_path)?;
        let resolver = default_resolver();

        let unrated = vec![record("Macintosh HD:Users:me:Music:Tune.mp3", 0, None, 0)];
        let rated = vec![record("Macintosh HD:Users:me:Music:Tune.mp3", 4, None, 0)];

        annotate::sync_records(&mut conn, &unrated, &resolver, USER_ID)?;
        annotate::sync_records(&mut conn, &rated, &resolver, USER_ID)?;

        assert_eq!(annotate::fetch(&conn, USER_ID, "mf-1")?.unwrap().rating, 4);
        Ok(())
    }

    #[test]
    fn test_unmatched_records_leave_store_unchanged() -> Result<()> {
        let (_tmp, db_path) = create_target_store()?;
        let mut conn = Connection::open(&db_path)?;

        let records = vec![record("Macintosh HD:Users:me:Music:Nowhere.mp3", 5, None, 99)];
        let summary =
            annotate::sync_records(&mut conn, &records, &default_resolver(), USER_ID)?;

        assert_eq!(summary.merged, 0);
        assert_eq!(summary.missed, 1);

        let rows: i64 = conn.query_row("SELECT COUNT(*) FROM annotation", [], |row| row.get(0))?;
        assert_eq!(rows, 0);
        Ok(())
    }

    #[test]
    fn test_ambiguous_records_are_counted_and_skipped() -> Result<()> {
        let (_tmp, db_path) = create_target_store()?;
        let mut conn = Connection::open(&db_path)?;

        let records = vec![
            record("Macintosh HD:Users:me:Music:Common.mp3", 5, None, 1),
            record("Macintosh HD:Users:me:Music:Tune.mp3", 4, None, 12),
        ];
        let summary =
            annotate::sync_records(&mut conn, &records, &default_resolver(), USER_ID)?;

        assert_eq!(summary.records, 2);
        assert_eq!(summary.merged, 1);
        assert_eq!(summary.ambiguous, 1);

        // Only the unambiguous record landed.
        let rows: i64 = conn.query_row("SELECT COUNT(*) FROM annotation", [], |row| row.get(0))?;
        assert_eq!(rows, 1);
        assert!(annotate::fetch(&conn, USER_ID, "mf-1")?.is_some());
        Ok(())
    }
}

mod end_to_end_tests {
    use super::*;
    use segue::export;
    use segue::locale::DateLocale;

    #[test]
    fn test_exported_line_syncs_with_expected_values() -> Result<()> {
        // The worked example: a German export line lands as rating 4
        // (native 80 / 20), the ISO timestamp, and 12 plays.
        let (_tmp, db_path) = create_target_store()?;
        let mut conn = Connection::open(&db_path)?;

        let output = "Macintosh HD:Users:me:Music:Tune.mp3||80||Freitag, 6. Juli 2018 um 22:31:45||12";
        let records = export::parse_export_output(output, "Macintosh HD", DateLocale::De);
        assert_eq!(records.len(), 1);

        let summary =
            annotate::sync_records(&mut conn, &records, &default_resolver(), USER_ID)?;
        assert_eq!(summary.merged, 1);

        let stored = annotate::fetch(&conn, USER_ID, "mf-1")?.unwrap();
        assert_eq!(stored.rating, 4);
        assert_eq!(stored.play_date, Some(date(2018, 7, 6, 22, 31, 45)));
        assert_eq!(stored.play_count, 12);
        Ok(())
    }

    #[test]
    fn test_ratings_file_round_trips_through_sync() -> Result<()> {
        let (tmp, db_path) = create_target_store()?;
        let mut conn = Connection::open(&db_path)?;

        // Export, persist, re-read, sync: the full pipeline minus osascript.
        let output = "Macintosh HD:Users:me:Music:Tune.mp3||80||Freitag, 6. Juli 2018 um 22:31:45||12, \
                      Macintosh HD:Users:me:Music:Artist:Album:Song.flac||100||missing value||3";
        let exported = export::parse_export_output(output, "Macintosh HD", DateLocale::De);

        let ratings_path = tmp.path().join("ratings.txt");
        segue::record::write_records(&ratings_path, &exported)?;
        let records = segue::record::read_records(&ratings_path)?;
        assert_eq!(records, exported);

        let summary =
            annotate::sync_records(&mut conn, &records, &default_resolver(), USER_ID)?;
        assert_eq!(summary.merged, 2);

        let tune = annotate::fetch(&conn, USER_ID, "mf-1")?.unwrap();
        assert_eq!(tune.rating, 4);
        let song = annotate::fetch(&conn, USER_ID, "mf-2")?.unwrap();
        assert_eq!(song.rating, 5);
        assert_eq!(song.play_date, None);
        assert_eq!(song.play_count, 3);
        Ok(())
    }

    #[test]
    fn test_rerun_with_lower_count_keeps_stored_state() -> Result<()> {
        let (_tmp, db_path) = create_target_store()?;
        let mut conn = Connection::open(&db_path)?;
        let resolver = default_resolver();

        let line = "Macintosh HD:Users:me:Music:Tune.mp3||4||2018-07-06T22:31:45||12";
        let first = vec![IncomingRecord::parse_line(line).unwrap()];
        annotate::sync_records(&mut conn, &first, &resolver, USER_ID)?;

        // Same track re-exported later with a rolled-back play count.
        let line = "Macintosh HD:Users:me:Music:Tune.mp3||4||2018-07-06T22:31:45||8";
        let second = vec![IncomingRecord::parse_line(line).unwrap()];
        annotate::sync_records(&mut conn, &second, &resolver, USER_ID)?;

        let stored = annotate::fetch(&conn, USER_ID, "mf-1")?.unwrap();
        assert_eq!(stored.play_count, 12);
        Ok(())
    }
}

mod store_tests {
    use super::*;
    use segue::config::RuntimeConfig;
    use segue::db::{self, StoreKind};

    #[test]
    fn test_open_store_accepts_real_database() -> Result<()> {
        let (_tmp, db_path) = create_target_store()?;
        let config = RuntimeConfig::new(&db_path, StoreKind::Sqlite, USER_ID.to_string())?;

        assert!(db::open_store(&config).is_ok());
        Ok(())
    }

    #[test]
    fn test_open_store_rejects_missing_file() -> Result<()> {
        let tmp = TempDir::new()?;
        let config = RuntimeConfig::new(
            &tmp.path().join("nope.db"),
            StoreKind::Sqlite,
            USER_ID.to_string(),
        )?;

        assert!(db::open_store(&config).is_err());
        Ok(())
    }

    #[test]
    fn test_open_store_rejects_non_database_file() -> Result<()> {
        let tmp = TempDir::new()?;
        let path = tmp.path().join("notes.txt");
        std::fs::write(&path, "definitely not a database")?;
        let config = RuntimeConfig::new(&path, StoreKind::Sqlite, USER_ID.to_string())?;

        assert!(db::open_store(&config).is_err());
        Ok(())
    }
}
