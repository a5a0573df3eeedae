//! Carry listening metadata between independently-indexed music catalogs.
//!
//! Segue reconciles per-track star ratings, last-played timestamps and play
//! counts exported from a source catalog (Apple Music) into the library
//! database of a target music server (a Navidrome-style SQLite schema),
//! even though the two catalogs identify the same audio file by different
//! path strings.
//!
//! Core modules:
//! - [`resolver`] - Maps a source path to a target `media_file` row id
//!   despite path-prefix, separator and Unicode-normalization divergence
//! - [`annotate`] - Merges incoming metadata into the `annotation` store
//!   without clobbering better values already present
//!
//! ### Supporting Modules
//!
//! - [`export`] - AppleScript extraction of ratings from the source catalog
//! - [`record`] - Incoming records and the intermediate ratings file
//! - [`locale`] - Localized played-date parsing
//! - [`db`] - Target-store bootstrap and store-kind selection
//! - [`config`] - Data directory and runtime configuration
//! - [`cli`] - Command-line interface definitions with clap integration
//! - [`completion`] - Shell completion generation
//!
//! ## Quick Start Example
//!
//! ```no_run
//! use segue::annotate;
//! use segue::config::RuntimeConfig;
//! use segue::db::{self, StoreKind};
//! use segue::record::IncomingRecord;
//! use segue::resolver::{MatchStrategy, Resolver};
//! use std::path::Path;
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = RuntimeConfig::new(
//!     Path::new("navidrome.db"),
//!     StoreKind::Sqlite,
//!     "2d5d1ad".to_string(),
//! )?;
//!
//! let records = vec![IncomingRecord {
//!     source_path: "Macintosh HD:Users:me:Music:Tune.mp3".to_string(),
//!     rating: 4,
//!     play_date: None,
//!     play_count: 12,
//! }];
//!
//! let resolver = Resolver::new(
//!     vec!["Macintosh HD:Users:me:Music:".to_string()],
//!     MatchStrategy::Substring,
//! );
//!
//! let mut conn = db::open_store(&config)?;
//! let summary = annotate::sync_records(&mut conn, &records, &resolver, &config.user_id)?;
//! println!("{summary}");
//! # Ok(())
//! # }
//! ```
//!
//! ## Merge Semantics
//!
//! Merging is idempotent and per-field monotone: ratings only fill the
//! unrated sentinel (0), play dates only move forward, play counts only
//! grow. Re-running a sync, in any record order, converges on the same
//! stored state.
//!
//! ## Error Handling
//!
//! Per-record problems (unmatched path, ambiguous match, malformed line)
//! are logged and skipped. Store-level problems (unopenable database,
//! failed commit, unsupported store kind) abort the batch with an
//! `anyhow::Error`.
//!
//! ## Logging
//!
//! All modules log through the `log` facade; the binary installs
//! `env_logger`, so `RUST_LOG=debug segue sync …` shows per-record
//! resolution decisions.

pub mod annotate;
pub mod cli;
pub mod completion;
pub mod config;
pub mod db;
pub mod export;
pub mod locale;
pub mod record;
pub mod resolver;
