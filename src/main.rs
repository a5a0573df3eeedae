//! # Segue
//!
//! Carries ratings, play dates and play counts from one music catalog to
//! another. The `export` step pulls metadata out of Apple Music via
//! AppleScript; the `sync` step resolves each exported path against the
//! target server's library and merges the metadata into its annotation
//! store without destroying better values already there.
//!
//! ## Usage
//!
//! ```bash
//! # On the Mac that has the source library
//! segue export --volume "Macintosh HD" --locale de
//!
//! # Against the target server's database
//! segue sync /srv/navidrome/navidrome.db \
//!     --user-id 2d5d1ad \
//!     --strip-prefix "Macintosh HD:Users:me:Music:"
//!
//! # Inspect what was exported
//! segue list
//! ```

use anyhow::Result;
use clap::{CommandFactory, Parser};
use log::info;

use segue::db::StoreKind;
use segue::record::ISO_FORMAT;
use segue::resolver::Resolver;
use segue::{annotate, cli, completion, config, db, export, record};

/// Main entry point for the Segue application.
///
/// Initializes logging, parses command-line arguments, and routes commands
/// to the appropriate module functions. Per-record problems are logged and
/// skipped inside the modules; anything that reaches this level is fatal
/// and exits non-zero.
///
/// # Logging
///
/// Initializes environment logger which can be controlled via `RUST_LOG`:
/// - `RUST_LOG=debug segue sync …` - Enable debug logging
/// - `RUST_LOG=segue::resolver=trace segue sync …` - Module-specific logging
fn main() -> Result<()> {
    // Initialize environment logger for debugging and monitoring
    env_logger::init();

    // Parse command-line arguments using Clap derive macros
    let args = cli::Args::parse();

    match args.command {
        cli::Command::Export { out, volume, locale } => {
            let out = match out {
                Some(path) => path,
                None => config::default_ratings_path()?,
            };

            let records = export::extract_records(&volume, locale)?;
            record::write_records(&out, &records)?;
            println!("Wrote {} records to {}", records.len(), out.display());
        }

        cli::Command::Sync {
            db: db_path,
            user_id,
            store_kind,
            file,
            strip_prefix,
            strategy,
            volume,
            locale,
            json,
        } => {
            // An unsupported store kind must fail before any record is
            // touched, so the store is parsed and opened first.
            let kind: StoreKind = store_kind.parse()?;
            let runtime = config::RuntimeConfig::new(&db_path, kind, user_id)?;
            let mut conn = db::open_store(&runtime)?;

            let ratings_path = match file {
                Some(path) => path,
                None => config::default_ratings_path()?,
            };

            let records = if ratings_path.exists() {
                info!("Reading ratings from {}", ratings_path.display());
                record::read_records(&ratings_path)?
            } else {
                info!(
                    "No ratings file at {}; running the export",
                    ratings_path.display()
                );
                let records = export::extract_records(&volume, locale)?;
                record::write_records(&ratings_path, &records)?;
                records
            };

            let resolver = Resolver::new(strip_prefix, strategy);
            let summary = annotate::sync_records(&mut conn, &records, &resolver, &runtime.user_id)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!("{summary}");
            }
        }

        cli::Command::List { file } => {
            let ratings_path = match file {
                Some(path) => path,
                None => config::default_ratings_path()?,
            };

            let records = record::read_records(&ratings_path)?;
            for r in &records {
                let played = r
                    .play_date
                    .map(|d| d.format(ISO_FORMAT).to_string())
                    .unwrap_or_else(|| "never".to_string());
                println!(
                    "{} stars  {:>5} plays  last {played}  {}",
                    r.rating, r.play_count, r.source_path
                );
            }
            println!("{} records in {}", records.len(), ratings_path.display());
        }

        cli::Command::Completion { shell } => {
            let mut cmd = cli::Args::command();
            completion::generate_completions(completion::shell_to_completion_shell(&shell), &mut cmd);
        }
    }

    Ok(())
}
