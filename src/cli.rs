//! Command-line interface definitions.
//!
//! Built with Clap derive macros; each subcommand maps to one stage of the
//! migration: `export` pulls metadata out of the source catalog, `sync`
//! merges it into the target catalog, `list` inspects the intermediate
//! ratings file, and `completion` generates shell completions.
//!
//! ## Examples
//!
//! ```bash
//! segue export --volume "Macintosh HD" --locale de
//! segue sync ~/navidrome.db --user-id 2d5d1ad --strip-prefix "Macintosh HD:Users:me:Music:"
//! segue list
//! ```

use crate::locale::DateLocale;
use crate::resolver::MatchStrategy;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Shell types supported for completion generation
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    /// Bash shell
    Bash,
    /// Zsh shell
    Zsh,
    /// Fish shell
    Fish,
    /// PowerShell
    PowerShell,
    /// Elvish shell
    Elvish,
}

/// Main application arguments structure.
#[derive(Parser)]
#[command(name = "segue")]
#[command(about = "Segue: carry ratings & play history from one music catalog to another")]
#[command(version)]
pub struct Args {
    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Enumeration of all available subcommands.
#[derive(Subcommand)]
pub enum Command {
    /// Export listening metadata from the source catalog
    ///
    /// Drives the Music app through AppleScript and writes one record per
    /// track (path, rating, last played, play count) to the intermediate
    /// ratings file. Requires macOS; everything downstream of this step
    /// runs anywhere.
    Export {
        /// Where to write the ratings file
        ///
        /// Defaults to the platform data directory
        /// (e.g. ~/.local/share/segue/ratings.txt).
        #[arg(long)]
        out: Option<PathBuf>,

        /// Name of the disk volume the source library lives on
        ///
        /// Anchors record splitting in the AppleScript output; check the
        /// start of a track location in Music if unsure.
        #[arg(long, default_value = "Macintosh HD")]
        volume: String,

        /// Display locale the source catalog prints played dates in
        #[arg(long, value_enum, default_value_t = DateLocale::De)]
        locale: DateLocale,
    },

    /// Merge exported metadata into the target catalog
    ///
    /// Reads the ratings file (running the export first if the file is
    /// missing), resolves each source path against the target library and
    /// upserts rating, play date and play count without clobbering better
    /// values already stored. Unmatched and ambiguous records are logged
    /// and skipped; the whole batch commits as one transaction.
    Sync {
        /// Path to the target catalog's database file
        db: PathBuf,

        /// Target user id the annotations belong to
        ///
        /// Look it up in the target server's user table; annotations are
        /// per user.
        #[arg(long)]
        user_id: String,

        /// Database kind of the target store
        ///
        /// Only "sqlite" is currently supported.
        #[arg(long, default_value = "sqlite")]
        store_kind: String,

        /// Ratings file to consume
        ///
        /// Defaults to the platform data directory
        /// (e.g. ~/.local/share/segue/ratings.txt).
        #[arg(long)]
        file: Option<PathBuf>,

        /// Catalog-root label to strip from source paths (repeatable, applied in order)
        ///
        /// Each label is a full source-catalog root such as
        /// "Macintosh HD:Users:me:Music:" that has no counterpart in the
        /// target library's path space.
        #[arg(long = "strip-prefix")]
        strip_prefix: Vec<String>,

        /// How normalized paths are compared against the target library
        #[arg(long, value_enum, default_value_t = MatchStrategy::Substring)]
        strategy: MatchStrategy,

        /// Volume name for the export fallback when no ratings file exists
        #[arg(long, default_value = "Macintosh HD")]
        volume: String,

        /// Locale for the export fallback's date parsing
        #[arg(long, value_enum, default_value_t = DateLocale::De)]
        locale: DateLocale,

        /// Print the run summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// List records parsed from the ratings file
    ///
    /// Prints each well-formed record with its rating, play count and last
    /// played date. Useful for checking an export before syncing it.
    List {
        /// Ratings file to read
        ///
        /// Defaults to the platform data directory
        /// (e.g. ~/.local/share/segue/ratings.txt).
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Generate shell completions
    ///
    /// Usage: segue completion bash > ~/.local/share/bash-completion/completions/segue
    Completion {
        /// Shell to generate completions for
        shell: Shell,
    },
}
