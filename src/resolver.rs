//! Source-path resolution against the target catalog.
//!
//! A source path like `Macintosh HD:Users:me:Music:Tune.mp3` never matches
//! a target row verbatim: the two catalogs disagree on the path root, the
//! separator, and possibly the Unicode normalization of accented names
//! (HFS+ stores filenames decomposed; most Linux filesystems keep whatever
//! bytes they were given). Resolution strips the configured catalog-root
//! labels in order, swaps `:` for `/`, and looks the remainder up in three
//! forms: as-is, NFC, and NFD.
//!
//! Comparison is case sensitive. `LIKE` is not, so the lookup uses
//! `INSTR`/`SUBSTR` instead; this also sidesteps wildcard escaping for
//! paths containing `%` or `_`.

use anyhow::{Context, Result};
use clap::ValueEnum;
use log::{debug, trace};
use rusqlite::{params, Connection};
use unicode_normalization::UnicodeNormalization;

/// Path separator used by the source catalog.
const SOURCE_SEPARATOR: char = ':';

/// How a normalized candidate is compared against `media_file.path`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum MatchStrategy {
    /// Candidate must equal the stored path exactly.
    Exact,
    /// Stored path must end with the candidate.
    Suffix,
    /// Stored path must contain the candidate anywhere. Tolerates differing
    /// path roots upstream of the match, at the cost of a wider ambiguity
    /// surface.
    #[default]
    Substring,
}

/// Outcome of resolving one source path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Exactly one target row matched.
    Match {
        /// `media_file.id` of the matched row.
        item_id: String,
    },
    /// No target row matched.
    Miss,
    /// Several rows matched and no unique exact-equality tie-break existed.
    /// The caller must skip rather than guess; a wrong pick would annotate
    /// the wrong track.
    Ambiguous {
        /// How many rows the lookup returned.
        count: usize,
    },
}

/// Maps source-catalog path strings to target-catalog row ids.
#[derive(Debug, Clone)]
pub struct Resolver {
    /// Catalog-root labels removed from source paths, applied in order.
    /// Each is a full root label such as `Macintosh HD:Users:me:Music:`.
    prefixes: Vec<String>,
    strategy: MatchStrategy,
}

impl Resolver {
    #[must_use]
    pub fn new(prefixes: Vec<String>, strategy: MatchStrategy) -> Self {
        Self { prefixes, strategy }
    }

    /// Strip the configured catalog-root labels and convert separators.
    ///
    /// Prefixes are plain string replacements applied in configuration
    /// order, so a root label that survives an earlier, longer label is
    /// still removed by a later, shorter one.
    #[must_use]
    pub fn normalize(&self, source_path: &str) -> String {
        let mut path = source_path.to_string();
        for prefix in &self.prefixes {
            path = path.replace(prefix.as_str(), "");
        }
        path.replace(SOURCE_SEPARATOR, "/")
    }

    /// The three lookup candidates for a source path: the normalized string
    /// itself plus its NFC and NFD forms.
    #[must_use]
    pub fn candidates(&self, source_path: &str) -> [String; 3] {
        let normalized = self.normalize(source_path);
        let nfc: String = normalized.nfc().collect();
        let nfd: String = normalized.nfd().collect();
        [normalized, nfc, nfd]
    }

    fn lookup_sql(&self) -> &'static str {
        match self.strategy {
            MatchStrategy::Exact => {
                "SELECT id, path FROM media_file
                 WHERE path = ?1 OR path = ?2 OR path = ?3"
            }
            MatchStrategy::Suffix => {
                "SELECT id, path FROM media_file
                 WHERE SUBSTR(path, -LENGTH(?1)) = ?1
                    OR SUBSTR(path, -LENGTH(?2)) = ?2
                    OR SUBSTR(path, -LENGTH(?3)) = ?3"
            }
            MatchStrategy::Substring => {
                "SELECT id, path FROM media_file
                 WHERE INSTR(path, ?1) > 0 OR INSTR(path, ?2) > 0 OR INSTR(path, ?3) > 0"
            }
        }
    }

    /// Resolve a source path to at most one `media_file` row id.
    ///
    /// Read-only. When several rows match, a row whose path is exactly
    /// equal to one of the candidates wins, but only if it is unique;
    /// otherwise the result is [`Resolution::Ambiguous`].
    pub fn resolve(&self, conn: &Connection, source_path: &str) -> Result<Resolution> {
        let [raw, nfc, nfd] = self.candidates(source_path);
        if raw.is_empty() {
            // A fully stripped path would contain-match every row.
            return Ok(Resolution::Miss);
        }
        trace!("Resolving '{source_path}' via candidates ['{raw}', NFC, NFD]");

        let mut stmt = conn
            .prepare_cached(self.lookup_sql())
            .context("Invalid SQL statement when SELECTing from media_file")?;
        let rows: Vec<(String, String)> = stmt
            .query_map(params![raw, nfc, nfd], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .context("Cannot query media_file")?
            .collect::<std::result::Result<_, _>>()
            .with_context(|| format!("Queried media_file row unwrap failed for '{raw}'"))?;

        match rows.len() {
            0 => Ok(Resolution::Miss),
            1 => {
                debug!("Resolved '{raw}' to media_file id {}", rows[0].0);
                Ok(Resolution::Match {
                    item_id: rows[0].0.clone(),
                })
            }
            count => {
                let candidates = [raw, nfc, nfd];
                let exact: Vec<&(String, String)> = rows
                    .iter()
                    .filter(|(_, path)| candidates.contains(path))
                    .collect();
                if let [only] = exact.as_slice() {
                    debug!(
                        "Resolved '{}' to media_file id {} (exact tie-break among {count} rows)",
                        candidates[0], only.0
                    );
                    Ok(Resolution::Match {
                        item_id: only.0.clone(),
                    })
                } else {
                    Ok(Resolution::Ambiguous { count })
                }
            }
        }
    }
}
