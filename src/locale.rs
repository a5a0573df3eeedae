//! Localized timestamp parsing for source-catalog exports.
//!
//! The source catalog prints played dates in the user's display locale,
//! e.g. `Freitag, 6. Juli 2018 um 22:31:45` on a German system. Parsing is
//! table driven: the leading weekday is dropped (it is redundant with the
//! date itself), the localized month name is rewritten to its number, and
//! the remainder goes to chrono with a per-locale format string.
//!
//! The locale is an explicit argument to [`parse_played_date`], never
//! process-global state, so exports taken on differently-localized systems
//! can be processed back to back in one process.

use chrono::NaiveDateTime;
use clap::ValueEnum;
use lazy_static::lazy_static;
use std::collections::HashMap;

lazy_static! {
    /// German month names as printed by the source catalog's formatter.
    static ref GERMAN_MONTHS: HashMap<&'static str, u32> = [
        ("Januar", 1),
        ("Februar", 2),
        ("März", 3),
        ("April", 4),
        ("Mai", 5),
        ("Juni", 6),
        ("Juli", 7),
        ("August", 8),
        ("September", 9),
        ("Oktober", 10),
        ("November", 11),
        ("Dezember", 12),
    ]
    .into_iter()
    .collect();

    static ref ENGLISH_MONTHS: HashMap<&'static str, u32> = [
        ("January", 1),
        ("February", 2),
        ("March", 3),
        ("April", 4),
        ("May", 5),
        ("June", 6),
        ("July", 7),
        ("August", 8),
        ("September", 9),
        ("October", 10),
        ("November", 11),
        ("December", 12),
    ]
    .into_iter()
    .collect();
}

/// Display locale the source catalog formats played dates in.
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum DateLocale {
    /// German, e.g. `Freitag, 6. Juli 2018 um 22:31:45`
    De,
    /// English (US), e.g. `Friday, July 6, 2018 at 10:31:45 PM`
    En,
}

impl DateLocale {
    fn months(self) -> &'static HashMap<&'static str, u32> {
        match self {
            DateLocale::De => &GERMAN_MONTHS,
            DateLocale::En => &ENGLISH_MONTHS,
        }
    }

    /// chrono layout applied after the month name is rewritten to a number.
    fn format(self) -> &'static str {
        match self {
            DateLocale::De => "%d. %m %Y um %H:%M:%S",
            DateLocale::En => "%m %d, %Y at %I:%M:%S %p",
        }
    }
}

/// Parse a localized played-date string into a timestamp.
///
/// Returns `None` when the string does not follow the locale's layout;
/// callers decide whether that is worth a warning (a `missing value`
/// sentinel, for instance, is filtered out before this is called).
pub fn parse_played_date(raw: &str, locale: DateLocale) -> Option<NaiveDateTime> {
    // Drop the leading weekday up to the first ", ".
    let rest = raw.split_once(", ").map_or(raw, |(_, rest)| rest);

    let (name, number) = locale
        .months()
        .iter()
        .find(|(name, _)| rest.contains(*name))?;
    let numeric = rest.replace(*name, &number.to_string());

    NaiveDateTime::parse_from_str(&numeric, locale.format()).ok()
}
