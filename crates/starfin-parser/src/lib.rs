//! # starfin-parser
//!
//! Guesses a film's title, release year and resolution from its filename.
//!
//! The filename is split on dots and
//! spaces, the last token that looks like a year marks the end of the title,
//! and the last token that looks like a resolution (`1080p`, `4K`) is kept as
//! is.
//!
//! ## Quick Start
//!
//! ```
//! use starfin_parser::parse_filename;
//!
//! let parsed = parse_filename("The.Matrix.1999.1080p.BluRay.x264.mkv");
//!
//! assert_eq!(parsed.name, "The Matrix");
//! assert_eq!(parsed.year, 1999);
//! assert_eq!(parsed.resolution, "1080p");
//! ```
//!
//! Titles that themselves contain a four-digit number (`2001 A Space Odyssey`
//! without a year suffix, `Blade Runner 2049 (2017)` with one) are only
//! approximated: the last year-like token always wins.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

static RESOLUTION_P: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d\d\d\d?[pP]$").expect("valid resolution regex"));
static RESOLUTION_K: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d[kK]$").expect("valid resolution regex"));

/// What could be guessed from a filename.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedFilename {
    /// Guessed title, tokens joined with single spaces.
    pub name: String,
    /// Release year, `0` when no year-like token was found.
    pub year: i32,
    /// Resolution token as written (`1080p`, `4K`), empty when absent.
    pub resolution: String,
}

impl ParsedFilename {
    /// Use `hint` as the resolution when the filename carried none.
    pub fn fill_resolution(&mut self, hint: &str) {
        if self.resolution.is_empty() {
            self.resolution = hint.to_string();
        }
    }

    /// Whether a release year was found.
    pub fn has_year(&self) -> bool {
        self.year != 0
    }
}

/// Parse a bare filename (no directory part).
///
/// # Examples
///
/// ```
/// use starfin_parser::parse_filename;
///
/// let parsed = parse_filename("Heat (1995).mkv");
/// assert_eq!(parsed.name, "Heat");
/// assert_eq!(parsed.year, 1995);
///
/// // Without a year, every token (extension included) is part of the name.
/// let parsed = parse_filename("Movie.mkv");
/// assert_eq!(parsed.name, "Movie mkv");
/// assert_eq!(parsed.year, 0);
/// ```
pub fn parse_filename(filename: &str) -> ParsedFilename {
    let tokens: Vec<&str> = filename
        .split(['.', ' '])
        .filter(|token| !token.is_empty())
        .collect();

    let mut parsed = ParsedFilename::default();

    let year_at = tokens
        .iter()
        .enumerate()
        .rev()
        .find_map(|(i, token)| year_token(token).map(|year| (i, year)));

    match year_at {
        Some((i, year)) if year > 0 => {
            parsed.year = year;
            parsed.name = tokens[..i].join(" ");
        }
        Some((_, year)) => {
            parsed.year = year;
            parsed.name = tokens.join(" ");
        }
        None => parsed.name = tokens.join(" "),
    }

    if let Some(res) = tokens
        .iter()
        .rev()
        .find(|token| RESOLUTION_P.is_match(token) || RESOLUTION_K.is_match(token))
    {
        parsed.resolution = (*res).to_string();
    }

    parsed
}

/// Parse the final component of `path`.
pub fn parse_path(path: &Path) -> ParsedFilename {
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy())
        .unwrap_or_default();
    parse_filename(&filename)
}

fn year_token(token: &str) -> Option<i32> {
    let digits = match token.strip_prefix('(').and_then(|t| t.strip_suffix(')')) {
        Some(inner) => inner,
        None => token,
    };
    if digits.len() == 4 && digits.bytes().all(|b| b.is_ascii_digit()) {
        digits.parse().ok()
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dotted_release_name() {
        let parsed = parse_filename("Movie.Title.2020.1080p.mkv");
        assert_eq!(parsed.name, "Movie Title");
        assert_eq!(parsed.year, 2020);
        assert_eq!(parsed.resolution, "1080p");
    }

    #[test]
    fn test_parenthesised_year() {
        let parsed = parse_filename("Some Film (1999).mkv");
        assert_eq!(parsed.name, "Some Film");
        assert_eq!(parsed.year, 1999);
        assert_eq!(parsed.resolution, "");
    }

    #[test]
    fn test_no_year_keeps_extension_token() {
        let parsed = parse_filename("Movie.mkv");
        assert_eq!(parsed.name, "Movie mkv");
        assert_eq!(parsed.year, 0);
        assert!(!parsed.has_year());
    }

    #[test]
    fn test_last_year_wins() {
        // Title starting with a year-like token.
        let parsed = parse_filename("1917.2019.2160p.mkv");
        assert_eq!(parsed.name, "1917");
        assert_eq!(parsed.year, 2019);
        assert_eq!(parsed.resolution, "2160p");

        let parsed = parse_filename("Blade.Runner.2049.(2017).mkv");
        assert_eq!(parsed.name, "Blade Runner 2049");
        assert_eq!(parsed.year, 2017);
    }

    #[test]
    fn test_year_only_title() {
        // The title itself is mistaken for the year: known approximation.
        let parsed = parse_filename("2012.mkv");
        assert_eq!(parsed.name, "");
        assert_eq!(parsed.year, 2012);
    }

    #[test]
    fn test_signed_tokens_are_not_years() {
        let parsed = parse_filename("Heat.+199.mkv");
        assert_eq!(parsed.name, "Heat +199 mkv");
        assert_eq!(parsed.year, 0);

        let parsed = parse_filename("Heat.-123.mkv");
        assert_eq!(parsed.year, 0);
        assert_eq!(parsed.name, "Heat -123 mkv");

        assert_eq!(parse_filename("Heat.(+995).mkv").year, 0);
        assert_eq!(parse_filename("Heat.(1995).mkv").year, 1995);
    }

    #[test]
    fn test_resolution_variants() {
        assert_eq!(parse_filename("A.2001.720p.mkv").resolution, "720p");
        assert_eq!(parse_filename("A.2001.480P.avi").resolution, "480P");
        assert_eq!(parse_filename("A.2001.4K.mkv").resolution, "4K");
        assert_eq!(parse_filename("A.2001.8k.mkv").resolution, "8k");
        assert_eq!(parse_filename("A.2001.10K.mkv").resolution, "");
        assert_eq!(parse_filename("A.2001.12345p.mkv").resolution, "");
    }

    #[test]
    fn test_last_resolution_wins() {
        let parsed = parse_filename("A.2001.720p.1080p.mkv");
        assert_eq!(parsed.resolution, "1080p");
    }

    #[test]
    fn test_empty_tokens_are_dropped() {
        let parsed = parse_filename("The..Thing  1982.mkv");
        assert_eq!(parsed.name, "The Thing");
        assert_eq!(parsed.year, 1982);
    }

    #[test]
    fn test_fill_resolution() {
        let mut parsed = parse_filename("Heat.1995.mkv");
        parsed.fill_resolution("1080p");
        assert_eq!(parsed.resolution, "1080p");

        let mut parsed = parse_filename("Heat.1995.720p.mkv");
        parsed.fill_resolution("1080p");
        assert_eq!(parsed.resolution, "720p");
    }

    #[test]
    fn test_parse_path_uses_file_name() {
        let parsed = parse_path(Path::new("/media/films.2020/Heat.1995.mkv"));
        assert_eq!(parsed.name, "Heat");
        assert_eq!(parsed.year, 1995);
    }

    #[test]
    fn test_empty_input() {
        let parsed = parse_filename("");
        assert_eq!(parsed, ParsedFilename::default());
    }

    #[test]
    fn test_serializes() {
        let parsed = parse_filename("Heat.1995.mkv");
        let json = serde_json::to_value(&parsed).unwrap();
        assert_eq!(json["name"], "Heat");
        assert_eq!(json["year"], 1995);
    }
}
