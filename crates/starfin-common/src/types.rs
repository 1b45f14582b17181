//! Core type definitions shared by the catalog crates.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of media a volume holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// Feature films.
    Movies,
    /// TV series. Volumes of this kind can be registered but are not catalogued.
    TvShows,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Movies => write!(f, "movies"),
            Self::TvShows => write!(f, "tvshows"),
        }
    }
}

impl std::str::FromStr for MediaKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "movies" | "movie" | "film" | "films" => Ok(Self::Movies),
            "tvshows" | "tv" | "series" => Ok(Self::TvShows),
            _ => Err(format!("Invalid media kind: {}", s)),
        }
    }
}
