//! Catalog records as stored in the database.
//!
//! A [`Film`] owns an ordered list of [`VolumeFile`]s; each volume file owns
//! the sidecar [`Subtitle`]s found next to it. Technical details from the
//! media probe travel along as [`MediaInfo`].

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use starfin_common::{FilmId, MediaKind, PersonId, VolumeId};

/// A registered media root.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Volume {
    pub id: VolumeId,
    pub name: String,
    pub path: PathBuf,
    pub is_recursive: bool,
    pub media_kind: MediaKind,
    pub created_at: DateTime<Utc>,
}

impl Volume {
    /// Build a new, not yet persisted volume.
    pub fn new(
        name: impl Into<String>,
        path: impl Into<PathBuf>,
        is_recursive: bool,
        media_kind: MediaKind,
    ) -> Self {
        Self {
            id: VolumeId::new(),
            name: name.into(),
            path: path.into(),
            is_recursive,
            media_kind,
            created_at: Utc::now(),
        }
    }

    /// Whether `path` lives under this volume's root.
    pub fn contains(&self, path: &Path) -> bool {
        path.starts_with(&self.path)
    }
}

/// A sidecar subtitle attached to one volume file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Subtitle {
    pub path: PathBuf,
    /// Free-form language tag taken from the filename, possibly empty.
    pub language: String,
}

/// Video track details.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct VideoInfo {
    pub codec_id: String,
    pub profile: String,
    pub resolution: String,
    pub frame_rate: String,
    pub bit_depth: String,
}

/// Audio track details.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AudioInfo {
    pub codec_id: String,
    pub channels: String,
    pub language: String,
    pub sampling_rate: String,
}

/// Embedded subtitle track details.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubsInfo {
    pub codec_id: String,
    pub language: String,
    pub forced: String,
}

/// Technical description of a media file.
///
/// Every field is blank when the probe failed.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MediaInfo {
    pub format: String,
    /// Human readable size, e.g. `1.46 GB`.
    pub file_size: String,
    /// `HH:MM:SS`.
    pub duration: String,
    /// Resolution hint derived from the first video track's width.
    pub resolution: String,
    pub video: Vec<VideoInfo>,
    pub audio: Vec<AudioInfo>,
    pub subtitles: Vec<SubsInfo>,
}

/// One on-disk copy of a film.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VolumeFile {
    pub path: PathBuf,
    pub volume_id: VolumeId,
    pub media_info: MediaInfo,
    pub subtitles: Vec<Subtitle>,
}

impl VolumeFile {
    pub fn new(path: impl Into<PathBuf>, volume_id: VolumeId) -> Self {
        Self {
            path: path.into(),
            volume_id,
            media_info: MediaInfo::default(),
            subtitles: Vec::new(),
        }
    }

    pub fn has_subtitle(&self, path: &Path) -> bool {
        self.subtitles.iter().any(|sub| sub.path == path)
    }
}

/// A character played by an actor.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CastMember {
    pub character: String,
    /// TMDB id of the actor.
    pub actor_id: i64,
}

/// A catalog entry.
///
/// `name`, `release_year` and `resolution` are guessed from the filename;
/// everything from `title` on comes from enrichment and stays blank until
/// the external id is resolved.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Film {
    pub id: FilmId,
    pub volume_files: Vec<VolumeFile>,
    pub name: String,
    pub release_year: i32,
    pub resolution: String,
    /// TMDB id, `None` until resolved.
    pub tmdb_id: Option<i64>,
    pub imdb_id: String,

    pub title: String,
    pub original_title: String,
    pub year: String,
    pub runtime: String,
    pub tagline: String,
    pub overview: String,
    pub poster_path: String,
    pub backdrop_path: String,
    pub classification: String,
    pub imdb_rating: String,
    pub letterboxd_rating: String,
    pub genres: Vec<String>,
    /// ISO 3166-1 codes of the production countries.
    pub countries: Vec<String>,
    /// TMDB person ids.
    pub directors: Vec<i64>,
    /// TMDB person ids.
    pub writers: Vec<i64>,
    pub cast: Vec<CastMember>,
}

impl Film {
    /// A fresh entry holding exactly one volume file.
    pub fn with_volume_file(volume_file: VolumeFile) -> Self {
        Self {
            volume_files: vec![volume_file],
            ..Default::default()
        }
    }

    /// The volume file discovered first (the one a new entry is built from).
    pub fn primary_file(&self) -> Option<&VolumeFile> {
        self.volume_files.first()
    }

    pub fn volume_file(&self, path: &Path) -> Option<&VolumeFile> {
        self.volume_files.iter().find(|vf| vf.path == path)
    }

    /// Title to show: the enriched title, or the guessed name.
    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            &self.name
        } else {
            &self.title
        }
    }

    /// Every TMDB person id the film references, cast first, without repeats.
    pub fn person_ids(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = Vec::new();
        let all = self
            .cast
            .iter()
            .map(|member| member.actor_id)
            .chain(self.directors.iter().copied())
            .chain(self.writers.iter().copied());
        for id in all {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        ids
    }
}

/// A cast or crew member, created the first time a film references them.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Person {
    pub id: PersonId,
    pub tmdb_id: i64,
    pub name: String,
    pub photo: String,
    pub bio: String,
    pub birthday: String,
    pub deathday: String,
    pub imdb_id: String,
}

impl Person {
    /// A person known only by TMDB id, used when details cannot be fetched.
    pub fn placeholder(tmdb_id: i64) -> Self {
        Self {
            tmdb_id,
            ..Default::default()
        }
    }
}
