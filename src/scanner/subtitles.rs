//! Pairing of media files with their sidecar subtitles.
//!
//! A subtitle belongs to a media file when both sit in the same directory
//! and the subtitle's stem starts with the media file's stem:
//!
//! ```text
//! Heat.1995.mkv
//! Heat.1995.srt      language ""
//! Heat.1995.en.srt   language "en"
//! Heat.1995_fr.srt   language "fr"
//! ```

use std::path::{Path, PathBuf};

use starfin_common::paths::{is_subtitle_file, is_video_file};
use starfin_common::{Error, Result};
use starfin_db::Subtitle;
use walkdir::WalkDir;

const LANGUAGE_SEPARATORS: [char; 4] = ['.', '_', '-', ' '];

fn stem(path: &Path) -> Option<&str> {
    path.file_stem().and_then(|s| s.to_str())
}

/// Subtitles among `candidates` that belong to the media file at `media_path`.
///
/// Candidates keep their input order. The language tag is whatever follows
/// the media stem, minus one leading separator; it is not validated.
pub fn subtitles_for(media_path: &Path, candidates: &[PathBuf]) -> Vec<Subtitle> {
    let Some(media_stem) = stem(media_path) else {
        return Vec::new();
    };
    let media_dir = media_path.parent();

    candidates
        .iter()
        .filter(|candidate| candidate.parent() == media_dir)
        .filter_map(|candidate| {
            let remainder = stem(candidate)?.strip_prefix(media_stem)?;
            let language = remainder
                .strip_prefix(LANGUAGE_SEPARATORS)
                .unwrap_or(remainder);
            Some(Subtitle {
                path: candidate.clone(),
                language: language.to_string(),
            })
        })
        .collect()
}

/// Files directly inside `dir` whose name starts with `prefix`, sorted.
fn siblings_with_prefix(dir: &Path, prefix: &str) -> Result<Vec<PathBuf>> {
    let mut matches = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| Error::Io(e.into()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let starts_with_prefix = entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with(prefix));
        if starts_with_prefix {
            matches.push(entry.into_path());
        }
    }
    matches.sort();
    Ok(matches)
}

/// Media files the subtitle at `subtitle_path` belongs to.
///
/// Looks at the videos of the subtitle's directory sharing its name up to
/// the first `.`, and keeps those [`subtitles_for`] pairs it with. The
/// returned subtitle is the pairing made with the first related media file.
pub fn related_media_for(subtitle_path: &Path) -> Result<(Vec<PathBuf>, Option<Subtitle>)> {
    let (Some(dir), Some(name)) = (
        subtitle_path.parent(),
        subtitle_path.file_name().and_then(|n| n.to_str()),
    ) else {
        return Ok((Vec::new(), None));
    };
    let prefix = name.split('.').next().unwrap_or(name);

    let single = [subtitle_path.to_path_buf()];
    let mut media = Vec::new();
    let mut subtitle = None;

    for candidate in siblings_with_prefix(dir, prefix)? {
        if !is_video_file(&candidate) {
            continue;
        }
        if let Some(found) = subtitles_for(&candidate, &single).into_iter().next() {
            subtitle.get_or_insert(found);
            media.push(candidate);
        }
    }

    Ok((media, subtitle))
}

/// Subtitle files next to `media_path` whose name starts with its stem.
pub fn related_subtitles_for(media_path: &Path) -> Result<Vec<PathBuf>> {
    let (Some(dir), Some(media_stem)) = (media_path.parent(), stem(media_path)) else {
        return Ok(Vec::new());
    };

    Ok(siblings_with_prefix(dir, media_stem)?
        .into_iter()
        .filter(|path| is_subtitle_file(path))
        .collect())
}
