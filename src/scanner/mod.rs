//! Volume scanner.
//!
//! Lists the video and subtitle files found under a volume root. Nothing
//! here touches the catalog; the synchronizer and the initial volume scan
//! decide what to do with the listing.

pub mod subtitles;

use starfin_common::paths::{file_kind, FileKind};
use starfin_common::{Error, Result};
use starfin_db::Volume;
use std::path::PathBuf;
use tracing::{debug, warn};
use walkdir::WalkDir;

pub use subtitles::{related_media_for, related_subtitles_for, subtitles_for};

/// Files found on a volume, each list sorted by path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScannedFiles {
    pub videos: Vec<PathBuf>,
    pub subtitles: Vec<PathBuf>,
}

impl ScannedFiles {
    pub fn len(&self) -> usize {
        self.videos.len() + self.subtitles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.videos.is_empty() && self.subtitles.is_empty()
    }
}

/// List the media files of a volume.
///
/// Non-recursive volumes only contribute their immediate entries. An
/// unreadable root is an `Io` error; unreadable entries below it are skipped.
pub fn list_files(volume: &Volume) -> Result<ScannedFiles> {
    let mut walker = WalkDir::new(&volume.path).follow_links(true);
    if !volume.is_recursive {
        walker = walker.max_depth(1);
    }

    let mut files = ScannedFiles::default();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => return Err(Error::Io(e.into())),
            Err(e) => {
                warn!(volume = %volume.name, "Skipping unreadable entry: {}", e);
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        match file_kind(entry.path()) {
            Some(FileKind::Video) => files.videos.push(entry.into_path()),
            Some(FileKind::Subtitle) => files.subtitles.push(entry.into_path()),
            None => {}
        }
    }

    files.videos.sort();
    files.subtitles.sort();

    debug!(
        volume = %volume.name,
        videos = files.videos.len(),
        subtitles = files.subtitles.len(),
        "Listed volume files"
    );

    Ok(files)
}
