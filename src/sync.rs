//! Reconciling a volume's files with the catalog.
//!
//! A sync adds every video and subtitle found on disk that the catalog does
//! not know, then forgets every cataloged file of the volume that is gone.
//! Running it twice in a row changes nothing the second time.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use starfin_common::Result;
use starfin_db::Volume;
use tracing::{info, warn};

use crate::dispatch::Dispatcher;
use crate::scanner::list_files;

/// What a sync changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub videos_added: usize,
    /// Subtitle attachments made for subtitle files that were not cataloged.
    pub subtitles_added: usize,
    pub videos_removed: usize,
    pub subtitles_removed: usize,
    /// Files whose handling failed and was skipped.
    pub failures: usize,
}

impl SyncReport {
    pub fn is_noop(&self) -> bool {
        self.videos_added == 0
            && self.subtitles_added == 0
            && self.videos_removed == 0
            && self.subtitles_removed == 0
    }
}

pub struct Synchronizer {
    dispatcher: Arc<Dispatcher>,
}

impl Synchronizer {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }

    /// Bring the catalog in line with the files currently on `volume`.
    ///
    /// Only a failure to list the volume aborts the sync; every other
    /// failure is logged, counted and skipped.
    pub async fn sync(&self, volume: &Volume) -> Result<SyncReport> {
        let files = list_files(volume)?;
        let store = self.dispatcher.catalog().store().clone();
        let mut report = SyncReport::default();

        for video in &files.videos {
            let present = match store.is_path_present(video) {
                Ok(present) => present,
                Err(e) => {
                    warn!(path = %video.display(), "Cannot check video: {}", e);
                    report.failures += 1;
                    continue;
                }
            };
            if present {
                continue;
            }
            match self.dispatcher.create_video(video, volume.id).await {
                Ok(true) => report.videos_added += 1,
                Ok(false) => {}
                Err(e) => {
                    warn!(path = %video.display(), "Cannot add video: {}", e);
                    report.failures += 1;
                }
            }
        }

        for subtitle in &files.subtitles {
            match store.is_subtitle_path_present(subtitle) {
                Ok(true) => continue,
                Ok(false) => {}
                Err(e) => {
                    warn!(path = %subtitle.display(), "Cannot check subtitle: {}", e);
                    report.failures += 1;
                    continue;
                }
            }
            match self.dispatcher.create_subtitle(subtitle).await {
                Ok(attached) => report.subtitles_added += attached,
                Err(e) => {
                    warn!(path = %subtitle.display(), "Cannot add subtitle: {}", e);
                    report.failures += 1;
                }
            }
        }

        let videos: HashSet<&PathBuf> = files.videos.iter().collect();
        let subtitles: HashSet<&PathBuf> = files.subtitles.iter().collect();

        for film in store.get_by_volume(volume.id)? {
            for volume_file in film
                .volume_files
                .iter()
                .filter(|vf| vf.volume_id == volume.id)
            {
                if !videos.contains(&volume_file.path) {
                    match self.dispatcher.remove_video(&volume_file.path) {
                        Ok(true) => report.videos_removed += 1,
                        Ok(false) => {}
                        Err(e) => {
                            warn!(path = %volume_file.path.display(), "Cannot remove video: {}", e);
                            report.failures += 1;
                        }
                    }
                    continue;
                }

                for subtitle in &volume_file.subtitles {
                    if subtitles.contains(&subtitle.path) {
                        continue;
                    }
                    match self
                        .dispatcher
                        .detach_subtitle(&volume_file.path, &subtitle.path)
                    {
                        Ok(true) => report.subtitles_removed += 1,
                        Ok(false) => {}
                        Err(e) => {
                            warn!(path = %subtitle.path.display(), "Cannot remove subtitle: {}", e);
                            report.failures += 1;
                        }
                    }
                }
            }
        }

        if report.videos_removed > 0 {
            if let Err(e) = self.dispatcher.catalog().refresh_filters() {
                warn!("Cannot refresh catalog filters: {}", e);
            }
        }

        info!(
            volume = %volume.name,
            videos_added = report.videos_added,
            subtitles_added = report.subtitles_added,
            videos_removed = report.videos_removed,
            subtitles_removed = report.subtitles_removed,
            failures = report.failures,
            "Volume synchronized"
        );

        Ok(report)
    }
}
