//! Create, rename and remove pipelines shared by the synchronizer and the
//! live watcher, and the in-order worker that runs them for the watcher.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use starfin_common::paths::{file_kind, FileKind};
use starfin_common::{Error, Result, VolumeId};
use starfin_db::{CatalogStore, Volume};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::catalog::Catalog;
use crate::scanner::{related_media_for, related_subtitles_for, subtitles_for};

/// The volume whose root is the longest prefix of `path`.
pub fn volume_for<'a>(volumes: &'a [Volume], path: &Path) -> Option<&'a Volume> {
    volumes
        .iter()
        .filter(|volume| volume.contains(path))
        .max_by_key(|volume| volume.path.components().count())
}

/// Work handed from the watcher loop to the dispatch worker.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchJob {
    /// A file finished being written.
    Create { path: PathBuf, volume: Volume },
    /// A file moved; `volume` is the one holding the new path, if any.
    Rename {
        from: PathBuf,
        to: PathBuf,
        volume: Option<Volume>,
    },
    Remove { path: PathBuf },
}

/// Applies file changes to the catalog.
pub struct Dispatcher {
    catalog: Arc<Catalog>,
}

impl Dispatcher {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    fn store(&self) -> &Arc<dyn CatalogStore> {
        self.catalog.store()
    }

    /// Run one job, logging rather than returning its failure.
    pub async fn run(&self, job: DispatchJob) {
        let result = match &job {
            DispatchJob::Create { path, volume } => self.create(path, volume).await,
            DispatchJob::Rename { from, to, volume } => {
                self.rename(from, to, volume.as_ref()).await
            }
            DispatchJob::Remove { path } => self.remove(path).await,
        };
        if let Err(e) = result {
            error!(job = ?job, "File event handling failed: {}", e);
        }
    }

    /// Catalog a new file of `volume`.
    pub async fn create(&self, path: &Path, volume: &Volume) -> Result<()> {
        match file_kind(path) {
            Some(FileKind::Video) => self.create_video(path, volume.id).await.map(|_| ()),
            Some(FileKind::Subtitle) => self.create_subtitle(path).await.map(|_| ()),
            None => Ok(()),
        }
    }

    /// Build, enrich and store the entry for a video file.
    ///
    /// Returns `false` when the path was already cataloged.
    pub async fn create_video(&self, path: &Path, volume_id: VolumeId) -> Result<bool> {
        if self.store().is_path_present(path)? {
            debug!(path = %path.display(), "Video already cataloged");
            return Ok(false);
        }

        let subtitles = related_subtitles_for(path).unwrap_or_else(|e| {
            debug!(path = %path.display(), "Cannot list related subtitles: {}", e);
            Vec::new()
        });

        let enricher = self.catalog.enricher();
        let mut film = enricher.create_entry(path, volume_id, &subtitles).await;
        enricher.enrich(&mut film).await;
        self.catalog.add_film(&film, false).await?;
        Ok(true)
    }

    /// Attach a subtitle file to every cataloged media file it belongs to.
    ///
    /// Returns how many media files it was attached to; per media failures
    /// are logged.
    pub async fn create_subtitle(&self, path: &Path) -> Result<usize> {
        let (media_paths, _) = related_media_for(path)?;
        Ok(self.attach_subtitle(path, &media_paths))
    }

    fn attach_subtitle(&self, path: &Path, media_paths: &[PathBuf]) -> usize {
        let single = [path.to_path_buf()];
        let mut attached = 0;

        for media_path in media_paths {
            let Some(subtitle) = subtitles_for(media_path, &single).into_iter().next() else {
                continue;
            };
            match self.store().add_subtitle(media_path, &subtitle) {
                Ok(()) => {
                    attached += 1;
                    debug!(
                        subtitle = %path.display(),
                        media = %media_path.display(),
                        language = %subtitle.language,
                        "Attached subtitle"
                    );
                }
                Err(Error::Conflict(_)) => debug!(
                    subtitle = %path.display(),
                    media = %media_path.display(),
                    "Subtitle already attached"
                ),
                Err(e) => warn!(
                    subtitle = %path.display(),
                    media = %media_path.display(),
                    "Cannot add subtitle to media: {}",
                    e
                ),
            }
        }

        attached
    }

    /// Handle a move from `from` to `to`.
    pub async fn rename(&self, from: &Path, to: &Path, volume: Option<&Volume>) -> Result<()> {
        match (file_kind(from), file_kind(to), volume) {
            (Some(FileKind::Video), Some(FileKind::Video), Some(volume)) => {
                self.rename_video(from, to, volume).await
            }
            (Some(FileKind::Subtitle), Some(FileKind::Subtitle), _) => {
                self.rename_subtitle(from, to);
                Ok(())
            }
            (old, new, volume) => {
                if old.is_some() {
                    self.remove(from).await?;
                }
                match (new, volume) {
                    (Some(_), Some(volume)) => self.create(to, volume).await,
                    (Some(_), None) => {
                        debug!(path = %to.display(), "Moved outside of every volume");
                        Ok(())
                    }
                    (None, _) => Ok(()),
                }
            }
        }
    }

    async fn rename_video(&self, from: &Path, to: &Path, volume: &Volume) -> Result<()> {
        let subtitles = related_subtitles_for(to).unwrap_or_else(|e| {
            debug!(path = %to.display(), "Cannot list related subtitles: {}", e);
            Vec::new()
        });

        let enricher = self.catalog.enricher();
        let mut renamed = enricher.create_entry(to, volume.id, &subtitles).await;
        if let Err(e) = enricher.resolve_external_id(&mut renamed).await {
            warn!(path = %to.display(), "Could not identify renamed file: {}", e);
        }

        let old_film = self.catalog.find_film_at(from)?;
        match old_film {
            Some(old_film) if old_film.tmdb_id == renamed.tmdb_id => {
                let new_file = renamed
                    .primary_file()
                    .ok_or_else(|| Error::internal("entry without volume file"))?;
                self.store().replace_volume_file(&old_film, from, new_file)?;
                info!(
                    from = %from.display(),
                    to = %to.display(),
                    film_id = %old_film.id,
                    "Renamed volume file"
                );
                Ok(())
            }
            old_film => {
                if old_film.is_some() {
                    self.store().delete_volume_file(from)?;
                }
                self.create_video(to, volume.id).await.map(|_| ())
            }
        }
    }

    fn rename_subtitle(&self, from: &Path, to: &Path) {
        self.detach_subtitle_everywhere(from);

        match related_media_for(to) {
            Ok((media_paths, _)) => {
                self.attach_subtitle(to, &media_paths);
            }
            Err(e) => warn!(path = %to.display(), "Cannot find media of renamed subtitle: {}", e),
        }
    }

    /// Forget a file that disappeared.
    pub async fn remove(&self, path: &Path) -> Result<()> {
        match file_kind(path) {
            Some(FileKind::Video) => self.remove_video(path).map(|_| ()),
            Some(FileKind::Subtitle) => {
                self.detach_subtitle_everywhere(path);
                Ok(())
            }
            None => Ok(()),
        }
    }

    /// Delete a video's volume file; `false` when it was not cataloged.
    pub fn remove_video(&self, path: &Path) -> Result<bool> {
        match self.store().delete_volume_file(path) {
            Ok(()) => {
                info!(path = %path.display(), "Removed volume file");
                Ok(true)
            }
            Err(Error::NotFound(_)) => {
                debug!(path = %path.display(), "Removed video was not cataloged");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Detach one subtitle from one media file; `false` when it was not attached.
    pub fn detach_subtitle(&self, media_path: &Path, subtitle_path: &Path) -> Result<bool> {
        match self.store().remove_subtitle(media_path, subtitle_path) {
            Ok(()) => Ok(true),
            Err(Error::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Detach a subtitle from the media the catalog records it on and from
    /// the media the directory listing relates it to.
    fn detach_subtitle_everywhere(&self, path: &Path) -> usize {
        let mut media_paths: BTreeSet<PathBuf> = BTreeSet::new();

        match self.store().media_paths_for_subtitle(path) {
            Ok(paths) => media_paths.extend(paths),
            Err(e) => warn!(path = %path.display(), "Cannot look up subtitle owners: {}", e),
        }
        if let Ok((paths, _)) = related_media_for(path) {
            media_paths.extend(paths);
        }

        let mut detached = 0;
        for media_path in &media_paths {
            match self.detach_subtitle(media_path, path) {
                Ok(true) => detached += 1,
                Ok(false) => {}
                Err(e) => warn!(
                    subtitle = %path.display(),
                    media = %media_path.display(),
                    "Cannot remove subtitle from media: {}",
                    e
                ),
            }
        }
        detached
    }
}

/// Run jobs one at a time, in the order they were sent, until the sender
/// side is dropped and every queued job is done.
pub fn spawn_dispatch_worker(
    dispatcher: Arc<Dispatcher>,
    mut jobs: mpsc::UnboundedReceiver<DispatchJob>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(job) = jobs.recv().await {
            debug!(job = ?job, "Dispatching file event");
            dispatcher.run(job).await;
        }
        debug!("Dispatch worker stopped");
    })
}
