//! Volume administration and the initial scan of a new volume.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use starfin_common::{Error, MediaKind, Result, VolumeId};
use starfin_db::{Film, Volume, VolumeStore};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::dispatch::Dispatcher;
use crate::scanner::{list_files, related_subtitles_for};
use crate::sync::{SyncReport, Synchronizer};
use crate::watch::WatcherControl;

/// Shortest accepted volume name.
const MIN_NAME_LEN: usize = 3;

pub struct VolumeManager {
    volumes: Arc<dyn VolumeStore>,
    dispatcher: Arc<Dispatcher>,
    watcher: Option<WatcherControl>,
    workers: usize,
}

impl VolumeManager {
    pub fn new(volumes: Arc<dyn VolumeStore>, dispatcher: Arc<Dispatcher>, workers: usize) -> Self {
        Self {
            volumes,
            dispatcher,
            watcher: None,
            workers: workers.max(1),
        }
    }

    /// Hand newly scanned volumes to a running watcher.
    pub fn with_watcher(mut self, watcher: WatcherControl) -> Self {
        self.watcher = Some(watcher);
        self
    }

    pub fn list(&self) -> Result<Vec<Volume>> {
        self.volumes.list_volumes()
    }

    /// Register a volume and start its initial scan in the background.
    ///
    /// The returned handle resolves once the scan finished and the volume was
    /// handed to the watcher; dropping it leaves the scan running.
    pub fn add_volume(
        self: &Arc<Self>,
        name: &str,
        path: &Path,
        is_recursive: bool,
        media_kind: MediaKind,
    ) -> Result<(Volume, JoinHandle<()>)> {
        let name = name.trim();
        if name.chars().count() < MIN_NAME_LEN {
            return Err(Error::invalid_input(format!(
                "volume name must be at least {} characters",
                MIN_NAME_LEN
            )));
        }
        if !path.is_dir() {
            return Err(Error::invalid_input(format!(
                "{} is not a directory",
                path.display()
            )));
        }
        if media_kind == MediaKind::TvShows {
            return Err(Error::invalid_input("TV series volumes are not supported"));
        }
        if self.volumes.list_volumes()?.iter().any(|v| v.path == path) {
            return Err(Error::conflict(format!(
                "a volume already covers {}",
                path.display()
            )));
        }

        let volume = Volume::new(name, path, is_recursive, media_kind);
        self.volumes.add_volume(&volume)?;
        info!(volume = %volume.name, path = %volume.path.display(), "Added volume");

        let manager = Arc::clone(self);
        let scanned = volume.clone();
        let handle = tokio::spawn(async move {
            if let Err(e) = manager.initial_scan(&scanned).await {
                error!(volume = %scanned.name, "Initial scan failed: {}", e);
            }
            if let Some(watcher) = &manager.watcher {
                if let Err(e) = watcher.add_volume(scanned.clone()).await {
                    warn!(volume = %scanned.name, "Cannot watch volume: {}", e);
                }
            }
        });

        Ok((volume, handle))
    }

    /// Catalog every file of a freshly added volume.
    ///
    /// Entries are built and enriched by a pool of workers; the finished
    /// entries are stored one at a time so merges by TMDB id stay ordered.
    pub async fn initial_scan(&self, volume: &Volume) -> Result<SyncReport> {
        let files = list_files(volume)?;
        let catalog = Arc::clone(self.dispatcher.catalog());
        let mut report = SyncReport::default();

        info!(
            volume = %volume.name,
            videos = files.videos.len(),
            subtitles = files.subtitles.len(),
            workers = self.workers,
            "Starting initial scan"
        );

        let (paths_tx, paths_rx) = mpsc::channel::<PathBuf>(self.workers * 2);
        let paths_rx = Arc::new(Mutex::new(paths_rx));
        let (films_tx, mut films_rx) = mpsc::channel::<Film>(self.workers);

        let mut handles = Vec::with_capacity(self.workers);
        for _ in 0..self.workers {
            let rx = Arc::clone(&paths_rx);
            let tx = films_tx.clone();
            let catalog = Arc::clone(&catalog);
            let volume_id = volume.id;
            handles.push(tokio::spawn(async move {
                loop {
                    let next = {
                        let mut guard = rx.lock().await;
                        guard.recv().await
                    };
                    let Some(path) = next else { break };

                    match catalog.store().is_path_present(&path) {
                        Ok(false) => {}
                        Ok(true) => continue,
                        Err(e) => {
                            warn!(path = %path.display(), "Cannot check video: {}", e);
                            continue;
                        }
                    }

                    let subtitles = related_subtitles_for(&path).unwrap_or_default();
                    let enricher = catalog.enricher();
                    let mut film = enricher.create_entry(&path, volume_id, &subtitles).await;
                    enricher.enrich(&mut film).await;
                    if tx.send(film).await.is_err() {
                        break;
                    }
                }
            }));
        }
        drop(films_tx);

        let videos = files.videos.clone();
        let feeder = tokio::spawn(async move {
            for path in videos {
                if paths_tx.send(path).await.is_err() {
                    break;
                }
            }
        });

        while let Some(film) = films_rx.recv().await {
            match catalog.add_film(&film, false).await {
                Ok(()) => report.videos_added += 1,
                Err(e) => {
                    let path = film.primary_file().map(|vf| vf.path.display().to_string());
                    warn!(path = ?path, "Cannot store scanned film: {}", e);
                    report.failures += 1;
                }
            }
        }

        if let Err(e) = feeder.await {
            error!("Scan feeder panicked: {}", e);
        }
        for handle in handles {
            if let Err(e) = handle.await {
                error!("Scan worker panicked: {}", e);
                report.failures += 1;
            }
        }

        for subtitle in &files.subtitles {
            match catalog.store().is_subtitle_path_present(subtitle) {
                Ok(false) => {}
                Ok(true) => continue,
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

        info!(
            volume = %volume.name,
            videos_added = report.videos_added,
            subtitles_added = report.subtitles_added,
            failures = report.failures,
            "Initial scan finished"
        );
        Ok(report)
    }

    /// Stop watching a volume and drop it with its volume files.
    ///
    /// Returns how many films disappeared with it.
    pub async fn delete_volume(&self, id: VolumeId) -> Result<usize> {
        let volume = self.volumes.get_volume(id)?;

        if let Some(watcher) = &self.watcher {
            if let Err(e) = watcher.remove_volume(id).await {
                debug!(volume = %volume.name, "Watcher not told about removal: {}", e);
            }
        }

        let deleted = self.volumes.delete_volume(id)?;
        self.dispatcher.catalog().refresh_filters()?;
        info!(volume = %volume.name, films_deleted = deleted, "Deleted volume");
        Ok(deleted)
    }
}

/// Keeps a running watcher's volume set in step with the volume store.
///
/// Volumes registered or deleted by another command while the watcher runs
/// join or leave the watch set at the next refresh. The command that
/// registered a volume runs its initial scan, so a volume picked up here is
/// only watched.
pub struct VolumeFollower {
    volumes: Arc<dyn VolumeStore>,
    watcher: WatcherControl,
    synchronizer: Synchronizer,
    watched: HashSet<VolumeId>,
}

impl VolumeFollower {
    pub fn new(
        volumes: Arc<dyn VolumeStore>,
        watcher: WatcherControl,
        synchronizer: Synchronizer,
    ) -> Self {
        Self {
            volumes,
            watcher,
            synchronizer,
            watched: HashSet::new(),
        }
    }

    /// Watch every stored volume, then sync each of them.
    ///
    /// Files that change while a sync is running are already seen by the
    /// watcher.
    pub async fn start(&mut self) -> Result<Vec<(Volume, Result<SyncReport>)>> {
        let volumes = self.volumes.list_volumes()?;
        for volume in &volumes {
            self.watch(volume.clone()).await?;
        }

        let mut reports = Vec::with_capacity(volumes.len());
        for volume in volumes {
            let report = self.synchronizer.sync(&volume).await;
            match &report {
                Ok(report) => info!(
                    volume = %volume.name,
                    videos_added = report.videos_added,
                    subtitles_added = report.subtitles_added,
                    videos_removed = report.videos_removed,
                    subtitles_removed = report.subtitles_removed,
                    failures = report.failures,
                    "Volume synchronized"
                ),
                Err(e) => error!(volume = %volume.name, "Sync failed: {}", e),
            }
            reports.push((volume, report));
        }
        Ok(reports)
    }

    /// Watch volumes that appeared in the store and drop those that left it.
    ///
    /// Returns how many volumes were added and removed.
    pub async fn refresh(&mut self) -> Result<(usize, usize)> {
        let volumes = self.volumes.list_volumes()?;
        let stored: HashSet<VolumeId> = volumes.iter().map(|v| v.id).collect();

        let gone: Vec<VolumeId> = self.watched.difference(&stored).copied().collect();
        for id in &gone {
            self.watcher.remove_volume(*id).await.map_err(watcher_gone)?;
            self.watched.remove(id);
            info!(volume_id = %id, "Volume deleted elsewhere, no longer watched");
        }

        let mut added = 0;
        for volume in volumes {
            if !self.watched.contains(&volume.id) {
                info!(volume = %volume.name, "Volume registered elsewhere, watching it");
                self.watch(volume).await?;
                added += 1;
            }
        }

        Ok((added, gone.len()))
    }

    /// Start, then refresh every `every` until the watcher stops.
    pub async fn run(mut self, every: Duration) {
        if let Err(e) = self.start().await {
            error!("Cannot watch stored volumes: {}", e);
        }

        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        while self.watcher.is_running() {
            ticker.tick().await;
            if let Err(e) = self.refresh().await {
                warn!("Cannot refresh watched volumes: {}", e);
            }
        }
        debug!("File watcher stopped, no longer following volumes");
    }

    async fn watch(&mut self, volume: Volume) -> Result<()> {
        let id = volume.id;
        self.watcher.add_volume(volume).await.map_err(watcher_gone)?;
        self.watched.insert(id);
        Ok(())
    }
}

fn watcher_gone(e: anyhow::Error) -> Error {
    Error::unavailable(e.to_string())
}

