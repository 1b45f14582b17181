//! Live file watching.
//!
//! A single task owns the watched volumes and the pending writes. It wakes
//! up on OS file events, on commands, and on a poll tick that checks
//! whether pending files stopped changing. Catalog work is handed, in
//! order, to the dispatch worker so slow enrichment never delays a tick.

pub mod events;
pub mod settle;

pub use events::{classify, FileEvent};
pub use settle::{PendingWrites, UnpairedMoves, WriteState};

use crate::config::WatchConfig;
use crate::dispatch::{spawn_dispatch_worker, volume_for, DispatchJob, Dispatcher};
use anyhow::{anyhow, Context, Result};
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use starfin_common::paths::file_kind;
use starfin_common::VolumeId;
use starfin_db::Volume;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// What the OS watcher reports.
#[derive(Debug)]
pub enum WatchSignal {
    Event(Event),
    /// The OS watcher failed; the event loop stops.
    Error(notify::Error),
}

#[derive(Debug)]
pub enum WatchCommand {
    AddVolume(Volume),
    RemoveVolume(VolumeId),
    Shutdown,
}

/// Cloneable handle used to change what the running watcher looks at.
#[derive(Debug, Clone)]
pub struct WatcherControl {
    commands: mpsc::Sender<WatchCommand>,
}

impl WatcherControl {
    pub async fn add_volume(&self, volume: Volume) -> Result<()> {
        self.send(WatchCommand::AddVolume(volume)).await
    }

    pub async fn remove_volume(&self, id: VolumeId) -> Result<()> {
        self.send(WatchCommand::RemoveVolume(id)).await
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.send(WatchCommand::Shutdown).await
    }

    /// Whether the event loop still takes commands.
    pub fn is_running(&self) -> bool {
        !self.commands.is_closed()
    }

    async fn send(&self, command: WatchCommand) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| anyhow!("file watcher is not running"))
    }
}

/// The event loop state, owned by its task.
pub struct EventLoop {
    poll_interval: Duration,
    volumes: Vec<Volume>,
    pending: PendingWrites,
    moved_away: UnpairedMoves,
    signals: mpsc::Receiver<WatchSignal>,
    commands: mpsc::Receiver<WatchCommand>,
    jobs: mpsc::UnboundedSender<DispatchJob>,
    os_watcher: Option<RecommendedWatcher>,
}

impl EventLoop {
    /// Build a loop fed by `signals` and emitting jobs on `jobs`.
    ///
    /// Without an OS watcher, volumes are only used to route events.
    pub fn new(
        poll_interval: Duration,
        signals: mpsc::Receiver<WatchSignal>,
        jobs: mpsc::UnboundedSender<DispatchJob>,
        os_watcher: Option<RecommendedWatcher>,
    ) -> (Self, WatcherControl) {
        let (commands_tx, commands) = mpsc::channel(16);
        let event_loop = Self {
            poll_interval,
            volumes: Vec::new(),
            pending: PendingWrites::new(),
            moved_away: UnpairedMoves::new(),
            signals,
            commands,
            jobs,
            os_watcher,
        };
        (event_loop, WatcherControl { commands: commands_tx })
    }

    /// Run until shutdown, a closed event stream, or a watcher error.
    pub async fn run(mut self) -> Result<()> {
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => self.poll(),

                signal = self.signals.recv() => match signal {
                    Some(WatchSignal::Event(event)) => self.handle_event(&event),
                    Some(WatchSignal::Error(e)) => {
                        error!("File watcher error: {}", e);
                        return Err(anyhow::Error::new(e).context("file watcher failed"));
                    }
                    None => {
                        info!("File event stream closed");
                        return Ok(());
                    }
                },

                command = self.commands.recv() => match command {
                    Some(WatchCommand::AddVolume(volume)) => self.add_volume(volume),
                    Some(WatchCommand::RemoveVolume(id)) => self.remove_volume(id),
                    Some(WatchCommand::Shutdown) | None => {
                        info!(pending = self.pending.len(), "File watcher stopped");
                        return Ok(());
                    }
                },
            }
        }
    }

    fn handle_event(&mut self, event: &Event) {
        for file_event in classify(event) {
            debug!(event = ?file_event, "File event");
            match file_event {
                FileEvent::Created(path) | FileEvent::Written(path) => self.note_write(path),
                FileEvent::Renamed { from, to } => {
                    self.moved_away.pair(&from);
                    if self.pending.state(&from) != WriteState::Unseen {
                        // Never cataloged: keep waiting under the new name.
                        self.pending.forget(&from);
                        self.note_write(to);
                        continue;
                    }
                    // The destination half may have started a debounce.
                    self.pending.forget(&to);
                    let volume = volume_for(&self.volumes, &to).cloned();
                    self.dispatch(DispatchJob::Rename { from, to, volume });
                }
                FileEvent::MovedAway(path) => {
                    if file_kind(&path).is_some() {
                        self.moved_away.note(path);
                    }
                }
                FileEvent::Removed(path) => {
                    self.pending.forget(&path);
                    self.moved_away.pair(&path);
                    if file_kind(&path).is_some() {
                        self.dispatch(DispatchJob::Remove { path });
                    }
                }
            }
        }
    }

    fn note_write(&mut self, path: PathBuf) {
        if file_kind(&path).is_none() || path.is_dir() {
            return;
        }
        let shown = path.display().to_string();
        if self.pending.track(path) {
            debug!(path = %shown, "Waiting for file to settle");
        }
    }

    fn poll(&mut self) {
        for path in self.pending.poll() {
            match volume_for(&self.volumes, &path) {
                Some(volume) => {
                    debug!(path = %path.display(), "File has stopped changing");
                    let volume = volume.clone();
                    self.dispatch(DispatchJob::Create { path, volume });
                }
                None => debug!(path = %path.display(), "Settled file is outside every volume"),
            }
        }

        for path in self.moved_away.poll() {
            debug!(path = %path.display(), "File moved out of the watched volumes");
            self.pending.forget(&path);
            self.dispatch(DispatchJob::Remove { path });
        }
    }

    fn dispatch(&self, job: DispatchJob) {
        if self.jobs.send(job).is_err() {
            warn!("Dispatch worker is gone, dropping file event");
        }
    }

    fn add_volume(&mut self, volume: Volume) {
        if self.volumes.iter().any(|v| v.id == volume.id) {
            return;
        }

        if let Some(watcher) = self.os_watcher.as_mut() {
            let mode = if volume.is_recursive {
                RecursiveMode::Recursive
            } else {
                RecursiveMode::NonRecursive
            };
            if let Err(e) = watcher.watch(&volume.path, mode) {
                error!(volume = %volume.name, path = %volume.path.display(), "Could not watch volume: {}", e);
                return;
            }
        }

        info!(volume = %volume.name, path = %volume.path.display(), "Watching volume");
        self.volumes.push(volume);
    }

    fn remove_volume(&mut self, id: VolumeId) {
        let Some(index) = self.volumes.iter().position(|v| v.id == id) else {
            return;
        };
        let volume = self.volumes.remove(index);

        if let Some(watcher) = self.os_watcher.as_mut() {
            if let Err(e) = watcher.unwatch(&volume.path) {
                debug!(volume = %volume.name, "Could not unwatch volume: {}", e);
            }
        }
        self.pending.forget_under(&volume.path);
        self.moved_away.forget_under(&volume.path);
        info!(volume = %volume.name, "Stopped watching volume");
    }
}

/// A running watcher: the event loop task plus its dispatch worker.
pub struct FileWatcher {
    control: WatcherControl,
    event_loop: JoinHandle<Result<()>>,
    worker: JoinHandle<()>,
}

impl FileWatcher {
    /// Start an OS-backed watcher with no volumes yet.
    pub fn start(config: &WatchConfig, dispatcher: Arc<Dispatcher>) -> Result<Self> {
        let (signals_tx, signals) = mpsc::channel(256);

        let os_watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                let signal = match res {
                    Ok(event) => WatchSignal::Event(event),
                    Err(e) => WatchSignal::Error(e),
                };
                // Runs on notify's own thread, never inside the runtime.
                let _ = signals_tx.blocking_send(signal);
            },
            notify::Config::default(),
        )
        .context("Failed to create file watcher")?;

        Ok(Self::spawn(
            config.poll_interval(),
            signals,
            Some(os_watcher),
            dispatcher,
        ))
    }

    /// Start a watcher fed by an arbitrary signal stream.
    pub fn spawn(
        poll_interval: Duration,
        signals: mpsc::Receiver<WatchSignal>,
        os_watcher: Option<RecommendedWatcher>,
        dispatcher: Arc<Dispatcher>,
    ) -> Self {
        let (jobs_tx, jobs_rx) = mpsc::unbounded_channel();
        let worker = spawn_dispatch_worker(dispatcher, jobs_rx);
        let (event_loop, control) = EventLoop::new(poll_interval, signals, jobs_tx, os_watcher);

        Self {
            control,
            event_loop: tokio::spawn(event_loop.run()),
            worker,
        }
    }

    pub fn control(&self) -> WatcherControl {
        self.control.clone()
    }

    /// Run until `shutdown` resolves or the watcher fails, then let the
    /// dispatch worker finish the jobs already handed to it.
    pub async fn run_until(mut self, shutdown: impl Future<Output = ()>) -> Result<()> {
        let outcome = tokio::select! {
            _ = shutdown => {
                info!("Shutting down file watcher");
                // The loop may already be gone; its result says why.
                let _ = self.control.shutdown().await;
                (&mut self.event_loop).await
            }
            outcome = &mut self.event_loop => outcome,
        };

        self.worker.await.context("dispatch worker panicked")?;
        outcome.context("file watcher task panicked")?
    }

    /// Stop now and wait for queued jobs.
    pub async fn shutdown(self) -> Result<()> {
        self.run_until(async {}).await
    }
}
