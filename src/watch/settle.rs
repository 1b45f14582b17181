use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Where a path stands in the write debounce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteState {
    /// Not tracked.
    Unseen,
    /// Being written. `last_seen_mtime` is `None` until the first poll.
    PendingWrite { last_seen_mtime: Option<SystemTime> },
}

/// Tracks files that are still being written and reports them once their
/// modification time stops changing between two polls.
#[derive(Debug, Default)]
pub struct PendingWrites {
    pending: HashMap<PathBuf, WriteState>,
}

impl PendingWrites {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking a path; returns `false` if it was already pending.
    pub fn track(&mut self, path: PathBuf) -> bool {
        if self.pending.contains_key(&path) {
            return false;
        }
        self.pending.insert(
            path,
            WriteState::PendingWrite {
                last_seen_mtime: None,
            },
        );
        true
    }

    /// Stop tracking a path (e.g. if deleted or moved)
    pub fn forget(&mut self, path: &Path) {
        self.pending.remove(path);
    }

    /// Stop tracking every path under `root`.
    pub fn forget_under(&mut self, root: &Path) {
        self.pending.retain(|path, _| !path.starts_with(root));
    }

    pub fn state(&self, path: &Path) -> WriteState {
        self.pending.get(path).copied().unwrap_or(WriteState::Unseen)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Stat every pending file; see [`PendingWrites::poll_with`].
    pub fn poll(&mut self) -> Vec<PathBuf> {
        self.poll_with(|path| std::fs::metadata(path).and_then(|m| m.modified()).ok())
    }

    /// Advance every pending path using `mtime` to read modification times.
    ///
    /// A path whose file is gone is dropped. A path whose mtime equals the
    /// one seen at the previous poll is stable: it is dropped and returned.
    /// Any other path remembers its new mtime. Returned paths are sorted.
    pub fn poll_with(&mut self, mtime: impl Fn(&Path) -> Option<SystemTime>) -> Vec<PathBuf> {
        let mut stable = Vec::new();

        self.pending.retain(|path, state| {
            let Some(current) = mtime(path) else {
                tracing::debug!(path = %path.display(), "Pending file vanished");
                return false;
            };

            match state {
                WriteState::PendingWrite {
                    last_seen_mtime: Some(previous),
                } if *previous == current => {
                    stable.push(path.clone());
                    false
                }
                _ => {
                    *state = WriteState::PendingWrite {
                        last_seen_mtime: Some(current),
                    };
                    true
                }
            }
        });

        stable.sort();
        stable
    }
}

/// Paths seen leaving through the source half of a rename.
///
/// Most renames inside a watched volume pair up with their destination
/// within the same batch of events. A path left unpaired for a whole poll
/// interval, and no longer on disk, has moved out of every watched
/// directory.
#[derive(Debug, Default)]
pub struct UnpairedMoves {
    // Whether the path has been through a poll already.
    moves: HashMap<PathBuf, bool>,
}

impl UnpairedMoves {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn note(&mut self, path: PathBuf) {
        self.moves.insert(path, false);
    }

    /// The destination of `path` showed up; returns whether it was noted.
    pub fn pair(&mut self, path: &Path) -> bool {
        self.moves.remove(path).is_some()
    }

    pub fn forget_under(&mut self, root: &Path) {
        self.moves.retain(|path, _| !path.starts_with(root));
    }

    pub fn len(&self) -> usize {
        self.moves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    /// See [`UnpairedMoves::poll_with`].
    pub fn poll(&mut self) -> Vec<PathBuf> {
        self.poll_with(|path| path.exists())
    }

    /// Return, sorted, the paths noted before the previous poll that are
    /// still unpaired and absent according to `exists`. Such paths, and
    /// those that turned out to exist, are dropped.
    pub fn poll_with(&mut self, exists: impl Fn(&Path) -> bool) -> Vec<PathBuf> {
        let mut gone = Vec::new();

        self.moves.retain(|path, polled| {
            if !*polled {
                *polled = true;
                return true;
            }
            if !exists(path) {
                gone.push(path.clone());
            }
            false
        });

        gone.sort();
        gone
    }
}
