//! Translation of raw `notify` events into catalog file events.

use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileEvent {
    Created(PathBuf),
    Written(PathBuf),
    Renamed { from: PathBuf, to: PathBuf },
    /// Source half of a rename; a matching `Renamed` may still follow.
    MovedAway(PathBuf),
    Removed(PathBuf),
}

/// What an OS event means for the catalog.
///
/// A source half of a rename is reported as `MovedAway`: the paired `Both`
/// event, when one follows, keeps the film's identity, and a file moved out
/// of every watched directory never gets one. A lone destination half (a
/// file moved in from elsewhere) counts as a creation. Backends that cannot tell the halves
/// apart report `Any`, resolved by checking whether the path still exists.
pub fn classify(event: &Event) -> Vec<FileEvent> {
    let each = |make: fn(PathBuf) -> FileEvent| -> Vec<FileEvent> {
        event.paths.iter().cloned().map(make).collect()
    };

    match &event.kind {
        EventKind::Create(_) => each(FileEvent::Created),
        EventKind::Modify(ModifyKind::Name(mode)) => match mode {
            RenameMode::Both => match event.paths.as_slice() {
                [from, to] => vec![FileEvent::Renamed {
                    from: from.clone(),
                    to: to.clone(),
                }],
                _ => Vec::new(),
            },
            RenameMode::To => each(FileEvent::Created),
            RenameMode::From => each(FileEvent::MovedAway),
            RenameMode::Any | RenameMode::Other => event
                .paths
                .iter()
                .map(|path| {
                    if path.exists() {
                        FileEvent::Created(path.clone())
                    } else {
                        FileEvent::Removed(path.clone())
                    }
                })
                .collect(),
        },
        EventKind::Modify(_) => each(FileEvent::Written),
        EventKind::Remove(_) => each(FileEvent::Removed),
        EventKind::Access(_) | EventKind::Any | EventKind::Other => Vec::new(),
    }
}
