//! Path utilities for classifying files by extension.
//!
//! Every component of the catalog ignores files that are neither videos nor
//! subtitles, so these two predicates act as the single gate for what the
//! scanner, the synchronizer and the watcher ever look at.

use std::path::Path;

/// Video file extensions (see https://en.wikipedia.org/wiki/Video_file_format).
const VIDEO_EXTENSIONS: &[&str] = &[
    "mkv", "mp4", "m4p", "m4v", "mpg", "mp2", "mpeg", "mpe", "mpv", "m2v", "avi", "webm", "flv",
    "f4v", "f4p", "f4a", "f4b", "vob", "ogv", "ogg", "mts", "m2ts", "ts", "mov", "wmv", "yuv",
    "asf",
];

/// Subtitle file extensions.
const SUBTITLE_EXTENSIONS: &[&str] = &[
    "srt", "ssa", "ass", "sub", "idx", "smi", "sami", "smil", "usf", "psb", "ssd", "vtt",
];

/// What a file is, as far as the catalog is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Video,
    Subtitle,
}

fn lowercase_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
}

/// Check if a path has a video file extension.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use starfin_common::paths::is_video_file;
///
/// assert!(is_video_file(Path::new("movie.mkv")));
/// assert!(is_video_file(Path::new("/path/to/video.M2TS")));
/// assert!(!is_video_file(Path::new("subtitle.srt")));
/// ```
pub fn is_video_file(path: &Path) -> bool {
    lowercase_extension(path)
        .map(|ext| VIDEO_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

/// Check if a path has a subtitle file extension.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use starfin_common::paths::is_subtitle_file;
///
/// assert!(is_subtitle_file(Path::new("movie.en.srt")));
/// assert!(!is_subtitle_file(Path::new("video.mkv")));
/// ```
pub fn is_subtitle_file(path: &Path) -> bool {
    lowercase_extension(path)
        .map(|ext| SUBTITLE_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

/// Classify a path, returning `None` for anything the catalog ignores.
pub fn file_kind(path: &Path) -> Option<FileKind> {
    if is_video_file(path) {
        Some(FileKind::Video)
    } else if is_subtitle_file(path) {
        Some(FileKind::Subtitle)
    } else {
        None
    }
}

/// Get the list of video file extensions.
#[must_use]
pub fn video_extensions() -> &'static [&'static str] {
    VIDEO_EXTENSIONS
}

/// Get the list of subtitle file extensions.
#[must_use]
pub fn subtitle_extensions() -> &'static [&'static str] {
    SUBTITLE_EXTENSIONS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_video_file() {
        for name in [
            "a.mkv", "a.mp4", "a.m4v", "a.mpg", "a.mpeg", "a.avi", "a.webm", "a.flv", "a.vob",
            "a.ogv", "a.mts", "a.m2ts", "a.ts", "a.mov", "a.wmv", "a.yuv", "a.asf",
        ] {
            assert!(is_video_file(Path::new(name)), "{name} should be a video");
        }

        // Case insensitive
        assert!(is_video_file(Path::new("movie.MKV")));
        assert!(is_video_file(Path::new("movie.Mp4")));

        assert!(!is_video_file(Path::new("subtitle.srt")));
        assert!(!is_video_file(Path::new("poster.jpg")));
        assert!(!is_video_file(Path::new("no_extension")));
    }

    #[test]
    fn test_is_subtitle_file() {
        for name in [
            "a.srt", "a.ssa", "a.ass", "a.sub", "a.idx", "a.smi", "a.sami", "a.smil", "a.usf",
            "a.psb", "a.ssd", "a.vtt",
        ] {
            assert!(is_subtitle_file(Path::new(name)), "{name} should be a subtitle");
        }

        assert!(is_subtitle_file(Path::new("Movie.EN.SRT")));
        assert!(!is_subtitle_file(Path::new("movie.mkv")));
        assert!(!is_subtitle_file(Path::new("notes.txt")));
    }

    #[test]
    fn test_file_kind() {
        assert_eq!(file_kind(Path::new("/m/a.mkv")), Some(FileKind::Video));
        assert_eq!(file_kind(Path::new("/m/a.en.srt")), Some(FileKind::Subtitle));
        assert_eq!(file_kind(Path::new("/m/a.nfo")), None);
        assert_eq!(file_kind(Path::new("")), None);
    }

    #[test]
    fn test_extension_lists() {
        assert_eq!(video_extensions().len(), 27);
        assert_eq!(subtitle_extensions().len(), 12);
        assert!(video_extensions()
            .iter()
            .all(|v| !subtitle_extensions().contains(v)));
    }
}
