//! Technical media probing through the `mediainfo` executable.
//!
//! The probe is a blocking call; async callers run it on the blocking pool.

mod tools;

pub use tools::{check_tool, check_tools, ToolInfo};

use serde::Deserialize;
use serde_json::Value;
use starfin_common::{Error, Result};
use starfin_db::{AudioInfo, MediaInfo, SubsInfo, VideoInfo};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Something able to describe a media file.
pub trait MediaProbe: Send + Sync {
    fn probe(&self, path: &Path) -> Result<MediaInfo>;
}

/// Runs `mediainfo --Output=JSON` on the file.
#[derive(Debug, Clone)]
pub struct MediaInfoProbe {
    executable: PathBuf,
}

impl MediaInfoProbe {
    /// Use `executable`, or look `mediainfo` up on `PATH` when `None`.
    pub fn new(executable: Option<PathBuf>) -> Self {
        let executable = executable
            .or_else(|| which::which("mediainfo").ok())
            .unwrap_or_else(|| PathBuf::from("mediainfo"));
        Self { executable }
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }
}

impl MediaProbe for MediaInfoProbe {
    fn probe(&self, path: &Path) -> Result<MediaInfo> {
        let output = Command::new(&self.executable)
            .arg("--Output=JSON")
            .arg(path)
            .output()
            .map_err(|e| {
                Error::unavailable(format!(
                    "cannot run {}: {}",
                    self.executable.display(),
                    e
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::unavailable(format!(
                "mediainfo failed on {}: {}",
                path.display(),
                stderr.trim()
            )));
        }

        parse_mediainfo_json(&output.stdout)
    }
}

#[derive(Debug, Deserialize)]
struct MediaInfoOutput {
    media: Option<MediaInfoMedia>,
}

#[derive(Debug, Deserialize)]
struct MediaInfoMedia {
    #[serde(default)]
    track: Vec<HashMap<String, Value>>,
}

fn field(track: &HashMap<String, Value>, key: &str) -> String {
    match track.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

/// Turn mediainfo's JSON report into a [`MediaInfo`].
pub fn parse_mediainfo_json(json: &[u8]) -> Result<MediaInfo> {
    let output: MediaInfoOutput = serde_json::from_slice(json)
        .map_err(|e| Error::invalid_input(format!("unreadable mediainfo output: {}", e)))?;

    let mut info = MediaInfo::default();
    let Some(media) = output.media else {
        return Ok(info);
    };

    for track in &media.track {
        match field(track, "@type").as_str() {
            "General" => {
                info.format = field(track, "Format");
                info.duration = field(track, "Duration")
                    .parse::<f64>()
                    .map(format_duration)
                    .unwrap_or_default();
                info.file_size = field(track, "FileSize")
                    .parse::<u64>()
                    .map(format_file_size)
                    .unwrap_or_default();
            }
            "Video" => {
                let width = field(track, "Width");
                if info.resolution.is_empty() {
                    // Width rather than height: films often carry black bars.
                    info.resolution = width
                        .parse::<u32>()
                        .map(|w| resolution_hint(w).to_string())
                        .unwrap_or_default();
                }
                info.video.push(VideoInfo {
                    codec_id: field(track, "CodecID"),
                    profile: field(track, "Format_Profile"),
                    resolution: format!("{}x{}", width, field(track, "Height")),
                    frame_rate: field(track, "FrameRate"),
                    bit_depth: field(track, "BitDepth"),
                });
            }
            "Audio" => info.audio.push(AudioInfo {
                codec_id: field(track, "CodecID"),
                channels: field(track, "Channels"),
                language: field(track, "Language"),
                sampling_rate: field(track, "SamplingRate"),
            }),
            "Text" => info.subtitles.push(SubsInfo {
                codec_id: field(track, "CodecID"),
                language: field(track, "Language"),
                forced: field(track, "Forced"),
            }),
            _ => {}
        }
    }

    Ok(info)
}

/// `HH:MM:SS` from a number of seconds.
pub fn format_duration(total_seconds: f64) -> String {
    let total = total_seconds.max(0.0) as u64;
    format!(
        "{:02}:{:02}:{:02}",
        total / 3600,
        (total / 60) % 60,
        total % 60
    )
}

/// Human readable size with two decimals; empty for 1 KB and below.
pub fn format_file_size(bytes: u64) -> String {
    let bytes_f = bytes as f64;
    if bytes > 1_000_000_000 {
        format!("{:.2} GB", bytes_f / 1_000_000_000.0)
    } else if bytes > 1_000_000 {
        format!("{:.2} MB", bytes_f / 1_000_000.0)
    } else if bytes > 1_000 {
        format!("{:.2} KB", bytes_f / 1_000.0)
    } else {
        String::new()
    }
}

/// Resolution label for a video width, empty for non-standard widths.
pub fn resolution_hint(width: u32) -> &'static str {
    match width {
        720 => "480p",
        1280 => "720p",
        1920 => "1080p",
        2560 => "1440p",
        3840 => "4K",
        7680 => "8K",
        _ => "",
    }
}
