//! External tool detection.

use std::path::{Path, PathBuf};
use std::process::Command;

/// Information about an external tool.
#[derive(Debug, Clone)]
pub struct ToolInfo {
    pub name: String,
    pub available: bool,
    /// First line of the tool's version output.
    pub version: Option<String>,
    pub path: Option<PathBuf>,
}

/// Check if a tool is available and get its version.
///
/// ```no_run
/// use starfin::probe::check_tool;
///
/// let info = check_tool("mediainfo", None);
/// if info.available {
///     println!("mediainfo version: {:?}", info.version);
/// }
/// ```
pub fn check_tool(name: &str, configured: Option<&Path>) -> ToolInfo {
    let executable = configured
        .map(Path::to_path_buf)
        .or_else(|| which::which(name).ok());

    let Some(executable) = executable else {
        return unavailable(name);
    };

    match Command::new(&executable).arg("--Version").output() {
        Ok(output) if output.status.success() => {
            let version = String::from_utf8_lossy(&output.stdout)
                .lines()
                .map(str::trim)
                .find(|line| !line.is_empty())
                .map(|line| line.to_string());

            ToolInfo {
                name: name.to_string(),
                available: true,
                version,
                path: Some(executable),
            }
        }
        _ => unavailable(name),
    }
}

fn unavailable(name: &str) -> ToolInfo {
    ToolInfo {
        name: name.to_string(),
        available: false,
        version: None,
        path: None,
    }
}

/// Check every tool starfin shells out to.
pub fn check_tools(mediainfo_path: Option<&Path>) -> Vec<ToolInfo> {
    vec![check_tool("mediainfo", mediainfo_path)]
}
