//! Cross-platform path utilities for wakeclick.
//!
//! Single source of truth for where configuration, diagnostics and template
//! resources live.
//!
//! # Platform Behavior
//!
//! | Platform | Config Directory | Data Directory |
//! |----------|------------------|----------------|
//! | Linux    | `~/.config/wakeclick` | `~/.local/share/wakeclick` |
//! | macOS    | `~/Library/Application Support/wakeclick` | same |
//! | Windows  | `%APPDATA%/wakeclick` | same |
//!
//! Template resources are resolved relative to the running executable, never
//! the current working directory, so a packaged install and a
//! `cargo run` from anywhere both find them.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use thiserror::Error;

/// Errors specific to path operations.
#[derive(Error, Debug)]
pub enum PathError {
    #[error("Could not determine data directory")]
    NoDataDirectory,

    #[error("Could not determine the running executable's location")]
    NoExecutablePath,

    #[error(
        "Resources directory not found (searched from {searched}). \
         Create a `{name}/` directory next to the executable or set \
         `resources_dir` in the configuration file"
    )]
    ResourcesNotFound { searched: PathBuf, name: &'static str },
}

/// Application identifier used in path construction.
const APP_NAME: &str = "wakeclick";

/// Directory name holding `<scene>/[<w>x<h>/]*.png` template images.
pub const RESOURCES_DIR_NAME: &str = "resources";

/// How many parent directories to climb looking for resources in dev builds
/// (`target/debug/deps` is three levels under the workspace root).
const RESOURCE_SEARCH_DEPTH: usize = 4;

fn ensure_dir(dir: &Path, what: &str) -> Result<()> {
    if !dir.exists() {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {} directory: {}", what, dir.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = fs::Permissions::from_mode(0o700);
            fs::set_permissions(dir, perms).ok();
        }
    }
    Ok(())
}

/// Get the application data directory, creating it if needed.
pub fn get_data_dir() -> Result<PathBuf> {
    let base_dir = dirs::data_dir().ok_or(PathError::NoDataDirectory)?;
    let data_dir = base_dir.join(APP_NAME);
    ensure_dir(&data_dir, "data")?;
    Ok(data_dir)
}

/// Get the configuration directory.
///
/// # Platform Behavior
/// - **Linux**: `~/.config/wakeclick`
/// - **macOS / Windows**: config lives with data
pub fn get_config_dir() -> Result<PathBuf> {
    #[cfg(target_os = "linux")]
    {
        let config_base = dirs::config_dir().ok_or(PathError::NoDataDirectory)?;
        let config_dir = config_base.join(APP_NAME);
        ensure_dir(&config_dir, "config")?;
        Ok(config_dir)
    }

    #[cfg(not(target_os = "linux"))]
    {
        get_data_dir()
    }
}

/// Default location of the TOML configuration file.
pub fn get_config_file() -> Result<PathBuf> {
    Ok(get_config_dir()?.join("config.toml"))
}

/// Directory where failed-match screenshots are written.
pub fn get_diagnostics_dir() -> Result<PathBuf> {
    let dir = get_data_dir()?.join("diagnostics");
    ensure_dir(&dir, "diagnostics")?;
    Ok(dir)
}

/// Directory containing the running executable.
pub fn executable_dir() -> Result<PathBuf> {
    let exe = std::env::current_exe().map_err(|_| PathError::NoExecutablePath)?;
    exe.parent()
        .map(Path::to_path_buf)
        .ok_or_else(|| PathError::NoExecutablePath.into())
}

/// Look for a `resources/` directory starting at `start`.
///
/// Checks `start/resources` first (packaged layout), then each ancestor up to
/// a fixed depth (development layout, where the binary sits under
/// `target/<profile>/`).
pub fn find_resources_dir(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .take(RESOURCE_SEARCH_DEPTH + 1)
        .map(|dir| dir.join(RESOURCES_DIR_NAME))
        .find(|candidate| candidate.is_dir())
}

/// Resolve the template resources root for this process.
///
/// An explicit override wins when given; it must exist. A relative override
/// is taken relative to the executable's directory. Otherwise the directory
/// is searched upward from the executable.
pub fn get_resources_dir(explicit: Option<&Path>) -> Result<PathBuf> {
    resources_dir_from(explicit, &executable_dir()?)
}

/// [`get_resources_dir`] with the executable directory supplied.
pub fn resources_dir_from(explicit: Option<&Path>, exe_dir: &Path) -> Result<PathBuf> {
    if let Some(dir) = explicit {
        let dir = exe_dir.join(dir);
        if dir.is_dir() {
            return Ok(dir);
        }
        return Err(PathError::ResourcesNotFound {
            searched: dir,
            name: RESOURCES_DIR_NAME,
        }
        .into());
    }

    find_resources_dir(exe_dir).ok_or_else(|| {
        PathError::ResourcesNotFound {
            searched: exe_dir.to_path_buf(),
            name: RESOURCES_DIR_NAME,
        }
        .into()
    })
}
