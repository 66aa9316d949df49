//! Screenshots of the search region when no template matched

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use tracing::info;
use wakeclick_vision::{capture_to_file, Rect, ScreenGrabber};

use crate::bindings::Action;

/// `<action>_<YYYYmmdd_HHMMSS_mmm>.png`
pub fn capture_file_name(action: Action, at: DateTime<Local>) -> String {
    format!("{}_{}.png", action.label(), at.format("%Y%m%d_%H%M%S_%3f"))
}

pub struct DiagnosticCapture {
    dir: PathBuf,
    grabber: Arc<dyn ScreenGrabber>,
}

impl DiagnosticCapture {
    pub fn new(dir: impl Into<PathBuf>, grabber: Arc<dyn ScreenGrabber>) -> Self {
        Self {
            dir: dir.into(),
            grabber,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Save `region` as a PNG named after `action` and the current time.
    pub fn capture(&self, region: &Rect, action: Action) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir).with_context(|| {
            format!("Failed to create diagnostics directory {}", self.dir.display())
        })?;
        let path = self.dir.join(capture_file_name(action, Local::now()));
        capture_to_file(self.grabber.as_ref(), region, &path)
            .with_context(|| format!("Failed to save diagnostic capture {}", path.display()))?;
        info!("Saved diagnostic capture to {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_file_name_format() {
        let at = Local
            .with_ymd_and_hms(2024, 3, 9, 14, 5, 7)
            .unwrap()
            + chrono::Duration::milliseconds(42);
        assert_eq!(
            capture_file_name(Action::EndCall, at),
            "end_call_20240309_140507_042.png"
        );
    }
}
