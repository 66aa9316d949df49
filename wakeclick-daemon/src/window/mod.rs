//! Target window lookup and activation
//!
//! [`locate`] is a pure function over a [`WindowSystem`]: it re-resolves the
//! window on every call and keeps no handle between triggers.

use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info};
use wakeclick_vision::Rect;

#[cfg(windows)]
pub mod win32;
pub mod x11;

#[cfg(windows)]
pub use self::win32::Win32Windows;
pub use self::x11::XdotoolWindows;

/// Screen rectangle of the activated window.
pub type WindowRect = Rect;

/// Platform window identifier (X11 window id or `HWND` value).
pub type WindowId = u64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowInfo {
    pub id: WindowId,
    pub title: String,
}

/// Window enumeration and focus control for one platform.
pub trait WindowSystem {
    /// Visible top-level windows in the platform's enumeration order.
    fn list_windows(&self) -> anyhow::Result<Vec<WindowInfo>>;

    fn is_minimized(&self, id: WindowId) -> anyhow::Result<bool>;

    fn restore(&self, id: WindowId) -> anyhow::Result<()>;

    /// Bring the window to the foreground even if the platform's
    /// focus-stealing prevention would normally refuse.
    fn force_foreground(&self, id: WindowId) -> anyhow::Result<()>;

    fn window_rect(&self, id: WindowId) -> anyhow::Result<WindowRect>;

    /// Size of the primary display, when known.
    fn primary_display_size(&self) -> Option<(u32, u32)>;
}

impl<T: WindowSystem + ?Sized> WindowSystem for Box<T> {
    fn list_windows(&self) -> anyhow::Result<Vec<WindowInfo>> {
        (**self).list_windows()
    }

    fn is_minimized(&self, id: WindowId) -> anyhow::Result<bool> {
        (**self).is_minimized(id)
    }

    fn restore(&self, id: WindowId) -> anyhow::Result<()> {
        (**self).restore(id)
    }

    fn force_foreground(&self, id: WindowId) -> anyhow::Result<()> {
        (**self).force_foreground(id)
    }

    fn window_rect(&self, id: WindowId) -> anyhow::Result<WindowRect> {
        (**self).window_rect(id)
    }

    fn primary_display_size(&self) -> Option<(u32, u32)> {
        (**self).primary_display_size()
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum LocateError {
    #[error("No window title contains \"{0}\"")]
    NotFound(String),

    #[error("Window activation failed: {0}")]
    Platform(String),
}

/// Delay between activation and reading the window's rectangle.
pub const DEFAULT_SETTLE: Duration = Duration::from_millis(200);

/// Find the first window whose title contains `title`, restore and focus it,
/// and return its screen rectangle.
///
/// Matching is a case-sensitive substring test.
pub fn locate<W: WindowSystem + ?Sized>(
    system: &W,
    title: &str,
    settle: Duration,
) -> Result<WindowRect, LocateError> {
    let platform = |e: anyhow::Error| LocateError::Platform(format!("{:#}", e));

    let windows = system.list_windows().map_err(platform)?;
    let target = windows
        .into_iter()
        .find(|w| w.title.contains(title))
        .ok_or_else(|| LocateError::NotFound(title.to_string()))?;
    debug!("Target window {:#x} \"{}\"", target.id, target.title);

    if system.is_minimized(target.id).map_err(platform)? {
        info!("Restoring minimized window \"{}\"", target.title);
        system.restore(target.id).map_err(platform)?;
    }

    system.force_foreground(target.id).map_err(platform)?;

    if !settle.is_zero() {
        std::thread::sleep(settle);
    }

    system.window_rect(target.id).map_err(platform)
}
