//! Display server detection and backend tool selection
//!
//! On Linux the window controller and the screen grabber are external tools
//! whose suitability depends on the session:
//! - xdotool/xprop: X11 only (also sees XWayland clients on a Wayland session)
//! - grim: Wayland (wlroots compositors)
//! - maim, scrot: X11

use anyhow::{anyhow, Result};
use tracing::{debug, info, warn};
use wakeclick_vision::CaptureTool;

/// Environment variable access, injectable for tests.
pub trait EnvProvider {
    fn get(&self, key: &str) -> Option<String>;
}

/// Default environment provider using std::env::var
pub struct SystemEnv;

impl EnvProvider for SystemEnv {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayServer {
    X11,
    Wayland,
    Unknown,
}

/// Window control backend for the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowBackend {
    /// xdotool + xprop against an X server
    Xdotool,
}

#[derive(Debug, Clone)]
pub struct DisplayServerInfo {
    pub server_type: DisplayServer,
    /// Desktop environment (e.g., "GNOME", "KDE", "sway")
    pub desktop_environment: Option<String>,
    /// An X server is reachable (`DISPLAY` set), natively or through XWayland
    pub has_x_display: bool,
    pub confidence: ConfidenceLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfidenceLevel {
    /// ≥4 evidence points
    High,
    /// 2-3 evidence points
    Medium,
    /// <2 evidence points
    Low,
}

pub fn detect_display_server() -> DisplayServerInfo {
    detect_display_server_with_env(&SystemEnv)
}

/// Evidence-based detection:
/// - `XDG_SESSION_TYPE` (4 points)
/// - `WAYLAND_DISPLAY` (2 points, Wayland)
/// - `DISPLAY` (1 point, X11 or XWayland)
pub fn detect_display_server_with_env(env: &dyn EnvProvider) -> DisplayServerInfo {
    let session_type = env.get("XDG_SESSION_TYPE");
    let desktop = env.get("XDG_CURRENT_DESKTOP");
    let wayland_display = env.get("WAYLAND_DISPLAY");
    let x11_display = env.get("DISPLAY");

    debug!(
        "XDG_SESSION_TYPE={:?} XDG_CURRENT_DESKTOP={:?} WAYLAND_DISPLAY={:?} DISPLAY={:?}",
        session_type, desktop, wayland_display, x11_display
    );

    let mut x11_score = 0;
    let mut wayland_score = 0;

    match session_type.as_deref() {
        Some("x11") => x11_score += 4,
        Some("wayland") => wayland_score += 4,
        _ => {}
    }
    if wayland_display.is_some() {
        wayland_score += 2;
    }
    if x11_display.is_some() {
        x11_score += 1;
    }

    let level = |score: i32| {
        if score >= 4 {
            ConfidenceLevel::High
        } else if score >= 2 {
            ConfidenceLevel::Medium
        } else {
            ConfidenceLevel::Low
        }
    };

    let (server_type, confidence) = if wayland_score > x11_score {
        (DisplayServer::Wayland, level(wayland_score))
    } else if x11_score > wayland_score {
        (DisplayServer::X11, level(x11_score))
    } else {
        (DisplayServer::Unknown, ConfidenceLevel::Low)
    };

    let info = DisplayServerInfo {
        server_type,
        desktop_environment: desktop,
        has_x_display: x11_display.is_some(),
        confidence,
    };

    info!(
        "Detected display server: {:?} (confidence: {:?})",
        info.server_type, info.confidence
    );
    info
}

/// Capture tools installed on this system, in no particular preference.
pub fn detect_available_capture_tools() -> Vec<CaptureTool> {
    let tools: Vec<CaptureTool> = [CaptureTool::Grim, CaptureTool::Maim, CaptureTool::Scrot]
        .into_iter()
        .filter(CaptureTool::is_installed)
        .collect();
    debug!("Available capture tools: {:?}", tools);
    tools
}

/// Pick the screenshot tool for the session.
///
/// - Wayland: grim
/// - X11: maim, fallback scrot
/// - Unknown: whatever is installed, X11 tools first
pub fn select_capture_tool(
    info: &DisplayServerInfo,
    available: &[CaptureTool],
) -> Result<CaptureTool> {
    let preference: &[CaptureTool] = match info.server_type {
        DisplayServer::Wayland => &[CaptureTool::Grim],
        DisplayServer::X11 => &[CaptureTool::Maim, CaptureTool::Scrot],
        DisplayServer::Unknown => &[CaptureTool::Maim, CaptureTool::Scrot, CaptureTool::Grim],
    };

    if let Some(tool) = preference.iter().find(|t| available.contains(t)) {
        if info.server_type == DisplayServer::Unknown {
            warn!("Unknown display server, trying {}", tool.command());
        } else {
            debug!("Selected {} for {:?}", tool.command(), info.server_type);
        }
        return Ok(*tool);
    }

    Err(anyhow!(format_capture_error(info, preference)))
}

/// Pick the window controller for the session.
///
/// xdotool needs an X server; on Wayland this only works for XWayland clients.
pub fn select_window_backend(info: &DisplayServerInfo) -> Result<WindowBackend> {
    match info.server_type {
        DisplayServer::X11 => Ok(WindowBackend::Xdotool),
        DisplayServer::Wayland if info.has_x_display => {
            warn!("Wayland session: only XWayland windows can be located and focused");
            Ok(WindowBackend::Xdotool)
        }
        DisplayServer::Unknown if info.has_x_display => Ok(WindowBackend::Xdotool),
        _ => Err(anyhow!(format_window_error(info))),
    }
}

fn format_capture_error(info: &DisplayServerInfo, wanted: &[CaptureTool]) -> String {
    let names: Vec<&str> = wanted.iter().map(|t| t.command()).collect();
    format!(
        r#"Error: No screen capture tool found for {:?}

Install one of: {}
  Ubuntu/Debian: sudo apt install {}
  Fedora:        sudo dnf install {}
  Arch:          sudo pacman -S {}

Detected environment:
  Display Server: {:?}
  Desktop:        {}"#,
        info.server_type,
        names.join(", "),
        names[0],
        names[0],
        names[0],
        info.server_type,
        info.desktop_environment.as_deref().unwrap_or("unknown"),
    )
}

fn format_window_error(info: &DisplayServerInfo) -> String {
    format!(
        r#"Error: No X display available for window control

Window lookup and focus use xdotool, which needs an X server. On Wayland,
enable XWayland and run the target application under it, or use an X11
session.

Detected environment:
  Display Server: {:?}
  Desktop:        {}"#,
        info.server_type,
        info.desktop_environment.as_deref().unwrap_or("unknown"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(server_type: DisplayServer, has_x_display: bool) -> DisplayServerInfo {
        DisplayServerInfo {
            server_type,
            desktop_environment: None,
            has_x_display,
            confidence: ConfidenceLevel::High,
        }
    }

    #[test]
    fn test_capture_tool_preference() {
        let all = [CaptureTool::Grim, CaptureTool::Maim, CaptureTool::Scrot];
        assert_eq!(
            select_capture_tool(&info(DisplayServer::Wayland, true), &all).unwrap(),
            CaptureTool::Grim
        );
        assert_eq!(
            select_capture_tool(&info(DisplayServer::X11, true), &all).unwrap(),
            CaptureTool::Maim
        );
        assert_eq!(
            select_capture_tool(&info(DisplayServer::X11, true), &[CaptureTool::Scrot]).unwrap(),
            CaptureTool::Scrot
        );
    }

    #[test]
    fn test_capture_tool_missing() {
        let err = select_capture_tool(&info(DisplayServer::Wayland, false), &[CaptureTool::Maim])
            .unwrap_err();
        assert!(err.to_string().contains("grim"));
    }

    #[test]
    fn test_window_backend_needs_x_display() {
        assert!(select_window_backend(&info(DisplayServer::X11, true)).is_ok());
        assert!(select_window_backend(&info(DisplayServer::Wayland, true)).is_ok());
        assert!(select_window_backend(&info(DisplayServer::Wayland, false)).is_err());
        assert!(select_window_backend(&info(DisplayServer::Unknown, false)).is_err());
    }

    #[test]
    fn test_display_server_detection() {
        // Only ensures detection doesn't panic on the host
        let info = detect_display_server();
        println!("Detected: {:?}", info);
    }
}
