//! X11 window control through `xdotool` and `xprop`
//!
//! Under XWayland only X11 clients are visible, so a native Wayland target
//! window cannot be found this way.

use std::process::Command;

use anyhow::{anyhow, bail, Context, Result};
use tracing::debug;
use wakeclick_vision::Rect;

use super::{WindowId, WindowInfo, WindowRect, WindowSystem};

pub struct XdotoolWindows;

impl XdotoolWindows {
    pub fn new() -> Self {
        Self
    }
}

impl Default for XdotoolWindows {
    fn default() -> Self {
        Self::new()
    }
}

fn run(program: &str, args: &[&str]) -> Result<String> {
    let output = Command::new(program)
        .args(args)
        .output()
        .with_context(|| format!("Failed to run {}", program))?;

    if !output.status.success() {
        bail!(
            "{} {} failed: {}",
            program,
            args.join(" "),
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Window ids from `xprop -root _NET_CLIENT_LIST`, in stacking-manager order.
fn parse_client_list(output: &str) -> Vec<WindowId> {
    let Some((_, ids)) = output.split_once('#') else {
        return Vec::new();
    };
    ids.split(',')
        .filter_map(|id| {
            let id = id.trim();
            let hex = id.strip_prefix("0x").unwrap_or(id);
            u64::from_str_radix(hex, 16).ok()
        })
        .collect()
}

/// Rectangle from `xdotool getwindowgeometry --shell`.
fn parse_geometry(output: &str) -> Result<WindowRect> {
    let mut x = None;
    let mut y = None;
    let mut width = None;
    let mut height = None;
    for line in output.lines() {
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        match key.trim() {
            "X" => x = value.trim().parse::<i32>().ok(),
            "Y" => y = value.trim().parse::<i32>().ok(),
            "WIDTH" => width = value.trim().parse::<u32>().ok(),
            "HEIGHT" => height = value.trim().parse::<u32>().ok(),
            _ => {}
        }
    }
    match (x, y, width, height) {
        (Some(x), Some(y), Some(w), Some(h)) => Ok(Rect::new(x, y, w, h)),
        _ => Err(anyhow!("Unexpected geometry output: {}", output.trim())),
    }
}

/// Mode of the output flagged `primary` in `xrandr --query`, e.g.
/// `eDP-1 connected primary 1920x1080+0+0 (normal left ...) 344mm x 193mm`.
fn parse_xrandr_primary(output: &str) -> Option<(u32, u32)> {
    let line = output.lines().find(|l| l.contains(" connected primary "))?;
    let geometry = line.split_whitespace().skip_while(|t| *t != "primary").nth(1)?;
    let mode = geometry.split('+').next()?;
    let (w, h) = mode.split_once('x')?;
    Some((w.parse().ok()?, h.parse().ok()?))
}

/// `"1920 1080"` from `xdotool getdisplaygeometry`. This spans every monitor.
fn parse_display_size(output: &str) -> Option<(u32, u32)> {
    let mut parts = output.split_whitespace();
    let w = parts.next()?.parse().ok()?;
    let h = parts.next()?.parse().ok()?;
    Some((w, h))
}

impl WindowSystem for XdotoolWindows {
    fn list_windows(&self) -> Result<Vec<WindowInfo>> {
        let ids = parse_client_list(&run("xprop", &["-root", "_NET_CLIENT_LIST"])?);
        let mut windows = Vec::with_capacity(ids.len());
        for id in ids {
            // Windows can close between listing and naming
            match run("xdotool", &["getwindowname", &id.to_string()]) {
                Ok(name) => windows.push(WindowInfo {
                    id,
                    title: name.trim_end_matches('\n').to_string(),
                }),
                Err(e) => debug!("Skipping window {:#x}: {:#}", id, e),
            }
        }
        Ok(windows)
    }

    fn is_minimized(&self, id: WindowId) -> Result<bool> {
        let state = run("xprop", &["-id", &id.to_string(), "_NET_WM_STATE"])?;
        Ok(state.contains("_NET_WM_STATE_HIDDEN"))
    }

    fn restore(&self, id: WindowId) -> Result<()> {
        run("xdotool", &["windowmap", "--sync", &id.to_string()])?;
        Ok(())
    }

    fn force_foreground(&self, id: WindowId) -> Result<()> {
        run("xdotool", &["windowactivate", "--sync", &id.to_string()])?;
        Ok(())
    }

    fn window_rect(&self, id: WindowId) -> Result<WindowRect> {
        parse_geometry(&run(
            "xdotool",
            &["getwindowgeometry", "--shell", &id.to_string()],
        )?)
    }

    fn primary_display_size(&self) -> Option<(u32, u32)> {
        run("xrandr", &["--query"])
            .ok()
            .and_then(|out| parse_xrandr_primary(&out))
            .or_else(|| {
                debug!("No primary output from xrandr, using the whole screen size");
                run("xdotool", &["getdisplaygeometry"])
                    .ok()
                    .and_then(|out| parse_display_size(&out))
            })
    }
}
