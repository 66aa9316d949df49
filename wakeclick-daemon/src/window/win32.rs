//! Win32 window control

use std::ffi::c_void;
use std::mem;

use anyhow::{anyhow, bail, Context, Result};
use tracing::debug;
use wakeclick_vision::Rect;
use windows::Win32::Foundation::{BOOL, HWND, LPARAM, RECT, TRUE};
use windows::Win32::UI::Input::KeyboardAndMouse::{
    SendInput, INPUT, INPUT_0, INPUT_KEYBOARD, KEYBDINPUT, KEYBD_EVENT_FLAGS, KEYEVENTF_KEYUP,
    VK_MENU,
};
use windows::Win32::UI::WindowsAndMessaging::{
    EnumWindows, GetSystemMetrics, GetWindowRect, GetWindowTextW, IsIconic, IsWindowVisible,
    SetForegroundWindow, ShowWindow, SM_CXSCREEN, SM_CYSCREEN, SW_RESTORE,
};

use super::{WindowId, WindowInfo, WindowRect, WindowSystem};

pub struct Win32Windows;

impl Win32Windows {
    pub fn new() -> Self {
        Self
    }
}

impl Default for Win32Windows {
    fn default() -> Self {
        Self::new()
    }
}

fn hwnd(id: WindowId) -> HWND {
    HWND(id as usize as *mut c_void)
}

unsafe extern "system" fn collect_window(window: HWND, lparam: LPARAM) -> BOOL {
    let list = &mut *(lparam.0 as *mut Vec<WindowInfo>);
    if IsWindowVisible(window).as_bool() {
        let mut buf = [0u16; 512];
        let len = GetWindowTextW(window, &mut buf);
        if len > 0 {
            list.push(WindowInfo {
                id: window.0 as usize as u64,
                title: String::from_utf16_lossy(&buf[..len as usize]),
            });
        }
    }
    TRUE
}

fn key_event(flags: KEYBD_EVENT_FLAGS) -> INPUT {
    INPUT {
        r#type: INPUT_KEYBOARD,
        Anonymous: INPUT_0 {
            ki: KEYBDINPUT {
                wVk: VK_MENU,
                wScan: 0,
                dwFlags: flags,
                time: 0,
                dwExtraInfo: 0,
            },
        },
    }
}

impl WindowSystem for Win32Windows {
    fn list_windows(&self) -> Result<Vec<WindowInfo>> {
        let mut list: Vec<WindowInfo> = Vec::new();
        unsafe {
            EnumWindows(
                Some(collect_window),
                LPARAM(&mut list as *mut Vec<WindowInfo> as isize),
            )
            .context("EnumWindows failed")?;
        }
        Ok(list)
    }

    fn is_minimized(&self, id: WindowId) -> Result<bool> {
        Ok(unsafe { IsIconic(hwnd(id)).as_bool() })
    }

    fn restore(&self, id: WindowId) -> Result<()> {
        // Return value is the previous visibility, not success
        let _ = unsafe { ShowWindow(hwnd(id), SW_RESTORE) };
        Ok(())
    }

    /// Foreground-lock prevention lets a process take focus after it sent
    /// input, so tap Alt first.
    fn force_foreground(&self, id: WindowId) -> Result<()> {
        let inputs = [
            key_event(KEYBD_EVENT_FLAGS(0)),
            key_event(KEYEVENTF_KEYUP),
        ];
        unsafe {
            let sent = SendInput(&inputs, mem::size_of::<INPUT>() as i32);
            if sent as usize != inputs.len() {
                debug!("SendInput delivered {} of {} events", sent, inputs.len());
            }
            if !SetForegroundWindow(hwnd(id)).as_bool() {
                bail!("SetForegroundWindow refused window {:#x}", id);
            }
        }
        Ok(())
    }

    fn window_rect(&self, id: WindowId) -> Result<WindowRect> {
        let mut rect = RECT::default();
        unsafe { GetWindowRect(hwnd(id), &mut rect) }.context("GetWindowRect failed")?;
        let width = u32::try_from(rect.right - rect.left)
            .map_err(|_| anyhow!("Window {:#x} has negative width", id))?;
        let height = u32::try_from(rect.bottom - rect.top)
            .map_err(|_| anyhow!("Window {:#x} has negative height", id))?;
        Ok(Rect::new(rect.left, rect.top, width, height))
    }

    fn primary_display_size(&self) -> Option<(u32, u32)> {
        let (w, h) = unsafe { (GetSystemMetrics(SM_CXSCREEN), GetSystemMetrics(SM_CYSCREEN)) };
        if w > 0 && h > 0 {
            Some((w as u32, h as u32))
        } else {
            None
        }
    }
}
