//! Test helpers for the daemon integration tests
//!
//! Provides:
//! - Environment fixtures and a mock `EnvProvider`
//! - Scripted keyword detector and frame source
//! - Fake window system, template matcher and pointer that record calls
//! - Template resource tree fixtures

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use wakeclick_audio::{AudioError, FrameSource};
use wakeclick_daemon::click::{KeyChord, Pointer};
use wakeclick_daemon::display_server::EnvProvider;
use wakeclick_daemon::window::{WindowId, WindowInfo, WindowRect, WindowSystem};
use wakeclick_vision::{BoundingBox, Point, Rect, RgbaImage, ScreenGrabber, TemplateMatcher, VisionError};
use wakeclick_wake::{KeywordDetector, WakeError};

pub const FRAME_LENGTH: usize = 480;

/// Mock environment provider backed by a map
pub struct MockEnv {
    vars: HashMap<String, String>,
}

impl MockEnv {
    pub fn new(vars: HashMap<String, String>) -> Self {
        Self { vars }
    }
}

impl EnvProvider for MockEnv {
    fn get(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }
}

fn env_of(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Test fixture for X11 environment
pub fn x11_env() -> HashMap<String, String> {
    env_of(&[("DISPLAY", ":0"), ("XDG_SESSION_TYPE", "x11")])
}

/// Test fixture for pure Wayland environment (no XWayland)
pub fn wayland_env() -> HashMap<String, String> {
    env_of(&[
        ("WAYLAND_DISPLAY", "wayland-0"),
        ("XDG_SESSION_TYPE", "wayland"),
        ("XDG_CURRENT_DESKTOP", "sway"),
    ])
}

/// Test fixture for XWayland environment (X11 apps on Wayland)
pub fn xwayland_env() -> HashMap<String, String> {
    env_of(&[
        ("DISPLAY", ":0"),
        ("WAYLAND_DISPLAY", "wayland-0"),
        ("XDG_SESSION_TYPE", "wayland"),
        ("XDG_CURRENT_DESKTOP", "GNOME"),
    ])
}

/// Test fixture for headless/unknown environment
pub fn headless_env() -> HashMap<String, String> {
    HashMap::new()
}

/// Test fixture for ambiguous environment (old systems)
pub fn ambiguous_env() -> HashMap<String, String> {
    env_of(&[("DISPLAY", ":0")])
}

/// Detector that replays a fixed script, one entry per frame.
pub struct ScriptedDetector {
    script: VecDeque<Result<Option<usize>, ()>>,
    keyword_count: usize,
}

impl ScriptedDetector {
    pub fn new(script: Vec<Option<usize>>) -> Self {
        Self {
            script: script.into_iter().map(Ok).collect(),
            keyword_count: 2,
        }
    }

    /// Fails on the next frame, then continues with the script.
    pub fn failing_first(mut self) -> Self {
        self.script.push_front(Err(()));
        self
    }

    pub fn silent() -> Self {
        Self::new(Vec::new())
    }
}

impl KeywordDetector for ScriptedDetector {
    fn frame_length(&self) -> usize {
        FRAME_LENGTH
    }

    fn keyword_count(&self) -> usize {
        self.keyword_count
    }

    fn process(&mut self, frame: &[f32]) -> Result<Option<usize>, WakeError> {
        if frame.len() != FRAME_LENGTH {
            return Err(WakeError::FrameLength {
                expected: FRAME_LENGTH,
                actual: frame.len(),
            });
        }
        match self.script.pop_front() {
            Some(Ok(hit)) => Ok(hit),
            Some(Err(())) => Err(WakeError::initialization("scripted failure")),
            None => Ok(None),
        }
    }
}

/// Frame source yielding silent frames, stalling on selected reads.
pub struct ScriptedSource {
    /// Reads attempted so far, failed ones included
    pub reads: usize,
    /// Raise `shutdown` once this many reads were attempted
    pub limit: usize,
    /// 1-based read numbers that fail with `AudioError::Stalled`
    pub stall_on: Vec<usize>,
    pub starts: usize,
    pub stops: usize,
    pub released: usize,
    shutdown: Arc<AtomicBool>,
}

impl ScriptedSource {
    pub fn new(limit: usize, shutdown: Arc<AtomicBool>) -> Self {
        Self {
            reads: 0,
            limit,
            stall_on: Vec::new(),
            starts: 0,
            stops: 0,
            released: 0,
            shutdown,
        }
    }

    pub fn stalling_on(mut self, reads: &[usize]) -> Self {
        self.stall_on = reads.to_vec();
        self
    }
}

impl FrameSource for ScriptedSource {
    fn frame_length(&self) -> usize {
        FRAME_LENGTH
    }

    fn start(&mut self) -> Result<(), AudioError> {
        self.starts += 1;
        Ok(())
    }

    fn read(&mut self) -> Result<Vec<f32>, AudioError> {
        self.reads += 1;
        if self.reads >= self.limit {
            self.shutdown.store(true, Ordering::Relaxed);
        }
        if self.stall_on.contains(&self.reads) {
            return Err(AudioError::Stalled(5.0));
        }
        Ok(vec![0.0; FRAME_LENGTH])
    }

    fn stop(&mut self) -> Result<(), AudioError> {
        self.stops += 1;
        Ok(())
    }

    fn release(&mut self) {
        self.released += 1;
    }
}

/// Window system with a fixed window list that records activations.
pub struct FakeWindows {
    pub windows: Vec<(WindowInfo, WindowRect)>,
    pub display: Option<(u32, u32)>,
    pub activations: RefCell<Vec<(WindowId, Instant)>>,
}

impl FakeWindows {
    pub fn with_window(title: &str, rect: WindowRect) -> Self {
        Self {
            windows: vec![(
                WindowInfo {
                    id: 0x4400001,
                    title: title.to_string(),
                },
                rect,
            )],
            display: Some((1920, 1080)),
            activations: RefCell::new(Vec::new()),
        }
    }

    pub fn empty() -> Self {
        Self {
            windows: Vec::new(),
            display: Some((1920, 1080)),
            activations: RefCell::new(Vec::new()),
        }
    }

    pub fn activation_count(&self) -> usize {
        self.activations.borrow().len()
    }

    /// When the most recent activation happened.
    pub fn last_activation(&self) -> Option<Instant> {
        self.activations.borrow().last().map(|(_, at)| *at)
    }
}

impl WindowSystem for FakeWindows {
    fn list_windows(&self) -> anyhow::Result<Vec<WindowInfo>> {
        Ok(self.windows.iter().map(|(info, _)| info.clone()).collect())
    }

    fn is_minimized(&self, _id: WindowId) -> anyhow::Result<bool> {
        Ok(false)
    }

    fn restore(&self, _id: WindowId) -> anyhow::Result<()> {
        Ok(())
    }

    fn force_foreground(&self, id: WindowId) -> anyhow::Result<()> {
        self.activations.borrow_mut().push((id, Instant::now()));
        Ok(())
    }

    fn window_rect(&self, id: WindowId) -> anyhow::Result<WindowRect> {
        self.windows
            .iter()
            .find(|(info, _)| info.id == id)
            .map(|(_, rect)| *rect)
            .ok_or_else(|| anyhow::anyhow!("window {:#x} gone", id))
    }

    fn primary_display_size(&self) -> Option<(u32, u32)> {
        self.display
    }
}

/// Matcher answering from a table keyed by file name.
#[derive(Default)]
pub struct FakeMatcher {
    pub hits: HashMap<String, BoundingBox>,
    pub broken: Vec<String>,
    pub calls: RefCell<Vec<(PathBuf, Rect)>>,
}

impl FakeMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hit(mut self, file_name: &str, bbox: BoundingBox) -> Self {
        self.hits.insert(file_name.to_string(), bbox);
        self
    }

    /// Make `file_name` fail as an unreadable template.
    pub fn broken(mut self, file_name: &str) -> Self {
        self.broken.push(file_name.to_string());
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }

    pub fn tried(&self) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .map(|(p, _)| file_name(p))
            .collect()
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

impl TemplateMatcher for FakeMatcher {
    fn locate(
        &self,
        template: &Path,
        region: &Rect,
        _confidence: f32,
        _grayscale: bool,
    ) -> Result<Option<BoundingBox>, VisionError> {
        self.calls
            .borrow_mut()
            .push((template.to_path_buf(), *region));
        let name = file_name(template);
        if self.broken.contains(&name) {
            return Err(VisionError::FlatTemplate(template.to_path_buf()));
        }
        Ok(self.hits.get(&name).copied())
    }
}

/// One pointer or keyboard event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PointerEvent {
    Move(Point),
    Press,
    Release,
    Chord(String),
}

/// Pointer that records every event.
pub struct RecordingPointer {
    pub at: Point,
    pub events: Vec<PointerEvent>,
    pub fail_press: bool,
}

impl RecordingPointer {
    pub fn new() -> Self {
        Self {
            at: Point::new(500, 500),
            events: Vec::new(),
            fail_press: false,
        }
    }

    /// Points where a press happened.
    pub fn clicks(&self) -> Vec<Point> {
        let mut at = None;
        let mut clicks = Vec::new();
        for event in &self.events {
            match event {
                PointerEvent::Move(p) => at = Some(*p),
                PointerEvent::Press => clicks.extend(at),
                _ => {}
            }
        }
        clicks
    }

    pub fn chords(&self) -> Vec<String> {
        self.events
            .iter()
            .filter_map(|e| match e {
                PointerEvent::Chord(c) => Some(c.clone()),
                _ => None,
            })
            .collect()
    }
}

impl Pointer for RecordingPointer {
    fn position(&mut self) -> anyhow::Result<Point> {
        Ok(self.at)
    }

    fn move_to(&mut self, target: Point) -> anyhow::Result<()> {
        self.at = target;
        self.events.push(PointerEvent::Move(target));
        Ok(())
    }

    fn press(&mut self) -> anyhow::Result<()> {
        if self.fail_press {
            anyhow::bail!("input synthesis unavailable");
        }
        self.events.push(PointerEvent::Press);
        Ok(())
    }

    fn release(&mut self) -> anyhow::Result<()> {
        self.events.push(PointerEvent::Release);
        Ok(())
    }

    fn send_chord(&mut self, chord: &KeyChord) -> anyhow::Result<()> {
        self.events.push(PointerEvent::Chord(chord.to_string()));
        Ok(())
    }
}

/// Grabber returning a solid image of the requested size.
pub struct SolidGrabber;

impl ScreenGrabber for SolidGrabber {
    fn grab(&self, region: &Rect) -> Result<RgbaImage, VisionError> {
        Ok(RgbaImage::new(region.width, region.height))
    }
}

/// Create empty files at each relative path under `root`.
pub fn touch_all(root: &Path, files: &[&str]) {
    for rel in files {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, b"").unwrap();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_x11_fixture() {
        let env = x11_env();
        assert_eq!(env.get("DISPLAY"), Some(&":0".to_string()));
        assert!(env.get("WAYLAND_DISPLAY").is_none());
    }

    #[test]
    fn test_recording_pointer_clicks() {
        let mut pointer = RecordingPointer::new();
        pointer.move_to(Point::new(1, 2)).unwrap();
        pointer.press().unwrap();
        pointer.release().unwrap();
        assert_eq!(pointer.clicks(), vec![Point::new(1, 2)]);
    }
}
