//! Audio → wake word → gate → window → templates → click
//!
//! The orchestrator owns every collaborator and runs on a single worker
//! thread. While a dispatch is in progress no frames are read, so
//! detections spoken during a dispatch are dropped.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use tracing::{debug, error, info, warn};
use wakeclick_audio::{AudioError, FrameSource};
use wakeclick_vision::{BoundingBox, Point, TemplateMatcher};
use wakeclick_wake::KeywordDetector;

use crate::bindings::{Action, KeywordBinding};
use crate::catalog::SceneCatalog;
use crate::click::{click_at, ClickTiming, KeyChord, Pointer};
use crate::diagnostics::DiagnosticCapture;
use crate::trigger_gate::{GateDecision, TriggerGate};
use crate::window::{self, LocateError, WindowRect, WindowSystem, DEFAULT_SETTLE};

/// Pause between the hang-up click and the hide chord.
pub const HIDE_DELAY: Duration = Duration::from_millis(300);

/// Wait between stopping and restarting a stalled audio source.
pub const RESTART_BACKOFF: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentState {
    Waiting,
    Dispatching,
}

/// Result of scanning a scene's templates.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome {
    Matched {
        image: PathBuf,
        bbox: BoundingBox,
        click_point: Point,
    },
    Exhausted {
        tried: usize,
    },
    NoCandidates,
}

/// How one accepted trigger ended.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchReport {
    Clicked { image: PathBuf, point: Point },
    WindowNotFound,
    ActivationFailed(String),
    NoCandidates,
    Exhausted { tried: usize, capture: Option<PathBuf> },
    ClickFailed(String),
}

/// What happened to one audio frame.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// No keyword, or the detector failed on this frame
    Idle,
    Ignored(GateDecision),
    Dispatched(DispatchReport),
}

/// Dispatch parameters that do not change while running.
#[derive(Debug, Clone)]
pub struct DispatchSettings {
    pub window_title: String,
    pub confidence: f32,
    pub grayscale: bool,
    pub hangup_delay: Duration,
    pub settle: Duration,
    pub click_timing: ClickTiming,
    pub hide_hotkey: Option<KeyChord>,
    pub hide_delay: Duration,
    pub restart_backoff: Duration,
}

impl DispatchSettings {
    pub fn new(window_title: impl Into<String>) -> Self {
        Self {
            window_title: window_title.into(),
            confidence: wakeclick_vision::DEFAULT_CONFIDENCE,
            grayscale: true,
            hangup_delay: Duration::from_secs(5),
            settle: DEFAULT_SETTLE,
            click_timing: ClickTiming::default(),
            hide_hotkey: None,
            hide_delay: HIDE_DELAY,
            restart_backoff: RESTART_BACKOFF,
        }
    }

    /// Zero every wait; the click sequence itself is unchanged.
    pub fn without_delays(mut self) -> Self {
        self.hangup_delay = Duration::ZERO;
        self.settle = Duration::ZERO;
        self.click_timing = ClickTiming::instant();
        self.hide_delay = Duration::ZERO;
        self.restart_backoff = Duration::ZERO;
        self
    }
}

/// Stops and releases the frame source however the loop exits.
struct SourceGuard<'a, S: FrameSource + ?Sized> {
    source: &'a mut S,
}

impl<S: FrameSource + ?Sized> Drop for SourceGuard<'_, S> {
    fn drop(&mut self) {
        if let Err(e) = self.source.stop() {
            warn!("Failed to stop audio source: {}", e);
        }
        self.source.release();
        debug!("Audio source released");
    }
}

/// Stop and start `source` again after a stall.
fn restart_source<S: FrameSource + ?Sized>(source: &mut S, backoff: Duration) {
    if let Err(e) = source.stop() {
        warn!("Failed to stop audio source: {}", e);
    }
    pause(backoff);
    match source.start() {
        Ok(()) => info!("Audio capture restarted"),
        Err(e) => warn!("Failed to restart audio capture: {}", e),
    }
}

fn pause(duration: Duration) {
    if !duration.is_zero() {
        std::thread::sleep(duration);
    }
}

pub struct Orchestrator<D, W, M, P> {
    detector: D,
    gate: TriggerGate,
    catalog: SceneCatalog,
    windows: W,
    matcher: M,
    pointer: P,
    diagnostics: Option<DiagnosticCapture>,
    settings: DispatchSettings,
    state: AgentState,
}

impl<D, W, M, P> Orchestrator<D, W, M, P>
where
    D: KeywordDetector,
    W: WindowSystem,
    M: TemplateMatcher,
    P: Pointer,
{
    pub fn new(
        detector: D,
        gate: TriggerGate,
        catalog: SceneCatalog,
        windows: W,
        matcher: M,
        pointer: P,
        settings: DispatchSettings,
    ) -> Self {
        Self {
            detector,
            gate,
            catalog,
            windows,
            matcher,
            pointer,
            diagnostics: None,
            settings,
            state: AgentState::Waiting,
        }
    }

    pub fn with_diagnostics(mut self, diagnostics: DiagnosticCapture) -> Self {
        self.diagnostics = Some(diagnostics);
        self
    }

    pub fn state(&self) -> AgentState {
        self.state
    }

    pub fn pointer(&self) -> &P {
        &self.pointer
    }

    pub fn windows(&self) -> &W {
        &self.windows
    }

    pub fn matcher(&self) -> &M {
        &self.matcher
    }

    /// Read frames until `shutdown` is set.
    ///
    /// The flag is checked between frames, so shutdown latency is one frame
    /// read plus any dispatch in progress. Read errors are logged and the
    /// loop keeps going; a stalled or stopped source is restarted. Only a
    /// failure to start the source in the first place is returned.
    pub fn run<S: FrameSource + ?Sized>(&mut self, source: &mut S, shutdown: &AtomicBool) -> Result<()> {
        if source.frame_length() != self.detector.frame_length() {
            bail!(
                "Audio frame length {} does not match detector frame length {}",
                source.frame_length(),
                self.detector.frame_length()
            );
        }

        let mut guard = SourceGuard { source };
        guard.source.start().context("Failed to start audio capture")?;
        let bound = self.gate.bindings().len();
        if self.detector.keyword_count() != bound {
            warn!(
                "Detector has {} keyword(s) but {} are bound",
                self.detector.keyword_count(),
                bound
            );
        }
        info!("Listening for {} keyword(s)", bound);

        let mut failures = 0u32;
        while !shutdown.load(Ordering::Relaxed) {
            match guard.source.read() {
                Ok(frame) => {
                    if failures > 0 {
                        info!("Audio capture recovered after {} failed read(s)", failures);
                        failures = 0;
                    }
                    self.step(&frame, Instant::now());
                }
                Err(e) => {
                    failures += 1;
                    error!("Audio read failed ({} in a row): {}", failures, e);
                    if matches!(e, AudioError::Stalled(_) | AudioError::NotRecording) {
                        restart_source(&mut *guard.source, self.settings.restart_backoff);
                    }
                }
            }
        }

        info!("Shutdown requested, leaving listen loop");
        Ok(())
    }

    /// Feed one frame through the detector and gate, dispatching on accept.
    pub fn step(&mut self, frame: &[f32], now: Instant) -> StepOutcome {
        let index = match self.detector.process(frame) {
            Ok(Some(index)) => index,
            Ok(None) => return StepOutcome::Idle,
            Err(e) => {
                error!("Keyword detection failed: {}", e);
                return StepOutcome::Idle;
            }
        };

        match self.gate.evaluate(index, now) {
            GateDecision::Accept(binding) => {
                info!("Keyword #{} → {} ({})", index, binding.scene, binding.action);
                StepOutcome::Dispatched(self.dispatch(&binding))
            }
            decision => {
                debug!("Keyword #{} ignored: {:?}", index, decision);
                StepOutcome::Ignored(decision)
            }
        }
    }

    /// Locate the window, find the scene's button and click it.
    pub fn dispatch(&mut self, binding: &KeywordBinding) -> DispatchReport {
        self.state = AgentState::Dispatching;
        let report = self.dispatch_inner(binding);
        self.state = AgentState::Waiting;

        match &report {
            DispatchReport::Clicked { image, point } => {
                info!("{}: clicked {} at {}", binding.action, image.display(), point)
            }
            other => warn!("{}: dispatch failed: {:?}", binding.action, other),
        }
        report
    }

    fn dispatch_inner(&mut self, binding: &KeywordBinding) -> DispatchReport {
        if binding.action == Action::EndCall && !self.settings.hangup_delay.is_zero() {
            debug!("Waiting {:?} before hanging up", self.settings.hangup_delay);
            pause(self.settings.hangup_delay);
        }

        let rect = match window::locate(&self.windows, &self.settings.window_title, self.settings.settle) {
            Ok(rect) => rect,
            Err(LocateError::NotFound(title)) => {
                warn!("No window titled \"{}\"", title);
                return DispatchReport::WindowNotFound;
            }
            Err(LocateError::Platform(reason)) => {
                warn!("Could not activate target window: {}", reason);
                return DispatchReport::ActivationFailed(reason);
            }
        };
        debug!("Target window at {}", rect);

        let resolution = self.windows.primary_display_size();
        let candidates = self.catalog.resolve(&binding.scene, resolution);

        match self.scan(&candidates, &rect) {
            MatchOutcome::Matched {
                image, click_point, ..
            } => {
                if let Err(e) = click_at(&mut self.pointer, click_point, self.settings.click_timing) {
                    return DispatchReport::ClickFailed(format!("{:#}", e));
                }
                if binding.action == Action::EndCall {
                    self.send_hide_hotkey();
                }
                DispatchReport::Clicked {
                    image,
                    point: click_point,
                }
            }
            MatchOutcome::NoCandidates => {
                warn!(
                    "No template images for scene \"{}\" under {}",
                    binding.scene,
                    self.catalog.root().display()
                );
                DispatchReport::NoCandidates
            }
            MatchOutcome::Exhausted { tried } => {
                warn!("None of {} template(s) for \"{}\" matched", tried, binding.scene);
                let capture = self.capture_failure(&rect, binding.action);
                DispatchReport::Exhausted { tried, capture }
            }
        }
    }

    /// Try candidates in order and stop at the first match.
    fn scan(&self, candidates: &[PathBuf], region: &WindowRect) -> MatchOutcome {
        if candidates.is_empty() {
            return MatchOutcome::NoCandidates;
        }

        for image in candidates {
            match self.matcher.locate(
                image,
                region,
                self.settings.confidence,
                self.settings.grayscale,
            ) {
                Ok(Some(bbox)) => {
                    return MatchOutcome::Matched {
                        image: image.clone(),
                        bbox,
                        click_point: bbox.center(),
                    }
                }
                Ok(None) => debug!("{}: no match", image.display()),
                Err(e) => warn!("{}: {}", image.display(), e),
            }
        }

        MatchOutcome::Exhausted {
            tried: candidates.len(),
        }
    }

    fn send_hide_hotkey(&mut self) {
        let Some(chord) = self.settings.hide_hotkey.clone() else {
            return;
        };
        pause(self.settings.hide_delay);
        match self.pointer.send_chord(&chord) {
            Ok(()) => debug!("Sent {}", chord),
            Err(e) => warn!("Failed to send {}: {:#}", chord, e),
        }
    }

    fn capture_failure(&self, region: &WindowRect, action: Action) -> Option<PathBuf> {
        let diagnostics = self.diagnostics.as_ref()?;
        match diagnostics.capture(region, action) {
            Ok(path) => Some(path),
            Err(e) => {
                warn!("{:#}", e);
                None
            }
        }
    }
}
