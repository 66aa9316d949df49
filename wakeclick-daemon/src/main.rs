//! wakeclick - say a wake phrase, get a button clicked
//!
//! Listens on the microphone for the configured keywords. Each accepted
//! keyword focuses the target window, looks for the matching button image
//! inside it and clicks it.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use wakeclick_audio::{AudioConfig, MicrophoneSource};
use wakeclick_daemon::bindings::BindingTable;
use wakeclick_daemon::catalog::SceneCatalog;
use wakeclick_daemon::click::{EnigoPointer, KeyChord};
use wakeclick_daemon::config::AgentConfig;
use wakeclick_daemon::diagnostics::DiagnosticCapture;
use wakeclick_daemon::display_server::SystemEnv;
use wakeclick_daemon::orchestrator::{DispatchSettings, Orchestrator};
use wakeclick_daemon::trigger_gate::TriggerGate;
use wakeclick_daemon::window::WindowSystem;
use wakeclick_vision::{ScreenGrabber, ScreenMatcher};
use wakeclick_wake::{KeywordDetector, RustpotterDetector, WakeConfig};

#[derive(Parser, Debug)]
#[command(name = "wakeclick", version, about = "Voice-triggered window button clicker")]
struct Cli {
    /// Configuration file (default: platform config directory)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Window controller and screen grabber for this platform.
#[cfg(windows)]
fn platform_backends() -> Result<(Box<dyn WindowSystem>, Arc<dyn ScreenGrabber>)> {
    use wakeclick_daemon::window::Win32Windows;
    use wakeclick_vision::GdiGrabber;

    Ok((Box::new(Win32Windows::new()), Arc::new(GdiGrabber::new())))
}

/// Window controller and screen grabber for this platform.
#[cfg(not(windows))]
fn platform_backends() -> Result<(Box<dyn WindowSystem>, Arc<dyn ScreenGrabber>)> {
    use wakeclick_daemon::display_server::{
        detect_available_capture_tools, detect_display_server, select_capture_tool,
        select_window_backend, WindowBackend,
    };
    use wakeclick_daemon::window::XdotoolWindows;
    use wakeclick_vision::ToolGrabber;

    let server = detect_display_server();
    let windows: Box<dyn WindowSystem> = match select_window_backend(&server)? {
        WindowBackend::Xdotool => Box::new(XdotoolWindows::new()),
    };
    let tool = select_capture_tool(&server, &detect_available_capture_tools())?;
    info!("Screen capture via {}", tool.command());
    Ok((windows, Arc::new(ToolGrabber::new(tool))))
}

/// Build every component and run the listen loop on the current thread.
fn run_agent(config: AgentConfig, shutdown: Arc<AtomicBool>) -> Result<()> {
    let bindings = BindingTable::default();

    let resources = wakeclick_paths::get_resources_dir(config.resources_dir.as_deref())
        .context("Failed to locate template resources")?;
    let catalog = SceneCatalog::open(&resources)?;
    info!("Template resources: {}", resources.display());

    let models = config.keyword_models(&resources, bindings.iter().map(|b| b.scene.as_str()));
    if models.len() != bindings.len() {
        anyhow::bail!(
            "{} keyword model(s) configured but {} keyword(s) are bound",
            models.len(),
            bindings.len()
        );
    }
    let detector = RustpotterDetector::new(
        WakeConfig::with_keywords(models)
            .threshold(config.wake_threshold)
            .avg_threshold(config.wake_avg_threshold),
    )
    .context("Failed to initialize keyword detector")?;

    let mut source = MicrophoneSource::new(AudioConfig {
        frame_length: detector.frame_length(),
        device_index: config.audio_device_index,
        ..AudioConfig::default()
    })
    .context("Failed to initialize audio capture")?;

    let (windows, grabber) = platform_backends()?;
    let pointer = EnigoPointer::new()?;

    let hide_hotkey = config
        .hide_hotkey
        .as_deref()
        .map(str::parse::<KeyChord>)
        .transpose()
        .context("Invalid hide_hotkey")?;

    let settings = DispatchSettings {
        confidence: config.confidence,
        grayscale: config.grayscale,
        hangup_delay: config.hangup_delay(),
        hide_hotkey,
        ..DispatchSettings::new(config.window_title.clone())
    };

    let gate = TriggerGate::new(bindings, Instant::now())
        .with_arm_delay(config.arm_delay())
        .with_cooldown(config.cooldown());

    let mut orchestrator = Orchestrator::new(
        detector,
        gate,
        catalog,
        windows,
        ScreenMatcher::new(Arc::clone(&grabber)),
        pointer,
        settings,
    );

    if config.debug_capture {
        let dir = match &config.diagnostics_dir {
            Some(dir) => dir.clone(),
            None => wakeclick_paths::get_diagnostics_dir()?,
        };
        info!("Diagnostic captures enabled: {}", dir.display());
        orchestrator = orchestrator.with_diagnostics(DiagnosticCapture::new(dir, grabber));
    }

    info!(
        "Ready. Target window \"{}\", arming for {:.1}s",
        config.window_title, config.arm_delay_secs
    );
    orchestrator.run(&mut source, &shutdown)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_level(true)
        .init();

    let cli = Cli::parse();

    info!("Starting wakeclick v{}", env!("CARGO_PKG_VERSION"));

    let mut config = AgentConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    config.apply_env(&SystemEnv);
    config.validate()?;
    info!("Configuration loaded from {}", config.config_path.display());

    let shutdown = Arc::new(AtomicBool::new(false));
    let worker_shutdown = Arc::clone(&shutdown);
    let mut worker = tokio::task::spawn_blocking(move || run_agent(config, worker_shutdown));

    tokio::select! {
        joined = &mut worker => {
            return joined.context("Agent thread panicked")?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
            shutdown.store(true, Ordering::Relaxed);
        }
    }

    match worker.await.context("Agent thread panicked")? {
        Ok(()) => info!("wakeclick stopped"),
        Err(e) => {
            error!("Agent stopped with error: {:#}", e);
            return Err(e);
        }
    }
    Ok(())
}
