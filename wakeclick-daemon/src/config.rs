//! Configuration management

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

use crate::display_server::EnvProvider;

/// Set to `1`, `true`, `yes` or `on` to save a screenshot when nothing matched.
pub const ENV_DEBUG_CAPTURE: &str = "WAKECLICK_DEBUG_CAPTURE";
pub const ENV_ARM_DELAY: &str = "WAKECLICK_ARM_DELAY";
pub const ENV_COOLDOWN: &str = "WAKECLICK_COOLDOWN";
pub const ENV_HANGUP_DELAY: &str = "WAKECLICK_HANGUP_DELAY";

/// Upper bound for every configured delay, in seconds.
pub const MAX_DELAY_SECS: f32 = 3600.0;

/// Agent configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Path to configuration file
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Substring of the target window's title (case-sensitive)
    pub window_title: String,

    /// Template resources root (None = search next to the executable)
    pub resources_dir: Option<PathBuf>,

    /// Keyword model files in keyword-index order.
    /// Empty = `<resources>/keywords/<scene>.rpw` for each bound scene.
    pub keyword_paths: Vec<PathBuf>,

    /// Wake-word detection threshold (0.0 to 1.0)
    pub wake_threshold: f32,

    /// Averaged-score prefilter threshold (0.0 to 1.0, 0.0 = disabled)
    pub wake_avg_threshold: f32,

    /// Audio device index (None = default device)
    pub audio_device_index: Option<usize>,

    /// Ignore detections this long after startup (seconds)
    pub arm_delay_secs: f32,

    /// Minimum spacing between accepted triggers (seconds)
    pub cooldown_secs: f32,

    /// Wait before hanging up (seconds)
    pub hangup_delay_secs: f32,

    /// Template match threshold (0.0 to 1.0)
    pub confidence: f32,

    /// Match on luma instead of RGB
    pub grayscale: bool,

    /// Key chord sent after hanging up, e.g. "alt+space" (None = disabled)
    pub hide_hotkey: Option<String>,

    /// Save a screenshot of the search region when nothing matched
    pub debug_capture: bool,

    /// Where diagnostic screenshots go (None = data directory)
    pub diagnostics_dir: Option<PathBuf>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            config_path: PathBuf::new(),
            window_title: "豆包".to_string(),
            resources_dir: None,
            keyword_paths: Vec::new(),
            wake_threshold: 0.5,
            wake_avg_threshold: 0.0,
            audio_device_index: None,
            arm_delay_secs: 2.0,
            cooldown_secs: 1.5,
            hangup_delay_secs: 5.0,
            confidence: 0.8,
            grayscale: true,
            hide_hotkey: None,
            debug_capture: false,
            diagnostics_dir: None,
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn secs(value: f32) -> Duration {
    Duration::try_from_secs_f32(value.clamp(0.0, MAX_DELAY_SECS))
        .unwrap_or(Duration::ZERO)
}

impl AgentConfig {
    /// Load configuration from `path` (or the default location), writing the
    /// defaults out when the file does not exist yet.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => wakeclick_paths::get_config_file()
                .context("Failed to determine config file location")?,
        };

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read config file {}", config_path.display()))?;

            let mut config: AgentConfig = toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config file {}", config_path.display()))?;

            config.config_path = config_path;
            config.validate()?;
            Ok(config)
        } else {
            let config = Self {
                config_path,
                ..Self::default()
            };
            config.save().context("Failed to save default config")?;
            Ok(config)
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(&self.config_path, contents).context("Failed to write config file")?;

        Ok(())
    }

    /// Apply `WAKECLICK_*` environment overrides. Unparseable numbers are
    /// logged and ignored.
    pub fn apply_env(&mut self, env: &dyn EnvProvider) {
        if let Some(value) = env.get(ENV_DEBUG_CAPTURE) {
            self.debug_capture = parse_flag(&value);
        }

        for (key, field) in [
            (ENV_ARM_DELAY, &mut self.arm_delay_secs),
            (ENV_COOLDOWN, &mut self.cooldown_secs),
            (ENV_HANGUP_DELAY, &mut self.hangup_delay_secs),
        ] {
            if let Some(value) = env.get(key) {
                match value.trim().parse::<f32>() {
                    Ok(v) if (0.0..=MAX_DELAY_SECS).contains(&v) => *field = v,
                    _ => warn!(
                        "Ignoring {}={:?}: expected seconds between 0 and {}",
                        key, value, MAX_DELAY_SECS
                    ),
                }
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.window_title.is_empty() {
            anyhow::bail!("window_title must not be empty");
        }
        if !(0.0..=1.0).contains(&self.confidence) {
            anyhow::bail!("confidence must be between 0.0 and 1.0");
        }
        for (name, value) in [
            ("wake_threshold", self.wake_threshold),
            ("wake_avg_threshold", self.wake_avg_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                anyhow::bail!("{} must be between 0.0 and 1.0", name);
            }
        }
        for (name, value) in [
            ("arm_delay_secs", self.arm_delay_secs),
            ("cooldown_secs", self.cooldown_secs),
            ("hangup_delay_secs", self.hangup_delay_secs),
        ] {
            if !(0.0..=MAX_DELAY_SECS).contains(&value) {
                anyhow::bail!(
                    "{} must be between 0 and {} seconds",
                    name,
                    MAX_DELAY_SECS
                );
            }
        }
        Ok(())
    }

    pub fn arm_delay(&self) -> Duration {
        secs(self.arm_delay_secs)
    }

    pub fn cooldown(&self) -> Duration {
        secs(self.cooldown_secs)
    }

    pub fn hangup_delay(&self) -> Duration {
        secs(self.hangup_delay_secs)
    }

    /// Keyword models, defaulting to `<resources>/keywords/<scene>.rpw`.
    pub fn keyword_models<'a, I>(&self, resources: &Path, scenes: I) -> Vec<PathBuf>
    where
        I: IntoIterator<Item = &'a str>,
    {
        if !self.keyword_paths.is_empty() {
            return self.keyword_paths.clone();
        }
        scenes
            .into_iter()
            .map(|scene| resources.join("keywords").join(format!("{}.rpw", scene)))
            .collect()
    }
}
