//! Keyword detector backed by rustpotter

use rustpotter::{Rustpotter, RustpotterConfig, SampleFormat};
use tracing::{debug, info};

use crate::error::{Result, WakeError};
use crate::{KeywordDetector, WakeConfig};

/// Multi-keyword detector. Each model is registered under its index so a
/// detection's name maps straight back to the configured order.
pub struct RustpotterDetector {
    engine: Rustpotter,
    keyword_count: usize,
    frame_length: usize,
}

impl RustpotterDetector {
    /// Load every keyword model. Any missing or unreadable model is an error;
    /// callers treat this as fatal at startup.
    pub fn new(config: WakeConfig) -> Result<Self> {
        config.validate()?;
        config.check_models_exist()?;

        let mut engine_config = RustpotterConfig::default();
        engine_config.fmt.sample_rate = config.sample_rate as usize;
        engine_config.fmt.channels = 1;
        engine_config.fmt.sample_format = SampleFormat::F32;
        engine_config.detector.threshold = config.threshold;
        engine_config.detector.avg_threshold = config.avg_threshold;

        let mut engine = Rustpotter::new(&engine_config)
            .map_err(|e| WakeError::initialization(format!("Failed to create engine: {}", e)))?;

        for (index, path) in config.keyword_paths.iter().enumerate() {
            let path_str = path.to_string_lossy();
            engine
                .add_wakeword_from_file(&index.to_string(), &path_str)
                .map_err(|e| {
                    WakeError::initialization(format!("Failed to load {}: {}", path.display(), e))
                })?;
            info!("Keyword #{} loaded from {}", index, path.display());
        }

        let frame_length = engine.get_samples_per_frame();

        Ok(Self {
            engine,
            keyword_count: config.keyword_paths.len(),
            frame_length,
        })
    }
}

/// Map a detection name back to its keyword index.
fn keyword_index(name: &str, keyword_count: usize) -> Result<usize> {
    name.parse::<usize>()
        .ok()
        .filter(|index| *index < keyword_count)
        .ok_or_else(|| WakeError::UnknownKeyword(name.to_string()))
}

impl KeywordDetector for RustpotterDetector {
    fn frame_length(&self) -> usize {
        self.frame_length
    }

    fn keyword_count(&self) -> usize {
        self.keyword_count
    }

    fn process(&mut self, frame: &[f32]) -> Result<Option<usize>> {
        if frame.len() != self.frame_length {
            return Err(WakeError::FrameLength {
                expected: self.frame_length,
                actual: frame.len(),
            });
        }

        match self.engine.process_samples(frame.to_vec()) {
            Some(detection) => {
                debug!(
                    "Detection '{}' score={:.3} avg={:.3}",
                    detection.name, detection.score, detection.avg_score
                );
                keyword_index(&detection.name, self.keyword_count).map(Some)
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_index_mapping() {
        assert_eq!(keyword_index("0", 2).unwrap(), 0);
        assert_eq!(keyword_index("1", 2).unwrap(), 1);
        assert!(matches!(keyword_index("2", 2), Err(WakeError::UnknownKeyword(_))));
        assert!(matches!(keyword_index("hey", 2), Err(WakeError::UnknownKeyword(_))));
    }

    #[test]
    fn test_missing_model_is_fatal() {
        let config = WakeConfig::with_keywords(["/nonexistent/call.rpw"]);
        assert!(matches!(
            RustpotterDetector::new(config),
            Err(WakeError::MissingModel(_))
        ));
    }
}
