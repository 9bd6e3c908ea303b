//! TOML configuration for the capture, classification and streaming stages.
//!
//! Every field has a default, so an empty file is a valid configuration.

use std::{ops::Range, path::Path, path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub camera: CameraConfig,
    pub pipeline: PipelineConfig,
    pub classifier: ClassifierConfig,
    pub stream: StreamConfig,
    pub debounce: DebounceConfig,
    pub model: ModelConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// First candidate device index.
    pub index_start: u32,
    /// Exclusive upper bound of the candidate range.
    pub index_end: u32,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    /// Upper bound on a single device call.
    pub read_timeout_ms: u64,
    pub warmup: WarmupConfig,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            index_start: 0,
            index_end: 6,
            width: 640,
            height: 480,
            fps: 30,
            read_timeout_ms: 1_000,
            warmup: WarmupConfig::default(),
        }
    }
}

impl CameraConfig {
    pub fn index_range(&self) -> Range<u32> {
        self.index_start..self.index_end
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WarmupConfig {
    /// Pause after opening before the first trial read.
    pub settle_ms: u64,
    pub attempts: u32,
    pub min_successes: u32,
    pub interval_ms: u64,
}

impl Default for WarmupConfig {
    fn default() -> Self {
        Self {
            settle_ms: 300,
            attempts: 5,
            min_successes: 3,
            interval_ms: 100,
        }
    }
}

impl WarmupConfig {
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// How often the landmark provider runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionCadence {
    #[default]
    EveryFrame,
    /// Detect on every other frame and reuse the previous result in between.
    Alternate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub output_width: u32,
    pub output_height: u32,
    pub mirror: bool,
    pub max_hands: usize,
    pub cadence: DetectionCadence,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            output_width: 640,
            output_height: 480,
            mirror: true,
            max_hands: 2,
            cadence: DetectionCadence::EveryFrame,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Thumb-tip to index-tip distance, in normalized units, counted as contact.
    pub pinch_tolerance: f32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            pinch_tolerance: 0.05,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    pub boundary: String,
    pub jpeg_quality: u8,
    pub max_frames: Option<u64>,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            boundary: "frame".to_string(),
            jpeg_quality: 65,
            max_frames: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebounceConfig {
    pub threshold: u32,
    /// Confidence recorded alongside each confirmed event.
    pub event_confidence: f32,
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self {
            threshold: 2,
            event_confidence: 0.9,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub handpose_path: PathBuf,
    pub handpose_url: String,
    pub min_confidence: f32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            handpose_path: crate::model_download::default_handpose_model_path(),
            handpose_url: crate::model_download::DEFAULT_HANDPOSE_MODEL_URL.to_string(),
            min_confidence: 0.2,
        }
    }
}

impl AppConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let camera = &self.camera;
        if camera.index_start >= camera.index_end {
            return Err(ConfigError::Invalid(format!(
                "camera index range {}..{} is empty",
                camera.index_start, camera.index_end
            )));
        }
        if camera.width == 0 || camera.height == 0 || camera.fps == 0 {
            return Err(ConfigError::Invalid(
                "camera width, height and fps must be greater than 0".to_string(),
            ));
        }
        let warmup = &camera.warmup;
        if warmup.min_successes > warmup.attempts
            || u64::from(warmup.min_successes) * 2 <= u64::from(warmup.attempts)
        {
            return Err(ConfigError::Invalid(format!(
                "warm-up needs a majority: attempts / 2 < min_successes ({}) <= attempts ({})",
                warmup.min_successes, warmup.attempts
            )));
        }
        if self.pipeline.output_width == 0 || self.pipeline.output_height == 0 {
            return Err(ConfigError::Invalid(
                "pipeline output size must be greater than 0".to_string(),
            ));
        }
        if !(1..=100).contains(&self.stream.jpeg_quality) {
            return Err(ConfigError::Invalid(format!(
                "jpeg quality {} outside 1..=100",
                self.stream.jpeg_quality
            )));
        }
        if self.stream.boundary.is_empty() {
            return Err(ConfigError::Invalid(
                "stream boundary must not be empty".to_string(),
            ));
        }
        if self.debounce.threshold == 0 {
            return Err(ConfigError::Invalid(
                "debounce threshold must be at least 1".to_string(),
            ));
        }
        let tolerance = self.classifier.pinch_tolerance;
        if !tolerance.is_finite() || tolerance <= 0.0 {
            return Err(ConfigError::Invalid(
                "pinch tolerance must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
