use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CameraError {
    /// No candidate index both opened and passed warm-up.
    #[error(
        "no usable camera found in indices {start}..{end}; check the device is connected, \
         not held by another application, and that camera permissions are granted"
    )]
    NoDeviceAvailable { start: u32, end: u32 },

    /// A running device stopped delivering frames and reports itself closed.
    #[error("camera at index {index} stopped delivering frames")]
    DeviceLost { index: u32 },
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("image payload is empty")]
    EmptyPayload,

    #[error("failed to decode image payload: {0}")]
    DecodeFailure(#[from] image::ImageError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
