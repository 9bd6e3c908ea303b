//! Camera capture, rule-based static hand gesture classification and a live
//! multipart JPEG stream of the annotated video.

pub mod config;
pub mod debounce;
pub mod error;
pub mod events;
pub mod gesture;
pub mod model_download;
pub mod pipeline;
pub mod types;

pub use config::AppConfig;
pub use debounce::Debouncer;
pub use error::{CameraError, ConfigError, PipelineError};
pub use events::{
    ConfirmedEvent, EventLog, EventRecorder, EventSink, EventStatistics, EventTally,
};
pub use gesture::GestureClassifier;
pub use types::{Frame, Gesture, LandmarkPoint, LandmarkSet, ProcessedFrame};
