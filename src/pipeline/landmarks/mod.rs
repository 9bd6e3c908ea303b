mod letterbox;
mod ort;

pub use self::ort::HandposeProvider;

use crate::types::{Frame, LandmarkSet};

/// Maps one RGB frame to zero or more hands. Confidence gating is the
/// provider's own business; every returned set is treated as a detection.
pub trait LandmarkProvider: Send {
    fn detect(&mut self, frame: &Frame) -> anyhow::Result<Vec<LandmarkSet>>;
}
