use std::path::Path;

use anyhow::{Context, Result, anyhow};
use ort::session::{Session, builder::GraphOptimizationLevel};
use ort::value::Tensor;

use super::{
    LandmarkProvider,
    letterbox::{self, INPUT_SIZE},
};
use crate::types::{Frame, LandmarkSet};

/// MediaPipe hand-pose estimator run on the whole letterboxed frame. It sees
/// one hand per pass.
pub struct HandposeProvider {
    session: Session,
    min_confidence: f32,
}

impl HandposeProvider {
    pub fn load(model_path: &Path, min_confidence: f32) -> Result<Self> {
        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(2)?
            .commit_from_file(model_path)
            .with_context(|| format!("failed to load ORT session from {}", model_path.display()))?;

        log::info!("handpose ORT backend ready using {}", model_path.display());
        Ok(Self {
            session,
            min_confidence,
        })
    }
}

impl LandmarkProvider for HandposeProvider {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<LandmarkSet>> {
        let (input, letterbox) = letterbox::prepare_frame(frame, INPUT_SIZE)?;
        let tensor = Tensor::from_array(input)?;
        let outputs = self
            .session
            .run(ort::inputs![tensor])
            .context("failed to run ORT session")?;

        if outputs.len() < 1 {
            return Err(anyhow!("model returned no outputs"));
        }

        let confidence = if outputs.len() > 1 {
            outputs[1]
                .try_extract_array::<f32>()
                .ok()
                .and_then(|arr| arr.iter().next().copied())
                .unwrap_or(0.0)
        } else {
            0.0
        };
        if confidence.clamp(0.0, 1.0) < self.min_confidence {
            return Ok(Vec::new());
        }

        let coords = outputs[0].try_extract_array::<f32>()?;
        let flattened: Vec<f32> = coords.iter().copied().collect();
        let raw = letterbox::decode_landmarks(&flattened)?;

        Ok(letterbox::normalize_landmarks(&raw, &letterbox)
            .into_iter()
            .collect())
    }
}
