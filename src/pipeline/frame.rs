//! One pass of acquire, transform, detect, classify, annotate.

use std::sync::Arc;

use super::{camera::CameraSessionManager, landmarks::LandmarkProvider, overlay, transform};
use crate::{
    config::{AppConfig, DetectionCadence, PipelineConfig},
    error::PipelineError,
    gesture::GestureClassifier,
    types::{Frame, Gesture, LandmarkSet, ProcessedFrame},
};

pub struct FramePipeline {
    camera: Arc<CameraSessionManager>,
    provider: Box<dyn LandmarkProvider>,
    classifier: GestureClassifier,
    config: PipelineConfig,
    frames_seen: u64,
    // Detection reused on frames the cadence skips.
    last_hands: Vec<LandmarkSet>,
    last_label: Option<Gesture>,
}

impl FramePipeline {
    pub fn new(
        camera: Arc<CameraSessionManager>,
        provider: Box<dyn LandmarkProvider>,
        config: &AppConfig,
    ) -> Self {
        Self {
            camera,
            provider,
            classifier: GestureClassifier::new(&config.classifier),
            config: config.pipeline.clone(),
            frames_seen: 0,
            last_hands: Vec::new(),
            last_label: None,
        }
    }

    pub fn camera(&self) -> &Arc<CameraSessionManager> {
        &self.camera
    }

    /// Reads one frame and returns it annotated with the first detected
    /// label. `None` when the camera had nothing to give.
    pub fn process_one_frame(&mut self) -> Option<ProcessedFrame> {
        let frame = match self.camera.read_frame() {
            Ok(Some(frame)) => frame,
            // A lost device is logged once by the session manager.
            Ok(None) | Err(_) => return None,
        };

        let frame = match self.transform(frame) {
            Ok(frame) => frame,
            Err(err) => {
                log::warn!("failed to transform camera frame: {err:#}");
                return None;
            }
        };

        let detect_now = match self.config.cadence {
            DetectionCadence::EveryFrame => true,
            DetectionCadence::Alternate => self.frames_seen % 2 == 0,
        };
        self.frames_seen = self.frames_seen.wrapping_add(1);

        if detect_now {
            self.last_hands = self.detect(&frame);
            self.last_label = self.classifier.classify_hands(&self.last_hands);
        }

        let mut frame = frame;
        overlay::annotate(&mut frame, &self.last_hands, self.last_label);
        Some(ProcessedFrame {
            frame,
            gesture: self.last_label,
            hands: self.last_hands.len(),
        })
    }

    /// Classifies a single encoded image (JPEG or PNG) without touching the
    /// camera session.
    pub fn classify_image_bytes(&mut self, bytes: &[u8]) -> Result<Option<Gesture>, PipelineError> {
        if bytes.is_empty() {
            return Err(PipelineError::EmptyPayload);
        }

        let image = image::load_from_memory(bytes)?.to_rgb8();
        let (width, height) = image.dimensions();
        let mut frame = Frame::new(image.into_raw(), width, height);
        if self.config.mirror {
            if let Err(err) = transform::mirror(&mut frame) {
                log::warn!("failed to mirror uploaded frame: {err:#}");
                return Ok(None);
            }
        }

        let hands = self.detect(&frame);
        Ok(self.classifier.classify_hands(&hands))
    }

    fn transform(&self, mut frame: Frame) -> anyhow::Result<Frame> {
        if self.config.mirror {
            transform::mirror(&mut frame)?;
        }
        transform::resize(frame, self.config.output_width, self.config.output_height)
    }

    fn detect(&mut self, frame: &Frame) -> Vec<LandmarkSet> {
        match self.provider.detect(frame) {
            Ok(mut hands) => {
                hands.truncate(self.config.max_hands);
                hands
            }
            Err(err) => {
                log::warn!("hand landmark detection failed: {err:#}");
                Vec::new()
            }
        }
    }
}
