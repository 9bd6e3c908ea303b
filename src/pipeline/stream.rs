//! Multipart JPEG stream (`multipart/x-mixed-replace`) over the frame
//! pipeline.

use std::{thread, time::Duration};

use image::{ExtendedColorType, ImageError, codecs::jpeg::JpegEncoder};

use super::frame::FramePipeline;
use crate::{
    config::StreamConfig,
    types::{Frame, Gesture},
};

const MISS_WARN_THRESHOLD: u32 = 30;
const MISS_BACKOFF: Duration = Duration::from_millis(5);

/// One self-delimiting part of the stream plus the label of the frame in it.
#[derive(Clone, Debug)]
pub struct StreamChunk {
    pub bytes: Vec<u8>,
    pub gesture: Option<Gesture>,
    pub hands: usize,
}

pub fn content_type(boundary: &str) -> String {
    format!("multipart/x-mixed-replace; boundary={boundary}")
}

pub fn encode_jpeg(frame: &Frame, quality: u8) -> Result<Vec<u8>, ImageError> {
    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, quality.clamp(1, 100)).encode(
        &frame.rgb,
        frame.width,
        frame.height,
        ExtendedColorType::Rgb8,
    )?;
    Ok(jpeg)
}

pub fn encode_chunk(boundary: &str, jpeg: &[u8]) -> Vec<u8> {
    let header = format!(
        "--{boundary}\r\nContent-Type: image/jpeg\r\nContent-Length: {}\r\n\r\n",
        jpeg.len()
    );
    let mut chunk = Vec::with_capacity(header.len() + jpeg.len() + 2);
    chunk.extend_from_slice(header.as_bytes());
    chunk.extend_from_slice(jpeg);
    chunk.extend_from_slice(b"\r\n");
    chunk
}

/// Pull-based stream of encoded chunks. Ends when the camera session stops;
/// build a new one after the next `start`.
pub struct MjpegStream<'a> {
    pipeline: &'a mut FramePipeline,
    boundary: String,
    quality: u8,
    misses: u32,
}

impl<'a> MjpegStream<'a> {
    pub fn new(pipeline: &'a mut FramePipeline, config: &StreamConfig) -> Self {
        Self {
            pipeline,
            boundary: config.boundary.clone(),
            quality: config.jpeg_quality,
            misses: 0,
        }
    }

    fn record_miss(&mut self) {
        self.misses += 1;
        if self.misses >= MISS_WARN_THRESHOLD {
            log::warn!("no frames captured for {MISS_WARN_THRESHOLD} cycles");
            self.misses = 0;
        }
        thread::sleep(MISS_BACKOFF);
    }
}

impl Iterator for MjpegStream<'_> {
    type Item = StreamChunk;

    fn next(&mut self) -> Option<StreamChunk> {
        while self.pipeline.camera().is_running() {
            let Some(processed) = self.pipeline.process_one_frame() else {
                self.record_miss();
                continue;
            };
            self.misses = 0;

            match encode_jpeg(&processed.frame, self.quality) {
                Ok(jpeg) => {
                    return Some(StreamChunk {
                        bytes: encode_chunk(&self.boundary, &jpeg),
                        gesture: processed.gesture,
                        hands: processed.hands,
                    });
                }
                Err(err) => log::warn!("failed to encode stream frame: {err}"),
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        config::{AppConfig, WarmupConfig},
        gesture::fixtures::HandBuilder,
        pipeline::{
            camera::{
                CameraSessionManager,
                fake::{FakeOpener, Read, Script},
            },
            landmarks::scripted::ScriptedProvider,
        },
    };

    fn pipeline(script: Script) -> (FramePipeline, AppConfig) {
        let mut config = AppConfig::default();
        config.camera.index_end = 1;
        config.camera.warmup = WarmupConfig {
            settle_ms: 0,
            attempts: 5,
            min_successes: 3,
            interval_ms: 0,
        };
        config.pipeline.output_width = 32;
        config.pipeline.output_height = 24;

        let camera = Arc::new(CameraSessionManager::new(
            Box::new(FakeOpener::new(vec![script])),
            config.camera.clone(),
        ));
        let provider = ScriptedProvider::always(vec![HandBuilder::at(0.5, 0.5).build()]);
        (FramePipeline::new(camera, Box::new(provider), &config), config)
    }

    /// Splits one chunk into its declared length and payload.
    fn parse_chunk<'c>(boundary: &str, chunk: &'c [u8]) -> (usize, &'c [u8]) {
        let text_end = chunk
            .windows(4)
            .position(|w| w == b"\r\n\r\n")
            .unwrap();
        let header = std::str::from_utf8(&chunk[..text_end]).unwrap();
        let mut lines = header.split("\r\n");
        assert_eq!(lines.next(), Some(format!("--{boundary}").as_str()));
        assert_eq!(lines.next(), Some("Content-Type: image/jpeg"));
        let length: usize = lines
            .next()
            .and_then(|l| l.strip_prefix("Content-Length: "))
            .unwrap()
            .parse()
            .unwrap();
        assert_eq!(lines.next(), None);

        let body = &chunk[text_end + 4..];
        assert!(body.ends_with(b"\r\n"));
        (length, &body[..body.len() - 2])
    }

    #[test]
    fn chunk_declares_its_own_length() {
        let chunk = encode_chunk("frame", b"abc");
        assert_eq!(
            chunk,
            b"--frame\r\nContent-Type: image/jpeg\r\nContent-Length: 3\r\n\r\nabc\r\n".to_vec()
        );
    }

    #[test]
    fn content_type_names_the_boundary() {
        assert_eq!(
            content_type("frame"),
            "multipart/x-mixed-replace; boundary=frame"
        );
    }

    #[test]
    fn encoded_frames_are_jpeg() {
        let jpeg = encode_jpeg(&Frame::filled(16, 8, [200, 10, 10]), 65).unwrap();
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
        let decoded = image::load_from_memory(&jpeg).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (16, 8));
    }

    #[test]
    fn stream_ends_when_session_is_not_running() {
        let (mut pipeline, config) = pipeline(Script::healthy());
        assert!(MjpegStream::new(&mut pipeline, &config.stream).next().is_none());
    }

    #[test]
    fn stream_yields_labelled_chunks_and_skips_misses() {
        let mut reads = vec![Read::Frame; 6];
        reads.extend([Read::Empty, Read::Error, Read::Frame, Read::Empty, Read::Frame]);
        let (mut pipeline, config) = pipeline(Script::reads(reads, Read::Close));
        pipeline.camera().start().unwrap();

        let chunks: Vec<_> = MjpegStream::new(&mut pipeline, &config.stream).collect();
        assert_eq!(chunks.len(), 2);
        for chunk in &chunks {
            assert_eq!(chunk.gesture, Some(Gesture::Yes));
            let (length, payload) = parse_chunk("frame", &chunk.bytes);
            assert_eq!(length, payload.len());
            let decoded = image::load_from_memory(payload).unwrap();
            assert_eq!((decoded.width(), decoded.height()), (32, 24));
        }
        assert!(!pipeline.camera().is_running());
    }

    #[test]
    fn crashed_device_ends_the_stream() {
        let mut reads = vec![Read::Frame; 6];
        reads.extend([Read::Frame, Read::Crash]);
        let (mut pipeline, config) = pipeline(Script::reads(reads, Read::Error));
        pipeline.camera().start().unwrap();

        let chunks: Vec<_> = MjpegStream::new(&mut pipeline, &config.stream).collect();
        assert_eq!(chunks.len(), 1);
        assert!(!pipeline.camera().is_running());
    }

    #[test]
    fn stopping_the_session_ends_the_stream() {
        let (mut pipeline, config) = pipeline(Script::healthy());
        let camera = pipeline.camera().clone();
        camera.start().unwrap();

        let mut stream = MjpegStream::new(&mut pipeline, &config.stream);
        assert!(stream.next().is_some());
        assert!(stream.next().is_some());
        camera.stop();
        assert!(stream.next().is_none());
    }
}
