//! `DeviceOpener` backed by nokhwa.
//!
//! A nokhwa `Camera` stays on the thread that built it. Each opened device is
//! a capture thread that answers sequence-tagged requests; a reply that
//! arrives after its caller gave up is discarded by the next request.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::{Duration, Instant},
};

use anyhow::{Result, anyhow};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded, unbounded};
use nokhwa::{
    Camera,
    pixel_format::RgbFormat,
    utils::{CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType, Resolution},
};

use super::{
    camera::{CaptureHints, DeviceOpener, VideoDevice},
    frame_converter,
};
use crate::types::Frame;

const OPEN_TIMEOUT: Duration = Duration::from_secs(10);

// Prefer pixel formats that are widely supported on macOS (the built-in cameras
// often reject YUYV even though Nokhwa reports it).
const PREFERRED_PIXEL_FORMATS: &[FrameFormat] = &[
    FrameFormat::RAWRGB,
    FrameFormat::RAWBGR,
    FrameFormat::GRAY,
    FrameFormat::YUYV,
    FrameFormat::NV12,
    FrameFormat::MJPEG,
];

fn requested_formats() -> [RequestedFormat<'static>; 4] {
    [
        RequestedFormat::with_formats(
            RequestedFormatType::AbsoluteHighestFrameRate,
            PREFERRED_PIXEL_FORMATS,
        ),
        RequestedFormat::with_formats(
            RequestedFormatType::AbsoluteHighestResolution,
            PREFERRED_PIXEL_FORMATS,
        ),
        RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestFrameRate),
        RequestedFormat::new::<RgbFormat>(RequestedFormatType::None),
    ]
}

fn build_camera(index: u32) -> Result<Camera> {
    let mut last_err = None;

    for requested in requested_formats() {
        match Camera::new(CameraIndex::Index(index), requested) {
            Ok(mut camera) => match camera.open_stream() {
                Ok(()) => return Ok(camera),
                Err(err) => last_err = Some(err.into()),
            },
            Err(err) => last_err = Some(err.into()),
        }
    }

    Err(last_err.unwrap_or_else(|| anyhow!("failed to open camera with any supported format")))
}

pub struct NokhwaOpener {
    read_timeout: Duration,
}

impl NokhwaOpener {
    pub fn new(read_timeout: Duration) -> Self {
        Self { read_timeout }
    }
}

impl DeviceOpener for NokhwaOpener {
    fn open(&self, index: u32) -> Result<Box<dyn VideoDevice>> {
        let (ready_tx, ready_rx) = bounded::<Result<(), String>>(1);
        let (request_tx, request_rx) = unbounded::<(u64, Request)>();
        let (reply_tx, reply_rx) = unbounded::<(u64, Reply)>();
        let open = Arc::new(AtomicBool::new(false));
        let open_flag = open.clone();

        let handle = thread::Builder::new()
            .name(format!("camera-{index}"))
            .spawn(move || {
                let camera = match build_camera(index) {
                    Ok(camera) => camera,
                    Err(err) => {
                        let _ = ready_tx.send(Err(format!("{err:#}")));
                        return;
                    }
                };
                open_flag.store(true, Ordering::SeqCst);
                if ready_tx.send(Ok(())).is_err() {
                    return;
                }
                serve(camera, &request_rx, &reply_tx, &open_flag);
            })?;

        match ready_rx.recv_timeout(OPEN_TIMEOUT) {
            Ok(Ok(())) => Ok(Box::new(NokhwaDevice {
                index,
                requests: request_tx,
                replies: reply_rx,
                open,
                next_seq: 0,
                read_timeout: self.read_timeout,
                handle: Some(handle),
            })),
            Ok(Err(reason)) => Err(anyhow!(reason)),
            Err(RecvTimeoutError::Timeout) => Err(anyhow!(
                "camera index {index} did not open within {OPEN_TIMEOUT:?}"
            )),
            Err(RecvTimeoutError::Disconnected) => {
                Err(anyhow!("camera thread for index {index} exited during open"))
            }
        }
    }
}

enum Request {
    Read,
    ApplyHints(CaptureHints),
    Release,
}

enum Reply {
    Frame(Result<Option<Frame>, String>),
    Done(Result<(), String>),
}

fn serve(
    mut camera: Camera,
    requests: &Receiver<(u64, Request)>,
    replies: &Sender<(u64, Reply)>,
    open: &AtomicBool,
) {
    while let Ok((seq, request)) = requests.recv() {
        let (reply, stop) = match request {
            Request::Read => (Reply::Frame(read_frame(&mut camera)), false),
            Request::ApplyHints(hints) => (Reply::Done(apply_hints(&mut camera, &hints)), false),
            Request::Release => {
                let result = camera.stop_stream().map_err(|err| err.to_string());
                (Reply::Done(result), true)
            }
        };
        open.store(!stop && camera.is_stream_open(), Ordering::SeqCst);

        if replies.send((seq, reply)).is_err() || stop {
            break;
        }
    }

    if open.swap(false, Ordering::SeqCst) {
        if let Err(err) = camera.stop_stream() {
            log::debug!("camera stream stop on disconnect failed: {err:?}");
        }
    }
}

fn read_frame(camera: &mut Camera) -> Result<Option<Frame>, String> {
    let buffer = match camera.frame() {
        Ok(buffer) => buffer,
        Err(err) => {
            log::debug!("camera frame read failed: {err:?}");
            return Ok(None);
        }
    };

    frame_converter::convert_camera_frame(&buffer)
        .map(Some)
        .map_err(|err| format!("{err:#}"))
}

fn apply_hints(camera: &mut Camera, hints: &CaptureHints) -> Result<(), String> {
    camera
        .set_resolution(Resolution::new(hints.width, hints.height))
        .map_err(|err| format!("resolution {}x{}: {err}", hints.width, hints.height))?;
    camera
        .set_frame_rate(hints.fps)
        .map_err(|err| format!("frame rate {}: {err}", hints.fps))
}

struct NokhwaDevice {
    index: u32,
    requests: Sender<(u64, Request)>,
    replies: Receiver<(u64, Reply)>,
    open: Arc<AtomicBool>,
    next_seq: u64,
    read_timeout: Duration,
    handle: Option<thread::JoinHandle<()>>,
}

impl NokhwaDevice {
    fn request(&mut self, request: Request) -> Result<Reply> {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.requests
            .send((seq, request))
            .map_err(|_| anyhow!("camera thread for index {} has exited", self.index))?;

        let deadline = Instant::now() + self.read_timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.replies.recv_timeout(remaining) {
                Ok((reply_seq, reply)) if reply_seq == seq => return Ok(reply),
                Ok((stale, _)) => log::debug!("dropping stale camera reply {stale}"),
                Err(RecvTimeoutError::Timeout) => {
                    return Err(anyhow!(
                        "camera index {} did not answer within {:?}",
                        self.index,
                        self.read_timeout
                    ));
                }
                Err(RecvTimeoutError::Disconnected) => {
                    self.open.store(false, Ordering::SeqCst);
                    return Err(anyhow!("camera thread for index {} has exited", self.index));
                }
            }
        }
    }
}

impl VideoDevice for NokhwaDevice {
    fn read(&mut self) -> Result<Option<Frame>> {
        match self.request(Request::Read)? {
            Reply::Frame(result) => result.map_err(|reason| anyhow!(reason)),
            Reply::Done(_) => Err(anyhow!("unexpected reply to frame read")),
        }
    }

    fn is_opened(&self) -> bool {
        let thread_alive = self
            .handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished());
        thread_alive && self.open.load(Ordering::SeqCst)
    }

    fn apply_hints(&mut self, hints: &CaptureHints) -> Result<()> {
        match self.request(Request::ApplyHints(*hints))? {
            Reply::Done(result) => result.map_err(|reason| anyhow!(reason)),
            Reply::Frame(_) => Err(anyhow!("unexpected reply to capture hints")),
        }
    }

    fn release(&mut self) -> Result<()> {
        if self.handle.is_none() {
            return Ok(());
        }

        let result = match self.request(Request::Release) {
            Ok(Reply::Done(result)) => result.map_err(|reason| anyhow!(reason)),
            Ok(Reply::Frame(_)) => Err(anyhow!("unexpected reply to release")),
            Err(err) => Err(err),
        };

        if let Some(handle) = self.handle.take() {
            if result.is_ok() {
                let _ = handle.join();
            }
        }
        self.open.store(false, Ordering::SeqCst);
        result
    }
}

impl Drop for NokhwaDevice {
    fn drop(&mut self) {
        // Closing the request channel stops the capture thread.
        if self.handle.take().is_some() {
            log::debug!("camera index {} dropped without release", self.index);
        }
    }
}
