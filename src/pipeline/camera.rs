//! Camera session lifecycle: probe a bounded index range, warm the device up,
//! hand out frames, release on stop.
//!
//! All state sits behind one mutex. A device handle cannot be shared, so
//! start, stop and read are mutually exclusive and concurrent `start` calls
//! serialize: one opens the device, the others observe the running session.

use std::{
    sync::{Mutex, MutexGuard, PoisonError},
    thread,
    time::Instant,
};

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    config::{CameraConfig, WarmupConfig},
    error::CameraError,
    types::Frame,
};

/// Best-effort capture settings applied right after a device opens.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CaptureHints {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

/// One opened capture device.
pub trait VideoDevice: Send {
    /// `Ok(None)` is an empty read; the device may still be open.
    fn read(&mut self) -> Result<Option<Frame>>;
    fn is_opened(&self) -> bool;
    fn apply_hints(&mut self, hints: &CaptureHints) -> Result<()>;
    fn release(&mut self) -> Result<()>;
}

pub trait DeviceOpener: Send + Sync {
    fn open(&self, index: u32) -> Result<Box<dyn VideoDevice>>;
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CameraSession {
    pub device_open: bool,
    pub running: bool,
    pub device_index: Option<u32>,
    pub started_at: Option<DateTime<Utc>>,
}

/// Result of trying a single candidate index.
pub enum ProbeOutcome {
    Opened {
        device: Box<dyn VideoDevice>,
        successes: u32,
    },
    WarmupFailed {
        successes: u32,
        attempts: u32,
    },
    OpenFailed(String),
}

#[derive(Default)]
struct SessionState {
    device: Option<Box<dyn VideoDevice>>,
    session: CameraSession,
    started: Option<Instant>,
}

impl SessionState {
    fn reset(&mut self) {
        self.device = None;
        self.session = CameraSession::default();
        self.started = None;
    }
}

pub struct CameraSessionManager {
    opener: Box<dyn DeviceOpener>,
    config: CameraConfig,
    state: Mutex<SessionState>,
}

impl CameraSessionManager {
    pub fn new(opener: Box<dyn DeviceOpener>, config: CameraConfig) -> Self {
        Self {
            opener,
            config,
            state: Mutex::new(SessionState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Opens the first usable device in the configured range. Returns the
    /// current index without touching hardware if already running.
    pub fn start(&self) -> Result<u32, CameraError> {
        let mut state = self.lock();
        if state.session.running {
            if let Some(index) = state.session.device_index {
                log::debug!("camera already running at index {index}");
                return Ok(index);
            }
        }

        // Drop any half-open leftovers before probing.
        release_device(&mut state);

        let range = self.config.index_range();
        log::info!("probing camera indices {}..{}", range.start, range.end);

        let opened = range.clone().find_map(|index| match self.probe(index) {
            ProbeOutcome::Opened { device, successes } => Some((index, device, successes)),
            ProbeOutcome::WarmupFailed {
                successes,
                attempts,
            } => {
                log::warn!(
                    "camera index {index} warm-up insufficient ({successes}/{attempts} frames), trying next index"
                );
                None
            }
            ProbeOutcome::OpenFailed(reason) => {
                log::info!("camera index {index} not opened: {reason}");
                None
            }
        });

        let Some((index, device, successes)) = opened else {
            log::error!(
                "could not open any camera in indices {}..{}",
                range.start,
                range.end
            );
            return Err(CameraError::NoDeviceAvailable {
                start: range.start,
                end: range.end,
            });
        };

        state.device = Some(device);
        state.session = CameraSession {
            device_open: true,
            running: true,
            device_index: Some(index),
            started_at: Some(Utc::now()),
        };
        state.started = Some(Instant::now());
        log::info!(
            "camera started at index {index} (warm-up {successes}/{} frames)",
            self.config.warmup.attempts
        );
        Ok(index)
    }

    /// Opens, configures and warms up one candidate. A device that fails any
    /// step is released before returning.
    pub fn probe(&self, index: u32) -> ProbeOutcome {
        let mut device = match self.opener.open(index) {
            Ok(device) => device,
            Err(err) => return ProbeOutcome::OpenFailed(format!("{err:#}")),
        };
        if !device.is_opened() {
            release_quietly(device.as_mut(), index);
            return ProbeOutcome::OpenFailed("device reports closed after open".to_string());
        }

        let hints = CaptureHints {
            width: self.config.width,
            height: self.config.height,
            fps: self.config.fps,
        };
        if let Err(err) = device.apply_hints(&hints) {
            log::warn!("camera index {index}: could not apply capture hints {hints:?}: {err:#}");
        }

        let warmup = &self.config.warmup;
        let successes = warm_up(device.as_mut(), warmup);
        if successes < warmup.min_successes {
            release_quietly(device.as_mut(), index);
            return ProbeOutcome::WarmupFailed {
                successes,
                attempts: warmup.attempts,
            };
        }

        // Final check: the device must still be open and deliver one more frame.
        let verified = device.is_opened() && matches!(device.read(), Ok(Some(_)));
        if !verified {
            log::warn!("camera index {index} stopped delivering frames after warm-up");
            release_quietly(device.as_mut(), index);
            return ProbeOutcome::WarmupFailed {
                successes,
                attempts: warmup.attempts,
            };
        }

        ProbeOutcome::Opened { device, successes }
    }

    /// Releases the device if there is one. Never fails.
    pub fn stop(&self) {
        let mut state = self.lock();
        if let Some(started) = state.started {
            log::info!("camera was running for {:.2?}", started.elapsed());
        }
        release_device(&mut state);
    }

    pub fn status(&self) -> CameraSession {
        self.lock().session.clone()
    }

    pub fn is_running(&self) -> bool {
        self.lock().session.running
    }

    /// One bounded device read. `None` when not running, on an empty read, or
    /// on a device error.
    pub fn read_raw_frame(&self) -> Option<Frame> {
        self.read_frame().ok().flatten()
    }

    /// Like [`read_raw_frame`](Self::read_raw_frame), but reports the read that
    /// discovers a dead device as [`CameraError::DeviceLost`]. That happens
    /// once; the session is reset and later calls return `Ok(None)`.
    pub fn read_frame(&self) -> Result<Option<Frame>, CameraError> {
        let mut state = self.lock();
        if !state.session.running {
            return Ok(None);
        }
        let index = state.session.device_index.unwrap_or_default();
        let Some(device) = state.device.as_mut() else {
            return Ok(None);
        };

        match device.read() {
            Ok(Some(frame)) => Ok(Some(frame)),
            Ok(None) => {
                if device.is_opened() {
                    log::debug!("empty read from camera index {index}");
                    return Ok(None);
                }
                log::error!("camera index {index} closed unexpectedly; ending session");
                release_device(&mut state);
                Err(CameraError::DeviceLost { index })
            }
            Err(err) => {
                if device.is_opened() {
                    log::warn!("camera index {index} read failed: {err:#}");
                    return Ok(None);
                }
                log::error!("camera index {index} failed and closed ({err:#}); ending session");
                release_device(&mut state);
                Err(CameraError::DeviceLost { index })
            }
        }
    }
}

impl Drop for CameraSessionManager {
    fn drop(&mut self) {
        self.stop();
    }
}

fn warm_up(device: &mut dyn VideoDevice, warmup: &WarmupConfig) -> u32 {
    if !warmup.settle().is_zero() {
        thread::sleep(warmup.settle());
    }

    let mut successes = 0;
    for _ in 0..warmup.attempts {
        if matches!(device.read(), Ok(Some(_))) {
            successes += 1;
        }
        if !warmup.interval().is_zero() {
            thread::sleep(warmup.interval());
        }
    }
    successes
}

fn release_device(state: &mut SessionState) {
    if let Some(mut device) = state.device.take() {
        let index = state.session.device_index.unwrap_or_default();
        match device.release() {
            Ok(()) => log::info!("camera released at index {index}"),
            Err(err) => log::warn!("error releasing camera at index {index}: {err:#}"),
        }
    }
    state.reset();
}

fn release_quietly(device: &mut dyn VideoDevice, index: u32) {
    if let Err(err) = device.release() {
        log::debug!("release of camera index {index} failed: {err:#}");
    }
}
