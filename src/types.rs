use std::{fmt, time::Instant};

use serde::{Deserialize, Serialize};

pub const NUM_LANDMARKS: usize = 21;

pub const WRIST: usize = 0;
pub const THUMB_IP: usize = 3;
pub const THUMB_TIP: usize = 4;
pub const INDEX_PIP: usize = 6;
pub const INDEX_TIP: usize = 8;
pub const MIDDLE_PIP: usize = 10;
pub const MIDDLE_TIP: usize = 12;
pub const RING_PIP: usize = 14;
pub const RING_TIP: usize = 16;
pub const PINKY_PIP: usize = 18;
pub const PINKY_TIP: usize = 20;

/// Packed 8-bit RGB image, row-major, no padding between rows.
#[derive(Clone, Debug)]
pub struct Frame {
    pub rgb: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub timestamp: Instant,
}

impl Frame {
    pub fn new(rgb: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            rgb,
            width,
            height,
            timestamp: Instant::now(),
        }
    }

    /// Uniformly coloured frame, mostly useful for fakes and tests.
    pub fn filled(width: u32, height: u32, color: [u8; 3]) -> Self {
        let mut rgb = Vec::with_capacity(width as usize * height as usize * 3);
        for _ in 0..(width as usize * height as usize) {
            rgb.extend_from_slice(&color);
        }
        Self::new(rgb, width, height)
    }

    pub fn expected_len(&self) -> usize {
        (self.width as usize)
            .saturating_mul(self.height as usize)
            .saturating_mul(3)
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = ((y * self.width + x) as usize) * 3;
        self.rgb.get(idx..idx + 3).map(|px| [px[0], px[1], px[2]])
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LandmarkPoint {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl LandmarkPoint {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn distance(&self, other: &LandmarkPoint) -> f32 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2) + (self.z - other.z).powi(2))
            .sqrt()
    }
}

/// The 21 key points of one detected hand, in the fixed MediaPipe order.
#[derive(Clone, Debug, PartialEq)]
pub struct LandmarkSet {
    points: [LandmarkPoint; NUM_LANDMARKS],
}

impl LandmarkSet {
    pub fn new(points: [LandmarkPoint; NUM_LANDMARKS]) -> Self {
        Self { points }
    }

    /// Returns `None` unless exactly 21 points are supplied.
    pub fn from_slice(points: &[LandmarkPoint]) -> Option<Self> {
        let points: [LandmarkPoint; NUM_LANDMARKS] = points.try_into().ok()?;
        Some(Self { points })
    }

    pub fn point(&self, index: usize) -> LandmarkPoint {
        self.points[index]
    }

    pub fn points(&self) -> &[LandmarkPoint; NUM_LANDMARKS] {
        &self.points
    }

    pub fn set_point(&mut self, index: usize, point: LandmarkPoint) {
        self.points[index] = point;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Finger {
    Thumb,
    Index,
    Middle,
    Ring,
    Pinky,
}

impl Finger {
    pub const ALL: [Finger; 5] = [
        Finger::Thumb,
        Finger::Index,
        Finger::Middle,
        Finger::Ring,
        Finger::Pinky,
    ];

    pub fn tip(&self) -> usize {
        match self {
            Finger::Thumb => THUMB_TIP,
            Finger::Index => INDEX_TIP,
            Finger::Middle => MIDDLE_TIP,
            Finger::Ring => RING_TIP,
            Finger::Pinky => PINKY_TIP,
        }
    }

    /// PIP joint for the four fingers, IP joint for the thumb.
    pub fn pip(&self) -> usize {
        match self {
            Finger::Thumb => THUMB_IP,
            Finger::Index => INDEX_PIP,
            Finger::Middle => MIDDLE_PIP,
            Finger::Ring => RING_PIP,
            Finger::Pinky => PINKY_PIP,
        }
    }
}

/// Extension flag per finger, `true` meaning extended.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FingerState {
    pub thumb: bool,
    pub index: bool,
    pub middle: bool,
    pub ring: bool,
    pub pinky: bool,
}

impl FingerState {
    pub fn is_extended(&self, finger: Finger) -> bool {
        match finger {
            Finger::Thumb => self.thumb,
            Finger::Index => self.index,
            Finger::Middle => self.middle,
            Finger::Ring => self.ring,
            Finger::Pinky => self.pinky,
        }
    }

    pub fn all_extended(&self) -> bool {
        self.thumb && self.index && self.middle && self.ring && self.pinky
    }

    pub fn all_folded(&self) -> bool {
        !(self.thumb || self.index || self.middle || self.ring || self.pinky)
    }

    pub fn only_thumb(&self) -> bool {
        self.thumb && !(self.index || self.middle || self.ring || self.pinky)
    }

    pub fn last_three_folded(&self) -> bool {
        !(self.middle || self.ring || self.pinky)
    }

    pub fn last_three_extended(&self) -> bool {
        self.middle && self.ring && self.pinky
    }
}

/// Closed vocabulary of static Indian Sign Language gestures, in rule order.
/// "No gesture" is expressed as `Option::<Gesture>::None`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Gesture {
    Yes,
    No,
    Good,
    Bad,
    Ok,
    Hello,
    Stop,
    Help,
    ThankYou,
    Please,
}

impl Gesture {
    pub const ALL: [Gesture; 10] = [
        Gesture::Yes,
        Gesture::No,
        Gesture::Good,
        Gesture::Bad,
        Gesture::Ok,
        Gesture::Hello,
        Gesture::Stop,
        Gesture::Help,
        Gesture::ThankYou,
        Gesture::Please,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Gesture::Yes => "YES",
            Gesture::No => "NO",
            Gesture::Good => "GOOD",
            Gesture::Bad => "BAD",
            Gesture::Ok => "OK",
            Gesture::Hello => "HELLO",
            Gesture::Stop => "STOP",
            Gesture::Help => "HELP",
            Gesture::ThankYou => "THANK YOU",
            Gesture::Please => "PLEASE",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Gesture::Yes => "closed fist",
            Gesture::No => "thumb and index pinched, other fingers folded",
            Gesture::Good => "thumb up",
            Gesture::Bad => "thumb down",
            Gesture::Ok => "thumb and index circle, other fingers open",
            Gesture::Hello => "open palm raised",
            Gesture::Stop => "open palm held low",
            Gesture::Help => "thumb up on open palm",
            Gesture::ThankYou => "flat hand near the chin",
            Gesture::Please => "flat hand on the chest",
        }
    }
}

impl fmt::Display for Gesture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Annotated output of one pipeline pass.
#[derive(Clone, Debug)]
pub struct ProcessedFrame {
    pub frame: Frame,
    pub gesture: Option<Gesture>,
    pub hands: usize,
}
