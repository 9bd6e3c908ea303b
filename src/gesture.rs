//! Rule-based static gesture classification on normalized hand landmarks.
//!
//! Coordinates follow image convention: `y` grows downwards, so "above" means a
//! smaller `y`. The thumb is tested on the horizontal axis of the mirrored
//! frame, every other finger on the vertical axis.

use crate::{
    config::ClassifierConfig,
    types::{
        Finger, FingerState, Gesture, INDEX_TIP, LandmarkPoint, LandmarkSet, MIDDLE_TIP,
        PINKY_TIP, RING_TIP, THUMB_IP, THUMB_TIP, WRIST,
    },
};

/// Wrist above this height counts as the upper half of the frame.
const UPPER_REGION_END: f32 = 0.5;
/// Wrist inside this band counts as the middle of the frame.
const MIDDLE_BAND: (f32, f32) = (0.3, 0.7);
/// Wrist below this height counts as the lower part of the frame.
const LOWER_REGION_START: f32 = 0.7;

pub fn finger_state(landmarks: &LandmarkSet) -> FingerState {
    let extended = |finger: Finger| {
        let tip = landmarks.point(finger.tip());
        let pip = landmarks.point(finger.pip());
        match finger {
            Finger::Thumb => tip.x < pip.x,
            _ => tip.y < pip.y,
        }
    };

    FingerState {
        thumb: extended(Finger::Thumb),
        index: extended(Finger::Index),
        middle: extended(Finger::Middle),
        ring: extended(Finger::Ring),
        pinky: extended(Finger::Pinky),
    }
}

/// Geometry the rule table is evaluated against.
#[derive(Clone, Debug, PartialEq)]
pub struct HandFeatures {
    pub fingers: FingerState,
    pub thumb_index_distance: f32,
    pub pinch: bool,
    pub wrist: LandmarkPoint,
    pub thumb_tip: LandmarkPoint,
    pub thumb_ip: LandmarkPoint,
    pub index_tip: LandmarkPoint,
    pub middle_tip: LandmarkPoint,
    pub ring_tip: LandmarkPoint,
    pub pinky_tip: LandmarkPoint,
}

impl HandFeatures {
    pub fn extract(landmarks: &LandmarkSet, pinch_tolerance: f32) -> Self {
        let thumb_tip = landmarks.point(THUMB_TIP);
        let index_tip = landmarks.point(INDEX_TIP);
        let thumb_index_distance = thumb_tip.distance(&index_tip);

        Self {
            fingers: finger_state(landmarks),
            thumb_index_distance,
            pinch: thumb_index_distance < pinch_tolerance,
            wrist: landmarks.point(WRIST),
            thumb_tip,
            thumb_ip: landmarks.point(THUMB_IP),
            index_tip,
            middle_tip: landmarks.point(MIDDLE_TIP),
            ring_tip: landmarks.point(RING_TIP),
            pinky_tip: landmarks.point(PINKY_TIP),
        }
    }

    fn thumb_points_up(&self) -> bool {
        self.thumb_tip.y < self.thumb_ip.y
    }

    fn thumb_points_down(&self) -> bool {
        self.thumb_tip.y > self.thumb_ip.y
    }

    fn average_fingertip_y(&self) -> f32 {
        (self.index_tip.y + self.middle_tip.y + self.ring_tip.y + self.pinky_tip.y) / 4.0
    }
}

pub type RulePredicate = fn(&HandFeatures) -> bool;

pub struct Rule {
    pub gesture: Gesture,
    pub predicate: RulePredicate,
}

/// Evaluated top to bottom, first match wins. Several entries share geometry
/// (GOOD/HELP, HELLO/THANK YOU/PLEASE); order decides between them.
pub const RULES: [Rule; 10] = [
    Rule {
        gesture: Gesture::Yes,
        predicate: |f| f.fingers.all_folded(),
    },
    Rule {
        gesture: Gesture::No,
        predicate: |f| f.pinch && f.fingers.last_three_folded(),
    },
    Rule {
        gesture: Gesture::Good,
        predicate: |f| f.fingers.only_thumb() && f.thumb_points_up(),
    },
    Rule {
        gesture: Gesture::Bad,
        predicate: |f| f.fingers.only_thumb() && f.thumb_points_down(),
    },
    Rule {
        gesture: Gesture::Ok,
        predicate: |f| f.pinch && f.fingers.last_three_extended(),
    },
    Rule {
        gesture: Gesture::Hello,
        predicate: |f| {
            f.fingers.all_extended() && f.index_tip.y < f.wrist.y && f.middle_tip.y < f.wrist.y
        },
    },
    Rule {
        gesture: Gesture::Stop,
        predicate: |f| {
            f.fingers.all_extended()
                && f.average_fingertip_y() < f.wrist.y
                && f.wrist.y > LOWER_REGION_START
        },
    },
    Rule {
        gesture: Gesture::Help,
        predicate: |f| f.fingers.only_thumb() && f.thumb_points_up(),
    },
    Rule {
        gesture: Gesture::ThankYou,
        predicate: |f| f.fingers.all_extended() && f.wrist.y < UPPER_REGION_END,
    },
    Rule {
        gesture: Gesture::Please,
        predicate: |f| {
            f.fingers.all_extended() && f.wrist.y > MIDDLE_BAND.0 && f.wrist.y < MIDDLE_BAND.1
        },
    },
];

#[derive(Clone, Debug)]
pub struct GestureClassifier {
    pinch_tolerance: f32,
}

impl Default for GestureClassifier {
    fn default() -> Self {
        Self::new(&ClassifierConfig::default())
    }
}

impl GestureClassifier {
    pub fn new(config: &ClassifierConfig) -> Self {
        Self {
            pinch_tolerance: config.pinch_tolerance,
        }
    }

    pub fn features(&self, landmarks: &LandmarkSet) -> HandFeatures {
        HandFeatures::extract(landmarks, self.pinch_tolerance)
    }

    pub fn classify(&self, landmarks: &LandmarkSet) -> Option<Gesture> {
        let features = self.features(landmarks);
        RULES
            .iter()
            .find(|rule| (rule.predicate)(&features))
            .map(|rule| rule.gesture)
    }

    /// First non-empty label across hands, in detection order.
    pub fn classify_hands(&self, hands: &[LandmarkSet]) -> Option<Gesture> {
        hands.iter().find_map(|hand| self.classify(hand))
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::HandBuilder;
    use super::*;
    use crate::types::Finger::*;

    fn classify(hand: &LandmarkSet) -> Option<Gesture> {
        GestureClassifier::default().classify(hand)
    }

    fn rule(gesture: Gesture) -> &'static Rule {
        RULES
            .iter()
            .find(|r| r.gesture == gesture)
            .expect("every gesture has a rule")
    }

    fn features(hand: &LandmarkSet) -> HandFeatures {
        GestureClassifier::default().features(hand)
    }

    #[test]
    fn rule_table_covers_vocabulary_in_order() {
        let order: Vec<Gesture> = RULES.iter().map(|r| r.gesture).collect();
        assert_eq!(order, Gesture::ALL.to_vec());
    }

    #[test]
    fn finger_state_follows_tip_versus_pip() {
        let hand = HandBuilder::at(0.5, 0.8).extended(&[Thumb, Middle]).build();
        let state = finger_state(&hand);
        for finger in Finger::ALL {
            let expected = matches!(finger, Thumb | Middle);
            assert_eq!(state.is_extended(finger), expected, "{finger:?}");
        }
    }

    #[test]
    fn fist_regardless_of_position() {
        for (x, y) in [(0.3, 0.4), (0.5, 0.5), (0.8, 0.95), (0.35, 0.75)] {
            let hand = HandBuilder::at(x, y).build();
            assert!(finger_state(&hand).all_folded());
            assert_eq!(classify(&hand), Some(Gesture::Yes), "wrist at ({x}, {y})");
        }
    }

    #[test]
    fn pinch_with_folded_fingers_is_no_for_any_thumb_index_flags() {
        for fingers in [&[Thumb][..], &[Index], &[Thumb, Index]] {
            let hand = HandBuilder::at(0.5, 0.8).extended(fingers).pinched().build();
            let f = features(&hand);
            assert!(f.pinch, "fingers {fingers:?}");
            assert_eq!(classify(&hand), Some(Gesture::No), "fingers {fingers:?}");
        }
    }

    #[test]
    fn pinch_with_everything_folded_is_still_a_fist() {
        let hand = HandBuilder::at(0.5, 0.8).pinched().build();
        assert_eq!(classify(&hand), Some(Gesture::Yes));
    }

    #[test]
    fn thumb_up_and_down() {
        let up = HandBuilder::at(0.5, 0.6).extended(&[Thumb]).thumb_up(true).build();
        assert_eq!(classify(&up), Some(Gesture::Good));

        let down = HandBuilder::at(0.5, 0.6).extended(&[Thumb]).thumb_up(false).build();
        assert_eq!(classify(&down), Some(Gesture::Bad));

        let level = HandBuilder::at(0.5, 0.6).extended(&[Thumb]).build();
        assert_eq!(classify(&level), None);
    }

    #[test]
    fn ok_needs_pinch_and_open_last_three() {
        let hand = HandBuilder::at(0.5, 0.6)
            .extended(&[Thumb, Middle, Ring, Pinky])
            .pinched()
            .build();
        assert_eq!(classify(&hand), Some(Gesture::Ok));
    }

    #[test]
    fn open_palm_raised_is_hello() {
        let hand = HandBuilder::at(0.5, 0.6).open_palm().build();
        assert_eq!(classify(&hand), Some(Gesture::Hello));
    }

    #[test]
    fn stop_rule_requires_low_wrist_and_raised_fingertips() {
        let mut low = HandBuilder::at(0.5, 0.85).open_palm().build();
        assert!((rule(Gesture::Stop).predicate)(&features(&low)));

        // Drop the index tip below the wrist while keeping it extended
        // relative to its PIP joint; HELLO no longer applies.
        let mut index_tip = low.point(INDEX_TIP);
        index_tip.y = 0.86;
        low.set_point(INDEX_TIP, index_tip);
        let mut index_pip = low.point(Index.pip());
        index_pip.y = 0.9;
        low.set_point(Index.pip(), index_pip);
        let f = features(&low);
        assert!(f.fingers.all_extended());
        assert!(!(rule(Gesture::Hello).predicate)(&f));
        assert_eq!(classify(&low), Some(Gesture::Stop));

        let high = HandBuilder::at(0.5, 0.6).open_palm().build();
        assert!(!(rule(Gesture::Stop).predicate)(&features(&high)));
    }

    #[test]
    fn help_shares_geometry_with_good_and_is_shadowed() {
        let hand = HandBuilder::at(0.5, 0.6).extended(&[Thumb]).thumb_up(true).build();
        let f = features(&hand);
        assert!((rule(Gesture::Help).predicate)(&f));
        assert!((rule(Gesture::Good).predicate)(&f));
        assert_eq!(classify(&hand), Some(Gesture::Good));
    }

    #[test]
    fn wrist_bands_for_open_palm_rules() {
        let upper = features(&HandBuilder::at(0.5, 0.4).open_palm().build());
        assert!((rule(Gesture::ThankYou).predicate)(&upper));
        assert!((rule(Gesture::Please).predicate)(&upper));

        let middle = features(&HandBuilder::at(0.5, 0.6).open_palm().build());
        assert!(!(rule(Gesture::ThankYou).predicate)(&middle));
        assert!((rule(Gesture::Please).predicate)(&middle));

        let lower = features(&HandBuilder::at(0.5, 0.8).open_palm().build());
        assert!(!(rule(Gesture::ThankYou).predicate)(&lower));
        assert!(!(rule(Gesture::Please).predicate)(&lower));
    }

    #[test]
    fn open_palm_with_fingers_below_wrist_falls_through_to_bands() {
        // All fingers extended but pointing below the wrist: only the wrist
        // band rules can match.
        let mut hand = HandBuilder::at(0.5, 0.4).open_palm().build();
        for finger in [Index, Middle, Ring, Pinky] {
            let mut pip = hand.point(finger.pip());
            pip.y = 0.65;
            hand.set_point(finger.pip(), pip);
            let mut tip = hand.point(finger.tip());
            tip.y = 0.58;
            hand.set_point(finger.tip(), tip);
        }
        assert_eq!(classify(&hand), Some(Gesture::ThankYou));

        let mut hand = hand.clone();
        let mut wrist = hand.point(WRIST);
        wrist.y = 0.55;
        hand.set_point(WRIST, wrist);
        assert_eq!(classify(&hand), Some(Gesture::Please));
    }

    #[test]
    fn unmatched_pose_is_none() {
        let hand = HandBuilder::at(0.5, 0.6).extended(&[Index, Middle]).build();
        assert_eq!(classify(&hand), None);
    }

    #[test]
    fn classification_is_deterministic() {
        let classifier = GestureClassifier::default();
        let hand = HandBuilder::at(0.42, 0.63)
            .extended(&[Thumb, Middle, Ring, Pinky])
            .pinched()
            .build();
        let first = classifier.classify(&hand);
        for _ in 0..100 {
            assert_eq!(classifier.classify(&hand), first);
        }
    }

    #[test]
    fn first_labelled_hand_wins_and_other_hands_do_not_affect_it() {
        let classifier = GestureClassifier::default();
        let fist = HandBuilder::at(0.3, 0.7).build();
        let unmatched = HandBuilder::at(0.6, 0.6).extended(&[Index, Middle]).build();
        let hello = HandBuilder::at(0.7, 0.6).open_palm().build();

        assert_eq!(
            classifier.classify_hands(&[unmatched.clone(), fist.clone()]),
            Some(Gesture::Yes)
        );
        assert_eq!(
            classifier.classify_hands(&[hello.clone(), fist.clone()]),
            Some(Gesture::Hello)
        );
        assert_eq!(
            classifier.classify_hands(&[fist.clone(), hello.clone()]),
            Some(Gesture::Yes)
        );
        assert_eq!(classifier.classify(&fist), Some(Gesture::Yes));
        assert_eq!(classifier.classify_hands(&[]), None);
    }

    #[test]
    fn pinch_tolerance_is_configurable() {
        let hand = HandBuilder::at(0.5, 0.8).extended(&[Index]).pinched().build();
        let strict = GestureClassifier::new(&ClassifierConfig {
            pinch_tolerance: 0.001,
        });
        assert!(!strict.features(&hand).pinch);
        assert_eq!(strict.classify(&hand), None);
    }
}
