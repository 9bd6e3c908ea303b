//! Status line and caption drawn on top of every processed frame.

use super::skeleton::{self, put_pixel_safe};
use crate::types::{Frame, Gesture, LandmarkSet};

pub const CAPTION: &str = "MAKE HAND GESTURES IN FRONT OF CAMERA";
pub const NO_GESTURE_TEXT: &str = "NO ISL GESTURE DETECTED";

pub const DETECTED_COLOR: [u8; 3] = [0, 255, 0];
pub const NO_GESTURE_COLOR: [u8; 3] = [255, 0, 0];
pub const CAPTION_COLOR: [u8; 3] = [255, 255, 255];

const GLYPH_WIDTH: i32 = 5;
const GLYPH_HEIGHT: i32 = 7;
const MARGIN: i32 = 10;

pub fn status_line(label: Option<Gesture>) -> String {
    match label {
        Some(gesture) => format!("ISL: {}", gesture.label()),
        None => NO_GESTURE_TEXT.to_string(),
    }
}

/// Draws every hand's skeleton, the status line and the caption.
pub fn annotate(frame: &mut Frame, hands: &[LandmarkSet], label: Option<Gesture>) {
    let (width, height) = (frame.width, frame.height);
    for hand in hands {
        skeleton::draw_hand(&mut frame.rgb, width, height, hand);
    }

    let color = if label.is_some() {
        DETECTED_COLOR
    } else {
        NO_GESTURE_COLOR
    };
    let status = status_line(label);
    let scale = fit_scale(&status, width);
    draw_text(&mut frame.rgb, width, height, (MARGIN, MARGIN), &status, scale, color);

    let scale = fit_scale(CAPTION, width);
    let y = height as i32 - MARGIN - GLYPH_HEIGHT * scale;
    draw_text(
        &mut frame.rgb,
        width,
        height,
        (MARGIN, y),
        CAPTION,
        scale,
        CAPTION_COLOR,
    );
}

pub fn text_width(text: &str, scale: i32) -> i32 {
    let chars = text.chars().count() as i32;
    (chars * (GLYPH_WIDTH + 1) - 1).max(0) * scale
}

fn fit_scale(text: &str, width: u32) -> i32 {
    if text_width(text, 2) + 2 * MARGIN <= width as i32 {
        2
    } else {
        1
    }
}

pub fn draw_text(
    buffer: &mut [u8],
    width: u32,
    height: u32,
    origin: (i32, i32),
    text: &str,
    scale: i32,
    color: [u8; 3],
) {
    let scale = scale.max(1);
    let mut pen_x = origin.0;
    for ch in text.chars() {
        let rows = glyph(ch);
        for (row, bits) in rows.iter().enumerate() {
            for col in 0..GLYPH_WIDTH {
                if (bits >> (GLYPH_WIDTH - 1 - col)) & 1 == 0 {
                    continue;
                }
                let x = pen_x + col * scale;
                let y = origin.1 + row as i32 * scale;
                for oy in 0..scale {
                    for ox in 0..scale {
                        put_pixel_safe(buffer, width, height, x + ox, y + oy, color);
                    }
                }
            }
        }
        pen_x += (GLYPH_WIDTH + 1) * scale;
    }
}

/// 5x7 bitmap rows, top first, leftmost column in bit 4.
fn glyph(ch: char) -> [u8; 7] {
    match ch.to_ascii_uppercase() {
        'A' => [0x0E, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11],
        'B' => [0x1E, 0x11, 0x11, 0x1E, 0x11, 0x11, 0x1E],
        'C' => [0x0E, 0x11, 0x10, 0x10, 0x10, 0x11, 0x0E],
        'D' => [0x1C, 0x12, 0x11, 0x11, 0x11, 0x12, 0x1C],
        'E' => [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x1F],
        'F' => [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x10],
        'G' => [0x0E, 0x11, 0x10, 0x17, 0x11, 0x11, 0x0F],
        'H' => [0x11, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11],
        'I' => [0x0E, 0x04, 0x04, 0x04, 0x04, 0x04, 0x0E],
        'J' => [0x07, 0x02, 0x02, 0x02, 0x02, 0x12, 0x0C],
        'K' => [0x11, 0x12, 0x14, 0x18, 0x14, 0x12, 0x11],
        'L' => [0x10, 0x10, 0x10, 0x10, 0x10, 0x10, 0x1F],
        'M' => [0x11, 0x1B, 0x15, 0x15, 0x11, 0x11, 0x11],
        'N' => [0x11, 0x11, 0x19, 0x15, 0x13, 0x11, 0x11],
        'O' => [0x0E, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        'P' => [0x1E, 0x11, 0x11, 0x1E, 0x10, 0x10, 0x10],
        'Q' => [0x0E, 0x11, 0x11, 0x11, 0x15, 0x12, 0x0D],
        'R' => [0x1E, 0x11, 0x11, 0x1E, 0x14, 0x12, 0x11],
        'S' => [0x0F, 0x10, 0x10, 0x0E, 0x01, 0x01, 0x1E],
        'T' => [0x1F, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04],
        'U' => [0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        'V' => [0x11, 0x11, 0x11, 0x11, 0x11, 0x0A, 0x04],
        'W' => [0x11, 0x11, 0x11, 0x15, 0x15, 0x15, 0x0A],
        'X' => [0x11, 0x11, 0x0A, 0x04, 0x0A, 0x11, 0x11],
        'Y' => [0x11, 0x11, 0x11, 0x0A, 0x04, 0x04, 0x04],
        'Z' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x10, 0x1F],
        '0' => [0x0E, 0x11, 0x13, 0x15, 0x19, 0x11, 0x0E],
        '1' => [0x04, 0x0C, 0x04, 0x04, 0x04, 0x04, 0x0E],
        '2' => [0x0E, 0x11, 0x01, 0x02, 0x04, 0x08, 0x1F],
        '3' => [0x1F, 0x02, 0x04, 0x02, 0x01, 0x11, 0x0E],
        '4' => [0x02, 0x06, 0x0A, 0x12, 0x1F, 0x02, 0x02],
        '5' => [0x1F, 0x10, 0x1E, 0x01, 0x01, 0x11, 0x0E],
        '6' => [0x06, 0x08, 0x10, 0x1E, 0x11, 0x11, 0x0E],
        '7' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x08, 0x08],
        '8' => [0x0E, 0x11, 0x11, 0x0E, 0x11, 0x11, 0x0E],
        '9' => [0x0E, 0x11, 0x11, 0x0F, 0x01, 0x02, 0x0C],
        ':' => [0x00, 0x0C, 0x0C, 0x00, 0x0C, 0x0C, 0x00],
        '-' => [0x00, 0x00, 0x00, 0x1F, 0x00, 0x00, 0x00],
        '.' => [0x00, 0x00, 0x00, 0x00, 0x00, 0x0C, 0x0C],
        ' ' => [0x00; 7],
        _ => [0x0E, 0x11, 0x01, 0x02, 0x04, 0x00, 0x04],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const UNKNOWN: [u8; 7] = [0x0E, 0x11, 0x01, 0x02, 0x04, 0x00, 0x04];

    #[test]
    fn every_overlay_character_has_a_glyph() {
        let mut texts: Vec<String> = Gesture::ALL.iter().map(|g| status_line(Some(*g))).collect();
        texts.push(status_line(None));
        texts.push(CAPTION.to_string());

        for text in texts {
            for ch in text.chars() {
                assert_ne!(glyph(ch), UNKNOWN, "missing glyph for {ch:?} in {text:?}");
            }
        }
    }

    #[test]
    fn status_line_names_the_gesture() {
        assert_eq!(status_line(Some(Gesture::ThankYou)), "ISL: THANK YOU");
        assert_eq!(status_line(None), NO_GESTURE_TEXT);
    }

    #[test]
    fn detected_status_is_green() {
        let mut frame = Frame::filled(640, 480, [0, 0, 0]);
        annotate(&mut frame, &[], Some(Gesture::Hello));
        // Top row of the 'I' glyph starts one column in.
        assert_eq!(frame.pixel(12, 10), Some(DETECTED_COLOR));
        assert_eq!(frame.pixel(10, 10), Some([0, 0, 0]));
    }

    #[test]
    fn missing_gesture_status_is_red() {
        let mut frame = Frame::filled(640, 480, [0, 0, 0]);
        annotate(&mut frame, &[], None);
        assert_eq!(frame.pixel(10, 10), Some(NO_GESTURE_COLOR));
    }

    #[test]
    fn caption_sits_at_the_bottom_in_white() {
        let mut frame = Frame::filled(640, 480, [0, 0, 0]);
        annotate(&mut frame, &[], None);

        // 'M' has its left column set on every row.
        let top = 480 - MARGIN - GLYPH_HEIGHT * 2;
        assert_eq!(frame.pixel(10, top as u32), Some(CAPTION_COLOR));
        assert_eq!(frame.pixel(10, (top + 13) as u32), Some(CAPTION_COLOR));
    }

    #[test]
    fn narrow_frames_fall_back_to_small_text() {
        assert_eq!(fit_scale(CAPTION, 640), 2);
        assert_eq!(fit_scale(CAPTION, 300), 1);
        assert_eq!(text_width("AB", 1), 11);
        assert_eq!(text_width("", 3), 0);
    }
}
