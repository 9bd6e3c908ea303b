use crate::types::LandmarkSet;

pub const CONNECTIONS: &[(usize, usize)] = &[
    (0, 1),
    (1, 2),
    (2, 3),
    (3, 4),
    (0, 5),
    (5, 6),
    (6, 7),
    (7, 8),
    (0, 9),
    (9, 10),
    (10, 11),
    (11, 12),
    (0, 13),
    (13, 14),
    (14, 15),
    (15, 16),
    (0, 17),
    (17, 18),
    (18, 19),
    (19, 20),
    (5, 9),
    (9, 13),
    (13, 17),
];

pub const SKELETON_LINE_THICKNESS: i32 = 3;
const LINE_COLOR: [u8; 3] = [56, 189, 248];
const JOINT_COLOR: [u8; 3] = [248, 113, 113];

/// Draws one hand's connections and joints. Landmarks are normalized, so they
/// are scaled to the buffer size here.
pub fn draw_hand(buffer: &mut [u8], width: u32, height: u32, hand: &LandmarkSet) {
    let points: Vec<(f32, f32)> = hand
        .points()
        .iter()
        .map(|p| (to_pixel(p.x, width), to_pixel(p.y, height)))
        .collect();

    for &(a, b) in CONNECTIONS {
        draw_line(
            buffer,
            width,
            height,
            &points[a],
            &points[b],
            LINE_COLOR,
            SKELETON_LINE_THICKNESS,
        );
    }

    let joint_radius = SKELETON_LINE_THICKNESS + 1;
    for &(x, y) in &points {
        draw_circle(
            buffer,
            width,
            height,
            (x as i32, y as i32),
            joint_radius,
            JOINT_COLOR,
        );
    }
}

/// Scales a normalized coordinate, keeping it within one frame of the edges
/// so line walks stay bounded. NaN maps to the origin.
fn to_pixel(value: f32, size: u32) -> f32 {
    let size = size as f32;
    let scaled = (value * size).clamp(-size, 2.0 * size);
    if scaled.is_nan() { 0.0 } else { scaled }
}

fn draw_line(
    buffer: &mut [u8],
    width: u32,
    height: u32,
    p0: &(f32, f32),
    p1: &(f32, f32),
    color: [u8; 3],
    thickness: i32,
) {
    let (mut x0, mut y0) = (p0.0 as i32, p0.1 as i32);
    let (x1, y1) = (p1.0 as i32, p1.1 as i32);
    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    let radius = (thickness.max(1) - 1) / 2;

    loop {
        put_pixel_safe(buffer, width, height, x0, y0, color);
        if radius > 0 {
            for ox in -radius..=radius {
                for oy in -radius..=radius {
                    if (ox != 0 || oy != 0) && ox.abs() + oy.abs() <= radius {
                        put_pixel_safe(buffer, width, height, x0 + ox, y0 + oy, color);
                    }
                }
            }
        }
        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

fn draw_circle(
    buffer: &mut [u8],
    width: u32,
    height: u32,
    center: (i32, i32),
    radius: i32,
    color: [u8; 3],
) {
    let (cx, cy) = center;
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy <= radius * radius {
                put_pixel_safe(buffer, width, height, cx + dx, cy + dy, color);
            }
        }
    }
}

pub(crate) fn put_pixel_safe(
    buffer: &mut [u8],
    width: u32,
    height: u32,
    x: i32,
    y: i32,
    color: [u8; 3],
) {
    if x < 0 || y < 0 {
        return;
    }
    let (ux, uy) = (x as u32, y as u32);
    if ux >= width || uy >= height {
        return;
    }
    let idx = ((uy * width + ux) as usize) * 3;
    if idx + 2 < buffer.len() {
        buffer[idx..idx + 3].copy_from_slice(&color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Frame, LandmarkPoint, NUM_LANDMARKS};

    #[test]
    fn connections_cover_every_joint() {
        assert_eq!(CONNECTIONS.len(), 23);
        for index in 0..NUM_LANDMARKS {
            assert!(
                CONNECTIONS.iter().any(|&(a, b)| a == index || b == index),
                "joint {index} is not connected"
            );
        }
    }

    #[test]
    fn joints_are_drawn_at_scaled_positions() {
        let mut frame = Frame::filled(100, 50, [0, 0, 0]);
        let hand = LandmarkSet::new([LandmarkPoint::new(0.5, 0.5, 0.0); NUM_LANDMARKS]);
        draw_hand(&mut frame.rgb, frame.width, frame.height, &hand);

        assert_eq!(frame.pixel(50, 25), Some(JOINT_COLOR));
        assert_eq!(frame.pixel(0, 0), Some([0, 0, 0]));
    }

    #[test]
    fn lines_join_distant_joints() {
        let mut frame = Frame::filled(100, 100, [0, 0, 0]);
        let mut points = [LandmarkPoint::new(0.1, 0.1, 0.0); NUM_LANDMARKS];
        points[1] = LandmarkPoint::new(0.9, 0.1, 0.0);
        draw_hand(&mut frame.rgb, frame.width, frame.height, &LandmarkSet::new(points));

        assert_eq!(frame.pixel(50, 10), Some(LINE_COLOR));
    }

    #[test]
    fn out_of_frame_points_are_clipped() {
        let mut frame = Frame::filled(10, 10, [0, 0, 0]);
        let hand = LandmarkSet::new([LandmarkPoint::new(-2.0, 3.0, 0.0); NUM_LANDMARKS]);
        draw_hand(&mut frame.rgb, frame.width, frame.height, &hand);
        assert!(frame.rgb.iter().all(|&v| v == 0));
    }

    #[test]
    fn far_out_points_are_clamped_before_drawing() {
        let mut frame = Frame::filled(20, 20, [0, 0, 0]);
        let mut points = [LandmarkPoint::new(-1.0e9, 0.5, 0.0); NUM_LANDMARKS];
        points[1] = LandmarkPoint::new(1.0e9, 0.5, 0.0);
        points[2] = LandmarkPoint::new(f32::NAN, f32::INFINITY, 0.0);
        draw_hand(&mut frame.rgb, frame.width, frame.height, &LandmarkSet::new(points));

        assert_eq!(frame.pixel(10, 10), Some(LINE_COLOR));
        assert_eq!(to_pixel(f32::NAN, 20), 0.0);
        assert_eq!(to_pixel(f32::NEG_INFINITY, 20), -20.0);
    }
}
