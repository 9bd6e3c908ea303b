use anyhow::{Context, Result, anyhow};
use fast_image_resize as fir;
use rayon::prelude::*;

use crate::types::Frame;

fn check_len(frame: &Frame) -> Result<()> {
    if frame.rgb.len() != frame.expected_len() {
        return Err(anyhow!(
            "frame buffer size mismatch: got {}, expected {}",
            frame.rgb.len(),
            frame.expected_len()
        ));
    }
    Ok(())
}

/// Flips the frame left to right in place.
pub fn mirror(frame: &mut Frame) -> Result<()> {
    check_len(frame)?;
    let stride = frame.width as usize * 3;
    if stride == 0 {
        return Ok(());
    }

    frame.rgb.par_chunks_exact_mut(stride).for_each(|row| {
        let width = row.len() / 3;
        for x in 0..width / 2 {
            let (left, right) = (x * 3, (width - 1 - x) * 3);
            for c in 0..3 {
                row.swap(left + c, right + c);
            }
        }
    });
    Ok(())
}

/// Bilinear resize to `width`x`height`; a frame already at that size is
/// returned untouched.
pub fn resize(frame: Frame, width: u32, height: u32) -> Result<Frame> {
    check_len(&frame)?;
    if frame.width == width && frame.height == height {
        return Ok(frame);
    }
    if width == 0 || height == 0 || frame.width == 0 || frame.height == 0 {
        return Err(anyhow!(
            "cannot resize {}x{} to {width}x{height}",
            frame.width,
            frame.height
        ));
    }

    let timestamp = frame.timestamp;
    let src_image =
        fir::images::Image::from_vec_u8(frame.width, frame.height, frame.rgb, fir::PixelType::U8x3)?;
    let mut dst_image = fir::images::Image::new(width, height, fir::PixelType::U8x3);
    let mut resizer = fir::Resizer::new();
    let resize_options = fir::ResizeOptions::new()
        .resize_alg(fir::ResizeAlg::Interpolation(fir::FilterType::Bilinear));
    resizer
        .resize(&src_image, &mut dst_image, Some(&resize_options))
        .context("fast resize failed")?;

    Ok(Frame {
        rgb: dst_image.into_vec(),
        width,
        height,
        timestamp,
    })
}
