//! Image rotation on the RGBA working representation.
//!
//! Quarter-turn rotations are exact pixel shuffles. Arbitrary angles use
//! inverse mapping with bilinear interpolation: for each output pixel,
//! find the source coordinate that lands on it and blend the four
//! neighbors. The output canvas expands to the rotated bounding box, so
//! nothing is clipped.

use image::RgbaImage;

/// Compute the bounding-box dimensions of an image rotated by
/// `angle_degrees` (clockwise, matching decode option semantics).
///
/// Quarter turns map exactly: 90 and 270 swap dimensions, 180 keeps
/// them. Other angles round the analytic bounding box to pixels.
pub fn compute_rotated_bounds(width: u32, height: u32, angle_degrees: f32) -> (u32, u32) {
    let angle = angle_degrees.rem_euclid(360.0);

    if angle.abs() < 0.001 || (360.0 - angle).abs() < 0.001 {
        return (width, height);
    }
    if (angle - 90.0).abs() < 0.001 || (angle - 270.0).abs() < 0.001 {
        return (height, width);
    }
    if (angle - 180.0).abs() < 0.001 {
        return (width, height);
    }

    let rad = (angle as f64).to_radians();
    let cos = rad.cos().abs();
    let sin = rad.sin().abs();
    let w = width as f64;
    let h = height as f64;

    // Bounding box of a rotated rectangle:
    // new_w = |w*cos| + |h*sin|, new_h = |w*sin| + |h*cos|
    let new_w = (w * cos + h * sin).round() as u32;
    let new_h = (w * sin + h * cos).round() as u32;
    (new_w.max(1), new_h.max(1))
}

/// Rotate an RGBA image clockwise by `angle_degrees`.
///
/// Pixels falling outside the source map to transparent black.
pub fn rotate_rgba(img: &RgbaImage, angle_degrees: f32) -> RgbaImage {
    let angle = angle_degrees.rem_euclid(360.0);

    if angle.abs() < 0.001 || (360.0 - angle).abs() < 0.001 {
        return img.clone();
    }
    if (angle - 90.0).abs() < 0.001 {
        return image::imageops::rotate90(img);
    }
    if (angle - 180.0).abs() < 0.001 {
        return image::imageops::rotate180(img);
    }
    if (angle - 270.0).abs() < 0.001 {
        return image::imageops::rotate270(img);
    }

    let (src_w, src_h) = img.dimensions();
    let (dst_w, dst_h) = compute_rotated_bounds(src_w, src_h, angle);
    let mut out = RgbaImage::new(dst_w, dst_h);

    // Inverse mapping: rotate each output coordinate back by -angle
    // around the respective centers.
    let rad = -(angle as f64).to_radians();
    let (sin, cos) = rad.sin_cos();
    let src_cx = (src_w as f64 - 1.0) / 2.0;
    let src_cy = (src_h as f64 - 1.0) / 2.0;
    let dst_cx = (dst_w as f64 - 1.0) / 2.0;
    let dst_cy = (dst_h as f64 - 1.0) / 2.0;

    for dy in 0..dst_h {
        for dx in 0..dst_w {
            let ox = dx as f64 - dst_cx;
            let oy = dy as f64 - dst_cy;
            let sx = ox * cos - oy * sin + src_cx;
            let sy = ox * sin + oy * cos + src_cy;
            if let Some(pixel) = sample_bilinear(img, sx, sy) {
                out.put_pixel(dx, dy, pixel);
            }
        }
    }
    out
}

/// Bilinear sample at a fractional source coordinate.
///
/// Returns `None` outside the source rectangle.
fn sample_bilinear(img: &RgbaImage, x: f64, y: f64) -> Option<image::Rgba<u8>> {
    let (w, h) = img.dimensions();
    if x < -0.5 || y < -0.5 || x > w as f64 - 0.5 || y > h as f64 - 0.5 {
        return None;
    }

    let x0 = x.floor().clamp(0.0, (w - 1) as f64) as u32;
    let y0 = y.floor().clamp(0.0, (h - 1) as f64) as u32;
    let x1 = (x0 + 1).min(w - 1);
    let y1 = (y0 + 1).min(h - 1);
    let fx = (x - x0 as f64).clamp(0.0, 1.0);
    let fy = (y - y0 as f64).clamp(0.0, 1.0);

    let p00 = img.get_pixel(x0, y0).0;
    let p10 = img.get_pixel(x1, y0).0;
    let p01 = img.get_pixel(x0, y1).0;
    let p11 = img.get_pixel(x1, y1).0;

    let mut blended = [0u8; 4];
    for c in 0..4 {
        let top = p00[c] as f64 * (1.0 - fx) + p10[c] as f64 * fx;
        let bottom = p01[c] as f64 * (1.0 - fx) + p11[c] as f64 * fx;
        blended[c] = (top * (1.0 - fy) + bottom * fy).round() as u8;
    }
    Some(image::Rgba(blended))
}
