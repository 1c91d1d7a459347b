//! Motion-vector overlay rendering.
//!
//! For each record, the renderer computes the start and end of an arrow in
//! fixed-point sub-pixel image coordinates and draws it anti-aliased onto the
//! frame buffer. The end point sits at the macroblock center in the current
//! frame; the start point is that center offset by the normalized motion
//! displacement — the arrow points from where the content came from to where
//! it is now.
//!
//! # Example
//!
//! ```
//! use mvextract::{render, ArrowStyle, MotionVectorRecord};
//!
//! let record = MotionVectorRecord {
//!     source: -1, mb_w: 16, mb_h: 16,
//!     src_x: 102, src_y: 50, dst_x: 100, dst_y: 50,
//!     motion_x: 8, motion_y: 0, motion_scale: 4,
//! };
//!
//! // shift 2 → factor 4: end = dst × 4, start = (dst + motion/scale) × 4.
//! let (start, end) = render::arrow_points(&record, 2).unwrap();
//! assert_eq!(end, (400, 200));
//! assert_eq!(start, (408, 200));
//! ```

use image::{Rgb, RgbImage};

use crate::record::MotionVectorRecord;

/// Visual parameters for the motion-vector overlay.
#[derive(Debug, Clone, Copy)]
pub struct ArrowStyle {
    /// Arrow color. Defaults to red.
    pub color: Rgb<u8>,
    /// Sub-pixel shift in bits; the fixed-point factor is `1 << shift`.
    /// Defaults to 2 (quarter-pixel precision).
    pub shift: u32,
    /// Tip segment length as a fraction of the shaft length. Defaults to 0.1.
    pub tip_length: f32,
}

impl Default for ArrowStyle {
    fn default() -> Self {
        Self {
            color: Rgb([255, 0, 0]),
            shift: 2,
            tip_length: 0.1,
        }
    }
}

/// Round to the nearest integer, halves away from the floor (round-half-up).
fn round_half_up(value: f64) -> i32 {
    (value + 0.5).floor() as i32
}

/// Compute the `(start, end)` points of a record's arrow in fixed-point
/// sub-pixel coordinates.
///
/// `end = dst × factor` is the macroblock center in the current frame;
/// `start = round((dst + motion / motion_scale) × factor)` is the position
/// the vector points from, rounded half-up per axis.
///
/// Returns `None` for a record with `motion_scale == 0`: such a record is
/// skipped rather than divided through. This is a defensive guard, not a
/// correctness guarantee about upstream data.
pub fn arrow_points(
    record: &MotionVectorRecord,
    shift: u32,
) -> Option<((i32, i32), (i32, i32))> {
    let (dx, dy) = record.displacement()?;
    let factor = i32::checked_shl(1, shift)?;

    let end = (record.dst_x * factor, record.dst_y * factor);
    let start = (
        round_half_up((f64::from(record.dst_x) + dx) * f64::from(factor)),
        round_half_up((f64::from(record.dst_y) + dy) * f64::from(factor)),
    );

    Some((start, end))
}

/// Draw every record's arrow onto the frame, in input order.
///
/// Records with a zero `motion_scale` are skipped. When `draw_log` is
/// supplied, one line per drawn arrow is appended to it, in the form
/// `(start_x, start_y), (end_x, end_y)` with integer sub-pixel coordinates.
///
/// The frame buffer is mutated in place.
pub fn draw_motion_vectors(
    frame: &mut RgbImage,
    records: &[MotionVectorRecord],
    style: &ArrowStyle,
    mut draw_log: Option<&mut String>,
) {
    for record in records {
        let Some((start, end)) = arrow_points(record, style.shift) else {
            log::debug!("skipping motion vector with zero motion_scale");
            continue;
        };

        if let Some(log) = draw_log.as_deref_mut() {
            log.push_str(&format!(
                "({}, {}), ({}, {})\n",
                start.0, start.1, end.0, end.1
            ));
        }

        draw_arrow(frame, start, end, style);
    }
}

/// Draw a single arrow between two fixed-point sub-pixel points.
///
/// The shaft runs start → end with the tip at `end`; two tip segments leave
/// the end point at ±45° from the shaft direction.
fn draw_arrow(frame: &mut RgbImage, start: (i32, i32), end: (i32, i32), style: &ArrowStyle) {
    let factor = (1u32 << style.shift) as f32;

    let (sx, sy) = (start.0 as f32 / factor, start.1 as f32 / factor);
    let (ex, ey) = (end.0 as f32 / factor, end.1 as f32 / factor);

    draw_line_aa(frame, (sx, sy), (ex, ey), style.color);

    let shaft = ((sx - ex).powi(2) + (sy - ey).powi(2)).sqrt();
    if shaft <= f32::EPSILON {
        // Zero-length vector: the shaft already marked the single pixel.
        return;
    }

    let tip = style.tip_length * shaft;
    let back_angle = (sy - ey).atan2(sx - ex);
    for delta in [std::f32::consts::FRAC_PI_4, -std::f32::consts::FRAC_PI_4] {
        let angle = back_angle + delta;
        let px = ex + tip * angle.cos();
        let py = ey + tip * angle.sin();
        draw_line_aa(frame, (ex, ey), (px, py), style.color);
    }
}

/// Blend `color` into the pixel at `(x, y)` with the given coverage.
fn blend(frame: &mut RgbImage, x: i32, y: i32, color: Rgb<u8>, coverage: f32) {
    if x < 0 || y < 0 || x as u32 >= frame.width() || y as u32 >= frame.height() {
        return;
    }
    let coverage = coverage.clamp(0.0, 1.0);
    let pixel = frame.get_pixel_mut(x as u32, y as u32);
    for (channel, target) in pixel.0.iter_mut().zip(color.0) {
        let mixed = f32::from(*channel) * (1.0 - coverage) + f32::from(target) * coverage;
        *channel = mixed.round() as u8;
    }
}

fn fpart(value: f32) -> f32 {
    value - value.floor()
}

fn rfpart(value: f32) -> f32 {
    1.0 - fpart(value)
}

/// Xiaolin Wu's anti-aliased line between two fractional endpoints.
///
/// Fractional endpoints are what make the fixed-point sub-pixel coordinates
/// visible in the output: a quarter-pixel offset shifts the coverage split
/// between adjacent pixels.
fn draw_line_aa(frame: &mut RgbImage, from: (f32, f32), to: (f32, f32), color: Rgb<u8>) {
    let (mut x0, mut y0) = from;
    let (mut x1, mut y1) = to;

    let steep = (y1 - y0).abs() > (x1 - x0).abs();
    if steep {
        std::mem::swap(&mut x0, &mut y0);
        std::mem::swap(&mut x1, &mut y1);
    }
    if x0 > x1 {
        std::mem::swap(&mut x0, &mut x1);
        std::mem::swap(&mut y0, &mut y1);
    }

    let dx = x1 - x0;
    let gradient = if dx.abs() <= f32::EPSILON {
        1.0
    } else {
        (y1 - y0) / dx
    };

    let mut plot = |x: i32, y: i32, coverage: f32| {
        if steep {
            blend(frame, y, x, color, coverage);
        } else {
            blend(frame, x, y, color, coverage);
        }
    };

    // First endpoint.
    let xend = x0.round();
    let yend = y0 + gradient * (xend - x0);
    let xgap = rfpart(x0 + 0.5);
    let xpxl1 = xend as i32;
    let ypxl1 = yend.floor() as i32;
    plot(xpxl1, ypxl1, rfpart(yend) * xgap);
    plot(xpxl1, ypxl1 + 1, fpart(yend) * xgap);
    let mut intery = yend + gradient;

    // Second endpoint.
    let xend = x1.round();
    let yend = y1 + gradient * (xend - x1);
    let xgap = fpart(x1 + 0.5);
    let xpxl2 = xend as i32;
    let ypxl2 = yend.floor() as i32;
    plot(xpxl2, ypxl2, rfpart(yend) * xgap);
    plot(xpxl2, ypxl2 + 1, fpart(yend) * xgap);

    // Interior pixels.
    for x in (xpxl1 + 1)..xpxl2 {
        plot(x, intery.floor() as i32, rfpart(intery));
        plot(x, intery.floor() as i32 + 1, fpart(intery));
        intery += gradient;
    }
}
