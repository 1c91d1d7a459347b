//! Arrow geometry and overlay drawing tests.

use image::RgbImage;
use mvextract::{ArrowStyle, MotionVectorRecord, render};

fn record(dst_x: i32, dst_y: i32, motion_x: i32, motion_y: i32, motion_scale: i32) -> MotionVectorRecord {
    MotionVectorRecord {
        source: -1,
        mb_w: 16,
        mb_h: 16,
        src_x: dst_x,
        src_y: dst_y,
        dst_x,
        dst_y,
        motion_x,
        motion_y,
        motion_scale,
    }
}

// ── Fixed-point geometry ─────────────────────────────────────────────

#[test]
fn arrow_points_worked_example() {
    // dst (100, 50), motion (8, 0), scale 4, shift 2 (factor 4):
    // end = dst × 4 = (400, 200); start = (100 + 8/4, 50) × 4 = (408, 200).
    let (start, end) = render::arrow_points(&record(100, 50, 8, 0, 4), 2).unwrap();
    assert_eq!(end, (400, 200));
    assert_eq!(start, (408, 200));
}

#[test]
fn arrow_points_round_half_up() {
    // (1 + 1/8) × 4 = 4.5 rounds up to 5.
    let (start, _) = render::arrow_points(&record(1, 0, 1, 0, 8), 2).unwrap();
    assert_eq!(start.0, 5);

    // (0 - 6/16) × 4 = -1.5 rounds up (toward positive) to -1.
    let (start, _) = render::arrow_points(&record(0, 0, -6, 0, 16), 2).unwrap();
    assert_eq!(start.0, -1);
}

#[test]
fn arrow_points_respects_shift() {
    let (start, end) = render::arrow_points(&record(10, 10, 4, 0, 4), 0).unwrap();
    assert_eq!(end, (10, 10));
    assert_eq!(start, (11, 10));

    let (_, end) = render::arrow_points(&record(10, 10, 4, 0, 4), 3).unwrap();
    assert_eq!(end, (80, 80));
}

#[test]
fn zero_scale_yields_no_points() {
    assert!(render::arrow_points(&record(100, 50, 8, 0, 0), 2).is_none());
}

// ── Drawing ──────────────────────────────────────────────────────────

#[test]
fn drawing_touches_pixels_along_the_shaft() {
    let mut frame = RgbImage::new(64, 64);
    let records = [record(8, 8, 16, 0, 4)]; // start (12, 8) → end (8, 8) in pixels
    render::draw_motion_vectors(&mut frame, &records, &ArrowStyle::default(), None);

    // The shaft runs along y = 8 between x = 8 and x = 12.
    let pixel = frame.get_pixel(10, 8);
    assert_eq!(pixel.0, [255, 0, 0], "expected a fully covered red pixel");

    // Far-away pixels are untouched.
    assert_eq!(frame.get_pixel(40, 40).0, [0, 0, 0]);
}

#[test]
fn zero_scale_records_are_skipped_when_drawing() {
    let mut frame = RgbImage::new(32, 32);
    let mut log = String::new();
    let records = [record(8, 8, 4, 4, 0)];
    render::draw_motion_vectors(&mut frame, &records, &ArrowStyle::default(), Some(&mut log));

    assert!(log.is_empty(), "skipped record must not be logged");
    assert!(frame.pixels().all(|pixel| pixel.0 == [0, 0, 0]));
}

#[test]
fn zero_length_vectors_do_not_panic() {
    let mut frame = RgbImage::new(16, 16);
    let records = [record(5, 5, 0, 0, 4)];
    render::draw_motion_vectors(&mut frame, &records, &ArrowStyle::default(), None);

    // A degenerate arrow still marks its single pixel (partial coverage at
    // the shared endpoint).
    let pixel = frame.get_pixel(5, 5);
    assert!(pixel.0[0] > 0, "endpoint pixel should carry some red");
    assert_eq!(pixel.0[1], 0);
    assert_eq!(pixel.0[2], 0);
}

#[test]
fn out_of_bounds_arrows_are_clipped_silently() {
    let mut frame = RgbImage::new(8, 8);
    let records = [record(100, 100, 400, 0, 1)];
    render::draw_motion_vectors(&mut frame, &records, &ArrowStyle::default(), None);
}

// ── Draw log ─────────────────────────────────────────────────────────

#[test]
fn draw_log_lines_match_input_order() {
    let mut frame = RgbImage::new(64, 64);
    let mut log = String::new();
    let records = [record(8, 8, 16, 0, 4), record(4, 4, 0, 16, 4)];
    render::draw_motion_vectors(&mut frame, &records, &ArrowStyle::default(), Some(&mut log));

    let lines: Vec<&str> = log.lines().collect();
    assert_eq!(lines, vec!["(48, 32), (32, 32)", "(16, 32), (16, 16)"]);
}
