//! End-to-end pipeline tests over a scripted frame source.

use std::collections::VecDeque;
use std::fs;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use image::RgbImage;
use mvextract::{
    CancellationToken, CodingType, DumpMode, ExtractionOptions, ExtractionPipeline, FrameSource,
    FrameUnit, MotionVectorRecord, StepCallback, StepInfo, codec,
};
use tempfile::TempDir;

/// A frame source that yields a pre-scripted unit sequence.
///
/// `read()` keeps returning `None` once the script is exhausted, matching
/// the post-terminal contract of the real video source.
struct ScriptedSource {
    units: VecDeque<FrameUnit>,
    releases: Arc<AtomicU32>,
}

impl ScriptedSource {
    fn new(units: Vec<FrameUnit>) -> (Self, Arc<AtomicU32>) {
        let releases = Arc::new(AtomicU32::new(0));
        (
            Self {
                units: units.into(),
                releases: releases.clone(),
            },
            releases,
        )
    }
}

impl FrameSource for ScriptedSource {
    fn read(&mut self) -> Option<FrameUnit> {
        self.units.pop_front()
    }

    fn release(&mut self) {
        self.releases.fetch_add(1, Ordering::SeqCst);
    }
}

fn record(dst_x: i32, dst_y: i32) -> MotionVectorRecord {
    MotionVectorRecord {
        source: -1,
        mb_w: 16,
        mb_h: 16,
        src_x: dst_x + 2,
        src_y: dst_y,
        dst_x,
        dst_y,
        motion_x: 8,
        motion_y: 0,
        motion_scale: 4,
    }
}

fn unit(timestamp: f64, coding_type: CodingType, vectors: Vec<MotionVectorRecord>) -> FrameUnit {
    FrameUnit {
        frame: RgbImage::new(32, 32),
        motion_vectors: vectors,
        coding_type,
        timestamp,
    }
}

/// Three frames where the middle one carries zero motion vectors.
fn three_frames() -> Vec<FrameUnit> {
    vec![
        unit(0.0, CodingType::I, vec![record(8, 8), record(16, 16)]),
        unit(0.04, CodingType::P, vec![]),
        unit(0.08, CodingType::B, vec![record(24, 8)]),
    ]
}

fn dump_options(root: &TempDir) -> ExtractionOptions {
    ExtractionOptions::new().with_dump(DumpMode::Explicit(root.path().join("out")))
}

fn read_lines(path: std::path::PathBuf) -> Vec<String> {
    fs::read_to_string(path)
        .expect("missing output file")
        .lines()
        .map(str::to_string)
        .collect()
}

// ── Full dump run ────────────────────────────────────────────────────

#[test]
fn dump_run_produces_the_full_layout() {
    let tmp = TempDir::new().unwrap();
    let (source, releases) = ScriptedSource::new(three_frames());

    let pipeline =
        ExtractionPipeline::with_source(source, "clips/sample.mp4", dump_options(&tmp)).unwrap();
    let layout = pipeline.session().layout().clone();
    let report = pipeline.run().unwrap();

    assert_eq!(report.frames, 3);
    assert!(report.average_read_time.is_some());
    assert_eq!(releases.load(Ordering::SeqCst), 1);

    // Cumulative event logs: one line per step, in step order.
    assert_eq!(read_lines(layout.root().join("timestamps.txt")), vec![
        "0", "0.04", "0.08"
    ]);
    assert_eq!(read_lines(layout.root().join("frame_types.txt")), vec![
        "I", "P", "B"
    ]);

    // Per-step artifacts keyed by the counter, starting at 0.
    for step in 0..3 {
        assert!(layout.json_path(step).exists(), "missing json {step}");
        assert!(layout.frame_path(step).exists(), "missing frame {step}");
        assert!(layout.vectors_path(step).exists(), "missing mvb {step}");
        assert!(layout.draw_log_path(step).exists(), "missing draw log {step}");
    }
    assert!(!layout.json_path(3).exists());

    // The zero-vector frame serializes to an empty array.
    let middle = fs::read_to_string(layout.json_path(1)).unwrap();
    assert_eq!(codec::deserialize(&middle).unwrap(), vec![]);
    assert_eq!(fs::read_to_string(layout.draw_log_path(1)).unwrap(), "");

    // The binary artifacts round-trip to the original records.
    let blob = fs::read(layout.vectors_path(0)).unwrap();
    assert_eq!(
        codec::load_binary(&blob).unwrap(),
        vec![record(8, 8), record(16, 16)]
    );
}

#[test]
fn json_round_trips_through_the_dumped_artifact() {
    let tmp = TempDir::new().unwrap();
    let (source, _) = ScriptedSource::new(three_frames());

    let pipeline =
        ExtractionPipeline::with_source(source, "clips/sample.mp4", dump_options(&tmp)).unwrap();
    let layout = pipeline.session().layout().clone();
    pipeline.run().unwrap();

    let json = fs::read_to_string(layout.json_path(2)).unwrap();
    assert_eq!(codec::deserialize(&json).unwrap(), vec![record(24, 8)]);
}

// ── Dump disabled ────────────────────────────────────────────────────

#[test]
fn disabled_dump_still_writes_json_and_draw_logs() {
    let tmp = TempDir::new().unwrap();
    let (source, _) = ScriptedSource::new(three_frames());

    // Disabled mode resolves a derived root; pin it inside the temp dir by
    // running with an explicit destination and dump off is not expressible,
    // so exercise the disabled branch through a source-derived location.
    let options = ExtractionOptions::new();
    let location = format!("{}/sample.mp4", tmp.path().display());
    let _guard = CurrentDirGuard::enter(tmp.path());

    let pipeline = ExtractionPipeline::with_source(source, &location, options).unwrap();
    let layout = pipeline.session().layout().clone();
    let report = pipeline.run().unwrap();

    assert_eq!(report.frames, 3);
    for step in 0..3 {
        assert!(layout.json_path(step).exists());
        assert!(layout.draw_log_path(step).exists());
        assert!(!layout.frame_path(step).exists(), "frame dumped unexpectedly");
        assert!(!layout.vectors_path(step).exists(), "mvb dumped unexpectedly");
    }
    assert!(!layout.root().join("timestamps.txt").exists());
    assert!(!layout.root().join("frame_types.txt").exists());
}

/// Serializes tests that change the process working directory.
struct CurrentDirGuard {
    previous: std::path::PathBuf,
    _lock: std::sync::MutexGuard<'static, ()>,
}

impl CurrentDirGuard {
    fn enter(dir: &std::path::Path) -> Self {
        static LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
        let lock = LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let previous = std::env::current_dir().unwrap();
        std::env::set_current_dir(dir).unwrap();
        Self {
            previous,
            _lock: lock,
        }
    }
}

impl Drop for CurrentDirGuard {
    fn drop(&mut self) {
        let _ = std::env::set_current_dir(&self.previous);
    }
}

// ── Termination paths ────────────────────────────────────────────────

#[test]
fn empty_stream_stops_cleanly_and_releases_once() {
    let tmp = TempDir::new().unwrap();
    let (source, releases) = ScriptedSource::new(vec![]);

    let pipeline =
        ExtractionPipeline::with_source(source, "clips/empty.mp4", dump_options(&tmp)).unwrap();
    let report = pipeline.run().unwrap();

    assert_eq!(report.frames, 0);
    assert_eq!(report.average_read_time, None);
    assert_eq!(releases.load(Ordering::SeqCst), 1);
}

#[test]
fn pre_cancelled_token_stops_before_the_first_read() {
    let tmp = TempDir::new().unwrap();
    let (source, releases) = ScriptedSource::new(three_frames());

    let token = CancellationToken::new();
    token.cancel();
    let options = dump_options(&tmp).with_stop(token);

    let pipeline =
        ExtractionPipeline::with_source(source, "clips/sample.mp4", options).unwrap();
    let report = pipeline.run().unwrap();

    assert_eq!(report.frames, 0);
    assert_eq!(releases.load(Ordering::SeqCst), 1);
}

/// Cancels the run from inside the first step callback.
struct CancelAfterFirst {
    token: CancellationToken,
}

impl StepCallback for CancelAfterFirst {
    fn on_step(&self, _info: &StepInfo) {
        self.token.cancel();
    }
}

#[test]
fn cancellation_mid_run_finishes_the_step_in_flight() {
    let tmp = TempDir::new().unwrap();
    let (source, releases) = ScriptedSource::new(three_frames());

    let token = CancellationToken::new();
    let options = dump_options(&tmp)
        .with_stop(token.clone())
        .with_step_callback(Arc::new(CancelAfterFirst { token }));

    let pipeline =
        ExtractionPipeline::with_source(source, "clips/sample.mp4", options).unwrap();
    let layout = pipeline.session().layout().clone();
    let report = pipeline.run().unwrap();

    assert_eq!(report.frames, 1);
    assert_eq!(releases.load(Ordering::SeqCst), 1);
    assert_eq!(read_lines(layout.root().join("timestamps.txt")), vec!["0"]);
}

#[test]
fn release_is_idempotent() {
    let (mut source, releases) = ScriptedSource::new(vec![]);
    source.release();
    source.release();
    assert_eq!(releases.load(Ordering::SeqCst), 2);

    // Reads after the terminal state keep returning None.
    assert!(source.read().is_none());
    assert!(source.read().is_none());
}

// ── Layout resolution ────────────────────────────────────────────────

#[test]
fn explicit_destination_is_never_pre_cleaned() {
    let tmp = TempDir::new().unwrap();
    let keep = tmp.path().join("out").join("keep.txt");
    fs::create_dir_all(keep.parent().unwrap()).unwrap();
    fs::write(&keep, "precious").unwrap();

    let (source, _) = ScriptedSource::new(vec![]);
    let pipeline =
        ExtractionPipeline::with_source(source, "clips/sample.mp4", dump_options(&tmp)).unwrap();
    pipeline.run().unwrap();

    assert_eq!(fs::read_to_string(&keep).unwrap(), "precious");
}

#[test]
fn default_root_derives_from_the_video_name() {
    assert_eq!(mvextract::video_stem("clips/traffic.mp4"), "traffic");
    assert_eq!(mvextract::video_stem("http://host/cam/feed.h264"), "feed");
    assert_eq!(mvextract::video_stem("bare"), "bare");

    let derived = DumpMode::Default.resolve_root("clips/traffic.mp4");
    assert_eq!(derived, std::path::Path::new("outputs").join("traffic"));
    assert_eq!(
        DumpMode::Explicit("elsewhere".into()).resolve_root("clips/traffic.mp4"),
        std::path::Path::new("elsewhere")
    );
}
