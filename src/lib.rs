//! # mvextract
//!
//! Extract per-macroblock motion vectors from compressed video streams,
//! frame by frame — without implementing a decoder.
//!
//! `mvextract` pulls decoded frames together with the motion vectors the
//! codec itself computed, powered by FFmpeg via the
//! [`ffmpeg-next`](https://crates.io/crates/ffmpeg-next) crate with
//! motion-vector export enabled. Each frame yields a typed record set that
//! can be drawn as an overlay, serialized to JSON, or persisted as a compact
//! binary array for numeric reprocessing — the compressed-domain motion
//! information that action recognition, compression research, and video
//! forensics work needs.
//!
//! ## Quick Start
//!
//! ### Iterate frames and motion vectors
//!
//! ```no_run
//! use mvextract::{FrameSource, VideoSource};
//!
//! let mut source = VideoSource::open("input.mp4").unwrap();
//! while let Some(unit) = source.read() {
//!     println!(
//!         "{} frame at {:.3}s with {} motion vectors",
//!         unit.coding_type,
//!         unit.timestamp,
//!         unit.motion_vectors.len(),
//!     );
//! }
//! ```
//!
//! ### Run the full pipeline
//!
//! ```no_run
//! use mvextract::{DumpMode, ExtractionOptions, ExtractionPipeline};
//!
//! let options = ExtractionOptions::new().with_dump(DumpMode::Default);
//! let report = ExtractionPipeline::open("input.mp4", options)
//!     .unwrap()
//!     .run()
//!     .unwrap();
//! println!("{} frames extracted", report.frames);
//! ```
//!
//! ### Serialize motion vectors
//!
//! ```
//! use mvextract::codec;
//!
//! let json = codec::serialize(&[]).unwrap();
//! assert_eq!(codec::deserialize(&json).unwrap(), vec![]);
//! ```
//!
//! ## Features
//!
//! - **Frame acquisition** — pull-based [`FrameSource`] over local files and
//!   network stream URLs; each pull yields pixels, records, coding type, and
//!   timestamp
//! - **Typed records** — [`MotionVectorRecord`] with validated invariants
//!   (nonzero motion scale, positive macroblock dimensions)
//! - **Overlay rendering** — anti-aliased arrows at fixed-point sub-pixel
//!   precision, drawn onto the frame buffer
//! - **Serialization** — exact-key JSON arrays plus a round-tripping binary
//!   array form (`.mvb`)
//! - **Orchestration** — [`ExtractionPipeline`] with per-step acquisition
//!   timing, an append-only timestamp/coding-type event log, cooperative
//!   stopping, and per-step callbacks
//!
//! ## Requirements
//!
//! FFmpeg development libraries must be installed on your system, built from
//! a codec set that supports `flags2=+export_mvs` (H.264/HEVC/MPEG-4 do).

pub mod codec;
pub mod error;
pub mod layout;
pub mod pipeline;
pub mod progress;
pub mod record;
pub mod render;
pub mod source;

pub use codec::BINARY_EXTENSION;
pub use error::MvExtractError;
pub use layout::{DumpMode, OutputLayout, video_stem};
pub use pipeline::{
    ExtractionOptions, ExtractionPipeline, ExtractionReport, ExtractionSession, PipelineState,
};
pub use progress::{CancellationToken, StepCallback, StepInfo};
pub use record::{CodingType, FrameUnit, MotionVectorRecord};
pub use render::ArrowStyle;
pub use source::{FrameSource, VideoSource, set_native_log_level};
