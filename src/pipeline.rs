//! The extraction pipeline.
//!
//! [`ExtractionPipeline`] drives the acquisition loop: pull a frame, time the
//! pull, serialize and render its motion vectors, persist the artifacts, and
//! repeat until the source is exhausted or a stop is requested. It composes
//! any [`FrameSource`] with the codec, the renderer, and the output layout.
//!
//! # Example
//!
//! ```no_run
//! use mvextract::{DumpMode, ExtractionOptions, ExtractionPipeline};
//!
//! let options = ExtractionOptions::new().with_dump(DumpMode::Default);
//! let pipeline = ExtractionPipeline::open("traffic.mp4", options)?;
//! let report = pipeline.run()?;
//! println!("processed {} frames", report.frames);
//! # Ok::<(), mvextract::MvExtractError>(())
//! ```

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::fs;
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::codec;
use crate::error::MvExtractError;
use crate::layout::{DumpMode, OutputLayout};
use crate::progress::{CancellationToken, StepCallback, StepInfo};
use crate::record::FrameUnit;
use crate::render::{self, ArrowStyle};
use crate::source::{FrameSource, VideoSource};

/// Configuration for one extraction run.
///
/// Resolved once at pipeline construction; the loop itself never re-reads
/// flags. All fields have defaults — a default-constructed value extracts
/// without full persistence, with the standard arrow style, and with no stop
/// token or callback attached.
#[derive(Clone, Default)]
pub struct ExtractionOptions {
    pub(crate) dump: DumpMode,
    pub(crate) style: ArrowStyle,
    pub(crate) stop: Option<CancellationToken>,
    pub(crate) on_step: Option<Arc<dyn StepCallback>>,
}

impl Debug for ExtractionOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("ExtractionOptions")
            .field("dump", &self.dump)
            .field("style", &self.style)
            .field("has_stop", &self.stop.is_some())
            .field("has_on_step", &self.on_step.is_some())
            .finish()
    }
}

impl ExtractionOptions {
    /// Create options with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the dump mode (see [`DumpMode`]).
    #[must_use]
    pub fn with_dump(mut self, dump: DumpMode) -> Self {
        self.dump = dump;
        self
    }

    /// Set the overlay arrow style.
    #[must_use]
    pub fn with_style(mut self, style: ArrowStyle) -> Self {
        self.style = style;
        self
    }

    /// Attach a stop token. When cancelled, the loop finishes the step in
    /// flight and transitions to `Stopped`.
    #[must_use]
    pub fn with_stop(mut self, token: CancellationToken) -> Self {
        self.stop = Some(token);
        self
    }

    /// Attach a per-step callback.
    #[must_use]
    pub fn with_step_callback(mut self, callback: Arc<dyn StepCallback>) -> Self {
        self.on_step = Some(callback);
        self
    }
}

/// The pipeline's lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// Constructed, source not yet opened.
    Idle,
    /// Opening the frame source.
    Opening,
    /// Pulling and processing frames.
    Streaming,
    /// Terminal: the source has been released.
    Stopped,
}

/// Per-run mutable state: the output tree, the step counter, and the
/// acquisition timings.
///
/// Created at pipeline start, advanced once per iteration, discarded with
/// the pipeline. Nothing persists across runs.
#[derive(Debug)]
pub struct ExtractionSession {
    layout: OutputLayout,
    read_times: Vec<Duration>,
    step: u64,
}

impl ExtractionSession {
    fn new(layout: OutputLayout) -> Self {
        Self {
            layout,
            read_times: Vec::new(),
            step: 0,
        }
    }

    /// The output layout this session writes into.
    pub fn layout(&self) -> &OutputLayout {
        &self.layout
    }

    /// The next step number (equals the number of frames processed so far).
    pub fn step(&self) -> u64 {
        self.step
    }

    /// Per-step acquisition times, in step order.
    pub fn read_times(&self) -> &[Duration] {
        &self.read_times
    }

    fn average_read_time(&self) -> Option<Duration> {
        let count = u32::try_from(self.read_times.len()).ok().filter(|&n| n > 0)?;
        Some(self.read_times.iter().sum::<Duration>() / count)
    }
}

/// Summary of a completed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractionReport {
    /// Frames successfully pulled and processed.
    pub frames: u64,
    /// Wall-clock duration of the whole run.
    pub elapsed: Duration,
    /// Mean time spent inside `read()` per frame, if any frame was read.
    pub average_read_time: Option<Duration>,
}

/// Drives acquisition, rendering, and persistence for one source.
///
/// Lifecycle: `Idle → Opening → Streaming → Stopped`. `Stopped` is reached
/// on stream exhaustion (normal), an explicit stop request, or a fatal
/// error; on every path the source is released exactly once.
pub struct ExtractionPipeline<S: FrameSource> {
    source: S,
    options: ExtractionOptions,
    session: ExtractionSession,
    state: PipelineState,
}

impl ExtractionPipeline<VideoSource> {
    /// Prepare the output layout and open a video source for `location`.
    ///
    /// # Errors
    ///
    /// - [`MvExtractError::IoError`] if the output tree cannot be prepared.
    /// - [`MvExtractError::StreamOpen`] / [`MvExtractError::NoVideoStream`]
    ///   if the source cannot be opened — fatal, nothing is extracted.
    pub fn open(
        location: &str,
        options: ExtractionOptions,
    ) -> Result<Self, MvExtractError> {
        let layout = OutputLayout::prepare(&options.dump, location)?;
        let source = VideoSource::open(location)?;
        Ok(Self {
            source,
            options,
            session: ExtractionSession::new(layout),
            state: PipelineState::Streaming,
        })
    }
}

impl<S: FrameSource> ExtractionPipeline<S> {
    /// Build a pipeline over an already-opened frame source.
    ///
    /// The layout root comes from the dump mode's resolution against
    /// `location`; pass an explicit [`DumpMode::Explicit`] destination to
    /// pin it. This is the entry point for alternative capabilities
    /// (prerecorded fixtures, synthetic sources in tests).
    ///
    /// # Errors
    ///
    /// Returns [`MvExtractError::IoError`] if the output tree cannot be
    /// prepared.
    pub fn with_source(
        source: S,
        location: &str,
        options: ExtractionOptions,
    ) -> Result<Self, MvExtractError> {
        let layout = OutputLayout::prepare(&options.dump, location)?;
        Ok(Self {
            source,
            options,
            session: ExtractionSession::new(layout),
            state: PipelineState::Streaming,
        })
    }

    /// The current lifecycle state.
    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// The session state accumulated so far.
    pub fn session(&self) -> &ExtractionSession {
        &self.session
    }

    /// Run the acquisition loop to completion.
    ///
    /// Each iteration times the `read()` call alone with a monotonic clock,
    /// then processes the unit: serialize the records to `json/<step>.json`,
    /// draw the overlay and its coordinate log, and — when dumping — save
    /// the annotated JPEG, the binary array, and the timestamp/coding-type
    /// appends. Per-frame rendering or serialization failures are logged
    /// and skipped; I/O failures (disk full and kin) abort the run.
    ///
    /// The source is released exactly once, whichever way the loop exits.
    ///
    /// # Errors
    ///
    /// Returns the first fatal error ([`MvExtractError::IoError`] or
    /// [`MvExtractError::ImageError`] from persisting artifacts).
    pub fn run(mut self) -> Result<ExtractionReport, MvExtractError> {
        let started = Instant::now();
        let outcome = self.stream();

        self.source.release();
        self.state = PipelineState::Stopped;
        outcome?;

        if self.session.step == 0 {
            warn!("stream ended before a single frame was decoded; check the input location");
        }

        let report = ExtractionReport {
            frames: self.session.step,
            elapsed: started.elapsed(),
            average_read_time: self.session.average_read_time(),
        };
        info!(
            "extraction finished: {} frames in {:.2?} (average read {:.2?})",
            report.frames,
            report.elapsed,
            report.average_read_time.unwrap_or_default()
        );
        Ok(report)
    }

    fn stream(&mut self) -> Result<(), MvExtractError> {
        loop {
            if self
                .options
                .stop
                .as_ref()
                .is_some_and(CancellationToken::is_cancelled)
            {
                debug!("stop requested; ending extraction");
                return Ok(());
            }

            let read_started = Instant::now();
            let unit = self.source.read();
            let read_time = read_started.elapsed();

            let Some(unit) = unit else {
                debug!("stream exhausted after {} frames", self.session.step);
                return Ok(());
            };
            self.session.read_times.push(read_time);

            match self.process(unit, read_time) {
                Ok(()) => {}
                Err(fatal @ (MvExtractError::IoError(_) | MvExtractError::ImageError(_))) => {
                    return Err(fatal);
                }
                Err(error) => {
                    warn!("skipping frame {}: {error}", self.session.step);
                }
            }

            self.session.step += 1;
        }
    }

    /// Process one frame unit: render, serialize, persist, notify.
    fn process(&mut self, mut unit: FrameUnit, read_time: Duration) -> Result<(), MvExtractError> {
        let step = self.session.step;
        let layout = &self.session.layout;

        // Serialized array and overlay are produced on every step.
        let json = codec::serialize(&unit.motion_vectors)?;
        fs::write(layout.json_path(step), json)?;

        let mut draw_log = String::new();
        render::draw_motion_vectors(
            &mut unit.frame,
            &unit.motion_vectors,
            &self.options.style,
            Some(&mut draw_log),
        );
        fs::write(layout.draw_log_path(step), draw_log)?;

        if self.options.dump.is_enabled() {
            unit.frame.save(layout.frame_path(step))?;
            fs::write(
                layout.vectors_path(step),
                codec::persist_binary(&unit.motion_vectors),
            )?;
            layout.append_timestamp(unit.timestamp)?;
            layout.append_coding_type(unit.coding_type)?;
        }

        debug!(
            "step {step}: timestamp {:.4} | type {} | {} motion vectors | read {:.2?}",
            unit.timestamp,
            unit.coding_type,
            unit.motion_vectors.len(),
            read_time
        );

        if let Some(callback) = &self.options.on_step {
            callback.on_step(&StepInfo {
                step,
                timestamp: unit.timestamp,
                coding_type: unit.coding_type,
                motion_vector_count: unit.motion_vectors.len(),
                read_time,
            });
        }

        Ok(())
    }
}
