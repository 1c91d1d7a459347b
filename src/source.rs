//! Frame acquisition from compressed video streams.
//!
//! [`VideoSource`] opens a local file or network stream URL with FFmpeg,
//! decodes it frame by frame with motion-vector export enabled
//! (`flags2=+export_mvs`), and yields one [`FrameUnit`] per decoded frame:
//! the RGB pixels, the frame's motion-vector records, its coding type, and
//! its presentation timestamp.
//!
//! The [`FrameSource`] trait is the narrow boundary to the decoding
//! subsystem; everything downstream of it (rendering, serialization, the
//! extraction loop) never inspects the compressed bitstream.
//!
//! # Example
//!
//! ```no_run
//! use mvextract::{FrameSource, VideoSource};
//!
//! let mut source = VideoSource::open("input.mp4")?;
//! while let Some(unit) = source.read() {
//!     println!(
//!         "{} at {:.3}s: {} motion vectors",
//!         unit.coding_type,
//!         unit.timestamp,
//!         unit.motion_vectors.len()
//!     );
//! }
//! source.release();
//! # Ok::<(), mvextract::MvExtractError>(())
//! ```

use std::slice;

use ffmpeg_next::{
    Packet, Rational,
    codec::context::Context as CodecContext,
    decoder::Video as VideoDecoder,
    format::{Pixel, context::Input},
    frame::Video as VideoFrame,
    media::Type as MediaType,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
    util::frame::side_data::Type as SideDataType,
    util::log::Level as NativeLevel,
};
use ffmpeg_sys_next::AVMotionVector;
use image::RgbImage;
use log::{debug, warn};

use crate::error::MvExtractError;
use crate::record::{CodingType, FrameUnit, MotionVectorRecord};

/// A pull-based source of decoded frames and their motion vectors.
///
/// This is the decoder-capability boundary: a plain stateful handle with
/// explicit read/release semantics and no view into the bitstream.
///
/// Contract:
/// - `read()` blocks on I/O and decode, returns `None` at end-of-stream or
///   after an unrecoverable decode error, and keeps returning `None` once
///   the terminal state is reached.
/// - `release()` is idempotent and safe to call at any point. Implementations
///   also release on drop; an explicit call simply makes the point of
///   release deterministic.
/// - Sources are not thread-safe by contract: one reader at a time.
pub trait FrameSource {
    /// Decode and return the next frame, or `None` when the stream is done.
    fn read(&mut self) -> Option<FrameUnit>;

    /// Release the underlying decode resources.
    fn release(&mut self);
}

/// Set the verbosity of FFmpeg's own stderr logging.
///
/// FFmpeg's native log output is separate from the Rust `log` facade; left
/// at its default it prints codec warnings mid-extraction. Non-verbose runs
/// suppress everything below error severity.
pub fn set_native_log_level(verbose: bool) {
    let level = if verbose {
        NativeLevel::Info
    } else {
        NativeLevel::Error
    };
    ffmpeg_next::util::log::set_level(level);
}

/// An FFmpeg-backed [`FrameSource`].
///
/// Owns the demuxer and decoder for its lifetime. Created with
/// [`open`](VideoSource::open); resources are released by
/// [`release`](FrameSource::release) or on drop, whichever comes first.
pub struct VideoSource {
    inner: Option<SourceState>,
    done: bool,
}

struct SourceState {
    input: Input,
    decoder: VideoDecoder,
    scaler: ScalingContext,
    stream_index: usize,
    time_base: Rational,
    width: u32,
    height: u32,
    decoded: VideoFrame,
    scaled: VideoFrame,
    eof_sent: bool,
}

impl VideoSource {
    /// Open a local path or network stream URL for decoding.
    ///
    /// Locates the best video stream and opens its decoder with
    /// motion-vector export enabled. Open failures are fatal for the run:
    /// the caller reports the error and exits, there is no retry here.
    ///
    /// # Errors
    ///
    /// - [`MvExtractError::StreamOpen`] if the location cannot be opened or
    ///   the decoder cannot be initialised.
    /// - [`MvExtractError::NoVideoStream`] if the input has no video stream.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use mvextract::VideoSource;
    ///
    /// let source = VideoSource::open("rtsp://camera.local/stream")?;
    /// # Ok::<(), mvextract::MvExtractError>(())
    /// ```
    pub fn open(location: &str) -> Result<Self, MvExtractError> {
        ffmpeg_next::init().map_err(|error| MvExtractError::StreamOpen {
            location: location.to_string(),
            reason: format!("FFmpeg initialisation failed: {error}"),
        })?;

        let input =
            ffmpeg_next::format::input(&location).map_err(|error| MvExtractError::StreamOpen {
                location: location.to_string(),
                reason: error.to_string(),
            })?;

        let (stream_index, time_base, parameters) = {
            let stream = input
                .streams()
                .best(MediaType::Video)
                .ok_or(MvExtractError::NoVideoStream)?;
            (stream.index(), stream.time_base(), stream.parameters())
        };

        let mut decoder_context =
            CodecContext::from_parameters(parameters).map_err(|error| {
                MvExtractError::StreamOpen {
                    location: location.to_string(),
                    reason: format!("Failed to read video codec parameters: {error}"),
                }
            })?;

        // Ask the decoder to attach per-frame motion-vector side data. The
        // flag has no safe accessor, so it is set on the raw context before
        // the codec is opened.
        unsafe {
            (*decoder_context.as_mut_ptr()).flags2 |=
                ffmpeg_sys_next::AV_CODEC_FLAG2_EXPORT_MVS as i32;
        }

        let decoder = decoder_context.decoder().video().map_err(|error| {
            MvExtractError::StreamOpen {
                location: location.to_string(),
                reason: format!("Failed to open video decoder: {error}"),
            }
        })?;

        let width = decoder.width();
        let height = decoder.height();

        // Source pixel format → RGB24 at the native resolution.
        let scaler = ScalingContext::get(
            decoder.format(),
            width,
            height,
            Pixel::RGB24,
            width,
            height,
            ScalingFlags::BILINEAR,
        )
        .map_err(|error| MvExtractError::StreamOpen {
            location: location.to_string(),
            reason: format!("Failed to set up pixel-format conversion: {error}"),
        })?;

        debug!("opened {location}: stream {stream_index}, {width}x{height}");

        Ok(Self {
            inner: Some(SourceState {
                input,
                decoder,
                scaler,
                stream_index,
                time_base,
                width,
                height,
                decoded: VideoFrame::empty(),
                scaled: VideoFrame::empty(),
                eof_sent: false,
            }),
            done: false,
        })
    }
}

impl FrameSource for VideoSource {
    /// Decode the next frame together with its motion vectors.
    ///
    /// Reads and feeds packets until the decoder produces a frame, then
    /// converts it: pixels are scaled to RGB8, `MOTION_VECTORS` side data is
    /// mapped into [`MotionVectorRecord`]s (frames without side data yield
    /// an empty sequence, which is valid), and the timestamp is rescaled to
    /// stream seconds.
    ///
    /// End-of-stream and decode failures both end the stream: this method
    /// returns `None` and every subsequent call returns `None` as well.
    fn read(&mut self) -> Option<FrameUnit> {
        if self.done {
            return None;
        }
        let Some(state) = self.inner.as_mut() else {
            self.done = true;
            return None;
        };

        loop {
            // Drain frames the decoder has already produced.
            if state.decoder.receive_frame(&mut state.decoded).is_ok() {
                match state.unit_from_decoded() {
                    Ok(unit) => return Some(unit),
                    Err(error) => {
                        warn!("stopping stream after frame conversion failure: {error}");
                        self.done = true;
                        return None;
                    }
                }
            }

            if state.eof_sent {
                // Decoder fully drained after EOF.
                self.done = true;
                return None;
            }

            let mut packet = Packet::empty();
            match packet.read(&mut state.input) {
                Ok(()) => {
                    if packet.stream() == state.stream_index {
                        if let Err(error) = state.decoder.send_packet(&packet) {
                            warn!("stopping stream after decode error: {error}");
                            self.done = true;
                            return None;
                        }
                    }
                    // Packets of other streams are silently skipped.
                }
                Err(ffmpeg_next::Error::Eof) => {
                    if let Err(error) = state.decoder.send_eof() {
                        debug!("flushing decoder at end of stream failed: {error}");
                        self.done = true;
                        return None;
                    }
                    state.eof_sent = true;
                }
                Err(error) => {
                    // Transient demuxer error; try the next packet.
                    debug!("skipping unreadable packet: {error}");
                }
            }
        }
    }

    /// Drop the demuxer and decoder. Safe to call repeatedly, and safe to
    /// call on a source whose stream already ended.
    fn release(&mut self) {
        if self.inner.take().is_some() {
            debug!("released video source");
        }
        self.done = true;
    }
}

impl SourceState {
    /// Convert the currently decoded frame into a [`FrameUnit`].
    fn unit_from_decoded(&mut self) -> Result<FrameUnit, MvExtractError> {
        let (width, height) = (self.width, self.height);
        self.scaler.run(&self.decoded, &mut self.scaled)?;

        let buffer = rgb_buffer(&self.scaled, width, height);
        let frame = RgbImage::from_raw(width, height, buffer).ok_or_else(|| {
            MvExtractError::DecodeError(
                "Failed to construct RGB image from decoded frame data".to_string(),
            )
        })?;

        let timestamp_units = self
            .decoded
            .timestamp()
            .or_else(|| self.decoded.pts())
            .unwrap_or(0);

        Ok(FrameUnit {
            frame,
            motion_vectors: motion_vector_records(&self.decoded),
            coding_type: CodingType::from_picture_type(self.decoded.kind()),
            timestamp: pts_to_seconds(timestamp_units, self.time_base),
        })
    }
}

/// Extract motion-vector records from a frame's side data, in decoder order.
///
/// Frames without `MOTION_VECTORS` side data (I-frames, codecs without
/// export support) yield an empty vector set.
fn motion_vector_records(frame: &VideoFrame) -> Vec<MotionVectorRecord> {
    for side_data in frame.side_data() {
        if side_data.kind() != SideDataType::MotionVectors {
            continue;
        }
        let data = side_data.data();
        let count = data.len() / std::mem::size_of::<AVMotionVector>();
        // SAFETY: FFmpeg documents MOTION_VECTORS side data as an array of
        // AVMotionVector; the slice lives as long as the borrowed frame.
        let raw =
            unsafe { slice::from_raw_parts(data.as_ptr().cast::<AVMotionVector>(), count) };
        return raw.iter().map(MotionVectorRecord::from).collect();
    }
    Vec::new()
}

/// Copy pixel data from a scaled frame into a tightly-packed RGB buffer.
///
/// FFmpeg frames frequently carry per-row padding (stride > width × 3);
/// the padding is stripped so the result can go straight into
/// [`RgbImage::from_raw`].
fn rgb_buffer(frame: &VideoFrame, width: u32, height: u32) -> Vec<u8> {
    let stride = frame.stride(0);
    let row_bytes = (width as usize) * 3;
    let data = frame.data(0);

    if stride == row_bytes {
        data[..row_bytes * (height as usize)].to_vec()
    } else {
        let mut buffer = Vec::with_capacity(row_bytes * (height as usize));
        for row in 0..(height as usize) {
            let start = row * stride;
            buffer.extend_from_slice(&data[start..start + row_bytes]);
        }
        buffer
    }
}

/// Rescale a PTS value from the stream time base to seconds.
fn pts_to_seconds(pts: i64, time_base: Rational) -> f64 {
    pts as f64 * f64::from(time_base.numerator()) / f64::from(time_base.denominator())
}
