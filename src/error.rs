//! Error types for the `mvextract` crate.
//!
//! This module defines [`MvExtractError`], the unified error type returned by
//! all fallible operations in the crate. Errors carry enough context to
//! diagnose the problem without additional logging at the call site.

use std::io::Error as IoError;

use ffmpeg_next::Error as FfmpegError;
use image::ImageError;
use thiserror::Error;

/// The unified error type for all `mvextract` operations.
///
/// Every public method that can fail returns `Result<T, MvExtractError>`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum MvExtractError {
    /// The video stream could not be opened.
    ///
    /// Fatal for the run: no extraction is attempted after an open failure,
    /// and there is no automatic retry.
    #[error("Failed to open video stream at {location}: {reason}")]
    StreamOpen {
        /// The path or URL that was passed to [`crate::VideoSource::open`].
        location: String,
        /// Underlying reason the open failed.
        reason: String,
    },

    /// The input does not contain a video stream.
    #[error("No video stream found in input")]
    NoVideoStream,

    /// A video frame could not be decoded.
    #[error("Failed to decode video frame: {0}")]
    DecodeError(String),

    /// A motion-vector record failed its invariants, or a serialized form
    /// could not be parsed back into records.
    ///
    /// Invalid data is rejected, never coerced into defaults.
    #[error("Malformed motion-vector record: {reason}")]
    MalformedRecord {
        /// What was wrong with the record or its serialized form.
        reason: String,
    },

    /// An error originating from the FFmpeg libraries.
    #[error("FFmpeg error: {0}")]
    FfmpegError(String),

    /// An I/O error occurred while reading or writing output artifacts.
    ///
    /// Treated as fatal by the extraction loop (disk full, permissions),
    /// unlike per-frame decode or serialization hiccups.
    #[error("I/O error: {0}")]
    IoError(#[from] IoError),

    /// An error from the `image` crate while encoding an annotated frame.
    #[error("Image processing error: {0}")]
    ImageError(#[from] ImageError),
}

impl From<FfmpegError> for MvExtractError {
    fn from(error: FfmpegError) -> Self {
        MvExtractError::FfmpegError(error.to_string())
    }
}

impl From<serde_json::Error> for MvExtractError {
    fn from(error: serde_json::Error) -> Self {
        MvExtractError::MalformedRecord {
            reason: error.to_string(),
        }
    }
}
