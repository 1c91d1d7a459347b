//! The motion-vector data model.
//!
//! This module defines [`MotionVectorRecord`], the canonical representation of
//! one macroblock's motion vector, [`CodingType`] for the frame's prediction
//! mode, and [`FrameUnit`], the result of pulling one decoded frame from a
//! [`FrameSource`](crate::FrameSource).

use std::fmt::{Display, Formatter, Result as FmtResult};

use ffmpeg_next::util::picture::Type as PictureType;
use ffmpeg_sys_next::AVMotionVector;
use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::error::MvExtractError;

/// One macroblock's motion vector, as exported by the codec.
///
/// Field order matters: it is the order used by the JSON and binary forms
/// produced by [`crate::codec`]. Coordinates are integer pixel positions of
/// macroblock centers; `motion_x`/`motion_y` are raw displacement components
/// that must be divided by `motion_scale` to obtain pixel units.
///
/// # Example
///
/// ```
/// use mvextract::MotionVectorRecord;
///
/// let record = MotionVectorRecord {
///     source: -1,
///     mb_w: 16,
///     mb_h: 16,
///     src_x: 104,
///     src_y: 50,
///     dst_x: 100,
///     dst_y: 50,
///     motion_x: 8,
///     motion_y: 0,
///     motion_scale: 4,
/// };
/// assert!(record.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MotionVectorRecord {
    /// Which reference frame the vector points into (-1 = past, 1 = future).
    pub source: i32,
    /// Macroblock width in pixels.
    pub mb_w: u16,
    /// Macroblock height in pixels.
    pub mb_h: u16,
    /// X coordinate of the macroblock center in the reference frame.
    pub src_x: i32,
    /// Y coordinate of the macroblock center in the reference frame.
    pub src_y: i32,
    /// X coordinate of the macroblock center in the current frame.
    pub dst_x: i32,
    /// Y coordinate of the macroblock center in the current frame.
    pub dst_y: i32,
    /// Raw horizontal displacement, in `1/motion_scale` pixel units.
    pub motion_x: i32,
    /// Raw vertical displacement, in `1/motion_scale` pixel units.
    pub motion_y: i32,
    /// Divisor normalizing `motion_x`/`motion_y` into pixels. Never zero in
    /// a valid record.
    pub motion_scale: i32,
}

impl MotionVectorRecord {
    /// Number of integer fields in the serialized forms.
    pub(crate) const FIELD_COUNT: usize = 10;

    /// Check the record's invariants.
    ///
    /// # Errors
    ///
    /// Returns [`MvExtractError::MalformedRecord`] when `motion_scale` is
    /// zero or either macroblock dimension is zero. Invalid records must be
    /// rejected or skipped, never divided through.
    pub fn validate(&self) -> Result<(), MvExtractError> {
        if self.motion_scale == 0 {
            return Err(MvExtractError::MalformedRecord {
                reason: "motion_scale must be nonzero".to_string(),
            });
        }
        if self.mb_w == 0 || self.mb_h == 0 {
            return Err(MvExtractError::MalformedRecord {
                reason: format!(
                    "macroblock dimensions must be positive (got {}x{})",
                    self.mb_w, self.mb_h
                ),
            });
        }
        Ok(())
    }

    /// The normalized displacement in pixel units, or `None` when the record
    /// carries a zero `motion_scale`.
    pub fn displacement(&self) -> Option<(f64, f64)> {
        if self.motion_scale == 0 {
            return None;
        }
        let scale = f64::from(self.motion_scale);
        Some((
            f64::from(self.motion_x) / scale,
            f64::from(self.motion_y) / scale,
        ))
    }
}

impl From<&AVMotionVector> for MotionVectorRecord {
    fn from(raw: &AVMotionVector) -> Self {
        Self {
            source: raw.source,
            mb_w: u16::from(raw.w),
            mb_h: u16::from(raw.h),
            src_x: i32::from(raw.src_x),
            src_y: i32::from(raw.src_y),
            dst_x: i32::from(raw.dst_x),
            dst_y: i32::from(raw.dst_y),
            motion_x: raw.motion_x,
            motion_y: raw.motion_y,
            motion_scale: i32::from(raw.motion_scale),
        }
    }
}

/// The prediction mode of a decoded frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodingType {
    /// Intra-coded (keyframe); carries no inter-frame motion.
    I,
    /// Forward-predicted.
    P,
    /// Bi-directionally predicted.
    B,
    /// Anything else (S/SI/SP/BI or unknown).
    Other,
}

impl CodingType {
    /// Map from FFmpeg's picture type.
    pub(crate) fn from_picture_type(kind: PictureType) -> Self {
        match kind {
            PictureType::I => CodingType::I,
            PictureType::P => CodingType::P,
            PictureType::B => CodingType::B,
            _ => CodingType::Other,
        }
    }
}

impl Display for CodingType {
    /// Single-character token, matching FFmpeg's `av_get_picture_type_char`
    /// convention (`?` for unclassified frames).
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let token = match self {
            CodingType::I => "I",
            CodingType::P => "P",
            CodingType::B => "B",
            CodingType::Other => "?",
        };
        f.write_str(token)
    }
}

/// The result of one pull from a [`FrameSource`](crate::FrameSource).
///
/// Constructed fresh on each successful `read()`; owned exclusively by the
/// caller. A frame with an empty `motion_vectors` sequence is valid — not
/// every frame yields vectors (I-frames typically yield none).
#[derive(Debug, Clone)]
pub struct FrameUnit {
    /// The decoded frame, RGB8.
    pub frame: RgbImage,
    /// Motion-vector records in decoder order.
    pub motion_vectors: Vec<MotionVectorRecord>,
    /// The frame's prediction mode.
    pub coding_type: CodingType,
    /// Presentation timestamp in stream seconds.
    pub timestamp: f64,
}
