//! Serialized forms of motion-vector sequences.
//!
//! Two representations are produced per frame: a human-readable JSON array of
//! objects (one object per record, keys in declaration order), and a compact
//! little-endian binary array (`.mvb`) for numeric reprocessing. Both
//! round-trip exactly — integers carry no precision loss.
//!
//! # Example
//!
//! ```
//! use mvextract::{codec, MotionVectorRecord};
//!
//! let records = vec![MotionVectorRecord {
//!     source: -1, mb_w: 16, mb_h: 16,
//!     src_x: 104, src_y: 50, dst_x: 100, dst_y: 50,
//!     motion_x: 8, motion_y: 0, motion_scale: 4,
//! }];
//!
//! let json = codec::serialize(&records)?;
//! assert_eq!(codec::deserialize(&json)?, records);
//!
//! let blob = codec::persist_binary(&records);
//! assert_eq!(codec::load_binary(&blob)?, records);
//! # Ok::<(), mvextract::MvExtractError>(())
//! ```

use crate::error::MvExtractError;
use crate::record::MotionVectorRecord;

/// File extension used for persisted binary motion-vector arrays.
pub const BINARY_EXTENSION: &str = "mvb";

/// Serialize records to a JSON array of objects.
///
/// Keys and their order match the [`MotionVectorRecord`] field declaration
/// (`source`, `mb_w`, `mb_h`, `src_x`, `src_y`, `dst_x`, `dst_y`,
/// `motion_x`, `motion_y`, `motion_scale`). An empty slice serializes to a
/// well-formed empty array.
///
/// This is a pure function; writing the text anywhere is the caller's
/// responsibility.
///
/// # Errors
///
/// Returns [`MvExtractError::MalformedRecord`] if serialization fails
/// (practically unreachable for integer fields).
pub fn serialize(records: &[MotionVectorRecord]) -> Result<String, MvExtractError> {
    Ok(serde_json::to_string_pretty(records)?)
}

/// Parse a JSON array of objects back into records.
///
/// Parsing is strict: unknown keys, missing fields, and type mismatches are
/// all rejected, and every parsed record is re-validated. Invalid input is
/// never patched up with default values.
///
/// # Errors
///
/// Returns [`MvExtractError::MalformedRecord`] on any parse or invariant
/// failure.
pub fn deserialize(text: &str) -> Result<Vec<MotionVectorRecord>, MvExtractError> {
    let records: Vec<MotionVectorRecord> = serde_json::from_str(text)?;
    for record in &records {
        record.validate()?;
    }
    Ok(records)
}

/// Persist records as a little-endian binary array.
///
/// Layout: a `u32` record count, then ten `i32` values per record in field
/// declaration order. `load_binary(persist_binary(r)) == r` for all valid
/// record sequences.
pub fn persist_binary(records: &[MotionVectorRecord]) -> Vec<u8> {
    let mut blob =
        Vec::with_capacity(4 + records.len() * MotionVectorRecord::FIELD_COUNT * 4);
    blob.extend_from_slice(&(records.len() as u32).to_le_bytes());

    for record in records {
        let fields = [
            record.source,
            i32::from(record.mb_w),
            i32::from(record.mb_h),
            record.src_x,
            record.src_y,
            record.dst_x,
            record.dst_y,
            record.motion_x,
            record.motion_y,
            record.motion_scale,
        ];
        for field in fields {
            blob.extend_from_slice(&field.to_le_bytes());
        }
    }

    blob
}

/// Load records from a blob previously produced by [`persist_binary`].
///
/// # Errors
///
/// Returns [`MvExtractError::MalformedRecord`] when the blob is truncated,
/// carries trailing bytes, declares a count that does not match its length,
/// holds macroblock dimensions outside `u16` range, or contains a record
/// that fails validation.
pub fn load_binary(blob: &[u8]) -> Result<Vec<MotionVectorRecord>, MvExtractError> {
    let header: [u8; 4] = blob
        .get(..4)
        .and_then(|bytes| bytes.try_into().ok())
        .ok_or_else(|| MvExtractError::MalformedRecord {
            reason: "binary array shorter than its count header".to_string(),
        })?;
    let count = u32::from_le_bytes(header) as usize;

    let body = &blob[4..];
    let record_size = MotionVectorRecord::FIELD_COUNT * 4;
    if body.len() != count * record_size {
        return Err(MvExtractError::MalformedRecord {
            reason: format!(
                "binary array length mismatch: {} records declared, {} bytes of data",
                count,
                body.len()
            ),
        });
    }

    let mut records = Vec::with_capacity(count);
    for chunk in body.chunks_exact(record_size) {
        let mut fields = [0i32; MotionVectorRecord::FIELD_COUNT];
        for (field, bytes) in fields.iter_mut().zip(chunk.chunks_exact(4)) {
            // chunks_exact(4) guarantees the conversion succeeds.
            *field = i32::from_le_bytes(bytes.try_into().unwrap_or_default());
        }

        let mb_w = u16::try_from(fields[1]).map_err(|_| MvExtractError::MalformedRecord {
            reason: format!("macroblock width {} out of range", fields[1]),
        })?;
        let mb_h = u16::try_from(fields[2]).map_err(|_| MvExtractError::MalformedRecord {
            reason: format!("macroblock height {} out of range", fields[2]),
        })?;

        let record = MotionVectorRecord {
            source: fields[0],
            mb_w,
            mb_h,
            src_x: fields[3],
            src_y: fields[4],
            dst_x: fields[5],
            dst_y: fields[6],
            motion_x: fields[7],
            motion_y: fields[8],
            motion_scale: fields[9],
        };
        record.validate()?;
        records.push(record);
    }

    Ok(records)
}
