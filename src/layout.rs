//! Output directory layout and dump configuration.
//!
//! All per-step artifacts land in a single tree rooted at the destination
//! path:
//!
//! ```text
//! <root>/
//!   frames/frame-<step>.jpg        annotated frame (dump only)
//!   motion_vectors/mvs-<step>.mvb  persisted binary array (dump only)
//!   motion_vectors/draw-<step>.txt arrow coordinate log
//!   json/<step>.json               serialized motion-vector array
//!   timestamps.txt                 append-only, one timestamp per line
//!   frame_types.txt                append-only, one coding type per line
//! ```
//!
//! The two cumulative logs are a simple durable event log: each append opens
//! the file, writes one line, flushes, and closes, so the tree is consistent
//! at every iteration boundary even if the process dies mid-run.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use log::info;

use crate::codec::BINARY_EXTENSION;
use crate::error::MvExtractError;
use crate::record::CodingType;

/// Where (and whether) to persist the full output layout.
///
/// Resolved once at startup; the extraction loop never re-examines flags.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DumpMode {
    /// No full persistence. The layout root is still resolved and receives
    /// the per-step JSON and draw logs.
    #[default]
    Disabled,
    /// Persist everything under a directory derived from the source name
    /// (`outputs/<video-stem>`). An existing derived directory from a
    /// previous run is removed wholesale before extraction starts.
    Default,
    /// Persist everything under an explicitly chosen directory. Never
    /// pre-cleaned.
    Explicit(PathBuf),
}

impl DumpMode {
    /// Whether full persistence (frames, binary arrays, cumulative logs)
    /// is enabled.
    pub fn is_enabled(&self) -> bool {
        !matches!(self, DumpMode::Disabled)
    }

    /// The output root for a given source location.
    pub fn resolve_root(&self, location: &str) -> PathBuf {
        match self {
            DumpMode::Explicit(dir) => dir.clone(),
            _ => Path::new("outputs").join(video_stem(location)),
        }
    }
}

/// The last path segment of a location, minus its extension.
///
/// `"clips/traffic.mp4"` and `"http://host/traffic.mp4"` both yield
/// `"traffic"`.
pub fn video_stem(location: &str) -> &str {
    let name = location.rsplit('/').next().unwrap_or(location);
    let stem = name.split('.').next().unwrap_or(name);
    if stem.is_empty() { "video" } else { stem }
}

/// The on-disk output tree for one extraction run.
#[derive(Debug, Clone)]
pub struct OutputLayout {
    root: PathBuf,
}

impl OutputLayout {
    /// Create the layout directories under `root`.
    ///
    /// # Errors
    ///
    /// Returns [`MvExtractError::IoError`] if a directory cannot be created.
    pub fn create(root: impl Into<PathBuf>) -> Result<Self, MvExtractError> {
        let root = root.into();
        for child in ["frames", "motion_vectors", "json"] {
            fs::create_dir_all(root.join(child))?;
        }
        Ok(Self { root })
    }

    /// Resolve the layout for a run: pick the root from the dump mode and,
    /// for the derived default root only, remove leftovers of a previous run.
    ///
    /// # Errors
    ///
    /// Returns [`MvExtractError::IoError`] on pre-clean or creation failure.
    pub fn prepare(dump: &DumpMode, location: &str) -> Result<Self, MvExtractError> {
        let root = dump.resolve_root(location);
        if matches!(dump, DumpMode::Default) && root.exists() {
            info!("removing existing output directory {}", root.display());
            fs::remove_dir_all(&root)?;
        }
        Self::create(root)
    }

    /// The layout's root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `frames/frame-<step>.jpg`
    pub fn frame_path(&self, step: u64) -> PathBuf {
        self.root.join("frames").join(format!("frame-{step}.jpg"))
    }

    /// `motion_vectors/mvs-<step>.mvb`
    pub fn vectors_path(&self, step: u64) -> PathBuf {
        self.root
            .join("motion_vectors")
            .join(format!("mvs-{step}.{BINARY_EXTENSION}"))
    }

    /// `motion_vectors/draw-<step>.txt`
    pub fn draw_log_path(&self, step: u64) -> PathBuf {
        self.root
            .join("motion_vectors")
            .join(format!("draw-{step}.txt"))
    }

    /// `json/<step>.json`
    pub fn json_path(&self, step: u64) -> PathBuf {
        self.root.join("json").join(format!("{step}.json"))
    }

    /// Append one timestamp line to `timestamps.txt`.
    ///
    /// # Errors
    ///
    /// Returns [`MvExtractError::IoError`] if the write fails.
    pub fn append_timestamp(&self, timestamp: f64) -> Result<(), MvExtractError> {
        self.append_line("timestamps.txt", &timestamp.to_string())
    }

    /// Append one coding-type token line to `frame_types.txt`.
    ///
    /// # Errors
    ///
    /// Returns [`MvExtractError::IoError`] if the write fails.
    pub fn append_coding_type(&self, coding_type: CodingType) -> Result<(), MvExtractError> {
        self.append_line("frame_types.txt", &coding_type.to_string())
    }

    /// Scoped append: open, write one line, flush, close.
    fn append_line(&self, file_name: &str, line: &str) -> Result<(), MvExtractError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.root.join(file_name))?;
        writeln!(file, "{line}")?;
        file.flush()?;
        Ok(())
    }
}
