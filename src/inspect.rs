//! Frame-file layout and completion inspection.
//!
//! The single authority on frame file naming and on the
//! leading-contiguous-run count that drives every resume decision. Disk
//! content is the only resume ledger, so a sparse directory must never look
//! more complete than it is: a gap at frame N means the unit is incomplete
//! from N onward regardless of what exists past the gap.

use crate::error::PipelineError;
use std::fs;
use std::path::{Path, PathBuf};

/// Frame file name for a zero-based index: `frame_00.png`.
pub fn frame_file_name(index: usize) -> String {
    format!("frame_{:02}.png", index)
}

/// Full path of a frame inside a unit directory.
pub fn frame_path(dir: &Path, index: usize) -> PathBuf {
    dir.join(frame_file_name(index))
}

/// Completion state of one unit's FrameSet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completion {
    /// Frames present contiguously from index 0.
    pub existing: usize,
    /// Expected count for a complete unit.
    pub expected: usize,
}

impl Completion {
    pub fn is_complete(&self) -> bool {
        self.existing >= self.expected
    }
}

/// Disk probe consulted by the planner. The cost estimator substitutes
/// [`EmptyDiskProbe`] so pricing reuses the planner's emission rule
/// unchanged.
pub trait CompletionProbe {
    fn inspect(&self, dir: &Path, expected: usize) -> Result<Completion, PipelineError>;
}

/// Probe backed by the real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiskProbe;

impl CompletionProbe for DiskProbe {
    fn inspect(&self, dir: &Path, expected: usize) -> Result<Completion, PipelineError> {
        Ok(Completion {
            existing: leading_contiguous(dir)?,
            expected,
        })
    }
}

/// Probe that reports every unit as absent.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyDiskProbe;

impl CompletionProbe for EmptyDiskProbe {
    fn inspect(&self, _dir: &Path, expected: usize) -> Result<Completion, PipelineError> {
        Ok(Completion {
            existing: 0,
            expected,
        })
    }
}

/// Count frames present contiguously from index 0. An absent directory is
/// zero frames, not an error; only a real access failure is an error.
fn leading_contiguous(dir: &Path) -> Result<usize, PipelineError> {
    let mut count = 0;
    loop {
        match fs::metadata(frame_path(dir, count)) {
            Ok(meta) if meta.is_file() => count += 1,
            Ok(_) => break,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => break,
            Err(e) => return Err(PipelineError::Io(e)),
        }
    }
    Ok(count)
}

/// Persist one frame atomically (write to `.tmp`, then rename), creating the
/// unit directory on first use. Returns the final frame path.
pub fn write_frame(dir: &Path, index: usize, bytes: &[u8]) -> Result<PathBuf, PipelineError> {
    fs::create_dir_all(dir)?;
    let final_path = frame_path(dir, index);
    let temp_path = final_path.with_extension("png.tmp");

    fs::write(&temp_path, bytes)?;
    if let Err(e) = fs::rename(&temp_path, &final_path) {
        let _ = fs::remove_file(&temp_path);
        return Err(PipelineError::Io(e));
    }
    Ok(final_path)
}
