//! Frame Assembly
//!
//! Turns a unit's on-disk FrameSet into shareable artifacts: an
//! infinitely-looping GIF next to the frame directory and an upscaled
//! final-frame PNG under `static/`. Pixel art upscales with nearest-neighbor
//! so edges stay crisp.
//!
//! Assembly is pure local work. Re-running it over existing frames is always
//! safe and never triggers a remote call.

use crate::config::{PipelineSpec, ProjectSettings};
use crate::error::PipelineError;
use crate::inspect::{self, CompletionProbe, DiskProbe};
use crate::unit::{units_of, AnimationKind, AnimationUnit, FRAMES_PER_CALL};
use image::codecs::gif::{GifEncoder, Repeat};
use image::imageops::FilterType;
use image::{Delay, Frame, RgbaImage};
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

/// Artifacts written for one unit.
#[derive(Debug, Clone)]
pub struct AssembledUnit {
    pub label: String,
    /// Frames baked into the GIF.
    pub frames: usize,
    pub gif: PathBuf,
    pub static_png: PathBuf,
}

/// Outcome of an output-directory sweep.
#[derive(Debug, Default)]
pub struct AssembleReport {
    pub assembled: Vec<AssembledUnit>,
    /// Units with a partial FrameSet: (label, existing, expected).
    pub incomplete: Vec<(String, usize, usize)>,
    /// Units whose frames exist but could not be assembled: (label, reason).
    pub failed: Vec<(String, String)>,
    /// Frame directories on disk that no configured unit claims.
    pub unclaimed: Vec<PathBuf>,
}

impl AssembleReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Materialize a cycle's return leg by copying forward frames 15..0 to
/// indices 16..31. Copies are byte-for-byte, so re-running overwrites the
/// mirror with identical content.
pub fn mirror_cycle_frames(frames_dir: &Path) -> Result<usize, PipelineError> {
    for offset in 0..FRAMES_PER_CALL {
        let source = inspect::frame_path(frames_dir, FRAMES_PER_CALL - 1 - offset);
        let target = inspect::frame_path(frames_dir, FRAMES_PER_CALL + offset);
        fs::copy(&source, &target)?;
    }
    Ok(FRAMES_PER_CALL)
}

/// Assemble one unit's artifacts from its FrameSet.
///
/// Cycles with a complete forward leg get their return frames mirrored
/// first. The GIF covers the contiguous frame prefix; the static PNG is the
/// final frame, falling back to the last available one. Completeness policy
/// belongs to the caller.
pub fn assemble_unit(
    unit: &AnimationUnit,
    settings: &ProjectSettings,
) -> Result<AssembledUnit, PipelineError> {
    let label = unit.label();
    let frames_dir = unit.frames_dir(&settings.output_dir);

    if unit.kind == AnimationKind::Cycle {
        let forward = DiskProbe.inspect(&frames_dir, FRAMES_PER_CALL)?;
        if forward.is_complete() {
            mirror_cycle_frames(&frames_dir).map_err(|e| {
                assembly_error(&label, format!("Mirroring return frames failed: {}", e))
            })?;
        }
    }

    let completion = DiskProbe.inspect(&frames_dir, unit.expected_frames())?;
    if completion.existing == 0 {
        return Err(assembly_error(&label, "No frames on disk".to_string()));
    }

    let frames = load_frames(&frames_dir, completion.existing, settings.upscale_size)
        .map_err(|reason| assembly_error(&label, reason))?;

    let static_png = unit.static_path(&settings.output_dir);
    write_static(&frames[completion.existing - 1], &static_png)
        .map_err(|reason| assembly_error(&label, reason))?;

    let gif = unit.gif_path(&settings.output_dir);
    write_gif(frames, &gif, settings.frame_duration_ms)
        .map_err(|reason| assembly_error(&label, reason))?;

    info!(
        unit = %label,
        frames = completion.existing,
        gif = %gif.display(),
        "Assembled animation"
    );

    Ok(AssembledUnit {
        label,
        frames: completion.existing,
        gif,
        static_png,
    })
}

/// Sweep the output directory and (re)build artifacts for every configured
/// unit whose FrameSet is complete. Cycles count as complete once their
/// forward leg exists; the return leg is mirrored on the spot.
pub fn assemble_all(spec: &PipelineSpec) -> Result<AssembleReport, PipelineError> {
    let settings = &spec.project;
    let mut report = AssembleReport::default();
    let mut claimed: HashSet<PathBuf> = HashSet::new();

    for unit in units_of(spec) {
        let frames_dir = unit.frames_dir(&settings.output_dir);
        claimed.insert(frames_dir.clone());

        let expected = unit.expected_frames();
        let completion = DiskProbe.inspect(&frames_dir, expected)?;
        if completion.existing == 0 {
            continue;
        }

        let finalizable = completion.is_complete()
            || (unit.kind == AnimationKind::Cycle && completion.existing >= FRAMES_PER_CALL);
        if !finalizable {
            warn!(
                unit = %unit.label(),
                existing = completion.existing,
                expected,
                "Skipping incomplete unit"
            );
            report
                .incomplete
                .push((unit.label(), completion.existing, expected));
            continue;
        }

        match assemble_unit(&unit, settings) {
            Ok(done) => report.assembled.push(done),
            Err(e) => {
                warn!(unit = %unit.label(), error = %e, "Assembly failed");
                report.failed.push((unit.label(), e.to_string()));
            }
        }
    }

    report.unclaimed = unclaimed_frame_dirs(&settings.output_dir, &claimed)?;
    Ok(report)
}

fn assembly_error(label: &str, reason: String) -> PipelineError {
    PipelineError::Assembly {
        unit: label.to_string(),
        reason,
    }
}

/// Load and upscale the first `count` frames of a FrameSet.
fn load_frames(dir: &Path, count: usize, upscale_size: u32) -> Result<Vec<RgbaImage>, String> {
    let mut frames = Vec::with_capacity(count);
    for index in 0..count {
        let path = inspect::frame_path(dir, index);
        let image = image::open(&path)
            .map_err(|e| format!("Undecodable frame {}: {}", path.display(), e))?;
        frames.push(image::imageops::resize(
            &image.to_rgba8(),
            upscale_size,
            upscale_size,
            FilterType::Nearest,
        ));
    }
    Ok(frames)
}

/// Encode an infinitely looping GIF, one image per frame.
fn write_gif(frames: Vec<RgbaImage>, path: &Path, frame_duration_ms: u32) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| format!("Creating {}: {}", parent.display(), e))?;
    }
    let file = File::create(path).map_err(|e| format!("Creating {}: {}", path.display(), e))?;
    let mut encoder = GifEncoder::new(BufWriter::new(file));
    encoder
        .set_repeat(Repeat::Infinite)
        .map_err(|e| format!("Encoding {}: {}", path.display(), e))?;

    let delay = Delay::from_numer_denom_ms(frame_duration_ms, 1);
    for rgba in frames {
        let frame = Frame::from_parts(rgba, 0, 0, delay);
        encoder
            .encode_frame(frame)
            .map_err(|e| format!("Encoding {}: {}", path.display(), e))?;
    }
    Ok(())
}

fn write_static(frame: &RgbaImage, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| format!("Creating {}: {}", parent.display(), e))?;
    }
    frame
        .save(path)
        .map_err(|e| format!("Writing {}: {}", path.display(), e))
}

/// Frame directories under the kind roots that no configured unit claims.
fn unclaimed_frame_dirs(
    output_dir: &Path,
    claimed: &HashSet<PathBuf>,
) -> Result<Vec<PathBuf>, PipelineError> {
    let mut unclaimed = Vec::new();
    for kind in AnimationKind::ALL {
        let kind_dir = output_dir.join(kind.dir_name());
        if !kind_dir.is_dir() {
            continue;
        }
        for entry in WalkDir::new(&kind_dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(io::Error::from)?;
            if entry.file_type().is_dir() && !claimed.contains(entry.path()) {
                unclaimed.push(entry.path().to_path_buf());
            }
        }
    }
    Ok(unclaimed)
}
