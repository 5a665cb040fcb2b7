//! Reference image resolution.
//!
//! Every generation call starts from a reference image: the project's base
//! sprite, a frame of another unit, or a frame the same unit produced in an
//! earlier step. References stay symbolic in the plan and are materialized
//! to concrete paths only when a task executes, so the full plan (and its
//! cost) is known before any remote call. Resolution never generates
//! anything; it only inspects already-materialized state.

use crate::config::REFERENCE_LABEL;
use crate::error::PipelineError;
use crate::inspect::{frame_path, CompletionProbe};
use crate::unit::{AnimationKind, EMOTE_SOURCE_FRAME, FRAMES_PER_CALL};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

/// Where a task's reference image comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceSource {
    /// The project's base reference image.
    ProjectReference,
    /// A specific frame of another unit (an emote's parent single).
    UnitFrame {
        kind: AnimationKind,
        unit: String,
        frame: usize,
    },
    /// A frame inside the unit's own directory (the prior step's final
    /// frame of a chain or journey).
    OwnFrame { frame: usize },
}

impl ReferenceSource {
    /// Source for an emote given its `from:` label (parent single name or
    /// the literal `reference`).
    pub fn for_emote(source_label: &str) -> Self {
        if source_label == REFERENCE_LABEL {
            ReferenceSource::ProjectReference
        } else {
            ReferenceSource::UnitFrame {
                kind: AnimationKind::Single,
                unit: source_label.to_string(),
                frame: EMOTE_SOURCE_FRAME,
            }
        }
    }

    /// Source for step `index` of a chain or journey: the reference for the
    /// first step, the prior step's last persisted frame afterwards.
    pub fn for_step(index: usize) -> Self {
        if index == 0 {
            ReferenceSource::ProjectReference
        } else {
            ReferenceSource::OwnFrame {
                frame: index * FRAMES_PER_CALL - 1,
            }
        }
    }
}

impl fmt::Display for ReferenceSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferenceSource::ProjectReference => f.write_str("reference"),
            ReferenceSource::UnitFrame { kind, unit, frame } => {
                write!(f, "{}/{}[{}]", kind.dir_name(), unit, frame)
            }
            ReferenceSource::OwnFrame { frame } => write!(f, "own[{}]", frame),
        }
    }
}

/// Resolves symbolic references against project paths and disk state.
pub struct Resolver<'a> {
    reference: &'a Path,
    output_dir: &'a Path,
}

impl<'a> Resolver<'a> {
    pub fn new(reference: &'a Path, output_dir: &'a Path) -> Self {
        Self {
            reference,
            output_dir,
        }
    }

    /// Plan-time check: can `source` be materialized from disk state, or
    /// will it be by a task already emitted in this plan (`pending` holds
    /// the labels of units with emitted tasks)? The probe is the planner's,
    /// so an empty-disk estimate applies the identical rule.
    pub fn satisfiable(
        &self,
        unit_label: &str,
        own_dir: &Path,
        source: &ReferenceSource,
        probe: &dyn CompletionProbe,
        pending: &HashSet<String>,
    ) -> Result<(), PipelineError> {
        match source {
            ReferenceSource::ProjectReference => Ok(()),
            ReferenceSource::UnitFrame { kind, unit, frame } => {
                let parent_label = format!("{}/{}", kind.dir_name(), unit);
                if pending.contains(&parent_label) {
                    return Ok(());
                }
                let parent_dir = self.output_dir.join(kind.dir_name()).join(unit);
                let state = probe.inspect(&parent_dir, frame + 1)?;
                if state.is_complete() {
                    Ok(())
                } else {
                    Err(unresolved(
                        unit_label,
                        format!(
                            "{} has {} of {} frames and no pending task",
                            parent_label,
                            state.existing,
                            frame + 1
                        ),
                    ))
                }
            }
            ReferenceSource::OwnFrame { frame } => {
                if pending.contains(unit_label) {
                    return Ok(());
                }
                let state = probe.inspect(own_dir, frame + 1)?;
                if state.is_complete() {
                    Ok(())
                } else {
                    Err(unresolved(
                        unit_label,
                        format!(
                            "prior step incomplete ({} of {} frames)",
                            state.existing,
                            frame + 1
                        ),
                    ))
                }
            }
        }
    }

    /// Execution-time resolution to a concrete file path. Requires actual
    /// on-disk presence; an upstream task that failed earlier in the run
    /// leaves its dependents failing here, which the executor reports as a
    /// skip rather than calling the API with a bad reference.
    pub fn materialize(
        &self,
        unit_label: &str,
        own_dir: &Path,
        source: &ReferenceSource,
    ) -> Result<PathBuf, PipelineError> {
        let path = match source {
            ReferenceSource::ProjectReference => self.reference.to_path_buf(),
            ReferenceSource::UnitFrame { kind, unit, frame } => frame_path(
                &self.output_dir.join(kind.dir_name()).join(unit),
                *frame,
            ),
            ReferenceSource::OwnFrame { frame } => frame_path(own_dir, *frame),
        };

        match std::fs::metadata(&path) {
            Ok(meta) if meta.is_file() => Ok(path),
            Ok(_) => Err(unresolved(
                unit_label,
                format!("{} is not a file", path.display()),
            )),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(unresolved(
                unit_label,
                format!("{} does not exist", path.display()),
            )),
            Err(e) => Err(PipelineError::Io(e)),
        }
    }
}

fn unresolved(unit_label: &str, reason: String) -> PipelineError {
    PipelineError::UnresolvedDependency {
        unit: unit_label.to_string(),
        reason,
    }
}
