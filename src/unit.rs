//! Animation unit model.
//!
//! The kind-polymorphic view of the specification that the planner walks:
//! every unit knows its name, prompts, expected frame count, and where its
//! FrameSet lives. Expected counts are derived from kind and step count,
//! never user-supplied.

use crate::config::{PipelineSpec, StepSpec, REFERENCE_LABEL};
use std::fmt;
use std::path::{Path, PathBuf};

/// Frames produced by one remote generation call; the remote run is atomic
/// with respect to cost, so this is also the resume granularity.
pub const FRAMES_PER_CALL: usize = 16;

/// Frame an emote takes from its parent single: the last frame of the
/// parent's base run.
pub const EMOTE_SOURCE_FRAME: usize = FRAMES_PER_CALL - 1;

/// Directory under the output root holding static fallback PNGs.
pub const STATIC_DIR: &str = "static";

/// Animation kinds, in plan order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AnimationKind {
    Single,
    Emote,
    Chain,
    Journey,
    Cycle,
}

impl AnimationKind {
    /// All kinds in the order the planner visits them.
    pub const ALL: [AnimationKind; 5] = [
        AnimationKind::Single,
        AnimationKind::Emote,
        AnimationKind::Chain,
        AnimationKind::Journey,
        AnimationKind::Cycle,
    ];

    /// Directory name under the output root; also the config section name
    /// and the `--type` filter spelling.
    pub fn dir_name(self) -> &'static str {
        match self {
            AnimationKind::Single => "singles",
            AnimationKind::Emote => "emotes",
            AnimationKind::Chain => "chains",
            AnimationKind::Journey => "journeys",
            AnimationKind::Cycle => "cycles",
        }
    }

    /// Parse a `--type` filter value.
    pub fn parse(value: &str) -> Option<AnimationKind> {
        AnimationKind::ALL
            .into_iter()
            .find(|kind| kind.dir_name() == value)
    }
}

impl fmt::Display for AnimationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Kind-specific payload.
#[derive(Debug, Clone)]
pub enum UnitPayload {
    Single {
        prompt: String,
    },
    /// `source` is the parent single's name, or [`REFERENCE_LABEL`].
    Emote {
        prompt: String,
        source: String,
    },
    /// Chains and journeys differ only in step-count bounds.
    Sequence {
        steps: Vec<StepSpec>,
    },
    /// Only the forward prompt generates; the return leg is mirrored locally.
    Cycle {
        forward_prompt: String,
    },
}

/// One animation definition with a deterministic expected frame count.
#[derive(Debug, Clone)]
pub struct AnimationUnit {
    pub kind: AnimationKind,
    pub name: String,
    pub payload: UnitPayload,
}

impl AnimationUnit {
    /// Expected total on-disk frame count for a complete unit.
    pub fn expected_frames(&self) -> usize {
        match &self.payload {
            UnitPayload::Single { .. } | UnitPayload::Emote { .. } => FRAMES_PER_CALL,
            UnitPayload::Sequence { steps } => steps.len() * FRAMES_PER_CALL,
            UnitPayload::Cycle { .. } => 2 * FRAMES_PER_CALL,
        }
    }

    /// `<kind>/<name>` label used in logs, reports, and error messages.
    pub fn label(&self) -> String {
        format!("{}/{}", self.kind.dir_name(), self.name)
    }

    /// Directory holding this unit's FrameSet.
    pub fn frames_dir(&self, output_dir: &Path) -> PathBuf {
        output_dir.join(self.kind.dir_name()).join(&self.name)
    }

    /// Assembled GIF path, next to the unit's frame directory.
    pub fn gif_path(&self, output_dir: &Path) -> PathBuf {
        output_dir
            .join(self.kind.dir_name())
            .join(format!("{}.gif", self.name))
    }

    /// Upscaled final-frame PNG path under the shared static directory.
    pub fn static_path(&self, output_dir: &Path) -> PathBuf {
        output_dir
            .join(STATIC_DIR)
            .join(format!("{}.png", self.name))
    }
}

/// Materialize every unit of a spec: kind groups in fixed order, declaration
/// order within each group. This is the planner's walk order.
pub fn units_of(spec: &PipelineSpec) -> Vec<AnimationUnit> {
    let mut units = Vec::new();

    for (name, single) in &spec.singles {
        units.push(AnimationUnit {
            kind: AnimationKind::Single,
            name: name.clone(),
            payload: UnitPayload::Single {
                prompt: single.prompt.clone(),
            },
        });
    }

    for (name, emote) in &spec.emotes {
        units.push(AnimationUnit {
            kind: AnimationKind::Emote,
            name: name.clone(),
            payload: UnitPayload::Emote {
                prompt: emote.prompt.clone(),
                source: emote.source(name).to_string(),
            },
        });
    }

    for (name, chain) in &spec.chains {
        units.push(AnimationUnit {
            kind: AnimationKind::Chain,
            name: name.clone(),
            payload: UnitPayload::Sequence {
                steps: chain.steps.clone(),
            },
        });
    }

    for (name, journey) in &spec.journeys {
        units.push(AnimationUnit {
            kind: AnimationKind::Journey,
            name: name.clone(),
            payload: UnitPayload::Sequence {
                steps: journey.steps.clone(),
            },
        });
    }

    for (name, cycle) in &spec.cycles {
        units.push(AnimationUnit {
            kind: AnimationKind::Cycle,
            name: name.clone(),
            payload: UnitPayload::Cycle {
                forward_prompt: cycle.forward_prompt.clone(),
            },
        });
    }

    units
}

/// True when a step's `from:` label points at the project reference.
pub fn is_reference_label(label: &str) -> bool {
    label.is_empty() || label == REFERENCE_LABEL
}
