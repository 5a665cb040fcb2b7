//! Batch planning.
//!
//! Walks the specification in declaration order, consults the completion
//! probe and the dependency resolver, and emits one `GenerationTask` per
//! incomplete unit of paid work. Complete units are skipped (the resume
//! guarantee); units whose reference can be produced neither from disk nor
//! by an earlier task in the same plan are skipped and reported. Planning is
//! fully deterministic for a given spec and disk state.

use crate::config::PipelineSpec;
use crate::error::PipelineError;
use crate::inspect::CompletionProbe;
use crate::resolve::{ReferenceSource, Resolver};
use crate::unit::{units_of, AnimationKind, AnimationUnit, UnitPayload, FRAMES_PER_CALL};
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::debug;

/// Restricts a plan to one kind and/or explicit unit names. An empty filter
/// selects everything.
#[derive(Debug, Clone, Default)]
pub struct PlanFilter {
    pub kind: Option<AnimationKind>,
    pub names: Vec<String>,
}

impl PlanFilter {
    pub fn matches(&self, unit: &AnimationUnit) -> bool {
        if let Some(kind) = self.kind {
            if unit.kind != kind {
                return false;
            }
        }
        if !self.names.is_empty() && !self.names.iter().any(|n| n == &unit.name) {
            return false;
        }
        true
    }
}

/// One planned remote call: the atomic item of cost and resumability.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationTask {
    pub kind: AnimationKind,
    pub unit_name: String,
    /// `<kind>/<name>`, the reporting key for the whole unit.
    pub unit_label: String,
    /// Step index within a chain/journey; 0 for everything else.
    pub step_index: usize,
    pub prompt: String,
    pub source: ReferenceSource,
    /// Frames one successful call persists. Always the remote run size; the
    /// call is atomic with respect to cost, so this is never subdivided.
    pub frame_count: usize,
    /// Destination FrameSet directory.
    pub frames_dir: PathBuf,
    /// First frame index this task populates.
    pub start_frame: usize,
}

impl GenerationTask {
    /// Short human label: `chains/flame_to_heart step 2/2` or the unit label.
    pub fn describe(&self, total_steps: usize) -> String {
        if total_steps > 1 {
            format!(
                "{} step {}/{}",
                self.unit_label,
                self.step_index + 1,
                total_steps
            )
        } else {
            self.unit_label.clone()
        }
    }
}

/// A unit the run must touch: it has planned tasks, or zero-cost finalize
/// work (a cycle whose forward run is on disk but whose mirrored frames or
/// artifacts are missing).
#[derive(Debug, Clone)]
pub struct PendingUnit {
    pub unit: AnimationUnit,
    pub task_count: usize,
}

/// An ordered plan over one specification and one observed disk state.
#[derive(Debug, Clone, Default)]
pub struct Plan {
    /// Remote calls in dependency order.
    pub tasks: Vec<GenerationTask>,
    /// Units with tasks or finalize-only work, in walk order.
    pub pending_units: Vec<PendingUnit>,
    /// Labels of units skipped as already complete.
    pub complete: Vec<String>,
    /// Units skipped because their reference is not satisfiable, with the
    /// reason. These consume no API cost.
    pub unresolved: Vec<(String, String)>,
}

impl Plan {
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Nothing to generate and nothing to finalize.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty() && self.pending_units.is_empty()
    }

    /// Internal consistency checks; used by tests and debug assertions.
    pub fn validate(&self) -> Result<(), String> {
        let mut seen = HashSet::new();
        for task in &self.tasks {
            if task.frame_count != FRAMES_PER_CALL {
                return Err(format!(
                    "task {} has frame_count {}, expected {}",
                    task.unit_label, task.frame_count, FRAMES_PER_CALL
                ));
            }
            if !seen.insert((task.unit_label.clone(), task.start_frame)) {
                return Err(format!(
                    "duplicate task for {} at frame {}",
                    task.unit_label, task.start_frame
                ));
            }
        }

        for pending in &self.pending_units {
            let actual = self
                .tasks
                .iter()
                .filter(|t| t.unit_label == pending.unit.label())
                .count();
            if actual != pending.task_count {
                return Err(format!(
                    "unit {} lists {} tasks but plan holds {}",
                    pending.unit.label(),
                    pending.task_count,
                    actual
                ));
            }
        }

        for task in &self.tasks {
            if !self
                .pending_units
                .iter()
                .any(|p| p.unit.label() == task.unit_label)
            {
                return Err(format!("task {} has no pending unit entry", task.unit_label));
            }
        }

        Ok(())
    }
}

/// Build the plan for `spec` under `filter`, observing disk through `probe`.
pub fn build_plan(
    spec: &PipelineSpec,
    filter: &PlanFilter,
    probe: &dyn CompletionProbe,
) -> Result<Plan, PipelineError> {
    let resolver = Resolver::new(&spec.project.reference, &spec.project.output_dir);
    let mut plan = Plan::default();
    let mut pending_labels: HashSet<String> = HashSet::new();

    for unit in units_of(spec) {
        if !filter.matches(&unit) {
            continue;
        }

        let label = unit.label();
        let dir = unit.frames_dir(&spec.project.output_dir);
        let state = probe.inspect(&dir, unit.expected_frames())?;

        if state.is_complete() {
            debug!(unit = %label, frames = state.existing, "unit complete; skipping");
            plan.complete.push(label);
            continue;
        }

        match &unit.payload {
            UnitPayload::Single { prompt } => {
                plan.tasks.push(task_for(
                    &unit,
                    &dir,
                    0,
                    prompt.clone(),
                    ReferenceSource::ProjectReference,
                ));
                pending_labels.insert(label);
                plan.pending_units.push(PendingUnit {
                    unit,
                    task_count: 1,
                });
            }
            UnitPayload::Emote { prompt, source } => {
                let src = ReferenceSource::for_emote(source);
                if let Err(e) =
                    resolver.satisfiable(&label, &dir, &src, probe, &pending_labels)
                {
                    debug!(unit = %label, error = %e, "dependency unsatisfiable; skipping");
                    plan.unresolved.push((label, e.to_string()));
                    continue;
                }
                plan.tasks.push(task_for(&unit, &dir, 0, prompt.clone(), src));
                pending_labels.insert(label);
                plan.pending_units.push(PendingUnit {
                    unit,
                    task_count: 1,
                });
            }
            UnitPayload::Sequence { steps } => {
                // Whole completed steps never re-run; a partial trailing
                // step re-runs from its own start.
                let done_steps = state.existing / FRAMES_PER_CALL;
                let mut unit_tasks = Vec::new();
                let mut blocked = None;

                for (i, step) in steps.iter().enumerate().skip(done_steps) {
                    let src = ReferenceSource::for_step(i);
                    if unit_tasks.is_empty() {
                        if let Err(e) =
                            resolver.satisfiable(&label, &dir, &src, probe, &pending_labels)
                        {
                            blocked = Some(e);
                            break;
                        }
                    }
                    unit_tasks.push(task_for(&unit, &dir, i, step.prompt.clone(), src));
                }

                if let Some(e) = blocked {
                    debug!(unit = %label, error = %e, "dependency unsatisfiable; skipping");
                    plan.unresolved.push((label, e.to_string()));
                    continue;
                }

                let task_count = unit_tasks.len();
                plan.tasks.extend(unit_tasks);
                pending_labels.insert(label);
                plan.pending_units.push(PendingUnit { unit, task_count });
            }
            UnitPayload::Cycle { forward_prompt } => {
                if state.existing >= FRAMES_PER_CALL {
                    // Forward run already paid for; only mirroring and
                    // artifacts remain.
                    debug!(unit = %label, frames = state.existing, "forward run present; finalize only");
                    plan.pending_units.push(PendingUnit {
                        unit,
                        task_count: 0,
                    });
                    continue;
                }
                plan.tasks.push(task_for(
                    &unit,
                    &dir,
                    0,
                    forward_prompt.clone(),
                    ReferenceSource::ProjectReference,
                ));
                pending_labels.insert(label);
                plan.pending_units.push(PendingUnit {
                    unit,
                    task_count: 1,
                });
            }
        }
    }

    debug_assert!(plan.validate().is_ok());
    Ok(plan)
}

fn task_for(
    unit: &AnimationUnit,
    dir: &std::path::Path,
    step_index: usize,
    prompt: String,
    source: ReferenceSource,
) -> GenerationTask {
    GenerationTask {
        kind: unit.kind,
        unit_name: unit.name.clone(),
        unit_label: unit.label(),
        step_index,
        prompt,
        source,
        frame_count: FRAMES_PER_CALL,
        frames_dir: dir.to_path_buf(),
        start_frame: step_index * FRAMES_PER_CALL,
    }
}
