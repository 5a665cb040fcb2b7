//! Property-based tests for planner determinism and resume guarantees

use pixelart::config::{
    CycleSpec, EmoteSpec, PipelineSpec, ProjectSettings, SequenceSpec, SingleSpec, StepSpec,
};
use pixelart::error::PipelineError;
use pixelart::inspect::{Completion, CompletionProbe};
use pixelart::plan::{build_plan, PlanFilter};
use pixelart::unit::{units_of, AnimationUnit, UnitPayload, FRAMES_PER_CALL};
use proptest::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Probe over a synthetic disk: unit directory -> contiguous frame count.
struct MapProbe(HashMap<PathBuf, usize>);

impl CompletionProbe for MapProbe {
    fn inspect(&self, dir: &Path, expected: usize) -> Result<Completion, PipelineError> {
        Ok(Completion {
            existing: self.0.get(dir).copied().unwrap_or(0),
            expected,
        })
    }
}

fn step(from: &str, to: &str) -> StepSpec {
    StepSpec {
        from: from.to_string(),
        to: to.to_string(),
        prompt: format!("{} becomes {}", from, to),
    }
}

/// One unit of every kind, so the probe counts map 1:1 onto walk order:
/// flame, star, emote flame, chain, journey, cycle.
fn spec() -> PipelineSpec {
    PipelineSpec {
        project: ProjectSettings::default(),
        singles: vec![
            (
                "flame".to_string(),
                SingleSpec {
                    prompt: "flicker".to_string(),
                },
            ),
            (
                "star".to_string(),
                SingleSpec {
                    prompt: "twinkle".to_string(),
                },
            ),
        ],
        emotes: vec![(
            "flame".to_string(),
            EmoteSpec {
                prompt: "burst".to_string(),
                from: None,
            },
        )],
        chains: vec![(
            "flame_to_star".to_string(),
            SequenceSpec {
                steps: vec![step("reference", "flame"), step("flame", "star")],
            },
        )],
        journeys: vec![(
            "long_way".to_string(),
            SequenceSpec {
                steps: vec![step("reference", "a"), step("a", "b"), step("b", "c")],
            },
        )],
        cycles: vec![(
            "spin".to_string(),
            CycleSpec {
                shape: "flame".to_string(),
                forward_prompt: "away".to_string(),
                reverse_prompt: "back".to_string(),
            },
        )],
    }
}

fn probe_for(spec: &PipelineSpec, counts: &[usize]) -> MapProbe {
    let map = units_of(spec)
        .iter()
        .zip(counts)
        .map(|(unit, &count)| (unit.frames_dir(&spec.project.output_dir), count))
        .collect();
    MapProbe(map)
}

/// Remote calls a unit with `existing` contiguous frames still needs. This
/// is the resume rule the planner must honor: complete units and whole
/// completed steps never re-run, partial runs re-run in full, and a cycle's
/// return leg is never a paid call.
fn calls_still_needed(unit: &AnimationUnit, existing: usize) -> usize {
    if existing >= unit.expected_frames() {
        return 0;
    }
    match &unit.payload {
        UnitPayload::Single { .. } | UnitPayload::Emote { .. } => 1,
        UnitPayload::Sequence { steps } => steps.len() - existing / FRAMES_PER_CALL,
        UnitPayload::Cycle { .. } => usize::from(existing < FRAMES_PER_CALL),
    }
}

fn counts_strategy() -> impl Strategy<Value = (usize, usize, usize, usize, usize, usize)> {
    (0usize..=16, 0usize..=16, 0usize..=16, 0usize..=32, 0usize..=48, 0usize..=32)
}

/// The same spec and disk state always produce the identical plan.
#[test]
fn test_plan_is_deterministic_for_any_disk_state() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&counts_strategy(), |counts| {
            let spec = spec();
            let counts = [counts.0, counts.1, counts.2, counts.3, counts.4, counts.5];

            let first =
                build_plan(&spec, &PlanFilter::default(), &probe_for(&spec, &counts)).unwrap();
            let second =
                build_plan(&spec, &PlanFilter::default(), &probe_for(&spec, &counts)).unwrap();

            prop_assert_eq!(&first.tasks, &second.tasks);
            prop_assert_eq!(&first.complete, &second.complete);
            first.validate().map_err(|e| {
                proptest::test_runner::TestCaseError::fail(format!("inconsistent plan: {}", e))
            })?;
            Ok(())
        })
        .unwrap();
}

/// Planned calls per unit match the resume rule exactly, for any disk state.
#[test]
fn test_resume_schedules_exactly_the_missing_calls() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&counts_strategy(), |counts| {
            let spec = spec();
            let counts = [counts.0, counts.1, counts.2, counts.3, counts.4, counts.5];
            let plan =
                build_plan(&spec, &PlanFilter::default(), &probe_for(&spec, &counts)).unwrap();

            for (unit, &existing) in units_of(&spec).iter().zip(&counts) {
                let planned = plan
                    .tasks
                    .iter()
                    .filter(|t| t.unit_label == unit.label())
                    .count();
                prop_assert_eq!(
                    planned,
                    calls_still_needed(unit, existing),
                    "unit {} with {} frames",
                    unit.label(),
                    existing
                );
            }

            // Every unit lands in exactly one bucket; nothing is dropped.
            prop_assert_eq!(plan.complete.len() + plan.pending_units.len(), 6);
            prop_assert!(plan.unresolved.is_empty());
            Ok(())
        })
        .unwrap();
}

/// A unit's tasks are contiguous in the plan: work never interleaves.
#[test]
fn test_tasks_stay_grouped_by_unit() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&counts_strategy(), |counts| {
            let spec = spec();
            let counts = [counts.0, counts.1, counts.2, counts.3, counts.4, counts.5];
            let plan =
                build_plan(&spec, &PlanFilter::default(), &probe_for(&spec, &counts)).unwrap();

            let mut seen = Vec::new();
            for task in &plan.tasks {
                if seen.last() != Some(&task.unit_label) {
                    prop_assert!(
                        !seen.contains(&task.unit_label),
                        "tasks for {} are not contiguous",
                        task.unit_label
                    );
                    seen.push(task.unit_label.clone());
                }
            }
            Ok(())
        })
        .unwrap();
}

/// More frames on disk never schedule more work.
#[test]
fn test_progress_never_increases_the_plan() {
    let mut runner = proptest::test_runner::TestRunner::default();

    let strategy = (counts_strategy(), counts_strategy());
    runner
        .run(&strategy, |(base, extra)| {
            let spec = spec();
            let base = [base.0, base.1, base.2, base.3, base.4, base.5];
            let extra = [extra.0, extra.1, extra.2, extra.3, extra.4, extra.5];
            let expected: Vec<usize> =
                units_of(&spec).iter().map(|u| u.expected_frames()).collect();

            let advanced: Vec<usize> = base
                .iter()
                .zip(&extra)
                .zip(&expected)
                .map(|((&b, &e), &cap)| (b + e).min(cap))
                .collect();

            let before =
                build_plan(&spec, &PlanFilter::default(), &probe_for(&spec, &base)).unwrap();
            let after =
                build_plan(&spec, &PlanFilter::default(), &probe_for(&spec, &advanced)).unwrap();

            prop_assert!(
                after.task_count() <= before.task_count(),
                "plan grew from {} to {} tasks",
                before.task_count(),
                after.task_count()
            );
            Ok(())
        })
        .unwrap();
}
