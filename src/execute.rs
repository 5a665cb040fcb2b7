//! Plan Execution
//!
//! Walks the plan in task order, makes the paid generation calls, and
//! persists frames as they arrive. Disk content is the only resume state: a
//! crashed or failed call leaves a contiguous frame prefix that the next
//! run's inspection turns into a shorter plan.
//!
//! Failures never abort the run. A failed task breaks its own unit (later
//! steps of that unit are skipped) while independent units still get their
//! attempt; everything is collected into the [`RunReport`].

use crate::assemble;
use crate::client::{GenerationClient, GenerationRequest};
use crate::config::PipelineSpec;
use crate::error::PipelineError;
use crate::inspect;
use crate::plan::Plan;
use crate::resolve::Resolver;
use crate::unit::{AnimationUnit, UnitPayload};
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Pause between consecutive remote calls.
const CALL_SPACING: Duration = Duration::from_secs(1);

/// Error samples carried in the end-of-run summary message.
const MAX_ERROR_SAMPLES: usize = 3;

/// A unit whose FrameSet reached its expected count this run.
#[derive(Debug, Clone)]
pub struct CompletedUnit {
    pub label: String,
    /// Frames persisted during this run; zero for finalize-only units.
    pub frames_written: usize,
    /// Spend attributed to this unit during this run.
    pub usd: f64,
}

/// A task or finalize step that failed.
#[derive(Debug, Clone)]
pub struct FailedTask {
    pub unit: String,
    /// Human-readable stage, e.g. `chains/flame_to_star step 2/2` or `finalize`.
    pub stage: String,
    pub error: String,
}

/// Everything that happened during one run, in deterministic order.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub completed: Vec<CompletedUnit>,
    pub failed: Vec<FailedTask>,
    /// Units skipped at execution time without a remote call: (label, reason).
    pub dependency_skipped: Vec<(String, String)>,
    /// Labels that were complete before the run started.
    pub already_complete: Vec<String>,
    /// Units the planner could not schedule: (label, reason).
    pub unresolved: Vec<(String, String)>,
    /// Total spend across all calls this run, including failed units.
    pub total_usd: f64,
}

impl RunReport {
    /// True when every planned task ran to success.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && self.dependency_skipped.is_empty()
    }

    /// Summary error for a partial failure, carrying counts and deduplicated
    /// error samples. `None` when the run was clean.
    pub fn summary_error(&self) -> Option<PipelineError> {
        if self.is_clean() {
            return None;
        }
        let mut message = format!(
            "{} task(s) failed, {} unit(s) skipped on missing dependencies",
            self.failed.len(),
            self.dependency_skipped.len()
        );
        message.push_str(&self.failure_samples(MAX_ERROR_SAMPLES));
        Some(PipelineError::GenerationFailed(message))
    }

    fn failure_samples(&self, max_samples: usize) -> String {
        let mut messages: Vec<&str> = self
            .failed
            .iter()
            .map(|f| f.error.as_str())
            .chain(
                self.dependency_skipped
                    .iter()
                    .map(|(_, reason)| reason.as_str()),
            )
            .collect();
        let total = messages.len();
        messages.sort_unstable();
        messages.dedup();

        let samples: Vec<&str> = messages.into_iter().take(max_samples).collect();
        if samples.is_empty() {
            return String::new();
        }

        let mut out = format!(". Sample errors: {}", samples.join(" | "));
        let remaining = total.saturating_sub(samples.len());
        if remaining > 0 {
            out.push_str(&format!(" | ... and {} more", remaining));
        }
        out
    }
}

struct UnitProgress<'a> {
    unit: &'a AnimationUnit,
    remaining: usize,
    frames_written: usize,
    usd: f64,
}

/// Execute a plan against the generation client.
pub async fn execute_plan(
    plan: &Plan,
    spec: &PipelineSpec,
    client: &dyn GenerationClient,
) -> RunReport {
    let settings = &spec.project;
    let resolver = Resolver::new(&settings.reference, &settings.output_dir);

    let mut report = RunReport {
        already_complete: plan.complete.clone(),
        unresolved: plan.unresolved.clone(),
        ..RunReport::default()
    };

    let mut progress: HashMap<String, UnitProgress> = plan
        .pending_units
        .iter()
        .map(|pending| {
            (
                pending.unit.label(),
                UnitProgress {
                    unit: &pending.unit,
                    remaining: pending.task_count,
                    frames_written: 0,
                    usd: 0.0,
                },
            )
        })
        .collect();

    // Units with a failed or skipped task; their later tasks never run.
    let mut broken: HashSet<String> = HashSet::new();
    let mut remote_called = false;

    for task in &plan.tasks {
        let label = &task.unit_label;
        if broken.contains(label) {
            debug!(unit = %label, step = task.step_index, "Skipping task of failed unit");
            continue;
        }

        let total_steps = match progress.get(label) {
            Some(p) => match &p.unit.payload {
                UnitPayload::Sequence { steps } => steps.len(),
                _ => 1,
            },
            None => 1,
        };
        let stage = task.describe(total_steps);

        let reference = match resolver.materialize(label, &task.frames_dir, &task.source) {
            Ok(path) => path,
            Err(e) => {
                warn!(unit = %label, error = %e, "Dependency missing; skipping unit");
                report.dependency_skipped.push((label.clone(), e.to_string()));
                broken.insert(label.clone());
                continue;
            }
        };

        if remote_called {
            tokio::time::sleep(CALL_SPACING).await;
        }
        remote_called = true;

        info!(unit = %label, stage = %stage, prompt = %task.prompt, "Requesting generation");
        let request = GenerationRequest {
            reference,
            prompt: task.prompt.clone(),
            frame_size: settings.frame_size,
        };
        let batch = match client.generate(&request).await {
            Ok(batch) => batch,
            Err(e) => {
                // Remote refusals are routine and retried by re-running;
                // local failures point at this machine.
                if e.is_remote() {
                    warn!(unit = %label, stage = %stage, error = %e, "Generation call failed");
                } else {
                    error!(unit = %label, stage = %stage, error = %e, "Generation call failed");
                }
                report.failed.push(FailedTask {
                    unit: label.clone(),
                    stage,
                    error: e.to_string(),
                });
                broken.insert(label.clone());
                continue;
            }
        };
        report.total_usd += batch.usd;

        // Frames hit disk one by one; an interrupted loop leaves a clean
        // contiguous prefix. Never write past the task's range.
        let mut write_error: Option<PipelineError> = None;
        let mut persisted = 0usize;
        for (offset, frame) in batch.frames.iter().take(task.frame_count).enumerate() {
            match inspect::write_frame(&task.frames_dir, task.start_frame + offset, frame) {
                Ok(_) => persisted += 1,
                Err(e) => {
                    write_error = Some(e);
                    break;
                }
            }
        }
        debug!(unit = %label, frames = persisted, usd = batch.usd, "Frames persisted");

        if let Some(entry) = progress.get_mut(label) {
            entry.frames_written += persisted;
            entry.usd += batch.usd;
        }

        if let Some(e) = write_error {
            warn!(unit = %label, stage = %stage, error = %e, "Frame persistence failed");
            report.failed.push(FailedTask {
                unit: label.clone(),
                stage,
                error: e.to_string(),
            });
            broken.insert(label.clone());
            continue;
        }

        if batch.frames.len() < task.frame_count {
            let error = format!(
                "Short batch: {} of {} frames returned",
                batch.frames.len(),
                task.frame_count
            );
            warn!(unit = %label, stage = %stage, error = %error, "Generation call failed");
            report.failed.push(FailedTask {
                unit: label.clone(),
                stage,
                error,
            });
            broken.insert(label.clone());
            continue;
        }

        let finished = match progress.get_mut(label) {
            Some(entry) => {
                entry.remaining = entry.remaining.saturating_sub(1);
                entry.remaining == 0
            }
            None => false,
        };
        if finished {
            if let Some(entry) = progress.get(label) {
                finalize_unit(entry.unit, entry.frames_written, entry.usd, spec, &mut report);
            }
        }
    }

    // Finalize-only entries: cycles whose forward run was already on disk.
    for pending in &plan.pending_units {
        if pending.task_count == 0 {
            finalize_unit(&pending.unit, 0, 0.0, spec, &mut report);
        }
    }

    report
}

/// Mirror (for cycles) and assemble a unit whose frames are all on disk.
fn finalize_unit(
    unit: &AnimationUnit,
    frames_written: usize,
    usd: f64,
    spec: &PipelineSpec,
    report: &mut RunReport,
) {
    let label = unit.label();
    match assemble::assemble_unit(unit, &spec.project) {
        Ok(done) => {
            info!(unit = %label, frames = done.frames, gif = %done.gif.display(), "Unit complete");
            report.completed.push(CompletedUnit {
                label,
                frames_written,
                usd,
            });
        }
        Err(e) => {
            warn!(unit = %label, error = %e, "Assembly failed");
            report.failed.push(FailedTask {
                unit: label,
                stage: "finalize".to_string(),
                error: e.to_string(),
            });
        }
    }
}
