//! End-to-end generate runs against a scripted client.
//!
//! Drives plan + execute + assembly over a real temp project and asserts on
//! the artifacts left on disk, including what a second run does with them.

use crate::integration::test_utils::{full_project_yaml, load_project, png_bytes};
use async_trait::async_trait;
use parking_lot::Mutex;
use pixelart::client::{Balance, GenerationBatch, GenerationClient, GenerationRequest};
use pixelart::error::PipelineError;
use pixelart::execute::execute_plan;
use pixelart::inspect::{frame_path, DiskProbe};
use pixelart::plan::{build_plan, PlanFilter};
use std::collections::VecDeque;
use tempfile::TempDir;

/// Replays a fixed reply sequence; generation order is deterministic, so a
/// script addresses each remote call by position.
struct ScriptedClient {
    replies: Mutex<VecDeque<Result<GenerationBatch, PipelineError>>>,
    calls: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedClient {
    fn new(replies: Vec<Result<GenerationBatch, PipelineError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl GenerationClient for ScriptedClient {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationBatch, PipelineError> {
        self.calls.lock().push(request.clone());
        self.replies
            .lock()
            .pop_front()
            .expect("script exhausted: unexpected generate call")
    }

    async fn balance(&self) -> Result<Balance, PipelineError> {
        Ok(Balance {
            credits_usd: 25.0,
            generations_used: 0,
            generations_total: 100,
        })
    }
}

/// A 16-frame batch whose frames carry distinct bytes, so mirror and
/// persistence order stay observable.
fn batch(base_shade: u8) -> Result<GenerationBatch, PipelineError> {
    Ok(GenerationBatch {
        frames: (0..16).map(|i| png_bytes(8, base_shade + i as u8)).collect(),
        usd: 0.16,
    })
}

#[tokio::test(start_paused = true)]
async fn test_full_run_generates_and_assembles_every_unit() {
    let tmp = TempDir::new().unwrap();
    let spec = load_project(tmp.path(), full_project_yaml());
    let output = spec.project.output_dir.clone();

    // 9 calls in walk order: flame, star, emote, chain x2, journey x3, cycle.
    let client = ScriptedClient::new((0..9).map(|i| batch(i * 20)).collect());
    let plan = build_plan(&spec, &PlanFilter::default(), &DiskProbe).unwrap();
    let report = execute_plan(&plan, &spec, &client).await;

    assert!(report.is_clean(), "failures: {:?}", report.failed);
    assert_eq!(client.call_count(), 9);
    assert_eq!(report.completed.len(), 6);
    assert!((report.total_usd - 9.0 * 0.16).abs() < 1e-9);

    // Every unit leaves a GIF and a static PNG.
    for (kind, name) in [
        ("singles", "flame"),
        ("singles", "star"),
        ("emotes", "flame"),
        ("chains", "flame_to_star"),
        ("journeys", "long_way"),
        ("cycles", "spin"),
    ] {
        assert!(
            output.join(kind).join(format!("{}.gif", name)).exists(),
            "missing gif for {}/{}",
            kind,
            name
        );
        assert!(
            output.join("static").join(format!("{}.png", name)).exists(),
            "missing static for {}/{}",
            kind,
            name
        );
    }

    // The cycle's return leg is mirrored locally, byte for byte.
    let cycle_dir = output.join("cycles").join("spin");
    for i in 0..16 {
        let forward = std::fs::read(frame_path(&cycle_dir, 15 - i)).unwrap();
        let mirrored = std::fs::read(frame_path(&cycle_dir, 16 + i)).unwrap();
        assert_eq!(forward, mirrored, "mirror mismatch at frame {}", 16 + i);
    }
}

#[tokio::test(start_paused = true)]
async fn test_second_run_makes_no_remote_calls() {
    let tmp = TempDir::new().unwrap();
    let spec = load_project(tmp.path(), full_project_yaml());

    let first = ScriptedClient::new((0..9).map(|i| batch(i * 20)).collect());
    let plan = build_plan(&spec, &PlanFilter::default(), &DiskProbe).unwrap();
    let report = execute_plan(&plan, &spec, &first).await;
    assert!(report.is_clean());

    // Everything is on disk now; the next plan is empty and executes for free.
    let replan = build_plan(&spec, &PlanFilter::default(), &DiskProbe).unwrap();
    assert!(replan.is_empty());
    assert_eq!(replan.complete.len(), 6);

    let second = ScriptedClient::new(Vec::new());
    let rerun = execute_plan(&replan, &spec, &second).await;
    assert!(rerun.is_clean());
    assert_eq!(second.call_count(), 0);
    assert!(rerun.completed.is_empty());
    assert_eq!(rerun.already_complete.len(), 6);
    assert_eq!(rerun.total_usd, 0.0);
}

#[tokio::test(start_paused = true)]
async fn test_failed_unit_does_not_block_the_rest_and_resumes_later() {
    let tmp = TempDir::new().unwrap();
    let spec = load_project(tmp.path(), full_project_yaml());

    // Second call (singles/star) fails; everything else succeeds.
    let mut script = vec![batch(0)];
    script.push(Err(PipelineError::RequestFailed("boom".to_string())));
    script.extend((2..9).map(|i| batch(i * 20)));

    let client = ScriptedClient::new(script);
    let plan = build_plan(&spec, &PlanFilter::default(), &DiskProbe).unwrap();
    let report = execute_plan(&plan, &spec, &client).await;

    assert_eq!(client.call_count(), 9);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].stage, "singles/star");
    assert_eq!(report.completed.len(), 5);
    assert!((report.total_usd - 8.0 * 0.16).abs() < 1e-9);

    // The rerun only needs the missing unit.
    let replan = build_plan(&spec, &PlanFilter::default(), &DiskProbe).unwrap();
    assert_eq!(replan.task_count(), 1);
    assert_eq!(replan.tasks[0].unit_label, "singles/star");

    let retry = ScriptedClient::new(vec![batch(200)]);
    let rerun = execute_plan(&replan, &spec, &retry).await;
    assert!(rerun.is_clean());
    assert_eq!(rerun.completed.len(), 1);
    assert_eq!(rerun.completed[0].label, "singles/star");
}

#[tokio::test(start_paused = true)]
async fn test_failed_parent_skips_dependent_without_calling_the_api() {
    let tmp = TempDir::new().unwrap();
    let spec = load_project(tmp.path(), full_project_yaml());

    // First call (singles/flame) fails; emotes/flame sources its reference
    // from that single's final frame, so it must skip without a call.
    let mut script: Vec<Result<GenerationBatch, PipelineError>> =
        vec![Err(PipelineError::RequestFailed("boom".to_string()))];
    script.extend((1..8).map(|i| batch(i * 20)));

    let client = ScriptedClient::new(script);
    let plan = build_plan(&spec, &PlanFilter::default(), &DiskProbe).unwrap();
    let report = execute_plan(&plan, &spec, &client).await;

    assert_eq!(client.call_count(), 8);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.dependency_skipped.len(), 1);
    assert_eq!(report.dependency_skipped[0].0, "emotes/flame");
    assert!(!report.is_clean());

    let err = report.summary_error().unwrap();
    let message = err.to_string();
    assert!(message.contains("1 task(s) failed"));
    assert!(message.contains("1 unit(s) skipped"));
}
