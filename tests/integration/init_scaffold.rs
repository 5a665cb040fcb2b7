//! Integration tests for project scaffolding.

use pixelart::config::PipelineSpec;
use pixelart::cost::{estimate, PRICE_PER_CALL};
use pixelart::init::scaffold_project;
use pixelart::plan::PlanFilter;
use tempfile::TempDir;

#[test]
fn test_scaffolded_project_loads_and_validates() {
    let tmp = TempDir::new().unwrap();
    let result = scaffold_project(tmp.path(), None).unwrap();

    assert_eq!(result.project_dir, tmp.path().join("my-project"));
    assert_eq!(result.created.len(), 2);
    assert!(result.skipped.is_empty());

    let spec = PipelineSpec::load_validated(&result.project_dir.join("config.yaml")).unwrap();
    assert_eq!(spec.singles.len(), 3);
    assert_eq!(spec.emotes.len(), 1);
    assert_eq!(spec.chains.len(), 1);
    assert_eq!(spec.cycles.len(), 1);

    let sprite = image::open(result.project_dir.join("reference.png")).unwrap();
    assert_eq!(sprite.width(), 64);
    assert_eq!(sprite.height(), 64);
}

#[test]
fn test_scaffold_accepts_a_custom_name() {
    let tmp = TempDir::new().unwrap();
    let result = scaffold_project(tmp.path(), Some("sprites")).unwrap();
    assert_eq!(result.project_dir, tmp.path().join("sprites"));

    let spec = PipelineSpec::load_validated(&result.project_dir.join("config.yaml")).unwrap();
    assert_eq!(spec.project.name, "sprites");
}

#[test]
fn test_rerunning_init_preserves_edits() {
    let tmp = TempDir::new().unwrap();
    let first = scaffold_project(tmp.path(), None).unwrap();
    let config_path = first.project_dir.join("config.yaml");

    let edited = "project:\n  name: hand-edited\n";
    std::fs::write(&config_path, edited).unwrap();

    let second = scaffold_project(tmp.path(), None).unwrap();
    assert!(second.created.is_empty());
    assert_eq!(second.skipped.len(), 2);
    assert_eq!(std::fs::read_to_string(&config_path).unwrap(), edited);
}

#[test]
fn test_starter_config_plans_seven_paid_calls() {
    let tmp = TempDir::new().unwrap();
    let result = scaffold_project(tmp.path(), None).unwrap();
    let spec = PipelineSpec::load_validated(&result.project_dir.join("config.yaml")).unwrap();

    // 3 singles + 1 emote + 2 chain steps + 1 cycle forward run.
    let estimate = estimate(&spec, &PlanFilter::default()).unwrap();
    assert_eq!(estimate.total_calls, 7);
    assert!((estimate.total_usd - 7.0 * PRICE_PER_CALL).abs() < 1e-9);
}
