//! CLI route: single route table and run context. Dispatches to domain
//! services and presentation.

use crate::assemble::assemble_all;
use crate::cli::parse::Commands;
use crate::cli::presentation;
use crate::client::{GenerationClient, PixelLabClient};
use crate::config::{PipelineSpec, DEFAULT_CONFIG_FILE};
use crate::cost::{estimate, PRICE_PER_CALL};
use crate::error::PipelineError;
use crate::execute::execute_plan;
use crate::init::scaffold_project;
use crate::inspect::DiskProbe;
use crate::plan::{build_plan, PlanFilter};
use crate::unit::AnimationKind;
use std::path::PathBuf;
use tracing::info;

/// Everything a command needs that comes from the CLI surface rather than
/// the config file.
pub struct RunContext {
    config_path: PathBuf,
}

impl RunContext {
    pub fn new(config: Option<PathBuf>) -> Result<Self, PipelineError> {
        Ok(RunContext {
            config_path: config.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE)),
        })
    }

    /// Execute a parsed command and return its rendered output.
    pub fn execute(&self, command: &Commands) -> Result<String, PipelineError> {
        match command {
            Commands::Generate { kind, names } => self.run_generate(kind.as_deref(), names),
            Commands::Assemble => self.run_assemble(),
            Commands::Cost => self.run_cost(),
            Commands::Balance => self.run_balance(),
            Commands::Init { name } => self.run_init(name.as_deref()),
        }
    }

    fn run_generate(&self, kind: Option<&str>, names: &[String]) -> Result<String, PipelineError> {
        let spec = PipelineSpec::load_validated(&self.config_path)?;
        let filter = build_filter(kind, names)?;
        let client = PixelLabClient::from_env()?;

        let plan = build_plan(&spec, &filter, &DiskProbe)?;
        info!(
            tasks = plan.task_count(),
            complete = plan.complete.len(),
            unresolved = plan.unresolved.len(),
            "Planned run, estimated spend ${:.2}",
            plan.task_count() as f64 * PRICE_PER_CALL
        );

        let runtime = create_runtime()?;
        let (opening, report, closing) = runtime.block_on(async {
            let opening = client.balance().await;
            let report = execute_plan(&plan, &spec, &client).await;
            let closing = client.balance().await;
            (opening, report, closing)
        });

        let output = presentation::format_run_report(&spec, &report, &opening, &closing);
        // A failed run still carries the summary to the user; it travels
        // inside the error so the exit code and the report stay together.
        match report.summary_error() {
            None => Ok(output),
            Some(PipelineError::GenerationFailed(counts)) => Err(PipelineError::GenerationFailed(
                format!("{}\n\n{}", counts, output),
            )),
            Some(err) => Err(err),
        }
    }

    fn run_assemble(&self) -> Result<String, PipelineError> {
        let spec = PipelineSpec::load_validated(&self.config_path)?;
        let report = assemble_all(&spec)?;
        Ok(presentation::format_assemble_report(&spec, &report))
    }

    fn run_cost(&self) -> Result<String, PipelineError> {
        let spec = PipelineSpec::load_validated(&self.config_path)?;
        let estimate = estimate(&spec, &PlanFilter::default())?;
        Ok(presentation::format_cost_table(&spec, &estimate))
    }

    fn run_balance(&self) -> Result<String, PipelineError> {
        let client = PixelLabClient::from_env()?;
        let runtime = create_runtime()?;
        let balance = runtime.block_on(client.balance())?;
        Ok(presentation::format_balance(&balance))
    }

    fn run_init(&self, name: Option<&str>) -> Result<String, PipelineError> {
        let parent = std::env::current_dir()?;
        let result = scaffold_project(&parent, name)?;
        Ok(presentation::format_init_summary(&result))
    }
}

/// Translate `--type` and `--name` flags into a plan filter. `all` and an
/// absent `--type` both select every kind.
fn build_filter(kind: Option<&str>, names: &[String]) -> Result<PlanFilter, PipelineError> {
    let kind = match kind {
        None => None,
        Some("all") => None,
        Some(value) => Some(AnimationKind::parse(value).ok_or_else(|| {
            PipelineError::Config(format!(
                "unknown animation type '{}' (expected one of: singles, emotes, chains, journeys, cycles, all)",
                value
            ))
        })?),
    };
    Ok(PlanFilter {
        kind,
        names: names.to_vec(),
    })
}

/// The CLI owns the only tokio runtime; commands are synchronous at the
/// route surface and block on the async pipeline internally.
fn create_runtime() -> Result<tokio::runtime::Runtime, PipelineError> {
    if tokio::runtime::Handle::try_current().is_ok() {
        return Err(PipelineError::GenerationFailed(
            "cannot run the pipeline from within an async runtime".to_string(),
        ));
    }
    Ok(tokio::runtime::Runtime::new()?)
}
