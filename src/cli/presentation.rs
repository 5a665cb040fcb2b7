//! CLI presentation: text formatters per command family.

use crate::assemble::AssembleReport;
use crate::client::Balance;
use crate::config::PipelineSpec;
use crate::cost::CostEstimate;
use crate::error::PipelineError;
use crate::execute::RunReport;
use crate::init::InitResult;
use comfy_table::presets::UTF8_FULL;
use comfy_table::Table;
use owo_colors::OwoColorize;

/// Generate command summary: project header, opening balance, per-unit
/// outcomes, spend, closing balance.
pub fn format_run_report(
    spec: &PipelineSpec,
    report: &RunReport,
    opening: &Result<Balance, PipelineError>,
    closing: &Result<Balance, PipelineError>,
) -> String {
    let mut out = format!(
        "Project: {}\nOutput: {}\n",
        spec.project.name,
        spec.project.output_dir.display()
    );
    out.push_str(&balance_line("Balance", opening));
    out.push('\n');

    out.push_str(&format!("{}\n", "Run summary:".bold()));
    for unit in &report.completed {
        let detail = if unit.frames_written > 0 {
            format!("{} frames, ${:.2}", unit.frames_written, unit.usd)
        } else {
            "finalized".to_string()
        };
        out.push_str(&format!("  {} {} ({})\n", "✓".green(), unit.label, detail));
    }
    for label in &report.already_complete {
        out.push_str(&format!(
            "  {} {} (already complete)\n",
            "⊘".yellow(),
            label
        ));
    }
    for (label, reason) in &report.unresolved {
        out.push_str(&format!("  {} {} ({})\n", "⊘".yellow(), label, reason));
    }
    for (label, reason) in &report.dependency_skipped {
        out.push_str(&format!(
            "  {} {} (skipped: {})\n",
            "⊘".yellow(),
            label,
            reason
        ));
    }
    for failed in &report.failed {
        out.push_str(&format!(
            "  {} {}: {}\n",
            "✗".red(),
            failed.stage,
            failed.error
        ));
    }
    if report.completed.is_empty()
        && report.already_complete.is_empty()
        && report.unresolved.is_empty()
        && report.dependency_skipped.is_empty()
        && report.failed.is_empty()
    {
        out.push_str("  Nothing to do.\n");
    }

    out.push_str(&format!("\nTotal cost: ${:.2}\n", report.total_usd));
    out.push_str(&balance_line("Remaining balance", closing));
    out
}

fn balance_line(label: &str, balance: &Result<Balance, PipelineError>) -> String {
    match balance {
        Ok(balance) => format!("{}: ${:.2}\n", label, balance.credits_usd),
        Err(e) => format!("Balance check failed: {}\n", e),
    }
}

/// Cost command table: one row per configured kind plus a totals row.
pub fn format_cost_table(spec: &PipelineSpec, estimate: &CostEstimate) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Kind", "Units", "API calls", "USD"]);
    for row in &estimate.rows {
        table.add_row(vec![
            row.kind.dir_name().to_string(),
            row.units.to_string(),
            row.calls.to_string(),
            format!("${:.2}", row.usd),
        ]);
    }
    table.add_row(vec![
        "total".to_string(),
        String::new(),
        estimate.total_calls.to_string(),
        format!("${:.2}", estimate.total_usd),
    ]);

    format!(
        "Project: {}\n\n{}\n\nEstimated cost: ~${:.2}",
        spec.project.name, table, estimate.total_usd
    )
}

/// Balance command output.
pub fn format_balance(balance: &Balance) -> String {
    format!(
        "Credits: ${:.2} USD\nGenerations: {}/{}",
        balance.credits_usd, balance.generations_used, balance.generations_total
    )
}

/// Init command summary: created and skipped files, then next steps.
pub fn format_init_summary(result: &InitResult) -> String {
    let mut out = String::new();
    for path in &result.created {
        out.push_str(&format!("  {} {}\n", "✓".green(), path.display()));
    }
    for path in &result.skipped {
        out.push_str(&format!(
            "  {} {} (already exists, skipped)\n",
            "⊘".yellow(),
            path.display()
        ));
    }

    let dir = result.project_dir.display();
    out.push_str(&format!("\nProject initialized at: {}/\n", dir));
    out.push_str("\nNext steps:\n");
    out.push_str(&format!(
        "  1. Edit {}/config.yaml to customize your animations\n",
        dir
    ));
    out.push_str(&format!(
        "  2. Replace {}/reference.png with your own 64x64 starting image\n",
        dir
    ));
    out.push_str("  3. export PIXELLAB_API_KEY=your-key-here\n");
    out.push_str(&format!("  4. pixelart cost --config {}/config.yaml\n", dir));
    out.push_str(&format!("  5. pixelart generate --config {}/config.yaml", dir));
    out
}

/// Assemble command summary: artifacts written, incomplete units skipped,
/// per-unit failures, and frame directories no configured unit claims.
pub fn format_assemble_report(spec: &PipelineSpec, report: &AssembleReport) -> String {
    let mut out = format!(
        "Project: {}\nOutput: {}\n",
        spec.project.name,
        spec.project.output_dir.display()
    );

    if report.assembled.is_empty() {
        out.push_str("\nNo complete units to assemble.\n");
    } else {
        out.push_str(&format!(
            "\n{}\n",
            format!("Assembled ({}):", report.assembled.len()).bold()
        ));
        for unit in &report.assembled {
            out.push_str(&format!(
                "  {} {} ({} frames) -> {}\n",
                "✓".green(),
                unit.label,
                unit.frames,
                unit.gif.display()
            ));
        }
    }

    if !report.incomplete.is_empty() {
        out.push_str(&format!(
            "\n{}\n",
            format!("Incomplete, skipped ({}):", report.incomplete.len()).bold()
        ));
        for (label, existing, expected) in &report.incomplete {
            out.push_str(&format!(
                "  {} {} ({}/{} frames)\n",
                "⊘".yellow(),
                label,
                existing,
                expected
            ));
        }
    }

    if !report.failed.is_empty() {
        out.push_str(&format!(
            "\n{}\n",
            format!("Failed ({}):", report.failed.len()).bold()
        ));
        for (label, reason) in &report.failed {
            out.push_str(&format!("  {} {}: {}\n", "✗".red(), label, reason));
        }
    }

    if !report.unclaimed.is_empty() {
        out.push_str("\nUnclaimed frame directories (not in config):\n");
        for dir in &report.unclaimed {
            out.push_str(&format!("  - {}\n", dir.display()));
        }
    }

    out
}
