//! Cost Estimation
//!
//! Prices a fresh plan rather than keeping a per-kind cost table by hand:
//! the estimate runs the planner against an empty-disk assumption and counts
//! emitted tasks. Documented per-kind costs (one call for Single, Emote, and
//! Cycle, one per step for Chain and Journey) follow from the planner's
//! emission rule.

use crate::config::PipelineSpec;
use crate::error::PipelineError;
use crate::inspect::EmptyDiskProbe;
use crate::plan::{build_plan, PlanFilter};
use crate::unit::AnimationKind;

/// Flat price of one 16-frame generation call, in USD.
pub const PRICE_PER_CALL: f64 = 0.16;

/// Per-kind slice of a fresh-plan estimate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostRow {
    pub kind: AnimationKind,
    pub units: usize,
    pub calls: usize,
    pub usd: f64,
}

/// Fresh-project cost breakdown.
#[derive(Debug, Clone, Default)]
pub struct CostEstimate {
    /// One row per kind that has any configured unit, in kind order.
    pub rows: Vec<CostRow>,
    pub total_calls: usize,
    pub total_usd: f64,
}

/// Price a fresh run of the filtered spec.
pub fn estimate(spec: &PipelineSpec, filter: &PlanFilter) -> Result<CostEstimate, PipelineError> {
    let plan = build_plan(spec, filter, &EmptyDiskProbe)?;

    let mut estimate = CostEstimate::default();
    for kind in AnimationKind::ALL {
        let units = plan
            .pending_units
            .iter()
            .filter(|p| p.unit.kind == kind)
            .count();
        let calls = plan.tasks.iter().filter(|t| t.kind == kind).count();
        if units == 0 && calls == 0 {
            continue;
        }
        estimate.rows.push(CostRow {
            kind,
            units,
            calls,
            usd: calls as f64 * PRICE_PER_CALL,
        });
    }

    estimate.total_calls = plan.tasks.len();
    estimate.total_usd = plan.tasks.len() as f64 * PRICE_PER_CALL;
    Ok(estimate)
}
