//! CLI domain: parse, route, output, and presentation only.
//! No domain orchestration; single route table dispatches to pipeline services.

mod output;
mod parse;
mod presentation;
mod route;

pub use output::map_error;
pub use parse::{Cli, Commands};
pub use presentation::{
    format_assemble_report, format_balance, format_cost_table, format_init_summary,
    format_run_report,
};
pub use route::RunContext;
