//! CLI command definitions and output rendering

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use colored::Colorize;

use crate::domain::{Plan, PlanVersion, StepSchedule, TimeBlock};
use crate::engine::PlanCreation;
use crate::normalize::PlanWarning;
use crate::resolve::Resolution;

/// PlanD - natural-language task planner
#[derive(Parser)]
#[command(name = "pd", about = "Turn task descriptions into time-blocked plans", version)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(short = 'l', long = "log-level", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Analyze task text into a new plan
    Analyze {
        /// Free-text task description
        text: String,

        /// User id the plan belongs to
        #[arg(short, long, default_value_t = 0)]
        user: i64,

        /// Preferred time blocks (morning, afternoon, evening)
        #[arg(short, long = "prefer", value_name = "BLOCK")]
        prefer: Vec<TimeBlock>,
    },

    /// Show a saved plan
    Show {
        /// Plan id
        plan_id: String,

        /// Also list version history
        #[arg(long)]
        versions: bool,
    },

    /// Re-check a saved plan for conflicts
    Conflicts {
        /// Plan id
        plan_id: String,

        /// User id the plan belongs to
        #[arg(short, long, default_value_t = 0)]
        user: i64,

        /// Date to check (YYYY-MM-DD, defaults to today)
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },

    /// Verify model connectivity
    Check,
}

/// Render a freshly created plan with its findings
pub fn render_creation(creation: &PlanCreation) {
    render_plan(&creation.plan);
    render_warnings(&creation.warnings);
    render_resolution(&creation.resolution);
}

/// Render one plan
pub fn render_plan(plan: &Plan) {
    println!();
    println!("{} {}", plan.title.bold(), format!("[{}]", plan.status).dimmed());
    println!(
        "  {} | v{} | {} | {} min total",
        plan.id.dimmed(),
        plan.version,
        plan.priority,
        plan.total_minutes
    );
    for step in &plan.steps {
        let when = match step.schedule {
            StepSchedule::At(start) => start.format("%Y-%m-%d %H:%M").to_string(),
            StepSchedule::Block(block) => block.to_string(),
        };
        let mark = if step.done { "x".green() } else { " ".normal() };
        println!(
            "  [{}] {}. {} ({} min, {}, {})",
            mark, step.ordinal, step.title, step.duration_minutes, step.priority, when
        );
    }
}

/// Render version history, oldest first
pub fn render_versions(versions: &[PlanVersion]) {
    println!();
    println!("{}", "Versions:".bold());
    for version in versions {
        println!(
            "  v{} by {} ({} steps, {} min)",
            version.version,
            version.source,
            version.snapshot.steps.len(),
            version.snapshot.total_minutes
        );
    }
}

/// Render normalizer warnings
pub fn render_warnings(warnings: &[PlanWarning]) {
    for warning in warnings {
        println!("  {} {}", "warning:".yellow().bold(), warning);
    }
}

/// Render a resolution outcome
pub fn render_resolution(resolution: &Resolution) {
    match resolution {
        Resolution::Clear(_) => {
            println!("  {}", "no conflicts".green());
        }
        Resolution::Conflicts(report) => {
            println!("  {}", "conflicts:".red().bold());
            for pair in &report.conflicts {
                println!("    {}", pair);
            }
            let alternatives: Vec<String> = report.alternatives.iter().map(ToString::to_string).collect();
            println!("  try instead: {}", alternatives.join(", "));
        }
    }
    for finding in resolution.capacity() {
        println!("  {} {}", "over capacity:".yellow().bold(), finding);
    }
}
