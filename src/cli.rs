use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "planit", version, about = "Terminal month-grid task planner")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Initialize a project task file in the current directory
    Init,
    /// List tasks in the current planner
    List {
        /// Filter by category (to do, in progress, review, completed)
        #[arg(long)]
        category: Option<String>,
    },
    /// Add a new task
    Add {
        /// Name of the task
        name: String,
        /// First day of the task (YYYY-MM-DD)
        start: String,
        /// Last day of the task, inclusive (defaults to the start day)
        #[arg(long)]
        end: Option<String>,
        /// Category (defaults to "to do")
        #[arg(long)]
        category: Option<String>,
        /// Hours per day, clamped to 1..=24
        #[arg(long, default_value_t = 8.0)]
        hours: f64,
    },
    /// Edit an existing task
    Edit {
        /// Task id to edit
        task_id: String,
        /// New name
        #[arg(long)]
        name: Option<String>,
        /// New category
        #[arg(long)]
        category: Option<String>,
        /// New first day (YYYY-MM-DD)
        #[arg(long)]
        start: Option<String>,
        /// New last day (YYYY-MM-DD)
        #[arg(long)]
        end: Option<String>,
        /// New hours per day
        #[arg(long)]
        hours: Option<f64>,
    },
    /// Remove a task
    Remove {
        /// Task id to remove
        task_id: String,
    },
    /// Launch the interactive TUI
    Tui,
}
