mod cli;
mod commands;
mod filter;
mod gesture;
mod grid;
mod lanes;
mod model;
mod storage;
mod store;
mod ui;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let args = cli::Cli::parse();
    let command = args.command.unwrap_or(cli::Command::Tui);
    match command {
        cli::Command::Init => commands::init(),
        cli::Command::List { category } => commands::list(category),
        cli::Command::Add {
            name,
            start,
            end,
            category,
            hours,
        } => commands::add(name, start, end, category, hours),
        cli::Command::Edit {
            task_id,
            name,
            category,
            start,
            end,
            hours,
        } => commands::edit(task_id, name, category, start, end, hours),
        cli::Command::Remove { task_id } => commands::remove(task_id),
        cli::Command::Tui => commands::tui(),
    }
}
