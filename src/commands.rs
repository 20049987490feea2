use crate::model::{clamp_hours, parse_date, PlannerError, TaskCategory, TaskItem};
use crate::storage::{init_project_file, locate_tasks, PlannerScope};
use crate::store::{TaskPatch, TaskStore};
use crate::ui;
use anyhow::Result;
use std::env;

pub fn init() -> Result<()> {
    let location = init_project_file()?;
    println!("Initialized planner at {}", location.path.display());
    Ok(())
}

pub fn list(category: Option<String>) -> Result<()> {
    let store = load_current_store()?;
    let filter = category.map(|c| c.parse::<TaskCategory>()).transpose()?;
    println!(
        "Planner: {} ({})",
        store.location().path.display(),
        match store.location().scope {
            PlannerScope::Project => "project",
            PlannerScope::Global => "global",
        }
    );
    if store.is_empty() {
        println!("no tasks yet; run `planit add` or `planit tui` to create one");
        return Ok(());
    }
    for category in TaskCategory::ALL {
        if let Some(only) = filter {
            if category != only {
                continue;
            }
        }
        println!("{}", category.label());
        let mut empty = true;
        for task in store.snapshot().iter().filter(|t| t.category == category) {
            print_task(task);
            empty = false;
        }
        if empty {
            println!("  (empty)");
        }
        println!();
    }
    Ok(())
}

pub fn add(
    name: String,
    start: String,
    end: Option<String>,
    category: Option<String>,
    hours: f64,
) -> Result<()> {
    let mut store = load_current_store()?;
    let category = category
        .map(|c| c.parse::<TaskCategory>())
        .transpose()?
        .unwrap_or(TaskCategory::Todo);
    let start = parse_date(&start)?;
    let end = end.map(|e| parse_date(&e)).transpose()?.unwrap_or(start);
    let task = TaskItem::new(String::new(), name, category, start, end, hours);
    let id = store.add(task);
    warn_if_unsaved(&store);
    println!("Added task {}", id);
    Ok(())
}

pub fn edit(
    task_id: String,
    name: Option<String>,
    category: Option<String>,
    start: Option<String>,
    end: Option<String>,
    hours: Option<f64>,
) -> Result<()> {
    let mut store = load_current_store()?;
    let patch = TaskPatch {
        name,
        category: category.map(|c| c.parse()).transpose()?,
        start: start.map(|s| parse_date(&s)).transpose()?,
        end: end.map(|e| parse_date(&e)).transpose()?,
        daily_hours: hours.map(clamp_hours),
    };
    if !store.update(&task_id, patch) {
        return Err(PlannerError::TaskNotFound(task_id).into());
    }
    warn_if_unsaved(&store);
    println!("Updated task {}", task_id);
    Ok(())
}

pub fn remove(task_id: String) -> Result<()> {
    let mut store = load_current_store()?;
    if !store.remove(&task_id) {
        return Err(PlannerError::TaskNotFound(task_id).into());
    }
    warn_if_unsaved(&store);
    println!("Removed task {}", task_id);
    Ok(())
}

pub fn tui() -> Result<()> {
    let store = load_current_store()?;
    ui::run(store)
}

fn load_current_store() -> Result<TaskStore> {
    let cwd = env::current_dir()?;
    let location = locate_tasks(&cwd)?;
    Ok(TaskStore::load(location))
}

fn warn_if_unsaved(store: &TaskStore) {
    if store.save_failed() {
        eprintln!(
            "warning: could not write {}; the change was not persisted",
            store.location().path.display()
        );
    }
}

fn print_task(task: &TaskItem) {
    println!("  - {}: {}", task.id, task.name);
    println!(
        "    {} -> {} ({} day(s), {}h/day)",
        task.start.format("%Y-%m-%d"),
        task.end.format("%Y-%m-%d"),
        task.span_days(),
        task.daily_hours
    );
}
