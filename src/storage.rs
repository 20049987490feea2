use crate::model::TaskItem;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlannerScope {
    Project,
    Global,
}

#[derive(Debug, Clone)]
pub struct TaskFileLocation {
    pub path: PathBuf,
    pub scope: PlannerScope,
}

pub fn init_project_file() -> Result<TaskFileLocation> {
    let cwd = env::current_dir()?;
    let dir = cwd.join(".planit");
    fs::create_dir_all(&dir).context("failed to create .planit directory")?;
    let location = TaskFileLocation {
        path: dir.join("tasks.json"),
        scope: PlannerScope::Project,
    };
    if !location.path.exists() {
        save_tasks(&location, &[])?;
    }
    Ok(location)
}

pub fn locate_tasks(start: &Path) -> Result<TaskFileLocation> {
    if let Some(path) = find_project_file(start) {
        return Ok(TaskFileLocation {
            path,
            scope: PlannerScope::Project,
        });
    }
    Ok(TaskFileLocation {
        path: global_tasks_path()?,
        scope: PlannerScope::Global,
    })
}

/// Reads the persisted task collection. Absent or malformed data yields an
/// empty collection; this never surfaces an error.
pub fn load_tasks(location: &TaskFileLocation) -> Vec<TaskItem> {
    let Ok(data) = fs::read_to_string(&location.path) else {
        return Vec::new();
    };
    serde_json::from_str(&data).unwrap_or_default()
}

pub fn save_tasks(location: &TaskFileLocation, tasks: &[TaskItem]) -> Result<()> {
    if let Some(parent) = location.path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating {:?}", parent))?;
    }
    let serialized = serde_json::to_string_pretty(tasks).context("serializing tasks")?;
    fs::write(&location.path, serialized)
        .with_context(|| format!("writing {:?}", location.path))?;
    Ok(())
}

fn find_project_file(start: &Path) -> Option<PathBuf> {
    let mut dir = Some(start);
    while let Some(current) = dir {
        let candidate = current.join(".planit/tasks.json");
        if candidate.exists() {
            return Some(candidate);
        }
        dir = current.parent();
    }
    None
}

fn global_tasks_path() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("", "", "planit").context("locating data directory")?;
    Ok(dirs.data_dir().join("tasks.json"))
}
