use crate::model::{TaskCategory, TaskId, TaskItem};
use crate::storage::{load_tasks, save_tasks, TaskFileLocation};
use chrono::NaiveDate;
use rand::{distributions::Alphanumeric, Rng};

/// Field replacements for `TaskStore::update`. `None` leaves a field alone.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub name: Option<String>,
    pub category: Option<TaskCategory>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub daily_hours: Option<u32>,
}

/// Single owner of the task collection. Every successful mutation rewrites
/// the whole persisted file; a failed write keeps the in-memory state
/// authoritative for the session and raises a flag instead of an error.
pub struct TaskStore {
    location: TaskFileLocation,
    tasks: Vec<TaskItem>,
    save_failed: bool,
}

impl TaskStore {
    pub fn load(location: TaskFileLocation) -> Self {
        let tasks = load_tasks(&location);
        TaskStore {
            location,
            tasks,
            save_failed: false,
        }
    }

    pub fn location(&self) -> &TaskFileLocation {
        &self.location
    }

    pub fn snapshot(&self) -> &[TaskItem] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&TaskItem> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// True when the most recent persistence attempt failed.
    pub fn save_failed(&self) -> bool {
        self.save_failed
    }

    /// Appends a task and returns the id actually stored. A missing or
    /// colliding id is regenerated rather than trusted.
    pub fn add(&mut self, mut task: TaskItem) -> TaskId {
        while task.id.is_empty() || self.get(&task.id).is_some() {
            task.id = generate_id();
        }
        let id = task.id.clone();
        self.tasks.push(task);
        self.persist();
        id
    }

    /// Replaces the named fields of the matching task. No-op when the id is
    /// absent; returns whether a task was touched.
    pub fn update(&mut self, id: &str, patch: TaskPatch) -> bool {
        let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) else {
            return false;
        };
        if let Some(name) = patch.name {
            task.name = name;
        }
        if let Some(category) = patch.category {
            task.category = category;
        }
        if let Some(start) = patch.start {
            task.start = start;
        }
        if let Some(end) = patch.end {
            task.end = end;
        }
        if let Some(hours) = patch.daily_hours {
            task.daily_hours = hours.clamp(1, 24);
        }
        if task.end < task.start {
            std::mem::swap(&mut task.start, &mut task.end);
        }
        self.persist();
        true
    }

    /// Removes the matching task. No-op when the id is absent.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.id != id);
        if self.tasks.len() == before {
            return false;
        }
        self.persist();
        true
    }

    fn persist(&mut self) {
        self.save_failed = save_tasks(&self.location, &self.tasks).is_err();
    }
}

pub fn generate_id() -> TaskId {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(char::from)
        .collect()
}
