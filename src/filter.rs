use crate::model::{ranges_overlap, TaskCategory, TaskItem};
use chrono::{Duration, NaiveDate};
use std::collections::BTreeSet;

/// Transient view filters. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FiltersState {
    pub categories: BTreeSet<TaskCategory>,
    pub time_window_weeks: u8,
    pub search: String,
}

impl FiltersState {
    pub const MAX_WINDOW_WEEKS: u8 = 3;

    pub fn reset(&mut self) {
        *self = FiltersState::default();
    }

    pub fn is_default(&self) -> bool {
        self.categories.is_empty() && self.time_window_weeks == 0 && self.search.trim().is_empty()
    }

    pub fn toggle_category(&mut self, category: TaskCategory) {
        if !self.categories.remove(&category) {
            self.categories.insert(category);
        }
    }

    pub fn cycle_time_window(&mut self) {
        self.time_window_weeks = (self.time_window_weeks + 1) % (Self::MAX_WINDOW_WEEKS + 1);
    }

    /// A task is visible iff the category, search, and time-window
    /// predicates all pass.
    pub fn matches(&self, task: &TaskItem, today: NaiveDate) -> bool {
        self.passes_category(task) && self.passes_search(task) && self.passes_window(task, today)
    }

    fn passes_category(&self, task: &TaskItem) -> bool {
        self.categories.is_empty() || self.categories.contains(&task.category)
    }

    fn passes_search(&self, task: &TaskItem) -> bool {
        let term = self.search.trim().to_lowercase();
        term.is_empty() || task.name.to_lowercase().contains(&term)
    }

    fn passes_window(&self, task: &TaskItem, today: NaiveDate) -> bool {
        if self.time_window_weeks == 0 {
            return true;
        }
        let window_end = today + Duration::weeks(self.time_window_weeks as i64);
        ranges_overlap(task.start, task.end, today, window_end)
    }
}

pub fn visible_tasks(tasks: &[TaskItem], filters: &FiltersState, today: NaiveDate) -> Vec<TaskItem> {
    tasks
        .iter()
        .filter(|t| filters.matches(t, today))
        .cloned()
        .collect()
}
