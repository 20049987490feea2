use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub type TaskId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TaskCategory {
    #[serde(rename = "To Do")]
    Todo,
    #[serde(rename = "In Progress")]
    InProgress,
    Review,
    Completed,
}

impl TaskCategory {
    pub const ALL: [TaskCategory; 4] = [
        TaskCategory::Todo,
        TaskCategory::InProgress,
        TaskCategory::Review,
        TaskCategory::Completed,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            TaskCategory::Todo => "To Do",
            TaskCategory::InProgress => "In Progress",
            TaskCategory::Review => "Review",
            TaskCategory::Completed => "Completed",
        }
    }

    pub fn next(&self) -> TaskCategory {
        match self {
            TaskCategory::Todo => TaskCategory::InProgress,
            TaskCategory::InProgress => TaskCategory::Review,
            TaskCategory::Review => TaskCategory::Completed,
            TaskCategory::Completed => TaskCategory::Todo,
        }
    }

    pub fn prev(&self) -> TaskCategory {
        match self {
            TaskCategory::Todo => TaskCategory::Completed,
            TaskCategory::InProgress => TaskCategory::Todo,
            TaskCategory::Review => TaskCategory::InProgress,
            TaskCategory::Completed => TaskCategory::Review,
        }
    }
}

impl fmt::Display for TaskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for TaskCategory {
    type Err = PlannerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace([' ', '-', '_'], "").as_str() {
            "todo" => Ok(TaskCategory::Todo),
            "inprogress" | "doing" => Ok(TaskCategory::InProgress),
            "review" => Ok(TaskCategory::Review),
            "completed" | "done" => Ok(TaskCategory::Completed),
            _ => Err(PlannerError::UnknownCategory(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskItem {
    pub id: TaskId,
    pub name: String,
    pub category: TaskCategory,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub daily_hours: u32,
}

#[derive(thiserror::Error, Debug)]
pub enum PlannerError {
    #[error("unknown category: {0}")]
    UnknownCategory(String),
    #[error("task not found: {0}")]
    TaskNotFound(String),
    #[error("invalid date (use YYYY-MM-DD): {0}")]
    InvalidDate(String),
}

impl TaskItem {
    /// Builds a task with an ordered date range and clamped hours. An
    /// inverted input range is swapped rather than rejected.
    pub fn new(
        id: TaskId,
        name: String,
        category: TaskCategory,
        start: NaiveDate,
        end: NaiveDate,
        daily_hours: f64,
    ) -> Self {
        let (start, end) = if start <= end { (start, end) } else { (end, start) };
        TaskItem {
            id,
            name,
            category,
            start,
            end,
            daily_hours: clamp_hours(daily_hours),
        }
    }

    /// Inclusive length of the date range in days (a one-day task spans 1).
    pub fn span_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    pub fn touches(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }
}

/// Two inclusive ranges share at least one calendar day.
pub fn ranges_overlap(s1: NaiveDate, e1: NaiveDate, s2: NaiveDate, e2: NaiveDate) -> bool {
    s1 <= e2 && s2 <= e1
}

/// Rounds to the nearest whole hour and clamps to 1..=24.
pub fn clamp_hours(hours: f64) -> u32 {
    if !hours.is_finite() {
        return 1;
    }
    (hours.round() as i64).clamp(1, 24) as u32
}

pub fn parse_date(input: &str) -> Result<NaiveDate, PlannerError> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d")
        .map_err(|_| PlannerError::InvalidDate(input.to_string()))
}
