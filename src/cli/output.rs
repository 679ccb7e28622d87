use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::task::Task;
use crate::ops::filter::FilteredTasks;

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskListJson<'a> {
    pub tasks: &'a [&'a Task],
    pub filtered_count: usize,
    pub total_count: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDetailJson<'a> {
    #[serde(flatten)]
    pub task: &'a Task,
    pub is_overdue: bool,
}

#[derive(Serialize)]
pub struct DeletedJson<'a> {
    pub deleted: &'a str,
}

pub fn list_to_json<'a>(filtered: &'a FilteredTasks<'a>) -> TaskListJson<'a> {
    TaskListJson {
        tasks: &filtered.tasks,
        filtered_count: filtered.filtered_count,
        total_count: filtered.total_count,
    }
}

// ---------------------------------------------------------------------------
// Human-readable formatting
// ---------------------------------------------------------------------------

fn check_char(task: &Task) -> char {
    if task.is_complete { 'x' } else { ' ' }
}

/// Format a single task as a one-line summary
pub fn format_task_line(task: &Task, now: DateTime<Utc>) -> String {
    let mut line = format!("[{}] {}  {}", check_char(task), task.id, task.title);
    if let Some(due) = task.due_at.as_deref().filter(|d| !d.is_empty()) {
        line.push_str(&format!("  (due {})", due));
    }
    if task.is_overdue(now) {
        line.push_str("  overdue");
    }
    line
}

/// Format detailed task view
pub fn format_task_detail(task: &Task, now: DateTime<Utc>) -> Vec<String> {
    let mut lines = Vec::new();
    lines.push(format!("[{}] {}  {}", check_char(task), task.id, task.title));

    let status = if task.is_complete {
        "complete"
    } else if task.is_overdue(now) {
        "overdue"
    } else {
        "incomplete"
    };
    lines.push(format!("status: {}", status));

    if let Some(due) = task.due_at.as_deref().filter(|d| !d.is_empty()) {
        match task.due_date() {
            Some(_) => lines.push(format!("due: {}", due)),
            None => lines.push(format!("due: {} (unrecognized date)", due)),
        }
    }

    if let Some(detail) = task.detail.as_deref().filter(|d| !d.is_empty()) {
        lines.push("detail:".to_string());
        for line in detail.lines() {
            lines.push(format!("  {}", line));
        }
    }

    lines
}

/// Format the list view: one line per task, then the count summary
pub fn format_task_list(filtered: &FilteredTasks<'_>, now: DateTime<Utc>) -> Vec<String> {
    let mut lines: Vec<String> = filtered
        .tasks
        .iter()
        .map(|t| format_task_line(t, now))
        .collect();
    if !lines.is_empty() {
        lines.push(String::new());
    }
    lines.push(filtered.summary());
    lines
}
