use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::model::task::Task;
use crate::ops::debounce::Debounced;

/// Default debounce window for filter text
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// One of the predicate toggles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    Complete,
    Incomplete,
    Overdue,
}

/// Predicate toggles. All off means no restriction; otherwise a task is kept
/// when it matches any toggle that is on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskFilters {
    pub show_complete: bool,
    pub show_incomplete: bool,
    pub show_overdue: bool,
}

impl TaskFilters {
    pub fn is_active(&self) -> bool {
        self.show_complete || self.show_incomplete || self.show_overdue
    }

    pub fn toggle(&mut self, kind: FilterKind) {
        let flag = match kind {
            FilterKind::Complete => &mut self.show_complete,
            FilterKind::Incomplete => &mut self.show_incomplete,
            FilterKind::Overdue => &mut self.show_overdue,
        };
        *flag = !*flag;
    }

    /// Whether `task` satisfies at least one active toggle
    pub fn matches(&self, task: &Task, now: DateTime<Utc>) -> bool {
        (self.show_complete && task.is_complete)
            || (self.show_incomplete && !task.is_complete)
            || (self.show_overdue && task.is_overdue(now))
    }
}

/// Case-insensitive substring match on title or detail. Blank queries match
/// everything.
pub fn matches_text(task: &Task, query: &str) -> bool {
    let query = query.trim();
    if query.is_empty() {
        return true;
    }
    let needle = query.to_lowercase();
    task.title.to_lowercase().contains(&needle)
        || task
            .detail
            .as_deref()
            .is_some_and(|d| d.to_lowercase().contains(&needle))
}

/// Text stage, then predicate stage. Input order is preserved.
pub fn filter_tasks<'a>(
    tasks: &'a [Task],
    query: &str,
    filters: &TaskFilters,
    now: DateTime<Utc>,
) -> Vec<&'a Task> {
    let text_active = !query.trim().is_empty();
    let filters_active = filters.is_active();
    tasks
        .iter()
        .filter(|t| !text_active || matches_text(t, query))
        .filter(|t| !filters_active || filters.matches(t, now))
        .collect()
}

// ---------------------------------------------------------------------------
// Filter engine
// ---------------------------------------------------------------------------

/// Result of applying the engine to a task list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilteredTasks<'a> {
    pub tasks: Vec<&'a Task>,
    pub filtered_count: usize,
    pub total_count: usize,
}

impl FilteredTasks<'_> {
    /// "N of M items"
    pub fn summary(&self) -> String {
        let noun = if self.total_count == 1 { "item" } else { "items" };
        format!("{} of {} {}", self.filtered_count, self.total_count, noun)
    }
}

/// Filter state for a list view: debounced text plus predicate toggles
#[derive(Debug, Clone)]
pub struct FilterEngine {
    text: Debounced<String>,
    filters: TaskFilters,
}

impl Default for FilterEngine {
    fn default() -> Self {
        FilterEngine::new(DEFAULT_DEBOUNCE)
    }
}

impl FilterEngine {
    pub fn new(debounce: Duration) -> Self {
        FilterEngine {
            text: Debounced::new(String::new(), debounce),
            filters: TaskFilters::default(),
        }
    }

    /// Text as typed, before debouncing
    pub fn filter_text(&self) -> &str {
        self.text.raw()
    }

    /// Text the filter is currently applying
    pub fn debounced_text(&self) -> &str {
        self.text.current()
    }

    pub fn set_filter_text(&mut self, text: impl Into<String>) {
        self.text.set(text.into());
    }

    pub fn clear_filter_text(&mut self) {
        self.text.set(String::new());
    }

    pub fn filters(&self) -> TaskFilters {
        self.filters
    }

    pub fn set_filters(&mut self, filters: TaskFilters) {
        self.filters = filters;
    }

    pub fn toggle_filter(&mut self, kind: FilterKind) {
        self.filters.toggle(kind);
    }

    /// Number of debounced text updates applied so far
    pub fn text_updates(&self) -> u64 {
        self.text.applied_count()
    }

    /// Apply pending text if its window has elapsed
    pub fn poll(&mut self) -> bool {
        self.text.poll()
    }

    /// Wait for pending text and apply it
    pub async fn settle(&mut self) -> bool {
        self.text.settle().await
    }

    /// Apply pending text without waiting
    pub fn commit(&mut self) -> bool {
        self.text.flush()
    }

    pub fn apply<'a>(&self, tasks: &'a [Task], now: DateTime<Utc>) -> FilteredTasks<'a> {
        let filtered = filter_tasks(tasks, self.debounced_text(), &self.filters, now);
        FilteredTasks {
            filtered_count: filtered.len(),
            total_count: tasks.len(),
            tasks: filtered,
        }
    }
}
