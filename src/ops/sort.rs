use std::borrow::Borrow;

use crate::model::task::Task;

/// Order tasks for display: valid due dates first, earliest first, then
/// everything else. Unparseable dates count as no date. Stable.
pub fn sort_by_due_date<T: Borrow<Task>>(tasks: &mut [T]) {
    tasks.sort_by_cached_key(|t| {
        let due = t.borrow().due_date();
        (due.is_none(), due)
    });
}
