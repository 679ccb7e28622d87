use std::sync::Arc;

use tracing::{debug, warn};

use crate::io::api::{ApiError, TaskStore};
use crate::io::cache::{CacheKey, CachedValue, QueryCache};
use crate::model::task::{NewTask, Task, TaskPayload, TaskUpdate};

/// Cache entries as they were before a mutation touched them
#[derive(Debug, Clone)]
struct Snapshot {
    collection: Option<CachedValue>,
    single: Option<CachedValue>,
}

impl Snapshot {
    /// The collection copy wins over the single-task copy
    fn current<'a>(&'a self, id: &str) -> Option<&'a Task> {
        self.collection
            .as_ref()
            .and_then(CachedValue::as_tasks)
            .and_then(|tasks| tasks.iter().find(|t| t.id == id))
            .or_else(|| self.single.as_ref().and_then(CachedValue::as_task))
    }
}

/// Runs create / toggle / update / delete against a store and a cache.
///
/// Toggle, update and delete share one sequence: cancel in-flight reads of
/// `tasks` and `task:<id>`, snapshot both entries, apply the change locally,
/// send the request, restore the snapshots if it fails, then invalidate both
/// keys whatever happened. Create only sends the request and invalidates
/// `tasks`.
///
/// Concurrent mutations of the same task are not ordered against each other:
/// the last cache write wins until the invalidation refetch lands.
pub struct TaskMutations<C, S> {
    cache: Arc<C>,
    store: Arc<S>,
}

impl<C, S> Clone for TaskMutations<C, S> {
    fn clone(&self) -> Self {
        TaskMutations {
            cache: Arc::clone(&self.cache),
            store: Arc::clone(&self.store),
        }
    }
}

impl<C: QueryCache, S: TaskStore> TaskMutations<C, S> {
    pub fn new(cache: Arc<C>, store: Arc<S>) -> Self {
        TaskMutations { cache, store }
    }

    /// Create a task. Empty `detail` / `due_at` are not sent.
    pub async fn create(&self, task: &NewTask) -> Result<Task, ApiError> {
        let payload = TaskPayload::for_create(task);
        debug!(title = %task.title, "creating task");
        let result = self.store.create_task(&payload).await;
        if let Err(err) = &result {
            warn!(status = err.status, error = %err.message, "creating task failed");
        }
        self.cache.invalidate(&CacheKey::Tasks);
        result
    }

    /// Set a task's completion flag.
    ///
    /// Sends the whole task with the new flag when it is cached, otherwise
    /// only `isComplete`.
    pub async fn toggle_complete(&self, id: &str, is_complete: bool) -> Result<Task, ApiError> {
        let snapshot = self.prepare(id).await;
        let payload = TaskPayload::for_toggle(snapshot.current(id), is_complete);
        let change = TaskPayload {
            is_complete: Some(is_complete),
            ..Default::default()
        };
        self.apply_change(id, &snapshot, &change);

        let result = self.store.update_task(id, &payload).await;
        self.settle(id, snapshot, result, "toggling task completion")
    }

    /// Replace a task's editable fields.
    pub async fn update(&self, id: &str, update: &TaskUpdate) -> Result<Task, ApiError> {
        let snapshot = self.prepare(id).await;
        let payload = TaskPayload::for_update(update);
        self.apply_change(id, &snapshot, &payload);

        let result = self.store.update_task(id, &payload).await;
        self.settle(id, snapshot, result, "updating task")
    }

    /// Delete a task. Only the collection entry is changed optimistically.
    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        let snapshot = self.prepare(id).await;
        if let Some(tasks) = snapshot.collection.as_ref().and_then(CachedValue::as_tasks) {
            let remaining = tasks.iter().filter(|t| t.id != id).cloned().collect();
            self.cache.write(CacheKey::Tasks, CachedValue::Tasks(remaining));
        }

        let result = self.store.delete_task(id).await;
        self.settle(id, snapshot, result, "deleting task")
    }

    /// Cancel in-flight reads of both keys, then snapshot them.
    async fn prepare(&self, id: &str) -> Snapshot {
        let single_key = CacheKey::task(id);
        self.cache.cancel_in_flight(&CacheKey::Tasks).await;
        self.cache.cancel_in_flight(&single_key).await;
        Snapshot {
            collection: self.cache.read(&CacheKey::Tasks),
            single: self.cache.read(&single_key),
        }
    }

    /// Merge `change` into whichever entries hold the task.
    fn apply_change(&self, id: &str, snapshot: &Snapshot, change: &TaskPayload) {
        if let Some(tasks) = snapshot.collection.as_ref().and_then(CachedValue::as_tasks) {
            let updated = tasks
                .iter()
                .map(|t| if t.id == id { change.merge_into(t) } else { t.clone() })
                .collect();
            self.cache.write(CacheKey::Tasks, CachedValue::Tasks(updated));
        }
        if let Some(task) = snapshot.single.as_ref().and_then(CachedValue::as_task) {
            self.cache
                .write(CacheKey::task(id), CachedValue::Task(change.merge_into(task)));
        }
    }

    /// Roll back on failure, then invalidate both keys.
    fn settle<T>(
        &self,
        id: &str,
        snapshot: Snapshot,
        result: Result<T, ApiError>,
        action: &str,
    ) -> Result<T, ApiError> {
        if let Err(err) = &result {
            if let Some(previous) = snapshot.collection {
                self.cache.write(CacheKey::Tasks, previous);
            }
            if let Some(previous) = snapshot.single {
                self.cache.write(CacheKey::task(id), previous);
            }
            warn!(
                task_id = id,
                status = err.status,
                error = %err.message,
                "{} failed; optimistic change rolled back",
                action
            );
        }
        self.cache.invalidate(&CacheKey::Tasks);
        self.cache.invalidate(&CacheKey::task(id));
        result
    }
}
