use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::io::api::{ApiError, TaskStore};
use crate::io::cache::{CacheKey, CachedValue, QueryCache};
use crate::model::task::{Task, TaskPayload};

/// `[{1, Buy milk, incomplete}, {2, Pay rent, complete}]`
pub fn sample_tasks() -> Vec<Task> {
    let mut rent = Task::new("2", "Pay rent");
    rent.is_complete = true;
    vec![Task::new("1", "Buy milk"), rent]
}

pub fn ids(tasks: &[&Task]) -> Vec<String> {
    tasks.iter().map(|t| t.id.clone()).collect()
}

// ---------------------------------------------------------------------------
// FakeStore
// ---------------------------------------------------------------------------

/// A request received by [`FakeStore`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    List,
    Get(String),
    Create(TaskPayload),
    Update(String, TaskPayload),
    Delete(String),
}

/// In-memory task store with failure injection and optional latency
#[derive(Debug, Default)]
pub struct FakeStore {
    tasks: Mutex<Vec<Task>>,
    calls: Mutex<Vec<StoreCall>>,
    failure: Mutex<Option<ApiError>>,
    latency: Duration,
    next_id: Mutex<u64>,
}

impl FakeStore {
    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        FakeStore {
            tasks: Mutex::new(tasks),
            next_id: Mutex::new(100),
            ..Default::default()
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Every following request fails with `err` until [`recover`](Self::recover)
    pub fn fail_with(&self, err: ApiError) {
        *self.failure.lock() = Some(err);
    }

    pub fn recover(&self) {
        *self.failure.lock() = None;
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().clone()
    }

    pub fn request_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.tasks.lock().clone()
    }

    /// Change server state behind the client's back
    pub fn remove(&self, id: &str) {
        self.tasks.lock().retain(|t| t.id != id);
    }

    async fn begin(&self, call: StoreCall) -> Result<(), ApiError> {
        self.calls.lock().push(call);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        match self.failure.lock().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn not_found() -> ApiError {
        ApiError::new(404, "Task not found")
    }
}

#[async_trait]
impl TaskStore for FakeStore {
    async fn list_tasks(&self) -> Result<Vec<Task>, ApiError> {
        self.begin(StoreCall::List).await?;
        Ok(self.tasks())
    }

    async fn get_task(&self, id: &str) -> Result<Task, ApiError> {
        self.begin(StoreCall::Get(id.to_string())).await?;
        self.tasks
            .lock()
            .iter()
            .find(|t| t.id == id)
            .cloned()
            .ok_or_else(Self::not_found)
    }

    async fn create_task(&self, payload: &TaskPayload) -> Result<Task, ApiError> {
        self.begin(StoreCall::Create(payload.clone())).await?;
        let id = {
            let mut next = self.next_id.lock();
            *next += 1;
            next.to_string()
        };
        let task = payload.merge_into(&Task::new(id, ""));
        self.tasks.lock().push(task.clone());
        Ok(task)
    }

    async fn update_task(&self, id: &str, payload: &TaskPayload) -> Result<Task, ApiError> {
        self.begin(StoreCall::Update(id.to_string(), payload.clone()))
            .await?;
        let mut tasks = self.tasks.lock();
        let task = tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(Self::not_found)?;
        *task = payload.merge_into(task);
        Ok(task.clone())
    }

    async fn delete_task(&self, id: &str) -> Result<(), ApiError> {
        self.begin(StoreCall::Delete(id.to_string())).await?;
        let mut tasks = self.tasks.lock();
        let before = tasks.len();
        tasks.retain(|t| t.id != id);
        if tasks.len() == before {
            return Err(Self::not_found());
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// RecordingCache
// ---------------------------------------------------------------------------

/// A cache call observed by [`RecordingCache`]. Reads are not recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEvent {
    Cancel(CacheKey),
    Write(CacheKey),
    Invalidate(CacheKey),
}

/// Plain map cache that logs every mutating call in order
#[derive(Debug, Default)]
pub struct RecordingCache {
    entries: Mutex<HashMap<CacheKey, CachedValue>>,
    events: Mutex<Vec<CacheEvent>>,
}

impl RecordingCache {
    /// Collection entry from `tasks`, and a single entry for `single` if given
    pub fn seeded(tasks: Option<Vec<Task>>, single: Option<Task>) -> Self {
        let cache = RecordingCache::default();
        {
            let mut entries = cache.entries.lock();
            if let Some(tasks) = tasks {
                entries.insert(CacheKey::Tasks, CachedValue::Tasks(tasks));
            }
            if let Some(task) = single {
                entries.insert(CacheKey::task(task.id.clone()), CachedValue::Task(task));
            }
        }
        cache
    }

    pub fn events(&self) -> Vec<CacheEvent> {
        self.events.lock().clone()
    }

    pub fn invalidations(&self, key: &CacheKey) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|e| **e == CacheEvent::Invalidate(key.clone()))
            .count()
    }

    pub fn tasks(&self) -> Option<Vec<Task>> {
        self.read(&CacheKey::Tasks).and_then(CachedValue::into_tasks)
    }

    pub fn task(&self, id: &str) -> Option<Task> {
        self.read(&CacheKey::task(id)).and_then(CachedValue::into_task)
    }
}

#[async_trait]
impl QueryCache for RecordingCache {
    fn read(&self, key: &CacheKey) -> Option<CachedValue> {
        self.entries.lock().get(key).cloned()
    }

    fn write(&self, key: CacheKey, value: CachedValue) {
        self.events.lock().push(CacheEvent::Write(key.clone()));
        self.entries.lock().insert(key, value);
    }

    fn invalidate(&self, key: &CacheKey) {
        self.events.lock().push(CacheEvent::Invalidate(key.clone()));
    }

    async fn cancel_in_flight(&self, key: &CacheKey) {
        self.events.lock().push(CacheEvent::Cancel(key.clone()));
    }
}
