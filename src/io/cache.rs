use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::io::api::{ApiError, TaskStore};
use crate::model::task::Task;

/// Semantic cache address
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// The task collection (`GET /tasks`)
    Tasks,
    /// A single task (`GET /tasks/{id}`)
    Task(String),
}

impl CacheKey {
    pub fn task(id: impl Into<String>) -> Self {
        CacheKey::Task(id.into())
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::Tasks => write!(f, "tasks"),
            CacheKey::Task(id) => write!(f, "task:{}", id),
        }
    }
}

/// A cached response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CachedValue {
    Tasks(Vec<Task>),
    Task(Task),
}

impl CachedValue {
    pub fn as_tasks(&self) -> Option<&[Task]> {
        match self {
            CachedValue::Tasks(tasks) => Some(tasks),
            CachedValue::Task(_) => None,
        }
    }

    pub fn as_task(&self) -> Option<&Task> {
        match self {
            CachedValue::Task(task) => Some(task),
            CachedValue::Tasks(_) => None,
        }
    }

    pub fn into_tasks(self) -> Option<Vec<Task>> {
        match self {
            CachedValue::Tasks(tasks) => Some(tasks),
            CachedValue::Task(_) => None,
        }
    }

    pub fn into_task(self) -> Option<Task> {
        match self {
            CachedValue::Task(task) => Some(task),
            CachedValue::Tasks(_) => None,
        }
    }
}

/// Operations the mutation flows need from a cache
#[async_trait]
pub trait QueryCache: Send + Sync {
    /// Snapshot read, no network
    fn read(&self, key: &CacheKey) -> Option<CachedValue>;
    /// Overwrite an entry
    fn write(&self, key: CacheKey, value: CachedValue);
    /// Mark an entry stale; observed entries are refetched in the background
    fn invalidate(&self, key: &CacheKey);
    /// Once this returns, no read started earlier will write its result
    async fn cancel_in_flight(&self, key: &CacheKey);
}

// ---------------------------------------------------------------------------
// QueryClient
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct Slot {
    value: Option<CachedValue>,
    stale: bool,
    observers: usize,
    in_flight: usize,
    /// Replaced on cancel; reads started under another generation are dropped
    generation: u64,
}

impl Slot {
    fn is_unused(&self) -> bool {
        self.value.is_none() && self.observers == 0 && self.in_flight == 0
    }
}

struct Shared<S> {
    store: Arc<S>,
    slots: Mutex<HashMap<CacheKey, Slot>>,
    /// Source of slot generations, unique for the life of the client
    generations: AtomicU64,
}

impl<S> Shared<S> {
    fn next_generation(&self) -> u64 {
        self.generations.fetch_add(1, Ordering::Relaxed)
    }

    fn slot_mut<'a>(&self, slots: &'a mut HashMap<CacheKey, Slot>, key: &CacheKey) -> &'a mut Slot {
        slots.entry(key.clone()).or_insert_with(|| Slot {
            generation: self.next_generation(),
            ..Slot::default()
        })
    }

    /// Drop the slot if nothing holds, observes or fetches it
    fn prune(&self, slots: &mut HashMap<CacheKey, Slot>, key: &CacheKey) {
        if slots.get(key).is_some_and(Slot::is_unused) {
            slots.remove(key);
        }
    }
}

/// In-memory [`QueryCache`] that fetches from a [`TaskStore`].
///
/// It fetches, tracks staleness and in-flight reads, and refetches observed
/// keys in the background when they are invalidated. Cloning is cheap; clones
/// share the same entries.
///
/// Entries that hold a value live as long as the client. Empty entries are
/// dropped once no observer or read refers to them.
pub struct QueryClient<S> {
    shared: Arc<Shared<S>>,
}

impl<S> Clone for QueryClient<S> {
    fn clone(&self) -> Self {
        QueryClient {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<S> fmt::Debug for QueryClient<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryClient")
            .field("entries", &self.shared.slots.lock().len())
            .finish()
    }
}

impl<S: TaskStore + 'static> QueryClient<S> {
    pub fn new(store: Arc<S>) -> Self {
        QueryClient {
            shared: Arc::new(Shared {
                store,
                slots: Mutex::new(HashMap::new()),
                generations: AtomicU64::new(0),
            }),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.shared.store
    }

    /// Request `key` from the store and cache the result.
    ///
    /// The result is returned even when a cancel raced with the request, but
    /// it is only written to the cache if no cancel happened. Failed fetches
    /// never create or change an entry.
    pub async fn fetch(&self, key: &CacheKey) -> Result<CachedValue, ApiError> {
        let generation = {
            let mut slots = self.shared.slots.lock();
            let slot = self.shared.slot_mut(&mut slots, key);
            slot.in_flight += 1;
            slot.generation
        };

        let result = match key {
            CacheKey::Tasks => self.shared.store.list_tasks().await.map(CachedValue::Tasks),
            CacheKey::Task(id) => self.shared.store.get_task(id).await.map(CachedValue::Task),
        };

        let mut slots = self.shared.slots.lock();
        let Some(slot) = slots.get_mut(key).filter(|slot| slot.generation == generation) else {
            debug!(%key, "dropping result of cancelled read");
            return result;
        };
        slot.in_flight = slot.in_flight.saturating_sub(1);
        if let Ok(value) = &result {
            slot.value = Some(value.clone());
            slot.stale = false;
        }
        self.shared.prune(&mut slots, key);
        result
    }

    /// Cached value if present and fresh, otherwise [`fetch`](Self::fetch).
    pub async fn query(&self, key: &CacheKey) -> Result<CachedValue, ApiError> {
        {
            let slots = self.shared.slots.lock();
            if let Some(Slot {
                value: Some(value),
                stale: false,
                ..
            }) = slots.get(key)
            {
                return Ok(value.clone());
            }
        }
        self.fetch(key).await
    }

    /// Register interest in `key`; invalidating an observed key refetches it.
    pub fn observe(&self, key: &CacheKey) -> QueryObserver<S> {
        let mut slots = self.shared.slots.lock();
        self.shared.slot_mut(&mut slots, key).observers += 1;
        drop(slots);
        QueryObserver {
            client: self.clone(),
            key: key.clone(),
        }
    }

    /// True when the entry is missing or has been invalidated since its last fetch
    pub fn is_stale(&self, key: &CacheKey) -> bool {
        match self.shared.slots.lock().get(key) {
            Some(slot) => slot.value.is_none() || slot.stale,
            None => true,
        }
    }

    pub fn is_fetching(&self, key: &CacheKey) -> bool {
        self.shared
            .slots
            .lock()
            .get(key)
            .is_some_and(|slot| slot.in_flight > 0)
    }

    fn spawn_refetch(&self, key: CacheKey) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            debug!(%key, "no runtime; skipping background refetch");
            return;
        };
        let client = self.clone();
        handle.spawn(async move {
            if let Err(err) = client.fetch(&key).await {
                warn!(%key, status = err.status, error = %err.message, "background refetch failed");
            }
        });
    }
}

#[async_trait]
impl<S: TaskStore + 'static> QueryCache for QueryClient<S> {
    fn read(&self, key: &CacheKey) -> Option<CachedValue> {
        self.shared
            .slots
            .lock()
            .get(key)
            .and_then(|slot| slot.value.clone())
    }

    fn write(&self, key: CacheKey, value: CachedValue) {
        let mut slots = self.shared.slots.lock();
        self.shared.slot_mut(&mut slots, &key).value = Some(value);
    }

    fn invalidate(&self, key: &CacheKey) {
        let observed = match self.shared.slots.lock().get_mut(key) {
            Some(slot) => {
                slot.stale = true;
                slot.observers > 0
            }
            None => false,
        };
        debug!(%key, observed, "invalidated");
        if observed {
            self.spawn_refetch(key.clone());
        }
    }

    async fn cancel_in_flight(&self, key: &CacheKey) {
        let mut slots = self.shared.slots.lock();
        if let Some(slot) = slots.get_mut(key) {
            if slot.in_flight > 0 {
                debug!(%key, count = slot.in_flight, "cancelling in-flight reads");
            }
            slot.generation = self.shared.next_generation();
            slot.in_flight = 0;
        }
        self.shared.prune(&mut slots, key);
    }
}

/// Keeps a key observed until dropped
pub struct QueryObserver<S> {
    client: QueryClient<S>,
    key: CacheKey,
}

impl<S> fmt::Debug for QueryObserver<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryObserver").field("key", &self.key).finish()
    }
}

impl<S> Drop for QueryObserver<S> {
    fn drop(&mut self) {
        let shared = &self.client.shared;
        let mut slots = shared.slots.lock();
        if let Some(slot) = slots.get_mut(&self.key) {
            slot.observers = slot.observers.saturating_sub(1);
        }
        shared.prune(&mut slots, &self.key);
    }
}
