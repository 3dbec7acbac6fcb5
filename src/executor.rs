//! Task executor and shared object store.
//!
//! Units of work are submitted to an [`Executor`] and immediately return a [`Handle`]. The value a task
//! produces is published into the [`ObjectStore`] under that handle and stays there, immutable, until it is
//! released. Handles are cheap to copy and may be moved into other tasks, which resolve them on the worker
//! that runs them.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use log;

use crate::error::{ExecutorError, ExecutorErrorKind, SortError};

/// Store-wide object identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(u64);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "obj-{}", self.0)
    }
}

/// Typed reference to an object in the [`ObjectStore`].
pub struct Handle<T> {
    id: ObjectId,

    item_type: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    fn new(id: ObjectId) -> Self {
        Handle {
            id,
            item_type: PhantomData,
        }
    }

    /// Returns the identifier of the referenced object.
    pub fn id(&self) -> ObjectId {
        self.id
    }
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> Eq for Handle<T> {}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({})", self.id)
    }
}

enum Slot {
    Pending { task: String },
    Ready(Arc<dyn Any + Send + Sync>),
    Failed { task: String, err: Option<SortError> },
}

/// Content store shared by the driver and every task.
/// Objects are single-assignment: a slot goes from pending to either ready or failed exactly once.
pub struct ObjectStore {
    next_id: AtomicU64,
    slots: Mutex<HashMap<ObjectId, Slot>>,
    changed: Condvar,
}

impl ObjectStore {
    pub fn new() -> Self {
        ObjectStore {
            next_id: AtomicU64::new(0),
            slots: Mutex::new(HashMap::new()),
            changed: Condvar::new(),
        }
    }

    // tasks run under catch_unwind and never panic while holding the lock
    fn lock(&self) -> MutexGuard<'_, HashMap<ObjectId, Slot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn next_id(&self) -> ObjectId {
        ObjectId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Reserves a pending slot to be fulfilled by a task later on.
    pub(crate) fn reserve<T>(&self, task: &str) -> Handle<T> {
        let id = self.next_id();
        self.lock().insert(id, Slot::Pending { task: task.to_string() });

        return Handle::new(id);
    }

    /// Completes a pending slot with a task result.
    pub(crate) fn fulfill<T>(&self, handle: Handle<T>, result: Result<T, SortError>)
    where
        T: Send + Sync + 'static,
    {
        let mut slots = self.lock();
        let task = match slots.get(&handle.id) {
            Some(Slot::Pending { task }) => task.clone(),
            Some(_) => {
                log::error!("object {} is already assigned", handle.id);
                return;
            }
            None => {
                log::debug!("object {} released before its task finished", handle.id);
                return;
            }
        };

        let slot = match result {
            Ok(value) => Slot::Ready(Arc::new(value)),
            Err(err) => {
                log::debug!("task '{}' failed: {}", task, err);
                Slot::Failed { task, err: Some(err) }
            }
        };
        slots.insert(handle.id, slot);
        drop(slots);

        self.changed.notify_all();
    }

    /// Places a value into the store directly.
    pub fn put<T>(&self, value: T) -> Handle<T>
    where
        T: Send + Sync + 'static,
    {
        let id = self.next_id();
        self.lock().insert(id, Slot::Ready(Arc::new(value)));
        self.changed.notify_all();

        return Handle::new(id);
    }

    /// Waits for the object behind the handle and returns it.
    /// A failed task's error is handed out once, further calls report [`ExecutorErrorKind::AlreadyReported`].
    pub fn get<T>(&self, handle: &Handle<T>) -> Result<Arc<T>, SortError>
    where
        T: Send + Sync + 'static,
    {
        let mut slots = self.lock();
        loop {
            let outcome: Option<Result<Arc<T>, SortError>> = match slots.get_mut(&handle.id) {
                None => Some(Err(ExecutorError::new(
                    ExecutorErrorKind::MissingObject,
                    handle.id.to_string(),
                    "object not found in store",
                )
                .into())),
                Some(Slot::Pending { .. }) => None,
                Some(Slot::Ready(value)) => Some(value.clone().downcast::<T>().map_err(|_| {
                    SortError::from(ExecutorError::new(
                        ExecutorErrorKind::TypeMismatch,
                        handle.id.to_string(),
                        format!("object is not of type {}", std::any::type_name::<T>()),
                    ))
                })),
                Some(Slot::Failed { task, err }) => Some(Err(err.take().unwrap_or_else(|| {
                    ExecutorError::new(
                        ExecutorErrorKind::AlreadyReported,
                        task.clone(),
                        "task failure already reported",
                    )
                    .into()
                }))),
            };

            if let Some(outcome) = outcome {
                return outcome;
            }
            slots = self.changed.wait(slots).unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Blocks until at least one of the objects is ready or failed and returns every such object.
    pub fn wait_any(&self, ids: &[ObjectId]) -> Result<Vec<ObjectId>, SortError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut slots = self.lock();
        loop {
            let mut ready = Vec::new();
            for id in ids {
                match slots.get(id) {
                    None => {
                        return Err(ExecutorError::new(
                            ExecutorErrorKind::MissingObject,
                            id.to_string(),
                            "object not found in store",
                        )
                        .into())
                    }
                    Some(Slot::Pending { .. }) => {}
                    Some(_) => ready.push(*id),
                }
            }

            if !ready.is_empty() {
                return Ok(ready);
            }
            slots = self.changed.wait(slots).unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Checks if the store holds an object (in any state) under the identifier.
    pub fn contains(&self, id: ObjectId) -> bool {
        self.lock().contains_key(&id)
    }

    /// Checks if the object is ready or failed.
    pub fn is_done(&self, id: ObjectId) -> bool {
        matches!(self.lock().get(&id), Some(Slot::Ready(_)) | Some(Slot::Failed { .. }))
    }

    /// Drops the store's reference to an object.
    /// Values already resolved by callers stay alive as long as they are referenced.
    pub fn release(&self, id: ObjectId) {
        self.lock().remove(&id);
    }

    /// Returns number of objects in the store.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ObjectStore {
    fn default() -> Self {
        ObjectStore::new()
    }
}

/// Task executor interface.
pub trait Executor: Send + Sync {
    /// Returns the object store results are published to.
    fn store(&self) -> &Arc<ObjectStore>;

    /// Returns number of tasks that may run at the same time.
    fn workers_number(&self) -> usize {
        1
    }

    /// Schedules a unit of work and returns immediately.
    /// The task receives the object store to resolve the handles it was given.
    fn submit<T, F>(&self, name: String, task: F) -> Handle<T>
    where
        T: Send + Sync + 'static,
        F: FnOnce(&ObjectStore) -> Result<T, SortError> + Send + 'static;

    /// Waits for and returns the value behind a handle.
    fn resolve<T>(&self, handle: &Handle<T>) -> Result<Arc<T>, SortError>
    where
        T: Send + Sync + 'static,
    {
        self.store().get(handle)
    }

    /// Resolves every handle in order. The first failure aborts the whole set.
    fn resolve_all<T>(&self, handles: &[Handle<T>]) -> Result<Vec<Arc<T>>, SortError>
    where
        T: Send + Sync + 'static,
    {
        handles.iter().map(|handle| self.resolve(handle)).collect()
    }

    /// Blocks until at least one of the objects is ready.
    fn await_any(&self, ids: &[ObjectId]) -> Result<Vec<ObjectId>, SortError> {
        self.store().wait_any(ids)
    }

    /// Blocks until every object is ready or failed.
    fn await_all(&self, ids: &[ObjectId]) -> Result<(), SortError> {
        let mut pending = ids.to_vec();
        while !pending.is_empty() {
            let ready = self.await_any(&pending)?;
            pending.retain(|id| !ready.contains(id));
        }

        return Ok(());
    }

    /// Places a value into the shared store directly.
    fn publish<T>(&self, value: T) -> Handle<T>
    where
        T: Send + Sync + 'static,
    {
        self.store().put(value)
    }
}

fn run_task<T, F>(store: &ObjectStore, name: &str, task: F) -> Result<T, SortError>
where
    F: FnOnce(&ObjectStore) -> Result<T, SortError>,
{
    match panic::catch_unwind(AssertUnwindSafe(|| task(store))) {
        Ok(result) => result,
        Err(payload) => {
            let reason = if let Some(msg) = payload.downcast_ref::<&str>() {
                msg.to_string()
            } else if let Some(msg) = payload.downcast_ref::<String>() {
                msg.clone()
            } else {
                "unknown panic".to_string()
            };
            log::error!("task '{}' panicked: {}", name, reason);

            Err(ExecutorError::new(ExecutorErrorKind::TaskPanicked, name, reason).into())
        }
    }
}

/// Executor running tasks on a rayon thread pool.
pub struct RayonExecutor {
    thread_pool: rayon::ThreadPool,
    store: Arc<ObjectStore>,
}

impl RayonExecutor {
    /// Creates a new executor.
    ///
    /// # Arguments
    /// * `threads_number` - Number of worker threads. If the parameter is [`None`] threads number will be
    ///   selected based on available CPU core number.
    pub fn new(threads_number: Option<usize>) -> Result<Self, SortError> {
        let mut thread_pool_builder = rayon::ThreadPoolBuilder::new().thread_name(|idx| format!("sort-worker-{}", idx));

        if let Some(threads_number) = threads_number {
            log::info!("initializing thread-pool (threads: {})", threads_number);
            thread_pool_builder = thread_pool_builder.num_threads(threads_number);
        } else {
            log::info!("initializing thread-pool (threads: default)");
        }
        let thread_pool = thread_pool_builder
            .build()
            .map_err(|err| SortError::ThreadPoolBuildError(err))?;

        return Ok(RayonExecutor {
            thread_pool,
            store: Arc::new(ObjectStore::new()),
        });
    }

    /// Returns number of worker threads.
    pub fn threads_number(&self) -> usize {
        self.thread_pool.current_num_threads()
    }
}

impl Executor for RayonExecutor {
    fn store(&self) -> &Arc<ObjectStore> {
        &self.store
    }

    fn workers_number(&self) -> usize {
        self.threads_number()
    }

    fn submit<T, F>(&self, name: String, task: F) -> Handle<T>
    where
        T: Send + Sync + 'static,
        F: FnOnce(&ObjectStore) -> Result<T, SortError> + Send + 'static,
    {
        let handle = self.store.reserve(&name);
        let store = self.store.clone();

        self.thread_pool.spawn(move || {
            let result = run_task(&store, &name, task);
            store.fulfill(handle, result);
        });

        return handle;
    }
}

/// Executor running every task synchronously on the submitting thread.
pub struct InlineExecutor {
    store: Arc<ObjectStore>,
}

impl InlineExecutor {
    pub fn new() -> Self {
        InlineExecutor {
            store: Arc::new(ObjectStore::new()),
        }
    }
}

impl Default for InlineExecutor {
    fn default() -> Self {
        InlineExecutor::new()
    }
}

impl Executor for InlineExecutor {
    fn store(&self) -> &Arc<ObjectStore> {
        &self.store
    }

    fn submit<T, F>(&self, name: String, task: F) -> Handle<T>
    where
        T: Send + Sync + 'static,
        F: FnOnce(&ObjectStore) -> Result<T, SortError> + Send + 'static,
    {
        let handle = self.store.reserve(&name);
        let result = run_task(&self.store, &name, task);
        self.store.fulfill(handle, result);

        return handle;
    }
}
