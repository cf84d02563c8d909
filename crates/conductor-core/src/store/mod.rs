pub mod in_memory;

pub use in_memory::InMemoryTaskStore;

use crate::models::{CoreError, OwnerId, TaskId, TaskRecord};

pub type StoreResult<T> = Result<T, CoreError>;

/// Transition applied to a record under the store's exclusive lock.
pub type TaskTransform<'a> = Box<dyn FnOnce(&mut TaskRecord) -> StoreResult<()> + Send + 'a>;

pub trait TaskStore: Send + Sync {
    fn insert(&self, record: TaskRecord) -> StoreResult<()>;

    fn get(&self, task_id: TaskId) -> StoreResult<TaskRecord>;

    fn list(&self, owner: OwnerId) -> StoreResult<Vec<TaskRecord>>;

    /// Applies `transform` atomically with respect to every other mutator and
    /// returns the updated record. When the transform fails, or produces a
    /// record that is not a legal successor, the stored record is unchanged.
    fn mutate(&self, task_id: TaskId, transform: TaskTransform<'_>) -> StoreResult<TaskRecord>;
}
