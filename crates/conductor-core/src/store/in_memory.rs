use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::models::{CoreError, OwnerId, TaskId, TaskRecord};
use crate::store::{StoreResult, TaskStore, TaskTransform};

#[derive(Default)]
pub struct InMemoryTaskStore {
    tasks: RwLock<HashMap<TaskId, TaskRecord>>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> StoreResult<usize> {
        Ok(self.read_tasks()?.len())
    }

    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }

    fn read_tasks(&self) -> StoreResult<RwLockReadGuard<'_, HashMap<TaskId, TaskRecord>>> {
        self.tasks
            .read()
            .map_err(|_| CoreError::internal("task store lock poisoned"))
    }

    fn write_tasks(&self) -> StoreResult<RwLockWriteGuard<'_, HashMap<TaskId, TaskRecord>>> {
        self.tasks
            .write()
            .map_err(|_| CoreError::internal("task store lock poisoned"))
    }
}

impl TaskStore for InMemoryTaskStore {
    fn insert(&self, record: TaskRecord) -> StoreResult<()> {
        let mut tasks = self.write_tasks()?;
        if tasks.contains_key(&record.id) {
            return Err(CoreError::duplicate_id(record.id));
        }

        tasks.insert(record.id, record);
        Ok(())
    }

    fn get(&self, task_id: TaskId) -> StoreResult<TaskRecord> {
        self.read_tasks()?
            .get(&task_id)
            .cloned()
            .ok_or_else(|| CoreError::not_found(task_id))
    }

    fn list(&self, owner: OwnerId) -> StoreResult<Vec<TaskRecord>> {
        let mut records: Vec<TaskRecord> = self
            .read_tasks()?
            .values()
            .filter(|record| record.is_owned_by(owner))
            .cloned()
            .collect();
        records.sort_by(|left, right| {
            left.started_at
                .cmp(&right.started_at)
                .then_with(|| left.id.0.cmp(&right.id.0))
        });
        Ok(records)
    }

    fn mutate(&self, task_id: TaskId, transform: TaskTransform<'_>) -> StoreResult<TaskRecord> {
        let mut tasks = self.write_tasks()?;
        let current = tasks
            .get_mut(&task_id)
            .ok_or_else(|| CoreError::not_found(task_id))?;

        let mut next = current.clone();
        transform(&mut next)?;
        current.check_successor(&next)?;

        *current = next.clone();
        Ok(next)
    }
}
