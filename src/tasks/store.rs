//! `TaskStore`: async interface for the task collection, and the in-memory
//! backend the service ships with.

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::model::{NewTask, Task, TaskFilter, TaskPatch};
use crate::error::StoreError;

/// Backend-agnostic task collection keyed by task id.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Tasks matching `filter`, in insertion order.
    async fn list(&self, filter: &TaskFilter) -> Result<Vec<Task>, StoreError>;

    /// Insert a new task and return it with its assigned id.
    async fn create(&self, new: NewTask) -> Result<Task, StoreError>;

    /// Merge `patch` into the task, bump its version and stamp `updated_at`.
    ///
    /// Fails with `StoreError::Conflict` if `patch.expected_version` is set and
    /// does not match.
    async fn update(&self, id: &str, patch: TaskPatch) -> Result<Task, StoreError>;

    /// Remove a task and return it.
    async fn delete(&self, id: &str) -> Result<Task, StoreError>;
}

/// Process-local store. Contents are lost on restart.
#[derive(Debug, Default)]
pub struct InMemoryTaskStore {
    tasks: RwLock<Vec<Task>>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing set of tasks.
    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        Self {
            tasks: RwLock::new(tasks),
        }
    }
}

fn not_found(id: &str) -> StoreError {
    StoreError::NotFound { id: id.to_string() }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn list(&self, filter: &TaskFilter) -> Result<Vec<Task>, StoreError> {
        let tasks = self.tasks.read().await;
        Ok(tasks.iter().filter(|t| filter.matches(t)).cloned().collect())
    }

    async fn create(&self, new: NewTask) -> Result<Task, StoreError> {
        let task = new.into_task(Utc::now());
        info!(id = %task.id, title = %task.title, "Task created");
        self.tasks.write().await.push(task.clone());
        Ok(task)
    }

    async fn update(&self, id: &str, patch: TaskPatch) -> Result<Task, StoreError> {
        let mut tasks = self.tasks.write().await;
        let task = tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| not_found(id))?;

        if let Some(expected) = patch.expected_version {
            if expected != task.version {
                return Err(StoreError::Conflict {
                    id: id.to_string(),
                    expected,
                    actual: task.version,
                });
            }
        }

        patch.apply(task);
        task.version += 1;
        task.updated_at = Some(Utc::now());
        debug!(id, version = task.version, "Task updated");
        Ok(task.clone())
    }

    async fn delete(&self, id: &str) -> Result<Task, StoreError> {
        let mut tasks = self.tasks.write().await;
        let idx = tasks
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| not_found(id))?;
        let task = tasks.remove(idx);
        info!(id, "Task deleted");
        Ok(task)
    }
}
