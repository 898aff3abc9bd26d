//! Task collection: model, storage, and promotion from analyses.

pub mod model;
pub mod promote;
pub mod store;

pub use model::{NewTask, Task, TaskFilter, TaskPatch, TaskPriority, TaskSource, TaskSourceKind};
pub use promote::promote_action_items;
pub use store::{InMemoryTaskStore, TaskStore};
