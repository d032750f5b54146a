//! Per-user task list: CSV persistence plus the in-memory controller.

pub mod list;
pub mod store;

pub use list::{filter_label, Task, TaskError, TaskId, TaskList};
pub use store::{TaskRecord, TaskStore};
