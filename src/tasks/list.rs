//! In-memory task list kept in sync with the user's task file.
//!
//! Tasks carry a stable [`TaskId`] assigned when they enter memory, and
//! every mutation is keyed by that id rather than by list position. Each
//! mutation ends with a refresh, which writes the full list back to disk.

use super::store::{TaskRecord, TaskStore};
use crate::session::Session;
use std::fmt;
use uuid::Uuid;

/// Stable in-memory identity of a task. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(Uuid);

impl TaskId {
    fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    id: TaskId,
    text: String,
    done: bool,
    /// Checkbox state as last set by the front end; folded into `done` on refresh.
    checked: bool,
}

impl Task {
    fn new(text: String, done: bool) -> Self {
        Self {
            id: TaskId::generate(),
            text,
            done,
            checked: done,
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_done(&self) -> bool {
        self.done
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error("Task cannot be empty.")]
    EmptyTask,
    #[error("No task with id {0}")]
    UnknownTask(TaskId),
    #[error("Failed to persist tasks: {0:#}")]
    Storage(anyhow::Error),
}

/// Label for the filter control given the current filter state.
pub fn filter_label(show_completed: bool) -> &'static str {
    if show_completed {
        "Show Unfinished"
    } else {
        "Show All"
    }
}

/// The signed-in user's tasks plus the visibility filter.
#[derive(Debug)]
pub struct TaskList {
    store: TaskStore,
    owner: String,
    tasks: Vec<Task>,
    show_completed: bool,
}

impl TaskList {
    /// Load the session user's tasks.
    pub fn open(store: TaskStore, session: &Session, show_completed: bool) -> anyhow::Result<Self> {
        let owner = session.username().to_string();
        let tasks = store
            .load(&owner)?
            .into_iter()
            .map(|TaskRecord { text, done }| Task::new(text, done))
            .collect::<Vec<_>>();
        tracing::debug!(owner = %owner, count = tasks.len(), "Loaded tasks");
        Ok(Self {
            store,
            owner,
            tasks,
            show_completed,
        })
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn show_completed(&self) -> bool {
        self.show_completed
    }

    pub fn filter_label(&self) -> &'static str {
        filter_label(self.show_completed)
    }

    /// Tasks rendered under the current filter, in list order.
    pub fn visible(&self) -> impl Iterator<Item = &Task> {
        let show_completed = self.show_completed;
        self.tasks.iter().filter(move |t| show_completed || !t.done)
    }

    /// Append a new open task. Blank text is rejected without mutation.
    pub fn add(&mut self, text: &str) -> Result<TaskId, TaskError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(TaskError::EmptyTask);
        }
        let task = Task::new(text.to_string(), false);
        let id = task.id;
        self.tasks.push(task);
        self.refresh()?;
        Ok(id)
    }

    /// Set the checkbox state of one task, then refresh.
    pub fn set_done(&mut self, id: TaskId, done: bool) -> Result<(), TaskError> {
        let task = self
            .tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(TaskError::UnknownTask(id))?;
        task.checked = done;
        self.refresh()
    }

    /// Flip the checkbox state of one task. Returns the new state.
    pub fn toggle(&mut self, id: TaskId) -> Result<bool, TaskError> {
        let done = !self
            .get(id)
            .map(|t| t.checked)
            .ok_or(TaskError::UnknownTask(id))?;
        self.set_done(id, done)?;
        Ok(done)
    }

    /// Remove every task checked as done, keeping the order of the rest.
    /// Returns how many were removed.
    pub fn delete_selected(&mut self) -> Result<usize, TaskError> {
        let before = self.tasks.len();
        self.tasks.retain(|t| !t.checked);
        let removed = before - self.tasks.len();
        self.persist()?;
        tracing::debug!(owner = %self.owner, removed, "Deleted completed tasks");
        Ok(removed)
    }

    /// Flip whether completed tasks are shown. Task data is untouched, but
    /// the list is still written back. Returns the new filter state.
    pub fn toggle_visibility_filter(&mut self) -> Result<bool, TaskError> {
        self.show_completed = !self.show_completed;
        self.refresh()?;
        Ok(self.show_completed)
    }

    /// Fold checkbox state into each task and write the full list.
    pub fn refresh(&mut self) -> Result<(), TaskError> {
        for task in &mut self.tasks {
            task.done = task.checked;
        }
        self.persist()
    }

    fn persist(&self) -> Result<(), TaskError> {
        self.store
            .save(
                &self.owner,
                self.tasks.iter().map(|t| (t.text.as_str(), t.checked)),
            )
            .map_err(TaskError::Storage)
    }
}
