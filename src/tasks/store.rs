//! Per-user CSV task files.
//!
//! One file per username, one row per task, two columns: text and a done
//! flag written as `1` (done) or `0`. Rows with any other field count are
//! dropped on load.

use crate::config::Config;
use crate::util::write_atomic;
use anyhow::{Context, Result};
use std::borrow::Cow;
use std::path::{Path, PathBuf};

/// Flag value for a completed task.
const DONE_FLAG: &str = "1";
const OPEN_FLAG: &str = "0";

/// A persisted task row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRecord {
    pub text: String,
    pub done: bool,
}

impl TaskRecord {
    pub fn new(text: impl Into<String>, done: bool) -> Self {
        Self {
            text: text.into(),
            done,
        }
    }
}

/// Directory of per-user task files.
#[derive(Debug, Clone)]
pub struct TaskStore {
    dir: PathBuf,
}

impl TaskStore {
    pub fn new(config: &Config) -> Self {
        Self::at(config.tasks_dir())
    }

    pub fn at(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File holding `username`'s tasks. Names that are a single plain path
    /// component are used as-is, so files from existing installs are found;
    /// anything else is percent-encoded so it stays inside the tasks directory.
    pub fn path_for(&self, username: &str) -> PathBuf {
        let name = if is_plain_component(username) {
            Cow::Borrowed(username)
        } else {
            urlencoding::encode(username)
        };
        self.dir.join(format!("tasks_{name}.csv"))
    }

    /// Read `username`'s tasks in file order. A missing file is an empty list.
    pub fn load(&self, username: &str) -> Result<Vec<TaskRecord>> {
        let path = self.path_for(username);
        if !path.exists() {
            return Ok(Vec::new());
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(&path)
            .with_context(|| format!("Failed to open tasks: {}", path.display()))?;

        let mut tasks = Vec::new();
        let mut skipped = 0usize;
        for row in reader.records() {
            let row = match row {
                Ok(row) => row,
                Err(e) if e.is_io_error() => {
                    return Err(e).with_context(|| format!("Failed to read tasks: {}", path.display()))
                }
                Err(e) => {
                    tracing::debug!("Skipping unreadable task row: {e}");
                    skipped += 1;
                    continue;
                }
            };
            if row.len() != 2 {
                skipped += 1;
                continue;
            }
            tasks.push(TaskRecord::new(&row[0], &row[1] == DONE_FLAG));
        }

        if skipped > 0 {
            tracing::debug!(username = username, skipped, "Dropped malformed task rows");
        }
        Ok(tasks)
    }

    /// Overwrite `username`'s file with `tasks`, in order.
    pub fn save<'a, I>(&self, username: &str, tasks: I) -> Result<()>
    where
        I: IntoIterator<Item = (&'a str, bool)>,
    {
        let path = self.path_for(username);
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(Vec::new());

        for (text, done) in tasks {
            writer.write_record([text, if done { DONE_FLAG } else { OPEN_FLAG }])?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| anyhow::anyhow!("Failed to encode tasks: {}", e.error()))?;

        write_atomic(&path, &bytes)
            .with_context(|| format!("Failed to save tasks: {}", path.display()))
    }
}

/// `%` is excluded too, so a raw name never collides with an encoded one.
fn is_plain_component(username: &str) -> bool {
    !matches!(username, "" | "." | "..")
        && !username.contains(['/', '\\', '\0', '%'])
}
