//! taskgate: a single-user terminal task list behind a local login gate.
//!
//! - [`auth`]: credential store, login/register/reset dialogue
//! - [`tasks`]: per-user CSV task files and the in-memory task list
//! - [`shell`]: terminal prompts and the interactive task shell
//! - [`config`]: explicit configuration handed to each store

pub mod auth;
pub mod config;
pub mod session;
pub mod shell;
pub mod tasks;
pub mod util;

pub use config::Config;
pub use session::Session;
