//! Explicit configuration passed to each store at construction.

pub mod schema;

pub use schema::{
    Config, CredentialsConfig, HashScheme, OperatorChannelKind, ResetConfig, TasksConfig,
    UiConfig,
};
