//! Local login gate.
//!
//! Provides:
//! - Credential store: one indented JSON document mapping username to a
//!   password record (salted PBKDF2 by default, legacy SHA-256 readable)
//! - Login / register / reset dialogue as an explicit state machine behind
//!   the [`Prompter`] trait
//! - One-time 6-digit reset codes delivered through an operator channel
//!
//! ## Design Decisions
//! - Any dialogue failure is terminal. Callers end the process on
//!   [`AuthError`]; there is no retry loop.
//! - Every credential mutation rewrites the whole document.

pub mod dialogue;
pub mod hash;
pub mod reset;
pub mod store;

pub use dialogue::{authenticate, AuthError, AuthState, Dialogue, Prompt, Prompter};
pub use hash::{PasswordHasher, PasswordRecord};
pub use reset::{CodeSink, OperatorChannel, VerificationCode};
pub use store::{CredentialMap, CredentialStore};
