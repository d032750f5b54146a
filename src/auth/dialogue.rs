//! Login / register / reset dialogue.
//!
//! The dialogue is an explicit state machine driven through [`Prompter`], so
//! the same flow backs the terminal prompts and the scripted prompter used in
//! tests. Every failure ends the dialogue; there is no retry.
//!
//! ```text
//! AwaitUsername ─┬─ unknown ─> Register ──────────────────────────────> Done
//!                └─ known ───> CheckPassword ─┬─ match ────────────────> Done
//!                                             └─ mismatch ─> OfferReset
//!                                  OfferReset ─ "yes" ─> VerifyCode ─> CollectPassword ─> Done
//! ```

use super::reset::{CodeSink, VerificationCode};
use super::store::CredentialStore;
use crate::session::Session;

/// One single-value question asked during authentication.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prompt {
    Username,
    Password,
    NewUserPassword,
    ResetOffer,
    VerificationCode,
    NewPassword,
    ConfirmPassword,
}

impl Prompt {
    pub fn title(self) -> &'static str {
        match self {
            Self::Username => "Login / Register",
            Self::Password => "Login",
            Self::NewUserPassword => "Register",
            Self::ResetOffer => "Reset?",
            Self::VerificationCode => "Verify",
            Self::NewPassword | Self::ConfirmPassword => "Reset Password",
        }
    }

    pub fn text(self) -> &'static str {
        match self {
            Self::Username => "Enter username",
            Self::Password => "Enter password",
            Self::NewUserPassword => "New user. Create password",
            Self::ResetOffer => "Incorrect password. Reset password? (yes/no)",
            Self::VerificationCode => "Enter the 6-digit verification code from the operator",
            Self::NewPassword => "Enter new password",
            Self::ConfirmPassword => "Confirm new password",
        }
    }

    /// Whether the answer should be masked while typed.
    pub fn is_secret(self) -> bool {
        matches!(
            self,
            Self::Password | Self::NewUserPassword | Self::NewPassword | Self::ConfirmPassword
        )
    }
}

/// Front end that answers dialogue prompts.
///
/// `Ok(None)` means the prompt was dismissed without an answer.
pub trait Prompter {
    fn ask(&mut self, prompt: Prompt) -> anyhow::Result<Option<String>>;
}

/// Reasons the dialogue ends without an authenticated user.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Username required.")]
    EmptyUsername,
    #[error("Password required.")]
    EmptyPassword,
    #[error("Incorrect password.")]
    IncorrectPassword,
    #[error("Verification failed. Access denied.")]
    VerificationFailed,
    #[error("Passwords do not match.")]
    PasswordMismatch,
    #[error("Credential storage failed: {0:#}")]
    Storage(anyhow::Error),
    #[error("Prompt failed: {0:#}")]
    Prompt(anyhow::Error),
}

/// Dialogue states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    AwaitUsername,
    Register { username: String },
    CheckPassword { username: String },
    OfferReset { username: String },
    VerifyCode { username: String, code: VerificationCode },
    CollectPassword { username: String },
    Done { username: String },
}

/// Drives one authentication attempt against a credential store.
pub struct Dialogue<'a> {
    store: &'a mut CredentialStore,
    prompter: &'a mut dyn Prompter,
    sink: &'a dyn CodeSink,
}

impl<'a> Dialogue<'a> {
    pub fn new(
        store: &'a mut CredentialStore,
        prompter: &'a mut dyn Prompter,
        sink: &'a dyn CodeSink,
    ) -> Self {
        Self {
            store,
            prompter,
            sink,
        }
    }

    /// Run from `AwaitUsername` until `Done` or the first failure.
    pub fn run(mut self) -> Result<Session, AuthError> {
        let mut state = AuthState::AwaitUsername;
        loop {
            state = match state {
                AuthState::Done { username } => {
                    tracing::info!(username = %username, "Authenticated");
                    return Ok(Session::new(username));
                }
                other => self.step(other)?,
            };
        }
    }

    /// Advance the dialogue by one state.
    pub fn step(&mut self, state: AuthState) -> Result<AuthState, AuthError> {
        match state {
            AuthState::AwaitUsername => {
                let username = self.ask(Prompt::Username)?;
                let username = username.trim();
                if username.is_empty() {
                    return Err(AuthError::EmptyUsername);
                }
                let username = username.to_string();
                if self.store.contains(&username) {
                    Ok(AuthState::CheckPassword { username })
                } else {
                    Ok(AuthState::Register { username })
                }
            }
            AuthState::Register { username } => {
                let password = self.ask(Prompt::NewUserPassword)?;
                if password.is_empty() {
                    return Err(AuthError::EmptyPassword);
                }
                self.store
                    .set_password(&username, &password)
                    .map_err(AuthError::Storage)?;
                tracing::info!(username = %username, "Registered new user");
                Ok(AuthState::Done { username })
            }
            AuthState::CheckPassword { username } => {
                let password = self.ask(Prompt::Password)?;
                if self.store.verify(&username, &password) {
                    Ok(AuthState::Done { username })
                } else {
                    tracing::debug!(username = %username, "Password mismatch");
                    Ok(AuthState::OfferReset { username })
                }
            }
            AuthState::OfferReset { username } => {
                let choice = self.ask(Prompt::ResetOffer)?;
                if !choice.eq_ignore_ascii_case("yes") {
                    return Err(AuthError::IncorrectPassword);
                }
                let code = VerificationCode::generate();
                self.sink
                    .deliver(&username, &code)
                    .map_err(AuthError::Storage)?;
                Ok(AuthState::VerifyCode { username, code })
            }
            AuthState::VerifyCode { username, code } => {
                let entered = self.ask(Prompt::VerificationCode)?;
                if !code.matches(&entered) {
                    tracing::info!(username = %username, "Verification code rejected");
                    return Err(AuthError::VerificationFailed);
                }
                Ok(AuthState::CollectPassword { username })
            }
            AuthState::CollectPassword { username } => {
                let new_password = self.ask(Prompt::NewPassword)?;
                let confirm = self.ask(Prompt::ConfirmPassword)?;
                if new_password != confirm {
                    return Err(AuthError::PasswordMismatch);
                }
                if new_password.is_empty() {
                    return Err(AuthError::EmptyPassword);
                }
                self.store
                    .set_password(&username, &new_password)
                    .map_err(AuthError::Storage)?;
                tracing::info!(username = %username, "Password reset");
                Ok(AuthState::Done { username })
            }
            done @ AuthState::Done { .. } => Ok(done),
        }
    }

    /// Ask one question; a dismissed prompt counts as an empty answer.
    fn ask(&mut self, prompt: Prompt) -> Result<String, AuthError> {
        let answer = self.prompter.ask(prompt).map_err(AuthError::Prompt)?;
        Ok(answer.unwrap_or_default())
    }
}

/// Run a full authentication dialogue.
pub fn authenticate(
    store: &mut CredentialStore,
    prompter: &mut dyn Prompter,
    sink: &dyn CodeSink,
) -> Result<Session, AuthError> {
    Dialogue::new(store, prompter, sink).run()
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::auth::hash::{self, PasswordHasher};
    use crate::config::HashScheme;
    use tempfile::TempDir;

    fn test_store() -> (TempDir, CredentialStore) {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("users.json");
        let store =
            CredentialStore::open_at(&path, PasswordHasher::new(HashScheme::Sha256, 1)).unwrap();
        (tmp, store)
    }

    fn run(store: &mut CredentialStore, answers: Vec<Answer>) -> Result<Session, AuthError> {
        let sink = RecordingSink::default();
        let mut prompter = ScriptedPrompter::new(answers, &sink);
        authenticate(store, &mut prompter, &sink)
    }

    fn on_disk(store: &CredentialStore) -> String {
        std::fs::read_to_string(store.path()).unwrap()
    }

    #[test]
    fn new_user_is_registered() {
        let (_tmp, mut store) = test_store();
        let session = run(&mut store, vec![text("  alice  "), text("pw")]).unwrap();

        assert_eq!(session.username(), "alice");
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("alice").unwrap().digest(), hash::hash("pw"));
    }

    #[test]
    fn empty_username_aborts() {
        let (_tmp, mut store) = test_store();
        let err = run(&mut store, vec![text("   ")]).unwrap_err();
        assert!(matches!(err, AuthError::EmptyUsername));

        let err = run(&mut store, vec![Answer::Dismissed]).unwrap_err();
        assert!(matches!(err, AuthError::EmptyUsername));
        assert!(store.is_empty());
    }

    #[test]
    fn empty_registration_password_aborts() {
        let (_tmp, mut store) = test_store();
        let err = run(&mut store, vec![text("alice"), text("")]).unwrap_err();
        assert!(matches!(err, AuthError::EmptyPassword));
        assert!(!store.contains("alice"));
    }

    #[test]
    fn correct_password_does_not_mutate_store() {
        let (_tmp, mut store) = test_store();
        store.set_password("alice", "pw").unwrap();
        let before = on_disk(&store);

        let session = run(&mut store, vec![text("alice"), text("pw")]).unwrap();
        assert_eq!(session.username(), "alice");
        assert_eq!(on_disk(&store), before);
    }

    #[test]
    fn declined_reset_aborts_without_change() {
        let (_tmp, mut store) = test_store();
        store.set_password("alice", "pw").unwrap();
        let before = on_disk(&store);

        let err = run(&mut store, vec![text("alice"), text("nope"), text("no")]).unwrap_err();
        assert!(matches!(err, AuthError::IncorrectPassword));
        assert_eq!(on_disk(&store), before);

        let err = run(&mut store, vec![text("alice"), text("nope"), Answer::Dismissed]).unwrap_err();
        assert!(matches!(err, AuthError::IncorrectPassword));
    }

    #[test]
    fn reset_answer_is_case_insensitive_but_exact() {
        let (_tmp, mut store) = test_store();
        store.set_password("alice", "pw").unwrap();

        let err = run(&mut store, vec![text("alice"), text("x"), text("yes ")]).unwrap_err();
        assert!(matches!(err, AuthError::IncorrectPassword));

        let session = run(
            &mut store,
            vec![
                text("alice"),
                text("x"),
                text("YeS"),
                Answer::IssuedCode,
                text("fresh"),
                text("fresh"),
            ],
        )
        .unwrap();
        assert_eq!(session.username(), "alice");
    }

    #[test]
    fn successful_reset_replaces_hash() {
        let (_tmp, mut store) = test_store();
        store.set_password("alice", "old").unwrap();

        let sink = RecordingSink::default();
        let mut prompter = ScriptedPrompter::new(
            vec![
                text("alice"),
                text("forgot"),
                text("yes"),
                Answer::IssuedCode,
                text("new-pw"),
                text("new-pw"),
            ],
            &sink,
        );
        let session = authenticate(&mut store, &mut prompter, &sink).unwrap();

        assert_eq!(session.username(), "alice");
        assert_eq!(sink.codes.borrow().len(), 1);
        assert_eq!(
            prompter.asked,
            vec![
                Prompt::Username,
                Prompt::Password,
                Prompt::ResetOffer,
                Prompt::VerificationCode,
                Prompt::NewPassword,
                Prompt::ConfirmPassword,
            ]
        );
        assert_eq!(store.get("alice").unwrap().digest(), hash::hash("new-pw"));

        let session = run(&mut store, vec![text("alice"), text("new-pw")]).unwrap();
        assert_eq!(session.username(), "alice");
    }

    #[test]
    fn wrong_code_aborts() {
        let (_tmp, mut store) = test_store();
        store.set_password("alice", "pw").unwrap();

        let err = run(
            &mut store,
            vec![text("alice"), text("x"), text("yes"), text("000000")],
        )
        .unwrap_err();
        assert!(matches!(err, AuthError::VerificationFailed));
        assert!(store.verify("alice", "pw"));
    }

    #[test]
    fn mismatched_confirmation_aborts() {
        let (_tmp, mut store) = test_store();
        store.set_password("alice", "pw").unwrap();

        let err = run(
            &mut store,
            vec![
                text("alice"),
                text("x"),
                text("yes"),
                Answer::IssuedCode,
                text("one"),
                text("two"),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, AuthError::PasswordMismatch));
        assert!(store.verify("alice", "pw"));
    }

    #[derive(Clone, Default)]
    struct LogBuffer(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn rejected_answers_stay_below_default_log_level() {
        use tracing_subscriber::util::SubscriberInitExt;

        let logs = LogBuffer::default();
        let writer = logs.clone();
        let _guard = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_writer(move || writer.clone())
            .finish()
            .set_default();

        let (_tmp, mut store) = test_store();
        store.set_password("alice", "pw").unwrap();
        let wrong_code = vec![text("alice"), text("x"), text("yes"), text("000000")];
        assert!(run(&mut store, wrong_code).is_err());
        let mismatch = vec![
            text("alice"),
            text("x"),
            text("yes"),
            Answer::IssuedCode,
            text("one"),
            text("two"),
        ];
        assert!(run(&mut store, mismatch).is_err());

        assert!(logs.0.lock().unwrap().is_empty());
    }

    #[test]
    fn empty_reset_password_aborts() {
        let (_tmp, mut store) = test_store();
        store.set_password("alice", "pw").unwrap();

        let err = run(
            &mut store,
            vec![
                text("alice"),
                text("x"),
                text("yes"),
                Answer::IssuedCode,
                text(""),
                Answer::Dismissed,
            ],
        )
        .unwrap_err();
        assert!(matches!(err, AuthError::EmptyPassword));
        assert!(store.verify("alice", "pw"));
    }

    #[test]
    fn step_routes_known_and_unknown_users() {
        let (_tmp, mut store) = test_store();
        store.set_password("alice", "pw").unwrap();
        let sink = RecordingSink::default();

        let mut prompter = ScriptedPrompter::new(vec![text("alice")], &sink);
        let mut dialogue = Dialogue::new(&mut store, &mut prompter, &sink);
        assert_eq!(
            dialogue.step(AuthState::AwaitUsername).unwrap(),
            AuthState::CheckPassword {
                username: "alice".into()
            }
        );

        let mut prompter = ScriptedPrompter::new(vec![text("bob")], &sink);
        let mut dialogue = Dialogue::new(&mut store, &mut prompter, &sink);
        assert_eq!(
            dialogue.step(AuthState::AwaitUsername).unwrap(),
            AuthState::Register {
                username: "bob".into()
            }
        );
    }

    #[test]
    fn secret_prompts_are_masked() {
        assert!(Prompt::Password.is_secret());
        assert!(Prompt::ConfirmPassword.is_secret());
        assert!(!Prompt::Username.is_secret());
        assert!(!Prompt::VerificationCode.is_secret());
    }
}
