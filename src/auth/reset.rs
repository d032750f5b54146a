//! One-time verification codes for the password-reset path.
//!
//! A code is a uniform 6-digit number delivered through an operator-facing
//! channel that is separate from the prompts the user answers. Whoever can
//! read that channel can complete a reset.

use super::hash::constant_time_eq;
use crate::config::{Config, OperatorChannelKind};
use anyhow::{Context, Result};
use rand::Rng;
use std::fmt;
use std::io::Write;
use std::path::PathBuf;

const CODE_MIN: u32 = 100_000;
const CODE_MAX: u32 = 999_999;

/// A generated 6-digit verification code.
#[derive(Clone, PartialEq, Eq)]
pub struct VerificationCode(String);

impl VerificationCode {
    /// Draw a code uniformly from 100000..=999999.
    pub fn generate() -> Self {
        let n = rand::thread_rng().gen_range(CODE_MIN..=CODE_MAX);
        Self(n.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Exact string comparison against what the user typed.
    pub fn matches(&self, entered: &str) -> bool {
        constant_time_eq(self.0.as_bytes(), entered.as_bytes())
    }
}

impl fmt::Debug for VerificationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("VerificationCode(******)")
    }
}

#[cfg(test)]
impl VerificationCode {
    pub(crate) fn from_digits(digits: &str) -> Self {
        Self(digits.to_string())
    }
}

/// Out-of-band destination for verification codes.
pub trait CodeSink {
    fn deliver(&self, username: &str, code: &VerificationCode) -> Result<()>;
}

/// Operator channel chosen by configuration.
#[derive(Debug, Clone)]
pub enum OperatorChannel {
    /// Standard output. Prompts are drawn on stderr, so the two never mix.
    Stdout,
    /// Append `<username> <code>` lines to a file.
    File(PathBuf),
}

impl OperatorChannel {
    pub fn from_config(config: &Config) -> Self {
        match config.reset.operator_channel {
            OperatorChannelKind::Stdout => Self::Stdout,
            OperatorChannelKind::File => Self::File(config.operator_file()),
        }
    }
}

impl CodeSink for OperatorChannel {
    fn deliver(&self, username: &str, code: &VerificationCode) -> Result<()> {
        match self {
            Self::Stdout => {
                let mut out = std::io::stdout().lock();
                writeln!(out, "[VERIFICATION CODE]: {}", code.as_str())?;
                out.flush()?;
            }
            Self::File(path) => {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent).with_context(|| {
                        format!("Failed to create operator dir: {}", parent.display())
                    })?;
                }
                let mut file = std::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .with_context(|| format!("Failed to open operator file: {}", path.display()))?;
                writeln!(file, "{username} {}", code.as_str())?;
            }
        }
        tracing::info!(username = username, "Verification code issued");
        Ok(())
    }
}
