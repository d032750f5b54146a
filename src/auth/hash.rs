//! Password records and the hash functions behind them.
//!
//! Two record shapes share the credential document:
//! - legacy: a bare hex SHA-256 digest of the password, unsalted
//! - salted: `{ scheme, salt, iterations, hash }` using PBKDF2-HMAC-SHA256
//!
//! Salted records are what new registrations and resets write by default.
//! Legacy records keep verifying so documents written by older installs stay
//! usable.

use crate::config::HashScheme;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Salt byte length for PBKDF2 records.
const SALT_BYTES: usize = 16;

/// Derived key length for PBKDF2 records.
const KEY_BYTES: usize = 32;

/// Stored password record for one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PasswordRecord {
    Salted(SaltedRecord),
    Legacy(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaltedRecord {
    pub scheme: HashScheme,
    /// Hex-encoded salt.
    pub salt: String,
    pub iterations: u32,
    /// Hex-encoded derived key.
    pub hash: String,
}

/// Produces password records according to the configured scheme.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    scheme: HashScheme,
    iterations: u32,
}

impl PasswordHasher {
    pub fn new(scheme: HashScheme, iterations: u32) -> Self {
        Self {
            scheme,
            iterations: iterations.max(1),
        }
    }

    pub fn scheme(&self) -> HashScheme {
        self.scheme
    }

    /// Build a fresh record for `password`. Salted records get a new salt.
    pub fn record(&self, password: &str) -> PasswordRecord {
        match self.scheme {
            HashScheme::Sha256 => PasswordRecord::Legacy(hash(password)),
            HashScheme::Pbkdf2 => {
                let salt = generate_salt();
                let hash = pbkdf2_hex(password, &salt, self.iterations);
                PasswordRecord::Salted(SaltedRecord {
                    scheme: HashScheme::Pbkdf2,
                    salt,
                    iterations: self.iterations,
                    hash,
                })
            }
        }
    }
}

impl PasswordRecord {
    /// Whether `password` produces this record's digest.
    pub fn matches(&self, password: &str) -> bool {
        let attempt = match self {
            Self::Legacy(_) => hash(password),
            Self::Salted(record) => match record.scheme {
                HashScheme::Pbkdf2 => pbkdf2_hex(password, &record.salt, record.iterations),
                HashScheme::Sha256 => hash(password),
            },
        };
        constant_time_eq(self.digest().as_bytes(), attempt.as_bytes())
    }

    /// The stored digest, hex-encoded.
    pub fn digest(&self) -> &str {
        match self {
            Self::Legacy(digest) => digest,
            Self::Salted(record) => &record.hash,
        }
    }

    pub fn is_legacy(&self) -> bool {
        matches!(self, Self::Legacy(_))
    }
}

/// Unsalted hex SHA-256 of the password bytes.
///
/// Deterministic and offers no rainbow-table protection; only used for
/// legacy records.
pub fn hash(password: &str) -> String {
    let mut h = Sha256::new();
    h.update(password.as_bytes());
    hex::encode(h.finalize())
}

fn pbkdf2_hex(password: &str, salt: &str, iterations: u32) -> String {
    let mut key = [0u8; KEY_BYTES];
    pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), salt.as_bytes(), iterations, &mut key);
    hex::encode(key)
}

/// Generate a random salt (hex-encoded).
fn generate_salt() -> String {
    let mut bytes = [0u8; SALT_BYTES];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Constant-time byte comparison to prevent timing attacks.
pub(crate) fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
