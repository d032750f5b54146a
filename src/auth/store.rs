//! JSON-file credential store.
//!
//! The whole username → password-record mapping lives in one indented JSON
//! document. Every mutation rewrites the full document through a temp file
//! in the same directory followed by a rename.

use super::hash::{PasswordHasher, PasswordRecord};
use crate::config::Config;
use crate::util::write_atomic;
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Complete username → password-record table.
pub type CredentialMap = BTreeMap<String, PasswordRecord>;

/// File-backed credential store.
#[derive(Debug)]
pub struct CredentialStore {
    path: PathBuf,
    hasher: PasswordHasher,
    users: CredentialMap,
}

impl CredentialStore {
    /// Open the store described by `config`, creating it if absent.
    pub fn open(config: &Config) -> Result<Self> {
        let hasher = PasswordHasher::new(
            config.credentials.scheme,
            config.credentials.pbkdf2_iterations,
        );
        Self::open_at(&config.credentials_path(), hasher)
    }

    /// Open (or create) the credential document at `path`.
    pub fn open_at(path: &Path, hasher: PasswordHasher) -> Result<Self> {
        let users = load(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            hasher,
            users,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn contains(&self, username: &str) -> bool {
        self.users.contains_key(username)
    }

    pub fn get(&self, username: &str) -> Option<&PasswordRecord> {
        self.users.get(username)
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    pub fn usernames(&self) -> impl Iterator<Item = &str> {
        self.users.keys().map(String::as_str)
    }

    /// Check `password` against the stored record. Unknown users never match.
    pub fn verify(&self, username: &str, password: &str) -> bool {
        self.users
            .get(username)
            .is_some_and(|record| record.matches(password))
    }

    /// Store a freshly hashed record for `username` and persist the mapping.
    pub fn set_password(&mut self, username: &str, password: &str) -> Result<()> {
        let record = self.hasher.record(password);
        let previous = self.users.insert(username.to_string(), record);
        if let Err(e) = save(&self.path, &self.users) {
            // Keep memory in line with what is on disk.
            match previous {
                Some(old) => self.users.insert(username.to_string(), old),
                None => self.users.remove(username),
            };
            return Err(e);
        }
        tracing::info!(
            username = username,
            scheme = self.hasher.scheme().as_str(),
            "Credential record stored"
        );
        Ok(())
    }
}

/// Read the full mapping. A missing document is created empty and persisted.
pub fn load(path: &Path) -> Result<CredentialMap> {
    if !path.exists() {
        let empty = CredentialMap::new();
        save(path, &empty)?;
        tracing::debug!(path = %path.display(), "Initialised empty credential store");
        return Ok(empty);
    }

    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read credentials: {}", path.display()))?;
    let users: CredentialMap = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse credentials: {}", path.display()))?;
    Ok(users)
}

/// Overwrite the document with the full mapping as indented JSON.
pub fn save(path: &Path, users: &CredentialMap) -> Result<()> {
    let mut json = serde_json::to_string_pretty(users).context("Failed to serialize credentials")?;
    json.push('\n');
    write_atomic(path, json.as_bytes())
        .with_context(|| format!("Failed to save credentials: {}", path.display()))
}
