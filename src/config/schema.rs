use anyhow::{Context, Result};
use directories::ProjectDirs;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Directory used when no platform data directory can be determined.
const FALLBACK_DATA_DIR: &str = "User_data";

/// Top-level taskgate configuration.
///
/// Every store receives the pieces it needs from this struct at construction
/// time; nothing reads paths from globals.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Root directory for credentials, task files and the operator file.
    pub data_dir: PathBuf,
    pub credentials: CredentialsConfig,
    pub tasks: TasksConfig,
    pub reset: ResetConfig,
    pub ui: UiConfig,
}

/// Credential document settings.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct CredentialsConfig {
    /// Credential document, relative to `data_dir` unless absolute.
    pub file: PathBuf,
    /// Scheme used for newly written password records.
    pub scheme: HashScheme,
    /// PBKDF2 rounds for salted records.
    pub pbkdf2_iterations: u32,
}

/// Password record format written on registration and reset.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum HashScheme {
    /// Salted PBKDF2-HMAC-SHA256.
    #[default]
    Pbkdf2,
    /// Unsalted hex SHA-256, readable by older installs.
    Sha256,
}

impl HashScheme {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pbkdf2 => "pbkdf2",
            Self::Sha256 => "sha256",
        }
    }
}

/// Task file settings.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct TasksConfig {
    /// Directory holding one CSV file per user, relative to `data_dir`.
    pub dir: PathBuf,
}

/// Password-reset settings.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct ResetConfig {
    /// Where one-time verification codes are delivered.
    pub operator_channel: OperatorChannelKind,
    /// Target of the `file` operator channel, relative to `data_dir`.
    pub operator_file: PathBuf,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OperatorChannelKind {
    /// Print the code on standard output (prompts are drawn on stderr).
    #[default]
    Stdout,
    /// Append the code to the operator file.
    File,
}

/// Terminal presentation settings.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct UiConfig {
    /// Whether completed tasks are listed when the shell starts.
    pub show_completed: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            credentials: CredentialsConfig::default(),
            tasks: TasksConfig::default(),
            reset: ResetConfig::default(),
            ui: UiConfig::default(),
        }
    }
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            file: PathBuf::from("users.json"),
            scheme: HashScheme::default(),
            pbkdf2_iterations: 100_000,
        }
    }
}

impl Default for TasksConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("tasks"),
        }
    }
}

impl Default for ResetConfig {
    fn default() -> Self {
        Self {
            operator_channel: OperatorChannelKind::default(),
            operator_file: PathBuf::from("verification_codes.log"),
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            show_completed: true,
        }
    }
}

impl Config {
    /// Default location of the config file, if the platform has one.
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "taskgate").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Load configuration from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;
        Ok(config)
    }

    /// Write the configuration as TOML, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config dir: {}", parent.display()))?;
        }
        let rendered = self.to_toml()?;
        std::fs::write(path, rendered)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }

    /// JSON Schema for the config file, pretty-printed.
    pub fn json_schema() -> Result<String> {
        let schema = schemars::schema_for!(Config);
        serde_json::to_string_pretty(&schema).context("Failed to serialize config schema")
    }

    /// `data_dir` with `~` and environment variables expanded.
    pub fn data_dir(&self) -> PathBuf {
        expand(&self.data_dir)
    }

    pub fn credentials_path(&self) -> PathBuf {
        self.resolve(&self.credentials.file)
    }

    pub fn tasks_dir(&self) -> PathBuf {
        self.resolve(&self.tasks.dir)
    }

    pub fn operator_file(&self) -> PathBuf {
        self.resolve(&self.reset.operator_file)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        let expanded = expand(path);
        if expanded.is_absolute() {
            expanded
        } else {
            self.data_dir().join(expanded)
        }
    }
}

fn default_data_dir() -> PathBuf {
    ProjectDirs::from("", "", "taskgate")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(FALLBACK_DATA_DIR))
}

fn expand(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    match shellexpand::full(&raw) {
        Ok(expanded) => PathBuf::from(expanded.into_owned()),
        Err(e) => {
            tracing::warn!("Could not expand {}: {e}", path.display());
            path.to_path_buf()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_match_data_layout() {
        let config = Config::default();
        assert_eq!(config.credentials.file, PathBuf::from("users.json"));
        assert_eq!(config.tasks.dir, PathBuf::from("tasks"));
        assert_eq!(config.credentials.scheme, HashScheme::Pbkdf2);
        assert_eq!(config.reset.operator_channel, OperatorChannelKind::Stdout);
        assert!(config.ui.show_completed);
    }

    #[test]
    fn relative_paths_resolve_under_data_dir() {
        let config = Config {
            data_dir: PathBuf::from("/srv/taskgate"),
            ..Config::default()
        };
        assert_eq!(
            config.credentials_path(),
            PathBuf::from("/srv/taskgate/users.json")
        );
        assert_eq!(config.tasks_dir(), PathBuf::from("/srv/taskgate/tasks"));
    }

    #[test]
    fn absolute_paths_are_kept() {
        let mut config = Config {
            data_dir: PathBuf::from("/srv/taskgate"),
            ..Config::default()
        };
        config.tasks.dir = PathBuf::from("/var/lib/tasks");
        assert_eq!(config.tasks_dir(), PathBuf::from("/var/lib/tasks"));
    }

    #[test]
    fn missing_file_yields_defaults() {
        let tmp = TempDir::new().unwrap();
        let config = Config::load(&tmp.path().join("absent.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn partial_file_fills_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(
            &path,
            "data_dir = \"/tmp/tg\"\n[credentials]\nscheme = \"sha256\"\n",
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/tmp/tg"));
        assert_eq!(config.credentials.scheme, HashScheme::Sha256);
        assert_eq!(config.credentials.pbkdf2_iterations, 100_000);
        assert!(config.ui.show_completed);
    }

    #[test]
    fn invalid_file_reports_path() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "data_dir = [").unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(format!("{err:#}").contains("config.toml"));
    }

    #[test]
    fn save_then_load() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("config.toml");
        let mut config = Config {
            data_dir: tmp.path().to_path_buf(),
            ..Config::default()
        };
        config.ui.show_completed = false;
        config.save(&path).unwrap();

        assert_eq!(Config::load(&path).unwrap(), config);
    }

    #[test]
    fn schema_mentions_sections() {
        let schema = Config::json_schema().unwrap();
        assert!(schema.contains("credentials"));
        assert!(schema.contains("operator_channel"));
    }
}
