//! Configuration loading.
//!
//! Loads from `$JOURNAL_CONFIG_PATH` or `~/.moodjournal/config.toml`.
//! Precedence: env vars > config file > defaults. A missing file is not an
//! error; every section has defaults.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::providers::classifier::DEFAULT_CLASSIFIER_URL;
use crate::providers::gemini::{DEFAULT_GEMINI_MODEL, DEFAULT_GEMINI_URL};
use crate::store::remote::DEFAULT_TABLE;
use crate::sync::policy::ForceMode;

// ── Top-level config ────────────────────────────────────────────

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct JournalConfig {
    /// Default tracing filter when `RUST_LOG` is unset.
    pub log_level: String,
    /// Directory for JSON log files. Console-only logging when unset.
    pub log_dir: Option<PathBuf>,
    /// Remote row store.
    pub remote: RemoteConfig,
    /// Remote authentication.
    pub auth: AuthConfig,
    /// Emotion classifier.
    pub classifier: ClassifierConfig,
    /// Insight generation.
    pub insights: InsightsConfig,
    /// Local storage.
    pub storage: StorageConfig,
    /// Demo session credentials.
    pub demo: DemoConfig,
    /// Engine behaviour.
    pub engine: EngineConfig,
}

impl JournalConfig {
    /// Load configuration with precedence: env vars > TOML file > defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        let env = |key: &str| std::env::var(key).ok();
        let path = Self::config_path_with(env)?;
        let mut config = Self::load_from(&path)?;
        config.apply_overrides(env);
        Ok(config)
    }

    /// Load from a TOML file only, no env overrides. Missing file → defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(contents) => {
                tracing::debug!(path = %path.display(), "loading config from file");
                Self::from_toml(&contents)
                    .with_context(|| format!("failed to parse config at {}", path.display()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file found, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(anyhow::anyhow!(
                "failed to read config at {}: {e}",
                path.display()
            )),
        }
    }

    /// Resolve the config file path using a custom env resolver.
    ///
    /// # Errors
    ///
    /// Returns an error if no env path is set and the home directory cannot
    /// be determined.
    pub fn config_path_with(env: impl Fn(&str) -> Option<String>) -> Result<PathBuf> {
        if let Some(p) = env("JOURNAL_CONFIG_PATH") {
            return Ok(PathBuf::from(p));
        }
        Ok(config_dir()?.join("config.toml"))
    }

    /// Apply environment variable overrides.
    ///
    /// Takes a resolver function so tests need not touch the process
    /// environment.
    pub fn apply_overrides(&mut self, env: impl Fn(&str) -> Option<String>) {
        if let Some(v) = env("JOURNAL_LOG_LEVEL") {
            self.log_level = v;
        }
        if let Some(v) = env("JOURNAL_LOG_DIR") {
            self.log_dir = Some(PathBuf::from(v));
        }

        // Remote store.
        if let Some(v) = env("JOURNAL_REMOTE_URL") {
            self.remote.url = Some(v);
        }
        if let Some(v) = env("JOURNAL_REMOTE_API_KEY") {
            self.remote.api_key = Some(v);
        }
        if let Some(v) = env("JOURNAL_ACCESS_TOKEN") {
            self.auth.access_token = Some(v);
        }

        // Model endpoints.
        if let Some(v) = env("JOURNAL_CLASSIFIER_URL") {
            self.classifier.endpoint = v;
        }
        if let Some(v) = env("JOURNAL_INSIGHTS_URL") {
            self.insights.endpoint = Some(v);
        }
        if let Some(v) = env("GEMINI_API_KEY") {
            self.insights.gemini_api_key = Some(v);
        }

        // Storage.
        if let Some(v) = env("JOURNAL_LOCAL_DB") {
            self.storage.local_db = Some(PathBuf::from(v));
        }

        // Engine.
        if let Some(v) = env("JOURNAL_FORCE_MODE") {
            match v.parse() {
                Ok(mode) => self.engine.force_mode = Some(mode),
                Err(err) => tracing::warn!(
                    var = "JOURNAL_FORCE_MODE",
                    error = %err,
                    "ignoring invalid env override"
                ),
            }
        }
    }

    /// Parse a TOML string into config.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed or has wrong types.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str).context("failed to parse config TOML")
    }

    /// Local database path, defaulting under [`config_dir`].
    ///
    /// # Errors
    ///
    /// Returns an error if no path is configured and the home directory
    /// cannot be determined.
    pub fn local_db_path(&self) -> Result<PathBuf> {
        match &self.storage.local_db {
            Some(path) => Ok(path.clone()),
            None => Ok(config_dir()?.join("local.db")),
        }
    }
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_dir: None,
            remote: RemoteConfig::default(),
            auth: AuthConfig::default(),
            classifier: ClassifierConfig::default(),
            insights: InsightsConfig::default(),
            storage: StorageConfig::default(),
            demo: DemoConfig::default(),
            engine: EngineConfig::default(),
        }
    }
}

/// Resolve the default config directory (`~/.moodjournal/`).
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined.
pub fn config_dir() -> Result<PathBuf> {
    let home = directories::BaseDirs::new()
        .ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
    Ok(home.home_dir().join(".moodjournal"))
}

// ── Remote ──────────────────────────────────────────────────────

/// Remote row store settings.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Project base URL. Unset means every remote call fails over to local.
    pub url: Option<String>,
    /// Anon or service key.
    pub api_key: Option<String>,
    /// Table holding entries.
    pub table: String,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            url: None,
            api_key: None,
            table: DEFAULT_TABLE.to_owned(),
        }
    }
}

impl std::fmt::Debug for RemoteConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteConfig")
            .field("url", &self.url)
            .field("api_key", &self.api_key.as_ref().map(|_| "__REDACTED__"))
            .field("table", &self.table)
            .finish()
    }
}

/// Remote authentication settings.
#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Access token of the signed-in user.
    pub access_token: Option<String>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "__REDACTED__"),
            )
            .finish()
    }
}

// ── Model endpoints ─────────────────────────────────────────────

/// Emotion classifier settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Endpoint receiving `{"text": ...}`.
    pub endpoint: String,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_CLASSIFIER_URL.to_owned(),
        }
    }
}

/// Insight generation settings.
///
/// An explicit `endpoint` wins; otherwise a Gemini key enables the Gemini
/// transport; with neither, insights are always the templated fallback.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct InsightsConfig {
    /// Insight endpoint URL.
    pub endpoint: Option<String>,
    /// Gemini API key.
    pub gemini_api_key: Option<String>,
    /// Gemini model name.
    pub gemini_model: String,
    /// Gemini API base URL.
    pub gemini_base_url: String,
}

impl Default for InsightsConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            gemini_api_key: None,
            gemini_model: DEFAULT_GEMINI_MODEL.to_owned(),
            gemini_base_url: DEFAULT_GEMINI_URL.to_owned(),
        }
    }
}

impl std::fmt::Debug for InsightsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InsightsConfig")
            .field("endpoint", &self.endpoint)
            .field(
                "gemini_api_key",
                &self.gemini_api_key.as_ref().map(|_| "__REDACTED__"),
            )
            .field("gemini_model", &self.gemini_model)
            .field("gemini_base_url", &self.gemini_base_url)
            .finish()
    }
}

// ── Storage / demo / engine ─────────────────────────────────────

/// Local storage settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite file holding local slots.
    pub local_db: Option<PathBuf>,
}

/// Demo session credentials.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    /// Demo username.
    pub username: String,
    /// Demo password.
    pub password: String,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            username: "devpostdemo".to_owned(),
            password: "HPAISTUDIO".to_owned(),
        }
    }
}

impl std::fmt::Debug for DemoConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DemoConfig")
            .field("username", &self.username)
            .field("password", &"__REDACTED__")
            .finish()
    }
}

/// Engine behaviour.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Forced store preference. Overrides the persisted slot when set.
    #[serde(deserialize_with = "deserialize_force_mode")]
    pub force_mode: Option<ForceMode>,
    /// Mirror unbounded remote list reads into local storage.
    pub mirror_full_reads: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            force_mode: None,
            mirror_full_reads: true,
        }
    }
}

fn deserialize_force_mode<'de, D>(deserializer: D) -> Result<Option<ForceMode>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    raw.map(|s| s.parse().map_err(serde::de::Error::custom))
        .transpose()
}

// ── Tests ───────────────────────────────────────────────────────
