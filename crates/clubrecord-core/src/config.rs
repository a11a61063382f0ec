// Configuration loading and parsing (clubrecord.toml, credentials.toml).

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::model::Year;
use crate::snapshot::SeasonWindow;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub store: StoreConfig,
    pub seasons: SeasonsConfig,
    pub rankings: RankingsConfig,
    pub credentials: CredentialsConfig,
}

impl Config {
    /// The reporting window: configured `as_of`, or this year on the clock.
    pub fn window(&self) -> SeasonWindow {
        match self.seasons.as_of {
            Some(as_of) => SeasonWindow::new(&self.seasons.historical, as_of),
            None => SeasonWindow::from_clock(&self.seasons.historical),
        }
    }

    /// Season mined for best partners: configured, else the latest past year
    /// of `window`, else the current one.
    pub fn partner_season(&self, window: &SeasonWindow) -> Year {
        self.seasons
            .partner_season
            .or_else(|| window.last_past_year())
            .unwrap_or_else(|| window.current())
    }
}

// ---------------------------------------------------------------------------
// clubrecord.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire clubrecord.toml file.
#[derive(Debug, Clone, Deserialize)]
struct ClubRecordFile {
    store: StoreConfig,
    #[serde(default)]
    seasons: SeasonsConfig,
    #[serde(default)]
    rankings: RankingsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub project_id: String,
    #[serde(default = "default_database")]
    pub database: String,
    /// Overrides the public endpoint, e.g. for a local emulator.
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            project_id: String::new(),
            database: default_database(),
            base_url: None,
            timeout_secs: default_timeout_secs(),
            max_concurrency: default_max_concurrency(),
            retry_attempts: default_retry_attempts(),
            retry_backoff_ms: default_retry_backoff_ms(),
            page_size: default_page_size(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeasonsConfig {
    #[serde(default = "default_historical")]
    pub historical: Vec<Year>,
    #[serde(default)]
    pub as_of: Option<Year>,
    #[serde(default)]
    pub partner_season: Option<Year>,
}

impl Default for SeasonsConfig {
    fn default() -> Self {
        Self {
            historical: default_historical(),
            as_of: None,
            partner_season: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RankingsConfig {
    #[serde(default = "default_leaderboard_size")]
    pub leaderboard_size: usize,
    #[serde(default = "default_podium_size")]
    pub podium_size: usize,
}

impl Default for RankingsConfig {
    fn default() -> Self {
        Self {
            leaderboard_size: default_leaderboard_size(),
            podium_size: default_podium_size(),
        }
    }
}

fn default_database() -> String {
    "(default)".into()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_max_concurrency() -> usize {
    16
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    200
}

fn default_page_size() -> u32 {
    300
}

fn default_historical() -> Vec<Year> {
    vec![2022, 2023, 2024, 2025]
}

fn default_leaderboard_size() -> usize {
    10
}

fn default_podium_size() -> usize {
    3
}

// ---------------------------------------------------------------------------
// credentials.toml structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Default)]
pub struct CredentialsConfig {
    pub api_key: Option<String>,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/clubrecord.toml` and
/// (optionally) `config/credentials.toml`, relative to `base_dir`.
///
/// Does not copy defaults; see `load_config_at`.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let config_dir = base_dir.join("config");

    // --- clubrecord.toml (required) ---
    let main_path = config_dir.join("clubrecord.toml");
    let main_text = read_file(&main_path)?;
    let file: ClubRecordFile = toml::from_str(&main_text).map_err(|e| ConfigError::ParseError {
        path: main_path.clone(),
        source: e,
    })?;

    // --- credentials.toml (optional) ---
    let credentials_path = config_dir.join("credentials.toml");
    let credentials = if credentials_path.exists() {
        let cred_text = read_file(&credentials_path)?;
        toml::from_str(&cred_text).map_err(|e| ConfigError::ParseError {
            path: credentials_path.clone(),
            source: e,
        })?
    } else {
        CredentialsConfig::default()
    };

    let config = Config {
        store: file.store,
        seasons: file.seasons,
        rankings: file.rankings,
        credentials,
    };

    validate(&config)?;
    debug!(path = %main_path.display(), "loaded configuration");

    Ok(config)
}

/// The only seeded file. Credentials ship as `credentials.toml.example` and
/// are never copied.
const SEEDED_FILE: &str = "clubrecord.toml";

/// Copy `defaults/clubrecord.toml` into `config/` when no config exists yet.
/// Returns the path written, or `None` when a config was already present.
pub fn seed_config(base_dir: &Path) -> Result<Option<PathBuf>, ConfigError> {
    let target = base_dir.join("config").join(SEEDED_FILE);
    if target.exists() {
        return Ok(None);
    }
    let source = base_dir.join("defaults").join(SEEDED_FILE);
    if !source.is_file() {
        return Err(ConfigError::DefaultsCopyError {
            message: format!(
                "no {SEEDED_FILE} under config/ or defaults/ in {}; \
                 run from the project root or pass --config",
                base_dir.display()
            ),
        });
    }

    let copy = |e: std::io::Error| ConfigError::DefaultsCopyError {
        message: format!("failed to seed {}: {e}", target.display()),
    };
    std::fs::create_dir_all(base_dir.join("config")).map_err(copy)?;
    std::fs::copy(&source, &target).map_err(copy)?;
    info!(path = %target.display(), "initialized config file from defaults");
    Ok(Some(target))
}

/// Seed a missing config from `base_dir/defaults`, then load from `base_dir`.
pub fn load_config_at(base_dir: &Path) -> Result<Config, ConfigError> {
    seed_config(base_dir)?;
    load_config_from(base_dir)
}

/// Load config relative to the current working directory, or from the
/// platform config directory when the working directory has neither
/// `config/` nor `defaults/`.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    if cwd.join("config").exists() || cwd.join("defaults").exists() {
        return load_config_at(&cwd);
    }

    let Some(dirs) = ProjectDirs::from("", "", "clubrecord") else {
        return load_config_at(&cwd);
    };
    let base = dirs.config_dir();
    debug!(path = %base.display(), "falling back to platform config directory");
    load_config_from(base)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

fn positive(field: &str, value: usize) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::ValidationError {
            field: field.into(),
            message: "must be greater than 0".into(),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    let store = &config.store;
    if store.base_url.is_none() && store.project_id.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "store.project_id".into(),
            message: "must be set unless store.base_url is given".into(),
        });
    }
    positive("store.max_concurrency", store.max_concurrency)?;
    positive("store.retry_attempts", store.retry_attempts as usize)?;
    positive("store.page_size", store.page_size as usize)?;
    positive("store.timeout_secs", store.timeout_secs as usize)?;

    positive("rankings.leaderboard_size", config.rankings.leaderboard_size)?;
    positive("rankings.podium_size", config.rankings.podium_size)?;

    if let Some(as_of) = config.seasons.as_of {
        if let Some(bad) = config.seasons.historical.iter().find(|&&y| y >= as_of) {
            return Err(ConfigError::ValidationError {
                field: "seasons.historical".into(),
                message: format!("year {bad} is not before seasons.as_of ({as_of})"),
            });
        }
    }

    Ok(())
}
