//! Application configuration with layered loading.
//!
//! Configuration is loaded with figment from, in increasing precedence:
//!
//! 1. Built-in defaults
//! 2. TOML config file (if DISCWATCH_CONFIG_FILE set)
//! 3. Environment variables (DISCWATCH_*)

use std::path::PathBuf;
use std::time::Duration;

use chrono::{FixedOffset, Offset, Utc};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite run store.
    ///
    /// Set via DISCWATCH_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Directory that report exports are written to.
    ///
    /// Set via DISCWATCH_EXPORT_DIR environment variable.
    #[serde(default = "default_export_dir")]
    pub export_dir: PathBuf,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via DISCWATCH_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to fetch per page.
    ///
    /// Set via DISCWATCH_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Page load timeout in milliseconds. A page that does not load in time counts as a
    /// failed fetch for that product only.
    ///
    /// Set via DISCWATCH_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Whether products hinted `browser` are rendered with headless Chrome.
    ///
    /// Set via DISCWATCH_RENDER_ENABLED environment variable.
    #[serde(default)]
    pub render_enabled: bool,

    /// Lower bound of the randomized delay between product fetches.
    ///
    /// Set via DISCWATCH_DELAY_MIN_MS environment variable.
    #[serde(default = "default_delay_min_ms")]
    pub delay_min_ms: u64,

    /// Upper bound of the randomized delay between product fetches.
    ///
    /// Set via DISCWATCH_DELAY_MAX_MS environment variable.
    #[serde(default = "default_delay_max_ms")]
    pub delay_max_ms: u64,

    /// UTC offset, in minutes, used for fetch timestamps and export file dates.
    ///
    /// Set via DISCWATCH_UTC_OFFSET_MINUTES environment variable. Defaults to +07:00.
    #[serde(default = "default_utc_offset_minutes")]
    pub utc_offset_minutes: i32,

    /// Drop products whose page links no PDF sheet.
    ///
    /// Set via DISCWATCH_REQUIRE_PDF environment variable.
    #[serde(default)]
    pub require_pdf: bool,

    /// Gemini API key for the optional summarization pass.
    ///
    /// Set via DISCWATCH_GEMINI_API_KEY environment variable.
    #[serde(default)]
    pub gemini_api_key: Option<String>,

    /// Gemini model name.
    ///
    /// Set via DISCWATCH_GEMINI_MODEL environment variable.
    #[serde(default = "default_gemini_model")]
    pub gemini_model: String,

    /// Attempts per summarization chunk before the failure is recorded in the row.
    ///
    /// Set via DISCWATCH_SUMMARIZE_MAX_ATTEMPTS environment variable.
    #[serde(default = "default_summarize_max_attempts")]
    pub summarize_max_attempts: u32,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./discwatch-runs.sqlite")
}

fn default_export_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_user_agent() -> String {
    "discwatch/0.1".into()
}

fn default_max_bytes() -> usize {
    10_485_760 // 10MB
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_delay_min_ms() -> u64 {
    1_000
}

fn default_delay_max_ms() -> u64 {
    5_000
}

fn default_utc_offset_minutes() -> i32 {
    7 * 60
}

fn default_gemini_model() -> String {
    "gemini-1.5-flash".into()
}

fn default_summarize_max_attempts() -> u32 {
    3
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            export_dir: default_export_dir(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
            render_enabled: false,
            delay_min_ms: default_delay_min_ms(),
            delay_max_ms: default_delay_max_ms(),
            utc_offset_minutes: default_utc_offset_minutes(),
            require_pdf: false,
            gemini_api_key: None,
            gemini_model: default_gemini_model(),
            summarize_max_attempts: default_summarize_max_attempts(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Politeness delay bounds as Durations.
    pub fn delay_range(&self) -> (Duration, Duration) {
        (Duration::from_millis(self.delay_min_ms), Duration::from_millis(self.delay_max_ms))
    }

    /// The configured UTC offset.
    ///
    /// Falls back to UTC if the offset is out of range; `validate` rejects such values.
    pub fn utc_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes.saturating_mul(60)).unwrap_or_else(|| Utc.fix())
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("DISCWATCH_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("DISCWATCH_")
                .ignore(&["config_file"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Check that a Gemini API key is available (deferred until summarization is requested).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if the key is not set.
    pub fn require_gemini_api_key(&self) -> Result<&str, ConfigError> {
        self.gemini_api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ConfigError::Missing {
                field: "gemini_api_key".into(),
                hint: "Set DISCWATCH_GEMINI_API_KEY environment variable".into(),
            })
    }
}
