//! Bootstrap configuration loading and root folder resolution
//!
//! The TOML file only carries bootstrap concerns (port, root folder, logging,
//! upstream model access, stream tuning). A missing or unreadable file is not
//! fatal: a warning is logged and compiled defaults are used.
//!
//! Resolution priority for every value:
//! 1. Command-line argument / environment variable (handled by the binary)
//! 2. TOML configuration file
//! 3. Compiled defaults

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "LYRICGEN_ROOT_FOLDER";

/// Database file name inside the root folder
pub const DATABASE_FILE_NAME: &str = "lyricgen.db";

const APP_DIR_NAME: &str = "lyricgen";

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Root folder holding the database (optional)
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Upstream text-generation provider
    #[serde(default)]
    pub openai: OpenAiConfig,

    /// Live feed reframing and pacing
    #[serde(default)]
    pub streaming: StreamingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// OpenAI-compatible chat completion provider settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenAiConfig {
    /// API key; the `OPENAI_API_KEY` environment variable takes precedence
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_max_completion_tokens")]
    pub max_completion_tokens: u32,

    /// Limit on establishing the provider connection
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Longest silence tolerated while waiting for response headers or the next chunk
    #[serde(default = "default_stream_idle_timeout_secs")]
    pub stream_idle_timeout_secs: u64,
}

/// Tunables for the live lyric feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamingConfig {
    /// Delay between two emitted characters
    #[serde(default = "default_pacing_interval_ms")]
    pub pacing_interval_ms: u64,

    /// Characters after a `{` searched for a payload field name
    #[serde(default = "default_json_lookahead_chars")]
    pub json_lookahead_chars: usize,

    /// Lower bound of the unemitted tail kept while no boundary is known
    #[serde(default = "default_min_tail_reserve_chars")]
    pub min_tail_reserve_chars: usize,

    /// Buffered live events per session before the producer waits
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

fn default_port() -> u16 {
    5780
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_model() -> String {
    "gpt-5-mini".to_string()
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_max_completion_tokens() -> u32 {
    4000
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_stream_idle_timeout_secs() -> u64 {
    120
}

fn default_pacing_interval_ms() -> u64 {
    20
}

fn default_json_lookahead_chars() -> usize {
    300
}

fn default_min_tail_reserve_chars() -> usize {
    64
}

fn default_channel_capacity() -> usize {
    64
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            root_folder: None,
            port: default_port(),
            logging: LoggingConfig::default(),
            openai: OpenAiConfig::default(),
            streaming: StreamingConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            base_url: default_base_url(),
            max_completion_tokens: default_max_completion_tokens(),
            connect_timeout_secs: default_connect_timeout_secs(),
            stream_idle_timeout_secs: default_stream_idle_timeout_secs(),
        }
    }
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            pacing_interval_ms: default_pacing_interval_ms(),
            json_lookahead_chars: default_json_lookahead_chars(),
            min_tail_reserve_chars: default_min_tail_reserve_chars(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

impl TomlConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
    }

    /// Read and parse a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    /// Load configuration, degrading to defaults when the file is missing or invalid
    ///
    /// With no explicit path the platform default location is tried.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let path = match path.map(Path::to_path_buf).or_else(default_config_path) {
            Some(path) => path,
            None => {
                warn!("Could not determine config directory, using built-in defaults");
                return Self::default();
            }
        };

        if !path.exists() {
            info!("No config file at {}, using built-in defaults", path.display());
            return Self::default();
        }

        match Self::load(&path) {
            Ok(config) => {
                info!("Loaded configuration from {}", path.display());
                config
            }
            Err(e) => {
                warn!("{} - using built-in defaults", e);
                Self::default()
            }
        }
    }
}

/// Platform configuration file location (`<config_dir>/lyricgen/config.toml`)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR_NAME).join("config.toml"))
}

/// OS-dependent default root folder
pub fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join(APP_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from("./lyricgen_data"))
}

/// Resolve the root folder: CLI argument, then environment, then TOML, then default
pub fn resolve_root_folder(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    config: &TomlConfig,
) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &config.root_folder {
        return path.clone();
    }

    default_root_folder()
}

/// Create the root folder if it does not exist yet and return the database path
pub fn prepare_root_folder(root_folder: &Path) -> Result<PathBuf> {
    if !root_folder.exists() {
        std::fs::create_dir_all(root_folder)?;
        info!("Created root folder {}", root_folder.display());
    }
    Ok(root_folder.join(DATABASE_FILE_NAME))
}
