use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub endpoint: EndpointConfig,
    pub behavior: BehaviorConfig,
    pub display: DisplayConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    /// Base URL of the search service; `/api/search` is appended
    pub base_url: String,

    /// Abandon a search request after this many milliseconds (0 disables)
    pub request_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorConfig {
    /// Submit the query while typing instead of only on Enter
    pub search_as_you_type: bool,

    /// Quiet period before a typed query is submitted
    pub debounce_ms: u64,

    /// Query submitted when the app starts
    pub initial_query: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Placeholder rows shown while a request is loading
    pub skeleton_rows: usize,

    /// Show the thumbnail column and load thumbnails for visible rows
    pub show_thumbnails: bool,

    /// Use Unicode glyphs for thumbnail and skeleton cells
    pub use_glyphs: bool,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:3030".to_string(),
            request_timeout_ms: 15_000,
        }
    }
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            search_as_you_type: false,
            debounce_ms: 300,
            initial_query: String::new(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            skeleton_rows: 10,
            show_thumbnails: true,
            use_glyphs: true,
        }
    }
}

impl EndpointConfig {
    pub fn request_timeout(&self) -> Option<Duration> {
        match self.request_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }
}

impl Config {
    /// Load config from the default location, falling back to defaults
    /// when no file exists
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;
        if !config_path.exists() {
            return Ok(Config::default());
        }
        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Write the commented default config to `path`, creating parent
    /// directories
    pub fn write_default(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(path, Self::create_default_with_comments())
            .with_context(|| format!("Failed to write config file {}", path.display()))?;
        Ok(())
    }

    /// Get the default config file path
    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("track-search").join("config.toml"))
    }

    /// Create a default config file with comments
    pub fn create_default_with_comments() -> String {
        r#"# track-search configuration
# Location: ~/.config/track-search/config.toml (Linux)
#           ~/Library/Application Support/track-search/config.toml (macOS)
#           %APPDATA%\track-search\config.toml (Windows)

[endpoint]
# Search service base URL; requests go to <base_url>/api/search?q=...
base_url = "http://127.0.0.1:3030"

# Give up on a search after this many milliseconds (0 = never)
request_timeout_ms = 15000

[behavior]
# Search while typing instead of waiting for Enter
search_as_you_type = false

# Milliseconds of quiet typing before a search is sent
debounce_ms = 300

# Query sent at startup (empty lists everything the service returns)
initial_query = ""

[display]
# Placeholder rows shown while results are loading
skeleton_rows = 10

# Show the thumbnail column; thumbnails load only for visible rows
show_thumbnails = true

# Set to false for ASCII-only placeholders
use_glyphs = true
"#
        .to_string()
    }
}
