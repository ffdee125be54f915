//! # Terminal Configuration
//!
//! Where the backend lives, what the receipt header says, and how the
//! receipt printer is driven.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     JOKAMA_API_URL=http://192.168.1.20:5000/api                        │
//! │     JOKAMA_PRINT_COMMAND="lp -d thermal"                               │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/pos/terminal.toml (Linux)                                │
//! │     ~/Library/Application Support/com.jokama.pos/terminal.toml (macOS) │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     localhost backend, JOKAMA shop header, 500ms / 1000ms print delays │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # terminal.toml
//! [terminal]
//! id = "550e8400-e29b-41d4-a716-446655440000"
//! name = "Counter 1"
//!
//! [api]
//! base_url = "http://localhost:5000/api"
//! request_timeout_secs = 30
//! connect_timeout_secs = 10
//!
//! [shop]
//! name = "JOKAMA Auto Services & SPARES"
//! address = "Industrial Area, Naivasha"
//! phone = "Tel: +254 700 000 000"
//! footer = ["THANK YOU FOR SHOPPING WITH US!", "Goods once sold are not returnable."]
//!
//! [print]
//! settle_delay_ms = 500
//! teardown_delay_ms = 1000
//! utc_offset_minutes = 180
//! spool_dir = "/var/spool/jokama"
//! format = "html"            # or "text" for plain 42-column receipts
//! command = "lp -d thermal"
//! ```

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

use jokama_client::{ClientSettings, DEFAULT_BASE_URL};
use jokama_core::receipt::offset_from_minutes;
use jokama_core::ShopIdentity;

use crate::error::{TerminalError, TerminalResult};

/// File name inside the platform config directory.
pub const CONFIG_FILE_NAME: &str = "terminal.toml";

/// Minutes in a day; UTC offsets must stay strictly inside this range.
const MINUTES_PER_DAY: i32 = 24 * 60;

// =============================================================================
// Terminal Identity
// =============================================================================

/// Identity of this counter terminal (shows up in logs).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerminalSection {
    /// Auto-generated on first run if not provided.
    #[serde(default = "default_terminal_id")]
    pub id: String,

    #[serde(default = "default_terminal_name")]
    pub name: String,
}

fn default_terminal_id() -> String {
    Uuid::new_v4().to_string()
}

fn default_terminal_name() -> String {
    "Counter 1".to_string()
}

impl Default for TerminalSection {
    fn default() -> Self {
        TerminalSection {
            id: default_terminal_id(),
            name: default_terminal_name(),
        }
    }
}

// =============================================================================
// Sales API Settings
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Whole-request timeout (seconds).
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    10
}

impl Default for ApiSettings {
    fn default() -> Self {
        ApiSettings {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

// =============================================================================
// Shop Settings
// =============================================================================

/// Receipt header and footer. Missing fields fall back to the JOKAMA shop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShopSettings {
    #[serde(default = "default_shop_name")]
    pub name: String,

    #[serde(default = "default_shop_address")]
    pub address: String,

    #[serde(default = "default_shop_phone")]
    pub phone: String,

    #[serde(default = "default_footer")]
    pub footer: Vec<String>,
}

fn default_shop_name() -> String {
    ShopIdentity::default().name
}

fn default_shop_address() -> String {
    ShopIdentity::default().address
}

fn default_shop_phone() -> String {
    ShopIdentity::default().phone
}

fn default_footer() -> Vec<String> {
    ShopIdentity::default().footer
}

impl Default for ShopSettings {
    fn default() -> Self {
        let shop = ShopIdentity::default();
        ShopSettings {
            name: shop.name,
            address: shop.address,
            phone: shop.phone,
            footer: shop.footer,
        }
    }
}

// =============================================================================
// Print Settings
// =============================================================================

/// File format receipts are spooled in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpoolFormat {
    /// 80 mm HTML page.
    #[default]
    Html,
    /// 42-column plain text, for raw thermal printers.
    Text,
}

impl SpoolFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            SpoolFormat::Html => "html",
            SpoolFormat::Text => "txt",
        }
    }
}

/// Receipt printing behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrintSettings {
    /// Wait between mounting the receipt and invoking print (milliseconds).
    #[serde(default = "default_settle_delay")]
    pub settle_delay_ms: u64,

    /// Wait between invoking print and tearing the surface down
    /// (milliseconds).
    #[serde(default = "default_teardown_delay")]
    pub teardown_delay_ms: u64,

    /// Shop local time for receipt timestamps, minutes east of UTC.
    /// Default: 180 (East Africa Time).
    #[serde(default = "default_utc_offset")]
    pub utc_offset_minutes: i32,

    /// Directory receipt files are spooled to. Default: system temp dir.
    #[serde(default)]
    pub spool_dir: Option<PathBuf>,

    /// Format of the spooled file. Default: HTML.
    #[serde(default)]
    pub format: SpoolFormat,

    /// Print command run with the spooled file as last argument, e.g.
    /// `lp -d thermal`. Unset means spool only.
    #[serde(default)]
    pub command: Option<String>,
}

fn default_settle_delay() -> u64 {
    500
}

fn default_teardown_delay() -> u64 {
    1000
}

fn default_utc_offset() -> i32 {
    180
}

impl Default for PrintSettings {
    fn default() -> Self {
        PrintSettings {
            settle_delay_ms: default_settle_delay(),
            teardown_delay_ms: default_teardown_delay(),
            utc_offset_minutes: default_utc_offset(),
            spool_dir: None,
            format: SpoolFormat::Html,
            command: None,
        }
    }
}

impl PrintSettings {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn teardown_delay(&self) -> Duration {
        Duration::from_millis(self.teardown_delay_ms)
    }

    pub fn utc_offset(&self) -> FixedOffset {
        offset_from_minutes(self.utc_offset_minutes)
    }

    /// Configured spool directory, or `<tmp>/jokama-receipts`.
    pub fn spool_dir_or_default(&self) -> PathBuf {
        self.spool_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("jokama-receipts"))
    }
}

// =============================================================================
// Main Terminal Configuration
// =============================================================================

/// Complete terminal configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TerminalConfig {
    #[serde(default)]
    pub terminal: TerminalSection,

    #[serde(default)]
    pub api: ApiSettings,

    #[serde(default)]
    pub shop: ShopSettings,

    #[serde(default)]
    pub print: PrintSettings,
}

impl TerminalConfig {
    /// Creates a new config with defaults and a generated terminal id.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (terminal.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> TerminalResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading terminal config from file");
                config = Self::read_file(&path)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load terminal config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> TerminalResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| TerminalError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| TerminalError::ConfigSaveFailed(e.to_string()))?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents).map_err(|e| TerminalError::ConfigSaveFailed(e.to_string()))?;

        info!(?path, "Terminal config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> TerminalResult<()> {
        if self.terminal.id.trim().is_empty() {
            return Err(TerminalError::InvalidConfig("terminal.id must not be empty".into()));
        }

        let url = Url::parse(self.api.base_url.trim()).map_err(|e| {
            TerminalError::InvalidConfig(format!("api.base_url '{}': {}", self.api.base_url, e))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(TerminalError::InvalidConfig(format!(
                "api.base_url must start with http:// or https://, got: {}",
                self.api.base_url
            )));
        }

        if self.api.request_timeout_secs == 0 || self.api.connect_timeout_secs == 0 {
            return Err(TerminalError::InvalidConfig(
                "api timeouts must be greater than 0".into(),
            ));
        }

        if self.print.utc_offset_minutes.abs() >= MINUTES_PER_DAY {
            return Err(TerminalError::InvalidConfig(format!(
                "print.utc_offset_minutes out of range: {}",
                self.print.utc_offset_minutes
            )));
        }

        if let Some(command) = &self.print.command {
            if command.trim().is_empty() {
                return Err(TerminalError::InvalidConfig(
                    "print.command must not be blank".into(),
                ));
            }
        }

        Ok(())
    }

    /// Applies `JOKAMA_*` environment variable overrides.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("JOKAMA_API_URL") {
            debug!(url = %url, "Overriding API URL from environment");
            self.api.base_url = url;
        }

        if let Some(id) = lookup("JOKAMA_TERMINAL_ID") {
            debug!(terminal_id = %id, "Overriding terminal ID from environment");
            self.terminal.id = id;
        }

        if let Some(name) = lookup("JOKAMA_SHOP_NAME") {
            self.shop.name = name;
        }

        if let Some(command) = lookup("JOKAMA_PRINT_COMMAND") {
            debug!(command = %command, "Overriding print command from environment");
            self.print.command = Some(command);
        }

        if let Some(dir) = lookup("JOKAMA_SPOOL_DIR") {
            self.print.spool_dir = Some(PathBuf::from(dir));
        }
    }

    fn read_file(path: &Path) -> TerminalResult<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| TerminalError::ConfigLoadFailed(format!("{}: {}", path.display(), e)))?;
        Ok(toml::from_str(&contents)?)
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "jokama", "pos")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// Settings for the Sales API client.
    pub fn client_settings(&self) -> ClientSettings {
        ClientSettings {
            base_url: self.api.base_url.clone(),
            request_timeout: Duration::from_secs(self.api.request_timeout_secs),
            connect_timeout: Duration::from_secs(self.api.connect_timeout_secs),
        }
    }

    /// Receipt header and footer.
    pub fn shop_identity(&self) -> ShopIdentity {
        ShopIdentity {
            name: self.shop.name.clone(),
            address: self.shop.address.clone(),
            phone: self.shop.phone.clone(),
            footer: self.shop.footer.clone(),
        }
    }

    pub fn terminal_id(&self) -> &str {
        &self.terminal.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = TerminalConfig::default();
        assert!(!config.terminal.id.is_empty());
        assert_eq!(config.api.base_url, "http://localhost:5000/api");
        assert_eq!(config.print.settle_delay(), Duration::from_millis(500));
        assert_eq!(config.print.teardown_delay(), Duration::from_millis(1000));
        assert_eq!(config.print.utc_offset().local_minus_utc(), 3 * 3600);
        assert_eq!(config.shop.name, "JOKAMA Auto Services & SPARES");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = TerminalConfig::default();

        config.api.base_url = "ws://localhost:5000".to_string();
        assert!(config.validate().is_err());

        config.api.base_url = "not a url".to_string();
        assert!(config.validate().is_err());

        config.api.base_url = "https://pos.jokama.co.ke/api".to_string();
        assert!(config.validate().is_ok());

        config.api.request_timeout_secs = 0;
        assert!(config.validate().is_err());
        config.api.request_timeout_secs = 30;

        config.print.utc_offset_minutes = 24 * 60;
        assert!(config.validate().is_err());
        config.print.utc_offset_minutes = -300;
        assert!(config.validate().is_ok());

        config.print.command = Some("  ".to_string());
        assert!(config.validate().is_err());

        config.print.command = None;
        config.terminal.id = String::new();
        assert!(config.validate().unwrap_err().is_config_error());
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            ("JOKAMA_API_URL", "http://10.0.0.5:5000/api"),
            ("JOKAMA_TERMINAL_ID", "counter-2"),
            ("JOKAMA_PRINT_COMMAND", "lp -d thermal"),
            ("JOKAMA_SPOOL_DIR", "/var/spool/jokama"),
        ]
        .into_iter()
        .collect();

        let mut config = TerminalConfig::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.api.base_url, "http://10.0.0.5:5000/api");
        assert_eq!(config.terminal_id(), "counter-2");
        assert_eq!(config.print.command.as_deref(), Some("lp -d thermal"));
        assert_eq!(
            config.print.spool_dir_or_default(),
            PathBuf::from("/var/spool/jokama")
        );
        assert_eq!(config.shop.name, "JOKAMA Auto Services & SPARES");
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: TerminalConfig = toml::from_str(
            r#"
            [api]
            base_url = "http://192.168.1.20:5000/api"

            [print]
            settle_delay_ms = 250
            "#,
        )
        .unwrap();

        assert_eq!(config.api.base_url, "http://192.168.1.20:5000/api");
        assert_eq!(config.api.request_timeout_secs, 30);
        assert_eq!(config.print.settle_delay_ms, 250);
        assert_eq!(config.print.teardown_delay_ms, 1000);
        assert_eq!(config.print.format, SpoolFormat::Html);
        assert_eq!(config.shop.footer.len(), 3);
        assert!(!config.terminal.id.is_empty());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE_NAME);

        let mut config = TerminalConfig::default();
        config.terminal.name = "Counter 3".to_string();
        config.print.command = Some("lp".to_string());
        config.print.format = SpoolFormat::Text;
        config.save(Some(path.clone())).unwrap();

        let loaded = TerminalConfig::read_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_malformed_file_is_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[api\nbase_url = ").unwrap();

        let err = TerminalConfig::read_file(&path).unwrap_err();
        assert!(matches!(err, TerminalError::ConfigLoadFailed(_)));
    }

    #[test]
    fn test_client_settings_and_shop_identity() {
        let config = TerminalConfig::default();
        let settings = config.client_settings();
        assert_eq!(settings.request_timeout, Duration::from_secs(30));
        assert_eq!(settings.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.shop_identity(), ShopIdentity::default());
    }
}
