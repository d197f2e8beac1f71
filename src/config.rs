//! Configuration and settings management
//!
//! Loads settings from optional config files and environment variables.
//! Credentials have no defaults: the bot refuses to start without them.

use config::{Config, ConfigError, Environment, File};
use lazy_regex::regex_is_match;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Default listen port for webhook mode
pub const DEFAULT_PORT: u16 = 5000;
/// Default TinyURL `create` endpoint
pub const DEFAULT_TINYURL_API_URL: &str = "https://api.tinyurl.com/create";
/// Default short link domain
pub const DEFAULT_TINYURL_DOMAIN: &str = "tiny.one";
/// Default timeout for the shortening request, in seconds
pub const DEFAULT_SHORTENER_TIMEOUT_SECS: u64 = 10;
/// Default lifetime of a pending URL, in seconds
pub const DEFAULT_SESSION_TTL_SECS: u64 = 600;
/// Default number of users with a pending URL kept at once
pub const DEFAULT_SESSION_MAX_CAPACITY: u64 = 10_000;
/// Default QR module size in pixels
pub const DEFAULT_QR_MODULE_PX: u32 = 8;
/// Longest accepted pending URL lifetime (one year), in seconds
pub const MAX_SESSION_TTL_SECS: u64 = 31_536_000;

/// Application settings loaded from environment variables
#[derive(Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Telegram Bot API token
    pub telegram_token: String,
    /// TinyURL API token
    pub tinyurl_token: String,

    /// Public URL Telegram should deliver updates to. Polling is used when unset.
    pub webhook_url: Option<String>,
    /// Port the webhook listener binds on all interfaces
    #[serde(default = "default_port")]
    pub port: u16,
    /// Shared secret Telegram sends in `X-Telegram-Bot-Api-Secret-Token`
    pub webhook_secret: Option<String>,

    /// TinyURL `create` endpoint
    #[serde(default = "default_tinyurl_api_url")]
    pub tinyurl_api_url: String,
    /// Domain requested for short links
    #[serde(default = "default_tinyurl_domain")]
    pub tinyurl_domain: String,
    /// Timeout for the shortening request, in seconds
    #[serde(default = "default_shortener_timeout_secs")]
    pub shortener_timeout_secs: u64,

    /// Lifetime of a pending URL, in seconds
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,
    /// Maximum number of users with a pending URL
    #[serde(default = "default_session_max_capacity")]
    pub session_max_capacity: u64,

    /// QR module size in pixels
    #[serde(default = "default_qr_module_px")]
    pub qr_module_px: u32,
}

const fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_tinyurl_api_url() -> String {
    DEFAULT_TINYURL_API_URL.to_string()
}

fn default_tinyurl_domain() -> String {
    DEFAULT_TINYURL_DOMAIN.to_string()
}

const fn default_shortener_timeout_secs() -> u64 {
    DEFAULT_SHORTENER_TIMEOUT_SECS
}

const fn default_session_ttl_secs() -> u64 {
    DEFAULT_SESSION_TTL_SECS
}

const fn default_session_max_capacity() -> u64 {
    DEFAULT_SESSION_MAX_CAPACITY
}

const fn default_qr_module_px() -> u32 {
    DEFAULT_QR_MODULE_PX
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("telegram_token", &"[MASKED]")
            .field("tinyurl_token", &"[MASKED]")
            .field("webhook_url", &self.webhook_url)
            .field("port", &self.port)
            .field(
                "webhook_secret",
                &self.webhook_secret.as_ref().map(|_| "[MASKED]"),
            )
            .field("tinyurl_api_url", &self.tinyurl_api_url)
            .field("tinyurl_domain", &self.tinyurl_domain)
            .field("shortener_timeout_secs", &self.shortener_timeout_secs)
            .field("session_ttl_secs", &self.session_ttl_secs)
            .field("session_max_capacity", &self.session_max_capacity)
            .field("qr_module_px", &self.qr_module_px)
            .finish()
    }
}

/// Builds the layered configuration source.
///
/// # Errors
///
/// Returns a `ConfigError` if a present config file cannot be parsed.
pub fn build_config() -> Result<Config, ConfigError> {
    let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

    Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(File::with_name(&format!("config/{run_mode}")).required(false))
        // Not checked into git
        .add_source(File::with_name("config/local").required(false))
        // Eg.. `APP__PORT=8443 ./target/app` would set the `port` key
        .add_source(Environment::with_prefix("APP").separator("__"))
        // UPPER_SNAKE_CASE variables map to snake_case keys; empty ones count as unset
        .add_source(Environment::default().ignore_empty(true).try_parsing(true))
        .build()
}

impl Settings {
    /// Create new settings by loading from environment and files
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use linkqr_bot::config::Settings;
    ///
    /// let settings = Settings::new().expect("Failed to load configuration");
    /// ```
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if loading fails or a value is invalid.
    pub fn new() -> Result<Self, ConfigError> {
        Self::from_config(build_config()?)
    }

    /// Deserializes and validates settings from an already built source.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if a required key is missing or a value is invalid.
    pub fn from_config(source: Config) -> Result<Self, ConfigError> {
        let settings: Self = source.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Checks values that deserialization alone cannot catch.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Message` describing the first invalid value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.telegram_token.trim().is_empty() {
            return Err(ConfigError::Message("TELEGRAM_TOKEN must not be empty".into()));
        }
        if self.tinyurl_token.trim().is_empty() {
            return Err(ConfigError::Message("TINYURL_TOKEN must not be empty".into()));
        }
        if let Some(url) = &self.webhook_url {
            Url::parse(url)
                .map_err(|e| ConfigError::Message(format!("WEBHOOK_URL is invalid: {e}")))?;
        }
        if let Some(secret) = &self.webhook_secret {
            // Telegram accepts 1-256 characters from this set
            if !regex_is_match!(r"^[A-Za-z0-9_-]{1,256}$", secret) {
                return Err(ConfigError::Message(
                    "WEBHOOK_SECRET must be 1-256 characters of A-Z, a-z, 0-9, _ or -".into(),
                ));
            }
        }
        Url::parse(&self.tinyurl_api_url)
            .map_err(|e| ConfigError::Message(format!("TINYURL_API_URL is invalid: {e}")))?;
        if self.shortener_timeout_secs == 0 {
            return Err(ConfigError::Message(
                "SHORTENER_TIMEOUT_SECS must be positive".into(),
            ));
        }
        if self.session_ttl_secs == 0 || self.session_max_capacity == 0 {
            return Err(ConfigError::Message(
                "SESSION_TTL_SECS and SESSION_MAX_CAPACITY must be positive".into(),
            ));
        }
        // The session cache refuses to build with a lifetime this long
        if self.session_ttl_secs > MAX_SESSION_TTL_SECS {
            return Err(ConfigError::Message(format!(
                "SESSION_TTL_SECS must be at most {MAX_SESSION_TTL_SECS}"
            )));
        }
        if self.qr_module_px == 0 {
            return Err(ConfigError::Message("QR_MODULE_PX must be positive".into()));
        }
        Ok(())
    }

    /// Parsed webhook URL, if webhook mode is configured.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured URL does not parse.
    pub fn webhook(&self) -> Result<Option<Url>, url::ParseError> {
        self.webhook_url.as_deref().map(Url::parse).transpose()
    }

    /// Timeout applied to the shortening request.
    #[must_use]
    pub const fn shortener_timeout(&self) -> Duration {
        Duration::from_secs(self.shortener_timeout_secs)
    }
}
