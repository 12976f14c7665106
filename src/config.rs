//! Configuration loading and validation.
//!
//! Settings come from a TOML file, then environment variables override
//! individual keys so a container can be configured without a mounted file.
//! [`ConfigToml::validate`] turns the loose file shape into the immutable
//! [`KeeperConfig`] that is passed explicitly into every cycle.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default renewal window
pub const DEFAULT_THRESHOLD_DAYS: f64 = 30.0;

/// Default interval between cycles (1 hour)
pub const DEFAULT_LOOP_PERIOD_SECS: u64 = 3600;

/// Handshake targets 10-minute blocks
pub const DEFAULT_SECONDS_PER_BLOCK: f64 = 600.0;

/// Default per-call deadline
pub const DEFAULT_CALL_TIMEOUT_SECS: u64 = 10;

/// At most one retry per backend call
pub const MAX_RETRY_COUNT: u32 = 1;

/// Upper bound on the delay before a retry
pub const MAX_RETRY_DELAY_MS: u64 = 30_000;

/// A secret string that never shows up in `Debug` output or logs
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    /// Wrap a secret
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Access the raw value
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// True if no value is set
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str("\"\"")
        } else {
            f.write_str("\"***\"")
        }
    }
}

/// HTTP endpoint of an hsd API
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiEndpoint {
    /// Base URL, e.g. `http://127.0.0.1:12037`
    pub url: String,
    /// API key (sent as the basic-auth password)
    #[serde(default)]
    pub api_key: Option<Secret>,
}

impl ApiEndpoint {
    fn local(port: u16) -> Self {
        Self {
            url: format!("http://127.0.0.1:{port}"),
            api_key: None,
        }
    }
}

/// Telegram delivery settings
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Bot token from @BotFather
    pub bot_token: Secret,
    /// Chat that receives reports
    pub chat_id: String,
    /// Optional parse mode (`HTML`, `MarkdownV2`)
    #[serde(default)]
    pub parse_mode: Option<String>,
}

/// Which expiry representation is authoritative when the backend reports both
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpiryBasis {
    /// Block height (`stats.renewalPeriodEnd`)
    Height,
    /// Absolute time
    Time,
}

/// TOML-serializable configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConfigToml {
    /// Renew names expiring within this many days
    #[serde(default = "default_threshold_days")]
    pub renewal_threshold_days: f64,
    /// Seconds between cycles in loop mode
    #[serde(default = "default_loop_period")]
    pub loop_period_seconds: u64,
    /// Wallet id on the hsd wallet server
    #[serde(default = "default_wallet_id")]
    pub wallet_id: String,
    /// Wallet passphrase used to sign renewals
    #[serde(default)]
    pub wallet_passphrase: Secret,
    /// Wallet account for balance and receive address
    #[serde(default = "default_wallet_account")]
    pub wallet_account: String,
    /// Estimated block interval
    #[serde(default = "default_seconds_per_block")]
    pub seconds_per_block: f64,
    /// Authoritative expiry representation
    #[serde(default = "default_expiry_basis")]
    pub expiry_basis: ExpiryBasis,
    /// Per-call deadline in seconds
    #[serde(default = "default_call_timeout")]
    pub call_timeout_secs: u64,
    /// Retries for transient renewal failures (0 or 1)
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,
    /// Delay before a retry
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,
    /// Renewals in flight at once (1 = sequential)
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_renewals: usize,
    /// hsd node API
    #[serde(default = "default_node_endpoint")]
    pub node: ApiEndpoint,
    /// hsd wallet API
    #[serde(default = "default_wallet_endpoint")]
    pub wallet: ApiEndpoint,
    /// Telegram delivery (reports are only logged if absent)
    #[serde(default)]
    pub telegram: Option<TelegramConfig>,
}

fn default_threshold_days() -> f64 {
    DEFAULT_THRESHOLD_DAYS
}

fn default_loop_period() -> u64 {
    DEFAULT_LOOP_PERIOD_SECS
}

fn default_wallet_id() -> String {
    "primary".to_string()
}

fn default_wallet_account() -> String {
    "default".to_string()
}

fn default_seconds_per_block() -> f64 {
    DEFAULT_SECONDS_PER_BLOCK
}

fn default_expiry_basis() -> ExpiryBasis {
    ExpiryBasis::Height
}

fn default_call_timeout() -> u64 {
    DEFAULT_CALL_TIMEOUT_SECS
}

fn default_retry_count() -> u32 {
    MAX_RETRY_COUNT
}

fn default_retry_delay() -> u64 {
    2_000
}

fn default_max_concurrent() -> usize {
    1
}

fn default_node_endpoint() -> ApiEndpoint {
    ApiEndpoint::local(12037)
}

fn default_wallet_endpoint() -> ApiEndpoint {
    ApiEndpoint::local(12039)
}

impl Default for ConfigToml {
    fn default() -> Self {
        Self {
            renewal_threshold_days: default_threshold_days(),
            loop_period_seconds: default_loop_period(),
            wallet_id: default_wallet_id(),
            wallet_passphrase: Secret::default(),
            wallet_account: default_wallet_account(),
            seconds_per_block: default_seconds_per_block(),
            expiry_basis: default_expiry_basis(),
            call_timeout_secs: default_call_timeout(),
            retry_count: default_retry_count(),
            retry_delay_ms: default_retry_delay(),
            max_concurrent_renewals: default_max_concurrent(),
            node: default_node_endpoint(),
            wallet: default_wallet_endpoint(),
            telegram: None,
        }
    }
}

impl ConfigToml {
    /// Load from a TOML file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Save to a TOML file
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Default configuration rendered as TOML
    pub fn default_toml() -> Result<String, ConfigError> {
        toml::to_string_pretty(&Self::default()).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Apply overrides from the process environment
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("RENEWAL_THRESHOLD_DAYS") {
            self.renewal_threshold_days = parse_env("RENEWAL_THRESHOLD_DAYS", &v)?;
        }
        if let Some(v) = get("LOOP_PERIOD_SECONDS") {
            self.loop_period_seconds = parse_env("LOOP_PERIOD_SECONDS", &v)?;
        }
        if let Some(v) = get("WALLET_ID") {
            self.wallet_id = v;
        }
        if let Some(v) = get("WALLET_PASSPHRASE") {
            self.wallet_passphrase = Secret::new(v);
        }
        if let Some(v) = get("WALLET_ACCOUNT") {
            self.wallet_account = v;
        }
        if let Some(v) = get("NODE_URL") {
            self.node.url = v;
        }
        if let Some(v) = get("NODE_API_KEY") {
            self.node.api_key = Some(Secret::new(v));
        }
        if let Some(v) = get("WALLET_URL") {
            self.wallet.url = v;
        }
        if let Some(v) = get("WALLET_API_KEY") {
            self.wallet.api_key = Some(Secret::new(v));
        }

        match (get("TELEGRAM_BOT_TOKEN"), get("TELEGRAM_CHAT_ID")) {
            (Some(token), Some(chat_id)) => {
                let parse_mode = self.telegram.as_ref().and_then(|t| t.parse_mode.clone());
                self.telegram = Some(TelegramConfig {
                    bot_token: Secret::new(token),
                    chat_id,
                    parse_mode,
                });
            }
            (Some(token), None) => {
                if let Some(t) = self.telegram.as_mut() {
                    t.bot_token = Secret::new(token);
                }
            }
            (None, Some(chat_id)) => {
                if let Some(t) = self.telegram.as_mut() {
                    t.chat_id = chat_id;
                }
            }
            (None, None) => {}
        }

        Ok(())
    }

    /// Check every field and build the runtime config
    pub fn validate(self) -> Result<KeeperConfig, ConfigError> {
        if !self.renewal_threshold_days.is_finite() || self.renewal_threshold_days < 0.0 {
            return Err(ConfigError::invalid(
                "renewal_threshold_days",
                "must be a non-negative number",
            ));
        }
        if !self.seconds_per_block.is_finite() || self.seconds_per_block <= 0.0 {
            return Err(ConfigError::invalid("seconds_per_block", "must be positive"));
        }
        if self.loop_period_seconds == 0 {
            return Err(ConfigError::invalid("loop_period_seconds", "must be non-zero"));
        }
        if self.call_timeout_secs == 0 {
            return Err(ConfigError::invalid("call_timeout_secs", "must be non-zero"));
        }
        if self.retry_count > MAX_RETRY_COUNT {
            return Err(ConfigError::invalid(
                "retry_count",
                format!("at most {MAX_RETRY_COUNT} retry is allowed"),
            ));
        }
        if self.retry_delay_ms > MAX_RETRY_DELAY_MS {
            return Err(ConfigError::invalid(
                "retry_delay_ms",
                format!("must not exceed {MAX_RETRY_DELAY_MS} ms"),
            ));
        }
        if self.max_concurrent_renewals == 0 {
            return Err(ConfigError::invalid("max_concurrent_renewals", "must be at least 1"));
        }
        if self.wallet_id.trim().is_empty() {
            return Err(ConfigError::invalid("wallet_id", "must not be empty"));
        }
        for (field, endpoint) in [("node.url", &self.node), ("wallet.url", &self.wallet)] {
            if !(endpoint.url.starts_with("http://") || endpoint.url.starts_with("https://")) {
                return Err(ConfigError::invalid(field, "must be an http(s) URL"));
            }
        }
        if let Some(t) = &self.telegram {
            if t.bot_token.is_empty() || t.chat_id.trim().is_empty() {
                return Err(ConfigError::invalid(
                    "telegram",
                    "bot_token and chat_id are both required",
                ));
            }
        }

        Ok(KeeperConfig {
            renewal_threshold_days: self.renewal_threshold_days,
            loop_period: Duration::from_secs(self.loop_period_seconds),
            wallet_id: self.wallet_id,
            wallet_passphrase: self.wallet_passphrase,
            wallet_account: self.wallet_account,
            seconds_per_block: self.seconds_per_block,
            expiry_basis: self.expiry_basis,
            executor: ExecutorConfig {
                call_timeout: Duration::from_secs(self.call_timeout_secs),
                retry_count: self.retry_count,
                retry_delay: Duration::from_millis(self.retry_delay_ms),
                max_concurrent: self.max_concurrent_renewals,
            },
            node: self.node,
            wallet: self.wallet,
            telegram: self.telegram,
        })
    }
}

fn parse_env<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::invalid(key, format!("cannot parse {value:?}")))
}

/// Renewal call settings
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExecutorConfig {
    /// Deadline for each backend call
    pub call_timeout: Duration,
    /// Retries for transient failures (0 or 1)
    pub retry_count: u32,
    /// Delay before a retry
    pub retry_delay: Duration,
    /// Renewals in flight at once
    pub max_concurrent: usize,
}

/// Validated configuration, built once at startup
#[derive(Clone, Debug)]
pub struct KeeperConfig {
    /// Renew names expiring within this many days
    pub renewal_threshold_days: f64,
    /// Interval between cycles in loop mode
    pub loop_period: Duration,
    /// Wallet id
    pub wallet_id: String,
    /// Wallet passphrase
    pub wallet_passphrase: Secret,
    /// Wallet account
    pub wallet_account: String,
    /// Estimated block interval
    pub seconds_per_block: f64,
    /// Authoritative expiry representation
    pub expiry_basis: ExpiryBasis,
    /// Renewal call settings
    pub executor: ExecutorConfig,
    /// hsd node API
    pub node: ApiEndpoint,
    /// hsd wallet API
    pub wallet: ApiEndpoint,
    /// Telegram delivery
    pub telegram: Option<TelegramConfig>,
}

/// Default config directory (`~/.namekeeper`)
#[must_use]
pub fn default_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".namekeeper")
}

/// Default config file path
#[must_use]
pub fn default_path() -> PathBuf {
    default_dir().join("config.toml")
}

/// Load the file if it exists (defaults otherwise), then apply the environment
pub fn load(path: Option<&Path>) -> Result<KeeperConfig, ConfigError> {
    let path = path.map_or_else(default_path, Path::to_path_buf);
    let mut toml_config = if path.exists() {
        ConfigToml::load_from_file(&path)?
    } else {
        ConfigToml::default()
    };
    toml_config.apply_env()?;
    toml_config.validate()
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML syntax or type error
    #[error("parse error: {0}")]
    Parse(String),
    /// A value failed validation
    #[error("invalid {field}: {reason}")]
    Invalid {
        /// Offending key
        field: &'static str,
        /// What is wrong with it
        reason: String,
    },
}

impl ConfigError {
    fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}
