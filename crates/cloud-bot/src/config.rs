//! Application configuration loaded from environment variables.
//!
//! Nested keys use `__`, e.g. `WORKER__KIND=storage` or
//! `SLACK__BOT_TOKEN=xoxb-...`.

use anyhow::{Context, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;
use urlencoding::encode;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Which worker this process runs
    pub worker: WorkerConfig,

    /// Message broker connection
    #[serde(default)]
    pub broker: BrokerConfig,

    /// Slack Web API
    pub slack: SlackConfig,

    /// Cloud operations service
    #[serde(default)]
    pub ops: OpsConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub gcloud: GcloudConfig,

    #[serde(default)]
    pub groundtruth: GroundTruthConfig,

    /// Users allowed to run mutating commands
    #[serde(default)]
    pub admins: AdminsConfig,

    #[serde(default)]
    pub log: LogConfig,
}

/// The domains a worker process can serve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerKind {
    Storage,
    Gcloud,
    Gt,
    Help,
}

impl WorkerKind {
    /// Root command name, and prefix of the routing keys this worker consumes.
    pub fn root(&self) -> &'static str {
        match self {
            WorkerKind::Storage => "storage",
            WorkerKind::Gcloud => "gcloud",
            WorkerKind::Gt => "gt",
            WorkerKind::Help => "help",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkerConfig {
    pub kind: WorkerKind,

    /// Overrides the default `<root>.#` binding pattern
    #[serde(default)]
    pub binding_key: Option<String>,
}

impl WorkerConfig {
    pub fn binding_key(&self) -> String {
        self.binding_key
            .clone()
            .unwrap_or_else(|| format!("{}.#", self.kind.root()))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BrokerConfig {
    #[serde(default = "default_broker_host")]
    pub host: String,

    #[serde(default = "default_broker_port")]
    pub port: String,

    #[serde(default = "default_broker_user")]
    pub username: String,

    #[serde(default = "default_broker_password")]
    pub password: SecretString,

    #[serde(default = "default_vhost")]
    pub vhost: String,

    /// Topic exchange shared by every worker
    #[serde(default = "default_exchange")]
    pub exchange: String,
}

impl BrokerConfig {
    /// AMQP connection URI with credentials and vhost percent-encoded.
    pub fn uri(&self) -> String {
        format!(
            "amqp://{}:{}@{}:{}/{}",
            encode(&self.username),
            encode(self.password.expose_secret()),
            self.host,
            self.port,
            encode(&self.vhost)
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SlackConfig {
    #[serde(default = "default_slack_api")]
    pub api_base: String,

    pub bot_token: SecretString,

    #[serde(default = "default_slack_timeout", with = "humantime_serde")]
    pub timeout: Duration,

    /// Messages read for the freshness check
    #[serde(default = "default_history_limit")]
    pub history_limit: String,
}

impl SlackConfig {
    pub fn history_limit(&self) -> u32 {
        self.history_limit.trim().parse().unwrap_or(1).max(1)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpsConfig {
    #[serde(default = "default_ops_url")]
    pub base_url: String,

    #[serde(default)]
    pub api_token: Option<SecretString>,

    /// Long jobs keep the request open until they finish
    #[serde(default = "default_ops_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_true")]
    pub enabled: String,

    /// Thread count used when neither `-n` nor `CV_STORAGE_THREADS` is given
    #[serde(default = "default_threads")]
    pub threads: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GcloudConfig {
    #[serde(default = "default_true")]
    pub enabled: String,

    #[serde(default)]
    pub default_project: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GroundTruthConfig {
    #[serde(default = "default_true")]
    pub enabled: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdminsConfig {
    /// Comma separated user ids
    #[serde(default)]
    pub user_ids: String,
}

impl AdminsConfig {
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.user_ids
            .split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_false")]
    pub json: String,
}

impl LogConfig {
    pub fn json(&self) -> bool {
        flag(&self.json)
    }
}

impl StorageConfig {
    pub fn enabled(&self) -> bool {
        flag(&self.enabled)
    }

    pub fn threads(&self) -> i64 {
        self.threads.trim().parse().unwrap_or(8)
    }
}

impl GcloudConfig {
    pub fn enabled(&self) -> bool {
        flag(&self.enabled)
    }

    pub fn project(&self) -> String {
        self.default_project.clone().unwrap_or_default()
    }
}

impl GroundTruthConfig {
    pub fn enabled(&self) -> bool {
        flag(&self.enabled)
    }
}

// Values stay strings (see `Config::load`), so booleans are parsed here.
fn flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

// Default implementations
impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: default_broker_host(),
            port: default_broker_port(),
            username: default_broker_user(),
            password: default_broker_password(),
            vhost: default_vhost(),
            exchange: default_exchange(),
        }
    }
}

impl Default for OpsConfig {
    fn default() -> Self {
        Self {
            base_url: default_ops_url(),
            api_token: None,
            timeout: default_ops_timeout(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            threads: default_threads(),
        }
    }
}

impl Default for GcloudConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            default_project: None,
        }
    }
}

impl Default for GroundTruthConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: default_false(),
        }
    }
}

// Default value functions
fn default_broker_host() -> String {
    "localhost".into()
}

fn default_broker_port() -> String {
    "5672".into()
}

fn default_broker_user() -> String {
    "guest".into()
}

fn default_broker_password() -> SecretString {
    SecretString::new("guest".into())
}

fn default_vhost() -> String {
    "/".into()
}

fn default_exchange() -> String {
    "cloud_bot".into()
}

fn default_slack_api() -> String {
    "https://slack.com/api".into()
}

fn default_slack_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_history_limit() -> String {
    "1".into()
}

fn default_ops_url() -> String {
    "http://cloud-ops:8080".into()
}

fn default_ops_timeout() -> Duration {
    Duration::from_secs(10 * 60)
}

fn default_threads() -> String {
    "8".into()
}

fn default_log_level() -> String {
    "info".into()
}

fn default_true() -> String {
    "true".into()
}

fn default_false() -> String {
    "false".into()
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();
        Self::from_env(config::Environment::default())
    }

    /// Load from an explicit environment source.
    pub fn from_env(source: config::Environment) -> Result<Self> {
        let config = config::Config::builder()
            // Keep strings as strings; ids and tokens must not be coerced.
            .add_source(source.separator("__").try_parsing(false))
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}
