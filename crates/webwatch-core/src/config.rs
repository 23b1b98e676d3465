use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_EXECUTOR_ENDPOINT: &str = "http://127.0.0.1:3000";
pub const DEFAULT_EXECUTOR_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1_000;
pub const DEFAULT_SMTP_PORT: u16 = 587;

/// Service settings (webwatch.toml + WEBWATCH_* env overrides).
///
/// The jobs themselves live in a separate jobs document, see [`crate::jobs`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebwatchConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub executor: ExecutorConfig,
    #[serde(default)]
    pub mail: MailConfig,
    #[serde(default)]
    pub log: LogNotifierConfig,
    /// Debug-level, human-readable logs instead of JSON lines.
    #[serde(default)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Remote execution service the job scripts are sent to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    #[serde(default = "default_executor_endpoint")]
    pub endpoint: String,
    /// Sent as a bearer token on every request.
    #[serde(default)]
    pub api_token: Option<String>,
    /// Upper bound for one synchronous execution, polling included.
    #[serde(default = "default_executor_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            endpoint: default_executor_endpoint(),
            api_token: None,
            timeout_secs: DEFAULT_EXECUTOR_TIMEOUT_SECS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    /// Register the `mail` notifier. Jobs referencing `mail` fail validation otherwise.
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default)]
    pub smtp_user: Option<String>,
    #[serde(default)]
    pub smtp_pass: Option<String>,
    /// `From:` address of outgoing notification mails.
    #[serde(default)]
    pub sender: String,
    #[serde(default)]
    pub tls: SmtpTls,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            smtp_host: String::new(),
            smtp_port: DEFAULT_SMTP_PORT,
            smtp_user: None,
            smtp_pass: None,
            sender: String::new(),
            tls: SmtpTls::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SmtpTls {
    /// Plain connection upgraded with STARTTLS.
    #[default]
    Starttls,
    /// Implicit TLS (usually port 465).
    Tls,
    /// No encryption. Local relays only.
    None,
}

/// The `log` notifier writes diffs to the tracing output instead of delivering them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogNotifierConfig {
    #[serde(default)]
    pub enabled: bool,
}

fn default_db_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.webwatch/webwatch.db", home)
}
fn default_executor_endpoint() -> String {
    DEFAULT_EXECUTOR_ENDPOINT.to_string()
}
fn default_executor_timeout() -> u64 {
    DEFAULT_EXECUTOR_TIMEOUT_SECS
}
fn default_poll_interval() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}
fn default_smtp_port() -> u16 {
    DEFAULT_SMTP_PORT
}

impl WebwatchConfig {
    /// Load settings from a TOML file with WEBWATCH_* env var overrides.
    ///
    /// Nested keys use a double underscore: `WEBWATCH_MAIL__SMTP_HOST`.
    /// A missing file is not an error; defaults and env vars still apply.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        let config: WebwatchConfig = Figment::from(Serialized::defaults(WebwatchConfig::default()))
            .merge(Toml::file(&path))
            .merge(Env::prefixed("WEBWATCH_").split("__"))
            .extract()
            .map_err(|e| crate::error::CoreError::Config(e.to_string()))?;

        Ok(config)
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.webwatch/webwatch.toml", home)
}
