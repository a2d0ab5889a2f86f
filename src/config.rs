use std::path::PathBuf;

use lettre::message::Mailbox;
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub tracing: TracingConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub worker: WorkerConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub recipients: RecipientsConfig,
    #[serde(default)]
    pub templates: TemplatesConfig,
    #[serde(default)]
    pub email: EmailConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EmailConfig {
    /// Log every message instead of delivering it
    #[default]
    Log,
    /// Mock mailer that captures emails for testing
    Mock,
    /// Real SMTP configuration for sending emails
    Smtp {
        host: String,
        port: u16,
        #[serde(deserialize_with = "deserialize_mailbox")]
        sender: Mailbox,
        username: Option<String>,
        password: Option<String>,
        #[serde(default = "default_use_tls")]
        use_tls: bool,
    },
}

impl EmailConfig {
    /// Configured `From` address, if the transport defines one.
    pub const fn sender(&self) -> Option<&Mailbox> {
        match self {
            Self::Smtp { sender, .. } => Some(sender),
            Self::Log | Self::Mock => None,
        }
    }
}

fn deserialize_mailbox<'de, D>(deserializer: D) -> Result<Mailbox, D::Error>
where
    D: Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    s.parse().map_err(serde::de::Error::custom)
}

fn default_use_tls() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TracingConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub url: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            pool_size: default_pool_size(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Seconds to sleep between polls (default: 5)
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,
    /// Jobs left `running` longer than this are failed and retried.
    /// Unset means stale jobs are left alone for an operator to inspect.
    #[serde(default)]
    pub stale_after_seconds: Option<u64>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval_seconds: default_poll_interval(),
            stale_after_seconds: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Delay before the first retry in seconds (default: 30)
    #[serde(default = "default_base_retry_delay")]
    pub base_delay_seconds: u64,
    /// Upper bound for any retry delay in seconds (default: 600)
    #[serde(default = "default_max_retry_delay")]
    pub max_delay_seconds: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            base_delay_seconds: default_base_retry_delay(),
            max_delay_seconds: default_max_retry_delay(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipientsConfig {
    /// JSON file holding an array of recipient records
    #[serde(default = "default_cache_path")]
    pub cache_path: PathBuf,
}

impl Default for RecipientsConfig {
    fn default() -> Self {
        Self {
            cache_path: default_cache_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplatesConfig {
    #[serde(default = "default_templates_directory")]
    pub directory: PathBuf,
}

impl Default for TemplatesConfig {
    fn default() -> Self {
        Self {
            directory: default_templates_directory(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_database_url() -> String {
    "sqlite://herald.db?mode=rwc".to_string()
}

const fn default_pool_size() -> u32 {
    5
}

const fn default_poll_interval() -> u64 {
    5
}

const fn default_base_retry_delay() -> u64 {
    30
}

const fn default_max_retry_delay() -> u64 {
    600 // 10 minutes
}

fn default_cache_path() -> PathBuf {
    PathBuf::from("recipients.json")
}

fn default_templates_directory() -> PathBuf {
    PathBuf::from("templates")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_apply_to_empty_document() {
        let config: Config = serde_json::from_str("{}").unwrap();

        assert_eq!(config.worker.poll_interval_seconds, 5);
        assert_eq!(config.worker.stale_after_seconds, None);
        assert_eq!(config.retry.base_delay_seconds, 30);
        assert_eq!(config.retry.max_delay_seconds, 600);
        assert_eq!(config.database.pool_size, 5);
        assert!(matches!(config.email, EmailConfig::Log));
    }

    #[test]
    fn test_smtp_email_config() {
        let config: EmailConfig = serde_json::from_str(
            r#"{"type": "smtp", "host": "localhost", "port": 2525, "sender": "Herald <noreply@example.com>"}"#,
        )
        .unwrap();

        match config {
            EmailConfig::Smtp {
                host,
                port,
                sender,
                use_tls,
                ..
            } => {
                assert_eq!(host, "localhost");
                assert_eq!(port, 2525);
                assert_eq!(sender.email.to_string(), "noreply@example.com");
                assert!(use_tls);
            }
            other => panic!("unexpected email config: {other:?}"),
        }
    }
}
