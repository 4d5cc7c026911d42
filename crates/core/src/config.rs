use std::env;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

fn env_u16(key: &str, default: u16) -> u16 {
    env_opt(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    env_opt(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub smtp: SmtpConfig,
    pub scheduler: SchedulerConfig,
    pub feed: FeedConfig,
    pub trigger: TriggerConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    pub fn from_env() -> Self {
        Self {
            server: ServerConfig::from_env(),
            smtp: SmtpConfig::from_env(),
            scheduler: SchedulerConfig::from_env(),
            feed: FeedConfig::from_env(),
            trigger: TriggerConfig::from_env(),
        }
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded:");
        tracing::info!("  server:     {}:{}", self.server.host, self.server.port);
        tracing::info!(
            "  smtp:       host={}, from={}, configured={}",
            self.smtp.host,
            self.smtp.from,
            self.smtp.is_configured()
        );
        tracing::info!(
            "  scheduler:  subscriptions_dir={}, poll_interval={}s",
            self.scheduler.subscriptions_dir.display(),
            self.scheduler.poll_interval_secs
        );
        tracing::info!("  trigger:    configured={}", self.trigger.is_configured());
    }
}

// ── Server ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    fn from_env() -> Self {
        Self {
            host: env_or("HOST", "0.0.0.0"),
            port: env_u16("PORT", 3001),
        }
    }
}

// ── SMTP delivery ─────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub tls: bool,
    /// Sender address, e.g. `"Nudge <reminders@example.com>"`.
    pub from: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl SmtpConfig {
    fn from_env() -> Self {
        Self {
            host: env_or("SMTP_HOST", "localhost"),
            port: env_u16("SMTP_PORT", 587),
            tls: env_or("SMTP_TLS", "true") == "true",
            from: env_or("SMTP_FROM", "reminders@localhost"),
            username: env_opt("SMTP_USERNAME"),
            password: env_opt("SMTP_PASSWORD"),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.host != "localhost" || self.username.is_some()
    }
}

// ── Scheduler ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Directory scanned for subscription YAML files.
    pub subscriptions_dir: PathBuf,
    /// Seconds between scheduled-run ticks. The due-check lookback window is
    /// derived from this value; the two must move together.
    pub poll_interval_secs: u64,
    /// Whether to watch the subscriptions directory for changes.
    pub hot_reload: bool,
}

impl SchedulerConfig {
    fn from_env() -> Self {
        Self {
            subscriptions_dir: PathBuf::from(env_or("SUBSCRIPTIONS_DIR", "subscriptions")),
            poll_interval_secs: env_u64("POLL_INTERVAL_SECS", 3600),
            hot_reload: env_or("SUBSCRIPTIONS_HOT_RELOAD", "true") == "true",
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

// ── Task feed ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// YAML file mapping user ids to their proposed tasks. Missing file
    /// means an empty feed (send routines skip users with nothing to
    /// report).
    pub tasks_file: PathBuf,
}

impl FeedConfig {
    fn from_env() -> Self {
        Self {
            tasks_file: PathBuf::from(env_or("TASKS_FILE", "tasks.yml")),
        }
    }
}

// ── Manual trigger ────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerConfig {
    /// Shared secret for the manual trigger endpoint. When unset the
    /// endpoint rejects every request.
    pub token: Option<String>,
}

impl TriggerConfig {
    fn from_env() -> Self {
        Self {
            token: env_opt("TRIGGER_TOKEN"),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.token.is_some()
    }
}
