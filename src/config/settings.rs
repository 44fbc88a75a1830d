use crate::utils::error::Result;
use crate::utils::validation::{
    validate_non_empty_string, validate_path, validate_positive_number, validate_range,
    validate_socket_addr, Validate,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

pub const DEFAULT_BIND: &str = "0.0.0.0:5000";
pub const DEFAULT_USER_AGENT: &str = concat!("scrape-rss/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum RunMode {
    /// Supervised workers with recycling and request timeouts
    #[default]
    Managed,
    /// A single directly served process
    Bare,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum RendererKind {
    /// Plain HTTP fetch, no script execution
    #[default]
    Http,
    /// Headless Chromium dumping the DOM after scripts ran
    Chrome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub server: ServerSettings,
    pub workers: WorkerSettings,
    pub scrape: ScrapeSettings,
    pub cache: CacheSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerSettings {
    pub bind: String,
    pub mode: RunMode,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            mode: RunMode::Managed,
        }
    }
}

impl ServerSettings {
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        validate_socket_addr("server.bind", &self.bind)
    }
}

/// Worker lifecycle knobs for managed mode. Zero disables `timeout_secs` and `max_requests`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorkerSettings {
    pub workers: usize,
    pub threads: usize,
    pub timeout_secs: u64,
    pub max_requests: u64,
    pub max_requests_jitter: u64,
    pub graceful_timeout_secs: u64,
    pub max_restarts: u32,
    pub restart_window_secs: u64,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            workers: 1,
            threads: 2,
            timeout_secs: 120,
            max_requests: 200,
            max_requests_jitter: 20,
            graceful_timeout_secs: 30,
            max_restarts: 10,
            restart_window_secs: 60,
        }
    }
}

impl WorkerSettings {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }

    pub fn graceful_timeout(&self) -> Duration {
        Duration::from_secs(self.graceful_timeout_secs)
    }

    pub fn restart_window(&self) -> Duration {
        Duration::from_secs(self.restart_window_secs)
    }

    pub fn recycling_enabled(&self) -> bool {
        self.max_requests > 0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScrapeSettings {
    pub renderer: RendererKind,
    pub chrome_path: String,
    pub navigation_timeout_secs: u64,
    pub settle_delay_ms: u64,
    pub max_items: usize,
    pub user_agent: String,
}

impl Default for ScrapeSettings {
    fn default() -> Self {
        Self {
            renderer: RendererKind::Http,
            chrome_path: "chromium".to_string(),
            navigation_timeout_secs: 60,
            settle_delay_ms: 5000,
            max_items: 20,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl ScrapeSettings {
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheSettings {
    pub ttl_secs: u64,
    pub max_entries: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            ttl_secs: 600,
            max_entries: 256,
        }
    }
}

impl CacheSettings {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingSettings {
    pub format: LogFormat,
    pub verbose: bool,
    pub monitor: bool,
}

impl Validate for Settings {
    fn validate(&self) -> Result<()> {
        self.server.socket_addr()?;

        validate_positive_number("workers.workers", self.workers.workers, 1)?;
        validate_positive_number("workers.threads", self.workers.threads, 1)?;
        if self.workers.max_requests_jitter > 0 && !self.workers.recycling_enabled() {
            tracing::debug!("max_requests is 0, ignoring max_requests_jitter");
        }

        validate_range("scrape.max_items", self.scrape.max_items, 1, 100)?;
        validate_positive_number(
            "scrape.navigation_timeout_secs",
            self.scrape.navigation_timeout_secs as usize,
            1,
        )?;
        validate_non_empty_string("scrape.user_agent", &self.scrape.user_agent)?;
        if self.scrape.renderer == RendererKind::Chrome {
            validate_path("scrape.chrome_path", &self.scrape.chrome_path)?;
        }

        validate_positive_number("cache.max_entries", self.cache.max_entries, 1)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_production_image() {
        let settings = Settings::default();
        assert_eq!(settings.server.bind, "0.0.0.0:5000");
        assert_eq!(settings.server.mode, RunMode::Managed);
        assert_eq!(settings.workers.workers, 1);
        assert_eq!(settings.workers.threads, 2);
        assert_eq!(settings.workers.timeout(), Some(Duration::from_secs(120)));
        assert_eq!(settings.workers.max_requests, 200);
        assert_eq!(settings.workers.max_requests_jitter, 20);
        assert_eq!(settings.scrape.max_items, 20);
        assert_eq!(settings.cache.ttl(), Duration::from_secs(600));
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_zero_timeout_disables_enforcement() {
        let workers = WorkerSettings {
            timeout_secs: 0,
            ..WorkerSettings::default()
        };
        assert_eq!(workers.timeout(), None);
    }

    #[test]
    fn test_zero_max_requests_ignores_jitter() {
        let mut settings = Settings::default();
        settings.workers.max_requests = 0;
        assert_eq!(settings.workers.max_requests_jitter, 20);
        assert!(settings.validate().is_ok());
        assert!(!settings.workers.recycling_enabled());
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut settings = Settings::default();
        settings.workers.threads = 0;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.server.bind = "not-an-address".to_string();
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.scrape.renderer = RendererKind::Chrome;
        settings.scrape.chrome_path = String::new();
        assert!(settings.validate().is_err());
    }
}
