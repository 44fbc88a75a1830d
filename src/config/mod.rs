pub mod settings;
pub mod toml_config;

pub use settings::{
    CacheSettings, LogFormat, LoggingSettings, RendererKind, RunMode, ScrapeSettings,
    ServerSettings, Settings, WorkerSettings,
};

#[cfg(feature = "cli")]
use crate::utils::error::Result;
#[cfg(feature = "cli")]
use clap::Parser;
#[cfg(feature = "cli")]
use std::path::PathBuf;

/// Command-line surface. Flags override the TOML file, which overrides the defaults.
#[cfg(feature = "cli")]
#[derive(Debug, Clone, Default, Parser)]
#[command(name = "scrape-rss", version)]
#[command(about = "Generate RSS feeds from JavaScript-rendered websites")]
pub struct CliConfig {
    /// Path to a TOML configuration file
    #[arg(short, long, env = "SCRAPE_RSS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Startup mode
    #[arg(long, value_enum, env = "SCRAPE_RSS_MODE")]
    pub mode: Option<RunMode>,

    /// Address to listen on, HOST:PORT
    #[arg(short, long, env = "SCRAPE_RSS_BIND")]
    pub bind: Option<String>,

    /// Number of workers (managed mode)
    #[arg(long, env = "SCRAPE_RSS_WORKERS")]
    pub workers: Option<usize>,

    /// Concurrent requests per worker (managed mode)
    #[arg(long, env = "SCRAPE_RSS_THREADS")]
    pub threads: Option<usize>,

    /// Seconds before a request is cancelled and its worker replaced, 0 disables
    #[arg(long, env = "SCRAPE_RSS_TIMEOUT")]
    pub timeout: Option<u64>,

    /// Requests a worker serves before it is recycled, 0 disables
    #[arg(long, env = "SCRAPE_RSS_MAX_REQUESTS")]
    pub max_requests: Option<u64>,

    /// Random extra requests added to max-requests per worker
    #[arg(long, env = "SCRAPE_RSS_MAX_REQUESTS_JITTER")]
    pub max_requests_jitter: Option<u64>,

    /// Seconds a retiring worker gets to finish in-flight requests
    #[arg(long, env = "SCRAPE_RSS_GRACEFUL_TIMEOUT")]
    pub graceful_timeout: Option<u64>,

    /// Page renderer
    #[arg(long, value_enum, env = "SCRAPE_RSS_RENDERER")]
    pub renderer: Option<RendererKind>,

    /// Chromium/Chrome binary used by the chrome renderer
    #[arg(long, env = "SCRAPE_RSS_CHROME_PATH")]
    pub chrome_path: Option<String>,

    /// Maximum items per feed
    #[arg(long, env = "SCRAPE_RSS_MAX_ITEMS")]
    pub max_items: Option<usize>,

    /// Seconds a generated feed stays cached
    #[arg(long, env = "SCRAPE_RSS_CACHE_TTL")]
    pub cache_ttl: Option<u64>,

    /// Log output format
    #[arg(long, value_enum, env = "SCRAPE_RSS_LOG_FORMAT")]
    pub log_format: Option<LogFormat>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Log process memory as workers start and retire
    #[arg(long)]
    pub monitor: bool,
}

#[cfg(feature = "cli")]
impl CliConfig {
    /// Load the optional TOML file and apply flag overrides on top.
    pub fn resolve(&self) -> Result<Settings> {
        let base = match &self.config {
            Some(path) => Settings::from_file(path)?,
            None => Settings::default(),
        };
        Ok(self.apply_overrides(base))
    }

    pub fn apply_overrides(&self, mut settings: Settings) -> Settings {
        if let Some(mode) = self.mode {
            settings.server.mode = mode;
        }
        if let Some(bind) = &self.bind {
            settings.server.bind = bind.clone();
        }
        if let Some(workers) = self.workers {
            settings.workers.workers = workers;
        }
        if let Some(threads) = self.threads {
            settings.workers.threads = threads;
        }
        if let Some(timeout) = self.timeout {
            settings.workers.timeout_secs = timeout;
        }
        if let Some(max_requests) = self.max_requests {
            settings.workers.max_requests = max_requests;
        }
        if let Some(jitter) = self.max_requests_jitter {
            settings.workers.max_requests_jitter = jitter;
        }
        if let Some(graceful) = self.graceful_timeout {
            settings.workers.graceful_timeout_secs = graceful;
        }
        if let Some(renderer) = self.renderer {
            settings.scrape.renderer = renderer;
        }
        if let Some(chrome_path) = &self.chrome_path {
            settings.scrape.chrome_path = chrome_path.clone();
        }
        if let Some(max_items) = self.max_items {
            settings.scrape.max_items = max_items;
        }
        if let Some(ttl) = self.cache_ttl {
            settings.cache.ttl_secs = ttl;
        }
        if let Some(format) = self.log_format {
            settings.logging.format = format;
        }
        settings.logging.verbose |= self.verbose;
        settings.logging.monitor |= self.monitor;
        settings
    }
}

#[cfg(all(test, feature = "cli"))]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_gunicorn_style_flags() {
        let cli = CliConfig::parse_from([
            "scrape-rss",
            "--bind",
            "0.0.0.0:5000",
            "--workers",
            "1",
            "--threads",
            "2",
            "--timeout",
            "120",
            "--max-requests",
            "200",
            "--max-requests-jitter",
            "20",
        ]);
        let settings = cli.resolve().unwrap();
        assert_eq!(settings.server.mode, RunMode::Managed);
        assert_eq!(settings.workers.threads, 2);
        assert_eq!(settings.workers.max_requests_jitter, 20);
    }

    #[test]
    fn test_bare_mode_flag() {
        let cli = CliConfig::parse_from(["scrape-rss", "--mode", "bare"]);
        assert_eq!(cli.resolve().unwrap().server.mode, RunMode::Bare);
    }

    #[test]
    fn test_flags_override_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[workers]\nthreads = 8\ntimeout_secs = 30\n")
            .unwrap();

        let path = temp_file.path().to_str().unwrap().to_string();
        let cli = CliConfig::parse_from(["scrape-rss", "--config", &path, "--threads", "3"]);
        let settings = cli.resolve().unwrap();

        assert_eq!(settings.workers.threads, 3);
        assert_eq!(settings.workers.timeout_secs, 30);
    }
}
