//! Loading [`Settings`] from a TOML file. Every section is optional and falls back to defaults.

use crate::config::settings::Settings;
use crate::utils::error::{Result, ScrapeError};
use regex::Regex;
use std::path::Path;

impl Settings {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(|e| ScrapeError::ConfigError {
            message: format!("cannot read {}: {}", path.as_ref().display(), e),
        })?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| ScrapeError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }
}

/// 替換環境變數 (例如 ${PORT})，未設定的變數保持原樣
fn substitute_env_vars(content: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| ScrapeError::ConfigError {
        message: format!("env substitution pattern: {}", e),
    })?;

    let result = re.replace_all(content, |caps: &regex::Captures| {
        let var_name = &caps[1];
        std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
    });

    Ok(result.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::settings::{RendererKind, RunMode};
    use crate::utils::validation::Validate;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_partial_toml_config() {
        let toml_content = r#"
[server]
mode = "bare"

[workers]
threads = 4
max_requests = 50
max_requests_jitter = 5

[scrape]
renderer = "chrome"
chrome_path = "/usr/bin/chromium"
"#;

        let settings = Settings::from_toml_str(toml_content).unwrap();

        assert_eq!(settings.server.mode, RunMode::Bare);
        assert_eq!(settings.server.bind, "0.0.0.0:5000");
        assert_eq!(settings.workers.threads, 4);
        assert_eq!(settings.workers.workers, 1);
        assert_eq!(settings.workers.max_requests, 50);
        assert_eq!(settings.scrape.renderer, RendererKind::Chrome);
        assert_eq!(settings.scrape.settle_delay_ms, 5000);
        assert_eq!(settings.cache.ttl_secs, 600);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_empty_file_is_all_defaults() {
        let settings = Settings::from_toml_str("").unwrap();
        assert_eq!(settings.workers.timeout_secs, 120);
        assert_eq!(settings.server.mode, RunMode::Managed);
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("SCRAPE_RSS_TEST_BIND", "127.0.0.1:8088");

        let toml_content = r#"
[server]
bind = "${SCRAPE_RSS_TEST_BIND}"
"#;

        let config = Settings::from_toml_str(toml_content).unwrap();
        assert_eq!(config.server.bind, "127.0.0.1:8088");

        std::env::remove_var("SCRAPE_RSS_TEST_BIND");
    }

    #[test]
    fn test_unset_env_var_is_left_verbatim() {
        let toml_content = r#"
[scrape]
user_agent = "${SCRAPE_RSS_SURELY_UNSET_VAR}"
"#;
        let config = Settings::from_toml_str(toml_content).unwrap();
        assert_eq!(config.scrape.user_agent, "${SCRAPE_RSS_SURELY_UNSET_VAR}");
    }

    #[test]
    fn test_unknown_section_is_rejected() {
        let err = Settings::from_toml_str("[gunicorn]\nworkers = 3\n").unwrap_err();
        assert!(matches!(err, ScrapeError::ConfigValidationError { .. }));
    }

    #[test]
    fn test_unknown_key_inside_section_is_rejected() {
        let err = Settings::from_toml_str("[workers]\nworker_class = \"gthread\"\n").unwrap_err();
        assert!(matches!(err, ScrapeError::ConfigValidationError { .. }));
    }

    #[test]
    fn test_config_validation() {
        let toml_content = r#"
[server]
bind = "invalid-address"
"#;

        let settings = Settings::from_toml_str(toml_content).unwrap();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();

        let toml_content = r#"
[cache]
ttl_secs = 30
max_entries = 8
"#;

        temp_file.write_all(toml_content.as_bytes()).unwrap();

        let config = Settings::from_file(temp_file.path()).unwrap();
        assert_eq!(config.cache.ttl_secs, 30);
        assert_eq!(config.cache.max_entries, 8);
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = Settings::from_file("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, ScrapeError::ConfigError { .. }));
    }
}
