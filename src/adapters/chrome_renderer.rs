//! Headless Chromium renderer.
//!
//! Each render launches the browser with `--dump-dom`, lets page scripts run for
//! the settle delay (`--virtual-time-budget`), and reads the serialised DOM from
//! stdout. The process is killed if the request is cancelled or the navigation
//! timeout elapses, so a recycled worker leaves no browsers behind.

use crate::config::ScrapeSettings;
use crate::domain::ports::PageRenderer;
use crate::utils::error::{Result, ScrapeError};
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use url::Url;

const STDERR_TAIL: usize = 500;

pub struct ChromeRenderer {
    binary: String,
    navigation_timeout: Duration,
    settle_delay: Duration,
    user_agent: String,
}

impl ChromeRenderer {
    pub fn new(settings: &ScrapeSettings) -> Self {
        Self {
            binary: settings.chrome_path.clone(),
            navigation_timeout: settings.navigation_timeout(),
            settle_delay: settings.settle_delay(),
            user_agent: settings.user_agent.clone(),
        }
    }

    fn command(&self, url: &Url) -> Command {
        let mut command = Command::new(&self.binary);
        command
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--mute-audio")
            .arg(format!("--user-agent={}", self.user_agent))
            .arg(format!(
                "--virtual-time-budget={}",
                self.settle_delay.as_millis()
            ))
            .arg("--dump-dom")
            .arg(url.as_str())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }
}

#[async_trait]
impl PageRenderer for ChromeRenderer {
    async fn render(&self, url: &Url) -> Result<String> {
        let budget = self.navigation_timeout + self.settle_delay;
        let output = match tokio::time::timeout(budget, self.command(url).output()).await {
            Err(_) => {
                return Err(ScrapeError::RenderTimeout {
                    url: url.to_string(),
                    seconds: budget.as_secs(),
                })
            }
            Ok(Err(e)) => {
                return Err(ScrapeError::RenderError {
                    url: url.to_string(),
                    message: format!("cannot launch '{}': {}", self.binary, e),
                })
            }
            Ok(Ok(output)) => output,
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let tail: String = stderr
                .chars()
                .rev()
                .take(STDERR_TAIL)
                .collect::<Vec<_>>()
                .into_iter()
                .rev()
                .collect();
            return Err(ScrapeError::RenderError {
                url: url.to_string(),
                message: format!("browser exited with {}: {}", output.status, tail.trim()),
            });
        }

        let html = String::from_utf8_lossy(&output.stdout).into_owned();
        if html.trim().is_empty() {
            return Err(ScrapeError::RenderError {
                url: url.to_string(),
                message: "browser returned an empty document".to_string(),
            });
        }
        Ok(html)
    }

    fn name(&self) -> &'static str {
        "chrome"
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::io::Write;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    fn fake_browser(dir: &TempDir, script: &str) -> String {
        let path = dir.path().join("fake-chromium");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "#!/bin/sh").unwrap();
        writeln!(file, "{}", script).unwrap();
        drop(file);
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path.to_str().unwrap().to_string()
    }

    fn settings(binary: String, timeout_secs: u64) -> ScrapeSettings {
        ScrapeSettings {
            chrome_path: binary,
            navigation_timeout_secs: timeout_secs,
            settle_delay_ms: 0,
            ..ScrapeSettings::default()
        }
    }

    fn url() -> Url {
        Url::parse("https://example.com/news").unwrap()
    }

    #[tokio::test]
    async fn test_dumped_dom_is_returned() {
        let dir = TempDir::new().unwrap();
        // Echo the last argument so the test can see the URL was passed through.
        let binary = fake_browser(&dir, r#"for last; do :; done; echo "<html><p>$last</p></html>""#);

        let renderer = ChromeRenderer::new(&settings(binary, 5));
        let html = renderer.render(&url()).await.unwrap();
        assert!(html.contains("<p>https://example.com/news</p>"));
    }

    #[tokio::test]
    async fn test_browser_failure_carries_stderr() {
        let dir = TempDir::new().unwrap();
        let binary = fake_browser(&dir, "echo 'no display' >&2; exit 3");

        let renderer = ChromeRenderer::new(&settings(binary, 5));
        match renderer.render(&url()).await.unwrap_err() {
            ScrapeError::RenderError { message, .. } => assert!(message.contains("no display")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_hung_browser_times_out() {
        let dir = TempDir::new().unwrap();
        let binary = fake_browser(&dir, "sleep 10");

        let renderer = ChromeRenderer::new(&settings(binary, 1));
        let err = renderer.render(&url()).await.unwrap_err();
        assert!(matches!(err, ScrapeError::RenderTimeout { .. }));
    }

    #[tokio::test]
    async fn test_missing_binary() {
        let renderer =
            ChromeRenderer::new(&settings("/nonexistent/chromium-binary".to_string(), 5));
        assert!(matches!(
            renderer.render(&url()).await.unwrap_err(),
            ScrapeError::RenderError { .. }
        ));
    }
}
