use crate::config::ScrapeSettings;
use crate::domain::ports::PageRenderer;
use crate::utils::error::{Result, ScrapeError};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use url::Url;

/// Fetches the served HTML as-is. Pages that build their content in scripts need [`super::ChromeRenderer`].
pub struct HttpRenderer {
    client: Client,
    timeout: Duration,
}

impl HttpRenderer {
    pub fn new(settings: &ScrapeSettings) -> Result<Self> {
        let timeout = settings.navigation_timeout();
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(settings.user_agent.as_str())
            .build()?;
        Ok(Self { client, timeout })
    }
}

#[async_trait]
impl PageRenderer for HttpRenderer {
    async fn render(&self, url: &Url) -> Result<String> {
        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| self.classify(url, e))?;

        let status = response.status();
        tracing::debug!("GET {} -> {}", url, status);
        if !status.is_success() {
            return Err(ScrapeError::RenderError {
                url: url.to_string(),
                message: format!("HTTP status {}", status),
            });
        }

        response.text().await.map_err(|e| self.classify(url, e))
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

impl HttpRenderer {
    fn classify(&self, url: &Url, error: reqwest::Error) -> ScrapeError {
        if error.is_timeout() {
            ScrapeError::RenderTimeout {
                url: url.to_string(),
                seconds: self.timeout.as_secs(),
            }
        } else {
            ScrapeError::RenderError {
                url: url.to_string(),
                message: error.to_string(),
            }
        }
    }
}
