use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScrapeError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Missing '{name}' parameter")]
    MissingParameter { name: String },

    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Invalid CSS selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("Failed to render {url}: {message}")]
    RenderError { url: String, message: String },

    #[error("Rendering {url} timed out after {seconds}s")]
    RenderTimeout { url: String, seconds: u64 },

    #[error("No items found. Check your CSS selectors.")]
    NoItems,

    #[error("Feed generation error: {message}")]
    FeedWriteError { message: String },

    #[error("Server error: {message}")]
    ServerError { message: String },

    #[error("Supervisor error: {message}")]
    SupervisorError { message: String },
}

pub type Result<T> = std::result::Result<T, ScrapeError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Request,
    Network,
    Rendering,
    Content,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ScrapeError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ScrapeError::ConfigError { .. }
            | ScrapeError::ConfigValidationError { .. }
            | ScrapeError::InvalidConfigValueError { .. }
            | ScrapeError::MissingConfigError { .. } => ErrorCategory::Configuration,
            ScrapeError::MissingParameter { .. }
            | ScrapeError::InvalidUrl { .. }
            | ScrapeError::InvalidSelector { .. } => ErrorCategory::Request,
            ScrapeError::HttpError(_) => ErrorCategory::Network,
            ScrapeError::RenderError { .. } | ScrapeError::RenderTimeout { .. } => {
                ErrorCategory::Rendering
            }
            ScrapeError::NoItems
            | ScrapeError::FeedWriteError { .. }
            | ScrapeError::SerializationError(_) => ErrorCategory::Content,
            ScrapeError::IoError(_)
            | ScrapeError::ServerError { .. }
            | ScrapeError::SupervisorError { .. } => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Request | ErrorCategory::Content => ErrorSeverity::Low,
            ErrorCategory::Network | ErrorCategory::Rendering => ErrorSeverity::Medium,
            ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            ScrapeError::MissingParameter { .. } => "Pass the page to scrape as ?url=https://...",
            ScrapeError::InvalidUrl { .. } => "Use an absolute http:// or https:// URL",
            ScrapeError::InvalidSelector { .. } => "Check the CSS selector syntax",
            ScrapeError::NoItems => "Open /debug?url=... to see which selectors match the page",
            ScrapeError::RenderTimeout { .. } => {
                "The page took too long to load; raise scrape.navigation_timeout_secs or retry later"
            }
            ScrapeError::RenderError { .. } | ScrapeError::HttpError(_) => {
                "Check that the site is reachable and the renderer binary is installed"
            }
            ScrapeError::ConfigError { .. }
            | ScrapeError::ConfigValidationError { .. }
            | ScrapeError::InvalidConfigValueError { .. }
            | ScrapeError::MissingConfigError { .. } => {
                "Check the configuration file and command-line flags"
            }
            ScrapeError::IoError(_) => "Check file permissions and that the port is free",
            ScrapeError::SupervisorError { .. } => {
                "Workers keep failing; inspect the logs above for the first failure"
            }
            _ => "Retry the request; if it keeps failing, inspect the service logs",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Configuration => format!("Invalid configuration: {}", self),
            ErrorCategory::System => format!("Service failure: {}", self),
            _ => self.to_string(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ScrapeError::MissingParameter { .. }
            | ScrapeError::InvalidUrl { .. }
            | ScrapeError::InvalidSelector { .. } => StatusCode::BAD_REQUEST,
            ScrapeError::NoItems => StatusCode::NOT_FOUND,
            ScrapeError::RenderError { .. } | ScrapeError::HttpError(_) => StatusCode::BAD_GATEWAY,
            ScrapeError::RenderTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ScrapeError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::warn!("request failed: {} ({:?})", self, self.category());
        } else {
            tracing::debug!("request rejected: {}", self);
        }
        (status, self.to_string()).into_response()
    }
}
