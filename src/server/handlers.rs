use crate::core::probe::probe_page;
use crate::core::rss::RSS_CONTENT_TYPE;
use crate::domain::model::{FeedRequest, SelectorSet};
use crate::server::pages::{render_debug_page, HOME_PAGE};
use crate::server::AppState;
use crate::supervisor::guard::WorkerStamp;
use crate::utils::error::Result;
use crate::utils::validation::parse_page_url;
use axum::extract::{Query, State};
use axum::http::{header, Extensions, HeaderName, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Default, Deserialize)]
pub struct FeedParams {
    pub url: Option<String>,
    pub item: Option<String>,
    pub title: Option<String>,
    pub link: Option<String>,
    pub desc: Option<String>,
    pub img: Option<String>,
}

impl FeedParams {
    /// Empty query values count as absent so the HTML form's blank fields fall back to defaults.
    pub fn selectors(&self) -> SelectorSet {
        let defaults = SelectorSet::default();
        SelectorSet {
            item: non_empty(&self.item).unwrap_or(defaults.item),
            title: non_empty(&self.title).unwrap_or(defaults.title),
            link: non_empty(&self.link).unwrap_or(defaults.link),
            description: non_empty(&self.desc),
            image: non_empty(&self.img),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct DebugParams {
    pub url: Option<String>,
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn required_url(raw: &Option<String>) -> Result<url::Url> {
    parse_page_url(raw.as_deref().unwrap_or_default())
}

pub async fn home() -> Html<&'static str> {
    Html(HOME_PAGE)
}

pub async fn create_feed(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FeedParams>,
) -> Result<Response> {
    let url = required_url(&params.url)?;
    let request =
        FeedRequest::new(url, params.selectors()).with_page(params.url.as_deref().unwrap_or_default());

    let outcome = state.engine.run(&request).await?;

    Ok((
        [
            (header::CONTENT_TYPE, RSS_CONTENT_TYPE),
            (
                HeaderName::from_static("x-cache"),
                if outcome.cached { "hit" } else { "miss" },
            ),
        ],
        outcome.xml,
    )
        .into_response())
}

pub async fn debug_page(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DebugParams>,
) -> Response {
    let url = match required_url(&params.url) {
        Ok(url) => url,
        Err(e) => return e.into_response(),
    };

    match state.renderer().render(&url).await {
        Ok(html) => Html(render_debug_page(&probe_page(&html, url.as_str()))).into_response(),
        Err(e) => {
            tracing::warn!("debug render of {} failed: {}", url, e);
            (StatusCode::INTERNAL_SERVER_ERROR, format!("Error: {}", e)).into_response()
        }
    }
}

pub async fn healthz(State(state): State<Arc<AppState>>, extensions: Extensions) -> Response {
    let mut body = serde_json::json!({
        "status": "ok",
        "mode": state.mode,
        "renderer": state.renderer().name(),
    });

    if let Some(stamp) = extensions.get::<WorkerStamp>() {
        body["worker"] = stamp.worker.into();
        body["generation"] = stamp.generation.into();
        body["served"] = stamp.served.into();
        body["limit"] = stamp.limit.into();
    }

    Json(body).into_response()
}
