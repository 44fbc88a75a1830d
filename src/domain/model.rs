use serde::{Deserialize, Serialize};
use url::Url;

pub const DEFAULT_ITEM_SELECTOR: &str = "article";
pub const DEFAULT_TITLE_SELECTOR: &str = "h2, h3, h4";
pub const DEFAULT_LINK_SELECTOR: &str = "a";

/// CSS selectors describing where feed entries live on a page.
///
/// Field order matters: the JSON form of this struct is part of the cache key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectorSet {
    pub item: String,
    pub title: String,
    pub link: String,
    pub description: Option<String>,
    pub image: Option<String>,
}

impl Default for SelectorSet {
    fn default() -> Self {
        Self {
            item: DEFAULT_ITEM_SELECTOR.to_string(),
            title: DEFAULT_TITLE_SELECTOR.to_string(),
            link: DEFAULT_LINK_SELECTOR.to_string(),
            description: None,
            image: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FeedRequest {
    pub url: Url,
    /// The address as the client wrote it; echoed in the channel title.
    pub page: String,
    pub selectors: SelectorSet,
}

impl FeedRequest {
    pub fn new(url: Url, selectors: SelectorSet) -> Self {
        Self {
            page: url.to_string(),
            url,
            selectors,
        }
    }

    pub fn with_page(mut self, page: &str) -> Self {
        self.page = page.trim().to_string();
        self
    }
}

/// What one item container yielded before URLs are resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawItem {
    pub title: Option<String>,
    pub href: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedItem {
    pub title: String,
    pub link: String,
    pub description: Option<String>,
    pub image: Option<String>,
}

#[derive(Debug, Clone)]
pub struct FeedDocument {
    pub title: String,
    pub link: String,
    pub description: String,
    pub language: String,
    pub items: Vec<FeedItem>,
}

impl FeedDocument {
    pub fn for_page(page: &str, items: Vec<FeedItem>) -> Self {
        Self {
            title: format!("Feed: {}", page),
            link: page.to_string(),
            description: format!("Custom RSS feed for {}", page),
            language: "en".to_string(),
            items,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FeedOutcome {
    pub xml: String,
    pub item_count: usize,
    pub cached: bool,
}

#[derive(Debug, Clone)]
pub struct ProbeReport {
    pub url: String,
    pub matches: Vec<(String, usize)>,
    pub snippet: String,
}
