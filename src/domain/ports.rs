use crate::domain::model::{FeedDocument, FeedItem, FeedRequest, RawItem};
use crate::utils::error::Result;
use async_trait::async_trait;
use url::Url;

/// Turns a page address into the HTML the selectors run against.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    async fn render(&self, url: &Url) -> Result<String>;

    fn name(&self) -> &'static str;
}

#[async_trait]
pub trait FeedPipeline: Send + Sync {
    async fn extract(&self, request: &FeedRequest) -> Result<Vec<RawItem>>;
    async fn transform(&self, request: &FeedRequest, raw: Vec<RawItem>) -> Result<Vec<FeedItem>>;
    async fn load(&self, document: FeedDocument) -> Result<String>;
}
