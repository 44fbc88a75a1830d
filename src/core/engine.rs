use crate::core::cache::FeedCache;
use crate::domain::model::{FeedDocument, FeedOutcome, FeedRequest};
use crate::domain::ports::FeedPipeline;
use crate::utils::error::{Result, ScrapeError};
use std::sync::Arc;
use std::time::Instant;

pub struct FeedEngine<P: FeedPipeline> {
    pipeline: P,
    cache: Arc<FeedCache>,
}

impl<P: FeedPipeline> FeedEngine<P> {
    pub fn new(pipeline: P, cache: Arc<FeedCache>) -> Self {
        Self { pipeline, cache }
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    pub async fn run(&self, request: &FeedRequest) -> Result<FeedOutcome> {
        let cache_key = FeedCache::key(&request.page, &request.selectors)?;
        if let Some(xml) = self.cache.get(&cache_key) {
            tracing::debug!("Cache hit for {}", request.url);
            return Ok(FeedOutcome {
                item_count: xml.matches("<item>").count(),
                xml,
                cached: true,
            });
        }

        let started = Instant::now();

        // Extract
        let raw = self.pipeline.extract(request).await?;

        // Transform
        let items = self.pipeline.transform(request, raw).await?;
        if items.is_empty() {
            tracing::info!("No items found on {} for '{}'", request.url, request.selectors.item);
            return Err(ScrapeError::NoItems);
        }
        let item_count = items.len();

        // Load
        let xml = self
            .pipeline
            .load(FeedDocument::for_page(&request.page, items))
            .await?;
        self.cache.insert(cache_key, xml.clone());

        tracing::info!(
            "✅ Built feed for {} with {} item(s) in {:?}",
            request.url,
            item_count,
            started.elapsed()
        );

        Ok(FeedOutcome {
            xml,
            item_count,
            cached: false,
        })
    }
}
