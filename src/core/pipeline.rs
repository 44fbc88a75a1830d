use crate::core::extract::{extract_compiled, CompiledSelectors};
use crate::core::rss::render_feed;
use crate::domain::model::{FeedDocument, FeedItem, FeedRequest, RawItem};
use crate::domain::ports::{FeedPipeline, PageRenderer};
use crate::utils::error::Result;
use std::sync::Arc;
use url::Url;

/// Render the page, pick items with CSS selectors, write RSS.
pub struct ScrapePipeline {
    renderer: Arc<dyn PageRenderer>,
    max_items: usize,
}

impl ScrapePipeline {
    pub fn new(renderer: Arc<dyn PageRenderer>, max_items: usize) -> Self {
        Self {
            renderer,
            max_items,
        }
    }

    pub fn renderer(&self) -> &Arc<dyn PageRenderer> {
        &self.renderer
    }
}

#[async_trait::async_trait]
impl FeedPipeline for ScrapePipeline {
    async fn extract(&self, request: &FeedRequest) -> Result<Vec<RawItem>> {
        // Bad selectors are rejected before paying for a render.
        let selectors = CompiledSelectors::compile(&request.selectors)?;
        tracing::debug!(
            "Rendering {} with the {} renderer",
            request.url,
            self.renderer.name()
        );
        let html = self.renderer.render(&request.url).await?;
        tracing::debug!("Rendered {} ({} bytes)", request.url, html.len());

        Ok(extract_compiled(&html, &selectors, self.max_items))
    }

    async fn transform(&self, request: &FeedRequest, raw: Vec<RawItem>) -> Result<Vec<FeedItem>> {
        let candidates = raw.len();
        let items = normalize_items(&request.url, raw);
        if items.len() < candidates {
            tracing::debug!(
                "Dropped {} item(s) without a title or link",
                candidates - items.len()
            );
        }
        Ok(items)
    }

    async fn load(&self, document: FeedDocument) -> Result<String> {
        render_feed(&document)
    }
}

/// Resolves relative links against the page and keeps only items with a title and a link.
pub fn normalize_items(base: &Url, raw: Vec<RawItem>) -> Vec<FeedItem> {
    raw.into_iter()
        .filter_map(|item| {
            let title = item.title.filter(|t| !t.is_empty())?;
            let link = item.href.and_then(|href| resolve(base, &href))?;
            Some(FeedItem {
                title,
                link,
                description: item.description.filter(|d| !d.is_empty()),
                image: item.image.and_then(|src| resolve(base, &src)),
            })
        })
        .collect()
}

fn resolve(base: &Url, reference: &str) -> Option<String> {
    match base.join(reference) {
        Ok(url) => Some(url.to_string()),
        Err(e) => {
            tracing::debug!("Skipping unresolvable reference '{}': {}", reference, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::SelectorSet;
    use async_trait::async_trait;

    struct StaticRenderer(&'static str);

    #[async_trait]
    impl PageRenderer for StaticRenderer {
        async fn render(&self, _url: &Url) -> Result<String> {
            Ok(self.0.to_string())
        }

        fn name(&self) -> &'static str {
            "static"
        }
    }

    fn base() -> Url {
        Url::parse("https://news.example.com/press/").unwrap()
    }

    #[test]
    fn test_normalize_resolves_and_filters() {
        let raw = vec![
            RawItem {
                title: Some("Relative".to_string()),
                href: Some("../story/1".to_string()),
                description: Some(String::new()),
                image: Some("/img/1.jpg".to_string()),
            },
            RawItem {
                title: Some("Absolute".to_string()),
                href: Some("https://elsewhere.example/2".to_string()),
                ..RawItem::default()
            },
            RawItem {
                title: None,
                href: Some("/3".to_string()),
                ..RawItem::default()
            },
            RawItem {
                title: Some("No link".to_string()),
                href: None,
                ..RawItem::default()
            },
        ];

        let items = normalize_items(&base(), raw);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].link, "https://news.example.com/story/1");
        assert_eq!(items[0].description, None);
        assert_eq!(
            items[0].image.as_deref(),
            Some("https://news.example.com/img/1.jpg")
        );
        assert_eq!(items[1].link, "https://elsewhere.example/2");
    }

    #[tokio::test]
    async fn test_pipeline_stages() {
        let html = r#"<article><h3>One</h3><a href="one.html">x</a></article>
                      <article><h3>Two</h3></article>"#;
        let pipeline = ScrapePipeline::new(Arc::new(StaticRenderer(html)), 20);
        let request = FeedRequest::new(base(), SelectorSet::default());

        let raw = pipeline.extract(&request).await.unwrap();
        assert_eq!(raw.len(), 2);

        let items = pipeline.transform(&request, raw).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].link, "https://news.example.com/press/one.html");

        let xml = pipeline
            .load(FeedDocument::for_page(&request.page, items))
            .await
            .unwrap();
        assert!(xml.contains("<title>One</title>"));
    }
}
