//! CSS-selector extraction of feed entries from rendered HTML.

use crate::domain::model::{RawItem, SelectorSet};
use crate::utils::error::{Result, ScrapeError};
use scraper::{ElementRef, Html, Selector};

/// Selectors compiled once per request.
pub struct CompiledSelectors {
    item: Selector,
    title: Selector,
    link: Selector,
    description: Option<Selector>,
    image: Option<Selector>,
}

impl CompiledSelectors {
    pub fn compile(selectors: &SelectorSet) -> Result<Self> {
        Ok(Self {
            item: parse_selector(&selectors.item)?,
            title: parse_selector(&selectors.title)?,
            link: parse_selector(&selectors.link)?,
            description: selectors
                .description
                .as_deref()
                .map(parse_selector)
                .transpose()?,
            image: selectors.image.as_deref().map(parse_selector).transpose()?,
        })
    }
}

pub fn parse_selector(raw: &str) -> Result<Selector> {
    Selector::parse(raw).map_err(|e| ScrapeError::InvalidSelector {
        selector: raw.to_string(),
        reason: e.to_string(),
    })
}

/// Reads up to `max_items` item containers, in document order.
pub fn extract_items(html: &str, selectors: &SelectorSet, max_items: usize) -> Result<Vec<RawItem>> {
    let compiled = CompiledSelectors::compile(selectors)?;
    Ok(extract_compiled(html, &compiled, max_items))
}

pub fn extract_compiled(html: &str, selectors: &CompiledSelectors, max_items: usize) -> Vec<RawItem> {
    let document = Html::parse_document(html);

    let items = document
        .select(&selectors.item)
        .take(max_items)
        .map(|element| read_item(element, selectors))
        .collect::<Vec<_>>();

    tracing::debug!("item selector yielded {} candidate(s)", items.len());
    items
}

fn read_item(element: ElementRef<'_>, selectors: &CompiledSelectors) -> RawItem {
    let title = first_match(element, &selectors.title).map(inner_text);
    let href = first_match(element, &selectors.link).and_then(|el| attr(el, "href"));
    let description = selectors
        .description
        .as_ref()
        .and_then(|sel| first_match(element, sel))
        .map(inner_text);
    let image = selectors
        .image
        .as_ref()
        .and_then(|sel| first_match(element, sel))
        .and_then(|el| attr(el, "src"));

    RawItem {
        title,
        href,
        description,
        image,
    }
}

fn first_match<'a>(element: ElementRef<'a>, selector: &Selector) -> Option<ElementRef<'a>> {
    element.select(selector).next()
}

fn attr(element: ElementRef<'_>, name: &str) -> Option<String> {
    element
        .value()
        .attr(name)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Elements whose text never renders.
const HIDDEN_TAGS: [&str; 4] = ["script", "style", "noscript", "template"];

/// Visible text with runs of whitespace collapsed to one space.
pub fn inner_text(element: ElementRef<'_>) -> String {
    let mut words = Vec::new();
    push_words(element, &mut words);
    words.join(" ")
}

fn push_words<'a>(element: ElementRef<'a>, words: &mut Vec<&'a str>) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            words.extend(text.split_whitespace());
        } else if let Some(child) = ElementRef::wrap(child) {
            if !HIDDEN_TAGS.contains(&child.value().name()) {
                push_words(child, words);
            }
        }
    }
}

/// Number of elements matching each selector; unparsable selectors count as zero.
pub fn count_matches(html: &str, selectors: &[&str]) -> Vec<(String, usize)> {
    let document = Html::parse_document(html);
    selectors
        .iter()
        .map(|raw| {
            let count = Selector::parse(raw)
                .map(|sel| document.select(&sel).count())
                .unwrap_or(0);
            (raw.to_string(), count)
        })
        .collect()
}
