use crate::core::extract::count_matches;
use crate::domain::model::ProbeReport;

/// Container selectors commonly used by news and blog layouts.
pub const PROBE_SELECTORS: [&str; 12] = [
    "article",
    ".article",
    ".post",
    ".story",
    ".card",
    ".story-card",
    ".news-item",
    ".entry",
    "[class*='story']",
    "[class*='article']",
    "[class*='post']",
    "[class*='card']",
];

pub const SNIPPET_CHARS: usize = 10_000;

/// Counts which probe selectors match and keeps the head of the page for inspection.
pub fn probe_page(html: &str, url: &str) -> ProbeReport {
    let matches = count_matches(html, &PROBE_SELECTORS)
        .into_iter()
        .filter(|(_, count)| *count > 0)
        .collect();

    ProbeReport {
        url: url.to_string(),
        matches,
        snippet: html.chars().take(SNIPPET_CHARS).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_reports_only_matching_selectors() {
        let html = r#"<div class="post-list"><div class="post">a</div><div class="post">b</div></div>"#;
        let report = probe_page(html, "https://example.com");

        assert!(report.matches.contains(&(".post".to_string(), 2)));
        assert!(report.matches.contains(&("[class*='post']".to_string(), 3)));
        assert!(report.matches.iter().all(|(_, count)| *count > 0));
        assert!(!report.matches.iter().any(|(sel, _)| sel == "article"));
    }

    #[test]
    fn test_snippet_is_truncated_by_characters() {
        let html = "é".repeat(SNIPPET_CHARS + 50);
        let report = probe_page(&html, "https://example.com");
        assert_eq!(report.snippet.chars().count(), SNIPPET_CHARS);
    }
}
