use crate::domain::model::ProbeReport;
use quick_xml::escape::escape;

pub const HOME_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Custom RSS Generator</title></head>
<body style="font-family: Arial; max-width: 800px; margin: 50px auto; padding: 20px;">
    <h1>Custom RSS Feed Generator</h1>
    <p>Generate RSS feeds from JavaScript-rendered websites.</p>

    <h2>Usage</h2>
    <pre style="background: #f4f4f4; padding: 15px; border-radius: 5px;">
GET /feed?url=WEBSITE_URL&amp;item=CSS_SELECTOR&amp;title=CSS_SELECTOR&amp;link=CSS_SELECTOR

Parameters:
- url   (required): Website URL to scrape
- item  (optional): CSS selector for each item (default: article)
- title (optional): CSS selector for title (default: h2, h3, h4)
- link  (optional): CSS selector for link (default: a)
- desc  (optional): CSS selector for description
- img   (optional): CSS selector for image

Responses:
- 200 RSS 2.0 feed (header x-cache: hit or miss)
- 400 missing or invalid url, or an invalid CSS selector
- 404 no items matched the selectors
- 502 the page could not be loaded
- 504 loading the page timed out

GET /debug?url=WEBSITE_URL
    Lists common item selectors found on the page and shows its HTML.
    </pre>

    <h2>Example</h2>
    <pre style="background: #f4f4f4; padding: 15px; border-radius: 5px;">
/feed?url=https://news.bitcoin.com/press-releases/&amp;item=.story-card&amp;title=h6&amp;link=a&amp;img=img
    </pre>

    <h2>Try It</h2>
    <form action="/feed" method="get" style="background: #f9f9f9; padding: 20px; border-radius: 5px;">
        <p><label>URL: <input type="text" name="url" style="width: 400px;" placeholder="https://example.com"></label></p>
        <p><label>Item selector: <input type="text" name="item" value="article" style="width: 200px;"></label></p>
        <p><label>Title selector: <input type="text" name="title" value="h2, h3, h4" style="width: 200px;"></label></p>
        <p><label>Link selector: <input type="text" name="link" value="a" style="width: 200px;"></label></p>
        <p><label>Description selector: <input type="text" name="desc" style="width: 200px;"></label></p>
        <p><label>Image selector: <input type="text" name="img" style="width: 200px;"></label></p>
        <p><button type="submit">Generate Feed</button></p>
    </form>
</body>
</html>
"#;

pub fn render_debug_page(report: &ProbeReport) -> String {
    let url = escape(report.url.as_str());
    let results = if report.matches.is_empty() {
        "No common selectors found".to_string()
    } else {
        report
            .matches
            .iter()
            .map(|(selector, count)| format!("{}: {} elements found", escape(selector.as_str()), count))
            .collect::<Vec<_>>()
            .join("<br>")
    };

    format!(
        r#"<!DOCTYPE html>
<html>
<head><title>Debug: {url}</title></head>
<body style="font-family: monospace;">
    <h1>Debug: {url}</h1>
    <h2>Potential selectors found:</h2>
    <pre>{results}</pre>
    <h2>Page HTML (first 10000 chars):</h2>
    <textarea style="width:100%; height:500px;">{snippet}</textarea>
</body>
</html>
"#,
        url = url,
        results = results,
        snippet = escape(report.snippet.as_str()),
    )
}
