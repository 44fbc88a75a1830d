//! RSS 2.0 serialisation.

use crate::domain::model::{FeedDocument, FeedItem};
use crate::utils::error::{Result, ScrapeError};
use chrono::{DateTime, Utc};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

pub const RSS_CONTENT_TYPE: &str = "application/rss+xml";
const RSS_DOCS: &str = "http://www.rssboard.org/rss-specification";
const GENERATOR: &str = concat!("scrape-rss ", env!("CARGO_PKG_VERSION"));
const ENCLOSURE_TYPE: &str = "image/jpeg";

pub fn render_feed(document: &FeedDocument) -> Result<String> {
    render_feed_at(document, Utc::now())
}

/// Same as [`render_feed`] with an explicit build time, used for `lastBuildDate` and each `pubDate`.
pub fn render_feed_at(document: &FeedDocument, built_at: DateTime<Utc>) -> Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    let timestamp = built_at.to_rfc2822();

    emit(
        &mut writer,
        Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)),
    )?;
    emit(
        &mut writer,
        Event::Start(BytesStart::new("rss").with_attributes([("version", "2.0")])),
    )?;
    emit(&mut writer, Event::Start(BytesStart::new("channel")))?;

    text_element(&mut writer, "title", &document.title)?;
    text_element(&mut writer, "link", &document.link)?;
    text_element(&mut writer, "description", &document.description)?;
    text_element(&mut writer, "docs", RSS_DOCS)?;
    text_element(&mut writer, "generator", GENERATOR)?;
    text_element(&mut writer, "language", &document.language)?;
    text_element(&mut writer, "lastBuildDate", &timestamp)?;

    for item in &document.items {
        write_item(&mut writer, item, &timestamp)?;
    }

    emit(&mut writer, Event::End(BytesEnd::new("channel")))?;
    emit(&mut writer, Event::End(BytesEnd::new("rss")))?;

    String::from_utf8(writer.into_inner()).map_err(|e| ScrapeError::FeedWriteError {
        message: e.to_string(),
    })
}

fn write_item(writer: &mut Writer<Vec<u8>>, item: &FeedItem, timestamp: &str) -> Result<()> {
    emit(writer, Event::Start(BytesStart::new("item")))?;

    text_element(writer, "title", &item.title)?;
    text_element(writer, "link", &item.link)?;
    if let Some(description) = &item.description {
        text_element(writer, "description", description)?;
    }

    emit(
        writer,
        Event::Start(BytesStart::new("guid").with_attributes([("isPermaLink", "true")])),
    )?;
    emit(writer, Event::Text(BytesText::new(&item.link)))?;
    emit(writer, Event::End(BytesEnd::new("guid")))?;

    if let Some(image) = &item.image {
        emit(
            writer,
            Event::Empty(BytesStart::new("enclosure").with_attributes([
                ("url", image.as_str()),
                ("length", "0"),
                ("type", ENCLOSURE_TYPE),
            ])),
        )?;
    }

    text_element(writer, "pubDate", timestamp)?;
    emit(writer, Event::End(BytesEnd::new("item")))
}

fn text_element(writer: &mut Writer<Vec<u8>>, name: &str, value: &str) -> Result<()> {
    emit(writer, Event::Start(BytesStart::new(name)))?;
    emit(writer, Event::Text(BytesText::new(value)))?;
    emit(writer, Event::End(BytesEnd::new(name)))
}

fn emit(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|e| ScrapeError::FeedWriteError {
            message: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_document() -> FeedDocument {
        FeedDocument::for_page(
            "https://news.example.com/press/",
            vec![
                FeedItem {
                    title: "Rates & <Fees> cut".to_string(),
                    link: "https://news.example.com/a?x=1&y=2".to_string(),
                    description: Some("Markets \"rally\"".to_string()),
                    image: Some("https://cdn.example.com/a.jpg".to_string()),
                },
                FeedItem {
                    title: "Plain".to_string(),
                    link: "https://news.example.com/b".to_string(),
                    description: None,
                    image: None,
                },
            ],
        )
    }

    #[test]
    fn test_channel_metadata() {
        let built = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let xml = render_feed_at(&sample_document(), built).unwrap();

        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains("<rss version=\"2.0\">"));
        assert!(xml.contains("<title>Feed: https://news.example.com/press/</title>"));
        assert!(xml.contains("<description>Custom RSS feed for https://news.example.com/press/</description>"));
        assert!(xml.contains("<language>en</language>"));
        assert!(xml.contains("<lastBuildDate>Fri, "));
        assert!(xml.contains("Mar 2024 12:00:00 +0000</lastBuildDate>"));
    }

    #[test]
    fn test_items_are_escaped_and_ordered() {
        let xml = render_feed_at(&sample_document(), Utc::now()).unwrap();

        assert!(xml.contains("<title>Rates &amp; &lt;Fees&gt; cut</title>"));
        assert!(xml.contains("<guid isPermaLink=\"true\">https://news.example.com/a?x=1&amp;y=2</guid>"));
        assert!(xml.contains(
            "<enclosure url=\"https://cdn.example.com/a.jpg\" length=\"0\" type=\"image/jpeg\"/>"
        ));

        let first = xml.find("Rates &amp;").unwrap();
        let second = xml.find("<title>Plain</title>").unwrap();
        assert!(first < second);
        assert_eq!(xml.matches("<item>").count(), 2);
        assert_eq!(xml.matches("<enclosure").count(), 1);
        assert_eq!(xml.matches("<pubDate>").count(), 2);
    }
}
