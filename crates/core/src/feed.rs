//! RSS 2.0 rendering of the episode list.

use chrono::{DateTime, Local};
use std::fmt::Write;

use crate::config::FeedConfig;
use crate::episodes::Episode;

/// Content type of the rendered feed.
pub const FEED_CONTENT_TYPE: &str = "application/rss+xml; charset=utf-8";

const ITEM_DESCRIPTION: &str = "Audio file converted from YouTube";

/// Escapes `&`, `<` and `>`. Quotes are left as-is.
pub fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// Public URL of a published file. The file name is percent-encoded as one
/// path segment; XML escaping is left to the caller.
pub fn episode_url(host: &str, file: &str) -> String {
    format!("http://{}/mp3s/{}", host, urlencoding::encode(file))
}

/// Renders the feed. `host` is the request host, used for links and enclosures.
pub fn render_feed(
    config: &FeedConfig,
    host: &str,
    episodes: &[Episode],
    now: DateTime<Local>,
) -> String {
    let mut xml = String::new();

    // Writing into a String cannot fail.
    let _ = write!(
        xml,
        r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
    <channel>
        <title>{}</title>
        <link>http://{}</link>
        <description>{}</description>
        <language>en-us</language>
        <lastBuildDate>{}</lastBuildDate>"#,
        escape_xml(&config.title),
        escape_xml(host),
        escape_xml(&config.description),
        now.to_rfc2822(),
    );

    for episode in episodes {
        let url = escape_xml(&episode_url(host, &episode.file));
        let _ = write!(
            xml,
            r#"
        <item>
            <title>{}</title>
            <description>{}</description>
            <enclosure url="{url}" length="{}" type="audio/mpeg" />
            <guid>{url}</guid>
            <pubDate>{}</pubDate>
            <isNormalized>{}</isNormalized>
            <duration>{}</duration>
        </item>"#,
            escape_xml(&episode.title),
            ITEM_DESCRIPTION,
            episode.size_bytes,
            episode.pub_date,
            episode.normalized,
            episode.duration,
        );
    }

    xml.push_str(
        r#"
    </channel>
</rss>"#,
    );
    xml
}
