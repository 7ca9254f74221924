//! RSS 2.0 and Atom feed parsing for candidate-link discovery.
//!
//! Feeds are an alternative listing: each `<item>` / `<entry>` yields one
//! candidate link and, when present, a publication-date hint that the crawler
//! uses if the article page itself shows no date.

use quick_xml::Reader;
use quick_xml::encoding::Decoder;
use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::{BytesStart, Event};
use thiserror::Error;

#[derive(Error, Debug)]
#[error("malformed feed at byte {position}: {message}")]
pub struct FeedError {
    pub position: u64,
    pub message: String,
}

/// One entry of a feed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedItem {
    pub link: String,
    pub title: String,
    /// Raw `pubDate` / `published` / `updated` text.
    pub published: Option<String>,
}

#[derive(Clone, Copy, PartialEq)]
enum Field {
    Link,
    Title,
    Date,
    Other,
}

fn field_of(name: &[u8]) -> Field {
    match name {
        b"link" => Field::Link,
        b"title" => Field::Title,
        b"pubDate" | b"published" | b"updated" | b"date" => Field::Date,
        _ => Field::Other,
    }
}

fn is_entry(name: &[u8]) -> bool {
    name == b"item" || name == b"entry"
}

/// Atom `<link href="..."/>`, ignoring non-alternate relations.
fn atom_href(e: &BytesStart<'_>, decoder: Decoder) -> Option<String> {
    let mut href = None;
    let mut rel_ok = true;
    for attr in e.attributes().flatten() {
        let Ok(value) = attr.decode_and_unescape_value(decoder) else {
            continue;
        };
        match attr.key.local_name().as_ref() {
            b"href" => href = Some(value.into_owned()),
            b"rel" => rel_ok = value == "alternate",
            _ => {}
        }
    }
    href.filter(|_| rel_ok)
}

/// Parse `xml` into at most `limit` items, in feed order.
pub fn parse_feed(xml: &str, limit: usize) -> Result<Vec<FeedItem>, FeedError> {
    let mut reader = Reader::from_str(xml);
    let decoder = reader.decoder();

    let mut items = Vec::new();
    let mut current: Option<FeedItem> = None;
    let mut field = Field::Other;

    let fail = |reader: &Reader<&[u8]>, message: String| FeedError {
        position: reader.buffer_position(),
        message,
    };

    loop {
        let event = reader
            .read_event()
            .map_err(|e| fail(&reader, e.to_string()))?;
        match event {
            Event::Start(e) => {
                let name = e.local_name();
                if is_entry(name.as_ref()) {
                    current = Some(FeedItem::default());
                    field = Field::Other;
                } else if let Some(item) = current.as_mut() {
                    field = match field_of(name.as_ref()) {
                        // `updated` may follow `published`; the first one wins.
                        Field::Date if item.published.is_some() => Field::Other,
                        Field::Link if !item.link.is_empty() => Field::Other,
                        f => f,
                    };
                    if field == Field::Link {
                        if let Some(href) = atom_href(&e, decoder) {
                            item.link = href;
                        }
                    }
                }
            }
            Event::Empty(e) => {
                if let Some(item) = current.as_mut() {
                    if e.local_name().as_ref() == b"link" && item.link.is_empty() {
                        if let Some(href) = atom_href(&e, decoder) {
                            item.link = href;
                        }
                    }
                }
            }
            Event::Text(t) => {
                let text = t.decode().map_err(|e| fail(&reader, e.to_string()))?;
                push_text(current.as_mut(), field, &text);
            }
            Event::CData(t) => {
                let text = t.decode().map_err(|e| fail(&reader, e.to_string()))?;
                push_text(current.as_mut(), field, &text);
            }
            Event::GeneralRef(r) => {
                let resolved = match r.resolve_char_ref().map_err(|e| fail(&reader, e.to_string()))? {
                    Some(c) => Some(c.to_string()),
                    None => {
                        let name = r.decode().map_err(|e| fail(&reader, e.to_string()))?;
                        resolve_predefined_entity(&name).map(str::to_string)
                    }
                };
                if let Some(text) = resolved {
                    push_text(current.as_mut(), field, &text);
                }
            }
            Event::End(e) => {
                if is_entry(e.local_name().as_ref()) {
                    if let Some(item) = current.take() {
                        if !item.link.trim().is_empty() {
                            items.push(FeedItem {
                                link: item.link.trim().to_string(),
                                title: item.title.trim().to_string(),
                                published: item.published.map(|p| p.trim().to_string()),
                            });
                            if items.len() >= limit {
                                break;
                            }
                        }
                    }
                }
                field = Field::Other;
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(items)
}

fn push_text(item: Option<&mut FeedItem>, field: Field, text: &str) {
    let Some(item) = item else {
        return;
    };
    match field {
        Field::Link => item.link.push_str(text),
        Field::Title => item.title.push_str(text),
        Field::Date => item.published.get_or_insert_with(String::new).push_str(text),
        Field::Other => {}
    }
}
