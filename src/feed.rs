// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Feed model and XML decoding.
//!
//! Handles RSS 2.0 (including the `content` and Media RSS extensions),
//! RSS 1.0 (RDF) and Atom documents. Items are returned in document order.

use quick_xml::events::{BytesStart, Event};
use quick_xml::name::ResolveResult;
use quick_xml::reader::NsReader;
use serde::Serialize;
use thiserror::Error;

const CONTENT_NS: &[u8] = b"http://purl.org/rss/1.0/modules/content/";
const MEDIA_NS: &[u8] = b"http://search.yahoo.com/mrss/";
const ATOM_NS: &[u8] = b"http://www.w3.org/2005/Atom";
const RSS1_NS: &[u8] = b"http://purl.org/rss/1.0/";

/// The document could not be decoded as a feed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to parse RSS XML: {0}")]
pub struct ParseError(String);

impl ParseError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// A decoded feed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Feed {
    /// Channel or feed title, when present
    pub title: Option<String>,
    pub items: Vec<FeedItem>,
}

/// One feed entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FeedItem {
    pub title: String,
    pub link: String,
    pub description: String,
    pub pub_date: String,
    /// Raw extended content (`content:encoded` or Atom `content`)
    pub content_encoded: String,
    pub media_content: Vec<MediaContent>,
}

/// A `media:content` attachment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MediaContent {
    pub url: String,
    #[serde(rename = "type")]
    pub media_type: String,
    pub medium: String,
}

impl MediaContent {
    /// True if the medium is `image` or the MIME type is `image/*`.
    pub fn is_image(&self) -> bool {
        self.medium == "image" || self.media_type.starts_with("image/")
    }
}

impl FeedItem {
    /// URL of the first image attachment, or an empty string.
    pub fn image_url(&self) -> &str {
        self.media_content
            .iter()
            .find(|media| media.is_image())
            .map(|media| media.url.as_str())
            .unwrap_or("")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FeedKind {
    Rss,
    Atom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Link,
    Description,
    PubDate,
    Updated,
    Content,
}

/// Text being collected for an element until its end tag.
struct Capture {
    field: Field,
    depth: usize,
    text: String,
}

#[derive(Default)]
struct ItemBuilder {
    item: FeedItem,
    depth: usize,
    updated: String,
}

impl ItemBuilder {
    fn set(&mut self, field: Field, value: String) {
        let slot = match field {
            Field::Title => &mut self.item.title,
            Field::Link => &mut self.item.link,
            Field::Description => &mut self.item.description,
            Field::PubDate => &mut self.item.pub_date,
            Field::Updated => &mut self.updated,
            Field::Content => &mut self.item.content_encoded,
        };
        *slot = value;
    }

    fn build(mut self) -> FeedItem {
        if self.item.pub_date.is_empty() {
            self.item.pub_date = self.updated;
        }
        self.item
    }
}

/// Parse a feed from raw XML bytes.
///
/// The root element must be `rss`, `rdf:RDF` or `feed`. A well-formed
/// feed with no items parses successfully; callers decide whether that is
/// an error.
pub fn parse_feed(xml: &[u8]) -> Result<Feed, ParseError> {
    let mut reader = NsReader::from_reader(xml);
    let mut buf = Vec::new();

    let mut kind: Option<FeedKind> = None;
    let mut feed = Feed::default();
    let mut depth = 0usize;
    let mut current: Option<ItemBuilder> = None;
    let mut capture: Option<Capture> = None;

    loop {
        buf.clear();
        let (ns, event) = match reader.read_resolved_event_into(&mut buf) {
            Ok(resolved) => resolved,
            Err(e) => {
                let position = reader.buffer_position();
                return Err(ParseError::new(format!("XML error at byte {position}: {e}")));
            }
        };

        match event {
            Event::Start(e) => {
                depth += 1;
                let local = e.local_name();
                let name = local.as_ref();

                let Some(kind) = kind else {
                    kind = Some(root_kind(name)?);
                    continue;
                };

                if capture.is_some() {
                    // Markup nested inside a captured element contributes
                    // only its text.
                    continue;
                }

                if current.is_none() && is_item(kind, &ns, name) {
                    current = Some(ItemBuilder {
                        depth,
                        ..Default::default()
                    });
                    continue;
                }

                match current.as_mut() {
                    Some(item) => {
                        if is_media_content(&ns, name) {
                            item.item.media_content.push(media_content(&e)?);
                        } else if depth == item.depth + 1 {
                            if kind == FeedKind::Atom && name == b"link" {
                                apply_atom_link(item, &e)?;
                            }
                            // Unknown children stay open so nested
                            // media:content is still seen.
                            if let Some(field) = item_field(kind, &ns, name) {
                                capture = Some(Capture {
                                    field,
                                    depth,
                                    text: String::new(),
                                });
                            }
                        }
                    }
                    None => {
                        if feed.title.is_none() && is_channel_title(kind, &ns, name, depth) {
                            capture = Some(Capture {
                                field: Field::Title,
                                depth,
                                text: String::new(),
                            });
                        }
                    }
                }
            }
            Event::Empty(e) => {
                let local = e.local_name();
                let name = local.as_ref();

                let Some(kind) = kind else {
                    // A self-closing root is a feed with nothing in it.
                    kind = Some(root_kind(name)?);
                    continue;
                };

                if capture.is_some() {
                    continue;
                }

                if current.is_none() && is_item(kind, &ns, name) {
                    feed.items.push(FeedItem::default());
                    continue;
                }

                if let Some(item) = current.as_mut() {
                    if is_media_content(&ns, name) {
                        item.item.media_content.push(media_content(&e)?);
                    } else if kind == FeedKind::Atom && name == b"link" && depth == item.depth {
                        apply_atom_link(item, &e)?;
                    }
                }
            }
            Event::Text(e) => {
                if let Some(capture) = capture.as_mut() {
                    let text = e
                        .unescape()
                        .map_err(|e| ParseError::new(format!("invalid text: {e}")))?;
                    capture.text.push_str(&text);
                }
            }
            Event::CData(e) => {
                if let Some(capture) = capture.as_mut() {
                    capture.text.push_str(&String::from_utf8_lossy(&e.into_inner()));
                }
            }
            Event::End(_) => {
                if capture.as_ref().is_some_and(|c| c.depth == depth) {
                    if let Some(Capture { field, text, .. }) = capture.take() {
                        let value = text.trim().to_string();
                        match current.as_mut() {
                            Some(item) => {
                                if !(field == Field::Link && kind == Some(FeedKind::Atom)) {
                                    item.set(field, value);
                                }
                            }
                            None => feed.title = Some(value),
                        }
                    }
                } else if current.as_ref().is_some_and(|item| item.depth == depth) {
                    if let Some(item) = current.take() {
                        feed.items.push(item.build());
                    }
                }
                depth = depth.saturating_sub(1);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if kind.is_none() {
        return Err(ParseError::new("document has no root element"));
    }
    if depth != 0 {
        return Err(ParseError::new("unexpected end of document"));
    }

    Ok(feed)
}

fn root_kind(name: &[u8]) -> Result<FeedKind, ParseError> {
    match name {
        b"rss" | b"RDF" => Ok(FeedKind::Rss),
        b"feed" => Ok(FeedKind::Atom),
        other => Err(ParseError::new(format!(
            "expected <rss> or <feed> root element, found <{}>",
            String::from_utf8_lossy(other)
        ))),
    }
}

/// Core feed vocabulary: unprefixed, RSS 1.0 or Atom namespace.
fn is_core_ns(ns: &ResolveResult) -> bool {
    match ns {
        ResolveResult::Unbound => true,
        ResolveResult::Bound(_) => is_bound_to(ns, RSS1_NS) || is_bound_to(ns, ATOM_NS),
        ResolveResult::Unknown(_) => false,
    }
}

fn is_bound_to(ns: &ResolveResult, uri: &[u8]) -> bool {
    match ns {
        ResolveResult::Bound(bound) => {
            let bound: &[u8] = bound.as_ref();
            bound == uri
        }
        _ => false,
    }
}

fn is_item(kind: FeedKind, ns: &ResolveResult, name: &[u8]) -> bool {
    is_core_ns(ns)
        && match kind {
            FeedKind::Rss => name == b"item",
            FeedKind::Atom => name == b"entry",
        }
}

fn is_media_content(ns: &ResolveResult, name: &[u8]) -> bool {
    name == b"content" && is_bound_to(ns, MEDIA_NS)
}

fn is_channel_title(kind: FeedKind, ns: &ResolveResult, name: &[u8], depth: usize) -> bool {
    // rss > channel > title, rdf:RDF > channel > title, feed > title
    let expected_depth = match kind {
        FeedKind::Rss => 3,
        FeedKind::Atom => 2,
    };
    name == b"title" && depth == expected_depth && is_core_ns(ns)
}

fn item_field(kind: FeedKind, ns: &ResolveResult, name: &[u8]) -> Option<Field> {
    if name == b"encoded" && is_bound_to(ns, CONTENT_NS) {
        return Some(Field::Content);
    }
    if !is_core_ns(ns) {
        return None;
    }

    match (kind, name) {
        (_, b"title") => Some(Field::Title),
        (FeedKind::Rss, b"link") => Some(Field::Link),
        (FeedKind::Rss, b"description") => Some(Field::Description),
        (FeedKind::Rss, b"pubDate") => Some(Field::PubDate),
        (FeedKind::Atom, b"link") => Some(Field::Link),
        (FeedKind::Atom, b"summary") => Some(Field::Description),
        (FeedKind::Atom, b"content") => Some(Field::Content),
        (FeedKind::Atom, b"published") => Some(Field::PubDate),
        (FeedKind::Atom, b"updated") => Some(Field::Updated),
        _ => None,
    }
}

fn attribute(element: &BytesStart<'_>, key: &[u8]) -> Result<Option<String>, ParseError> {
    for attr in element.attributes() {
        let attr = attr.map_err(|e| ParseError::new(format!("invalid attribute: {e}")))?;
        if attr.key.local_name().as_ref() == key {
            let value = attr
                .unescape_value()
                .map_err(|e| ParseError::new(format!("invalid attribute value: {e}")))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

fn media_content(element: &BytesStart<'_>) -> Result<MediaContent, ParseError> {
    Ok(MediaContent {
        url: attribute(element, b"url")?.unwrap_or_default(),
        media_type: attribute(element, b"type")?.unwrap_or_default(),
        medium: attribute(element, b"medium")?.unwrap_or_default(),
    })
}

/// Atom links live in `href`. The first alternate (or rel-less) link wins.
fn apply_atom_link(item: &mut ItemBuilder, element: &BytesStart<'_>) -> Result<(), ParseError> {
    if !item.item.link.is_empty() {
        return Ok(());
    }
    let rel = attribute(element, b"rel")?;
    if matches!(rel.as_deref(), None | Some("alternate")) {
        if let Some(href) = attribute(element, b"href")? {
            item.item.link = href;
        }
    }
    Ok(())
}
