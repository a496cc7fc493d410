//! Link detection in assistant replies

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Visible text of every link; the URL itself is only the target
pub const LINK_LABEL: &str = "click here";

/// Links open in a new browsing context
pub const LINK_TARGET: &str = "_blank";

static URL_REGEX: OnceLock<Regex> = OnceLock::new();

fn url_regex() -> &'static Regex {
    URL_REGEX.get_or_init(|| Regex::new(r"https?://\S+").expect("Failed to compile URL regex"))
}

/// A piece of rendered assistant text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Segment {
    PlainText(String),
    Link(String),
}

impl Segment {
    /// Text the collaborator should display for this segment
    pub fn label(&self) -> &str {
        match self {
            Segment::PlainText(text) => text,
            Segment::Link(_) => LINK_LABEL,
        }
    }

    /// Link target, if this is a link
    pub fn url(&self) -> Option<&str> {
        match self {
            Segment::Link(url) => Some(url),
            Segment::PlainText(_) => None,
        }
    }

    /// Browsing context a link opens in
    pub fn target(&self) -> Option<&'static str> {
        match self {
            Segment::Link(_) => Some(LINK_TARGET),
            Segment::PlainText(_) => None,
        }
    }
}

/// Split `text` into plain text and link segments, left to right.
///
/// Empty text between adjacent links is dropped.
pub fn annotate(text: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut last = 0;

    for found in url_regex().find_iter(text) {
        push_plain(&mut segments, text.get(last..found.start()));
        segments.push(Segment::Link(found.as_str().to_string()));
        last = found.end();
    }
    push_plain(&mut segments, text.get(last..));

    segments
}

fn push_plain(segments: &mut Vec<Segment>, span: Option<&str>) {
    if let Some(span) = span.filter(|s| !s.is_empty()) {
        segments.push(Segment::PlainText(span.to_string()));
    }
}
