//! Line-oriented playlist parser.
//!
//! The parser never fails: anything it does not understand is dropped and
//! simply yields fewer records. Each line is classified first, then fed to a
//! two-state machine that remembers the name (and group) announced by the
//! last `#EXTINF` line until a stream URI consumes it.

use crate::domain::model::{ChannelRecord, UNCATEGORIZED, UNTITLED};
use regex::Regex;
use std::sync::LazyLock;

const METADATA_MARKER: &str = "#EXTINF";
const COMMENT_MARKER: char = '#';
const ACCEPTED_SCHEMES: [&str; 4] = ["http", "https", "rtmp", "udp"];

static GROUP_TITLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)group-title\s*=\s*"([^"]*)""#).expect("group-title pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind<'a> {
    Blank,
    Metadata(&'a str),
    Comment,
    Candidate(&'a str),
}

pub fn classify_line(line: &str) -> LineKind<'_> {
    let line = line.trim();
    if line.is_empty() {
        LineKind::Blank
    } else if is_metadata_line(line) {
        LineKind::Metadata(line)
    } else if line.starts_with(COMMENT_MARKER) {
        LineKind::Comment
    } else {
        LineKind::Candidate(line)
    }
}

fn is_metadata_line(line: &str) -> bool {
    line.get(..METADATA_MARKER.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(METADATA_MARKER))
}

/// `#EXTINF:-1 tvg-id="x" group-title="News",Channel One` → ("Channel One", "News")
pub fn parse_metadata(line: &str) -> (String, String) {
    // 引號不成對時退回第一個逗號
    let delimiter = find_delimiter(line).or_else(|| line.find(','));
    let (attributes, name) = match delimiter {
        Some(pos) => (&line[..pos], line[pos + 1..].trim()),
        None => (line, ""),
    };

    let name = if name.is_empty() { UNTITLED } else { name };

    let category = GROUP_TITLE
        .captures(attributes)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .filter(|group| !group.is_empty())
        .unwrap_or(UNCATEGORIZED);

    (name.to_string(), category.to_string())
}

/// 第一個不在雙引號內的逗號
fn find_delimiter(line: &str) -> Option<usize> {
    let mut in_quotes = false;
    for (pos, ch) in line.char_indices() {
        match ch {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => return Some(pos),
            _ => {}
        }
    }
    None
}

pub fn has_accepted_scheme(candidate: &str) -> bool {
    match candidate.split_once(':') {
        Some((scheme, rest)) => {
            rest.starts_with("//")
                && ACCEPTED_SCHEMES
                    .iter()
                    .any(|accepted| scheme.eq_ignore_ascii_case(accepted))
        }
        None => false,
    }
}

#[derive(Debug, Default)]
enum ParserState {
    #[default]
    AwaitingEntry,
    NamePending {
        name: String,
        category: String,
    },
}

#[derive(Debug, Default)]
pub struct PlaylistParser {
    state: ParserState,
    records: Vec<ChannelRecord>,
    discarded: usize,
}

impl PlaylistParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, line: &str) {
        match classify_line(line) {
            LineKind::Blank | LineKind::Comment => {}
            LineKind::Metadata(meta) => {
                let (name, category) = parse_metadata(meta);
                self.state = ParserState::NamePending { name, category };
            }
            LineKind::Candidate(uri) => {
                // 無論接受與否都清除待用名稱，避免套用到下一個網址
                let pending = std::mem::take(&mut self.state);
                if !has_accepted_scheme(uri) {
                    self.discarded += 1;
                    return;
                }
                let (name, category) = match pending {
                    ParserState::NamePending { name, category } => (name, category),
                    ParserState::AwaitingEntry => (UNTITLED.to_string(), UNCATEGORIZED.to_string()),
                };
                self.records.push(ChannelRecord::new(name, uri, category));
            }
        }
    }

    /// 被丟棄的非串流行數
    pub fn discarded(&self) -> usize {
        self.discarded
    }

    pub fn finish(self) -> Vec<ChannelRecord> {
        self.records
    }
}

pub fn parse(raw: &str) -> Vec<ChannelRecord> {
    let mut parser = PlaylistParser::new();
    for line in raw.trim_start_matches('\u{feff}').lines() {
        parser.feed(line);
    }
    if parser.discarded() > 0 {
        tracing::debug!("Discarded {} non-stream lines", parser.discarded());
    }
    parser.finish()
}

pub fn parse_bytes(raw: &[u8]) -> Vec<ChannelRecord> {
    parse(&String::from_utf8_lossy(raw))
}
