//! Release-name parser. Implements ClassifierPort with plain regexes.
//!
//! Handles captions and filenames such as `Dark.S01E03.720p.mkv`,
//! `Inception 2010 1080p Dual Audio` or `Show S02 E01-E10 Complete`.
//! The title is whatever precedes the first recognised tag.

use crate::domain::{Category, Classification, DomainError, EpisodeRange};
use crate::ports::ClassifierPort;
use lazy_regex::lazy_regex;
use regex::Captures;

static RE_EXTENSION: lazy_regex::Lazy<regex::Regex> =
    lazy_regex!(r"(?i)\.(mkv|mp4|avi|webm|m4v|mov|ts|flv|wmv|3gp)$");
static RE_SEPARATORS: lazy_regex::Lazy<regex::Regex> = lazy_regex!(r"[._()\[\]{}|]+");
static RE_SPACES: lazy_regex::Lazy<regex::Regex> = lazy_regex!(r"\s+");

static RE_SEASON_EPISODE: lazy_regex::Lazy<regex::Regex> =
    lazy_regex!(r"(?i)\bS(\d{1,2})\s*E(\d{1,3})(?:\s*-\s*E?(\d{1,3}))?\b");
static RE_SEASON: lazy_regex::Lazy<regex::Regex> = lazy_regex!(r"(?i)\b(?:S|Season\s*)(\d{1,2})\b");
static RE_EPISODE: lazy_regex::Lazy<regex::Regex> =
    lazy_regex!(r"(?i)\b(?:E|EP|Episode\s*)(\d{1,3})(?:\s*-\s*(?:E|EP)?(\d{1,3}))?\b");
static RE_COMPLETE: lazy_regex::Lazy<regex::Regex> = lazy_regex!(r"(?i)\bcomplete\b");

static RE_YEAR: lazy_regex::Lazy<regex::Regex> = lazy_regex!(r"\b(19\d{2}|20\d{2})\b");
static RE_QUALITY: lazy_regex::Lazy<regex::Regex> =
    lazy_regex!(r"(?i)\b(360p|480p|576p|720p|1080p|1440p|2160p|4k)\b");
static RE_AUDIO: lazy_regex::Lazy<regex::Regex> = lazy_regex!(r"(?i)\b(dual|multi)[\s-]?audio\b");

#[derive(Debug, Default, Clone, Copy)]
pub struct TitleParser;

impl TitleParser {
    pub fn new() -> Self {
        Self
    }
}

impl ClassifierPort for TitleParser {
    fn classify_title(&self, text: &str) -> Result<Classification, DomainError> {
        let norm = normalize(text);
        if norm.is_empty() {
            return Err(DomainError::Classification(format!(
                "nothing to parse in {text:?}"
            )));
        }
        Ok(parse(&norm))
    }
}

/// Drop the extension, turn separators into spaces, collapse whitespace.
fn normalize(text: &str) -> String {
    let text = RE_EXTENSION.replace(text.trim(), "");
    let text = RE_SEPARATORS.replace_all(&text, " ");
    RE_SPACES.replace_all(&text, " ").trim().to_string()
}

fn parse(norm: &str) -> Classification {
    let mut cut = norm.len();
    let mut mark = |start: usize| cut = cut.min(start);

    let mut season = None;
    let mut episodes = None;
    if let Some(c) = RE_SEASON_EPISODE.captures(norm) {
        mark(whole_start(&c));
        season = number(&c, 1);
        episodes = range(number(&c, 2), number(&c, 3));
    } else {
        if let Some(c) = RE_SEASON.captures(norm) {
            mark(whole_start(&c));
            season = number(&c, 1);
        }
        if let Some(c) = RE_EPISODE.captures(norm) {
            mark(whole_start(&c));
            episodes = range(number(&c, 1), number(&c, 2));
        }
    }

    let complete = RE_COMPLETE.find(norm).map(|m| {
        mark(m.start());
    });

    // The last year wins so titles that start with a number keep it.
    let year = RE_YEAR.captures_iter(norm).last().map(|c| {
        mark(whole_start(&c));
        number(&c, 1)
    });

    let quality = RE_QUALITY.find(norm).map(|m| {
        mark(m.start());
        let q = m.as_str();
        if q.eq_ignore_ascii_case("4k") {
            "4K".to_string()
        } else {
            q.to_lowercase()
        }
    });

    let audio = RE_AUDIO.captures(norm).map(|c| {
        mark(whole_start(&c));
        let kind = c.get(1).map(|m| m.as_str().to_lowercase()).unwrap_or_default();
        format!("{} Audio", capitalize(&kind))
    });

    let title = norm[..cut]
        .trim_end_matches(|c: char| c == '-' || c.is_whitespace())
        .to_string();
    let accepted = !title.is_empty();
    let category = if season.is_some() || episodes.is_some() || complete.is_some() {
        Category::Series
    } else if accepted {
        Category::Movie
    } else {
        Category::Unknown
    };

    Classification {
        accepted,
        category,
        season,
        episodes,
        title,
        year: year.flatten(),
        quality,
        audio,
    }
}

fn whole_start(c: &Captures<'_>) -> usize {
    c.get(0).map(|m| m.start()).unwrap_or(usize::MAX)
}

fn number(c: &Captures<'_>, group: usize) -> Option<u16> {
    c.get(group).and_then(|m| m.as_str().parse().ok())
}

fn range(first: Option<u16>, last: Option<u16>) -> Option<EpisodeRange> {
    let first = first?;
    let last = last.filter(|l| *l >= first).unwrap_or(first);
    Some(EpisodeRange { first, last })
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
