//! Domain entities. Pure data structures for the core business.
//!
//! No Telegram/IO types here; adapters map into these.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Represents a Telegram chat (user, group, or channel).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chat {
    pub id: i64,
    pub title: String,
    pub username: Option<String>,
    #[serde(rename = "type")]
    pub kind: ChatType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatType {
    Private,
    Group,
    Supergroup,
    Channel,
}

/// Read-only projection of one fetched message.
///
/// Deleted messages are kept as tombstones (`is_empty = true`) so that the position
/// inside the requested id window stays aligned with the cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageView {
    pub id: i32,
    pub is_empty: bool,
    pub media_kind: Option<MediaKind>,
    pub caption: Option<String>,
    /// Opaque handle for the adapter to re-send the media without re-uploading.
    pub file_reference: Option<String>,
    pub source_filename: Option<String>,
    pub file_size: Option<u64>,
}

impl MessageView {
    /// Tombstone for a message id the platform no longer returns.
    pub fn deleted(id: i32) -> Self {
        Self {
            id,
            is_empty: true,
            ..Self::default()
        }
    }

    /// Title used for classification: caption first, then the original filename.
    pub fn title(&self) -> Option<&str> {
        self.caption
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .or_else(|| {
                self.source_filename
                    .as_deref()
                    .map(str::trim)
                    .filter(|f| !f.is_empty())
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Photo,
    Document,
    Audio,
    Video,
    Sticker,
    Other,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MediaKind::Photo => "photo",
            MediaKind::Document => "document",
            MediaKind::Audio => "audio",
            MediaKind::Video => "video",
            MediaKind::Sticker => "sticker",
            MediaKind::Other => "other",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Movie,
    Series,
    #[default]
    Unknown,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Movie => "movie",
            Category::Series => "series",
            Category::Unknown => "unknown",
        }
    }
}

/// Inclusive episode range. A single episode has `first == last`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeRange {
    pub first: u16,
    pub last: u16,
}

impl EpisodeRange {
    pub fn single(ep: u16) -> Self {
        Self {
            first: ep,
            last: ep,
        }
    }
}

impl fmt::Display for EpisodeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.first == self.last {
            write!(f, "E{:02}", self.first)
        } else {
            write!(f, "E{:02}-E{:02}", self.first, self.last)
        }
    }
}

/// Result of classifying a caption or filename.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    pub accepted: bool,
    pub category: Category,
    pub season: Option<u16>,
    pub episodes: Option<EpisodeRange>,
    /// Cleaned release name without tags.
    pub title: String,
    pub year: Option<u16>,
    pub quality: Option<String>,
    pub audio: Option<String>,
}

impl Classification {
    /// Fallback when the parser fails: nothing is known about the title.
    pub fn unclassified() -> Self {
        Self::default()
    }
}

/// Running tally of a forward job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobCounters {
    pub fetched: u64,
    pub forwarded: u64,
    pub deleted_skipped: u64,
    pub non_media_skipped: u64,
    pub duplicate_skipped: u64,
}

impl JobCounters {
    /// Every fetched message lands in exactly one bucket.
    pub fn is_balanced(&self) -> bool {
        self.fetched
            == self.forwarded
                + self.deleted_skipped
                + self.non_media_skipped
                + self.duplicate_skipped
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Running,
    Completed,
    Cancelled,
    Failed,
    LimitReached,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobState::Running)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobState::Running => "running",
            JobState::Completed => "completed",
            JobState::Cancelled => "cancelled",
            JobState::Failed => "failed",
            JobState::LimitReached => "limit reached",
        };
        f.write_str(s)
    }
}

/// Per-job options supplied by the caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobOptions {
    pub skip_offset: i32,
    pub delay_secs: u64,
    pub movie_only: bool,
    pub series_only: bool,
    /// Conversation searched for already-present content. `None` disables duplicate suppression.
    pub duplicate_secondary: Option<i64>,
    /// Stop after this many successful forwards. `None` = unbounded.
    pub forward_cap: Option<u64>,
    /// Accept every media kind and skip title classification.
    pub unfiltered_clone: bool,
    /// Copy text-only messages instead of skipping them.
    pub forward_non_media: bool,
    /// Caption template with `{file_name}`, `{file_size}` and `{caption}` placeholders.
    pub caption_template: Option<String>,
    /// Rewrite captions from the parsed title plus looked-up release year.
    pub enrich_captions: bool,
    /// Wrap captions in `**…**`.
    pub bold_caption: bool,
}

/// Counters plus the requested total. Emitted every 20 processed messages and at the end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub counters: JobCounters,
    pub total_count: i32,
    pub cursor: i32,
}

/// Final outcome of a job, reported even on failure or cancellation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobReport {
    pub owner: i64,
    pub state: JobState,
    pub counters: JobCounters,
    pub total_count: i32,
    pub cursor: i32,
    pub error: Option<String>,
    pub elapsed_secs: i64,
}

/// Outcome of submitting a login code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignInResult {
    Success,
    PasswordRequired { hint: Option<String> },
}

/// Remembered defaults for the interactive front end. Never holds job state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPreferences {
    pub target_chat: Option<i64>,
    pub skip_offset: Option<i32>,
    pub delay_secs: Option<u64>,
    pub caption_template: Option<String>,
    pub duplicate_secondary: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_prefers_caption_over_filename() {
        let view = MessageView {
            caption: Some("Dune (2021) 1080p".into()),
            source_filename: Some("dune.mkv".into()),
            ..MessageView::default()
        };
        assert_eq!(view.title(), Some("Dune (2021) 1080p"));
    }

    #[test]
    fn blank_caption_falls_back_to_filename() {
        let view = MessageView {
            caption: Some("   ".into()),
            source_filename: Some("Dark.S01E02.mkv".into()),
            ..MessageView::default()
        };
        assert_eq!(view.title(), Some("Dark.S01E02.mkv"));
    }

    #[test]
    fn episode_range_display() {
        assert_eq!(EpisodeRange::single(3).to_string(), "E03");
        assert_eq!(EpisodeRange { first: 1, last: 10 }.to_string(), "E01-E10");
    }

    #[test]
    fn counters_balance() {
        let c = JobCounters {
            fetched: 5,
            forwarded: 2,
            deleted_skipped: 1,
            non_media_skipped: 1,
            duplicate_skipped: 1,
        };
        assert!(c.is_balanced());
    }
}
