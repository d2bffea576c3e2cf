//! Best-effort duplicate detection against a secondary chat.
//!
//! Never blocks forwarding: an unset chat, an empty query or a failed search all mean
//! "not a duplicate".

use crate::domain::{MediaKind, MessageView};
use crate::ports::TgGateway;
use std::sync::Arc;
use tracing::{debug, warn};

/// Search hits inspected per lookup.
const SEARCH_LIMIT: i32 = 20;

pub struct DuplicateIndex {
    tg: Arc<dyn TgGateway>,
}

impl DuplicateIndex {
    pub fn new(tg: Arc<dyn TgGateway>) -> Self {
        Self { tg }
    }

    /// True when `secondary` already holds a `kind` message whose caption or filename
    /// matches `search_text` (case-insensitive, surrounding whitespace ignored).
    pub async fn exists(&self, secondary: Option<i64>, kind: MediaKind, search_text: &str) -> bool {
        let Some(chat_id) = secondary else {
            return false;
        };
        let needle = search_text.trim();
        if needle.is_empty() {
            return false;
        }

        let hits = match self
            .tg
            .search_messages(chat_id, needle, Some(kind), SEARCH_LIMIT)
            .await
        {
            Ok(hits) => hits,
            Err(e) => {
                warn!(chat_id, error = %e, "duplicate search failed, treating as new");
                return false;
            }
        };

        let found = hits.iter().any(|hit| matches_text(hit, needle));
        if found {
            debug!(chat_id, query = needle, "duplicate found in secondary chat");
        }
        found
    }
}

fn matches_text(hit: &MessageView, needle: &str) -> bool {
    let eq = |s: &Option<String>| {
        s.as_deref()
            .map(|v| v.trim().eq_ignore_ascii_case(needle))
            .unwrap_or(false)
    };
    eq(&hit.caption) || eq(&hit.source_filename)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usecases::fakes::{FakeGateway, media};
    use std::sync::atomic::Ordering;

    const SECONDARY: i64 = -200;

    #[tokio::test]
    async fn unset_secondary_never_searches() {
        let tg = Arc::new(FakeGateway::new());
        let index = DuplicateIndex::new(tg.clone());
        assert!(!index.exists(None, MediaKind::Video, "Dune 2021").await);
        assert_eq!(tg.search_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn caption_match_is_case_insensitive() {
        let tg = Arc::new(FakeGateway::new().with_search_results(
            SECONDARY,
            vec![media(9, MediaKind::Video, Some("  DUNE 2021 "), None)],
        ));
        let index = DuplicateIndex::new(tg);
        assert!(index.exists(Some(SECONDARY), MediaKind::Video, "dune 2021").await);
    }

    #[tokio::test]
    async fn filename_match_counts() {
        let tg = Arc::new(FakeGateway::new().with_search_results(
            SECONDARY,
            vec![media(9, MediaKind::Document, None, Some("Dune.2021.mkv"))],
        ));
        let index = DuplicateIndex::new(tg);
        assert!(
            index
                .exists(Some(SECONDARY), MediaKind::Document, "Dune.2021.mkv")
                .await
        );
    }

    #[tokio::test]
    async fn other_kind_or_text_is_not_a_duplicate() {
        let tg = Arc::new(FakeGateway::new().with_search_results(
            SECONDARY,
            vec![
                media(9, MediaKind::Document, Some("Dune 2021"), None),
                media(10, MediaKind::Video, Some("Dune Part Two 2024"), None),
            ],
        ));
        let index = DuplicateIndex::new(tg);
        assert!(!index.exists(Some(SECONDARY), MediaKind::Video, "Dune 2021").await);
    }

    #[tokio::test]
    async fn search_error_is_not_a_duplicate() {
        let tg = Arc::new(FakeGateway::new().failing_search());
        let index = DuplicateIndex::new(tg.clone());
        assert!(!index.exists(Some(SECONDARY), MediaKind::Video, "Dune 2021").await);
        assert_eq!(tg.search_calls.load(Ordering::SeqCst), 1);
    }
}
