//! Lazy, ordered walk over a message-id window of one chat.
//!
//! Telegram message ids start at 1, so position `p` in the window is message id `p + 1`:
//! with `skip_offset = s` and `total_count = n` the source yields ids `s+1 ..= n`.
//! Ids are requested in pages of at most `PAGE_SIZE`; the page is only fetched when the
//! previous one has been drained.

use crate::domain::{DomainError, MessageView};
use crate::ports::TgGateway;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tracing::debug;

/// Platform limit for a single get-messages-by-id request.
pub const PAGE_SIZE: i32 = 200;

pub struct MessageSource {
    tg: Arc<dyn TgGateway>,
    chat_id: i64,
    total_count: i32,
    /// Next id to request from the platform, `None` once every id has been requested.
    next_id: Option<i32>,
    buffer: VecDeque<MessageView>,
}

impl MessageSource {
    pub fn new(tg: Arc<dyn TgGateway>, chat_id: i64, total_count: i32, skip_offset: i32) -> Self {
        Self {
            tg,
            chat_id,
            total_count,
            next_id: skip_offset.max(0).checked_add(1),
            buffer: VecDeque::new(),
        }
    }

    /// Next message in ascending id order, `None` once the window is exhausted.
    ///
    /// A failed page fetch is returned as-is; the source must not be polled again after an error.
    pub async fn next(&mut self) -> Result<Option<MessageView>, DomainError> {
        if self.buffer.is_empty() {
            self.fill().await?;
        }
        Ok(self.buffer.pop_front())
    }

    async fn fill(&mut self) -> Result<(), DomainError> {
        let Some(first) = self.next_id.filter(|id| *id <= self.total_count) else {
            return Ok(());
        };
        let last = first.saturating_add(PAGE_SIZE - 1).min(self.total_count);
        let ids: Vec<i32> = (first..=last).collect();

        debug!(
            chat_id = self.chat_id,
            first,
            last,
            "fetching message page"
        );
        let page = self.tg.fetch_range(self.chat_id, &ids).await?;

        let mut by_id: HashMap<i32, MessageView> = page
            .into_iter()
            .filter(|m| m.id >= first && m.id <= last)
            .map(|m| (m.id, m))
            .collect();
        self.buffer.extend(
            ids.into_iter()
                .map(|id| by_id.remove(&id).unwrap_or_else(|| MessageView::deleted(id))),
        );
        self.next_id = last.checked_add(1);
        Ok(())
    }
}
