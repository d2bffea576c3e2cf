//! In-memory port implementations for unit tests.

use crate::domain::{
    Category, Chat, ChatType, DomainError, JobReport, MediaKind, MessageView, ProgressSnapshot,
};
use crate::ports::{MetadataPort, ProgressSink, TgGateway};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Cached {
        target: i64,
        file_reference: String,
        caption: Option<String>,
    },
    Copied {
        target: i64,
        source: i64,
        message_id: i32,
    },
}

/// Scripted gateway: serves a fixed set of source messages and records every send.
#[derive(Default)]
pub struct FakeGateway {
    messages: HashMap<i32, MessageView>,
    fetch_fails_at: Option<i32>,
    send_script: Mutex<VecDeque<Result<(), DomainError>>>,
    search_results: HashMap<i64, Vec<MessageView>>,
    search_fails: bool,
    cancel_after_sends: Option<(usize, CancellationToken)>,
    pub fetch_calls: Mutex<Vec<Vec<i32>>>,
    pub sent: Mutex<Vec<Sent>>,
    pub send_attempts: AtomicUsize,
    pub search_calls: AtomicUsize,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_messages(mut self, messages: impl IntoIterator<Item = MessageView>) -> Self {
        for m in messages {
            self.messages.insert(m.id, m);
        }
        self
    }

    pub fn failing_fetch_at(mut self, id: i32) -> Self {
        self.fetch_fails_at = Some(id);
        self
    }

    /// Responses consumed by successive send attempts; `Ok` once exhausted.
    pub fn with_send_script(self, script: Vec<Result<(), DomainError>>) -> Self {
        *self.send_script.lock().unwrap() = script.into();
        self
    }

    pub fn with_search_results(mut self, chat_id: i64, results: Vec<MessageView>) -> Self {
        self.search_results.insert(chat_id, results);
        self
    }

    pub fn failing_search(mut self) -> Self {
        self.search_fails = true;
        self
    }

    /// Trips `token` once `n` sends have succeeded.
    pub fn cancel_after_sends(mut self, n: usize, token: CancellationToken) -> Self {
        self.cancel_after_sends = Some((n, token));
        self
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    fn next_send_result(&self) -> Result<(), DomainError> {
        self.send_attempts.fetch_add(1, Ordering::SeqCst);
        self.send_script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(()))
    }

    fn record(&self, sent: Sent) {
        let mut log = self.sent.lock().unwrap();
        log.push(sent);
        if let Some((n, token)) = &self.cancel_after_sends {
            if log.len() >= *n {
                token.cancel();
            }
        }
    }
}

#[async_trait::async_trait]
impl TgGateway for FakeGateway {
    async fn get_dialogs(&self) -> Result<Vec<Chat>, DomainError> {
        Ok(vec![Chat {
            id: -100,
            title: "source".into(),
            username: None,
            kind: ChatType::Channel,
        }])
    }

    async fn get_me_id(&self) -> Result<i64, DomainError> {
        Ok(42)
    }

    async fn fetch_range(
        &self,
        _chat_id: i64,
        ids: &[i32],
    ) -> Result<Vec<MessageView>, DomainError> {
        self.fetch_calls.lock().unwrap().push(ids.to_vec());
        if let Some(bad) = self.fetch_fails_at {
            if ids.contains(&bad) {
                return Err(DomainError::TgGateway("CHANNEL_PRIVATE".into()));
            }
        }
        Ok(ids
            .iter()
            .filter_map(|id| self.messages.get(id).cloned())
            .collect())
    }

    async fn send_cached_media(
        &self,
        target_chat: i64,
        file_reference: &str,
        caption: Option<&str>,
    ) -> Result<(), DomainError> {
        self.next_send_result()?;
        self.record(Sent::Cached {
            target: target_chat,
            file_reference: file_reference.to_string(),
            caption: caption.map(String::from),
        });
        Ok(())
    }

    async fn copy_message(
        &self,
        target_chat: i64,
        source_chat: i64,
        message_id: i32,
        _caption: Option<&str>,
    ) -> Result<(), DomainError> {
        self.next_send_result()?;
        self.record(Sent::Copied {
            target: target_chat,
            source: source_chat,
            message_id,
        });
        Ok(())
    }

    async fn search_messages(
        &self,
        chat_id: i64,
        _query: &str,
        filter: Option<MediaKind>,
        _limit: i32,
    ) -> Result<Vec<MessageView>, DomainError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        if self.search_fails {
            return Err(DomainError::TgGateway("SEARCH_QUERY_EMPTY".into()));
        }
        Ok(self
            .search_results
            .get(&chat_id)
            .map(|hits| {
                hits.iter()
                    .filter(|m| filter.is_none() || m.media_kind == filter)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

/// Progress sink that keeps everything it is told.
#[derive(Default)]
pub struct RecordingSink {
    pub snapshots: Mutex<Vec<ProgressSnapshot>>,
    pub reports: Mutex<Vec<JobReport>>,
}

#[async_trait::async_trait]
impl ProgressSink for RecordingSink {
    async fn on_progress(&self, snapshot: &ProgressSnapshot) {
        self.snapshots.lock().unwrap().push(*snapshot);
    }

    async fn on_finish(&self, report: &JobReport) {
        self.reports.lock().unwrap().push(report.clone());
    }
}

/// Metadata source answering from a fixed table.
#[derive(Default)]
pub struct FakeMetadata {
    years: HashMap<String, u16>,
    pub lookups: AtomicUsize,
}

impl FakeMetadata {
    pub fn with_year(mut self, title: &str, year: u16) -> Self {
        self.years.insert(title.to_lowercase(), year);
        self
    }
}

#[async_trait::async_trait]
impl MetadataPort for FakeMetadata {
    async fn lookup_year(
        &self,
        title: &str,
        _kind: Category,
        _season: Option<u16>,
    ) -> Result<Option<u16>, DomainError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.years.get(&title.to_lowercase()).copied())
    }
}

pub fn media(id: i32, kind: MediaKind, caption: Option<&str>, filename: Option<&str>) -> MessageView {
    MessageView {
        id,
        is_empty: false,
        media_kind: Some(kind),
        caption: caption.map(String::from),
        file_reference: Some(format!("-100:{id}")),
        source_filename: filename.map(String::from),
        file_size: Some(1_400_000_000),
    }
}

pub fn text(id: i32, body: &str) -> MessageView {
    MessageView {
        id,
        caption: Some(body.to_string()),
        ..MessageView::default()
    }
}
