//! Outbound ports. Application calls into infrastructure.
//!
//! Implemented by adapters.

use crate::domain::{
    Category, Chat, Classification, DomainError, JobReport, MediaKind, MessageView,
    ProgressSnapshot, SignInResult, UserPreferences,
};

/// Telegram API gateway. Fetch, send, copy and search messages.
///
/// Send and copy must NOT retry on FloodWait themselves: they return
/// `DomainError::FloodWait` and leave the retry policy to the caller.
#[async_trait::async_trait]
pub trait TgGateway: Send + Sync {
    /// Fetch all dialogs (chats) the user participates in.
    async fn get_dialogs(&self) -> Result<Vec<Chat>, DomainError>;

    /// Id of the logged-in account.
    async fn get_me_id(&self) -> Result<i64, DomainError>;

    /// Fetch messages by id (at most 200 per call). The result is in ascending id
    /// order; ids the platform no longer has come back as tombstones.
    async fn fetch_range(&self, chat_id: i64, ids: &[i32])
    -> Result<Vec<MessageView>, DomainError>;

    /// Re-send media by its cached file reference (no re-upload).
    async fn send_cached_media(
        &self,
        target_chat: i64,
        file_reference: &str,
        caption: Option<&str>,
    ) -> Result<(), DomainError>;

    /// Copy a whole message without the "forwarded from" header.
    async fn copy_message(
        &self,
        target_chat: i64,
        source_chat: i64,
        message_id: i32,
        caption: Option<&str>,
    ) -> Result<(), DomainError>;

    /// Search a chat for messages matching `query`, optionally restricted to one media kind.
    async fn search_messages(
        &self,
        chat_id: i64,
        query: &str,
        filter: Option<MediaKind>,
        limit: i32,
    ) -> Result<Vec<MessageView>, DomainError>;
}

/// Title classifier. Decides movie vs. series and extracts release tags.
pub trait ClassifierPort: Send + Sync {
    fn classify_title(&self, text: &str) -> Result<Classification, DomainError>;
}

/// Release-year lookup for caption enrichment.
#[async_trait::async_trait]
pub trait MetadataPort: Send + Sync {
    /// Returns `Ok(None)` when the title is unknown.
    async fn lookup_year(
        &self,
        title: &str,
        kind: Category,
        season: Option<u16>,
    ) -> Result<Option<u16>, DomainError>;
}

/// Persistent cache of looked-up release years.
#[async_trait::async_trait]
pub trait MetadataCachePort: Send + Sync {
    async fn get_year(
        &self,
        title: &str,
        kind: Category,
        season: Option<u16>,
    ) -> Result<Option<u16>, DomainError>;

    async fn save_year(
        &self,
        title: &str,
        kind: Category,
        season: Option<u16>,
        year: u16,
    ) -> Result<(), DomainError>;
}

/// Progress reporting for a running job.
#[async_trait::async_trait]
pub trait ProgressSink: Send + Sync {
    /// Called every 20 processed messages.
    async fn on_progress(&self, snapshot: &ProgressSnapshot);

    /// Called exactly once when the job reaches a terminal state.
    async fn on_finish(&self, report: &JobReport);
}

/// Remembered front-end defaults per owner.
#[async_trait::async_trait]
pub trait PreferencesPort: Send + Sync {
    async fn get(&self, owner: i64) -> Result<UserPreferences, DomainError>;

    async fn set(&self, owner: i64, prefs: UserPreferences) -> Result<(), DomainError>;
}

/// Login flow against the platform.
#[async_trait::async_trait]
pub trait AuthPort: Send + Sync {
    async fn is_authenticated(&self) -> Result<bool, DomainError>;

    async fn request_login_code(&self, phone: &str, api_hash: &str) -> Result<(), DomainError>;

    async fn sign_in(&self, code: &str) -> Result<SignInResult, DomainError>;

    async fn check_password(&self, password: &[u8]) -> Result<(), DomainError>;
}
