//! One logical send with a single FloodWait retry.
//!
//! On the first FloodWait the task sleeps for the requested time and tries once more.
//! A second FloodWait, or any other error, is returned to the job, which stops.

use crate::domain::DomainError;
use crate::ports::TgGateway;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// What to send to the target chat.
#[derive(Debug, Clone, Copy)]
pub enum SendOp<'a> {
    CachedMedia {
        file_reference: &'a str,
        caption: Option<&'a str>,
    },
    Copy {
        source_chat: i64,
        message_id: i32,
        caption: Option<&'a str>,
    },
}

/// Result of a successful send.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SendOutcome {
    /// FloodWait absorbed before the successful retry.
    pub waited_secs: Option<u64>,
}

pub struct RateLimitedSender {
    tg: Arc<dyn TgGateway>,
}

impl RateLimitedSender {
    pub fn new(tg: Arc<dyn TgGateway>) -> Self {
        Self { tg }
    }

    pub async fn send(&self, target_chat: i64, op: SendOp<'_>) -> Result<SendOutcome, DomainError> {
        match self.attempt(target_chat, op).await {
            Ok(()) => Ok(SendOutcome::default()),
            Err(DomainError::FloodWait { seconds }) => {
                warn!(target_chat, wait_secs = seconds, "FloodWait on send, sleeping before retry");
                tokio::time::sleep(Duration::from_secs(seconds)).await;
                self.attempt(target_chat, op).await?;
                Ok(SendOutcome {
                    waited_secs: Some(seconds),
                })
            }
            Err(e) => Err(e),
        }
    }

    async fn attempt(&self, target_chat: i64, op: SendOp<'_>) -> Result<(), DomainError> {
        match op {
            SendOp::CachedMedia {
                file_reference,
                caption,
            } => {
                self.tg
                    .send_cached_media(target_chat, file_reference, caption)
                    .await
            }
            SendOp::Copy {
                source_chat,
                message_id,
                caption,
            } => {
                self.tg
                    .copy_message(target_chat, source_chat, message_id, caption)
                    .await
            }
        }
    }
}
