//! Implements TgGateway using grammers Client.
//!
//! Fetch uses raw `GetMessages` by id and sleeps through FloodWait itself.
//! Send and copy never retry: a 420 is surfaced as `DomainError::FloodWait` for the sender.

use crate::adapters::telegram::mapper;
use crate::domain::{Chat, DomainError, MediaKind, MessageView};
use crate::ports::TgGateway;
use async_trait::async_trait;
use grammers_client::Client;
use grammers_client::InputMessage;
use grammers_client::InvocationError;
use grammers_client::session::defs::PeerRef;
use grammers_client::tl;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Attempts per fetch page before giving up on repeated FloodWait.
const FETCH_ATTEMPTS: u32 = 3;

/// Telegram gateway adapter. Wraps a grammers Client (clone shared with the auth adapter).
pub struct GrammersTgGateway {
    client: Client,
    /// Resolved peers by bot-API chat id, so iter_dialogs runs once per chat.
    peer_cache: Mutex<HashMap<i64, PeerRef>>,
}

fn map_invocation(e: InvocationError) -> DomainError {
    match e {
        InvocationError::Rpc(rpc) if rpc.code == 420 => DomainError::FloodWait {
            seconds: rpc.value.unwrap_or(60) as u64,
        },
        other => DomainError::TgGateway(other.to_string()),
    }
}

impl GrammersTgGateway {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            peer_cache: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve chat_id to a PeerRef, walking dialogs only on a cache miss.
    async fn resolve_peer(&self, chat_id: i64) -> Result<PeerRef, DomainError> {
        if let Some(peer) = self.peer_cache.lock().await.get(&chat_id) {
            return Ok(peer.clone());
        }
        let mut dialogs = self.client.iter_dialogs();
        let mut found = None;
        while let Some(dialog) = dialogs
            .next()
            .await
            .map_err(|e| DomainError::TgGateway(e.to_string()))?
        {
            let p = dialog.peer();
            if p.id().bot_api_dialog_id() == chat_id {
                found = Some(p.clone());
                break;
            }
        }
        let peer = found.ok_or_else(|| {
            DomainError::TgGateway(format!("peer {} not found in dialogs", chat_id))
        })?;
        let peer_ref = peer
            .to_ref()
            .await
            .ok_or_else(|| DomainError::TgGateway("peer not in session cache".into()))?;
        self.peer_cache
            .lock()
            .await
            .insert(chat_id, peer_ref.clone());
        Ok(peer_ref)
    }

    /// Raw GetMessages for the given ids (channels and basic chats use different calls).
    async fn get_raw_messages(
        &self,
        input_peer: &tl::enums::InputPeer,
        ids: &[i32],
    ) -> Result<Vec<tl::enums::Message>, InvocationError> {
        use tl::enums::messages::Messages;

        let id: Vec<tl::enums::InputMessage> = ids
            .iter()
            .map(|&id| tl::enums::InputMessage::Id(tl::types::InputMessageId { id }))
            .collect();
        let raw = match input_peer {
            tl::enums::InputPeer::Channel(c) => {
                let channel = tl::enums::InputChannel::Channel(tl::types::InputChannel {
                    channel_id: c.channel_id,
                    access_hash: c.access_hash,
                });
                self.client
                    .invoke(&tl::functions::channels::GetMessages { channel, id })
                    .await?
            }
            _ => {
                self.client
                    .invoke(&tl::functions::messages::GetMessages { id })
                    .await?
            }
        };
        Ok(match raw {
            Messages::Messages(m) => m.messages,
            Messages::Slice(m) => m.messages,
            Messages::ChannelMessages(m) => m.messages,
            Messages::NotModified(_) => vec![],
        })
    }

    /// Load one message with its media, for re-sending.
    async fn load_message(
        &self,
        chat_id: i64,
        msg_id: i32,
    ) -> Result<grammers_client::message::Message, DomainError> {
        let peer_ref = self.resolve_peer(chat_id).await?;
        let messages = self
            .client
            .get_messages_by_id(peer_ref, &[msg_id])
            .await
            .map_err(map_invocation)?;
        messages.into_iter().next().flatten().ok_or_else(|| {
            DomainError::TgGateway(format!("message {} not found in {}", msg_id, chat_id))
        })
    }

    async fn send(&self, target_chat: i64, message: InputMessage) -> Result<(), DomainError> {
        let target = self.resolve_peer(target_chat).await?;
        self.client
            .send_message(target, message)
            .await
            .map_err(map_invocation)?;
        Ok(())
    }
}

fn outgoing(caption: Option<&str>) -> InputMessage {
    InputMessage::new().markdown(caption.unwrap_or_default())
}

/// Text part of a copied message.
enum CopyBody<'a> {
    /// Caption built by the job, rendered as markdown.
    Caption(&'a str),
    /// Source text with its own formatting entities, sent as-is.
    Verbatim {
        text: &'a str,
        entities: Option<&'a [tl::enums::MessageEntity]>,
    },
}

impl<'a> CopyBody<'a> {
    fn pick(
        caption: Option<&'a str>,
        text: &'a str,
        entities: Option<&'a [tl::enums::MessageEntity]>,
    ) -> Self {
        match caption {
            Some(caption) => CopyBody::Caption(caption),
            None => CopyBody::Verbatim { text, entities },
        }
    }

    fn into_message(self) -> InputMessage {
        match self {
            CopyBody::Caption(caption) => outgoing(Some(caption)),
            CopyBody::Verbatim { text, entities } => {
                let message = InputMessage::new().text(text);
                match entities {
                    Some(entities) => message.fmt_entities(entities.to_vec()),
                    None => message,
                }
            }
        }
    }
}

/// Wait before the next fetch attempt, `None` when the error should be returned now.
fn fetch_retry_wait(err: &DomainError, attempt: u32) -> Option<u64> {
    if attempt >= FETCH_ATTEMPTS {
        return None;
    }
    err.flood_wait_secs()
}

#[async_trait]
impl TgGateway for GrammersTgGateway {
    async fn get_dialogs(&self) -> Result<Vec<Chat>, DomainError> {
        let mut dialogs = self.client.iter_dialogs();
        let mut chats = Vec::new();
        while let Some(dialog) = dialogs
            .next()
            .await
            .map_err(|e| DomainError::TgGateway(e.to_string()))?
        {
            let peer = dialog.peer();
            let id = peer.id().bot_api_dialog_id();
            let title = peer
                .name()
                .map(String::from)
                .unwrap_or_else(|| peer.id().to_string());
            chats.push(Chat {
                id,
                title,
                username: peer.username().map(String::from),
                kind: mapper::chat_type_from_peer(peer),
            });
        }
        Ok(chats)
    }

    async fn get_me_id(&self) -> Result<i64, DomainError> {
        let me = self
            .client
            .get_me()
            .await
            .map_err(|e| DomainError::TgGateway(e.to_string()))?;
        Ok(me.id().bot_api_dialog_id())
    }

    async fn fetch_range(
        &self,
        chat_id: i64,
        ids: &[i32],
    ) -> Result<Vec<MessageView>, DomainError> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        let input_peer: tl::enums::InputPeer = self.resolve_peer(chat_id).await?.into();

        let mut attempt = 1;
        loop {
            let err = match self.get_raw_messages(&input_peer, ids).await {
                Ok(raw) => {
                    let mut out: Vec<MessageView> = raw
                        .iter()
                        .map(|m| mapper::message_to_view(m, chat_id))
                        .collect();
                    out.sort_by_key(|m| m.id);
                    debug!(chat_id, requested = ids.len(), returned = out.len(), "page fetched");
                    return Ok(out);
                }
                Err(e) => map_invocation(e),
            };
            let Some(wait_secs) = fetch_retry_wait(&err, attempt) else {
                return Err(err);
            };
            warn!(chat_id, attempt, wait_secs, "FloodWait on fetch, sleeping");
            tokio::time::sleep(Duration::from_secs(wait_secs)).await;
            attempt += 1;
        }
    }

    async fn send_cached_media(
        &self,
        target_chat: i64,
        file_reference: &str,
        caption: Option<&str>,
    ) -> Result<(), DomainError> {
        let (source_chat, msg_id) = mapper::parse_file_reference(file_reference).ok_or_else(|| {
            DomainError::TgGateway(format!("malformed file reference {:?}", file_reference))
        })?;
        let source = self.load_message(source_chat, msg_id).await?;
        let media = source.media().ok_or_else(|| {
            DomainError::TgGateway(format!("message {} has no media", msg_id))
        })?;
        self.send(target_chat, outgoing(caption).copy_media(&media))
            .await
    }

    async fn copy_message(
        &self,
        target_chat: i64,
        source_chat: i64,
        message_id: i32,
        caption: Option<&str>,
    ) -> Result<(), DomainError> {
        let source = self.load_message(source_chat, message_id).await?;
        let mut message =
            CopyBody::pick(caption, source.text(), source.fmt_entities().map(|e| &e[..]))
                .into_message();
        if let Some(media) = source.media() {
            message = message.copy_media(&media);
        }
        self.send(target_chat, message).await
    }

    async fn search_messages(
        &self,
        chat_id: i64,
        query: &str,
        filter: Option<MediaKind>,
        limit: i32,
    ) -> Result<Vec<MessageView>, DomainError> {
        let peer_ref = self.resolve_peer(chat_id).await?;
        let mut hits = self
            .client
            .search_messages(peer_ref)
            .query(query)
            .limit(limit.max(1) as usize);
        let mut ids = Vec::new();
        while let Some(msg) = hits.next().await.map_err(map_invocation)? {
            ids.push(msg.id());
        }

        // Re-read hits through the raw mapper to get kind and filename.
        let views = self.fetch_range(chat_id, &ids).await?;
        Ok(views
            .into_iter()
            .filter(|v| filter.is_none() || v.media_kind == filter)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copy_without_caption_keeps_source_text() {
        let italic = tl::enums::MessageEntity::Italic(tl::types::MessageEntityItalic {
            offset: 0,
            length: 3,
        });
        let entities = [italic];
        let body = CopyBody::pick(None, "use my_var_name here", Some(&entities[..]));
        assert!(matches!(
            body,
            CopyBody::Verbatim { text: "use my_var_name here", entities: Some(e) } if e.len() == 1
        ));

        let body = CopyBody::pick(Some("**Dune (2021)**"), "use my_var_name here", None);
        assert!(matches!(body, CopyBody::Caption("**Dune (2021)**")));
    }

    #[test]
    fn fetch_flood_wait_is_retried_except_on_last_attempt() {
        let flood = DomainError::FloodWait { seconds: 9 };
        assert_eq!(fetch_retry_wait(&flood, 1), Some(9));
        assert_eq!(fetch_retry_wait(&flood, FETCH_ATTEMPTS - 1), Some(9));
        assert_eq!(fetch_retry_wait(&flood, FETCH_ATTEMPTS), None);

        let other = DomainError::TgGateway("CHANNEL_PRIVATE".into());
        assert_eq!(fetch_retry_wait(&other, 1), None);
    }
}
