//! Map Grammers types to domain entities.
//!
//! Extracts Chat and MessageView from grammers_client tl types.

use crate::domain::{ChatType, MediaKind, MessageView};
use grammers_client::peer::Peer;
use grammers_client::tl;

/// Map a grammers Peer to domain ChatType.
///
/// * `Peer::User` → Private (DM).
/// * `Peer::Group` → Group or Supergroup (Supergroup when megagroup).
/// * `Peer::Channel` → Channel (broadcast).
pub fn chat_type_from_peer(peer: &Peer) -> ChatType {
    match peer {
        Peer::User(_) => ChatType::Private,
        Peer::Group(g) => {
            if g.is_megagroup() {
                ChatType::Supergroup
            } else {
                ChatType::Group
            }
        }
        Peer::Channel(_) => ChatType::Channel,
    }
}

/// Opaque media handle: `"<chat_id>:<message_id>"`. Resolved back by the gateway on send.
pub fn file_reference(chat_id: i64, msg_id: i32) -> String {
    format!("{}:{}", chat_id, msg_id)
}

/// Inverse of [`file_reference`].
pub fn parse_file_reference(s: &str) -> Option<(i64, i32)> {
    let (chat, msg) = s.rsplit_once(':')?;
    Some((chat.parse().ok()?, msg.parse().ok()?))
}

pub fn message_id(msg: &tl::enums::Message) -> i32 {
    match msg {
        tl::enums::Message::Empty(m) => m.id,
        tl::enums::Message::Message(m) => m.id,
        tl::enums::Message::Service(m) => m.id,
    }
}

/// Map a raw message to the view the forwarding pipeline works on.
///
/// * `Empty` → tombstone.
/// * `Service` (joins, pins, …) → no media, no caption.
/// * Link previews count as text.
pub fn message_to_view(msg: &tl::enums::Message, chat_id: i64) -> MessageView {
    let m = match msg {
        tl::enums::Message::Empty(e) => return MessageView::deleted(e.id),
        tl::enums::Message::Service(s) => {
            return MessageView {
                id: s.id,
                ..MessageView::default()
            };
        }
        tl::enums::Message::Message(m) => m,
    };

    let caption = Some(m.message.clone()).filter(|t| !t.trim().is_empty());
    let media = m.media.as_ref().and_then(media_info);
    match media {
        Some(info) => MessageView {
            id: m.id,
            is_empty: false,
            media_kind: Some(info.kind),
            caption,
            file_reference: Some(file_reference(chat_id, m.id)),
            source_filename: info.filename,
            file_size: info.size,
        },
        None => MessageView {
            id: m.id,
            caption,
            ..MessageView::default()
        },
    }
}

struct MediaInfo {
    kind: MediaKind,
    filename: Option<String>,
    size: Option<u64>,
}

fn media_info(media: &tl::enums::MessageMedia) -> Option<MediaInfo> {
    match media {
        tl::enums::MessageMedia::Photo(_) => Some(MediaInfo {
            kind: MediaKind::Photo,
            filename: None,
            size: None,
        }),
        tl::enums::MessageMedia::Document(d) => match d.document.as_ref() {
            Some(tl::enums::Document::Document(doc)) => Some(document_info(doc)),
            _ => Some(MediaInfo {
                kind: MediaKind::Document,
                filename: None,
                size: None,
            }),
        },
        tl::enums::MessageMedia::Empty | tl::enums::MessageMedia::WebPage(_) => None,
        _ => Some(MediaInfo {
            kind: MediaKind::Other,
            filename: None,
            size: None,
        }),
    }
}

fn document_info(doc: &tl::types::Document) -> MediaInfo {
    let mut filename = None;
    let mut kind = None;
    for attr in &doc.attributes {
        match attr {
            tl::enums::DocumentAttribute::Filename(f) => filename = Some(f.file_name.clone()),
            tl::enums::DocumentAttribute::Sticker(_) => kind = Some(MediaKind::Sticker),
            tl::enums::DocumentAttribute::Video(_) if kind.is_none() => {
                kind = Some(MediaKind::Video)
            }
            tl::enums::DocumentAttribute::Audio(_) if kind.is_none() => {
                kind = Some(MediaKind::Audio)
            }
            _ => {}
        }
    }
    let kind = kind.unwrap_or_else(|| kind_from_mime(&doc.mime_type));
    MediaInfo {
        kind,
        filename,
        size: u64::try_from(doc.size).ok(),
    }
}

pub fn kind_from_mime(mime: &str) -> MediaKind {
    if mime.starts_with("video/") {
        MediaKind::Video
    } else if mime.starts_with("audio/") {
        MediaKind::Audio
    } else if mime == "application/x-tgsticker" || mime == "image/webp" {
        MediaKind::Sticker
    } else {
        MediaKind::Document
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_reference_round_trips_negative_ids() {
        let r = file_reference(-1001234567890, 42);
        assert_eq!(r, "-1001234567890:42");
        assert_eq!(parse_file_reference(&r), Some((-1001234567890, 42)));
        assert_eq!(parse_file_reference("nope"), None);
        assert_eq!(parse_file_reference("-100:x"), None);
    }

    #[test]
    fn mime_types_map_to_kinds() {
        assert_eq!(kind_from_mime("video/x-matroska"), MediaKind::Video);
        assert_eq!(kind_from_mime("audio/mpeg"), MediaKind::Audio);
        assert_eq!(kind_from_mime("application/x-tgsticker"), MediaKind::Sticker);
        assert_eq!(kind_from_mime("application/zip"), MediaKind::Document);
    }
}
