//! tg-relay: bulk forwarding of a message-id range between Telegram chats, with
//! movie/series classification, duplicate suppression and FloodWait-aware delivery.
//! Hexagonal layout: domain, ports, use cases, adapters.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod shared;
pub mod usecases;
