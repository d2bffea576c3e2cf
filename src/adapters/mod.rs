//! Infrastructure adapters. Implement outbound ports.
//!
//! Telegram, classification, metadata, persistence, terminal UI. Map errors to DomainError.

pub mod classify;
pub mod metadata;
pub mod persistence;
pub mod telegram;
pub mod ui;
