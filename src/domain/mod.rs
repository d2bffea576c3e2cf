//! Core domain layer. No external I/O dependencies.
//!
//! Entities and business rules live here. Dependencies flow inward.

pub mod entities;
pub mod errors;

pub use entities::{
    Category, Chat, ChatType, Classification, EpisodeRange, JobCounters, JobOptions, JobReport,
    JobState, MediaKind, MessageView, ProgressSnapshot, SignInResult, UserPreferences,
};
pub use errors::DomainError;
