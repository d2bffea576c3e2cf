//! Application use cases. Orchestrate domain logic via ports.

pub mod auth_service;
pub mod caption;
pub mod duplicate_index;
pub mod forward_job;
pub mod forward_service;
pub mod job_registry;
pub mod message_source;
pub mod policy;
pub mod rate_limited_sender;

#[cfg(test)]
pub mod fakes;

pub use auth_service::AuthService;
pub use caption::CaptionFormatter;
pub use duplicate_index::DuplicateIndex;
pub use forward_job::{ForwardJob, JobDeps, JobRequest};
pub use forward_service::{ForwardService, JobHandle};
pub use job_registry::{JobLease, JobRegistry};
pub use message_source::MessageSource;
pub use rate_limited_sender::{RateLimitedSender, SendOp, SendOutcome};
