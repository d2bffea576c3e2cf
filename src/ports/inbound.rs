//! Inbound port. UI (adapter) calls into the application.

use crate::domain::DomainError;

/// Input port: UI/CLI invokes application use cases.
#[async_trait::async_trait]
pub trait InputPort: Send + Sync {
    /// Run the interactive forward flow (pick chats, options, start and watch the job).
    async fn run(&self) -> Result<(), DomainError>;
}

/// Prompts needed by the login flow. Implemented by the TUI.
pub trait AuthPrompt: Send + Sync {
    fn ask_phone(&self) -> Result<String, DomainError>;

    fn ask_code(&self) -> Result<String, DomainError>;

    fn ask_password(&self, hint: Option<&str>) -> Result<String, DomainError>;
}
