//! Login / 2FA flow. Talks to the platform through AuthPort and to the user through AuthPrompt.

use crate::domain::{DomainError, SignInResult};
use crate::ports::{AuthPort, AuthPrompt};
use std::sync::Arc;
use tracing::info;

pub struct AuthService {
    auth: Arc<dyn AuthPort>,
    api_hash: String,
}

impl AuthService {
    pub fn new(auth: Arc<dyn AuthPort>, api_hash: String) -> Self {
        Self { auth, api_hash }
    }

    pub async fn is_authenticated(&self) -> Result<bool, DomainError> {
        self.auth.is_authenticated().await
    }

    /// Run the full flow (phone -> code -> 2FA password if needed).
    /// Returns immediately when the session is already authorized.
    pub async fn run_auth_flow(&self, prompt: &dyn AuthPrompt) -> Result<(), DomainError> {
        if self.auth.is_authenticated().await? {
            info!("session already authorized");
            return Ok(());
        }

        let phone = prompt.ask_phone()?;
        let phone = phone.trim();
        if phone.is_empty() {
            return Err(DomainError::Auth("phone number is required".into()));
        }
        self.auth.request_login_code(phone, &self.api_hash).await?;
        info!("login code requested");

        let code = prompt.ask_code()?;
        match self.auth.sign_in(code.trim()).await? {
            SignInResult::Success => {}
            SignInResult::PasswordRequired { hint } => {
                info!("two-step verification enabled");
                let password = prompt.ask_password(hint.as_deref())?;
                self.auth.check_password(password.as_bytes()).await?;
            }
        }
        info!("signed in");
        Ok(())
    }
}
