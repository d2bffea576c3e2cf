//! Implements AuthPort using grammers Client.
//!
//! Holds a client clone (same session as the gateway). Keeps the login token and the
//! password token between calls of the flow. Login codes are accepted as pasted from the
//! official apps ("12 345", "12-345").

use crate::domain::{DomainError, SignInResult};
use crate::ports::AuthPort;
use async_trait::async_trait;
use grammers_client::Client;
use grammers_client::client::{LoginToken, PasswordToken};
use tokio::sync::Mutex;
use tracing::{info, warn};

pub struct GrammersAuthAdapter {
    client: Client,
    /// Set by request_login_code; consumed by sign_in.
    login_token: Mutex<Option<LoginToken>>,
    /// Set when sign_in answers PasswordRequired; consumed by check_password.
    password_token: Mutex<Option<PasswordToken>>,
}

/// Digits of a login code, separators dropped.
fn normalize_code(code: &str) -> Result<String, DomainError> {
    let digits: String = code.chars().filter(|c| !c.is_whitespace() && *c != '-').collect();
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(DomainError::Auth(format!("login code {:?} is not numeric", code)));
    }
    Ok(digits)
}

impl GrammersAuthAdapter {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            login_token: Mutex::new(None),
            password_token: Mutex::new(None),
        }
    }
}

#[async_trait]
impl AuthPort for GrammersAuthAdapter {
    async fn is_authenticated(&self) -> Result<bool, DomainError> {
        self.client
            .is_authorized()
            .await
            .map_err(|e| DomainError::Auth(e.to_string()))
    }

    async fn request_login_code(&self, phone: &str, api_hash: &str) -> Result<(), DomainError> {
        let token = self
            .client
            .request_login_code(phone, api_hash)
            .await
            .map_err(|e| DomainError::Auth(format!("request login code: {}", e)))?;
        *self.login_token.lock().await = Some(token);
        *self.password_token.lock().await = None;
        info!("login code sent");
        Ok(())
    }

    async fn sign_in(&self, code: &str) -> Result<SignInResult, DomainError> {
        let code = normalize_code(code)?;
        let token = self
            .login_token
            .lock()
            .await
            .take()
            .ok_or_else(|| DomainError::Auth("no login code was requested".into()))?;
        match self.client.sign_in(&token, &code).await {
            Ok(user) => {
                info!(account = user.id().bot_api_dialog_id(), "signed in");
                Ok(SignInResult::Success)
            }
            Err(grammers_client::SignInError::PasswordRequired(pt)) => {
                let hint = pt.hint().map(String::from);
                *self.password_token.lock().await = Some(pt);
                Ok(SignInResult::PasswordRequired { hint })
            }
            Err(grammers_client::SignInError::InvalidCode) => {
                warn!("login code rejected");
                Err(DomainError::Auth("invalid login code".into()))
            }
            Err(grammers_client::SignInError::SignUpRequired) => Err(DomainError::Auth(
                "no account for this number; sign up with an official app first".into(),
            )),
            Err(e) => Err(DomainError::Auth(format!("sign in: {}", e))),
        }
    }

    async fn check_password(&self, password: &[u8]) -> Result<(), DomainError> {
        let pt = self
            .password_token
            .lock()
            .await
            .take()
            .ok_or_else(|| DomainError::Auth("no password was requested".into()))?;
        self.client
            .check_password(pt, password)
            .await
            .map_err(|e| DomainError::Auth(format!("check password: {}", e)))?;
        Ok(())
    }
}
