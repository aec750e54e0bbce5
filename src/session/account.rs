//! Unauthenticated account operations: registration and password recovery.
//!
//! None of these touch the current session, and a 401 here never triggers
//! a teardown.

use super::SessionStore;
use crate::api::{
    Credentials, ForgotPasswordRequest, RegisterResponse, ResetPasswordRequest,
};
use crate::error::{ClientError, Result, SERVER_FALLBACK, ValidationError, validate_new_password};

const RESET_LINK_SENT: &str = "A password reset link has been sent.";
const PASSWORD_CHANGED: &str = "Your password has been changed.";

impl SessionStore {
    /// Create an account. Does not sign in.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        confirm: &str,
    ) -> Result<RegisterResponse> {
        let email = require_email(email)?;
        validate_new_password(password, confirm)?;

        let credentials = Credentials {
            email,
            password: password.to_string(),
        };
        let response = self
            .inner
            .backend
            .register(&credentials)
            .await
            .map_err(|err| ClientError::from_account_api(&err, SERVER_FALLBACK))?;

        tracing::info!(name: "account.registered", "Account registered");
        Ok(response)
    }

    /// Ask the backend to email a reset link. Returns the confirmation text.
    pub async fn forgot_password(&self, email: &str) -> Result<String> {
        let email = require_email(email)?;
        let response = self
            .inner
            .backend
            .forgot_password(&ForgotPasswordRequest { email })
            .await
            .map_err(|err| ClientError::from_account_api(&err, SERVER_FALLBACK))?;

        Ok(response
            .message
            .unwrap_or_else(|| RESET_LINK_SENT.to_string()))
    }

    /// Set a new password using the token from the reset link.
    pub async fn reset_password(
        &self,
        token: &str,
        new_password: &str,
        confirm: &str,
    ) -> Result<String> {
        validate_new_password(new_password, confirm)?;

        let request = ResetPasswordRequest {
            token: token.to_string(),
            new_password: new_password.to_string(),
        };
        let response = self
            .inner
            .backend
            .reset_password(&request)
            .await
            .map_err(|err| ClientError::from_account_api(&err, SERVER_FALLBACK))?;

        tracing::info!(name: "account.password_reset", "Password reset");
        Ok(response
            .message
            .unwrap_or_else(|| PASSWORD_CHANGED.to_string()))
    }
}

fn require_email(email: &str) -> std::result::Result<String, ValidationError> {
    let email = email.trim();
    if email.is_empty() {
        Err(ValidationError::EmptyEmail)
    } else {
        Ok(email.to_string())
    }
}
