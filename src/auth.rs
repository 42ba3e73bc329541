//! Sessions and the sign-in operations the hosted auth service offers.

use std::time::{SystemTime, UNIX_EPOCH};

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

pub const MIN_PASSWORD_LEN: usize = 6;

/// Refresh this long before the access token runs out.
pub const REFRESH_MARGIN_SECS: u64 = 60;
/// Wait before retrying a refresh that failed for lack of a connection.
pub const REFRESH_RETRY_SECS: u64 = 30;

pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
    #[serde(default)]
    pub expires_in: u64,
    /// Unix seconds. The token endpoint sends it; otherwise [`Session::stamped`]
    /// derives it from `expires_in`.
    #[serde(default)]
    pub expires_at: Option<u64>,
    pub user: User,
}

impl Session {
    pub fn user_id(&self) -> &str {
        &self.user.id
    }

    /// Fill in `expires_at` for a session received at `now`.
    pub fn stamped(mut self, now: u64) -> Self {
        if self.expires_at.is_none() && self.expires_in > 0 {
            self.expires_at = Some(now + self.expires_in);
        }
        self
    }

    pub fn needs_refresh(&self, now: u64) -> bool {
        match self.expires_at {
            Some(at) => !self.refresh_token.is_empty() && now + REFRESH_MARGIN_SECS >= at,
            None => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OAuthProvider {
    Google,
    Kakao,
}

impl OAuthProvider {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::Kakao => "kakao",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignUpOutcome {
    SignedIn(Session),
    /// The account exists but the address must be confirmed before sign-in.
    ConfirmationSent,
}

pub trait AuthBackend: Send + Sync {
    fn sign_in_with_password(&self, email: String, password: String) -> BoxFuture<'_, Result<Session>>;
    fn sign_up(
        &self,
        email: String,
        password: String,
        nickname: Option<String>,
    ) -> BoxFuture<'_, Result<SignUpOutcome>>;
    fn sign_out(&self, session: Session) -> BoxFuture<'_, Result<()>>;
    fn current_user(&self, session: Session) -> BoxFuture<'_, Result<User>>;
    /// Trade a refresh token for a new session.
    fn refresh_session(&self, refresh_token: String) -> BoxFuture<'_, Result<Session>>;
    /// Browser URL that starts the provider's sign-in flow.
    fn oauth_url(&self, provider: OAuthProvider, redirect_to: &str) -> Result<String>;
}

/// Result of checking a stored session at startup.
#[derive(Debug)]
pub enum Restored {
    Valid(Session),
    /// The server could not be reached; keep the session and try later.
    Offline(Session),
    Rejected(AppError),
}

/// Verify a stored session, refreshing it when the token has run out.
pub async fn restore_session(auth: &dyn AuthBackend, session: Session, now: u64) -> Restored {
    if !session.needs_refresh(now) {
        match auth.current_user(session.clone()).await {
            Ok(_) => return Restored::Valid(session),
            Err(AppError::Network(err)) => {
                log::warn!("cannot verify stored session: {err}");
                return Restored::Offline(session);
            }
            Err(err) if err.status() == Some(401) && !session.refresh_token.is_empty() => {
                log::debug!("stored access token rejected, refreshing");
            }
            Err(err) => return Restored::Rejected(err),
        }
    }
    match auth.refresh_session(session.refresh_token.clone()).await {
        Ok(fresh) => Restored::Valid(fresh.stamped(now)),
        Err(AppError::Network(err)) => {
            log::warn!("cannot refresh stored session: {err}");
            Restored::Offline(session)
        }
        Err(err) => Restored::Rejected(err),
    }
}

/// Keeps the access token ahead of its expiry while the app runs.
#[derive(Debug, Default)]
pub struct TokenRefresh {
    in_flight: bool,
    retry_at: Option<u64>,
}

impl TokenRefresh {
    /// Whether a refresh for `session` should be sent now. Marks it in flight.
    pub fn start(&mut self, session: &Session, now: u64) -> bool {
        if self.in_flight || self.retry_at.is_some_and(|at| now < at) || !session.needs_refresh(now) {
            return false;
        }
        self.in_flight = true;
        self.retry_at = None;
        true
    }

    /// Record the answer. Returns the session to keep, or the error that ended it.
    /// A network failure keeps the current session and schedules a retry.
    pub fn finish(&mut self, result: Result<Session>, now: u64) -> Result<Option<Session>> {
        self.in_flight = false;
        match result {
            Ok(session) => Ok(Some(session.stamped(now))),
            Err(AppError::Network(err)) => {
                log::warn!("token refresh failed, retrying in {REFRESH_RETRY_SECS}s: {err}");
                self.retry_at = Some(now + REFRESH_RETRY_SECS);
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Form-level checks done before anything is sent. Errors are message keys.
pub fn validate_credentials(email: &str, password: &str) -> std::result::Result<(), &'static str> {
    let email = email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err("auth.invalidEmail");
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err("auth.passwordTooShort");
    }
    Ok(())
}

pub fn validate_sign_up(
    email: &str,
    password: &str,
    confirm: &str,
) -> std::result::Result<(), &'static str> {
    validate_credentials(email, password)?;
    if password != confirm {
        return Err("auth.passwordMismatch");
    }
    Ok(())
}
