//! Supabase auth (GoTrue) and table access (PostgREST) over plain HTTP.

use futures::future::BoxFuture;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Method, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::auth::{AuthBackend, OAuthProvider, Session, SignUpOutcome, User};
use crate::bookmarks::{Bookmark, BookmarkBackend, NewBookmark};
use crate::config::SupabaseConfig;
use crate::error::{AppError, Result};
use crate::profile::{Profile, ProfileBackend, ProfileUpdate};

const SERVICE: &str = "supabase";
const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ErrorBody {
    message: Option<String>,
    msg: Option<String>,
    error_description: Option<String>,
    error: Option<String>,
}

impl ErrorBody {
    fn into_message(self) -> Option<String> {
        self.message
            .or(self.msg)
            .or(self.error_description)
            .or(self.error)
            .filter(|m| !m.trim().is_empty())
    }
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(ErrorBody::into_message)
        .unwrap_or_else(|| body.trim().to_string())
}

#[derive(Serialize)]
struct PasswordCredentials<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct RefreshBody<'a> {
    refresh_token: &'a str,
}

#[derive(Serialize)]
struct SignUpBody<'a> {
    email: &'a str,
    password: &'a str,
    data: SignUpData<'a>,
}

#[derive(Serialize)]
struct SignUpData<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    nickname: Option<&'a str>,
}

#[derive(Debug, Clone)]
pub struct SupabaseClient {
    client: reqwest::Client,
    url: String,
    anon_key: String,
}

impl SupabaseClient {
    pub fn new(config: &SupabaseConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: config.url.trim_end_matches('/').to_string(),
            anon_key: config.anon_key.clone(),
        }
    }

    fn request(&self, method: Method, path: &str, session: Option<&Session>) -> RequestBuilder {
        let bearer = session.map_or(self.anon_key.as_str(), |s| s.access_token.as_str());
        self.client
            .request(method, format!("{}{}", self.url, path))
            .header("apikey", &self.anon_key)
            .header(AUTHORIZATION, format!("Bearer {bearer}"))
    }

    async fn send(builder: RequestBuilder) -> Result<String> {
        let response: Response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(AppError::api(SERVICE, status.as_u16(), error_message(&body)));
        }
        Ok(body)
    }

    async fn send_json<T: DeserializeOwned>(builder: RequestBuilder) -> Result<T> {
        let body = Self::send(builder).await?;
        Ok(serde_json::from_str(&body)?)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        log::info!("signing in {email}");
        let builder = self
            .request(Method::POST, "/auth/v1/token", None)
            .query(&[("grant_type", "password")])
            .json(&PasswordCredentials { email, password });
        Self::send_json(builder).await
    }

    pub async fn sign_up(&self, email: &str, password: &str, nickname: Option<&str>) -> Result<SignUpOutcome> {
        log::info!("signing up {email}");
        let builder = self.request(Method::POST, "/auth/v1/signup", None).json(&SignUpBody {
            email,
            password,
            data: SignUpData { nickname },
        });
        let body = Self::send(builder).await?;
        Ok(sign_up_outcome(&body))
    }

    pub async fn sign_out(&self, session: &Session) -> Result<()> {
        let builder = self.request(Method::POST, "/auth/v1/logout", Some(session));
        Self::send(builder).await.map(drop)
    }

    pub async fn get_user(&self, session: &Session) -> Result<User> {
        let builder = self.request(Method::GET, "/auth/v1/user", Some(session));
        Self::send_json(builder).await
    }

    pub async fn refresh(&self, refresh_token: &str) -> Result<Session> {
        log::debug!("refreshing access token");
        let builder = self
            .request(Method::POST, "/auth/v1/token", None)
            .query(&[("grant_type", "refresh_token")])
            .json(&RefreshBody { refresh_token });
        Self::send_json(builder).await
    }

    pub fn authorize_url(&self, provider: OAuthProvider, redirect_to: &str) -> Result<String> {
        let url = Url::parse_with_params(
            &format!("{}/auth/v1/authorize", self.url),
            &[("provider", provider.as_str()), ("redirect_to", redirect_to)],
        )
        .map_err(|e| AppError::api(SERVICE, 0, format!("bad authorize url: {e}")))?;
        Ok(url.into())
    }

    pub async fn bookmarks(&self, session: &Session) -> Result<Vec<Bookmark>> {
        let builder = self
            .request(Method::GET, "/rest/v1/bookmarks", Some(session))
            .query(&[
                ("select", "*".to_string()),
                ("user_id", format!("eq.{}", session.user_id())),
                ("order", "created_at.desc".to_string()),
            ]);
        Self::send_json(builder).await
    }

    pub async fn insert_bookmark(&self, session: &Session, row: &NewBookmark) -> Result<Bookmark> {
        let builder = self
            .request(Method::POST, "/rest/v1/bookmarks", Some(session))
            .header("Prefer", "return=representation")
            .header(ACCEPT, SINGLE_OBJECT)
            .json(row);
        Self::send_json(builder).await
    }

    pub async fn delete_bookmark(&self, session: &Session, id: &str) -> Result<()> {
        let builder = self
            .request(Method::DELETE, "/rest/v1/bookmarks", Some(session))
            .query(&[("id", format!("eq.{id}"))]);
        Self::send(builder).await.map(drop)
    }

    pub async fn profile(&self, session: &Session) -> Result<Option<Profile>> {
        let builder = self
            .request(Method::GET, "/rest/v1/profiles", Some(session))
            .query(&[("select", "*".to_string()), ("id", format!("eq.{}", session.user_id()))]);
        let rows: Vec<Profile> = Self::send_json(builder).await?;
        Ok(rows.into_iter().next())
    }

    pub async fn update_profile(&self, session: &Session, update: &ProfileUpdate) -> Result<()> {
        let builder = self
            .request(Method::PATCH, "/rest/v1/profiles", Some(session))
            .query(&[("id", format!("eq.{}", session.user_id()))])
            .json(update);
        Self::send(builder).await.map(drop)
    }
}

/// With email confirmation on, the service answers with a bare user instead of
/// a session.
fn sign_up_outcome(body: &str) -> SignUpOutcome {
    match serde_json::from_str::<Session>(body) {
        Ok(session) => SignUpOutcome::SignedIn(session),
        Err(_) => SignUpOutcome::ConfirmationSent,
    }
}

impl AuthBackend for SupabaseClient {
    fn sign_in_with_password(&self, email: String, password: String) -> BoxFuture<'_, Result<Session>> {
        Box::pin(async move { self.sign_in(&email, &password).await })
    }

    fn sign_up(
        &self,
        email: String,
        password: String,
        nickname: Option<String>,
    ) -> BoxFuture<'_, Result<SignUpOutcome>> {
        Box::pin(async move { SupabaseClient::sign_up(self, &email, &password, nickname.as_deref()).await })
    }

    fn sign_out(&self, session: Session) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move { SupabaseClient::sign_out(self, &session).await })
    }

    fn current_user(&self, session: Session) -> BoxFuture<'_, Result<User>> {
        Box::pin(async move { self.get_user(&session).await })
    }

    fn refresh_session(&self, refresh_token: String) -> BoxFuture<'_, Result<Session>> {
        Box::pin(async move { self.refresh(&refresh_token).await })
    }

    fn oauth_url(&self, provider: OAuthProvider, redirect_to: &str) -> Result<String> {
        self.authorize_url(provider, redirect_to)
    }
}

impl BookmarkBackend for SupabaseClient {
    fn list_bookmarks(&self, session: Session) -> BoxFuture<'_, Result<Vec<Bookmark>>> {
        Box::pin(async move { self.bookmarks(&session).await })
    }

    fn insert_bookmark(&self, session: Session, row: NewBookmark) -> BoxFuture<'_, Result<Bookmark>> {
        Box::pin(async move { SupabaseClient::insert_bookmark(self, &session, &row).await })
    }

    fn delete_bookmark(&self, session: Session, id: String) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move { SupabaseClient::delete_bookmark(self, &session, &id).await })
    }
}

impl ProfileBackend for SupabaseClient {
    fn fetch_profile(&self, session: Session) -> BoxFuture<'_, Result<Option<Profile>>> {
        Box::pin(async move { self.profile(&session).await })
    }

    fn update_profile(&self, session: Session, update: ProfileUpdate) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move { SupabaseClient::update_profile(self, &session, &update).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> SupabaseClient {
        SupabaseClient::new(&SupabaseConfig {
            url: "https://abc.supabase.co/".to_string(),
            anon_key: "anon".to_string(),
        })
    }

    #[test]
    fn error_bodies_from_both_services() {
        assert_eq!(
            error_message(r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#),
            "Invalid login credentials"
        );
        assert_eq!(error_message(r#"{"code":422,"msg":"User already registered"}"#), "User already registered");
        assert_eq!(
            error_message(r#"{"code":"23505","message":"duplicate key value violates unique constraint"}"#),
            "duplicate key value violates unique constraint"
        );
        assert_eq!(error_message("Bad Gateway\n"), "Bad Gateway");
    }

    #[test]
    fn authorize_url_escapes_the_redirect() {
        let url = client()
            .authorize_url(OAuthProvider::Kakao, "http://localhost:3000/auth/callback")
            .unwrap();
        assert_eq!(
            url,
            "https://abc.supabase.co/auth/v1/authorize?provider=kakao&redirect_to=http%3A%2F%2Flocalhost%3A3000%2Fauth%2Fcallback"
        );
    }

    #[test]
    fn sign_up_without_a_session_needs_confirmation() {
        let user_only = r#"{"id": "u-1", "email": "a@b.kr", "confirmation_sent_at": "2024-01-01T00:00:00Z"}"#;
        assert_eq!(sign_up_outcome(user_only), SignUpOutcome::ConfirmationSent);

        let with_session = r#"{"access_token": "jwt", "user": {"id": "u-1"}}"#;
        assert!(matches!(sign_up_outcome(with_session), SignUpOutcome::SignedIn(_)));
    }

    #[test]
    fn refresh_grant_reads_the_server_expiry() {
        let body = r#"{"access_token": "jwt2", "refresh_token": "r2", "expires_in": 3600,
            "expires_at": 1700003600, "user": {"id": "u-1"}}"#;
        let session: Session = serde_json::from_str(body).unwrap();
        let session = session.stamped(1_800_000_000);
        assert_eq!(session.expires_at, Some(1_700_003_600));
        assert_eq!(
            serde_json::to_value(RefreshBody { refresh_token: "r1" }).unwrap(),
            serde_json::json!({ "refresh_token": "r1" })
        );
    }
}
