pub mod supabase;

use futures::future::BoxFuture;

use crate::auth::{AuthBackend, OAuthProvider, Session, SignUpOutcome, User};
use crate::bookmarks::{Bookmark, BookmarkBackend, NewBookmark};
use crate::error::{AppError, Result};
use crate::profile::{Profile, ProfileBackend, ProfileUpdate};

pub use supabase::SupabaseClient;

/// Stands in when no Supabase project is configured. Every call fails with
/// [`AppError::MissingConfig`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Unconfigured;

fn missing<T: Send + 'static>() -> BoxFuture<'static, Result<T>> {
    Box::pin(async { Err(AppError::MissingConfig("SUPABASE_URL")) })
}

impl AuthBackend for Unconfigured {
    fn sign_in_with_password(&self, _email: String, _password: String) -> BoxFuture<'_, Result<Session>> {
        missing()
    }

    fn sign_up(&self, _email: String, _password: String, _nickname: Option<String>) -> BoxFuture<'_, Result<SignUpOutcome>> {
        missing()
    }

    fn sign_out(&self, _session: Session) -> BoxFuture<'_, Result<()>> {
        missing()
    }

    fn current_user(&self, _session: Session) -> BoxFuture<'_, Result<User>> {
        missing()
    }

    fn refresh_session(&self, _refresh_token: String) -> BoxFuture<'_, Result<Session>> {
        missing()
    }

    fn oauth_url(&self, _provider: OAuthProvider, _redirect_to: &str) -> Result<String> {
        Err(AppError::MissingConfig("SUPABASE_URL"))
    }
}

impl BookmarkBackend for Unconfigured {
    fn list_bookmarks(&self, _session: Session) -> BoxFuture<'_, Result<Vec<Bookmark>>> {
        missing()
    }

    fn insert_bookmark(&self, _session: Session, _row: NewBookmark) -> BoxFuture<'_, Result<Bookmark>> {
        missing()
    }

    fn delete_bookmark(&self, _session: Session, _id: String) -> BoxFuture<'_, Result<()>> {
        missing()
    }
}

impl ProfileBackend for Unconfigured {
    fn fetch_profile(&self, _session: Session) -> BoxFuture<'_, Result<Option<Profile>>> {
        missing()
    }

    fn update_profile(&self, _session: Session, _update: ProfileUpdate) -> BoxFuture<'_, Result<()>> {
        missing()
    }
}
