//! The signed-in user's saved places.
//!
//! [`Bookmarks`] mirrors the `bookmarks` table for the current session. Writes
//! go to the backend first and touch the local list only once the backend has
//! confirmed them, so the list never shows a row that failed to save.

use std::sync::Arc;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::auth::Session;
use crate::error::{AppError, Result};
use crate::map::geo::LatLng;
use crate::tasks::Tasks;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bookmark {
    pub id: String,
    #[serde(default)]
    pub user_id: String,
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub created_at: String,
}

impl Bookmark {
    pub fn position(&self) -> LatLng {
        LatLng::new(self.lat, self.lng)
    }
}

/// Insert payload. The id and timestamp are assigned server side.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewBookmark {
    pub user_id: String,
    pub name: String,
    pub address: Option<String>,
    pub lat: f64,
    pub lng: f64,
}

pub trait BookmarkBackend: Send + Sync {
    /// Newest first.
    fn list_bookmarks(&self, session: Session) -> BoxFuture<'_, Result<Vec<Bookmark>>>;
    fn insert_bookmark(&self, session: Session, row: NewBookmark) -> BoxFuture<'_, Result<Bookmark>>;
    fn delete_bookmark(&self, session: Session, id: String) -> BoxFuture<'_, Result<()>>;
}

pub fn find_at(list: &[Bookmark], position: LatLng) -> Option<&Bookmark> {
    list.iter().find(|b| b.position().same_place(&position))
}

pub fn is_bookmarked(list: &[Bookmark], position: LatLng) -> bool {
    find_at(list, position).is_some()
}

#[derive(Debug)]
pub enum BookmarkOutcome {
    Loaded(Result<Vec<Bookmark>>),
    Added(Result<Bookmark>),
    Removed { id: String, result: Result<()> },
}

/// What changed after a backend answer was applied.
#[derive(Debug, Clone, PartialEq)]
pub enum BookmarkChange {
    Loaded,
    Added(Bookmark),
    Removed(String),
    Failed(String),
    /// The answer belonged to a session that has since ended.
    Ignored,
}

pub struct Bookmarks {
    items: Vec<Bookmark>,
    loading: bool,
    last_error: Option<String>,
    session: Option<Session>,
    epoch: u64,
    backend: Arc<dyn BookmarkBackend>,
    tasks: Tasks<(u64, BookmarkOutcome)>,
}

impl Bookmarks {
    pub fn new(backend: Arc<dyn BookmarkBackend>, tasks: Tasks<(u64, BookmarkOutcome)>) -> Self {
        Self {
            items: Vec::new(),
            loading: false,
            last_error: None,
            session: None,
            epoch: 0,
            backend,
            tasks,
        }
    }

    pub fn items(&self) -> &[Bookmark] {
        &self.items
    }

    pub fn loading(&self) -> bool {
        self.loading
    }

    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn is_bookmarked(&self, position: LatLng) -> bool {
        is_bookmarked(&self.items, position)
    }

    pub fn find_at(&self, position: LatLng) -> Option<&Bookmark> {
        find_at(&self.items, position)
    }

    /// Switch users. Any answer still in flight for the previous session is
    /// dropped when it lands.
    pub fn set_session(&mut self, session: Option<Session>) {
        let same_user = match (&self.session, &session) {
            (Some(a), Some(b)) => a.user_id() == b.user_id(),
            (None, None) => true,
            _ => false,
        };
        if same_user && session.is_some() {
            self.session = session;
            return;
        }
        self.epoch += 1;
        self.session = session;
        self.items.clear();
        self.last_error = None;
        self.refetch();
    }

    pub fn refetch(&mut self) {
        let Some(session) = self.session.clone() else {
            self.items.clear();
            self.loading = false;
            return;
        };
        self.loading = true;
        let backend = Arc::clone(&self.backend);
        let epoch = self.epoch;
        self.tasks.spawn(async move {
            let result = backend.list_bookmarks(session).await;
            (epoch, BookmarkOutcome::Loaded(result))
        });
    }

    pub fn add(&mut self, name: String, position: LatLng, address: Option<String>) -> Result<()> {
        let session = self.session.clone().ok_or(AppError::NoSession)?;
        let row = NewBookmark {
            user_id: session.user_id().to_string(),
            name,
            address,
            lat: position.lat,
            lng: position.lng,
        };
        let backend = Arc::clone(&self.backend);
        let epoch = self.epoch;
        self.tasks.spawn(async move {
            let result = backend.insert_bookmark(session, row).await;
            (epoch, BookmarkOutcome::Added(result))
        });
        Ok(())
    }

    pub fn remove(&mut self, id: String) -> Result<()> {
        let session = self.session.clone().ok_or(AppError::NoSession)?;
        let backend = Arc::clone(&self.backend);
        let epoch = self.epoch;
        self.tasks.spawn(async move {
            let result = backend.delete_bookmark(session, id.clone()).await;
            (epoch, BookmarkOutcome::Removed { id, result })
        });
        Ok(())
    }

    /// Apply everything that finished since the last frame.
    pub fn poll(&mut self) -> Vec<BookmarkChange> {
        self.tasks
            .drain()
            .into_iter()
            .map(|(epoch, outcome)| self.apply(epoch, outcome))
            .collect()
    }

    /// Wait for the next backend answer and apply it.
    pub async fn settle(&mut self) -> Option<BookmarkChange> {
        let (epoch, outcome) = self.tasks.next().await?;
        Some(self.apply(epoch, outcome))
    }

    pub fn in_flight(&self) -> usize {
        self.tasks.in_flight()
    }

    fn apply(&mut self, epoch: u64, outcome: BookmarkOutcome) -> BookmarkChange {
        if epoch != self.epoch {
            log::debug!("dropping bookmark result from an ended session");
            return BookmarkChange::Ignored;
        }
        match outcome {
            BookmarkOutcome::Loaded(result) => {
                self.loading = false;
                match result {
                    Ok(items) => {
                        self.items = items;
                        self.last_error = None;
                        BookmarkChange::Loaded
                    }
                    Err(err) => self.fail("loading bookmarks", err),
                }
            }
            BookmarkOutcome::Added(Ok(bookmark)) => {
                self.items.insert(0, bookmark.clone());
                self.last_error = None;
                BookmarkChange::Added(bookmark)
            }
            BookmarkOutcome::Added(Err(err)) => self.fail("adding bookmark", err),
            BookmarkOutcome::Removed { id, result: Ok(()) } => {
                self.items.retain(|b| b.id != id);
                self.last_error = None;
                BookmarkChange::Removed(id)
            }
            BookmarkOutcome::Removed { result: Err(err), .. } => self.fail("removing bookmark", err),
        }
    }

    fn fail(&mut self, what: &str, err: AppError) -> BookmarkChange {
        log::warn!("{what} failed: {err}");
        let message = err.user_message();
        self.last_error = Some(message.clone());
        BookmarkChange::Failed(message)
    }
}


#[cfg(test)]
mod tests {
    use tokio::runtime::Handle;

    use super::fake::{session, MemoryBackend};
    use super::*;

    fn hook(backend: Arc<MemoryBackend>) -> Bookmarks {
        Bookmarks::new(backend, Tasks::new(Handle::current()))
    }

    #[tokio::test]
    async fn signed_out_list_is_empty_and_idle() {
        let mut bookmarks = hook(Arc::new(MemoryBackend::default()));
        bookmarks.set_session(None);
        assert!(bookmarks.items().is_empty());
        assert!(!bookmarks.loading());
        assert!(matches!(
            bookmarks.add("x".into(), LatLng::new(1.0, 2.0), None),
            Err(AppError::NoSession)
        ));
        assert_eq!(bookmarks.in_flight(), 0);
    }

    #[tokio::test]
    async fn adding_city_hall_prepends_it_after_the_backend_confirms() {
        let backend = Arc::new(MemoryBackend::default());
        let mut bookmarks = hook(Arc::clone(&backend));
        bookmarks.set_session(Some(session("u1")));
        assert!(bookmarks.loading());
        assert_eq!(bookmarks.settle().await, Some(BookmarkChange::Loaded));
        assert!(!bookmarks.loading());

        let city_hall = LatLng::new(37.5665, 126.978);
        bookmarks.add("City Hall".into(), city_hall, Some("서울 중구 세종대로 110".into())).unwrap();
        assert!(!bookmarks.is_bookmarked(city_hall));

        let change = bookmarks.settle().await.unwrap();
        assert!(matches!(change, BookmarkChange::Added(ref b) if b.name == "City Hall"));
        assert_eq!(bookmarks.items()[0].name, "City Hall");
        assert!(bookmarks.is_bookmarked(LatLng::new(37.56655, 126.97805)));
        assert!(!bookmarks.is_bookmarked(LatLng::new(37.5667, 126.978)));
    }

    #[tokio::test]
    async fn failed_writes_leave_the_list_alone() {
        let backend = Arc::new(MemoryBackend::default());
        let mut bookmarks = hook(Arc::clone(&backend));
        bookmarks.set_session(Some(session("u1")));
        bookmarks.settle().await;

        *backend.fail_next.lock().unwrap() = true;
        bookmarks.add("Nope".into(), LatLng::new(1.0, 1.0), None).unwrap();
        let change = bookmarks.settle().await.unwrap();
        assert_eq!(change, BookmarkChange::Failed("duplicate key value".into()));
        assert!(bookmarks.items().is_empty());
        assert_eq!(bookmarks.last_error(), Some("duplicate key value"));

        bookmarks.add("Yes".into(), LatLng::new(1.0, 1.0), None).unwrap();
        bookmarks.settle().await;
        let id = bookmarks.items()[0].id.clone();

        *backend.fail_next.lock().unwrap() = true;
        bookmarks.remove(id.clone()).unwrap();
        bookmarks.settle().await;
        assert_eq!(bookmarks.items().len(), 1);

        bookmarks.remove(id.clone()).unwrap();
        assert_eq!(bookmarks.settle().await, Some(BookmarkChange::Removed(id)));
        assert!(bookmarks.items().is_empty());
    }

    #[tokio::test]
    async fn results_for_a_previous_user_are_dropped() {
        let backend = Arc::new(MemoryBackend::default());
        let mut bookmarks = hook(Arc::clone(&backend));
        bookmarks.set_session(Some(session("u1")));
        bookmarks.add("Old".into(), LatLng::new(1.0, 1.0), None).unwrap();
        bookmarks.set_session(None);

        assert_eq!(bookmarks.settle().await, Some(BookmarkChange::Ignored));
        assert_eq!(bookmarks.settle().await, Some(BookmarkChange::Ignored));
        assert!(bookmarks.items().is_empty());
        assert!(!bookmarks.loading());
    }
}
