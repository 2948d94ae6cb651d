use super::state::{CatalogState, LoadKind, PageRequest};
use crate::catalog::{Category, Movie};
use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Source of catalog pages consumed by [`PaginationController`].
///
/// Implementations own all transport concerns (timeouts, retries, decoding).
/// The controller calls `fetch_page` once per admitted load and never retries.
pub trait MovieSource: Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Fetch one 1-based page of `category`. An empty list means the catalog
    /// has no more items.
    fn fetch_page(
        &self,
        category: Category,
        page: u32,
    ) -> impl Future<Output = Result<Vec<Movie>, Self::Error>> + Send;
}

/// Drives the three category feeds.
///
/// All state lives in a single `watch` value. Every write goes through the
/// sender, so the guard check and the loading flag are set under one lock and
/// at most one fetch per category is ever in flight. Observers get read-only
/// access through [`subscribe`](Self::subscribe) and
/// [`snapshot`](Self::snapshot).
///
/// `start` and `load_more` spawn tokio tasks and must be called from within a
/// runtime.
pub struct PaginationController<S> {
    source: Arc<S>,
    state: Arc<watch::Sender<CatalogState>>,
}

impl<S> Clone for PaginationController<S> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            state: Arc::clone(&self.state),
        }
    }
}

impl<S> std::fmt::Debug for PaginationController<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaginationController")
            .field("revision", &self.state.borrow().revision())
            .finish_non_exhaustive()
    }
}

impl<S: MovieSource> PaginationController<S> {
    pub fn new(source: S) -> Self {
        Self::from_shared(Arc::new(source))
    }

    /// Builds a controller over a source the caller keeps a handle to.
    pub fn from_shared(source: Arc<S>) -> Self {
        let (state, _) = watch::channel(CatalogState::default());
        Self {
            source,
            state: Arc::new(state),
        }
    }

    /// Loads the first page of every category concurrently.
    ///
    /// Each category is guarded like [`load_more`](Self::load_more), so
    /// calling this again while loads are in flight (or after a feed ended)
    /// starts nothing for those categories.
    pub fn start(&self) -> Vec<JoinHandle<()>> {
        Category::ALL
            .into_iter()
            .filter_map(|category| self.load(category, LoadKind::Initial))
            .collect()
    }

    /// Loads the next page of `category`.
    ///
    /// Returns `None` without touching state when a fetch for this category is
    /// already in flight or its feed has ended.
    pub fn load_more(&self, category: Category) -> Option<JoinHandle<()>> {
        self.load(category, LoadKind::More)
    }

    /// Receiver that observes every state transition.
    pub fn subscribe(&self) -> watch::Receiver<CatalogState> {
        self.state.subscribe()
    }

    /// Clone of the current state.
    pub fn snapshot(&self) -> CatalogState {
        self.state.borrow().clone()
    }

    /// Detail lookup across all loaded feeds, Popular first.
    pub fn movie(&self, id: u64) -> Option<Movie> {
        self.state.borrow().find_movie(id).cloned()
    }

    /// Resolves once no category has a fetch in flight.
    pub async fn wait_idle(&self) {
        let mut rx = self.subscribe();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = rx.wait_for(|state| !state.is_loading()).await;
    }

    fn load(&self, category: Category, kind: LoadKind) -> Option<JoinHandle<()>> {
        let mut admitted = None;
        self.state.send_if_modified(|state| {
            let request = state.feed_mut(category).begin(kind);
            match request {
                Some(request) => {
                    admitted = Some(request);
                    state.bump_revision();
                    true
                }
                None => false,
            }
        });

        let Some(request) = admitted else {
            tracing::trace!(category = %category, ?kind, "Load skipped: in flight or feed ended");
            return None;
        };

        tracing::debug!(category = %category, page = request.page, ?kind, "Loading page");

        let source = Arc::clone(&self.source);
        let state = Arc::clone(&self.state);
        Some(tokio::spawn(run_fetch(source, state, category, request)))
    }
}

/// Performs one admitted fetch and applies its outcome. Always updates state
/// exactly once, including when the source panics.
async fn run_fetch<S: MovieSource>(
    source: Arc<S>,
    state: Arc<watch::Sender<CatalogState>>,
    category: Category,
    request: PageRequest,
) {
    let page = request.page;
    let kind = request.kind;
    let result = catch_task_panic(source.fetch_page(category, page)).await;

    let mut outcome = None;
    state.send_modify(|catalog| {
        let feed = catalog.feed_mut(category);
        match result {
            Ok(Ok(movies)) => outcome = Some(Ok(feed.complete(request, movies))),
            Ok(Err(e)) => {
                let message = e.to_string();
                feed.fail(message.clone());
                outcome = Some(Err(message));
            }
            Err(panic_msg) => {
                tracing::error!(task = "fetch_page", category = %category, page, error = %panic_msg, "Background task panicked");
                let message = format!("fetch task panicked: {panic_msg}");
                feed.fail(message.clone());
                outcome = Some(Err(message));
            }
        }
        catalog.bump_revision();
    });

    match outcome {
        Some(Ok(page_outcome)) if page_outcome.end_reached => {
            tracing::info!(category = %category, page, "Feed exhausted");
        }
        Some(Ok(page_outcome)) => {
            tracing::debug!(
                category = %category,
                page,
                ?kind,
                fetched = page_outcome.fetched,
                added = page_outcome.added,
                "Page merged"
            );
        }
        Some(Err(error)) => {
            tracing::warn!(category = %category, page, error = %error, "Failed to load page");
        }
        None => {}
    }
}

/// Runs `future`, turning a panic into `Err` with the panic message.
async fn catch_task_panic<F, T>(future: F) -> Result<T, String>
where
    F: Future<Output = T>,
{
    AssertUnwindSafe(future)
        .catch_unwind()
        .await
        .map_err(|panic| {
            if let Some(s) = panic.downcast_ref::<&'static str>() {
                s.to_string()
            } else if let Some(s) = panic.downcast_ref::<String>() {
                s.clone()
            } else {
                "unknown panic payload".to_string()
            }
        })
}
