use crate::catalog::{Category, Movie};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;

// ============================================================================
// Load Kinds and Page Requests
// ============================================================================

/// Which loading flag a fetch raises while it is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadKind {
    /// The first fetch of a feed, issued by `start()`.
    Initial,
    /// Any later fetch, issued by `load_more()`.
    More,
}

/// Snapshot taken when a fetch is admitted by the guard.
///
/// The merge on completion works against this snapshot rather than the live
/// feed. With one fetch in flight per feed the two never differ.
#[derive(Debug, Clone)]
pub(crate) struct PageRequest {
    pub kind: LoadKind,
    pub page: u32,
    pub items: Arc<Vec<Movie>>,
}

/// What a successful page did to its feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PageOutcome {
    /// Items returned by the source, before deduplication.
    pub fetched: usize,
    /// Items actually appended.
    pub added: usize,
    pub end_reached: bool,
}

// ============================================================================
// Feed State
// ============================================================================

/// Pagination state of one category.
///
/// Only the controller mutates a feed. Observers receive clones, which share
/// the item list through an `Arc` so cloning is O(1).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedState {
    category: Category,
    items: Arc<Vec<Movie>>,
    next_page: u32,
    is_loading_initial: bool,
    is_loading_more: bool,
    end_reached: bool,
    last_error: Option<String>,
}

impl FeedState {
    pub(crate) fn new(category: Category) -> Self {
        Self {
            category,
            items: Arc::new(Vec::new()),
            next_page: 1,
            is_loading_initial: false,
            is_loading_more: false,
            end_reached: false,
            last_error: None,
        }
    }

    pub fn category(&self) -> Category {
        self.category
    }

    /// Accumulated items in arrival order, without duplicate ids.
    pub fn items(&self) -> &Arc<Vec<Movie>> {
        &self.items
    }

    /// Page number the next fetch will request (1-based).
    pub fn next_page(&self) -> u32 {
        self.next_page
    }

    pub fn is_loading_initial(&self) -> bool {
        self.is_loading_initial
    }

    pub fn is_loading_more(&self) -> bool {
        self.is_loading_more
    }

    pub fn end_reached(&self) -> bool {
        self.end_reached
    }

    /// Message of the last failed fetch, cleared when a new fetch starts.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading_initial || self.is_loading_more
    }

    /// True when a fetch would be admitted right now.
    pub fn can_load_more(&self) -> bool {
        !self.is_loading() && !self.end_reached
    }

    /// Whether a viewport whose last visible row is `last_visible_index` is
    /// within `threshold` items of the end of the feed.
    ///
    /// Presentation layers call this on scroll and issue `load_more` when it
    /// returns true. It does not look at the loading flags; the controller's
    /// guard handles repeated signals.
    pub fn is_near_end(&self, last_visible_index: usize, threshold: usize) -> bool {
        let len = self.items.len();
        if len == 0 {
            return false;
        }
        last_visible_index >= (len - 1).saturating_sub(threshold)
    }

    // ------------------------------------------------------------------------
    // Transitions (controller only)
    // ------------------------------------------------------------------------

    /// Admits a fetch if the guard allows it, raising the loading flag for
    /// `kind` and clearing the last error.
    ///
    /// Returns `None` when a fetch is already in flight or the feed has ended;
    /// the state is left untouched in that case.
    pub(crate) fn begin(&mut self, kind: LoadKind) -> Option<PageRequest> {
        if !self.can_load_more() {
            return None;
        }

        self.is_loading_initial = kind == LoadKind::Initial;
        self.is_loading_more = kind == LoadKind::More;
        self.last_error = None;

        Some(PageRequest {
            kind,
            page: self.next_page,
            items: Arc::clone(&self.items),
        })
    }

    /// Merges a fetched page into the feed.
    ///
    /// Ids already present, or repeated within `fetched`, are dropped. The
    /// cursor advances past the requested page even when nothing was added;
    /// an empty page marks the end of the feed.
    pub(crate) fn complete(&mut self, request: PageRequest, fetched: Vec<Movie>) -> PageOutcome {
        let fetched_len = fetched.len();
        let mut seen: HashSet<u64> = request.items.iter().map(|m| m.id).collect();

        let fresh: Vec<Movie> = fetched
            .into_iter()
            .filter(|movie| seen.insert(movie.id))
            .collect();
        let added = fresh.len();

        if added > 0 {
            let mut merged = Vec::with_capacity(request.items.len() + added);
            merged.extend(request.items.iter().cloned());
            merged.extend(fresh);
            self.items = Arc::new(merged);
        } else {
            self.items = request.items;
        }

        self.next_page = self.next_page.max(request.page.saturating_add(1));
        // Never reverts once set.
        self.end_reached = self.end_reached || fetched_len == 0;
        self.is_loading_initial = false;
        self.is_loading_more = false;

        PageOutcome {
            fetched: fetched_len,
            added,
            end_reached: self.end_reached,
        }
    }

    /// Records a failed fetch. Items, cursor and end flag are left as they
    /// were, so the next admitted fetch asks for the same page again.
    pub(crate) fn fail(&mut self, error: String) {
        self.is_loading_initial = false;
        self.is_loading_more = false;
        self.last_error = Some(error);
    }
}

// ============================================================================
// Catalog State
// ============================================================================

/// The three feeds plus a revision number bumped on every mutation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogState {
    feeds: [FeedState; 3],
    revision: u64,
}

impl Default for CatalogState {
    fn default() -> Self {
        Self {
            feeds: Category::ALL.map(FeedState::new),
            revision: 0,
        }
    }
}

impl CatalogState {
    pub fn feed(&self, category: Category) -> &FeedState {
        &self.feeds[category.index()]
    }

    pub(crate) fn feed_mut(&mut self, category: Category) -> &mut FeedState {
        &mut self.feeds[category.index()]
    }

    /// Feeds in [`Category::ALL`] order.
    pub fn feeds(&self) -> impl Iterator<Item = &FeedState> {
        self.feeds.iter()
    }

    /// Number of mutations applied since the controller was created.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub(crate) fn bump_revision(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }

    /// True while any feed has a fetch in flight.
    pub fn is_loading(&self) -> bool {
        self.feeds.iter().any(FeedState::is_loading)
    }

    /// Looks a movie up by id across Popular, Top Rated, then Revenue and
    /// returns the first match.
    pub fn find_movie(&self, id: u64) -> Option<&Movie> {
        self.feeds
            .iter()
            .find_map(|feed| feed.items.iter().find(|movie| movie.id == id))
    }
}
