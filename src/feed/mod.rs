//! Paginated movie feeds.
//!
//! This module holds the state machine that turns page fetches into three
//! incrementally growing, deduplicated catalogs:
//!
//! - [`state`] - `FeedState` per category and the aggregated `CatalogState`
//! - [`controller`] - `PaginationController`, which admits loads, calls the
//!   [`MovieSource`] and publishes every transition
//!
//! # Example
//!
//! ```ignore
//! use cinefeed::feed::PaginationController;
//! use cinefeed::catalog::Category;
//!
//! let controller = PaginationController::new(client);
//! controller.start();
//! controller.wait_idle().await;
//!
//! // user scrolled near the end of the Popular row
//! controller.load_more(Category::Popular);
//! ```

mod controller;
mod state;

pub use controller::{MovieSource, PaginationController};
pub use state::{CatalogState, FeedState, LoadKind};
