//! Product search.
//!
//! Two kinds of search share one entry point:
//! - **radius**: entries whose shop lies within a great-circle distance of an
//!   origin, ordered nearest first
//! - **text**: attribute and keyword filtering with a caller-chosen ordering
//!
//! Query-string parsing lives in [`SearchParams`] so transports stay thin.

mod engine;
mod params;
mod types;

pub use engine::SearchEngine;
pub use params::SearchParams;
pub use types::*;
