//! Polling framework for GeoJSON feeds.
//!
//! This module knows nothing about any particular feed layout:
//!
//! - [`fetcher`] - HTTP retrieval with retry and size limits
//! - [`geo`] - Coordinates and distance from home to a geometry
//! - [`entry`] - Base entry wrapping one feature
//! - [`feed`] - Update cycle, radius filter and the [`FeedAdapter`] seam
//! - [`manager`] - Diffing between polls and lifecycle callbacks
//!
//! A concrete feed type implements [`FeedAdapter`] and gets fetching,
//! filtering and change tracking for free.

pub mod entry;
pub mod feed;
pub mod fetcher;
pub mod geo;
pub mod manager;
mod status;

pub use entry::{FeedEntry, TrackedEntry};
pub use feed::{FeedAdapter, FeedConfig, FeedUpdate, GeoJsonFeed};
pub use fetcher::{FetchError, FetchOptions};
pub use geo::Coordinates;
pub use manager::{
    entity_callback, status_callback, EntityCallback, EntityCallbacks, FeedManager,
    StatusCallback,
};
pub use status::{StatusUpdate, UpdateStatus};
