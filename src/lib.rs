//! Generic GeoJSON feed client.
//!
//! Turns any HTTP endpoint serving a GeoJSON `FeatureCollection` into a
//! stream of normalized entries with stable external ids, publication dates
//! and distance from a home location, and tracks which entries were added,
//! updated or removed between polls.
//!
//! - [`client`] - Feed-agnostic polling framework (fetch, filter, diff)
//! - [`generic`] - The generic feed built on top of it
//! - [`config`] - TOML configuration used by the `geojson-feed` binary

pub mod client;
pub mod config;
pub mod generic;

pub use client::{Coordinates, StatusUpdate, UpdateStatus};
pub use generic::{EntryError, GenericFeed, GenericFeedEntry, GenericFeedManager};
