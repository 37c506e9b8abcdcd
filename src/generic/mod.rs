//! Generic GeoJSON feed: any `FeatureCollection` whose features carry an
//! identifier, a title and optionally a `pubDate` in their properties.
//!
//! - [`entry`] - Normalizes one feature into a [`GenericFeedEntry`]
//! - [`feed`] - Plugs the normalizer into the polling framework
//! - [`manager`] - Feed manager bound to [`GenericFeed`]

pub mod entry;
pub mod feed;
pub mod manager;

pub use entry::{parse_publication_date, EntryError, GenericFeedEntry};
pub use feed::{GenericFeed, GenericFeedAdapter};
pub use manager::GenericFeedManager;
