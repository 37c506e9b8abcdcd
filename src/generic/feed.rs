use crate::client::feed::{FeedAdapter, FeedConfig, GeoJsonFeed};
use crate::client::geo::Coordinates;
use crate::generic::entry::{EntryError, GenericFeedEntry};
use chrono::{DateTime, Utc};
use geojson::{Feature, FeatureCollection, JsonObject};

/// Adapter for feeds whose features carry `title`, `id`/`guid` and
/// `pubDate` properties but no feed-level metadata.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericFeedAdapter;

/// A generic GeoJSON feed.
pub type GenericFeed = GeoJsonFeed<GenericFeedAdapter>;

impl GenericFeed {
    pub fn new(
        session: reqwest::Client,
        home_coordinates: impl Into<Coordinates>,
        url: impl Into<String>,
        filter_radius: Option<f64>,
    ) -> Self {
        let config = FeedConfig {
            session,
            home_coordinates: home_coordinates.into(),
            url: url.into(),
            filter_radius,
        };
        GeoJsonFeed::with_adapter(config, GenericFeedAdapter)
    }
}

impl FeedAdapter for GenericFeedAdapter {
    type Entry = GenericFeedEntry;
    type Error = EntryError;

    const FEED_NAME: &'static str = "GenericFeed";

    fn new_entry(
        &self,
        home_coordinates: Coordinates,
        feature: Feature,
        _global_data: Option<&JsonObject>,
    ) -> Result<GenericFeedEntry, EntryError> {
        GenericFeedEntry::new(home_coordinates, feature)
    }

    fn extract_last_timestamp(&self, entries: &[GenericFeedEntry]) -> Option<DateTime<Utc>> {
        entries
            .iter()
            .filter_map(GenericFeedEntry::publication_date)
            .max()
    }

    fn extract_from_feed(&self, _collection: &FeatureCollection) -> Option<JsonObject> {
        None
    }
}
