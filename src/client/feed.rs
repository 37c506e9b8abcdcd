//! Feed abstraction: fetch, build entries, filter by radius.
//!
//! [`GeoJsonFeed`] owns the update cycle and delegates everything that is
//! specific to one kind of feed to a [`FeedAdapter`].

use crate::client::entry::TrackedEntry;
use crate::client::fetcher::{fetch_feature_collection, FetchOptions, FetchOutcome};
use crate::client::geo::Coordinates;
use crate::client::status::UpdateStatus;
use chrono::{DateTime, Utc};
use geojson::{Feature, FeatureCollection, JsonObject};
use std::fmt;

/// Hooks a concrete feed type plugs into [`GeoJsonFeed`].
pub trait FeedAdapter {
    type Entry: TrackedEntry;
    /// Error raised when a feature cannot be turned into an entry.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Name used in the feed's and manager's string representation.
    const FEED_NAME: &'static str;

    /// Builds one entry from a feature. Called once per feature, in
    /// document order.
    fn new_entry(
        &self,
        home_coordinates: Coordinates,
        feature: Feature,
        global_data: Option<&JsonObject>,
    ) -> Result<Self::Entry, Self::Error>;

    /// Most recent timestamp among the already filtered entries.
    fn extract_last_timestamp(&self, entries: &[Self::Entry]) -> Option<DateTime<Utc>>;

    /// Feed-wide metadata handed to every [`new_entry`](Self::new_entry) call.
    fn extract_from_feed(&self, collection: &FeatureCollection) -> Option<JsonObject>;
}

/// Everything needed to poll one feed. Immutable after construction.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Caller-owned HTTP session; cloning shares the connection pool.
    pub session: reqwest::Client,
    pub home_coordinates: Coordinates,
    pub url: String,
    /// Maximum distance from home in kilometres. `None` or a value `<= 0.0`
    /// disables filtering.
    pub filter_radius: Option<f64>,
}

/// Result of [`GeoJsonFeed::update`]. Entries are only present for
/// [`UpdateStatus::Ok`].
pub type FeedUpdate<E> = (UpdateStatus, Option<Vec<E>>);

pub struct GeoJsonFeed<A: FeedAdapter> {
    config: FeedConfig,
    fetch_options: FetchOptions,
    adapter: A,
    last_timestamp: Option<DateTime<Utc>>,
}

impl<A: FeedAdapter> GeoJsonFeed<A> {
    pub fn with_adapter(config: FeedConfig, adapter: A) -> Self {
        Self {
            config,
            fetch_options: FetchOptions::default(),
            adapter,
            last_timestamp: None,
        }
    }

    /// Replaces the default timeout and retry settings.
    pub fn with_fetch_options(mut self, fetch_options: FetchOptions) -> Self {
        self.fetch_options = fetch_options;
        self
    }

    pub fn config(&self) -> &FeedConfig {
        &self.config
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    /// Most recent timestamp seen in the last successful update.
    pub fn last_timestamp(&self) -> Option<DateTime<Utc>> {
        self.last_timestamp
    }

    /// Fetches the feed and returns the entries within the filter radius.
    ///
    /// Network, HTTP and decode failures are logged and reported as
    /// [`UpdateStatus::Error`]. Only a feature the adapter cannot turn into
    /// an entry surfaces as `Err`.
    pub async fn update(&mut self) -> Result<FeedUpdate<A::Entry>, A::Error> {
        let outcome = fetch_feature_collection(
            &self.config.session,
            &self.config.url,
            &self.fetch_options,
        )
        .await;

        let collection = match outcome {
            Ok(FetchOutcome::Collection(collection)) => collection,
            Ok(FetchOutcome::NotModified) => {
                tracing::debug!(url = %self.config.url, "Feed not modified");
                return Ok((UpdateStatus::OkNoData, None));
            }
            Err(e) => {
                tracing::warn!(url = %self.config.url, error = %e, "Feed update failed");
                self.last_timestamp = None;
                return Ok((UpdateStatus::Error, None));
            }
        };

        let global_data = self.adapter.extract_from_feed(&collection);
        let total = collection.features.len();

        let mut entries = Vec::with_capacity(total);
        for feature in collection.features {
            let entry = self.adapter.new_entry(
                self.config.home_coordinates,
                feature,
                global_data.as_ref(),
            )?;
            entries.push(entry);
        }

        let filtered = self.filter_entries(entries);
        tracing::debug!(
            url = %self.config.url,
            total = total,
            kept = filtered.len(),
            "Feed updated"
        );

        self.last_timestamp = self.adapter.extract_last_timestamp(&filtered);
        Ok((UpdateStatus::Ok, Some(filtered)))
    }

    fn filter_entries(&self, entries: Vec<A::Entry>) -> Vec<A::Entry> {
        match self.config.filter_radius {
            // Zero or negative radius means no filter
            Some(radius) if radius > 0.0 => entries
                .into_iter()
                .filter(|entry| entry.distance_to_home() <= radius)
                .collect(),
            _ => entries,
        }
    }
}

/// Renders as `<Name(home=(lat, lon), url=..., radius=...)>` with `None`
/// standing in for a missing radius.
impl<A: FeedAdapter> fmt::Display for GeoJsonFeed<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<{}(home={}, url={}, radius=",
            A::FEED_NAME,
            self.config.home_coordinates,
            self.config.url
        )?;
        match self.config.filter_radius {
            Some(radius) => write!(f, "{:?}", radius)?,
            None => f.write_str("None")?,
        }
        f.write_str(")>")
    }
}

impl<A: FeedAdapter> fmt::Debug for GeoJsonFeed<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeoJsonFeed")
            .field("name", &A::FEED_NAME)
            .field("config", &self.config)
            .field("last_timestamp", &self.last_timestamp)
            .finish()
    }
}
