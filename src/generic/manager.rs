use crate::client::geo::Coordinates;
use crate::client::manager::{EntityCallback, EntityCallbacks, FeedManager, StatusCallback};
use crate::generic::feed::{GenericFeed, GenericFeedAdapter};

/// Feed manager for generic GeoJSON feeds.
pub type GenericFeedManager = FeedManager<GenericFeedAdapter>;

impl GenericFeedManager {
    /// Builds a [`GenericFeed`] and hands it, together with the callbacks,
    /// to the feed manager.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        session: reqwest::Client,
        generate_callback: EntityCallback,
        update_callback: EntityCallback,
        remove_callback: EntityCallback,
        coordinates: impl Into<Coordinates>,
        url: impl Into<String>,
        filter_radius: Option<f64>,
        status_callback: Option<StatusCallback>,
    ) -> Self {
        let feed = GenericFeed::new(session, coordinates, url, filter_radius);
        FeedManager::with_feed(
            feed,
            EntityCallbacks {
                generate: generate_callback,
                update: update_callback,
                remove: remove_callback,
            },
            status_callback,
        )
    }
}
