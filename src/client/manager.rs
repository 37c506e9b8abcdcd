//! Feed manager: diffs consecutive polls by external id and notifies the
//! caller about created, updated and removed entities.

use crate::client::entry::TrackedEntry;
use crate::client::feed::{FeedAdapter, GeoJsonFeed};
use crate::client::status::{StatusUpdate, UpdateStatus};
use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use futures::FutureExt;
use indexmap::IndexMap;
use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Async callback receiving the external id of an entity.
pub type EntityCallback = Arc<dyn Fn(String) -> BoxFuture<'static, ()> + Send + Sync>;

/// Async callback receiving the summary of an update cycle.
pub type StatusCallback = Arc<dyn Fn(StatusUpdate) -> BoxFuture<'static, ()> + Send + Sync>;

/// Wraps an async closure as an [`EntityCallback`].
pub fn entity_callback<F, Fut>(f: F) -> EntityCallback
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Arc::new(move |external_id| f(external_id).boxed())
}

/// Wraps an async closure as a [`StatusCallback`].
pub fn status_callback<F, Fut>(f: F) -> StatusCallback
where
    F: Fn(StatusUpdate) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Arc::new(move |update| f(update).boxed())
}

/// The three entity lifecycle callbacks.
#[derive(Clone)]
pub struct EntityCallbacks {
    pub generate: EntityCallback,
    pub update: EntityCallback,
    pub remove: EntityCallback,
}

pub struct FeedManager<A: FeedAdapter> {
    feed: GeoJsonFeed<A>,
    callbacks: EntityCallbacks,
    status_callback: Option<StatusCallback>,
    feed_entries: IndexMap<String, A::Entry>,
    managed_external_ids: HashSet<String>,
    last_update: Option<DateTime<Utc>>,
    last_update_successful: Option<DateTime<Utc>>,
}

impl<A: FeedAdapter> FeedManager<A> {
    pub fn with_feed(
        feed: GeoJsonFeed<A>,
        callbacks: EntityCallbacks,
        status_callback: Option<StatusCallback>,
    ) -> Self {
        Self {
            feed,
            callbacks,
            status_callback,
            feed_entries: IndexMap::new(),
            managed_external_ids: HashSet::new(),
            last_update: None,
            last_update_successful: None,
        }
    }

    pub fn feed(&self) -> &GeoJsonFeed<A> {
        &self.feed
    }

    /// Entries from the last successful update, keyed by external id, in
    /// feed document order.
    pub fn feed_entries(&self) -> &IndexMap<String, A::Entry> {
        &self.feed_entries
    }

    pub fn last_timestamp(&self) -> Option<DateTime<Utc>> {
        self.feed.last_timestamp()
    }

    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        self.last_update
    }

    pub fn last_update_successful(&self) -> Option<DateTime<Utc>> {
        self.last_update_successful
    }

    /// Polls the feed once and dispatches lifecycle callbacks.
    ///
    /// Callbacks run in the order remove, update, create. A failed fetch
    /// removes every tracked entity. An entry construction error is returned
    /// before any callback fires.
    pub async fn update(&mut self) -> Result<(), A::Error> {
        let (status, entries) = self.feed.update().await?;
        let now = Utc::now();

        let (mut created, mut updated, mut removed) = (0, 0, 0);
        match status {
            UpdateStatus::Ok => {
                self.feed_entries = entries
                    .unwrap_or_default()
                    .into_iter()
                    .map(|entry| (entry.external_id().to_string(), entry))
                    .collect();
                self.last_update = Some(now);
                self.last_update_successful = Some(now);

                let current: HashSet<String> = self.feed_entries.keys().cloned().collect();
                removed = self.remove_entities(&current).await;
                updated = self.update_entities(&current).await;
                created = self.create_entities(&current).await;
            }
            UpdateStatus::OkNoData => {
                self.last_update = Some(now);
                self.last_update_successful = Some(now);
            }
            UpdateStatus::Error => {
                self.feed_entries.clear();
                removed = self.remove_entities(&HashSet::new()).await;
                self.last_update = Some(now);
            }
        }

        tracing::debug!(
            status = %status,
            created = created,
            updated = updated,
            removed = removed,
            "Feed manager update finished"
        );

        if let Some(callback) = &self.status_callback {
            callback(StatusUpdate {
                status,
                last_update: self.last_update,
                last_update_successful: self.last_update_successful,
                last_timestamp: self.feed.last_timestamp(),
                total: self.feed_entries.len(),
                created,
                updated,
                removed,
            })
            .await;
        }

        Ok(())
    }

    async fn remove_entities(&mut self, current: &HashSet<String>) -> usize {
        let ids = sorted(self.managed_external_ids.difference(current));
        for id in &ids {
            self.managed_external_ids.remove(id);
            (self.callbacks.remove)(id.clone()).await;
        }
        ids.len()
    }

    async fn update_entities(&mut self, current: &HashSet<String>) -> usize {
        let ids = sorted(self.managed_external_ids.intersection(current));
        for id in &ids {
            (self.callbacks.update)(id.clone()).await;
        }
        ids.len()
    }

    async fn create_entities(&mut self, current: &HashSet<String>) -> usize {
        let ids = sorted(current.difference(&self.managed_external_ids));
        for id in &ids {
            self.managed_external_ids.insert(id.clone());
            (self.callbacks.generate)(id.clone()).await;
        }
        ids.len()
    }
}

fn sorted<'a>(ids: impl Iterator<Item = &'a String>) -> Vec<String> {
    let mut ids: Vec<String> = ids.cloned().collect();
    ids.sort();
    ids
}

impl<A: FeedAdapter> fmt::Display for FeedManager<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}Manager(feed={})>", A::FEED_NAME, self.feed)
    }
}

impl<A: FeedAdapter> fmt::Debug for FeedManager<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeedManager")
            .field("feed", &self.feed)
            .field("managed", &self.managed_external_ids.len())
            .field("last_update", &self.last_update)
            .field("last_update_successful", &self.last_update_successful)
            .finish()
    }
}
