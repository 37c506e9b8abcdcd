//! Base feed entry shared by every feed flavour.
//!
//! A [`FeedEntry`] owns one GeoJSON feature together with the home
//! coordinates of the feed that produced it and answers the geometric
//! questions (coordinates, distance, geometries) plus generic property
//! lookups. Feed-specific entries wrap it and implement [`TrackedEntry`].

use crate::client::geo::{self, Coordinates};
use geojson::{feature::Id, Feature, Geometry, JsonObject, JsonValue, Value};

/// Capabilities the polling framework needs from an entry.
pub trait TrackedEntry {
    /// Identifier used to recognise the same entity across polls.
    fn external_id(&self) -> &str;

    /// The underlying base entry.
    fn base(&self) -> &FeedEntry;

    /// Distance from the feed's home coordinates in kilometres.
    fn distance_to_home(&self) -> f64 {
        self.base().distance_to_home()
    }
}

#[derive(Debug, Clone)]
pub struct FeedEntry {
    home_coordinates: Coordinates,
    feature: Feature,
}

impl FeedEntry {
    pub fn new(home_coordinates: Coordinates, feature: Feature) -> Self {
        Self {
            home_coordinates,
            feature,
        }
    }

    pub fn home_coordinates(&self) -> Coordinates {
        self.home_coordinates
    }

    pub fn feature(&self) -> &Feature {
        &self.feature
    }

    /// Representative coordinates of the feature's geometry, if it has one.
    pub fn coordinates(&self) -> Option<Coordinates> {
        self.feature
            .geometry
            .as_ref()
            .and_then(geo::representative_coordinates)
    }

    /// Distance in kilometres from home to the nearest part of the geometry.
    ///
    /// Features without geometry are infinitely far away, so any radius
    /// filter excludes them.
    pub fn distance_to_home(&self) -> f64 {
        self.feature
            .geometry
            .as_ref()
            .map(|geometry| geo::distance_to_geometry(self.home_coordinates, geometry))
            .unwrap_or(f64::INFINITY)
    }

    /// Members of a geometry collection, or the single geometry.
    pub fn geometries(&self) -> Vec<&Geometry> {
        match &self.feature.geometry {
            Some(Geometry {
                value: Value::GeometryCollection(members),
                ..
            }) => members.iter().collect(),
            Some(geometry) => vec![geometry],
            None => Vec::new(),
        }
    }

    /// Looks up a top-level member of the feature object.
    ///
    /// `"id"` maps to the feature identifier; any other key is looked up in
    /// the feature's foreign members.
    pub fn search_in_feature(&self, key: &str) -> Option<JsonValue> {
        if key == "id" {
            return self.feature.id.as_ref().map(|id| match id {
                Id::String(s) => JsonValue::String(s.clone()),
                Id::Number(n) => JsonValue::Number(n.clone()),
            });
        }
        self.feature
            .foreign_members
            .as_ref()
            .and_then(|members| members.get(key))
            .cloned()
    }

    /// Looks up a key in the feature's property bag.
    pub fn search_in_properties(&self, key: &str) -> Option<&JsonValue> {
        self.properties().and_then(|properties| properties.get(key))
    }

    pub fn properties(&self) -> Option<&JsonObject> {
        self.feature.properties.as_ref()
    }
}
