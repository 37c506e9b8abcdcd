//! Normalized entry for generic GeoJSON feeds.
//!
//! Every derived field is computed once, when the entry is built, so a
//! [`GenericFeedEntry`] is immutable and reading it never fails.

use crate::client::entry::{FeedEntry, TrackedEntry};
use crate::client::geo::Coordinates;
use chrono::{DateTime, NaiveDateTime, Utc};
use geojson::{Feature, Geometry, JsonObject, JsonValue};
use sha2::{Digest, Sha256};
use std::fmt;
use thiserror::Error;

const ATTR_ID: &str = "id";
const ATTR_GUID: &str = "guid";
const ATTR_PUB_DATE: &str = "pubDate";
const ATTR_TITLE: &str = "title";

/// Format of the `pubDate` property, e.g. `21/09/2018 6:30:00 AM`.
const PUB_DATE_FORMAT: &str = "%d/%m/%Y %I:%M:%S %p";

#[derive(Debug, Error)]
pub enum EntryError {
    /// `pubDate` is present but does not match `DD/MM/YYYY hh:mm:ss AM|PM`
    #[error("Invalid publication date {value:?}: {source}")]
    PublicationDate {
        value: String,
        #[source]
        source: chrono::ParseError,
    },
    /// `pubDate` is present but not a string
    #[error("Publication date must be a string, found {0}")]
    PublicationDateType(String),
}

/// Where an external id may come from, strongest signal first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IdSource {
    FeatureId,
    PropertyId,
    PropertyGuid,
    Title,
}

const ID_SOURCES: [IdSource; 4] = [
    IdSource::FeatureId,
    IdSource::PropertyId,
    IdSource::PropertyGuid,
    IdSource::Title,
];

impl IdSource {
    fn lookup(self, base: &FeedEntry) -> Option<String> {
        match self {
            Self::FeatureId => base.search_in_feature(ATTR_ID).as_ref().and_then(identity_text),
            Self::PropertyId => base.search_in_properties(ATTR_ID).and_then(identity_text),
            Self::PropertyGuid => base.search_in_properties(ATTR_GUID).and_then(identity_text),
            Self::Title => base.search_in_properties(ATTR_TITLE).and_then(identity_text),
        }
    }
}

/// One feature of a generic GeoJSON feed.
#[derive(Debug, Clone)]
pub struct GenericFeedEntry {
    base: FeedEntry,
    title: Option<String>,
    external_id: String,
    publication_date: Option<DateTime<Utc>>,
}

impl GenericFeedEntry {
    /// Normalizes `feature` relative to `home_coordinates`.
    ///
    /// # Errors
    ///
    /// Returns [`EntryError`] when `pubDate` is present but malformed.
    pub fn new(home_coordinates: Coordinates, feature: Feature) -> Result<Self, EntryError> {
        let base = FeedEntry::new(home_coordinates, feature);

        let title = base.search_in_properties(ATTR_TITLE).and_then(|value| match value {
            JsonValue::Null => None,
            JsonValue::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        });

        let external_id = ID_SOURCES
            .iter()
            .find_map(|source| source.lookup(&base))
            .unwrap_or_else(|| geometry_id(base.feature().geometry.as_ref()));

        let publication_date = match base.search_in_properties(ATTR_PUB_DATE) {
            None | Some(JsonValue::Null) => None,
            Some(JsonValue::String(s)) if s.is_empty() => None,
            Some(JsonValue::String(s)) => Some(parse_publication_date(s)?),
            Some(other) => return Err(EntryError::PublicationDateType(other.to_string())),
        };

        Ok(Self {
            base,
            title,
            external_id,
            publication_date,
        })
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn external_id(&self) -> &str {
        &self.external_id
    }

    pub fn publication_date(&self) -> Option<DateTime<Utc>> {
        self.publication_date
    }

    /// The feature's property bag exactly as received, or `None` when the
    /// feature has no properties.
    pub fn properties(&self) -> Option<&JsonObject> {
        self.base.properties().filter(|properties| !properties.is_empty())
    }

    pub fn coordinates(&self) -> Option<Coordinates> {
        self.base.coordinates()
    }

    pub fn distance_to_home(&self) -> f64 {
        self.base.distance_to_home()
    }

    pub fn geometries(&self) -> Vec<&Geometry> {
        self.base.geometries()
    }

    pub fn feature(&self) -> &Feature {
        self.base.feature()
    }
}

impl TrackedEntry for GenericFeedEntry {
    fn external_id(&self) -> &str {
        &self.external_id
    }

    fn base(&self) -> &FeedEntry {
        &self.base
    }
}

impl fmt::Display for GenericFeedEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<GenericFeedEntry(id={})>", self.external_id)
    }
}

/// Parses `DD/MM/YYYY hh:mm:ss AM|PM`, reading the wall clock as UTC.
pub fn parse_publication_date(value: &str) -> Result<DateTime<Utc>, EntryError> {
    NaiveDateTime::parse_from_str(value.trim(), PUB_DATE_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|source| EntryError::PublicationDate {
            value: value.to_string(),
            source,
        })
}

/// Text form of an identity value, or `None` when it carries no identity.
///
/// Null, `false`, zero and empty strings, arrays or objects carry none.
/// Whitespace is kept as is: `"  "` is a valid id.
fn identity_text(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::Null | JsonValue::Bool(false) => None,
        JsonValue::Number(n) if n.as_f64() == Some(0.0) => None,
        JsonValue::String(s) if s.is_empty() => None,
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Array(items) if items.is_empty() => None,
        JsonValue::Object(members) if members.is_empty() => None,
        other => Some(other.to_string()),
    }
}

/// Last-resort id: SHA-256 of the geometry's JSON form.
///
/// Identical geometry yields the same id in every process, so restarts do
/// not make tracked entities churn.
fn geometry_id(geometry: Option<&Geometry>) -> String {
    let canonical = match geometry {
        Some(geometry) => JsonValue::Object(JsonObject::from(geometry)).to_string(),
        None => JsonValue::Null.to_string(),
    };
    let hash = Sha256::digest(canonical.as_bytes());
    format!("geom-{:x}", hash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use serde_json::json;

    fn home() -> Coordinates {
        Coordinates::new(-31.0, 151.0)
    }

    fn point_feature(properties: JsonValue) -> Feature {
        Feature::from_json_value(json!({
            "type": "Feature",
            "geometry": {"type": "Point", "coordinates": [149.1234, -37.2345]},
            "properties": properties
        }))
        .unwrap()
    }

    fn entry(properties: JsonValue) -> GenericFeedEntry {
        GenericFeedEntry::new(home(), point_feature(properties)).unwrap()
    }

    #[test]
    fn test_title_from_properties() {
        assert_eq!(entry(json!({"title": "Title 1"})).title(), Some("Title 1"));
        assert_eq!(entry(json!({"category": "x"})).title(), None);
    }

    #[test]
    fn test_feature_level_id_wins() {
        let feature = Feature::from_json_value(json!({
            "type": "Feature",
            "id": "outer",
            "geometry": {"type": "Point", "coordinates": [149.0, -37.0]},
            "properties": {"id": "inner", "guid": "g", "title": "t"}
        }))
        .unwrap();
        let entry = GenericFeedEntry::new(home(), feature).unwrap();
        assert_eq!(entry.external_id(), "outer");
    }

    #[test]
    fn test_numeric_feature_id() {
        let feature = Feature::from_json_value(json!({
            "type": "Feature",
            "id": 17,
            "geometry": null,
            "properties": {}
        }))
        .unwrap();
        let entry = GenericFeedEntry::new(home(), feature).unwrap();
        assert_eq!(entry.external_id(), "17");
    }

    #[test]
    fn test_fallback_chain_order() {
        assert_eq!(
            entry(json!({"id": "i", "guid": "g", "title": "t"})).external_id(),
            "i"
        );
        assert_eq!(entry(json!({"guid": "g", "title": "t"})).external_id(), "g");
        assert_eq!(entry(json!({"title": "t"})).external_id(), "t");
    }

    #[test]
    fn test_empty_values_fall_through() {
        assert_eq!(
            entry(json!({"id": "", "guid": null, "title": "t"})).external_id(),
            "t"
        );
        assert_eq!(entry(json!({"id": 0, "guid": "g"})).external_id(), "g");
        assert_eq!(entry(json!({"id": 0.0, "guid": "g"})).external_id(), "g");
        assert_eq!(entry(json!({"id": false, "guid": "g"})).external_id(), "g");
        assert_eq!(entry(json!({"id": [], "guid": {}, "title": "t"})).external_id(), "t");
    }

    #[test]
    fn test_whitespace_id_is_kept() {
        assert_eq!(entry(json!({"id": "  ", "guid": "g"})).external_id(), "  ");
        assert_eq!(entry(json!({"title": " "})).external_id(), " ");
    }

    #[test]
    fn test_truthy_scalars_become_ids() {
        assert_eq!(entry(json!({"id": 7, "guid": "g"})).external_id(), "7");
        assert_eq!(entry(json!({"id": true, "guid": "g"})).external_id(), "true");
    }

    #[test]
    fn test_zero_feature_id_falls_through() {
        let feature = Feature::from_json_value(json!({
            "type": "Feature",
            "id": 0,
            "geometry": null,
            "properties": {"guid": "g"}
        }))
        .unwrap();
        let entry = GenericFeedEntry::new(home(), feature).unwrap();
        assert_eq!(entry.external_id(), "g");
    }

    #[test]
    fn test_geometry_fallback_is_deterministic() {
        let a = entry(json!({"category": "Category 1"}));
        let b = entry(json!({"category": "Category 2"}));
        assert!(a.external_id().starts_with("geom-"));
        assert_eq!(a.external_id(), b.external_id());
    }

    #[test]
    fn test_geometry_fallback_differs_by_geometry() {
        let other = Feature::from_json_value(json!({
            "type": "Feature",
            "geometry": {"type": "Point", "coordinates": [150.0, -30.0]},
            "properties": {}
        }))
        .unwrap();
        let a = entry(json!({}));
        let b = GenericFeedEntry::new(home(), other).unwrap();
        assert_ne!(a.external_id(), b.external_id());
    }

    #[test]
    fn test_geometry_fallback_without_geometry() {
        let feature = Feature::from_json_value(json!({
            "type": "Feature",
            "geometry": null,
            "properties": null
        }))
        .unwrap();
        let entry = GenericFeedEntry::new(home(), feature).unwrap();
        assert!(entry.external_id().starts_with("geom-"));
        assert!(entry.external_id().len() > "geom-".len());
    }

    #[test]
    fn test_publication_date_parsed_as_utc() {
        let entry = entry(json!({"pubDate": "21/09/2018 6:30:00 AM"}));
        assert_eq!(
            entry.publication_date(),
            Some(Utc.with_ymd_and_hms(2018, 9, 21, 6, 30, 0).unwrap())
        );
    }

    #[test]
    fn test_publication_date_pm_and_noon() {
        let pm = entry(json!({"pubDate": "15/09/2018 9:31:00 PM"}));
        assert_eq!(
            pm.publication_date(),
            Some(Utc.with_ymd_and_hms(2018, 9, 15, 21, 31, 0).unwrap())
        );
        let noon = entry(json!({"pubDate": "01/01/2020 12:00:00 PM"}));
        assert_eq!(
            noon.publication_date(),
            Some(Utc.with_ymd_and_hms(2020, 1, 1, 12, 0, 0).unwrap())
        );
        let midnight = entry(json!({"pubDate": "01/01/2020 12:00:00 AM"}));
        assert_eq!(
            midnight.publication_date(),
            Some(Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_missing_publication_date_is_none() {
        assert_eq!(entry(json!({"title": "t"})).publication_date(), None);
    }

    #[test]
    fn test_malformed_publication_date_is_error() {
        let result = GenericFeedEntry::new(
            home(),
            point_feature(json!({"pubDate": "2018-09-21T06:30:00Z"})),
        );
        match result {
            Err(EntryError::PublicationDate { value, .. }) => {
                assert_eq!(value, "2018-09-21T06:30:00Z")
            }
            other => panic!("Expected PublicationDate error, got {:?}", other),
        }
    }

    #[test]
    fn test_non_string_publication_date_is_error() {
        let result = GenericFeedEntry::new(home(), point_feature(json!({"pubDate": 1537511400})));
        assert!(matches!(result, Err(EntryError::PublicationDateType(_))));
    }

    #[test]
    fn test_properties_passthrough() {
        let properties = json!({
            "title": "Title 1",
            "category": "Category 1",
            "guid": "1234",
            "pubDate": "21/09/2018 6:30:00 AM",
            "description": "Description 1"
        });
        let entry = entry(properties.clone());
        assert_eq!(
            entry.properties().cloned().map(JsonValue::Object),
            Some(properties)
        );
    }

    #[test]
    fn test_empty_properties_are_none() {
        assert!(entry(json!({})).properties().is_none());
        assert!(entry(JsonValue::Null).properties().is_none());
    }

    #[test]
    fn test_display() {
        assert_eq!(
            entry(json!({"guid": "1234"})).to_string(),
            "<GenericFeedEntry(id=1234)>"
        );
    }

    #[test]
    fn test_inherited_geometry_accessors() {
        let entry = entry(json!({"title": "t"}));
        assert_eq!(entry.coordinates(), Some(Coordinates::new(-37.2345, 149.1234)));
        assert!((entry.distance_to_home() - 714.4).abs() < 0.1);
        assert_eq!(entry.geometries().len(), 1);
    }

    proptest! {
        #[test]
        fn prop_property_id_always_wins(
            id in "[a-zA-Z0-9]{1,16}",
            guid in proptest::option::of("[a-z0-9]{1,8}"),
            title in proptest::option::of("[A-Za-z ]{1,20}"),
        ) {
            let mut properties = serde_json::Map::new();
            properties.insert("id".into(), json!(id.clone()));
            if let Some(guid) = guid {
                properties.insert("guid".into(), json!(guid));
            }
            if let Some(title) = title {
                properties.insert("title".into(), json!(title));
            }
            let entry = entry(JsonValue::Object(properties));
            prop_assert_eq!(entry.external_id(), id.as_str());
        }

        #[test]
        fn prop_geometry_fallback_is_stable(lon in -180.0f64..180.0, lat in -90.0f64..90.0) {
            let make = || {
                Feature::from_json_value(json!({
                    "type": "Feature",
                    "geometry": {"type": "Point", "coordinates": [lon, lat]},
                    "properties": {"category": "x"}
                }))
                .unwrap()
            };
            let a = GenericFeedEntry::new(home(), make()).unwrap();
            let b = GenericFeedEntry::new(home(), make()).unwrap();
            prop_assert!(a.external_id().starts_with("geom-"));
            prop_assert_eq!(a.external_id(), b.external_id());
        }
    }
}
