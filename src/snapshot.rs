//! Station snapshot records.
//!
//! [`ApiRecord`] mirrors one entry of the open-data availability feed as it
//! arrives over the wire. [`Snapshot`] is the validated, flat form kept in a
//! store: one observation of one station at one capture time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Latitude/longitude pair of a station.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

/// One entry of the availability feed. Every field is optional upstream.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiRecord {
    pub stationcode: Option<String>,
    pub name: Option<String>,
    pub nom_arrondissement_communes: Option<String>,
    pub coordonnees_geo: Option<GeoPoint>,
    pub mechanical: Option<u32>,
    pub ebike: Option<u32>,
    pub numbikesavailable: Option<u32>,
    pub numdocksavailable: Option<u32>,
    pub capacity: Option<u32>,
}

/// The `{"total_count": .., "results": [..]}` envelope returned by the feed.
#[derive(Debug, Deserialize)]
pub struct ApiPayload {
    #[serde(default)]
    pub total_count: Option<u64>,
    #[serde(default)]
    pub results: Vec<ApiRecord>,
}

/// One observation of one station at one capture time.
///
/// `bikes_available` is expected to equal `mechanical + ebike`, but nothing
/// enforces it; aggregations use whichever field they are defined over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub station_code: String,
    pub name: String,
    pub commune: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub mechanical: u32,
    pub ebike: u32,
    pub bikes_available: u32,
    pub docks_available: u32,
    pub capacity: Option<u32>,
    pub timestamp: Option<DateTime<Utc>>,
}

impl Snapshot {
    /// Builds a snapshot from a feed record stamped with `captured_at`.
    ///
    /// Returns `None` when the record carries no station code. Missing counts
    /// are read as zero.
    pub fn from_api(record: ApiRecord, captured_at: DateTime<Utc>) -> Option<Self> {
        let station_code = record.stationcode.filter(|c| !c.trim().is_empty())?;
        let (lat, lon) = match record.coordonnees_geo {
            Some(p) => (Some(p.lat), Some(p.lon)),
            None => (None, None),
        };

        Some(Snapshot {
            station_code,
            name: record.name.unwrap_or_default(),
            commune: record.nom_arrondissement_communes,
            lat,
            lon,
            mechanical: record.mechanical.unwrap_or(0),
            ebike: record.ebike.unwrap_or(0),
            bikes_available: record.numbikesavailable.unwrap_or(0),
            docks_available: record.numdocksavailable.unwrap_or(0),
            capacity: record.capacity,
            timestamp: Some(captured_at),
        })
    }

    /// Station position, when both coordinates are present.
    pub fn coordinates(&self) -> Option<GeoPoint> {
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => Some(GeoPoint { lat, lon }),
            _ => None,
        }
    }

    /// Store-read boundary check: a record without a station code is unusable.
    pub fn is_valid(&self) -> bool {
        !self.station_code.trim().is_empty()
    }

    pub fn is_empty_station(&self) -> bool {
        self.bikes_available == 0
    }

    pub fn is_full_station(&self) -> bool {
        self.docks_available == 0
    }

    /// Copy of this snapshot re-stamped with another capture time.
    pub fn at(&self, timestamp: DateTime<Utc>) -> Self {
        Snapshot {
            timestamp: Some(timestamp),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_from_api_full_record() {
        let ts = Utc.with_ymd_and_hms(2025, 1, 1, 8, 0, 0).unwrap();
        let json = r#"{
            "stationcode": "16107",
            "name": "Benjamin Godard - Victor Hugo",
            "nom_arrondissement_communes": "Paris",
            "coordonnees_geo": {"lon": 2.275725, "lat": 48.865983},
            "mechanical": 2,
            "ebike": 1,
            "numbikesavailable": 3,
            "numdocksavailable": 32,
            "capacity": 35,
            "is_renting": "OUI"
        }"#;
        let record: ApiRecord = serde_json::from_str(json).unwrap();
        let snap = Snapshot::from_api(record, ts).unwrap();

        assert_eq!(snap.station_code, "16107");
        assert_eq!(snap.commune.as_deref(), Some("Paris"));
        assert_eq!(snap.bikes_available, 3);
        assert_eq!(snap.capacity, Some(35));
        assert_eq!(snap.timestamp, Some(ts));
        assert_eq!(
            snap.coordinates(),
            Some(GeoPoint {
                lat: 48.865983,
                lon: 2.275725
            })
        );
    }

    #[test]
    fn test_from_api_without_station_code() {
        let ts = Utc.with_ymd_and_hms(2025, 1, 1, 8, 0, 0).unwrap();
        let record = ApiRecord {
            name: Some("Ghost".to_string()),
            ..Default::default()
        };
        assert!(Snapshot::from_api(record, ts).is_none());

        let blank = ApiRecord {
            stationcode: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(Snapshot::from_api(blank, ts).is_none());
    }

    #[test]
    fn test_from_api_missing_counts_default_to_zero() {
        let ts = Utc.with_ymd_and_hms(2025, 1, 1, 8, 0, 0).unwrap();
        let record = ApiRecord {
            stationcode: Some("1".to_string()),
            ..Default::default()
        };
        let snap = Snapshot::from_api(record, ts).unwrap();

        assert_eq!(snap.mechanical, 0);
        assert_eq!(snap.ebike, 0);
        assert!(snap.is_empty_station());
        assert!(snap.is_full_station());
        assert!(snap.coordinates().is_none());
    }

    #[test]
    fn test_payload_envelope() {
        let json = r#"{"total_count": 1, "results": [{"stationcode": "42"}]}"#;
        let payload: ApiPayload = serde_json::from_str(json).unwrap();
        assert_eq!(payload.total_count, Some(1));
        assert_eq!(payload.results.len(), 1);
    }
}
