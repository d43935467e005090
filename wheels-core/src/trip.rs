use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::identity::DriverSummary;

/// Trip status as exposed on the wire. Never set directly: see [`TripStatus::derive`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TripStatus {
    #[serde(rename = "disponible")]
    Available,
    #[serde(rename = "lleno")]
    Full,
    #[serde(rename = "cancelado")]
    Cancelled,
}

impl TripStatus {
    pub fn derive(available: i32, cancelled: bool) -> Self {
        if cancelled {
            TripStatus::Cancelled
        } else if available == 0 {
            TripStatus::Full
        } else {
            TripStatus::Available
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TripStatus::Available => "disponible",
            TripStatus::Full => "lleno",
            TripStatus::Cancelled => "cancelado",
        }
    }
}

impl fmt::Display for TripStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A ride offer published by a driver.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Trip {
    #[serde(rename = "_id")]
    pub id: Uuid,
    #[serde(rename = "conductorId")]
    pub driver_id: Uuid,
    #[serde(rename = "inicio")]
    pub origin: String,
    #[serde(rename = "destino")]
    pub destination: String,
    #[serde(rename = "ruta", default, skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,
    #[serde(rename = "hora")]
    pub departure_at: DateTime<Utc>,
    #[serde(rename = "cupos")]
    pub capacity: i32,
    #[serde(rename = "cuposDisponibles")]
    pub available: i32,
    #[serde(rename = "tarifa")]
    pub fare: i64,
    #[serde(rename = "estado")]
    pub status: TripStatus,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl Trip {
    /// Builds a fresh trip with every seat available. Inputs are expected to be validated.
    pub fn new(driver_id: Uuid, draft: &NewTrip, fare: i64) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            driver_id,
            origin: draft.origin.trim().to_string(),
            destination: draft.destination.trim().to_string(),
            route: normalize_route(draft.route.as_deref()),
            departure_at: draft.departure_at,
            capacity: draft.capacity,
            available: draft.capacity,
            fare,
            status: TripStatus::Available,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == TripStatus::Cancelled
    }

    /// Seats currently held by active bookings.
    pub fn reserved_seats(&self) -> i32 {
        self.capacity - self.available
    }

    pub fn has_departed(&self, now: DateTime<Utc>) -> bool {
        self.departure_at <= now
    }
}

pub(crate) fn normalize_route(route: Option<&str>) -> Option<String> {
    route
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(String::from)
}

/// Trip plus a snapshot of its driver, as returned by listing endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TripListing {
    #[serde(flatten)]
    pub trip: Trip,
    #[serde(rename = "conductor", default, skip_serializing_if = "Option::is_none")]
    pub driver: Option<DriverSummary>,
}

/// Body of `POST /api/trips`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTrip {
    #[serde(rename = "inicio")]
    pub origin: String,
    #[serde(rename = "destino")]
    pub destination: String,
    #[serde(rename = "ruta", default, skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,
    #[serde(rename = "hora", deserialize_with = "departure::deserialize")]
    pub departure_at: DateTime<Utc>,
    #[serde(rename = "cupos")]
    pub capacity: i32,
    #[serde(rename = "tarifa", default, skip_serializing_if = "Option::is_none")]
    pub fare: Option<i64>,
}

/// Body of `PUT /api/trips/:id`. Absent fields stay untouched; an empty `ruta` clears the route.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TripUpdate {
    #[serde(rename = "inicio", default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    #[serde(rename = "destino", default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    #[serde(rename = "ruta", default, skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,
    #[serde(
        rename = "hora",
        default,
        deserialize_with = "departure::deserialize_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub departure_at: Option<DateTime<Utc>>,
    #[serde(rename = "cupos", default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<i32>,
    #[serde(rename = "tarifa", default, skip_serializing_if = "Option::is_none")]
    pub fare: Option<i64>,
}

impl TripUpdate {
    pub fn is_empty(&self) -> bool {
        self.origin.is_none()
            && self.destination.is_none()
            && self.route.is_none()
            && self.departure_at.is_none()
            && self.capacity.is_none()
            && self.fare.is_none()
    }
}

/// Parses a departure time. Accepts RFC 3339 and the zone-less `datetime-local`
/// form browsers submit (`2025-03-01T07:30`), which is read as UTC.
pub fn parse_departure(raw: &str) -> Result<DateTime<Utc>, String> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    for format in [
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(naive.and_utc());
        }
    }
    Err(format!("invalid departure time '{}'", raw))
}

mod departure {
    use chrono::{DateTime, Utc};
    use serde::{de, Deserialize, Deserializer};

    pub fn deserialize<'de, D>(de: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(de)?;
        super::parse_departure(&raw).map_err(de::Error::custom)
    }

    pub fn deserialize_opt<'de, D>(de: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(de)? {
            Some(raw) => super::parse_departure(&raw)
                .map(Some)
                .map_err(de::Error::custom),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_status_derivation() {
        assert_eq!(TripStatus::derive(3, false), TripStatus::Available);
        assert_eq!(TripStatus::derive(0, false), TripStatus::Full);
        assert_eq!(TripStatus::derive(0, true), TripStatus::Cancelled);
        assert_eq!(TripStatus::derive(4, true), TripStatus::Cancelled);
    }

    #[test]
    fn test_departure_formats() {
        let expected = Utc.with_ymd_and_hms(2030, 3, 1, 7, 30, 0).unwrap();
        assert_eq!(parse_departure("2030-03-01T07:30").unwrap(), expected);
        assert_eq!(parse_departure("2030-03-01T07:30:00Z").unwrap(), expected);
        assert_eq!(parse_departure("2030-03-01T02:30:00-05:00").unwrap(), expected);
        assert!(parse_departure("tomorrow morning").is_err());
    }

    #[test]
    fn test_new_trip_wire_format() {
        let json = r#"
            {
                "inicio": "Portal Norte",
                "destino": "Universidad",
                "ruta": "",
                "hora": "2030-03-01T07:30",
                "cupos": 4,
                "tarifa": 6000
            }
        "#;
        let draft: NewTrip = serde_json::from_str(json).expect("Failed to deserialize");
        let trip = Trip::new(Uuid::new_v4(), &draft, 6000);

        assert_eq!(trip.available, 4);
        assert_eq!(trip.status, TripStatus::Available);
        assert_eq!(trip.route, None);

        let value = serde_json::to_value(&trip).unwrap();
        assert_eq!(value["cuposDisponibles"], 4);
        assert_eq!(value["estado"], "disponible");
        assert!(value.get("ruta").is_none());
    }

    #[test]
    fn test_listing_round_trips_driver_snapshot() {
        let draft = NewTrip {
            origin: "Chía".to_string(),
            destination: "Campus".to_string(),
            route: Some("Autopista".to_string()),
            departure_at: Utc.with_ymd_and_hms(2030, 1, 1, 6, 0, 0).unwrap(),
            capacity: 3,
            fare: None,
        };
        let trip = Trip::new(Uuid::new_v4(), &draft, 5000);
        let listing = TripListing {
            driver: Some(DriverSummary {
                id: trip.driver_id,
                first_name: "Ana".to_string(),
                last_name: "Rojas".to_string(),
                phone: "3001234567".to_string(),
                brand: Some("Mazda".to_string()),
                model: Some("2".to_string()),
                plate: Some("ABC123".to_string()),
            }),
            trip,
        };

        let value = serde_json::to_value(&listing).unwrap();
        assert_eq!(value["conductor"]["placaVehiculo"], "ABC123");
        assert_eq!(value["inicio"], "Chía");

        let back: TripListing = serde_json::from_value(value).unwrap();
        assert_eq!(back, listing);
    }
}
