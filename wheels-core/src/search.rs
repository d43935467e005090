use serde::{de, Deserialize, Deserializer, Serialize};
use std::fmt::Display;
use std::str::FromStr;

use crate::trip::Trip;

/// Query of `GET /api/trips`. Empty parameters count as absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TripFilter {
    #[serde(
        rename = "inicio",
        default,
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub origin: Option<String>,
    #[serde(
        rename = "cuposDisponibles",
        default,
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub min_available: Option<i32>,
}

impl TripFilter {
    /// Conjunction of the supplied filters. Origin matches as a case-insensitive substring.
    pub fn matches(&self, trip: &Trip) -> bool {
        let origin_ok = match self.origin_needle() {
            Some(needle) => trip.origin.to_lowercase().contains(&needle),
            None => true,
        };
        let seats_ok = self
            .min_available
            .map_or(true, |min| trip.available >= min);
        origin_ok && seats_ok
    }

    pub fn origin_needle(&self) -> Option<String> {
        self.origin
            .as_deref()
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(str::to_lowercase)
    }
}

fn empty_as_none<'de, D, T>(de: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: Display,
{
    let raw = Option::<String>::deserialize(de)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => s.parse::<T>().map(Some).map_err(de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trip::NewTrip;
    use chrono::Utc;
    use uuid::Uuid;

    fn trip(origin: &str, capacity: i32, booked: i32) -> Trip {
        let draft = NewTrip {
            origin: origin.to_string(),
            destination: "Campus".to_string(),
            route: None,
            departure_at: Utc::now(),
            capacity,
            fare: None,
        };
        let mut trip = Trip::new(Uuid::new_v4(), &draft, 6000);
        trip.available -= booked;
        trip
    }

    #[test]
    fn test_filters_are_a_conjunction() {
        let filter = TripFilter {
            origin: Some("norte".to_string()),
            min_available: Some(2),
        };
        assert!(filter.matches(&trip("Portal Norte", 4, 1)));
        assert!(!filter.matches(&trip("Portal Norte", 4, 3)));
        assert!(!filter.matches(&trip("Suba", 4, 0)));
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        let filter = TripFilter::default();
        assert!(filter.matches(&trip("Suba", 1, 1)));
    }

    #[test]
    fn test_empty_query_values_are_absent() {
        let filter: TripFilter =
            serde_json::from_value(serde_json::json!({"inicio": "", "cuposDisponibles": ""}))
                .unwrap();
        assert_eq!(filter, TripFilter::default());

        let filter: TripFilter =
            serde_json::from_value(serde_json::json!({"cuposDisponibles": "2"})).unwrap();
        assert_eq!(filter.min_available, Some(2));

        let bad: Result<TripFilter, _> =
            serde_json::from_value(serde_json::json!({"cuposDisponibles": "dos"}));
        assert!(bad.is_err());
    }
}
