use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::trip::TripListing;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum BookingStatus {
    #[serde(rename = "activa")]
    Active,
    #[serde(rename = "cancelada")]
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            BookingStatus::Active => "activa",
            BookingStatus::Cancelled => "cancelada",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "activa" => Some(BookingStatus::Active),
            "cancelada" => Some(BookingStatus::Cancelled),
            _ => None,
        }
    }
}

/// A passenger's seat reservation. Cancelled bookings are kept for history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Booking {
    #[serde(rename = "_id")]
    pub id: Uuid,
    #[serde(rename = "tripId")]
    pub trip_id: Uuid,
    #[serde(rename = "pasajero")]
    pub passenger_id: Uuid,
    #[serde(rename = "cuposReservados")]
    pub seats: i32,
    #[serde(rename = "puntoRecogida")]
    pub pickup_point: String,
    #[serde(rename = "estado")]
    pub status: BookingStatus,
    /// Fare per seat times seats, fixed when the booking was made.
    #[serde(rename = "tarifaTotal")]
    pub total_fare: i64,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    /// New active booking. `total_fare` is filled in by the store when seats are reserved.
    pub fn new(passenger_id: Uuid, request: &NewBooking) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            trip_id: request.trip_id,
            passenger_id,
            seats: request.seats,
            pickup_point: request.pickup_point.trim().to_string(),
            status: BookingStatus::Active,
            total_fare: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == BookingStatus::Active
    }

    /// Returns false when the booking was already cancelled.
    pub fn cancel(&mut self) -> bool {
        if !self.is_active() {
            return false;
        }
        self.status = BookingStatus::Cancelled;
        self.updated_at = Utc::now();
        true
    }
}

/// Body of `POST /api/bookings`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBooking {
    #[serde(rename = "tripId")]
    pub trip_id: Uuid,
    #[serde(rename = "cuposReservados")]
    pub seats: i32,
    #[serde(rename = "puntoRecogida")]
    pub pickup_point: String,
}

/// Booking with a snapshot of its trip and driver, as listed by `GET /api/bookings/my`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookingDetails {
    #[serde(flatten)]
    pub booking: Booking,
    pub trip: TripListing,
}
