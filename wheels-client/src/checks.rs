//! Fast local checks run before a request. The server still decides.

use wheels_core::fare::total_fare;
use wheels_core::{BookingDetails, Trip, DEFAULT_MAX_SEATS};

use crate::error::ClientError;

pub fn check_capacity(capacity: i32) -> Result<(), ClientError> {
    if !(1..=DEFAULT_MAX_SEATS).contains(&capacity) {
        return Err(ClientError::Validation(format!(
            "cupos must be between 1 and {}",
            DEFAULT_MAX_SEATS
        )));
    }
    Ok(())
}

pub fn check_seats(trip: &Trip, seats: i32) -> Result<(), ClientError> {
    if seats < 1 {
        return Err(ClientError::Validation("cuposReservados must be at least 1".to_string()));
    }
    if seats > trip.available {
        return Err(ClientError::Capacity(format!(
            "Only {} seats available, requested {}",
            trip.available, seats
        )));
    }
    Ok(())
}

/// What the passenger pays for a listed booking, `None` on overflow.
pub fn booking_total(details: &BookingDetails) -> Option<i64> {
    total_fare(details.trip.trip.fare, details.booking.seats).ok()
}
