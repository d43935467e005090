//! Seat accounting on a single trip.
//!
//! Every mutation keeps `0 <= available <= capacity` and re-derives the status,
//! so callers never set `estado` by hand.

use chrono::Utc;
use tracing::warn;

use crate::fare::validate_fare;
use crate::trip::{normalize_route, Trip, TripStatus, TripUpdate};
use crate::{CoreError, CoreResult};

pub fn validate_capacity(capacity: i32, max_seats: i32) -> CoreResult<()> {
    if !(1..=max_seats).contains(&capacity) {
        return Err(CoreError::validation(format!(
            "cupos must be between 1 and {}",
            max_seats
        )));
    }
    Ok(())
}

impl Trip {
    /// Takes `seats` out of the available pool.
    pub fn reserve_seats(&mut self, seats: i32) -> CoreResult<()> {
        if self.is_cancelled() {
            return Err(CoreError::TripCancelled);
        }
        if seats < 1 {
            return Err(CoreError::validation("cuposReservados must be at least 1"));
        }
        if seats > self.available {
            return Err(CoreError::Capacity {
                requested: seats,
                available: self.available,
            });
        }

        self.available -= seats;
        self.touch();
        Ok(())
    }

    /// Returns `seats` to the pool, never above capacity. Returns false when the pool
    /// overflowed, which means the bookings and the trip disagree.
    pub fn release_seats(&mut self, seats: i32) -> bool {
        let restored = self.available + seats.max(0);
        let fits = restored <= self.capacity;
        if !fits {
            warn!(
                trip_id = %self.id,
                seats,
                available = self.available,
                capacity = self.capacity,
                "Released seats exceed capacity; clamping"
            );
        }
        self.available = restored.min(self.capacity);
        self.touch();
        fits
    }

    /// Changes capacity while keeping the seats already held by bookings.
    pub fn resize(&mut self, capacity: i32, max_seats: i32) -> CoreResult<()> {
        validate_capacity(capacity, max_seats)?;
        let reserved = self.reserved_seats();
        if capacity < reserved {
            return Err(CoreError::validation(format!(
                "cupos cannot be lower than the {} seats already booked",
                reserved
            )));
        }

        self.capacity = capacity;
        self.available = capacity - reserved;
        self.touch();
        Ok(())
    }

    /// Marks the trip cancelled. Returns false if it already was.
    pub fn cancel(&mut self) -> bool {
        if self.is_cancelled() {
            return false;
        }
        self.status = TripStatus::Cancelled;
        self.updated_at = Utc::now();
        true
    }

    /// Applies a driver edit. The whole edit is rejected if any field is invalid.
    pub fn apply_update(&mut self, update: &TripUpdate, max_seats: i32) -> CoreResult<()> {
        if self.is_cancelled() {
            return Err(CoreError::TripCancelled);
        }

        let mut next = self.clone();
        if let Some(origin) = &update.origin {
            next.origin = non_blank("inicio", origin)?;
        }
        if let Some(destination) = &update.destination {
            next.destination = non_blank("destino", destination)?;
        }
        if let Some(route) = &update.route {
            next.route = normalize_route(Some(route));
        }
        if let Some(departure_at) = update.departure_at {
            next.departure_at = departure_at;
        }
        if let Some(fare) = update.fare {
            validate_fare(fare)?;
            next.fare = fare;
        }
        if let Some(capacity) = update.capacity {
            next.resize(capacity, max_seats)?;
        }

        next.touch();
        *self = next;
        Ok(())
    }

    fn touch(&mut self) {
        self.status = TripStatus::derive(self.available, self.is_cancelled());
        self.updated_at = Utc::now();
    }
}

fn non_blank(field: &str, value: &str) -> CoreResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CoreError::validation(format!("{} is required", field)));
    }
    Ok(trimmed.to_string())
}
