use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;
use wheels_core::repository::{BookingRepository, TripRepository};
use wheels_core::{Booking, CoreError, CoreResult, NewBooking, Trip};

/// Seat reservations made by passengers.
///
/// The seat check and the decrement happen inside the store in one step; the checks
/// done here only reject requests that can never succeed.
pub struct BookingLedger {
    trips: Arc<dyn TripRepository>,
    bookings: Arc<dyn BookingRepository>,
}

impl BookingLedger {
    pub fn new(trips: Arc<dyn TripRepository>, bookings: Arc<dyn BookingRepository>) -> Self {
        Self { trips, bookings }
    }

    /// Books seats for `passenger_id`. Returns the booking and the trip after the decrement.
    pub async fn create(
        &self,
        passenger_id: Uuid,
        request: NewBooking,
        now: DateTime<Utc>,
    ) -> CoreResult<(Booking, Trip)> {
        if request.seats < 1 {
            return Err(CoreError::validation("cuposReservados must be at least 1"));
        }
        if request.pickup_point.trim().is_empty() {
            return Err(CoreError::validation("puntoRecogida is required"));
        }

        let trip = self
            .trips
            .get_trip(request.trip_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Trip"))?;
        if trip.is_cancelled() {
            return Err(CoreError::TripCancelled);
        }
        if trip.has_departed(now) {
            return Err(CoreError::validation("this trip has already departed"));
        }

        let booking = Booking::new(passenger_id, &request);
        match self.bookings.create_booking(booking).await {
            Ok((booking, trip)) => {
                info!(
                    "Booking {} confirmed: {} seats on trip {} ({} left)",
                    booking.id, booking.seats, trip.id, trip.available
                );
                Ok((booking, trip))
            }
            Err(err @ CoreError::Capacity { .. }) => {
                warn!("Booking rejected on trip {}: {}", request.trip_id, err);
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    /// Cancels a booking made by `passenger_id` and gives its seats back to the trip.
    pub async fn cancel(&self, passenger_id: Uuid, booking_id: Uuid) -> CoreResult<(Booking, Trip)> {
        let booking = self
            .bookings
            .get_booking(booking_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Booking"))?;
        if booking.passenger_id != passenger_id {
            return Err(CoreError::Authorization(
                "You can only cancel your own bookings".to_string(),
            ));
        }
        if !booking.is_active() {
            return Err(CoreError::AlreadyCancelled);
        }

        // A concurrent cancel may win between the read above and this call.
        let (booking, trip) = self
            .bookings
            .cancel_booking(booking_id)
            .await?
            .ok_or(CoreError::AlreadyCancelled)?;

        info!(
            "Booking {} cancelled: {} seats back on trip {}",
            booking.id, booking.seats, trip.id
        );
        Ok((booking, trip))
    }

    /// The passenger's bookings, newest first, each with its trip.
    pub async fn passenger_bookings(&self, passenger_id: Uuid) -> CoreResult<Vec<(Booking, Trip)>> {
        let bookings = self.bookings.list_passenger_bookings(passenger_id).await?;

        let mut trip_ids: Vec<_> = bookings.iter().map(|b| b.trip_id).collect();
        trip_ids.sort_unstable();
        trip_ids.dedup();
        let trips: HashMap<_, _> = self
            .trips
            .get_trips(&trip_ids)
            .await?
            .into_iter()
            .map(|t| (t.id, t))
            .collect();

        Ok(bookings
            .into_iter()
            .filter_map(|b| trips.get(&b.trip_id).cloned().map(|t| (b, t)))
            .collect())
    }
}
