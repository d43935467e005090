use async_trait::async_trait;
use uuid::Uuid;

use crate::booking::Booking;
use crate::identity::{User, UserRecord};
use crate::search::TripFilter;
use crate::trip::Trip;
use crate::CoreResult;

/// Change applied to a trip while the store holds it exclusively.
pub type TripMutation<'a> = &'a (dyn Fn(&mut Trip) -> CoreResult<()> + Send + Sync);

/// Repository trait for trip data access
#[async_trait]
pub trait TripRepository: Send + Sync {
    async fn insert_trip(&self, trip: &Trip) -> CoreResult<()>;

    async fn get_trip(&self, id: Uuid) -> CoreResult<Option<Trip>>;

    /// Trips matching `filter`, earliest departure first.
    async fn list_trips(&self, filter: &TripFilter) -> CoreResult<Vec<Trip>>;

    /// Trips owned by `driver_id`, latest departure first.
    async fn list_driver_trips(&self, driver_id: Uuid) -> CoreResult<Vec<Trip>>;

    async fn get_trips(&self, ids: &[Uuid]) -> CoreResult<Vec<Trip>>;

    /// Reads, mutates and writes back a trip atomically with respect to bookings.
    async fn modify_trip(&self, id: Uuid, mutation: TripMutation<'_>) -> CoreResult<Trip>;

    /// Cancels the trip and every active booking on it, restoring their seats.
    /// Returns the trip and the bookings cancelled by this call (none if it was already cancelled).
    async fn cancel_trip(&self, id: Uuid) -> CoreResult<(Trip, Vec<Booking>)>;
}

/// Repository trait for the booking ledger
#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Checks availability and takes the seats in one atomic step, then stores the booking
    /// with its fare total. Fails with `NotFound`, `TripCancelled` or `Capacity`.
    async fn create_booking(&self, booking: Booking) -> CoreResult<(Booking, Trip)>;

    async fn get_booking(&self, id: Uuid) -> CoreResult<Option<Booking>>;

    /// Cancels an active booking and restores its seats. Returns `None` when the booking
    /// was no longer active, so seats are restored at most once.
    async fn cancel_booking(&self, id: Uuid) -> CoreResult<Option<(Booking, Trip)>>;

    /// Bookings made by `passenger_id`, newest first.
    async fn list_passenger_bookings(&self, passenger_id: Uuid) -> CoreResult<Vec<Booking>>;
}

/// Repository trait for registered users
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fails with `Conflict` if the email is already registered.
    async fn insert_user(&self, record: &UserRecord) -> CoreResult<()>;

    async fn find_by_email(&self, email: &str) -> CoreResult<Option<UserRecord>>;

    async fn get_user(&self, id: Uuid) -> CoreResult<Option<User>>;

    async fn get_users(&self, ids: &[Uuid]) -> CoreResult<Vec<User>>;

    async fn update_user(&self, user: &User) -> CoreResult<()>;
}
