pub mod booking;
pub mod fare;
pub mod identity;
pub mod repository;
pub mod responses;
pub mod search;
pub mod seats;
pub mod trip;

pub use booking::{Booking, BookingDetails, BookingStatus, NewBooking};
pub use identity::{DriverSummary, NewUser, ProfileUpdate, Role, User, UserRecord, Vehicle};
pub use search::TripFilter;
pub use trip::{NewTrip, Trip, TripListing, TripStatus, TripUpdate};

/// Upper bound on seats a single trip may offer unless configured otherwise.
pub const DEFAULT_MAX_SEATS: i32 = 8;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Only {available} seats available, requested {requested}")]
    Capacity { requested: i32, available: i32 },
    #[error("{0}")]
    Authorization(String),
    #[error("{0}")]
    Authentication(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("Booking is already cancelled")]
    AlreadyCancelled,
    #[error("Trip has been cancelled")]
    TripCancelled,
    #[error("{0}")]
    Conflict(String),
    #[error("Internal service error: {0}")]
    Internal(String),
}

impl CoreError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
