use reqwest::Method;
use serde::Serialize;
use serde_json::{json, Value};
use uuid::Uuid;
use wheels_core::identity::{AuthResponse, RegisterResponse};
use wheels_core::responses::{BookingCancelledResponse, MessageResponse};
use wheels_core::{
    Booking, BookingDetails, NewBooking, NewTrip, NewUser, ProfileUpdate, Trip, TripFilter, TripListing,
    TripUpdate, User,
};
use wheels_shared::Masked;

use crate::checks::{check_capacity, check_seats};
use crate::client::ApiClient;
use crate::error::ClientError;
use crate::session::Session;

fn to_body(value: &impl Serialize) -> Result<Value, ClientError> {
    serde_json::to_value(value).map_err(|e| ClientError::Validation(e.to_string()))
}

// Auth & profile
impl ApiClient {
    /// Signs in and stores the session for later requests.
    pub async fn login(&self, email: &str, password: Masked<String>) -> Result<Session, ClientError> {
        let body = json!({ "correo": email, "password": password.expose() });
        let auth: AuthResponse = self.send(Method::POST, "/api/auth/login", Some(body)).await?;

        let session = Session {
            token: auth.token,
            user: auth.user,
        };
        session.save(self.sessions())?;
        Ok(session)
    }

    pub async fn register(&self, registration: &NewUser) -> Result<RegisterResponse, ClientError> {
        self.send(Method::POST, "/api/auth/register", Some(to_body(registration)?))
            .await
    }

    pub fn logout(&self) -> Result<(), ClientError> {
        Session::clear(self.sessions())
    }

    pub async fn me(&self) -> Result<User, ClientError> {
        self.send(Method::GET, "/api/users/me", None).await
    }

    /// Updates the profile and refreshes the stored user.
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<User, ClientError> {
        let user: User = self
            .send(Method::PUT, "/api/users/me", Some(to_body(update)?))
            .await?;
        if let Some(mut session) = self.session()? {
            session.user = user.clone();
            session.save(self.sessions())?;
        }
        Ok(user)
    }
}

// Trips
impl ApiClient {
    pub async fn list_trips(&self, filter: &TripFilter) -> Result<Vec<TripListing>, ClientError> {
        let mut query = Vec::new();
        if let Some(origin) = filter.origin.as_deref().filter(|o| !o.trim().is_empty()) {
            query.push(("inicio", origin.to_string()));
        }
        if let Some(min) = filter.min_available {
            query.push(("cuposDisponibles", min.to_string()));
        }
        self.send_with_query(Method::GET, "/api/trips", &query, None)
            .await
    }

    pub async fn get_trip(&self, id: Uuid) -> Result<TripListing, ClientError> {
        self.send(Method::GET, &format!("/api/trips/{}", id), None).await
    }

    pub async fn my_trips(&self) -> Result<Vec<Trip>, ClientError> {
        self.send(Method::GET, "/api/trips/my/trips", None).await
    }

    pub async fn create_trip(&self, draft: &NewTrip) -> Result<Trip, ClientError> {
        check_capacity(draft.capacity)?;
        self.send(Method::POST, "/api/trips", Some(to_body(draft)?)).await
    }

    pub async fn update_trip(&self, id: Uuid, update: &TripUpdate) -> Result<Trip, ClientError> {
        if let Some(capacity) = update.capacity {
            check_capacity(capacity)?;
        }
        self.send(Method::PUT, &format!("/api/trips/{}", id), Some(to_body(update)?))
            .await
    }

    pub async fn cancel_trip(&self, id: Uuid) -> Result<MessageResponse, ClientError> {
        self.send(Method::DELETE, &format!("/api/trips/{}", id), None)
            .await
    }
}

// Bookings
impl ApiClient {
    /// Books seats on `trip`. Requests that cannot fit the last known availability fail
    /// without reaching the server.
    pub async fn book(&self, trip: &Trip, seats: i32, pickup_point: &str) -> Result<Booking, ClientError> {
        check_seats(trip, seats)?;
        let request = NewBooking {
            trip_id: trip.id,
            seats,
            pickup_point: pickup_point.to_string(),
        };
        self.send(Method::POST, "/api/bookings", Some(to_body(&request)?))
            .await
    }

    pub async fn my_bookings(&self) -> Result<Vec<BookingDetails>, ClientError> {
        self.send(Method::GET, "/api/bookings/my", None).await
    }

    pub async fn cancel_booking(&self, id: Uuid) -> Result<BookingCancelledResponse, ClientError> {
        self.send(Method::PUT, &format!("/api/bookings/{}/cancel", id), None)
            .await
    }
}
