use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    routing::{get, post, put},
    Extension, Json, Router,
};
use chrono::Utc;
use uuid::Uuid;
use wheels_catalog::attach_drivers;
use wheels_core::responses::BookingCancelledResponse;
use wheels_core::{Booking, BookingDetails, NewBooking};
use wheels_shared::models::events::SeatChangeReason;

use crate::{
    error::AppError,
    middleware::{passenger_auth_middleware, Claims},
    state::AppState,
};

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/api/bookings", post(create_booking))
        .route("/api/bookings/my", get(my_bookings))
        .route("/api/bookings/{id}/cancel", put(cancel_booking))
        .route_layer(axum::middleware::from_fn_with_state(state, passenger_auth_middleware))
}

async fn create_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    payload: Result<Json<NewBooking>, JsonRejection>,
) -> Result<(StatusCode, Json<Booking>), AppError> {
    let Json(req) = payload?;
    let (booking, trip) = state.ledger.create(claims.sub, req, Utc::now()).await?;
    state.publish_seats(&trip, SeatChangeReason::BookingCreated);
    Ok((StatusCode::CREATED, Json(booking)))
}

async fn my_bookings(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<BookingDetails>>, AppError> {
    let entries = state.ledger.passenger_bookings(claims.sub).await?;
    let (bookings, trips): (Vec<_>, Vec<_>) = entries.into_iter().unzip();
    let listings = attach_drivers(state.users.as_ref(), trips).await?;

    Ok(Json(
        bookings
            .into_iter()
            .zip(listings)
            .map(|(booking, trip)| BookingDetails { booking, trip })
            .collect(),
    ))
}

async fn cancel_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<BookingCancelledResponse>, AppError> {
    let Path(id) = id?;
    let (booking, trip) = state.ledger.cancel(claims.sub, id).await?;
    state.publish_seats(&trip, SeatChangeReason::BookingCancelled);

    Ok(Json(BookingCancelledResponse {
        message: "Booking cancelled".to_string(),
        booking,
    }))
}
