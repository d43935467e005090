use std::convert::Infallible;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post, put},
    Extension, Json, Router,
};
use futures_util::stream::{self, Stream, StreamExt};
use tokio_stream::wrappers::BroadcastStream;
use uuid::Uuid;
use wheels_catalog::attach_drivers;
use wheels_core::responses::MessageResponse;
use wheels_core::{NewTrip, Trip, TripFilter, TripListing, TripUpdate};
use wheels_shared::models::events::{SeatChangeReason, SeatsChangedEvent};

use crate::{
    error::AppError,
    middleware::{driver_auth_middleware, Claims},
    state::AppState,
    users::current_user,
};

pub fn routes(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/api/trips", get(list_trips))
        .route("/api/trips/{id}", get(get_trip))
        .route("/api/trips/{id}/stream", get(trip_stream));

    let driver = Router::new()
        .route("/api/trips", post(create_trip))
        .route("/api/trips/my/trips", get(my_trips))
        .route("/api/trips/{id}", put(update_trip).delete(cancel_trip))
        .route_layer(axum::middleware::from_fn_with_state(state, driver_auth_middleware));

    public.merge(driver)
}

async fn list_trips(
    State(state): State<AppState>,
    query: Result<Query<TripFilter>, QueryRejection>,
) -> Result<Json<Vec<TripListing>>, AppError> {
    let Query(filter) = query?;
    let trips = state.catalog.list(&filter).await?;
    Ok(Json(attach_drivers(state.users.as_ref(), trips).await?))
}

async fn get_trip(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<TripListing>, AppError> {
    let Path(id) = id?;
    let trip = state.catalog.get(id).await?;
    let mut listing = attach_drivers(state.users.as_ref(), vec![trip]).await?;
    listing
        .pop()
        .map(Json)
        .ok_or_else(|| AppError::NotFoundError("Trip not found".to_string()))
}

/// Server-sent `seats_changed` events for one trip, starting with its current state.
async fn trip_stream(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let Path(id) = id?;
    // Subscribe before reading so no change slips between the snapshot and the feed.
    let rx = state.sse_tx.subscribe();
    let trip = state.catalog.get(id).await?;

    let snapshot = SeatsChangedEvent {
        trip_id: trip.id,
        cupos: trip.capacity,
        cupos_disponibles: trip.available,
        estado: trip.status.to_string(),
        reason: SeatChangeReason::TripUpdated,
        timestamp: trip.updated_at.timestamp(),
    };

    let updates = BroadcastStream::new(rx).filter_map(move |result| async move {
        match result {
            Ok(event) if event.trip_id == id => Some(event),
            // Lagged receivers skip what they missed.
            _ => None,
        }
    });

    let stream = stream::once(async move { snapshot })
        .chain(updates)
        .filter_map(|event| async move {
            Event::default()
                .event("seats_changed")
                .json_data(&event)
                .ok()
                .map(Ok)
        });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

async fn my_trips(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<Trip>>, AppError> {
    Ok(Json(state.catalog.driver_trips(claims.sub).await?))
}

async fn create_trip(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    payload: Result<Json<NewTrip>, JsonRejection>,
) -> Result<(StatusCode, Json<Trip>), AppError> {
    let Json(draft) = payload?;
    let driver = current_user(&state, &claims).await?;
    let trip = state.catalog.create(&driver, draft).await?;
    Ok((StatusCode::CREATED, Json(trip)))
}

async fn update_trip(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<TripUpdate>, JsonRejection>,
) -> Result<Json<Trip>, AppError> {
    let Path(id) = id?;
    let Json(update) = payload?;
    let driver = current_user(&state, &claims).await?;
    let trip = state.catalog.update(id, &driver, update).await?;
    state.publish_seats(&trip, SeatChangeReason::TripUpdated);
    Ok(Json(trip))
}

async fn cancel_trip(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<MessageResponse>, AppError> {
    let Path(id) = id?;
    let (trip, released) = state.catalog.cancel(id, claims.sub).await?;
    state.publish_seats(&trip, SeatChangeReason::TripCancelled);

    let message = match released.len() {
        0 => "Trip cancelled".to_string(),
        n => format!("Trip cancelled, {} bookings were cancelled with it", n),
    };
    Ok(Json(MessageResponse::new(message)))
}
