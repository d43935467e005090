use chrono::{DateTime, Utc};
use uuid::Uuid;
use wheels_core::{Booking, BookingStatus, CoreError, CoreResult, Trip, TripStatus};

pub(crate) const TRIP_COLUMNS: &str = "id, driver_id, inicio, destino, ruta, hora, cupos, cupos_disponibles, tarifa, cancelled, created_at, updated_at";

pub(crate) const BOOKING_COLUMNS: &str = "id, trip_id, passenger_id, cupos_reservados, punto_recogida, estado, tarifa_total, created_at, updated_at";

#[derive(sqlx::FromRow)]
pub(crate) struct TripRow {
    id: Uuid,
    driver_id: Uuid,
    inicio: String,
    destino: String,
    ruta: Option<String>,
    hora: DateTime<Utc>,
    cupos: i32,
    cupos_disponibles: i32,
    tarifa: i64,
    cancelled: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<TripRow> for Trip {
    fn from(row: TripRow) -> Self {
        Trip {
            id: row.id,
            driver_id: row.driver_id,
            origin: row.inicio,
            destination: row.destino,
            route: row.ruta,
            departure_at: row.hora,
            capacity: row.cupos,
            available: row.cupos_disponibles,
            fare: row.tarifa,
            status: TripStatus::derive(row.cupos_disponibles, row.cancelled),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct BookingRow {
    id: Uuid,
    trip_id: Uuid,
    passenger_id: Uuid,
    cupos_reservados: i32,
    punto_recogida: String,
    estado: String,
    tarifa_total: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<BookingRow> for Booking {
    type Error = CoreError;

    fn try_from(row: BookingRow) -> CoreResult<Self> {
        let status = BookingStatus::parse(&row.estado)
            .ok_or_else(|| CoreError::Internal(format!("unknown booking status '{}'", row.estado)))?;
        Ok(Booking {
            id: row.id,
            trip_id: row.trip_id,
            passenger_id: row.passenger_id,
            seats: row.cupos_reservados,
            pickup_point: row.punto_recogida,
            status,
            total_fare: row.tarifa_total,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

pub(crate) fn bookings_from_rows(rows: Vec<BookingRow>) -> CoreResult<Vec<Booking>> {
    rows.into_iter().map(Booking::try_from).collect()
}
