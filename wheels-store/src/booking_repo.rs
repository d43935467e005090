use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;
use wheels_core::fare::total_fare;
use wheels_core::repository::BookingRepository;
use wheels_core::{Booking, CoreError, CoreResult, Trip};

use crate::db_error;
use crate::rows::{bookings_from_rows, BookingRow, TripRow, BOOKING_COLUMNS, TRIP_COLUMNS};
use crate::trip_repo::lock_trip;

pub struct PgBookingRepository {
    pool: PgPool,
}

impl PgBookingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookingRepository for PgBookingRepository {
    async fn create_booking(&self, mut booking: Booking) -> CoreResult<(Booking, Trip)> {
        if booking.seats < 1 {
            return Err(CoreError::validation("cuposReservados must be at least 1"));
        }

        let mut tx = self.pool.begin().await.map_err(db_error)?;

        // Check and decrement in one statement: concurrent bookings serialize on the row.
        let sql = format!(
            r#"
            UPDATE trips
            SET cupos_disponibles = cupos_disponibles - $2, updated_at = NOW()
            WHERE id = $1 AND NOT cancelled AND cupos_disponibles >= $2
            RETURNING {}
            "#,
            TRIP_COLUMNS
        );
        let updated = sqlx::query_as::<_, TripRow>(&sql)
            .bind(booking.trip_id)
            .bind(booking.seats)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_error)?;

        let trip = match updated {
            Some(row) => Trip::from(row),
            None => {
                let current = lock_trip(&mut tx, booking.trip_id).await?;
                return Err(match current {
                    None => CoreError::not_found("Trip"),
                    Some(trip) if trip.is_cancelled() => CoreError::TripCancelled,
                    Some(trip) => CoreError::Capacity {
                        requested: booking.seats,
                        available: trip.available,
                    },
                });
            }
        };

        booking.total_fare = total_fare(trip.fare, booking.seats)?;

        sqlx::query(
            r#"
            INSERT INTO bookings (id, trip_id, passenger_id, cupos_reservados, punto_recogida, estado, tarifa_total, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(booking.id)
        .bind(booking.trip_id)
        .bind(booking.passenger_id)
        .bind(booking.seats)
        .bind(&booking.pickup_point)
        .bind(booking.status.as_str())
        .bind(booking.total_fare)
        .bind(booking.created_at)
        .bind(booking.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

        tx.commit().await.map_err(db_error)?;
        Ok((booking, trip))
    }

    async fn get_booking(&self, id: Uuid) -> CoreResult<Option<Booking>> {
        let sql = format!("SELECT {} FROM bookings WHERE id = $1", BOOKING_COLUMNS);
        let row = sqlx::query_as::<_, BookingRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;
        row.map(Booking::try_from).transpose()
    }

    async fn cancel_booking(&self, id: Uuid) -> CoreResult<Option<(Booking, Trip)>> {
        let trip_id: Option<Uuid> = sqlx::query_scalar("SELECT trip_id FROM bookings WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;
        let trip_id = trip_id.ok_or_else(|| CoreError::not_found("Booking"))?;

        let mut tx = self.pool.begin().await.map_err(db_error)?;
        // Trip first, then booking: same lock order as trip cancellation.
        lock_trip(&mut tx, trip_id).await?;

        let sql = format!(
            r#"
            UPDATE bookings SET estado = 'cancelada', updated_at = NOW()
            WHERE id = $1 AND estado = 'activa'
            RETURNING {}
            "#,
            BOOKING_COLUMNS
        );
        let row = sqlx::query_as::<_, BookingRow>(&sql)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_error)?;
        let booking = match row {
            Some(row) => Booking::try_from(row)?,
            None => return Ok(None),
        };

        let sql = format!(
            r#"
            UPDATE trips
            SET cupos_disponibles = LEAST(cupos, cupos_disponibles + $2), updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            TRIP_COLUMNS
        );
        let trip = sqlx::query_as::<_, TripRow>(&sql)
            .bind(trip_id)
            .bind(booking.seats)
            .fetch_one(&mut *tx)
            .await
            .map_err(db_error)?;

        tx.commit().await.map_err(db_error)?;
        Ok(Some((booking, Trip::from(trip))))
    }

    async fn list_passenger_bookings(&self, passenger_id: Uuid) -> CoreResult<Vec<Booking>> {
        let sql = format!(
            "SELECT {} FROM bookings WHERE passenger_id = $1 ORDER BY created_at DESC",
            BOOKING_COLUMNS
        );
        let rows = sqlx::query_as::<_, BookingRow>(&sql)
            .bind(passenger_id)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;
        bookings_from_rows(rows)
    }
}
