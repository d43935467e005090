use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;
use wheels_core::repository::{TripMutation, TripRepository};
use wheels_core::{Booking, CoreError, CoreResult, Trip, TripFilter};

use crate::db_error;
use crate::rows::{bookings_from_rows, BookingRow, TripRow, BOOKING_COLUMNS, TRIP_COLUMNS};

pub struct PgTripRepository {
    pool: PgPool,
}

impl PgTripRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Loads a trip and locks its row until the transaction ends.
pub(crate) async fn lock_trip(tx: &mut Transaction<'_, Postgres>, id: Uuid) -> CoreResult<Option<Trip>> {
    let sql = format!("SELECT {} FROM trips WHERE id = $1 FOR UPDATE", TRIP_COLUMNS);
    let row = sqlx::query_as::<_, TripRow>(&sql)
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(db_error)?;
    Ok(row.map(Trip::from))
}

#[async_trait]
impl TripRepository for PgTripRepository {
    async fn insert_trip(&self, trip: &Trip) -> CoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO trips (id, driver_id, inicio, destino, ruta, hora, cupos, cupos_disponibles, tarifa, cancelled, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(trip.id)
        .bind(trip.driver_id)
        .bind(&trip.origin)
        .bind(&trip.destination)
        .bind(&trip.route)
        .bind(trip.departure_at)
        .bind(trip.capacity)
        .bind(trip.available)
        .bind(trip.fare)
        .bind(trip.is_cancelled())
        .bind(trip.created_at)
        .bind(trip.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(())
    }

    async fn get_trip(&self, id: Uuid) -> CoreResult<Option<Trip>> {
        let sql = format!("SELECT {} FROM trips WHERE id = $1", TRIP_COLUMNS);
        let row = sqlx::query_as::<_, TripRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(row.map(Trip::from))
    }

    async fn list_trips(&self, filter: &TripFilter) -> CoreResult<Vec<Trip>> {
        let sql = format!(
            r#"
            SELECT {} FROM trips
            WHERE ($1::TEXT IS NULL OR LOWER(inicio) LIKE '%' || $1 || '%')
              AND ($2::INT IS NULL OR cupos_disponibles >= $2)
            ORDER BY hora ASC, created_at ASC
            "#,
            TRIP_COLUMNS
        );
        let needle = filter.origin_needle().map(|n| escape_like(&n));
        let rows = sqlx::query_as::<_, TripRow>(&sql)
            .bind(needle)
            .bind(filter.min_available)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(rows.into_iter().map(Trip::from).collect())
    }

    async fn list_driver_trips(&self, driver_id: Uuid) -> CoreResult<Vec<Trip>> {
        let sql = format!(
            "SELECT {} FROM trips WHERE driver_id = $1 ORDER BY hora DESC",
            TRIP_COLUMNS
        );
        let rows = sqlx::query_as::<_, TripRow>(&sql)
            .bind(driver_id)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(rows.into_iter().map(Trip::from).collect())
    }

    async fn get_trips(&self, ids: &[Uuid]) -> CoreResult<Vec<Trip>> {
        let sql = format!("SELECT {} FROM trips WHERE id = ANY($1)", TRIP_COLUMNS);
        let rows = sqlx::query_as::<_, TripRow>(&sql)
            .bind(ids)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(rows.into_iter().map(Trip::from).collect())
    }

    async fn modify_trip(&self, id: Uuid, mutation: TripMutation<'_>) -> CoreResult<Trip> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;
        let mut trip = lock_trip(&mut tx, id)
            .await?
            .ok_or_else(|| CoreError::not_found("Trip"))?;

        // Dropping `tx` on error rolls back and releases the lock.
        mutation(&mut trip)?;

        sqlx::query(
            r#"
            UPDATE trips
            SET inicio = $2, destino = $3, ruta = $4, hora = $5, cupos = $6,
                cupos_disponibles = $7, tarifa = $8, cancelled = $9, updated_at = $10
            WHERE id = $1
            "#,
        )
        .bind(trip.id)
        .bind(&trip.origin)
        .bind(&trip.destination)
        .bind(&trip.route)
        .bind(trip.departure_at)
        .bind(trip.capacity)
        .bind(trip.available)
        .bind(trip.fare)
        .bind(trip.is_cancelled())
        .bind(trip.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

        tx.commit().await.map_err(db_error)?;
        Ok(trip)
    }

    async fn cancel_trip(&self, id: Uuid) -> CoreResult<(Trip, Vec<Booking>)> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;
        let trip = lock_trip(&mut tx, id)
            .await?
            .ok_or_else(|| CoreError::not_found("Trip"))?;
        if trip.is_cancelled() {
            return Ok((trip, Vec::new()));
        }

        let sql = format!(
            r#"
            UPDATE bookings SET estado = 'cancelada', updated_at = NOW()
            WHERE trip_id = $1 AND estado = 'activa'
            RETURNING {}
            "#,
            BOOKING_COLUMNS
        );
        let released = sqlx::query_as::<_, BookingRow>(&sql)
            .bind(id)
            .fetch_all(&mut *tx)
            .await
            .map_err(db_error)?;
        let released = bookings_from_rows(released)?;
        let restored: i32 = released.iter().map(|b| b.seats).sum();

        let sql = format!(
            r#"
            UPDATE trips
            SET cancelled = TRUE, cupos_disponibles = LEAST(cupos, cupos_disponibles + $2), updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            TRIP_COLUMNS
        );
        let row = sqlx::query_as::<_, TripRow>(&sql)
            .bind(id)
            .bind(restored)
            .fetch_one(&mut *tx)
            .await
            .map_err(db_error)?;

        tx.commit().await.map_err(db_error)?;
        Ok((Trip::from(row), released))
    }
}

fn escape_like(raw: &str) -> String {
    raw.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}
