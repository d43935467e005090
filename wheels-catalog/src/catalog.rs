use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;
use wheels_core::fare::{validate_fare, DEFAULT_FARE};
use wheels_core::repository::TripRepository;
use wheels_core::seats::validate_capacity;
use wheels_core::{Booking, CoreError, CoreResult, NewTrip, Trip, TripFilter, TripUpdate, User, DEFAULT_MAX_SEATS};

#[derive(Debug, Clone, Copy)]
pub struct CatalogRules {
    pub max_seats_per_trip: i32,
    pub default_fare: i64,
}

impl Default for CatalogRules {
    fn default() -> Self {
        Self {
            max_seats_per_trip: DEFAULT_MAX_SEATS,
            default_fare: DEFAULT_FARE,
        }
    }
}

/// Publishing, editing and searching trips.
pub struct TripCatalog {
    trips: Arc<dyn TripRepository>,
    rules: CatalogRules,
}

impl TripCatalog {
    pub fn new(trips: Arc<dyn TripRepository>, rules: CatalogRules) -> Self {
        Self { trips, rules }
    }

    pub fn rules(&self) -> CatalogRules {
        self.rules
    }

    pub async fn list(&self, filter: &TripFilter) -> CoreResult<Vec<Trip>> {
        if let Some(min) = filter.min_available {
            if min < 0 {
                return Err(CoreError::validation("cuposDisponibles must not be negative"));
            }
        }
        self.trips.list_trips(filter).await
    }

    pub async fn driver_trips(&self, driver_id: Uuid) -> CoreResult<Vec<Trip>> {
        self.trips.list_driver_trips(driver_id).await
    }

    pub async fn get(&self, id: Uuid) -> CoreResult<Trip> {
        self.trips
            .get_trip(id)
            .await?
            .ok_or_else(|| CoreError::not_found("Trip"))
    }

    /// Publishes a trip for `driver` with every seat available.
    pub async fn create(&self, driver: &User, draft: NewTrip) -> CoreResult<Trip> {
        if !driver.is_driver() {
            return Err(CoreError::Authorization("Only drivers can publish trips".to_string()));
        }
        if draft.origin.trim().is_empty() {
            return Err(CoreError::validation("inicio is required"));
        }
        if draft.destination.trim().is_empty() {
            return Err(CoreError::validation("destino is required"));
        }
        validate_capacity(draft.capacity, self.rules.max_seats_per_trip)?;
        fits_vehicle(driver, draft.capacity)?;
        let fare = draft.fare.unwrap_or(self.rules.default_fare);
        validate_fare(fare)?;

        let trip = Trip::new(driver.id, &draft, fare);
        self.trips.insert_trip(&trip).await?;

        info!(
            "Trip {} published by {}: {} -> {} ({} seats)",
            trip.id, driver.id, trip.origin, trip.destination, trip.capacity
        );
        Ok(trip)
    }

    /// Edits a trip owned by `driver`. A new capacity is held to the same limits as on creation.
    pub async fn update(&self, id: Uuid, driver: &User, update: TripUpdate) -> CoreResult<Trip> {
        self.owned(id, driver.id).await?;
        if update.is_empty() {
            return Err(CoreError::validation("no fields to update"));
        }
        if let Some(capacity) = update.capacity {
            fits_vehicle(driver, capacity)?;
        }

        let max_seats = self.rules.max_seats_per_trip;
        let trip = self
            .trips
            .modify_trip(id, &|trip: &mut Trip| trip.apply_update(&update, max_seats))
            .await?;

        info!("Trip {} updated: {}/{} seats available", trip.id, trip.available, trip.capacity);
        Ok(trip)
    }

    /// Cancels the trip together with its active bookings. Repeating it is harmless.
    pub async fn cancel(&self, id: Uuid, driver_id: Uuid) -> CoreResult<(Trip, Vec<Booking>)> {
        self.owned(id, driver_id).await?;
        let (trip, released) = self.trips.cancel_trip(id).await?;
        if !released.is_empty() {
            warn!("Trip {} cancelled with {} active bookings", trip.id, released.len());
        } else {
            info!("Trip {} cancelled", trip.id);
        }
        Ok((trip, released))
    }

    async fn owned(&self, id: Uuid, driver_id: Uuid) -> CoreResult<Trip> {
        let trip = self.get(id).await?;
        if trip.driver_id != driver_id {
            return Err(CoreError::Authorization(
                "Only the driver who published this trip can change it".to_string(),
            ));
        }
        Ok(trip)
    }
}

fn fits_vehicle(driver: &User, capacity: i32) -> CoreResult<()> {
    match &driver.vehicle {
        Some(vehicle) if capacity > vehicle.capacity => Err(CoreError::validation(format!(
            "cupos cannot exceed the vehicle capacity of {}",
            vehicle.capacity
        ))),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use wheels_core::repository::BookingRepository;
    use wheels_core::{NewBooking, Role, TripStatus, Vehicle};
    use wheels_store::MemoryStore;

    fn driver(capacity: i32) -> User {
        User {
            id: Uuid::new_v4(),
            first_name: "Camilo".to_string(),
            last_name: "Pérez".to_string(),
            university_id: "201912".to_string(),
            email: "camilo@uni.edu.co".to_string(),
            phone: "3105556677".to_string(),
            role: Role::Driver,
            photo: None,
            vehicle: Some(Vehicle {
                plate: "KLM456".to_string(),
                brand: "Chevrolet".to_string(),
                model: "Spark".to_string(),
                capacity,
                photo: None,
                insurance_photo: None,
            }),
            created_at: Utc::now(),
        }
    }

    fn draft(capacity: i32, fare: Option<i64>) -> NewTrip {
        NewTrip {
            origin: "Portal Norte".to_string(),
            destination: "Campus".to_string(),
            route: Some("Autopista Norte".to_string()),
            departure_at: Utc::now() + Duration::hours(2),
            capacity,
            fare,
        }
    }

    fn catalog(store: Arc<MemoryStore>) -> TripCatalog {
        TripCatalog::new(store, CatalogRules::default())
    }

    #[tokio::test]
    async fn test_create_applies_defaults() {
        let catalog = catalog(Arc::new(MemoryStore::new()));
        let driver = driver(4);

        let trip = catalog.create(&driver, draft(4, None)).await.unwrap();
        assert_eq!(trip.available, 4);
        assert_eq!(trip.fare, DEFAULT_FARE);
        assert_eq!(trip.status, TripStatus::Available);
        assert_eq!(catalog.get(trip.id).await.unwrap(), trip);
    }

    #[tokio::test]
    async fn test_create_validation() {
        let catalog = catalog(Arc::new(MemoryStore::new()));
        let driver = driver(4);

        for bad in [draft(0, None), draft(9, None), draft(5, None), draft(2, Some(-1))] {
            let err = catalog.create(&driver, bad).await.unwrap_err();
            assert!(matches!(err, CoreError::Validation(_)), "got {:?}", err);
        }

        let mut blank = draft(2, None);
        blank.destination = "  ".to_string();
        assert!(matches!(
            catalog.create(&driver, blank).await,
            Err(CoreError::Validation(_))
        ));

        let mut passenger = driver.clone();
        passenger.role = Role::Passenger;
        assert!(matches!(
            catalog.create(&passenger, draft(2, None)).await,
            Err(CoreError::Authorization(_))
        ));
    }

    #[tokio::test]
    async fn test_only_owner_can_update_or_cancel() {
        let catalog = catalog(Arc::new(MemoryStore::new()));
        let owner = driver(4);
        let trip = catalog.create(&owner, draft(4, None)).await.unwrap();

        let update = TripUpdate {
            fare: Some(7000),
            ..Default::default()
        };
        let stranger = driver(4);
        assert!(matches!(
            catalog.update(trip.id, &stranger, update.clone()).await,
            Err(CoreError::Authorization(_))
        ));
        assert!(matches!(
            catalog.cancel(trip.id, stranger.id).await,
            Err(CoreError::Authorization(_))
        ));

        let updated = catalog.update(trip.id, &owner, update).await.unwrap();
        assert_eq!(updated.fare, 7000);
    }

    #[tokio::test]
    async fn test_resize_below_reserved_is_rejected() {
        let store = Arc::new(MemoryStore::new());
        let catalog = catalog(store.clone());
        let owner = driver(6);
        let trip = catalog.create(&owner, draft(5, None)).await.unwrap();

        let request = NewBooking {
            trip_id: trip.id,
            seats: 3,
            pickup_point: "Calle 100".to_string(),
        };
        store
            .create_booking(Booking::new(Uuid::new_v4(), &request))
            .await
            .unwrap();

        let shrink = TripUpdate {
            capacity: Some(2),
            ..Default::default()
        };
        assert!(matches!(
            catalog.update(trip.id, &owner, shrink).await,
            Err(CoreError::Validation(_))
        ));

        let grow = TripUpdate {
            capacity: Some(6),
            ..Default::default()
        };
        let trip = catalog.update(trip.id, &owner, grow).await.unwrap();
        assert_eq!(trip.capacity, 6);
        assert_eq!(trip.available, 3);
    }

    #[tokio::test]
    async fn test_resize_cannot_exceed_vehicle() {
        let catalog = catalog(Arc::new(MemoryStore::new()));
        let owner = driver(4);
        let trip = catalog.create(&owner, draft(4, None)).await.unwrap();

        let grow = TripUpdate {
            capacity: Some(8),
            ..Default::default()
        };
        assert!(matches!(
            catalog.update(trip.id, &owner, grow).await,
            Err(CoreError::Validation(_))
        ));
        let unchanged = catalog.get(trip.id).await.unwrap();
        assert_eq!((unchanged.capacity, unchanged.available), (4, 4));

        let shrink = TripUpdate {
            capacity: Some(3),
            ..Default::default()
        };
        let trip = catalog.update(trip.id, &owner, shrink).await.unwrap();
        assert_eq!((trip.capacity, trip.available), (3, 3));
    }

    #[tokio::test]
    async fn test_cancel_is_idempotent() {
        let catalog = catalog(Arc::new(MemoryStore::new()));
        let owner = driver(4);
        let trip = catalog.create(&owner, draft(4, None)).await.unwrap();

        let (cancelled, _) = catalog.cancel(trip.id, owner.id).await.unwrap();
        assert_eq!(cancelled.status, TripStatus::Cancelled);
        let (again, released) = catalog.cancel(trip.id, owner.id).await.unwrap();
        assert_eq!(again.status, TripStatus::Cancelled);
        assert!(released.is_empty());

        let update = TripUpdate {
            fare: Some(1),
            ..Default::default()
        };
        assert_eq!(
            catalog.update(trip.id, &owner, update).await,
            Err(CoreError::TripCancelled)
        );
    }

    #[tokio::test]
    async fn test_negative_min_seats_rejected() {
        let catalog = catalog(Arc::new(MemoryStore::new()));
        let filter = TripFilter {
            origin: None,
            min_available: Some(-1),
        };
        assert!(matches!(catalog.list(&filter).await, Err(CoreError::Validation(_))));
    }
}
