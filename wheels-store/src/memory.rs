use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;
use wheels_core::fare::total_fare;
use wheels_core::identity::normalize_email;
use wheels_core::repository::{BookingRepository, TripMutation, TripRepository, UserRepository};
use wheels_core::{Booking, CoreError, CoreResult, Trip, TripFilter, User, UserRecord};

#[derive(Default)]
struct MemoryState {
    trips: HashMap<Uuid, Trip>,
    bookings: HashMap<Uuid, Booking>,
    users: HashMap<Uuid, UserRecord>,
}

/// In-process store. One lock guards trips and bookings together, so a seat check
/// and its decrement can never interleave with another booking.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TripRepository for MemoryStore {
    async fn insert_trip(&self, trip: &Trip) -> CoreResult<()> {
        let mut state = self.state.lock().await;
        state.trips.insert(trip.id, trip.clone());
        Ok(())
    }

    async fn get_trip(&self, id: Uuid) -> CoreResult<Option<Trip>> {
        let state = self.state.lock().await;
        Ok(state.trips.get(&id).cloned())
    }

    async fn list_trips(&self, filter: &TripFilter) -> CoreResult<Vec<Trip>> {
        let state = self.state.lock().await;
        let mut trips: Vec<Trip> = state
            .trips
            .values()
            .filter(|trip| filter.matches(trip))
            .cloned()
            .collect();
        trips.sort_by_key(|trip| (trip.departure_at, trip.created_at));
        Ok(trips)
    }

    async fn list_driver_trips(&self, driver_id: Uuid) -> CoreResult<Vec<Trip>> {
        let state = self.state.lock().await;
        let mut trips: Vec<Trip> = state
            .trips
            .values()
            .filter(|trip| trip.driver_id == driver_id)
            .cloned()
            .collect();
        trips.sort_by(|a, b| b.departure_at.cmp(&a.departure_at));
        Ok(trips)
    }

    async fn get_trips(&self, ids: &[Uuid]) -> CoreResult<Vec<Trip>> {
        let state = self.state.lock().await;
        Ok(ids.iter().filter_map(|id| state.trips.get(id).cloned()).collect())
    }

    async fn modify_trip(&self, id: Uuid, mutation: TripMutation<'_>) -> CoreResult<Trip> {
        let mut state = self.state.lock().await;
        let trip = state
            .trips
            .get_mut(&id)
            .ok_or_else(|| CoreError::not_found("Trip"))?;

        let mut next = trip.clone();
        mutation(&mut next)?;
        *trip = next.clone();
        Ok(next)
    }

    async fn cancel_trip(&self, id: Uuid) -> CoreResult<(Trip, Vec<Booking>)> {
        let mut guard = self.state.lock().await;
        let MemoryState { trips, bookings, .. } = &mut *guard;

        let trip = trips
            .get_mut(&id)
            .ok_or_else(|| CoreError::not_found("Trip"))?;
        if !trip.cancel() {
            return Ok((trip.clone(), Vec::new()));
        }

        let mut released = Vec::new();
        for booking in bookings.values_mut().filter(|b| b.trip_id == id) {
            if booking.cancel() {
                trip.release_seats(booking.seats);
                released.push(booking.clone());
            }
        }
        Ok((trip.clone(), released))
    }
}

#[async_trait]
impl BookingRepository for MemoryStore {
    async fn create_booking(&self, mut booking: Booking) -> CoreResult<(Booking, Trip)> {
        let mut state = self.state.lock().await;
        let trip = state
            .trips
            .get_mut(&booking.trip_id)
            .ok_or_else(|| CoreError::not_found("Trip"))?;

        let total = total_fare(trip.fare, booking.seats)?;
        trip.reserve_seats(booking.seats)?;
        booking.total_fare = total;
        let trip = trip.clone();

        state.bookings.insert(booking.id, booking.clone());
        Ok((booking, trip))
    }

    async fn get_booking(&self, id: Uuid) -> CoreResult<Option<Booking>> {
        let state = self.state.lock().await;
        Ok(state.bookings.get(&id).cloned())
    }

    async fn cancel_booking(&self, id: Uuid) -> CoreResult<Option<(Booking, Trip)>> {
        let mut guard = self.state.lock().await;
        let MemoryState { trips, bookings, .. } = &mut *guard;

        let booking = bookings
            .get_mut(&id)
            .ok_or_else(|| CoreError::not_found("Booking"))?;
        if !booking.cancel() {
            return Ok(None);
        }

        let trip = trips
            .get_mut(&booking.trip_id)
            .ok_or_else(|| CoreError::Internal(format!("booking {} has no trip", id)))?;
        trip.release_seats(booking.seats);
        Ok(Some((booking.clone(), trip.clone())))
    }

    async fn list_passenger_bookings(&self, passenger_id: Uuid) -> CoreResult<Vec<Booking>> {
        let state = self.state.lock().await;
        let mut bookings: Vec<Booking> = state
            .bookings
            .values()
            .filter(|b| b.passenger_id == passenger_id)
            .cloned()
            .collect();
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(bookings)
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn insert_user(&self, record: &UserRecord) -> CoreResult<()> {
        let mut state = self.state.lock().await;
        let email = normalize_email(&record.user.email);
        if state.users.values().any(|r| r.user.email == email) {
            return Err(CoreError::Conflict("correo is already registered".to_string()));
        }
        state.users.insert(record.user.id, record.clone());
        Ok(())
    }

    async fn find_by_email(&self, email: &str) -> CoreResult<Option<UserRecord>> {
        let state = self.state.lock().await;
        let email = normalize_email(email);
        Ok(state.users.values().find(|r| r.user.email == email).cloned())
    }

    async fn get_user(&self, id: Uuid) -> CoreResult<Option<User>> {
        let state = self.state.lock().await;
        Ok(state.users.get(&id).map(|r| r.user.clone()))
    }

    async fn get_users(&self, ids: &[Uuid]) -> CoreResult<Vec<User>> {
        let state = self.state.lock().await;
        Ok(ids
            .iter()
            .filter_map(|id| state.users.get(id).map(|r| r.user.clone()))
            .collect())
    }

    async fn update_user(&self, user: &User) -> CoreResult<()> {
        let mut state = self.state.lock().await;
        let record = state
            .users
            .get_mut(&user.id)
            .ok_or_else(|| CoreError::not_found("User"))?;
        record.user = user.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use std::sync::Arc;
    use wheels_core::{BookingStatus, NewBooking, NewTrip, TripStatus};

    fn trip(origin: &str, capacity: i32, hours_ahead: i64) -> Trip {
        let draft = NewTrip {
            origin: origin.to_string(),
            destination: "Campus".to_string(),
            route: None,
            departure_at: Utc::now() + Duration::hours(hours_ahead),
            capacity,
            fare: None,
        };
        Trip::new(Uuid::new_v4(), &draft, 6000)
    }

    fn booking(trip_id: Uuid, seats: i32) -> Booking {
        let request = NewBooking {
            trip_id,
            seats,
            pickup_point: "Portería 1".to_string(),
        };
        Booking::new(Uuid::new_v4(), &request)
    }

    #[tokio::test]
    async fn test_booking_stores_fare_total_and_takes_seats() {
        let store = MemoryStore::new();
        let t = trip("Suba", 4, 2);
        store.insert_trip(&t).await.unwrap();

        let (b, updated) = store.create_booking(booking(t.id, 3)).await.unwrap();
        assert_eq!(b.total_fare, 18000);
        assert_eq!(updated.available, 1);

        let err = store.create_booking(booking(t.id, 2)).await.unwrap_err();
        assert!(matches!(err, CoreError::Capacity { requested: 2, available: 1 }));
    }

    #[tokio::test]
    async fn test_cancel_restores_seats_once() {
        let store = MemoryStore::new();
        let t = trip("Suba", 4, 2);
        store.insert_trip(&t).await.unwrap();
        let (b, _) = store.create_booking(booking(t.id, 4)).await.unwrap();

        let (cancelled, restored) = store.cancel_booking(b.id).await.unwrap().unwrap();
        assert_eq!(cancelled.status, BookingStatus::Cancelled);
        assert_eq!(restored.available, 4);

        assert!(store.cancel_booking(b.id).await.unwrap().is_none());
        let t = store.get_trip(t.id).await.unwrap().unwrap();
        assert_eq!(t.available, 4);
    }

    #[tokio::test]
    async fn test_cancel_trip_cascades_to_bookings() {
        let store = MemoryStore::new();
        let t = trip("Suba", 4, 2);
        store.insert_trip(&t).await.unwrap();
        store.create_booking(booking(t.id, 1)).await.unwrap();
        store.create_booking(booking(t.id, 2)).await.unwrap();

        let (cancelled, released) = store.cancel_trip(t.id).await.unwrap();
        assert_eq!(cancelled.status, TripStatus::Cancelled);
        assert_eq!(cancelled.available, 4);
        assert_eq!(released.len(), 2);

        let (_, again) = store.cancel_trip(t.id).await.unwrap();
        assert!(again.is_empty());

        let err = store.create_booking(booking(t.id, 1)).await.unwrap_err();
        assert_eq!(err, CoreError::TripCancelled);
    }

    #[tokio::test]
    async fn test_list_orders_and_filters() {
        let store = MemoryStore::new();
        let later = trip("Portal Norte", 4, 5);
        let sooner = trip("portal norte", 2, 1);
        let other = trip("Suba", 4, 3);
        for t in [&later, &sooner, &other] {
            store.insert_trip(t).await.unwrap();
        }
        store.create_booking(booking(sooner.id, 1)).await.unwrap();

        let all = store.list_trips(&TripFilter::default()).await.unwrap();
        let ids: Vec<Uuid> = all.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![sooner.id, other.id, later.id]);

        let filter = TripFilter {
            origin: Some("NORTE".to_string()),
            min_available: Some(2),
        };
        let found = store.list_trips(&filter).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, later.id);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_bookings_never_oversubscribe() {
        let store = Arc::new(MemoryStore::new());
        let t = trip("Suba", 8, 2);
        store.insert_trip(&t).await.unwrap();

        // 12 requests of 2 seats against 8 seats: exactly 4 can fit.
        let tasks: Vec<_> = (0..12)
            .map(|_| {
                let store = store.clone();
                let trip_id = t.id;
                tokio::spawn(async move { store.create_booking(booking(trip_id, 2)).await })
            })
            .collect();

        let results = futures_util::future::join_all(tasks).await;
        let mut succeeded = 0;
        let mut rejected = 0;
        for result in results {
            match result.unwrap() {
                Ok(_) => succeeded += 1,
                Err(CoreError::Capacity { .. }) => rejected += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        assert_eq!(succeeded, 4);
        assert_eq!(rejected, 8);
        let t = store.get_trip(t.id).await.unwrap().unwrap();
        assert_eq!(t.available, 0);
        assert_eq!(t.status, TripStatus::Full);
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let store = MemoryStore::new();
        let record = UserRecord {
            user: User {
                id: Uuid::new_v4(),
                first_name: "Ana".to_string(),
                last_name: "Rojas".to_string(),
                university_id: "1".to_string(),
                email: "ana@uni.edu".to_string(),
                phone: "300".to_string(),
                role: wheels_core::Role::Passenger,
                photo: None,
                vehicle: None,
                created_at: Utc::now(),
            },
            password_hash: "hash".into(),
        };
        store.insert_user(&record).await.unwrap();

        let mut twin = record.clone();
        twin.user.id = Uuid::new_v4();
        assert!(matches!(store.insert_user(&twin).await, Err(CoreError::Conflict(_))));
        assert!(store.find_by_email(" ANA@uni.edu").await.unwrap().is_some());
    }
}
