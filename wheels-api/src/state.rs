use std::sync::Arc;

use chrono::Utc;
use tokio::sync::broadcast;
use wheels_booking::BookingLedger;
use wheels_catalog::{CatalogRules, TripCatalog};
use wheels_core::repository::{BookingRepository, TripRepository, UserRepository};
use wheels_core::Trip;
use wheels_shared::models::events::{SeatChangeReason, SeatsChangedEvent};
use wheels_store::app_config::{BusinessRules, RateLimitConfig};
use wheels_store::{MemoryStore, RedisClient};

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub expiration: u64,
}

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserRepository>,
    pub catalog: Arc<TripCatalog>,
    pub ledger: Arc<BookingLedger>,
    pub redis: Option<Arc<RedisClient>>,
    pub rate_limit: RateLimitConfig,
    pub sse_tx: broadcast::Sender<SeatsChangedEvent>,
    pub auth: AuthConfig,
    pub business_rules: BusinessRules,
}

impl AppState {
    pub fn new(
        trips: Arc<dyn TripRepository>,
        bookings: Arc<dyn BookingRepository>,
        users: Arc<dyn UserRepository>,
        auth: AuthConfig,
        business_rules: BusinessRules,
    ) -> Self {
        let rules = CatalogRules {
            max_seats_per_trip: business_rules.max_seats_per_trip,
            default_fare: business_rules.default_fare,
        };
        let (sse_tx, _) = broadcast::channel(100);

        Self {
            users,
            catalog: Arc::new(TripCatalog::new(trips.clone(), rules)),
            ledger: Arc::new(BookingLedger::new(trips, bookings)),
            redis: None,
            rate_limit: RateLimitConfig::default(),
            sse_tx,
            auth,
            business_rules,
        }
    }

    /// Everything backed by a single [`MemoryStore`].
    pub fn in_memory(auth: AuthConfig, business_rules: BusinessRules) -> Self {
        let store = Arc::new(MemoryStore::new());
        Self::new(store.clone(), store.clone(), store, auth, business_rules)
    }

    pub fn with_rate_limit(mut self, redis: Arc<RedisClient>, rate_limit: RateLimitConfig) -> Self {
        self.redis = Some(redis);
        self.rate_limit = rate_limit;
        self
    }

    /// Tells stream subscribers about the trip's new seat count. Dropped when nobody listens.
    pub fn publish_seats(&self, trip: &Trip, reason: SeatChangeReason) {
        let event = SeatsChangedEvent {
            trip_id: trip.id,
            cupos: trip.capacity,
            cupos_disponibles: trip.available,
            estado: trip.status.to_string(),
            reason,
            timestamp: Utc::now().timestamp(),
        };
        let _ = self.sse_tx.send(event);
    }
}
