pub mod app_config;
pub mod booking_repo;
pub mod database;
pub mod memory;
pub mod redis_repo;
mod rows;
pub mod trip_repo;
pub mod user_repo;

pub use booking_repo::PgBookingRepository;
pub use database::DbClient;
pub use memory::MemoryStore;
pub use redis_repo::RedisClient;
pub use trip_repo::PgTripRepository;
pub use user_repo::PgUserRepository;

use wheels_core::CoreError;

pub(crate) fn db_error(err: sqlx::Error) -> CoreError {
    CoreError::Internal(format!("database error: {}", err))
}
