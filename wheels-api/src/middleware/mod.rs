pub mod auth;
pub mod rate_limit;

pub use auth::{auth_middleware, driver_auth_middleware, passenger_auth_middleware, Claims};
pub use rate_limit::rate_limit_middleware;
