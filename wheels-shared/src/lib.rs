pub mod models;
pub mod pii;

pub use models::events::SeatsChangedEvent;
pub use pii::Masked;
