pub mod catalog;
pub mod listing;

pub use catalog::{CatalogRules, TripCatalog};
pub use listing::attach_drivers;
