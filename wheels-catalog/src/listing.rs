use std::collections::HashMap;

use wheels_core::repository::UserRepository;
use wheels_core::{CoreResult, Trip, TripListing};

/// Pairs each trip with a snapshot of its driver. Trips whose driver no longer
/// exists are still listed, without the `conductor` block.
pub async fn attach_drivers(users: &dyn UserRepository, trips: Vec<Trip>) -> CoreResult<Vec<TripListing>> {
    let mut driver_ids: Vec<_> = trips.iter().map(|t| t.driver_id).collect();
    driver_ids.sort_unstable();
    driver_ids.dedup();

    let drivers: HashMap<_, _> = users
        .get_users(&driver_ids)
        .await?
        .into_iter()
        .map(|u| (u.id, u.summary()))
        .collect();

    Ok(trips
        .into_iter()
        .map(|trip| TripListing {
            driver: drivers.get(&trip.driver_id).cloned(),
            trip,
        })
        .collect())
}
