use crate::{CoreError, CoreResult};

/// Fare used when a driver publishes a trip without one.
pub const DEFAULT_FARE: i64 = 6000;

pub fn validate_fare(fare: i64) -> CoreResult<()> {
    if fare < 0 {
        return Err(CoreError::validation("fare must not be negative"));
    }
    Ok(())
}

/// Total owed by a passenger for `seats` seats at `fare_per_seat`.
pub fn total_fare(fare_per_seat: i64, seats: i32) -> CoreResult<i64> {
    fare_per_seat
        .checked_mul(i64::from(seats))
        .ok_or_else(|| CoreError::validation("fare total is out of range"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_fare() {
        assert_eq!(total_fare(6000, 3).unwrap(), 18000);
        assert_eq!(total_fare(0, 4).unwrap(), 0);
        assert!(total_fare(i64::MAX, 2).is_err());
    }

    #[test]
    fn test_negative_fare_rejected() {
        assert!(validate_fare(-1).is_err());
        assert!(validate_fare(0).is_ok());
    }
}
