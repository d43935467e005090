use uuid::Uuid;

/// Published whenever the seat count or status of a trip changes.
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SeatsChangedEvent {
    pub trip_id: Uuid,
    pub cupos: i32,
    pub cupos_disponibles: i32,
    pub estado: String,
    pub reason: SeatChangeReason,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SeatChangeReason {
    BookingCreated,
    BookingCancelled,
    TripUpdated,
    TripCancelled,
}
