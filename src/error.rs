#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum BookingError {
    #[error("user {0} not found")]
    UserNotFound(String),
    #[error("item {0} not found")]
    ItemNotFound(String),
    #[error("booking {0} not found")]
    BookingNotFound(String),
    #[error("item {0} is not available for booking")]
    ItemNotAvailable(String),
    #[error("an owner cannot book their own item")]
    SelfBookingForbidden,
    #[error("booking window must start no earlier than now and end after it starts")]
    InvalidBookingWindow,
    #[error("booking has already been decided")]
    BookingNotPending,
    #[error("no bookings found")]
    NoBookingsFound,
    #[error("email {0} is already registered")]
    EmailTaken(String),
    #[error("item {0} does not belong to user {1}")]
    NotItemOwner(String, String),
}
