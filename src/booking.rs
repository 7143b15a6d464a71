//! Core booking record, status machine and time window types
use chrono::{DateTime, TimeZone, Utc};

#[derive(Debug, Clone)]
pub struct TimeStamp<T: TimeZone>(DateTime<T>);

impl<T: TimeZone> PartialEq for TimeStamp<T> {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl<T: TimeZone> Eq for TimeStamp<T> {}

impl<T: TimeZone> PartialOrd for TimeStamp<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<T: TimeZone> Ord for TimeStamp<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.cmp(&other.0)
    }
}

impl TimeStamp<Utc> {
    pub fn new() -> Self {
        Self(Utc::now())
    }
    pub fn new_with(year: i32, month: u32, day: u32, hour: u32, min: u32, sec: u32) -> Self {
        Utc.with_ymd_and_hms(year, month, day, hour, min, sec)
            .unwrap()
            .into()
    }
    pub fn to_datetime_utc(&self) -> DateTime<Utc> {
        self.0
    }
}

impl Default for TimeStamp<Utc> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: TimeZone> From<DateTime<T>> for TimeStamp<T> {
    fn from(value: DateTime<T>) -> Self {
        TimeStamp(value)
    }
}

impl<C> minicbor::Encode<C> for TimeStamp<Utc> {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        if let Some(nsec) = self.0.timestamp_nanos_opt() {
            return e.i64(nsec)?.ok();
        }

        Err(minicbor::encode::Error::message(
            "failed to encode timestamp. timestamp_nanos_opt returned None",
        ))
    }
}

impl<'b, C> minicbor::Decode<'b, C> for TimeStamp<Utc> {
    fn decode(d: &mut minicbor::Decoder<'b>, _: &mut C) -> Result<Self, minicbor::decode::Error> {
        let nsecs = d.i64()?;

        Ok(TimeStamp(DateTime::from_timestamp_nanos(nsecs)))
    }
}

/// Approval status of a booking. `Canceled` is a reserved member of the
/// enumeration: no transition function targets it, so adding a cancel
/// operation later is purely additive.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingStatus {
    #[n(0)]
    Waiting,
    #[n(1)]
    Approved,
    #[n(2)]
    Rejected,
    #[n(3)]
    Canceled,
}

impl BookingStatus {
    /// A booking can only be decided while it is still waiting.
    pub fn is_pending(&self) -> bool {
        matches!(self, BookingStatus::Waiting)
    }
}

// key is the minted booking id; owner_id is denormalized from the item at
// creation time since an item has exactly one owner and ownership transfer
// is out of scope
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct Booking {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub start: TimeStamp<Utc>,
    #[n(2)]
    pub end: TimeStamp<Utc>,
    #[n(3)]
    pub item_id: String,
    #[n(4)]
    pub owner_id: String,
    #[n(5)]
    pub booker_id: String,
    #[n(6)]
    pub status: BookingStatus,
}

/// Listing selector over a user's bookings. `Current`, `Past` and `Future`
/// classify by the booking window against a single `now`; `Waiting` and
/// `Rejected` classify by status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateFilter {
    All,
    Current,
    Past,
    Future,
    Waiting,
    Rejected,
}

/// Offset/limit pair applied after ordering. The boundary is expected to
/// hand over an offset >= 0 and a limit > 0; the engine applies them as
/// given without clamping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub offset: usize,
    pub limit: usize,
}

impl Page {
    pub fn new(offset: usize, limit: usize) -> Self {
        Self { offset, limit }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_encoding() {
        let original = TimeStamp::new();

        let encoding = minicbor::to_vec(original.clone()).unwrap();
        let decode: TimeStamp<Utc> = minicbor::decode(&encoding).unwrap();

        assert_eq!(original, decode);
    }

    #[test]
    fn booking_encoding() {
        let original = Booking {
            id: "bkng1test".into(),
            start: TimeStamp::new_with(2026, 3, 1, 12, 0, 0),
            end: TimeStamp::new_with(2026, 3, 2, 12, 0, 0),
            item_id: "item1test".into(),
            owner_id: "user1owner".into(),
            booker_id: "user1booker".into(),
            status: BookingStatus::Waiting,
        };

        let encoding = minicbor::to_vec(&original).unwrap();
        let decode: Booking = minicbor::decode(&encoding).unwrap();

        assert_eq!(original, decode);
    }

    #[test]
    fn only_waiting_is_pending() {
        assert!(BookingStatus::Waiting.is_pending());
        assert!(!BookingStatus::Approved.is_pending());
        assert!(!BookingStatus::Rejected.is_pending());
        assert!(!BookingStatus::Canceled.is_pending());
    }
}
