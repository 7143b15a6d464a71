//! Pure time-window classification, ordering and pagination over bookings.
//!
//! Everything here is policy-free and takes `now` as an explicit parameter,
//! so a single listing call stays internally consistent and tests can pin
//! the clock.
use chrono::Utc;

use crate::booking::{Booking, BookingStatus, Page, StateFilter, TimeStamp};

/// Does `booking` fall into the partition selected by `filter` as of `now`?
///
/// The date partitions are status-independent: `Current` is
/// `start <= now < end`, `Past` is `end < now` and `Future` is
/// `start > now`, so for any fixed `now` they cover `All` without overlap.
pub fn matches(filter: StateFilter, booking: &Booking, now: &TimeStamp<Utc>) -> bool {
    match filter {
        StateFilter::All => true,
        StateFilter::Current => booking.start <= *now && *now < booking.end,
        StateFilter::Past => booking.end < *now,
        StateFilter::Future => booking.start > *now,
        StateFilter::Waiting => booking.status == BookingStatus::Waiting,
        StateFilter::Rejected => booking.status == BookingStatus::Rejected,
    }
}

/// Order by `start` descending, ties broken by id descending for
/// determinism.
pub fn sort_desc(bookings: &mut [Booking]) {
    bookings.sort_by(|a, b| b.start.cmp(&a.start).then_with(|| b.id.cmp(&a.id)));
}

/// Stable offset/limit window over an already-ordered sequence.
pub fn paginate(bookings: Vec<Booking>, page: Page) -> Vec<Booking> {
    bookings
        .into_iter()
        .skip(page.offset)
        .take(page.limit)
        .collect()
}

/// The most recently concluded booking: greatest `end <= now`, ties broken
/// by greatest `start`.
pub fn pick_last(bookings: &[Booking], now: &TimeStamp<Utc>) -> Option<Booking> {
    bookings
        .iter()
        .filter(|b| b.end <= *now)
        .max_by(|a, b| a.end.cmp(&b.end).then_with(|| a.start.cmp(&b.start)))
        .cloned()
}

/// The soonest upcoming booking: least `start > now`, ties broken by least
/// id.
pub fn pick_next(bookings: &[Booking], now: &TimeStamp<Utc>) -> Option<Booking> {
    bookings
        .iter()
        .filter(|b| b.start > *now)
        .min_by(|a, b| a.start.cmp(&b.start).then_with(|| a.id.cmp(&b.id)))
        .cloned()
}
