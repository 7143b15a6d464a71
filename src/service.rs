//! Service layer API for the booking lifecycle
use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use sled::Db;
use tracing::info;

use crate::auth;
use crate::booking::{Booking, BookingStatus, Page, StateFilter, TimeStamp};
use crate::catalog::{Item, ItemDirectory, User, UserDirectory};
use crate::error::BookingError;
use crate::store::{BookingStore, Party};

/// What an empty listing result means to the caller. `Error` is the
/// historical behavior (`NoBookingsFound`); `Allow` returns an ordinary
/// empty page. The partition algorithm itself is unaffected either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmptyListing {
    #[default]
    Error,
    Allow,
}

/// A booking joined with its resolved item and booker for presentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingView {
    pub booking: Booking,
    pub item: Item,
    pub booker: User,
}

/// Per-item summary of the most recently concluded and the soonest
/// upcoming booking, used to enrich item detail views.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LastNext {
    pub last: Option<Booking>,
    pub next: Option<Booking>,
}

pub struct BookingService {
    store: BookingStore,
    users: UserDirectory,
    items: ItemDirectory,
    empty_listing: EmptyListing,
}

impl BookingService {
    pub fn new(instance: Arc<Db>) -> anyhow::Result<Self> {
        Self::with_policy(instance, EmptyListing::default())
    }

    pub fn with_policy(instance: Arc<Db>, empty_listing: EmptyListing) -> anyhow::Result<Self> {
        Ok(Self {
            store: BookingStore::new(&instance)?,
            users: UserDirectory::new(&instance)?,
            items: ItemDirectory::new(&instance)?,
            empty_listing,
        })
    }

    /// Request a booking of `item_id` for the window `[start, end)`.
    ///
    /// The new booking starts out `Waiting` for the owner's decision. Item
    /// availability is left untouched; only the owner-facing item flow
    /// toggles it.
    pub fn create(
        &self,
        requester_id: &str,
        item_id: &str,
        start: TimeStamp<Utc>,
        end: TimeStamp<Utc>,
    ) -> anyhow::Result<BookingView> {
        let item = self.items.find(item_id)?;
        if !item.available {
            return Err(BookingError::ItemNotAvailable(item_id.into()).into());
        }
        let booker = self.users.find(requester_id)?;

        // callers are expected to pre-validate the window; guard anyway
        let now = TimeStamp::new();
        if start < now || end <= start {
            return Err(BookingError::InvalidBookingWindow.into());
        }
        if item.owner_id == requester_id {
            return Err(BookingError::SelfBookingForbidden.into());
        }

        let booking = self.store.insert(Booking {
            id: String::new(), // assigned by the store
            start,
            end,
            item_id: item.id.clone(),
            owner_id: item.owner_id.clone(),
            booker_id: booker.id.clone(),
            status: BookingStatus::Waiting,
        })?;
        info!(booking = %booking.id, item = %item.id, booker = %booker.id, "booking created");
        Ok(BookingView {
            booking,
            item,
            booker,
        })
    }

    /// Decide a waiting booking: `approved = true` confirms it, `false`
    /// rejects it. Only the item's owner may decide; the booker or a
    /// stranger learns nothing, not even that the booking exists.
    pub fn approve(
        &self,
        acting_user_id: &str,
        booking_id: &str,
        approved: bool,
    ) -> anyhow::Result<BookingView> {
        let booking = self.store.find_by_id(booking_id)?;
        if !auth::may_decide(acting_user_id, &booking) {
            return Err(BookingError::BookingNotFound(booking_id.into()).into());
        }
        if !booking.status.is_pending() {
            return Err(BookingError::BookingNotPending.into());
        }

        let status = if approved {
            BookingStatus::Approved
        } else {
            BookingStatus::Rejected
        };
        let booking = self.store.update_status(booking_id, status)?;
        info!(booking = %booking.id, ?status, "booking decided");
        self.view(booking)
    }

    /// Fetch one booking, visible only to its booker or its item's owner.
    /// Anyone else gets the same `BookingNotFound` as for a nonexistent id.
    pub fn get_one_by_id_and_user(
        &self,
        booking_id: &str,
        user_id: &str,
    ) -> anyhow::Result<BookingView> {
        let booking = self.store.find_by_id_for_user(booking_id, user_id)?;
        self.view(booking)
    }

    pub fn list_for_booker(
        &self,
        user_id: &str,
        filter: StateFilter,
        page: Page,
    ) -> anyhow::Result<Vec<BookingView>> {
        self.list_for(Party::Booker, user_id, filter, page)
    }

    pub fn list_for_owner(
        &self,
        user_id: &str,
        filter: StateFilter,
        page: Page,
    ) -> anyhow::Result<Vec<BookingView>> {
        self.list_for(Party::Owner, user_id, filter, page)
    }

    fn list_for(
        &self,
        party: Party,
        user_id: &str,
        filter: StateFilter,
        page: Page,
    ) -> anyhow::Result<Vec<BookingView>> {
        // one clock sample per call keeps the whole page consistent
        let now = TimeStamp::new();
        let bookings = self.store.list_for(party, user_id, filter, &now, page)?;
        if bookings.is_empty() && self.empty_listing == EmptyListing::Error {
            return Err(BookingError::NoBookingsFound.into());
        }
        bookings.into_iter().map(|b| self.view(b)).collect()
    }

    /// Per-item last/next projection for a batch of item ids, as of `now`.
    ///
    /// Which items may be queried is the caller's concern: the item detail
    /// flow passes only items it has already confirmed belong to the
    /// requesting owner. An item with no qualifying booking on either side
    /// gets no entry.
    pub fn project_last_and_next(
        &self,
        item_ids: &[String],
        now: &TimeStamp<Utc>,
    ) -> anyhow::Result<BTreeMap<String, LastNext>> {
        let mut summary: BTreeMap<String, LastNext> = BTreeMap::new();
        for (item_id, last) in self.store.last_per_item(item_ids, now)? {
            summary.entry(item_id).or_default().last = Some(last);
        }
        for (item_id, next) in self.store.next_per_item(item_ids, now)? {
            summary.entry(item_id).or_default().next = Some(next);
        }
        Ok(summary)
    }

    fn view(&self, booking: Booking) -> anyhow::Result<BookingView> {
        let item = self.items.find(&booking.item_id)?;
        let booker = self.users.find(&booking.booker_id)?;
        Ok(BookingView {
            booking,
            item,
            booker,
        })
    }
}
