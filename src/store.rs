//! Sled-backed persistence for booking records.
//!
//! The store owns the `bookings` tree exclusively. It exposes exactly the
//! query shapes the lifecycle and listing flows need: insert, a conditional
//! status transition, the by-id lookups, the role x state listings and the
//! per-item last/next projections. Window classification itself lives in
//! [`crate::partition`].
use std::collections::{BTreeMap, BTreeSet};

use chrono::Utc;
use sled::{Db, Tree};

use crate::auth;
use crate::booking::{Booking, BookingStatus, Page, StateFilter, TimeStamp};
use crate::error::BookingError;
use crate::partition;
use crate::utils;

/// Which side of a booking a listing query selects on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Party {
    Booker,
    Owner,
}

pub struct BookingStore {
    bookings: Tree,
}

impl BookingStore {
    pub fn new(db: &Db) -> anyhow::Result<Self> {
        Ok(Self {
            bookings: db.open_tree("bookings")?,
        })
    }

    /// Persist a new booking, assigning its id. Any id already on the record
    /// is discarded.
    pub fn insert(&self, mut booking: Booking) -> anyhow::Result<Booking> {
        booking.id = utils::new_uuid_to_bech32("bkng")?;
        self.bookings
            .insert(booking.id.as_bytes(), minicbor::to_vec(&booking)?)?;
        Ok(booking)
    }

    /// Conditional status transition out of `Waiting`.
    ///
    /// The swap is keyed on the exact prior record bytes, so of two racing
    /// decisions only one lands; the loser observes a changed record and
    /// reports `BookingNotPending`, same as if it had read the decided row.
    pub fn update_status(&self, id: &str, status: BookingStatus) -> anyhow::Result<Booking> {
        let old_bytes = self
            .bookings
            .get(id.as_bytes())?
            .ok_or_else(|| BookingError::BookingNotFound(id.into()))?;
        let mut booking: Booking = minicbor::decode(&old_bytes)?;
        if !booking.status.is_pending() {
            return Err(BookingError::BookingNotPending.into());
        }

        booking.status = status;
        let swapped = self.bookings.compare_and_swap(
            id.as_bytes(),
            Some(old_bytes),
            Some(minicbor::to_vec(&booking)?),
        )?;
        if swapped.is_err() {
            return Err(BookingError::BookingNotPending.into());
        }
        Ok(booking)
    }

    pub fn find_by_id(&self, id: &str) -> anyhow::Result<Booking> {
        let bytes = self
            .bookings
            .get(id.as_bytes())?
            .ok_or_else(|| BookingError::BookingNotFound(id.into()))?;
        Ok(minicbor::decode(&bytes)?)
    }

    /// Booker-or-owner join: anyone else sees the same error as a missing
    /// id, so existence is not revealed to unrelated callers.
    pub fn find_by_id_for_user(&self, id: &str, user_id: &str) -> anyhow::Result<Booking> {
        let booking = self.find_by_id(id)?;
        if !auth::may_view(user_id, &booking) {
            return Err(BookingError::BookingNotFound(id.into()).into());
        }
        Ok(booking)
    }

    /// One listing algorithm for both roles: filter by party and window or
    /// status, order by start descending, then apply the page.
    pub fn list_for(
        &self,
        party: Party,
        user_id: &str,
        filter: StateFilter,
        now: &TimeStamp<Utc>,
        page: Page,
    ) -> anyhow::Result<Vec<Booking>> {
        let mut hits = Vec::new();
        for entry in self.bookings.iter() {
            let (_, bytes) = entry?;
            let booking: Booking = minicbor::decode(&bytes)?;
            let held = match party {
                Party::Booker => booking.booker_id == user_id,
                Party::Owner => booking.owner_id == user_id,
            };
            if held && partition::matches(filter, &booking, now) {
                hits.push(booking);
            }
        }
        partition::sort_desc(&mut hits);
        Ok(partition::paginate(hits, page))
    }

    /// Most recently concluded booking per item in the set, as of `now`.
    /// Items with no concluded booking get no entry.
    pub fn last_per_item(
        &self,
        item_ids: &[String],
        now: &TimeStamp<Utc>,
    ) -> anyhow::Result<BTreeMap<String, Booking>> {
        let grouped = self.group_by_item(item_ids)?;
        Ok(grouped
            .into_iter()
            .filter_map(|(item_id, bookings)| {
                partition::pick_last(&bookings, now).map(|b| (item_id, b))
            })
            .collect())
    }

    /// Soonest upcoming booking per item in the set, as of `now`. Items
    /// with no upcoming booking get no entry.
    pub fn next_per_item(
        &self,
        item_ids: &[String],
        now: &TimeStamp<Utc>,
    ) -> anyhow::Result<BTreeMap<String, Booking>> {
        let grouped = self.group_by_item(item_ids)?;
        Ok(grouped
            .into_iter()
            .filter_map(|(item_id, bookings)| {
                partition::pick_next(&bookings, now).map(|b| (item_id, b))
            })
            .collect())
    }

    fn group_by_item(&self, item_ids: &[String]) -> anyhow::Result<BTreeMap<String, Vec<Booking>>> {
        let wanted: BTreeSet<&str> = item_ids.iter().map(String::as_str).collect();
        let mut grouped: BTreeMap<String, Vec<Booking>> = BTreeMap::new();
        for entry in self.bookings.iter() {
            let (_, bytes) = entry?;
            let booking: Booking = minicbor::decode(&bytes)?;
            if wanted.contains(booking.item_id.as_str()) {
                grouped.entry(booking.item_id.clone()).or_default().push(booking);
            }
        }
        Ok(grouped)
    }
}
