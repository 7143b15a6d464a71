//! User, item and item-request directories backed by sled trees.
//!
//! These are the collaborators the booking core consumes. They carry no
//! booking logic of their own; the one rule worth noting is that item
//! availability is toggled here, explicitly, by the owner. Booking creation
//! never flips it as a hidden side effect.
use chrono::Utc;
use sled::{Db, Tree};
use tracing::debug;

use crate::booking::TimeStamp;
use crate::error::BookingError;
use crate::utils;

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct User {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub name: String,
    #[n(2)]
    pub email: String,
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct Item {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub name: String,
    #[n(2)]
    pub description: String,
    #[n(3)]
    pub available: bool,
    #[n(4)]
    pub owner_id: String,
    #[n(5)]
    pub request_id: Option<String>,
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct ItemRequest {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub description: String,
    #[n(2)]
    pub requester_id: String,
    #[n(3)]
    pub created: TimeStamp<Utc>,
}

pub struct UserDirectory {
    users: Tree,
    // email -> user id, the uniqueness index. Case-sensitive on purpose.
    emails: Tree,
}

impl UserDirectory {
    pub fn new(db: &Db) -> anyhow::Result<Self> {
        Ok(Self {
            users: db.open_tree("users")?,
            emails: db.open_tree("user_emails")?,
        })
    }

    pub fn create(&self, name: &str, email: &str) -> anyhow::Result<User> {
        let id = utils::new_uuid_to_bech32("user")?;
        let user = User {
            id: id.clone(),
            name: name.into(),
            email: email.into(),
        };

        // claim the email first; losing the swap means the address is taken
        let claimed =
            self.emails
                .compare_and_swap(email.as_bytes(), None::<&[u8]>, Some(id.as_bytes()))?;
        if claimed.is_err() {
            return Err(BookingError::EmailTaken(email.into()).into());
        }

        self.users.insert(id.as_bytes(), minicbor::to_vec(&user)?)?;
        debug!(user = %user.id, "user created");
        Ok(user)
    }

    pub fn find(&self, id: &str) -> anyhow::Result<User> {
        let bytes = self
            .users
            .get(id.as_bytes())?
            .ok_or_else(|| BookingError::UserNotFound(id.into()))?;
        Ok(minicbor::decode(&bytes)?)
    }

    pub fn update(
        &self,
        id: &str,
        name: Option<&str>,
        email: Option<&str>,
    ) -> anyhow::Result<User> {
        let mut user = self.find(id)?;
        if let Some(email) = email
            && email != user.email
        {
            let claimed = self.emails.compare_and_swap(
                email.as_bytes(),
                None::<&[u8]>,
                Some(id.as_bytes()),
            )?;
            if claimed.is_err() {
                return Err(BookingError::EmailTaken(email.into()).into());
            }
            self.emails.remove(user.email.as_bytes())?;
            user.email = email.into();
        }
        if let Some(name) = name {
            user.name = name.into();
        }
        self.users.insert(id.as_bytes(), minicbor::to_vec(&user)?)?;
        Ok(user)
    }

    pub fn remove(&self, id: &str) -> anyhow::Result<()> {
        let user = self.find(id)?;
        self.users.remove(id.as_bytes())?;
        self.emails.remove(user.email.as_bytes())?;
        Ok(())
    }
}

pub struct ItemDirectory {
    items: Tree,
}

impl ItemDirectory {
    pub fn new(db: &Db) -> anyhow::Result<Self> {
        Ok(Self {
            items: db.open_tree("items")?,
        })
    }

    /// `owner` is resolved by the caller through the user directory; an item
    /// always has exactly one owner.
    pub fn create(
        &self,
        owner: &User,
        name: &str,
        description: &str,
        available: bool,
        request_id: Option<String>,
    ) -> anyhow::Result<Item> {
        let id = utils::new_uuid_to_bech32("item")?;
        let item = Item {
            id: id.clone(),
            name: name.into(),
            description: description.into(),
            available,
            owner_id: owner.id.clone(),
            request_id,
        };
        self.items.insert(id.as_bytes(), minicbor::to_vec(&item)?)?;
        debug!(item = %item.id, owner = %owner.id, "item created");
        Ok(item)
    }

    pub fn find(&self, id: &str) -> anyhow::Result<Item> {
        let bytes = self
            .items
            .get(id.as_bytes())?
            .ok_or_else(|| BookingError::ItemNotFound(id.into()))?;
        Ok(minicbor::decode(&bytes)?)
    }

    /// Owner-only availability toggle. Unlike booking reads, a non-owner
    /// here gets a real permission error rather than "not found".
    pub fn set_available(
        &self,
        caller_id: &str,
        item_id: &str,
        available: bool,
    ) -> anyhow::Result<Item> {
        let mut item = self.find(item_id)?;
        if item.owner_id != caller_id {
            return Err(BookingError::NotItemOwner(item_id.into(), caller_id.into()).into());
        }
        item.available = available;
        self.items
            .insert(item.id.as_bytes(), minicbor::to_vec(&item)?)?;
        debug!(item = %item.id, available, "item availability changed");
        Ok(item)
    }

    pub fn list_by_owner(&self, owner_id: &str) -> anyhow::Result<Vec<Item>> {
        let mut items = Vec::new();
        for entry in self.items.iter() {
            let (_, bytes) = entry?;
            let item: Item = minicbor::decode(&bytes)?;
            if item.owner_id == owner_id {
                items.push(item);
            }
        }
        Ok(items)
    }
}

pub struct RequestDirectory {
    requests: Tree,
}

impl RequestDirectory {
    pub fn new(db: &Db) -> anyhow::Result<Self> {
        Ok(Self {
            requests: db.open_tree("requests")?,
        })
    }

    pub fn create(&self, requester: &User, description: &str) -> anyhow::Result<ItemRequest> {
        let id = utils::new_uuid_to_bech32("req")?;
        let request = ItemRequest {
            id: id.clone(),
            description: description.into(),
            requester_id: requester.id.clone(),
            created: TimeStamp::new(),
        };
        self.requests
            .insert(id.as_bytes(), minicbor::to_vec(&request)?)?;
        Ok(request)
    }

    pub fn find(&self, id: &str) -> anyhow::Result<ItemRequest> {
        let bytes = self
            .requests
            .get(id.as_bytes())?
            .ok_or_else(|| anyhow::anyhow!("item request {id} not found"))?;
        Ok(minicbor::decode(&bytes)?)
    }
}
