//! Authorization guard separating booker and owner views
use crate::booking::Booking;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Booker,
    Owner,
    Neither,
}

/// Relationship of a user to a booking.
///
/// `Neither` must never leak the booking's existence: read operations map
/// it to "not found", not "forbidden". For the approval action `Booker` is
/// folded to "not found" as well, so a booker cannot probe the decision
/// state of their own request through the owner-only path. Item mutation
/// checks elsewhere surface a real permission error; this asymmetry is
/// intentional and kept behind this single decision point.
pub fn role_of(user_id: &str, booking: &Booking) -> Role {
    if booking.owner_id == user_id {
        Role::Owner
    } else if booking.booker_id == user_id {
        Role::Booker
    } else {
        Role::Neither
    }
}

/// May `user_id` decide (approve or reject) this booking?
pub fn may_decide(user_id: &str, booking: &Booking) -> bool {
    role_of(user_id, booking) == Role::Owner
}

/// May `user_id` read this booking at all?
pub fn may_view(user_id: &str, booking: &Booking) -> bool {
    role_of(user_id, booking) != Role::Neither
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::booking::{BookingStatus, TimeStamp};

    fn booking() -> Booking {
        Booking {
            id: "bkng1x".into(),
            start: TimeStamp::new_with(2026, 1, 1, 0, 0, 0),
            end: TimeStamp::new_with(2026, 1, 2, 0, 0, 0),
            item_id: "item1x".into(),
            owner_id: "user1owner".into(),
            booker_id: "user1booker".into(),
            status: BookingStatus::Waiting,
        }
    }

    #[test]
    fn roles_resolve_by_id() {
        let b = booking();
        assert_eq!(role_of("user1owner", &b), Role::Owner);
        assert_eq!(role_of("user1booker", &b), Role::Booker);
        assert_eq!(role_of("user1stranger", &b), Role::Neither);
    }

    #[test]
    fn only_the_owner_may_decide() {
        let b = booking();
        assert!(may_decide("user1owner", &b));
        assert!(!may_decide("user1booker", &b));
        assert!(!may_decide("user1stranger", &b));
    }

    #[test]
    fn booker_and_owner_may_view() {
        let b = booking();
        assert!(may_view("user1owner", &b));
        assert!(may_view("user1booker", &b));
        assert!(!may_view("user1stranger", &b));
    }
}
