//! Identifier newtypes for workflow records
//!
//! ULIDs give sortable, collision-free ids without coordination, and their
//! string form is what the document store persists.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use ulid::Ulid;

macro_rules! define_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub Ulid);

        impl $name {
            /// Generate a new random id
            #[inline]
            #[must_use]
            pub fn new() -> Self {
                Self(Ulid::new())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ulid::DecodeError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Ulid::from_string(s)?))
            }
        }
    };
}

define_id!(
    /// Unique incident identifier
    IncidentId
);
define_id!(
    /// Unique ticket identifier
    TicketId
);
define_id!(
    /// Unique OTP challenge identifier
    ChallengeId
);
define_id!(
    /// Unique user account identifier
    UserId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique() {
        assert_ne!(IncidentId::new(), IncidentId::new());
        assert_ne!(TicketId::new(), TicketId::new());
    }

    #[test]
    fn id_round_trips_through_display() {
        let id = ChallengeId::new();
        let parsed: ChallengeId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn id_rejects_garbage() {
        assert!("not-a-ulid".parse::<UserId>().is_err());
    }
}
