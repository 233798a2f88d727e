//! Strongly-typed identifiers for meetup platform entities.
//!
//! Each wrapper serializes as a bare UUID. Repositories bind the inner
//! `Uuid` explicitly, so this crate has no database dependency.

use crate::error::CommonError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new random identifier
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Borrow the inner UUID
            #[must_use]
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<Uuid> for $name {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }

        impl From<$name> for Uuid {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl FromStr for $name {
            type Err = CommonError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s)
                    .map(Self)
                    .map_err(|_| CommonError::InvalidIdentifier(stringify!($name).to_string()))
            }
        }
    };
}

uuid_id!(
    /// Unique identifier for a user (supplied by the external auth service)
    UserId
);

uuid_id!(
    /// Unique identifier for a meeting
    MeetingId
);

uuid_id!(
    /// Unique identifier for a participant record
    ParticipantId
);

uuid_id!(
    /// Unique identifier for a scheduled activity within a meeting
    ActivityId
);
