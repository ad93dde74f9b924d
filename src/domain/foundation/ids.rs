//! Typed identifiers for core entities.
//!
//! All ids are opaque integers assigned by storage on creation. Newtypes keep
//! a donor id from being passed where a donation id is expected.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! entity_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wraps a raw storage-assigned id.
            pub fn new(id: i64) -> Self {
                Self(id)
            }

            /// Returns the raw integer value.
            pub fn as_i64(&self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }
    };
}

entity_id!(
    /// Identifier of a single donation record.
    DonationId
);

entity_id!(
    /// Identifier of a donor.
    DonorId
);

entity_id!(
    /// Identifier of a recurring-donation arrangement.
    SubscriptionId
);

entity_id!(
    /// Identifier of the donation form a gift was made through.
    FormId
);
