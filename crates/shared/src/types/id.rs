//! Typed IDs for type-safe record references.
//!
//! Using typed IDs prevents accidentally passing a `LineId` where a `PostingId` is expected,
//! which matters for the line back-references the posting engine maintains.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Macro to generate typed ID wrappers.
macro_rules! typed_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Creates a new random ID using UUID v7 (time-ordered).
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Creates an ID from an existing UUID.
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the inner UUID.
            #[must_use]
            pub const fn into_inner(self) -> Uuid {
                self.0
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

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }
    };
}

typed_id!(HeaderId, "Unique identifier for a transaction header.");
typed_id!(LineId, "Unique identifier for an analysed transaction line.");
typed_id!(PostingId, "Unique identifier for a general-ledger posting.");
typed_id!(VatEntryId, "Unique identifier for a VAT register entry.");
typed_id!(CashBookEntryId, "Unique identifier for a cash-book entry.");
typed_id!(MatchId, "Unique identifier for a matching edge.");
typed_id!(ContactId, "Unique identifier for a customer or supplier.");
typed_id!(
    AccountId,
    "Unique identifier for a nominal (chart of accounts) entry."
);
