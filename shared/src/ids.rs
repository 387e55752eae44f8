//! Identifier newtypes
//!
//! Uuid wrappers for the identifiers that cross crate boundaries. Keeping
//! them distinct prevents a profile id from being passed where an order id
//! is expected.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }
    };
}

uuid_id! {
    /// Seller profile (warehouse owner) identifier
    ProfileId
}

uuid_id! {
    /// Marketplace authorization token identifier
    TokenId
}

uuid_id! {
    /// Internal order identifier
    OrderId
}

uuid_id! {
    /// Internal order-product line identifier
    OrderProductId
}
