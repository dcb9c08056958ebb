//! Store-assigned identifiers.
//!
//! Identifiers are opaque strings; the newtypes only keep a plan id from being passed
//! where a locality id is expected.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! define_id {
    ($($(#[$meta:meta])* $name:ident),+ $(,)?) => {$(
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    )+};
}

define_id! {
    /// Identifier of a [`crate::Locality`].
    LocalityId,
    /// Identifier of a [`crate::ZoneType`].
    ZoneTypeId,
    /// Identifier of a [`crate::Plan`].
    PlanId,
    /// Identifier of a [`crate::Feature`].
    FeatureId,
    /// Identifier of a [`crate::PlanAvailability`] row.
    AvailabilityId,
}
