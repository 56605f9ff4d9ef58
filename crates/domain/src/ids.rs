use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Creates an identifier from its numeric value.
            #[must_use]
            pub fn new(value: i64) -> Self {
                Self(value)
            }

            /// Returns the numeric value.
            #[must_use]
            pub fn value(&self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl Display for $name {
            fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
                write!(formatter, "{}", self.0)
            }
        }
    };
}

numeric_id!(
    /// Unique identifier for a user account.
    UserId
);

numeric_id!(
    /// Unique identifier for an initiative.
    InitiativeId
);

numeric_id!(
    /// Identifier of a role definition, scoped to one initiative.
    RoleId
);

numeric_id!(
    /// Identifier of a document, project or queue.
    ResourceId
);

numeric_id!(
    /// Identifier of a guild tag.
    TagId
);

impl From<&initiative_access_core::UserIdentity> for UserId {
    fn from(identity: &initiative_access_core::UserIdentity) -> Self {
        Self(identity.user_id())
    }
}
