//! Type-safe identifier wrappers around [`Uuid`].
//!
//! Every entity in the city has a strongly-typed ID to prevent accidental
//! mixing of identifiers at compile time. All IDs use UUID v7 (time-ordered)
//! for efficient database indexing.
//!
//! The `new()` constructors exist for app-side generation (the engine, the
//! factory, tests); `PostgreSQL` rows store the same values verbatim.

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Generates a newtype wrapper around [`Uuid`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new identifier using UUID v7 (time-ordered).
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Return the inner [`Uuid`] value.
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Unique identifier for an agent in the city.
    AgentId
}

define_id! {
    /// Unique identifier for an event in the city event log.
    EventId
}

define_id! {
    /// Unique identifier for a ledger transaction.
    TxId
}

define_id! {
    /// Unique identifier for a police case.
    CaseId
}

define_id! {
    /// Unique identifier for a joint project.
    ProjectId
}

define_id! {
    /// Unique identifier for a standing city asset.
    AssetId
}

define_id! {
    /// Unique identifier for a gang.
    GangId
}

define_id! {
    /// Unique identifier for an inbox message.
    MessageId
}

define_id! {
    /// Unique identifier for a home lot.
    LotId
}

define_id! {
    /// Unique identifier for a published narrative artifact.
    StoryId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_distinct_types() {
        let agent = AgentId::new();
        let case = CaseId::new();
        // These are different types -- the compiler enforces no mixing.
        assert_ne!(agent.into_inner(), Uuid::nil());
        assert_ne!(case.into_inner(), Uuid::nil());
    }

    #[test]
    fn id_roundtrip_serde() {
        let original = AgentId::new();
        let json = serde_json::to_string(&original).ok();
        assert!(json.is_some());
        let restored: Result<AgentId, _> = serde_json::from_str(
            json.as_deref().unwrap_or(""),
        );
        assert!(restored.is_ok());
    }

    #[test]
    fn id_display_matches_uuid() {
        let id = EventId::new();
        assert_eq!(id.to_string(), id.into_inner().to_string());
    }
}
