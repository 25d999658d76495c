//! Opaque identifier newtypes shared across the governance substrate.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! uuid_id {
    ($name:ident, $prefix:expr) => {
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn generate() -> Self {
                Self(uuid::Uuid::new_v4().to_string())
            }

            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}{}", $prefix, self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

uuid_id!(EventId, "event-");
uuid_id!(DecisionId, "decision-");
uuid_id!(MemoryNodeId, "mem-");
uuid_id!(MemoryVectorId, "vec-");
uuid_id!(PromotionId, "promo-");
uuid_id!(AllocationId, "alloc-");
uuid_id!(UpgradeId, "upgrade-");
uuid_id!(RequestId, "req-");
uuid_id!(ArtifactId, "artifact-");

/// A principal identity (service or human) that caused an event.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Actor(pub String);

impl Actor {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A policy identifier. Policies are versioned, so `(PolicyId, u32)` is the
/// natural composite key — see `Policy::key`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PolicyId(pub String);

impl PolicyId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for PolicyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
