//! Strongly-typed identifiers for settlement records
//!
//! Every persisted collection gets its own newtype over a UUID so that a
//! payment id can never be passed where an invoice id is expected.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::CoreError;

macro_rules! define_id {
    ($name:ident, $prefix:literal) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Time-ordered (v7); used where insertion order matters, e.g. journal entries
            pub fn new_v7() -> Self {
                Self(Uuid::now_v7())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }

            /// Display prefix, e.g. `PAY` in `PAY-<uuid>`
            pub fn prefix() -> &'static str {
                $prefix
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}-{}", $prefix, self.0)
            }
        }

        impl FromStr for $name {
            type Err = CoreError;

            /// Accepts both `PREFIX-<uuid>` and a bare UUID
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let raw = s.trim();
                let bare = raw.strip_prefix(concat!($prefix, "-")).unwrap_or(raw);
                Uuid::parse_str(bare)
                    .map(Self)
                    .map_err(|e| CoreError::invalid_identifier($prefix, raw, e))
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Uuid {
                id.0
            }
        }
    };
}

// Records owned by procurement collaborators
define_id!(VendorId, "VEN");
define_id!(PurchaseOrderId, "PO");
define_id!(InvoiceId, "INV");

// Settlement records
define_id!(PaymentId, "PAY");
define_id!(AdjustmentId, "ADJ");
define_id!(AccrualId, "ACR");
define_id!(BatchId, "BAT");

// Ledger records
define_id!(AccountId, "ACC");
define_id!(JournalEntryId, "JNL");
define_id!(LedgerEntryId, "VLE");

// Generic identifiers
define_id!(TransactionId, "TXN");
define_id!(AuditEventId, "AUD");

/// The user or process responsible for a mutation
///
/// Authentication happens upstream; by the time a request reaches the
/// settlement services the actor is an opaque, already-trusted name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Actor(String);

impl Actor {
    /// Creates an actor from a user or process name
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The actor used by background sweeps
    pub fn system() -> Self {
        Self("system".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
