//! Newtype string identifiers.
//!
//! Plain `String` ids would work, but wrapping each kind separately keeps
//! a sector id from being passed where a resource id is expected, and
//! `Ord`/`Eq` on the wrapper keeps map iteration (and hence ledger/DRR
//! processing order) deterministic.

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(s: impl Into<String>) -> Self {
                $name(s.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                $name(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                $name(s)
            }
        }
    };
}

string_id!(ResourceId);
string_id!(SectorId);
string_id!(AgentId);
string_id!(TaskId);
string_id!(GoalId);
string_id!(MetricId);
string_id!(PolicyId);
string_id!(RequestId);
