//! Strongly-typed identifiers.
//!
//! Emptiness is rejected by `from_string`; the `From<&str>` conversion is
//! unchecked and meant for literals.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Macro to define a strongly-typed ID newtype wrapper.
///
/// Generates: struct, `from_string()`, `as_str()`, Display, `From<&str>`,
/// Serialize, Deserialize (transparent). Ordering is lexicographic on the
/// underlying string.
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn from_string(s: String) -> Result<Self, &'static str> {
                if s.is_empty() {
                    return Err(concat!(stringify!($name), " cannot be empty"));
                }
                Ok(Self(s))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

define_id!(TenantId);
define_id!(ToolId);
define_id!(PlanId);

impl PlanId {
    /// Generate a plan id: `prefix` followed by a random 128-bit token in hex.
    pub fn generate(prefix: &str) -> Self {
        Self(format!("{}{}", prefix, uuid::Uuid::new_v4().simple()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_empty_id_rejected() {
        assert!(ToolId::from_string(String::new()).is_err());
        assert_eq!(ToolId::from_string("a".into()).unwrap().as_str(), "a");
    }

    #[test]
    fn test_tool_ids_order_lexicographically() {
        let mut ids = vec![ToolId::from("tool-b"), ToolId::from("tool-A"), ToolId::from("tool-a")];
        ids.sort();
        let ordered: Vec<&str> = ids.iter().map(ToolId::as_str).collect();
        assert_eq!(ordered, vec!["tool-A", "tool-a", "tool-b"]);
    }

    #[test]
    fn test_generated_plan_ids_are_prefixed_and_unique() {
        let ids: HashSet<PlanId> = (0..1000).map(|_| PlanId::generate("trp_")).collect();
        assert_eq!(ids.len(), 1000);
        for id in &ids {
            assert!(id.as_str().starts_with("trp_"));
            assert_eq!(id.as_str().len(), "trp_".len() + 32);
        }
    }

    #[test]
    fn test_ids_serialize_transparently() {
        let json = serde_json::to_string(&TenantId::from("acme")).unwrap();
        assert_eq!(json, "\"acme\"");
    }
}
