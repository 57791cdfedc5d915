//! Role derivation from provider-issued metadata.
//!
//! The administrator flag is computed from the identity every time it is
//! read. It is never cached or taken from client-local state.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::identity::Identity;

/// Metadata key carrying the administrator flag.
pub const ADMIN_FLAG_KEY: &str = "isAdmin";

/// True only when the identity exists and `metadata.isAdmin` is the JSON boolean `true`.
pub fn is_admin(identity: Option<&Identity>) -> bool {
    identity
        .and_then(|id| id.metadata.get(ADMIN_FLAG_KEY))
        .and_then(|v| v.as_bool())
        .unwrap_or(false)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Anonymous,
    Member,
    Administrator,
}

impl Role {
    pub fn of(identity: Option<&Identity>) -> Self {
        match identity {
            None => Role::Anonymous,
            Some(_) if is_admin(identity) => Role::Administrator,
            Some(_) => Role::Member,
        }
    }

    pub fn is_signed_in(&self) -> bool {
        !matches!(self, Role::Anonymous)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Anonymous => "anonymous",
            Role::Member => "member",
            Role::Administrator => "administrator",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{Metadata, UserId};
    use chrono::Utc;
    use proptest::prelude::*;
    use serde_json::{json, Value};

    fn identity_with(metadata: Metadata) -> Identity {
        Identity {
            id: UserId::from("u-1"),
            email: "a@b.com".to_string(),
            metadata,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_absent_identity_is_never_admin() {
        assert!(!is_admin(None));
        assert_eq!(Role::of(None), Role::Anonymous);
    }

    #[test]
    fn test_truthy_lookalikes_are_not_admin() {
        for value in [json!("true"), json!(1), json!({"value": true}), json!(null), json!(false)] {
            let identity = identity_with(Metadata::new().with(ADMIN_FLAG_KEY, value.clone()));
            assert!(!is_admin(Some(&identity)), "{} must not grant admin", value);
            assert_eq!(Role::of(Some(&identity)), Role::Member);
        }
    }

    #[test]
    fn test_boolean_true_is_admin() {
        let identity = identity_with(Metadata::new().with(ADMIN_FLAG_KEY, true));
        assert!(is_admin(Some(&identity)));
        assert_eq!(Role::of(Some(&identity)), Role::Administrator);
    }

    fn arb_json() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(|n| json!(n)),
            "[a-z]{0,8}".prop_map(Value::String),
        ];
        leaf.prop_recursive(2, 8, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
                prop::collection::hash_map("[a-zA-Z]{1,8}", inner, 0..4)
                    .prop_map(|m| Value::Object(m.into_iter().collect())),
            ]
        })
    }

    proptest! {
        #[test]
        fn prop_admin_iff_flag_is_boolean_true(raw in arb_json(), flag in prop::option::of(arb_json())) {
            let mut metadata = Metadata::from(raw);
            if let Some(flag) = flag {
                metadata.insert(ADMIN_FLAG_KEY, flag);
            }
            let expected = metadata.get(ADMIN_FLAG_KEY) == Some(&Value::Bool(true));
            let identity = identity_with(metadata);
            prop_assert_eq!(is_admin(Some(&identity)), expected);
        }
    }
}
