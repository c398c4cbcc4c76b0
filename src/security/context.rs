//! Caller identity types.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

/// Kind of caller behind an actor reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorType {
    User,
    Integration,
}

impl ActorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActorType::User => "user",
            ActorType::Integration => "integration",
        }
    }
}

impl fmt::Display for ActorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActorType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(ActorType::User),
            "integration" => Ok(ActorType::Integration),
            _ => Err(()),
        }
    }
}

/// Parse an actor header value of the form `user:<id>` or `integration:<id>`.
///
/// Only the first `:` separates type from id; the id must be non-empty.
pub fn parse_actor_reference(value: &str) -> Option<(ActorType, &str)> {
    let (kind, id) = value.split_once(':')?;
    if id.is_empty() {
        return None;
    }
    Some((kind.parse().ok()?, id))
}

/// Hierarchical role. Variant order is the privilege order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HierarchyRole {
    #[default]
    User,
    Admin,
    #[serde(alias = "superadmin")]
    SuperAdmin,
}

impl HierarchyRole {
    /// True when this role is at least as privileged as `required`.
    pub fn is_at_least(&self, required: HierarchyRole) -> bool {
        *self >= required
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HierarchyRole::User => "user",
            HierarchyRole::Admin => "admin",
            HierarchyRole::SuperAdmin => "super_admin",
        }
    }
}

/// A registered caller: role, scopes and signing keys by key id.
#[derive(Clone, PartialEq, Eq)]
pub struct Actor {
    pub actor_id: String,
    pub actor_type: ActorType,
    pub role: HierarchyRole,
    pub scopes: BTreeSet<String>,
    pub keys: HashMap<String, String>,
}

impl Actor {
    /// Registry key, `"<type>:<id>"`.
    pub fn reference(&self) -> String {
        format!("{}:{}", self.actor_type, self.actor_id)
    }
}

impl fmt::Debug for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Actor")
            .field("actor_id", &self.actor_id)
            .field("actor_type", &self.actor_type)
            .field("role", &self.role)
            .field("scopes", &self.scopes)
            .field("key_ids", &sorted_key_ids(&self.keys))
            .finish()
    }
}

/// Identity snapshot attached to a request once authentication succeeds.
///
/// Lives in the request extensions for the duration of the request; handlers
/// read it with `Extension<SecurityContext>`.
#[derive(Clone, PartialEq, Eq)]
pub struct SecurityContext {
    actor_id: String,
    actor_type: ActorType,
    role: HierarchyRole,
    scopes: BTreeSet<String>,
    keys: HashMap<String, String>,
}

impl SecurityContext {
    pub fn actor_id(&self) -> &str {
        &self.actor_id
    }

    pub fn actor_type(&self) -> ActorType {
        self.actor_type
    }

    pub fn role(&self) -> HierarchyRole {
        self.role
    }

    pub fn scopes(&self) -> &BTreeSet<String> {
        &self.scopes
    }

    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.contains(scope)
    }

    /// Secret for a key id, if the actor owns one.
    pub fn key_for(&self, kid: &str) -> Option<&str> {
        self.keys.get(kid).map(String::as_str)
    }
}

impl From<&Actor> for SecurityContext {
    fn from(actor: &Actor) -> Self {
        Self {
            actor_id: actor.actor_id.clone(),
            actor_type: actor.actor_type,
            role: actor.role,
            scopes: actor.scopes.clone(),
            keys: actor.keys.clone(),
        }
    }
}

impl fmt::Debug for SecurityContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecurityContext")
            .field("actor_id", &self.actor_id)
            .field("actor_type", &self.actor_type)
            .field("role", &self.role)
            .field("scopes", &self.scopes)
            .field("key_ids", &sorted_key_ids(&self.keys))
            .finish()
    }
}

fn sorted_key_ids(keys: &HashMap<String, String>) -> Vec<&str> {
    let mut ids: Vec<&str> = keys.keys().map(String::as_str).collect();
    ids.sort_unstable();
    ids
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actor() -> Actor {
        Actor {
            actor_id: "user-123".into(),
            actor_type: ActorType::User,
            role: HierarchyRole::Admin,
            scopes: ["security.echo".to_string()].into_iter().collect(),
            keys: [("key-1".to_string(), "secret-key-user-123".to_string())]
                .into_iter()
                .collect(),
        }
    }

    #[test]
    fn test_parse_actor_reference() {
        assert_eq!(parse_actor_reference("user:user-123"), Some((ActorType::User, "user-123")));
        assert_eq!(
            parse_actor_reference("integration:crm:eu"),
            Some((ActorType::Integration, "crm:eu"))
        );
        assert_eq!(parse_actor_reference("user:"), None);
        assert_eq!(parse_actor_reference("robot:r2"), None);
        assert_eq!(parse_actor_reference("user-123"), None);
        assert_eq!(parse_actor_reference("User:user-123"), None);
    }

    #[test]
    fn test_role_order() {
        assert!(HierarchyRole::User < HierarchyRole::Admin);
        assert!(HierarchyRole::Admin < HierarchyRole::SuperAdmin);
        assert!(HierarchyRole::SuperAdmin.is_at_least(HierarchyRole::Admin));
        assert!(!HierarchyRole::User.is_at_least(HierarchyRole::Admin));
        assert!(HierarchyRole::Admin.is_at_least(HierarchyRole::Admin));
    }

    #[test]
    fn test_role_serde_names() {
        let role: HierarchyRole = serde_json::from_str("\"super_admin\"").unwrap();
        assert_eq!(role, HierarchyRole::SuperAdmin);
        let alias: HierarchyRole = serde_json::from_str("\"superadmin\"").unwrap();
        assert_eq!(alias, HierarchyRole::SuperAdmin);
        assert_eq!(serde_json::to_string(&HierarchyRole::Admin).unwrap(), "\"admin\"");
    }

    #[test]
    fn test_context_snapshot() {
        let ctx = SecurityContext::from(&actor());
        assert_eq!(ctx.actor_id(), "user-123");
        assert_eq!(ctx.role(), HierarchyRole::Admin);
        assert!(ctx.has_scope("security.echo"));
        assert_eq!(ctx.key_for("key-1"), Some("secret-key-user-123"));
        assert_eq!(ctx.key_for("key-2"), None);
    }

    #[test]
    fn test_debug_never_prints_secrets() {
        let actor = actor();
        let ctx = SecurityContext::from(&actor);
        for rendered in [format!("{:?}", actor), format!("{:?}", ctx)] {
            assert!(rendered.contains("key-1"));
            assert!(!rendered.contains("secret-key-user-123"));
        }
    }
}
