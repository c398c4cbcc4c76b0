//! Declarative per-route security policy.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::security::context::HierarchyRole;

/// Which pipeline checks apply to a route, and its authorization and rate budget.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteRequirements {
    pub requires_auth: bool,
    pub requires_nonce: bool,
    pub requires_signature: bool,
    pub requires_encryption: bool,
    pub required_scopes: BTreeSet<String>,
    pub min_role: HierarchyRole,
    /// Requests per minute per actor; zero leaves the route unmetered.
    pub rate_limit_per_minute: u32,
}

impl RouteRequirements {
    /// No checks at all.
    pub fn public() -> Self {
        Self::default()
    }

    /// Authenticated, nonce-protected and signed.
    pub fn signed<I, S>(scopes: I, min_role: HierarchyRole, rate_limit_per_minute: u32) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            requires_auth: true,
            requires_nonce: true,
            requires_signature: true,
            requires_encryption: false,
            required_scopes: scopes.into_iter().map(Into::into).collect(),
            min_role,
            rate_limit_per_minute,
        }
    }

    /// Like [`RouteRequirements::signed`] with an encrypted body.
    pub fn encrypted<I, S>(scopes: I, min_role: HierarchyRole, rate_limit_per_minute: u32) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            requires_encryption: true,
            ..Self::signed(scopes, min_role, rate_limit_per_minute)
        }
    }
}
