//! Route requirements lookup.
//!
//! # Responsibilities
//! - Hold one `RouteRequirements` per `"METHOD /path"` key
//! - Resolve a concrete request to its entry: exact key first, then
//!   placeholder patterns in registration order
//!
//! # Design Decisions
//! - Built at startup, read-only afterwards (shared via `Arc`)
//! - "No entry" is a distinct answer, never an implicit public route

use std::collections::HashMap;

use crate::config::RouteConfig;
use crate::routing::matcher::PathPattern;
use crate::routing::requirements::RouteRequirements;

#[derive(Debug, Clone)]
struct RouteEntry {
    key: String,
    method: String,
    pattern: PathPattern,
    requirements: RouteRequirements,
}

/// A successful lookup.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedRoute<'a> {
    /// Registered key, e.g. `"POST /tasks/{id}/tick"`. Used as the rate-limit route id.
    pub route_id: &'a str,
    pub requirements: &'a RouteRequirements,
}

/// Registered requirements for every routed endpoint.
#[derive(Debug, Clone, Default)]
pub struct RouteRequirementsMap {
    entries: Vec<RouteEntry>,
    exact: HashMap<String, usize>,
}

impl RouteRequirementsMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(routes: &[RouteConfig]) -> Self {
        let mut map = Self::new();
        for route in routes {
            map.add(&route.method, &route.path, route.requirements.clone());
        }
        map
    }

    /// Register requirements, replacing any entry with the same key.
    pub fn add(&mut self, method: &str, path: &str, requirements: RouteRequirements) {
        let method = method.to_ascii_uppercase();
        let key = route_key(&method, path);

        if let Some(&index) = self.exact.get(&key) {
            self.entries[index].requirements = requirements;
            return;
        }

        self.exact.insert(key.clone(), self.entries.len());
        self.entries.push(RouteEntry {
            key,
            method,
            pattern: PathPattern::parse(path),
            requirements,
        });
    }

    pub fn resolve(&self, method: &str, path: &str) -> Option<ResolvedRoute<'_>> {
        let method = method.to_ascii_uppercase();

        let entry = self
            .exact
            .get(&route_key(&method, path))
            .map(|&index| &self.entries[index])
            .or_else(|| {
                self.entries.iter().find(|entry| {
                    entry.method == method
                        && entry.pattern.is_parameterized()
                        && entry.pattern.matches(path)
                })
            })?;

        Some(ResolvedRoute {
            route_id: &entry.key,
            requirements: &entry.requirements,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn route_key(method: &str, path: &str) -> String {
    format!("{} {}", method, path)
}
