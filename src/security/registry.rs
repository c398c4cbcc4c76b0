//! Actor registry.
//!
//! Lookups read an immutable snapshot; a reload builds a complete new roster
//! and swaps it in one store, so readers never observe a half-loaded state.

use arc_swap::ArcSwap;
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::ActorConfig;
use crate::security::context::{Actor, ActorType};

type Roster = HashMap<String, Arc<Actor>>;

/// Resolves `type:id` references to registered actors.
#[derive(Default)]
pub struct ActorRegistry {
    actors: ArcSwap<Roster>,
}

impl ActorRegistry {
    pub fn new(actors: impl IntoIterator<Item = Actor>) -> Self {
        Self {
            actors: ArcSwap::from_pointee(build_roster(actors)),
        }
    }

    /// Build a registry from the `[[actors]]` config section.
    pub fn from_config(actors: &[ActorConfig]) -> Self {
        Self::new(actors.iter().map(Actor::from))
    }

    /// Look up an actor. Unknown references return `None`.
    pub fn find(&self, actor_type: ActorType, actor_id: &str) -> Option<Arc<Actor>> {
        let key = format!("{}:{}", actor_type, actor_id);
        self.actors.load().get(&key).cloned()
    }

    /// Atomically replace the whole roster.
    pub fn replace(&self, actors: impl IntoIterator<Item = Actor>) {
        let roster = build_roster(actors);
        let count = roster.len();
        self.actors.store(Arc::new(roster));
        tracing::info!(actors = count, "Actor registry reloaded");
    }

    pub fn len(&self) -> usize {
        self.actors.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn build_roster(actors: impl IntoIterator<Item = Actor>) -> Roster {
    actors
        .into_iter()
        .map(|actor| (actor.reference(), Arc::new(actor)))
        .collect()
}

impl From<&ActorConfig> for Actor {
    fn from(config: &ActorConfig) -> Self {
        Actor {
            actor_id: config.id.clone(),
            actor_type: config.actor_type,
            role: config.role,
            scopes: config.scopes.iter().cloned().collect(),
            keys: config.keys.clone().into_iter().collect(),
        }
    }
}
