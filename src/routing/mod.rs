//! Routing subsystem: which security policy applies to a request.
//!
//! # Data Flow
//! ```text
//! Incoming Request (method, path)
//!     → router.rs (exact key, then pattern lookup)
//!     → matcher.rs (segment-wise placeholder matching)
//!     → Return: (route_id, RouteRequirements) or None
//!
//! Route Compilation (at startup):
//!     RouteConfig[]
//!     → parse path patterns
//!     → Freeze as immutable RouteRequirementsMap
//! ```
//!
//! # Design Decisions
//! - Requirements compiled at startup, immutable at runtime
//! - No regex in hot path
//! - Deterministic: same input always resolves to the same entry
//! - Missing entry means deny (`missing_requirements`), never allow

pub mod matcher;
pub mod requirements;
pub mod router;

pub use requirements::RouteRequirements;
pub use router::{ResolvedRoute, RouteRequirementsMap};
