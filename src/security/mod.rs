//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request (route already resolved):
//!     → pipeline.rs (fixed step order)
//!         → registry.rs      (x-actor-id → Actor → SecurityContext)
//!         → nonce.rs         (format check, atomic check-and-mark)
//!         → signature.rs     (StringToSign → canonicalize → HMAC-SHA256)
//!         → encryption.rs    (AES-256-GCM envelope → plaintext body)
//!         → context.rs       (scope and role checks)
//!         → rate_limit.rs    (sliding window per actor and route)
//!     → Ok: request annotated with SecurityContext
//!     → Err: SecurityViolation (violation.rs), request never reaches a handler
//! ```
//!
//! # Design Decisions
//! - Fail closed: any missing input or failed check denies
//! - One violation per request, the first failing step wins
//! - Secrets never leave this module except through `SecurityContext::key_for`
//! - No step awaits; the pipeline runs inline in the middleware

pub mod context;
pub mod encryption;
pub mod headers;
pub mod nonce;
pub mod pipeline;
pub mod rate_limit;
pub mod registry;
pub mod signature;
pub mod signer;
pub mod violation;

pub use context::{Actor, ActorType, HierarchyRole, SecurityContext};
pub use pipeline::{SecuredRequest, SecurityPipeline};
pub use violation::SecurityViolation;
