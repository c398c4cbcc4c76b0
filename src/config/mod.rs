//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → routes compiled once, actors seeded into the registry
//!
//! On file change (--watch):
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → server swaps the actor roster
//! ```
//!
//! # Design Decisions
//! - Only the actor roster is hot-reloaded; routes and limits need a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, ConfigError};
pub use schema::{ActorConfig, GatewayConfig, LogFormat, ObservabilityConfig, RouteConfig};
pub use validation::{validate_config, ValidationError};
