//! Command manifests
//!
//! Commands can be declared as YAML files in the commands directory. Each
//! file binds a name, aliases, access flags and a cooldown to one of the
//! built-in handlers, and the directory is re-scanned for hot reload.

pub mod loader;
pub mod manifest;

pub use loader::{CommandLoader, HandlerCatalog, ReloadReport};
pub use manifest::CommandManifest;
