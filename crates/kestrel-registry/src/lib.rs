//! # kestrel-registry
//!
//! Tool units and the live registry for the kestrel agent runtime.
//!
//! A tool unit is a TOML manifest (see `manifest`). The `UnitLoader` reads a
//! unit afresh on every load and binds each declared tool either to a native
//! body from the `BuiltinCatalog` or to an external process (`command`). The
//! schema synthesizer derives each tool's `InvocationSchema` from its
//! declared parameters and description text, and `ToolRegistry` rebuilds the
//! whole descriptor set on every refresh.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use kestrel_registry::{RegistryConfig, ToolRegistry, UnitLoader};
//!
//! let loader = UnitLoader::new(catalog, approver);
//! let mut registry = ToolRegistry::new(config, loader);
//! registry.refresh()?;
//! ```

pub mod bind;
pub mod command;
pub mod loader;
pub mod manifest;
pub mod registry;
pub mod scan;
pub mod schema;

pub use loader::{BuiltinCatalog, LoadedUnit, ToolDescriptor, UnitLoader};
pub use registry::{BaselineUnit, RegistryConfig, ToolRegistry};
pub use scan::ScanRules;
pub use schema::synthesize;
