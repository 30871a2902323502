//! Tool reference data — registry entries, capabilities, endpoint metadata
//! and the in-memory catalog used by the registry adapters.

pub mod catalog;

pub use catalog::{CatalogDocument, HttpEndpoint, Tool, ToolCapability, ToolCatalog};
