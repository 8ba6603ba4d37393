//! Route materialization.
//!
//! Discovers modules under the application root, injects the components they
//! export and mounts every action handler on the application router.

mod loader;
mod materializer;
pub mod path;
mod scan;
pub mod static_files;

pub use loader::{ModuleCatalog, ModuleLoader};
pub use materializer::{RouteMaterializer, RouteMaterializerBuilder};
pub use scan::{DiscoveredModule, ScanReport, scan_flat, scan_recursive};
pub use static_files::StaticDispatcher;
