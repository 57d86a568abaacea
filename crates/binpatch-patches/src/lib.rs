//! binpatch patches: the Patch contract, catalog, module loader and built-ins
//!
//! Each built-in patch is a self-contained file in src/patches/.
//! To add one: create the file, implement Patch, register it below.

pub mod guard;
pub mod loader;
pub mod patches;
pub mod registry;

pub use guard::guarded;
pub use loader::PluginLoader;
pub use patches::inventory::InventoryPatch;
pub use patches::stamp::StampPatch;
pub use registry::{Patch, PatchCatalog, PatchFactory};

/// Catalog of every built-in patch type, keyed by the name modules export.
pub fn builtin_catalog() -> PatchCatalog {
    let mut catalog = PatchCatalog::new();
    catalog.register::<StampPatch>("Stamp");
    catalog.register::<InventoryPatch>("Inventory");
    catalog
}
