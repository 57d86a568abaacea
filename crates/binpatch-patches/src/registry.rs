//! Patch trait and catalog
//!
//! Each patch is a self-contained type implementing the Patch trait. The
//! catalog maps exported type names to constructors; plugin modules in the
//! patches directory name the types they export (see [`crate::loader`]).

use std::collections::BTreeMap;

use binpatch_core::ArtifactHandle;

/// The Patch trait. Implement it to add a patch.
///
/// Only `can_patch` and `patch` are required. Every method runs on the
/// orchestrator thread, strictly in sequence; a patch keeping state across
/// artifacts sees every artifact of the run in config order.
pub trait Patch {
    /// Display name (e.g. "Stamp").
    fn name(&self) -> &str;

    fn version(&self) -> &str;

    /// Whether this patch applies to `artifact`. Returning false is not an
    /// error; the artifact is skipped for this patch.
    fn can_patch(&mut self, artifact: &ArtifactHandle) -> anyhow::Result<bool>;

    /// Mutate the artifact in place.
    fn patch(&mut self, artifact: &mut ArtifactHandle) -> anyhow::Result<()>;

    /// Runs once after loading, before any artifact is loaded.
    fn pre_patch(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Runs once after every artifact has been saved.
    fn post_patch(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    fn label(&self) -> String {
        format!("{} {}", self.name(), self.version())
    }
}

pub type PatchFactory = Box<dyn Fn() -> Box<dyn Patch>>;

pub struct PatchCatalog {
    factories: BTreeMap<String, PatchFactory>,
}

impl Default for PatchCatalog {
    fn default() -> Self { Self::new() }
}

impl PatchCatalog {
    pub fn new() -> Self { Self { factories: BTreeMap::new() } }

    /// Register a patch type constructed through `Default`. Replaces any
    /// existing entry with the same type name.
    pub fn register<P: Patch + Default + 'static>(&mut self, type_name: &str) {
        self.register_with(type_name, || Box::new(P::default()));
    }

    /// Register a type name with an explicit constructor.
    pub fn register_with(&mut self, type_name: &str, factory: impl Fn() -> Box<dyn Patch> + 'static) {
        self.factories.insert(type_name.to_string(), Box::new(factory));
    }

    pub fn remove(&mut self, type_name: &str) -> bool {
        self.factories.remove(type_name).is_some()
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.factories.contains_key(type_name)
    }

    /// Construct a fresh instance of `type_name`.
    pub fn instantiate(&self, type_name: &str) -> Option<Box<dyn Patch>> {
        self.factories.get(type_name).map(|factory| factory())
    }

    pub fn list(&self) -> Vec<&str> {
        self.factories.keys().map(|s| s.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}
