//! binpatch configuration - INI store, placeholder resolution, run settings

pub mod config;
pub mod ini;
pub mod resolve;

pub use config::{
    normalize_path, ArtifactEntry, ConfigStore, EmptyPatchSetPolicy, LaunchSpec, RunConfig,
};
pub use ini::{IniDocument, IniKey, IniSection};
pub use resolve::{ExternalSource, MapSource, NullSource, VariableResolver, DEFAULT_MAX_DEPTH};
