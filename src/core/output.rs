//! Output descriptor resolution

use crate::config::ModuleFormat;
use crate::core::target::TargetDescriptor;
use std::{collections::BTreeMap, path::PathBuf};

/// Display name used when the package metadata has no usable `name`
pub const FALLBACK_NAME: &str = "bundle";

/// Everything the engine's write phase needs to know
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputOptions {
    pub file: PathBuf,
    pub sourcemap: bool,
    pub format: ModuleFormat,
    /// Global name of the bundle for formats that expose one
    pub name: String,
    pub globals: BTreeMap<String, String>,
}

/// Resolves the output descriptor of a target. Pure, no I/O.
pub fn resolve_output(target: &TargetDescriptor) -> OutputOptions {
    let config = target.config();
    OutputOptions {
        file: PathBuf::from(&config.output),
        sourcemap: config.sourcemap,
        format: config.format,
        name: target
            .package()
            .name()
            .unwrap_or(FALLBACK_NAME)
            .to_string(),
        globals: config.globals.clone(),
    }
}
