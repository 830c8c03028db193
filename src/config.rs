//! Configuration management for the bundler
//!
//! Loads the target array and package metadata, merges every target over
//! the documented default and runs the validation pass.

use crate::error::{BundlerError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::{collections::BTreeMap, fmt, path::Path};
use tracing::{debug, instrument};

/// Output module format of a target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleFormat {
    Amd,
    Cjs,
    Commonjs,
    Es,
    Esm,
    Iife,
    Module,
    System,
    #[default]
    Umd,
}

impl ModuleFormat {
    /// Name as written in the config file
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Amd => "amd",
            Self::Cjs => "cjs",
            Self::Commonjs => "commonjs",
            Self::Es => "es",
            Self::Esm => "esm",
            Self::Iife => "iife",
            Self::Module => "module",
            Self::System => "system",
            Self::Umd => "umd",
        }
    }
}

impl fmt::Display for ModuleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-target optimizations. Each one only applies together with `--optimize`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptimizationOptions {
    /// Minify the output
    pub minify: bool,
    /// Let the engine tree-shake dead code
    pub dead_code_elimination: bool,
    /// Simplify statements and expressions during syntax lowering
    pub simplify: bool,
    /// Write a gzipped sibling next to the output
    pub gzip: bool,
}

impl Default for OptimizationOptions {
    fn default() -> Self {
        Self {
            minify: true,
            dead_code_elimination: true,
            simplify: true,
            gzip: true,
        }
    }
}

/// One element of the config array
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Entry module
    pub input: String,
    /// Output file
    pub output: String,
    /// Output module format
    pub format: ModuleFormat,
    /// Emit a sourcemap next to the output
    pub sourcemap: bool,
    /// Optimizations gated by `--optimize`
    pub optimizations: OptimizationOptions,
    /// Module ids left out of the bundle
    pub external: Vec<String>,
    /// External id -> global variable name
    pub globals: BTreeMap<String, String>,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            input: String::new(),
            output: String::new(),
            format: ModuleFormat::default(),
            sourcemap: false,
            optimizations: OptimizationOptions::default(),
            external: Vec::new(),
            globals: BTreeMap::new(),
        }
    }
}

impl TargetConfig {
    /// Merge a raw config element over the default and deserialize it
    pub fn from_value(element: Value) -> std::result::Result<Self, serde_json::Error> {
        let mut merged = serde_json::to_value(Self::default())?;
        deep_merge(&mut merged, element);
        serde_json::from_value(merged)
    }

    /// Validate the fields the engine would otherwise reject opaquely
    pub fn validate(&self, index: usize) -> Result<()> {
        if self.input.trim().is_empty() {
            return Err(BundlerError::validation(index, "`input` must not be empty"));
        }
        if self.output.trim().is_empty() {
            return Err(BundlerError::validation(index, "`output` must not be empty"));
        }
        Ok(())
    }
}

/// Merge `overlay` into `base`: objects recursively, arrays appended, anything else replaced
pub fn deep_merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (Value::Array(base), Value::Array(overlay)) => base.extend(overlay),
        (base, overlay) => *base = overlay,
    }
}

/// Contents of the package metadata file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PackageMetadata(Map<String, Value>);

impl PackageMetadata {
    /// The `name` field, if it is a non-empty string
    pub fn name(&self) -> Option<&str> {
        self.0
            .get("name")
            .and_then(Value::as_str)
            .filter(|name| !name.is_empty())
    }
}

/// Load the target array, merging every element over the default
#[instrument]
pub fn load_targets(path: &Path) -> Result<Vec<TargetConfig>> {
    let contents = read(path)?;
    let elements: Vec<Value> = serde_json::from_str(&contents).map_err(|e| {
        BundlerError::config_with_source("config must be a JSON array of targets", path, e)
    })?;

    let targets = elements
        .into_iter()
        .enumerate()
        .map(|(index, element)| {
            TargetConfig::from_value(element).map_err(|e| {
                BundlerError::config_with_source(format!("invalid target #{index}"), path, e)
            })
        })
        .collect::<Result<Vec<_>>>()?;

    debug!("Loaded {} target(s) from {}", targets.len(), path.display());
    Ok(targets)
}

/// Load the package metadata object
#[instrument]
pub fn load_package_metadata(path: &Path) -> Result<PackageMetadata> {
    let contents = read(path)?;
    serde_json::from_str(&contents).map_err(|e| {
        BundlerError::config_with_source("package metadata must be a JSON object", path, e)
    })
}

/// Run the validation pass over every target before anything is built
pub fn validate_targets(targets: &[TargetConfig]) -> Result<()> {
    targets
        .iter()
        .enumerate()
        .try_for_each(|(index, target)| target.validate(index))
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .map_err(|e| BundlerError::config_with_source("cannot read file", path, e))
}
