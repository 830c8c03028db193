//! Build job descriptors

use crate::config::{PackageMetadata, TargetConfig};
use std::{path::PathBuf, sync::Arc};

/// Process-wide flags, fixed once the command line is parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunFlags {
    /// Path of the target array
    pub config: PathBuf,
    /// Path of the package metadata file
    pub package_json: PathBuf,
    /// Keep rebuilding on changes instead of building once
    pub watch: bool,
    /// Enable the per-target optimizations
    pub optimize: bool,
}

impl Default for RunFlags {
    fn default() -> Self {
        Self {
            config: PathBuf::from("./bundles.json"),
            package_json: PathBuf::from("./package.json"),
            watch: false,
            optimize: false,
        }
    }
}

/// One build job: flags, target config and package metadata.
///
/// Cheap to clone; the same descriptor is reused for every rebuild while watching.
#[derive(Debug, Clone)]
pub struct TargetDescriptor {
    index: usize,
    flags: Arc<RunFlags>,
    config: TargetConfig,
    package: Arc<PackageMetadata>,
}

impl TargetDescriptor {
    pub fn new(
        index: usize,
        flags: Arc<RunFlags>,
        config: TargetConfig,
        package: Arc<PackageMetadata>,
    ) -> Self {
        Self {
            index,
            flags,
            config,
            package,
        }
    }

    /// Position in the config array
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn flags(&self) -> &RunFlags {
        &self.flags
    }

    pub fn config(&self) -> &TargetConfig {
        &self.config
    }

    pub fn package(&self) -> &PackageMetadata {
        &self.package
    }
}
