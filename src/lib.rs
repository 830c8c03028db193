//! # UltraBundle
//!
//! Builds JavaScript and TypeScript bundles from a declarative list of
//! targets. Each target is merged over a default config, turned into an
//! ordered transformation pipeline and handed to an external bundling engine,
//! either once or under a file watcher.
//!
//! ## Features
//!
//! - Deep-merged JSON target configs with a validation pass
//! - Pipeline stages gated by global and per-target optimization flags
//! - Sequential one-shot builds with a configurable failure policy
//! - Watch mode with per-target rebuild status
//! - Rollup CLI adapter with native gzip compression
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use ultrabundle::{
//!     config::{PackageMetadata, TargetConfig},
//!     core::{PipelineBuilder, RunFlags, TargetDescriptor},
//! };
//!
//! let config = TargetConfig {
//!     input: "src/index.ts".to_string(),
//!     output: "dist/index.js".to_string(),
//!     ..TargetConfig::default()
//! };
//! let target = TargetDescriptor::new(
//!     0,
//!     Arc::new(RunFlags::default()),
//!     config,
//!     Arc::new(PackageMetadata::default()),
//! );
//! println!("Stages: {:?}", PipelineBuilder::for_target(&target).tags());
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod engine;
pub mod error;
pub mod utils;

use anyhow::Result;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize logging with appropriate verbosity; `RUST_LOG` takes precedence
pub fn setup_logging(debug: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if debug {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_level(true)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .with(filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}
