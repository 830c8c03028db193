//! Pipeline assembly
//!
//! Turns the run flags and one target config into the ordered list of stages
//! handed to the engine. Assembly happens in two steps: an enablement table
//! decides which stages are on, then a fixed ordering function lays them out.
//! Later stages rely on earlier ones having resolved imports and normalized
//! syntax, so the order never depends on the config.

use crate::config::TargetConfig;
use crate::core::target::{RunFlags, TargetDescriptor};
use std::{
    collections::BTreeSet,
    fmt,
    path::{Path, PathBuf},
};

/// Inputs carrying this suffix go through the transpile stage
pub const TYPED_SOURCE_SUFFIX: &str = ".ts";

/// Subdirectory of the output directory receiving type declarations
pub const DECLARATION_DIR: &str = "types";

/// Third-party dependencies live under this glob
pub const DEPENDENCY_GLOB: &str = "node_modules/**";

/// File suffixes the resolve stage tries in addition to the bare specifier
pub const RESOLVE_EXTENSIONS: [&str; 7] = [".js", ".jsx", ".es6", ".mjs", ".cjs", ".ts", ".tsx"];

/// Syntax features always lowered, independent of optimizations
pub const SYNTAX_FEATURES: [&str; 4] = [
    "@babel/plugin-proposal-class-properties",
    "@babel/plugin-proposal-object-rest-spread",
    "@babel/plugin-proposal-nullish-coalescing-operator",
    "@babel/plugin-proposal-optional-chaining",
];

/// Identifies a pipeline stage independently of its options
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StageTag {
    Transpile,
    StyleProcess,
    Resolve,
    Interop,
    SyntaxTransform,
    Minify,
    Compress,
}

impl StageTag {
    /// Execution order of the stages
    pub const ORDER: [Self; 7] = [
        Self::Transpile,
        Self::StyleProcess,
        Self::Resolve,
        Self::Interop,
        Self::SyntaxTransform,
        Self::Minify,
        Self::Compress,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Transpile => "transpile",
            Self::StyleProcess => "style-process",
            Self::Resolve => "resolve",
            Self::Interop => "interop",
            Self::SyntaxTransform => "syntax-transform",
            Self::Minify => "minify",
            Self::Compress => "compress",
        }
    }
}

impl fmt::Display for StageTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Optimization sub-passes of the syntax transform, in application order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptimizationPass {
    ConstantFolding,
    Simplify,
    MinifyBooleans,
    MinifyNumericLiterals,
    InlineConsecutiveAdds,
    MergeSiblingVariables,
    MinifyGuardedExpressions,
    MinifyInfinity,
    MangleNames,
    MinifyTypeConstructors,
    PropertyLiterals,
    UndefinedToVoid,
}

impl OptimizationPass {
    pub const ALL: [Self; 12] = [
        Self::ConstantFolding,
        Self::Simplify,
        Self::MinifyBooleans,
        Self::MinifyNumericLiterals,
        Self::InlineConsecutiveAdds,
        Self::MergeSiblingVariables,
        Self::MinifyGuardedExpressions,
        Self::MinifyInfinity,
        Self::MangleNames,
        Self::MinifyTypeConstructors,
        Self::PropertyLiterals,
        Self::UndefinedToVoid,
    ];

    /// Plugin implementing the pass in the syntax transformer
    pub const fn plugin_name(self) -> &'static str {
        match self {
            Self::ConstantFolding => "minify-constant-folding",
            Self::Simplify => "minify-simplify",
            Self::MinifyBooleans => "transform-minify-booleans",
            Self::MinifyNumericLiterals => "minify-numeric-literals",
            Self::InlineConsecutiveAdds => "transform-inline-consecutive-adds",
            Self::MergeSiblingVariables => "transform-merge-sibling-variables",
            Self::MinifyGuardedExpressions => "minify-guarded-expressions",
            Self::MinifyInfinity => "minify-infinity",
            Self::MangleNames => "minify-mangle-names",
            Self::MinifyTypeConstructors => "minify-type-constructors",
            Self::PropertyLiterals => "@babel/plugin-transform-property-literals",
            Self::UndefinedToVoid => "transform-undefined-to-void",
        }
    }
}

/// How the transpiler resolves imports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleResolution {
    /// Host-style (`node_modules` lookup) resolution
    Node,
}

impl ModuleResolution {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Node => "node",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranspileOptions {
    /// Where type declarations are emitted
    pub declaration_dir: PathBuf,
    pub module_resolution: ModuleResolution,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveOptions {
    pub extensions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InteropOptions {
    /// Glob of the legacy modules to convert
    pub include: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxOptions {
    pub extensions: Vec<String>,
    /// Glob left untouched by the transform
    pub exclude: String,
    /// Empty unless the simplify optimization is active
    pub passes: Vec<OptimizationPass>,
}

/// One configured pipeline stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stage {
    Transpile(TranspileOptions),
    StyleProcess,
    Resolve(ResolveOptions),
    Interop(InteropOptions),
    SyntaxTransform(SyntaxOptions),
    Minify,
    Compress,
}

impl Stage {
    pub const fn tag(&self) -> StageTag {
        match self {
            Self::Transpile(_) => StageTag::Transpile,
            Self::StyleProcess => StageTag::StyleProcess,
            Self::Resolve(_) => StageTag::Resolve,
            Self::Interop(_) => StageTag::Interop,
            Self::SyntaxTransform(_) => StageTag::SyntaxTransform,
            Self::Minify => StageTag::Minify,
            Self::Compress => StageTag::Compress,
        }
    }
}

/// Tree-shaking mode of the engine's build phase, always set explicitly
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeShake {
    Enabled,
    Disabled,
}

/// Ordered stages plus the build-phase mode flags
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    stages: Vec<Stage>,
    tree_shake: TreeShake,
}

impl Pipeline {
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn tree_shake(&self) -> TreeShake {
        self.tree_shake
    }

    pub fn tags(&self) -> Vec<StageTag> {
        self.stages.iter().map(Stage::tag).collect()
    }

    pub fn contains(&self, tag: StageTag) -> bool {
        self.stages.iter().any(|stage| stage.tag() == tag)
    }

    /// Optimization passes carried by the syntax transform
    pub fn syntax_passes(&self) -> &[OptimizationPass] {
        self.stages
            .iter()
            .find_map(|stage| match stage {
                Stage::SyntaxTransform(options) => Some(options.passes.as_slice()),
                _ => None,
            })
            .unwrap_or(&[])
    }
}

/// An optional optimization is on only when both the global flag and the
/// target's own flag are set.
pub const fn gate(optimize: bool, enabled: bool) -> bool {
    optimize && enabled
}

/// Is this input a typed source that must be transpiled first?
pub fn is_typed_source(input: &str) -> bool {
    input.ends_with(TYPED_SOURCE_SUFFIX)
}

/// Stage enablement table
pub fn enabled_stages(flags: &RunFlags, config: &TargetConfig) -> BTreeSet<StageTag> {
    let optimizations = &config.optimizations;
    let mut enabled = BTreeSet::from([
        StageTag::StyleProcess,
        StageTag::Resolve,
        StageTag::Interop,
        StageTag::SyntaxTransform,
    ]);

    if is_typed_source(&config.input) {
        enabled.insert(StageTag::Transpile);
    }
    if gate(flags.optimize, optimizations.minify) {
        enabled.insert(StageTag::Minify);
    }
    if gate(flags.optimize, optimizations.gzip) {
        enabled.insert(StageTag::Compress);
    }

    enabled
}

/// Lay out an enabled set in execution order
pub fn order_stages(enabled: &BTreeSet<StageTag>) -> Vec<StageTag> {
    StageTag::ORDER
        .into_iter()
        .filter(|tag| enabled.contains(tag))
        .collect()
}

/// Builds pipelines; holds no state, so equal inputs give equal pipelines
#[derive(Debug, Default, Clone, Copy)]
pub struct PipelineBuilder;

impl PipelineBuilder {
    pub fn for_target(target: &TargetDescriptor) -> Pipeline {
        Self::build(target.flags(), target.config())
    }

    pub fn build(flags: &RunFlags, config: &TargetConfig) -> Pipeline {
        let enabled = enabled_stages(flags, config);
        let stages = order_stages(&enabled)
            .into_iter()
            .map(|tag| configure(tag, flags, config))
            .collect();

        let tree_shake = if gate(flags.optimize, config.optimizations.dead_code_elimination) {
            TreeShake::Enabled
        } else {
            TreeShake::Disabled
        };

        Pipeline { stages, tree_shake }
    }
}

fn configure(tag: StageTag, flags: &RunFlags, config: &TargetConfig) -> Stage {
    match tag {
        StageTag::Transpile => Stage::Transpile(TranspileOptions {
            declaration_dir: declaration_dir(&config.output),
            module_resolution: ModuleResolution::Node,
        }),
        StageTag::StyleProcess => Stage::StyleProcess,
        StageTag::Resolve => Stage::Resolve(ResolveOptions {
            extensions: extensions(),
        }),
        StageTag::Interop => Stage::Interop(InteropOptions {
            include: DEPENDENCY_GLOB.to_string(),
        }),
        StageTag::SyntaxTransform => {
            let passes = if gate(flags.optimize, config.optimizations.simplify) {
                OptimizationPass::ALL.to_vec()
            } else {
                Vec::new()
            };
            Stage::SyntaxTransform(SyntaxOptions {
                extensions: extensions(),
                exclude: DEPENDENCY_GLOB.to_string(),
                passes,
            })
        }
        StageTag::Minify => Stage::Minify,
        StageTag::Compress => Stage::Compress,
    }
}

/// `dirname(output)/types`
pub fn declaration_dir(output: &str) -> PathBuf {
    Path::new(output)
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
        .join(DECLARATION_DIR)
}

fn extensions() -> Vec<String> {
    RESOLVE_EXTENSIONS.iter().map(ToString::to_string).collect()
}
