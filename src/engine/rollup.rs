//! Engine adapter driving the `rollup` command-line bundler
//!
//! Every engine-side stage becomes a `--plugin name=<options>` argument; the
//! compress stage is applied natively after rollup has written the bundle.

use super::{Bundle, Engine, EngineWatch, InputOptions, WatchRequest, watch::spawn_watch};
use crate::config::ModuleFormat;
use crate::core::output::OutputOptions;
use crate::core::pipeline::{SYNTAX_FEATURES, Stage, StageTag, TreeShake};
use crate::error::{BundlerError, Result};
use crate::utils::{fs::FileSystemUtils, process::ProcessRunner};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};
use tracing::{debug, instrument, warn};

/// Project-local rollup installation, relative to the working directory
const LOCAL_BIN: &str = "node_modules/.bin/rollup";

/// Drives rollup as an external process
#[derive(Debug, Clone)]
pub struct RollupEngine {
    program: PathBuf,
    /// Arguments placed before the rollup arguments (`npx rollup ...`)
    launcher_args: Vec<String>,
    runner: ProcessRunner,
}

impl RollupEngine {
    /// Project-local rollup first, then `rollup` from PATH, then `npx`
    pub async fn locate(debug: bool) -> Self {
        let local = PathBuf::from(LOCAL_BIN);
        let engine = if local.is_file() {
            Self::with_command(local, Vec::new(), debug)
        } else if ProcessRunner::new(debug).command_exists("rollup").await {
            Self::with_command("rollup", Vec::new(), debug)
        } else {
            warn!("rollup was not found in {LOCAL_BIN} nor in PATH, falling back to npx");
            Self::with_command("npx", vec!["--no-install".to_string(), "rollup".to_string()], debug)
        };
        debug!("Using {}", engine.command_line());
        engine
    }

    pub fn with_command(program: impl Into<PathBuf>, launcher_args: Vec<String>, debug: bool) -> Self {
        Self {
            program: program.into(),
            launcher_args,
            runner: ProcessRunner::new(debug),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    fn command_line(&self) -> String {
        std::iter::once(self.program.display().to_string())
            .chain(self.launcher_args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[async_trait]
impl Engine for RollupEngine {
    #[instrument(skip(self, options), fields(input = %options.input.display()))]
    async fn build(&self, options: &InputOptions) -> Result<Box<dyn Bundle>> {
        if !options.input.is_file() {
            return Err(BundlerError::pipeline(format!(
                "could not resolve entry module {}",
                options.input.display()
            )));
        }

        let mut args = self.launcher_args.clone();
        args.extend(input_args(options));

        Ok(Box::new(RollupBundle {
            program: self.program.clone(),
            runner: self.runner,
            input: options.input.clone(),
            args,
            compress: options.pipeline.contains(StageTag::Compress),
            declaration_dir: options.pipeline.stages().iter().find_map(|stage| match stage {
                Stage::Transpile(transpile) => Some(transpile.declaration_dir.clone()),
                _ => None,
            }),
        }))
    }

    fn watch(self: Arc<Self>, request: WatchRequest) -> Result<EngineWatch> {
        spawn_watch(self, request)
    }
}

/// A planned rollup invocation waiting for its output options
struct RollupBundle {
    program: PathBuf,
    runner: ProcessRunner,
    input: PathBuf,
    args: Vec<String>,
    compress: bool,
    declaration_dir: Option<PathBuf>,
}

#[async_trait]
impl Bundle for RollupBundle {
    #[instrument(skip(self, output), fields(file = %output.file.display(), format = %output.format))]
    async fn write(&self, output: &OutputOptions) -> Result<Vec<PathBuf>> {
        let mut args = self.args.clone();
        args.extend(output_args(output));

        let result = self
            .runner
            .run(&self.program, &args)
            .await
            .map_err(|e| BundlerError::Pipeline {
                message: format!("rollup failed to bundle {}", self.input.display()),
                source: Some(Box::new(e)),
            })?;
        if !result.stderr.is_empty() {
            debug!("rollup: {}", result.stderr.trim());
        }

        let fs_utils = FileSystemUtils::new();
        let mut artifacts = vec![output.file.clone()];

        let map = fs_utils.sibling_with_suffix(&output.file, ".map");
        if output.sourcemap && fs_utils.is_file(&map) {
            artifacts.push(map);
        }

        if self.compress {
            let file = output.file.clone();
            let gz = tokio::task::spawn_blocking(move || fs_utils.gzip_sibling(&file))
                .await
                .map_err(|e| BundlerError::pipeline(format!("compression task failed: {e}")))?
                .map_err(|e| BundlerError::file_system("gzip", &output.file, e))?;
            artifacts.push(gz);
        }

        if let Some(dir) = &self.declaration_dir {
            if fs_utils.is_dir(dir) {
                artifacts.push(dir.clone());
            }
        }

        Ok(artifacts)
    }
}

/// Build-phase arguments: entry, externals, tree-shaking and plugins
pub fn input_args(options: &InputOptions) -> Vec<String> {
    let mut args = vec!["--input".to_string(), options.input.display().to_string()];

    if !options.external.is_empty() {
        args.push("--external".to_string());
        args.push(options.external.join(","));
    }

    match options.tree_shake() {
        TreeShake::Enabled => {
            args.push("--treeshake".to_string());
            args.push("recommended".to_string());
        }
        TreeShake::Disabled => args.push("--no-treeshake".to_string()),
    }

    for plugin in options.pipeline.stages().iter().filter_map(plugin_arg) {
        args.push("--plugin".to_string());
        args.push(plugin);
    }

    args
}

/// Write-phase arguments
pub fn output_args(output: &OutputOptions) -> Vec<String> {
    let mut args = vec![
        "--file".to_string(),
        output.file.display().to_string(),
        "--format".to_string(),
        canonical_format(output.format).to_string(),
        "--name".to_string(),
        output.name.clone(),
    ];

    if output.sourcemap {
        args.push("--sourcemap".to_string());
    }

    if !output.globals.is_empty() {
        args.push("--globals".to_string());
        args.push(
            output
                .globals
                .iter()
                .map(|(id, global)| format!("{id}:{global}"))
                .collect::<Vec<_>>()
                .join(","),
        );
    }

    args
}

/// Rollup's own name for a format alias
pub const fn canonical_format(format: ModuleFormat) -> &'static str {
    match format {
        ModuleFormat::Cjs | ModuleFormat::Commonjs => "cjs",
        ModuleFormat::Es | ModuleFormat::Esm | ModuleFormat::Module => "es",
        ModuleFormat::Amd => "amd",
        ModuleFormat::Iife => "iife",
        ModuleFormat::System => "system",
        ModuleFormat::Umd => "umd",
    }
}

/// `--plugin` value for a stage; `None` for stages rollup does not run
pub fn plugin_arg(stage: &Stage) -> Option<String> {
    let (name, options): (&str, Option<Value>) = match stage {
        Stage::Transpile(transpile) => (
            "typescript2",
            Some(json!({
                "useTsconfigDeclarationDir": true,
                "tsconfigDefaults": {
                    "compilerOptions": {
                        "moduleResolution": transpile.module_resolution.as_str(),
                        "declaration": true,
                        "types": [],
                        "declarationDir": transpile.declaration_dir.display().to_string(),
                        "isolatedModules": true,
                        "esModuleInterop": true,
                        "strict": true,
                        "experimentalDecorators": true,
                        "emitDecoratorMetadata": true,
                        "forceConsistentCasingInFileNames": true,
                        "allowSyntheticDefaultImports": true
                    }
                },
                "tsconfigOverride": { "compilerOptions": { "module": "esnext" } }
            })),
        ),
        Stage::StyleProcess => ("postcss", None),
        Stage::Resolve(resolve) => (
            "node-resolve",
            Some(json!({ "extensions": resolve.extensions })),
        ),
        Stage::Interop(interop) => ("commonjs", Some(json!({ "include": interop.include }))),
        Stage::SyntaxTransform(syntax) => {
            let plugins: Vec<&str> = SYNTAX_FEATURES
                .iter()
                .copied()
                .chain(syntax.passes.iter().map(|pass| pass.plugin_name()))
                .collect();
            (
                "babel",
                Some(json!({
                    "babelrc": false,
                    "babelHelpers": "bundled",
                    "extensions": syntax.extensions,
                    "exclude": syntax.exclude,
                    "presets": [["@babel/env", { "modules": false }]],
                    "plugins": plugins
                })),
            )
        }
        Stage::Minify => ("terser", None),
        Stage::Compress => return None,
    };

    Some(match options {
        Some(options) => format!("{name}={options}"),
        None => name.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{OptimizationOptions, TargetConfig};
    use crate::core::pipeline::{OptimizationPass, PipelineBuilder};
    use crate::core::target::RunFlags;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn input_options(input: &str, optimize: bool) -> InputOptions {
        let config = TargetConfig {
            input: input.to_string(),
            output: "dist/index.js".to_string(),
            external: vec!["react".to_string(), "lodash".to_string()],
            optimizations: OptimizationOptions::default(),
            ..TargetConfig::default()
        };
        let flags = RunFlags {
            optimize,
            ..RunFlags::default()
        };
        InputOptions {
            input: PathBuf::from(input),
            external: config.external.clone(),
            pipeline: PipelineBuilder::build(&flags, &config),
        }
    }

    fn plugins(args: &[String]) -> Vec<&str> {
        args.windows(2)
            .filter(|pair| pair[0] == "--plugin")
            .map(|pair| pair[1].split('=').next().unwrap_or_default())
            .collect()
    }

    #[test]
    fn test_input_args_with_optimizations() {
        let args = input_args(&input_options("src/index.ts", true));

        assert_eq!(&args[..4], ["--input", "src/index.ts", "--external", "react,lodash"]);
        assert!(args.windows(2).any(|pair| pair == ["--treeshake", "recommended"]));
        assert_eq!(
            plugins(&args),
            vec!["typescript2", "postcss", "node-resolve", "commonjs", "babel", "terser"]
        );
    }

    #[test]
    fn test_input_args_without_optimize() {
        let args = input_args(&input_options("src/index.js", false));

        assert!(args.contains(&"--no-treeshake".to_string()));
        assert!(!args.contains(&"--treeshake".to_string()));
        assert_eq!(
            plugins(&args),
            vec!["postcss", "node-resolve", "commonjs", "babel"]
        );
    }

    #[test]
    fn test_babel_plugin_carries_passes() {
        let options = input_options("src/index.js", true);
        let babel = options
            .pipeline
            .stages()
            .iter()
            .find(|stage| stage.tag() == StageTag::SyntaxTransform)
            .and_then(plugin_arg)
            .unwrap();

        let json: Value = serde_json::from_str(babel.trim_start_matches("babel=")).unwrap();
        let plugins = json["plugins"].as_array().unwrap();
        assert_eq!(plugins.len(), SYNTAX_FEATURES.len() + OptimizationPass::ALL.len());
        assert_eq!(plugins[0], SYNTAX_FEATURES[0]);
        assert_eq!(json["exclude"], "node_modules/**");
    }

    #[test]
    fn test_typescript_plugin_declaration_dir() {
        let options = input_options("src/index.ts", false);
        let plugin = plugin_arg(&options.pipeline.stages()[0]).unwrap();
        let json: Value = serde_json::from_str(plugin.trim_start_matches("typescript2=")).unwrap();

        let compiler = &json["tsconfigDefaults"]["compilerOptions"];
        assert_eq!(compiler["declarationDir"], "dist/types");
        assert_eq!(compiler["moduleResolution"], "node");
        assert_eq!(plugin_arg(&Stage::Compress), None);
    }

    #[test]
    fn test_output_args() {
        let output = OutputOptions {
            file: PathBuf::from("dist/index.js"),
            sourcemap: true,
            format: ModuleFormat::Commonjs,
            name: "lib".to_string(),
            globals: BTreeMap::from([
                ("lodash".to_string(), "_".to_string()),
                ("react".to_string(), "React".to_string()),
            ]),
        };

        assert_eq!(
            output_args(&output),
            vec![
                "--file",
                "dist/index.js",
                "--format",
                "cjs",
                "--name",
                "lib",
                "--sourcemap",
                "--globals",
                "lodash:_,react:React"
            ]
        );
    }

    #[test]
    fn test_canonical_format() {
        assert_eq!(canonical_format(ModuleFormat::Esm), "es");
        assert_eq!(canonical_format(ModuleFormat::Module), "es");
        assert_eq!(canonical_format(ModuleFormat::Umd), "umd");
    }

    #[tokio::test]
    async fn test_missing_entry_is_pipeline_error() {
        let temp_dir = TempDir::new().unwrap();
        let engine = RollupEngine::with_command("rollup", Vec::new(), false);
        let mut options = input_options("src/index.js", false);
        options.input = temp_dir.path().join("missing.js");

        let result = engine.build(&options).await;
        assert!(matches!(result, Err(BundlerError::Pipeline { .. })));
    }

    #[tokio::test]
    async fn test_write_compresses_output() {
        let temp_dir = TempDir::new().unwrap();
        let entry = temp_dir.path().join("index.js");
        std::fs::write(&entry, "export default 1;\n").unwrap();
        let out = temp_dir.path().join("out.js");

        // Stand-in for rollup: copies the entry module to the --file argument.
        let script = temp_dir.path().join("fake-rollup.sh");
        std::fs::write(
            &script,
            "while [ $# -gt 0 ]; do\n  case \"$1\" in\n    --input) src=\"$2\"; shift ;;\n    --file) dst=\"$2\"; shift ;;\n  esac\n  shift\ndone\ncp \"$src\" \"$dst\"\n",
        )
        .unwrap();

        let engine = RollupEngine::with_command("sh", vec![script.display().to_string()], false);
        let mut options = input_options("index.js", true);
        options.input = entry;
        let bundle = engine.build(&options).await.unwrap();

        let output = OutputOptions {
            file: out.clone(),
            sourcemap: false,
            format: ModuleFormat::Es,
            name: "bundle".to_string(),
            globals: BTreeMap::new(),
        };
        let artifacts = bundle.write(&output).await.unwrap();

        assert_eq!(artifacts, vec![out.clone(), temp_dir.path().join("out.js.gz")]);
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "export default 1;\n");
    }

    #[tokio::test]
    async fn test_failed_run_is_pipeline_error() {
        let temp_dir = TempDir::new().unwrap();
        let entry = temp_dir.path().join("index.js");
        std::fs::write(&entry, "import './missing';\n").unwrap();

        let engine = RollupEngine::with_command("false", Vec::new(), false);
        let mut options = input_options("index.js", false);
        options.input = entry;
        let bundle = engine.build(&options).await.unwrap();

        let output = OutputOptions {
            file: temp_dir.path().join("out.js"),
            sourcemap: false,
            format: ModuleFormat::Umd,
            name: "bundle".to_string(),
            globals: BTreeMap::new(),
        };
        match bundle.write(&output).await {
            Err(BundlerError::Pipeline { source, .. }) => assert!(source.is_some()),
            other => panic!("Expected Pipeline error, got {other:?}"),
        }
    }
}
