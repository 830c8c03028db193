use std::{fs, path::PathBuf, sync::Arc};
use tempfile::TempDir;
use ultrabundle::{
    config::{PackageMetadata, TargetConfig},
    core::{
        BuildEvent, BuildOrchestrator, PipelineBuilder, RecordingReporter, RunFlags, RunOutcome,
        StageTag, TargetDescriptor,
    },
    engine::RollupEngine,
};

/// Stand-in for rollup: copies the entry module to `--file` and emits a
/// declaration directory for TypeScript entries.
const FAKE_ROLLUP: &str = r#"while [ $# -gt 0 ]; do
  case "$1" in
    --input) src="$2"; shift ;;
    --file) dst="$2"; shift ;;
  esac
  shift
done
mkdir -p "$(dirname "$dst")"
cp "$src" "$dst"
case "$src" in
  *.ts) mkdir -p "$(dirname "$dst")/types" && touch "$(dirname "$dst")/types/index.d.ts" ;;
esac
"#;

struct Project {
    dir: TempDir,
}

impl Project {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("src")).unwrap();
        fs::write(
            dir.path().join("src/index.ts"),
            "export const answer: number = 42;\n",
        )
        .unwrap();
        fs::write(dir.path().join("fake-rollup.sh"), FAKE_ROLLUP).unwrap();
        Self { dir }
    }

    fn path(&self, relative: &str) -> String {
        self.dir.path().join(relative).display().to_string()
    }

    fn engine(&self) -> RollupEngine {
        RollupEngine::with_command("sh", vec![self.path("fake-rollup.sh")], false)
    }

    fn target(&self, optimize: bool) -> (Arc<RunFlags>, TargetDescriptor) {
        let element = serde_json::json!({
            "input": self.path("src/index.ts"),
            "output": self.path("dist/index.js"),
            "format": "umd",
            "optimizations": {
                "minify": true,
                "gzip": true,
                "simplify": true,
                "dead_code_elimination": true
            }
        });
        let config = TargetConfig::from_value(element).unwrap();
        let flags = Arc::new(RunFlags {
            optimize,
            ..RunFlags::default()
        });
        let package = Arc::new(PackageMetadata::default());
        let target = TargetDescriptor::new(0, Arc::clone(&flags), config, package);
        (flags, target)
    }
}

async fn build(project: &Project, optimize: bool) -> (Vec<PathBuf>, Arc<RecordingReporter>) {
    let (flags, target) = project.target(optimize);
    let reporter = Arc::new(RecordingReporter::new());
    let orchestrator = BuildOrchestrator::new(
        flags,
        vec![target],
        Arc::new(project.engine()),
        reporter.clone(),
    );

    let RunOutcome::Built(mut results) = orchestrator.run().await.unwrap() else {
        panic!("expected one-shot results");
    };
    let report = results.remove(0).result.unwrap();
    (report.artifacts, reporter)
}

#[tokio::test]
async fn optimized_typescript_target() {
    let project = Project::new();
    let (_, target) = project.target(true);

    let pipeline = PipelineBuilder::for_target(&target);
    assert_eq!(
        pipeline.tags(),
        vec![
            StageTag::Transpile,
            StageTag::StyleProcess,
            StageTag::Resolve,
            StageTag::Interop,
            StageTag::SyntaxTransform,
            StageTag::Minify,
            StageTag::Compress,
        ]
    );
    assert!(!pipeline.syntax_passes().is_empty());

    let (artifacts, reporter) = build(&project, true).await;

    let out = project.dir.path().join("dist/index.js");
    assert_eq!(
        artifacts,
        vec![
            out.clone(),
            project.dir.path().join("dist/index.js.gz"),
            project.dir.path().join("dist/types"),
        ]
    );
    assert!(out.exists());
    assert!(project.dir.path().join("dist/types/index.d.ts").exists());

    let events = reporter.events();
    assert_eq!(events.len(), 2);
    assert!(matches!(events[0], BuildEvent::Started { .. }));
    assert!(matches!(events[1], BuildEvent::Finished { .. }));
}

#[tokio::test]
async fn unoptimized_run_ignores_target_flags() {
    let project = Project::new();
    let (_, target) = project.target(false);

    let pipeline = PipelineBuilder::for_target(&target);
    assert!(!pipeline.contains(StageTag::Minify));
    assert!(!pipeline.contains(StageTag::Compress));
    assert!(pipeline.syntax_passes().is_empty());

    let (artifacts, _) = build(&project, false).await;

    assert_eq!(artifacts[0], project.dir.path().join("dist/index.js"));
    assert!(!project.dir.path().join("dist/index.js.gz").exists());
    assert!(
        !artifacts
            .iter()
            .any(|artifact| artifact.extension().is_some_and(|ext| ext == "gz"))
    );
}
