//! End-to-end runs of the orchestrator against real temp directories

use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use binpatch::orchestrator::{Phase, PatchOrchestrator, RunFailure, RunOptions, RunOutcome, RunReport};
use binpatch::Launcher;
use binpatch_config::{ExternalSource, LaunchSpec, MapSource};
use binpatch_core::marker::{self, FINALIZED};
use binpatch_core::*;
use binpatch_patches::{Patch, PatchCatalog};

type Log = Rc<RefCell<Vec<String>>>;

#[derive(Clone, Default)]
struct Script {
    fail_pre: bool,
    fail_post: bool,
    decline: bool,
    /// File name of the artifact on which `patch` errors.
    fail_on: Option<String>,
    /// File name of the artifact on which `patch` panics.
    panic_on: Option<String>,
}

struct Recorder {
    name: String,
    log: Log,
    script: Script,
}

impl Recorder {
    fn record(&self, entry: String) {
        self.log.borrow_mut().push(entry);
    }
}

impl Patch for Recorder {
    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> &str {
        "1.0"
    }

    fn pre_patch(&mut self) -> anyhow::Result<()> {
        self.record(format!("pre:{}", self.name));
        if self.script.fail_pre {
            anyhow::bail!("pre failed");
        }
        Ok(())
    }

    fn can_patch(&mut self, artifact: &ArtifactHandle) -> anyhow::Result<bool> {
        self.record(format!("can:{}:{}", self.name, artifact.file_name()));
        Ok(!self.script.decline)
    }

    fn patch(&mut self, artifact: &mut ArtifactHandle) -> anyhow::Result<()> {
        let file = artifact.file_name();
        self.record(format!("patch:{}:{}", self.name, file));
        if self.script.fail_on.as_deref() == Some(file.as_str()) {
            anyhow::bail!("cannot patch {file}");
        }
        if self.script.panic_on.as_deref() == Some(file.as_str()) {
            panic!("index out of range in {file}");
        }
        marker::add_marker(artifact.artifact_mut(), &self.name)?;
        Ok(())
    }

    fn post_patch(&mut self) -> anyhow::Result<()> {
        self.record(format!("post:{}", self.name));
        if self.script.fail_post {
            anyhow::bail!("post failed");
        }
        Ok(())
    }
}

#[derive(Clone, Default)]
struct RecordingLauncher {
    calls: Rc<RefCell<Vec<LaunchSpec>>>,
    fail: bool,
}

impl Launcher for RecordingLauncher {
    fn launch(&mut self, spec: &LaunchSpec) -> Result<u32> {
        self.calls.borrow_mut().push(spec.clone());
        if self.fail {
            return Err(Error::Internal("no such program".into()));
        }
        Ok(4242)
    }
}

struct Fixture {
    _dir: tempfile::TempDir,
    root: PathBuf,
    log: Log,
    launches: Rc<RefCell<Vec<LaunchSpec>>>,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        fs::create_dir(root.join("Patches")).unwrap();
        fs::create_dir(root.join("Artifacts")).unwrap();
        Self {
            _dir: dir,
            root,
            log: Rc::default(),
            launches: Rc::default(),
        }
    }

    fn patches_dir(&self) -> PathBuf {
        self.root.join("Patches")
    }

    fn artifacts_dir(&self) -> PathBuf {
        self.root.join("Artifacts")
    }

    fn artifact(&self, file: &str) -> PathBuf {
        self.artifacts_dir().join(file)
    }

    fn config_path(&self) -> PathBuf {
        self.root.join("game.ini")
    }

    fn add_artifact(&self, file: &str, bytes: &[u8]) {
        fs::write(self.artifact(file), bytes).unwrap();
    }

    fn add_module(&self, file: &str, exports: &[&str]) {
        let list: Vec<String> = exports.iter().map(|e| format!("\"{e}\"")).collect();
        fs::write(
            self.patches_dir().join(file),
            format!("exports = [{}]\n", list.join(", ")),
        )
        .unwrap();
    }

    /// Config listing `artifacts` by name, without extension.
    fn write_config(&self, artifacts: &[&str], extra_main: &str, launch: &str) {
        let mut text = format!(
            "[Main]\nPatchesDir={}\nArtifactsDir={}\nExtension=dll\n{extra_main}\n[Artifacts]\n",
            self.patches_dir().display(),
            self.artifacts_dir().display(),
        );
        for name in artifacts {
            text.push_str(&format!("{name}={name}\n"));
        }
        text.push_str("[Launch]\n");
        text.push_str(launch);
        fs::write(self.config_path(), text).unwrap();
    }

    fn catalog(&self, scripts: &[(&str, Script)]) -> PatchCatalog {
        let mut catalog = PatchCatalog::new();
        for (name, script) in scripts {
            let log = self.log.clone();
            let name_owned = name.to_string();
            let script = script.clone();
            catalog.register_with(name, move || {
                Box::new(Recorder {
                    name: name_owned.clone(),
                    log: log.clone(),
                    script: script.clone(),
                }) as Box<dyn Patch>
            });
        }
        catalog
    }

    fn orchestrator(&self, catalog: PatchCatalog) -> PatchOrchestrator {
        PatchOrchestrator::new(catalog).with_launcher(RecordingLauncher {
            calls: self.launches.clone(),
            fail: false,
        })
    }

    fn options(&self) -> RunOptions {
        RunOptions::new(self.config_path())
    }

    fn entries(&self, prefix: &str) -> Vec<String> {
        self.log
            .borrow()
            .iter()
            .filter(|e| e.starts_with(prefix))
            .cloned()
            .collect()
    }

    fn backups(&self, dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|n| n.ends_with(".bak"))
            .collect();
        names.sort();
        names
    }
}

fn completed(result: std::result::Result<RunOutcome, RunFailure>) -> RunReport {
    match result {
        Ok(RunOutcome::Completed(report)) => report,
        Ok(other) => panic!("expected a completed run, got {other:?}"),
        Err(failure) => panic!("run failed: {failure}"),
    }
}

fn failed(result: std::result::Result<RunOutcome, RunFailure>) -> RunFailure {
    match result {
        Err(failure) => failure,
        Ok(outcome) => panic!("expected a failure, got {outcome:?}"),
    }
}

fn decode(path: &Path) -> Box<dyn Artifact> {
    BlobCodec.read_from(&fs::read(path).unwrap(), &[]).unwrap()
}

fn payload(path: &Path) -> Vec<u8> {
    decode(path)
        .as_any()
        .downcast_ref::<BlobArtifact>()
        .unwrap()
        .payload()
        .to_vec()
}

fn two_recorders() -> Vec<(&'static str, Script)> {
    vec![("First", Script::default()), ("Second", Script::default())]
}

// ===========================================================================
// Dispatch
// ===========================================================================

#[test]
fn artifacts_are_the_outer_loop() {
    let fx = Fixture::new();
    fx.add_artifact("A.dll", b"aaa");
    fx.add_artifact("B.dll", b"bbb");
    fx.add_module("10-first.toml", &["First"]);
    fx.add_module("20-second.toml", &["Second"]);
    fx.write_config(&["A", "B"], "", "");

    let report = completed(fx.orchestrator(fx.catalog(&two_recorders())).run(&fx.options()));
    assert_eq!(report.patches, vec!["First 1.0", "Second 1.0"]);

    let patched = fx.entries("patch:");
    let first_b = patched.iter().position(|e| e.ends_with(":B.dll")).unwrap();
    assert!(patched[..first_b].iter().all(|e| e.ends_with(":A.dll")));
    assert_eq!(
        patched,
        vec![
            "patch:First:A.dll",
            "patch:Second:A.dll",
            "patch:First:B.dll",
            "patch:Second:B.dll"
        ]
    );

    let log = fx.log.borrow();
    assert_eq!(log.first().map(String::as_str), Some("pre:First"));
    assert_eq!(log.last().map(String::as_str), Some("post:Second"));
}

#[test]
fn successful_run_backs_up_marks_and_saves() {
    let fx = Fixture::new();
    fx.add_artifact("A.dll", b"original");
    fx.add_module("m.toml", &["First"]);
    fx.write_config(&["A"], "", "");

    let report = completed(
        fx.orchestrator(fx.catalog(&[("First", Script::default())]))
            .run(&fx.options()),
    );

    let summary = &report.artifacts[0];
    assert!(summary.patched && summary.saved && !summary.from_backup);
    let backup = summary.backup.clone().unwrap();
    assert_eq!(fs::read(&backup).unwrap(), b"original");

    let saved = decode(&fx.artifact("A.dll"));
    assert!(marker::has_marker(saved.as_ref()));
    assert_eq!(
        marker::markers(saved.as_ref(), &TagTarget::Artifact).unwrap(),
        vec!["First", FINALIZED]
    );
    assert_eq!(payload(&fx.artifact("A.dll")), b"original");
}

// ===========================================================================
// Idempotency and backups
// ===========================================================================

#[test]
fn second_run_creates_no_new_backup() {
    let fx = Fixture::new();
    fx.add_artifact("A.dll", b"original");
    fx.add_module("m.toml", &["First"]);
    fx.write_config(&["A"], "", "");

    let first = completed(
        fx.orchestrator(fx.catalog(&[("First", Script::default())]))
            .run(&fx.options()),
    );
    assert!(first.artifacts[0].backup.is_some());

    let second = completed(
        fx.orchestrator(fx.catalog(&[("First", Script::default())]))
            .run(&fx.options()),
    );
    assert!(second.artifacts[0].patched);
    assert!(second.artifacts[0].saved);
    assert!(second.artifacts[0].backup.is_none());
    assert_eq!(fx.backups(&fx.artifacts_dir()).len(), 1);

    let markers = marker::markers(decode(&fx.artifact("A.dll")).as_ref(), &TagTarget::Artifact)
        .unwrap()
        .into_iter()
        .map(String::from)
        .collect::<Vec<_>>();
    assert_eq!(markers, vec!["First", FINALIZED, "First"]);
}

#[test]
fn reload_picks_newest_backup() {
    let fx = Fixture::new();
    fx.add_artifact("A.dll", b"patched before");
    fx.add_artifact("A.dll.2024-03-02_14-00-00.bak", b"older");
    fx.add_artifact("A.dll.2024-03-02_15-30-00.bak", b"newest");
    fx.add_module("m.toml", &["First"]);
    fx.write_config(&["A"], "", "");

    let mut options = fx.options();
    options.prefer_backup = true;
    let script = Script {
        decline: true,
        ..Script::default()
    };
    let report = completed(fx.orchestrator(fx.catalog(&[("First", script)])).run(&options));

    let summary = &report.artifacts[0];
    assert!(summary.from_backup);
    assert!(!summary.patched);
    assert!(summary.saved, "artifacts loaded from backup are always written");
    assert!(summary.backup.is_none());
    assert_eq!(payload(&fx.artifact("A.dll")), b"newest");
    assert!(marker::has_marker(decode(&fx.artifact("A.dll")).as_ref()));
    assert_eq!(fx.backups(&fx.artifacts_dir()).len(), 2);
}

#[test]
fn file_listed_twice_is_backed_up_once() {
    let fx = Fixture::new();
    fx.add_artifact("A.dll", b"original");
    fx.add_module("m.toml", &["First"]);
    let text = format!(
        "[Main]\nPatchesDir={}\nArtifactsDir={}\n[Artifacts]\nA=A\nA2=A.dll\nA3={}\n",
        fx.patches_dir().display(),
        fx.artifacts_dir().display(),
        fx.artifact("A.dll").display(),
    );
    fs::write(fx.config_path(), text).unwrap();

    let report = completed(
        fx.orchestrator(fx.catalog(&[("First", Script::default())]))
            .run(&fx.options()),
    );
    assert_eq!(report.artifacts.len(), 1);
    assert_eq!(fx.entries("patch:"), vec!["patch:First:A.dll"]);

    let backups = fx.backups(&fx.artifacts_dir());
    assert_eq!(backups.len(), 1);
    let backup = fx.artifact(&backups[0]);
    assert_eq!(fs::read(&backup).unwrap(), b"original");
    assert!(!marker::has_marker(decode(&backup).as_ref()));
}

#[test]
fn reload_without_backups_uses_primary() {
    let fx = Fixture::new();
    fx.add_artifact("A.dll", b"primary");
    fx.add_module("m.toml", &["First"]);
    fx.write_config(&["A"], "", "");

    let mut options = fx.options();
    options.prefer_backup = true;
    let report = completed(
        fx.orchestrator(fx.catalog(&[("First", Script::default())]))
            .run(&options),
    );
    assert!(!report.artifacts[0].from_backup);
    assert!(report.artifacts[0].backup.is_some());
}

#[test]
fn declined_everywhere_writes_nothing() {
    let fx = Fixture::new();
    fx.add_artifact("A.dll", b"aaa");
    fx.add_artifact("B.dll", b"bbb");
    fx.add_module("m.toml", &["First", "Second"]);
    fx.write_config(&["A", "B"], "", "");

    let decline = Script {
        decline: true,
        ..Script::default()
    };
    let report = completed(
        fx.orchestrator(fx.catalog(&[("First", decline.clone()), ("Second", decline)]))
            .run(&fx.options()),
    );

    assert!(report.artifacts.iter().all(|a| !a.patched && !a.saved));
    assert!(fx.backups(&fx.artifacts_dir()).is_empty());
    assert_eq!(fs::read(fx.artifact("A.dll")).unwrap(), b"aaa");
    assert_eq!(fx.entries("can:").len(), 4);
    assert!(fx.entries("patch:").is_empty());
}

#[test]
fn malformed_backup_name_fails_reload() {
    let fx = Fixture::new();
    fx.add_artifact("A.dll", b"aaa");
    fx.add_artifact("A.dll.last-tuesday.bak", b"old");
    fx.add_module("m.toml", &["First"]);
    fx.write_config(&["A"], "", "");

    let mut options = fx.options();
    options.prefer_backup = true;
    let failure = failed(
        fx.orchestrator(fx.catalog(&[("First", Script::default())]))
            .run(&options),
    );
    assert_eq!(failure.code, ExitCode::ArtifactUnreadable);
    assert!(fx.entries("can:").is_empty());
}

#[test]
fn corrupt_artifact_is_unreadable() {
    let fx = Fixture::new();
    let mut bytes = b"payload".to_vec();
    bytes.extend_from_slice(&999u32.to_le_bytes());
    bytes.extend_from_slice(binpatch_core::blob::TRAILER_MAGIC);
    fx.add_artifact("A.dll", &bytes);
    fx.add_module("m.toml", &["First"]);
    fx.write_config(&["A"], "", "");

    let failure = failed(
        fx.orchestrator(fx.catalog(&[("First", Script::default())]))
            .run(&fx.options()),
    );
    assert_eq!(failure.code, ExitCode::ArtifactUnreadable);
    let message = failure.to_string();
    assert!(message.contains("A.dll") && message.contains("blob:"), "{message}");
}

// ===========================================================================
// Fatal plugin failures
// ===========================================================================

#[test]
fn patch_error_stops_remaining_artifacts() {
    let fx = Fixture::new();
    fx.add_artifact("A.dll", b"aaa");
    fx.add_artifact("B.dll", b"bbb");
    fx.add_artifact("C.dll", b"ccc");
    fx.add_module("m.toml", &["First"]);
    fx.write_config(&["A", "B", "C"], "", "");

    let script = Script {
        fail_on: Some("B.dll".into()),
        ..Script::default()
    };
    let mut orchestrator = fx.orchestrator(fx.catalog(&[("First", script)]));
    let failure = failed(orchestrator.run(&fx.options()));

    assert_eq!(failure.code, ExitCode::NoPatchesApplied);
    assert_eq!(failure.phase, Phase::ArtifactsLoaded);
    assert_eq!(orchestrator.phase(), Phase::Failed);
    let message = failure.to_string();
    assert!(message.contains("First") && message.contains("B.dll"), "{message}");

    assert_eq!(fx.entries("patch:"), vec!["patch:First:A.dll", "patch:First:B.dll"]);
    assert!(fx.entries("can:First:C.dll").is_empty());
    assert!(fx.entries("post:").is_empty());
    assert!(fx.backups(&fx.artifacts_dir()).is_empty());
    assert_eq!(fs::read(fx.artifact("A.dll")).unwrap(), b"aaa");
}

#[test]
fn patch_panic_is_contained() {
    let fx = Fixture::new();
    fx.add_artifact("A.dll", b"aaa");
    fx.add_module("m.toml", &["First"]);
    fx.write_config(&["A"], "", "");

    let script = Script {
        panic_on: Some("A.dll".into()),
        ..Script::default()
    };
    let failure = failed(fx.orchestrator(fx.catalog(&[("First", script)])).run(&fx.options()));
    assert_eq!(failure.code, ExitCode::NoPatchesApplied);
    assert!(failure.to_string().contains("panicked"));
}

#[test]
fn pre_patch_error_runs_nothing_else() {
    let fx = Fixture::new();
    fx.add_artifact("A.dll", b"aaa");
    fx.add_module("10.toml", &["First"]);
    fx.add_module("20.toml", &["Second"]);
    fx.write_config(&["A"], "", "");

    let scripts = [
        (
            "First",
            Script {
                fail_pre: true,
                ..Script::default()
            },
        ),
        ("Second", Script::default()),
    ];
    let failure = failed(fx.orchestrator(fx.catalog(&scripts)).run(&fx.options()));
    assert_eq!(failure.code, ExitCode::NoPatchesApplied);
    assert_eq!(failure.phase, Phase::PatchersLoaded);
    assert_eq!(*fx.log.borrow(), vec!["pre:First"]);
}

#[test]
fn post_patch_error_after_save() {
    let fx = Fixture::new();
    fx.add_artifact("A.dll", b"aaa");
    fx.add_module("m.toml", &["First"]);
    fx.write_config(&["A"], "", "Executable=/bin/game\n");

    let script = Script {
        fail_post: true,
        ..Script::default()
    };
    let failure = failed(fx.orchestrator(fx.catalog(&[("First", script)])).run(&fx.options()));
    assert_eq!(failure.code, ExitCode::NoPatchesApplied);
    assert_eq!(failure.phase, Phase::Saved);
    assert!(marker::has_marker(decode(&fx.artifact("A.dll")).as_ref()));
    assert!(fx.launches.borrow().is_empty());
}

#[test]
fn unknown_export_is_internal_exception() {
    let fx = Fixture::new();
    fx.add_artifact("A.dll", b"aaa");
    fx.add_module("m.toml", &["Missing"]);
    fx.write_config(&["A"], "", "");

    let failure = failed(fx.orchestrator(PatchCatalog::new()).run(&fx.options()));
    assert_eq!(failure.code, ExitCode::InternalException);
    assert_eq!(failure.phase, Phase::ConfigLoaded);
}

// ===========================================================================
// Missing inputs
// ===========================================================================

#[test]
fn missing_patches_directory() {
    let fx = Fixture::new();
    fx.write_config(&[], "", "");
    fs::remove_dir(fx.patches_dir()).unwrap();

    let failure = failed(fx.orchestrator(PatchCatalog::new()).run(&fx.options()));
    assert_eq!(failure.code, ExitCode::DirectoryNotFound);
    assert_eq!(failure.phase, Phase::Init);
}

#[test]
fn missing_artifacts_directory() {
    let fx = Fixture::new();
    fx.write_config(&[], "", "");
    fs::remove_dir(fx.artifacts_dir()).unwrap();

    let failure = failed(fx.orchestrator(PatchCatalog::new()).run(&fx.options()));
    assert_eq!(failure.code, ExitCode::DirectoryNotFound);
}

#[test]
fn missing_artifact_fails_before_dispatch() {
    let fx = Fixture::new();
    fx.add_artifact("A.dll", b"aaa");
    fx.add_module("m.toml", &["First"]);
    fx.write_config(&["A", "Gone"], "", "");

    let failure = failed(
        fx.orchestrator(fx.catalog(&[("First", Script::default())]))
            .run(&fx.options()),
    );
    assert_eq!(failure.code, ExitCode::FileNotFound);
    assert!(failure.to_string().contains("Gone.dll"));
    assert!(fx.entries("can:").is_empty());
}

// ===========================================================================
// Empty patch set
// ===========================================================================

#[test]
fn empty_patch_set_proceeds_by_default() {
    let fx = Fixture::new();
    fx.add_artifact("A.dll", b"aaa");
    fx.write_config(&["A"], "", "");

    let report = completed(fx.orchestrator(PatchCatalog::new()).run(&fx.options()));
    assert!(report.patches.is_empty());
    assert!(!report.artifacts[0].saved);
}

#[test]
fn empty_patch_set_can_fail() {
    let fx = Fixture::new();
    fx.add_artifact("A.dll", b"aaa");
    fx.write_config(&["A"], "EmptyPatchSet=fail", "");

    let failure = failed(fx.orchestrator(PatchCatalog::new()).run(&fx.options()));
    assert_eq!(failure.code, ExitCode::NoPatchesFound);
}

// ===========================================================================
// Config bootstrap
// ===========================================================================

#[test]
fn missing_config_is_created_and_run_halts() {
    let fx = Fixture::new();
    let mut orchestrator = fx.orchestrator(PatchCatalog::new());
    let outcome = orchestrator.run(&RunOptions::new(fx.root.join("fresh"))).unwrap();

    match outcome {
        RunOutcome::ConfigCreated(path) => assert_eq!(path, fx.root.join("fresh.ini")),
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(orchestrator.phase(), Phase::Done);
    let text = fs::read_to_string(fx.root.join("fresh.ini")).unwrap();
    assert!(text.contains("[Main]") && text.contains("PatchesDir=Patches"));
}

#[test]
fn unparsable_config_is_kept_and_replaced() {
    let fx = Fixture::new();
    fs::write(fx.config_path(), "this is not a config\n").unwrap();

    let outcome = fx
        .orchestrator(PatchCatalog::new())
        .run(&fx.options())
        .unwrap();
    assert!(matches!(outcome, RunOutcome::ConfigCreated(_)));

    let kept = fx.backups(&fx.root);
    assert_eq!(kept.len(), 1);
    assert!(kept[0].starts_with("game.ini."));
    assert!(fs::read_to_string(fx.config_path()).unwrap().contains("[Artifacts]"));
}

#[test]
fn non_utf8_config_is_kept_and_replaced() {
    let fx = Fixture::new();
    fs::write(fx.config_path(), b"[Main]\nPatchesDir=\xff\xfe\n").unwrap();

    let outcome = fx
        .orchestrator(PatchCatalog::new())
        .run(&fx.options())
        .unwrap();
    assert!(matches!(outcome, RunOutcome::ConfigCreated(_)));

    let kept = fx.backups(&fx.root);
    assert_eq!(kept.len(), 1);
    assert_eq!(
        fs::read(fx.root.join(&kept[0])).unwrap(),
        b"[Main]\nPatchesDir=\xff\xfe\n"
    );
    assert!(fs::read_to_string(fx.config_path()).unwrap().contains("[Main]"));
}

#[test]
fn force_recreates_config_and_continues() {
    let fx = Fixture::new();
    fx.write_config(&[], "", "");

    let mut options = fx.options();
    options.force_create = true;
    let failure = failed(fx.orchestrator(PatchCatalog::new()).run(&options));

    // Defaults point at ./Patches, which the run then looks for.
    assert_eq!(failure.code, ExitCode::DirectoryNotFound);
    let text = fs::read_to_string(fx.config_path()).unwrap();
    assert!(text.contains("PatchesDir=Patches"));
}

#[test]
fn external_lookup_feeds_directories() {
    let fx = Fixture::new();
    fx.add_artifact("A.dll", b"aaa");
    fx.add_module("m.toml", &["First"]);
    let text = format!(
        "[Main]\nPatchesDir={}\nArtifactsDir=$(Game/Install/Dir)\n[Artifacts]\nA=A.dll\n",
        fx.patches_dir().display()
    );
    fs::write(fx.config_path(), text).unwrap();

    let artifacts = fx.artifacts_dir().display().to_string();
    let report = completed(
        fx.orchestrator(fx.catalog(&[("First", Script::default())]))
            .with_source(move || {
                Box::new(MapSource::new().with("Game/Install", "Dir", &artifacts))
                    as Box<dyn ExternalSource>
            })
            .run(&fx.options()),
    );
    assert_eq!(report.artifacts[0].location, fx.artifact("A.dll"));
}

// ===========================================================================
// Launch
// ===========================================================================

#[test]
fn launch_after_success() {
    let fx = Fixture::new();
    fx.add_artifact("A.dll", b"aaa");
    fx.write_config(
        &["A"],
        "",
        "Executable=/opt/game/bin/game\nArguments=-windowed \"save slot\"\n",
    );

    let report = completed(fx.orchestrator(PatchCatalog::new()).run(&fx.options()));
    assert_eq!(report.launched, Some(4242));

    let calls = fx.launches.borrow();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].executable, PathBuf::from("/opt/game/bin/game"));
    assert_eq!(
        calls[0].effective_working_dir(),
        Some(PathBuf::from("/opt/game/bin"))
    );
    assert_eq!(
        binpatch::split_arguments(&calls[0].arguments),
        vec!["-windowed", "save slot"]
    );
}

#[test]
fn launch_failure_keeps_success() {
    let fx = Fixture::new();
    fx.add_artifact("A.dll", b"aaa");
    fx.write_config(&["A"], "", "Executable=/nowhere/game\n");

    let launcher = RecordingLauncher {
        calls: fx.launches.clone(),
        fail: true,
    };
    let report = completed(
        PatchOrchestrator::new(PatchCatalog::new())
            .with_launcher(launcher)
            .run(&fx.options()),
    );
    assert_eq!(report.launched, None);
    assert_eq!(fx.launches.borrow().len(), 1);
}

#[test]
fn no_launch_without_executable() {
    let fx = Fixture::new();
    fx.add_artifact("A.dll", b"aaa");
    fx.write_config(&["A"], "", "Executable=\n");

    let report = completed(fx.orchestrator(PatchCatalog::new()).run(&fx.options()));
    assert_eq!(report.launched, None);
    assert!(fx.launches.borrow().is_empty());
}
