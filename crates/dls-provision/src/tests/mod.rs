//! Unit and behavioural tests for the provisioning pipeline.


use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use dls_targets::{PlatformTarget, lookup};
use mockall::{Sequence, mock};
use rstest::{fixture, rstest};
use tempfile::TempDir;

use crate::{
    CommandError, MIN_ARTIFACT_BYTES, ProvisionError, ProvisionOptions, Toolchain, provision,
    select_targets,
};

mock! {
    pub BuildToolchain {}
    impl Toolchain for BuildToolchain {
        fn ensure_available(&self) -> Result<(), CommandError>;
        fn sync_sources(&self, repo_root: &Utf8Path) -> Result<(), CommandError>;
        fn compile(
            &self,
            source_dir: &Utf8Path,
            target: PlatformTarget,
            output: &Utf8Path,
        ) -> Result<(), CommandError>;
    }
}

/// Repository layout with a source tree and a pre-populated output directory.
pub(super) struct Workspace {
    _dir: TempDir,
    pub(super) root: Utf8PathBuf,
}

impl Workspace {
    pub(super) fn new() -> Self {
        let dir = TempDir::new().expect("temp dir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 temp path");
        fs::create_dir(root.join("dlitescript")).expect("create source tree");
        Self { _dir: dir, root }
    }

    pub(super) fn options(&self) -> ProvisionOptions {
        ProvisionOptions::new(self.root.clone())
    }

    pub(super) fn output_dir(&self) -> Utf8PathBuf {
        self.root.join("resources")
    }

    pub(super) fn seed_output(&self, name: &str) {
        fs::create_dir_all(self.output_dir()).expect("create output dir");
        fs::write(self.output_dir().join(name), b"stale").expect("write fixture");
    }
}

#[fixture]
fn workspace() -> Workspace {
    Workspace::new()
}

pub(super) fn write_artifact(output: &Utf8Path, size: usize) -> Result<(), CommandError> {
    fs::write(output, vec![0_u8; size]).map_err(|source| CommandError::Launch {
        program: String::from("fake-go"),
        source,
    })
}

fn healthy_preconditions(toolchain: &mut MockBuildToolchain) {
    toolchain.expect_sync_sources().returning(|_| Ok(()));
    toolchain.expect_ensure_available().returning(|| Ok(()));
}

#[rstest]
fn builds_every_target_in_table_order(workspace: Workspace) {
    let mut toolchain = MockBuildToolchain::new();
    healthy_preconditions(&mut toolchain);
    let mut sequence = Sequence::new();
    for target in dls_targets::targets() {
        let key = target.platform_key();
        toolchain
            .expect_compile()
            .withf(move |_, candidate, _| candidate.platform_key() == key)
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|_, _, output| write_artifact(output, 4096));
    }

    let report = provision(&workspace.options(), &toolchain).expect("provisioning succeeds");

    assert_eq!(report.outcomes.len(), 8);
    assert!(report.outcomes.iter().all(|outcome| outcome.succeeded));
    assert!(report.outcomes.iter().all(|outcome| outcome.size_bytes == 4096));
}

#[cfg(unix)]
#[rstest]
fn marks_only_non_windows_artefacts_executable(workspace: Workspace) {
    use std::os::unix::fs::PermissionsExt;

    let mut toolchain = MockBuildToolchain::new();
    healthy_preconditions(&mut toolchain);
    toolchain
        .expect_compile()
        .returning(|_, _, output| write_artifact(output, 2048));

    provision(&workspace.options(), &toolchain).expect("provisioning succeeds");

    let mode = |name: &str| {
        fs::metadata(workspace.output_dir().join(name))
            .expect("artefact exists")
            .permissions()
            .mode()
            & 0o777
    };
    assert_eq!(mode("dlitescript-linux-x64"), 0o755);
    assert_eq!(mode("dlitescript-darwin-arm64"), 0o755);
    assert_ne!(mode("dlitescript-win32-x64"), 0o755);
}

#[rstest]
fn missing_source_tree_fails_before_any_work(workspace: Workspace) {
    fs::remove_dir(workspace.root.join("dlitescript")).expect("remove source tree");
    workspace.seed_output("dlitescript-linux-x64");
    let toolchain = MockBuildToolchain::new();

    let error = provision(&workspace.options(), &toolchain).expect_err("must fail");

    assert!(matches!(error, ProvisionError::MissingSourceTree { .. }));
    assert!(workspace.output_dir().join("dlitescript-linux-x64").exists());
}

#[rstest]
fn missing_toolchain_fails_before_cleanup(workspace: Workspace) {
    workspace.seed_output("dlitescript-linux-x64");
    let mut toolchain = MockBuildToolchain::new();
    toolchain.expect_sync_sources().returning(|_| Ok(()));
    toolchain
        .expect_ensure_available()
        .returning(|| Err(CommandError::failed("go", "not installed")));
    toolchain.expect_compile().never();

    let error = provision(&workspace.options(), &toolchain).expect_err("must fail");

    assert!(matches!(error, ProvisionError::ToolchainUnavailable { .. }));
    assert!(workspace.output_dir().join("dlitescript-linux-x64").exists());
}

#[rstest]
fn skipped_sync_never_invokes_git(workspace: Workspace) {
    let mut toolchain = MockBuildToolchain::new();
    toolchain.expect_sync_sources().never();
    toolchain.expect_ensure_available().returning(|| Ok(()));
    toolchain
        .expect_compile()
        .returning(|_, _, output| write_artifact(output, 2048));
    let options = ProvisionOptions {
        sync_sources: false,
        ..workspace.options()
    };

    provision(&options, &toolchain).expect("provisioning succeeds");
}

#[rstest]
fn sync_failure_is_reported(workspace: Workspace) {
    let mut toolchain = MockBuildToolchain::new();
    toolchain
        .expect_sync_sources()
        .returning(|_| Err(CommandError::failed("git", "not a repository")));

    let error = provision(&workspace.options(), &toolchain).expect_err("must fail");

    assert!(matches!(error, ProvisionError::SourceSync { .. }));
    assert!(error.to_string().contains("not a repository"));
}

#[rstest]
fn artefact_at_threshold_is_accepted(workspace: Workspace) {
    let mut toolchain = MockBuildToolchain::new();
    healthy_preconditions(&mut toolchain);
    toolchain
        .expect_compile()
        .returning(|_, _, output| write_artifact(output, 1000));
    let options = ProvisionOptions {
        targets: vec![lookup("linux-x64").expect("linux-x64")],
        ..workspace.options()
    };

    let report = provision(&options, &toolchain).expect("threshold is inclusive");

    assert_eq!(report.outcomes[0].size_bytes, MIN_ARTIFACT_BYTES);
}

#[rstest]
fn undersized_artefact_is_deleted_and_reported(workspace: Workspace) {
    let mut toolchain = MockBuildToolchain::new();
    healthy_preconditions(&mut toolchain);
    toolchain
        .expect_compile()
        .times(1)
        .returning(|_, _, output| write_artifact(output, 999));

    let error = provision(&workspace.options(), &toolchain).expect_err("must fail");

    assert_eq!(error.platform_key(), Some("darwin-x64"));
    assert!(matches!(
        error,
        ProvisionError::UndersizedArtifact {
            size: 999,
            minimum: 1000,
            ..
        }
    ));
    assert!(!workspace.output_dir().join("dlitescript-darwin-x64").exists());
}

#[rstest]
fn compiler_that_writes_nothing_fails_inspection(workspace: Workspace) {
    let mut toolchain = MockBuildToolchain::new();
    healthy_preconditions(&mut toolchain);
    toolchain.expect_compile().times(1).returning(|_, _, _| Ok(()));

    let error = provision(&workspace.options(), &toolchain).expect_err("must fail");

    assert!(matches!(error, ProvisionError::Inspect { .. }));
}

#[rstest]
fn compile_error_message_names_the_artefact(workspace: Workspace) {
    let mut toolchain = MockBuildToolchain::new();
    healthy_preconditions(&mut toolchain);
    toolchain
        .expect_compile()
        .returning(|_, _, _| Err(CommandError::failed("go", "undefined: main")));

    let error = provision(&workspace.options(), &toolchain).expect_err("must fail");

    let message = error.to_string();
    assert!(message.contains("dlitescript-darwin-x64"), "{message}");
    assert!(message.contains("undefined: main"), "{message}");
}

#[rstest]
fn relative_paths_are_resolved_against_the_working_directory() {
    let cwd = Utf8PathBuf::from_path_buf(std::env::current_dir().expect("working directory"))
        .expect("utf-8 working directory");
    let options = ProvisionOptions {
        output_dir: Utf8PathBuf::from("out/bin"),
        ..ProvisionOptions::new("checkout")
    };

    let resolved = options.to_absolute().expect("paths resolve");

    assert_eq!(resolved.repo_root, cwd.join("checkout"));
    assert_eq!(resolved.source_dir, cwd.join("checkout").join("dlitescript"));
    assert_eq!(resolved.output_dir, cwd.join("out/bin"));
    assert_eq!(resolved.targets, options.targets);
}

#[rstest]
fn absolute_paths_are_kept(workspace: Workspace) {
    let options = workspace.options();

    assert_eq!(options.to_absolute().expect("paths resolve"), options);
}

#[rstest]
fn target_filter_keeps_table_order_and_reports_unknown_keys() {
    let keys = vec![
        String::from("win32-arm64"),
        String::from("plan9-x64"),
        String::from("linux-arm"),
    ];

    let (selected, skipped) = select_targets(&keys);

    let selected: Vec<_> = selected.iter().map(PlatformTarget::platform_key).collect();
    assert_eq!(selected, vec!["linux-arm", "win32-arm64"]);
    assert_eq!(skipped, vec![String::from("plan9-x64")]);
}

#[rstest]
fn empty_filter_selects_the_full_table() {
    let (selected, skipped) = select_targets(&[]);

    assert_eq!(selected.len(), dls_targets::targets().len());
    assert!(skipped.is_empty());
}
