//! End-to-end runs of the build pipeline against a scratch project, with
//! every external command answered in memory.

use std::cell::RefCell;
use std::fs;
use std::path::Path;
use std::rc::Rc;

use stagehand::build::{self, Action, BuildOptions};
use stagehand::confirm::ConfirmMode;
use stagehand::context::ExecContext;
use stagehand::defaults::Defaults;
use stagehand::process::{CapturedOutput, Invocation, Runner};
use stagehand::prompt::Prompter;
use stagehand::{Error, ErrorCode, ItemStatus, Result};

type Calls = Rc<RefCell<Vec<Invocation>>>;

/// Records invocations. `git clone` creates `<dest>/.git` and a
/// `composer.json`; `SHOW TABLES` reports `existing_tables`. Invocations
/// matching `fail` exit with status 1.
struct FakeTools {
    calls: Calls,
    existing_tables: Vec<String>,
    fail: fn(&Invocation) -> bool,
}

impl Runner for FakeTools {
    fn run(&self, invocation: &Invocation) -> Result<CapturedOutput> {
        self.calls.borrow_mut().push(invocation.clone());

        if (self.fail)(invocation) {
            return Err(Error::process_failed(invocation.display(), 1, "", "exit status 1"));
        }

        if invocation.program == "git" && invocation.args.first().map(String::as_str) == Some("clone") {
            if let Some(dest) = invocation.args.last() {
                fs::create_dir_all(Path::new(dest).join(".git")).unwrap();
                fs::write(Path::new(dest).join("composer.json"), "{}").unwrap();
            }
        }

        let sql = invocation.args.last().cloned().unwrap_or_default();
        if sql.starts_with("SHOW TABLES LIKE") {
            return Ok(CapturedOutput::new(self.existing_tables.join("\n"), ""));
        }
        Ok(CapturedOutput::default())
    }
}

/// Replies from a fixed list and remembers every question asked.
struct Replies {
    replies: RefCell<Vec<String>>,
    asked: Rc<RefCell<Vec<String>>>,
}

impl Prompter for Replies {
    fn ask(&self, message: &str) -> Result<String> {
        self.asked.borrow_mut().push(message.to_string());
        let mut replies = self.replies.borrow_mut();
        if replies.is_empty() {
            panic!("unexpected prompt: {}", message);
        }
        Ok(replies.remove(0))
    }
}

struct Harness {
    dir: tempfile::TempDir,
    calls: Calls,
    asked: Rc<RefCell<Vec<String>>>,
}

impl Harness {
    fn new(manifest: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let manifest_dir = dir.path().join(".stagehand");
        fs::create_dir_all(&manifest_dir).unwrap();
        fs::write(manifest_dir.join("build.json"), manifest).unwrap();
        fs::write(
            manifest_dir.join("config.default.json"),
            r#"{"database": {"host": "localhost", "port": 3306, "user": "site", "password": "pw", "db": "site_db"}}"#,
        )
        .unwrap();
        Self {
            dir,
            calls: Rc::new(RefCell::new(Vec::new())),
            asked: Rc::new(RefCell::new(Vec::new())),
        }
    }

    fn root(&self) -> &Path {
        self.dir.path()
    }

    fn context(&self, mode: ConfirmMode, existing_tables: &[&str], replies: &[&str]) -> ExecContext {
        self.context_failing(mode, existing_tables, replies, |_| false)
    }

    fn context_failing(
        &self,
        mode: ConfirmMode,
        existing_tables: &[&str],
        replies: &[&str],
        fail: fn(&Invocation) -> bool,
    ) -> ExecContext {
        ExecContext::new(self.root(), mode)
            .with_defaults(Defaults::default())
            .with_runner(Box::new(FakeTools {
                calls: Rc::clone(&self.calls),
                existing_tables: existing_tables.iter().map(|t| t.to_string()).collect(),
                fail,
            }))
            .with_prompter(Box::new(Replies {
                replies: RefCell::new(replies.iter().map(|r| r.to_string()).collect()),
                asked: Rc::clone(&self.asked),
            }))
            .with_superuser(false)
    }

    fn rendered(&self) -> Vec<String> {
        self.calls.borrow().iter().map(Invocation::display).collect()
    }
}

const AUTHOR: &str = r#""author": {"username": "admin", "email": "admin@example.com"}"#;

#[test]
fn failed_library_does_not_stop_the_others() {
    let harness = Harness::new(&format!(
        r#"{{
            "libraries": [
                {{"repository": {{"url": "https://example.com/org/first.git"}}}},
                {{"repository": {{"url": "https://example.com/org/second.git"}}}},
                {{"repository": {{"url": "https://example.com/org/third.git"}}}}
            ],
            {}
        }}"#,
        AUTHOR
    ));
    fs::create_dir_all(harness.root().join("lib/second")).unwrap();
    fs::write(harness.root().join("lib/second/README"), "hand-made").unwrap();

    let ctx = harness.context(ConfirmMode::AssumeYes, &[], &[]);
    let report = build::run(&ctx, Action::Build, BuildOptions::default()).unwrap();

    let libraries = report.stage("libraries").unwrap();
    assert_eq!(libraries.items.len(), 3);
    assert_eq!(libraries.item("first").unwrap().status, ItemStatus::Done);
    assert_eq!(libraries.item("second").unwrap().status, ItemStatus::Failed);
    assert_eq!(libraries.item("third").unwrap().status, ItemStatus::Done);
    assert_eq!(report.failures, 1);

    assert!(harness.root().join("lib/first/.git").is_dir());
    assert!(harness.root().join("lib/third/.git").is_dir());
    assert!(!harness.root().join("lib/second/.git").exists());
    assert_eq!(fs::read_to_string(harness.root().join("lib/second/README")).unwrap(), "hand-made");
}

#[test]
fn declining_drop_tables_stops_before_any_drop() {
    let harness = Harness::new(&format!("{{{}}}", AUTHOR));
    let ctx = harness.context(ConfirmMode::AssumeNo, &["tbl_authors"], &[]);

    let options = BuildOptions {
        database_drop_tables: true,
        ..BuildOptions::default()
    };
    let err = build::run(&ctx, Action::Build, options).unwrap_err();
    assert_eq!(err.code, ErrorCode::UserDeclined);
    assert!(!harness.rendered().iter().any(|c| c.contains("--add-drop-table")));
    assert!(!harness.root().join("var/manifest/config.json").exists());
}

#[test]
fn fresh_database_imports_without_asking() {
    let harness = Harness::new(&format!("{{{}}}", AUTHOR));
    fs::write(harness.root().join(".stagehand/structure.sql"), "CREATE TABLE tbl_authors (id INT);").unwrap();

    let ctx = harness.context(ConfirmMode::Interactive, &[], &[]);
    let report = build::run(&ctx, Action::Build, BuildOptions::default()).unwrap();

    assert!(harness.asked.borrow().is_empty());
    assert_eq!(report.stage("structure").unwrap().items[0].status, ItemStatus::Done);
    let imported = harness
        .calls
        .borrow()
        .iter()
        .any(|c| c.stdin_file.as_deref() == Some(harness.root().join(".stagehand/structure.sql").as_path()));
    assert!(imported);
}

#[test]
fn existing_tables_can_be_skipped_interactively() {
    let harness = Harness::new(&format!("{{{}}}", AUTHOR));
    fs::write(harness.root().join(".stagehand/structure.sql"), "CREATE TABLE tbl_authors (id INT);").unwrap();

    let ctx = harness.context(ConfirmMode::Interactive, &["tbl_authors"], &["maybe", "s"]);
    let report = build::run(&ctx, Action::Build, BuildOptions::default()).unwrap();

    assert_eq!(harness.asked.borrow().len(), 2);
    assert!(harness.asked.borrow()[0].ends_with("(y=yes, n=no, s=skip)"));
    assert_eq!(report.stage("structure").unwrap().items[0].status, ItemStatus::Skipped);
    let structure = harness.root().join(".stagehand/structure.sql");
    assert!(!harness
        .calls
        .borrow()
        .iter()
        .any(|c| c.stdin_file.as_deref() == Some(structure.as_path())));
}

#[test]
fn library_is_cloned_on_its_branch_then_composed() {
    let harness = Harness::new(&format!(
        r#"{{
            "libraries": [{{"repository": {{"url": "https://example.com/org/platform.git", "branch": "main"}}}}],
            {}
        }}"#,
        AUTHOR
    ));
    let ctx = harness.context(ConfirmMode::AssumeYes, &[], &[]);
    let report = build::run(&ctx, Action::Build, BuildOptions::default()).unwrap();

    assert_eq!(report.stage("libraries").unwrap().item("platform").unwrap().status, ItemStatus::Done);

    let target = harness.root().join("lib/platform");
    let calls = harness.calls.borrow();
    let clone = calls
        .iter()
        .position(|c| c.program == "git" && c.args.first().map(String::as_str) == Some("clone"))
        .unwrap();
    assert!(calls[clone].args.windows(2).any(|w| w[0] == "-b" && w[1] == "main"));
    assert_eq!(calls[clone].args.last().map(String::as_str), target.to_str());

    let working_dir = format!("--working-dir={}", target.display());
    let composer = calls
        .iter()
        .position(|c| c.program == "composer" && c.args.contains(&working_dir))
        .unwrap();
    assert!(clone < composer);
}

#[test]
fn rerun_resets_existing_checkouts_instead_of_cloning() {
    let harness = Harness::new(&format!(
        r#"{{
            "libraries": [{{"repository": {{"url": "https://example.com/org/platform.git"}}}}],
            {}
        }}"#,
        AUTHOR
    ));
    build::run(&harness.context(ConfirmMode::AssumeYes, &[], &[]), Action::Build, BuildOptions::default()).unwrap();
    harness.calls.borrow_mut().clear();

    let report =
        build::run(&harness.context(ConfirmMode::AssumeYes, &[], &[]), Action::Build, BuildOptions::default()).unwrap();
    assert_eq!(report.stage("libraries").unwrap().item("platform").unwrap().status, ItemStatus::Exists);

    let rendered = harness.rendered();
    assert!(!rendered.iter().any(|c| c.starts_with("git clone")));
    assert!(rendered.iter().any(|c| c.contains("reset --hard")));
}

fn assert_later_stages_ran(harness: &Harness, report: &stagehand::BuildReport) {
    assert_eq!(report.stage("seeders").unwrap().items[0].status, ItemStatus::Done);
    assert!(harness.rendered().iter().any(|c| c.ends_with("stagehand seed")));
    assert!(harness.root().join("bin/extension").is_file());
    assert!(harness.root().join("var/manifest/config.json").is_file());
    assert!(report.credential.is_some());
}

#[test]
fn symlink_into_missing_directory_is_recorded_and_the_build_goes_on() {
    let harness = Harness::new(&format!(
        r#"{{
            "symbolic-links": [{{"src": "../lib/platform", "dest": "missing"}}],
            {}
        }}"#,
        AUTHOR
    ));
    let ctx = harness.context(ConfirmMode::AssumeYes, &[], &[]);
    let report = build::run(&ctx, Action::Build, BuildOptions::default()).unwrap();

    let links = report.stage("symbolic-links").unwrap();
    assert_eq!(links.items.len(), 1);
    assert_eq!(links.items[0].status, ItemStatus::Failed);
    assert!(links.items[0].detail.as_deref().unwrap().contains("does not exist"));
    assert_eq!(report.failures, 1);
    assert!(!harness.root().join("missing").exists());
    assert_later_stages_ran(&harness, &report);
}

#[test]
fn failing_postbuild_script_is_recorded_not_fatal() {
    let harness = Harness::new(&format!("{{{}}}", AUTHOR));
    fs::write(harness.root().join(".stagehand/postbuild.sh"), "exit 1\n").unwrap();

    let ctx = harness.context_failing(ConfirmMode::AssumeYes, &[], &[], |inv| inv.program == "sh");
    let report = build::run(&ctx, Action::Build, BuildOptions::default()).unwrap();

    let postbuild = report.stage("postbuild").unwrap();
    assert_eq!(postbuild.items[0].status, ItemStatus::Failed);
    assert_eq!(postbuild.items[0].detail.as_deref(), Some("exit status 1"));
    assert_eq!(report.failures, 1);
    assert!(harness.root().join("bin/extension").is_file());
    assert!(!report.helper_scripts.is_empty());
}

#[test]
fn one_extension_failing_to_enable_does_not_stop_the_rest() {
    let harness = Harness::new(&format!(
        r#"{{
            "extensions": [
                {{"repository": {{"url": "https://example.com/org/broken.git"}}}},
                {{"repository": {{"url": "https://example.com/org/console.git"}}}}
            ],
            {}
        }}"#,
        AUTHOR
    ));
    let ctx = harness.context_failing(ConfirmMode::AssumeYes, &[], &[], |inv| {
        inv.args.windows(3).any(|w| w[0] == "extension" && w[1] == "install" && w[2] == "broken")
    });
    let report = build::run(&ctx, Action::Build, BuildOptions::default()).unwrap();

    let enabled = report.stage("enable-extensions").unwrap();
    assert_eq!(enabled.item("broken").unwrap().status, ItemStatus::Failed);
    assert_eq!(enabled.item("console").unwrap().status, ItemStatus::Done);
    assert_eq!(report.failures, 1);
    assert!(harness.rendered().iter().any(|c| c.contains("extension install console")));
    assert_later_stages_ran(&harness, &report);
}
