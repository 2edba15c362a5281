//! The build pipeline behind `stagehand build` and `stagehand update`.
//!
//! Stages run strictly in order. Configuration, database, credential and
//! platform-console failures abort the run. Failures of a single directory,
//! dependency, symlink, extension or the post-build hook are recorded in the
//! report and the pipeline moves on. Every stage detects its own completion,
//! so re-running the whole pipeline is the recovery path after a partial run.

use std::path::PathBuf;

use serde::Serialize;

use crate::assets;
use crate::composer;
use crate::config::{self, EffectiveConfiguration};
use crate::context::ExecContext;
use crate::credential::{self, AdministrativeCredential};
use crate::db::{DatabaseCredentials, DatabaseStage, StepOutcome};
use crate::error::{Error, Result};
use crate::hooks;
use crate::installer::{self, InstallFlags, SourceOutcome};
use crate::manifest::{self, Author, BuildManifest, DependencyDescriptor, DependencyKind, ResolvedDependency};
use crate::materialize::{self, Outcome};
use crate::output::{BuildReport, ItemStatus, StageReport};
use crate::platform::{self, Console, ExtensionAction};
use crate::process;
use crate::project;

/// Closed set of pipeline entry points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Build,
    /// Build that keeps the database and authors, and runs migrations.
    Update,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Build => "build",
            Action::Update => "update",
        }
    }

    /// Apply the action's preset on top of the flags given.
    pub fn options(&self, mut options: BuildOptions) -> BuildOptions {
        if *self == Action::Update {
            options.skip_create_author = true;
            options.skip_seeders = true;
            options.skip_import_sections = true;
            options.database_skip_import_structure = true;
            options.database_skip_import_data = true;
            options.run_migrations = true;
        }
        options
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildOptions {
    pub skip_composer: bool,
    pub skip_git_reset: bool,
    pub git_shallow: bool,
    pub skip_create_author: bool,
    pub skip_enable_extensions: bool,
    pub skip_seeders: bool,
    pub skip_postbuild: bool,
    pub skip_import_sections: bool,
    pub database_drop_tables: bool,
    pub database_create_backup: Option<PathBuf>,
    pub database_skip_import_structure: bool,
    pub database_skip_import_data: bool,
    pub run_migrations: bool,
}

impl BuildOptions {
    pub fn install_flags(&self) -> InstallFlags {
        InstallFlags {
            skip_dependency_manager: self.skip_composer,
            skip_git_reset: self.skip_git_reset,
            shallow: self.git_shallow,
        }
    }

    /// A freshly dropped database has no author and no enabled extensions.
    fn reconcile(&mut self, report: &mut BuildReport) {
        if !self.database_drop_tables {
            return;
        }
        if self.skip_create_author {
            report.warn("--database-drop-tables is set. Ignoring use of --skip-create-author.");
            self.skip_create_author = false;
        }
        if self.skip_enable_extensions {
            report.warn("--database-drop-tables is set. Ignoring use of --skip-enable-extensions.");
            self.skip_enable_extensions = false;
        }
    }
}

fn heading(message: &str) {
    crate::log_status!("build", "{}", message);
}

pub fn run(ctx: &ExecContext, action: Action, options: BuildOptions) -> Result<BuildReport> {
    let layout = ctx.layout();
    layout.require_initialized()?;

    let mut report = BuildReport::new(action.as_str());
    let mut options = action.options(options);
    options.reconcile(&mut report);

    preflight(ctx, &mut report)?;

    heading("Loading build config...");
    let manifest = BuildManifest::load(&layout)?;

    heading("Loading default config...");
    let base = EffectiveConfiguration::load(&layout.default_config())?;
    let mut effective = config::merge(&base, &manifest.config_overrides()?);
    config::resolve_missing(&mut effective, ctx)?;

    // A new author is generated from the manifest block, so it must exist up front.
    let new_author = if options.skip_create_author {
        None
    } else {
        let author = manifest
            .author
            .as_ref()
            .ok_or_else(|| Error::config_missing_value("author", "username"))?;
        Some(author)
    };

    if !options.skip_composer && composer::is_installable(layout.root()) && !layout.vendor_dir().is_dir() {
        crate::log_status!("build", "Looks like composer packages need to be installed");
        composer::update(ctx, layout.root())?;
    }

    heading("Establishing database connection...");
    let mut database = DatabaseStage::connect(ctx, DatabaseCredentials::from_config(&effective)?)?;

    if let Some(path) = &options.database_create_backup {
        heading("Creating database backup...");
        database.database().backup(path)?;
        report.push(StageReport::single("backup", ItemStatus::Done, Some(path.display().to_string())));
    }

    if options.database_drop_tables {
        heading("Dropping existing tables from database...");
        let outcome = database.drop_tables()?;
        report.push(StageReport::single("drop-tables", step_status(outcome), None));
    }

    let canonical = ctx.defaults().canonical_table.clone();
    let imports = [
        (
            "structure",
            "Importing database structure...",
            layout.structure_sql(),
            options.database_skip_import_structure,
            "--database-skip-import-structure",
        ),
        (
            "data",
            "Importing database data...",
            layout.data_sql(),
            options.database_skip_import_data,
            "--database-skip-import-data",
        ),
    ];
    for (stage, message, path, skip, flag) in imports {
        heading(message);
        if skip {
            report.push(StageReport::single(stage, ItemStatus::Skipped, Some(format!("{} is set", flag))));
            continue;
        }
        let outcome = if stage == "structure" {
            database.import_structure(&path, &canonical)?
        } else {
            database.import_data(&path, &canonical)?
        };
        let detail = (outcome == StepOutcome::NotPresent).then(|| format!("{} not found", path.display()));
        report.push(StageReport::single(stage, step_status(outcome), detail));
    }

    heading("Building directory paths...");
    report.push(realize_paths(&layout, &manifest.paths));

    heading("Installing companion extension...");
    report.push(install_companion(ctx, &options));

    let flags = options.install_flags();
    heading("Installing libraries...");
    let (libraries, _) = install_all(ctx, "libraries", &manifest.libraries, DependencyKind::Library, flags);
    report.push(libraries);

    heading("Installing extensions...");
    let (extensions, resolved_extensions) =
        install_all(ctx, "extensions", &manifest.extensions, DependencyKind::Extension, flags);
    report.push(extensions);

    heading("Generating admin author...");
    let credential = author(ctx, &database, new_author)?;

    heading("Writing config to disk...");
    config::persist(&effective, &layout)?;
    report.push(StageReport::single("config", ItemStatus::Done, Some(layout.final_config().display().to_string())));

    heading("Generating symbolic links...");
    report.push(link_all(ctx, &manifest));

    let console = Console::new(ctx, &credential.token);

    heading("Enabling extensions...");
    report.push(enable_extensions(&console, &resolved_extensions, &options));

    heading("Importing sections...");
    let sections = if options.skip_import_sections {
        StageReport::single("sections", ItemStatus::Skipped, Some("--skip-import-sections is set".to_string()))
    } else if layout.sections().is_file() {
        platform::import_sections(ctx)?;
        StageReport::single("sections", ItemStatus::Done, None)
    } else {
        StageReport::single("sections", ItemStatus::Skipped, Some(".stagehand/sections.json not found".to_string()))
    };
    report.push(sections);

    heading("Running seeders...");
    let seeders = if options.skip_seeders {
        StageReport::single("seeders", ItemStatus::Skipped, Some("--skip-seeders is set".to_string()))
    } else {
        console.seed()?;
        StageReport::single("seeders", ItemStatus::Done, None)
    };
    report.push(seeders);

    heading("Running migrations...");
    let migrations = if options.run_migrations {
        console.migrate()?;
        StageReport::single("migrations", ItemStatus::Done, None)
    } else {
        StageReport::single("migrations", ItemStatus::Skipped, Some("--run-migrations is not set".to_string()))
    };
    report.push(migrations);

    heading("Running post-build script...");
    let postbuild = if options.skip_postbuild {
        StageReport::single("postbuild", ItemStatus::Skipped, Some("--skip-postbuild is set".to_string()))
    } else {
        match hooks::run_postbuild(ctx, &credential.token) {
            Ok(Some(_)) => StageReport::single("postbuild", ItemStatus::Done, None),
            Ok(None) => StageReport::single(
                "postbuild",
                ItemStatus::Skipped,
                Some(".stagehand/postbuild.sh not found".to_string()),
            ),
            Err(e) => StageReport::single("postbuild", ItemStatus::Failed, Some(e.detail())),
        }
    };
    report.push(postbuild);

    match console.write_helper_scripts() {
        Ok(paths) => {
            report.helper_scripts = paths.iter().map(|p| p.to_string_lossy().to_string()).collect();
            crate::log_status!("build", "Helper commands created in bin/:");
            crate::log_status!("build", "extension: enable, disable, install, and uninstall extensions");
        }
        Err(e) => report.warn(format!("Unable to write helper scripts: {}", e.message)),
    }

    if let Err(e) = project::mark_built(&layout) {
        report.warn(format!("Unable to update project descriptor: {}", e.message));
    }

    crate::log_status!("build", "Build complete.");
    match &credential.password {
        Some(password) => crate::log_status!(
            "build",
            "Login to control panel with username {} and password {}",
            credential.username,
            password
        ),
        None => crate::log_status!("build", "Login credentials have not changed."),
    }
    report.credential = Some(credential);

    Ok(report)
}

/// Tool availability and the superuser check. Nothing on disk changes here.
fn preflight(ctx: &ExecContext, report: &mut BuildReport) -> Result<()> {
    let programs = &ctx.defaults().programs;
    process::require_program(ctx.runner(), &programs.git)?;
    process::require_program(ctx.runner(), &programs.composer)?;

    if ctx.is_superuser() {
        report.warn("Running as the superuser is not recommended.");
        ctx.confirm("Do you want to continue anyway?")?;
    }
    Ok(())
}

fn step_status(outcome: StepOutcome) -> ItemStatus {
    match outcome {
        StepOutcome::Done => ItemStatus::Done,
        StepOutcome::Skipped | StepOutcome::NotPresent => ItemStatus::Skipped,
    }
}

fn materialized(outcome: Outcome) -> ItemStatus {
    match outcome {
        Outcome::Created => ItemStatus::Done,
        Outcome::AlreadyPresent => ItemStatus::Exists,
    }
}

fn realize_paths(layout: &project::ProjectLayout, paths: &[String]) -> StageReport {
    let mut stage = StageReport::new("paths");
    for (i, path) in paths.iter().enumerate() {
        let result = manifest::relative_path(path, "paths")
            .and_then(|relative| materialize::realize_directory(&layout.root().join(relative)));
        match result {
            Ok(outcome) => stage.record(i + 1, paths.len(), path, materialized(outcome), None),
            Err(e) => stage.record(i + 1, paths.len(), path, ItemStatus::Failed, Some(e.detail())),
        }
    }
    stage
}

/// Copy the bundled companion extension into `lib/extensions` and run composer on it.
fn install_companion(ctx: &ExecContext, options: &BuildOptions) -> StageReport {
    let name = ctx.defaults().platform.companion_name.clone();
    let target = ctx.layout().extensions_dir().join(&name);

    let result = assets::write_bundle(assets::COMPANION_EXTENSION, &target).and_then(|_| {
        if !options.skip_composer || !target.join("vendor").is_dir() {
            composer::update(ctx, &target)?;
        }
        Ok(())
    });

    let mut stage = StageReport::new("companion");
    match result {
        Ok(()) => stage.record(1, 1, name, ItemStatus::Done, None),
        Err(e) => stage.record(1, 1, name, ItemStatus::Failed, Some(e.detail())),
    }
    stage
}

fn descriptor_label(descriptor: &DependencyDescriptor, index: usize) -> String {
    descriptor
        .repository
        .as_ref()
        .and_then(|r| manifest::dirname_from_repository_url(&r.url).ok())
        .or_else(|| descriptor.name.clone())
        .or_else(|| descriptor.repository.as_ref().map(|r| r.url.clone()))
        .unwrap_or_else(|| format!("#{}", index))
}

/// Install each descriptor, recording failures and carrying on.
fn install_all(
    ctx: &ExecContext,
    stage_name: &str,
    descriptors: &[DependencyDescriptor],
    kind: DependencyKind,
    flags: InstallFlags,
) -> (StageReport, Vec<ResolvedDependency>) {
    let mut stage = StageReport::new(stage_name);
    let mut resolved_all = Vec::new();
    let total = descriptors.len();

    for (i, descriptor) in descriptors.iter().enumerate() {
        let resolved = match manifest::resolve_dependency(
            descriptor,
            kind,
            &ctx.layout(),
            &ctx.defaults().default_branch,
        ) {
            Ok(resolved) => resolved,
            Err(e) => {
                stage.record(i + 1, total, descriptor_label(descriptor, i + 1), ItemStatus::Failed, Some(e.detail()));
                continue;
            }
        };

        match installer::install(ctx, &resolved, flags) {
            Ok(installed) => {
                let status = match installed.source {
                    SourceOutcome::Updated | SourceOutcome::Existing => ItemStatus::Exists,
                    SourceOutcome::Cloned | SourceOutcome::NotVersioned => ItemStatus::Done,
                };
                stage.record(i + 1, total, &resolved.name, status, None);
            }
            Err(e) => stage.record(i + 1, total, &resolved.name, ItemStatus::Failed, Some(e.detail())),
        }
        resolved_all.push(resolved);
    }

    (stage, resolved_all)
}

/// Generate `new_author`, or recover the primary author when there is none.
fn author(ctx: &ExecContext, database: &DatabaseStage, new_author: Option<&Author>) -> Result<AdministrativeCredential> {
    let table = &ctx.defaults().canonical_table;
    match new_author {
        Some(author) => credential::create(database.database(), table, author, ctx.defaults().password_length),
        None => {
            crate::log_status!("build", "Skipping! --skip-create-author is set.");
            credential::recover(database.database(), table)
        }
    }
}

fn link_all(ctx: &ExecContext, manifest: &BuildManifest) -> StageReport {
    let mut stage = StageReport::new("symbolic-links");
    let total = manifest.symbolic_links.len();
    let layout = ctx.layout();

    for (i, spec) in manifest.symbolic_links.iter().enumerate() {
        let dest = spec.dest.trim_matches('/');
        let result = manifest::resolve_symlink(spec, &layout)
            .and_then(|link| materialize::link(ctx, &link).map(|outcome| (link.name, outcome)));
        match result {
            Ok((name, outcome)) => {
                stage.record(i + 1, total, format!("{}/{} => {}", dest, name, spec.src), materialized(outcome), None)
            }
            Err(e) => stage.record(i + 1, total, format!("{} => {}", dest, spec.src), ItemStatus::Failed, Some(e.detail())),
        }
    }
    stage
}

fn enable_extensions(console: &Console, extensions: &[ResolvedDependency], options: &BuildOptions) -> StageReport {
    let mut stage = StageReport::new("enable-extensions");
    if options.skip_enable_extensions {
        crate::log_status!("build", "Skipping! --skip-enable-extensions is set.");
        return stage;
    }
    if extensions.is_empty() {
        crate::log_status!("build", "Skipping! Build has no extensions defined.");
        return stage;
    }

    let total = extensions.len();
    for (i, extension) in extensions.iter().enumerate() {
        let handle = extension.extension_handle();
        if !extension.install {
            stage.record(i + 1, total, handle, ItemStatus::Skipped, None);
            continue;
        }
        match console.extension(ExtensionAction::Install, handle) {
            Ok(()) => stage.record(i + 1, total, handle, ItemStatus::Done, None),
            Err(e) => stage.record(i + 1, total, handle, ItemStatus::Failed, Some(e.detail())),
        }
    }
    stage
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::rc::Rc;

    use super::*;
    use crate::confirm::ConfirmMode;
    use crate::context::testing::context;
    use crate::error::ErrorCode;
    use crate::process::testing::ScriptedRunner;
    use crate::process::{CapturedOutput, Invocation};
    use crate::project::ProjectLayout;
    use crate::prompt::testing::ScriptedPrompter;

    const DEFAULT_CONFIG: &str = r#"{
        "database": {"host": "127.0.0.1", "port": "3306", "user": "site", "password": "pw", "db": "site_db"}
    }"#;

    fn project(manifest: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let layout = ProjectLayout::new(dir.path());
        fs::create_dir_all(layout.manifest_dir()).unwrap();
        fs::write(layout.build_manifest(), manifest).unwrap();
        fs::write(layout.default_config(), DEFAULT_CONFIG).unwrap();
        dir
    }

    /// Simulates git clones and answers the primary-author query.
    fn runner() -> Rc<ScriptedRunner> {
        Rc::new(ScriptedRunner::with(|inv: &Invocation| {
            if inv.args.first().map(String::as_str) == Some("clone") {
                if let Some(dest) = inv.args.last() {
                    fs::create_dir_all(std::path::Path::new(dest).join(".git")).unwrap();
                }
            }
            if inv.args.last().map_or(false, |a| a.starts_with("SELECT `username`")) {
                return Ok(CapturedOutput::new("admin\tSSHA256|s|h", ""));
            }
            Ok(CapturedOutput::default())
        }))
    }

    #[test]
    fn update_preset() {
        let options = Action::Update.options(BuildOptions::default());
        assert!(options.skip_create_author);
        assert!(options.skip_seeders);
        assert!(options.skip_import_sections);
        assert!(options.database_skip_import_structure);
        assert!(options.database_skip_import_data);
        assert!(options.run_migrations);
        assert_eq!(Action::Build.options(BuildOptions::default()), BuildOptions::default());
    }

    #[test]
    fn drop_tables_overrides_author_and_extension_skips() {
        let mut options = BuildOptions {
            database_drop_tables: true,
            skip_create_author: true,
            skip_enable_extensions: true,
            ..BuildOptions::default()
        };
        let mut report = BuildReport::new("build");
        options.reconcile(&mut report);
        assert!(!options.skip_create_author);
        assert!(!options.skip_enable_extensions);
        assert_eq!(report.warnings.len(), 2);
    }

    #[test]
    fn refuses_uninitialized_project() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path(), ConfirmMode::AssumeYes, runner(), Rc::new(ScriptedPrompter::silent()));
        let err = run(&ctx, Action::Build, BuildOptions::default()).unwrap_err();
        assert_eq!(err.code, ErrorCode::ProjectNotInitialized);
    }

    #[test]
    fn full_build_runs_every_stage_in_order() {
        let dir = project(
            r#"{
                "paths": ["www", "var/manifest"],
                "libraries": [{"repository": {"url": "https://h/org/platform.git"}}],
                "extensions": [
                    {"repository": {"url": "https://h/org/console.git", "branch": "main"}},
                    {"repository": {"url": "https://h/org/draft.git"}, "install": false}
                ],
                "symbolic-links": [{"src": "../lib/platform", "dest": "www"}],
                "author": {"username": "admin", "email": "admin@example.com"}
            }"#,
        );
        let _lock = crate::context::CWD_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let runner = runner();
        let ctx = context(dir.path(), ConfirmMode::AssumeYes, Rc::clone(&runner), Rc::new(ScriptedPrompter::silent()));

        let report = run(&ctx, Action::Build, BuildOptions::default()).unwrap();
        assert_eq!(report.failures, 0);

        let stages: Vec<&str> = report.stages.iter().map(|s| s.stage.as_str()).collect();
        assert_eq!(
            stages,
            vec![
                "structure", "data", "paths", "companion", "libraries", "extensions", "config",
                "symbolic-links", "enable-extensions", "sections", "seeders", "migrations", "postbuild",
            ]
        );

        let enabled = report.stage("enable-extensions").unwrap();
        assert_eq!(enabled.item("console").unwrap().status, ItemStatus::Done);
        assert_eq!(enabled.item("draft").unwrap().status, ItemStatus::Skipped);

        let credential = report.credential.as_ref().unwrap();
        assert_eq!(credential.password.as_ref().map(String::len), Some(12));
        assert!(dir.path().join("www/platform").symlink_metadata().is_ok());
        assert!(dir.path().join("var/manifest/config.json").is_file());
        assert!(dir.path().join("bin/extension").is_file());
        assert!(dir.path().join("lib/extensions/stagehand/composer.json").is_file());

        let descriptor = project::ProjectDescriptor::load(&ProjectLayout::new(dir.path()));
        assert!(descriptor.map(|d| d.last_built.is_some()).unwrap_or(false));

        let rendered = runner.rendered();
        let seed = rendered.iter().position(|c| c.ends_with("stagehand seed")).unwrap();
        let install = rendered.iter().position(|c| c.contains("extension install console")).unwrap();
        assert!(install < seed);
        assert!(!rendered.iter().any(|c| c.ends_with("stagehand migrate")));
    }

    #[test]
    fn update_recovers_author_and_migrates() {
        let dir = project(r#"{"author": {"username": "admin", "email": "a@b.c"}}"#);
        let _lock = crate::context::CWD_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let runner = runner();
        let ctx = context(dir.path(), ConfirmMode::AssumeYes, Rc::clone(&runner), Rc::new(ScriptedPrompter::silent()));

        let report = run(&ctx, Action::Update, BuildOptions::default()).unwrap();
        let credential = report.credential.clone().unwrap();
        assert_eq!(credential.password, None);
        assert_eq!(credential.token, credential::auth_token("admin", "SSHA256|s|h"));

        let rendered = runner.rendered();
        assert!(rendered.iter().any(|c| c.ends_with("stagehand migrate")));
        assert!(!rendered.iter().any(|c| c.ends_with("stagehand seed")));
        assert!(runner.calls().iter().all(|c| c.stdin_file.is_none()));
        assert_eq!(report.stage("structure").unwrap().items[0].status, ItemStatus::Skipped);
    }

    #[test]
    fn missing_author_block_fails_before_side_effects() {
        let dir = project(
            r#"{
                "paths": ["www"],
                "libraries": [{"repository": {"url": "https://h/org/platform.git"}}]
            }"#,
        );
        fs::write(dir.path().join(".stagehand/structure.sql"), "CREATE TABLE tbl_authors (id INT);").unwrap();
        let runner = runner();
        let ctx = context(dir.path(), ConfirmMode::AssumeYes, Rc::clone(&runner), Rc::new(ScriptedPrompter::silent()));

        let err = run(&ctx, Action::Build, BuildOptions::default()).unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigMissingValue);
        assert_eq!(err.details["group"], "author");

        assert!(runner.rendered().iter().all(|c| c.ends_with("--version")));
        assert!(runner.calls().iter().all(|c| c.stdin_file.is_none()));
        assert!(!dir.path().join("www").exists());
        assert!(!dir.path().join("lib").exists());
    }

    #[test]
    fn update_does_not_need_an_author_block() {
        let dir = project("{}");
        let _lock = crate::context::CWD_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let ctx = context(dir.path(), ConfirmMode::AssumeYes, runner(), Rc::new(ScriptedPrompter::silent()));

        let report = run(&ctx, Action::Update, BuildOptions::default()).unwrap();
        assert_eq!(report.credential.unwrap().username, "admin");
    }

    #[test]
    fn superuser_goes_through_the_gate() {
        let dir = project("{}");
        let runner = runner();
        let ctx = context(dir.path(), ConfirmMode::AssumeNo, Rc::clone(&runner), Rc::new(ScriptedPrompter::silent()))
            .with_superuser(true);
        let err = run(&ctx, Action::Build, BuildOptions::default()).unwrap_err();
        assert_eq!(err.code, ErrorCode::UserDeclined);
        assert!(runner.rendered().iter().all(|c| c.ends_with("--version")));
    }

    #[test]
    fn missing_tool_stops_before_any_work() {
        let dir = project("{}");
        let runner = Rc::new(ScriptedRunner::with(|inv: &Invocation| {
            if inv.program == "composer" {
                Err(Error::process_launch_failed(inv.display(), "No such file or directory"))
            } else {
                Ok(CapturedOutput::default())
            }
        }));
        let ctx = context(dir.path(), ConfirmMode::AssumeYes, Rc::clone(&runner), Rc::new(ScriptedPrompter::silent()));
        let err = run(&ctx, Action::Build, BuildOptions::default()).unwrap_err();
        assert_eq!(err.code, ErrorCode::ToolUnavailable);
        assert_eq!(runner.calls().len(), 2);
    }

    #[test]
    fn missing_config_value_fails_before_side_effects() {
        let dir = project(r#"{"config": {"database": {"user": null}}}"#);
        fs::write(dir.path().join("composer.json"), "{}").unwrap();
        let runner = runner();
        let ctx = context(dir.path(), ConfirmMode::AssumeYes, Rc::clone(&runner), Rc::new(ScriptedPrompter::silent()));

        let err = run(&ctx, Action::Build, BuildOptions::default()).unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigMissingValue);
        assert!(runner.rendered().iter().all(|c| c.ends_with("--version")));
        assert!(!dir.path().join("lib").exists());
    }

    #[test]
    fn root_composer_runs_when_vendor_missing() {
        let dir = project(r#"{"author": {"username": "admin", "email": "a@b.c"}}"#);
        fs::write(dir.path().join("composer.json"), "{}").unwrap();
        let runner = runner();
        let ctx = context(dir.path(), ConfirmMode::AssumeYes, Rc::clone(&runner), Rc::new(ScriptedPrompter::silent()));

        run(&ctx, Action::Build, BuildOptions::default()).unwrap();
        let root = format!("--working-dir={}", dir.path().display());
        let rendered = runner.rendered();
        let first_composer = rendered.iter().find(|c| c.starts_with("composer update")).unwrap();
        assert!(first_composer.contains(&root));
    }
}
