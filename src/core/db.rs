//! MySQL access through the `mysql`/`mysqldump` clients, and the database
//! stage of a build.
//!
//! The password travels in `MYSQL_PWD`, never on the command line, so it does
//! not show up in logs or error details.

use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::config::{self, EffectiveConfiguration};
use crate::context::ExecContext;
use crate::error::{Error, Result};
use crate::process::{CapturedOutput, Invocation};
use crate::shell;

const PASSWORD_ENV: &str = "MYSQL_PWD";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseCredentials {
    pub user: String,
    pub password: String,
    pub host: String,
    pub port: String,
    pub db: String,
}

impl DatabaseCredentials {
    /// Read the `database` group of a fully resolved configuration.
    pub fn from_config(config: &EffectiveConfiguration) -> Result<Self> {
        let field = |key: &str| -> Result<String> {
            config
                .get("database", key)
                .and_then(config::value_as_string)
                .ok_or_else(|| Error::config_missing_value("database", key))
        };

        Ok(Self {
            user: field("user")?,
            password: field("password")?,
            host: field("host")?,
            port: field("port")?,
            db: field("db")?,
        })
    }
}

/// A verified connection: every method shells out to the client programs.
pub struct Database<'a> {
    ctx: &'a ExecContext,
    credentials: DatabaseCredentials,
}

impl<'a> Database<'a> {
    /// Check the credentials with `SELECT 1`.
    pub fn connect(ctx: &'a ExecContext, credentials: DatabaseCredentials) -> Result<Self> {
        let db = Self { ctx, credentials };
        db.ctx
            .run(&db.client().arg("-e").arg("SELECT 1;"))
            .map_err(|e| Error::database_connect_failed(&db.credentials.db, e.detail()))?;
        Ok(db)
    }

    pub fn name(&self) -> &str {
        &self.credentials.db
    }

    fn connection_args(&self) -> Vec<String> {
        vec![
            format!("--user={}", self.credentials.user),
            format!("--host={}", self.credentials.host),
            format!("--port={}", self.credentials.port),
        ]
    }

    /// `mysql` connected to the configured database.
    fn client(&self) -> Invocation {
        Invocation::new(&self.ctx.defaults().programs.mysql)
            .args(self.connection_args())
            .arg(format!("--database={}", self.credentials.db))
            .secret_env(PASSWORD_ENV, &self.credentials.password)
    }

    fn render(&self, program: &str, args: &[String]) -> String {
        shell::render_command(program, args)
    }

    pub fn query(&self, sql: &str) -> Result<CapturedOutput> {
        self.ctx
            .run(&self.client().args(["--batch", "--skip-column-names", "-e", sql]))
    }

    /// Tab-separated result rows.
    pub fn query_rows(&self, sql: &str) -> Result<Vec<Vec<String>>> {
        let output = self.query(sql)?;
        Ok(output
            .stdout
            .lines()
            .filter(|line| !line.is_empty())
            .map(|line| line.split('\t').map(str::to_string).collect())
            .collect())
    }

    pub fn table_exists(&self, table: &str) -> Result<bool> {
        let table = table.trim();
        let pattern = table.replace('\\', "\\\\").replace('_', "\\_").replace('\'', "''");
        let rows = self.query_rows(&format!("SHOW TABLES LIKE '{}';", pattern))?;
        Ok(rows.iter().any(|row| row.first().map(String::as_str) == Some(table)))
    }

    /// Replay only the DROP/USE/FOREIGN_KEY_CHECKS lines of a schema dump.
    pub fn drop_all_tables(&self) -> Result<()> {
        let programs = &self.ctx.defaults().programs;
        let mut dump_args = vec!["-B".to_string(), self.credentials.db.clone()];
        dump_args.extend(self.connection_args());
        dump_args.push("--add-drop-table".to_string());
        dump_args.push("--no-data".to_string());

        let script = format!(
            "{} | grep -e '^DROP \\| FOREIGN_KEY_CHECKS\\|USE' | {}",
            self.render(&programs.mysqldump, &dump_args),
            self.render(&programs.mysql, &self.connection_args()),
        );

        self.ctx.run(
            &Invocation::script(&programs.shell, script)
                .secret_env(PASSWORD_ENV, &self.credentials.password),
        )?;
        Ok(())
    }

    pub fn import_file(&self, path: &Path) -> Result<()> {
        self.ctx.run(&self.client().stdin_file(path))?;
        Ok(())
    }

    /// Import inline SQL via a temporary file.
    pub fn import_sql(&self, sql: &str) -> Result<()> {
        let mut file = tempfile::Builder::new()
            .prefix("stagehand_")
            .suffix(".sql")
            .tempfile()
            .map_err(|e| Error::internal_io(e.to_string(), Some("create SQL temp file".to_string())))?;
        file.write_all(sql.as_bytes())
            .and_then(|_| file.flush())
            .map_err(|e| Error::internal_io(e.to_string(), Some("write SQL temp file".to_string())))?;
        self.import_file(file.path())
    }

    /// Dump the whole database to `path`.
    pub fn backup(&self, path: &Path) -> Result<()> {
        let programs = &self.ctx.defaults().programs;
        let mut args = self.connection_args();
        args.push(self.credentials.db.clone());

        let script = format!(
            "{} > {}",
            self.render(&programs.mysqldump, &args),
            shell::quote_path(&path.to_string_lossy())
        );
        self.ctx.run(
            &Invocation::script(&programs.shell, script)
                .secret_env(PASSWORD_ENV, &self.credentials.password),
        )?;
        Ok(())
    }
}

/// Where the database stage has got to. Steps only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DatabaseState {
    Disconnected,
    Connected,
    TablesDropped,
    StructureImported,
    DataImported,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepOutcome {
    Done,
    /// The gate answered "skip".
    Skipped,
    /// Nothing to do (e.g. no SQL file).
    NotPresent,
}

pub struct DatabaseStage<'a> {
    database: Database<'a>,
    state: DatabaseState,
    tables_dropped: bool,
}

impl<'a> DatabaseStage<'a> {
    pub fn connect(ctx: &'a ExecContext, credentials: DatabaseCredentials) -> Result<Self> {
        Ok(Self {
            database: Database::connect(ctx, credentials)?,
            state: DatabaseState::Connected,
            tables_dropped: false,
        })
    }

    pub fn state(&self) -> DatabaseState {
        self.state
    }

    pub fn database(&self) -> &Database<'a> {
        &self.database
    }

    pub fn tables_dropped(&self) -> bool {
        self.tables_dropped
    }

    fn advance(&mut self, next: DatabaseState) -> Result<()> {
        if self.state >= next {
            return Err(Error::internal_unexpected(format!(
                "Database stage cannot move from {:?} to {:?}",
                self.state, next
            )));
        }
        Ok(())
    }

    /// Drop every table after a destructive-action confirmation.
    pub fn drop_tables(&mut self) -> Result<StepOutcome> {
        self.advance(DatabaseState::TablesDropped)?;
        crate::log_status!(
            "database",
            "WARNING! Using --database-drop-tables is highly destructive and will delete ALL data in the database. It is recommended to use --database-create-backup."
        );

        let ctx = self.database.ctx;
        if ctx.confirm("Do you want to continue anyway?")? == crate::confirm::Answer::Skip {
            return Ok(StepOutcome::Skipped);
        }

        self.database.drop_all_tables()?;
        self.tables_dropped = true;
        self.state = DatabaseState::TablesDropped;
        Ok(StepOutcome::Done)
    }

    pub fn import_structure(&mut self, path: &Path, canonical_table: &str) -> Result<StepOutcome> {
        self.advance(DatabaseState::StructureImported)?;
        let outcome = self.import_guarded(path, canonical_table)?;
        if outcome == StepOutcome::Done {
            self.state = DatabaseState::StructureImported;
        }
        Ok(outcome)
    }

    pub fn import_data(&mut self, path: &Path, canonical_table: &str) -> Result<StepOutcome> {
        self.advance(DatabaseState::DataImported)?;
        let outcome = self.import_guarded(path, canonical_table)?;
        if outcome == StepOutcome::Done {
            self.state = DatabaseState::DataImported;
        }
        Ok(outcome)
    }

    /// Import `path` if present. Existing platform tables need confirmation
    /// unless they were dropped earlier in this run.
    fn import_guarded(&self, path: &Path, canonical_table: &str) -> Result<StepOutcome> {
        if !path.is_file() {
            return Ok(StepOutcome::NotPresent);
        }

        if !self.tables_dropped && self.database.table_exists(canonical_table)? {
            let file = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            crate::log_status!(
                "database",
                "WARNING! Unable to import {}. It looks like there are existing tables in database '{}'. Hint: Use --database-drop-tables to clear the database.",
                file,
                self.database.name()
            );
            if self.database.ctx.confirm("Do you want to continue anyway?")? == crate::confirm::Answer::Skip {
                return Ok(StepOutcome::Skipped);
            }
        }

        self.database.import_file(path)?;
        Ok(StepOutcome::Done)
    }
}
