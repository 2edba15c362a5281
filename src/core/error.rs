use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigMissingValue,
    ConfigInvalidJson,
    ConfigInvalidValue,

    ValidationInvalidArgument,
    ValidationConflictingFlags,

    ProjectNotInitialized,
    ProjectAlreadyInitialized,

    ProcessFailed,
    ProcessLaunchFailed,
    ToolUnavailable,

    PackageCannotClone,
    PackageInvalidRepository,

    SymlinkTargetMissing,

    DatabaseConnectFailed,
    AuthorUnavailable,

    UserDeclined,

    InternalIoError,
    InternalJsonError,
    InternalUnexpected,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ConfigMissingValue => "config.missing_value",
            ErrorCode::ConfigInvalidJson => "config.invalid_json",
            ErrorCode::ConfigInvalidValue => "config.invalid_value",

            ErrorCode::ValidationInvalidArgument => "validation.invalid_argument",
            ErrorCode::ValidationConflictingFlags => "validation.conflicting_flags",

            ErrorCode::ProjectNotInitialized => "project.not_initialized",
            ErrorCode::ProjectAlreadyInitialized => "project.already_initialized",

            ErrorCode::ProcessFailed => "process.failed",
            ErrorCode::ProcessLaunchFailed => "process.launch_failed",
            ErrorCode::ToolUnavailable => "tool.unavailable",

            ErrorCode::PackageCannotClone => "package.cannot_clone",
            ErrorCode::PackageInvalidRepository => "package.invalid_repository",

            ErrorCode::SymlinkTargetMissing => "symlink.target_missing",

            ErrorCode::DatabaseConnectFailed => "database.connect_failed",
            ErrorCode::AuthorUnavailable => "author.unavailable",

            ErrorCode::UserDeclined => "user.declined",

            ErrorCode::InternalIoError => "internal.io_error",
            ErrorCode::InternalJsonError => "internal.json_error",
            ErrorCode::InternalUnexpected => "internal.unexpected",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hint {
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigMissingValueDetails {
    pub group: String,
    pub key: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigInvalidJsonDetails {
    pub path: String,
    pub error: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigInvalidValueDetails {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub problem: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidArgumentDetails {
    pub field: String,
    pub problem: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictingFlagsDetails {
    pub flags: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectPathDetails {
    pub path: String,
}

/// Captured failure of an external command.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessFailedDetails {
    pub command: String,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessLaunchFailedDetails {
    pub command: String,
    pub error: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CannotCloneDetails {
    pub repository: String,
    pub destination: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalIoErrorDetails {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalJsonErrorDetails {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Error {
    pub code: ErrorCode,
    pub message: String,
    pub details: Value,
    pub hints: Vec<Hint>,
}

pub type Result<T> = std::result::Result<T, Error>;

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for Error {}

fn to_details<T: Serialize>(details: T) -> Value {
    serde_json::to_value(details).unwrap_or_else(|_| Value::Object(serde_json::Map::new()))
}

impl Error {
    pub fn new(code: ErrorCode, message: impl Into<String>, details: Value) -> Self {
        Self {
            code,
            message: message.into(),
            details,
            hints: Vec::new(),
        }
    }

    pub fn config_missing_value(group: impl Into<String>, key: impl Into<String>) -> Self {
        let group = group.into();
        let key = key.into();
        let message = format!("Missing configuration value for {}->{}", group, key);
        Self::new(
            ErrorCode::ConfigMissingValue,
            message,
            to_details(ConfigMissingValueDetails { group, key }),
        )
        .with_hint("Set the value in .stagehand/build.json or run without --assume-* to be prompted")
    }

    pub fn config_invalid_json(path: impl Into<String>, err: serde_json::Error) -> Self {
        let path = path.into();
        let message = format!("Unable to parse {}. Returned: {}", path, err);
        Self::new(
            ErrorCode::ConfigInvalidJson,
            message,
            to_details(ConfigInvalidJsonDetails {
                path,
                error: err.to_string(),
            }),
        )
    }

    pub fn config_invalid_value(
        key: impl Into<String>,
        value: Option<String>,
        problem: impl Into<String>,
    ) -> Self {
        let key = key.into();
        let problem = problem.into();
        let message = format!("Invalid configuration value for {}: {}", key, problem);
        Self::new(
            ErrorCode::ConfigInvalidValue,
            message,
            to_details(ConfigInvalidValueDetails {
                key,
                value,
                problem,
            }),
        )
    }

    pub fn validation_invalid_argument(
        field: impl Into<String>,
        problem: impl Into<String>,
    ) -> Self {
        let field = field.into();
        let problem = problem.into();
        let message = format!("Invalid argument {}: {}", field, problem);
        Self::new(
            ErrorCode::ValidationInvalidArgument,
            message,
            to_details(InvalidArgumentDetails { field, problem }),
        )
    }

    pub fn validation_conflicting_flags(flags: Vec<String>) -> Self {
        let message = format!(
            "It does not make sense to specify {} at the same time",
            flags.join(", ")
        );
        Self::new(
            ErrorCode::ValidationConflictingFlags,
            message,
            to_details(ConflictingFlagsDetails { flags }),
        )
    }

    pub fn project_not_initialized(path: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ProjectNotInitialized,
            "This does not look like a stagehand project",
            to_details(ProjectPathDetails { path: path.into() }),
        )
        .with_hint("Use --working-directory to point at your project, or run 'stagehand init'")
    }

    pub fn project_already_initialized(path: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ProjectAlreadyInitialized,
            "There is already a stagehand project here",
            to_details(ProjectPathDetails { path: path.into() }),
        )
        .with_hint("Use 'stagehand build' or 'stagehand update', or remove the existing .stagehand directory")
    }

    pub fn process_failed(
        command: impl Into<String>,
        exit_code: i32,
        stdout: impl Into<String>,
        stderr: impl Into<String>,
    ) -> Self {
        let details = ProcessFailedDetails {
            command: command.into(),
            exit_code,
            stdout: stdout.into(),
            stderr: stderr.into(),
        };
        let message = if details.stderr.is_empty() {
            format!("Command exited with status {}", exit_code)
        } else {
            details.stderr.clone()
        };
        Self::new(ErrorCode::ProcessFailed, message, to_details(details))
    }

    pub fn process_launch_failed(command: impl Into<String>, error: impl Into<String>) -> Self {
        let details = ProcessLaunchFailedDetails {
            command: command.into(),
            error: error.into(),
        };
        let message = format!("Unable to start '{}': {}", details.command, details.error);
        Self::new(ErrorCode::ProcessLaunchFailed, message, to_details(details))
    }

    pub fn tool_unavailable(program: impl Into<String>, reason: impl Into<String>) -> Self {
        let program = program.into();
        let message = format!("Required program '{}' is not available", program);
        Self::new(
            ErrorCode::ToolUnavailable,
            message,
            serde_json::json!({ "program": program, "error": reason.into() }),
        )
        .with_hint("Install it or point stagehand.json at the right executable")
    }

    pub fn package_cannot_clone(
        repository: impl Into<String>,
        destination: impl Into<String>,
    ) -> Self {
        let details = CannotCloneDetails {
            repository: repository.into(),
            destination: destination.into(),
        };
        let message = format!(
            "Cannot clone {} into {}. Destination exists and is not a git repository",
            details.repository, details.destination
        );
        Self::new(ErrorCode::PackageCannotClone, message, to_details(details))
    }

    pub fn package_invalid_repository(url: impl Into<String>) -> Self {
        let url = url.into();
        let message = format!("URL {} does not appear to be a valid git repository", url);
        Self::new(
            ErrorCode::PackageInvalidRepository,
            message,
            serde_json::json!({ "url": url }),
        )
    }

    pub fn symlink_target_missing(path: impl Into<String>) -> Self {
        let path = path.into();
        let message = format!("The destination for the symlink, {}, does not exist", path);
        Self::new(
            ErrorCode::SymlinkTargetMissing,
            message,
            to_details(ProjectPathDetails { path }),
        )
    }

    pub fn database_connect_failed(database: impl Into<String>, error: impl Into<String>) -> Self {
        let error = error.into();
        Self::new(
            ErrorCode::DatabaseConnectFailed,
            format!("Unable to connect to database. Returned: {}", error),
            serde_json::json!({ "database": database.into(), "error": error }),
        )
        .with_hint("Check the database credentials in .stagehand/build.json")
    }

    pub fn author_unavailable(error: impl Into<String>) -> Self {
        let error = error.into();
        Self::new(
            ErrorCode::AuthorUnavailable,
            format!("Unable to find author token from existing author data. Returned: {}", error),
            serde_json::json!({ "error": error }),
        )
    }

    pub fn user_declined(prompt: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::UserDeclined,
            "Execution terminated by user",
            serde_json::json!({ "prompt": prompt.into() }),
        )
    }

    pub fn internal_io(error: impl Into<String>, context: Option<String>) -> Self {
        let error = error.into();
        let message = match &context {
            Some(ctx) => format!("IO error ({}): {}", ctx, error),
            None => format!("IO error: {}", error),
        };
        Self::new(
            ErrorCode::InternalIoError,
            message,
            to_details(InternalIoErrorDetails { error, context }),
        )
    }

    pub fn internal_json(error: impl Into<String>, context: Option<String>) -> Self {
        Self::new(
            ErrorCode::InternalJsonError,
            "JSON error",
            to_details(InternalJsonErrorDetails {
                error: error.into(),
                context,
            }),
        )
    }

    pub fn internal_unexpected(error: impl Into<String>) -> Self {
        let error = error.into();
        Self::new(
            ErrorCode::InternalUnexpected,
            error.clone(),
            serde_json::json!({ "error": error }),
        )
    }

    pub fn with_hint(mut self, message: impl Into<String>) -> Self {
        self.hints.push(Hint {
            message: message.into(),
        });
        self
    }

    /// Text shown after "Failed! Returned:" when a stage reports this error.
    ///
    /// Process failures surface the captured stderr; everything else its message.
    pub fn detail(&self) -> String {
        if self.code == ErrorCode::ProcessFailed {
            if let Some(stderr) = self.details.get("stderr").and_then(Value::as_str) {
                if !stderr.trim().is_empty() {
                    return stderr.trim().to_string();
                }
            }
        }
        self.message.clone()
    }

    /// The rendered command line, for process errors.
    pub fn command(&self) -> Option<&str> {
        match self.code {
            ErrorCode::ProcessFailed | ErrorCode::ProcessLaunchFailed => {
                self.details.get("command").and_then(Value::as_str)
            }
            _ => None,
        }
    }
}
