//! Public output types for stagehand command responses.

use serde::{Deserialize, Serialize};

use crate::credential::AdministrativeCredential;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Done,
    Exists,
    Skipped,
    Failed,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Done => "done",
            ItemStatus::Exists => "exists",
            ItemStatus::Skipped => "skipped",
            ItemStatus::Failed => "Failed!",
        }
    }
}

/// One line of a stage: a directory, dependency, link or extension.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ItemReport {
    pub name: String,
    pub status: ItemStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Items of one pipeline stage, in the order they ran.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StageReport {
    pub stage: String,
    pub items: Vec<ItemReport>,
}

impl StageReport {
    pub fn new(stage: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            items: Vec::new(),
        }
    }

    /// Record an item and log its `[i/n] name ... status` line.
    pub fn record(&mut self, index: usize, total: usize, name: impl Into<String>, status: ItemStatus, detail: Option<String>) {
        let name = name.into();
        match &detail {
            Some(detail) if status == ItemStatus::Failed => {
                crate::log_status!("build", "[{}/{}] {} ... Failed! Returned: {}", index, total, name, detail);
            }
            _ => {
                crate::log_status!("build", "[{}/{}] {} ... {}", index, total, name, status.as_str());
            }
        }
        self.items.push(ItemReport { name, status, detail });
    }

    /// A stage with a single item named after the stage.
    pub fn single(stage: impl Into<String>, status: ItemStatus, detail: Option<String>) -> Self {
        let stage = stage.into();
        let mut report = Self::new(stage.clone());
        report.record(1, 1, stage, status, detail);
        report
    }

    pub fn failures(&self) -> usize {
        self.items
            .iter()
            .filter(|i| i.status == ItemStatus::Failed)
            .count()
    }

    pub fn item(&self, name: &str) -> Option<&ItemReport> {
        self.items.iter().find(|i| i.name == name)
    }
}

/// Everything `build`/`update` did.
#[derive(Debug, Clone, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct BuildReport {
    pub action: String,
    pub stages: Vec<StageReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential: Option<AdministrativeCredential>,
    pub helper_scripts: Vec<String>,
    pub warnings: Vec<String>,
    pub failures: usize,
}

impl BuildReport {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            ..Self::default()
        }
    }

    pub fn push(&mut self, stage: StageReport) {
        self.failures += stage.failures();
        self.stages.push(stage);
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        crate::log_status!("build", "WARNING! {}", message);
        self.warnings.push(message);
    }

    pub fn stage(&self, name: &str) -> Option<&StageReport> {
        self.stages.iter().find(|s| s.stage == name)
    }
}
