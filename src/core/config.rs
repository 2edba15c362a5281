//! Effective configuration: default config merged with manifest overrides.
//!
//! Both documents are one level of named groups holding key/value leaves.
//! Overrides win per key; groups and keys only present in the base survive.

use std::fs;
use std::path::Path;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::context::ExecContext;
use crate::error::{Error, Result};
use crate::project::ProjectLayout;
use crate::utils::io;

/// Grouped configuration, e.g. `{"database": {"host": "...", "user": null}}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct EffectiveConfiguration {
    groups: Map<String, Value>,
}

impl EffectiveConfiguration {
    /// Build from a JSON object whose members are all objects.
    pub fn from_value(value: Value, source: &str) -> Result<Self> {
        let Value::Object(groups) = value else {
            return Err(Error::config_invalid_value(
                source,
                None,
                "Configuration must be a JSON object of groups",
            ));
        };

        for (name, group) in &groups {
            if !group.is_object() {
                return Err(Error::config_invalid_value(
                    format!("{}->{}", source, name),
                    Some(group.to_string()),
                    "Configuration group must be a JSON object",
                ));
            }
        }

        Ok(Self { groups })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = io::read_file(path, "read default configuration")?;
        let value: Value = serde_json::from_str(&content)
            .map_err(|e| Error::config_invalid_json(path.to_string_lossy(), e))?;
        Self::from_value(value, &path.to_string_lossy())
    }

    pub fn get(&self, group: &str, key: &str) -> Option<&Value> {
        self.groups.get(group).and_then(|g| g.get(key))
    }

    pub fn set(&mut self, group: &str, key: &str, value: Value) {
        let entry = self
            .groups
            .entry(group.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(map) = entry {
            map.insert(key.to_string(), value);
        }
    }

    /// `(group, key)` of every null leaf, in document order.
    pub fn missing_values(&self) -> Vec<(String, String)> {
        let mut missing = Vec::new();
        for (group, members) in &self.groups {
            if let Value::Object(members) = members {
                for (key, value) in members {
                    if value.is_null() {
                        missing.push((group.clone(), key.clone()));
                    }
                }
            }
        }
        missing
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.groups.clone())
    }
}

/// Overwrite every leaf of `base` named in `overrides`.
pub fn merge(base: &EffectiveConfiguration, overrides: &EffectiveConfiguration) -> EffectiveConfiguration {
    let mut merged = base.clone();
    for (group, members) in &overrides.groups {
        if let Value::Object(members) = members {
            for (key, value) in members {
                merged.set(group, key, value.clone());
            }
        }
    }
    merged
}

/// Fill every null leaf by prompting, or fail on the first one when an
/// `--assume-*` flag is active.
pub fn resolve_missing(config: &mut EffectiveConfiguration, ctx: &ExecContext) -> Result<usize> {
    let missing = config.missing_values();
    if missing.is_empty() {
        return Ok(0);
    }

    if !ctx.confirm_mode().is_interactive() {
        let (group, key) = &missing[0];
        return Err(Error::config_missing_value(group, key));
    }

    for (group, key) in &missing {
        let value = ctx.prompt_value(&format!("Enter value for {}->{}", group, key))?;
        config.set(group, key, Value::String(value));
    }

    Ok(missing.len())
}

/// Write the configuration to `var/manifest/config.json`.
pub fn persist(config: &EffectiveConfiguration, layout: &ProjectLayout) -> Result<()> {
    let dir = layout.output_manifest_dir();
    fs::create_dir_all(&dir)
        .map_err(|e| Error::internal_io(e.to_string(), Some(format!("create {}", dir.display()))))?;

    let content = serde_json::to_string_pretty(&config.to_value())
        .map_err(|e| Error::internal_json(e.to_string(), Some("serialize configuration".to_string())))?;
    io::write_file_atomic(&layout.final_config(), &content, "write configuration")
}

/// Render a scalar leaf as a string (ports are often numbers).
pub fn value_as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
