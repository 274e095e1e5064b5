//! Key-value data files.
//!
//! A [`DataFile`] is a TOML table kept in memory and written back on
//! [`DataFile::save`]. Keys may be dotted paths (`"stats.kills"`), which map
//! onto nested tables.

use crate::error::UtilsError;
use std::fs;
use std::path::{Path, PathBuf};
use toml::{Table, Value};
use tracing::debug;

/// A TOML-backed key-value file.
#[derive(Debug, Clone)]
pub struct DataFile {
    path: PathBuf,
    header: Option<String>,
    values: Table,
}

impl DataFile {
    /// Loads `path`, creating the file and its parent directories when
    /// missing.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, UtilsError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| UtilsError::io(parent, e))?;
        }
        if !path.exists() {
            fs::write(&path, "").map_err(|e| UtilsError::io(&path, e))?;
            debug!("Created data file {}", path.display());
        }

        let content = fs::read_to_string(&path).map_err(|e| UtilsError::io(&path, e))?;
        let values: Table = toml::from_str(&content).map_err(|source| UtilsError::TomlRead {
            path: path.clone(),
            source,
        })?;

        Ok(Self {
            path,
            header: None,
            values,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sets the comment block written above the values on save.
    pub fn set_header(&mut self, header: impl Into<String>) {
        self.header = Some(header.into());
    }

    pub fn header(&self) -> Option<&str> {
        self.header.as_deref()
    }

    /// Looks up a dotted key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        let mut parts = key.split('.');
        let first = parts.next()?;
        let mut current = self.values.get(first)?;
        for part in parts {
            current = current.as_table()?.get(part)?;
        }
        Some(current)
    }

    /// Looks up a dotted key holding a string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Looks up a dotted key holding a string, failing when it holds
    /// something else.
    pub fn try_get_str(&self, key: &str) -> Result<Option<&str>, UtilsError> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(other) => Err(UtilsError::InvalidValue {
                key: key.to_string(),
                reason: format!("expected a string, found {}", other.type_str()),
            }),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Sets a dotted key, creating intermediate tables. A non-table value
    /// in the way is replaced.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        let mut parts: Vec<&str> = key.split('.').collect();
        let Some(last) = parts.pop() else {
            return;
        };

        let mut table = &mut self.values;
        for part in parts {
            let entry = table
                .entry(part.to_string())
                .or_insert_with(|| Value::Table(Table::new()));
            if !entry.is_table() {
                *entry = Value::Table(Table::new());
            }
            table = match entry {
                Value::Table(inner) => inner,
                _ => return,
            };
        }
        table.insert(last.to_string(), value.into());
    }

    /// Removes a dotted key, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let mut parts: Vec<&str> = key.split('.').collect();
        let last = parts.pop()?;

        let mut table = &mut self.values;
        for part in parts {
            table = table.get_mut(part)?.as_table_mut()?;
        }
        table.remove(last)
    }

    /// Writes the header and values back to disk.
    pub fn save(&self) -> Result<(), UtilsError> {
        let body = toml::to_string(&self.values).map_err(|source| UtilsError::TomlWrite {
            path: self.path.clone(),
            source,
        })?;

        let mut content = String::new();
        if let Some(header) = &self.header {
            for line in header.lines() {
                content.push_str("# ");
                content.push_str(line);
                content.push('\n');
            }
            content.push('\n');
        }
        content.push_str(&body);

        fs::write(&self.path, content).map_err(|e| UtilsError::io(&self.path, e))
    }
}
