//! File-based property source.

use std::path::{Path, PathBuf};

use toml::{Table, Value};

use super::key::{Element, PropertyName};
use super::source::{PropertyEntry, PropertySource};
use super::ConfigError;

/// A property source that loads from a TOML file.
///
/// Tables flatten to dotted names and arrays to indexed names, so
///
/// ```toml
/// [security]
/// ignored = ["/css/**", "/js/**"]
/// ```
///
/// yields `security.ignored[0]` and `security.ignored[1]`.
///
/// Files can be marked as required or optional. Required files that don't exist
/// cause an error; optional files that don't exist are silently skipped.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    required: bool,
}

impl FileSource {
    /// Creates a new file source.
    ///
    /// If `required` is true, the build will fail if the file doesn't exist.
    pub fn new(path: impl AsRef<Path>, required: bool) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            required,
        }
    }
}

impl PropertySource for FileSource {
    fn name(&self) -> String {
        format!("file '{}'", self.path.display())
    }

    fn entries(&self) -> Result<Vec<PropertyEntry>, ConfigError> {
        let mut entries = Vec::new();
        if let Some(table) = load_config_file(&self.path, self.required)? {
            flatten_table(&table, &mut Vec::new(), &mut entries);
        }
        Ok(entries)
    }
}

/// Loads and parses a TOML config file.
///
/// Returns `Ok(None)` if the file doesn't exist and `required` is false.
fn load_config_file(path: &Path, required: bool) -> Result<Option<Table>, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(contents) => {
            let table = toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
                path: path.to_path_buf(),
                source: e,
            })?;
            Ok(Some(table))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            if required {
                Err(ConfigError::FileNotFound(path.to_path_buf()))
            } else {
                Ok(None)
            }
        }
        Err(e) => Err(ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

fn flatten_table(table: &Table, path: &mut Vec<Element>, out: &mut Vec<PropertyEntry>) {
    for (key, value) in table {
        path.push(Element::name(key));
        flatten_value(value, path, out);
        path.pop();
    }
}

fn flatten_value(value: &Value, path: &mut Vec<Element>, out: &mut Vec<PropertyEntry>) {
    match value {
        Value::Table(table) => flatten_table(table, path, out),
        // An empty array still clears the list, like an empty delimited value.
        Value::Array(items) if items.is_empty() => out.push(entry_at(path, String::new())),
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                path.push(Element::Index(index));
                flatten_value(item, path, out);
                path.pop();
            }
        }
        Value::String(s) => out.push(entry_at(path, s.clone())),
        Value::Integer(i) => out.push(entry_at(path, i.to_string())),
        Value::Float(f) => out.push(entry_at(path, f.to_string())),
        Value::Boolean(b) => out.push(entry_at(path, b.to_string())),
        Value::Datetime(dt) => out.push(entry_at(path, dt.to_string())),
    }
}

fn entry_at(path: &[Element], value: String) -> PropertyEntry {
    PropertyEntry::new(PropertyName::from_elements(path.to_vec()), value)
}
