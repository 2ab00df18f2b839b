use std::ffi::OsString;

use super::key::PropertyName;
use super::source::{PropertyEntry, PropertySource};
use super::ConfigError;

/// Environment variables as a property source.
///
/// `APP__SECURITY__USER__ROLE` with prefix `APP` and separator `__` maps to
/// `security.user.role`; numeric segments map to indexes, so
/// `APP__SECURITY__IGNORED__0` is `security.ignored[0]`. An empty prefix
/// takes every variable.
#[derive(Debug, Clone)]
pub struct EnvSource {
    prefix: String,
    separator: String,
    vars: Option<Vec<(String, String)>>,
}

impl EnvSource {
    pub fn new(prefix: impl Into<String>, separator: impl Into<String>) -> Self {
        let separator = separator.into();
        assert!(!separator.is_empty(), "separator must not be empty");
        Self {
            prefix: prefix.into(),
            separator,
            vars: None,
        }
    }

    /// Reads from the given variables instead of the process environment.
    pub fn with_vars<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.vars = Some(
            vars.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    fn strip<'a>(&self, key: &'a str) -> Option<&'a str> {
        if self.prefix.is_empty() {
            return Some(key);
        }
        key.strip_prefix(self.prefix.as_str())?
            .strip_prefix(self.separator.as_str())
    }
}

impl PropertySource for EnvSource {
    fn name(&self) -> String {
        format!("environment (prefix '{}')", self.prefix)
    }

    fn entries(&self) -> Result<Vec<PropertyEntry>, ConfigError> {
        let vars = match &self.vars {
            Some(vars) => vars.clone(),
            None => utf8_vars(std::env::vars_os()),
        };

        let mut entries = Vec::new();
        for (key, value) in vars {
            let Some(path_str) = self.strip(&key) else {
                continue;
            };
            let segments: Vec<&str> = path_str.split(self.separator.as_str()).collect();
            if segments.iter().any(|s| s.is_empty()) {
                continue;
            }
            entries.push(PropertyEntry::new(
                PropertyName::from_segments(segments),
                value,
            ));
        }

        Ok(entries)
    }
}

/// Keeps the variables whose name and value are both valid UTF-8.
fn utf8_vars<I>(vars: I) -> Vec<(String, String)>
where
    I: IntoIterator<Item = (OsString, OsString)>,
{
    vars.into_iter()
        .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_source_maps_prefixed_vars() {
        let source = EnvSource::new("APP", "__").with_vars([
            ("APP__SECURITY__USER__ROLE", "ADMIN"),
            ("APP__SECURITY__IGNORED__1", "/foo/**"),
            ("OTHER__SECURITY__USER__NAME", "bob"),
            ("APP__", "skipped"),
        ]);

        let entries = source.entries().unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(
            entries[0].name,
            PropertyName::parse("security.user.role").unwrap()
        );
        assert_eq!(
            entries[1].name,
            PropertyName::parse("security.ignored[1]").unwrap()
        );
        assert_eq!(entries[1].value, "/foo/**");
    }

    #[test]
    fn test_env_source_underscored_names_are_relaxed() {
        let source =
            EnvSource::new("APP", "__").with_vars([("APP__SECURITY__FILTER_ORDER", "10")]);

        let entries = source.entries().unwrap();

        assert_eq!(
            entries[0].name,
            PropertyName::parse("security.filter-order").unwrap()
        );
    }

    #[test]
    fn test_env_source_empty_prefix_takes_everything() {
        let source = EnvSource::new("", "__").with_vars([("ADMIN_PASSWORD", "s3cret")]);

        let entries = source.entries().unwrap();

        assert_eq!(
            entries[0].name,
            PropertyName::parse("admin-password").unwrap()
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_vars_are_skipped() {
        use std::os::unix::ffi::OsStringExt;

        let vars = utf8_vars([
            (OsString::from("APP__SECURITY__USER__NAME"), OsString::from("admin")),
            (OsString::from("APP__BAD"), OsString::from_vec(vec![0x66, 0xff, 0x6f])),
            (OsString::from_vec(vec![0xfe]), OsString::from("x")),
        ]);

        assert_eq!(
            vars,
            [("APP__SECURITY__USER__NAME".to_string(), "admin".to_string())]
        );
    }
}
