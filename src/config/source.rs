use super::key::PropertyName;
use super::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyEntry {
    pub name: PropertyName,
    pub value: String,
}

impl PropertyEntry {
    pub fn new(name: PropertyName, value: impl Into<String>) -> Self {
        Self {
            name,
            value: value.into(),
        }
    }
}

/// A source of string-valued properties.
///
/// Entries are read once when a [`Binder`](super::Binder) is built.
pub trait PropertySource: Send + Sync + std::fmt::Debug {
    /// Human-readable name used in log output.
    fn name(&self) -> String;

    fn entries(&self) -> Result<Vec<PropertyEntry>, ConfigError>;
}

/// An in-memory source backed by an ordered list of key/value pairs.
#[derive(Debug, Clone, Default)]
pub struct MapSource {
    pairs: Vec<(String, String)>,
}

impl MapSource {
    pub fn new<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            pairs: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// A source holding exactly one property.
    pub fn single(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            pairs: vec![(key.into(), value.into())],
        }
    }

    /// Appends a property, keeping insertion order.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.pairs.push((key.into(), value.into()));
        self
    }
}

impl PropertySource for MapSource {
    fn name(&self) -> String {
        "map".to_string()
    }

    fn entries(&self) -> Result<Vec<PropertyEntry>, ConfigError> {
        self.pairs
            .iter()
            .map(|(key, value)| Ok(PropertyEntry::new(PropertyName::parse(key)?, value.clone())))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_source_preserves_order() {
        let source = MapSource::new([("b", "2"), ("a", "1")]).with("c", "3");
        let values: Vec<_> = source
            .entries()
            .unwrap()
            .into_iter()
            .map(|e| e.value)
            .collect();
        assert_eq!(values, ["2", "1", "3"]);
    }

    #[test]
    fn test_map_source_rejects_bad_key() {
        let source = MapSource::single("security..ignored", "x");
        assert!(matches!(
            source.entries(),
            Err(ConfigError::InvalidName { .. })
        ));
    }
}
