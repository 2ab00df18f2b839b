use std::collections::BTreeMap;
use std::path::Path;

use tracing::{debug, trace};

use super::convert::{split_delimited, FromProperty};
use super::env::EnvSource;
use super::file::FileSource;
use super::key::PropertyName;
use super::resolve::{resolve_placeholders, PropertyValue};
use super::source::{MapSource, PropertyEntry, PropertySource};
use super::ConfigError;

/// A type whose fields can be populated by a [`Binder`].
///
/// Implementations declare their field-to-key table by calling
/// [`BindContext`] once per field:
///
/// ```
/// use dragon_props::config::{BindContext, Bindable, ConfigError};
///
/// #[derive(Default)]
/// struct Server {
///     host: String,
///     port: u16,
///     aliases: Vec<String>,
/// }
///
/// impl Bindable for Server {
///     fn bind_properties(&mut self, ctx: &mut BindContext<'_>) -> Result<(), ConfigError> {
///         ctx.scalar("host", &mut self.host)?;
///         ctx.scalar("port", &mut self.port)?;
///         ctx.list("aliases", &mut self.aliases)?;
///         Ok(())
///     }
/// }
/// ```
pub trait Bindable {
    fn bind_properties(&mut self, ctx: &mut BindContext<'_>) -> Result<(), ConfigError>;
}

#[derive(Debug)]
struct LoadedSource {
    name: String,
    entries: Vec<PropertyEntry>,
}

/// What a single source holds for a list-valued property.
enum ListContribution<'a> {
    Delimited(&'a str),
    Indexed(Vec<&'a str>),
}

/// Binds properties from one or more sources onto [`Bindable`] targets.
///
/// Sources are applied in registration order, so later sources override
/// earlier ones. A list property is taken whole from the highest-precedence
/// source that mentions it, either as a comma-delimited value or as indexed
/// keys (`name[0]`, `name[1]`, ...).
///
/// ## Placeholders
///
/// Values may reference other properties with `${name}` or
/// `${name:default}`. A placeholder that cannot be resolved makes the value
/// unusable: the field keeps its default.
///
/// ## Example
///
/// ```
/// use dragon_props::config::{Binder, MapSource};
/// use dragon_props::SecurityProperties;
///
/// let binder = Binder::new(MapSource::single("security.user.role", "USER,ADMIN"))?;
/// let mut security = SecurityProperties::default();
/// binder.bind("security", &mut security)?;
///
/// assert_eq!(security.user().role(), ["USER", "ADMIN"]);
/// # Ok::<(), dragon_props::ConfigError>(())
/// ```
#[derive(Debug, Default)]
pub struct Binder {
    sources: Vec<LoadedSource>,
}

impl Binder {
    /// Creates a new binder builder.
    pub fn builder() -> BinderBuilder {
        BinderBuilder::default()
    }

    /// Creates a binder over a single source.
    pub fn new(source: impl PropertySource + 'static) -> Result<Self, ConfigError> {
        let source: Box<dyn PropertySource> = Box::new(source);
        Self::from_sources(vec![source])
    }

    /// Creates a binder over the given sources, lowest precedence first.
    pub fn from_sources(sources: Vec<Box<dyn PropertySource>>) -> Result<Self, ConfigError> {
        let mut loaded = Vec::with_capacity(sources.len());
        for source in sources {
            let name = source.name();
            let entries = source.entries()?;
            debug!(source = %name, properties = entries.len(), "loaded property source");
            loaded.push(LoadedSource { name, entries });
        }
        Ok(Self { sources: loaded })
    }

    /// Returns the raw, unresolved value of `name` from the highest-precedence source.
    pub fn get(&self, name: &PropertyName) -> Option<&str> {
        self.sources.iter().rev().find_map(|source| {
            source
                .entries
                .iter()
                .rev()
                .find(|entry| &entry.name == name)
                .map(|entry| entry.value.as_str())
        })
    }

    /// Resolves placeholders in `raw` against this binder's sources.
    pub fn resolve(&self, raw: &str) -> Result<PropertyValue, ConfigError> {
        resolve_placeholders(raw, |key| {
            PropertyName::parse(key)
                .ok()
                .and_then(|name| self.get(&name))
                .map(str::to_string)
        })
    }

    /// Binds properties under `prefix` onto `target`.
    ///
    /// Returns `true` if at least one property was bound. Properties that
    /// are missing, or whose values hold unresolved placeholders, leave the
    /// corresponding fields untouched.
    pub fn bind<B: Bindable + ?Sized>(
        &self,
        prefix: &str,
        target: &mut B,
    ) -> Result<bool, ConfigError> {
        let mut ctx = BindContext {
            binder: self,
            prefix: PropertyName::parse(prefix)?,
            bound: false,
        };
        target.bind_properties(&mut ctx)?;
        Ok(ctx.bound)
    }

    /// Binds properties under `prefix` onto a default-constructed `B`.
    pub fn bind_or_default<B: Bindable + Default>(&self, prefix: &str) -> Result<B, ConfigError> {
        let mut target = B::default();
        self.bind(prefix, &mut target)?;
        Ok(target)
    }

    fn list_contribution(
        &self,
        name: &PropertyName,
    ) -> Result<Option<ListContribution<'_>>, ConfigError> {
        for source in self.sources.iter().rev() {
            let mut scalar = None;
            let mut indexed = BTreeMap::new();
            for entry in &source.entries {
                if &entry.name == name {
                    scalar = Some(entry.value.as_str());
                } else if let Some(index) = entry.name.index_under(name) {
                    indexed.insert(index, entry.value.as_str());
                }
            }

            if let Some(value) = scalar {
                return Ok(Some(ListContribution::Delimited(value)));
            }
            if indexed.is_empty() {
                continue;
            }
            if let Some(missing) = (0..indexed.len()).find(|i| !indexed.contains_key(i)) {
                return Err(ConfigError::IndexGap {
                    name: name.to_string(),
                    missing,
                });
            }
            trace!(
                property = %name,
                source = %source.name,
                elements = indexed.len(),
                "found indexed list"
            );
            return Ok(Some(ListContribution::Indexed(indexed.into_values().collect())));
        }
        Ok(None)
    }
}

/// Field-level binding operations for one prefix, handed to
/// [`Bindable::bind_properties`].
#[derive(Debug)]
pub struct BindContext<'a> {
    binder: &'a Binder,
    prefix: PropertyName,
    bound: bool,
}

impl BindContext<'_> {
    /// The full name of the property currently being bound.
    pub fn prefix(&self) -> &PropertyName {
        &self.prefix
    }

    /// Looks up and resolves `name` without converting it.
    ///
    /// Does not mark the context as bound; callers that assign the value
    /// should call [`mark_bound`](Self::mark_bound).
    pub fn value(&self, name: &str) -> Result<Option<PropertyValue>, ConfigError> {
        let full = self.child(name)?;
        match self.binder.get(&full) {
            Some(raw) => self.binder.resolve(raw).map(Some),
            None => Ok(None),
        }
    }

    pub fn mark_bound(&mut self) {
        self.bound = true;
    }

    /// Binds a scalar field. Returns `true` if the field was assigned.
    pub fn scalar<T: FromProperty>(
        &mut self,
        name: &str,
        target: &mut T,
    ) -> Result<bool, ConfigError> {
        match self.usable_scalar::<T>(name)? {
            Some(value) => {
                *target = value;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Binds an optional scalar field, leaving `None` when absent.
    pub fn optional<T: FromProperty>(
        &mut self,
        name: &str,
        target: &mut Option<T>,
    ) -> Result<bool, ConfigError> {
        match self.usable_scalar::<T>(name)? {
            Some(value) => {
                *target = Some(value);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Binds a list field from a comma-delimited value or indexed keys.
    ///
    /// The list is replaced, not appended to.
    pub fn list<T: FromProperty>(
        &mut self,
        name: &str,
        target: &mut Vec<T>,
    ) -> Result<bool, ConfigError> {
        let full = self.child(name)?;
        let Some(contribution) = self.binder.list_contribution(&full)? else {
            return Ok(false);
        };

        let items = match contribution {
            ListContribution::Delimited(raw) => match self.binder.resolve(raw)? {
                PropertyValue::Resolved(value) => split_delimited(&value)
                    .into_iter()
                    .map(|token| convert(&full, token))
                    .collect::<Result<Vec<T>, _>>()?,
                PropertyValue::Unresolved { missing, .. } => {
                    debug!(
                        property = %full,
                        ?missing,
                        "skipping list with unresolved placeholders"
                    );
                    return Ok(false);
                }
            },
            ListContribution::Indexed(raws) => {
                let mut items = Vec::with_capacity(raws.len());
                for (index, raw) in raws.into_iter().enumerate() {
                    let element = full.with_index(index);
                    match self.binder.resolve(raw)? {
                        PropertyValue::Resolved(value) => items.push(convert(&element, &value)?),
                        PropertyValue::Unresolved { missing, .. } => {
                            debug!(
                                property = %element,
                                ?missing,
                                "skipping element with unresolved placeholders"
                            );
                        }
                    }
                }
                items
            }
        };

        trace!(property = %full, elements = items.len(), "bound list");
        *target = items;
        self.bound = true;
        Ok(true)
    }

    /// Binds a nested record under `name`.
    pub fn nested<B: Bindable + ?Sized>(
        &mut self,
        name: &str,
        target: &mut B,
    ) -> Result<bool, ConfigError> {
        let mut child = BindContext {
            binder: self.binder,
            prefix: self.child(name)?,
            bound: false,
        };
        target.bind_properties(&mut child)?;
        self.bound |= child.bound;
        Ok(child.bound)
    }

    fn child(&self, name: &str) -> Result<PropertyName, ConfigError> {
        Ok(self.prefix.append(&PropertyName::parse(name)?))
    }

    fn usable_scalar<T: FromProperty>(&mut self, name: &str) -> Result<Option<T>, ConfigError> {
        let full = self.child(name)?;
        let value = match self.value(name)? {
            None => return Ok(None),
            Some(PropertyValue::Unresolved { missing, .. }) => {
                debug!(property = %full, ?missing, "skipping value with unresolved placeholders");
                return Ok(None);
            }
            Some(PropertyValue::Resolved(value)) => value,
        };

        if T::BLANK_IS_ABSENT && value.trim().is_empty() {
            return Ok(None);
        }

        let converted = convert(&full, &value)?;
        trace!(property = %full, "bound property");
        self.bound = true;
        Ok(Some(converted))
    }
}

fn convert<T: FromProperty>(name: &PropertyName, value: &str) -> Result<T, ConfigError> {
    T::from_property(value).ok_or_else(|| ConfigError::Conversion {
        name: name.to_string(),
        value: value.to_string(),
        target: T::TYPE_NAME,
    })
}

/// Builder for a [`Binder`] over several sources.
///
/// ```no_run
/// use dragon_props::config::Binder;
/// use dragon_props::SecurityProperties;
///
/// // defaults file -> env overrides -> local file overrides env
/// let binder = Binder::builder()
///     .with_file("config/default.toml", true)
///     .with_env("APP", "__")
///     .with_file("config/local.toml", false)
///     .build()?;
/// let security: SecurityProperties = binder.bind_or_default("security")?;
/// # Ok::<(), dragon_props::ConfigError>(())
/// ```
#[derive(Debug, Default)]
#[must_use = "builders do nothing until .build() is called"]
pub struct BinderBuilder {
    sources: Vec<Box<dyn PropertySource>>,
}

impl BinderBuilder {
    /// Adds a TOML file to be loaded.
    ///
    /// If `required` is `true`, the build will fail if the file doesn't exist.
    /// Optional files that are missing are silently skipped.
    pub fn with_file(self, path: impl AsRef<Path>, required: bool) -> Self {
        self.with_source(FileSource::new(path, required))
    }

    /// Loads properties from environment variables with the given prefix.
    pub fn with_env(self, prefix: impl Into<String>, separator: impl Into<String>) -> Self {
        self.with_source(EnvSource::new(prefix, separator))
    }

    pub fn with_map(self, map: MapSource) -> Self {
        self.with_source(map)
    }

    pub fn with_source(mut self, source: impl PropertySource + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    /// Loads every source. Sources are read once, here.
    pub fn build(self) -> Result<Binder, ConfigError> {
        Binder::from_sources(self.sources)
    }
}
