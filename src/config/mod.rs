//! Property sources and binding.

mod binder;
pub mod convert;
mod env;
mod error;
mod file;
mod key;
mod resolve;
mod source;

pub use binder::{BindContext, Bindable, Binder, BinderBuilder};
pub use env::EnvSource;
pub use error::ConfigError;
pub use file::FileSource;
pub use key::{Element, PropertyName};
pub use resolve::{resolve_placeholders, PropertyValue};
pub use source::{MapSource, PropertyEntry, PropertySource};
