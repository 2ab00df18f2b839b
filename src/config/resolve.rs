//! Placeholder resolution for property values.
//!
//! Supports `${name}` and `${name:default}` referring to other properties.
//! Use `$${...}` to escape and produce a literal `${...}`.
//!
//! A placeholder whose name is not found (and has no default) is not an
//! error: the value comes back as [`PropertyValue::Unresolved`] and binding
//! treats it as absent.

use std::collections::HashMap;
use std::iter::Peekable;
use std::str::Chars;

use super::ConfigError;

/// A property value after placeholder resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    Resolved(String),
    Unresolved {
        /// The value with resolvable placeholders substituted and the rest left as written.
        text: String,
        /// Names that could not be resolved, in order of appearance.
        missing: Vec<String>,
    },
}

impl PropertyValue {
    pub fn as_resolved(&self) -> Option<&str> {
        match self {
            PropertyValue::Resolved(s) => Some(s.as_str()),
            PropertyValue::Unresolved { .. } => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, PropertyValue::Resolved(_))
    }
}

/// Resolves all placeholders in `raw`, looking names up with `lookup`.
///
/// Substituted text is resolved again, so references may chain. A name that
/// refers back to itself, directly or through others, is an error.
pub fn resolve_placeholders<F>(raw: &str, lookup: F) -> Result<PropertyValue, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut resolver = Resolver {
        lookup: &lookup,
        visiting: Vec::new(),
        missing: Vec::new(),
        resolved: HashMap::new(),
    };
    let text = resolver.resolve_string(raw)?;

    if resolver.missing.is_empty() {
        Ok(PropertyValue::Resolved(text))
    } else {
        Ok(PropertyValue::Unresolved {
            text,
            missing: resolver.missing,
        })
    }
}

struct Resolver<'a> {
    lookup: &'a dyn Fn(&str) -> Option<String>,
    visiting: Vec<String>,
    missing: Vec<String>,
    /// Names already expanded during this call.
    resolved: HashMap<String, String>,
}

impl Resolver<'_> {
    fn resolve_string(&mut self, s: &str) -> Result<String, ConfigError> {
        let mut result = String::with_capacity(s.len());
        let mut chars = s.chars().peekable();

        while let Some(ch) = chars.next() {
            if ch != '$' {
                result.push(ch);
                continue;
            }
            match chars.peek() {
                Some('$') => {
                    // $$ -> $
                    chars.next();
                    result.push('$');
                }
                Some('{') => {
                    chars.next();
                    let body = consume_placeholder(&mut chars)
                        .ok_or(ConfigError::UnclosedReference)?;
                    let replaced = self.resolve_placeholder(&body)?;
                    result.push_str(&replaced);
                }
                _ => result.push('$'),
            }
        }

        Ok(result)
    }

    fn resolve_placeholder(&mut self, body: &str) -> Result<String, ConfigError> {
        let (name_raw, default) = match split_default(body) {
            Some((name, default)) => (name, Some(default)),
            None => (body, None),
        };
        let name = self.resolve_string(name_raw)?;

        if self.visiting.contains(&name) {
            return Err(ConfigError::CircularReference(name));
        }

        if let Some(cached) = self.resolved.get(&name) {
            return Ok(cached.clone());
        }

        if let Some(value) = (self.lookup)(&name) {
            self.visiting.push(name.clone());
            let resolved = self.resolve_string(&value);
            self.visiting.pop();
            let resolved = resolved?;
            self.resolved.insert(name, resolved.clone());
            return Ok(resolved);
        }

        match default {
            Some(default) => self.resolve_string(default),
            None => {
                let literal = format!("${{{name}}}");
                self.missing.push(name);
                Ok(literal)
            }
        }
    }
}

/// Consumes a placeholder body up to its matching `}`, keeping nested
/// placeholders intact.
fn consume_placeholder(chars: &mut Peekable<Chars>) -> Option<String> {
    let mut body = String::new();
    let mut depth = 0usize;

    while let Some(ch) = chars.next() {
        match ch {
            '$' if chars.peek() == Some(&'{') => {
                chars.next();
                depth += 1;
                body.push_str("${");
            }
            '}' if depth == 0 => return Some(body),
            '}' => {
                depth -= 1;
                body.push('}');
            }
            _ => body.push(ch),
        }
    }
    None
}

/// Splits `name:default` on the first `:` outside nested placeholders.
fn split_default(body: &str) -> Option<(&str, &str)> {
    let mut depth = 0usize;
    let bytes = body.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'{' if i > 0 && bytes[i - 1] == b'$' => depth += 1,
            b'}' if depth > 0 => depth -= 1,
            b':' if depth == 0 => return Some((&body[..i], &body[i + 1..])),
            _ => {}
        }
    }
    None
}
