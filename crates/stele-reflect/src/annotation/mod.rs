//! Annotation model
//!
//! Annotations are structured metadata embedded in documentation comments
//! attached to class, method, and property declarations:
//!
//! ```text
//! /**
//!  * Creates the connection pool.
//!  *
//!  * @Inject
//!  * @Named('primary')
//!  * @Retry(attempts=3, backoff='exponential')
//!  */
//! ```
//!
//! The [`parser`] extracts raw occurrences from comment text, the [`cache`]
//! memoizes resolved lookups per declaration, and the [`factory`] ties both
//! together behind the `create`/`has`/`create_all` entry points used by the
//! reflection wrappers.

pub mod cache;
pub mod factory;
pub mod parser;

use std::fmt;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error raised when a requested annotation is not present on a declaration.
///
/// Recoverable by design: `has`-style queries convert it to `false`, while
/// `annotation`-style accessors propagate it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AnnotationError {
    /// The declaration's doc comment carries no annotation of this name.
    #[error("can not find annotation {name} at {target}")]
    NotFound {
        /// Requested annotation name
        name: String,
        /// Declaration the lookup ran against
        target: String,
    },
}

/// A single annotation argument value.
///
/// Bare `true`/`false` tokens become [`AnnotationValue::Bool`]; every other
/// bare word, number, or quoted literal is carried through as a string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnnotationValue {
    /// String literal or bare token
    Str(String),
    /// Bare `true` / `false`
    Bool(bool),
}

impl AnnotationValue {
    /// Classify a bare (unquoted) token.
    pub fn from_bare(token: &str) -> Self {
        match token {
            "true" => AnnotationValue::Bool(true),
            "false" => AnnotationValue::Bool(false),
            other => AnnotationValue::Str(other.to_string()),
        }
    }

    /// The string contents, if this is a string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AnnotationValue::Str(s) => Some(s),
            AnnotationValue::Bool(_) => None,
        }
    }

    /// The boolean, if this is a boolean value.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AnnotationValue::Bool(b) => Some(*b),
            AnnotationValue::Str(_) => None,
        }
    }
}

impl fmt::Display for AnnotationValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnnotationValue::Str(s) => f.write_str(s),
            AnnotationValue::Bool(b) => write!(f, "{}", b),
        }
    }
}

impl From<&str> for AnnotationValue {
    fn from(s: &str) -> Self {
        AnnotationValue::Str(s.to_string())
    }
}

impl From<bool> for AnnotationValue {
    fn from(b: bool) -> Self {
        AnnotationValue::Bool(b)
    }
}

/// A parsed annotation attached to a declaration.
///
/// Immutable after construction. Equality is structural: two annotations are
/// equal iff name, target, value, and params all match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    name: String,
    target: String,
    value: Option<AnnotationValue>,
    params: FxHashMap<String, AnnotationValue>,
}

impl Annotation {
    /// Create an annotation with no value and no parameters.
    pub fn new(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target: target.into(),
            value: None,
            params: FxHashMap::default(),
        }
    }

    /// Set the positional value slot.
    pub fn with_value(mut self, value: impl Into<AnnotationValue>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Add a named parameter.
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<AnnotationValue>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// The annotation kind, e.g. `Singleton` for `@Singleton`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Identifier of the declaration this annotation decorates,
    /// e.g. `Queue::push()` or `Queue->capacity`.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// The unnamed positional value, e.g. `bar` for `@Foo('bar')`.
    pub fn value(&self) -> Option<&AnnotationValue> {
        self.value.as_ref()
    }

    /// Look up a named parameter.
    pub fn param(&self, name: &str) -> Option<&AnnotationValue> {
        self.params.get(name)
    }

    /// Whether a named parameter is present.
    pub fn has_param(&self, name: &str) -> bool {
        self.params.contains_key(name)
    }

    /// All named parameters, in no particular order.
    pub fn params(&self) -> impl Iterator<Item = (&str, &AnnotationValue)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of named parameters.
    pub fn param_count(&self) -> usize {
        self.params.len()
    }
}

impl fmt::Display for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.name)?;
        if self.value.is_none() && self.params.is_empty() {
            return Ok(());
        }

        let mut rendered = Vec::new();
        if let Some(value) = &self.value {
            rendered.push(format!("'{}'", value));
        }
        // Sort for a stable rendering; params carry no order.
        let mut keys: Vec<_> = self.params.keys().collect();
        keys.sort();
        for key in keys {
            rendered.push(format!("{}={}", key, self.params[key]));
        }
        write!(f, "({})", rendered.join(", "))
    }
}

/// All annotations of one declaration, in encounter order.
///
/// Duplicate occurrences of the same name are preserved as distinct entries;
/// they are never merged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Annotations {
    items: Vec<Annotation>,
}

impl Annotations {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, annotation: Annotation) {
        self.items.push(annotation);
    }

    /// All annotations in encounter order.
    pub fn all(&self) -> &[Annotation] {
        &self.items
    }

    /// All occurrences of the given name, in encounter order.
    pub fn named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Annotation> {
        self.items.iter().filter(move |a| a.name() == name)
    }

    /// Whether any occurrence of the given name is present.
    pub fn contains(&self, name: &str) -> bool {
        self.items.iter().any(|a| a.name() == name)
    }

    /// Number of annotations, duplicates included.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the collection is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterate over all annotations in encounter order.
    pub fn iter(&self) -> std::slice::Iter<'_, Annotation> {
        self.items.iter()
    }
}

impl IntoIterator for Annotations {
    type Item = Annotation;
    type IntoIter = std::vec::IntoIter<Annotation>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a Annotations {
    type Item = &'a Annotation;
    type IntoIter = std::slice::Iter<'a, Annotation>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
