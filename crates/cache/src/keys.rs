//! Namespaced cache keys.
//!
//! Keys have the layout `namespace:identifier[:tag]`. The namespace groups
//! entries for bulk invalidation and per-namespace metrics; the identifier
//! names the record; the optional tag distinguishes variants of the same
//! record (for example a serialized filter).
//!
//! Parsing is deliberately flat: everything after the second delimiter is the
//! tag, verbatim, even if it contains further delimiters.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use taskstore_core::{Error, Result};

/// Separator between key segments
pub const KEY_DELIMITER: char = ':';

/// Namespace assigned when none is given and none can be parsed from the key
pub const UNKNOWN_NAMESPACE: &str = "unknown";

/// Well-known cache namespaces used by the store adapters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheNamespace {
    /// Raw records loaded from the backing files
    Storage,
    /// Individual task lookups
    Task,
    /// Task lists grouped by tag/context
    Tag,
    /// Complexity analysis reports
    Complexity,
}

impl CacheNamespace {
    pub const ALL: [CacheNamespace; 4] = [
        CacheNamespace::Storage,
        CacheNamespace::Task,
        CacheNamespace::Tag,
        CacheNamespace::Complexity,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            CacheNamespace::Storage => "storage",
            CacheNamespace::Task => "task",
            CacheNamespace::Tag => "tag",
            CacheNamespace::Complexity => "complexity",
        }
    }
}

impl AsRef<str> for CacheNamespace {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for CacheNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parsed form of a cache key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub namespace: String,
    pub identifier: String,
    pub tag: Option<String>,
}

impl CacheKey {
    pub fn new(
        namespace: impl AsRef<str>,
        identifier: impl Into<String>,
        tag: Option<&str>,
    ) -> Self {
        Self {
            namespace: namespace.as_ref().to_string(),
            identifier: identifier.into(),
            tag: normalize_tag(tag).map(str::to_string),
        }
    }

    /// Parse a `namespace:identifier[:tag]` key
    pub fn parse(key: &str) -> Result<Self> {
        let mut segments = key.splitn(3, KEY_DELIMITER);
        let namespace = segments.next().unwrap_or_default();
        let Some(identifier) = segments.next() else {
            return Err(Error::invalid_key_format(
                key,
                format!("expected at least two '{KEY_DELIMITER}'-separated segments"),
            ));
        };
        let tag = normalize_tag(segments.next());

        Ok(Self {
            namespace: namespace.to_string(),
            identifier: identifier.to_string(),
            tag: tag.map(str::to_string),
        })
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&build(&self.namespace, &self.identifier, self.tag.as_deref()))
    }
}

impl FromStr for CacheKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

fn normalize_tag(tag: Option<&str>) -> Option<&str> {
    tag.filter(|t| !t.is_empty())
}

/// Join `namespace`, `identifier` and an optional non-empty `tag` into a key.
///
/// `None` and `Some("")` both produce the two-segment form.
pub fn build(namespace: impl AsRef<str>, identifier: &str, tag: Option<&str>) -> String {
    let namespace = namespace.as_ref();
    match normalize_tag(tag) {
        Some(tag) => format!("{namespace}{KEY_DELIMITER}{identifier}{KEY_DELIMITER}{tag}"),
        None => format!("{namespace}{KEY_DELIMITER}{identifier}"),
    }
}

/// Split a key into its segments; see [`CacheKey::parse`]
pub fn parse(key: &str) -> Result<CacheKey> {
    CacheKey::parse(key)
}

/// Whether `key` belongs to `namespace`
pub fn is_in_namespace(key: &str, namespace: impl AsRef<str>) -> bool {
    key.strip_prefix(namespace.as_ref())
        .is_some_and(|rest| rest.starts_with(KEY_DELIMITER))
}

/// Keep only the keys that belong to `namespace`
pub fn keys_in_namespace<I, S>(keys: I, namespace: impl AsRef<str>) -> Vec<S>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let namespace = namespace.as_ref();
    keys.into_iter()
        .filter(|key| is_in_namespace(key.as_ref(), namespace))
        .collect()
}

/// Namespace for `key`, or [`UNKNOWN_NAMESPACE`] when it cannot be parsed
pub fn namespace_of(key: &str) -> String {
    match CacheKey::parse(key) {
        Ok(parsed) => parsed.namespace,
        Err(_) => UNKNOWN_NAMESPACE.to_string(),
    }
}
