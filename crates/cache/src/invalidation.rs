//! Selection of entries for bulk invalidation

use crate::entry::CacheEntry;

/// Which entries [`BoundedCache::invalidate`](crate::BoundedCache::invalidate)
/// removes.
///
/// Criteria combine with OR: an entry matching any one of them is removed.
/// A scope with no criteria matches nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvalidationScope {
    /// Namespace the entry was stored under, which is not necessarily its
    /// key prefix
    pub namespace: Option<String>,
    pub tag: Option<String>,
    /// Substring of the key
    pub pattern: Option<String>,
    pub all: bool,
}

impl InvalidationScope {
    pub fn namespace(namespace: impl AsRef<str>) -> Self {
        Self::default().or_namespace(namespace)
    }

    pub fn tag(tag: impl Into<String>) -> Self {
        Self::default().or_tag(tag)
    }

    pub fn pattern(pattern: impl Into<String>) -> Self {
        Self::default().or_pattern(pattern)
    }

    pub fn all() -> Self {
        Self {
            all: true,
            ..Self::default()
        }
    }

    pub fn or_namespace(mut self, namespace: impl AsRef<str>) -> Self {
        self.namespace = Some(namespace.as_ref().to_string());
        self
    }

    pub fn or_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn or_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        !self.all && self.namespace.is_none() && self.tag.is_none() && self.pattern.is_none()
    }

    pub(crate) fn matches<V>(&self, key: &str, entry: &CacheEntry<V>) -> bool {
        self.all
            || self.namespace.as_deref() == Some(entry.namespace.as_str())
            || self.tag.as_deref().is_some_and(|tag| entry.has_tag(tag))
            || self
                .pattern
                .as_deref()
                .is_some_and(|pattern| key.contains(pattern))
    }
}
