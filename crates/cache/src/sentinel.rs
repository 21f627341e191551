//! Unambiguous cache lookup results.
//!
//! A cached value may itself be "empty" (`None`, `0`, `""`, `[]`), so a miss
//! cannot be signalled with any value of `V`. [`Lookup`] keeps the two apart.

/// Result of looking a key up in the cache
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub enum Lookup<V> {
    /// A live entry was found
    Hit(V),
    /// No entry, or the entry had expired
    Miss,
}

impl<V> Lookup<V> {
    pub fn is_hit(&self) -> bool {
        matches!(self, Lookup::Hit(_))
    }

    pub fn is_miss(&self) -> bool {
        matches!(self, Lookup::Miss)
    }

    /// Convert into an `Option`, mapping a miss to `None`.
    ///
    /// Only use this when `V` has no legitimate "empty" value of its own.
    pub fn into_option(self) -> Option<V> {
        match self {
            Lookup::Hit(value) => Some(value),
            Lookup::Miss => None,
        }
    }

    pub fn as_ref(&self) -> Lookup<&V> {
        match self {
            Lookup::Hit(value) => Lookup::Hit(value),
            Lookup::Miss => Lookup::Miss,
        }
    }

    pub fn map<U, F>(self, f: F) -> Lookup<U>
    where
        F: FnOnce(V) -> U,
    {
        match self {
            Lookup::Hit(value) => Lookup::Hit(f(value)),
            Lookup::Miss => Lookup::Miss,
        }
    }

    /// The hit value, or the result of `f` on a miss
    pub fn unwrap_or_else<F>(self, f: F) -> V
    where
        F: FnOnce() -> V,
    {
        match self {
            Lookup::Hit(value) => value,
            Lookup::Miss => f(),
        }
    }
}

impl<V> From<Option<V>> for Lookup<V> {
    fn from(value: Option<V>) -> Self {
        match value {
            Some(value) => Lookup::Hit(value),
            None => Lookup::Miss,
        }
    }
}
