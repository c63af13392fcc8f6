// SPDX-License-Identifier: MIT OR Apache-2.0

//! Dotted configuration paths.
//!
//! A [`ConfigKey`] addresses a node in a configuration tree: `database.host`
//! names the `host` entry of the `database` map. The empty key addresses the
//! root of the tree.

use std::fmt;

/// The separator between path segments.
pub const PATH_SEPARATOR: char = '.';

/// A dotted path into a configuration tree.
///
/// # Examples
///
/// ```
/// use cfgweave::domain::ConfigKey;
///
/// let key = ConfigKey::from("database.pool.size");
/// assert_eq!(key.segments().collect::<Vec<_>>(), vec!["database", "pool", "size"]);
/// assert!(ConfigKey::from("").is_root());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConfigKey(String);

impl ConfigKey {
    /// Creates a new `ConfigKey` from a `String`.
    pub fn new(key: String) -> Self {
        ConfigKey(key)
    }

    /// Joins path segments with the separator.
    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let joined = segments
            .into_iter()
            .map(|s| s.as_ref().to_string())
            .collect::<Vec<_>>()
            .join(".");
        ConfigKey(joined)
    }

    /// Returns the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the key and returns the inner string.
    pub fn into_string(self) -> String {
        self.0
    }

    /// Returns `true` when the key addresses the whole tree.
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the path segments. The root key yields nothing.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        let path = if self.is_root() { None } else { Some(self.0.as_str()) };
        path.into_iter().flat_map(|p| p.split(PATH_SEPARATOR))
    }

    /// Returns the key extended by one segment.
    pub fn child(&self, segment: &str) -> ConfigKey {
        if self.is_root() {
            ConfigKey(segment.to_string())
        } else {
            ConfigKey(format!("{}{}{}", self.0, PATH_SEPARATOR, segment))
        }
    }
}

impl From<String> for ConfigKey {
    fn from(s: String) -> Self {
        ConfigKey(s)
    }
}

impl From<&str> for ConfigKey {
    fn from(s: &str) -> Self {
        ConfigKey(s.to_string())
    }
}

impl From<ConfigKey> for String {
    fn from(key: ConfigKey) -> Self {
        key.0
    }
}

impl AsRef<str> for ConfigKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for ConfigKey {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for ConfigKey {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_segments() {
        let key = ConfigKey::from("a.b.c");
        assert_eq!(key.segments().collect::<Vec<_>>(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_root_has_no_segments() {
        let key = ConfigKey::from("");
        assert!(key.is_root());
        assert_eq!(key.segments().count(), 0);
    }

    #[test]
    fn test_child() {
        let root = ConfigKey::from("");
        let db = root.child("database");
        assert_eq!(db, "database");
        assert_eq!(db.child("host"), "database.host");
    }

    #[test]
    fn test_from_segments() {
        let key = ConfigKey::from_segments(["server", "tls", "cert"]);
        assert_eq!(key.as_str(), "server.tls.cert");
    }

    #[test]
    fn test_display_and_into_string() {
        let key = ConfigKey::from("app.name");
        assert_eq!(format!("{}", key), "app.name");
        let s: String = key.into();
        assert_eq!(s, "app.name");
    }

    #[test]
    fn test_hash_and_order() {
        let mut set = HashSet::new();
        set.insert(ConfigKey::from("x.y"));
        assert!(set.contains(&ConfigKey::from("x.y")));
        assert!(ConfigKey::from("a") < ConfigKey::from("b"));
    }
}
