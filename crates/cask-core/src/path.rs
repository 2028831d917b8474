//! Typed one- or two-segment addresses into state and the reducer registry

use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Address of a top-level entry or of an entry nested one level under a
/// namespace.
///
/// Parsed from dotted strings: `"count"` is `Local("count")`, `"cart.items"`
/// is `Namespaced("cart", "items")`. Empty segments and deeper paths are
/// rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyPath {
    /// A top-level key
    Local(String),
    /// A key nested under a namespace
    Namespaced(String, String),
}

impl KeyPath {
    /// Create a top-level path
    pub fn local(name: impl Into<String>) -> Self {
        KeyPath::Local(name.into())
    }

    /// Create a namespaced path
    pub fn namespaced(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        KeyPath::Namespaced(namespace.into(), name.into())
    }

    /// Parse a dotted path
    pub fn parse(path: &str) -> Result<Self> {
        let mut parts = path.split('.');
        let first = parts.next().unwrap_or_default();
        let second = parts.next();

        if first.is_empty() || parts.next().is_some() {
            return Err(Error::InvalidPath(path.to_string()));
        }

        match second {
            None => Ok(KeyPath::Local(first.to_string())),
            Some("") => Err(Error::InvalidPath(path.to_string())),
            Some(name) => Ok(KeyPath::Namespaced(first.to_string(), name.to_string())),
        }
    }

    /// The first segment (the top-level key)
    pub fn head(&self) -> &str {
        match self {
            KeyPath::Local(name) => name,
            KeyPath::Namespaced(ns, _) => ns,
        }
    }

    /// The namespace, if any
    pub fn namespace(&self) -> Option<&str> {
        match self {
            KeyPath::Local(_) => None,
            KeyPath::Namespaced(ns, _) => Some(ns),
        }
    }

    /// The final segment
    pub fn name(&self) -> &str {
        match self {
            KeyPath::Local(name) => name,
            KeyPath::Namespaced(_, name) => name,
        }
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyPath::Local(name) => write!(f, "{}", name),
            KeyPath::Namespaced(ns, name) => write!(f, "{}.{}", ns, name),
        }
    }
}

impl FromStr for KeyPath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        KeyPath::parse(s)
    }
}

/// Conversion into a [`KeyPath`], parsing string forms
pub trait IntoKeyPath {
    fn into_key_path(self) -> Result<KeyPath>;
}

impl IntoKeyPath for KeyPath {
    fn into_key_path(self) -> Result<KeyPath> {
        Ok(self)
    }
}

impl IntoKeyPath for &KeyPath {
    fn into_key_path(self) -> Result<KeyPath> {
        Ok(self.clone())
    }
}

impl IntoKeyPath for &str {
    fn into_key_path(self) -> Result<KeyPath> {
        KeyPath::parse(self)
    }
}

impl IntoKeyPath for String {
    fn into_key_path(self) -> Result<KeyPath> {
        KeyPath::parse(&self)
    }
}

impl IntoKeyPath for &String {
    fn into_key_path(self) -> Result<KeyPath> {
        KeyPath::parse(self)
    }
}
