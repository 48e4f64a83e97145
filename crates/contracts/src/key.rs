//! StoreKey / JobNamespace - path-like keys into a shared store
//!
//! Keys are relative, `/`-separated and normalised on construction so that
//! `input//urls.txt`, `./input/urls.txt` and `input/urls.txt` address the
//! same entry. Keys never escape their namespace.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use crate::ContractError;

/// Normalised key into a [`SharedStore`](crate::SharedStore).
///
/// Internally uses `Arc<str>` so cloning is cheap; keys are built once per
/// job and handed to every store call.
///
/// # Examples
/// ```
/// use contracts::StoreKey;
///
/// let key = StoreKey::parse("./status//analyze_complete.json").unwrap();
/// assert_eq!(key.as_str(), "status/analyze_complete.json");
/// assert!(StoreKey::parse("../etc/passwd").is_err());
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StoreKey(Arc<str>);

impl StoreKey {
    /// Parse and normalise a key.
    ///
    /// # Errors
    /// Empty keys, absolute keys and keys containing `..` are rejected.
    pub fn parse(raw: &str) -> Result<Self, ContractError> {
        if raw.starts_with('/') || raw.starts_with('\\') {
            return Err(ContractError::invalid_key(raw, "key must be relative"));
        }

        let mut segments = Vec::new();
        for segment in raw.split(['/', '\\']) {
            match segment {
                "" | "." => continue,
                ".." => {
                    return Err(ContractError::invalid_key(
                        raw,
                        "key must not contain '..' segments",
                    ))
                }
                s => segments.push(s),
            }
        }

        if segments.is_empty() {
            return Err(ContractError::invalid_key(raw, "key is empty"));
        }

        Ok(Self(Arc::from(segments.join("/"))))
    }

    /// Build a key from a constant that is already normalised.
    pub(crate) fn from_static(key: &'static str) -> Self {
        Self(Arc::from(key))
    }

    /// Get the underlying string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Iterate over the `/`-separated segments.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }

    /// Last segment of the key (the "file name").
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Parent key, `None` for top-level keys.
    pub fn parent(&self) -> Option<&str> {
        self.0.rsplit_once('/').map(|(parent, _)| parent)
    }
}

impl Deref for StoreKey {
    type Target = str;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<str> for StoreKey {
    #[inline]
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for StoreKey {
    type Error = ContractError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StoreKey({:?})", self.0)
    }
}

impl Serialize for StoreKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for StoreKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Key prefix that isolates one job from every other job using the same store.
///
/// The empty namespace is allowed for workers that only understand a fixed
/// layout; such jobs must not run concurrently against one store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobNamespace {
    prefix: Option<StoreKey>,
}

impl JobNamespace {
    /// Namespace rooted at `prefix`.
    ///
    /// Only the empty string yields the root namespace; any other prefix
    /// must parse as a [`StoreKey`].
    pub fn new(prefix: &str) -> Result<Self, ContractError> {
        if prefix.is_empty() {
            return Ok(Self::root());
        }
        Ok(Self {
            prefix: Some(StoreKey::parse(prefix)?),
        })
    }

    /// The root namespace (no prefix).
    pub fn root() -> Self {
        Self { prefix: None }
    }

    /// Whether this is the root namespace.
    pub fn is_root(&self) -> bool {
        self.prefix.is_none()
    }

    /// Prefix as a string (`""` for the root namespace).
    pub fn prefix(&self) -> &str {
        self.prefix.as_ref().map(StoreKey::as_str).unwrap_or("")
    }

    /// Resolve a relative key inside this namespace.
    pub fn key(&self, relative: &StoreKey) -> StoreKey {
        match &self.prefix {
            Some(prefix) => StoreKey(Arc::from(format!("{}/{}", prefix, relative))),
            None => relative.clone(),
        }
    }
}

impl fmt::Display for JobNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            write!(f, "<root>")
        } else {
            write!(f, "{}", self.prefix())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_normalisation() {
        let key = StoreKey::parse("input//./urls.txt").unwrap();
        assert_eq!(key.as_str(), "input/urls.txt");
        assert_eq!(key.file_name(), "urls.txt");
        assert_eq!(key.parent(), Some("input"));
        assert_eq!(key.segments().count(), 2);
    }

    #[test]
    fn test_key_rejects_escapes() {
        assert!(StoreKey::parse("").is_err());
        assert!(StoreKey::parse("./").is_err());
        assert!(StoreKey::parse("/shared/input").is_err());
        assert!(StoreKey::parse("input/../../etc").is_err());
    }

    #[test]
    fn test_key_backslash_separator() {
        let key = StoreKey::parse("status\\fetch_complete.json").unwrap();
        assert_eq!(key.as_str(), "status/fetch_complete.json");
    }

    #[test]
    fn test_namespace_resolution() {
        let rel = StoreKey::parse("status/analyze_complete.json").unwrap();

        let ns = JobNamespace::new("jobs/abc").unwrap();
        assert_eq!(ns.key(&rel).as_str(), "jobs/abc/status/analyze_complete.json");

        let root = JobNamespace::new("").unwrap();
        assert!(root.is_root());
        assert_eq!(root.key(&rel), rel);
    }

    #[test]
    fn test_namespace_only_empty_is_root() {
        assert!(JobNamespace::new("..").is_err());
        assert!(JobNamespace::new("./").is_err());
        assert!(JobNamespace::new("/").is_err());

        let dots = JobNamespace::new("...").unwrap();
        assert!(!dots.is_root());
        assert_eq!(dots.prefix(), "...");
    }

    #[test]
    fn test_disjoint_namespaces() {
        let rel = StoreKey::parse("input/urls.txt").unwrap();
        let a = JobNamespace::new("jobs/a").unwrap();
        let b = JobNamespace::new("jobs/b").unwrap();
        assert_ne!(a.key(&rel), b.key(&rel));
    }

    #[test]
    fn test_key_serde() {
        let key: StoreKey = serde_json::from_str("\"analysis//final_report.json\"").unwrap();
        assert_eq!(key.as_str(), "analysis/final_report.json");
        assert!(serde_json::from_str::<StoreKey>("\"../x\"").is_err());
    }
}
