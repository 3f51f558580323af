use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// Case-preserving identifier for a stored object.
///
/// A `Handle` keeps the exact string it was created from, but compares,
/// hashes, and orders case-insensitively: `"MyCurve"`, `"MYCURVE"`, and
/// `"mycurve"` are the same key. The first casing stored is the one shown
/// back to callers.
///
/// Folding is Unicode lowercasing applied character by character, so no
/// folded copy of the string is kept.
#[derive(Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Handle {
    raw: String,
}

impl Handle {
    /// Create a handle from any string-like value.
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }

    /// The handle exactly as it was written.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Returns `true` for the empty handle.
    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Consume the handle, returning the original string.
    pub fn into_string(self) -> String {
        self.raw
    }

    fn folded_chars(&self) -> impl Iterator<Item = char> + '_ {
        self.raw.chars().flat_map(char::to_lowercase)
    }
}

impl PartialEq for Handle {
    fn eq(&self, other: &Self) -> bool {
        self.folded_chars().eq(other.folded_chars())
    }
}

impl Eq for Handle {}

impl Hash for Handle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for c in self.folded_chars() {
            c.hash(state);
        }
        state.write_u8(0xff);
    }
}

impl PartialOrd for Handle {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Handle {
    fn cmp(&self, other: &Self) -> Ordering {
        self.folded_chars().cmp(other.folded_chars())
    }
}

impl From<&str> for Handle {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for Handle {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

impl From<&String> for Handle {
    fn from(raw: &String) -> Self {
        Self::new(raw.clone())
    }
}

impl AsRef<str> for Handle {
    fn as_ref(&self) -> &str {
        &self.raw
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({:?})", self.raw)
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{BTreeSet, HashMap};

    #[test]
    fn equality_ignores_case() {
        assert_eq!(Handle::new("MyCurve"), Handle::new("MYCURVE"));
        assert_eq!(Handle::new("MyCurve"), Handle::new("mycurve"));
        assert_ne!(Handle::new("MyCurve"), Handle::new("MyCurve2"));
    }

    #[test]
    fn display_preserves_original_casing() {
        let h = Handle::new("MyCurve");
        assert_eq!(h.to_string(), "MyCurve");
        assert_eq!(h.as_str(), "MyCurve");
    }

    #[test]
    fn hash_map_lookup_ignores_case() {
        let mut map = HashMap::new();
        map.insert(Handle::new("Portfolio"), 1);
        assert_eq!(map.get(&Handle::new("PORTFOLIO")), Some(&1));
        assert_eq!(map.get(&Handle::new("portfolio")), Some(&1));
        assert_eq!(map.get(&Handle::new("other")), None);
    }

    #[test]
    fn hash_map_insert_keeps_first_casing() {
        let mut map = HashMap::new();
        map.insert(Handle::new("Portfolio"), 1);
        map.insert(Handle::new("PORTFOLIO"), 2);
        assert_eq!(map.len(), 1);
        let (key, value) = map.iter().next().unwrap();
        // std::collections::HashMap does not replace an equal key.
        assert_eq!(key.as_str(), "Portfolio");
        assert_eq!(*value, 2);
    }

    #[test]
    fn ordering_ignores_case() {
        let mut set = BTreeSet::new();
        set.insert(Handle::new("beta"));
        set.insert(Handle::new("ALPHA"));
        set.insert(Handle::new("Alpha"));
        assert_eq!(set.len(), 2);
        let in_order: Vec<&str> = set.iter().map(Handle::as_str).collect();
        assert_eq!(in_order, vec!["ALPHA", "beta"]);
    }

    #[test]
    fn unicode_folding() {
        assert_eq!(Handle::new("Küche"), Handle::new("KÜCHE"));
        assert_ne!(Handle::new("Küche"), Handle::new("Kuche"));
    }

    #[test]
    fn empty_handle() {
        assert!(Handle::new("").is_empty());
        assert!(!Handle::new("x").is_empty());
    }

    #[test]
    fn serde_is_transparent() {
        let h = Handle::new("MyCurve");
        let json = serde_json::to_string(&h).unwrap();
        assert_eq!(json, "\"MyCurve\"");
        let parsed: Handle = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, h);
        assert_eq!(parsed.as_str(), "MyCurve");
    }

    #[test]
    fn debug_format_shows_raw() {
        let h = Handle::new("MyCurve");
        assert_eq!(format!("{h:?}"), "Handle(\"MyCurve\")");
    }
}
