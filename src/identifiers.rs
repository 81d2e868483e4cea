//! Domain identifier types.
//!
//! A [`StateKey`] is the only identity a game state has once it leaves the
//! game model: Q-table rows, visit counts and reachability nodes are all keyed
//! by it, and external collaborators treat it as an opaque string.

use std::{borrow::Borrow, fmt};

use serde::{Deserialize, Serialize};

/// Compact string key for a [`GameState`](crate::game::GameState).
///
/// Keys are produced by [`encode`](crate::game::codec::encode) and serialize as
/// plain strings, so a `HashMap<StateKey, _>` becomes a JSON object.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateKey(String);

impl StateKey {
    /// Create a state key from any string.
    ///
    /// No validation happens here; keys loaded from storage may be malformed
    /// and are decoded leniently by [`decode`](crate::game::codec::decode).
    ///
    /// # Examples
    ///
    /// ```
    /// use skirmish::identifiers::StateKey;
    ///
    /// let key = StateKey::new("30|0|30|0|0");
    /// assert_eq!(key.as_str(), "30|0|30|0|0");
    /// ```
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Get the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Convert the key into its inner String.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl PartialEq<&str> for StateKey {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

impl PartialEq<StateKey> for &str {
    fn eq(&self, other: &StateKey) -> bool {
        *self == other.as_str()
    }
}

impl From<&str> for StateKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for StateKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Borrow<str> for StateKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for StateKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn test_state_key_equality_with_str() {
        let key = StateKey::new("1|2|3|4|5");
        assert_eq!(key, "1|2|3|4|5");
        assert_eq!("1|2|3|4|5", key);
    }

    #[test]
    fn test_state_key_lookup_by_str() {
        let mut map = HashMap::new();
        map.insert(StateKey::new("30|0|30|0|0"), 7);
        assert_eq!(map.get("30|0|30|0|0"), Some(&7));
    }

    #[test]
    fn test_state_key_serializes_as_plain_string() {
        let key = StateKey::new("30|1|24|0|3");
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, "\"30|1|24|0|3\"");
    }
}
