use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::Display;

/// Canonical identifier for a catalog movie
///
/// Interaction records and clients send movie ids either as strings or as
/// numbers, and the same movie may show up as `"550"`, `550` or `" 0550"`.
/// Every id is normalised here once, so lookups and exclusions can compare
/// keys directly:
/// - surrounding whitespace is trimmed
/// - values that parse as an integer are stored in plain decimal form
/// - anything else is kept as the trimmed string
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MovieKey(String);

impl MovieKey {
    pub fn new(raw: impl AsRef<str>) -> Self {
        let trimmed = raw.as_ref().trim();
        match trimmed.parse::<i64>() {
            Ok(numeric) => Self(numeric.to_string()),
            Err(_) => Self(trimmed.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for MovieKey {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

impl From<&str> for MovieKey {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<i64> for MovieKey {
    fn from(numeric: i64) -> Self {
        Self(numeric.to_string())
    }
}

impl Display for MovieKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for MovieKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for MovieKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawKey {
            Text(String),
            Signed(i64),
            Unsigned(u64),
        }

        Ok(match RawKey::deserialize(deserializer)? {
            RawKey::Text(text) => MovieKey::new(text),
            RawKey::Signed(n) => MovieKey::from(n),
            RawKey::Unsigned(n) => MovieKey(n.to_string()),
        })
    }
}
