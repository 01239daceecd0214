//! StationId - shared station identifier

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// Station identifier, ordered and compared by its string value
///
/// Every packet, analysis, summary and map key of a station carries the id,
/// so the string is shared instead of copied.
#[derive(Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct StationId(Arc<str>);

impl StationId {
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Deref for StationId {
    type Target = str;

    #[inline]
    fn deref(&self) -> &str {
        &self.0
    }
}

// lookups in BTreeMap<StationId, _> by &str
impl Borrow<str> for StationId {
    #[inline]
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for StationId {
    fn from(s: &str) -> Self {
        Self(s.into())
    }
}

impl From<String> for StationId {
    fn from(s: String) -> Self {
        Self(s.into())
    }
}

impl From<StationId> for String {
    fn from(id: StationId) -> Self {
        id.0.to_string()
    }
}

impl fmt::Display for StationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for StationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StationId({:?})", &*self.0)
    }
}

impl PartialEq<str> for StationId {
    fn eq(&self, other: &str) -> bool {
        &*self.0 == other
    }
}

impl PartialEq<&str> for StationId {
    fn eq(&self, other: &&str) -> bool {
        &*self.0 == *other
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{BTreeMap, BTreeSet};

    #[test]
    fn test_ordered_lookup_by_str() {
        let ids: BTreeSet<StationId> = ["1637610023", "1637610021", "1637610022"]
            .into_iter()
            .map(StationId::from)
            .collect();
        let ordered: Vec<&str> = ids.iter().map(StationId::as_str).collect();
        assert_eq!(ordered, vec!["1637610021", "1637610022", "1637610023"]);

        let stations: BTreeMap<StationId, usize> = ids.into_iter().zip(0..).collect();
        assert_eq!(stations.get("1637610022"), Some(&1));
    }

    #[test]
    fn test_serialized_as_plain_string() {
        let id = StationId::from("1637610021");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"1637610021\"");

        let parsed: StationId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
        assert_eq!(parsed, "1637610021");
    }
}
