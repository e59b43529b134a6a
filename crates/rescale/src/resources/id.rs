use serde::{Deserialize, Serialize};
use std::fmt;

/// Server-assigned resource identifier.
///
/// Rescale ids are short strings (`"kJbOw"`), but some nested records carry
/// numeric ids, so both forms are accepted and rendered verbatim in paths.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResourceId {
    Text(String),
    Number(i64),
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceId::Text(id) => f.write_str(id),
            ResourceId::Number(id) => write!(f, "{}", id),
        }
    }
}

impl From<&str> for ResourceId {
    fn from(id: &str) -> Self {
        ResourceId::Text(id.to_string())
    }
}

impl From<String> for ResourceId {
    fn from(id: String) -> Self {
        ResourceId::Text(id)
    }
}

impl From<&String> for ResourceId {
    fn from(id: &String) -> Self {
        ResourceId::Text(id.clone())
    }
}

impl From<i64> for ResourceId {
    fn from(id: i64) -> Self {
        ResourceId::Number(id)
    }
}

impl From<&ResourceId> for ResourceId {
    fn from(id: &ResourceId) -> Self {
        id.clone()
    }
}
