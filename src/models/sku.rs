use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque, case-sensitive stock-keeping unit identifier.
///
/// Wrapped in a newtype rather than passed around as a bare `String` so
/// planner signatures can't be confused with bin codes, lot numbers, or
/// operation ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Sku(pub String);

impl Sku {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Sku {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Sku {
    fn from(value: &str) -> Self {
        Sku(value.to_string())
    }
}

impl From<String> for Sku {
    fn from(value: String) -> Self {
        Sku(value)
    }
}
