//! Catalog items
//!
//! An item is what gets recommended: an opaque identifier (typically the
//! assessment's catalog URL) plus the text that is both embedded and scanned
//! for keywords. Identity is the identifier alone; two items with the same
//! text but different identifiers are distinct.

use std::borrow::Borrow;
use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque identifier of a catalog item
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ItemId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Borrow<str> for ItemId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// A catalog entry with its descriptive text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Unique identifier for this item
    pub id: ItemId,
    /// Text that is embedded and keyword-scanned
    pub text: String,
}

impl Item {
    pub fn new(id: impl Into<ItemId>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }

    /// An item whose identifier doubles as its descriptive text.
    ///
    /// Catalog URLs usually carry the assessment name in their slug, so this
    /// is what gets indexed when no separate catalog text is available.
    pub fn from_id(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            text: id.clone(),
            id: ItemId(id),
        }
    }
}

/// `items` with repeated identifiers dropped, keeping each first occurrence.
pub fn unique_by_id(items: &[Item]) -> Vec<&Item> {
    let mut seen = HashSet::with_capacity(items.len());
    let unique: Vec<&Item> = items.iter().filter(|&item| seen.insert(&item.id)).collect();

    if unique.len() < items.len() {
        tracing::warn!(
            dropped = items.len() - unique.len(),
            "skipping items with duplicate identifiers"
        );
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_id_uses_id_as_text() {
        let item = Item::from_id("https://example.com/java-8-new");
        assert_eq!(item.id.as_str(), "https://example.com/java-8-new");
        assert_eq!(item.text, "https://example.com/java-8-new");
    }

    #[test]
    fn test_identity_is_identifier() {
        let a = Item::new("a", "same text");
        let b = Item::new("b", "same text");
        assert_ne!(a, b);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let id = ItemId::new("x");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"x\"");
    }

    #[test]
    fn test_unique_by_id_keeps_first() {
        let items = vec![
            Item::new("a", "first"),
            Item::new("b", "other"),
            Item::new("a", "second"),
        ];
        let unique = unique_by_id(&items);
        assert_eq!(unique.len(), 2);
        assert_eq!(unique[0].text, "first");
        assert_eq!(unique[1].id.as_str(), "b");
    }
}
