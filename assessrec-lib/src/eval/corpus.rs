use std::collections::{HashMap, HashSet};

use crate::dataset::TrainingRow;
use crate::item::{Item, ItemId};

/// Labelled mapping from query text to its relevant items.
///
/// Used only to score recall, never for ranking. Query strings are matched
/// literally (after trimming). Order of first appearance is preserved for
/// both queries and items.
#[derive(Debug, Clone, Default)]
pub struct TrainingCorpus {
    queries: Vec<String>,
    relevant: HashMap<String, Vec<ItemId>>,
    items: Vec<ItemId>,
}

impl TrainingCorpus {
    /// Build from `(query, item)` pairs; pairs with a blank side are dropped.
    pub fn from_pairs<Q, I>(pairs: impl IntoIterator<Item = (Q, I)>) -> Self
    where
        Q: AsRef<str>,
        I: AsRef<str>,
    {
        let mut corpus = Self::default();
        let mut seen_items = HashSet::new();

        for (query, item) in pairs {
            let query = query.as_ref().trim();
            let item = item.as_ref().trim();
            if query.is_empty() || item.is_empty() {
                continue;
            }

            let id = ItemId::new(item);
            if seen_items.insert(id.clone()) {
                corpus.items.push(id.clone());
            }

            let entry = corpus.relevant.entry(query.to_string()).or_insert_with(|| {
                corpus.queries.push(query.to_string());
                Vec::new()
            });
            if !entry.contains(&id) {
                entry.push(id);
            }
        }

        corpus
    }

    pub fn from_rows(rows: &[TrainingRow]) -> Self {
        Self::from_pairs(rows.iter().map(|row| (&row.query, &row.item)))
    }

    /// Items labelled relevant for exactly this query string
    #[must_use]
    pub fn relevant_for(&self, query: &str) -> &[ItemId] {
        self.relevant
            .get(query.trim())
            .map_or(&[][..], Vec::as_slice)
    }

    /// Distinct training queries
    #[must_use]
    pub fn queries(&self) -> &[String] {
        &self.queries
    }

    /// Every distinct item mentioned in the corpus
    #[must_use]
    pub fn items(&self) -> &[ItemId] {
        &self.items
    }

    /// Corpus items as indexable items whose text is their identifier.
    #[must_use]
    pub fn to_items(&self) -> Vec<Item> {
        self.items
            .iter()
            .map(|id| Item::from_id(id.as_str()))
            .collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> TrainingCorpus {
        TrainingCorpus::from_pairs([
            ("java dev", "u1"),
            ("java dev", "u2"),
            ("sales", "u2"),
            ("java dev", "u1"),
            ("  ", "u9"),
            ("sales", " u3 "),
        ])
    }

    #[test]
    fn test_relevant_for() {
        let corpus = corpus();
        assert_eq!(corpus.relevant_for("java dev"), &[ItemId::new("u1"), ItemId::new("u2")]);
        assert_eq!(corpus.relevant_for(" sales "), &[ItemId::new("u2"), ItemId::new("u3")]);
        assert!(corpus.relevant_for("unknown").is_empty());
    }

    #[test]
    fn test_items_unique_in_first_seen_order() {
        let corpus = corpus();
        let ids: Vec<&str> = corpus.items().iter().map(ItemId::as_str).collect();
        assert_eq!(ids, vec!["u1", "u2", "u3"]);
    }

    #[test]
    fn test_queries_in_first_seen_order() {
        assert_eq!(corpus().queries(), &["java dev".to_string(), "sales".to_string()]);
    }

    #[test]
    fn test_to_items_uses_id_as_text() {
        let items = corpus().to_items();
        assert_eq!(items[0], Item::from_id("u1"));
    }
}
