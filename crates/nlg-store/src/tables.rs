//! In-memory table layout shared by the store implementations.

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{StoreError, StoreResult};
use crate::query::Query;

/// Documents of one table keyed by id.
pub(crate) type Table = BTreeMap<u64, Value>;

/// All tables of a database: `{"table": {"1": {...}, "2": {...}}}`.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub(crate) struct Tables {
    tables: FxHashMap<String, Table>,
}

impl Tables {
    pub(crate) fn insert(&mut self, table: &str, doc: Value) -> StoreResult<u64> {
        if !doc.is_object() {
            return Err(StoreError::InvalidDocument(format!(
                "expected a JSON object, got {doc}"
            )));
        }

        let table = self.tables.entry(table.to_string()).or_default();
        let id = table.keys().next_back().map_or(1, |last| last + 1);
        table.insert(id, doc);
        Ok(id)
    }

    pub(crate) fn search(&self, table: &str, query: &Query) -> Vec<(u64, Value)> {
        self.tables
            .get(table)
            .map(|docs| {
                docs.iter()
                    .filter(|(_, doc)| query.matches(doc))
                    .map(|(id, doc)| (*id, doc.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Merge the top-level keys of `partial` into each listed document.
    pub(crate) fn update(&mut self, table: &str, partial: &Value, ids: &[u64]) -> StoreResult<()> {
        let fields = partial.as_object().ok_or_else(|| {
            StoreError::InvalidDocument(format!("update must be a JSON object, got {partial}"))
        })?;

        let not_found = |id: u64| StoreError::DocumentNotFound {
            table: table.to_string(),
            id,
        };

        let docs = self.tables.get_mut(table);
        let Some(docs) = docs else {
            return match ids.first() {
                Some(id) => Err(not_found(*id)),
                None => Ok(()),
            };
        };

        // Validate first so a missing id leaves the table untouched.
        if let Some(missing) = ids.iter().find(|id| !docs.contains_key(id)) {
            return Err(not_found(*missing));
        }

        for id in ids {
            if let Some(Value::Object(doc)) = docs.get_mut(id) {
                for (key, value) in fields {
                    doc.insert(key.clone(), value.clone());
                }
            }
        }
        Ok(())
    }

    pub(crate) fn all(&self, table: &str) -> Vec<(u64, Value)> {
        self.search(table, &Query::Any)
    }

    /// Serialised form with sorted table names.
    pub(crate) fn to_sorted(&self) -> BTreeMap<&str, &Table> {
        self.tables
            .iter()
            .map(|(name, table)| (name.as_str(), table))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ids_increase_from_one() {
        let mut tables = Tables::default();
        assert_eq!(tables.insert("games", json!({"name": "a"})).unwrap(), 1);
        assert_eq!(tables.insert("games", json!({"name": "b"})).unwrap(), 2);
        assert_eq!(tables.insert("experiments", json!({})).unwrap(), 1);
    }

    #[test]
    fn test_rejects_non_objects() {
        let mut tables = Tables::default();
        assert!(tables.insert("games", json!([1, 2])).is_err());
    }

    #[test]
    fn test_update_missing_id_is_atomic() {
        let mut tables = Tables::default();
        tables.insert("t", json!({"a": 1})).unwrap();
        let err = tables.update("t", &json!({"a": 2}), &[1, 7]).unwrap_err();
        assert!(matches!(err, StoreError::DocumentNotFound { id: 7, .. }));
        assert_eq!(tables.all("t")[0].1["a"], 1);
    }

    #[test]
    fn test_update_merges_top_level_keys() {
        let mut tables = Tables::default();
        let id = tables.insert("t", json!({"a": 1, "b": {"x": 1, "y": 2}})).unwrap();
        tables.update("t", &json!({"b": {"x": 5}}), &[id]).unwrap();
        let doc = &tables.all("t")[0].1;
        assert_eq!(doc["a"], 1);
        assert_eq!(doc["b"], json!({"x": 5}));
    }
}
