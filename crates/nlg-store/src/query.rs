//! Equality predicates over nested JSON documents.

use serde_json::Value;

/// A predicate selecting documents in a table.
///
/// ```ignore
/// let q = Query::field("name").eq("G14");
/// let q = Query::field("device.provider").eq("ibm").and(Query::field("circuit_data.shots").eq(4000));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    /// Matches every document.
    Any,
    /// The value at a dotted path equals a constant.
    Eq { path: Vec<String>, value: Value },
    /// Both predicates match.
    And(Box<Query>, Box<Query>),
}

/// A dotted field path, the left-hand side of a comparison.
#[derive(Debug, Clone)]
pub struct Field {
    path: Vec<String>,
}

impl Field {
    pub fn eq(self, value: impl Into<Value>) -> Query {
        Query::Eq {
            path: self.path,
            value: value.into(),
        }
    }
}

impl Query {
    /// Start a predicate on a dotted path such as `device.name`.
    pub fn field(path: &str) -> Field {
        Field {
            path: path.split('.').map(str::to_string).collect(),
        }
    }

    pub fn and(self, other: Query) -> Query {
        Query::And(Box::new(self), Box::new(other))
    }

    /// Evaluate against a document.
    pub fn matches(&self, doc: &Value) -> bool {
        match self {
            Query::Any => true,
            Query::Eq { path, value } => lookup(doc, path).is_some_and(|v| v == value),
            Query::And(a, b) => a.matches(doc) && b.matches(doc),
        }
    }
}

fn lookup<'a>(doc: &'a Value, path: &[String]) -> Option<&'a Value> {
    path.iter().try_fold(doc, |node, key| node.get(key.as_str()))
}
