//! # Operations
//!
//! The workload vocabulary: filter, join and aggregate, each optionally routed by a
//! shard key. A shard key means "the query's key matches the partition key", so the
//! operation touches a single server's share of the data; no key means a full scan
//! (or, for a join, a nested-loop cross product).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Discriminant of an [`Operation`], used to key the coefficient table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Filter,
    Join,
    Aggregate,
}

impl OperationKind {
    pub const ALL: [OperationKind; 3] = [
        OperationKind::Filter,
        OperationKind::Join,
        OperationKind::Aggregate,
    ];

    pub(crate) fn index(self) -> usize {
        match self {
            OperationKind::Filter => 0,
            OperationKind::Join => 1,
            OperationKind::Aggregate => 2,
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationKind::Filter => write!(f, "filter"),
            OperationKind::Join => write!(f, "join"),
            OperationKind::Aggregate => write!(f, "aggregate"),
        }
    }
}

/// One query operation to be costed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Operation {
    Filter {
        collection: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        shard_key: Option<String>,
    },
    Join {
        left: String,
        right: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        shard_key: Option<String>,
    },
    Aggregate {
        collection: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        shard_key: Option<String>,
    },
}

impl Operation {
    pub fn filter(collection: impl Into<String>, shard_key: Option<&str>) -> Self {
        Operation::Filter {
            collection: collection.into(),
            shard_key: shard_key.map(str::to_string),
        }
    }

    pub fn join(left: impl Into<String>, right: impl Into<String>, shard_key: Option<&str>) -> Self {
        Operation::Join {
            left: left.into(),
            right: right.into(),
            shard_key: shard_key.map(str::to_string),
        }
    }

    pub fn aggregate(collection: impl Into<String>, shard_key: Option<&str>) -> Self {
        Operation::Aggregate {
            collection: collection.into(),
            shard_key: shard_key.map(str::to_string),
        }
    }

    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::Filter { .. } => OperationKind::Filter,
            Operation::Join { .. } => OperationKind::Join,
            Operation::Aggregate { .. } => OperationKind::Aggregate,
        }
    }

    pub fn shard_key(&self) -> Option<&str> {
        match self {
            Operation::Filter { shard_key, .. }
            | Operation::Join { shard_key, .. }
            | Operation::Aggregate { shard_key, .. } => shard_key.as_deref(),
        }
    }

    pub fn is_sharded(&self) -> bool {
        self.shard_key().is_some()
    }

    /// Collections read by the operation, in operand order.
    pub fn collections(&self) -> Vec<&str> {
        match self {
            Operation::Filter { collection, .. } | Operation::Aggregate { collection, .. } => {
                vec![collection.as_str()]
            }
            Operation::Join { left, right, .. } => vec![left.as_str(), right.as_str()],
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind(), self.collections().join(" + "))?;
        match self.shard_key() {
            Some(key) => write!(f, " (sharded on {key})"),
            None => write!(f, " (unsharded)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_from_json() {
        let op: Operation = serde_json::from_str(
            r#"{"kind": "join", "left": "OrderLine", "right": "Product", "shard_key": "IDP"}"#,
        )
        .unwrap();
        assert_eq!(op, Operation::join("OrderLine", "Product", Some("IDP")));

        let op: Operation =
            serde_json::from_str(r#"{"kind": "filter", "collection": "Stock"}"#).unwrap();
        assert!(!op.is_sharded());
        assert_eq!(op.kind(), OperationKind::Filter);
    }

    #[test]
    fn test_display() {
        assert_eq!(
            Operation::join("OrderLine", "Product", Some("IDP")).to_string(),
            "join OrderLine + Product (sharded on IDP)"
        );
        assert_eq!(
            Operation::aggregate("OrderLine", None).to_string(),
            "aggregate OrderLine (unsharded)"
        );
    }
}
