//! Introspection-result model and relationship-tree derivation.
//!
//! The compiler never queries `information_schema` itself; an external
//! collaborator introspects the database and hands over per-table column
//! lists and a foreign-key edge list in the shapes below. From those this
//! module derives [`Relationship`] trees and answers allow-list checks for
//! caller-supplied column names.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{RelqError, Result};
use crate::query::relation::{Cardinality, Relationship};

/// One introspected column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
    #[serde(default)]
    pub default: Option<String>,
}

/// One introspected foreign-key edge, in the wire shape the introspection
/// step produces. `cardinality` is `1:1` when the referencing column carries
/// a UNIQUE or PRIMARY KEY constraint, `1:M` otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeignKeyEdge {
    #[serde(rename = "ftable")]
    pub foreign_table: String,
    #[serde(rename = "fkey")]
    pub foreign_key: String,
    #[serde(rename = "ltable")]
    pub local_table: String,
    #[serde(rename = "lkey")]
    pub local_key: String,
    #[serde(rename = "relationship")]
    pub cardinality: Cardinality,
}

/// Aggregated introspection output for one database schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaInfo {
    tables: BTreeMap<String, Vec<ColumnInfo>>,
    edges: Vec<ForeignKeyEdge>,
}

impl SchemaInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_table(
        mut self,
        name: impl Into<String>,
        columns: impl IntoIterator<Item = ColumnInfo>,
    ) -> Self {
        self.tables
            .insert(name.into(), columns.into_iter().collect());
        self
    }

    pub fn add_edge(mut self, edge: ForeignKeyEdge) -> Self {
        self.edges.push(edge);
        self
    }

    pub fn columns(&self, table: &str) -> Option<&[ColumnInfo]> {
        self.tables.get(table).map(Vec::as_slice)
    }

    pub fn has_column(&self, table: &str, column: &str) -> bool {
        self.tables
            .get(table)
            .is_some_and(|columns| columns.iter().any(|c| c.name == column))
    }

    /// Allow-list check: every name must be an introspected column of
    /// `table`, otherwise the offending name fails as an invalid identifier.
    pub fn check_columns<'a>(
        &self,
        table: &str,
        names: impl IntoIterator<Item = &'a str>,
    ) -> Result<()> {
        for name in names {
            if !self.has_column(table, name) {
                return Err(RelqError::InvalidIdentifier(format!("{table}.{name}")));
            }
        }
        Ok(())
    }

    /// Derives the relationship tree rooted at `root`: every edge whose
    /// local table is the current table becomes a child, recursing through
    /// its foreign table.
    ///
    /// The edge list is a graph and cycles are not detected, so expansion is
    /// bounded by `max_depth` levels; `max_depth = 0` yields an empty tree.
    pub fn relationship_tree(&self, root: &str, max_depth: usize) -> Vec<Relationship> {
        if max_depth == 0 {
            return Vec::new();
        }
        self.edges
            .iter()
            .filter(|edge| edge.local_table == root)
            .map(|edge| {
                Relationship::new(
                    edge.foreign_table.clone(),
                    edge.foreign_key.clone(),
                    edge.local_table.clone(),
                    edge.local_key.clone(),
                    edge.cardinality,
                )
                .nested(self.relationship_tree(&edge.foreign_table, max_depth - 1))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(name: &str, data_type: &str) -> ColumnInfo {
        ColumnInfo {
            name: name.to_string(),
            data_type: data_type.to_string(),
            nullable: false,
            default: None,
        }
    }

    fn edge(ftable: &str, fkey: &str, ltable: &str, lkey: &str) -> ForeignKeyEdge {
        ForeignKeyEdge {
            foreign_table: ftable.to_string(),
            foreign_key: fkey.to_string(),
            local_table: ltable.to_string(),
            local_key: lkey.to_string(),
            cardinality: Cardinality::OneToMany,
        }
    }

    fn sample() -> SchemaInfo {
        SchemaInfo::new()
            .add_table("users", [column("id", "integer"), column("name", "text")])
            .add_table("posts", [column("id", "integer"), column("author_id", "integer")])
            .add_edge(edge("posts", "author_id", "users", "id"))
            .add_edge(edge("comments", "post_id", "posts", "id"))
    }

    #[test]
    fn derives_nested_tree_from_edges() {
        let tree = sample().relationship_tree("users", 3);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].foreign_table, "posts");
        assert_eq!(tree[0].nested.len(), 1);
        assert_eq!(tree[0].nested[0].foreign_table, "comments");
        assert!(tree[0].nested[0].nested.is_empty());
    }

    #[test]
    fn depth_bound_stops_recursion() {
        let tree = sample().relationship_tree("users", 1);
        assert_eq!(tree.len(), 1);
        assert!(tree[0].nested.is_empty());
        assert!(sample().relationship_tree("users", 0).is_empty());
    }

    #[test]
    fn self_referential_edges_terminate_at_the_bound() {
        let schema = SchemaInfo::new().add_edge(edge("users", "invited_by", "users", "id"));
        let tree = schema.relationship_tree("users", 3);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].nested.len(), 1);
        assert_eq!(tree[0].nested[0].nested.len(), 1);
        assert!(tree[0].nested[0].nested[0].nested.is_empty());
    }

    #[test]
    fn column_allow_list() {
        let schema = sample();
        assert!(schema.check_columns("users", ["id", "name"]).is_ok());
        let err = schema.check_columns("users", ["id", "password"]).unwrap_err();
        assert!(matches!(err, RelqError::InvalidIdentifier(name) if name == "users.password"));
    }
}
