//! Relationship trees and the correlated-subquery compiler.
//!
//! A [`Relationship`] describes one foreign-key edge to traverse when
//! expanding a row; a sequence of them forms the expansion tree rooted at the
//! queried table. Compilation walks the tree depth-first and emits one
//! statement whose subqueries aggregate nested rows server-side, so the whole
//! expansion costs a single round trip instead of an N+1 fan-out.
//!
//! The generated shape, for a root table `u`:
//!
//! ```sql
//! WITH table_data AS (
//!   SELECT u.*, COALESCE((SELECT jsonb_agg(row_to_json(posts_0)::jsonb)
//!     FROM app.posts AS posts_0
//!     WHERE posts_0.author_id = u.id), '[]'::jsonb) AS posts
//!   FROM app.users AS u
//!   WHERE u.active = $1
//!   GROUP BY u.id
//!   LIMIT $2
//! )
//! SELECT jsonb_agg(row_to_json(table_data)::jsonb) FROM table_data
//! ```

use std::fmt::Write;

use serde::{Deserialize, Serialize};

use crate::error::{RelqError, Result};
use crate::query::QueryOptions;
use crate::query::tail::compile_tail;
use crate::sql::{CompiledQuery, ParamCursor, check_ident};

/// One-to-one vs one-to-many classification of a foreign-key edge.
///
/// Drives the aggregation fallback shape: an empty one-to-one expansion
/// coalesces to `{}`, an empty one-to-many to `[]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cardinality {
    #[serde(rename = "1:1")]
    OneToOne,
    #[serde(rename = "1:M")]
    OneToMany,
}

impl Cardinality {
    fn fallback(self) -> &'static str {
        match self {
            Cardinality::OneToOne => "'{}'::jsonb",
            Cardinality::OneToMany => "'[]'::jsonb",
        }
    }
}

/// One foreign-key edge in a relationship tree.
///
/// Serde names match the introspection wire shape the edges arrive in
/// (`ftable`/`fkey`/`ltable`/`lkey`/`relationship`). The tree is immutable
/// during compilation; cycles are not detected, so derivation from a schema
/// must bound the depth (see [`SchemaInfo::relationship_tree`]).
///
/// [`SchemaInfo::relationship_tree`]: crate::schema::SchemaInfo::relationship_tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
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
    #[serde(rename = "relationships", default, skip_serializing_if = "Vec::is_empty")]
    pub nested: Vec<Relationship>,
}

impl Relationship {
    pub fn new(
        foreign_table: impl Into<String>,
        foreign_key: impl Into<String>,
        local_table: impl Into<String>,
        local_key: impl Into<String>,
        cardinality: Cardinality,
    ) -> Self {
        Self {
            foreign_table: foreign_table.into(),
            foreign_key: foreign_key.into(),
            local_table: local_table.into(),
            local_key: local_key.into(),
            cardinality,
            nested: Vec::new(),
        }
    }

    pub fn one_to_one(
        foreign_table: impl Into<String>,
        foreign_key: impl Into<String>,
        local_table: impl Into<String>,
        local_key: impl Into<String>,
    ) -> Self {
        Self::new(
            foreign_table,
            foreign_key,
            local_table,
            local_key,
            Cardinality::OneToOne,
        )
    }

    pub fn one_to_many(
        foreign_table: impl Into<String>,
        foreign_key: impl Into<String>,
        local_table: impl Into<String>,
        local_key: impl Into<String>,
    ) -> Self {
        Self::new(
            foreign_table,
            foreign_key,
            local_table,
            local_key,
            Cardinality::OneToMany,
        )
    }

    /// Attaches nested edges to expand below this one.
    ///
    /// Aliases are `{foreign_table}_{sibling_index}`, so they are unique
    /// within one tree level but not across levels. A one-to-one edge that
    /// nests an edge onto the same foreign table (a self-referential chain
    /// like `users -> users`) reuses the parent's alias and the inner
    /// correlation collapses to a self-comparison; expand such chains one
    /// level at a time instead.
    pub fn nested(mut self, nested: impl IntoIterator<Item = Relationship>) -> Self {
        self.nested = nested.into_iter().collect();
        self
    }

    fn check_idents(&self) -> Result<()> {
        check_ident(&self.foreign_table)?;
        check_ident(&self.foreign_key)?;
        check_ident(&self.local_table)?;
        check_ident(&self.local_key)?;
        for nested in &self.nested {
            nested.check_idents()?;
        }
        Ok(())
    }
}

/// Compiles a relationship-expanding select into a single statement whose one
/// result row holds the whole result set as a JSON array (SQL NULL when the
/// root table matches nothing).
///
/// The root filter compiles through the general filter compiler against the
/// root alias; all values bind as positional parameters, filter first, then
/// limit/offset, numbered contiguously from `$1`.
pub fn compile_relationship_query(
    schema: &str,
    relationships: &[Relationship],
    options: &QueryOptions,
) -> Result<CompiledQuery> {
    let Some(root) = relationships.first() else {
        return Err(RelqError::InvalidFilter {
            received: "[]".to_string(),
            expected: "at least one relationship edge".to_string(),
        });
    };
    check_ident(schema)?;
    for relationship in relationships {
        relationship.check_idents()?;
    }

    // check_ident guarantees an ASCII first byte.
    let alias = &root.local_table[..1];

    let mut cursor = ParamCursor::new();
    let mut params = Vec::new();

    let mut where_clause = String::new();
    if let Some(filter) = &options.filter {
        let fragment = filter.compile(alias, &mut cursor)?;
        if !fragment.sql.is_empty() {
            where_clause = format!("WHERE {}", fragment.sql);
            params.extend(fragment.params);
        }
    }

    let tail = compile_tail(options, &mut cursor)?;
    params.extend(tail.params);

    let subqueries = render_edges(schema, relationships, None)?;

    let mut body = vec![
        format!("SELECT {alias}.*,"),
        subqueries,
        format!("FROM {schema}.{} AS {alias}", root.local_table),
    ];
    if !where_clause.is_empty() {
        body.push(where_clause);
    }
    body.push(format!("GROUP BY {alias}.{}", root.local_key));
    if !tail.sql.is_empty() {
        body.push(tail.sql);
    }

    let sql = format!(
        "WITH table_data AS (\n{}\n)\nSELECT jsonb_agg(row_to_json(table_data)::jsonb)\nFROM table_data",
        body.join("\n")
    );

    Ok(CompiledQuery::new(sql, params))
}

/// Renders the edges at one tree level, comma-joined.
///
/// At the root level (`parent` is `None`) each edge becomes a named output
/// column (`... AS ftable`); below the root each edge becomes a
/// `'ftable', <subquery>` pair inside the enclosing `jsonb_build_object`.
fn render_edges(
    schema: &str,
    edges: &[Relationship],
    parent: Option<&str>,
) -> Result<String> {
    let root_alias = edges
        .first()
        .map(|edge| &edge.local_table[..1])
        .unwrap_or_default();

    let mut fragments = Vec::with_capacity(edges.len());
    for (idx, edge) in edges.iter().enumerate() {
        let alias = format!("{}_{idx}", edge.foreign_table);
        let parent_ref = parent.unwrap_or(root_alias);

        let expand_nested =
            !edge.nested.is_empty() && edge.cardinality == Cardinality::OneToOne;

        let mut sql = String::new();
        if expand_nested {
            // A present row merges with its nested expansion; a missing row
            // falls back to SQL NULL rather than the cardinality shape.
            let nested = render_edges(schema, &edge.nested, Some(&alias))?;
            let _ = write!(
                sql,
                "COALESCE((SELECT row_to_json({alias})::jsonb || jsonb_build_object({nested}) \
                 FROM {schema}.{} AS {alias} \
                 WHERE {alias}.{} = {parent_ref}.{}), NULL)",
                edge.foreign_table, edge.foreign_key, edge.local_key,
            );
        } else {
            // One-to-many edges aggregate flat; nested edges below them are
            // not expanded.
            let _ = write!(
                sql,
                "COALESCE((SELECT jsonb_agg(row_to_json({alias})::jsonb) \
                 FROM {schema}.{} AS {alias} \
                 WHERE {alias}.{} = {parent_ref}.{}), {})",
                edge.foreign_table,
                edge.foreign_key,
                edge.local_key,
                edge.cardinality.fallback(),
            );
        }

        fragments.push(if parent.is_some() {
            format!("'{}', {sql}", edge.foreign_table)
        } else {
            format!("{sql} AS {}", edge.foreign_table)
        });
    }

    Ok(fragments.join(",\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::filter::Filter;
    use crate::query::tail::SortDirection;
    use crate::values::Value;
    use serde_json::json;

    fn posts_edge() -> Relationship {
        Relationship::one_to_many("posts", "author_id", "users", "id")
    }

    #[test]
    fn single_one_to_many_edge() {
        let compiled =
            compile_relationship_query("app", &[posts_edge()], &QueryOptions::new()).unwrap();
        assert_eq!(
            compiled.sql,
            "WITH table_data AS (\n\
             SELECT u.*,\n\
             COALESCE((SELECT jsonb_agg(row_to_json(posts_0)::jsonb) \
             FROM app.posts AS posts_0 \
             WHERE posts_0.author_id = u.id), '[]'::jsonb) AS posts\n\
             FROM app.users AS u\n\
             GROUP BY u.id\n\
             )\n\
             SELECT jsonb_agg(row_to_json(table_data)::jsonb)\n\
             FROM table_data"
        );
        assert!(compiled.params.is_empty());
    }

    #[test]
    fn one_to_one_edge_without_nesting_keeps_object_fallback() {
        let edge = Relationship::one_to_one("profiles", "user_id", "users", "id");
        let compiled =
            compile_relationship_query("app", &[edge], &QueryOptions::new()).unwrap();
        assert!(compiled.sql.contains("'{}'::jsonb) AS profiles"));
        assert!(compiled.sql.contains("jsonb_agg(row_to_json(profiles_0)::jsonb)"));
    }

    #[test]
    fn nested_one_to_one_merges_row_with_nested_object() {
        let edge = Relationship::one_to_one("accounts", "user_id", "users", "id").nested([
            Relationship::one_to_many("invoices", "account_id", "accounts", "id"),
        ]);
        let compiled =
            compile_relationship_query("app", &[edge], &QueryOptions::new()).unwrap();
        assert!(compiled.sql.contains(
            "COALESCE((SELECT row_to_json(accounts_0)::jsonb || jsonb_build_object(\
             'invoices', COALESCE((SELECT jsonb_agg(row_to_json(invoices_0)::jsonb) \
             FROM app.invoices AS invoices_0 \
             WHERE invoices_0.account_id = accounts_0.id), '[]'::jsonb)) \
             FROM app.accounts AS accounts_0 \
             WHERE accounts_0.user_id = u.id), NULL) AS accounts"
        ));
    }

    #[test]
    fn nested_edges_below_one_to_many_are_not_expanded() {
        let edge = posts_edge().nested([Relationship::one_to_many(
            "comments", "post_id", "posts", "id",
        )]);
        let compiled =
            compile_relationship_query("app", &[edge], &QueryOptions::new()).unwrap();
        assert!(!compiled.sql.contains("comments"));
    }

    #[test]
    fn sibling_edges_get_positional_aliases() {
        let edges = [
            posts_edge(),
            Relationship::one_to_many("likes", "user_id", "users", "id"),
        ];
        let compiled =
            compile_relationship_query("app", &edges, &QueryOptions::new()).unwrap();
        assert!(compiled.sql.contains("app.posts AS posts_0"));
        assert!(compiled.sql.contains("app.likes AS likes_1"));
    }

    #[test]
    fn each_edge_correlates_on_its_own_local_key() {
        let edges = [
            posts_edge(),
            Relationship::one_to_many("badges", "owner_email", "users", "email"),
        ];
        let compiled =
            compile_relationship_query("app", &edges, &QueryOptions::new()).unwrap();
        assert!(compiled.sql.contains("posts_0.author_id = u.id"));
        assert!(compiled.sql.contains("badges_1.owner_email = u.email"));
        // GROUP BY still keys on the first edge's local key.
        assert!(compiled.sql.contains("GROUP BY u.id"));
    }

    #[test]
    fn self_referential_nesting_reuses_the_level_alias() {
        // users -> users -> users: both expanded levels alias as users_0, so
        // the inner correlation degenerates to a self-comparison. Documented
        // limitation of the per-level alias scheme.
        let edge = Relationship::one_to_one("users", "invited_by", "users", "id")
            .nested([Relationship::one_to_one("users", "invited_by", "users", "id")]);
        let compiled =
            compile_relationship_query("app", &[edge], &QueryOptions::new()).unwrap();
        assert!(compiled.sql.contains("users_0.invited_by = u.id"));
        assert!(compiled.sql.contains("users_0.invited_by = users_0.id"));
    }

    #[test]
    fn filter_params_bind_before_tail_params() {
        let options = QueryOptions::new()
            .filter(Filter::from_json(&json!({"active": true, "age": {"$gt": 21}})).unwrap())
            .sort("name", SortDirection::Asc)
            .limit(10)
            .skip(5);
        let compiled = compile_relationship_query("app", &[posts_edge()], &options).unwrap();
        assert!(compiled.sql.contains("WHERE u.active = $1 AND u.age > $2"));
        assert!(compiled.sql.contains("ORDER BY name ASC LIMIT $3 OFFSET $4"));
        assert_eq!(
            compiled.params,
            vec![
                Value::Boolean(true),
                Value::Bigint(21),
                Value::Bigint(10),
                Value::Bigint(5),
            ]
        );
    }

    #[test]
    fn compilation_is_deterministic() {
        let edge = Relationship::one_to_one("accounts", "user_id", "users", "id")
            .nested([posts_edge()]);
        let options = QueryOptions::new()
            .filter(Filter::new().field("active", true))
            .limit(3);
        let first = compile_relationship_query("app", &[edge.clone()], &options).unwrap();
        let second = compile_relationship_query("app", &[edge], &options).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn empty_tree_is_rejected() {
        assert!(matches!(
            compile_relationship_query("app", &[], &QueryOptions::new()),
            Err(RelqError::InvalidFilter { .. })
        ));
    }

    #[test]
    fn relationship_idents_are_validated() {
        let edge = Relationship::one_to_many("posts; --", "author_id", "users", "id");
        assert!(matches!(
            compile_relationship_query("app", &[edge], &QueryOptions::new()),
            Err(RelqError::InvalidIdentifier(_))
        ));
    }

    #[test]
    fn deserializes_introspection_wire_shape() {
        let value = json!({
            "ftable": "posts",
            "fkey": "author_id",
            "ltable": "users",
            "lkey": "id",
            "relationship": "1:M",
            "relationships": [{
                "ftable": "comments",
                "fkey": "post_id",
                "ltable": "posts",
                "lkey": "id",
                "relationship": "1:1"
            }]
        });
        let relationship: Relationship = serde_json::from_value(value).unwrap();
        assert_eq!(relationship.cardinality, Cardinality::OneToMany);
        assert_eq!(relationship.nested.len(), 1);
        assert_eq!(relationship.nested[0].cardinality, Cardinality::OneToOne);
    }
}
