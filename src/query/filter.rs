//! Filter expression model and WHERE-clause compilation.
//!
//! A [`Filter`] is an ordered sequence of field conditions and logical
//! combinators. Compilation walks the tree depth-first with a shared
//! [`ParamCursor`], emitting one comparison per condition and cloning its
//! value into the positional parameter list. Iteration order equals insertion
//! order, so identical input compiles to byte-identical SQL.

use std::fmt::Write;

use crate::error::{RelqError, Result};
use crate::sql::{ParamCursor, check_ident};
use crate::values::Value;

/// Comparison operators accepted in filter conditions.
///
/// The set is closed; JSON filters using any other `$` key are rejected at
/// construction time with [`RelqError::UnknownOperator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
}

impl Comparison {
    /// The SQL comparison symbol.
    pub fn symbol(self) -> &'static str {
        match self {
            Comparison::Eq => "=",
            Comparison::Neq => "<>",
            Comparison::Lt => "<",
            Comparison::Lte => "<=",
            Comparison::Gt => ">",
            Comparison::Gte => ">=",
        }
    }

    /// Maps a `$`-prefixed operator key to its operator.
    pub fn from_key(key: &str) -> Result<Self> {
        match key {
            "$eq" => Ok(Comparison::Eq),
            "$neq" => Ok(Comparison::Neq),
            "$lt" => Ok(Comparison::Lt),
            "$lte" => Ok(Comparison::Lte),
            "$gt" => Ok(Comparison::Gt),
            "$gte" => Ok(Comparison::Gte),
            _ => Err(RelqError::UnknownOperator(key.to_string())),
        }
    }
}

/// One condition on a single field: either a literal (implicit equality) or
/// an ordered list of comparisons, which compile ANDed together.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Predicate {
    Literal(Value),
    Compare(Vec<(Comparison, Value)>),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum FilterNode {
    Field { name: String, predicate: Predicate },
    And(Vec<Filter>),
    Or(Vec<Filter>),
}

/// A declarative predicate over one table's rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    nodes: Vec<FilterNode>,
}

/// A compiled WHERE fragment plus the values it binds.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterFragment {
    pub sql: String,
    pub params: Vec<Value>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an implicit-equality condition on a field.
    pub fn field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.nodes.push(FilterNode::Field {
            name: name.into(),
            predicate: Predicate::Literal(value.into()),
        });
        self
    }

    /// Adds a single comparison condition on a field.
    pub fn compare(
        mut self,
        name: impl Into<String>,
        op: Comparison,
        value: impl Into<Value>,
    ) -> Self {
        self.nodes.push(FilterNode::Field {
            name: name.into(),
            predicate: Predicate::Compare(vec![(op, value.into())]),
        });
        self
    }

    /// Adds an `$and` combinator over nested filters.
    pub fn and(mut self, filters: impl IntoIterator<Item = Filter>) -> Self {
        self.nodes.push(FilterNode::And(filters.into_iter().collect()));
        self
    }

    /// Adds an `$or` combinator over nested filters.
    pub fn or(mut self, filters: impl IntoIterator<Item = Filter>) -> Self {
        self.nodes.push(FilterNode::Or(filters.into_iter().collect()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Parses the JSON filter shape, preserving key order.
    ///
    /// Field keys map to literal conditions or condition objects; `$and` and
    /// `$or` take arrays of nested filters. Unknown `$` keys fail with
    /// [`RelqError::UnknownOperator`]; non-object input fails with
    /// [`RelqError::InvalidFilter`].
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        let serde_json::Value::Object(map) = value else {
            return Err(RelqError::InvalidFilter {
                received: value.to_string(),
                expected: "a JSON object of field conditions".to_string(),
            });
        };

        let mut nodes = Vec::with_capacity(map.len());
        for (key, entry) in map {
            let key = key.as_str();
            if key == "$and" || key == "$or" {
                let serde_json::Value::Array(members) = entry else {
                    return Err(RelqError::InvalidFilter {
                        received: entry.to_string(),
                        expected: format!("an array of filters under {key:?}"),
                    });
                };
                let filters = members
                    .iter()
                    .map(Filter::from_json)
                    .collect::<Result<Vec<_>>>()?;
                nodes.push(if key == "$and" {
                    FilterNode::And(filters)
                } else {
                    FilterNode::Or(filters)
                });
            } else if let Some(op) = key.strip_prefix('$') {
                return Err(RelqError::UnknownOperator(format!("${op}")));
            } else if let serde_json::Value::Object(conditions) = entry {
                let pairs = conditions
                    .iter()
                    .map(|(op_key, op_value)| {
                        Ok((Comparison::from_key(op_key)?, Value::from(op_value)))
                    })
                    .collect::<Result<Vec<_>>>()?;
                nodes.push(FilterNode::Field {
                    name: key.to_string(),
                    predicate: Predicate::Compare(pairs),
                });
            } else {
                nodes.push(FilterNode::Field {
                    name: key.to_string(),
                    predicate: Predicate::Literal(Value::from(entry)),
                });
            }
        }
        Ok(Self { nodes })
    }

    /// Compiles the filter into a WHERE fragment against `qualifier`,
    /// advancing `cursor` by one slot per bound value.
    pub fn compile(&self, qualifier: &str, cursor: &mut ParamCursor) -> Result<FilterFragment> {
        let mut params = Vec::new();
        let sql = self.render(qualifier, cursor, &mut params)?;
        Ok(FilterFragment { sql, params })
    }

    fn render(
        &self,
        qualifier: &str,
        cursor: &mut ParamCursor,
        params: &mut Vec<Value>,
    ) -> Result<String> {
        let mut conditions: Vec<String> = Vec::with_capacity(self.nodes.len());
        for node in &self.nodes {
            let rendered = match node {
                FilterNode::Field { name, predicate } => {
                    check_ident(name)?;
                    render_field(qualifier, name, predicate, cursor, params)
                }
                FilterNode::And(members) => {
                    render_combinator(members, " AND ", qualifier, cursor, params)?
                }
                FilterNode::Or(members) => {
                    render_combinator(members, " OR ", qualifier, cursor, params)?
                }
            };
            if !rendered.is_empty() {
                conditions.push(rendered);
            }
        }
        Ok(conditions.join(" AND "))
    }
}

fn render_field(
    qualifier: &str,
    name: &str,
    predicate: &Predicate,
    cursor: &mut ParamCursor,
    params: &mut Vec<Value>,
) -> String {
    let mut sql = String::new();
    match predicate {
        Predicate::Literal(value) => {
            let _ = write!(sql, "{qualifier}.{name} = ${}", cursor.take());
            params.push(value.clone());
        }
        Predicate::Compare(pairs) => {
            for (i, (op, value)) in pairs.iter().enumerate() {
                if i > 0 {
                    sql.push_str(" AND ");
                }
                let _ = write!(sql, "{qualifier}.{name} {} ${}", op.symbol(), cursor.take());
                params.push(value.clone());
            }
        }
    }
    sql
}

fn render_combinator(
    members: &[Filter],
    joiner: &str,
    qualifier: &str,
    cursor: &mut ParamCursor,
    params: &mut Vec<Value>,
) -> Result<String> {
    let mut parts = Vec::with_capacity(members.len());
    for member in members {
        let inner = member.render(qualifier, cursor, params)?;
        if !inner.is_empty() {
            parts.push(format!("({inner})"));
        }
    }
    Ok(parts.join(joiner))
}
