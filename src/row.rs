//! Driver row normalization.
//!
//! Flat selects return native `tokio_postgres` rows; the execution wrapper
//! normalizes them into JSON objects so both select paths hand the caller the
//! same row shape.

use tokio_postgres::Row;
use tokio_postgres::types::Type;

use crate::error::{RelqError, Result};

/// Converts one driver row into a JSON object keyed by column name.
///
/// Date and time columns render as RFC 3339-style strings. Types without a
/// dedicated mapping degrade to their textual form when the driver can read
/// them as `String`, else JSON null.
pub fn row_to_json(row: &Row) -> Result<serde_json::Value> {
    let mut object = serde_json::Map::with_capacity(row.len());
    for (idx, column) in row.columns().iter().enumerate() {
        object.insert(column.name().to_string(), column_to_json(row, idx)?);
    }
    Ok(serde_json::Value::Object(object))
}

fn column_to_json(row: &Row, idx: usize) -> Result<serde_json::Value> {
    use serde_json::Value as Json;

    let ty = row.columns()[idx].type_();
    let value = if *ty == Type::BOOL {
        read::<bool>(row, idx)?.map(Json::Bool)
    } else if *ty == Type::INT2 {
        read::<i16>(row, idx)?.map(Json::from)
    } else if *ty == Type::INT4 {
        read::<i32>(row, idx)?.map(Json::from)
    } else if *ty == Type::INT8 {
        read::<i64>(row, idx)?.map(Json::from)
    } else if *ty == Type::FLOAT4 {
        read::<f32>(row, idx)?.map(Json::from)
    } else if *ty == Type::FLOAT8 {
        read::<f64>(row, idx)?.map(Json::from)
    } else if *ty == Type::JSON || *ty == Type::JSONB {
        read::<serde_json::Value>(row, idx)?
    } else if *ty == Type::DATE {
        read::<chrono::NaiveDate>(row, idx)?.map(|d| Json::String(d.to_string()))
    } else if *ty == Type::TIME {
        read::<chrono::NaiveTime>(row, idx)?.map(|t| Json::String(t.to_string()))
    } else if *ty == Type::TIMESTAMP {
        read::<chrono::NaiveDateTime>(row, idx)?
            .map(|ts| Json::String(ts.format("%Y-%m-%dT%H:%M:%S%.f").to_string()))
    } else if *ty == Type::TIMESTAMPTZ {
        read::<chrono::DateTime<chrono::FixedOffset>>(row, idx)?
            .map(|ts| Json::String(ts.to_rfc3339()))
    } else {
        // TEXT, VARCHAR, CHAR, NAME, and anything else textual
        match row.try_get::<_, Option<String>>(idx) {
            Ok(text) => text.map(Json::String),
            Err(_) => None,
        }
    };
    Ok(value.unwrap_or(Json::Null))
}

fn read<'a, T>(row: &'a Row, idx: usize) -> Result<Option<T>>
where
    T: tokio_postgres::types::FromSql<'a>,
{
    row.try_get::<_, Option<T>>(idx).map_err(RelqError::execution)
}

/// Unwraps the single `jsonb_agg` cell a relationship query returns into the
/// final row vector. SQL NULL (no root rows) becomes an empty vector.
pub(crate) fn unwrap_aggregate(rows: &[Row]) -> Result<Vec<serde_json::Value>> {
    let Some(row) = rows.first() else {
        return Ok(Vec::new());
    };
    let aggregate = row
        .try_get::<_, Option<serde_json::Value>>(0)
        .map_err(RelqError::execution)?;
    match aggregate {
        None | Some(serde_json::Value::Null) => Ok(Vec::new()),
        Some(serde_json::Value::Array(items)) => Ok(items),
        Some(other) => Ok(vec![other]),
    }
}
