use crate::aggregation::Aggregator;
use crate::types::{AggregationError, Total, Value};
use anyhow::Result;
use std::collections::{BTreeMap, BTreeSet};

/// A query-executing cursor: the capability the row adapters consume.
///
/// Implementations run a query, report the result column names, and hand
/// back every row as an ordered tuple of scalars. The adapters never see
/// the underlying connection.
pub trait QueryCursor {
    fn execute(&mut self, query: &str) -> Result<()>;
    fn column_names(&self) -> Vec<String>;
    fn fetch_all(&mut self) -> Result<Vec<Vec<Value>>>;
}

/// Positions of the key columns in the result set, in keylist order
fn key_positions(
    columns: &[String],
    key_columns: &[&str],
) -> Result<Vec<usize>, AggregationError> {
    key_columns
        .iter()
        .map(|name| {
            columns
                .iter()
                .position(|c| c == name)
                .ok_or_else(|| AggregationError::MissingColumn {
                    column: name.to_string(),
                    columns: columns.to_vec(),
                })
        })
        .collect()
}

/// Split one row into its key tuple and the non-key remainder
fn partition_row(row: &[Value], positions: &[usize]) -> (Vec<Value>, Vec<Value>) {
    let key: Vec<Value> = positions.iter().map(|&i| row[i].clone()).collect();
    let rest: Vec<Value> = row
        .iter()
        .enumerate()
        .filter(|(i, _)| !positions.contains(i))
        .map(|(_, v)| v.clone())
        .collect();
    (key, rest)
}

/// Read a column as an integer count; anything non-numeric is an error,
/// never a zero
fn as_count(value: &Value) -> Result<i64, AggregationError> {
    match value {
        Value::Int(i) => Ok(*i),
        Value::Text(s) => s
            .parse()
            .map_err(|_| AggregationError::NonNumeric(value.clone())),
        _ => Err(AggregationError::NonNumeric(value.clone())),
    }
}

/// Read a column as a real amount; anything non-numeric is an error
fn as_amount(value: &Value) -> Result<f64, AggregationError> {
    match value {
        Value::Int(i) => Ok(*i as f64),
        Value::Float(f) => Ok(*f),
        Value::Text(s) => s
            .parse()
            .map_err(|_| AggregationError::NonNumeric(value.clone())),
        _ => Err(AggregationError::NonNumeric(value.clone())),
    }
}

/// Run a query and map each key tuple to the integer in its last non-key
/// column. The last row seen for a key wins.
pub fn counts_from_query<C: QueryCursor>(
    cursor: &mut C,
    query: &str,
    key_columns: &[&str],
) -> Result<BTreeMap<Vec<Value>, i64>> {
    cursor.execute(query)?;
    let positions = key_positions(&cursor.column_names(), key_columns)?;

    let mut counts = BTreeMap::new();
    for row in cursor.fetch_all()? {
        let (key, rest) = partition_row(&row, &positions);
        let count = rest.last().map(as_count).transpose()?.unwrap_or(0);
        counts.insert(key, count);
    }
    Ok(counts)
}

/// Run a query and collect the non-key column's values into a set per key
/// tuple, unioning across repeated keys
pub fn value_sets_from_query<C: QueryCursor>(
    cursor: &mut C,
    query: &str,
    key_columns: &[&str],
) -> Result<BTreeMap<Vec<Value>, BTreeSet<Value>>> {
    cursor.execute(query)?;
    let positions = key_positions(&cursor.column_names(), key_columns)?;

    let mut sets: BTreeMap<Vec<Value>, BTreeSet<Value>> = BTreeMap::new();
    for row in cursor.fetch_all()? {
        let (key, rest) = partition_row(&row, &positions);
        let entry = sets.entry(key).or_default();
        entry.extend(rest);
    }
    Ok(sets)
}

/// Run a query and build an Aggregator keyed by the key columns.
///
/// The two non-key columns are read positionally as count then amount; each
/// row's total is assigned directly, so a key repeated across rows keeps
/// only its last total.
pub fn totals_from_query<C: QueryCursor>(
    cursor: &mut C,
    query: &str,
    key_columns: &[&str],
) -> Result<Aggregator> {
    cursor.execute(query)?;
    let positions = key_positions(&cursor.column_names(), key_columns)?;

    let mut aggregator = Aggregator::new(key_columns.iter().copied())?;
    for row in cursor.fetch_all()? {
        let (key, rest) = partition_row(&row, &positions);
        let count = rest.first().map(as_count).transpose()?.unwrap_or(0);
        if count < 0 {
            return Err(AggregationError::NegativeCount(count).into());
        }
        let amount = rest.get(1).map(as_amount).transpose()?.unwrap_or(0.0);
        aggregator.set(key, Total::new(count as u64, amount))?;
    }
    Ok(aggregator)
}
