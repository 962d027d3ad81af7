use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use thiserror::Error;

/// A combined observation: how many records were folded in and their summed amount
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Total {
    pub count: u64,
    pub amount: f64,
}

impl Total {
    pub const ZERO: Total = Total { count: 0, amount: 0.0 };

    pub fn new(count: u64, amount: f64) -> Self {
        Self { count, amount }
    }
}

impl fmt::Display for Total {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Total(count={}, amount={})", self.count, self.amount)
    }
}

/// One argument to [`sum_totals`]: either a raw magnitude (one observation)
/// or an already-combined Total
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Observation {
    Amount(f64),
    Total(Total),
}

impl From<f64> for Observation {
    fn from(amount: f64) -> Self {
        Observation::Amount(amount)
    }
}

impl From<i64> for Observation {
    fn from(amount: i64) -> Self {
        Observation::Amount(amount as f64)
    }
}

impl From<Total> for Observation {
    fn from(total: Total) -> Self {
        Observation::Total(total)
    }
}

/// Fold any mixture of raw magnitudes and existing Totals into one Total.
///
/// A raw magnitude counts as a single observation; a Total carries its own
/// count. This is the only place Totals are combined, so every aggregation
/// operation shares one definition of "sum". Commutative and associative.
pub fn sum_totals<I>(observations: I) -> Total
where
    I: IntoIterator,
    I::Item: Into<Observation>,
{
    let mut count = 0u64;
    let mut amount = 0.0f64;
    for obs in observations {
        match obs.into() {
            Observation::Amount(a) => {
                count += 1;
                amount += a;
            }
            Observation::Total(t) => {
                count += t.count;
                amount += t.amount;
            }
        }
    }
    Total { count, amount }
}

/// A scalar key component.
///
/// `Null` is the explicit "field not applicable" marker used by schema-union
/// merges; it is distinct from every real value, including `Bool(false)`,
/// `Int(0)` and the empty string.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Value {
    fn variant_rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Int(_) => 2,
            Value::Float(_) => 3,
            Value::Text(_) => 4,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            // Bitwise comparison keeps Eq consistent with Hash for floats
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Text(a), Value::Text(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.variant_rank().hash(state);
        match self {
            Value::Null => {}
            Value::Bool(b) => b.hash(state),
            Value::Int(i) => i.hash(state),
            Value::Float(f) => f.to_bits().hash(state),
            Value::Text(s) => s.hash(state),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Float(a), Value::Float(b)) => a.total_cmp(b),
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            _ => self.variant_rank().cmp(&other.variant_rank()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

/// Errors raised by aggregation operations.
///
/// These are programmer-error-class faults: they surface immediately and
/// never partially apply a malformed operation.
#[derive(Debug, Error)]
pub enum AggregationError {
    #[error("key has {got} values but schema {fields:?} expects {expected}")]
    KeyArity {
        expected: usize,
        got: usize,
        fields: Vec<String>,
    },

    #[error("duplicate field name in schema: {0:?}")]
    DuplicateField(String),

    #[error("unknown field {field:?}, schema is {fields:?}")]
    UnknownField { field: String, fields: Vec<String> },

    #[error("schema mismatch\n  original: {left:?}\n  applying: {right:?}")]
    SchemaMismatch { left: Vec<String>, right: Vec<String> },

    #[error("column {column:?} not present in query result columns {columns:?}")]
    MissingColumn { column: String, columns: Vec<String> },

    #[error("csv export failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("csv export is not valid utf-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("cannot read {0:?} as a numeric column")]
    NonNumeric(Value),

    #[error("negative count {0} in a query row")]
    NegativeCount(i64),
}
