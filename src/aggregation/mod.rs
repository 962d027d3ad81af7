use crate::output::CsvDialect;
use crate::types::{sum_totals, AggregationError, Observation, Total, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// A miniature in-memory rollup: totals per composite key, labelled by a
/// fixed field schema.
///
/// The schema (an ordered list of distinct field names) is set at
/// construction and never changes; every key must carry exactly one value
/// per field, in schema order. Derived aggregators returned by `filter`,
/// `collapse`, `merge` and `add` are independent copies, never views.
///
/// Not safe for concurrent mutation; callers serialize access themselves.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregator {
    fields: Vec<String>,
    totals: BTreeMap<Vec<Value>, Total>,
}

impl Aggregator {
    /// Create an empty aggregator over the given field schema.
    ///
    /// Fails if a field name repeats.
    pub fn new<I, S>(fields: I) -> Result<Self, AggregationError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fields: Vec<String> = fields.into_iter().map(Into::into).collect();
        let mut seen = BTreeSet::new();
        for field in &fields {
            if !seen.insert(field.clone()) {
                return Err(AggregationError::DuplicateField(field.clone()));
            }
        }
        Ok(Self {
            fields,
            totals: BTreeMap::new(),
        })
    }

    /// Create an aggregator with a set of keys pre-inserted at a zero total
    pub fn with_keys<I, S, K>(fields: I, keys: K) -> Result<Self, AggregationError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        K: IntoIterator<Item = Vec<Value>>,
    {
        let mut agg = Self::new(fields)?;
        for key in keys {
            agg.check_arity(&key)?;
            agg.totals.insert(key, Total::ZERO);
        }
        Ok(agg)
    }

    /// Field names, in schema order
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.totals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.totals.is_empty()
    }

    pub fn get(&self, key: &[Value]) -> Option<Total> {
        self.totals.get(key).copied()
    }

    /// Iterate over (key, total) pairs in key order
    pub fn iter(&self) -> impl Iterator<Item = (&[Value], Total)> {
        self.totals.iter().map(|(k, v)| (k.as_slice(), *v))
    }

    fn check_arity(&self, key: &[Value]) -> Result<(), AggregationError> {
        if key.len() != self.fields.len() {
            return Err(AggregationError::KeyArity {
                expected: self.fields.len(),
                got: key.len(),
                fields: self.fields.clone(),
            });
        }
        Ok(())
    }

    fn field_index(&self, field: &str) -> Result<usize, AggregationError> {
        self.fields
            .iter()
            .position(|f| f == field)
            .ok_or_else(|| AggregationError::UnknownField {
                field: field.to_string(),
                fields: self.fields.clone(),
            })
    }

    /// Store an observation at a key, REPLACING any prior total.
    ///
    /// This is the direct-assignment entry point; use [`Aggregator::update`]
    /// to accumulate instead.
    pub fn set<O>(&mut self, key: Vec<Value>, value: O) -> Result<(), AggregationError>
    where
        O: Into<Observation>,
    {
        self.check_arity(&key)?;
        self.totals.insert(key, sum_totals([value.into()]));
        Ok(())
    }

    /// Accumulate one observation into the total stored at a key, inserting
    /// the key if absent
    pub fn update_one<O>(&mut self, key: Vec<Value>, value: O) -> Result<(), AggregationError>
    where
        O: Into<Observation>,
    {
        self.check_arity(&key)?;
        self.accumulate(key, value.into());
        Ok(())
    }

    /// Insert-or-accumulate without an arity check; callers guarantee the
    /// key was built against this schema
    fn accumulate(&mut self, key: Vec<Value>, incoming: Observation) {
        let combined = match self.totals.get(&key) {
            Some(existing) => sum_totals([Observation::from(*existing), incoming]),
            None => sum_totals([incoming]),
        };
        self.totals.insert(key, combined);
    }

    /// Accumulate a batch of (key, observation) pairs.
    ///
    /// Every key is validated before any is applied, so a malformed batch
    /// leaves the aggregator untouched.
    pub fn update<P, O>(&mut self, pairs: P) -> Result<(), AggregationError>
    where
        P: IntoIterator<Item = (Vec<Value>, O)>,
        O: Into<Observation>,
    {
        let pairs: Vec<(Vec<Value>, Observation)> =
            pairs.into_iter().map(|(k, v)| (k, v.into())).collect();
        for (key, _) in &pairs {
            self.check_arity(key)?;
        }
        for (key, value) in pairs {
            self.update_one(key, value)?;
        }
        Ok(())
    }

    /// Sum two same-schema aggregators into a new one.
    ///
    /// Schemas must match exactly, in order and content; totals at each key
    /// are accumulated across both operands.
    pub fn add(&self, other: &Aggregator) -> Result<Aggregator, AggregationError> {
        if self.fields != other.fields {
            return Err(AggregationError::SchemaMismatch {
                left: self.fields.clone(),
                right: other.fields.clone(),
            });
        }
        let mut result = self.clone();
        result.add_assign(other)?;
        Ok(result)
    }

    /// Accumulate another same-schema aggregator into this one.
    ///
    /// Enforces the same full schema equality as [`Aggregator::add`], not
    /// just matching arity.
    pub fn add_assign(&mut self, other: &Aggregator) -> Result<(), AggregationError> {
        if self.fields != other.fields {
            return Err(AggregationError::SchemaMismatch {
                left: self.fields.clone(),
                right: other.fields.clone(),
            });
        }
        for (key, total) in other.iter() {
            self.update_one(key.to_vec(), total)?;
        }
        Ok(())
    }

    /// Put together two arbitrary aggregators over the union of their
    /// schemas, supplying `Value::Null` where a key's original schema lacks
    /// a field.
    ///
    /// The union schema starts with this aggregator's fields followed by the
    /// other's unseen fields; callers should not rely on the order. Totals
    /// landing on the same union key accumulate.
    pub fn merge(&self, other: &Aggregator) -> Aggregator {
        let mut fields = self.fields.clone();
        for field in &other.fields {
            if !fields.contains(field) {
                fields.push(field.clone());
            }
        }

        let mut result = Aggregator {
            fields: fields.clone(),
            totals: BTreeMap::new(),
        };
        for source in [self, other] {
            for (key, total) in source.iter() {
                let union_key: Vec<Value> = fields
                    .iter()
                    .map(|field| {
                        source
                            .fields
                            .iter()
                            .position(|f| f == field)
                            .map(|i| key[i].clone())
                            .unwrap_or(Value::Null)
                    })
                    .collect();
                result.accumulate(union_key, total.into());
            }
        }
        result
    }

    /// Keep only entries whose key contains any of the given values at any
    /// position.
    ///
    /// This is a coarse, position-agnostic membership test, not a per-field
    /// predicate. Kept totals are unchanged.
    pub fn filter(&self, values: &[Value]) -> Aggregator {
        let totals = self
            .totals
            .iter()
            .filter(|(key, _)| key.iter().any(|v| values.contains(v)))
            .map(|(k, v)| (k.clone(), *v))
            .collect();
        Aggregator {
            fields: self.fields.clone(),
            totals,
        }
    }

    /// Remove one field from the schema, accumulating keys that collide
    /// once the field is dropped.
    ///
    /// Count and amount mass are conserved; only the dropped dimension's
    /// resolution is lost.
    pub fn collapse(&self, field: &str) -> Result<Aggregator, AggregationError> {
        let index = self.field_index(field)?;
        let mut fields = self.fields.clone();
        fields.remove(index);

        let mut result = Aggregator {
            fields,
            totals: BTreeMap::new(),
        };
        for (key, total) in self.iter() {
            let mut collapsed = key.to_vec();
            collapsed.remove(index);
            result.accumulate(collapsed, total.into());
        }
        Ok(result)
    }

    /// Distinct values observed at one field position, as a set
    pub fn field_values(&self, field: &str) -> Result<BTreeSet<Value>, AggregationError> {
        Ok(self.iter_field_values(field)?.cloned().collect())
    }

    /// Lazily iterate the value at one field position across all keys
    pub fn iter_field_values(
        &self,
        field: &str,
    ) -> Result<impl Iterator<Item = &Value>, AggregationError> {
        let index = self.field_index(field)?;
        Ok(self.totals.keys().map(move |key| &key[index]))
    }

    /// Sort (key, total) pairs by their totals.
    ///
    /// Sorts by (count, amount) when `by_count`, else (amount, count);
    /// ascending unless `reverse`. The sort is stable, so ties keep key
    /// order.
    pub fn value_sorted(&self, by_count: bool, reverse: bool) -> Vec<(&[Value], Total)> {
        let mut pairs: Vec<(&[Value], Total)> = self.iter().collect();
        pairs.sort_by(|(_, a), (_, b)| {
            let ord = if by_count {
                a.count.cmp(&b.count).then(a.amount.total_cmp(&b.amount))
            } else {
                a.amount.total_cmp(&b.amount).then(a.count.cmp(&b.count))
            };
            if reverse { ord.reverse() } else { ord }
        });
        pairs
    }

    /// Sort (key, total) pairs by the named fields' values, in the given
    /// field order; ascending unless `reverse`.
    ///
    /// With no sort fields this is just the pairs in key order.
    pub fn field_sorted(
        &self,
        sort_fields: &[&str],
        reverse: bool,
    ) -> Result<Vec<(&[Value], Total)>, AggregationError> {
        let indices: Vec<usize> = sort_fields
            .iter()
            .map(|f| self.field_index(f))
            .collect::<Result<_, _>>()?;

        let mut pairs: Vec<(&[Value], Total)> = self.iter().collect();
        pairs.sort_by(|(a, _), (b, _)| {
            let ord = indices
                .iter()
                .map(|&i| a[i].cmp(&b[i]))
                .find(|o| !o.is_eq())
                .unwrap_or(std::cmp::Ordering::Equal);
            if reverse { ord.reverse() } else { ord }
        });
        Ok(pairs)
    }

    /// Render the aggregator as CSV text: header = schema fields plus
    /// "count" and "amount", one row per entry in
    /// [`Aggregator::field_sorted`] order
    pub fn to_csv(
        &self,
        sort_fields: &[&str],
        reverse: bool,
        dialect: &CsvDialect,
    ) -> Result<String, AggregationError> {
        crate::output::write_csv(self, sort_fields, reverse, dialect)
    }
}

impl fmt::Display for Aggregator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (key, total) in self.iter() {
            if !first {
                writeln!(f)?;
            }
            first = false;
            let rendered: Vec<String> = key.iter().map(|v| v.to_string()).collect();
            write!(f, "({}): {}", rendered.join(", "), total)?;
        }
        Ok(())
    }
}
