#![forbid(unsafe_code)]

use std::borrow::Cow;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tf_column::{Column, ColumnError};
use tf_types::Value;
use thiserror::Error;

/// Property key naming the column used to weight statistics when samples are
/// unevenly spaced (typically elapsed time or distance).
pub const WEIGHT_SERIES_KEY: &str = "weight-series";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("column {name:?} not found")]
    ColumnNotFound { name: String },
    #[error("column {name:?} has {len} rows but the traversal needs {needed}")]
    ColumnTooShort {
        name: String,
        len: usize,
        needed: usize,
    },
    #[error("columns have unequal lengths ({shortest} to {longest}); row count is undefined")]
    RaggedLengths { shortest: usize, longest: usize },
    #[error("traversal needs at least one column")]
    NoColumnsNamed,
    #[error(transparent)]
    Column(#[from] ColumnError),
}

/// Optional `[start, end)` restriction of a traversal. `None` bounds default
/// to the full extent; out-of-range bounds are clamped and reversed bounds
/// swapped, matching the sorted-search range rules.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowRange {
    pub start: Option<usize>,
    pub end: Option<usize>,
}

impl RowRange {
    #[must_use]
    pub fn full() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn new(start: usize, end: usize) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    #[must_use]
    pub fn resolve(&self, len: usize) -> (usize, usize) {
        let start = self.start.unwrap_or(0).min(len);
        let end = self.end.unwrap_or(len).min(len);
        if start > end { (end, start) } else { (start, end) }
    }
}

impl From<std::ops::Range<usize>> for RowRange {
    fn from(range: std::ops::Range<usize>) -> Self {
        Self::new(range.start, range.end)
    }
}

/// A single traversal row: one value per selected column, in selection order.
pub type Row = Vec<Value>;

/// Lazy, single-pass, in-order iterator of row tuples over a set of columns
/// walked in lock-step. Not restartable; every aggregation in the engine
/// consumes one of these.
pub struct RowCursor<'a> {
    columns: Vec<&'a [Value]>,
    pos: usize,
    end: usize,
}

impl Iterator for RowCursor<'_> {
    type Item = Row;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.end {
            return None;
        }
        let idx = self.pos;
        self.pos += 1;
        Some(self.columns.iter().map(|col| col[idx].clone()).collect())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.end - self.pos;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for RowCursor<'_> {}

/// A named collection of columns plus a key/value property bag. Columns with
/// zero valid values are dropped at construction; columns and properties may
/// be added or replaced afterwards, never deleted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    columns: BTreeMap<String, Column>,
    properties: BTreeMap<String, Value>,
}

impl Frame {
    #[must_use]
    pub fn new(columns: Vec<Column>) -> Self {
        let mut map = BTreeMap::new();
        for column in columns {
            if column.has_any_valid() {
                map.insert(column.name().to_owned(), column);
            }
        }
        Self {
            columns: map,
            properties: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    // ── Columns ────────────────────────────────────────────────────────

    #[must_use]
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.keys().map(String::as_str).collect()
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    #[must_use]
    pub fn has_all(&self, names: &[&str]) -> bool {
        names.iter().all(|name| self.contains(name))
    }

    #[must_use]
    pub fn has_any(&self, names: &[&str]) -> bool {
        names.iter().any(|name| self.contains(name))
    }

    pub fn column(&self, name: &str) -> Result<&Column, FrameError> {
        self.columns
            .get(name)
            .ok_or_else(|| FrameError::ColumnNotFound {
                name: name.to_owned(),
            })
    }

    pub fn column_mut(&mut self, name: &str) -> Result<&mut Column, FrameError> {
        self.columns
            .get_mut(name)
            .ok_or_else(|| FrameError::ColumnNotFound {
                name: name.to_owned(),
            })
    }

    /// Insert or replace by name.
    pub fn add_column(&mut self, column: Column) {
        self.columns.insert(column.name().to_owned(), column);
    }

    /// Row count when it is well defined: every column has the same length.
    pub fn row_count(&self) -> Result<usize, FrameError> {
        let mut lengths = self.columns.values().map(Column::len);
        let Some(first) = lengths.next() else {
            return Ok(0);
        };
        let (mut shortest, mut longest) = (first, first);
        for len in lengths {
            shortest = shortest.min(len);
            longest = longest.max(len);
        }
        if shortest == longest {
            Ok(first)
        } else {
            Err(FrameError::RaggedLengths { shortest, longest })
        }
    }

    // ── Properties ─────────────────────────────────────────────────────

    #[must_use]
    pub fn property_names(&self) -> Vec<&str> {
        self.properties.keys().map(String::as_str).collect()
    }

    pub fn put_property(&mut self, key: impl Into<String>, value: Value) {
        self.properties.insert(key.into(), value);
    }

    #[must_use]
    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    #[must_use]
    pub fn property_or<'a>(&'a self, key: &str, default: &'a Value) -> &'a Value {
        self.properties.get(key).unwrap_or(default)
    }

    #[must_use]
    pub fn properties(&self) -> &BTreeMap<String, Value> {
        &self.properties
    }

    pub fn set_default_weight_column(&mut self, name: impl Into<String>) {
        self.properties
            .insert(WEIGHT_SERIES_KEY.to_owned(), Value::Text(name.into()));
    }

    #[must_use]
    pub fn default_weight_column(&self) -> Option<&str> {
        self.properties.get(WEIGHT_SERIES_KEY).and_then(Value::text)
    }

    // ── Selection ──────────────────────────────────────────────────────

    /// Raw values of one column over `range`. Borrows the column's storage
    /// when the resolved range covers the whole column.
    pub fn select(&self, name: &str, range: RowRange) -> Result<Cow<'_, [Value]>, FrameError> {
        let column = self.column(name)?;
        let (start, end) = range.resolve(column.len());
        if start == 0 && end == column.len() {
            Ok(Cow::Borrowed(column.values()))
        } else {
            Ok(Cow::Owned(column.values()[start..end].to_vec()))
        }
    }

    /// Like `select`, keeping only values the predicate accepts (order
    /// preserved).
    pub fn select_filtered<P>(
        &self,
        name: &str,
        range: RowRange,
        predicate: P,
    ) -> Result<Vec<Value>, FrameError>
    where
        P: Fn(&Value) -> bool,
    {
        let column = self.column(name)?;
        let (start, end) = range.resolve(column.len());
        Ok(column.values()[start..end]
            .iter()
            .filter(|v| predicate(v))
            .cloned()
            .collect())
    }

    /// Row tuples over several columns in lock-step: row i is
    /// `(col1[i], col2[i], ...)` in the order given. Columns are assumed
    /// index-aligned; there is no alignment by key.
    pub fn select_many(&self, names: &[&str], range: RowRange) -> Result<Vec<Row>, FrameError> {
        Ok(self.rows(names, range)?.collect())
    }

    pub fn select_many_filtered<P>(
        &self,
        names: &[&str],
        range: RowRange,
        predicate: P,
    ) -> Result<Vec<Row>, FrameError>
    where
        P: Fn(&[Value]) -> bool,
    {
        Ok(self
            .rows(names, range)?
            .filter(|row| predicate(row.as_slice()))
            .collect())
    }

    // ── Traversal pipeline ─────────────────────────────────────────────

    /// Lazy in-order cursor over the named columns. The default range is the
    /// minimum length across them, so lock-step traversal never reads past a
    /// shorter column; an explicit `end` beyond a column's length is an
    /// error.
    pub fn rows(&self, names: &[&str], range: RowRange) -> Result<RowCursor<'_>, FrameError> {
        if names.is_empty() {
            return Err(FrameError::NoColumnsNamed);
        }

        let mut columns = Vec::with_capacity(names.len());
        let mut shortest = usize::MAX;
        for name in names {
            let column = self.column(name)?;
            shortest = shortest.min(column.len());
            columns.push(column);
        }

        if let Some(explicit_end) = range.end {
            for column in &columns {
                if column.len() < explicit_end {
                    return Err(FrameError::ColumnTooShort {
                        name: column.name().to_owned(),
                        len: column.len(),
                        needed: explicit_end,
                    });
                }
            }
        }
        let (start, end) = range.resolve(shortest);

        Ok(RowCursor {
            columns: columns.into_iter().map(Column::values).collect(),
            pos: start,
            end,
        })
    }

    /// Apply `f` to every row in order, materializing the results.
    pub fn map_rows<F>(
        &self,
        names: &[&str],
        range: RowRange,
        mut f: F,
    ) -> Result<Vec<Value>, FrameError>
    where
        F: FnMut(&[Value]) -> Value,
    {
        Ok(self.rows(names, range)?.map(|row| f(row.as_slice())).collect())
    }

    /// Paired form: `f` also sees the immediately preceding row (`None` on
    /// the first iteration). Every row in range participates; the previous
    /// row is never filtered away.
    pub fn map_paired<F>(
        &self,
        names: &[&str],
        range: RowRange,
        mut f: F,
    ) -> Result<Vec<Value>, FrameError>
    where
        F: FnMut(Option<&[Value]>, &[Value]) -> Value,
    {
        let mut out = Vec::new();
        let mut prev: Option<Row> = None;
        for row in self.rows(names, range)? {
            out.push(f(prev.as_deref(), row.as_slice()));
            prev = Some(row);
        }
        Ok(out)
    }

    /// The single aggregation primitive: reduce rows strictly in increasing
    /// index order, each visited exactly once, no look-ahead.
    pub fn fold_rows<A, F>(
        &self,
        names: &[&str],
        range: RowRange,
        init: A,
        mut f: F,
    ) -> Result<A, FrameError>
    where
        F: FnMut(A, &[Value]) -> A,
    {
        let mut acc = init;
        for row in self.rows(names, range)? {
            acc = f(acc, row.as_slice());
        }
        Ok(acc)
    }

    /// Paired fold: the step also sees the previous row. Every aggregate
    /// needing an interval delta (time weighting) is built on this.
    pub fn fold_paired<A, F>(
        &self,
        names: &[&str],
        range: RowRange,
        init: A,
        mut f: F,
    ) -> Result<A, FrameError>
    where
        F: FnMut(A, Option<&[Value]>, &[Value]) -> A,
    {
        let mut acc = init;
        let mut prev: Option<Row> = None;
        for row in self.rows(names, range)? {
            acc = f(acc, prev.as_deref(), row.as_slice());
            prev = Some(row);
        }
        Ok(acc)
    }

    // ── Derived columns ────────────────────────────────────────────────

    /// Compute a new column row-wise from `base_columns` and insert it.
    pub fn add_derived_column<F>(
        &mut self,
        name: impl Into<String>,
        base_columns: &[&str],
        f: F,
    ) -> Result<(), FrameError>
    where
        F: FnMut(&[Value]) -> Value,
    {
        let values = self.map_rows(base_columns, RowRange::full(), f)?;
        self.add_column(Column::new(name, values));
        Ok(())
    }

    /// Pairwise-with-previous-row variant of `add_derived_column`.
    pub fn add_derived_column_paired<F>(
        &mut self,
        name: impl Into<String>,
        base_columns: &[&str],
        f: F,
    ) -> Result<(), FrameError>
    where
        F: FnMut(Option<&[Value]>, &[Value]) -> Value,
    {
        let values = self.map_paired(base_columns, RowRange::full(), f)?;
        self.add_column(Column::new(name, values));
        Ok(())
    }

    // ── Positional lookup ──────────────────────────────────────────────

    /// Thin wrapper over `Column::index_of`.
    pub fn index_of(&self, column: &str, value: &Value) -> Result<Option<usize>, FrameError> {
        Ok(self.column(column)?.index_of(value)?)
    }

    pub fn index_of_many(
        &self,
        column: &str,
        values: &[Value],
    ) -> Result<Vec<Option<usize>>, FrameError> {
        let column = self.column(column)?;
        values
            .iter()
            .map(|value| column.index_of(value).map_err(FrameError::from))
            .collect()
    }
}
