#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use tf_search::insertion_point;
use tf_types::{SortOrder, Value};
use thiserror::Error;

/// Why a column cannot be marked sorted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortViolation {
    /// A sorted column may not contain missing values.
    MissingValue,
    /// Adjacent values are out of order under the column's comparator.
    OutOfOrder,
    /// Adjacent values have no defined order (number/text mix).
    Incomparable,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ColumnError {
    #[error("column {name:?} is not sorted; positional lookup requires a sorted column")]
    NotSorted { name: String },
    #[error("column {name:?} violates the sorted invariant at row {index}: {violation:?}")]
    InvariantViolation {
        name: String,
        index: usize,
        violation: SortViolation,
    },
}

/// A named, fixed-length sequence of optional values forming one field of an
/// activity's sample set. Values are set once at construction; deriving a new
/// column creates a new `Column`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    name: String,
    values: Vec<Value>,
    sorted: bool,
    order: SortOrder,
}

impl Column {
    #[must_use]
    pub fn new(name: impl Into<String>, values: Vec<Value>) -> Self {
        Self::with_order(name, values, SortOrder::Ascending)
    }

    #[must_use]
    pub fn with_order(name: impl Into<String>, values: Vec<Value>, order: SortOrder) -> Self {
        Self {
            name: name.into(),
            values,
            sorted: false,
            order,
        }
    }

    /// Build a column and assert its sortedness in one step.
    pub fn sorted(
        name: impl Into<String>,
        values: Vec<Value>,
        order: SortOrder,
    ) -> Result<Self, ColumnError> {
        let mut column = Self::with_order(name, values, order);
        column.set_sorted(true)?;
        Ok(column)
    }

    pub fn from_numbers(name: impl Into<String>, values: &[f64]) -> Self {
        Self::new(name, values.iter().map(|&v| Value::Number(v)).collect())
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    #[must_use]
    pub fn value(&self, idx: usize) -> Option<&Value> {
        self.values.get(idx)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[must_use]
    pub fn order(&self) -> SortOrder {
        self.order
    }

    #[must_use]
    pub fn is_sorted(&self) -> bool {
        self.sorted
    }

    #[must_use]
    pub fn count_missing(&self) -> usize {
        tf_types::count_missing(&self.values)
    }

    #[must_use]
    pub fn has_any_valid(&self) -> bool {
        tf_types::has_any_valid(&self.values)
    }

    #[must_use]
    pub fn has_any_missing(&self) -> bool {
        tf_types::has_any_missing(&self.values)
    }

    /// Mark (or unmark) the column sorted. Marking re-validates the data: no
    /// missing values and every adjacent pair ordered under the column's
    /// comparator.
    pub fn set_sorted(&mut self, flag: bool) -> Result<(), ColumnError> {
        if !flag {
            self.sorted = false;
            return Ok(());
        }

        for (index, value) in self.values.iter().enumerate() {
            if value.is_missing() {
                return Err(ColumnError::InvariantViolation {
                    name: self.name.clone(),
                    index,
                    violation: SortViolation::MissingValue,
                });
            }
        }

        for index in 1..self.values.len() {
            match self.order.le(&self.values[index - 1], &self.values[index]) {
                Some(true) => {}
                Some(false) => {
                    return Err(ColumnError::InvariantViolation {
                        name: self.name.clone(),
                        index,
                        violation: SortViolation::OutOfOrder,
                    });
                }
                None => {
                    return Err(ColumnError::InvariantViolation {
                        name: self.name.clone(),
                        index,
                        violation: SortViolation::Incomparable,
                    });
                }
            }
        }

        self.sorted = true;
        Ok(())
    }

    /// Lower-bound index of `value` under the column's order, restricted to
    /// `[start, end)` when given. Requires the column to be marked sorted;
    /// a missing query has no index.
    pub fn index_of_in(
        &self,
        value: &Value,
        start: Option<usize>,
        end: Option<usize>,
    ) -> Result<Option<usize>, ColumnError> {
        if !self.sorted {
            return Err(ColumnError::NotSorted {
                name: self.name.clone(),
            });
        }
        if value.is_missing() {
            return Ok(None);
        }

        let idx = insertion_point(&self.values, value, start, end, |query, element| {
            // a sorted column holds no missing values; a shape-mismatched
            // query sorts after everything
            self.order.le(query, element).unwrap_or(false)
        });
        Ok(Some(idx))
    }

    pub fn index_of(&self, value: &Value) -> Result<Option<usize>, ColumnError> {
        self.index_of_in(value, None, None)
    }
}
