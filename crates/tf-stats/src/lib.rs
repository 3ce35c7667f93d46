#![forbid(unsafe_code)]

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};
use tf_frame::{Frame, FrameError, RowRange};
use tf_types::Value;

pub const DEFAULT_QUANTILES: [f64; 5] = [0.0, 0.25, 0.5, 0.75, 1.0];

/// Running mean/variance/min/max accumulator. `count` is the accumulated
/// weight, not the number of samples; with unit weights the two coincide.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    count: f64,
    samples: u64,
    sum: f64,
    sum_sq: f64,
    min: f64,
    max: f64,
}

impl Default for Statistics {
    fn default() -> Self {
        Self {
            count: 0.0,
            samples: 0,
            sum: 0.0,
            sum_sq: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }
}

impl Statistics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold `value` in with multiplicity `weight`.
    pub fn add(&mut self, value: f64, weight: f64) {
        self.count += weight;
        self.samples += 1;
        self.sum += value * weight;
        self.sum_sq += value * value * weight;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples == 0
    }

    #[must_use]
    pub fn count(&self) -> f64 {
        self.count
    }

    #[must_use]
    pub fn samples(&self) -> u64 {
        self.samples
    }

    #[must_use]
    pub fn min(&self) -> Option<f64> {
        (!self.is_empty()).then_some(self.min)
    }

    #[must_use]
    pub fn max(&self) -> Option<f64> {
        (!self.is_empty()).then_some(self.max)
    }

    #[must_use]
    pub fn mean(&self) -> Option<f64> {
        (self.count != 0.0).then(|| self.sum / self.count)
    }

    /// Population standard deviation.
    #[must_use]
    pub fn stddev(&self) -> Option<f64> {
        let mean = self.mean()?;
        let variance = (self.sum_sq / self.count - mean * mean).max(0.0);
        Some(variance.sqrt())
    }
}

// ── Fold steps ─────────────────────────────────────────────────────────

/// Duration-weighted step over rows shaped `(weight_x, value)`: when both the
/// previous and current rows are fully present, fold the trapezoidal midpoint
/// of the two values with multiplicity `dx`.
#[must_use]
pub fn weighted_step(mut stats: Statistics, prev: Option<&[Value]>, row: &[Value]) -> Statistics {
    let Some(prev) = prev else {
        return stats;
    };
    if let (Some(x0), Some(y0), Some(x1), Some(y1)) = (
        prev[0].number(),
        prev[1].number(),
        row[0].number(),
        row[1].number(),
    ) {
        let dx = x1 - x0;
        let dy = (y0 + y1) / 2.0;
        stats.add(dy, dx);
    }
    stats
}

/// Unweighted step over rows shaped `(value,)`: each present value counts
/// once. Correct for evenly sampled data, an approximation otherwise.
#[must_use]
pub fn unweighted_step(mut stats: Statistics, row: &[Value]) -> Statistics {
    if let Some(value) = row[0].number() {
        stats.add(value, 1.0);
    }
    stats
}

// ── Frame-level computation ────────────────────────────────────────────

/// Statistics of `column` weighted by the deltas of `weight`. `Ok(None)`
/// when either column is absent; traversal failures still raise.
pub fn compute_weighted(
    frame: &Frame,
    column: &str,
    weight: &str,
    range: RowRange,
) -> Result<Option<Statistics>, FrameError> {
    if !frame.contains(column) || !frame.contains(weight) {
        return Ok(None);
    }
    let stats = frame.fold_paired(
        &[weight, column],
        range,
        Statistics::default(),
        weighted_step,
    )?;
    Ok(Some(stats))
}

pub fn compute_unweighted(
    frame: &Frame,
    column: &str,
    range: RowRange,
) -> Result<Option<Statistics>, FrameError> {
    if !frame.contains(column) {
        return Ok(None);
    }
    let stats = frame.fold_rows(&[column], range, Statistics::default(), unweighted_step)?;
    Ok(Some(stats))
}

/// Statistics of `column`, weighted by the frame's default weight column when
/// one is set, unweighted otherwise.
pub fn compute(
    frame: &Frame,
    column: &str,
    range: RowRange,
) -> Result<Option<Statistics>, FrameError> {
    match frame.default_weight_column() {
        Some(weight) => {
            let weight = weight.to_owned();
            compute_weighted(frame, column, &weight, range)
        }
        None => compute_unweighted(frame, column, range),
    }
}

// ── Quantiles ──────────────────────────────────────────────────────────

/// Quantiles of a (value, weight) sample set by cumulative-weight walk.
/// Consumes the samples (sorts in place). `None` when there is nothing to
/// rank or the total weight is not positive.
#[must_use]
pub fn quantiles_of(samples: &mut [(f64, f64)], probs: &[f64]) -> Option<Vec<f64>> {
    if samples.is_empty() {
        return None;
    }
    samples.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));
    let total: f64 = samples.iter().map(|s| s.1).sum();
    if total <= 0.0 {
        return None;
    }

    Some(
        probs
            .iter()
            .map(|&q| {
                let target = q.clamp(0.0, 1.0) * total;
                let mut cumulative = 0.0;
                let mut out = samples[0].0;
                for &(value, weight) in samples.iter() {
                    cumulative += weight;
                    out = value;
                    if cumulative >= target {
                        break;
                    }
                }
                out
            })
            .collect(),
    )
}

fn weighted_samples(
    frame: &Frame,
    column: &str,
    weight: &str,
    range: RowRange,
) -> Result<Vec<(f64, f64)>, FrameError> {
    frame.fold_paired(
        &[weight, column],
        range,
        Vec::new(),
        |mut acc, prev, row| {
            if let Some(prev) = prev {
                if let (Some(x0), Some(y0), Some(x1), Some(y1)) = (
                    prev[0].number(),
                    prev[1].number(),
                    row[0].number(),
                    row[1].number(),
                ) {
                    acc.push(((y0 + y1) / 2.0, x1 - x0));
                }
            }
            acc
        },
    )
}

fn unweighted_samples(
    frame: &Frame,
    column: &str,
    range: RowRange,
) -> Result<Vec<(f64, f64)>, FrameError> {
    frame.fold_rows(&[column], range, Vec::new(), |mut acc, row| {
        if let Some(value) = row[0].number() {
            acc.push((value, 1.0));
        }
        acc
    })
}

pub fn quantiles_weighted(
    frame: &Frame,
    column: &str,
    weight: &str,
    range: RowRange,
    probs: &[f64],
) -> Result<Option<Vec<f64>>, FrameError> {
    if !frame.contains(column) || !frame.contains(weight) {
        return Ok(None);
    }
    let mut samples = weighted_samples(frame, column, weight, range)?;
    Ok(quantiles_of(&mut samples, probs))
}

pub fn quantiles_unweighted(
    frame: &Frame,
    column: &str,
    range: RowRange,
    probs: &[f64],
) -> Result<Option<Vec<f64>>, FrameError> {
    if !frame.contains(column) {
        return Ok(None);
    }
    let mut samples = unweighted_samples(frame, column, range)?;
    Ok(quantiles_of(&mut samples, probs))
}

/// Quantiles of `column`, weighted by the frame's default weight column when
/// one is set.
pub fn quantiles(
    frame: &Frame,
    column: &str,
    range: RowRange,
    probs: &[f64],
) -> Result<Option<Vec<f64>>, FrameError> {
    match frame.default_weight_column() {
        Some(weight) => {
            let weight = weight.to_owned();
            quantiles_weighted(frame, column, &weight, range, probs)
        }
        None => quantiles_unweighted(frame, column, range, probs),
    }
}

// ── Description boundary ───────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSummary {
    pub name: String,
    pub rows: usize,
    pub missing: usize,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
    pub stddev: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameSummary {
    pub columns: Vec<ColumnSummary>,
    pub properties: Vec<(String, Value)>,
}

/// Per-column description for tabular/textual display: missing count, min,
/// max, mean, stddev, plus the full property bag.
pub fn summarize(frame: &Frame) -> Result<FrameSummary, FrameError> {
    let mut columns = Vec::new();
    for name in frame.column_names() {
        let column = frame.column(name)?;
        let stats = frame.fold_rows(
            &[name],
            RowRange::full(),
            Statistics::default(),
            unweighted_step,
        )?;
        columns.push(ColumnSummary {
            name: name.to_owned(),
            rows: column.len(),
            missing: column.count_missing(),
            min: stats.min(),
            max: stats.max(),
            mean: stats.mean(),
            stddev: stats.stddev(),
        });
    }
    let properties = frame
        .properties()
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    Ok(FrameSummary {
        columns,
        properties,
    })
}

impl fmt::Display for FrameSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn cell(value: Option<f64>) -> String {
            value.map_or_else(|| "-".to_owned(), |v| format!("{v:.2}"))
        }

        writeln!(f, "{:<16} {:>6} {:>8} {:>10} {:>10} {:>10} {:>10}",
            "column", "rows", "missing", "min", "max", "mean", "stddev")?;
        for c in &self.columns {
            writeln!(
                f,
                "{:<16} {:>6} {:>8} {:>10} {:>10} {:>10} {:>10}",
                c.name,
                c.rows,
                c.missing,
                cell(c.min),
                cell(c.max),
                cell(c.mean),
                cell(c.stddev)
            )?;
        }
        for (key, value) in &self.properties {
            writeln!(f, "{key}: {value}")?;
        }
        Ok(())
    }
}
