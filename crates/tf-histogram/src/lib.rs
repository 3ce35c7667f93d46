#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tf_frame::{Frame, FrameError, RowRange};

/// Default share threshold for `trim_outliers`.
pub const TRIM_OUTLIER_PERCENT: f64 = 0.001;

/// Sparse accumulation: bucket key (multiple of the bucket width, truncated
/// toward zero) to accumulated weight or count.
pub type Buckets = BTreeMap<i64, f64>;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistogramEntry {
    /// Left edge of the bucket: `key * bucket_width`.
    pub value: f64,
    /// Accumulated weight/count, or a percentage of the total.
    pub rank: f64,
}

/// Dense, gap-filled bucket sequence spanning the observed key range.
pub type Histogram = Vec<HistogramEntry>;

fn bucket_key(value: f64, width: f64) -> i64 {
    (value / width).trunc() as i64
}

fn drop_zero_bucket(buckets: &mut Buckets, include_zero: bool) {
    if !include_zero {
        buckets.remove(&0);
    }
}

/// Bucket each present value of `column` with unit weight. `Ok(None)` when
/// the column is absent.
pub fn bucket_unweighted(
    frame: &Frame,
    column: &str,
    bucket_width: f64,
    include_zero: bool,
    range: RowRange,
) -> Result<Option<Buckets>, FrameError> {
    if !frame.contains(column) || bucket_width <= 0.0 {
        return Ok(None);
    }
    let mut buckets = frame.fold_rows(&[column], range, Buckets::new(), |mut acc, row| {
        if let Some(value) = row[0].number() {
            *acc.entry(bucket_key(value, bucket_width)).or_insert(0.0) += 1.0;
        }
        acc
    })?;
    drop_zero_bucket(&mut buckets, include_zero);
    Ok(Some(buckets))
}

/// Bucket each inter-sample interval: the trapezoidal midpoint of adjacent
/// values picks the bucket, the weight delta is the multiplicity. Mirrors
/// the weighted-statistics pairing exactly.
pub fn bucket_weighted(
    frame: &Frame,
    column: &str,
    weight: &str,
    bucket_width: f64,
    include_zero: bool,
    range: RowRange,
) -> Result<Option<Buckets>, FrameError> {
    if !frame.contains(column) || !frame.contains(weight) || bucket_width <= 0.0 {
        return Ok(None);
    }
    let mut buckets = frame.fold_paired(
        &[weight, column],
        range,
        Buckets::new(),
        |mut acc, prev, row| {
            if let Some(prev) = prev {
                if let (Some(x0), Some(y0), Some(x1), Some(y1)) = (
                    prev[0].number(),
                    prev[1].number(),
                    row[0].number(),
                    row[1].number(),
                ) {
                    let dx = x1 - x0;
                    let dy = (y0 + y1) / 2.0;
                    *acc.entry(bucket_key(dy, bucket_width)).or_insert(0.0) += dx;
                }
            }
            acc
        },
    )?;
    drop_zero_bucket(&mut buckets, include_zero);
    Ok(Some(buckets))
}

/// Bucket `column`, weighted by the frame's default weight column when one
/// is set.
pub fn bucket(
    frame: &Frame,
    column: &str,
    bucket_width: f64,
    include_zero: bool,
    range: RowRange,
) -> Result<Option<Buckets>, FrameError> {
    match frame.default_weight_column() {
        Some(weight) => {
            let weight = weight.to_owned();
            bucket_weighted(frame, column, &weight, bucket_width, include_zero, range)
        }
        None => bucket_unweighted(frame, column, bucket_width, include_zero, range),
    }
}

/// Materialize a dense histogram from sparse buckets: contiguous keys from
/// the smallest to the largest observed, zero-filled gaps, each entry at
/// `key * bucket_width`. `None` on empty buckets.
#[must_use]
pub fn to_histogram(buckets: &Buckets, bucket_width: f64, as_percentage: bool) -> Option<Histogram> {
    let first = *buckets.keys().next()?;
    let last = *buckets.keys().next_back()?;
    let total: f64 = buckets.values().sum();

    let mut out = Vec::with_capacity(usize::try_from(last - first).ok()? + 1);
    for key in first..=last {
        let rank = buckets.get(&key).copied().unwrap_or(0.0);
        let rank = if as_percentage && total > 0.0 {
            100.0 * rank / total
        } else {
            rank
        };
        out.push(HistogramEntry {
            value: key as f64 * bucket_width,
            rank,
        });
    }
    Some(out)
}

/// Drop leading and trailing buckets whose individual share of the total is
/// at or below `percent`, stopping at the first (and symmetrically last)
/// bucket above the threshold. Interior zero buckets survive; a histogram
/// with no bucket above the threshold is returned unchanged.
#[must_use]
pub fn trim_outliers(histogram: &Histogram, percent: f64) -> Histogram {
    let total: f64 = histogram.iter().map(|e| e.rank).sum();
    if total <= 0.0 {
        return histogram.clone();
    }

    let significant = |e: &HistogramEntry| e.rank / total > percent;
    let Some(first) = histogram.iter().position(significant) else {
        return histogram.clone();
    };
    let last = histogram
        .iter()
        .rposition(significant)
        .unwrap_or(histogram.len() - 1);

    histogram[first..=last].to_vec()
}

/// Sorted union of the bucket values of two histograms, for overlaying them
/// on a shared axis.
#[must_use]
pub fn merge_bucket_keys(left: &Histogram, right: &Histogram) -> Vec<f64> {
    let mut keys: Vec<f64> = left
        .iter()
        .chain(right.iter())
        .map(|e| e.value)
        .collect();
    keys.sort_by(f64::total_cmp);
    keys.dedup();
    keys
}

/// Re-expand a histogram over a merged key set, inserting rank-0 entries for
/// keys the histogram does not cover.
#[must_use]
pub fn normalize(histogram: &Histogram, keys: &[f64]) -> Histogram {
    keys.iter()
        .map(|&key| {
            let rank = histogram
                .iter()
                .find(|e| e.value == key)
                .map_or(0.0, |e| e.rank);
            HistogramEntry { value: key, rank }
        })
        .collect()
}

/// Group present (x, y) sample pairs into 2-D cells for sample-density
/// scatter plots. `Ok(None)` when either column is absent.
pub fn group_points(
    frame: &Frame,
    x_column: &str,
    y_column: &str,
    x_width: f64,
    y_width: f64,
    range: RowRange,
) -> Result<Option<BTreeMap<(i64, i64), usize>>, FrameError> {
    if !frame.contains(x_column) || !frame.contains(y_column) || x_width <= 0.0 || y_width <= 0.0 {
        return Ok(None);
    }
    let cells = frame.fold_rows(
        &[x_column, y_column],
        range,
        BTreeMap::new(),
        |mut acc: BTreeMap<(i64, i64), usize>, row| {
            if let (Some(x), Some(y)) = (row[0].number(), row[1].number()) {
                *acc.entry((bucket_key(x, x_width), bucket_key(y, y_width)))
                    .or_insert(0) += 1;
            }
            acc
        },
    )?;
    Ok(Some(cells))
}

#[cfg(test)]
mod tests {
    use tf_column::Column;
    use tf_frame::{Frame, RowRange};

    use super::{
        Buckets, HistogramEntry, bucket_unweighted, bucket_weighted, merge_bucket_keys, normalize,
        to_histogram, trim_outliers,
    };

    fn value_frame(values: &[f64]) -> Frame {
        Frame::new(vec![Column::from_numbers("v", values)])
    }

    #[test]
    fn unweighted_bucketing_counts_values() {
        let frame = value_frame(&[1.0, 1.0, 2.0, 2.0, 2.0, 5.0]);
        let buckets = bucket_unweighted(&frame, "v", 1.0, true, RowRange::full())
            .expect("traversal")
            .expect("present");
        assert_eq!(buckets.get(&1), Some(&2.0));
        assert_eq!(buckets.get(&2), Some(&3.0));
        assert_eq!(buckets.get(&5), Some(&1.0));
        assert_eq!(buckets.len(), 3);
    }

    #[test]
    fn zero_bucket_dropped_unless_included() {
        let frame = value_frame(&[0.2, 0.4, 1.5]);
        let without = bucket_unweighted(&frame, "v", 1.0, false, RowRange::full())
            .expect("traversal")
            .expect("present");
        assert_eq!(without.get(&0), None);
        assert_eq!(without.get(&1), Some(&1.0));

        let with = bucket_unweighted(&frame, "v", 1.0, true, RowRange::full())
            .expect("traversal")
            .expect("present");
        assert_eq!(with.get(&0), Some(&2.0));
    }

    #[test]
    fn truncation_is_toward_zero() {
        let frame = value_frame(&[-1.5, -0.5, 0.5, 1.5]);
        let buckets = bucket_unweighted(&frame, "v", 1.0, true, RowRange::full())
            .expect("traversal")
            .expect("present");
        assert_eq!(buckets.get(&-1), Some(&1.0));
        assert_eq!(buckets.get(&0), Some(&2.0));
        assert_eq!(buckets.get(&1), Some(&1.0));
    }

    #[test]
    fn weighted_bucketing_accumulates_interval_widths() {
        let mut frame = Frame::new(vec![
            Column::from_numbers("t", &[0.0, 30.0, 40.0]),
            Column::from_numbers("p", &[200.0, 200.0, 300.0]),
        ]);
        frame.set_default_weight_column("t");
        let buckets = bucket_weighted(&frame, "p", "t", 50.0, true, RowRange::full())
            .expect("traversal")
            .expect("present");
        // midpoints 200 (dx 30) and 250 (dx 10)
        assert_eq!(buckets.get(&4), Some(&30.0));
        assert_eq!(buckets.get(&5), Some(&10.0));
    }

    #[test]
    fn histogram_fills_gaps_contiguously() {
        let frame = value_frame(&[1.0, 1.0, 2.0, 2.0, 2.0, 5.0]);
        let buckets = bucket_unweighted(&frame, "v", 1.0, true, RowRange::full())
            .expect("traversal")
            .expect("present");
        let histogram = to_histogram(&buckets, 1.0, false).expect("non-empty");
        assert_eq!(histogram.len(), 5);
        let ranks: Vec<f64> = histogram.iter().map(|e| e.rank).collect();
        assert_eq!(ranks, vec![2.0, 3.0, 0.0, 0.0, 1.0]);
        assert_eq!(histogram[0].value, 1.0);
        assert_eq!(histogram[4].value, 5.0);
    }

    #[test]
    fn histogram_of_empty_buckets_is_none() {
        assert_eq!(to_histogram(&Buckets::new(), 1.0, false), None);
    }

    #[test]
    fn percentage_ranks_sum_to_hundred() {
        let frame = value_frame(&[1.0, 2.0, 2.0, 3.0]);
        let buckets = bucket_unweighted(&frame, "v", 1.0, true, RowRange::full())
            .expect("traversal")
            .expect("present");
        let histogram = to_histogram(&buckets, 1.0, true).expect("non-empty");
        let total: f64 = histogram.iter().map(|e| e.rank).sum();
        assert!((total - 100.0).abs() < 1e-9);
        assert_eq!(histogram[1].rank, 50.0);
    }

    #[test]
    fn trim_drops_extremal_singletons_only() {
        // one dominant bucket, singleton outliers at both ends, interior
        // zeros in between
        let histogram = vec![
            HistogramEntry { value: 0.0, rank: 1.0 },
            HistogramEntry { value: 1.0, rank: 0.0 },
            HistogramEntry { value: 2.0, rank: 10_000.0 },
            HistogramEntry { value: 3.0, rank: 0.0 },
            HistogramEntry { value: 4.0, rank: 1.0 },
        ];
        let trimmed = trim_outliers(&histogram, super::TRIM_OUTLIER_PERCENT);
        assert_eq!(trimmed.len(), 1);
        assert_eq!(trimmed[0].value, 2.0);

        let wider = vec![
            HistogramEntry { value: 0.0, rank: 1.0 },
            HistogramEntry { value: 1.0, rank: 5_000.0 },
            HistogramEntry { value: 2.0, rank: 0.0 },
            HistogramEntry { value: 3.0, rank: 5_000.0 },
            HistogramEntry { value: 4.0, rank: 1.0 },
        ];
        let trimmed = trim_outliers(&wider, super::TRIM_OUTLIER_PERCENT);
        assert_eq!(trimmed.len(), 3);
        assert_eq!(trimmed[1].rank, 0.0, "interior zero bucket survives");
    }

    #[test]
    fn trim_is_noop_when_nothing_exceeds_threshold() {
        let flat = vec![
            HistogramEntry { value: 0.0, rank: 1.0 },
            HistogramEntry { value: 1.0, rank: 1.0 },
        ];
        assert_eq!(trim_outliers(&flat, 0.9), flat);
    }

    #[test]
    fn merge_and_normalize_overlay_two_histograms() {
        let left = vec![
            HistogramEntry { value: 1.0, rank: 2.0 },
            HistogramEntry { value: 2.0, rank: 3.0 },
        ];
        let right = vec![
            HistogramEntry { value: 2.0, rank: 1.0 },
            HistogramEntry { value: 4.0, rank: 5.0 },
        ];
        let keys = merge_bucket_keys(&left, &right);
        assert_eq!(keys, vec![1.0, 2.0, 4.0]);

        let left_norm = normalize(&left, &keys);
        let right_norm = normalize(&right, &keys);
        assert_eq!(left_norm.len(), right_norm.len());
        assert_eq!(left_norm[2].rank, 0.0);
        assert_eq!(right_norm[0].rank, 0.0);
        assert_eq!(right_norm[1].rank, 1.0);
    }

    #[test]
    fn group_points_counts_present_pairs() {
        let frame = Frame::new(vec![
            Column::from_numbers("x", &[1.0, 1.2, 5.0]),
            Column::from_numbers("y", &[2.0, 2.4, 9.0]),
        ]);
        let cells = super::group_points(&frame, "x", "y", 1.0, 1.0, RowRange::full())
            .expect("traversal")
            .expect("present");
        assert_eq!(cells.get(&(1, 2)), Some(&2));
        assert_eq!(cells.get(&(5, 9)), Some(&1));
    }

    #[test]
    fn absent_column_degrades_to_none() {
        let frame = value_frame(&[1.0]);
        assert_eq!(
            bucket_unweighted(&frame, "nope", 1.0, true, RowRange::full()).expect("no traversal"),
            None
        );
        assert_eq!(
            bucket_weighted(&frame, "v", "nope", 1.0, true, RowRange::full())
                .expect("no traversal"),
            None
        );
    }
}
