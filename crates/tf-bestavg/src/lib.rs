#![forbid(unsafe_code)]

//! Best rolling average over a fixed duration, for irregularly sampled
//! (x, y) series: "best 20-minute power", "best 5-minute pace", and the
//! companion metrics reported alongside them.

use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use tf_frame::{Frame, FrameError, RowRange};
use tf_search::insertion_point_by_key;

/// One inter-sample gap of an (x, y) series: interval width, trapezoidal
/// area contribution of y over that interval, and the starting x position.
/// The sliding window operates over these, never over raw samples.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeltaSlice {
    pub dt: f64,
    pub area: f64,
    pub position: f64,
}

/// Best average of one candidate duration. `value`/`position` are missing
/// when the series is shorter than the duration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BestAvgEntry {
    pub duration: f64,
    pub value: Option<f64>,
    pub position: Option<f64>,
}

impl BestAvgEntry {
    #[must_use]
    fn unavailable(duration: f64) -> Self {
        Self {
            duration,
            value: None,
            position: None,
        }
    }
}

/// Per-duration best averages, ordered by increasing duration.
pub type BestAvgCurve = Vec<BestAvgEntry>;

// ── Delta series ───────────────────────────────────────────────────────

/// Trapezoidal delta series of the (x, y) columns. Sample pairs touching a
/// missing value are skipped. `Ok(None)` when either column is absent.
pub fn delta_series(
    frame: &Frame,
    x_column: &str,
    y_column: &str,
    range: RowRange,
) -> Result<Option<Vec<DeltaSlice>>, FrameError> {
    if !frame.contains(x_column) || !frame.contains(y_column) {
        return Ok(None);
    }
    let slices = frame.fold_paired(
        &[x_column, y_column],
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
                    acc.push(DeltaSlice {
                        dt: x1 - x0,
                        area: (x1 - x0) * (y0 + y1) / 2.0,
                        position: x0,
                    });
                }
            }
            acc
        },
    )?;
    Ok(Some(slices))
}

// ── Sliding window ─────────────────────────────────────────────────────

/// Best exact-span window of one duration via a two-pointer walk: the tail
/// accumulates slices until the span crosses the duration, the crossing
/// slice contributes a proportional partial so the window spans exactly the
/// duration, and the head then sheds its full slice. O(n) amortized.
#[must_use]
pub fn best_window(slices: &[DeltaSlice], duration: f64, inverted: bool) -> BestAvgEntry {
    if duration <= 0.0 {
        return BestAvgEntry::unavailable(duration);
    }

    let mut best: Option<(f64, f64)> = None;
    let mut head = 0_usize;
    let mut span = 0.0_f64;
    let mut total = 0.0_f64;

    for tail in 0..slices.len() {
        let slice = slices[tail];
        span += slice.dt;
        total += slice.area;

        while span >= duration && head <= tail {
            // the first crossing for this head overshoots by less than the
            // tail slice's width
            let overshoot = span - duration;
            let exact_total = if slice.dt > 0.0 {
                total - slice.area * (overshoot / slice.dt)
            } else {
                total
            };
            let average = exact_total / duration;
            let position = slices[head].position;

            let improved = match best {
                None => true,
                Some((current, _)) => {
                    if inverted {
                        average < current
                    } else {
                        average > current
                    }
                }
            };
            if improved {
                best = Some((average, position));
            }

            span -= slices[head].dt;
            total -= slices[head].area;
            head += 1;
        }
    }

    match best {
        Some((value, position)) => BestAvgEntry {
            duration,
            value: Some(value),
            position: Some(position),
        },
        None => BestAvgEntry::unavailable(duration),
    }
}

/// Best averages of `y_column` over `x_column` for every candidate duration.
/// Maximizes by default, minimizes when `inverted` (pace-like metrics).
/// `Ok(None)` when a column is absent; an empty curve when fewer than two
/// usable samples exist.
pub fn best_avg(
    frame: &Frame,
    x_column: &str,
    y_column: &str,
    durations: &[f64],
    inverted: bool,
) -> Result<Option<BestAvgCurve>, FrameError> {
    let Some(slices) = delta_series(frame, x_column, y_column, RowRange::full())? else {
        return Ok(None);
    };
    if slices.is_empty() {
        return Ok(Some(Vec::new()));
    }

    let mut sorted = durations.to_vec();
    sorted.sort_by(f64::total_cmp);
    Ok(Some(
        sorted
            .iter()
            .map(|&duration| best_window(&slices, duration, inverted))
            .collect(),
    ))
}

// ── Auxiliary series ───────────────────────────────────────────────────

/// Plain time-weighted average of a second metric over each window of an
/// already-computed best-average curve: "average cadence during the best
/// 20-minute power effort". The window start is located with a sorted
/// search over slice positions; the scan is bounded by the duration and not
/// re-optimized. When the series runs out before the window does, the
/// average covers the available span.
pub fn auxiliary_series(
    frame: &Frame,
    x_column: &str,
    aux_column: &str,
    curve: &[BestAvgEntry],
) -> Result<Option<BestAvgCurve>, FrameError> {
    let Some(slices) = delta_series(frame, x_column, aux_column, RowRange::full())? else {
        return Ok(None);
    };

    let out = curve
        .iter()
        .map(|entry| {
            let Some(position) = entry.position else {
                return BestAvgEntry::unavailable(entry.duration);
            };

            let start = insertion_point_by_key(
                &slices,
                &position,
                None,
                None,
                |slice| slice.position,
                |a, b| a <= b,
            );

            let mut covered = 0.0_f64;
            let mut total = 0.0_f64;
            for slice in &slices[start..] {
                if covered + slice.dt >= entry.duration {
                    let need = entry.duration - covered;
                    if slice.dt > 0.0 {
                        total += slice.area * (need / slice.dt);
                    }
                    covered = entry.duration;
                    break;
                }
                covered += slice.dt;
                total += slice.area;
            }

            BestAvgEntry {
                duration: entry.duration,
                value: (covered > 0.0).then(|| total / covered),
                position: Some(position),
            }
        })
        .collect();

    Ok(Some(out))
}

// ── Duration ladders ───────────────────────────────────────────────────

/// Fixed plot-tick durations: round numbers from 1 second to 3 hours.
pub const IMPORTANT_DURATIONS: [f64; 17] = [
    1.0, 5.0, 10.0, 30.0, 60.0, 90.0, 180.0, 300.0, 600.0, 900.0, 1200.0, 1800.0, 2700.0, 3600.0,
    5400.0, 7200.0, 10800.0,
];

#[must_use]
pub fn important_durations() -> &'static [f64] {
    &IMPORTANT_DURATIONS
}

fn min_step(duration: f64) -> f64 {
    if duration < 120.0 {
        5.0
    } else if duration < 1200.0 {
        10.0
    } else {
        20.0
    }
}

/// Front-loaded geometric duration ladder: 5 % growth with a scale-dependent
/// minimum step so short durations stay dense and long ones never collide
/// after rounding to whole seconds.
#[must_use]
pub fn generate_durations(start: f64, limit: f64) -> Vec<f64> {
    let mut out = Vec::new();
    let mut duration = start;
    while duration <= limit {
        out.push(duration);
        let step = (duration * 0.05).max(min_step(duration));
        duration = (duration + step).round();
    }
    out
}

/// The default candidate ladder, 10 s up to 5 h, computed once per process.
pub fn default_durations() -> &'static [f64] {
    static LADDER: OnceLock<Vec<f64>> = OnceLock::new();
    LADDER.get_or_init(|| generate_durations(10.0, 18_000.0))
}

/// Tick durations for plotting a `[min, max]` duration range: the important
/// durations that fall inside, or a denser synthetic grid when fewer than
/// five do.
#[must_use]
pub fn duration_ticks(min: f64, max: f64) -> Vec<f64> {
    let important: Vec<f64> = IMPORTANT_DURATIONS
        .iter()
        .copied()
        .filter(|&d| d >= min && d <= max)
        .collect();
    if important.len() >= 5 {
        return important;
    }

    const STEPS: [f64; 13] = [
        1.0, 2.0, 5.0, 10.0, 15.0, 30.0, 60.0, 120.0, 300.0, 600.0, 1200.0, 1800.0, 3600.0,
    ];
    let extent = (max - min).max(1.0);
    let step = STEPS
        .iter()
        .copied()
        .find(|&s| extent / s <= 8.0)
        .unwrap_or(3600.0);

    let mut tick = (min / step).ceil() * step;
    let mut out = Vec::new();
    while tick <= max {
        out.push(tick);
        tick += step;
    }
    out
}

// ── Dual-axis normalization ────────────────────────────────────────────

/// Affine rescale of an auxiliary curve's value range into the primary
/// curve's, so both can share one plot; the inverse labels the secondary
/// axis ticks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisTransform {
    target_min: f64,
    target_max: f64,
    source_min: f64,
    source_max: f64,
}

fn value_range(curve: &[BestAvgEntry]) -> Option<(f64, f64)> {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for value in curve.iter().filter_map(|e| e.value) {
        min = min.min(value);
        max = max.max(value);
    }
    (min <= max).then_some((min, max))
}

impl AxisTransform {
    /// Fit a transform mapping `aux`'s value range onto `primary`'s.
    /// `None` when either curve has no values or a degenerate range.
    #[must_use]
    pub fn fit(primary: &[BestAvgEntry], aux: &[BestAvgEntry], zero_based: bool) -> Option<Self> {
        let (mut target_min, target_max) = value_range(primary)?;
        let (mut source_min, source_max) = value_range(aux)?;
        if zero_based {
            target_min = 0.0;
            source_min = 0.0;
        }
        if source_max == source_min || target_max == target_min {
            return None;
        }
        Some(Self {
            target_min,
            target_max,
            source_min,
            source_max,
        })
    }

    #[must_use]
    pub fn apply(&self, value: f64) -> f64 {
        self.target_min
            + (value - self.source_min) / (self.source_max - self.source_min)
                * (self.target_max - self.target_min)
    }

    #[must_use]
    pub fn invert(&self, value: f64) -> f64 {
        self.source_min
            + (value - self.target_min) / (self.target_max - self.target_min)
                * (self.source_max - self.source_min)
    }
}
