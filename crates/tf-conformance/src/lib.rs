#![forbid(unsafe_code)]

//! Shared fixtures for the cross-crate test suites: synthetic activity
//! recordings with the irregular sampling, dropouts, and interval structure
//! real device streams have.

use std::fmt::Write as _;

use tf_column::{Column, ColumnError};
use tf_frame::Frame;
use tf_types::{SortOrder, Value};

pub const TIME: &str = "elapsed-time";
pub const POWER: &str = "power";
pub const HEART_RATE: &str = "heart-rate";
pub const CADENCE: &str = "cadence";

/// One synthetic sample of the canonical activity fixture.
#[derive(Debug, Clone, Copy)]
pub struct ActivitySample {
    pub time: f64,
    pub power: Option<f64>,
    pub heart_rate: Option<f64>,
    pub cadence: Option<f64>,
}

/// Deterministic two-minute ride at roughly 1 Hz: a recording gap every
/// thirty samples, a hard interval in the middle, a power dropout every
/// twenty-five samples, and heart rate that lags the effort.
#[must_use]
pub fn activity_samples() -> Vec<ActivitySample> {
    let mut samples = Vec::with_capacity(121);
    let mut time = 0.0_f64;
    for i in 0_u32..121 {
        if i > 0 {
            time += if i % 30 == 0 { 3.0 } else { 1.0 };
        }
        let in_interval = (40..64).contains(&i);
        let power = if i % 25 == 7 {
            None
        } else if in_interval {
            Some(250.0 + f64::from(i % 5))
        } else {
            Some(150.0 + f64::from(i % 10))
        };
        let heart_rate = if i < 3 {
            None
        } else if in_interval {
            Some(155.0 + f64::from(i - 40).min(15.0))
        } else {
            Some(125.0 + f64::from(i % 4))
        };
        let cadence = if i % 30 == 29 {
            Some(0.0)
        } else {
            Some(85.0 + f64::from(i % 6))
        };
        samples.push(ActivitySample {
            time,
            power,
            heart_rate,
            cadence,
        });
    }
    samples
}

fn optional(value: Option<f64>) -> Value {
    value.map_or(Value::Missing, Value::Number)
}

/// The canonical activity frame: sorted time column, metric columns with
/// missing values, default weight column pointing at elapsed time.
pub fn activity_frame() -> Result<Frame, ColumnError> {
    let samples = activity_samples();
    let time = Column::sorted(
        TIME,
        samples
            .iter()
            .map(|s| Value::Number(s.time))
            .collect(),
        SortOrder::Ascending,
    )?;
    let mut frame = Frame::new(vec![
        time,
        Column::new(POWER, samples.iter().map(|s| optional(s.power)).collect()),
        Column::new(
            HEART_RATE,
            samples.iter().map(|s| optional(s.heart_rate)).collect(),
        ),
        Column::new(
            CADENCE,
            samples.iter().map(|s| optional(s.cadence)).collect(),
        ),
    ]);
    frame.set_default_weight_column(TIME);
    Ok(frame)
}

/// The same fixture as CSV text, for exercising the ingest path.
#[must_use]
pub fn activity_csv() -> String {
    let mut out = String::from("elapsed-time,power,heart-rate,cadence\n");
    for sample in activity_samples() {
        let _ = write!(out, "{}", sample.time);
        for field in [sample.power, sample.heart_rate, sample.cadence] {
            out.push(',');
            if let Some(value) = field {
                let _ = write!(out, "{value}");
            }
        }
        out.push('\n');
    }
    out
}

/// A frame holding a single linear ramp, `y = slope * x`, sampled at 1 Hz.
pub fn ramp_frame(name: &str, len: usize, slope: f64) -> Result<Frame, ColumnError> {
    let time: Vec<Value> = (0..len).map(|i| Value::Number(i as f64)).collect();
    let values: Vec<Value> = (0..len)
        .map(|i| Value::Number(slope * i as f64))
        .collect();
    let time = Column::sorted(TIME, time, SortOrder::Ascending)?;
    let mut frame = Frame::new(vec![time, Column::new(name, values)]);
    frame.set_default_weight_column(TIME);
    Ok(frame)
}
