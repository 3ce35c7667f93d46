#![forbid(unsafe_code)]

//! CSV ingest and export. Empty cells become missing values, numeric cells
//! become numbers, everything else stays text.

use std::path::Path;

use csv::{ReaderBuilder, WriterBuilder};
use tf_column::Column;
use tf_frame::{Frame, FrameError};
use tf_types::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IoError {
    #[error("csv input has no headers")]
    MissingHeaders,
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error(transparent)]
    Frame(#[from] FrameError),
}

/// Parse a CSV document with a header row into a [`Frame`]. Nameless header
/// cells get positional `column-N` placeholders; ragged records pad short
/// rows with missing values.
pub fn read_csv_str(input: &str) -> Result<Frame, IoError> {
    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .has_headers(true)
        .from_reader(input.as_bytes());

    let headers = reader.headers().cloned()?;
    if headers.is_empty() {
        return Err(IoError::MissingHeaders);
    }

    let header_count = headers.len();
    let row_hint = input.len() / (header_count * 8).max(1);
    let mut columns: Vec<Vec<Value>> = (0..header_count)
        .map(|_| Vec::with_capacity(row_hint))
        .collect();

    for row in reader.records() {
        let record = row?;
        for (idx, col) in columns.iter_mut().enumerate() {
            let field = record.get(idx).unwrap_or_default();
            col.push(parse_value(field));
        }
    }

    let frame_columns = columns
        .into_iter()
        .enumerate()
        .map(|(idx, values)| {
            let header = headers.get(idx).unwrap_or_default().trim();
            let name = if header.is_empty() {
                format!("column-{idx}")
            } else {
                header.to_owned()
            };
            Column::new(name, values)
        })
        .collect();

    Ok(Frame::new(frame_columns))
}

/// Read and parse a CSV file.
pub fn read_csv_path(path: impl AsRef<Path>) -> Result<Frame, IoError> {
    let input = std::fs::read_to_string(path)?;
    read_csv_str(&input)
}

/// Serialize a frame to CSV text, columns in name order, missing values as
/// empty cells.
pub fn write_csv_string(frame: &Frame) -> Result<String, IoError> {
    let mut writer = WriterBuilder::new().from_writer(Vec::new());

    let headers = frame.column_names();
    writer.write_record(&headers)?;

    let row_count = headers
        .iter()
        .filter_map(|name| frame.column(name).ok())
        .map(Column::len)
        .max()
        .unwrap_or(0);

    for row_idx in 0..row_count {
        let row = headers
            .iter()
            .map(|name| {
                frame
                    .column(name)
                    .ok()
                    .and_then(|column| column.value(row_idx))
                    .map_or_else(String::new, value_to_csv)
            })
            .collect::<Vec<_>>();
        writer.write_record(&row)?;
    }

    let bytes = writer.into_inner().map_err(|err| err.into_error())?;
    Ok(String::from_utf8(bytes)?)
}

fn parse_value(field: &str) -> Value {
    let trimmed = field.trim();
    if trimmed.is_empty() {
        return Value::Missing;
    }
    if let Ok(value) = trimmed.parse::<f64>() {
        return Value::Number(value);
    }
    Value::Text(trimmed.to_owned())
}

fn value_to_csv(value: &Value) -> String {
    match value {
        Value::Missing => String::new(),
        Value::Number(v) => {
            if v.is_nan() {
                String::new()
            } else {
                v.to_string()
            }
        }
        Value::Text(v) => v.clone(),
    }
}

#[cfg(test)]
mod tests {
    use tf_types::Value;

    use super::{IoError, read_csv_str, write_csv_string};

    #[test]
    fn empty_cells_become_missing() {
        let input = "time,power\n0,100\n1,\n2,120\n";
        let frame = read_csv_str(input).expect("read");
        let power = frame.column("power").expect("power");
        assert_eq!(power.values()[0], Value::Number(100.0));
        assert_eq!(power.values()[1], Value::Missing);
        assert_eq!(power.values()[2], Value::Number(120.0));
    }

    #[test]
    fn non_numeric_cells_stay_text() {
        let input = "sport,duration\nride,3600\nrun,1800\n";
        let frame = read_csv_str(input).expect("read");
        let sport = frame.column("sport").expect("sport");
        assert_eq!(sport.values()[0], Value::Text("ride".into()));
    }

    #[test]
    fn nameless_headers_get_positional_placeholders() {
        let input = "time,,power\n0,5,100\n";
        let frame = read_csv_str(input).expect("read");
        assert!(frame.contains("column-1"));
        assert_eq!(
            frame.column("column-1").expect("placeholder").values()[0],
            Value::Number(5.0)
        );
    }

    #[test]
    fn short_records_pad_with_missing() {
        let input = "a,b\n1,2\n3\n";
        let frame = read_csv_str(input).expect("read");
        let b = frame.column("b").expect("b");
        assert_eq!(b.values()[1], Value::Missing);
    }

    #[test]
    fn headerless_input_is_rejected() {
        assert!(matches!(read_csv_str(""), Err(IoError::MissingHeaders)));
    }

    #[test]
    fn round_trip_preserves_shape() {
        let input = "time,power\n0,100\n1,\n2,3.5\n";
        let frame = read_csv_str(input).expect("read");
        let out = write_csv_string(&frame).expect("write");
        assert!(out.contains("power,time") || out.contains("time,power"));
        assert!(out.contains("3.5"));
        let again = read_csv_str(&out).expect("reread");
        assert_eq!(
            again.column("power").expect("power").values(),
            frame.column("power").expect("power").values()
        );
    }
}
