//! Result normalization
//!
//! Query results come back from the store as Arrow record batches. API
//! consumers want plain JSON rows, so every batch is flattened into ordered
//! maps with engine types collapsed to JSON scalars. Temporal values are
//! rendered as `YYYY-MM-DD HH:MM:SS` strings, decimals become floats, and
//! NaN/Inf become null so the output always serializes cleanly.

use duckdb::arrow::array::{
    Array, BooleanArray, Date32Array, Date64Array, Decimal128Array, Float32Array, Float64Array,
    Int16Array, Int32Array, Int64Array, Int8Array, LargeStringArray, StringArray,
    TimestampMicrosecondArray, TimestampMillisecondArray, TimestampNanosecondArray,
    TimestampSecondArray, UInt16Array, UInt32Array, UInt64Array, UInt8Array,
};
use duckdb::arrow::datatypes::{DataType, TimeUnit};
use duckdb::arrow::record_batch::RecordBatch;
use serde_json::Value;

/// One result row, keyed by column name in projection order.
pub type Record = serde_json::Map<String, Value>;

const DATETIME_FMT: &str = "%Y-%m-%d %H:%M:%S";

fn finite_f64(v: f64) -> Value {
    if v.is_finite() {
        Value::from(v)
    } else {
        Value::Null
    }
}

fn timestamp_to_value(secs: i64, nanos: u32) -> Value {
    match chrono::DateTime::from_timestamp(secs, nanos) {
        Some(dt) => Value::String(dt.naive_utc().format(DATETIME_FMT).to_string()),
        None => Value::Null,
    }
}

macro_rules! primitive {
    ($array:expr, $row:expr, $ty:ty) => {{
        let a = $array.as_any().downcast_ref::<$ty>();
        match a {
            Some(a) => Value::from(a.value($row)),
            None => Value::Null,
        }
    }};
}

/// Converts one cell to JSON. Unknown Arrow types fall back to the engine's
/// own string rendering.
fn cell_to_value(array: &dyn Array, row: usize) -> Value {
    if array.is_null(row) {
        return Value::Null;
    }
    match array.data_type() {
        DataType::Boolean => primitive!(array, row, BooleanArray),
        DataType::Int8 => primitive!(array, row, Int8Array),
        DataType::Int16 => primitive!(array, row, Int16Array),
        DataType::Int32 => primitive!(array, row, Int32Array),
        DataType::Int64 => primitive!(array, row, Int64Array),
        DataType::UInt8 => primitive!(array, row, UInt8Array),
        DataType::UInt16 => primitive!(array, row, UInt16Array),
        DataType::UInt32 => primitive!(array, row, UInt32Array),
        DataType::UInt64 => primitive!(array, row, UInt64Array),
        DataType::Float32 => match array.as_any().downcast_ref::<Float32Array>() {
            Some(a) => finite_f64(a.value(row) as f64),
            None => Value::Null,
        },
        DataType::Float64 => match array.as_any().downcast_ref::<Float64Array>() {
            Some(a) => finite_f64(a.value(row)),
            None => Value::Null,
        },
        DataType::Utf8 => primitive!(array, row, StringArray),
        DataType::LargeUtf8 => primitive!(array, row, LargeStringArray),
        DataType::Date32 => match array.as_any().downcast_ref::<Date32Array>() {
            Some(a) => timestamp_to_value(a.value(row) as i64 * 86_400, 0),
            None => Value::Null,
        },
        DataType::Date64 => match array.as_any().downcast_ref::<Date64Array>() {
            Some(a) => {
                let ms = a.value(row);
                timestamp_to_value(ms.div_euclid(1_000), (ms.rem_euclid(1_000) * 1_000_000) as u32)
            }
            None => Value::Null,
        },
        DataType::Timestamp(unit, _) => {
            let (secs, nanos) = match unit {
                TimeUnit::Second => match array.as_any().downcast_ref::<TimestampSecondArray>() {
                    Some(a) => (a.value(row), 0i64),
                    None => return Value::Null,
                },
                TimeUnit::Millisecond => {
                    match array.as_any().downcast_ref::<TimestampMillisecondArray>() {
                        Some(a) => {
                            let ms = a.value(row);
                            (ms.div_euclid(1_000), ms.rem_euclid(1_000) * 1_000_000)
                        }
                        None => return Value::Null,
                    }
                }
                TimeUnit::Microsecond => {
                    match array.as_any().downcast_ref::<TimestampMicrosecondArray>() {
                        Some(a) => {
                            let us = a.value(row);
                            (us.div_euclid(1_000_000), us.rem_euclid(1_000_000) * 1_000)
                        }
                        None => return Value::Null,
                    }
                }
                TimeUnit::Nanosecond => {
                    match array.as_any().downcast_ref::<TimestampNanosecondArray>() {
                        Some(a) => {
                            let ns = a.value(row);
                            (ns.div_euclid(1_000_000_000), ns.rem_euclid(1_000_000_000))
                        }
                        None => return Value::Null,
                    }
                }
            };
            timestamp_to_value(secs, nanos as u32)
        }
        DataType::Decimal128(_, scale) => {
            match array.as_any().downcast_ref::<Decimal128Array>() {
                Some(a) => finite_f64(a.value(row) as f64 / 10f64.powi(*scale as i32)),
                None => Value::Null,
            }
        }
        _ => duckdb::arrow::util::display::array_value_to_string(array, row)
            .map(Value::String)
            .unwrap_or(Value::Null),
    }
}

/// Flattens Arrow batches into JSON rows, preserving column order.
pub fn batches_to_records(batches: &[RecordBatch]) -> Vec<Record> {
    let mut out = Vec::new();
    for batch in batches {
        let schema = batch.schema();
        for row in 0..batch.num_rows() {
            let mut record = Record::new();
            for (i, field) in schema.fields().iter().enumerate() {
                record.insert(field.name().clone(), cell_to_value(batch.column(i), row));
            }
            out.push(record);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use duckdb::arrow::array::ArrayRef;
    use duckdb::arrow::datatypes::{Field, Schema};
    use std::sync::Arc;

    fn batch(name: &str, array: ArrayRef) -> RecordBatch {
        let schema = Schema::new(vec![Field::new(name, array.data_type().clone(), true)]);
        RecordBatch::try_new(Arc::new(schema), vec![array]).unwrap()
    }

    #[test]
    fn date32_renders_as_midnight_datetime() {
        let b = batch("d", Arc::new(Date32Array::from(vec![Some(0), None])));
        let rows = batches_to_records(&[b]);
        assert_eq!(rows[0]["d"], Value::String("1970-01-01 00:00:00".into()));
        assert_eq!(rows[1]["d"], Value::Null);
    }

    #[test]
    fn micro_timestamps_render_to_the_second() {
        let b = batch(
            "ts",
            Arc::new(TimestampMicrosecondArray::from(vec![1_700_000_000_000_000i64])),
        );
        let rows = batches_to_records(&[b]);
        assert_eq!(rows[0]["ts"], Value::String("2023-11-14 22:13:20".into()));
    }

    #[test]
    fn nan_becomes_null() {
        let b = batch("v", Arc::new(Float64Array::from(vec![f64::NAN, 1.5])));
        let rows = batches_to_records(&[b]);
        assert_eq!(rows[0]["v"], Value::Null);
        assert_eq!(rows[1]["v"], Value::from(1.5));
    }

    #[test]
    fn decimal_scales_down() {
        let a = Decimal128Array::from(vec![12345i128])
            .with_precision_and_scale(10, 2)
            .unwrap();
        let rows = batches_to_records(&[batch("v", Arc::new(a))]);
        assert_eq!(rows[0]["v"], Value::from(123.45));
    }

    #[test]
    fn column_order_is_preserved() {
        let schema = Schema::new(vec![
            Field::new("zeta", DataType::Int64, true),
            Field::new("alpha", DataType::Int64, true),
        ]);
        let b = RecordBatch::try_new(
            Arc::new(schema),
            vec![
                Arc::new(Int64Array::from(vec![1])),
                Arc::new(Int64Array::from(vec![2])),
            ],
        )
        .unwrap();
        let rows = batches_to_records(&[b]);
        let keys: Vec<&String> = rows[0].keys().collect();
        assert_eq!(keys, vec!["zeta", "alpha"]);
    }
}
