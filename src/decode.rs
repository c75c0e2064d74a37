//! Result page decoding.
//!
//! The decoder captures the column schema from the first page that carries
//! descriptors and converts every cell from its JSON wire representation to
//! a typed [`Value`] according to the declared column type. It performs no
//! I/O and holds no state beyond the captured schema, so decoding the same
//! page twice yields identical output.

use crate::error::{PrestoLinkError, Result};
use crate::models::{Column, QueryResults};
use crate::typing::{PrestoType, RowField};
use crate::value::Value;
use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use serde_json::Value as JsonValue;
use std::str::FromStr;

/// Decodes pages for one query against the schema captured from its first
/// data-bearing page.
#[derive(Debug)]
pub struct PageDecoder {
    schema: Option<Schema>,
    strict: bool,
}

#[derive(Debug)]
struct Schema {
    columns: Vec<Column>,
    types: Vec<PrestoType>,
}

impl PageDecoder {
    /// `strict` selects typed conversion; `false` passes cells through as
    /// raw JSON (nulls are still decoded to [`Value::Null`]).
    pub fn new(strict: bool) -> Self {
        Self {
            schema: None,
            strict,
        }
    }

    /// Column descriptors, once a page has advertised them.
    pub fn columns(&self) -> Option<&[Column]> {
        self.schema.as_ref().map(|s| s.columns.as_slice())
    }

    /// Decode one page into typed rows.
    ///
    /// Captures the schema on first sight and verifies that later pages do
    /// not silently change it; the protocol never resends a different
    /// schema for the same query, so a divergence is a hard error.
    pub fn decode(&mut self, page: &QueryResults) -> Result<Vec<Vec<Value>>> {
        if let Some(columns) = &page.columns {
            match &self.schema {
                None => {
                    let types = columns
                        .iter()
                        .map(|c| PrestoType::parse(&c.data_type))
                        .collect();
                    self.schema = Some(Schema {
                        columns: columns.clone(),
                        types,
                    });
                }
                Some(existing) => {
                    let same_layout = existing.columns.len() == columns.len()
                        && existing
                            .columns
                            .iter()
                            .zip(columns)
                            .all(|(a, b)| a.name == b.name);
                    if !same_layout {
                        return Err(PrestoLinkError::SchemaMismatch {
                            expected: existing.columns.len(),
                            actual: columns.len(),
                        });
                    }
                }
            }
        }

        let Some(data) = &page.data else {
            return Ok(Vec::new());
        };
        if data.is_empty() {
            return Ok(Vec::new());
        }
        let schema = self.schema.as_ref().ok_or_else(|| {
            PrestoLinkError::Protocol("page carries rows but no schema was advertised".into())
        })?;

        let mut rows = Vec::with_capacity(data.len());
        for (row_idx, raw_row) in data.iter().enumerate() {
            if raw_row.len() != schema.types.len() {
                return Err(PrestoLinkError::SchemaMismatch {
                    expected: schema.types.len(),
                    actual: raw_row.len(),
                });
            }
            let mut row = Vec::with_capacity(raw_row.len());
            for (col_idx, cell) in raw_row.iter().enumerate() {
                let value = if self.strict {
                    let presto_type = &schema.types[col_idx];
                    convert(presto_type, cell).map_err(|message| {
                        PrestoLinkError::DataConversion {
                            row: row_idx,
                            column: col_idx,
                            presto_type: presto_type.name(),
                            message,
                        }
                    })?
                } else if cell.is_null() {
                    Value::Null
                } else {
                    Value::Raw(cell.clone())
                };
                row.push(value);
            }
            rows.push(row);
        }
        Ok(rows)
    }
}

type ConvResult = std::result::Result<Value, String>;

/// Convert one cell. Scalar conversions also accept string renditions
/// because map keys always arrive as JSON object keys, i.e. strings.
fn convert(ty: &PrestoType, v: &JsonValue) -> ConvResult {
    if v.is_null() {
        return Ok(Value::Null);
    }
    match ty {
        PrestoType::Boolean => convert_boolean(v),
        PrestoType::TinyInt | PrestoType::SmallInt | PrestoType::Integer | PrestoType::BigInt => {
            convert_integer(v)
        }
        PrestoType::Real | PrestoType::Double => convert_float(v),
        PrestoType::Decimal { .. } => convert_decimal(v),
        PrestoType::Varchar | PrestoType::Char => match v.as_str() {
            Some(s) => Ok(Value::String(s.to_string())),
            None => Err(format!("expected a string, got {}", v)),
        },
        PrestoType::Json => Ok(Value::String(match v.as_str() {
            Some(s) => s.to_string(),
            None => v.to_string(),
        })),
        PrestoType::Varbinary => {
            let s = v.as_str().ok_or_else(|| "expected base64 string".to_string())?;
            general_purpose::STANDARD
                .decode(s)
                .map(Value::Binary)
                .map_err(|e| format!("invalid base64: {}", e))
        }
        PrestoType::Date => {
            let s = as_str(v)?;
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .map(Value::Date)
                .map_err(|e| format!("invalid date {:?}: {}", s, e))
        }
        PrestoType::Time => {
            let s = as_str(v)?;
            NaiveTime::parse_from_str(s, "%H:%M:%S%.f")
                .map(Value::Time)
                .map_err(|e| format!("invalid time {:?}: {}", s, e))
        }
        PrestoType::Timestamp => {
            let s = as_str(v)?;
            NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
                .map(Value::Timestamp)
                .map_err(|e| format!("invalid timestamp {:?}: {}", s, e))
        }
        PrestoType::TimestampWithTimeZone => {
            let s = as_str(v)?;
            match DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f %z") {
                Ok(dt) => Ok(Value::TimestampWithZone(dt)),
                // Region zone names need a tz database; keep those raw.
                Err(_) => Ok(Value::Raw(v.clone())),
            }
        }
        PrestoType::TimeWithTimeZone => Ok(Value::Raw(v.clone())),
        PrestoType::Array(inner) => {
            let items = v
                .as_array()
                .ok_or_else(|| format!("expected an array, got {}", v))?;
            items
                .iter()
                .map(|item| convert(inner, item))
                .collect::<std::result::Result<Vec<_>, _>>()
                .map(Value::Array)
        }
        PrestoType::Map(key_ty, value_ty) => {
            let entries = v
                .as_object()
                .ok_or_else(|| format!("expected an object, got {}", v))?;
            let mut map = Vec::with_capacity(entries.len());
            for (key, value) in entries {
                let key = convert(key_ty, &JsonValue::String(key.clone()))?;
                let value = convert(value_ty, value)?;
                map.push((key, value));
            }
            Ok(Value::Map(map))
        }
        PrestoType::Row(fields) => convert_row(fields, v),
        PrestoType::Other(_) => Ok(Value::Raw(v.clone())),
    }
}

fn as_str(v: &JsonValue) -> std::result::Result<&str, String> {
    v.as_str().ok_or_else(|| format!("expected a string, got {}", v))
}

fn convert_boolean(v: &JsonValue) -> ConvResult {
    match v {
        JsonValue::Bool(b) => Ok(Value::Boolean(*b)),
        JsonValue::String(s) if s == "true" => Ok(Value::Boolean(true)),
        JsonValue::String(s) if s == "false" => Ok(Value::Boolean(false)),
        other => Err(format!("expected a boolean, got {}", other)),
    }
}

fn convert_integer(v: &JsonValue) -> ConvResult {
    if let Some(n) = v.as_i64() {
        return Ok(Value::BigInt(n));
    }
    if let Some(s) = v.as_str() {
        return s
            .parse()
            .map(Value::BigInt)
            .map_err(|_| format!("{:?} is not an integer", s));
    }
    Err(format!("expected an integer, got {}", v))
}

fn convert_float(v: &JsonValue) -> ConvResult {
    if let Some(f) = v.as_f64() {
        return Ok(Value::Double(f));
    }
    // Non-finite doubles arrive as strings.
    if let Some(s) = v.as_str() {
        return match s {
            "NaN" => Ok(Value::Double(f64::NAN)),
            "Infinity" => Ok(Value::Double(f64::INFINITY)),
            "-Infinity" => Ok(Value::Double(f64::NEG_INFINITY)),
            _ => s
                .parse()
                .map(Value::Double)
                .map_err(|_| format!("{:?} is not a number", s)),
        };
    }
    Err(format!("expected a number, got {}", v))
}

fn convert_decimal(v: &JsonValue) -> ConvResult {
    let text = match v {
        JsonValue::String(s) => s.clone(),
        JsonValue::Number(n) => n.to_string(),
        other => return Err(format!("expected a decimal, got {}", other)),
    };
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map(Value::Decimal)
        .map_err(|e| format!("{:?} is not a decimal: {}", text, e))
}

fn convert_row(fields: &[RowField], v: &JsonValue) -> ConvResult {
    match v {
        JsonValue::Array(items) => {
            if items.len() != fields.len() {
                return Err(format!(
                    "row has {} values but {} declared fields",
                    items.len(),
                    fields.len()
                ));
            }
            items
                .iter()
                .zip(fields)
                .map(|(item, field)| convert(&field.field_type, item))
                .collect::<std::result::Result<Vec<_>, _>>()
                .map(Value::Row)
        }
        JsonValue::Object(entries) => fields
            .iter()
            .map(|field| {
                let name = field
                    .name
                    .as_deref()
                    .ok_or_else(|| "object row with anonymous fields".to_string())?;
                let item = entries.get(name).unwrap_or(&JsonValue::Null);
                convert(&field.field_type, item)
            })
            .collect::<std::result::Result<Vec<_>, _>>()
            .map(Value::Row),
        other => Err(format!("expected a row, got {}", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn page(value: JsonValue) -> QueryResults {
        serde_json::from_value(value).unwrap()
    }

    fn data_page(columns: JsonValue, data: JsonValue) -> QueryResults {
        page(json!({
            "id": "q1",
            "columns": columns,
            "data": data,
            "stats": {"state": "RUNNING"}
        }))
    }

    #[test]
    fn decodes_scalars_by_declared_type() {
        let mut decoder = PageDecoder::new(true);
        let page = data_page(
            json!([
                {"name": "b", "type": "boolean"},
                {"name": "n", "type": "bigint"},
                {"name": "d", "type": "double"},
                {"name": "s", "type": "varchar"},
                {"name": "m", "type": "decimal(10,2)"}
            ]),
            json!([[true, 42, 0.25, "hello", "123.45"]]),
        );
        let rows = decoder.decode(&page).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][0], Value::Boolean(true));
        assert_eq!(rows[0][1], Value::BigInt(42));
        assert_eq!(rows[0][2], Value::Double(0.25));
        assert_eq!(rows[0][3], Value::String("hello".into()));
        assert_eq!(
            rows[0][4],
            Value::Decimal(Decimal::from_str("123.45").unwrap())
        );
    }

    #[test]
    fn null_never_conflated_with_empty() {
        let mut decoder = PageDecoder::new(true);
        let page = data_page(
            json!([{"name": "a", "type": "varchar"}, {"name": "b", "type": "varchar"}]),
            json!([[null, ""]]),
        );
        let rows = decoder.decode(&page).unwrap();
        assert_eq!(rows[0][0], Value::Null);
        assert_eq!(rows[0][1], Value::String(String::new()));
        assert_ne!(rows[0][0], rows[0][1]);
    }

    #[test]
    fn decoding_is_pure() {
        let mut decoder = PageDecoder::new(true);
        let page = data_page(
            json!([{"name": "n", "type": "bigint"}]),
            json!([[1], [2], [3]]),
        );
        let first = decoder.decode(&page).unwrap();
        let second = decoder.decode(&page).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn temporal_types() {
        let mut decoder = PageDecoder::new(true);
        let page = data_page(
            json!([
                {"name": "d", "type": "date"},
                {"name": "t", "type": "time"},
                {"name": "ts", "type": "timestamp"},
                {"name": "tz", "type": "timestamp with time zone"}
            ]),
            json!([["2001-08-22", "01:02:03.456", "2001-08-22 03:04:05.321", "2001-08-22 03:04:05.321 +07:00"]]),
        );
        let rows = decoder.decode(&page).unwrap();
        assert_eq!(
            rows[0][0],
            Value::Date(NaiveDate::from_ymd_opt(2001, 8, 22).unwrap())
        );
        assert!(matches!(rows[0][1], Value::Time(_)));
        assert!(matches!(rows[0][2], Value::Timestamp(_)));
        let Value::TimestampWithZone(dt) = &rows[0][3] else {
            panic!("expected zoned timestamp, got {:?}", rows[0][3]);
        };
        assert_eq!(dt.offset().local_minus_utc(), 7 * 3600);
    }

    #[test]
    fn composites_decode_recursively() {
        let mut decoder = PageDecoder::new(true);
        let page = data_page(
            json!([
                {"name": "arr", "type": "array(bigint)"},
                {"name": "m", "type": "map(bigint, varchar)"},
                {"name": "r", "type": "row(id bigint, name varchar)"}
            ]),
            json!([[[1, 2, null], {"7": "seven"}, [9, "nine"]]]),
        );
        let rows = decoder.decode(&page).unwrap();
        assert_eq!(
            rows[0][0],
            Value::Array(vec![Value::BigInt(1), Value::BigInt(2), Value::Null])
        );
        // Map keys arrive as JSON strings and are decoded per the key type.
        assert_eq!(
            rows[0][1],
            Value::Map(vec![(Value::BigInt(7), Value::String("seven".into()))])
        );
        assert_eq!(
            rows[0][2],
            Value::Row(vec![Value::BigInt(9), Value::String("nine".into())])
        );
    }

    #[test]
    fn conversion_failure_names_row_and_column() {
        let mut decoder = PageDecoder::new(true);
        let page = data_page(
            json!([{"name": "a", "type": "varchar"}, {"name": "n", "type": "bigint"}]),
            json!([["ok", 1], ["ok", "not-a-number"]]),
        );
        match decoder.decode(&page) {
            Err(PrestoLinkError::DataConversion {
                row,
                column,
                presto_type,
                ..
            }) => {
                assert_eq!(row, 1);
                assert_eq!(column, 1);
                assert_eq!(presto_type, "bigint");
            }
            other => panic!("expected DataConversion, got {:?}", other),
        }
    }

    #[test]
    fn later_page_with_diverged_schema_is_rejected() {
        let mut decoder = PageDecoder::new(true);
        let first = data_page(
            json!([{"name": "a", "type": "bigint"}, {"name": "b", "type": "varchar"}]),
            json!([[1, "x"]]),
        );
        decoder.decode(&first).unwrap();

        let diverged = data_page(json!([{"name": "a", "type": "bigint"}]), json!([[1]]));
        match decoder.decode(&diverged) {
            Err(PrestoLinkError::SchemaMismatch { expected, actual }) => {
                assert_eq!(expected, 2);
                assert_eq!(actual, 1);
            }
            other => panic!("expected SchemaMismatch, got {:?}", other),
        }
    }

    #[test]
    fn resent_identical_schema_is_accepted() {
        let mut decoder = PageDecoder::new(true);
        let columns = json!([{"name": "a", "type": "bigint"}]);
        decoder.decode(&data_page(columns.clone(), json!([[1]]))).unwrap();
        let rows = decoder.decode(&data_page(columns, json!([[2]]))).unwrap();
        assert_eq!(rows, vec![vec![Value::BigInt(2)]]);
    }

    #[test]
    fn data_without_schema_is_a_protocol_error() {
        let mut decoder = PageDecoder::new(true);
        let page = page(json!({
            "id": "q1",
            "data": [[1]],
            "stats": {"state": "RUNNING"}
        }));
        assert!(matches!(
            decoder.decode(&page),
            Err(PrestoLinkError::Protocol(_))
        ));
    }

    #[test]
    fn pages_without_data_decode_to_no_rows() {
        let mut decoder = PageDecoder::new(true);
        let page = page(json!({"id": "q1", "stats": {"state": "QUEUED"}}));
        assert!(decoder.decode(&page).unwrap().is_empty());
    }

    #[test]
    fn raw_mode_passes_cells_through() {
        let mut decoder = PageDecoder::new(false);
        let page = data_page(
            json!([{"name": "n", "type": "bigint"}, {"name": "s", "type": "varchar"}]),
            json!([[1, null]]),
        );
        let rows = decoder.decode(&page).unwrap();
        assert_eq!(rows[0][0], Value::Raw(json!(1)));
        assert_eq!(rows[0][1], Value::Null);
    }

    #[test]
    fn non_finite_doubles_from_strings() {
        let mut decoder = PageDecoder::new(true);
        let page = data_page(
            json!([{"name": "d", "type": "double"}]),
            json!([["NaN"], ["Infinity"], ["-Infinity"]]),
        );
        let rows = decoder.decode(&page).unwrap();
        let Value::Double(nan) = rows[0][0] else { panic!() };
        assert!(nan.is_nan());
        assert_eq!(rows[1][0], Value::Double(f64::INFINITY));
        assert_eq!(rows[2][0], Value::Double(f64::NEG_INFINITY));
    }

    #[test]
    fn varbinary_is_base64_decoded() {
        let mut decoder = PageDecoder::new(true);
        let page = data_page(
            json!([{"name": "b", "type": "varbinary"}]),
            json!([["aGVsbG8="]]),
        );
        let rows = decoder.decode(&page).unwrap();
        assert_eq!(rows[0][0], Value::Binary(b"hello".to_vec()));
    }

    #[test]
    fn unknown_type_cells_are_kept_raw() {
        let mut decoder = PageDecoder::new(true);
        let page = data_page(
            json!([{"name": "h", "type": "HyperLogLog"}]),
            json!([["opaque-sketch"]]),
        );
        let rows = decoder.decode(&page).unwrap();
        assert_eq!(rows[0][0], Value::Raw(json!("opaque-sketch")));
    }
}
