//! SQL literal rendering for parameterized statements.
//!
//! The protocol carries only statement text, so parameter binding happens
//! client-side: each [`Param`] renders to a SQL literal and
//! [`interpolate`] substitutes the literals for `?` placeholders. The only
//! character needing escape inside a string literal is the single quote,
//! which doubles.

use crate::error::{PrestoLinkError, Result};
use chrono::{NaiveDate, NaiveDateTime};
use std::fmt;

/// A statement parameter, rendered to a SQL literal on substitution.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    Null,
    Boolean(bool),
    BigInt(i64),
    Double(f64),
    String(String),
    /// Must be valid UTF-8; rendered as a string literal.
    Bytes(Vec<u8>),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
    /// Rendered as a parenthesized list, e.g. for `IN (...)`.
    Sequence(Vec<Param>),
}

impl Param {
    /// Render the parameter as a SQL literal.
    pub fn literal(&self) -> Result<String> {
        match self {
            Param::Null => Ok("NULL".to_string()),
            Param::Boolean(b) => Ok(b.to_string()),
            Param::BigInt(n) => Ok(n.to_string()),
            Param::Double(f) => {
                if !f.is_finite() {
                    return Err(PrestoLinkError::Configuration(format!(
                        "{} has no SQL literal form",
                        f
                    )));
                }
                // Debug formatting keeps the decimal point on whole values.
                Ok(format!("{:?}", f))
            }
            Param::String(s) => Ok(escape_string(s)),
            Param::Bytes(bytes) => {
                let s = std::str::from_utf8(bytes).map_err(|e| {
                    PrestoLinkError::Configuration(format!("parameter bytes are not UTF-8: {}", e))
                })?;
                Ok(escape_string(s))
            }
            Param::Date(d) => Ok(format!("date {}", d.format("%Y-%m-%d"))),
            Param::Timestamp(ts) => {
                Ok(format!("timestamp {}", ts.format("%Y-%m-%d %H:%M:%S%.6f")))
            }
            Param::Sequence(items) => {
                let rendered: Result<Vec<String>> = items.iter().map(Param::literal).collect();
                Ok(format!("({})", rendered?.join(",")))
            }
        }
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.literal() {
            Ok(s) => f.write_str(&s),
            Err(_) => f.write_str("<unrepresentable>"),
        }
    }
}

fn escape_string(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

impl From<bool> for Param {
    fn from(b: bool) -> Self {
        Param::Boolean(b)
    }
}

impl From<i32> for Param {
    fn from(n: i32) -> Self {
        Param::BigInt(n.into())
    }
}

impl From<i64> for Param {
    fn from(n: i64) -> Self {
        Param::BigInt(n)
    }
}

impl From<f64> for Param {
    fn from(f: f64) -> Self {
        Param::Double(f)
    }
}

impl From<&str> for Param {
    fn from(s: &str) -> Self {
        Param::String(s.to_string())
    }
}

impl From<String> for Param {
    fn from(s: String) -> Self {
        Param::String(s)
    }
}

impl From<NaiveDate> for Param {
    fn from(d: NaiveDate) -> Self {
        Param::Date(d)
    }
}

impl From<NaiveDateTime> for Param {
    fn from(ts: NaiveDateTime) -> Self {
        Param::Timestamp(ts)
    }
}

impl<T: Into<Param>> From<Option<T>> for Param {
    fn from(opt: Option<T>) -> Self {
        match opt {
            Some(v) => v.into(),
            None => Param::Null,
        }
    }
}

/// Substitute each `?` placeholder outside quoted regions with the
/// corresponding parameter's literal.
///
/// Placeholder and parameter counts must match exactly.
pub fn interpolate(statement: &str, params: &[Param]) -> Result<String> {
    let mut out = String::with_capacity(statement.len());
    let mut next = params.iter();
    let mut in_single = false;
    let mut in_double = false;
    for c in statement.chars() {
        match c {
            '\'' if !in_double => {
                in_single = !in_single;
                out.push(c);
            }
            '"' if !in_single => {
                in_double = !in_double;
                out.push(c);
            }
            '?' if !in_single && !in_double => {
                let param = next.next().ok_or_else(|| {
                    PrestoLinkError::Configuration(
                        "statement has more placeholders than parameters".into(),
                    )
                })?;
                out.push_str(&param.literal()?);
            }
            _ => out.push(c),
        }
    }
    if next.next().is_some() {
        return Err(PrestoLinkError::Configuration(
            "statement has fewer placeholders than parameters".into(),
        ));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lit(param: Param) -> String {
        param.literal().unwrap()
    }

    #[test]
    fn scalar_literals() {
        assert_eq!(lit(Param::String("bar".into())), "'bar'");
        assert_eq!(lit(Param::BigInt(123)), "123");
        assert_eq!(lit(Param::Double(123.456)), "123.456");
        assert_eq!(lit(Param::Double(1.0)), "1.0");
        assert_eq!(lit(Param::Null), "NULL");
        assert_eq!(lit(Param::Boolean(true)), "true");
    }

    #[test]
    fn single_quotes_are_doubled() {
        assert_eq!(lit(Param::String("Let's go".into())), "'Let''s go'");
        assert_eq!(lit(Param::String("''".into())), "''''''");
    }

    #[test]
    fn bytes_render_as_string_literal() {
        assert_eq!(lit(Param::Bytes(b"hello".to_vec())), "'hello'");
        assert!(Param::Bytes(vec![0xff, 0xfe]).literal().is_err());
    }

    #[test]
    fn sequences_render_parenthesized() {
        let seq = Param::Sequence(vec![
            Param::String("a".into()),
            Param::String("b".into()),
            Param::String("c".into()),
        ]);
        assert_eq!(lit(seq), "('a','b','c')");

        let mixed = Param::Sequence(vec![Param::BigInt(1), Param::Null]);
        assert_eq!(lit(mixed), "(1,NULL)");
    }

    #[test]
    fn temporal_literals() {
        let date = NaiveDate::from_ymd_opt(2020, 4, 17).unwrap();
        assert_eq!(lit(Param::Date(date)), "date 2020-04-17");

        let ts = date.and_hms_micro_opt(12, 0, 0, 123456).unwrap();
        assert_eq!(
            lit(Param::Timestamp(ts)),
            "timestamp 2020-04-17 12:00:00.123456"
        );
    }

    #[test]
    fn non_finite_doubles_are_rejected() {
        assert!(Param::Double(f64::NAN).literal().is_err());
        assert!(Param::Double(f64::INFINITY).literal().is_err());
    }

    #[test]
    fn interpolation_substitutes_in_order() {
        let sql = interpolate(
            "SELECT * FROM t WHERE name = ? AND n > ? AND tag IN ?",
            &[
                Param::String("O'Brien".into()),
                Param::BigInt(7),
                Param::Sequence(vec![Param::String("a".into()), Param::String("b".into())]),
            ],
        )
        .unwrap();
        assert_eq!(
            sql,
            "SELECT * FROM t WHERE name = 'O''Brien' AND n > 7 AND tag IN ('a','b')"
        );
    }

    #[test]
    fn placeholders_inside_quotes_are_left_alone() {
        let sql = interpolate(
            r#"SELECT '?' AS q, "col?" FROM t WHERE x = ?"#,
            &[Param::BigInt(1)],
        )
        .unwrap();
        assert_eq!(sql, r#"SELECT '?' AS q, "col?" FROM t WHERE x = 1"#);
    }

    #[test]
    fn count_mismatch_is_rejected() {
        assert!(interpolate("SELECT ?", &[]).is_err());
        assert!(interpolate("SELECT 1", &[Param::BigInt(1)]).is_err());
    }

    #[test]
    fn from_conversions() {
        assert_eq!(Param::from(42i64), Param::BigInt(42));
        assert_eq!(Param::from("x"), Param::String("x".into()));
        assert_eq!(Param::from(None::<i64>), Param::Null);
        assert_eq!(Param::from(Some(1i64)), Param::BigInt(1));
    }
}
