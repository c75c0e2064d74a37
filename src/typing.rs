//! Parser for declared wire type strings.
//!
//! Column descriptors declare types as strings such as `bigint`,
//! `varchar(2147483647)`, `decimal(10,2)`, `array(map(varchar, bigint))` or
//! `row(id bigint, name varchar)`. Parsing never fails: anything the client
//! does not recognize becomes [`PrestoType::Other`] and its cells are passed
//! through undecoded.

/// A declared column type, parsed once per column when the schema is captured.
#[derive(Debug, Clone, PartialEq)]
pub enum PrestoType {
    Boolean,
    TinyInt,
    SmallInt,
    Integer,
    BigInt,
    Real,
    Double,
    Decimal { precision: u32, scale: u32 },
    Varchar,
    Char,
    Json,
    Varbinary,
    Date,
    Time,
    TimeWithTimeZone,
    Timestamp,
    TimestampWithTimeZone,
    Array(Box<PrestoType>),
    Map(Box<PrestoType>, Box<PrestoType>),
    Row(Vec<RowField>),
    /// Unrecognized type; cells are kept as raw JSON.
    Other(String),
}

/// One field of a `row(..)` type. Anonymous fields have no name.
#[derive(Debug, Clone, PartialEq)]
pub struct RowField {
    pub name: Option<String>,
    pub field_type: PrestoType,
}

impl PrestoType {
    /// Parse a declared type string. Unrecognized input yields `Other`.
    pub fn parse(s: &str) -> PrestoType {
        let s = s.trim();
        let (base, args) = split_base(s);
        match base.to_ascii_lowercase().as_str() {
            "boolean" => PrestoType::Boolean,
            "tinyint" => PrestoType::TinyInt,
            "smallint" => PrestoType::SmallInt,
            "integer" | "int" => PrestoType::Integer,
            "bigint" => PrestoType::BigInt,
            "real" => PrestoType::Real,
            "double" => PrestoType::Double,
            "decimal" => parse_decimal(args).unwrap_or_else(|| PrestoType::Other(s.to_string())),
            "varchar" => PrestoType::Varchar,
            "char" => PrestoType::Char,
            "json" => PrestoType::Json,
            "varbinary" => PrestoType::Varbinary,
            "date" => PrestoType::Date,
            "time" => PrestoType::Time,
            "time with time zone" => PrestoType::TimeWithTimeZone,
            "timestamp" => PrestoType::Timestamp,
            "timestamp with time zone" => PrestoType::TimestampWithTimeZone,
            "array" => match args {
                Some(inner) => PrestoType::Array(Box::new(PrestoType::parse(inner))),
                None => PrestoType::Other(s.to_string()),
            },
            "map" => parse_map(args).unwrap_or_else(|| PrestoType::Other(s.to_string())),
            "row" => parse_row(args).unwrap_or_else(|| PrestoType::Other(s.to_string())),
            _ => PrestoType::Other(s.to_string()),
        }
    }

    /// Canonical name used in error attribution.
    pub fn name(&self) -> String {
        match self {
            PrestoType::Boolean => "boolean".into(),
            PrestoType::TinyInt => "tinyint".into(),
            PrestoType::SmallInt => "smallint".into(),
            PrestoType::Integer => "integer".into(),
            PrestoType::BigInt => "bigint".into(),
            PrestoType::Real => "real".into(),
            PrestoType::Double => "double".into(),
            PrestoType::Decimal { precision, scale } => {
                format!("decimal({},{})", precision, scale)
            }
            PrestoType::Varchar => "varchar".into(),
            PrestoType::Char => "char".into(),
            PrestoType::Json => "json".into(),
            PrestoType::Varbinary => "varbinary".into(),
            PrestoType::Date => "date".into(),
            PrestoType::Time => "time".into(),
            PrestoType::TimeWithTimeZone => "time with time zone".into(),
            PrestoType::Timestamp => "timestamp".into(),
            PrestoType::TimestampWithTimeZone => "timestamp with time zone".into(),
            PrestoType::Array(inner) => format!("array({})", inner.name()),
            PrestoType::Map(key, value) => format!("map({}, {})", key.name(), value.name()),
            PrestoType::Row(fields) => {
                let parts: Vec<String> = fields
                    .iter()
                    .map(|f| match &f.name {
                        Some(name) => format!("{} {}", name, f.field_type.name()),
                        None => f.field_type.name(),
                    })
                    .collect();
                format!("row({})", parts.join(", "))
            }
            PrestoType::Other(s) => s.clone(),
        }
    }
}

/// Split `base(args)` into the base name and the parenthesized argument list.
/// Multiword bases like `timestamp with time zone` have no arguments.
fn split_base(s: &str) -> (&str, Option<&str>) {
    match s.find('(') {
        Some(open) if s.ends_with(')') => (s[..open].trim(), Some(&s[open + 1..s.len() - 1])),
        _ => (s, None),
    }
}

/// Split on commas that sit outside any nested parentheses or quotes.
fn split_top_level(s: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut in_quotes = false;
    let mut start = 0;
    for (i, c) in s.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            '(' if !in_quotes => depth += 1,
            ')' if !in_quotes => depth = depth.saturating_sub(1),
            ',' if depth == 0 && !in_quotes => {
                parts.push(s[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    let last = s[start..].trim();
    if !last.is_empty() {
        parts.push(last);
    }
    parts
}

fn parse_decimal(args: Option<&str>) -> Option<PrestoType> {
    let args = args?;
    let parts = split_top_level(args);
    if parts.len() != 2 {
        return None;
    }
    let precision = parts[0].parse().ok()?;
    let scale = parts[1].parse().ok()?;
    Some(PrestoType::Decimal { precision, scale })
}

fn parse_map(args: Option<&str>) -> Option<PrestoType> {
    let parts = split_top_level(args?);
    if parts.len() != 2 {
        return None;
    }
    Some(PrestoType::Map(
        Box::new(PrestoType::parse(parts[0])),
        Box::new(PrestoType::parse(parts[1])),
    ))
}

// Words that start a type rather than name a row field.
const TYPE_STARTERS: &[&str] = &["timestamp", "time", "interval", "double"];

fn parse_row(args: Option<&str>) -> Option<PrestoType> {
    let parts = split_top_level(args?);
    if parts.is_empty() {
        return None;
    }
    let fields = parts.into_iter().map(parse_row_field).collect();
    Some(PrestoType::Row(fields))
}

fn parse_row_field(part: &str) -> RowField {
    let part = part.trim();
    if let Some(rest) = part.strip_prefix('"') {
        // Quoted field name; `""` escapes a literal quote.
        if let Some(end) = find_closing_quote(rest) {
            let name = rest[..end].replace("\"\"", "\"");
            let field_type = PrestoType::parse(rest[end + 1..].trim());
            return RowField {
                name: Some(name),
                field_type,
            };
        }
    }
    match part.find(' ') {
        Some(space) if !TYPE_STARTERS.contains(&part[..space].to_ascii_lowercase().as_str()) => {
            RowField {
                name: Some(part[..space].to_string()),
                field_type: PrestoType::parse(&part[space + 1..]),
            }
        }
        _ => RowField {
            name: None,
            field_type: PrestoType::parse(part),
        },
    }
}

fn find_closing_quote(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'"' {
            if bytes.get(i + 1) == Some(&b'"') {
                i += 2;
                continue;
            }
            return Some(i);
        }
        i += 1;
    }
    None
}
