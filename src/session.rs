//! Per-connection session state.
//!
//! [`ClientSession`] is an immutable snapshot: every request is built from
//! exactly one snapshot, and every response's `Set-`/`Clear-` headers
//! produce the next snapshot via [`ClientSession::apply`]. Snapshots are
//! never mutated in place, so a caller inspecting session fields from
//! another task never observes a torn update.

use crate::error::{PrestoLinkError, Result};
use crate::headers;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::collections::BTreeMap;

/// Immutable session snapshot carried across the requests of a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSession {
    pub user: String,
    pub source: String,
    pub catalog: Option<String>,
    pub schema: Option<String>,
    pub time_zone: Option<String>,
    pub locale: Option<String>,
    pub properties: BTreeMap<String, String>,
    pub prepared_statements: BTreeMap<String, String>,
    pub transaction_id: Option<String>,
}

impl ClientSession {
    pub fn new(user: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            source: headers::DEFAULT_SOURCE.to_string(),
            catalog: None,
            schema: None,
            time_zone: None,
            locale: None,
            properties: BTreeMap::new(),
            prepared_statements: BTreeMap::new(),
            transaction_id: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn with_catalog(mut self, catalog: impl Into<String>) -> Self {
        self.catalog = Some(catalog.into());
        self
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn with_time_zone(mut self, time_zone: impl Into<String>) -> Self {
        self.time_zone = Some(time_zone.into());
        self
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// Build the request headers advertising this snapshot.
    pub fn request_headers(&self) -> Result<HeaderMap> {
        let mut map = HeaderMap::new();
        put(&mut map, headers::HEADER_USER, &self.user)?;
        put(&mut map, headers::HEADER_SOURCE, &self.source)?;
        if let Some(catalog) = &self.catalog {
            put(&mut map, headers::HEADER_CATALOG, catalog)?;
        }
        if let Some(schema) = &self.schema {
            put(&mut map, headers::HEADER_SCHEMA, schema)?;
        }
        if let Some(time_zone) = &self.time_zone {
            put(&mut map, headers::HEADER_TIME_ZONE, time_zone)?;
        }
        if let Some(locale) = &self.locale {
            put(&mut map, headers::HEADER_LANGUAGE, locale)?;
        }
        if !self.properties.is_empty() {
            let joined = self
                .properties
                .iter()
                .map(|(name, value)| format!("{}={}", name, value))
                .collect::<Vec<_>>()
                .join(",");
            put(&mut map, headers::HEADER_SESSION, &joined)?;
        }
        for (name, statement) in &self.prepared_statements {
            let value = HeaderValue::from_str(&format!("{}={}", name, statement))
                .map_err(|e| PrestoLinkError::Configuration(e.to_string()))?;
            map.append(
                HeaderName::from_static(prepared_statement_header()),
                value,
            );
        }
        if let Some(transaction_id) = &self.transaction_id {
            put(&mut map, headers::HEADER_TRANSACTION, transaction_id)?;
        }
        Ok(map)
    }

    /// Derive the next snapshot from a response's session deltas.
    ///
    /// A no-op update yields a structurally equal snapshot.
    pub fn apply(&self, updates: &SessionUpdates) -> ClientSession {
        let mut next = self.clone();
        if let Some(catalog) = &updates.set_catalog {
            next.catalog = Some(catalog.clone());
        }
        if let Some(schema) = &updates.set_schema {
            next.schema = Some(schema.clone());
        }
        for (name, value) in &updates.set_properties {
            next.properties.insert(name.clone(), value.clone());
        }
        for name in &updates.clear_properties {
            next.properties.remove(name);
        }
        for (name, statement) in &updates.added_prepares {
            next.prepared_statements
                .insert(name.clone(), statement.clone());
        }
        for name in &updates.deallocated_prepares {
            next.prepared_statements.remove(name);
        }
        if let Some(id) = &updates.started_transaction {
            next.transaction_id = Some(id.clone());
        }
        if updates.clear_transaction {
            next.transaction_id = None;
        }
        next
    }
}

const fn prepared_statement_header() -> &'static str {
    // HeaderName::from_static requires lowercase.
    "x-presto-prepared-statement"
}

fn put(map: &mut HeaderMap, name: &'static str, value: &str) -> Result<()> {
    let value = HeaderValue::from_str(value).map_err(|e| {
        PrestoLinkError::Configuration(format!("invalid value for {}: {}", name, e))
    })?;
    map.insert(
        HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| PrestoLinkError::Configuration(e.to_string()))?,
        value,
    );
    Ok(())
}

/// Session deltas parsed from one response's headers.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SessionUpdates {
    pub set_catalog: Option<String>,
    pub set_schema: Option<String>,
    pub set_properties: Vec<(String, String)>,
    pub clear_properties: Vec<String>,
    pub added_prepares: Vec<(String, String)>,
    pub deallocated_prepares: Vec<String>,
    pub started_transaction: Option<String>,
    pub clear_transaction: bool,
}

impl SessionUpdates {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let mut updates = SessionUpdates {
            set_catalog: single(headers, crate::headers::HEADER_SET_CATALOG),
            set_schema: single(headers, crate::headers::HEADER_SET_SCHEMA),
            ..Default::default()
        };

        for value in all(headers, crate::headers::HEADER_SET_SESSION) {
            if let Some((name, val)) = value.split_once('=') {
                updates
                    .set_properties
                    .push((name.to_string(), val.to_string()));
            }
        }
        updates.clear_properties = all(headers, crate::headers::HEADER_CLEAR_SESSION);
        for value in all(headers, crate::headers::HEADER_ADDED_PREPARE) {
            if let Some((name, statement)) = value.split_once('=') {
                updates
                    .added_prepares
                    .push((name.to_string(), statement.to_string()));
            }
        }
        updates.deallocated_prepares = all(headers, crate::headers::HEADER_DEALLOCATED_PREPARE);

        if let Some(id) = single(headers, crate::headers::HEADER_STARTED_TRANSACTION) {
            if id != crate::headers::NO_TRANSACTION {
                updates.started_transaction = Some(id);
            }
        }
        updates.clear_transaction =
            headers.contains_key(crate::headers::HEADER_CLEAR_TRANSACTION);

        updates
    }

    pub fn is_empty(&self) -> bool {
        *self == SessionUpdates::default()
    }
}

fn single(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn all(headers: &HeaderMap, name: &str) -> Vec<String> {
    headers
        .get_all(name)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(str::to_string)
        .collect()
}
