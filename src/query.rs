//! Structured queries sent as `X_JSON` / `Y_JSON` parameters.

use crate::error::{Error, Result};
use crate::models::{Condition, FilterSet, validate_source};
use serde::Serialize;

/// A source plus its filter conditions, in the order the caller gave them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceQuery {
    source: String,
    conditions: Vec<Condition>,
}

impl SourceQuery {
    /// Build a query for `source`, one condition per filter entry.
    ///
    /// Field names are not checked against the catalog; the server receives
    /// them verbatim.
    pub fn new(source: &str, filters: &FilterSet) -> Result<Self> {
        validate_source("source", source)?;
        let conditions = filters
            .iter()
            .map(|(field, value)| Condition {
                field: field.to_string(),
                value: value.to_string(),
            })
            .collect();
        Ok(Self {
            source: source.to_string(),
            conditions,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// Compact JSON payload: `{"source":"..","conditions":[{"field":"..","value":".."}]}`.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(Error::encode("source query"))
    }
}

/// Compact `source_selections` payload for the filter catalog endpoint.
#[derive(Debug, Serialize)]
pub(crate) struct SourceSelections<'a> {
    pub year: String,
    pub level: &'a str,
    pub selected: Vec<Condition>,
}

impl<'a> SourceSelections<'a> {
    pub fn new(year: i32, level: &'a str, filters: &FilterSet) -> Self {
        Self {
            year: year.to_string(),
            level,
            selected: filters
                .iter()
                .map(|(field, value)| Condition {
                    field: field.to_string(),
                    value: value.to_string(),
                })
                .collect(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(Error::encode("source_selections"))
    }
}
