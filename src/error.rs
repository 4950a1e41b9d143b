//! Error types for the MapIneq client.

use std::fmt;
use thiserror::Error;

/// Errors returned by every fallible operation in this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed caller input, detected before any network call.
    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    /// The request could not be completed or returned a non-success status.
    #[error("request to {url} failed: {reason}")]
    Transport {
        url: String,
        status: Option<u16>,
        reason: String,
    },

    /// The response body was not the JSON shape the endpoint promises.
    #[error("unexpected response format from {endpoint}: {reason}")]
    Format { endpoint: String, reason: String },

    /// Expected columns are absent from an otherwise well-formed response.
    #[error(
        "the following expected columns are missing from the response: {}. \
         The API may be down or might have changed. Please try again later.",
        .missing.join(", ")
    )]
    Schema { missing: Vec<String> },

    /// Duplicate values per region caused by unselected multi-option filters.
    #[error(transparent)]
    AmbiguousQuery(#[from] AmbiguityReport),

    /// A request payload could not be serialized.
    #[error("failed to encode {what}: {source}")]
    Encode {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// Invalid client configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type for MapIneq operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }

    pub(crate) fn encode(what: &'static str) -> impl FnOnce(serde_json::Error) -> Self {
        move |source| Self::Encode { what, source }
    }

    pub(crate) fn format(endpoint: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::Format {
            endpoint: endpoint.into(),
            reason: reason.to_string(),
        }
    }
}

/// Which side of a data request a source belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variable {
    X,
    Y,
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variable::X => write!(f, "x"),
            Variable::Y => write!(f, "y"),
        }
    }
}

/// One under-filtered source: the filter fields that still have several values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingFilters {
    pub variable: Variable,
    pub source: String,
    pub fields: Vec<String>,
}

/// Every under-filtered source found while reconciling one response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmbiguityReport {
    pub sources: Vec<MissingFilters>,
}

impl AmbiguityReport {
    /// Missing fields reported for the given side, if that side was ambiguous.
    pub fn missing_for(&self, variable: Variable) -> Option<&[String]> {
        self.sources
            .iter()
            .find(|m| m.variable == variable)
            .map(|m| m.fields.as_slice())
    }
}

impl fmt::Display for AmbiguityReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "the query returned several values per region because some filters were not set"
        )?;
        for m in &self.sources {
            write!(
                f,
                "; {} source `{}` is missing filters for: {}",
                m.variable,
                m.source,
                m.fields.join(", ")
            )?;
        }
        write!(
            f,
            ". Use `source_filters` (CLI: `mapineq filters`) to list the available values \
             and add them to the request"
        )
    }
}

impl std::error::Error for AmbiguityReport {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_error_lists_columns() {
        let err = Error::Schema {
            missing: vec!["geo".into(), "x".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("missing from the response: geo, x."));
        assert!(msg.contains("might have changed"));
    }

    #[test]
    fn encode_error_names_payload_and_keeps_source() {
        use std::error::Error as _;
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = Error::encode("X_JSON")(json_err);
        assert!(err.to_string().starts_with("failed to encode X_JSON:"));
        assert!(err.source().is_some());
        assert!(!matches!(err, Error::Validation { .. }));
    }

    #[test]
    fn ambiguity_message_names_sources_and_fields() {
        let report = AmbiguityReport {
            sources: vec![
                MissingFilters {
                    variable: Variable::X,
                    source: "TGS00010".into(),
                    fields: vec!["sex".into()],
                },
                MissingFilters {
                    variable: Variable::Y,
                    source: "DEMO_R_MLIFEXP".into(),
                    fields: vec!["age".into(), "unit".into()],
                },
            ],
        };
        let msg = Error::from(report.clone()).to_string();
        assert!(msg.contains("x source `TGS00010` is missing filters for: sex"));
        assert!(msg.contains("y source `DEMO_R_MLIFEXP` is missing filters for: age, unit"));
        assert!(msg.contains("source_filters"));
        assert_eq!(report.missing_for(Variable::Y).unwrap(), ["age", "unit"]);
    }
}
