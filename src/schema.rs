//! Column checks and renaming for data responses.

use crate::error::{Error, Result};
use crate::models::{ObservationRow, ResultTable};
use ahash::AHashSet;
use serde_json::{Map, Value};

/// Columns `get_x_data` must return.
pub const UNIVARIATE_EXPECTED: [&str; 6] =
    ["geo", "geo_name", "geo_source", "geo_year", "data_year", "x"];

/// Columns `get_xy_data` must return.
pub const BIVARIATE_EXPECTED: [&str; 8] = [
    "geo",
    "geo_name",
    "geo_source",
    "geo_year",
    "predictor_year",
    "outcome_year",
    "x",
    "y",
];

/// Server column name -> public column name.
const RENAMES: [(&str, &str); 3] = [
    ("predictor_year", "x_year"),
    ("outcome_year", "y_year"),
    ("data_year", "x_year"),
];

pub type RawRow = Map<String, Value>;

/// Interpret a response body as a JSON array of flat objects.
pub fn parse_rows(endpoint: &str, body: Value) -> Result<Vec<RawRow>> {
    let Value::Array(items) = body else {
        return Err(Error::format(endpoint, "not a top-level array"));
    };
    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::Object(obj) => Ok(obj),
            other => Err(Error::format(
                endpoint,
                format!("item {i} is not an object: {other}"),
            )),
        })
        .collect()
}

/// Expected columns that no row carries, in `expected` order.
pub fn missing_columns(rows: &[RawRow], expected: &[&str]) -> Vec<String> {
    let present: AHashSet<&str> = rows
        .iter()
        .flat_map(|r| r.keys().map(String::as_str))
        .collect();
    expected
        .iter()
        .filter(|c| !present.contains(**c))
        .map(|c| c.to_string())
        .collect()
}

fn public_name(column: &str) -> &str {
    RENAMES
        .iter()
        .find(|(from, _)| *from == column)
        .map(|(_, to)| *to)
        .unwrap_or(column)
}

/// Check, rename and project raw rows into the public table shape.
///
/// An empty response is a valid table with zero rows. Columns outside the
/// public vocabulary are dropped, and the y columns are dropped for
/// univariate tables. Rows without a geo code cannot be joined to a region;
/// they are skipped with a warning.
pub fn normalize(endpoint: &str, rows: Vec<RawRow>, bivariate: bool) -> Result<ResultTable> {
    if rows.is_empty() {
        return Ok(ResultTable {
            rows: Vec::new(),
            bivariate,
        });
    }

    let expected: &[&str] = if bivariate {
        &BIVARIATE_EXPECTED
    } else {
        &UNIVARIATE_EXPECTED
    };
    let missing = missing_columns(&rows, expected);
    if !missing.is_empty() {
        return Err(Error::Schema { missing });
    }

    let table = ResultTable {
        rows: Vec::new(),
        bivariate,
    };
    let keep = table.columns();

    let rows = rows
        .into_iter()
        .enumerate()
        .filter(|(i, raw)| {
            let has_geo = raw.get("geo").is_some_and(|g| !g.is_null());
            if !has_geo {
                log::warn!("{endpoint}: skipping row {i} without a geo code");
            }
            has_geo
        })
        .map(|(i, raw)| {
            let projected: RawRow = raw
                .into_iter()
                .filter_map(|(k, v)| {
                    let name = public_name(&k);
                    keep.contains(&name).then(|| (name.to_string(), v))
                })
                .collect();
            serde_json::from_value::<ObservationRow>(Value::Object(projected))
                .map_err(|e| Error::format(endpoint, format!("row {i}: {e}")))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(ResultTable { rows, ..table })
}
