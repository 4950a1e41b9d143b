//! Detection of under-filtered data requests.
//!
//! Many sources publish several breakdowns (unit, age group, sex, ...) for the
//! same region. When a request leaves one of those breakdowns unselected the
//! server returns one row per combination, and a region ends up with several
//! different values. Rather than hand such a table back, the reconciler looks
//! up which filter fields the caller left open and reports them.

use crate::error::{AmbiguityReport, MissingFilters, Result, Variable};
use crate::models::{CatalogEntry, DataRequest, FilterSet, Level, ObservationRow, ResultTable};
use ahash::{AHashMap, AHashSet};
use indexmap::IndexMap;

/// Source of the possible filter values for a source/year/level.
pub trait FilterCatalog {
    fn catalog(
        &self,
        source: &str,
        year: i32,
        level: Level,
        selections: &FilterSet,
    ) -> Result<Vec<CatalogEntry>>;
}

// -0.0 and 0.0 are the same observation.
fn value_key(v: f64) -> u64 {
    if v == 0.0 { 0 } else { v.to_bits() }
}

/// True when some geo code carries more than one distinct non-missing value.
pub fn has_conflicting_values(
    rows: &[ObservationRow],
    value: impl Fn(&ObservationRow) -> Option<f64>,
) -> bool {
    let mut seen: AHashMap<&str, AHashSet<u64>> = AHashMap::new();
    for row in rows {
        let Some(v) = value(row) else { continue };
        let distinct = seen.entry(row.geo.as_str()).or_default();
        distinct.insert(value_key(v));
        if distinct.len() > 1 {
            return true;
        }
    }
    false
}

/// Fields offering more than one value, in catalog order.
pub fn multi_option_fields(entries: &[CatalogEntry]) -> Vec<String> {
    let mut values: IndexMap<&str, AHashSet<&str>> = IndexMap::new();
    for e in entries {
        values
            .entry(e.field.as_str())
            .or_default()
            .insert(e.value.as_str());
    }
    values
        .into_iter()
        .filter(|(_, v)| v.len() > 1)
        .map(|(f, _)| f.to_string())
        .collect()
}

/// Multi-option fields the caller did not select a value for.
pub fn missing_filters(entries: &[CatalogEntry], selected: &FilterSet) -> Vec<String> {
    multi_option_fields(entries)
        .into_iter()
        .filter(|f| !selected.contains_field(f))
        .collect()
}

/// Return `table` unchanged unless it holds conflicting values per region that
/// can be blamed on unselected filters.
///
/// The catalog is only consulted for a side whose values actually conflict.
/// When every multi-option field was already selected and values still
/// conflict, the table is returned as is.
pub fn reconcile(
    table: ResultTable,
    request: &DataRequest,
    catalog: &impl FilterCatalog,
) -> Result<ResultTable> {
    let x_issue = has_conflicting_values(&table.rows, |r| r.x);
    let y_side = request
        .y_source
        .as_deref()
        .filter(|_| has_conflicting_values(&table.rows, |r| r.y));

    if !x_issue && y_side.is_none() {
        return Ok(table);
    }

    let mut report = AmbiguityReport {
        sources: Vec::new(),
    };

    let sides = [
        x_issue.then_some((Variable::X, request.x_source.as_str(), &request.x_filters)),
        y_side.map(|src| (Variable::Y, src, &request.y_filters)),
    ];
    for (variable, source, filters) in sides.into_iter().flatten() {
        let entries = catalog.catalog(source, request.year, request.level, &FilterSet::new())?;
        let fields = missing_filters(&entries, filters);
        if fields.is_empty() {
            log::warn!(
                "{variable} source {source} has several values per region although all \
                 multi-option filters are set; returning rows unchanged"
            );
            continue;
        }
        log::debug!("{variable} source {source} is missing filters: {fields:?}");
        report.sources.push(MissingFilters {
            variable,
            source: source.to_string(),
            fields,
        });
    }

    if report.sources.is_empty() {
        Ok(table)
    } else {
        Err(report.into())
    }
}
