use crate::error::{Error, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// NUTS classification level accepted by every endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Level {
    /// Countries
    Nuts0,
    Nuts1,
    Nuts2,
    /// Small regions
    Nuts3,
}

impl Level {
    pub const ALL: [Level; 4] = [Level::Nuts0, Level::Nuts1, Level::Nuts2, Level::Nuts3];

    /// Wire representation: `"0"` .. `"3"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Nuts0 => "0",
            Level::Nuts1 => "1",
            Level::Nuts2 => "2",
            Level::Nuts3 => "3",
        }
    }
}

impl FromStr for Level {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "0" => Ok(Level::Nuts0),
            "1" => Ok(Level::Nuts1),
            "2" => Ok(Level::Nuts2),
            "3" => Ok(Level::Nuts3),
            other => Err(Error::validation(
                "level",
                format!("{other:?}; must be one of \"0\", \"1\", \"2\", \"3\""),
            )),
        }
    }
}

impl TryFrom<String> for Level {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<Level> for String {
    fn from(l: Level) -> Self {
        l.as_str().to_string()
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Selected filter values for one source, keyed by field name.
///
/// Insertion order is kept so that serialized requests are deterministic.
/// Inserting a field twice replaces the value but keeps the original position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterSet(IndexMap<String, String>);

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(field.into(), value.into())
    }

    /// Builder-style [`FilterSet::insert`].
    pub fn with(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(field, value);
        self
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn contains_field(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FilterSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut set = FilterSet::new();
        for (k, v) in iter {
            set.insert(k, v);
        }
        set
    }
}

impl<K: Into<String>, V: Into<String>, const N: usize> From<[(K, V); N]> for FilterSet {
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

/// One `field = value` restriction sent to the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub field: String,
    pub value: String,
}

/// Parameters of a data request for one (x) or two (x, y) variables.
#[derive(Debug, Clone, PartialEq)]
pub struct DataRequest {
    pub x_source: String,
    pub x_filters: FilterSet,
    pub y_source: Option<String>,
    pub y_filters: FilterSet,
    pub year: i32,
    pub level: Level,
    pub limit: u32,
}

impl DataRequest {
    pub const DEFAULT_LIMIT: u32 = 2500;
    pub const MAX_LIMIT: u32 = 10_000;

    /// Univariate request with no filters and the default limit.
    pub fn new(x_source: impl Into<String>, year: i32, level: Level) -> Self {
        Self {
            x_source: x_source.into(),
            x_filters: FilterSet::new(),
            y_source: None,
            y_filters: FilterSet::new(),
            year,
            level,
            limit: Self::DEFAULT_LIMIT,
        }
    }

    pub fn x_filters(mut self, filters: impl Into<FilterSet>) -> Self {
        self.x_filters = filters.into();
        self
    }

    /// Turn this into a bivariate request with `source` as the outcome variable.
    pub fn y(mut self, source: impl Into<String>, filters: impl Into<FilterSet>) -> Self {
        self.y_source = Some(source.into());
        self.y_filters = filters.into();
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    pub fn is_bivariate(&self) -> bool {
        self.y_source.is_some()
    }

    /// Check caller input; runs before anything touches the network.
    pub fn validate(&self) -> Result<()> {
        validate_source("x_source", &self.x_source)?;
        if let Some(y) = &self.y_source {
            validate_source("y_source", y)?;
        }
        validate_limit(self.limit)
    }
}

/// Data routes accept at most [`DataRequest::MAX_LIMIT`] rows.
pub(crate) fn validate_limit(limit: u32) -> Result<()> {
    if !(1..=DataRequest::MAX_LIMIT).contains(&limit) {
        return Err(Error::validation(
            "limit",
            format!("{limit} is outside 1..={}", DataRequest::MAX_LIMIT),
        ));
    }
    Ok(())
}

pub(crate) fn validate_source(field: &'static str, source: &str) -> Result<()> {
    if source.trim().is_empty() {
        return Err(Error::validation(field, "must be a non-empty string"));
    }
    Ok(())
}

/// One region in a data response, after column normalization.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ObservationRow {
    pub geo: String,
    #[serde(default)]
    pub geo_name: Option<String>,
    #[serde(default)]
    pub geo_source: Option<String>,
    #[serde(default, deserialize_with = "de_opt_i32_from_string_or_number")]
    pub geo_year: Option<i32>,
    #[serde(default, deserialize_with = "de_opt_i32_from_string_or_number")]
    pub x_year: Option<i32>,
    #[serde(default, deserialize_with = "de_opt_i32_from_string_or_number")]
    pub y_year: Option<i32>,
    #[serde(default, deserialize_with = "de_opt_f64_from_string_or_number")]
    pub x: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_f64_from_string_or_number")]
    pub y: Option<f64>,
}

/// Rows returned by a data request.
///
/// `bivariate` tells whether the y columns are part of the table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultTable {
    pub rows: Vec<ObservationRow>,
    pub bivariate: bool,
}

impl ResultTable {
    pub const UNIVARIATE_COLUMNS: [&'static str; 6] =
        ["geo", "geo_name", "geo_source", "geo_year", "x_year", "x"];
    pub const BIVARIATE_COLUMNS: [&'static str; 8] = [
        "geo",
        "geo_name",
        "geo_source",
        "geo_year",
        "x_year",
        "y_year",
        "x",
        "y",
    ];

    /// Public column names, in output order.
    pub fn columns(&self) -> &'static [&'static str] {
        if self.bivariate {
            &Self::BIVARIATE_COLUMNS
        } else {
            &Self::UNIVARIATE_COLUMNS
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// One possible value of one filter field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CatalogEntry {
    pub field: String,
    pub field_label: Option<String>,
    pub value: String,
    pub label: Option<String>,
}

/// Raw filter field from `get_column_values_source_json`.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogField {
    pub field: String,
    #[serde(default)]
    pub field_label: Option<String>,
    #[serde(default)]
    pub field_values: Vec<CatalogValue>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogValue {
    #[serde(default, deserialize_with = "de_opt_string_from_string_or_number")]
    pub value: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
}

impl CatalogField {
    /// Flatten into one entry per value. Values the server sends as `null`
    /// cannot be selected and are dropped.
    pub fn into_entries(self) -> impl Iterator<Item = CatalogEntry> {
        let CatalogField {
            field,
            field_label,
            field_values,
        } = self;
        field_values.into_iter().filter_map(move |v| {
            Some(CatalogEntry {
                field: field.clone(),
                field_label: field_label.clone(),
                value: v.value?,
                label: v.label,
            })
        })
    }
}

/// Raw item from `get_levels`.
#[derive(Debug, Clone, Deserialize)]
pub struct LevelItem {
    #[serde(deserialize_with = "de_string_from_string_or_number")]
    pub f_level: String,
}

/// A dataset exposed by the API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceInfo {
    #[serde(alias = "f_resource")]
    pub source_name: String,
    #[serde(default, alias = "f_short_description")]
    pub short_description: Option<String>,
    #[serde(default, alias = "f_description")]
    pub description: Option<String>,
}

/// Raw item from `get_year_nuts_level_from_source`.
#[derive(Debug, Clone, Deserialize)]
pub struct CoverageItem {
    #[serde(deserialize_with = "de_string_from_string_or_number")]
    pub f_level: String,
    #[serde(deserialize_with = "de_i32_from_string_or_number")]
    pub f_year: i32,
    #[serde(default)]
    pub f_short_description: Option<String>,
    #[serde(default)]
    pub f_description: Option<String>,
}

/// One (level, year) combination a source covers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Coverage {
    pub nuts_level: String,
    pub year: i32,
    pub source_name: String,
    pub short_description: Option<String>,
    pub description: Option<String>,
}

impl Coverage {
    pub fn from_item(source_name: &str, item: CoverageItem) -> Self {
        Self {
            nuts_level: item.f_level,
            year: item.f_year,
            source_name: source_name.to_string(),
            short_description: item.f_short_description,
            description: item.f_description,
        }
    }
}

// The API is loose about scalar types: years and codes arrive either as JSON
// numbers or as strings depending on the endpoint. The helpers below accept both.

/// Scalar as seen on the wire.
#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Int(i64),
    Float(f64),
    Str(String),
}

fn de_string_from_string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match Scalar::deserialize(deserializer)? {
        Scalar::Int(i) => i.to_string(),
        Scalar::Float(f) => f.to_string(),
        Scalar::Str(s) => s,
    })
}

fn de_opt_string_from_string_or_number<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Scalar>::deserialize(deserializer)?.map(|s| match s {
        Scalar::Int(i) => i.to_string(),
        Scalar::Float(f) => f.to_string(),
        Scalar::Str(s) => s,
    }))
}

fn scalar_to_i32<E: serde::de::Error>(s: Scalar) -> std::result::Result<i32, E> {
    match s {
        Scalar::Int(i) => i32::try_from(i).map_err(E::custom),
        Scalar::Float(f) if f.fract() == 0.0 && f.abs() <= i32::MAX as f64 => Ok(f as i32),
        Scalar::Float(f) => Err(E::custom(format!("expected an integer year, got {f}"))),
        Scalar::Str(s) => s.trim().parse::<i32>().map_err(E::custom),
    }
}

fn de_i32_from_string_or_number<'de, D>(deserializer: D) -> std::result::Result<i32, D::Error>
where
    D: serde::Deserializer<'de>,
{
    scalar_to_i32(Scalar::deserialize(deserializer)?)
}

fn de_opt_i32_from_string_or_number<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<i32>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match Option::<Scalar>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Scalar::Str(s)) if s.trim().is_empty() => Ok(None),
        Some(s) => scalar_to_i32(s).map(Some),
    }
}

/// Missing, empty and `NaN` values all mean "no observation".
fn de_opt_f64_from_string_or_number<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<f64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let v = match Option::<Scalar>::deserialize(deserializer)? {
        None => return Ok(None),
        Some(Scalar::Int(i)) => i as f64,
        Some(Scalar::Float(f)) => f,
        Some(Scalar::Str(s)) => {
            let s = s.trim();
            if s.is_empty() {
                return Ok(None);
            }
            s.parse::<f64>().map_err(<D::Error as serde::de::Error>::custom)?
        }
    };
    Ok(if v.is_nan() { None } else { Some(v) })
}
