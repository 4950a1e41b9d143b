//! Synchronous client for the **MapIneq features API**.
//!
//! Each method maps to one named route below the configured base URL and
//! issues a single GET (the data call may add up to two catalog lookups, see
//! [`crate::reconcile`]). There is no caching and no retry: every call hits
//! the network and every failure is returned to the caller.
//!
//! Typical usage:
//! ```no_run
//! # use mapineq_rs::{Client, DataRequest, FilterSet, Level};
//! let client = Client::default();
//! let req = DataRequest::new("TGS00010", 2020, Level::Nuts2).x_filters(FilterSet::from([
//!     ("isced11", "TOTAL"),
//!     ("unit", "PC"),
//!     ("age", "Y_GE15"),
//!     ("freq", "A"),
//! ]));
//! let table = client.data(&req)?;
//! # Ok::<(), mapineq_rs::Error>(())
//! ```

use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::models::{
    CatalogEntry, CatalogField, Coverage, CoverageItem, DataRequest, FilterSet, Level, LevelItem,
    ResultTable, SourceInfo, validate_limit, validate_source,
};
use crate::query::{SourceQuery, SourceSelections};
use crate::reconcile::{self, FilterCatalog};
use crate::schema::{self, RawRow};
use crate::transport::{HttpTransport, Transport, build_url};
use serde::de::DeserializeOwned;
use serde_json::Value;

pub const ROUTE_LEVELS: &str = "get_levels";
pub const ROUTE_SOURCES_BY_LEVEL: &str = "get_source_by_nuts_level";
pub const ROUTE_SOURCES_BY_YEAR_LEVEL: &str = "get_source_by_year_nuts_level";
pub const ROUTE_COVERAGE: &str = "get_year_nuts_level_from_source";
pub const ROUTE_FILTERS: &str = "get_column_values_source_json";
pub const ROUTE_X_DATA: &str = "get_x_data";
pub const ROUTE_XY_DATA: &str = "get_xy_data";

pub const DEFAULT_SOURCES_LIMIT: u32 = 1000;
pub const DEFAULT_COVERAGE_LIMIT: u32 = 1500;
pub const DEFAULT_FILTERS_LIMIT: u32 = 40;

#[derive(Debug, Clone)]
pub struct Client<T = HttpTransport> {
    config: ClientConfig,
    transport: T,
}

impl Default for Client {
    fn default() -> Self {
        Self::new(ClientConfig::default()).expect("reqwest client build")
    }
}

impl Client {
    /// Client backed by a blocking HTTP transport built from `config`.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let transport = HttpTransport::new(&config)?;
        Ok(Self { config, transport })
    }

    /// Like [`Client::new`] with [`ClientConfig::from_env`].
    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env()?)
    }
}

fn check_limit(limit: u32) -> Result<()> {
    if limit == 0 {
        return Err(Error::validation("limit", "must be a positive integer"));
    }
    Ok(())
}

/// Deserialize a top-level JSON array into `Vec<D>`.
fn decode_list<D: DeserializeOwned>(route: &str, v: Value) -> Result<Vec<D>> {
    if !v.is_array() {
        return Err(Error::format(route, "not a top-level array"));
    }
    serde_json::from_value(v).map_err(|e| Error::format(route, e))
}

impl<T: Transport> Client<T> {
    /// Client over any [`Transport`]; used to plug in test doubles or a custom HTTP stack.
    pub fn with_transport(config: ClientConfig, transport: T) -> Self {
        Self { config, transport }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn get(&self, route: &str, params: &[(&str, String)]) -> Result<Value> {
        let url = build_url(&self.config.endpoint(route), params);
        self.transport.get_json(&url)
    }

    /// NUTS levels the API serves, as returned by the server (e.g. `["3","2","1","0"]`).
    pub fn levels(&self) -> Result<Vec<String>> {
        let items: Vec<LevelItem> = decode_list(ROUTE_LEVELS, self.get(ROUTE_LEVELS, &[])?)?;
        Ok(items.into_iter().map(|i| i.f_level).collect())
    }

    /// Sources available at `level`, optionally only those with data for `year`.
    ///
    /// ### Example
    /// ```no_run
    /// # use mapineq_rs::{Client, Level};
    /// let cli = Client::default();
    /// let sources = cli.sources(Level::Nuts3, Some(2020), 10)?;
    /// # Ok::<(), mapineq_rs::Error>(())
    /// ```
    pub fn sources(&self, level: Level, year: Option<i32>, limit: u32) -> Result<Vec<SourceInfo>> {
        check_limit(limit)?;
        let mut params = vec![("_level", level.to_string()), ("limit", limit.to_string())];
        let route = match year {
            Some(y) => {
                params.push(("_year", y.to_string()));
                ROUTE_SOURCES_BY_YEAR_LEVEL
            }
            None => ROUTE_SOURCES_BY_LEVEL,
        };
        decode_list(route, self.get(route, &params)?)
    }

    /// The (level, year) combinations `source` has data for.
    pub fn source_coverage(&self, source: &str, limit: u32) -> Result<Vec<Coverage>> {
        validate_source("source", source)?;
        check_limit(limit)?;
        let params = [("_resource", source.to_string()), ("limit", limit.to_string())];
        let items: Vec<CoverageItem> =
            decode_list(ROUTE_COVERAGE, self.get(ROUTE_COVERAGE, &params)?)?;
        Ok(items
            .into_iter()
            .map(|i| Coverage::from_item(source, i))
            .collect())
    }

    /// Possible filter values for `source` at `year`/`level`, one entry per value.
    ///
    /// `selections` narrows the catalog to values compatible with filters
    /// already chosen; pass an empty set for the full catalog.
    ///
    /// ### Example
    /// ```no_run
    /// # use mapineq_rs::{Client, FilterSet, Level};
    /// let cli = Client::default();
    /// let entries = cli.source_filters("DEMO_R_FIND2", 2020, Level::Nuts2, &FilterSet::new(), 40)?;
    /// for e in &entries {
    ///     println!("{} = {}", e.field, e.value);
    /// }
    /// # Ok::<(), mapineq_rs::Error>(())
    /// ```
    pub fn source_filters(
        &self,
        source: &str,
        year: i32,
        level: Level,
        selections: &FilterSet,
        limit: u32,
    ) -> Result<Vec<CatalogEntry>> {
        validate_source("source", source)?;
        check_limit(limit)?;
        let params = [
            ("_resource", source.to_string()),
            (
                "source_selections",
                SourceSelections::new(year, level.as_str(), selections).to_json()?,
            ),
            ("limit", limit.to_string()),
        ];
        let fields: Vec<CatalogField> =
            decode_list(ROUTE_FILTERS, self.get(ROUTE_FILTERS, &params)?)?;
        Ok(fields
            .into_iter()
            .flat_map(CatalogField::into_entries)
            .collect())
    }

    /// One GET to the univariate (`y == None`) or bivariate data route.
    ///
    /// Returns the raw rows without any column handling; see [`Client::data`]
    /// for the full pipeline.
    pub fn fetch_raw(
        &self,
        x: &SourceQuery,
        y: Option<&SourceQuery>,
        year: i32,
        level: Level,
        limit: u32,
    ) -> Result<Vec<RawRow>> {
        validate_limit(limit)?;
        let mut params = vec![
            ("_level", level.to_string()),
            ("limit", limit.to_string()),
            ("X_JSON", x.to_json()?),
        ];
        let route = match y {
            Some(y) => {
                params.push(("_predictor_year", year.to_string()));
                params.push(("_outcome_year", year.to_string()));
                params.push(("Y_JSON", y.to_json()?));
                ROUTE_XY_DATA
            }
            None => {
                params.push(("_year", year.to_string()));
                ROUTE_X_DATA
            }
        };
        let rows = schema::parse_rows(route, self.get(route, &params)?)?;
        log::info!("{route}: received {} rows", rows.len());
        Ok(rows)
    }

    /// Fetch univariate or bivariate data.
    ///
    /// ### Steps
    /// 1. Validate the request (no network traffic on failure).
    /// 2. Build the x (and y) queries and issue one GET.
    /// 3. Check and normalize columns: `geo, geo_name, geo_source, geo_year,
    ///    x_year[, y_year], x[, y]`.
    /// 4. Unless [`ClientConfig::check_ambiguity`] is off, reject tables with
    ///    several values per region caused by unselected filters.
    ///
    /// ### Errors
    /// - [`Error::Validation`] for bad input
    /// - [`Error::Transport`] / [`Error::Format`] for network or body problems
    /// - [`Error::Schema`] when expected columns are absent
    /// - [`Error::AmbiguousQuery`] naming the filters to add
    pub fn data(&self, req: &DataRequest) -> Result<ResultTable> {
        req.validate()?;
        let x = SourceQuery::new(&req.x_source, &req.x_filters)?;
        let y = req
            .y_source
            .as_deref()
            .map(|s| SourceQuery::new(s, &req.y_filters))
            .transpose()?;

        let rows = self.fetch_raw(&x, y.as_ref(), req.year, req.level, req.limit)?;
        let route = if y.is_some() { ROUTE_XY_DATA } else { ROUTE_X_DATA };
        let table = schema::normalize(route, rows, y.is_some())?;

        if !self.config.check_ambiguity {
            return Ok(table);
        }
        reconcile::reconcile(table, req, self)
    }
}

impl<T: Transport> FilterCatalog for Client<T> {
    fn catalog(
        &self,
        source: &str,
        year: i32,
        level: Level,
        selections: &FilterSet,
    ) -> Result<Vec<CatalogEntry>> {
        self.source_filters(source, year, level, selections, DEFAULT_FILTERS_LIMIT)
    }
}
