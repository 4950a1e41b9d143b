//! mapineq_rs
//!
//! A Rust client for the MapIneq features API: regional socio-economic
//! indicators keyed by NUTS level and year. Pairs with the `mapineq` CLI.
//!
//! ### Features
//! - List NUTS levels, sources, source coverage and per-source filter catalogs
//! - Fetch univariate (x) or bivariate (x, y) data for one year and level
//! - Reject ambiguous results: when a region has several values because a
//!   filter was left open, the error names the fields to set
//! - Save results as CSV or JSON, quick summary statistics
//!
//! ### Example
//! ```no_run
//! use mapineq_rs::{Client, DataRequest, FilterSet, Level};
//!
//! let client = Client::default();
//! let req = DataRequest::new("TGS00010", 2020, Level::Nuts2)
//!     .x_filters(FilterSet::from([
//!         ("isced11", "TOTAL"),
//!         ("unit", "PC"),
//!         ("age", "Y_GE15"),
//!         ("freq", "A"),
//!     ]))
//!     .y(
//!         "DEMO_R_MLIFEXP",
//!         FilterSet::from([("unit", "YR"), ("age", "Y_LT1"), ("freq", "A")]),
//!     );
//! let table = client.data(&req)?;
//! mapineq_rs::storage::save_csv(&table, "edu_vs_lifeexp.csv")?;
//! println!("{:#?}", mapineq_rs::stats::table_summary(&table));
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod query;
pub mod reconcile;
pub mod schema;
pub mod stats;
pub mod storage;
pub mod transport;

pub use api::Client;
pub use config::ClientConfig;
pub use error::{AmbiguityReport, Error, Result};
pub use models::{CatalogEntry, DataRequest, FilterSet, Level, ObservationRow, ResultTable};
pub use query::SourceQuery;
