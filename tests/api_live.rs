//! Live API tests. Run with: `cargo test --features online -- --nocapture`
#![cfg(feature = "online")]

use mapineq_rs::error::Variable;
use mapineq_rs::{Client, DataRequest, Error, FilterSet, Level};

fn edu_filters() -> FilterSet {
    FilterSet::from([
        ("isced11", "TOTAL"),
        ("unit", "PC"),
        ("age", "Y_GE15"),
        ("freq", "A"),
    ])
}

#[test]
fn levels_are_known() {
    let levels = Client::default().levels().unwrap();
    assert!(!levels.is_empty());
    assert!(levels.iter().all(|l| l.parse::<Level>().is_ok()));
}

#[test]
fn fetch_univariate() {
    let req = DataRequest::new("TGS00010", 2020, Level::Nuts2).x_filters(edu_filters());
    let table = Client::default().data(&req).unwrap();
    assert!(!table.is_empty());
    assert!(!table.bivariate);
    assert!(table.rows.iter().all(|r| r.x_year == Some(2020)));
}

#[test]
fn fetch_bivariate() {
    let req = DataRequest::new("TGS00010", 2020, Level::Nuts2)
        .x_filters(edu_filters())
        .y(
            "DEMO_R_MLIFEXP",
            FilterSet::from([("unit", "YR"), ("age", "Y_LT1"), ("freq", "A")]),
        );
    let table = Client::default().data(&req).unwrap();
    assert!(table.bivariate);
    assert!(!table.is_empty());
}

#[test]
fn underfiltered_request_is_ambiguous() {
    let req = DataRequest::new("TGS00010", 2020, Level::Nuts2)
        .x_filters(FilterSet::from([("unit", "PC"), ("freq", "A")]));
    match Client::default().data(&req) {
        Err(Error::AmbiguousQuery(report)) => {
            assert!(report.missing_for(Variable::X).is_some());
        }
        other => panic!("expected ambiguity, got {other:?}"),
    }
}

#[test]
fn filter_catalog_lists_values() {
    let entries = Client::default()
        .source_filters("DEMO_R_FIND2", 2020, Level::Nuts2, &FilterSet::new(), 40)
        .unwrap();
    assert!(!entries.is_empty());
}
