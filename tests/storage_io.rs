use mapineq_rs::models::{ObservationRow, ResultTable};
use mapineq_rs::storage;
use tempfile::tempdir;

fn sample(n: usize, bivariate: bool) -> ResultTable {
    let rows = (0..n)
        .map(|i| ObservationRow {
            geo: format!("DE{}", i + 1),
            geo_name: Some(format!("Region {i}")),
            geo_source: Some("NUTS".into()),
            geo_year: Some(2021),
            x_year: Some(2020),
            y_year: bivariate.then_some(2020),
            x: Some(100.0 + i as f64),
            y: bivariate.then(|| 80.0 - i as f64),
        })
        .collect();
    ResultTable { rows, bivariate }
}

#[test]
fn save_csv_and_json() {
    let table = sample(3, true);
    let dir = tempdir().unwrap();

    let csv_path = dir.path().join("mapineq_test.csv");
    storage::save_csv(&table, &csv_path).unwrap();
    let csv_txt = std::fs::read_to_string(&csv_path).unwrap();
    assert!(csv_txt.starts_with("geo,geo_name,geo_source,geo_year,x_year,y_year,x,y"));
    assert_eq!(csv_txt.lines().count(), 1 + table.len());

    let json_path = dir.path().join("mapineq_test.json");
    storage::save_json(&table, &json_path).unwrap();
    let json_txt = std::fs::read_to_string(&json_path).unwrap();
    let v: serde_json::Value = serde_json::from_str(&json_txt).unwrap();
    assert_eq!(v.as_array().unwrap().len(), table.len());
    assert_eq!(v[0]["y"], 80.0);
}

#[test]
fn univariate_json_omits_y_keys() {
    let table = sample(2, false);
    let dir = tempdir().unwrap();
    let path = dir.path().join("uni.json");
    storage::save_json(&table, &path).unwrap();
    let v: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    let obj = v[0].as_object().unwrap();
    assert!(obj.contains_key("x_year"));
    assert!(!obj.contains_key("y"));
    assert!(!obj.contains_key("y_year"));
}

// Cells starting with =, +, -, @ are treated as formulas by spreadsheet programs;
// text cells are prefixed with a single quote to keep them inert.
#[test]
fn csv_cells_are_prefixed_to_avoid_formulas() {
    let mut table = sample(1, false);
    table.rows[0].geo = "=HYPERLINK(\"http://evil\")".into();
    table.rows[0].geo_name = Some("+SUM(A1:A9)".into());
    table.rows[0].geo_source = Some("@foo".into());

    let dir = tempdir().unwrap();
    let path = dir.path().join("csv_injection.csv");
    storage::save_csv(&table, &path).unwrap();

    let mut rdr = csv::Reader::from_path(&path).unwrap();
    let headers = rdr.headers().unwrap().clone();
    let row = rdr.records().next().expect("one data row expected").unwrap();
    let cell = |name: &str| {
        let idx = headers
            .iter()
            .position(|h| h == name)
            .expect("header present");
        row.get(idx).unwrap().to_string()
    };

    let geo = cell("geo");
    assert!(geo.starts_with('\''), "geo not prefixed: {geo}");
    assert!(geo.contains("=HYPERLINK"), "geo content changed: {geo}");
    assert!(cell("geo_name").starts_with("'+SUM"));
    assert!(cell("geo_source").starts_with("'@foo"));
    // Numbers are written as is.
    assert_eq!(cell("x"), "100");
}
