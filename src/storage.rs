use crate::models::{ObservationRow, ResultTable};
use anyhow::Result;
use csv::WriterBuilder;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

// Cells starting with these are evaluated as formulas by spreadsheet programs.
const FORMULA_STARTERS: [char; 6] = ['=', '+', '-', '@', '\t', '\r'];

fn text_cell(s: &str) -> String {
    if s.starts_with(FORMULA_STARTERS) {
        format!("'{s}")
    } else {
        s.to_string()
    }
}

fn opt_text(s: &Option<String>) -> String {
    s.as_deref().map(text_cell).unwrap_or_default()
}

fn opt_num<N: ToString>(v: Option<N>) -> String {
    v.map(|n| n.to_string()).unwrap_or_default()
}

fn cell(row: &ObservationRow, column: &str) -> String {
    match column {
        "geo" => text_cell(&row.geo),
        "geo_name" => opt_text(&row.geo_name),
        "geo_source" => opt_text(&row.geo_source),
        "geo_year" => opt_num(row.geo_year),
        "x_year" => opt_num(row.x_year),
        "y_year" => opt_num(row.y_year),
        "x" => opt_num(row.x),
        "y" => opt_num(row.y),
        _ => String::new(),
    }
}

/// Write the table as CSV with a header row; missing values are empty cells.
pub fn write_csv<W: Write>(table: &ResultTable, out: W) -> Result<()> {
    let mut wtr = WriterBuilder::new().from_writer(out);
    let columns = table.columns();
    wtr.write_record(columns)?;
    for row in &table.rows {
        wtr.write_record(columns.iter().map(|c| cell(row, c)))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Save the table as CSV with header.
pub fn save_csv<P: AsRef<Path>>(table: &ResultTable, path: P) -> Result<()> {
    write_csv(table, BufWriter::new(File::create(path)?))
}

#[derive(Serialize)]
struct UnivariateRecord<'a> {
    geo: &'a str,
    geo_name: &'a Option<String>,
    geo_source: &'a Option<String>,
    geo_year: Option<i32>,
    x_year: Option<i32>,
    x: Option<f64>,
}

impl<'a> From<&'a ObservationRow> for UnivariateRecord<'a> {
    fn from(r: &'a ObservationRow) -> Self {
        Self {
            geo: &r.geo,
            geo_name: &r.geo_name,
            geo_source: &r.geo_source,
            geo_year: r.geo_year,
            x_year: r.x_year,
            x: r.x,
        }
    }
}

/// Save the table as a pretty JSON array of objects, keys in column order.
pub fn save_json<P: AsRef<Path>>(table: &ResultTable, path: P) -> Result<()> {
    let mut f = BufWriter::new(File::create(path)?);
    let s = if table.bivariate {
        serde_json::to_string_pretty(&table.rows)?
    } else {
        let records: Vec<UnivariateRecord> = table.rows.iter().map(UnivariateRecord::from).collect();
        serde_json::to_string_pretty(&records)?
    };
    f.write_all(s.as_bytes())?;
    f.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn table(bivariate: bool) -> ResultTable {
        ResultTable {
            rows: vec![ObservationRow {
                geo: "DE11".into(),
                geo_name: Some("Stuttgart".into()),
                geo_source: Some("NUTS".into()),
                geo_year: Some(2021),
                x_year: Some(2020),
                y_year: bivariate.then_some(2020),
                x: Some(1.5),
                y: bivariate.then_some(80.1),
            }],
            bivariate,
        }
    }

    #[test]
    fn write_csv_and_json() {
        let dir = tempdir().unwrap();
        let csvp = dir.path().join("x.csv");
        let jsonp = dir.path().join("x.json");
        save_csv(&table(true), &csvp).unwrap();
        save_json(&table(true), &jsonp).unwrap();
        assert!(csvp.exists());
        assert!(jsonp.exists());
    }

    #[test]
    fn univariate_csv_has_no_y_columns() {
        let mut buf = Vec::new();
        write_csv(&table(false), &mut buf).unwrap();
        let txt = String::from_utf8(buf).unwrap();
        let mut lines = txt.lines();
        assert_eq!(lines.next(), Some("geo,geo_name,geo_source,geo_year,x_year,x"));
        assert_eq!(lines.next(), Some("DE11,Stuttgart,NUTS,2021,2020,1.5"));
    }

    #[test]
    fn missing_values_are_empty_cells() {
        let mut t = table(true);
        t.rows[0].y = None;
        let mut buf = Vec::new();
        write_csv(&t, &mut buf).unwrap();
        let txt = String::from_utf8(buf).unwrap();
        assert!(txt.lines().nth(1).unwrap().ends_with(",1.5,"));
    }
}
