use crate::error::Variable;
use crate::models::{ObservationRow, ResultTable};
use serde::Serialize;

/// Summary statistics for one variable of a table.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Summary {
    pub variable: String,
    pub count: usize,
    pub missing: usize,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
    pub median: Option<f64>,
}

fn summarize(variable: Variable, rows: &[ObservationRow]) -> Summary {
    let pick = |r: &ObservationRow| match variable {
        Variable::X => r.x,
        Variable::Y => r.y,
    };
    let mut vals: Vec<f64> = rows.iter().filter_map(pick).collect();
    let missing = rows.len() - vals.len();
    vals.sort_by(f64::total_cmp);

    let count = vals.len();
    let mean = (count > 0).then(|| vals.iter().sum::<f64>() / count as f64);
    let median = if count == 0 {
        None
    } else if count % 2 == 1 {
        Some(vals[count / 2])
    } else {
        Some((vals[count / 2 - 1] + vals[count / 2]) / 2.0)
    };
    Summary {
        variable: variable.to_string(),
        count,
        missing,
        min: vals.first().copied(),
        max: vals.last().copied(),
        mean,
        median,
    }
}

/// Summaries for `x` and, for bivariate tables, `y`.
pub fn table_summary(table: &ResultTable) -> Vec<Summary> {
    let mut out = vec![summarize(Variable::X, &table.rows)];
    if table.bivariate {
        out.push(summarize(Variable::Y, &table.rows));
    }
    out
}
