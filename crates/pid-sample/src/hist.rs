//! Table-facing histogram building and cut application.

use pid_core::Result;
use pid_hist::{BinAxis, HistogramNd};

use crate::expr::CutExpr;
use crate::table::Table;

/// Build a weighted histogram of the table over the given axes.
///
/// One table column per axis (matched by axis name) and one event-weight
/// column. With `square_weights` the weight column is squared element-wise
/// before accumulation, producing the variance-support histogram — it is
/// never a value in its own right.
pub fn make_hist(
    table: &Table,
    axes: &[BinAxis],
    weight_column: &str,
    square_weights: bool,
) -> Result<HistogramNd> {
    let columns: Vec<&[f64]> = axes
        .iter()
        .map(|axis| table.column(axis.name()))
        .collect::<Result<_>>()?;

    let weights = table.column(weight_column)?;
    let mut hist = HistogramNd::new(axes.to_vec());
    if square_weights {
        let squared: Vec<f64> = weights.iter().map(|w| w * w).collect();
        hist.fill_columns(&columns, &squared)?;
    } else {
        hist.fill_columns(&columns, weights)?;
    }
    Ok(hist)
}

/// Apply a conjunction of cuts, returning the surviving rows.
///
/// Reports `(rows before, rows after)` alongside the filtered table; the
/// caller aggregates these into per-cut statistics.
pub fn apply_cuts(table: &Table, cuts: &[String]) -> Result<(Table, usize, usize)> {
    let before = table.n_rows();
    let mut mask = vec![true; before];
    for cut in cuts {
        let expr = CutExpr::compile(cut)?;
        for (keep, pass) in mask.iter_mut().zip(expr.eval_mask(table)?) {
            *keep = *keep && pass;
        }
    }
    let filtered = table.filter(&mask)?;
    let after = filtered.n_rows();
    if before > 0 {
        tracing::debug!(
            "{after}/{before} ({:.1}%) events passed cuts {cuts:?}",
            100.0 * after as f64 / before as f64
        );
    }
    Ok((filtered, before, after))
}
