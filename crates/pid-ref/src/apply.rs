//! Efficiency application: per-track lookup and per-event composition.

use std::collections::HashMap;

use pid_core::{Error, Result};
use pid_hist::EffHists;
use pid_sample::Table;

use crate::index::Assignment;

/// Outcome statistics of one application pass.
#[derive(Debug, Clone, Copy)]
pub struct ApplySummary {
    /// Total rows scored.
    pub n_rows: usize,
    /// Rows with at least one out-of-range axis value.
    pub n_out_of_range: usize,
    /// Mean event efficiency over in-range rows (NaN cells excluded).
    pub mean_eff: f64,
}

impl ApplySummary {
    /// `n_out_of_range / n_rows`, exactly.
    pub fn out_of_range_fraction(&self) -> f64 {
        self.n_out_of_range as f64 / self.n_rows as f64
    }
}

/// Assign per-track and per-event efficiencies with uncertainties.
///
/// Rows with a complete flat index for every prefix get, per prefix, the
/// efficiency and uncertainty of the bin the track falls into (a direct
/// flattened-array gather). The event efficiency is the product over
/// prefixes; treating the prefixes as statistically independent (they come
/// from distinct calibration artifacts), relative uncertainties combine in
/// quadrature and the absolute uncertainty is rebuilt from the product.
///
/// Rows with any missing index keep NaN in every derived column; they are
/// counted and reported, never an error — kinematically extreme reference
/// events are expected to fall outside the calibration binning.
///
/// `compatibility` substitutes 0 for NaN bin efficiencies before lookup,
/// reproducing the convention of older tooling. It silently turns "unknown
/// efficiency" into "zero efficiency", which materially changes downstream
/// results, so it is opt-in and logged.
pub fn add_efficiencies(
    table: &mut Table,
    assignment: &Assignment,
    prefixes: &[String],
    artifacts: &HashMap<String, EffHists>,
    compatibility: bool,
) -> Result<ApplySummary> {
    let n_rows = table.n_rows();
    let complete: Vec<bool> = (0..n_rows).map(|row| assignment.row_is_complete(row)).collect();

    let mut event_eff: Vec<f64> =
        complete.iter().map(|&c| if c { 1.0 } else { f64::NAN }).collect();
    let mut rel_err2: Vec<f64> =
        complete.iter().map(|&c| if c { 0.0 } else { f64::NAN }).collect();

    for prefix in prefixes {
        let hists = artifacts.get(prefix).ok_or_else(|| {
            Error::Artifact(format!("no efficiency histograms supplied for prefix '{prefix}'"))
        })?;

        let mut eff_cells = hists.eff.values().to_vec();
        if compatibility {
            let undefined = eff_cells.iter().filter(|v| v.is_nan()).count();
            if undefined > 0 {
                tracing::warn!(
                    "compatibility mode: treating {undefined} undefined efficiency \
                     bin(s) for '{prefix}' as zero"
                );
            }
            for v in &mut eff_cells {
                if v.is_nan() {
                    *v = 0.0;
                }
            }
        }
        let err_cells = hists.error_hist()?.values().to_vec();

        let flat = assignment.flat_indices(prefix)?;
        if flat.len() != n_rows {
            return Err(Error::Table(format!(
                "assignment for '{prefix}' covers {} rows, table has {n_rows}",
                flat.len()
            )));
        }

        let mut track_eff = vec![f64::NAN; n_rows];
        let mut track_err = vec![f64::NAN; n_rows];
        for (row, index) in flat.iter().enumerate() {
            if !complete[row] {
                continue;
            }
            // Complete rows have an index for every prefix.
            let i = index.expect("complete row with missing index");
            track_eff[row] = eff_cells[i];
            track_err[row] = err_cells[i];
            event_eff[row] *= eff_cells[i];
            let rel = err_cells[i] / eff_cells[i];
            rel_err2[row] += rel * rel;
        }
        table.add_column(format!("{prefix}_eff"), track_eff)?;
        table.add_column(format!("{prefix}_eff_err"), track_err)?;
    }

    let event_err: Vec<f64> = rel_err2
        .iter()
        .zip(&event_eff)
        .map(|(&r2, &eff)| r2.sqrt() * eff)
        .collect();

    let n_out_of_range = complete.iter().filter(|&&c| !c).count();
    if n_rows > 0 {
        tracing::warn!(
            "events out of binning range: {n_out_of_range} ({:.2}%)",
            100.0 * n_out_of_range as f64 / n_rows as f64
        );
    }

    let mut mean_eff = f64::NAN;
    let finite: Vec<f64> =
        event_eff.iter().copied().filter(|v| v.is_finite()).collect();
    if !finite.is_empty() {
        mean_eff = finite.iter().sum::<f64>() / finite.len() as f64;
    }

    table.add_column("eff", event_eff)?;
    table.add_column("eff_err", event_err)?;
    tracing::debug!("particle efficiencies assigned");

    Ok(ApplySummary { n_rows, n_out_of_range, mean_eff })
}
