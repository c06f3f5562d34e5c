//! The persisted efficiency artifact: five aligned histograms per PID cut.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};

use pid_core::{Error, Result};

use crate::axis::AxisOrder;
use crate::efficiency::binomial_uncertainty;
use crate::histogram::HistogramNd;

/// Efficiency histograms for one (sample, magnet, particle, PID cut, binning).
///
/// The five histograms share one set of axes; [`EffHists::load`] verifies
/// this before any lookup can happen. Files are written and read as a single
/// JSON object with the fields in this fixed order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffHists {
    /// Per-bin efficiency (`passing / total`; NaN where `total == 0`).
    pub eff: HistogramNd,
    /// Sum of event weights passing the PID cut.
    pub passing: HistogramNd,
    /// Sum of event weights before the PID cut.
    pub total: HistogramNd,
    /// Sum of squared weights passing the PID cut.
    pub passing_sumw2: HistogramNd,
    /// Sum of squared weights before the PID cut.
    pub total_sumw2: HistogramNd,
}

impl EffHists {
    /// Verify that all five histograms carry identical axes.
    pub fn validate(&self) -> Result<()> {
        for (name, hist) in [
            ("passing", &self.passing),
            ("total", &self.total),
            ("passing_sumw2", &self.passing_sumw2),
            ("total_sumw2", &self.total_sumw2),
        ] {
            self.eff.same_axes(hist).map_err(|e| {
                Error::Artifact(format!("'{name}' axes differ from 'eff': {e}"))
            })?;
        }
        Ok(())
    }

    /// Axis names in storage order, shared by all five histograms.
    pub fn axis_order(&self) -> AxisOrder {
        self.eff.axis_order()
    }

    /// Derive the per-bin uncertainty histogram from the stored counts.
    pub fn error_hist(&self) -> Result<HistogramNd> {
        binomial_uncertainty(&self.passing, &self.total, &self.passing_sumw2, &self.total_sumw2)
    }

    /// Write the artifact as JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path).map_err(|e| {
            Error::Artifact(format!("cannot create '{}': {e}", path.display()))
        })?;
        serde_json::to_writer(BufWriter::new(file), self)?;
        tracing::info!("efficiency histograms saved to '{}'", path.display());
        Ok(())
    }

    /// Read an artifact back. Fails fast if the file is missing, since
    /// scoring a reference sample cannot proceed without it.
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| {
            Error::Artifact(format!(
                "cannot open efficiency histogram file '{}': {e}; \
                 run make-eff-hists with matching parameters first",
                path.display()
            ))
        })?;
        let hists: Self = serde_json::from_reader(BufReader::new(file))?;
        hists.validate()?;
        Ok(hists)
    }
}

/// Artifact filename for one set of parameters.
///
/// Whitespace in the cut string is stripped; binning variables are
/// dot-joined in their axis order.
pub fn hist_filename(
    sample: &str,
    magnet: &str,
    particle: &str,
    pid_cut: &str,
    bin_vars: &[String],
) -> String {
    let cut: String = pid_cut.split_whitespace().collect();
    format!("effhists-{sample}-{magnet}-{particle}-{cut}-{}.json", bin_vars.join("."))
}
