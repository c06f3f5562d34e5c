//! Binning axes and axis-order bookkeeping.

use std::fmt;

use serde::{Deserialize, Serialize};

use pid_core::{Error, Result};

/// One binning axis: a named, strictly increasing sequence of bin edges.
///
/// An axis with `n + 1` edges defines `n` bins. Values are located with
/// half-open bins, left edge inclusive, except that a value equal to the very
/// last edge lands in the last bin. The same routine is used when filling
/// calibration histograms and when assigning bin indices to reference events,
/// so a value binned on one side is guaranteed to land in the same cell on
/// the other.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinAxis {
    name: String,
    edges: Vec<f64>,
}

impl BinAxis {
    /// Create a new axis. Requires at least two strictly increasing edges.
    pub fn new(name: impl Into<String>, edges: Vec<f64>) -> Result<Self> {
        let name = name.into();
        if edges.len() < 2 {
            return Err(Error::InvalidBinning(format!(
                "axis '{name}' needs at least 2 edges, got {}",
                edges.len()
            )));
        }
        if !edges.windows(2).all(|w| w[0] < w[1]) {
            return Err(Error::InvalidBinning(format!(
                "axis '{name}' edges are not strictly increasing: {edges:?}"
            )));
        }
        Ok(Self { name, edges })
    }

    /// Variable name this axis bins.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Bin edges (length = `n_bins() + 1`).
    pub fn edges(&self) -> &[f64] {
        &self.edges
    }

    /// Number of bins.
    pub fn n_bins(&self) -> usize {
        self.edges.len() - 1
    }

    /// Lower edge of the first bin.
    pub fn low(&self) -> f64 {
        self.edges[0]
    }

    /// Upper edge of the last bin.
    pub fn high(&self) -> f64 {
        *self.edges.last().unwrap()
    }

    /// Locate a value on this axis.
    ///
    /// Returns `None` for values outside `[low, high]` and for NaN. A value
    /// equal to `high` belongs to the last bin.
    pub fn find_bin(&self, value: f64) -> Option<usize> {
        if value.is_nan() || value < self.low() || value > self.high() {
            return None;
        }
        if value == self.high() {
            return Some(self.n_bins() - 1);
        }
        let i = self.edges.partition_point(|e| *e <= value);
        Some(i - 1)
    }
}

/// Ordered list of axis names attached to a histogram or artifact.
///
/// Flat bin indices are mixed-radix numbers whose digit order is the axis
/// order; two sides that disagree on it would silently read the wrong bins.
/// Compare orders with [`AxisOrder::ensure_matches`] before any flat-index
/// arithmetic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AxisOrder(Vec<String>);

impl AxisOrder {
    /// Build an axis order from names.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(names.into_iter().map(Into::into).collect())
    }

    /// Axis names in storage order.
    pub fn names(&self) -> &[String] {
        &self.0
    }

    /// Fail loudly if `other` lists different axes or a different order.
    pub fn ensure_matches(&self, other: &AxisOrder) -> Result<()> {
        if self != other {
            return Err(Error::AxisOrder {
                expected: self.to_string(),
                found: other.to_string(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for AxisOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join(", "))
    }
}
