//! Conversion of N-dimensional histograms to native 1D/2D/3D histogram
//! objects with per-bin content and optional per-bin errors.
//!
//! Native histogram formats only support up to three axes; attempting to
//! convert a higher-dimensional histogram is an error.

use serde::{Deserialize, Serialize};

use pid_core::{Error, Result};

use crate::histogram::HistogramNd;

/// A 1D histogram with explicit edges and optional per-bin errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Histogram1d {
    /// Histogram name.
    pub name: String,
    /// X axis title (binning variable name).
    pub x_title: String,
    /// Bin edges (length = bins + 1).
    pub x_edges: Vec<f64>,
    /// Bin contents.
    pub bin_content: Vec<f64>,
    /// Per-bin errors, if supplied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bin_error: Option<Vec<f64>>,
}

/// A 2D histogram; contents are row-major with the Y axis varying fastest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Histogram2d {
    /// Histogram name.
    pub name: String,
    /// X axis title.
    pub x_title: String,
    /// Y axis title.
    pub y_title: String,
    /// X bin edges.
    pub x_edges: Vec<f64>,
    /// Y bin edges.
    pub y_edges: Vec<f64>,
    /// Bin contents, row-major.
    pub bin_content: Vec<f64>,
    /// Per-bin errors, if supplied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bin_error: Option<Vec<f64>>,
}

/// A 3D histogram; contents are row-major with the Z axis varying fastest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Histogram3d {
    /// Histogram name.
    pub name: String,
    /// X axis title.
    pub x_title: String,
    /// Y axis title.
    pub y_title: String,
    /// Z axis title.
    pub z_title: String,
    /// X bin edges.
    pub x_edges: Vec<f64>,
    /// Y bin edges.
    pub y_edges: Vec<f64>,
    /// Z bin edges.
    pub z_edges: Vec<f64>,
    /// Bin contents, row-major.
    pub bin_content: Vec<f64>,
    /// Per-bin errors, if supplied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bin_error: Option<Vec<f64>>,
}

/// A converted histogram of whichever dimensionality the source had.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "dim")]
pub enum NativeHistogram {
    /// One axis.
    #[serde(rename = "1d")]
    D1(Histogram1d),
    /// Two axes.
    #[serde(rename = "2d")]
    D2(Histogram2d),
    /// Three axes.
    #[serde(rename = "3d")]
    D3(Histogram3d),
}

/// Convert an N-dimensional histogram into a native histogram object.
///
/// `errors`, when given, must have the same axes as `hist`.
pub fn to_native(
    name: &str,
    hist: &HistogramNd,
    errors: Option<&HistogramNd>,
) -> Result<NativeHistogram> {
    if let Some(errs) = errors {
        hist.same_axes(errs)?;
    }
    let bin_error = errors.map(|e| e.values().to_vec());
    let bin_content = hist.values().to_vec();
    let axes = hist.axes();

    match axes.len() {
        1 => Ok(NativeHistogram::D1(Histogram1d {
            name: name.to_string(),
            x_title: axes[0].name().to_string(),
            x_edges: axes[0].edges().to_vec(),
            bin_content,
            bin_error,
        })),
        2 => Ok(NativeHistogram::D2(Histogram2d {
            name: name.to_string(),
            x_title: axes[0].name().to_string(),
            y_title: axes[1].name().to_string(),
            x_edges: axes[0].edges().to_vec(),
            y_edges: axes[1].edges().to_vec(),
            bin_content,
            bin_error,
        })),
        3 => Ok(NativeHistogram::D3(Histogram3d {
            name: name.to_string(),
            x_title: axes[0].name().to_string(),
            y_title: axes[1].name().to_string(),
            z_title: axes[2].name().to_string(),
            x_edges: axes[0].edges().to_vec(),
            y_edges: axes[1].edges().to_vec(),
            z_edges: axes[2].edges().to_vec(),
            bin_content,
            bin_error,
        })),
        n => Err(Error::Unsupported(format!(
            "{n}-dimensional histograms cannot be converted; native formats \
             support at most 3 axes"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::axis::BinAxis;

    fn axis(name: &str, n: usize) -> BinAxis {
        BinAxis::new(name, (0..=n).map(|i| i as f64).collect()).unwrap()
    }

    #[test]
    fn convert_1d_with_errors() {
        let mut hist = HistogramNd::new(vec![axis("P", 3)]);
        hist.values_mut().copy_from_slice(&[1.0, 2.0, 3.0]);
        let mut errs = HistogramNd::new(vec![axis("P", 3)]);
        errs.values_mut().copy_from_slice(&[0.1, 0.2, 0.3]);

        match to_native("eff", &hist, Some(&errs)).unwrap() {
            NativeHistogram::D1(h) => {
                assert_eq!(h.x_title, "P");
                assert_eq!(h.bin_content, vec![1.0, 2.0, 3.0]);
                assert_eq!(h.bin_error.unwrap(), vec![0.1, 0.2, 0.3]);
            }
            other => panic!("expected 1d, got {other:?}"),
        }
    }

    #[test]
    fn convert_2d_layout() {
        let mut hist = HistogramNd::new(vec![axis("P", 2), axis("ETA", 3)]);
        let cell = hist.flat_index(&[1, 2]);
        hist.values_mut()[cell] = 7.0;

        match to_native("h", &hist, None).unwrap() {
            NativeHistogram::D2(h) => {
                assert_eq!(h.bin_content.len(), 6);
                // Row-major: [1][2] is the last cell.
                assert_eq!(h.bin_content[5], 7.0);
                assert!(h.bin_error.is_none());
            }
            other => panic!("expected 2d, got {other:?}"),
        }
    }

    #[test]
    fn convert_4d_fails() {
        let hist = HistogramNd::new(vec![
            axis("a", 2),
            axis("b", 2),
            axis("c", 2),
            axis("d", 2),
        ]);
        let err = to_native("h", &hist, None).unwrap_err();
        assert!(err.to_string().contains("at most 3 axes"));
    }
}
