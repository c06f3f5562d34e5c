//! # pid-hist
//!
//! Binned efficiency model: axes, N-dimensional weighted histograms, default
//! and user-supplied binnings, per-bin efficiency with binomial uncertainty,
//! and the on-disk efficiency artifact.
//!
//! ## Example
//!
//! ```
//! use pid_hist::{BinAxis, HistogramNd};
//!
//! let axis = BinAxis::new("P", vec![0.0, 10.0, 20.0, 30.0]).unwrap();
//! let mut hist = HistogramNd::new(vec![axis]);
//! hist.fill_columns(&[&[5.0, 10.0, 31.0]], &[1.0, 2.0, 1.0]).unwrap();
//! assert_eq!(hist.values(), &[1.0, 2.0, 0.0]);
//! assert_eq!(hist.out_of_range(), 1.0);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod artifact;
pub mod axis;
pub mod binning;
pub mod convert;
pub mod efficiency;
pub mod histogram;

pub use artifact::{hist_filename, EffHists};
pub use axis::{AxisOrder, BinAxis};
pub use binning::BinningConfig;
pub use convert::{to_native, NativeHistogram};
pub use efficiency::{binomial_uncertainty, efficiency};
pub use histogram::HistogramNd;
