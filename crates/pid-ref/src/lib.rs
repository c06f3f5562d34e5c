//! # pid-ref
//!
//! Scoring of reference samples: locate each tracked particle in the bins of
//! its efficiency artifact, then assign per-track and per-event efficiencies
//! with propagated uncertainties.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod apply;
pub mod index;

pub use apply::{add_efficiencies, ApplySummary};
pub use index::{assign_bin_indices, Assignment};
