//! Error types for pidcal

use thiserror::Error;

/// pidcal error type
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Tabular data error (CSV read/write, malformed cells)
    #[error("table error: {0}")]
    Table(String),

    /// A requested column is not present in a table
    #[error("missing column: '{0}'")]
    MissingColumn(String),

    /// No binning is defined for a (particle, variable) pair
    #[error("no binning defined for particle '{particle}', variable '{variable}'")]
    MissingBinning {
        /// Particle kind that was looked up (after suffix fallback).
        particle: String,
        /// Binning variable name.
        variable: String,
    },

    /// A binning definition is structurally invalid
    #[error("invalid binning: {0}")]
    InvalidBinning(String),

    /// Cut/weight expression error
    #[error("expression error: {0}")]
    Expression(String),

    /// Alias and raw branch names resolve to the same raw column
    #[error("aliases and raw names mixed for the same branch(es): {0}")]
    DuplicateBranches(String),

    /// Two histograms with incompatible axes were combined
    #[error("histogram shape mismatch: {0}")]
    ShapeMismatch(String),

    /// Axis ordering differs between a stored artifact and a lookup
    #[error("axis order mismatch: artifact has [{expected}], lookup uses [{found}]")]
    AxisOrder {
        /// Axis names in artifact storage order.
        expected: String,
        /// Axis names in the order the caller supplied.
        found: String,
    },

    /// Efficiency artifact is malformed or inconsistent
    #[error("artifact error: {0}")]
    Artifact(String),

    /// Calibration sample catalog error
    #[error("catalog error: {0}")]
    Catalog(String),

    /// Operation not supported (e.g. converting a 4-d histogram)
    #[error("not supported: {0}")]
    Unsupported(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
