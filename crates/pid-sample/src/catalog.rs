//! Calibration-sample catalog.
//!
//! A JSON document keyed `{sample}-Mag{Polarity}-{particle}` lists the data
//! files for each calibration sample, optionally with hard-coded selection
//! cuts. An entry may instead `link` to another entry's file list and inherit
//! its remaining settings, so samples sharing files are declared once.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use pid_core::{Error, Result};

/// One catalog entry as stored on disk.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct CatalogEntry {
    /// Data file paths.
    #[serde(default)]
    pub files: Vec<String>,
    /// Hard-coded selection cuts applied before any user cuts.
    #[serde(default)]
    pub cuts: Vec<String>,
    /// Key of another entry providing the file list.
    #[serde(default)]
    pub link: Option<String>,
}

/// The full catalog, keyed by sample name.
pub type Catalog = HashMap<String, CatalogEntry>;

/// A resolved calibration sample: concrete files plus hard-coded cuts.
#[derive(Debug, Clone)]
pub struct CalibrationSample {
    /// Data file paths.
    pub files: Vec<String>,
    /// Hard-coded selection cuts.
    pub cuts: Vec<String>,
}

/// Read a catalog from a JSON file.
pub fn load_catalog(path: &Path) -> Result<Catalog> {
    tracing::debug!("reading calibration file lists from '{}'", path.display());
    let json = std::fs::read_to_string(path)
        .map_err(|e| Error::Catalog(format!("cannot read '{}': {e}", path.display())))?;
    Ok(serde_json::from_str(&json)?)
}

/// Catalog key for a (sample, magnet polarity, particle) triple.
pub fn sample_key(sample: &str, magnet: &str, particle: &str) -> String {
    let mut polarity = magnet.to_string();
    if let Some(first) = polarity.get_mut(..1) {
        first.make_ascii_uppercase();
    }
    format!("{sample}-Mag{polarity}-{particle}")
}

/// Resolve one calibration sample from the catalog.
///
/// Follows a `link` to the shared file list; the linked entry's non-file
/// settings are inherited unless the entry overrides them. `max_files`
/// truncates the list (testing only — a warning is emitted).
pub fn get_calibration_sample(
    catalog: &Catalog,
    sample: &str,
    magnet: &str,
    particle: &str,
    max_files: Option<usize>,
) -> Result<CalibrationSample> {
    let key = sample_key(sample, magnet, particle);
    let entry = catalog.get(&key).ok_or_else(|| {
        Error::Catalog(format!("sample '{key}' not found; consult the catalog listing"))
    })?;

    let mut files = entry.files.clone();
    let mut cuts = entry.cuts.clone();

    if let Some(link) = &entry.link {
        let linked = catalog.get(link).ok_or_else(|| {
            Error::Catalog(format!("linked sample '{link}' (from '{key}') not found"))
        })?;
        files = linked.files.clone();
        if cuts.is_empty() {
            cuts = linked.cuts.clone();
        }
    }

    if files.is_empty() {
        return Err(Error::Catalog(format!("sample '{key}' has no files")));
    }

    if let Some(max) = max_files {
        tracing::warn!("limiting '{key}' to {max} files; use this only for testing");
        files.truncate(max);
    }

    Ok(CalibrationSample { files, cuts })
}
