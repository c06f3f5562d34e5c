//! Binning configuration: default edge tables plus user overrides.
//!
//! The configuration is an explicit value constructed once per run and passed
//! to both the calibration-side histogram builder and the reference-side
//! index assigner, so both provably bin with the same axes.

use std::collections::HashMap;
use std::path::Path;

use pid_core::{Error, Result};

use crate::axis::BinAxis;

/// Edge tables keyed by (particle kind, variable name).
///
/// Lookup tries the exact particle kind first; if that fails, the first
/// `_`-delimited suffix is stripped and the lookup retried once, so e.g.
/// `K_DsPhi` falls back to the `K` tables. Custom entries replace defaults
/// wholesale, never merge.
#[derive(Debug, Clone)]
pub struct BinningConfig {
    entries: HashMap<String, HashMap<String, Vec<f64>>>,
    override_keys: Vec<(String, String)>,
}

impl BinningConfig {
    /// Configuration with no entries at all.
    pub fn empty() -> Self {
        Self { entries: HashMap::new(), override_keys: Vec::new() }
    }

    /// Configuration pre-loaded with the default edge tables.
    pub fn new() -> Self {
        let mut config = Self::empty();
        for particle in ["Pi", "K", "P"] {
            config.insert_defaults(particle, hadron_momentum_edges());
        }
        config.insert_defaults("Mu", muon_momentum_edges());
        config
    }

    fn insert_defaults(&mut self, particle: &str, momentum: Vec<f64>) {
        let vars = self.entries.entry(particle.to_string()).or_default();
        vars.insert("P".into(), momentum.clone());
        vars.insert("Brunel_P".into(), momentum);
        vars.insert("ETA".into(), eta_edges());
        vars.insert("Brunel_ETA".into(), eta_edges());
        vars.insert("nTracks".into(), ntracks_edges());
        vars.insert("nTracks_Brunel".into(), ntracks_edges());
        vars.insert("nSPDhits".into(), nspdhits_edges());
        vars.insert("nSPDhits_Brunel".into(), nspdhits_edges());
        vars.insert("TRCHI2NDOF".into(), track_chi2_edges());
    }

    /// Bin edges for a (particle, variable) pair.
    pub fn get(&self, particle: &str, variable: &str) -> Result<&[f64]> {
        if let Some(edges) = self.entries.get(particle).and_then(|v| v.get(variable)) {
            return Ok(edges);
        }
        // Calibration-sample variants like K_DsPhi share the base binning.
        if let Some(base) = particle.split('_').next() {
            if base != particle {
                if let Some(edges) = self.entries.get(base).and_then(|v| v.get(variable)) {
                    return Ok(edges);
                }
            }
        }
        Err(Error::MissingBinning {
            particle: particle.to_string(),
            variable: variable.to_string(),
        })
    }

    /// Insert or replace the edges for a (particle, variable) pair.
    pub fn set(&mut self, particle: &str, variable: &str, edges: Vec<f64>) -> Result<()> {
        if edges.len() < 2 {
            return Err(Error::InvalidBinning(format!(
                "binning for ('{particle}', '{variable}') needs at least 2 edges, got {}",
                edges.len()
            )));
        }
        self.entries
            .entry(particle.to_string())
            .or_default()
            .insert(variable.to_string(), edges);
        Ok(())
    }

    /// Apply overrides from a JSON document `{particle: {variable: [edges]}}`.
    ///
    /// Every entry replaces any default for the same pair.
    pub fn load_overrides_str(&mut self, json: &str) -> Result<()> {
        let doc: HashMap<String, HashMap<String, Vec<f64>>> = serde_json::from_str(json)?;
        for (particle, vars) in doc {
            for (variable, edges) in vars {
                tracing::debug!("custom binning for ('{particle}', '{variable}'): {edges:?}");
                self.set(&particle, &variable, edges)?;
                self.override_keys.push((particle.clone(), variable));
            }
        }
        Ok(())
    }

    /// Apply overrides from a JSON file.
    pub fn load_overrides_file(&mut self, path: &Path) -> Result<()> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            Error::InvalidBinning(format!("cannot read binning file '{}': {e}", path.display()))
        })?;
        self.load_overrides_str(&json)
    }

    /// Warn about override entries that the current run never queried.
    ///
    /// Advisory only: an unused override usually means a typo in the particle
    /// or variable name.
    pub fn report_unused_overrides(&self, particle: &str, bin_vars: &[String]) {
        let base = particle.split('_').next().unwrap_or(particle);
        for (p, v) in &self.override_keys {
            let particle_used = p == particle || p == base;
            if !particle_used || !bin_vars.iter().any(|bv| bv == v) {
                tracing::warn!(
                    "custom binning for ('{p}', '{v}') was never used; \
                     check the particle and variable names"
                );
            }
        }
    }

    /// Build the axes for one particle over an ordered list of variables.
    pub fn axes(&self, particle: &str, bin_vars: &[String]) -> Result<Vec<BinAxis>> {
        bin_vars
            .iter()
            .map(|var| BinAxis::new(var.clone(), self.get(particle, var)?.to_vec()))
            .collect()
    }
}

impl Default for BinningConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// `n` evenly spaced edges from `low` to `high` inclusive.
fn linspace(low: f64, high: f64, n: usize) -> Vec<f64> {
    let step = (high - low) / (n - 1) as f64;
    (0..n).map(|i| low + step * i as f64).collect()
}

/// Momentum edges for Pi/K/P [MeV]: RICH radiator kaon thresholds, then a
/// uniform tail up to the calibration-sample momentum cutoff.
fn hadron_momentum_edges() -> Vec<f64> {
    let mut edges = vec![3000.0];
    edges.push(9300.0); // R1 kaon threshold
    edges.push(15600.0); // R2 kaon threshold
    edges.extend(linspace(19000.0, 100000.0, 16));
    edges
}

/// Momentum edges for Mu [MeV].
fn muon_momentum_edges() -> Vec<f64> {
    vec![
        3000.0, 6000.0, 8000.0, 10000.0, 12000.0, 14500.0, 17500.0, 21500.0, 27000.0, 32000.0,
        40000.0, 60000.0, 70000.0, 100000.0,
    ]
}

fn eta_edges() -> Vec<f64> {
    linspace(1.5, 5.0, 5)
}

fn ntracks_edges() -> Vec<f64> {
    vec![0.0, 50.0, 200.0, 300.0, 500.0]
}

fn nspdhits_edges() -> Vec<f64> {
    vec![0.0, 200.0, 400.0, 600.0, 800.0, 1000.0]
}

fn track_chi2_edges() -> Vec<f64> {
    linspace(0.0, 3.0, 4)
}
