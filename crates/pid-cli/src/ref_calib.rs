//! `pidcal ref-calib` — score a reference sample with stored efficiency
//! histograms.
//!
//! The derived per-track and per-event columns are written as a CSV side
//! table next to the efficiency histograms; attaching that table back to the
//! user's original dataset is left to downstream tooling.

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use pid_hist::{hist_filename, EffHists};
use pid_ref::{add_efficiencies, assign_bin_indices};
use pid_sample::{reference_branch_names, Table};

/// Resolved CLI configuration.
pub struct Config {
    pub sample: String,
    pub magnet: String,
    pub ref_file: PathBuf,
    pub ref_pars: Vec<String>,
    pub bin_vars: Vec<String>,
    pub compatibility: bool,
    pub output_dir: PathBuf,
}

/// One tracked particle: branch prefix, particle type and PID cut.
struct RefPar {
    prefix: String,
    particle: String,
    pid_cut: String,
}

impl RefPar {
    /// Parse `"Bach=K:DLLK>4"` (prefix=particle:cut).
    fn parse(spec: &str) -> Result<Self> {
        let (prefix, rest) = spec
            .split_once('=')
            .with_context(|| format!("invalid --ref-par '{spec}': expected PREFIX=PARTICLE:CUT"))?;
        let (particle, pid_cut) = rest
            .split_once(':')
            .with_context(|| format!("invalid --ref-par '{spec}': expected PREFIX=PARTICLE:CUT"))?;
        if prefix.is_empty() || particle.is_empty() || pid_cut.is_empty() {
            bail!("invalid --ref-par '{spec}': empty field");
        }
        Ok(Self {
            prefix: prefix.to_string(),
            particle: particle.to_string(),
            pid_cut: pid_cut.split_whitespace().collect(),
        })
    }
}

/// Parse `"P=mom"` (binning variable = reference branch) or bare `"P"`.
fn parse_bin_var(spec: &str) -> Result<(String, String)> {
    match spec.split_once('=') {
        Some((var, branch)) if !var.is_empty() && !branch.is_empty() => {
            Ok((var.to_string(), branch.to_string()))
        }
        Some(_) => bail!("invalid --bin-var '{spec}': empty field"),
        None => Ok((spec.to_string(), spec.to_string())),
    }
}

pub fn run(config: &Config) -> Result<()> {
    let ref_pars: Vec<RefPar> =
        config.ref_pars.iter().map(|s| RefPar::parse(s)).collect::<Result<_>>()?;
    let bin_vars: Vec<(String, String)> =
        config.bin_vars.iter().map(|s| parse_bin_var(s)).collect::<Result<_>>()?;
    let bin_var_names: Vec<String> = bin_vars.iter().map(|(var, _)| var.clone()).collect();
    let prefixes: Vec<String> = ref_pars.iter().map(|p| p.prefix.clone()).collect();

    let ref_branches = reference_branch_names(&prefixes, &bin_vars);
    tracing::info!("loading reference sample '{}'", config.ref_file.display());
    let mut table = Table::read_csv(&config.ref_file, Some(&ref_branches))?;
    tracing::debug!("reference sample with {} events loaded", table.n_rows());

    let mut artifacts = HashMap::new();
    for par in &ref_pars {
        let path = config.output_dir.join(hist_filename(
            &config.sample,
            &config.magnet,
            &par.particle,
            &par.pid_cut,
            &bin_var_names,
        ));
        tracing::debug!("loading efficiency histograms from '{}'", path.display());
        artifacts.insert(par.prefix.clone(), EffHists::load(&path)?);
    }

    let assignment = assign_bin_indices(&mut table, &prefixes, &bin_vars, &artifacts)?;
    let summary =
        add_efficiencies(&mut table, &assignment, &prefixes, &artifacts, config.compatibility)?;
    tracing::info!("average per-event PID efficiency: {:.2}%", 100.0 * summary.mean_eff);

    // Only the derived columns go to the side table; the input branches stay
    // with the user's dataset.
    let derived: Vec<String> = table
        .column_names()
        .iter()
        .filter(|name| !ref_branches.contains(name))
        .cloned()
        .collect();

    let stem = config
        .ref_file
        .file_stem()
        .and_then(|s| s.to_str())
        .context("reference file has no usable name")?;
    let out_path = config.output_dir.join(format!("{stem}_eff.csv"));
    table.write_csv(&out_path, Some(&derived))?;
    tracing::info!("efficiency table saved to '{}'", out_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn ref_par_parsing() {
        let par = RefPar::parse("Bach=K:DLLK > 4").unwrap();
        assert_eq!(par.prefix, "Bach");
        assert_eq!(par.particle, "K");
        assert_eq!(par.pid_cut, "DLLK>4");
        assert!(RefPar::parse("Bach=K").is_err());
        assert!(RefPar::parse("Bach").is_err());
        assert!(RefPar::parse("=K:DLLK>4").is_err());
    }

    #[test]
    fn bin_var_parsing() {
        assert_eq!(parse_bin_var("P=mom").unwrap(), ("P".to_string(), "mom".to_string()));
        assert_eq!(parse_bin_var("P").unwrap(), ("P".to_string(), "P".to_string()));
        assert!(parse_bin_var("P=").is_err());
    }

    #[test]
    fn scores_reference_sample_from_saved_artifacts() {
        let dir = tempfile::tempdir().unwrap();

        // Calibration: bins [0,10,20,30], eff = [1/1, 2/3, 1].
        let cal = dir.path().join("cal.csv");
        let mut file = std::fs::File::create(&cal).unwrap();
        writeln!(file, "probe_P,probe_PIDK,probe_sWeight").unwrap();
        for (p, dllk, w) in [
            (5.0, 6.0, 1.0),
            (15.0, -1.0, 1.0),
            (15.0, 5.0, 2.0),
            (25.0, 8.0, 1.5),
        ] {
            writeln!(file, "{p},{dllk},{w}").unwrap();
        }
        drop(file);
        let binning_file = dir.path().join("binning.json");
        std::fs::write(&binning_file, r#"{"K": {"P": [0.0, 10.0, 20.0, 30.0]}}"#).unwrap();
        let out = dir.path().join("out");
        crate::make_hists::run(&crate::make_hists::Config {
            sample: "Turbo18".into(),
            magnet: "up".into(),
            particle: "K".into(),
            pid_cuts: vec!["DLLK > 4".into()],
            cuts: vec![],
            bin_vars: vec!["P".into()],
            binning_file: Some(binning_file),
            catalog: None,
            file_list: None,
            local_dataframe: Some(cal),
            max_files: None,
            output_dir: out.clone(),
        })
        .unwrap();

        // Reference sample with the momentum stored under 'mom'.
        let ref_file = dir.path().join("reference.csv");
        let mut file = std::fs::File::create(&ref_file).unwrap();
        writeln!(file, "Bach_mom,other").unwrap();
        writeln!(file, "15.0,1").unwrap();
        writeln!(file, "45.0,2").unwrap();
        drop(file);

        run(&Config {
            sample: "Turbo18".into(),
            magnet: "up".into(),
            ref_file,
            ref_pars: vec!["Bach=K:DLLK>4".into()],
            bin_vars: vec!["P=mom".into()],
            compatibility: false,
            output_dir: out.clone(),
        })
        .unwrap();

        let side = Table::read_csv(&out.join("reference_eff.csv"), None).unwrap();
        // Input branches are not duplicated into the side table.
        assert!(!side.has_column("Bach_mom"));
        assert!(!side.has_column("other"));
        let eff = side.column("eff").unwrap();
        assert_relative_eq!(eff[0], 2.0 / 3.0);
        assert!(eff[1].is_nan());
        assert_eq!(side.column("Bach_eff_bin").unwrap()[0], 1.0);
    }
}
