//! `pidcal make-eff-hists` — build efficiency histograms from calibration data.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use rayon::prelude::*;

use pid_hist::{efficiency, hist_filename, BinAxis, BinningConfig, EffHists, HistogramNd};
use pid_sample::{
    apply_cuts, get_calibration_sample, load_catalog, make_hist, relevant_branch_names, Table,
};

/// Resolved CLI configuration.
pub struct Config {
    pub sample: String,
    pub magnet: String,
    pub particle: String,
    pub pid_cuts: Vec<String>,
    pub cuts: Vec<String>,
    pub bin_vars: Vec<String>,
    pub binning_file: Option<PathBuf>,
    pub catalog: Option<PathBuf>,
    pub file_list: Option<PathBuf>,
    pub local_dataframe: Option<PathBuf>,
    pub max_files: Option<usize>,
    pub output_dir: PathBuf,
}

/// Histograms for one PID cut: passing counts and their variance support.
struct CutHists {
    passing: HistogramNd,
    passing_sumw2: HistogramNd,
}

/// Everything accumulated from one calibration file.
struct FileHists {
    total: HistogramNd,
    total_sumw2: HistogramNd,
    per_cut: BTreeMap<String, CutHists>,
    stats: CutStats,
}

impl FileHists {
    fn merge(mut self, other: FileHists) -> Result<FileHists> {
        self.total.add_in_place(&other.total)?;
        self.total_sumw2.add_in_place(&other.total_sumw2)?;
        for (cut, theirs) in other.per_cut {
            let ours = self
                .per_cut
                .get_mut(&cut)
                .with_context(|| format!("cut '{cut}' missing in merge"))?;
            ours.passing.add_in_place(&theirs.passing)?;
            ours.passing_sumw2.add_in_place(&theirs.passing_sumw2)?;
        }
        self.stats.merge(&other.stats);
        Ok(self)
    }
}

/// Events before/after each named cut stage, aggregated across files.
#[derive(Debug, Clone, Default)]
struct CutStats(BTreeMap<String, (usize, usize)>);

impl CutStats {
    fn record(&mut self, name: &str, before: usize, after: usize) {
        let entry = self.0.entry(name.to_string()).or_insert((0, 0));
        entry.0 += before;
        entry.1 += after;
    }

    fn merge(&mut self, other: &CutStats) {
        for (name, (before, after)) in &other.0 {
            self.record(name, *before, *after);
        }
    }

    fn log_summary(&self) {
        for (name, (before, after)) in &self.0 {
            if *before != 0 {
                tracing::info!(
                    "{after}/{before} ({:.1}%) events passed {name} cut",
                    100.0 * *after as f64 / *before as f64
                );
            }
        }
    }
}

pub fn run(config: &Config) -> Result<()> {
    // Whitespace is insignificant in cut strings and must not leak into
    // artifact filenames.
    let pid_cuts: Vec<String> =
        config.pid_cuts.iter().map(|c| c.split_whitespace().collect()).collect();

    let mut binning = BinningConfig::new();
    if let Some(path) = &config.binning_file {
        binning.load_overrides_file(path)?;
    }
    // Fail on unknown binnings before any file is read.
    for bin_var in &config.bin_vars {
        let edges = binning.get(&config.particle, bin_var)?;
        tracing::debug!("{bin_var} binning: {edges:?}");
    }
    binning.report_unused_overrides(&config.particle, &config.bin_vars);
    let axes = binning.axes(&config.particle, &config.bin_vars)?;

    let (files, hardcoded_cuts) = resolve_input_files(config)?;
    tracing::info!("{} calibration file(s) will be processed", files.len());

    let mut all_cuts = hardcoded_cuts.clone();
    all_cuts.extend(config.cuts.iter().cloned());
    let branch_names = relevant_branch_names(&pid_cuts, &config.bin_vars, &all_cuts)?;
    tracing::info!(
        "branches to be read: {}",
        branch_names.iter().map(|(_, raw)| raw.as_str()).collect::<Vec<_>>().join(", ")
    );

    let file_hists: Vec<FileHists> = files
        .par_iter()
        .map(|path| {
            process_file(path, &branch_names, &axes, &hardcoded_cuts, &config.cuts, &pid_cuts)
                .with_context(|| format!("processing '{}'", path.display()))
        })
        .collect::<Result<_>>()?;

    let merged = file_hists
        .into_iter()
        .try_fold(None::<FileHists>, |acc, fh| -> Result<_> {
            Ok(Some(match acc {
                None => fh,
                Some(acc) => acc.merge(fh)?,
            }))
        })?
        .context("no calibration files were processed")?;
    merged.stats.log_summary();

    std::fs::create_dir_all(&config.output_dir)
        .with_context(|| format!("creating '{}'", config.output_dir.display()))?;

    for pid_cut in &pid_cuts {
        let cut_hists =
            merged.per_cut.get(pid_cut).with_context(|| format!("no histograms for '{pid_cut}'"))?;
        let eff = efficiency(&merged.total, &cut_hists.passing)?;
        let artifact = EffHists {
            eff,
            passing: cut_hists.passing.clone(),
            total: merged.total.clone(),
            passing_sumw2: cut_hists.passing_sumw2.clone(),
            total_sumw2: merged.total_sumw2.clone(),
        };
        let filename = hist_filename(
            &config.sample,
            &config.magnet,
            &config.particle,
            pid_cut,
            &config.bin_vars,
        );
        artifact.save(&config.output_dir.join(filename))?;
    }
    Ok(())
}

/// Determine the calibration files and any hard-coded cuts that go with them.
fn resolve_input_files(config: &Config) -> Result<(Vec<PathBuf>, Vec<String>)> {
    if let Some(path) = &config.local_dataframe {
        return Ok((vec![path.clone()], Vec::new()));
    }
    if let Some(list) = &config.file_list {
        let text = std::fs::read_to_string(list)
            .with_context(|| format!("reading file list '{}'", list.display()))?;
        let files: Vec<PathBuf> =
            text.lines().filter(|l| !l.trim().is_empty()).map(PathBuf::from).collect();
        return Ok((files, Vec::new()));
    }
    if let Some(catalog_path) = &config.catalog {
        let catalog = load_catalog(catalog_path)?;
        let sample = get_calibration_sample(
            &catalog,
            &config.sample,
            &config.magnet,
            &config.particle,
            config.max_files,
        )?;
        return Ok((sample.files.iter().map(PathBuf::from).collect(), sample.cuts));
    }
    bail!("one of --catalog, --file-list or --local-dataframe is required");
}

/// Read one calibration file and histogram it.
fn process_file(
    path: &Path,
    branch_names: &[(String, String)],
    axes: &[BinAxis],
    hardcoded_cuts: &[String],
    user_cuts: &[String],
    pid_cuts: &[String],
) -> Result<FileHists> {
    let raw_names: Vec<String> = branch_names.iter().map(|(_, raw)| raw.clone()).collect();
    let mut table = Table::read_csv(path, Some(&raw_names))?;
    // Work with user-level names from here on, e.g. probe_PIDK -> DLLK.
    for (user, raw) in branch_names {
        if user != raw {
            table.rename_column(raw, user)?;
        }
    }

    let mut stats = CutStats::default();

    // Restricting to the binning range first keeps the cut statistics
    // comparable across files.
    let range_cuts: Vec<String> = axes
        .iter()
        .map(|a| format!("{0} >= {1} && {0} <= {2}", a.name(), a.low(), a.high()))
        .collect();
    let (table, before, after) = apply_cuts(&table, &range_cuts)?;
    stats.record("binning range", before, after);

    let table = if hardcoded_cuts.is_empty() {
        table
    } else {
        let (table, before, after) = apply_cuts(&table, hardcoded_cuts)?;
        stats.record("hard-coded", before, after);
        table
    };
    let table = if user_cuts.is_empty() {
        table
    } else {
        let (table, before, after) = apply_cuts(&table, user_cuts)?;
        stats.record("user", before, after);
        table
    };

    let total = make_hist(&table, axes, "sWeight", false)?;
    let total_sumw2 = make_hist(&table, axes, "sWeight", true)?;

    let mut per_cut = BTreeMap::new();
    for pid_cut in pid_cuts {
        let (passing_rows, before, after) = apply_cuts(&table, &[pid_cut.clone()])?;
        stats.record(&format!("'{pid_cut}'"), before, after);
        per_cut.insert(
            pid_cut.clone(),
            CutHists {
                passing: make_hist(&passing_rows, axes, "sWeight", false)?,
                passing_sumw2: make_hist(&passing_rows, axes, "sWeight", true)?,
            },
        );
    }

    Ok(FileHists { total, total_sumw2, per_cut, stats })
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn write_calibration_csv(path: &Path) {
        let mut file = std::fs::File::create(path).unwrap();
        writeln!(file, "probe_P,probe_PIDK,probe_sWeight").unwrap();
        for (p, dllk, w) in [
            (5.0, 6.0, 1.0),
            (15.0, -1.0, 1.0),
            (15.0, 5.0, 2.0),
            (25.0, 8.0, 1.5),
            (95.0, 2.0, 1.0), // outside the custom binning range
        ] {
            writeln!(file, "{p},{dllk},{w}").unwrap();
        }
    }

    #[test]
    fn end_to_end_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("cal.csv");
        write_calibration_csv(&data);
        let binning_file = dir.path().join("binning.json");
        std::fs::write(&binning_file, r#"{"K": {"P": [0.0, 10.0, 20.0, 30.0]}}"#).unwrap();

        let config = Config {
            sample: "Turbo18".into(),
            magnet: "up".into(),
            particle: "K".into(),
            pid_cuts: vec!["DLLK > 4".into()],
            cuts: vec![],
            bin_vars: vec!["P".into()],
            binning_file: Some(binning_file),
            catalog: None,
            file_list: None,
            local_dataframe: Some(data),
            max_files: None,
            output_dir: dir.path().join("out"),
        };
        run(&config).unwrap();

        let artifact = EffHists::load(
            &config.output_dir.join("effhists-Turbo18-up-K-DLLK>4-P.json"),
        )
        .unwrap();
        assert_eq!(artifact.total.values(), &[1.0, 3.0, 1.5]);
        assert_eq!(artifact.passing.values(), &[1.0, 2.0, 1.5]);
        assert_eq!(artifact.eff.values()[0], 1.0);
        assert_eq!(artifact.eff.values()[1], 2.0 / 3.0);
        assert_eq!(artifact.passing_sumw2.values(), &[1.0, 4.0, 2.25]);
    }

    #[test]
    fn file_reduction_matches_single_pass() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.csv");
        let b = dir.path().join("b.csv");
        write_calibration_csv(&a);
        write_calibration_csv(&b);
        let list = dir.path().join("files.txt");
        std::fs::write(&list, format!("{}\n{}\n", a.display(), b.display())).unwrap();
        let binning_file = dir.path().join("binning.json");
        std::fs::write(&binning_file, r#"{"K": {"P": [0.0, 10.0, 20.0, 30.0]}}"#).unwrap();

        let config = Config {
            sample: "Turbo18".into(),
            magnet: "up".into(),
            particle: "K".into(),
            pid_cuts: vec!["DLLK > 4".into()],
            cuts: vec![],
            bin_vars: vec!["P".into()],
            binning_file: Some(binning_file),
            catalog: None,
            file_list: Some(list),
            local_dataframe: None,
            max_files: None,
            output_dir: dir.path().join("out"),
        };
        run(&config).unwrap();

        let artifact = EffHists::load(
            &config.output_dir.join("effhists-Turbo18-up-K-DLLK>4-P.json"),
        )
        .unwrap();
        // Two identical files: counts double, efficiency unchanged.
        assert_eq!(artifact.total.values(), &[2.0, 6.0, 3.0]);
        assert_eq!(artifact.eff.values()[1], 2.0 / 3.0);
    }
}
