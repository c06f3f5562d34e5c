//! `pidcal convert` — efficiency artifact to native histogram objects.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use pid_hist::{to_native, EffHists, NativeHistogram};

pub fn run(input: &Path, output: Option<&Path>) -> Result<()> {
    let artifact = EffHists::load(input)?;
    let error = artifact.error_hist()?;

    let mut hists: BTreeMap<&str, NativeHistogram> = BTreeMap::new();
    hists.insert("eff", to_native("eff", &artifact.eff, Some(&error))?);
    hists.insert("passing", to_native("passing", &artifact.passing, None)?);
    hists.insert("total", to_native("total", &artifact.total, None)?);

    let out_path: PathBuf = match output {
        Some(path) => path.to_path_buf(),
        None => input.with_extension("native.json"),
    };
    let file = File::create(&out_path)
        .with_context(|| format!("cannot create '{}'", out_path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), &hists)?;
    tracing::info!("native histograms saved to '{}'", out_path.display());
    Ok(())
}
