//! User-level variable aliases and branch-name resolution.
//!
//! Calibration trees store per-track quantities under a `probe_` prefix;
//! users refer to them by short aliases (`DLLK`, `ETA`, ...). Event-level
//! quantities (track multiplicity, SPD hits) have no prefix on either side.

use std::collections::HashMap;

use pid_core::{Error, Result};

use crate::expr::CutExpr;

/// Alias → raw branch name for the calibration samples.
static ALIASES: &[(&str, &str)] = &[
    ("Brunel_DLLK", "probe_Brunel_PIDK"),
    ("Brunel_DLLe", "probe_Brunel_PIDe"),
    ("Brunel_DLLmu", "probe_Brunel_PIDmu"),
    ("Brunel_DLLp", "probe_Brunel_PIDp"),
    ("Brunel_ETA", "probe_Brunel_ETA"),
    ("Brunel_IPCHI2", "probe_Brunel_IPCHI2"),
    ("Brunel_IsMuon", "probe_Brunel_isMuon"),
    ("Brunel_MC15TuneV1_ProbNNghost", "probe_Brunel_MC15TuneV1_ProbNNghost"),
    ("Brunel_MC15TuneV1_ProbNNk", "probe_Brunel_MC15TuneV1_ProbNNk"),
    ("Brunel_MC15TuneV1_ProbNNmu", "probe_Brunel_MC15TuneV1_ProbNNmu"),
    ("Brunel_MC15TuneV1_ProbNNp", "probe_Brunel_MC15TuneV1_ProbNNp"),
    ("Brunel_MC15TuneV1_ProbNNpi", "probe_Brunel_MC15TuneV1_ProbNNpi"),
    ("Brunel_P", "probe_Brunel_P"),
    ("Brunel_PT", "probe_Brunel_PT"),
    ("Brunel_TRCHI2NDOF", "probe_Brunel_TRCHI2NDOF"),
    ("DLLK", "probe_PIDK"),
    ("DLLd", "probe_PIDd"),
    ("DLLe", "probe_PIDe"),
    ("DLLmu", "probe_PIDmu"),
    ("DLLp", "probe_PIDp"),
    ("ETA", "probe_ETA"),
    ("HasRich", "probe_hasRich"),
    ("IPCHI2", "probe_IPCHI2"),
    ("InMuonAcc", "probe_InMuonAcc"),
    ("IsMuon", "probe_isMuon"),
    ("MC15TuneV1_ProbNNe", "probe_MC15TuneV1_ProbNNe"),
    ("MC15TuneV1_ProbNNghost", "probe_MC15TuneV1_ProbNNghost"),
    ("MC15TuneV1_ProbNNk", "probe_MC15TuneV1_ProbNNk"),
    ("MC15TuneV1_ProbNNmu", "probe_MC15TuneV1_ProbNNmu"),
    ("MC15TuneV1_ProbNNp", "probe_MC15TuneV1_ProbNNp"),
    ("MC15TuneV1_ProbNNpi", "probe_MC15TuneV1_ProbNNpi"),
    ("MuonUnbiased", "probe_MuonUnbiased"),
    ("P", "probe_P"),
    ("PT", "probe_PT"),
    ("TRACK_GHOSTPROB", "probe_TRACK_GHOSTPROB"),
    ("TRCHI2NDOF", "probe_TRCHI2NDOF"),
    ("nSPDhits", "nSPDhits"),
    ("nSPDhits_Brunel", "nSPDhits_Brunel"),
    ("nTracks", "nTracks"),
    ("nTracks_Brunel", "nTracks_Brunel"),
    ("trackcharge", "probe_trackcharge"),
];

/// Event-level variables that carry no particle prefix in reference samples.
static GLOBAL_BRANCHES: &[&str] = &["nTracks", "nTracks_Brunel", "nSPDhits", "nSPDhits_Brunel"];

/// Raw branch name for a user-level alias, if known.
pub fn alias(name: &str) -> Option<&'static str> {
    ALIASES
        .binary_search_by(|(a, _)| a.cmp(&name))
        .ok()
        .map(|i| ALIASES[i].1)
}

/// All known aliases as (alias, raw branch) pairs.
pub fn aliases() -> &'static [(&'static str, &'static str)] {
    ALIASES
}

fn resolve(name: &str, kind: &str) -> String {
    match alias(name) {
        Some(raw) => raw.to_string(),
        None => {
            tracing::warn!("{kind} variable '{name}' is not a known alias, using raw name");
            name.to_string()
        }
    }
}

/// Branch names needed to evaluate the given cuts and binning variables.
///
/// Returns ordered (user name, raw branch) pairs, starting with the sWeight
/// column. Unknown names fall back to the raw name with a warning; an alias
/// and a raw name resolving to the same branch is a hard error, since mixing
/// the two spellings for one physical quantity is never silently resolved.
pub fn relevant_branch_names(
    pid_cuts: &[String],
    bin_vars: &[String],
    cuts: &[String],
) -> Result<Vec<(String, String)>> {
    let mut names: Vec<(String, String)> = vec![("sWeight".into(), "probe_sWeight".into())];
    let push = |name: &str, raw: String, names: &mut Vec<(String, String)>| {
        if !names.iter().any(|(n, _)| n == name) {
            names.push((name.to_string(), raw));
        }
    };

    for cut in pid_cuts {
        for var in CutExpr::compile(cut)?.variables() {
            push(var, resolve(var, "PID cut"), &mut names);
        }
    }
    for var in bin_vars {
        push(var, resolve(var, "binning"), &mut names);
    }
    for cut in cuts {
        for var in CutExpr::compile(cut)?.variables() {
            push(var, resolve(var, "cut"), &mut names);
        }
    }

    let mut seen: HashMap<&str, &str> = HashMap::new();
    let mut duplicates = Vec::new();
    for (name, raw) in &names {
        if let Some(prev) = seen.insert(raw.as_str(), name.as_str()) {
            duplicates.push(format!("'{prev}'/'{name}' -> '{raw}'"));
        }
    }
    if !duplicates.is_empty() {
        return Err(Error::DuplicateBranches(duplicates.join(", ")));
    }
    Ok(names)
}

/// Full name of a binning branch in a reference sample.
///
/// Event-level variables use the bare branch name; per-track variables are
/// prefixed with the particle's branch prefix.
pub fn reference_branch_name(prefix: &str, bin_var: &str, bin_var_branch: &str) -> String {
    if GLOBAL_BRANCHES.contains(&bin_var) {
        bin_var_branch.to_string()
    } else {
        format!("{prefix}_{bin_var_branch}")
    }
}

/// All reference-sample branch names for a set of particle prefixes.
///
/// `bin_vars` maps binning-variable names to their branch names in the
/// reference sample, in axis order.
pub fn reference_branch_names(prefixes: &[String], bin_vars: &[(String, String)]) -> Vec<String> {
    let mut names = Vec::new();
    for prefix in prefixes {
        for (bin_var, branch) in bin_vars {
            let name = reference_branch_name(prefix, bin_var, branch);
            if !names.contains(&name) {
                names.push(name);
            }
        }
    }
    names
}
