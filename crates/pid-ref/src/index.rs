//! Bin-index assignment for reference samples.
//!
//! Each tracked particle (branch prefix) is located in the bins of its
//! efficiency artifact: one integer index per axis, combined into a flat
//! row-major index. Rows outside the binning on any axis keep an explicit
//! missing status instead of being dropped, so one out-of-range particle
//! never corrupts the index arithmetic of another.

use std::collections::HashMap;

use pid_core::{Error, Result};
use pid_hist::{AxisOrder, EffHists};
use pid_sample::{reference_branch_name, Table};

/// Per-prefix flat bin indices, `None` where any axis was out of range.
///
/// Row order matches the table the assignment was computed from.
#[derive(Debug, Clone, Default)]
pub struct Assignment {
    flat: HashMap<String, Vec<Option<usize>>>,
}

impl Assignment {
    /// Flat indices for one prefix.
    pub fn flat_indices(&self, prefix: &str) -> Result<&[Option<usize>]> {
        self.flat
            .get(prefix)
            .map(Vec::as_slice)
            .ok_or_else(|| Error::Artifact(format!("no bin indices assigned for '{prefix}'")))
    }

    /// Whether a row has a complete index for every prefix.
    pub fn row_is_complete(&self, row: usize) -> bool {
        self.flat.values().all(|flat| flat[row].is_some())
    }
}

/// Assign per-axis and flat bin indices for every prefix.
///
/// The binning is taken from each prefix's efficiency artifact, so reference
/// events are discretized with exactly the edges the calibration histograms
/// used. The flat index's digit order is the artifact's axis order; the
/// caller's requested `bin_vars` order is checked against it up front, since
/// a silent disagreement would score the wrong bins for every event.
///
/// For visibility, the per-axis indices and the flat index are also written
/// into the table as f64 columns (`{branch}_bin`, `{prefix}_eff_bin`), NaN
/// marking out-of-range rows.
pub fn assign_bin_indices(
    table: &mut Table,
    prefixes: &[String],
    bin_vars: &[(String, String)],
    artifacts: &HashMap<String, EffHists>,
) -> Result<Assignment> {
    let requested_order = AxisOrder::new(bin_vars.iter().map(|(var, _)| var.clone()));
    let mut assignment = Assignment::default();

    for prefix in prefixes {
        let hists = artifacts.get(prefix).ok_or_else(|| {
            Error::Artifact(format!("no efficiency histograms supplied for prefix '{prefix}'"))
        })?;
        hists.validate()?;
        hists.axis_order().ensure_matches(&requested_order)?;

        let axes = hists.eff.axes();
        let n_rows = table.n_rows();
        let mut per_axis: Vec<Vec<Option<usize>>> = Vec::with_capacity(axes.len());

        for (axis, (_, branch)) in axes.iter().zip(bin_vars) {
            let ref_branch = reference_branch_name(prefix, axis.name(), branch);
            let column = table.column(&ref_branch)?;

            let indices: Vec<Option<usize>> = column.iter().map(|&v| axis.find_bin(v)).collect();
            table.add_column(
                format!("{ref_branch}_bin"),
                indices.iter().map(|i| i.map_or(f64::NAN, |i| i as f64)).collect(),
            )?;
            per_axis.push(indices);
        }

        let sizes: Vec<usize> = axes.iter().map(|a| a.n_bins()).collect();
        let mut flat: Vec<Option<usize>> = Vec::with_capacity(n_rows);
        for row in 0..n_rows {
            let mut index = Some(0usize);
            for (indices, &size) in per_axis.iter().zip(&sizes) {
                index = match (index, indices[row]) {
                    (Some(acc), Some(i)) => Some(acc * size + i),
                    _ => None,
                };
            }
            flat.push(index);
        }

        table.add_column(
            format!("{prefix}_eff_bin"),
            flat.iter().map(|i| i.map_or(f64::NAN, |i| i as f64)).collect(),
        )?;
        assignment.flat.insert(prefix.clone(), flat);
    }

    tracing::debug!("bin indices assigned for {} prefix(es)", prefixes.len());
    Ok(assignment)
}

#[cfg(test)]
mod tests {
    use pid_hist::{efficiency, BinAxis, HistogramNd};

    use super::*;

    fn one_axis_artifact(edges: Vec<f64>) -> EffHists {
        let axes = vec![BinAxis::new("P", edges).unwrap()];
        let mut total = HistogramNd::new(axes.clone());
        for v in total.values_mut() {
            *v = 10.0;
        }
        let mut passing = HistogramNd::new(axes);
        for v in passing.values_mut() {
            *v = 5.0;
        }
        let eff = efficiency(&total, &passing).unwrap();
        EffHists {
            eff,
            passing: passing.clone(),
            total: total.clone(),
            passing_sumw2: passing,
            total_sumw2: total,
        }
    }

    fn two_axis_artifact() -> EffHists {
        let axes = vec![
            BinAxis::new("P", vec![0.0, 10.0, 20.0, 30.0]).unwrap(),
            BinAxis::new("ETA", vec![0.0, 2.0, 4.0]).unwrap(),
        ];
        let mut total = HistogramNd::new(axes.clone());
        for v in total.values_mut() {
            *v = 10.0;
        }
        let mut passing = HistogramNd::new(axes);
        for v in passing.values_mut() {
            *v = 5.0;
        }
        let eff = efficiency(&total, &passing).unwrap();
        EffHists {
            eff,
            passing: passing.clone(),
            total: total.clone(),
            passing_sumw2: passing,
            total_sumw2: total,
        }
    }

    #[test]
    fn boundary_values_and_out_of_range() {
        let mut table = Table::new();
        table
            .add_column("Bach_P", vec![10.0, 30.0, -1.0, 30.1, 0.0])
            .unwrap();
        let mut artifacts = HashMap::new();
        artifacts.insert("Bach".to_string(), one_axis_artifact(vec![0.0, 10.0, 20.0, 30.0]));

        let assignment = assign_bin_indices(
            &mut table,
            &["Bach".to_string()],
            &[("P".to_string(), "P".to_string())],
            &artifacts,
        )
        .unwrap();

        let flat = assignment.flat_indices("Bach").unwrap();
        // 10.0 -> bin 1 (left-inclusive), 30.0 -> last bin (end-inclusive),
        // -1.0 and 30.1 -> out of range, 0.0 -> first bin.
        assert_eq!(flat, &[Some(1), Some(2), None, None, Some(0)]);

        let col = table.column("Bach_eff_bin").unwrap();
        assert_eq!(col[0], 1.0);
        assert!(col[2].is_nan());
    }

    #[test]
    fn flat_index_is_row_major_over_artifact_axes() {
        let mut table = Table::new();
        table.add_column("Bach_P", vec![25.0, 5.0]).unwrap();
        table.add_column("Bach_ETA", vec![3.0, 1.0]).unwrap();
        let mut artifacts = HashMap::new();
        artifacts.insert("Bach".to_string(), two_axis_artifact());

        let assignment = assign_bin_indices(
            &mut table,
            &["Bach".to_string()],
            &[("P".to_string(), "P".to_string()), ("ETA".to_string(), "ETA".to_string())],
            &artifacts,
        )
        .unwrap();

        // (P bin 2, ETA bin 1) with shape [3, 2] -> 2*2 + 1 = 5.
        let flat = assignment.flat_indices("Bach").unwrap();
        assert_eq!(flat, &[Some(5), Some(0)]);
        // Matches the histogram's own flattening.
        let hist = &artifacts["Bach"].eff;
        assert_eq!(flat[0], Some(hist.flat_index(&[2, 1])));
    }

    #[test]
    fn missing_axis_in_one_prefix_leaves_others_valid() {
        let mut table = Table::new();
        table.add_column("h1_P", vec![5.0, 50.0]).unwrap();
        table.add_column("h2_P", vec![5.0, 15.0]).unwrap();
        let mut artifacts = HashMap::new();
        artifacts.insert("h1".to_string(), one_axis_artifact(vec![0.0, 10.0, 20.0, 30.0]));
        artifacts.insert("h2".to_string(), one_axis_artifact(vec![0.0, 10.0, 20.0, 30.0]));

        let prefixes = vec!["h1".to_string(), "h2".to_string()];
        let assignment = assign_bin_indices(
            &mut table,
            &prefixes,
            &[("P".to_string(), "P".to_string())],
            &artifacts,
        )
        .unwrap();

        assert_eq!(assignment.flat_indices("h1").unwrap(), &[Some(0), None]);
        assert_eq!(assignment.flat_indices("h2").unwrap(), &[Some(0), Some(1)]);
        assert!(assignment.row_is_complete(0));
        assert!(!assignment.row_is_complete(1));
    }

    #[test]
    fn axis_order_disagreement_is_an_error() {
        let mut table = Table::new();
        table.add_column("Bach_P", vec![5.0]).unwrap();
        table.add_column("Bach_ETA", vec![1.0]).unwrap();
        let mut artifacts = HashMap::new();
        artifacts.insert("Bach".to_string(), two_axis_artifact());

        // Artifact axes are (P, ETA); asking for (ETA, P) must not silently
        // transpose the flat index.
        let err = assign_bin_indices(
            &mut table,
            &["Bach".to_string()],
            &[("ETA".to_string(), "ETA".to_string()), ("P".to_string(), "P".to_string())],
            &artifacts,
        )
        .unwrap_err();
        assert!(err.to_string().contains("axis order mismatch"));
    }
}
