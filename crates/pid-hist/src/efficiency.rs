//! Per-bin efficiency and its binomial uncertainty.

use pid_core::Result;

use crate::histogram::HistogramNd;

/// Cell-wise efficiency `passing / total` over equally-shaped histograms.
///
/// Cells with `total == 0` carry no information; they are mapped to NaN
/// before the division so they yield an undefined efficiency rather than a
/// spurious zero or infinity. The number of such cells is logged so sparse
/// binning choices are visible to the operator. Substituting zero for the
/// undefined cells is a lookup-time compatibility option, never done here.
pub fn efficiency(total: &HistogramNd, passing: &HistogramNd) -> Result<HistogramNd> {
    total.same_axes(passing)?;

    let zero_bins = total.values().iter().filter(|v| **v == 0.0).count();
    if zero_bins > 0 {
        tracing::warn!(
            "there are {zero_bins} empty bins in the total histogram; \
             you might want to change the binning"
        );
    }

    let mut eff = passing.clone();
    for (e, &t) in eff.values_mut().iter_mut().zip(total.values()) {
        let t = if t == 0.0 { f64::NAN } else { t };
        *e /= t;
    }
    Ok(eff)
}

/// Cell-wise binomial uncertainty on `passing / total`.
///
/// Follows the weighted-binomial convention of ROOT's `TH1::Divide`: with
/// per-cell passing count `p`, total count `t` and their sums of squared
/// weights `ep2` and `et2`,
///
/// ```text
/// prob = p / t
/// err  = sqrt(abs(((1 - 2*prob) * ep2 + et2 * prob^2) / t^2))
/// ```
///
/// The convention is known to misbehave at `p == t` and `p == 0`; those edge
/// cases are rare in practice and kept for compatibility with the standard
/// tooling. `t == 0` yields NaN through the division itself, no clamp.
pub fn binomial_uncertainty(
    passing: &HistogramNd,
    total: &HistogramNd,
    passing_sumw2: &HistogramNd,
    total_sumw2: &HistogramNd,
) -> Result<HistogramNd> {
    passing.same_axes(total)?;
    passing.same_axes(passing_sumw2)?;
    passing.same_axes(total_sumw2)?;

    let mut err = passing.clone();
    let cells = err
        .values_mut()
        .iter_mut()
        .zip(total.values())
        .zip(passing_sumw2.values())
        .zip(total_sumw2.values());
    for (((e, &t), &ep2), &et2) in cells {
        let p = *e;
        let prob = p / t;
        *e = (((1.0 - 2.0 * prob) * ep2 + et2 * prob * prob) / (t * t)).abs().sqrt();
    }
    Ok(err)
}
