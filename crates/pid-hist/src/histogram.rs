//! N-dimensional weighted histograms with row-major flat storage.

use serde::{Deserialize, Serialize};

use pid_core::{Error, Result};

use crate::axis::{AxisOrder, BinAxis};

/// An N-dimensional weighted histogram over a tuple of [`BinAxis`] objects.
///
/// Cell values are stored row-major: the last axis varies fastest. Events
/// whose coordinates fall outside any axis range accumulate into a single
/// out-of-range scalar, which is excluded from [`HistogramNd::sum`] but
/// retrievable. Once filled, histograms are treated as immutable; combining
/// two histograms requires exactly matching axes.
///
/// NaN cells (undefined efficiency) are written to JSON as `null` and read
/// back as NaN.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramNd {
    axes: Vec<BinAxis>,
    #[serde(with = "nullable_cells")]
    values: Vec<f64>,
    out_of_range: f64,
}

impl HistogramNd {
    /// Create an empty histogram over the given axes.
    pub fn new(axes: Vec<BinAxis>) -> Self {
        let n_cells = axes.iter().map(BinAxis::n_bins).product();
        Self { axes, values: vec![0.0; n_cells], out_of_range: 0.0 }
    }

    /// The axes, in storage order.
    pub fn axes(&self) -> &[BinAxis] {
        &self.axes
    }

    /// Bins per axis, in storage order.
    pub fn shape(&self) -> Vec<usize> {
        self.axes.iter().map(BinAxis::n_bins).collect()
    }

    /// Total number of in-range cells.
    pub fn n_cells(&self) -> usize {
        self.values.len()
    }

    /// Axis names in storage order.
    pub fn axis_order(&self) -> AxisOrder {
        AxisOrder::new(self.axes.iter().map(BinAxis::name))
    }

    /// Flattened cell values (row-major).
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Mutable flattened cell values (row-major).
    pub fn values_mut(&mut self) -> &mut [f64] {
        &mut self.values
    }

    /// Weight accumulated by events outside the axis ranges.
    pub fn out_of_range(&self) -> f64 {
        self.out_of_range
    }

    /// Encode per-axis bin indices into a flat row-major index.
    ///
    /// `flat = ((i0 * n1 + i1) * n2 + i2) ...` with axes in storage order.
    pub fn flat_index(&self, indices: &[usize]) -> usize {
        debug_assert_eq!(indices.len(), self.axes.len());
        let mut flat = 0;
        for (axis, &i) in self.axes.iter().zip(indices) {
            debug_assert!(i < axis.n_bins());
            flat = flat * axis.n_bins() + i;
        }
        flat
    }

    /// Locate the flat cell for an event coordinate, if in range on all axes.
    pub fn find_cell(&self, coords: &[f64]) -> Option<usize> {
        debug_assert_eq!(coords.len(), self.axes.len());
        let mut flat = 0;
        for (axis, &v) in self.axes.iter().zip(coords) {
            flat = flat * axis.n_bins() + axis.find_bin(v)?;
        }
        Some(flat)
    }

    /// Accumulate one weighted event.
    pub fn fill_one(&mut self, coords: &[f64], weight: f64) {
        match self.find_cell(coords) {
            Some(cell) => self.values[cell] += weight,
            None => self.out_of_range += weight,
        }
    }

    /// Fill from per-axis coordinate columns and an event-weight column.
    ///
    /// `columns` must hold one slice per axis, in axis order; all slices and
    /// `weights` must have the same length. Each event contributes its weight
    /// to exactly one cell, or to the out-of-range accumulator.
    pub fn fill_columns(&mut self, columns: &[&[f64]], weights: &[f64]) -> Result<()> {
        if columns.len() != self.axes.len() {
            return Err(Error::ShapeMismatch(format!(
                "{} coordinate columns supplied for {} axes",
                columns.len(),
                self.axes.len()
            )));
        }
        for (axis, col) in self.axes.iter().zip(columns) {
            if col.len() != weights.len() {
                return Err(Error::ShapeMismatch(format!(
                    "column '{}' has {} entries, weight column has {}",
                    axis.name(),
                    col.len(),
                    weights.len()
                )));
            }
        }

        let mut coords = vec![0.0; columns.len()];
        for (row, &w) in weights.iter().enumerate() {
            for (j, col) in columns.iter().enumerate() {
                coords[j] = col[row];
            }
            self.fill_one(&coords, w);
        }
        Ok(())
    }

    /// Sum of all in-range cell values.
    pub fn sum(&self) -> f64 {
        self.values.iter().sum()
    }

    /// Value of one cell addressed by per-axis indices.
    pub fn get(&self, indices: &[usize]) -> f64 {
        self.values[self.flat_index(indices)]
    }

    /// Check that `other` has exactly the same axes (names and edges).
    pub fn same_axes(&self, other: &Self) -> Result<()> {
        if self.axes != other.axes {
            return Err(Error::ShapeMismatch(format!(
                "axes differ: [{}] {:?} vs [{}] {:?}",
                self.axis_order(),
                self.shape(),
                other.axis_order(),
                other.shape()
            )));
        }
        Ok(())
    }

    /// Element-wise sum of two histograms with identical axes.
    pub fn add(&self, other: &Self) -> Result<Self> {
        let mut out = self.clone();
        out.add_in_place(other)?;
        Ok(out)
    }

    /// Element-wise in-place sum. Used to reduce per-file histograms.
    pub fn add_in_place(&mut self, other: &Self) -> Result<()> {
        self.same_axes(other)?;
        for (a, b) in self.values.iter_mut().zip(&other.values) {
            *a += b;
        }
        self.out_of_range += other.out_of_range;
        Ok(())
    }
}

/// JSON has no NaN literal; map undefined cells through `null`.
mod nullable_cells {
    use serde::ser::SerializeSeq;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(values: &[f64], ser: S) -> Result<S::Ok, S::Error> {
        let mut seq = ser.serialize_seq(Some(values.len()))?;
        for &v in values {
            if v.is_nan() {
                seq.serialize_element(&Option::<f64>::None)?;
            } else {
                seq.serialize_element(&Some(v))?;
            }
        }
        seq.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Vec<f64>, D::Error> {
        let cells: Vec<Option<f64>> = Deserialize::deserialize(de)?;
        Ok(cells.into_iter().map(|c| c.unwrap_or(f64::NAN)).collect())
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn axes_2d() -> Vec<BinAxis> {
        vec![
            BinAxis::new("P", vec![0.0, 10.0, 20.0, 30.0]).unwrap(),
            BinAxis::new("ETA", vec![0.0, 1.0]).unwrap(),
        ]
    }

    #[test]
    fn fill_and_sum() {
        let mut hist = HistogramNd::new(axes_2d());
        let p = [5.0, 10.0, 25.0, 30.0, 31.0];
        let eta = [0.5, 0.5, 0.5, 0.5, 0.5];
        let w = [1.0, 2.0, 3.0, 4.0, 5.0];
        hist.fill_columns(&[&p, &eta], &w).unwrap();

        assert_eq!(hist.values(), &[1.0, 2.0, 7.0]);
        assert_eq!(hist.out_of_range(), 5.0);
        // In-range sum equals the sum of weights of in-range rows.
        assert_relative_eq!(hist.sum(), 10.0);
    }

    #[test]
    fn flat_index_is_row_major() {
        let axes = vec![
            BinAxis::new("a", vec![0.0, 1.0, 2.0]).unwrap(),
            BinAxis::new("b", vec![0.0, 1.0, 2.0, 3.0]).unwrap(),
        ];
        let hist = HistogramNd::new(axes);
        assert_eq!(hist.shape(), vec![2, 3]);
        assert_eq!(hist.flat_index(&[0, 0]), 0);
        assert_eq!(hist.flat_index(&[0, 2]), 2);
        assert_eq!(hist.flat_index(&[1, 0]), 3);
        assert_eq!(hist.flat_index(&[1, 2]), 5);
    }

    #[test]
    fn find_cell_matches_flat_index() {
        let hist = HistogramNd::new(axes_2d());
        assert_eq!(hist.find_cell(&[10.0, 0.5]), Some(hist.flat_index(&[1, 0])));
        assert_eq!(hist.find_cell(&[10.0, 2.0]), None);
        assert_eq!(hist.find_cell(&[f64::NAN, 0.5]), None);
    }

    #[test]
    fn add_requires_same_axes() {
        let mut a = HistogramNd::new(axes_2d());
        a.fill_one(&[5.0, 0.5], 1.0);
        let mut b = HistogramNd::new(axes_2d());
        b.fill_one(&[5.0, 0.5], 2.0);

        let sum = a.add(&b).unwrap();
        assert_eq!(sum.values()[0], 3.0);

        let other = HistogramNd::new(vec![BinAxis::new("P", vec![0.0, 1.0]).unwrap()]);
        assert!(a.add(&other).is_err());
    }

    #[test]
    fn nan_cells_survive_json() {
        let mut hist = HistogramNd::new(axes_2d());
        hist.values_mut()[0] = f64::NAN;
        hist.values_mut()[1] = 0.5;
        let json = serde_json::to_string(&hist).unwrap();
        let back: HistogramNd = serde_json::from_str(&json).unwrap();
        assert!(back.values()[0].is_nan());
        assert_eq!(back.values()[1], 0.5);
    }

    #[test]
    fn fill_columns_checks_lengths() {
        let mut hist = HistogramNd::new(axes_2d());
        let err = hist.fill_columns(&[&[1.0]], &[1.0]).unwrap_err();
        assert!(err.to_string().contains("coordinate columns"));
        let err = hist.fill_columns(&[&[1.0], &[1.0, 2.0]], &[1.0]).unwrap_err();
        assert!(err.to_string().contains("entries"));
    }
}
