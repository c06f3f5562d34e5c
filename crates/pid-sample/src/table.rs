//! A row-per-event table of named numeric columns.

use std::collections::HashMap;
use std::path::Path;

use pid_core::{Error, Result};

/// A column-oriented event table.
///
/// All columns are `f64` and share the same length. Column order is
/// preserved for output; lookups go through a map. Missing values are plain
/// NaN.
#[derive(Debug, Clone, Default)]
pub struct Table {
    order: Vec<String>,
    columns: HashMap<String, Vec<f64>>,
    n_rows: usize,
}

impl Table {
    /// An empty table with no columns.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows.
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// Column names in insertion order.
    pub fn column_names(&self) -> &[String] {
        &self.order
    }

    /// Whether a column exists.
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// A column by name.
    pub fn column(&self, name: &str) -> Result<&[f64]> {
        self.columns
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| Error::MissingColumn(name.to_string()))
    }

    /// Insert a column, replacing any existing column of the same name.
    ///
    /// The first column inserted into an empty table fixes the row count.
    pub fn add_column(&mut self, name: impl Into<String>, values: Vec<f64>) -> Result<()> {
        let name = name.into();
        if self.order.is_empty() {
            self.n_rows = values.len();
        } else if values.len() != self.n_rows {
            return Err(Error::Table(format!(
                "column '{name}' has {} entries, table has {} rows",
                values.len(),
                self.n_rows
            )));
        }
        if !self.columns.contains_key(&name) {
            self.order.push(name.clone());
        }
        self.columns.insert(name, values);
        Ok(())
    }

    /// Rename a column in place, keeping its position.
    pub fn rename_column(&mut self, from: &str, to: &str) -> Result<()> {
        let values = self
            .columns
            .remove(from)
            .ok_or_else(|| Error::MissingColumn(from.to_string()))?;
        for name in &mut self.order {
            if name == from {
                to.clone_into(name);
            }
        }
        self.columns.insert(to.to_string(), values);
        Ok(())
    }

    /// A new table keeping only rows where `mask` is true.
    pub fn filter(&self, mask: &[bool]) -> Result<Table> {
        if mask.len() != self.n_rows {
            return Err(Error::Table(format!(
                "mask has {} entries, table has {} rows",
                mask.len(),
                self.n_rows
            )));
        }
        let mut out = Table::new();
        for name in &self.order {
            let col = &self.columns[name];
            let kept: Vec<f64> = col
                .iter()
                .zip(mask)
                .filter_map(|(&v, &keep)| keep.then_some(v))
                .collect();
            out.add_column(name.clone(), kept)?;
        }
        if out.order.is_empty() {
            out.n_rows = 0;
        }
        Ok(out)
    }

    /// Read a headered CSV file of numeric columns.
    ///
    /// When `wanted` is given, only those columns are loaded and each must be
    /// present. Empty cells parse to NaN.
    pub fn read_csv(path: &Path, wanted: Option<&[String]>) -> Result<Table> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(|e| Error::Table(format!("cannot open '{}': {e}", path.display())))?;

        let headers: Vec<String> =
            reader
                .headers()
                .map_err(|e| Error::Table(format!("bad header in '{}': {e}", path.display())))?
                .iter()
                .map(str::to_string)
                .collect();

        let selected: Vec<(usize, String)> = match wanted {
            Some(names) => {
                let mut cols = Vec::with_capacity(names.len());
                for name in names {
                    let idx = headers.iter().position(|h| h == name).ok_or_else(|| {
                        Error::Table(format!(
                            "column '{name}' not found in '{}' (available: {})",
                            path.display(),
                            headers.join(", ")
                        ))
                    })?;
                    cols.push((idx, name.clone()));
                }
                cols
            }
            None => headers.iter().cloned().enumerate().collect(),
        };

        let mut data: Vec<Vec<f64>> = vec![Vec::new(); selected.len()];
        for (row, record) in reader.records().enumerate() {
            let record = record.map_err(|e| {
                Error::Table(format!("row {} of '{}': {e}", row + 1, path.display()))
            })?;
            for (slot, (idx, name)) in selected.iter().enumerate() {
                let field = record.get(*idx).unwrap_or("");
                let value = if field.is_empty() {
                    f64::NAN
                } else {
                    field.parse::<f64>().map_err(|_| {
                        Error::Table(format!(
                            "row {} of '{}': column '{name}' has non-numeric value '{field}'",
                            row + 1,
                            path.display()
                        ))
                    })?
                };
                data[slot].push(value);
            }
        }

        let mut table = Table::new();
        for ((_, name), values) in selected.into_iter().zip(data) {
            table.add_column(name, values)?;
        }
        Ok(table)
    }

    /// Write the table (or a subset of columns, in the given order) as CSV.
    pub fn write_csv(&self, path: &Path, columns: Option<&[String]>) -> Result<()> {
        let names: Vec<String> = match columns {
            Some(cols) => cols.to_vec(),
            None => self.order.clone(),
        };
        let mut cols = Vec::with_capacity(names.len());
        for name in &names {
            cols.push(self.column(name)?);
        }

        let mut writer = csv::Writer::from_path(path)
            .map_err(|e| Error::Table(format!("cannot create '{}': {e}", path.display())))?;
        writer
            .write_record(&names)
            .map_err(|e| Error::Table(format!("write '{}': {e}", path.display())))?;
        let mut record = Vec::with_capacity(cols.len());
        for row in 0..self.n_rows {
            record.clear();
            for col in &cols {
                record.push(col[row].to_string());
            }
            writer
                .write_record(&record)
                .map_err(|e| Error::Table(format!("write '{}': {e}", path.display())))?;
        }
        writer
            .flush()
            .map_err(|e| Error::Table(format!("write '{}': {e}", path.display())))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn add_and_filter() {
        let mut table = Table::new();
        table.add_column("x", vec![1.0, 2.0, 3.0]).unwrap();
        table.add_column("y", vec![4.0, 5.0, 6.0]).unwrap();
        assert!(table.add_column("bad", vec![1.0]).is_err());

        let kept = table.filter(&[true, false, true]).unwrap();
        assert_eq!(kept.n_rows(), 2);
        assert_eq!(kept.column("x").unwrap(), &[1.0, 3.0]);
        assert_eq!(kept.column("y").unwrap(), &[4.0, 6.0]);
    }

    #[test]
    fn rename_keeps_order() {
        let mut table = Table::new();
        table.add_column("probe_PIDK", vec![1.0]).unwrap();
        table.add_column("probe_P", vec![2.0]).unwrap();
        table.rename_column("probe_PIDK", "DLLK").unwrap();
        assert_eq!(table.column_names(), &["DLLK", "probe_P"]);
        assert_eq!(table.column("DLLK").unwrap(), &[1.0]);
    }

    #[test]
    fn csv_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "probe_P,probe_ETA,probe_sWeight").unwrap();
        writeln!(file, "5000,2.5,0.9").unwrap();
        writeln!(file, "12000,3.1,1.2").unwrap();
        writeln!(file, "7000,,0.4").unwrap();
        drop(file);

        let wanted = vec!["probe_P".to_string(), "probe_sWeight".to_string()];
        let table = Table::read_csv(&path, Some(&wanted)).unwrap();
        assert_eq!(table.n_rows(), 3);
        assert_eq!(table.column("probe_P").unwrap(), &[5000.0, 12000.0, 7000.0]);
        assert!(!table.has_column("probe_ETA"));

        let full = Table::read_csv(&path, None).unwrap();
        assert!(full.column("probe_ETA").unwrap()[2].is_nan());

        let out = dir.path().join("out.csv");
        full.write_csv(&out, None).unwrap();
        let back = Table::read_csv(&out, None).unwrap();
        assert_eq!(back.n_rows(), 3);
        assert!(back.column("probe_ETA").unwrap()[2].is_nan());

        let missing = Table::read_csv(&path, Some(&["nope".to_string()])).unwrap_err();
        assert!(missing.to_string().contains("nope"));
    }
}
