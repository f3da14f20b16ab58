//! Tabular datasets loaded from CSV.
//!
//! Column types are inferred once at load time: a column whose non-missing
//! cells all parse as numbers is numeric, anything else is categorical.

use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Tokens treated as a missing cell.
const MISSING_TOKENS: [&str; 6] = ["", "NA", "N/A", "NaN", "nan", "null"];

/// Inferred type of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Numerical,
    Categorical,
}

/// Column storage. Missing numeric cells are `NaN`.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Numeric(Vec<f64>),
    Categorical(Vec<Option<String>>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    data: ColumnData,
}

impl Column {
    pub fn numeric(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            data: ColumnData::Numeric(values),
        }
    }

    pub fn categorical(name: impl Into<String>, values: Vec<Option<String>>) -> Self {
        Self {
            name: name.into(),
            data: ColumnData::Categorical(values),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data(&self) -> &ColumnData {
        &self.data
    }

    pub fn kind(&self) -> ColumnKind {
        match self.data {
            ColumnData::Numeric(_) => ColumnKind::Numerical,
            ColumnData::Categorical(_) => ColumnKind::Categorical,
        }
    }

    pub fn len(&self) -> usize {
        match &self.data {
            ColumnData::Numeric(v) => v.len(),
            ColumnData::Categorical(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Non-missing values as numbers.
    ///
    /// Categorical cells that do not parse as numbers are dropped, so a
    /// column that is categorical on this side yields only what it can.
    pub fn numeric_values(&self) -> Vec<f64> {
        match &self.data {
            ColumnData::Numeric(v) => v.iter().copied().filter(|x| !x.is_nan()).collect(),
            ColumnData::Categorical(v) => v
                .iter()
                .flatten()
                .filter_map(|s| s.parse::<f64>().ok())
                .filter(|x| !x.is_nan())
                .collect(),
        }
    }

    /// One number per row, `NaN` where the cell is missing or not numeric.
    pub fn row_values(&self) -> Vec<f64> {
        match &self.data {
            ColumnData::Numeric(v) => v.clone(),
            ColumnData::Categorical(v) => v
                .iter()
                .map(|cell| {
                    cell.as_deref()
                        .and_then(|s| s.parse::<f64>().ok())
                        .unwrap_or(f64::NAN)
                })
                .collect(),
        }
    }

    /// Occurrence count of each distinct non-missing value.
    pub fn value_counts(&self) -> BTreeMap<String, u64> {
        let mut counts = BTreeMap::new();
        match &self.data {
            ColumnData::Numeric(v) => {
                for x in v.iter().filter(|x| !x.is_nan()) {
                    *counts.entry(x.to_string()).or_insert(0) += 1;
                }
            }
            ColumnData::Categorical(v) => {
                for s in v.iter().flatten() {
                    *counts.entry(s.clone()).or_insert(0) += 1;
                }
            }
        }
        counts
    }

    pub fn missing_count(&self) -> usize {
        match &self.data {
            ColumnData::Numeric(v) => v.iter().filter(|x| x.is_nan()).count(),
            ColumnData::Categorical(v) => v.iter().filter(|s| s.is_none()).count(),
        }
    }

    /// Mean of the non-missing values of a numeric column.
    pub fn mean(&self) -> Option<f64> {
        match &self.data {
            ColumnData::Numeric(_) => {
                let values = self.numeric_values();
                if values.is_empty() {
                    None
                } else {
                    Some(values.iter().sum::<f64>() / values.len() as f64)
                }
            }
            ColumnData::Categorical(_) => None,
        }
    }

    fn cell(&self, row: usize) -> String {
        match &self.data {
            ColumnData::Numeric(v) if v[row].is_nan() => String::new(),
            ColumnData::Numeric(v) => v[row].to_string(),
            ColumnData::Categorical(v) => v[row].clone().unwrap_or_default(),
        }
    }

    fn take(&self, indices: &[usize]) -> Column {
        let data = match &self.data {
            ColumnData::Numeric(v) => ColumnData::Numeric(indices.iter().map(|&i| v[i]).collect()),
            ColumnData::Categorical(v) => {
                ColumnData::Categorical(indices.iter().map(|&i| v[i].clone()).collect())
            }
        };
        Column {
            name: self.name.clone(),
            data,
        }
    }
}

/// An in-memory table of named columns of equal length.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dataset {
    columns: Vec<Column>,
    n_rows: usize,
}

impl Dataset {
    /// Build a dataset; all columns must have the same length.
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        let n_rows = columns.first().map(Column::len).unwrap_or(0);
        if let Some(col) = columns.iter().find(|c| c.len() != n_rows) {
            return Err(PipelineError::InvalidData(format!(
                "column '{}' has {} rows, expected {}",
                col.name(),
                col.len(),
                n_rows
            )));
        }
        Ok(Self { columns, n_rows })
    }

    /// Load a CSV file with a header row.
    pub fn from_csv(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(PipelineError::not_found("data file", path));
        }
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers: Vec<String> = csv_reader.headers()?.iter().map(String::from).collect();
        let mut raw: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];

        for result in csv_reader.records() {
            let record = result?;
            for (i, cells) in raw.iter_mut().enumerate() {
                let cell = record.get(i).unwrap_or("");
                if MISSING_TOKENS.contains(&cell) {
                    cells.push(None);
                } else {
                    cells.push(Some(cell.to_string()));
                }
            }
        }

        let columns = headers
            .into_iter()
            .zip(raw)
            .map(|(name, cells)| infer_column(name, cells))
            .collect();

        Self::new(columns)
    }

    /// Write the dataset as CSV with a header row.
    pub fn to_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut writer = csv::Writer::from_path(path.as_ref())?;
        writer.write_record(self.columns.iter().map(Column::name))?;
        for row in 0..self.n_rows {
            writer.write_record(self.columns.iter().map(|c| c.cell(row)))?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(Column::name).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Remove a column, returning it if it was present.
    pub fn drop_column(&mut self, name: &str) -> Option<Column> {
        let idx = self.columns.iter().position(|c| c.name == name)?;
        Some(self.columns.remove(idx))
    }

    /// Keep only the named columns, in the given order. Unknown names are skipped.
    pub fn select(&self, names: &[&str]) -> Dataset {
        let columns = names
            .iter()
            .filter_map(|n| self.column(n).cloned())
            .collect();
        Dataset {
            columns,
            n_rows: self.n_rows,
        }
    }

    /// Rows at `indices`, in that order.
    pub fn take_rows(&self, indices: &[usize]) -> Dataset {
        Dataset {
            columns: self.columns.iter().map(|c| c.take(indices)).collect(),
            n_rows: indices.len(),
        }
    }

    /// Replace missing numeric cells by the column mean. Returns the number
    /// of cells filled.
    pub fn fill_missing_with_mean(&mut self) -> usize {
        let mut filled = 0;
        for column in &mut self.columns {
            let Some(mean) = column.mean() else { continue };
            if let ColumnData::Numeric(values) = &mut column.data {
                for v in values.iter_mut().filter(|v| v.is_nan()) {
                    *v = mean;
                    filled += 1;
                }
            }
        }
        filled
    }

    /// Row-major numeric matrix over `names`, in that order.
    ///
    /// Every named column must exist, be numeric and have no missing cells.
    pub fn feature_matrix(&self, names: &[String]) -> Result<Vec<Vec<f64>>> {
        let mut selected = Vec::with_capacity(names.len());
        for name in names {
            let column = self.column(name).ok_or_else(|| {
                PipelineError::InvalidData(format!("missing feature column '{}'", name))
            })?;
            match &column.data {
                ColumnData::Numeric(values) => {
                    if values.iter().any(|v| v.is_nan()) {
                        return Err(PipelineError::InvalidData(format!(
                            "feature column '{}' contains missing values",
                            name
                        )));
                    }
                    selected.push(values);
                }
                ColumnData::Categorical(_) => {
                    return Err(PipelineError::InvalidData(format!(
                        "feature column '{}' is not numeric",
                        name
                    )))
                }
            }
        }

        Ok((0..self.n_rows)
            .map(|row| selected.iter().map(|col| col[row]).collect())
            .collect())
    }

    /// Integer class labels from the first column (a single-column target file).
    pub fn labels(&self) -> Result<Vec<i64>> {
        let column = self
            .columns
            .first()
            .ok_or_else(|| PipelineError::InvalidData("target file has no columns".into()))?;
        column_labels(column)
    }
}

/// Integer class labels from a numeric column.
pub fn column_labels(column: &Column) -> Result<Vec<i64>> {
    match &column.data {
        ColumnData::Numeric(values) => values
            .iter()
            .map(|&v| {
                if v.is_finite() && v.fract() == 0.0 {
                    Ok(v as i64)
                } else {
                    Err(PipelineError::InvalidData(format!(
                        "label column '{}' has non-integer value {}",
                        column.name, v
                    )))
                }
            })
            .collect(),
        ColumnData::Categorical(_) => Err(PipelineError::InvalidData(format!(
            "label column '{}' is not numeric",
            column.name
        ))),
    }
}

fn infer_column(name: String, cells: Vec<Option<String>>) -> Column {
    let parsed: Option<Vec<f64>> = cells
        .iter()
        .map(|cell| match cell {
            None => Some(f64::NAN),
            Some(s) => s.parse::<f64>().ok(),
        })
        .collect();

    match parsed {
        Some(values) => Column::numeric(name, values),
        None => Column::categorical(name, cells),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = "Time,Amount,merchant,Class\n\
                          0,10.5,grocery,0\n\
                          1,,online,1\n\
                          2,30.5,grocery,0\n";

    #[test]
    fn test_type_inference() {
        let ds = Dataset::from_reader(SAMPLE.as_bytes()).unwrap();

        assert_eq!(ds.n_rows(), 3);
        assert_eq!(ds.column_names(), vec!["Time", "Amount", "merchant", "Class"]);
        assert_eq!(ds.column("Amount").unwrap().kind(), ColumnKind::Numerical);
        assert_eq!(ds.column("merchant").unwrap().kind(), ColumnKind::Categorical);
        assert_eq!(ds.column("Amount").unwrap().missing_count(), 1);
    }

    #[test]
    fn test_fill_missing_with_mean() {
        let mut ds = Dataset::from_reader(SAMPLE.as_bytes()).unwrap();

        assert_eq!(ds.fill_missing_with_mean(), 1);
        let amounts = ds.column("Amount").unwrap().numeric_values();
        assert_eq!(amounts, vec![10.5, 20.5, 30.5]);
    }

    #[test]
    fn test_value_counts() {
        let ds = Dataset::from_reader(SAMPLE.as_bytes()).unwrap();
        let counts = ds.column("merchant").unwrap().value_counts();

        assert_eq!(counts.get("grocery"), Some(&2));
        assert_eq!(counts.get("online"), Some(&1));
    }

    #[test]
    fn test_feature_matrix_rejects_missing_and_categorical() {
        let ds = Dataset::from_reader(SAMPLE.as_bytes()).unwrap();

        let m = ds.feature_matrix(&["Time".to_string()]).unwrap();
        assert_eq!(m, vec![vec![0.0], vec![1.0], vec![2.0]]);
        assert!(ds.feature_matrix(&["Amount".to_string()]).is_err());
        assert!(ds.feature_matrix(&["merchant".to_string()]).is_err());
        assert!(ds.feature_matrix(&["nope".to_string()]).is_err());
    }

    #[test]
    fn test_labels() {
        let ds = Dataset::from_reader("Class\n0\n1.0\n1\n".as_bytes()).unwrap();
        assert_eq!(ds.labels().unwrap(), vec![0, 1, 1]);

        let bad = Dataset::from_reader("Class\n0.5\n".as_bytes()).unwrap();
        assert!(bad.labels().is_err());
    }

    #[test]
    fn test_csv_round_trip_preserves_missing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");
        let ds = Dataset::from_reader(SAMPLE.as_bytes()).unwrap();

        ds.to_csv(&path).unwrap();
        let reloaded = Dataset::from_csv(&path).unwrap();

        assert_eq!(reloaded.column("Amount").unwrap().missing_count(), 1);
        assert_eq!(reloaded.n_rows(), 3);
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let err = Dataset::from_csv("no/such/file.csv").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_row_values_keep_gaps() {
        let ds = Dataset::from_reader(SAMPLE.as_bytes()).unwrap();
        let amount = ds.column("Amount").unwrap();

        let rows = amount.row_values();
        assert_eq!(rows.len(), ds.n_rows());
        assert_eq!(rows.iter().filter(|x| x.is_nan()).count(), 1);
        assert_eq!(amount.numeric_values().len(), ds.n_rows() - 1);

        let merchant = Column::categorical("m", vec![Some("3".into()), None, Some("x".into())]);
        let rows = merchant.row_values();
        assert_eq!(rows[0], 3.0);
        assert!(rows[1].is_nan() && rows[2].is_nan());
    }

    #[test]
    fn test_take_rows_and_drop() {
        let mut ds = Dataset::from_reader(SAMPLE.as_bytes()).unwrap();
        assert!(ds.drop_column("Class").is_some());
        assert!(ds.drop_column("Class").is_none());

        let subset = ds.take_rows(&[2, 0]);
        assert_eq!(subset.n_rows(), 2);
        assert_eq!(subset.column("Time").unwrap().numeric_values(), vec![2.0, 0.0]);
    }
}
