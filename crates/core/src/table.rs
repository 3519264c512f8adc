//! Columnar time-series table.
//!
//! Every pipeline stage takes a `&Table` and returns a new `Table`. The key
//! section (asset id + timestamp) is always present; the symbol column and
//! the numeric columns are optional and addressed by name.

use crate::columns;
use crate::error::{PipelineError, Result};
use crate::observation::{Observation, RawTimestamp};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// A numeric column's values; `None` is the missing-value sentinel.
pub type Series = Vec<Option<f64>>;

/// A named numeric column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    name: String,
    values: Series,
}

impl Column {
    #[must_use]
    pub fn new(name: impl Into<String>, values: Series) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn values(&self) -> &[Option<f64>] {
        &self.values
    }

    /// Mutable access to the values; the row count cannot change.
    pub fn values_mut(&mut self) -> &mut [Option<f64>] {
        &mut self.values
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of missing cells.
    #[must_use]
    pub fn missing_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_none()).count()
    }
}

/// Ordered time-series table, generic over the timestamp representation.
///
/// `Table` (UTC timestamps) is what the feature and scoring stages consume.
/// `RawTable` is what ingestion produces before timestamp normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct Table<T = DateTime<Utc>> {
    asset_ids: Vec<String>,
    timestamps: Vec<T>,
    symbols: Option<Vec<Option<String>>>,
    columns: Vec<Column>,
}

/// A table whose timestamps have not been normalized.
pub type RawTable = Table<RawTimestamp>;

/// Decomposed table, used by stages that rebuild the key section.
#[derive(Debug, Clone)]
pub struct TableParts<T> {
    pub asset_ids: Vec<String>,
    pub timestamps: Vec<T>,
    pub symbols: Option<Vec<Option<String>>>,
    pub columns: Vec<Column>,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            asset_ids: Vec::new(),
            timestamps: Vec::new(),
            symbols: None,
            columns: Vec::new(),
        }
    }
}

impl<T: Clone> Table<T> {
    /// Creates a table from its key section.
    ///
    /// # Errors
    /// Returns `LengthMismatch` if the key vectors differ in length.
    pub fn new(asset_ids: Vec<String>, timestamps: Vec<T>) -> Result<Self> {
        if asset_ids.len() != timestamps.len() {
            return Err(PipelineError::LengthMismatch {
                column: columns::TIMESTAMP.to_string(),
                expected: asset_ids.len(),
                actual: timestamps.len(),
            });
        }
        Ok(Self {
            asset_ids,
            timestamps,
            symbols: None,
            columns: Vec::new(),
        })
    }

    /// Reassembles a table from parts, validating every column length.
    ///
    /// # Errors
    /// Returns `LengthMismatch` if any part has the wrong number of rows.
    pub fn from_parts(parts: TableParts<T>) -> Result<Self> {
        let mut table = Self::new(parts.asset_ids, parts.timestamps)?;
        if let Some(symbols) = parts.symbols {
            table.set_symbols(symbols)?;
        }
        for column in parts.columns {
            table.set_column(column.name, column.values)?;
        }
        Ok(table)
    }

    /// Splits the table into its parts.
    #[must_use]
    pub fn into_parts(self) -> TableParts<T> {
        TableParts {
            asset_ids: self.asset_ids,
            timestamps: self.timestamps,
            symbols: self.symbols,
            columns: self.columns,
        }
    }

    /// Builds a table from row-oriented observations.
    ///
    /// The price column is always created. Volume, OHLC and symbol columns
    /// exist only when at least one row carries a value; extra values become
    /// columns named by their keys.
    #[must_use]
    pub fn from_observations(rows: &[Observation<T>]) -> Self {
        let asset_ids = rows.iter().map(|r| r.asset_id.clone()).collect();
        let timestamps = rows.iter().map(|r| r.timestamp.clone()).collect();

        let mut table = Self {
            asset_ids,
            timestamps,
            symbols: None,
            columns: Vec::new(),
        };

        table.push_column(columns::PRICE, rows.iter().map(|r| r.price).collect());

        let optional: [(&str, fn(&Observation<T>) -> Option<f64>); 5] = [
            (columns::VOLUME, |r| r.volume),
            (columns::OPEN, |r| r.open),
            (columns::HIGH, |r| r.high),
            (columns::LOW, |r| r.low),
            (columns::CLOSE, |r| r.close),
        ];
        for (name, getter) in optional {
            let values: Series = rows.iter().map(getter).collect();
            if values.iter().any(Option::is_some) {
                table.push_column(name, values);
            }
        }

        let extra_names: BTreeSet<&String> = rows.iter().flat_map(|r| r.extra.keys()).collect();
        for name in extra_names {
            let values = rows.iter().map(|r| r.extra.get(name).copied()).collect();
            table.push_column(name.as_str(), values);
        }

        if rows.iter().any(|r| r.symbol.is_some()) {
            table.symbols = Some(rows.iter().map(|r| r.symbol.clone()).collect());
        }

        table
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.asset_ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.asset_ids.is_empty()
    }

    #[must_use]
    pub fn asset_ids(&self) -> &[String] {
        &self.asset_ids
    }

    #[must_use]
    pub fn timestamps(&self) -> &[T] {
        &self.timestamps
    }

    #[must_use]
    pub fn symbols(&self) -> Option<&[Option<String>]> {
        self.symbols.as_deref()
    }

    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn columns_mut(&mut self) -> &mut [Column] {
        &mut self.columns
    }

    pub fn symbols_mut(&mut self) -> Option<&mut [Option<String>]> {
        self.symbols.as_deref_mut()
    }

    /// Names of the numeric columns, in table order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(Column::name)
    }

    /// Returns true if a numeric column (or the symbol column) exists.
    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        match name {
            columns::ASSET_ID | columns::TIMESTAMP => true,
            columns::SYMBOL => self.symbols.is_some(),
            _ => self.column(name).is_some(),
        }
    }

    /// Looks up a numeric column by name.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&[Option<f64>]> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.values.as_slice())
    }

    /// Looks up a numeric column the caller cannot do without.
    ///
    /// # Errors
    /// Returns `MissingColumn` if the column is absent.
    pub fn require_column(&self, name: &str) -> Result<&[Option<f64>]> {
        self.column(name)
            .ok_or_else(|| PipelineError::missing_column(name))
    }

    /// Inserts or replaces a numeric column.
    ///
    /// Replacing keeps the column's position; new columns are appended.
    ///
    /// # Errors
    /// Returns `LengthMismatch` if `values` does not have one entry per row.
    pub fn set_column(&mut self, name: impl Into<String>, values: Series) -> Result<()> {
        let name = name.into();
        if values.len() != self.len() {
            return Err(PipelineError::LengthMismatch {
                column: name,
                expected: self.len(),
                actual: values.len(),
            });
        }
        self.push_column(name, values);
        Ok(())
    }

    /// Builder-style variant of [`set_column`](Self::set_column).
    ///
    /// # Errors
    /// Returns `LengthMismatch` if `values` does not have one entry per row.
    pub fn with_column(mut self, name: impl Into<String>, values: Series) -> Result<Self> {
        self.set_column(name, values)?;
        Ok(self)
    }

    /// Fills a column with one constant value.
    pub fn set_constant_column(&mut self, name: impl Into<String>, value: f64) {
        let values = vec![Some(value); self.len()];
        self.push_column(name, values);
    }

    /// Removes a numeric column (or the symbol column). Returns true if it existed.
    pub fn drop_column(&mut self, name: &str) -> bool {
        if name == columns::SYMBOL {
            return self.symbols.take().is_some();
        }
        let before = self.columns.len();
        self.columns.retain(|c| c.name != name);
        self.columns.len() != before
    }

    /// Sets the symbol column.
    ///
    /// # Errors
    /// Returns `LengthMismatch` if `symbols` does not have one entry per row.
    pub fn set_symbols(&mut self, symbols: Vec<Option<String>>) -> Result<()> {
        if symbols.len() != self.len() {
            return Err(PipelineError::LengthMismatch {
                column: columns::SYMBOL.to_string(),
                expected: self.len(),
                actual: symbols.len(),
            });
        }
        self.symbols = Some(symbols);
        Ok(())
    }

    /// Returns a new table containing the given rows in the given order.
    #[must_use]
    pub fn select_rows(&self, indices: &[usize]) -> Self {
        Self {
            asset_ids: indices.iter().map(|&i| self.asset_ids[i].clone()).collect(),
            timestamps: indices.iter().map(|&i| self.timestamps[i].clone()).collect(),
            symbols: self
                .symbols
                .as_ref()
                .map(|s| indices.iter().map(|&i| s[i].clone()).collect()),
            columns: self
                .columns
                .iter()
                .map(|c| Column::new(c.name.clone(), indices.iter().map(|&i| c.values[i]).collect()))
                .collect(),
        }
    }

    /// Distinct asset ids in order of first appearance.
    #[must_use]
    pub fn assets(&self) -> Vec<&str> {
        let mut seen = HashMap::new();
        let mut ordered = Vec::new();
        for id in &self.asset_ids {
            if seen.insert(id.as_str(), ()).is_none() {
                ordered.push(id.as_str());
            }
        }
        ordered
    }

    fn push_column(&mut self, name: impl Into<String>, values: Series) {
        let name = name.into();
        if let Some(existing) = self.columns.iter_mut().find(|c| c.name == name) {
            existing.values = values;
        } else {
            self.columns.push(Column::new(name, values));
        }
    }
}

impl Table {
    /// Groups row indices per asset, each group in chronological order.
    ///
    /// Assets appear in order of first appearance; ties in timestamp keep
    /// their original row order.
    #[must_use]
    pub fn asset_groups(&self) -> Vec<AssetGroup> {
        let mut position: HashMap<&str, usize> = HashMap::new();
        let mut groups: Vec<AssetGroup> = Vec::new();

        for (row, id) in self.asset_ids.iter().enumerate() {
            let slot = *position.entry(id.as_str()).or_insert_with(|| {
                groups.push(AssetGroup {
                    asset_id: id.clone(),
                    indices: Vec::new(),
                });
                groups.len() - 1
            });
            groups[slot].indices.push(row);
        }

        for group in &mut groups {
            group.indices.sort_by_key(|&i| self.timestamps[i]);
        }

        groups
    }

    /// Returns true if timestamps are non-decreasing within every asset.
    #[must_use]
    pub fn is_chronological(&self) -> bool {
        let mut last: HashMap<&str, DateTime<Utc>> = HashMap::new();
        for (id, ts) in self.asset_ids.iter().zip(&self.timestamps) {
            if let Some(prev) = last.insert(id.as_str(), *ts) {
                if *ts < prev {
                    return false;
                }
            }
        }
        true
    }
}

/// Row indices of one asset's series in chronological order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetGroup {
    pub asset_id: String,
    pub indices: Vec<usize>,
}

impl AssetGroup {
    #[must_use]
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Row index of the most recent observation.
    #[must_use]
    pub fn last_index(&self) -> Option<usize> {
        self.indices.last().copied()
    }

    /// Collects this asset's values from a full-table column, oldest first.
    #[must_use]
    pub fn gather(&self, values: &[Option<f64>]) -> Series {
        self.indices.iter().map(|&i| values[i]).collect()
    }

    /// Writes per-asset results back to their table rows.
    pub fn scatter(&self, target: &mut [Option<f64>], values: &[Option<f64>]) {
        for (&row, value) in self.indices.iter().zip(values) {
            target[row] = *value;
        }
    }
}
