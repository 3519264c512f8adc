use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Float64Array, StringArray, TimestampMillisecondArray};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::{Datelike, NaiveDate};
use coinrisk_core::columns;
use coinrisk_core::Table;
use parquet::arrow::ArrowWriter;
use parquet::file::properties::WriterProperties;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// File name used inside each partition directory.
pub const PARTITION_FILE: &str = "data.parquet";

pub struct ParquetStorage;

impl ParquetStorage {
    /// Arrow schema for a table: UTC millisecond timestamps, Utf8 keys and
    /// nullable Float64 numeric columns.
    #[must_use]
    pub fn schema(table: &Table) -> Schema {
        let mut fields = vec![
            Field::new(columns::ASSET_ID, DataType::Utf8, false),
            Field::new(
                columns::TIMESTAMP,
                DataType::Timestamp(TimeUnit::Millisecond, Some("UTC".into())),
                false,
            ),
        ];
        if table.symbols().is_some() {
            fields.push(Field::new(columns::SYMBOL, DataType::Utf8, true));
        }
        fields.extend(
            table
                .column_names()
                .map(|name| Field::new(name, DataType::Float64, true)),
        );
        Schema::new(fields)
    }

    /// Converts a table into a single Arrow record batch.
    ///
    /// # Errors
    /// Returns an error if the arrays do not match the schema.
    pub fn to_record_batch(table: &Table) -> Result<RecordBatch> {
        let schema = Arc::new(Self::schema(table));

        let timestamps: Vec<i64> = table
            .timestamps()
            .iter()
            .map(chrono::DateTime::timestamp_millis)
            .collect();

        let mut arrays: Vec<ArrayRef> = vec![
            Arc::new(StringArray::from(table.asset_ids().to_vec())),
            Arc::new(TimestampMillisecondArray::from(timestamps).with_timezone("UTC")),
        ];
        if let Some(symbols) = table.symbols() {
            arrays.push(Arc::new(StringArray::from(symbols.to_vec())));
        }
        for column in table.columns() {
            arrays.push(Arc::new(Float64Array::from(column.values().to_vec())));
        }

        Ok(RecordBatch::try_new(schema, arrays)?)
    }

    /// Writes a table to a Snappy-compressed Parquet file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created or if writing to the Parquet file fails.
    pub fn write_table(path: impl AsRef<Path>, table: &Table) -> Result<()> {
        let path = path.as_ref();
        let batch = Self::to_record_batch(table)?;

        let file = File::create(path)
            .with_context(|| format!("Failed to create Parquet file: {}", path.display()))?;
        let props = WriterProperties::builder()
            .set_compression(parquet::basic::Compression::SNAPPY)
            .build();
        let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))?;

        writer.write(&batch)?;
        writer.close()?;

        tracing::debug!(rows = table.len(), path = %path.display(), "Wrote Parquet table");
        Ok(())
    }

    /// Writes one Parquet file per (day, asset) under Hive-style partition directories.
    ///
    /// Returns the written file paths in partition order.
    ///
    /// # Errors
    /// Returns an error if a directory or file cannot be written.
    pub fn write_partitioned(base: impl AsRef<Path>, table: &Table) -> Result<Vec<PathBuf>> {
        let mut partitions: BTreeMap<(NaiveDate, &str), Vec<usize>> = BTreeMap::new();
        for (row, (asset, ts)) in table.asset_ids().iter().zip(table.timestamps()).enumerate() {
            partitions
                .entry((ts.date_naive(), asset.as_str()))
                .or_default()
                .push(row);
        }

        let mut written = Vec::with_capacity(partitions.len());
        for ((date, asset), rows) in partitions {
            let dir = partition_path(base.as_ref(), date, Some(asset));
            fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create partition: {}", dir.display()))?;
            let path = dir.join(PARTITION_FILE);
            Self::write_table(&path, &table.select_rows(&rows))?;
            written.push(path);
        }

        tracing::info!(files = written.len(), "Wrote partitioned Parquet output");
        Ok(written)
    }
}

/// Builds `base/year=YYYY/month=MM/day=DD[/coin=<asset>]`.
#[must_use]
pub fn partition_path(base: &Path, date: NaiveDate, asset: Option<&str>) -> PathBuf {
    let mut path = base
        .join(format!("year={}", date.year()))
        .join(format!("month={:02}", date.month()))
        .join(format!("day={:02}", date.day()));
    if let Some(asset) = asset {
        path = path.join(format!("coin={asset}"));
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
    use tempfile::TempDir;

    fn sample() -> Table {
        let day1 = Utc.with_ymd_and_hms(2024, 3, 9, 12, 0, 0).unwrap();
        let day2 = Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap();
        let mut table: Table = Table::new(
            vec!["btc".to_string(), "btc".to_string(), "eth".to_string()],
            vec![day1, day2, day1],
        )
        .unwrap();
        table
            .set_column(columns::PRICE, vec![Some(100.0), Some(101.0), Some(10.0)])
            .unwrap();
        table
            .set_column(columns::RISK_SCORE, vec![Some(40.0), None, Some(55.0)])
            .unwrap();
        table
    }

    #[test]
    fn partition_path_is_hive_style() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        let base = Path::new("/data");
        assert_eq!(
            partition_path(base, date, None),
            PathBuf::from("/data/year=2024/month=03/day=09")
        );
        assert_eq!(
            partition_path(base, date, Some("bitcoin")),
            PathBuf::from("/data/year=2024/month=03/day=09/coin=bitcoin")
        );
    }

    #[test]
    fn schema_uses_utc_millis_and_nullable_floats() {
        let schema = ParquetStorage::schema(&sample());
        let ts = schema.field_with_name(columns::TIMESTAMP).unwrap();
        assert_eq!(
            ts.data_type(),
            &DataType::Timestamp(TimeUnit::Millisecond, Some("UTC".into()))
        );
        let risk = schema.field_with_name(columns::RISK_SCORE).unwrap();
        assert!(risk.is_nullable());
        assert_eq!(risk.data_type(), &DataType::Float64);
    }

    #[test]
    fn write_table_round_trips_row_count() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scored.parquet");
        ParquetStorage::write_table(&path, &sample()).unwrap();

        let file = File::open(&path).unwrap();
        let reader = ParquetRecordBatchReaderBuilder::try_new(file)
            .unwrap()
            .build()
            .unwrap();
        let rows: usize = reader.map(|batch| batch.unwrap().num_rows()).sum();
        assert_eq!(rows, 3);
    }

    #[test]
    fn partitioned_write_splits_by_day_and_asset() {
        let dir = TempDir::new().unwrap();
        let files = ParquetStorage::write_partitioned(dir.path(), &sample()).unwrap();
        assert_eq!(files.len(), 3);
        assert!(files[0].ends_with("year=2024/month=03/day=09/coin=btc/data.parquet"));
        assert!(files.iter().all(|f| f.exists()));
    }
}
