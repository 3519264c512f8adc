use anyhow::{bail, Context, Result};
use coinrisk_core::columns;
use coinrisk_core::{RawObservation, RawTable, RawTimestamp, Table};
use csv::{Reader, StringRecord, Writer};
use std::fs::File;
use std::path::Path;

/// Accepted spellings of the asset identifier header.
const ASSET_HEADERS: [&str; 3] = [columns::ASSET_ID, "coin", "coin_id"];

pub struct CsvStorage;

impl CsvStorage {
    /// Reads a batch of raw observations from a CSV file.
    ///
    /// Required headers: `asset_id` (or `coin`/`coin_id`), `timestamp`, `price`.
    /// Optional headers: `volume`, `open`, `high`, `low`, `close`, `symbol`,
    /// `sentiment_score`. Empty cells and `NaN` are missing values; numeric
    /// timestamps are kept as numbers so the normalizer can detect their unit.
    ///
    /// # Errors
    /// Returns error if the file cannot be read, a required header is absent,
    /// or a numeric cell does not parse.
    pub fn read_raw_observations(path: impl AsRef<Path>) -> Result<RawTable> {
        let path = path.as_ref();
        let mut reader = Reader::from_path(path)
            .with_context(|| format!("Failed to open CSV file: {}", path.display()))?;
        let headers = reader.headers()?.clone();

        let find = |name: &str| headers.iter().position(|h| h.trim().eq_ignore_ascii_case(name));
        let Some(asset_idx) = ASSET_HEADERS.iter().find_map(|name| find(name)) else {
            bail!("CSV {} has no asset_id/coin/coin_id column", path.display());
        };
        let Some(ts_idx) = find(columns::TIMESTAMP) else {
            bail!("CSV {} has no timestamp column", path.display());
        };
        let Some(price_idx) = find(columns::PRICE) else {
            bail!("CSV {} has no price column", path.display());
        };
        let volume_idx = find(columns::VOLUME);
        let open_idx = find(columns::OPEN);
        let high_idx = find(columns::HIGH);
        let low_idx = find(columns::LOW);
        let close_idx = find(columns::CLOSE);
        let symbol_idx = find(columns::SYMBOL);
        let sentiment_idx = find(columns::SENTIMENT_SCORE);

        let mut rows = Vec::new();
        for (line, record) in reader.records().enumerate() {
            let record = record.with_context(|| format!("Failed to read CSV row {}", line + 1))?;
            let cell = |idx: Option<usize>| -> Result<Option<f64>> {
                idx.map_or(Ok(None), |i| parse_number(&record, i, line + 1))
            };

            let timestamp = record.get(ts_idx).unwrap_or_default().trim();
            let timestamp = timestamp
                .parse::<f64>()
                .map_or_else(|_| RawTimestamp::from(timestamp), RawTimestamp::Numeric);

            let mut row =
                RawObservation::without_price(record.get(asset_idx).unwrap_or_default().trim(), timestamp);
            row.price = parse_number(&record, price_idx, line + 1)?;
            row.volume = cell(volume_idx)?;
            row.open = cell(open_idx)?;
            row.high = cell(high_idx)?;
            row.low = cell(low_idx)?;
            row.close = cell(close_idx)?;
            row.symbol = symbol_idx
                .and_then(|i| record.get(i))
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string);
            if let Some(sentiment) = cell(sentiment_idx)? {
                row = row.with_value(columns::SENTIMENT_SCORE, sentiment);
            }
            rows.push(row);
        }

        tracing::debug!(rows = rows.len(), path = %path.display(), "Read raw observations");
        Ok(Table::from_observations(&rows))
    }

    /// Writes a table to CSV.
    ///
    /// Format: `asset_id,timestamp[,symbol],<numeric columns...>` with RFC 3339
    /// timestamps and empty cells for missing values.
    ///
    /// # Errors
    /// Returns error if file cannot be created or writing fails
    pub fn write_table(path: impl AsRef<Path>, table: &Table) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path)
            .with_context(|| format!("Failed to create CSV file: {}", path.display()))?;
        let mut writer = Writer::from_writer(file);

        let mut header = vec![columns::ASSET_ID, columns::TIMESTAMP];
        if table.symbols().is_some() {
            header.push(columns::SYMBOL);
        }
        header.extend(table.column_names());
        writer.write_record(&header)?;

        for row in 0..table.len() {
            let mut record = vec![
                table.asset_ids()[row].clone(),
                table.timestamps()[row].to_rfc3339(),
            ];
            if let Some(symbols) = table.symbols() {
                record.push(symbols[row].clone().unwrap_or_default());
            }
            record.extend(
                table
                    .columns()
                    .iter()
                    .map(|c| c.values()[row].map(|v| v.to_string()).unwrap_or_default()),
            );
            writer.write_record(&record)?;
        }

        writer.flush()?;
        tracing::debug!(rows = table.len(), path = %path.display(), "Wrote CSV table");
        Ok(())
    }
}

fn parse_number(record: &StringRecord, idx: usize, line: usize) -> Result<Option<f64>> {
    let raw = record.get(idx).unwrap_or_default().trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }
    raw.parse::<f64>()
        .map(Some)
        .with_context(|| format!("Invalid number '{raw}' in CSV row {line}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize_timestamps;
    use chrono::{TimeZone, Utc};
    use std::io::Write;
    use tempfile::TempDir;

    fn write_file(dir: &TempDir, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn reads_coin_header_and_optional_columns() {
        let dir = TempDir::new().unwrap();
        let path = write_file(
            &dir,
            "raw.csv",
            "coin,timestamp,price,volume,symbol\n\
             bitcoin,1704067200,42000.5,1200,btc\n\
             bitcoin,1704070800,,1300,\n",
        );

        let raw = CsvStorage::read_raw_observations(&path).unwrap();
        assert_eq!(raw.len(), 2);
        assert_eq!(raw.asset_ids()[0], "bitcoin");
        assert_eq!(raw.timestamps()[0], RawTimestamp::Numeric(1_704_067_200.0));
        assert_eq!(raw.column(columns::PRICE).unwrap(), &[Some(42000.5), None]);
        assert_eq!(raw.column(columns::VOLUME).unwrap(), &[Some(1200.0), Some(1300.0)]);
        assert_eq!(raw.symbols().unwrap()[1], None);
        assert!(!raw.has_column(columns::HIGH));

        let table = normalize_timestamps(&raw).unwrap();
        assert_eq!(
            table.timestamps()[0],
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn text_timestamps_stay_text() {
        let dir = TempDir::new().unwrap();
        let path = write_file(
            &dir,
            "raw.csv",
            "asset_id,timestamp,price,sentiment_score\ndai,2024-01-01 00:00:00,0.999,40\n",
        );
        let raw = CsvStorage::read_raw_observations(&path).unwrap();
        assert_eq!(
            raw.timestamps()[0],
            RawTimestamp::Text("2024-01-01 00:00:00".to_string())
        );
        assert_eq!(raw.column(columns::SENTIMENT_SCORE).unwrap(), &[Some(40.0)]);
    }

    #[test]
    fn missing_required_header_is_error() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "raw.csv", "asset_id,price\nbtc,1\n");
        let err = CsvStorage::read_raw_observations(&path).unwrap_err();
        assert!(err.to_string().contains("timestamp"));
    }

    #[test]
    fn bad_number_reports_row() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "raw.csv", "asset_id,timestamp,price\nbtc,1,abc\n");
        let err = CsvStorage::read_raw_observations(&path).unwrap_err();
        assert!(err.to_string().contains("row 1"));
    }

    #[test]
    fn write_table_emits_header_and_blank_missing_cells() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scored.csv");
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let table: Table = Table::new(vec!["btc".to_string()], vec![ts])
            .unwrap()
            .with_column(columns::PRICE, vec![Some(100.0)])
            .unwrap()
            .with_column(columns::RSI, vec![None])
            .unwrap();

        CsvStorage::write_table(&path, &table).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        let mut lines = contents.lines();
        assert_eq!(lines.next(), Some("asset_id,timestamp,price,rsi"));
        assert_eq!(lines.next(), Some("btc,2024-01-01T00:00:00+00:00,100,"));
    }
}
