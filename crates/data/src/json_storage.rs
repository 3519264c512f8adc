use anyhow::{Context, Result};
use coinrisk_core::columns;
use coinrisk_core::Table;
use serde_json::{Map, Value};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

pub struct JsonStorage;

impl JsonStorage {
    /// Converts a table into an array of row objects.
    ///
    /// Missing and non-finite values become `null`; timestamps are RFC 3339.
    #[must_use]
    pub fn to_rows(table: &Table) -> Vec<Value> {
        (0..table.len())
            .map(|row| {
                let mut object = Map::new();
                object.insert(
                    columns::ASSET_ID.to_string(),
                    Value::from(table.asset_ids()[row].clone()),
                );
                object.insert(
                    columns::TIMESTAMP.to_string(),
                    Value::from(table.timestamps()[row].to_rfc3339()),
                );
                if let Some(symbols) = table.symbols() {
                    object.insert(
                        columns::SYMBOL.to_string(),
                        symbols[row].clone().map_or(Value::Null, Value::from),
                    );
                }
                for column in table.columns() {
                    let value = column.values()[row]
                        .and_then(serde_json::Number::from_f64)
                        .map_or(Value::Null, Value::Number);
                    object.insert(column.name().to_string(), value);
                }
                Value::Object(object)
            })
            .collect()
    }

    /// Writes a table as a pretty-printed JSON array of row objects.
    ///
    /// # Errors
    /// Returns error if the file cannot be created or serialization fails.
    pub fn write_table(path: impl AsRef<Path>, table: &Table) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path)
            .with_context(|| format!("Failed to create JSON file: {}", path.display()))?;
        let mut writer = BufWriter::new(file);

        serde_json::to_writer_pretty(&mut writer, &Self::to_rows(table))
            .context("Failed to serialize table to JSON")?;
        writer.flush()?;

        tracing::debug!(rows = table.len(), path = %path.display(), "Wrote JSON table");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    fn sample() -> Table {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut table: Table = Table::new(vec!["dai".to_string(); 2], vec![ts; 2]).unwrap();
        table
            .set_column(columns::PRICE, vec![Some(0.985), Some(f64::NAN)])
            .unwrap();
        table
            .set_symbols(vec![Some("DAI".to_string()), None])
            .unwrap();
        table
    }

    #[test]
    fn rows_map_missing_and_nan_to_null() {
        let rows = JsonStorage::to_rows(&sample());
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["asset_id"], "dai");
        assert_eq!(rows[0]["symbol"], "DAI");
        assert_eq!(rows[0]["price"], 0.985);
        assert_eq!(rows[0]["timestamp"], "2024-01-01T00:00:00+00:00");
        assert!(rows[1]["price"].is_null());
        assert!(rows[1]["symbol"].is_null());
    }

    #[test]
    fn write_table_produces_parseable_array() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scored.json");
        JsonStorage::write_table(&path, &sample()).unwrap();

        let parsed: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed.as_array().map(Vec::len), Some(2));
    }
}
