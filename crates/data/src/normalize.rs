//! Normalization of raw observation tables.
//!
//! Each function takes a table by reference and returns a new one. The usual
//! chain is wrapped up in [`normalize`].

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use coinrisk_core::columns;
use coinrisk_core::{
    FillMethod, KeepPolicy, NormalizeConfig, PipelineError, RawTable, RawTimestamp, Result, Table,
    TableParts,
};
use std::collections::{HashMap, HashSet};

/// Numeric timestamps above this are epoch milliseconds, otherwise seconds.
const MILLIS_THRESHOLD: f64 = 1e12;

const OFFSET_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M%:z",
];

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Converts every raw timestamp to UTC.
///
/// Numeric values are read as epoch milliseconds when the largest numeric
/// value in the column exceeds 1e12, as epoch seconds otherwise. Naive values
/// are taken to be UTC already.
///
/// # Errors
/// Returns `MalformedTimestamp` for unparseable strings and out-of-range numbers.
pub fn normalize_timestamps(raw: &RawTable) -> Result<Table> {
    let max_numeric = raw
        .timestamps()
        .iter()
        .filter_map(|ts| match ts {
            RawTimestamp::Numeric(v) => Some(*v),
            _ => None,
        })
        .fold(f64::NEG_INFINITY, f64::max);
    let millis = max_numeric > MILLIS_THRESHOLD;

    let parts = raw.clone().into_parts();
    let timestamps = parts
        .timestamps
        .iter()
        .map(|ts| to_utc(ts, millis))
        .collect::<Result<Vec<_>>>()?;

    tracing::debug!(rows = timestamps.len(), millis, "Normalized timestamps");

    Table::from_parts(TableParts {
        asset_ids: parts.asset_ids,
        timestamps,
        symbols: parts.symbols,
        columns: parts.columns,
    })
}

#[allow(clippy::cast_possible_truncation)]
fn to_utc(ts: &RawTimestamp, millis: bool) -> Result<DateTime<Utc>> {
    match ts {
        RawTimestamp::Numeric(v) => {
            if !v.is_finite() {
                return Err(PipelineError::malformed_timestamp(v));
            }
            let ms = if millis { *v } else { v * 1000.0 };
            DateTime::from_timestamp_millis(ms.round() as i64)
                .ok_or_else(|| PipelineError::malformed_timestamp(v))
        }
        RawTimestamp::Text(text) => {
            parse_timestamp(text).ok_or_else(|| PipelineError::malformed_timestamp(text))
        }
        RawTimestamp::Naive(naive) => Ok(naive.and_utc()),
        RawTimestamp::Zoned(zoned) => Ok(zoned.with_timezone(&Utc)),
        RawTimestamp::Utc(utc) => Ok(*utc),
    }
}

/// Parses a timestamp string, with or without a UTC offset.
///
/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS[.f]`, `YYYY-MM-DDTHH:MM:SS[.f]` and
/// bare `YYYY-MM-DD` (midnight). Strings without an offset are UTC.
#[must_use]
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(text, format) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Drops sparse columns, then fills or drops the remaining gaps.
///
/// A column (the symbol column included) is dropped when its missing
/// fraction exceeds `threshold`. Fills run within each asset's chronological
/// series; interpolation is linear over numeric columns, carries the last
/// value into trailing gaps and leaves leading gaps missing.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn handle_missing_values(table: &Table, method: FillMethod, threshold: f64) -> Table {
    let mut out = table.clone();
    if out.is_empty() {
        return out;
    }

    let rows = out.len() as f64;
    let too_sparse = |missing: usize| missing as f64 / rows > threshold;

    let mut dropped: Vec<String> = table
        .columns()
        .iter()
        .filter(|c| too_sparse(c.missing_count()))
        .map(|c| c.name().to_string())
        .collect();
    if let Some(symbols) = table.symbols() {
        if too_sparse(symbols.iter().filter(|s| s.is_none()).count()) {
            dropped.push(columns::SYMBOL.to_string());
        }
    }
    if !dropped.is_empty() {
        tracing::warn!(
            columns = ?dropped,
            threshold,
            "Dropping columns with too many missing values"
        );
        for name in &dropped {
            out.drop_column(name);
        }
    }

    if method == FillMethod::Drop {
        return drop_incomplete_rows(&out);
    }

    let groups = out.asset_groups();
    for column in out.columns_mut() {
        for group in &groups {
            let mut series = group.gather(column.values());
            match method {
                FillMethod::ForwardFill => forward_fill(&mut series),
                FillMethod::BackwardFill => backward_fill(&mut series),
                FillMethod::Interpolate => interpolate(&mut series),
                FillMethod::Drop => {}
            }
            group.scatter(column.values_mut(), &series);
        }
    }

    if method != FillMethod::Interpolate {
        if let Some(symbols) = out.symbols_mut() {
            for group in &groups {
                let mut series: Vec<Option<String>> =
                    group.indices.iter().map(|&i| symbols[i].clone()).collect();
                if method == FillMethod::ForwardFill {
                    forward_fill(&mut series);
                } else {
                    backward_fill(&mut series);
                }
                for (&row, value) in group.indices.iter().zip(series) {
                    symbols[row] = value;
                }
            }
        }
    }

    out
}

fn drop_incomplete_rows(table: &Table) -> Table {
    let keep: Vec<usize> = (0..table.len())
        .filter(|&row| {
            table.columns().iter().all(|c| c.values()[row].is_some())
                && table.symbols().map_or(true, |s| s[row].is_some())
        })
        .collect();

    let removed = table.len() - keep.len();
    if removed > 0 {
        tracing::info!(removed, "Dropped rows with missing values");
    }
    table.select_rows(&keep)
}

/// Propagates the last known value forward.
pub fn forward_fill<T: Clone>(values: &mut [Option<T>]) {
    let mut last: Option<T> = None;
    for value in values.iter_mut() {
        if value.is_some() {
            last.clone_from(value);
        } else {
            value.clone_from(&last);
        }
    }
}

/// Propagates the next known value backward.
pub fn backward_fill<T: Clone>(values: &mut [Option<T>]) {
    let mut next: Option<T> = None;
    for value in values.iter_mut().rev() {
        if value.is_some() {
            next.clone_from(value);
        } else {
            value.clone_from(&next);
        }
    }
}

/// Linear interpolation by position between known values.
///
/// Trailing gaps carry the last known value forward; leading gaps stay
/// missing.
#[allow(clippy::cast_precision_loss)]
pub fn interpolate(values: &mut [Option<f64>]) {
    let mut prev: Option<(usize, f64)> = None;
    for i in 0..values.len() {
        let Some(current) = values[i] else { continue };
        if let Some((j, start)) = prev {
            let gap = i - j;
            for (step, slot) in values[j + 1..i].iter_mut().enumerate() {
                let t = (step + 1) as f64 / gap as f64;
                *slot = Some(start + (current - start) * t);
            }
        }
        prev = Some((i, current));
    }
    if let Some((last, value)) = prev {
        for slot in &mut values[last + 1..] {
            *slot = Some(value);
        }
    }
}

/// Result of duplicate removal.
#[derive(Debug, Clone, PartialEq)]
pub struct Deduplicated {
    pub table: Table,
    pub removed: usize,
}

#[derive(Hash, PartialEq, Eq)]
enum KeyCell<'a> {
    Text(Option<&'a str>),
    Time(DateTime<Utc>),
    Number(Option<u64>),
}

enum KeySource<'a> {
    Asset,
    Time,
    Symbol(&'a [Option<String>]),
    Numeric(&'a [Option<f64>]),
}

/// Removes rows whose values agree on every key column.
///
/// An empty `key_columns` slice means every column. Surviving rows keep
/// their original order.
///
/// # Errors
/// Returns `MissingColumn` if a key column does not exist.
pub fn remove_duplicates(
    table: &Table,
    key_columns: &[&str],
    keep: KeepPolicy,
) -> Result<Deduplicated> {
    let sources = key_sources(table, key_columns)?;

    let key_of = |row: usize| {
        sources
            .iter()
            .map(|source| match source {
                KeySource::Asset => KeyCell::Text(Some(table.asset_ids()[row].as_str())),
                KeySource::Time => KeyCell::Time(table.timestamps()[row]),
                KeySource::Symbol(values) => KeyCell::Text(values[row].as_deref()),
                KeySource::Numeric(values) => {
                    KeyCell::Number(values[row].map(|v| if v == 0.0 { 0 } else { v.to_bits() }))
                }
            })
            .collect::<Vec<KeyCell>>()
    };

    let keep_rows: Vec<usize> = match keep {
        KeepPolicy::First => {
            let mut seen = HashSet::new();
            (0..table.len()).filter(|&row| seen.insert(key_of(row))).collect()
        }
        KeepPolicy::Last => {
            let mut last = HashMap::new();
            for row in 0..table.len() {
                last.insert(key_of(row), row);
            }
            let mut rows: Vec<usize> = last.into_values().collect();
            rows.sort_unstable();
            rows
        }
    };

    let removed = table.len() - keep_rows.len();
    if removed > 0 {
        tracing::info!(removed, ?keep, "Removed duplicate rows");
    }

    Ok(Deduplicated {
        table: table.select_rows(&keep_rows),
        removed,
    })
}

fn key_sources<'a>(table: &'a Table, key_columns: &[&str]) -> Result<Vec<KeySource<'a>>> {
    if key_columns.is_empty() {
        let mut sources = vec![KeySource::Asset, KeySource::Time];
        if let Some(symbols) = table.symbols() {
            sources.push(KeySource::Symbol(symbols));
        }
        sources.extend(table.columns().iter().map(|c| KeySource::Numeric(c.values())));
        return Ok(sources);
    }

    key_columns
        .iter()
        .map(|&name| match name {
            columns::ASSET_ID => Ok(KeySource::Asset),
            columns::TIMESTAMP => Ok(KeySource::Time),
            columns::SYMBOL => table
                .symbols()
                .map(KeySource::Symbol)
                .ok_or_else(|| PipelineError::missing_column(name)),
            _ => table.require_column(name).map(KeySource::Numeric),
        })
        .collect()
}

/// Uppercases and trims the symbol column; no-op without one.
#[must_use]
pub fn standardize_symbols(table: &Table) -> Table {
    let mut out = table.clone();
    if let Some(symbols) = out.symbols_mut() {
        for symbol in symbols.iter_mut().flatten() {
            *symbol = symbol.trim().to_uppercase();
        }
    }
    out
}

/// Clips a numeric column into `[min, max]`; no-op if the column is absent.
#[must_use]
pub fn validate_numeric_range(
    table: &Table,
    column: &str,
    min: Option<f64>,
    max: Option<f64>,
) -> Table {
    let mut out = table.clone();
    let Some(position) = out.columns().iter().position(|c| c.name() == column) else {
        return out;
    };
    let target = &mut out.columns_mut()[position];

    let mut below = 0usize;
    let mut above = 0usize;
    for value in target.values_mut().iter_mut().flatten() {
        if let Some(lo) = min {
            if *value < lo {
                *value = lo;
                below += 1;
            }
        }
        if let Some(hi) = max {
            if *value > hi {
                *value = hi;
                above += 1;
            }
        }
    }

    if below > 0 {
        tracing::info!(column, count = below, bound = ?min, "Clipped values below minimum");
    }
    if above > 0 {
        tracing::info!(column, count = above, bound = ?max, "Clipped values above maximum");
    }
    out
}

/// Orders rows by asset (first appearance) and then timestamp.
#[must_use]
pub fn sort_chronologically(table: &Table) -> Table {
    let order: Vec<usize> = table
        .asset_groups()
        .into_iter()
        .flat_map(|group| group.indices)
        .collect();
    table.select_rows(&order)
}

/// Runs the standard normalization chain.
///
/// Timestamps to UTC, symbol cleanup, dedupe on `(asset_id, timestamp)`,
/// chronological sort, missing-value handling, then range clipping of the
/// raw market columns.
///
/// # Errors
/// Returns `MalformedTimestamp` if a timestamp cannot be interpreted.
pub fn normalize(raw: &RawTable, config: &NormalizeConfig) -> Result<Table> {
    let table = normalize_timestamps(raw)?;
    let table = standardize_symbols(&table);
    let Deduplicated { table, .. } =
        remove_duplicates(&table, &[columns::ASSET_ID, columns::TIMESTAMP], config.keep)?;
    let table = sort_chronologically(&table);
    let mut table =
        handle_missing_values(&table, config.fill_method, config.missing_threshold);

    if config.clip_non_negative {
        for column in columns::NON_NEGATIVE {
            table = validate_numeric_range(&table, column, Some(0.0), None);
        }
    }
    if config.max_price.is_some() {
        table = validate_numeric_range(&table, columns::PRICE, None, config.max_price);
    }

    tracing::debug!(
        input_rows = raw.len(),
        output_rows = table.len(),
        "Normalized observation table"
    );
    Ok(table)
}
