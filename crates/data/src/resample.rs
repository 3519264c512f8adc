//! Fixed-frequency resampling.

use crate::normalize::forward_fill;
use chrono::{DateTime, Utc};
use coinrisk_core::{
    AggConfig, Aggregation, AssetGroup, Column, PipelineError, ResampleConfig, ResampleRule,
    Result, Series, Table, TableParts,
};

/// Aligns every asset's series onto epoch-anchored buckets of width `rule`.
///
/// Each bucket is aggregated per `aggregations`; buckets without source rows
/// (and cells whose source values were all missing) are forward-filled from
/// the previous bucket. Config entries naming absent columns are skipped and
/// columns without an entry are not carried over.
///
/// # Errors
/// Returns `MalformedTimestamp` if a bucket start falls outside the representable range.
pub fn resample(table: &Table, rule: ResampleRule, aggregations: &AggConfig) -> Result<Table> {
    let specs: Vec<(&str, Aggregation, &[Option<f64>])> = aggregations
        .iter()
        .filter_map(|spec| {
            table
                .column(&spec.column)
                .map(|values| (spec.column.as_str(), spec.aggregation, values))
        })
        .collect();

    let mut asset_ids = Vec::new();
    let mut timestamps = Vec::new();
    let mut symbols: Vec<Option<String>> = Vec::new();
    let mut outputs: Vec<Series> = vec![Vec::new(); specs.len()];

    for group in table.asset_groups() {
        let buckets = bucketize(table, &group, rule.millis());
        let Some(&(first, _)) = buckets.first() else {
            continue;
        };
        let Some(&(last, _)) = buckets.last() else {
            continue;
        };

        let slots = usize::try_from((last - first) / rule.millis()).unwrap_or(0) + 1;
        let empty: &[usize] = &[];
        let mut rows_per_slot = vec![empty; slots];
        for (start, rows) in &buckets {
            if let Ok(slot) = usize::try_from((start - first) / rule.millis()) {
                rows_per_slot[slot] = rows.as_slice();
            }
        }

        for slot in 0..slots {
            #[allow(clippy::cast_possible_wrap)]
            let start = first + slot as i64 * rule.millis();
            let ts = DateTime::<Utc>::from_timestamp_millis(start)
                .ok_or_else(|| PipelineError::malformed_timestamp(start))?;
            asset_ids.push(group.asset_id.clone());
            timestamps.push(ts);
        }

        for ((_, aggregation, values), output) in specs.iter().zip(outputs.iter_mut()) {
            let mut series: Series = rows_per_slot
                .iter()
                .map(|rows| {
                    if rows.is_empty() {
                        None
                    } else {
                        aggregate(rows.iter().map(|&i| values[i]), *aggregation)
                    }
                })
                .collect();
            forward_fill(&mut series);
            output.extend(series);
        }

        if let Some(source) = table.symbols() {
            let mut series: Vec<Option<String>> = rows_per_slot
                .iter()
                .map(|rows| rows.iter().rev().find_map(|&i| source[i].clone()))
                .collect();
            forward_fill(&mut series);
            symbols.extend(series);
        }

        tracing::debug!(
            asset = %group.asset_id,
            input_rows = group.len(),
            buckets = slots,
            rule = %rule,
            "Resampled asset series"
        );
    }

    Table::from_parts(TableParts {
        asset_ids,
        timestamps,
        symbols: table.symbols().map(|_| symbols),
        columns: specs
            .iter()
            .zip(outputs)
            .map(|((name, _, _), values)| Column::new(*name, values))
            .collect(),
    })
}

/// Resamples with a config; a config without a rule returns the table unchanged.
///
/// # Errors
/// Returns `MalformedTimestamp` if a bucket start falls outside the representable range.
pub fn resample_with_config(table: &Table, config: &ResampleConfig) -> Result<Table> {
    match config.rule {
        Some(rule) => resample(table, rule, &config.aggregations),
        None => Ok(table.clone()),
    }
}

/// Groups an asset's chronological rows into `(bucket_start_ms, rows)` pairs.
fn bucketize(table: &Table, group: &AssetGroup, width_ms: i64) -> Vec<(i64, Vec<usize>)> {
    let mut buckets: Vec<(i64, Vec<usize>)> = Vec::new();
    for &row in &group.indices {
        let start = table.timestamps()[row]
            .timestamp_millis()
            .div_euclid(width_ms)
            * width_ms;
        match buckets.last_mut() {
            Some((current, rows)) if *current == start => rows.push(row),
            _ => buckets.push((start, vec![row])),
        }
    }
    buckets
}

/// Collapses one bucket's values, ignoring missing cells.
#[allow(clippy::cast_precision_loss)]
fn aggregate(values: impl Iterator<Item = Option<f64>>, aggregation: Aggregation) -> Option<f64> {
    let valid: Vec<f64> = values.flatten().collect();
    match aggregation {
        Aggregation::Count => Some(valid.len() as f64),
        _ if valid.is_empty() => None,
        Aggregation::First => valid.first().copied(),
        Aggregation::Last => valid.last().copied(),
        Aggregation::Max => valid.iter().copied().reduce(f64::max),
        Aggregation::Min => valid.iter().copied().reduce(f64::min),
        Aggregation::Sum => Some(valid.iter().sum()),
        Aggregation::Mean => Some(valid.iter().sum::<f64>() / valid.len() as f64),
    }
}
