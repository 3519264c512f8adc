use crate::stage::FeatureStage;
use coinrisk_core::columns;
use coinrisk_core::{Result, Series, Table};

/// Adds `deviation_from_peg = price - peg`.
///
/// # Errors
/// Returns `MissingColumn("price")` if the table has no price column.
pub fn compute_peg_deviation(table: &Table, peg: f64) -> Result<Table> {
    let price = table.require_column(columns::PRICE)?;
    let deviation: Series = price.iter().map(|p| p.map(|p| p - peg)).collect();
    table.clone().with_column(columns::DEVIATION_FROM_PEG, deviation)
}

/// Peg deviation stage, used for stablecoin tables.
#[derive(Debug, Clone, Copy)]
pub struct PegDeviation {
    peg: f64,
}

impl PegDeviation {
    #[must_use]
    pub fn new(peg: f64) -> Self {
        Self { peg }
    }
}

impl FeatureStage for PegDeviation {
    fn name(&self) -> &'static str {
        "peg"
    }

    fn apply(&self, table: &Table) -> Result<Table> {
        compute_peg_deviation(table, self.peg)
    }
}
