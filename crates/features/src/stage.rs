use coinrisk_core::{AssetGroup, Result, Series, Table};

/// One family of derived columns.
///
/// Stages are pure: they read the input table and return a new one with
/// their columns added or replaced.
pub trait FeatureStage: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Computes this stage's columns.
    ///
    /// # Errors
    /// Returns an error when a column the stage cannot do without is absent.
    fn apply(&self, table: &Table) -> Result<Table>;
}

/// Runs `f` over every asset's chronological slice of `input` and writes the
/// results back to their rows.
///
/// `f` receives the asset's values oldest first and must return one output
/// series per requested column, each as long as its input.
pub(crate) fn per_asset<const N: usize, F>(
    groups: &[AssetGroup],
    input: &[Option<f64>],
    rows: usize,
    mut f: F,
) -> [Series; N]
where
    F: FnMut(&[Option<f64>]) -> [Series; N],
{
    let mut outputs: [Series; N] = std::array::from_fn(|_| vec![None; rows]);
    for group in groups {
        let series = group.gather(input);
        let results = f(&series);
        for (output, result) in outputs.iter_mut().zip(results.iter()) {
            group.scatter(output, result);
        }
    }
    outputs
}
