use chrono::{Duration, TimeZone, Utc};
use coinrisk_core::columns;
use coinrisk_core::{Observation, RiskComponent, RiskWeights, Table};
use coinrisk_features::FeatureEngine;
use coinrisk_scoring::{compute_risk_score, summarize_latest, RiskLevel};

fn featured(prices: impl Fn(f64) -> f64, sentiment: Option<f64>) -> Table {
    let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let rows: Vec<Observation> = (0..60)
        .map(|i| {
            let x = f64::from(i);
            let row = Observation::new("coin", t0 + Duration::days(i64::from(i)), prices(x))
                .with_volume(1_000.0 + 10.0 * x);
            match sentiment {
                Some(s) => row.with_value(columns::SENTIMENT_SCORE, s),
                None => row,
            }
        })
        .collect();
    FeatureEngine::default()
        .compute(&Table::from_observations(&rows))
        .unwrap()
}

#[test]
fn scores_stay_in_range_for_any_weights() {
    let table = featured(|x| 100.0 + 30.0 * (x * 1.3).sin(), Some(250.0));
    let weight_sets = [
        RiskWeights::default(),
        RiskWeights::empty(),
        RiskWeights::empty().with(RiskComponent::Volatility, 10.0),
        RiskWeights::empty()
            .with(RiskComponent::Liquidity, 3.0)
            .with(RiskComponent::Momentum, 7.5),
        RiskWeights::empty().with(RiskComponent::Sentiment, 0.01),
    ];

    for weights in &weight_sets {
        let scored = compute_risk_score(&table, weights).unwrap();
        for column in scored.columns() {
            if columns::is_score(column.name()) {
                assert!(
                    column.values().iter().flatten().all(|v| (0.0..=100.0).contains(v)),
                    "{} out of range for {weights:?}",
                    column.name()
                );
            }
        }
    }
}

#[test]
fn one_way_rally_maxes_momentum_risk() {
    let weights = RiskWeights::empty().with(RiskComponent::Momentum, 1.0);
    let rally = compute_risk_score(&featured(|x| 100.0 * 1.05_f64.powf(x), None), &weights).unwrap();
    let choppy = compute_risk_score(
        &featured(|x| if x as i64 % 2 == 0 { 100.0 } else { 100.5 }, None),
        &weights,
    )
    .unwrap();

    // RSI pins at 100 in a rally: (100 - 70) * 2
    let rally = &summarize_latest(&rally)[0];
    assert_eq!(rally.components[&RiskComponent::Momentum], 60.0);
    assert_eq!(rally.risk_score, Some(60.0));
    assert_eq!(rally.level, Some(RiskLevel::High));

    let choppy = &summarize_latest(&choppy)[0];
    assert_eq!(choppy.risk_score, Some(0.0));
    assert_eq!(choppy.level, Some(RiskLevel::Low));
}

#[test]
fn missing_sentiment_is_neutral() {
    let table = featured(|x| 100.0 + x, None);
    let weights = RiskWeights::empty().with(RiskComponent::Sentiment, 1.0);
    let scored = compute_risk_score(&table, &weights).unwrap();
    assert!(scored
        .column(columns::RISK_SCORE)
        .unwrap()
        .iter()
        .all(|v| *v == Some(50.0)));
}
