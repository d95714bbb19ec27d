use crate::types::series::{calendar, CanonicalSeries};
use crate::types::station::StationMeta;
use crate::types::variable::Variable;
use chrono::{Datelike, NaiveDate};
use std::collections::BTreeMap;
use std::f64::consts::PI;

/// Deterministic seasonal series for `codes` over `[start, end]`.
pub(crate) fn synthetic_series(codes: &[&str], start: NaiveDate, end: NaiveDate) -> Vec<CanonicalSeries> {
    let dates = calendar(start, end);
    codes
        .iter()
        .enumerate()
        .map(|(s, code)| {
            let offset = s as f64;
            let mut values: BTreeMap<Variable, Vec<f64>> = BTreeMap::new();
            for (i, date) in dates.iter().enumerate() {
                let season = (2.0 * PI * date.ordinal() as f64 / 365.0).sin();
                let wiggle = ((i * 7 + s * 3) % 10) as f64 / 10.0;
                let tavg = 15.0 + 8.0 * season + offset + wiggle;
                let prcp = if (i * 37 + s) % 11 < 3 { 4.0 } else { 0.0 };
                let row = [
                    (Variable::Tavg, tavg),
                    (Variable::Tmin, tavg - 5.0),
                    (Variable::Tmax, tavg + 5.0),
                    (Variable::Prcp, prcp),
                    (Variable::Wspd, 3.0 + (i % 5) as f64),
                    (Variable::Wpgt, 8.0 + (i % 5) as f64),
                    (Variable::Wdir, ((i * 45) % 360) as f64),
                    (Variable::Tsun, 7.0 + 3.0 * season),
                    (Variable::Pres, 1013.0 + 5.0 * (i as f64 / 5.0).cos()),
                    (Variable::Cldc, 40.0 + (i % 50) as f64),
                    (Variable::Rhum, 65.0 - 10.0 * season),
                ];
                for (variable, value) in row {
                    values.entry(variable).or_default().push(value);
                }
            }
            let estimated = Variable::ALL
                .into_iter()
                .map(|v| (v, vec![false; dates.len()]))
                .collect();
            let meta = StationMeta {
                code: code.to_string(),
                name: Some(format!("Station {code}")),
                province: Some("BARCELONA".to_string()),
                altitude: Some(10.0 * offset),
            };
            CanonicalSeries::from_columns(meta, dates.clone(), values, estimated)
        })
        .collect()
}

/// Small models for `targets`, trained on `frame` with a split inside 2020-2021.
pub(crate) fn quick_models(
    frame: &crate::features::frame::FeatureFrame,
    targets: &[crate::forecast::target::Target],
) -> Vec<crate::model::persistence::TrainedModel> {
    use crate::config::{ymd, ExperimentConfig, ModelConfig};
    use crate::forecast::trainer::ForecastTrainer;
    use crate::model::gbdt::{BoosterParams, Objective};

    let params = |objective| {
        BoosterParams::builder()
            .objective(objective)
            .num_leaves(8)
            .learning_rate(0.3)
            .num_boost_round(20)
            .build()
    };
    let model = ModelConfig::builder()
        .regression(params(Objective::L1))
        .classifier(params(Objective::Binary))
        .build();
    let experiment = ExperimentConfig::builder()
        .val_start(ymd(2020, 9, 1))
        .test_start(ymd(2021, 1, 1))
        .build();
    let trainer = ForecastTrainer::new(&model, &experiment);
    targets
        .iter()
        .filter_map(|t| trainer.train(*t, frame).ok().flatten())
        .map(|outcome| outcome.model)
        .collect()
}
