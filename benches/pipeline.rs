use chrono::{Duration, NaiveDate};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rainbow_forecast::{
    impute_column, Booster, BoosterParams, CanonicalSeries, FeatureConfig, FeatureEngineer, Matrix, Objective,
    StationMeta, Variable,
};
use std::collections::BTreeMap;

fn series(code: &str, days: usize) -> CanonicalSeries {
    let start = NaiveDate::from_ymd_opt(2015, 1, 1).unwrap();
    let dates: Vec<NaiveDate> = (0..days).map(|i| start + Duration::days(i as i64)).collect();
    let mut values = BTreeMap::new();
    for (k, variable) in Variable::ALL.into_iter().enumerate() {
        let column = (0..days)
            .map(|i| 10.0 + (i as f64 / 58.0 + k as f64).sin() * 5.0 + (i % 7) as f64)
            .collect();
        values.insert(variable, column);
    }
    let meta = StationMeta {
        code: code.to_string(),
        ..Default::default()
    };
    CanonicalSeries::from_columns(meta, dates, values, BTreeMap::new())
}

fn bench_imputation(c: &mut Criterion) {
    let reference = series("0076", 3_650);
    let dates = reference.dates().to_vec();
    let mut gappy = reference.values(Variable::Tavg).to_vec();
    for (i, v) in gappy.iter_mut().enumerate() {
        // Short gaps every 10 days and one 30-day hole per year.
        if i % 10 < 2 || i % 365 < 30 {
            *v = f64::NAN;
        }
    }
    c.bench_function("impute_ten_years", |b| {
        b.iter(|| {
            let mut values = gappy.clone();
            impute_column(black_box(&dates), &mut values, 7, 15.0)
        })
    });
}

fn bench_features(c: &mut Criterion) {
    let config = FeatureConfig::default();
    let engineer = FeatureEngineer::new(&config);
    let all: Vec<CanonicalSeries> = ["0076", "0200E", "0201D", "0061X"]
        .iter()
        .map(|code| series(code, 3_650))
        .collect();
    c.bench_function("features_full_history", |b| b.iter(|| engineer.build(black_box(&all))));
    let ids = FeatureEngineer::station_ids(&all);
    c.bench_function("features_tail", |b| b.iter(|| engineer.build_tail(black_box(&all), 40, &ids)));
}

fn bench_booster(c: &mut Criterion) {
    let rows: Vec<Vec<f64>> = (0..5_000)
        .map(|i| (0..20).map(|j| ((i * (j + 3)) % 97) as f64 / 9.7).collect())
        .collect();
    let labels: Vec<f64> = rows.iter().map(|r| r[0] * 2.0 - r[3] + r[7].sin()).collect();
    let matrix = Matrix::from_rows(20, &rows).unwrap();
    let params = BoosterParams::builder()
        .objective(Objective::L1)
        .num_boost_round(50)
        .build();

    c.bench_function("booster_train_l1", |b| {
        b.iter(|| Booster::train(black_box(&params), &matrix, &labels, None).unwrap())
    });
}

criterion_group!(benches, bench_imputation, bench_features, bench_booster);
criterion_main!(benches);
