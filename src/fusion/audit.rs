use crate::types::series::CanonicalSeries;
use crate::types::variable::Variable;
use log::{info, warn};
use ordered_float::OrderedFloat;
use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap};

const WORST_STATION_COUNT: usize = 5;

/// Variables whose estimation share is audited.
const AUDITED: [Variable; 11] = Variable::ALL;

/// A station removed by the coverage gate before fusion.
#[derive(Debug, Clone, PartialEq)]
pub struct DroppedStation {
    pub code: String,
    /// Share of calendar days with at least one raw record, in `[0, 1]`.
    pub coverage: f64,
}

/// Data-quality summary of a fusion run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImputationAudit {
    pub stations: usize,
    pub rows: usize,
    /// Percentage of rows flagged as estimated, per variable.
    pub estimated_pct: BTreeMap<Variable, f64>,
    /// Stations with the highest mean estimated percentage, worst first.
    pub worst_stations: Vec<(String, f64)>,
    pub dropped: Vec<DroppedStation>,
}

/// Clips variables with hard physical bounds (humidity, cloud cover, sunshine).
pub fn apply_physical_clamps(series: &mut CanonicalSeries) {
    for variable in Variable::ALL {
        if let Some((lo, hi)) = variable.physical_bounds() {
            for value in series.values_mut(variable) {
                *value = value.clamp(lo, hi);
            }
        }
    }
}

fn station_score(series: &CanonicalSeries) -> f64 {
    let total: f64 = AUDITED.iter().map(|v| series.estimated_ratio(*v)).sum();
    total / AUDITED.len() as f64 * 100.0
}

impl ImputationAudit {
    pub fn from_series(series: &[CanonicalSeries], dropped: Vec<DroppedStation>) -> Self {
        let rows: usize = series.iter().map(CanonicalSeries::len).sum();
        let mut estimated_pct = BTreeMap::new();
        for variable in AUDITED {
            let flagged: usize = series
                .iter()
                .map(|s| s.estimated(variable).iter().filter(|f| **f).count())
                .sum();
            let pct = if rows == 0 {
                0.0
            } else {
                flagged as f64 / rows as f64 * 100.0
            };
            estimated_pct.insert(variable, pct);
        }

        // Min-heap capped at the worst N keeps the highest scores.
        let mut heap: BinaryHeap<Reverse<(OrderedFloat<f64>, String)>> = BinaryHeap::new();
        for s in series {
            let label = s.meta.name.clone().unwrap_or_else(|| s.code().to_string());
            heap.push(Reverse((OrderedFloat(station_score(s)), label)));
            if heap.len() > WORST_STATION_COUNT {
                heap.pop();
            }
        }
        let mut worst_stations: Vec<(String, f64)> = heap
            .into_iter()
            .map(|Reverse((score, label))| (label, score.into_inner()))
            .collect();
        worst_stations.sort_by(|a, b| OrderedFloat(b.1).cmp(&OrderedFloat(a.1)).then(a.0.cmp(&b.0)));

        Self {
            stations: series.len(),
            rows,
            estimated_pct,
            worst_stations,
            dropped,
        }
    }

    pub fn log(&self) {
        info!("=== Data quality audit ===");
        for dropped in &self.dropped {
            warn!(
                "Dropped station {}: coverage {:.1}%",
                dropped.code,
                dropped.coverage * 100.0
            );
        }
        info!("Estimated share by variable:");
        for (variable, pct) in &self.estimated_pct {
            info!("  - {}: {:.2}%", variable.column().to_uppercase(), pct);
        }
        info!("Stations with the highest estimation ratio:");
        for (label, score) in &self.worst_stations {
            info!("  - {}: {:.2}% estimated", label, score);
        }
        info!("Finished. Stations: {}. Rows: {}", self.stations, self.rows);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::series::calendar;
    use crate::types::station::StationMeta;
    use chrono::NaiveDate;

    fn series(code: &str, estimated_tavg: usize) -> CanonicalSeries {
        let dates = calendar(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 4).unwrap(),
        );
        let mut values = BTreeMap::new();
        let mut flags = BTreeMap::new();
        for variable in Variable::ALL {
            values.insert(variable, vec![50.0; 4]);
            flags.insert(variable, vec![false; 4]);
        }
        values.insert(Variable::Rhum, vec![101.5, 99.0, -2.0, 40.0]);
        let mut tavg_flags = vec![false; 4];
        tavg_flags[..estimated_tavg].fill(true);
        flags.insert(Variable::Tavg, tavg_flags);
        CanonicalSeries::from_columns(
            StationMeta {
                code: code.into(),
                ..Default::default()
            },
            dates,
            values,
            flags,
        )
    }

    #[test]
    fn clamps_bounded_variables_only() {
        let mut s = series("0076", 0);
        apply_physical_clamps(&mut s);
        assert_eq!(s.values(Variable::Rhum), &[100.0, 99.0, 0.0, 40.0]);
        assert_eq!(s.values(Variable::Tsun), &[24.0; 4]);
        assert_eq!(s.values(Variable::Tavg), &[50.0; 4]);
    }

    #[test]
    fn worst_stations_are_capped_and_sorted() {
        let all: Vec<_> = (0..7).map(|i| series(&format!("S{i}"), i.min(4))).collect();
        let audit = ImputationAudit::from_series(&all, Vec::new());
        assert_eq!(audit.rows, 28);
        assert_eq!(audit.worst_stations.len(), WORST_STATION_COUNT);
        assert_eq!(audit.worst_stations[0].0, "S4");
        assert!(audit.worst_stations[0].1 >= audit.worst_stations[4].1);
        let tavg = audit.estimated_pct[&Variable::Tavg];
        assert!((tavg - (0 + 1 + 2 + 3 + 4 + 4 + 4) as f64 / 28.0 * 100.0).abs() < 1e-9);
    }
}
