/// Chance of seeing a rainbow on a day, in percent.
///
/// A rainbow needs showers and direct sun together. Rain probabilities in the
/// scattered-shower band score best, a near-certain overcast rain day scores
/// less, and humid air keeps droplets alive long enough to matter.
pub fn rainbow_probability(prob_rain: f64, sun_hours: f64, humidity: f64) -> f64 {
    let rain = rain_score(prob_rain) * prob_rain;
    let humidity_factor = if humidity < 40.0 {
        humidity / 100.0 * 0.5
    } else {
        humidity / 100.0
    };
    let raw = rain * sun_score(sun_hours) * humidity_factor * 120.0;
    (raw.clamp(0.0, 95.0) * 10.0).round() / 10.0
}

fn rain_score(p: f64) -> f64 {
    if p < 0.25 {
        0.0
    } else if p <= 0.85 {
        1.0
    } else {
        0.7
    }
}

fn sun_score(hours: f64) -> f64 {
    match hours {
        h if h < 1.0 => 0.0,
        h if h < 4.0 => 0.6,
        h if h < 10.0 => 1.0,
        _ => 0.8,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn needs_both_rain_and_sun() {
        assert_eq!(rainbow_probability(0.1, 8.0, 80.0), 0.0);
        assert_eq!(rainbow_probability(0.6, 0.5, 80.0), 0.0);
        // 0.6 * 1.0 * 0.8 * 120
        assert_eq!(rainbow_probability(0.6, 6.0, 80.0), 57.6);
    }

    #[test]
    fn penalises_overcast_rain_and_dry_air() {
        // 0.7 * 0.9 * 0.6 * 0.9 * 120
        assert_eq!(rainbow_probability(0.9, 2.0, 90.0), 40.8);
        // 0.5 * 0.8 * (0.3 * 0.5) * 120
        assert_eq!(rainbow_probability(0.5, 12.0, 30.0), 7.2);
    }

    #[test]
    fn is_capped() {
        assert_eq!(rainbow_probability(0.85, 5.0, 100.0), 95.0);
        assert!(rainbow_probability(0.85, 5.0, 100.0) <= 95.0);
    }
}
