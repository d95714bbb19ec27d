/// Temperature felt by a person, in °C, from air temperature, wind speed in
/// km/h and relative humidity in percent.
///
/// Uses the wind chill index in cold wind and the Rothfusz heat index in heat.
/// Calm cold air is felt as the air temperature. The Steadman apparent
/// temperature covers the mild band in between.
pub fn apparent_temperature(t: f64, wind_kmh: f64, humidity: f64) -> f64 {
    let felt = if t <= 10.0 {
        if wind_kmh > 4.8 {
            let v = wind_kmh.powf(0.16);
            13.12 + 0.6215 * t - 11.37 * v + 0.3965 * t * v
        } else {
            t
        }
    } else if t >= 26.0 {
        heat_index(t, humidity)
    } else {
        t + 0.33 * vapour_pressure(t, humidity) - 0.70 * (wind_kmh / 3.6) - 4.0
    };
    (felt * 10.0).round() / 10.0
}

/// Rothfusz regression with coefficients for °C.
fn heat_index(t: f64, rh: f64) -> f64 {
    -8.784_694_755_56 + 1.611_394_11 * t + 2.338_548_838_89 * rh
        - 0.146_116_05 * t * rh
        - 0.012_308_094 * t * t
        - 0.016_424_827_777_8 * rh * rh
        + 0.002_211_732 * t * t * rh
        + 0.000_725_46 * t * rh * rh
        - 0.000_003_582 * t * t * rh * rh
}

/// Water vapour pressure in hPa (Magnus).
fn vapour_pressure(t: f64, humidity: f64) -> f64 {
    humidity / 100.0 * 6.112 * (17.67 * t / (t + 243.5)).exp()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wind_chill_in_cold_wind() {
        assert_eq!(apparent_temperature(0.0, 20.0, 70.0), -5.2);
        assert!(apparent_temperature(5.0, 30.0, 70.0) < 5.0);
    }

    #[test]
    fn heat_index_when_hot() {
        assert_eq!(apparent_temperature(30.0, 10.0, 50.0), 31.0);
        assert_eq!(apparent_temperature(35.0, 10.0, 70.0), 50.3);
        assert!(apparent_temperature(30.0, 0.0, 20.0) < apparent_temperature(30.0, 0.0, 60.0));
    }

    #[test]
    fn steadman_in_between() {
        assert_eq!(apparent_temperature(20.0, 9.0, 60.0), 18.9);
    }

    #[test]
    fn calm_cold_air_is_the_air_temperature() {
        assert_eq!(apparent_temperature(8.0, 2.0, 80.0), 8.0);
        assert_eq!(apparent_temperature(-3.0, 4.8, 90.0), -3.0);
        assert_eq!(apparent_temperature(10.0, 0.0, 50.0), 10.0);
    }
}
