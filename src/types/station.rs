//! Defines the observation stations the pipeline ingests and models, and the
//! slowly-changing metadata attached to each station's series.

use serde::{Deserialize, Serialize};

/// A fixed physical observation point.
///
/// Coordinates are used to query the secondary physics source; the code is
/// the key of the upstream observation source and of every output row.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Station {
    /// The stable station identifier (e.g., "0076").
    pub code: String,
    /// Human readable name (e.g., "Barcelona - Aeropuerto").
    pub name: String,
    /// Latitude in decimal degrees.
    pub latitude: f64,
    /// Longitude in decimal degrees.
    pub longitude: f64,
}

impl Station {
    pub fn new(code: &str, name: &str, latitude: f64, longitude: f64) -> Self {
        Self {
            code: code.to_string(),
            name: name.to_string(),
            latitude,
            longitude,
        }
    }
}

/// Static metadata carried on every row of a canonical series.
///
/// Filled from the first raw record that reports each field, which is the same
/// as forward/back-filling a value that never changes day to day.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct StationMeta {
    pub code: String,
    pub name: Option<String>,
    pub province: Option<String>,
    pub altitude: Option<f64>,
}

/// Lookup table from station code to [`Station`].
#[derive(Debug, Clone, Default)]
pub struct StationRegistry {
    stations: Vec<Station>,
}

impl StationRegistry {
    pub fn new(mut stations: Vec<Station>) -> Self {
        stations.sort_by(|a, b| a.code.cmp(&b.code));
        stations.dedup_by(|a, b| a.code == b.code);
        Self { stations }
    }

    pub fn get(&self, code: &str) -> Option<&Station> {
        self.stations
            .binary_search_by(|s| s.code.as_str().cmp(code))
            .ok()
            .map(|i| &self.stations[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Station> {
        self.stations.iter()
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }
}

/// The Barcelona-area network used when no station list is configured.
pub fn default_stations() -> Vec<Station> {
    [
        ("0252D", "Arenys de Mar", 41.581, 2.550),
        ("0244X", "Vilassar de Dalt", 41.517, 2.360),
        ("0255B", "Santa Susanna", 41.637, 2.710),
        ("0073X", "Sitges", 41.237, 1.807),
        ("0201D", "Barcelona - Port Olímpic", 41.380, 2.170),
        ("0200E", "Barcelona - Fabra", 41.418, 2.124),
        ("0201X", "Barcelona - Museo Marítimo", 41.376, 2.173),
        ("0076", "Barcelona - Aeropuerto", 41.293, 2.070),
        ("0229I", "Sabadell - Aeropuerto", 41.520, 2.105),
        ("0194D", "Corbera - Pic D'Agulles", 41.420, 1.920),
        ("0149D", "Manresa - La Culla", 41.725, 1.826),
        ("0149X", "Manresa", 41.720, 1.820),
        ("0106X", "Balsareny", 41.863, 1.878),
        ("0158O", "Montserrat", 41.590, 1.830),
        ("0158X", "Monistrol de Montserrat", 41.610, 1.840),
        ("0120X", "Moià", 41.810, 2.095),
        ("0092X", "Berga", 42.100, 1.850),
        ("0114X", "Prats de Lluçanès", 42.008, 2.030),
        ("0341X", "Tona", 41.850, 2.227),
        ("0341", "Tona (Escola)", 41.852, 2.225),
        ("0349", "Sant Julià de Vilatorta", 41.923, 2.327),
        ("0260X", "Fogars de Montclús", 41.730, 2.440),
        ("0222X", "Caldes de Montbui", 41.633, 2.167),
        ("0171X", "Igualada", 41.583, 1.617),
        ("0066X", "Vilafranca del Penedès", 41.346, 1.698),
        ("0061X", "Pontons", 41.415, 1.515),
    ]
    .into_iter()
    .map(|(code, name, lat, lon)| Station::new(code, name, lat, lon))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_lookup_by_code() {
        let registry = StationRegistry::new(default_stations());
        assert_eq!(registry.len(), 26);
        let airport = registry.get("0076").expect("airport station");
        assert_eq!(airport.name, "Barcelona - Aeropuerto");
        assert!((airport.latitude - 41.293).abs() < 1e-9);
        assert!(registry.get("9999").is_none());
    }

    #[test]
    fn registry_drops_duplicate_codes() {
        let registry = StationRegistry::new(vec![
            Station::new("B", "second", 0.0, 0.0),
            Station::new("A", "first", 0.0, 0.0),
            Station::new("B", "duplicate", 1.0, 1.0),
        ]);
        let codes: Vec<_> = registry.iter().map(|s| s.code.as_str()).collect();
        assert_eq!(codes, ["A", "B"]);
    }
}
