//! Geographic domains and sensor registry filtering.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, WebdropsError};

/// An axis-aligned lat/lon bounding box, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Domain {
    pub min_lat: f64,
    pub min_lon: f64,
    pub max_lat: f64,
    pub max_lon: f64,
}

impl Domain {
    pub const ITALY: Domain = Domain::new(24.0, -19.0, 64.0, 48.0);
    pub const FRANCE: Domain = Domain::new(38.0, -10.0, 55.0, 12.0);
    pub const WORLD: Domain = Domain::new(-90.0, -180.0, 90.0, 180.0);

    pub const fn new(min_lat: f64, min_lon: f64, max_lat: f64, max_lon: f64) -> Self {
        Self {
            min_lat,
            min_lon,
            max_lat,
            max_lon,
        }
    }

    /// Parse `"minLat,maxLat,minLon,maxLon"`.
    pub fn parse(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 4 {
            return Err(WebdropsError::Config(format!(
                "invalid domain '{}': expected 'minLat,maxLat,minLon,maxLon'",
                s
            )));
        }

        let mut values = [0.0f64; 4];
        for (value, part) in values.iter_mut().zip(&parts) {
            *value = part.parse().map_err(|_| {
                WebdropsError::Config(format!("invalid number '{}' in domain '{}'", part, s))
            })?;
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(WebdropsError::Config(format!(
                "invalid domain '{}': bounds must be finite",
                s
            )));
        }
        let [min_lat, max_lat, min_lon, max_lon] = values;

        if min_lat > max_lat || min_lon > max_lon {
            return Err(WebdropsError::Config(format!(
                "invalid domain '{}': minimum exceeds maximum",
                s
            )));
        }

        Ok(Self::new(min_lat, min_lon, max_lat, max_lon))
    }

    /// Inclusive on every bound.
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        lat >= self.min_lat && lat <= self.max_lat && lon >= self.min_lon && lon <= self.max_lon
    }

    /// The `geowin` query value: `lonmin,latmin,lonmax,latmax`.
    pub fn geowin(&self) -> String {
        format!(
            "{},{},{},{}",
            self.min_lon, self.min_lat, self.max_lon, self.max_lat
        )
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{}",
            self.min_lat, self.max_lat, self.min_lon, self.max_lon
        )
    }
}

/// One entry of a sensor registry.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SensorRecord {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "Lat")]
    pub lat: f64,
    #[serde(rename = "Lng")]
    pub lon: f64,
}

/// Ids of the registry sensors inside `domain`, in registry order.
pub fn filter_by_domain(registry: &[u8], domain: &Domain) -> Result<Vec<String>> {
    let sensors: Vec<SensorRecord> = serde_json::from_slice(registry)
        .map_err(|e| WebdropsError::decode("sensor registry", e))?;

    Ok(sensors
        .into_iter()
        .filter(|s| domain.contains(s.lat, s.lon))
        .map(|s| s.id)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOX: Domain = Domain::new(40.0, 10.0, 45.0, 15.0);

    #[test]
    fn test_parse_domain_order() {
        let d = Domain::parse("24,64,-19,48").unwrap();
        assert_eq!(d, Domain::ITALY);
        assert_eq!(d.to_string(), "24,64,-19,48");
        assert_eq!(d.geowin(), "-19,24,48,64");
    }

    #[test]
    fn test_parse_domain_errors() {
        assert!(Domain::parse("1,2,3").is_err());
        assert!(Domain::parse("a,2,3,4").is_err());
        assert!(Domain::parse("10,5,0,1").is_err());
    }

    #[test]
    fn test_parse_rejects_non_finite_bounds() {
        for input in ["nan,64,-19,48", "24,inf,-19,48", "24,64,-inf,48", "24,64,-19,NaN"] {
            assert!(
                matches!(Domain::parse(input), Err(WebdropsError::Config(_))),
                "{} should be rejected",
                input
            );
        }
    }

    #[test]
    fn test_boundaries_are_inclusive() {
        let registry = br#"[
            {"ID": "on-max-lat", "Lat": 45.0, "Lng": 12.0},
            {"ID": "on-min-lon", "Lat": 42.0, "Lng": 10.0},
            {"ID": "corner", "Lat": 40.0, "Lng": 15.0},
            {"ID": "north", "Lat": 46.0, "Lng": 12.0},
            {"ID": "west", "Lat": 42.0, "Lng": 9.0},
            {"ID": "east", "Lat": 42.0, "Lng": 16.0},
            {"ID": "south", "Lat": 39.0, "Lng": 12.0}
        ]"#;

        let ids = filter_by_domain(registry, &BOX).unwrap();
        assert_eq!(ids, vec!["on-max-lat", "on-min-lon", "corner"]);
    }

    #[test]
    fn test_registry_order_preserved() {
        let registry = br#"[
            {"ID": "c", "Lat": 41.0, "Lng": 11.0, "Name": "Ciampino"},
            {"ID": "a", "Lat": 42.0, "Lng": 12.0},
            {"ID": "b", "Lat": 43.0, "Lng": 13.0}
        ]"#;
        assert_eq!(filter_by_domain(registry, &BOX).unwrap(), vec!["c", "a", "b"]);
    }

    #[test]
    fn test_empty_registry() {
        assert!(filter_by_domain(b"[]", &BOX).unwrap().is_empty());
    }

    #[test]
    fn test_malformed_registry() {
        let err = filter_by_domain(b"{not json", &BOX).unwrap_err();
        assert!(matches!(err, WebdropsError::Decode { .. }));
    }
}
