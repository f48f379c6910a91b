//! Ground station endpoints: registries, observations and interpolated maps.

use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, instrument};

use crate::client::WebdropsClient;
use crate::domain::{filter_by_domain, Domain};
use crate::error::{Result, WebdropsError};
use crate::time::format_wire;

/// Station network to query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorGroup {
    /// World-wide volunteer network
    Wunderground,
    /// National civil protection network
    Dpc,
}

impl SensorGroup {
    /// Upstream station group name.
    pub fn upstream_name(&self) -> &'static str {
        match self {
            SensorGroup::Wunderground => "DewetraWorld%WunderEurope",
            SensorGroup::Dpc => "Dewetra%Default",
        }
    }

    /// Group name escaped for use in a URL.
    pub fn query_token(&self) -> &'static str {
        match self {
            SensorGroup::Wunderground => "DewetraWorld%25WunderEurope",
            SensorGroup::Dpc => "Dewetra%25Default",
        }
    }
}

impl FromStr for SensorGroup {
    type Err = WebdropsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "wunderground" | "wu" => Ok(SensorGroup::Wunderground),
            "dpc" => Ok(SensorGroup::Dpc),
            _ => Err(WebdropsError::Config(format!("unknown sensor group '{}'", s))),
        }
    }
}

/// Category of ground station measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorClass {
    Termometro,
    Igrometro,
    Anemometro,
    DirezioneVento,
    Pluviometro,
    Radiometro,
    Barometro,
}

impl SensorClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            SensorClass::Termometro => "TERMOMETRO",
            SensorClass::Igrometro => "IGROMETRO",
            SensorClass::Anemometro => "ANEMOMETRO",
            SensorClass::DirezioneVento => "DIREZIONEVENTO",
            SensorClass::Pluviometro => "PLUVIOMETRO",
            SensorClass::Radiometro => "RADIOMETRO",
            SensorClass::Barometro => "BAROMETRO",
        }
    }
}

impl fmt::Display for SensorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SensorClass {
    type Err = WebdropsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "TERMOMETRO" => Ok(SensorClass::Termometro),
            "IGROMETRO" => Ok(SensorClass::Igrometro),
            "ANEMOMETRO" => Ok(SensorClass::Anemometro),
            "DIREZIONEVENTO" => Ok(SensorClass::DirezioneVento),
            "PLUVIOMETRO" => Ok(SensorClass::Pluviometro),
            "RADIOMETRO" => Ok(SensorClass::Radiometro),
            "BAROMETRO" => Ok(SensorClass::Barometro),
            _ => Err(WebdropsError::Config(format!("unknown sensor class '{}'", s))),
        }
    }
}

/// Area selector for sensor maps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MapArea {
    Group(SensorGroup),
    Window(Domain),
}

#[derive(Serialize)]
struct SensorIds<'a> {
    sensors: &'a [String],
}

impl WebdropsClient {
    /// Registry of all sensors of `class` in `group`, as raw JSON.
    #[instrument(skip(self))]
    pub async fn sensors_list(&mut self, class: SensorClass, group: SensorGroup) -> Result<Bytes> {
        let url = self.endpoint(&format!(
            "sensors/list/{}?stationgroup={}",
            class,
            group.query_token()
        ));
        self.get(&url, Some("application/json"))
            .await
            .map_err(|e| e.context(format!("fetching {} registry", class)))
    }

    /// Registry plus the ids of its sensors inside `domain`.
    pub async fn sensor_ids(
        &mut self,
        class: SensorClass,
        group: SensorGroup,
        domain: &Domain,
    ) -> Result<(Bytes, Vec<String>)> {
        let registry = self.sensors_list(class, group).await?;
        let ids = filter_by_domain(&registry, domain)
            .map_err(|e| e.context(format!("filtering {} registry", class)))?;
        debug!(class = %class, count = ids.len(), "Sensors inside domain");
        Ok((registry, ids))
    }

    /// Observations of every sensor in `group`, aggregated every `aggregation_secs`.
    #[instrument(skip(self))]
    pub async fn sensors_data(
        &mut self,
        class: SensorClass,
        group: SensorGroup,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        aggregation_secs: u32,
    ) -> Result<Bytes> {
        let url = self.endpoint(&format!(
            "sensors/data/{}/{}?from={}&to={}&aggr={}",
            class,
            group.query_token(),
            format_wire(&from),
            format_wire(&to),
            aggregation_secs
        ));
        self.get(&url, None)
            .await
            .map_err(|e| e.context(format!("fetching {} observations", class)))
    }

    /// Observations of the given sensor ids.
    #[instrument(skip(self, ids), fields(count = ids.len()))]
    pub async fn sensors_data_by_ids(
        &mut self,
        class: SensorClass,
        ids: &[String],
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        aggregation_secs: u32,
    ) -> Result<Bytes> {
        let url = self.endpoint(&format!(
            "sensors/data/{}?from={}&to={}&aggr={}",
            class,
            format_wire(&from),
            format_wire(&to),
            aggregation_secs
        ));
        self.post(&url, &SensorIds { sensors: ids })
            .await
            .map_err(|e| e.context(format!("fetching {} observations by id", class)))
    }

    /// Interpolated observation grid.
    #[instrument(skip(self))]
    pub async fn sensors_map(
        &mut self,
        class: SensorClass,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        area: MapArea,
    ) -> Result<Bytes> {
        let selector = match area {
            MapArea::Group(group) => format!("stationgroup={}", group.query_token()),
            MapArea::Window(domain) => format!("geowin={}", domain.geowin()),
        };
        let url = self.endpoint(&format!(
            "sensors/map/{}?from={}&to={}&{}",
            class,
            format_wire(&from),
            format_wire(&to),
            selector
        ));
        self.get(&url, Some("application/octet-stream"))
            .await
            .map_err(|e| e.context(format!("fetching {} map", class)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_tokens() {
        assert_eq!(SensorGroup::Dpc.query_token(), "Dewetra%25Default");
        assert_eq!(
            SensorGroup::Wunderground.query_token(),
            "DewetraWorld%25WunderEurope"
        );
        assert_eq!(SensorGroup::Dpc.upstream_name(), "Dewetra%Default");
    }

    #[test]
    fn test_unknown_group_is_config_error() {
        assert_eq!("DPC".parse::<SensorGroup>().unwrap(), SensorGroup::Dpc);
        assert!(matches!(
            "meteonet".parse::<SensorGroup>(),
            Err(WebdropsError::Config(_))
        ));
    }

    #[test]
    fn test_sensor_class_names() {
        assert_eq!(SensorClass::DirezioneVento.to_string(), "DIREZIONEVENTO");
        assert_eq!(
            "pluviometro".parse::<SensorClass>().unwrap(),
            SensorClass::Pluviometro
        );
        assert!("BOLOMETRO".parse::<SensorClass>().is_err());
    }

    #[test]
    fn test_ids_body_shape() {
        let ids = vec!["a".to_string(), "b".to_string()];
        let body = serde_json::to_value(SensorIds { sensors: &ids }).unwrap();
        assert_eq!(body, serde_json::json!({"sensors": ["a", "b"]}));
    }
}
