//! Radar coverage endpoints.

use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use tracing::instrument;

use crate::client::WebdropsClient;
use crate::error::{Result, WebdropsError};
use crate::time::format_wire;

/// Radar product layer (CAPPI at a given altitude in km).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RadarVariable {
    Cappi2,
    Cappi3,
    Cappi4,
    Cappi5,
}

impl RadarVariable {
    /// Layers that must share an instant for radar assimilation.
    pub const ASSIMILATED: [RadarVariable; 3] = [
        RadarVariable::Cappi2,
        RadarVariable::Cappi3,
        RadarVariable::Cappi5,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RadarVariable::Cappi2 => "CAPPI2",
            RadarVariable::Cappi3 => "CAPPI3",
            RadarVariable::Cappi4 => "CAPPI4",
            RadarVariable::Cappi5 => "CAPPI5",
        }
    }

    /// Coverage holding this layer.
    pub fn coverage(&self) -> String {
        format!("RADAR_DPC_HDF5_{}", self.as_str())
    }
}

impl fmt::Display for RadarVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RadarVariable {
    type Err = WebdropsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "CAPPI2" => Ok(RadarVariable::Cappi2),
            "CAPPI3" => Ok(RadarVariable::Cappi3),
            "CAPPI4" => Ok(RadarVariable::Cappi4),
            "CAPPI5" => Ok(RadarVariable::Cappi5),
            _ => Err(WebdropsError::Config(format!("unknown radar variable '{}'", s))),
        }
    }
}

impl WebdropsClient {
    /// Instants with published data for `variable` in `[from, to]`, sorted.
    #[instrument(skip(self))]
    pub async fn radar_timeline(
        &mut self,
        variable: RadarVariable,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<String>> {
        let url = self.endpoint(&format!(
            "coverages/{}/?from={}&to={}",
            variable.coverage(),
            format_wire(&from),
            format_wire(&to)
        ));
        let body = self
            .get(&url, None)
            .await
            .map_err(|e| e.context(format!("fetching {} timeline", variable)))?;

        let mut timeline: Vec<String> = serde_json::from_slice(&body)
            .map_err(|e| WebdropsError::decode(format!("{} timeline", variable), e))?;
        // upstream order is not guaranteed
        timeline.sort();
        Ok(timeline)
    }

    /// Radar payload of `variable` at `instant`.
    #[instrument(skip(self))]
    pub async fn radar_data(
        &mut self,
        variable: RadarVariable,
        instant: DateTime<Utc>,
    ) -> Result<Bytes> {
        let url = self.endpoint(&format!(
            "coverages/{}/{}/{}/-/all",
            variable.coverage(),
            format_wire(&instant),
            variable
        ));
        self.get(&url, None)
            .await
            .map_err(|e| e.context(format!("fetching {} data at {}", variable, format_wire(&instant))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coverage_names() {
        assert_eq!(RadarVariable::Cappi3.coverage(), "RADAR_DPC_HDF5_CAPPI3");
        assert_eq!("cappi5".parse::<RadarVariable>().unwrap(), RadarVariable::Cappi5);
        assert!("CAPPI9".parse::<RadarVariable>().is_err());
    }
}
