//! Channel identification.

use serde::{Deserialize, Serialize};

use super::ModelError;

/// One logical recording source: network, station, location and channel codes.
///
/// Station and channel codes are upper-cased on construction. Fields are
/// private so a constructed spec is always valid.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelSpec {
    network: String,
    station: String,
    location: String,
    channel: String,
}

impl ChannelSpec {
    /// Create a validated channel spec.
    pub fn new(
        network: impl Into<String>,
        station: impl Into<String>,
        location: impl Into<String>,
        channel: impl Into<String>,
    ) -> Result<Self, ModelError> {
        let network = non_empty("network", network.into())?;
        let station = non_empty("station", station.into())?.to_uppercase();
        let location = non_empty("location", location.into())?;
        let channel = non_empty("channel", channel.into())?.to_uppercase();

        Ok(Self {
            network,
            station,
            location,
            channel,
        })
    }

    pub fn network(&self) -> &str {
        &self.network
    }

    pub fn station(&self) -> &str {
        &self.station
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Same network/station/channel at a different location.
    pub fn with_location(&self, location: impl Into<String>) -> Result<Self, ModelError> {
        Self::new(
            self.network.clone(),
            self.station.clone(),
            location,
            self.channel.clone(),
        )
    }
}

impl std::fmt::Display for ChannelSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.network, self.station, self.location, self.channel
        )
    }
}

fn non_empty(field: &'static str, value: String) -> Result<String, ModelError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ModelError::EmptyField(field));
    }
    Ok(trimmed.to_string())
}

/// The two co-located channels being compared.
///
/// Both share network, station and channel; only the location differs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelPair {
    pub a: ChannelSpec,
    pub b: ChannelSpec,
}

impl ChannelPair {
    /// Build a pair from shared codes and two location identifiers.
    pub fn co_located(
        network: &str,
        station: &str,
        channel: &str,
        location_a: &str,
        location_b: &str,
    ) -> Result<Self, ModelError> {
        let a = ChannelSpec::new(network, station, location_a, channel)?;
        let b = a.with_location(location_b)?;
        if a.location() == b.location() {
            return Err(ModelError::SameLocation(a.location().to_string()));
        }
        Ok(Self { a, b })
    }

    /// Default output key: `{net}_{sta}_{net}_{sta}`.
    pub fn default_key(&self) -> String {
        format!(
            "{}_{}_{}_{}",
            self.a.network(),
            self.a.station(),
            self.b.network(),
            self.b.station()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_station_and_channel_case() {
        let spec = ChannelSpec::new("II", "msey", "00", "bhz").unwrap();
        assert_eq!(spec.station(), "MSEY");
        assert_eq!(spec.channel(), "BHZ");
        assert_eq!(spec.network(), "II");
        assert_eq!(spec.to_string(), "II.MSEY.00.BHZ");
    }

    #[test]
    fn rejects_empty_fields() {
        assert!(matches!(
            ChannelSpec::new("", "MSEY", "00", "BHZ"),
            Err(ModelError::EmptyField("network"))
        ));
        assert!(matches!(
            ChannelSpec::new("II", "MSEY", "  ", "BHZ"),
            Err(ModelError::EmptyField("location"))
        ));
    }

    #[test]
    fn pair_derives_default_key() {
        let pair = ChannelPair::co_located("XX", "yyyy", "BHZ", "00", "10").unwrap();
        assert_eq!(pair.default_key(), "XX_YYYY_XX_YYYY");
        assert_eq!(pair.b.location(), "10");
        assert_eq!(pair.b.channel(), "BHZ");
    }

    #[test]
    fn pair_rejects_identical_locations() {
        assert!(ChannelPair::co_located("XX", "YYYY", "BHZ", "00", "00").is_err());
    }
}
