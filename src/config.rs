use std::{net::SocketAddr, time::Duration};

use ethers::types::U256;
use serde::Deserialize;

use crate::types::{ConnectorError, ConnectorResult, GasUnits, TokenAmount};

/// Settings for the connector and its HTTP surface.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ConnectorConfig {
    /// Gas price attached to every message the connector builds.
    pub gas_price: TokenAmount,
    /// Gas limit attached to every message the connector builds.
    pub gas_limit: GasUnits,
    /// How long to wait for a submitted message to be confirmed.
    pub confirmation_timeout_secs: u64,
    /// Maximum age of a signed HTTP request.
    pub request_max_age_secs: u64,
    pub listen_addr: SocketAddr,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            gas_price: U256::one(),
            gas_limit: 300,
            confirmation_timeout_secs: 300,
            request_max_age_secs: 300,
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 3456)),
        }
    }
}

impl ConnectorConfig {
    pub fn from_json(json: &str) -> ConnectorResult<Self> {
        serde_json::from_str(json).map_err(|e| ConnectorError::InvalidRequest(e.to_string()))
    }

    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_secs(self.confirmation_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = ConnectorConfig::from_json(r#"{"gas_limit": 1000, "gas_price": "0x2"}"#)
            .unwrap();

        assert_eq!(config.gas_limit, 1000);
        assert_eq!(config.gas_price, U256::from(2));
        assert_eq!(config.confirmation_timeout(), Duration::from_secs(300));
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            ConnectorConfig::from_json("{gas_limit"),
            Err(ConnectorError::InvalidRequest(_))
        ));
    }
}
