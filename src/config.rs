use crate::common::{SlaveId, DEFAULT_TIMEOUT};
use crate::error::{ModbusError, ModbusResult};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::time::Duration;

/// Where the device lives and how long to wait for it.
///
/// ```toml
/// address = "192.168.1.20:4001"
/// timeout_ms = 2000
/// slave_id = 17
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RtuOverTcpConfig {
    pub address: String,
    #[serde(
        rename = "timeout_ms",
        serialize_with = "serialize_millis",
        deserialize_with = "deserialize_millis"
    )]
    pub timeout: Duration,
    pub slave_id: SlaveId,
}

impl Default for RtuOverTcpConfig {
    fn default() -> Self {
        RtuOverTcpConfig {
            address: "127.0.0.1:502".to_string(),
            timeout: DEFAULT_TIMEOUT,
            slave_id: 1,
        }
    }
}

impl RtuOverTcpConfig {
    pub fn new(address: impl Into<String>, slave_id: SlaveId) -> Self {
        RtuOverTcpConfig {
            address: address.into(),
            slave_id,
            ..Default::default()
        }
    }

    pub fn from_toml_str(data: &str) -> ModbusResult<Self> {
        let config: RtuOverTcpConfig =
            toml::from_str(data).map_err(|err| ModbusError::Config(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ModbusResult<()> {
        if self.address.trim().is_empty() {
            return Err(ModbusError::Config("address must not be empty".to_string()));
        }
        if self.timeout.is_zero() {
            return Err(ModbusError::Config("timeout must be greater than zero".to_string()));
        }
        Ok(())
    }
}

fn serialize_millis<S: Serializer>(timeout: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(timeout.as_millis() as u64)
}

fn deserialize_millis<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    u64::deserialize(deserializer).map(Duration::from_millis)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RtuOverTcpConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.slave_id, 1);
        config.validate().unwrap();
    }

    #[test]
    fn test_from_toml() {
        let config = RtuOverTcpConfig::from_toml_str(
            r#"
            address = "192.168.1.20:4001"
            timeout_ms = 2000
            slave_id = 17
            "#,
        )
        .unwrap();

        assert_eq!(config.address, "192.168.1.20:4001");
        assert_eq!(config.timeout, Duration::from_millis(2000));
        assert_eq!(config.slave_id, 17);
    }

    #[test]
    fn test_from_toml_partial_uses_defaults() {
        let config = RtuOverTcpConfig::from_toml_str(r#"address = "10.0.0.5:502""#).unwrap();
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
        assert_eq!(config.slave_id, 1);
    }

    #[test]
    fn test_invalid_config() {
        assert!(matches!(
            RtuOverTcpConfig::from_toml_str("timeout_ms = 0"),
            Err(ModbusError::Config(_))
        ));
        assert!(matches!(
            RtuOverTcpConfig::from_toml_str(r#"address = """#),
            Err(ModbusError::Config(_))
        ));
        assert!(matches!(
            RtuOverTcpConfig::from_toml_str("slave_id = 300"),
            Err(ModbusError::Config(_))
        ));
    }
}
