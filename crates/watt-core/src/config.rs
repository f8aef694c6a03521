//! Device configuration: the broker subscription topic.

use serde::{Deserialize, Serialize};
use thiserror_no_std::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Configuration is not valid JSON")]
    Malformed,

    #[error("No subscription topic configured, set mqtt.sub")]
    MissingSubscription,
}

#[derive(Serialize, Deserialize, Debug, Default, PartialEq, Eq)]
#[serde(bound(deserialize = "'de: 'a"))]
pub struct Config<'a> {
    #[serde(default)]
    pub mqtt: MqttConfig<'a>,
}

#[derive(Serialize, Deserialize, Debug, Default, PartialEq, Eq)]
pub struct MqttConfig<'a> {
    /// Topic carrying power telemetry
    #[serde(borrow, default)]
    pub sub: Option<&'a str>,
}

impl<'a> Config<'a> {
    /// Parse a device configuration document.
    pub fn from_json(bytes: &'a [u8]) -> Result<Self, ConfigError> {
        serde_json::from_slice(bytes).map_err(|_| ConfigError::Malformed)
    }

    /// Topic to subscribe to once connected.
    pub fn subscription_topic(&self) -> Result<&'a str, ConfigError> {
        match self.mqtt.sub {
            Some(topic) if !topic.trim().is_empty() => Ok(topic),
            _ => Err(ConfigError::MissingSubscription),
        }
    }
}
