//! Payload serialization format selector

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::ContractError;

/// Encoding of message payloads inside the source log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SerializationFormat {
    #[default]
    Bincode,
    Json,
}

impl SerializationFormat {
    /// Decode a payload into a wire message.
    ///
    /// # Errors
    /// Returns `ContractError::PayloadDecode`, which callers treat as recoverable.
    pub fn decode<T: DeserializeOwned>(&self, channel: &str, payload: &[u8]) -> Result<T, ContractError> {
        match self {
            Self::Bincode => bincode::deserialize(payload)
                .map_err(|e| ContractError::payload_decode(channel, e.to_string())),
            Self::Json => serde_json::from_slice(payload)
                .map_err(|e| ContractError::payload_decode(channel, e.to_string())),
        }
    }

    pub fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ContractError> {
        match self {
            Self::Bincode => bincode::serialize(value).map_err(|e| ContractError::Other(e.to_string())),
            Self::Json => serde_json::to_vec(value).map_err(|e| ContractError::Other(e.to_string())),
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Bincode => "bincode",
            Self::Json => "json",
        }
    }
}

impl fmt::Display for SerializationFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SerializationFormat {
    type Err = ContractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bincode" => Ok(Self::Bincode),
            "json" => Ok(Self::Json),
            "cdr" => Err(ContractError::Other(
                "cdr payloads are not supported, convert the recording to bincode or json".into(),
            )),
            other => Err(ContractError::Other(format!(
                "unknown serialization format: {other}"
            ))),
        }
    }
}
