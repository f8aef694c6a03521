//! Telemetry samples and payload decoding.
//!
//! The transport hands over raw message payloads; a [`SampleDecoder`] turns a
//! payload into a [`Sample`] or rejects it. Rejected payloads never reach the
//! aggregator.

use serde::{Deserialize, Serialize};
use thiserror_no_std::Error;

/// One power meter reading.
///
/// Field names follow the published message keys:
/// `{"duration": 1000, "wattage": 512, "pulses": 3}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    /// Time covered by this reading in milliseconds
    #[serde(rename = "duration")]
    pub duration_ms: u32,
    /// Instantaneous power in watts
    pub wattage: i32,
    /// Meter pulses counted during `duration_ms`
    pub pulses: u32,
}

impl Sample {
    pub const fn new(duration_ms: u32, wattage: i32, pulses: u32) -> Self {
        Self {
            duration_ms,
            wattage,
            pulses,
        }
    }
}

/// Reasons a payload was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The message carried no payload
    #[error("Empty payload")]
    Empty,

    /// The payload is not a JSON object with integer duration, wattage and pulses
    #[error("Malformed JSON sample payload")]
    MalformedJson,
}

/// Turns a raw message payload into a [`Sample`].
pub trait SampleDecoder {
    fn decode(&self, payload: &[u8]) -> Result<Sample, DecodeError>;
}

/// Decodes JSON objects such as `{"duration": 1000, "wattage": 512, "pulses": 3}`.
///
/// Unknown keys are ignored. Missing keys, non-integer values and negative
/// duration or pulse counts are rejected.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSampleDecoder;

impl SampleDecoder for JsonSampleDecoder {
    fn decode(&self, payload: &[u8]) -> Result<Sample, DecodeError> {
        if payload.iter().all(u8::is_ascii_whitespace) {
            return Err(DecodeError::Empty);
        }

        serde_json::from_slice(payload).map_err(|_| DecodeError::MalformedJson)
    }
}
