//! Output format encoders
//!
//! Each pipeline owns exactly one encoder, chosen from `OutputFormat` when
//! the pipeline is built. Call sites only see the `MessageEncoder` trait.

pub mod json;
pub mod protobuf;

pub use json::JsonEncoder;
pub use protobuf::ProtobufEncoder;

use crate::types::{Result, TranslateError, VehicleMessage};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Wire format selected for a pipeline
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Compact JSON documents terminated by CRLF
    #[default]
    Json,
    /// Length-delimited protobuf envelopes
    Proto,
}

impl OutputFormat {
    /// Build the encoder for this format
    pub fn encoder(self) -> Box<dyn MessageEncoder> {
        match self {
            OutputFormat::Json => Box::new(JsonEncoder),
            OutputFormat::Proto => Box::new(ProtobufEncoder),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Proto => write!(f, "proto"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = TranslateError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "proto" | "protobuf" => Ok(OutputFormat::Proto),
            other => Err(TranslateError::InvalidConfig(format!(
                "unknown output format: {}",
                other
            ))),
        }
    }
}

/// Serializes one message into a complete, owned byte buffer
///
/// Implementations keep no state between calls.
pub trait MessageEncoder: Send {
    fn format(&self) -> OutputFormat;

    fn encode(&self, message: &VehicleMessage) -> Result<Vec<u8>>;
}
