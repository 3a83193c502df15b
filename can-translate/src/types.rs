//! Core types for the CAN translator library
//!
//! This module defines the frame the translator consumes, the message
//! envelope it emits and the error type shared by every module. A
//! `VehicleMessage` is built fresh for each emission and discarded once the
//! encoder has serialized it.

use std::fmt;

/// Result type for translator operations
pub type Result<T> = std::result::Result<T, TranslateError>;

/// Address of a physical CAN channel
pub type BusAddress = u8;

/// Raw CAN frame as delivered by the reception layer
///
/// The payload carries the first transmitted byte in its most significant
/// byte, matching the big-endian bit numbering used by the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanFrame {
    /// Bus the frame was received on
    pub bus: BusAddress,
    /// CAN arbitration ID (11-bit or 29-bit)
    pub id: u32,
    /// Frame data, first byte most significant
    pub payload: u64,
    /// Reception time in milliseconds, when the source recorded one
    pub timestamp_ms: Option<u64>,
}

impl CanFrame {
    /// Create a frame without a reception timestamp
    pub fn new(bus: BusAddress, id: u32, payload: u64) -> Self {
        Self {
            bus,
            id,
            payload,
            timestamp_ms: None,
        }
    }

    /// Builder method: attach a reception timestamp
    pub fn with_timestamp(mut self, timestamp_ms: u64) -> Self {
        self.timestamp_ms = Some(timestamp_ms);
        self
    }
}

/// Errors that can occur while configuring or encoding
#[derive(Debug, thiserror::Error)]
pub enum TranslateError {
    #[error("Invalid signal definition: {0}")]
    InvalidSignalDefinition(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Signal not found: {0}")]
    SignalNotFound(String),

    #[error("Message definition registry is full (capacity {capacity}), cannot add 0x{id:X} on bus {bus}")]
    RegistryFull {
        bus: BusAddress,
        id: u32,
        capacity: usize,
    },

    #[error("Duplicate message definition: 0x{id:X} on bus {bus}")]
    DuplicateMessage { bus: BusAddress, id: u32 },

    #[error("Field '{field}' is {length} bytes, maximum is {max}")]
    FieldTooLong {
        field: &'static str,
        length: usize,
        max: usize,
    },

    #[error("Failed to encode JSON: {0}")]
    JsonEncode(#[from] serde_json::Error),

    #[error("Failed to encode protobuf: {0}")]
    ProtobufEncode(#[from] prost::EncodeError),

    #[error("Failed to decode protobuf: {0}")]
    ProtobufDecode(#[from] prost::DecodeError),

    #[error("Unsupported message: {0}")]
    UnsupportedMessage(String),

    #[error("Output error: {0}")]
    Io(#[from] std::io::Error),
}

/// Value attached to an evented message
#[derive(Debug, Clone, PartialEq)]
pub enum EventValue {
    Numeric(f64),
    Boolean(bool),
    String(String),
}

impl fmt::Display for EventValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventValue::Numeric(v) => write!(f, "{}", v),
            EventValue::Boolean(v) => write!(f, "{}", v),
            EventValue::String(v) => write!(f, "{}", v),
        }
    }
}

/// Output value envelope - the unit handed to a `MessageEncoder`
#[derive(Debug, Clone, PartialEq)]
pub enum VehicleMessage {
    /// A translated numeric signal
    Numeric { name: String, value: f64 },
    /// A translated boolean signal
    Boolean { name: String, value: bool },
    /// A translated string signal (e.g. a state name)
    String { name: String, value: String },
    /// A string value qualified by an event (e.g. door "driver" + open=true)
    Evented {
        name: String,
        value: String,
        event: EventValue,
    },
    /// An undecoded CAN frame forwarded as-is
    Raw {
        bus: BusAddress,
        message_id: u32,
        data: u64,
    },
}

impl VehicleMessage {
    pub fn numeric(name: impl Into<String>, value: f64) -> Self {
        VehicleMessage::Numeric {
            name: name.into(),
            value,
        }
    }

    pub fn boolean(name: impl Into<String>, value: bool) -> Self {
        VehicleMessage::Boolean {
            name: name.into(),
            value,
        }
    }

    pub fn string(name: impl Into<String>, value: impl Into<String>) -> Self {
        VehicleMessage::String {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn evented(name: impl Into<String>, value: impl Into<String>, event: EventValue) -> Self {
        VehicleMessage::Evented {
            name: name.into(),
            value: value.into(),
            event,
        }
    }

    pub fn raw(bus: BusAddress, message_id: u32, data: u64) -> Self {
        VehicleMessage::Raw {
            bus,
            message_id,
            data,
        }
    }

    /// Name of a translated message, `None` for raw frames
    pub fn name(&self) -> Option<&str> {
        match self {
            VehicleMessage::Numeric { name, .. }
            | VehicleMessage::Boolean { name, .. }
            | VehicleMessage::String { name, .. }
            | VehicleMessage::Evented { name, .. } => Some(name),
            VehicleMessage::Raw { .. } => None,
        }
    }

    /// Check the bounded-length invariants before any bytes are produced
    pub(crate) fn check_field_lengths(&self) -> Result<()> {
        use crate::fields::{MAX_NAME_LENGTH, MAX_STRING_VALUE_LENGTH};

        if let Some(name) = self.name() {
            check_length("name", name, MAX_NAME_LENGTH)?;
        }
        match self {
            VehicleMessage::String { value, .. } => {
                check_length("value", value, MAX_STRING_VALUE_LENGTH)
            }
            VehicleMessage::Evented { value, event, .. } => {
                check_length("value", value, MAX_STRING_VALUE_LENGTH)?;
                if let EventValue::String(event) = event {
                    check_length("event", event, MAX_STRING_VALUE_LENGTH)?;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

pub(crate) fn check_length(field: &'static str, value: &str, max: usize) -> Result<()> {
    if value.len() > max {
        return Err(TranslateError::FieldTooLong {
            field,
            length: value.len(),
            max,
        });
    }
    Ok(())
}
