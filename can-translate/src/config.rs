//! Vehicle configuration types
//!
//! The signal table, bus table and raw message catalog are loaded once at
//! startup from a vehicle definition. These types deserialize from any
//! serde format; the CLI reads them from TOML.

use crate::clock::FrequencyClock;
use crate::formats::OutputFormat;
use crate::registry::MessageDefinition;
use crate::signals::{CanSignal, HandlerKind, SignalState};
use crate::types::{BusAddress, Result, TranslateError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Complete vehicle definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleConfig {
    /// Wire format of the output pipeline
    #[serde(default)]
    pub output_format: OutputFormat,

    /// Maximum number of raw message definitions
    #[serde(default = "default_message_capacity")]
    pub message_capacity: usize,

    /// Sampling frequency for raw messages cataloged at runtime (0 = unlimited)
    #[serde(default)]
    pub raw_frequency_hz: f32,

    #[serde(default)]
    pub buses: Vec<BusConfig>,

    /// Messages with decodable signals
    #[serde(default)]
    pub messages: Vec<MessageConfig>,

    /// Statically cataloged passthrough messages
    #[serde(default)]
    pub raw_messages: Vec<RawMessageConfig>,
}

fn default_message_capacity() -> usize {
    64
}

fn default_factor() -> f64 {
    1.0
}

fn default_true() -> bool {
    true
}

impl Default for VehicleConfig {
    fn default() -> Self {
        Self {
            output_format: OutputFormat::default(),
            message_capacity: default_message_capacity(),
            raw_frequency_hz: 0.0,
            buses: Vec::new(),
            messages: Vec::new(),
            raw_messages: Vec::new(),
        }
    }
}

/// A physical CAN channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusConfig {
    pub address: BusAddress,
    /// Forward frames with no signal definition as raw messages
    #[serde(default)]
    pub raw_passthrough: bool,
}

impl BusConfig {
    pub fn new(address: BusAddress) -> Self {
        Self {
            address,
            raw_passthrough: false,
        }
    }

    pub fn with_raw_passthrough(mut self, enabled: bool) -> Self {
        self.raw_passthrough = enabled;
        self
    }
}

/// A frame and the signals decoded from it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageConfig {
    pub bus: BusAddress,
    pub id: u32,
    #[serde(default)]
    pub signals: Vec<SignalConfig>,
}

impl MessageConfig {
    pub fn new(bus: BusAddress, id: u32) -> Self {
        Self {
            bus,
            id,
            signals: Vec::new(),
        }
    }

    pub fn add_signal(mut self, signal: SignalConfig) -> Self {
        self.signals.push(signal);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalConfig {
    pub generic_name: String,
    pub bit_position: u8,
    pub bit_size: u8,
    #[serde(default = "default_factor")]
    pub factor: f64,
    #[serde(default)]
    pub offset: f64,
    /// Maximum emission frequency in Hz (0 = every frame)
    #[serde(default)]
    pub frequency_hz: f32,
    #[serde(default)]
    pub force_send_changed: bool,
    #[serde(default = "default_true")]
    pub send_same: bool,
    #[serde(default)]
    pub handler: HandlerKind,
    #[serde(default)]
    pub states: Vec<SignalState>,
}

impl SignalConfig {
    pub fn new(generic_name: impl Into<String>, bit_position: u8, bit_size: u8) -> Self {
        Self {
            generic_name: generic_name.into(),
            bit_position,
            bit_size,
            factor: default_factor(),
            offset: 0.0,
            frequency_hz: 0.0,
            force_send_changed: false,
            send_same: true,
            handler: HandlerKind::default(),
            states: Vec::new(),
        }
    }

    /// Build the runtime signal for a frame on `bus` with `id`
    pub fn to_signal(&self, bus: BusAddress, id: u32) -> CanSignal {
        CanSignal::new(self.generic_name.clone(), self.bit_position, self.bit_size)
            .on_message(bus, id)
            .with_scaling(self.factor, self.offset)
            .with_frequency(self.frequency_hz)
            .with_force_send_changed(self.force_send_changed)
            .with_send_same(self.send_same)
            .with_handler(self.handler.into())
            .with_states(self.states.clone())
    }
}

/// A passthrough message cataloged at startup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawMessageConfig {
    pub bus: BusAddress,
    pub id: u32,
    #[serde(default)]
    pub frequency_hz: f32,
    #[serde(default)]
    pub force_send_changed: bool,
}

impl RawMessageConfig {
    pub fn to_definition(&self) -> MessageDefinition {
        MessageDefinition::new(self.bus, self.id, self.frequency_hz)
            .with_force_send_changed(self.force_send_changed)
    }
}

impl VehicleConfig {
    /// Create a new configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: select the output format
    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }

    /// Builder method: set the raw message capacity
    pub fn with_message_capacity(mut self, capacity: usize) -> Self {
        self.message_capacity = capacity;
        self
    }

    /// Builder method: set the runtime raw message frequency
    pub fn with_raw_frequency(mut self, frequency_hz: f32) -> Self {
        self.raw_frequency_hz = frequency_hz;
        self
    }

    /// Builder method: add a bus
    pub fn add_bus(mut self, bus: BusConfig) -> Self {
        self.buses.push(bus);
        self
    }

    /// Builder method: add a message with its signals
    pub fn add_message(mut self, message: MessageConfig) -> Self {
        self.messages.push(message);
        self
    }

    /// Builder method: add a statically cataloged raw message
    pub fn add_raw_message(mut self, bus: BusAddress, id: u32, frequency_hz: f32) -> Self {
        self.raw_messages.push(RawMessageConfig {
            bus,
            id,
            frequency_hz,
            force_send_changed: false,
        });
        self
    }

    /// Look up a configured bus
    pub fn bus(&self, address: BusAddress) -> Option<&BusConfig> {
        self.buses.iter().find(|b| b.address == address)
    }

    /// Build every configured signal, in configuration order
    pub fn build_signals(&self) -> Vec<CanSignal> {
        self.messages
            .iter()
            .flat_map(|m| m.signals.iter().map(move |s| s.to_signal(m.bus, m.id)))
            .collect()
    }

    /// Check the configuration for inconsistencies
    pub fn validate(&self) -> Result<()> {
        if !FrequencyClock::is_valid_frequency(self.raw_frequency_hz) {
            return Err(TranslateError::InvalidConfig(format!(
                "raw message frequency {} Hz is invalid",
                self.raw_frequency_hz
            )));
        }

        let mut bus_addresses = HashSet::new();
        for bus in &self.buses {
            if !bus_addresses.insert(bus.address) {
                return Err(TranslateError::InvalidConfig(format!(
                    "bus {} is defined twice",
                    bus.address
                )));
            }
        }

        let mut message_keys = HashSet::new();
        for message in &self.messages {
            if !self.buses.is_empty() && !bus_addresses.contains(&message.bus) {
                return Err(TranslateError::InvalidConfig(format!(
                    "message 0x{:X} references unknown bus {}",
                    message.id, message.bus
                )));
            }
            if !message_keys.insert((message.bus, message.id)) {
                return Err(TranslateError::DuplicateMessage {
                    bus: message.bus,
                    id: message.id,
                });
            }
        }

        let mut names = HashSet::new();
        for signal in self.build_signals() {
            signal.validate()?;
            if !names.insert(signal.generic_name.clone()) {
                return Err(TranslateError::InvalidSignalDefinition(format!(
                    "signal name '{}' is used twice",
                    signal.generic_name
                )));
            }
        }

        if self.raw_messages.len() > self.message_capacity {
            return Err(TranslateError::InvalidConfig(format!(
                "{} raw messages exceed the message capacity of {}",
                self.raw_messages.len(),
                self.message_capacity
            )));
        }
        for raw in &self.raw_messages {
            if !FrequencyClock::is_valid_frequency(raw.frequency_hz) {
                return Err(TranslateError::InvalidConfig(format!(
                    "raw message 0x{:X} on bus {} has invalid frequency {} Hz",
                    raw.id, raw.bus, raw.frequency_hz
                )));
            }
            if message_keys.contains(&(raw.bus, raw.id)) {
                return Err(TranslateError::InvalidConfig(format!(
                    "raw message 0x{:X} on bus {} also has signal definitions",
                    raw.id, raw.bus
                )));
            }
        }

        Ok(())
    }
}
