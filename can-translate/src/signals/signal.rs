//! Signal definitions
//!
//! A `CanSignal` is configured once at startup and then mutated by every
//! decode cycle (`last_value`, `received` and its sampling clock).

use super::handler::SignalHandler;
use crate::clock::FrequencyClock;
use crate::fields::MAX_NAME_LENGTH;
use crate::types::{check_length, BusAddress, Result, TranslateError};
use serde::{Deserialize, Serialize};

/// A symbolic name for one numeric code of a state signal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalState {
    pub value: i32,
    pub name: String,
}

impl SignalState {
    pub fn new(value: i32, name: impl Into<String>) -> Self {
        Self {
            value,
            name: name.into(),
        }
    }
}

/// A decodable CAN field and its translation state
#[derive(Debug, Clone)]
pub struct CanSignal {
    /// Output key
    pub generic_name: String,
    /// Bus carrying the frame this signal lives in
    pub bus: BusAddress,
    /// Arbitration ID of the frame this signal lives in
    pub message_id: u32,
    /// First bit of the field, big-endian numbering
    pub bit_position: u8,
    /// Width of the field in bits
    pub bit_size: u8,
    pub factor: f64,
    pub offset: f64,
    pub frequency_clock: FrequencyClock,
    /// Bypass the clock when the value changed
    pub force_send_changed: bool,
    /// Re-emit an unchanged value when the clock fires
    pub send_same: bool,
    pub states: Vec<SignalState>,
    pub handler: SignalHandler,
    /// Most recently decoded value, emitted or not
    pub last_value: f64,
    /// True once at least one value has been decoded and accepted
    pub received: bool,
}

impl CanSignal {
    /// Create an unscaled, unlimited passthrough signal
    pub fn new(generic_name: impl Into<String>, bit_position: u8, bit_size: u8) -> Self {
        Self {
            generic_name: generic_name.into(),
            bus: 0,
            message_id: 0,
            bit_position,
            bit_size,
            factor: 1.0,
            offset: 0.0,
            frequency_clock: FrequencyClock::default(),
            force_send_changed: false,
            send_same: true,
            states: Vec::new(),
            handler: SignalHandler::Passthrough,
            last_value: 0.0,
            received: false,
        }
    }

    /// Builder method: place the signal in a frame
    pub fn on_message(mut self, bus: BusAddress, message_id: u32) -> Self {
        self.bus = bus;
        self.message_id = message_id;
        self
    }

    /// Builder method: set the affine scaling
    pub fn with_scaling(mut self, factor: f64, offset: f64) -> Self {
        self.factor = factor;
        self.offset = offset;
        self
    }

    /// Builder method: limit the emission frequency
    pub fn with_frequency(mut self, frequency_hz: f32) -> Self {
        self.frequency_clock = FrequencyClock::new(frequency_hz);
        self
    }

    pub fn with_force_send_changed(mut self, enabled: bool) -> Self {
        self.force_send_changed = enabled;
        self
    }

    pub fn with_send_same(mut self, enabled: bool) -> Self {
        self.send_same = enabled;
        self
    }

    pub fn with_states(mut self, states: Vec<SignalState>) -> Self {
        self.states = states;
        self
    }

    pub fn with_handler(mut self, handler: SignalHandler) -> Self {
        self.handler = handler;
        self
    }

    /// Check the layout fits a classic CAN payload and the name fits the wire format
    pub fn validate(&self) -> Result<()> {
        check_length("name", &self.generic_name, MAX_NAME_LENGTH)?;
        if self.generic_name.is_empty() {
            return Err(TranslateError::InvalidSignalDefinition(
                "signal name must not be empty".to_string(),
            ));
        }
        if self.bit_size == 0 || self.bit_position as u16 + self.bit_size as u16 > 64 {
            return Err(TranslateError::InvalidSignalDefinition(format!(
                "'{}' spans bits {}..{}, outside the 64-bit payload",
                self.generic_name,
                self.bit_position,
                self.bit_position as u16 + self.bit_size as u16
            )));
        }
        if !self.factor.is_finite() || !self.offset.is_finite() {
            return Err(TranslateError::InvalidSignalDefinition(format!(
                "'{}' has non-finite scaling (factor {}, offset {})",
                self.generic_name, self.factor, self.offset
            )));
        }
        let frequency_hz = self.frequency_clock.frequency_hz;
        if !FrequencyClock::is_valid_frequency(frequency_hz) {
            return Err(TranslateError::InvalidSignalDefinition(format!(
                "'{}' has invalid frequency {} Hz",
                self.generic_name, frequency_hz
            )));
        }
        if self.handler.is_state() && self.states.is_empty() {
            return Err(TranslateError::InvalidSignalDefinition(format!(
                "'{}' uses the state handler but has no states",
                self.generic_name
            )));
        }
        for state in &self.states {
            check_length("state name", &state.name, MAX_NAME_LENGTH)?;
        }
        Ok(())
    }
}

/// Find a signal by generic name
pub fn lookup_signal<'a>(name: &str, signals: &'a [CanSignal]) -> Option<&'a CanSignal> {
    signals.iter().find(|signal| signal.generic_name == name)
}

/// Find the state whose numeric code exactly equals `value`
pub fn lookup_signal_state(value: f64, signal: &CanSignal) -> Option<&SignalState> {
    signal.states.iter().find(|state| state.value as f64 == value)
}

/// Find the state with the given symbolic name
pub fn lookup_signal_state_by_name<'a>(name: &str, signal: &'a CanSignal) -> Option<&'a SignalState> {
    signal.states.iter().find(|state| state.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gear_signal() -> CanSignal {
        CanSignal::new("transmission_gear_position", 0, 4)
            .with_handler(SignalHandler::State)
            .with_states(vec![
                SignalState::new(1, "first"),
                SignalState::new(2, "second"),
            ])
    }

    #[test]
    fn test_state_lookup() {
        let signal = gear_signal();
        assert_eq!(lookup_signal_state(2.0, &signal).map(|s| s.name.as_str()), Some("second"));
        assert!(lookup_signal_state(1.5, &signal).is_none());
        assert_eq!(lookup_signal_state_by_name("first", &signal).map(|s| s.value), Some(1));
    }

    #[test]
    fn test_lookup_signal() {
        let signals = vec![CanSignal::new("a", 0, 1), gear_signal()];
        assert!(lookup_signal("transmission_gear_position", &signals).is_some());
        assert!(lookup_signal("missing", &signals).is_none());
    }

    #[test]
    fn test_validate_layout() {
        assert!(CanSignal::new("ok", 56, 8).validate().is_ok());
        assert!(CanSignal::new("too_far", 60, 8).validate().is_err());
        assert!(CanSignal::new("empty", 0, 0).validate().is_err());
    }

    #[test]
    fn test_validate_scaling_and_frequency() {
        let nan_factor = CanSignal::new("engine_speed", 0, 16).with_scaling(f64::NAN, 0.0);
        assert!(nan_factor.validate().is_err());
        let infinite_offset = CanSignal::new("engine_speed", 0, 16).with_scaling(1.0, f64::INFINITY);
        assert!(infinite_offset.validate().is_err());

        let negative = CanSignal::new("vehicle_speed", 16, 8).with_frequency(-5.0);
        assert!(negative.validate().is_err());
        let nan = CanSignal::new("vehicle_speed", 16, 8).with_frequency(f32::NAN);
        assert!(nan.validate().is_err());
        assert!(CanSignal::new("vehicle_speed", 16, 8).with_frequency(10.0).validate().is_ok());
    }

    #[test]
    fn test_validate_state_table() {
        assert!(gear_signal().validate().is_ok());
        let bare = CanSignal::new("gear", 0, 4).with_handler(SignalHandler::State);
        assert!(bare.validate().is_err());
    }

    #[test]
    fn test_validate_name_length() {
        let name = "n".repeat(MAX_NAME_LENGTH + 1);
        assert!(matches!(
            CanSignal::new(name, 0, 8).validate(),
            Err(TranslateError::FieldTooLong { .. })
        ));
    }
}
