//! Value handlers
//!
//! A handler turns a decoded float into the value that is actually emitted.
//! The set of strategies is closed; custom behaviour is injected as a
//! closure in one of the `Custom*` variants rather than by adding types.

use super::signal::{lookup_signal_state, CanSignal};
use crate::types::VehicleMessage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Custom numeric transform: `(signal, all signals, decoded value, send flag)`
pub type NumericHandlerFn = Arc<dyn Fn(&CanSignal, &[CanSignal], f64, &mut bool) -> f64 + Send + Sync>;
/// Custom boolean transform
pub type BooleanHandlerFn = Arc<dyn Fn(&CanSignal, &[CanSignal], f64, &mut bool) -> bool + Send + Sync>;
/// Custom string transform; `None` suppresses the emission
pub type StringHandlerFn =
    Arc<dyn Fn(&CanSignal, &[CanSignal], f64, &mut bool) -> Option<String> + Send + Sync>;

/// Transform strategy assigned to a signal
#[derive(Clone, Default)]
pub enum SignalHandler {
    /// Emit the decoded value unchanged
    #[default]
    Passthrough,
    /// Emit `value != 0.0`
    Boolean,
    /// Never emit
    Ignore,
    /// Emit the name of the matching `SignalState`
    State,
    CustomNumeric(NumericHandlerFn),
    CustomBoolean(BooleanHandlerFn),
    CustomString(StringHandlerFn),
}

impl SignalHandler {
    pub fn custom_numeric<F>(f: F) -> Self
    where
        F: Fn(&CanSignal, &[CanSignal], f64, &mut bool) -> f64 + Send + Sync + 'static,
    {
        SignalHandler::CustomNumeric(Arc::new(f))
    }

    pub fn custom_boolean<F>(f: F) -> Self
    where
        F: Fn(&CanSignal, &[CanSignal], f64, &mut bool) -> bool + Send + Sync + 'static,
    {
        SignalHandler::CustomBoolean(Arc::new(f))
    }

    pub fn custom_string<F>(f: F) -> Self
    where
        F: Fn(&CanSignal, &[CanSignal], f64, &mut bool) -> Option<String> + Send + Sync + 'static,
    {
        SignalHandler::CustomString(Arc::new(f))
    }

    pub fn is_state(&self) -> bool {
        matches!(self, SignalHandler::State)
    }

    /// Apply the strategy; it may clear `send` to suppress emission
    pub fn apply(
        &self,
        signal: &CanSignal,
        signals: &[CanSignal],
        value: f64,
        send: &mut bool,
    ) -> TranslatedValue {
        match self {
            SignalHandler::Passthrough => TranslatedValue::Numeric(value),
            SignalHandler::Boolean => TranslatedValue::Boolean(value != 0.0),
            SignalHandler::Ignore => {
                *send = false;
                TranslatedValue::Numeric(value)
            }
            SignalHandler::State => match lookup_signal_state(value, signal) {
                Some(state) => TranslatedValue::String(Some(state.name.clone())),
                None => {
                    *send = false;
                    TranslatedValue::String(None)
                }
            },
            SignalHandler::CustomNumeric(f) => TranslatedValue::Numeric(f(signal, signals, value, send)),
            SignalHandler::CustomBoolean(f) => TranslatedValue::Boolean(f(signal, signals, value, send)),
            SignalHandler::CustomString(f) => TranslatedValue::String(f(signal, signals, value, send)),
        }
    }
}

impl fmt::Debug for SignalHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalHandler::Passthrough => write!(f, "Passthrough"),
            SignalHandler::Boolean => write!(f, "Boolean"),
            SignalHandler::Ignore => write!(f, "Ignore"),
            SignalHandler::State => write!(f, "State"),
            SignalHandler::CustomNumeric(_) => write!(f, "CustomNumeric(..)"),
            SignalHandler::CustomBoolean(_) => write!(f, "CustomBoolean(..)"),
            SignalHandler::CustomString(_) => write!(f, "CustomString(..)"),
        }
    }
}

/// Handlers that can be named in a vehicle configuration file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandlerKind {
    #[default]
    Passthrough,
    Boolean,
    Ignore,
    State,
}

impl From<HandlerKind> for SignalHandler {
    fn from(kind: HandlerKind) -> Self {
        match kind {
            HandlerKind::Passthrough => SignalHandler::Passthrough,
            HandlerKind::Boolean => SignalHandler::Boolean,
            HandlerKind::Ignore => SignalHandler::Ignore,
            HandlerKind::State => SignalHandler::State,
        }
    }
}

/// Output of a handler; its type selects the emitted message kind
#[derive(Debug, Clone, PartialEq)]
pub enum TranslatedValue {
    Numeric(f64),
    Boolean(bool),
    String(Option<String>),
}

impl TranslatedValue {
    /// Build the message to emit; a missing string never produces one
    pub fn into_message(self, name: &str) -> Option<VehicleMessage> {
        match self {
            TranslatedValue::Numeric(value) => Some(VehicleMessage::numeric(name, value)),
            TranslatedValue::Boolean(value) => Some(VehicleMessage::boolean(name, value)),
            TranslatedValue::String(Some(value)) => Some(VehicleMessage::string(name, value)),
            TranslatedValue::String(None) => None,
        }
    }
}
