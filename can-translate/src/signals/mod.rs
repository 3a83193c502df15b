//! Signal definitions and value handlers
//!
//! This module contains the statically configured signal table types and
//! the handler strategies applied to decoded values.

pub mod handler;
pub mod signal;

// Re-export key types for convenience
pub use handler::{
    BooleanHandlerFn, HandlerKind, NumericHandlerFn, SignalHandler, StringHandlerFn,
    TranslatedValue,
};
pub use signal::{
    lookup_signal, lookup_signal_state, lookup_signal_state_by_name, CanSignal, SignalState,
};
