//! Raw message definition registry
//!
//! A bounded catalog of passthrough messages keyed by `(bus, id)`. Entries
//! are created on first sight of an unrecognized ID (or preloaded from
//! configuration) and never removed. Lookup is a linear scan over the
//! insertion-ordered entries; catalogs are small.

use crate::clock::{FrequencyClock, TimeSource};
use crate::pipeline::Pipeline;
use crate::types::{BusAddress, Result, TranslateError, VehicleMessage};

/// A passthrough catalog entry
#[derive(Debug, Clone, PartialEq)]
pub struct MessageDefinition {
    pub bus: BusAddress,
    pub id: u32,
    /// Last raw payload seen with this ID
    pub last_value: u64,
    pub frequency_clock: FrequencyClock,
    /// Bypass the clock when the payload changed
    pub force_send_changed: bool,
}

impl MessageDefinition {
    /// A zeroed definition with the given sampling frequency
    pub fn new(bus: BusAddress, id: u32, frequency_hz: f32) -> Self {
        Self {
            bus,
            id,
            last_value: 0,
            frequency_clock: FrequencyClock::new(frequency_hz),
            force_send_changed: false,
        }
    }

    /// Builder method: bypass the clock for changed payloads
    pub fn with_force_send_changed(mut self, enabled: bool) -> Self {
        self.force_send_changed = enabled;
        self
    }
}

/// Fixed-capacity catalog of message definitions
#[derive(Debug, Clone)]
pub struct MessageRegistry {
    definitions: Vec<MessageDefinition>,
    capacity: usize,
    /// Sampling frequency given to definitions registered at runtime
    default_frequency_hz: f32,
    /// Registrations refused because the registry was full
    rejected: u64,
}

impl MessageRegistry {
    pub fn new(capacity: usize) -> Self {
        Self {
            definitions: Vec::with_capacity(capacity),
            capacity,
            default_frequency_hz: 0.0,
            rejected: 0,
        }
    }

    /// Builder method: sampling frequency for runtime registrations
    pub fn with_default_frequency(mut self, frequency_hz: f32) -> Self {
        self.default_frequency_hz = frequency_hz;
        self
    }

    pub fn lookup(&self, bus: BusAddress, id: u32) -> Option<&MessageDefinition> {
        self.definitions.iter().find(|d| d.bus == bus && d.id == id)
    }

    pub fn lookup_mut(&mut self, bus: BusAddress, id: u32) -> Option<&mut MessageDefinition> {
        self.definitions.iter_mut().find(|d| d.bus == bus && d.id == id)
    }

    /// Catalog `(bus, id)` if it is not known yet
    ///
    /// Returns true when the ID is cataloged after the call (new or already
    /// present), false when the registry is full.
    pub fn register(&mut self, bus: BusAddress, id: u32) -> bool {
        if self.lookup(bus, id).is_some() {
            return true;
        }
        if self.is_full() {
            let error = TranslateError::RegistryFull {
                bus,
                id,
                capacity: self.capacity,
            };
            // Warn once, later refusals go to debug
            if self.rejected == 0 {
                log::warn!("{}", error);
            } else {
                log::debug!("{}", error);
            }
            self.rejected += 1;
            return false;
        }
        self.definitions
            .push(MessageDefinition::new(bus, id, self.default_frequency_hz));
        true
    }

    /// Add a statically configured definition
    pub fn preload(&mut self, definition: MessageDefinition) -> Result<()> {
        if self.lookup(definition.bus, definition.id).is_some() {
            return Err(TranslateError::DuplicateMessage {
                bus: definition.bus,
                id: definition.id,
            });
        }
        if self.is_full() {
            return Err(TranslateError::RegistryFull {
                bus: definition.bus,
                id: definition.id,
                capacity: self.capacity,
            });
        }
        self.definitions.push(definition);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.definitions.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of registrations refused so far
    pub fn rejected(&self) -> u64 {
        self.rejected
    }

    /// Definitions in insertion order
    pub fn definitions(&self) -> &[MessageDefinition] {
        &self.definitions
    }
}

/// Forward an undecoded frame, gated by its catalog entry
///
/// The first sighting of an ID is sent as soon as it is cataloged. A frame
/// that cannot be cataloged because the registry is full is dropped.
pub fn passthrough_message(
    pipeline: &mut Pipeline,
    registry: &mut MessageRegistry,
    bus: BusAddress,
    id: u32,
    payload: u64,
    time: &dyn TimeSource,
) {
    let send = match registry.lookup_mut(bus, id) {
        None => {
            log::debug!("Adding new message definition for message 0x{:X} on bus {}", id, bus);
            let registered = registry.register(bus, id);
            if let Some(definition) = registry.lookup_mut(bus, id) {
                definition.last_value = payload;
            }
            registered
        }
        Some(definition) => {
            let send = definition.frequency_clock.should_tick(time)
                || (payload != definition.last_value && definition.force_send_changed);
            definition.last_value = payload;
            send
        }
    };

    if send {
        pipeline.send(&VehicleMessage::raw(bus, id, payload));
    } else {
        log::trace!("Suppressed raw message 0x{:X} on bus {}", id, bus);
    }
}
