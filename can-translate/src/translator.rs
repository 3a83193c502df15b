//! Main translator API
//!
//! The `Translator` is the frame entry point: it owns the signal table, the
//! raw message registry and the output pipeline, and runs each frame
//! through decode, sampling, handler dispatch and encoding before the next
//! one is accepted.

use crate::clock::{SystemClock, TimeSource};
use crate::config::{BusConfig, VehicleConfig};
use crate::pipeline::{Pipeline, PipelineStats, Sink};
use crate::registry::{passthrough_message, MessageRegistry};
use crate::sampling::{post_translate, pre_translate};
use crate::signals::{CanSignal, SignalHandler};
use crate::types::{BusAddress, CanFrame, Result, TranslateError};
use std::collections::HashMap;

/// Decode, gate, transform and emit one signal of a frame
///
/// `signals` is the complete signal table, so custom handlers can read the
/// state of other signals. The decoded value is recorded whether or not it
/// was sent.
pub fn translate_signal(
    pipeline: &mut Pipeline,
    signals: &mut [CanSignal],
    index: usize,
    payload: u64,
    time: &dyn TimeSource,
) {
    let (value, mut send) = pre_translate(&mut signals[index], payload, time);

    let signal = &signals[index];
    let translated = signal.handler.apply(signal, signals, value, &mut send);
    if send {
        match translated.into_message(&signal.generic_name) {
            Some(message) => pipeline.send(&message),
            None => log::trace!("No value for signal '{}', suppressed", signal.generic_name),
        }
    }

    post_translate(&mut signals[index], value);
}

/// Frame counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TranslatorStats {
    pub frames_processed: u64,
    /// Frames with at least one signal definition
    pub frames_translated: u64,
    /// Frames handed to the raw passthrough path
    pub frames_passed_through: u64,
    /// Frames with no definition on a bus without passthrough
    pub frames_ignored: u64,
    pub registered_messages: usize,
    /// Passthrough frames dropped because the registry was full
    pub registry_rejections: u64,
    pub pipeline: PipelineStats,
}

pub struct Translator {
    signals: Vec<CanSignal>,
    /// (bus, id) -> indices into `signals`
    message_index: HashMap<(BusAddress, u32), Vec<usize>>,
    buses: Vec<BusConfig>,
    registry: MessageRegistry,
    pipeline: Pipeline,
    time: Box<dyn TimeSource>,
    stats: TranslatorStats,
}

impl Translator {
    /// Create a translator with an empty signal table
    pub fn new(pipeline: Pipeline, registry: MessageRegistry) -> Self {
        Self {
            signals: Vec::new(),
            message_index: HashMap::new(),
            buses: Vec::new(),
            registry,
            pipeline,
            time: Box::new(SystemClock::new()),
            stats: TranslatorStats::default(),
        }
    }

    /// Build a translator from a validated vehicle definition
    pub fn from_config(config: &VehicleConfig, sink: impl Sink + 'static) -> Result<Self> {
        config.validate()?;

        let pipeline = Pipeline::new(config.output_format, sink);
        let mut registry = MessageRegistry::new(config.message_capacity)
            .with_default_frequency(config.raw_frequency_hz);
        for raw in &config.raw_messages {
            registry.preload(raw.to_definition())?;
        }

        let mut translator = Self::new(pipeline, registry);
        for bus in &config.buses {
            translator.add_bus(bus.clone());
        }
        for signal in config.build_signals() {
            translator.add_signal(signal)?;
        }

        log::info!(
            "Translator ready: {} signals, {} buses, {} output",
            translator.signals.len(),
            translator.buses.len(),
            config.output_format
        );
        Ok(translator)
    }

    /// Builder method: replace the time source polled by sampling clocks
    pub fn with_time_source(mut self, time: impl TimeSource + 'static) -> Self {
        self.time = Box::new(time);
        self
    }

    pub fn add_bus(&mut self, bus: BusConfig) {
        match self.buses.iter_mut().find(|b| b.address == bus.address) {
            Some(existing) => *existing = bus,
            None => self.buses.push(bus),
        }
    }

    /// Add a signal to the table; names must be unique
    pub fn add_signal(&mut self, signal: CanSignal) -> Result<()> {
        signal.validate()?;
        if self.signal(&signal.generic_name).is_some() {
            return Err(TranslateError::InvalidSignalDefinition(format!(
                "signal name '{}' is used twice",
                signal.generic_name
            )));
        }
        let index = self.signals.len();
        self.message_index
            .entry((signal.bus, signal.message_id))
            .or_default()
            .push(index);
        self.signals.push(signal);
        Ok(())
    }

    /// Install a handler (e.g. a custom closure) on a named signal
    pub fn set_handler(&mut self, name: &str, handler: SignalHandler) -> Result<()> {
        let signal = self
            .signals
            .iter_mut()
            .find(|s| s.generic_name == name)
            .ok_or_else(|| TranslateError::SignalNotFound(name.to_string()))?;
        if handler.is_state() && signal.states.is_empty() {
            return Err(TranslateError::InvalidSignalDefinition(format!(
                "'{}' has no states for the state handler",
                name
            )));
        }
        signal.handler = handler;
        Ok(())
    }

    /// Run one frame through the translation core
    ///
    /// Never fails: problems are logged and the frame is dropped.
    pub fn process_frame(&mut self, frame: &CanFrame) {
        self.stats.frames_processed += 1;

        if let Some(indices) = self.message_index.get(&(frame.bus, frame.id)) {
            log::trace!("Translating 0x{:X} on bus {}", frame.id, frame.bus);
            self.stats.frames_translated += 1;
            for &index in indices {
                translate_signal(
                    &mut self.pipeline,
                    &mut self.signals,
                    index,
                    frame.payload,
                    self.time.as_ref(),
                );
            }
        } else if self.passthrough_enabled(frame.bus) {
            self.stats.frames_passed_through += 1;
            passthrough_message(
                &mut self.pipeline,
                &mut self.registry,
                frame.bus,
                frame.id,
                frame.payload,
                self.time.as_ref(),
            );
        } else {
            log::trace!("No definition for 0x{:X} on bus {}, ignored", frame.id, frame.bus);
            self.stats.frames_ignored += 1;
        }
    }

    fn passthrough_enabled(&self, bus: BusAddress) -> bool {
        self.buses
            .iter()
            .any(|b| b.address == bus && b.raw_passthrough)
    }

    pub fn signals(&self) -> &[CanSignal] {
        &self.signals
    }

    pub fn signal(&self, name: &str) -> Option<&CanSignal> {
        crate::signals::lookup_signal(name, &self.signals)
    }

    pub fn registry(&self) -> &MessageRegistry {
        &self.registry
    }

    pub fn pipeline_mut(&mut self) -> &mut Pipeline {
        &mut self.pipeline
    }

    /// Flush the output sink
    pub fn flush(&mut self) -> Result<()> {
        self.pipeline.flush()
    }

    pub fn stats(&self) -> TranslatorStats {
        TranslatorStats {
            registered_messages: self.registry.len(),
            registry_rejections: self.registry.rejected(),
            pipeline: self.pipeline.stats(),
            ..self.stats
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::formats::OutputFormat;
    use crate::pipeline::BufferSink;
    use crate::signals::SignalState;

    fn translator(sink: &BufferSink) -> Translator {
        let pipeline = Pipeline::new(OutputFormat::Json, sink.clone());
        Translator::new(pipeline, MessageRegistry::new(2)).with_time_source(ManualClock::new(0))
    }

    fn lines(sink: &BufferSink) -> Vec<String> {
        sink.take()
            .into_iter()
            .map(|m| String::from_utf8(m).unwrap())
            .collect()
    }

    #[test]
    fn test_translator_creation() {
        let sink = BufferSink::new();
        let translator = translator(&sink);
        assert!(translator.signals().is_empty());
        assert_eq!(translator.stats().frames_processed, 0);
    }

    #[test]
    fn test_translate_known_message() {
        let sink = BufferSink::new();
        let mut translator = translator(&sink);
        translator
            .add_signal(CanSignal::new("engine_speed", 0, 16).on_message(0, 0x100))
            .unwrap();
        translator
            .add_signal(
                CanSignal::new("brake_pedal_status", 16, 1)
                    .on_message(0, 0x100)
                    .with_handler(SignalHandler::Boolean),
            )
            .unwrap();

        translator.process_frame(&CanFrame::new(0, 0x100, 0x05DC_8000_0000_0000));
        assert_eq!(
            lines(&sink),
            vec![
                "{\"name\":\"engine_speed\",\"value\":1500}\r\n".to_string(),
                "{\"name\":\"brake_pedal_status\",\"value\":true}\r\n".to_string(),
            ]
        );
        assert_eq!(translator.signal("engine_speed").unwrap().last_value, 1500.0);
    }

    #[test]
    fn test_state_miss_is_suppressed() {
        let sink = BufferSink::new();
        let mut translator = translator(&sink);
        translator
            .add_signal(
                CanSignal::new("ignition_status", 0, 8)
                    .on_message(0, 0x200)
                    .with_handler(SignalHandler::State)
                    .with_states(vec![SignalState::new(0, "off"), SignalState::new(1, "on")]),
            )
            .unwrap();

        translator.process_frame(&CanFrame::new(0, 0x200, 0x0100_0000_0000_0000));
        translator.process_frame(&CanFrame::new(0, 0x200, 0x0200_0000_0000_0000));
        assert_eq!(lines(&sink), vec!["{\"name\":\"ignition_status\",\"value\":\"on\"}\r\n"]);
        assert_eq!(translator.signal("ignition_status").unwrap().last_value, 2.0);
    }

    #[test]
    fn test_passthrough_only_on_enabled_bus() {
        let sink = BufferSink::new();
        let mut translator = translator(&sink);
        translator.add_bus(BusConfig::new(1).with_raw_passthrough(true));
        translator.add_bus(BusConfig::new(2));

        translator.process_frame(&CanFrame::new(1, 256, 0x0102_0304_0506_0708));
        translator.process_frame(&CanFrame::new(2, 256, 0x0102_0304_0506_0708));

        assert_eq!(
            lines(&sink),
            vec!["{\"bus\":1,\"id\":256,\"data\":\"0x0102030405060708\"}\r\n"]
        );
        let stats = translator.stats();
        assert_eq!(stats.frames_passed_through, 1);
        assert_eq!(stats.frames_ignored, 1);
        assert_eq!(stats.registered_messages, 1);
    }

    #[test]
    fn test_set_handler() {
        let sink = BufferSink::new();
        let mut translator = translator(&sink);
        translator
            .add_signal(CanSignal::new("fuel_level", 0, 8).on_message(0, 0x300))
            .unwrap();
        translator
            .set_handler("fuel_level", SignalHandler::custom_numeric(|_, _, value, _| value / 2.0))
            .unwrap();
        assert!(matches!(
            translator.set_handler("missing", SignalHandler::Ignore),
            Err(TranslateError::SignalNotFound(_))
        ));

        translator.process_frame(&CanFrame::new(0, 0x300, 0x6400_0000_0000_0000));
        assert_eq!(lines(&sink), vec!["{\"name\":\"fuel_level\",\"value\":50}\r\n"]);
    }

    #[test]
    fn test_registry_rejections_counted() {
        let sink = BufferSink::new();
        let mut translator = translator(&sink);
        translator.add_bus(BusConfig::new(1).with_raw_passthrough(true));

        for id in 0x100..0x105 {
            translator.process_frame(&CanFrame::new(1, id, 0));
        }
        let stats = translator.stats();
        assert_eq!(stats.registered_messages, 2);
        assert_eq!(stats.registry_rejections, 3);
        assert_eq!(sink.len(), 2);
    }

    #[test]
    fn test_events_share_the_frame_pipeline() {
        let sink = BufferSink::new();
        let mut translator = translator(&sink);
        translator
            .add_signal(CanSignal::new("door_status", 0, 8).on_message(0, 0x400))
            .unwrap();

        translator.process_frame(&CanFrame::new(0, 0x400, 0x0100_0000_0000_0000));
        translator
            .pipeline_mut()
            .send_evented_boolean_message("door_status", "driver", true);
        translator.flush().unwrap();

        assert_eq!(
            lines(&sink),
            vec![
                "{\"name\":\"door_status\",\"value\":1}\r\n",
                "{\"name\":\"door_status\",\"value\":\"driver\",\"event\":true}\r\n",
            ]
        );
        assert_eq!(translator.stats().pipeline.messages_sent, 2);
    }

    #[test]
    fn test_duplicate_signal_rejected() {
        let sink = BufferSink::new();
        let mut translator = translator(&sink);
        translator.add_signal(CanSignal::new("a", 0, 8)).unwrap();
        assert!(translator.add_signal(CanSignal::new("a", 8, 8)).is_err());
    }
}
