//! Output pipeline
//!
//! A `Pipeline` pairs one encoder with a byte `Sink`. Each message is
//! encoded into a fresh owned buffer that is handed to the sink; nothing is
//! kept between calls, and a message that fails to encode never reaches the
//! sink.

use crate::formats::{MessageEncoder, OutputFormat};
use crate::types::{BusAddress, EventValue, Result, VehicleMessage};
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

/// Byte transport receiving finished messages
///
/// Ownership of the bytes moves to the sink; the sink's backpressure and
/// failure handling are its own concern.
pub trait Sink: Send {
    fn send_message(&mut self, format: OutputFormat, bytes: Vec<u8>);

    /// Push out anything the sink buffers
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Counters for messages handed off and dropped
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub messages_sent: u64,
    pub bytes_sent: u64,
    pub messages_dropped: u64,
}

pub struct Pipeline {
    encoder: Box<dyn MessageEncoder>,
    sink: Box<dyn Sink>,
    stats: PipelineStats,
}

impl Pipeline {
    /// Build a pipeline with the encoder for `format`
    pub fn new(format: OutputFormat, sink: impl Sink + 'static) -> Self {
        Self::with_encoder(format.encoder(), Box::new(sink))
    }

    pub fn with_encoder(encoder: Box<dyn MessageEncoder>, sink: Box<dyn Sink>) -> Self {
        Self {
            encoder,
            sink,
            stats: PipelineStats::default(),
        }
    }

    pub fn output_format(&self) -> OutputFormat {
        self.encoder.format()
    }

    pub fn stats(&self) -> PipelineStats {
        self.stats
    }

    /// Encode and hand off one message; failures are logged and dropped
    pub fn send(&mut self, message: &VehicleMessage) {
        match self.encoder.encode(message) {
            Ok(bytes) => {
                if log::log_enabled!(log::Level::Trace) {
                    log::trace!("Serialized to: {}", hex_dump(&bytes));
                }
                self.stats.messages_sent += 1;
                self.stats.bytes_sent += bytes.len() as u64;
                self.sink.send_message(self.encoder.format(), bytes);
            }
            Err(e) => {
                self.stats.messages_dropped += 1;
                log::warn!("Dropping {} message: {}", self.encoder.format(), e);
            }
        }
    }

    /// Flush the sink
    pub fn flush(&mut self) -> Result<()> {
        self.sink.flush()?;
        Ok(())
    }

    pub fn send_numerical_message(&mut self, name: &str, value: f64) {
        self.send(&VehicleMessage::numeric(name, value));
    }

    pub fn send_boolean_message(&mut self, name: &str, value: bool) {
        self.send(&VehicleMessage::boolean(name, value));
    }

    pub fn send_string_message(&mut self, name: &str, value: &str) {
        self.send(&VehicleMessage::string(name, value));
    }

    pub fn send_evented_float_message(&mut self, name: &str, value: &str, event: f64) {
        self.send(&VehicleMessage::evented(name, value, EventValue::Numeric(event)));
    }

    pub fn send_evented_boolean_message(&mut self, name: &str, value: &str, event: bool) {
        self.send(&VehicleMessage::evented(name, value, EventValue::Boolean(event)));
    }

    pub fn send_evented_string_message(&mut self, name: &str, value: &str, event: &str) {
        self.send(&VehicleMessage::evented(
            name,
            value,
            EventValue::String(event.to_string()),
        ));
    }

    pub fn send_raw_message(&mut self, bus: BusAddress, id: u32, data: u64) {
        self.send(&VehicleMessage::raw(bus, id, data));
    }
}

fn hex_dump(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

/// In-memory sink; clones share the same queue
#[derive(Debug, Clone, Default)]
pub struct BufferSink {
    messages: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl BufferSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.messages.lock().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove and return every buffered message
    pub fn take(&self) -> Vec<Vec<u8>> {
        self.messages
            .lock()
            .map(|mut m| std::mem::take(&mut *m))
            .unwrap_or_default()
    }
}

impl Sink for BufferSink {
    fn send_message(&mut self, _format: OutputFormat, bytes: Vec<u8>) {
        if let Ok(mut messages) = self.messages.lock() {
            messages.push(bytes);
        }
    }
}

/// Sink writing every message to an `io::Write`
pub struct WriterSink<W: Write + Send> {
    writer: W,
}

impl<W: Write + Send> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> Sink for WriterSink<W> {
    fn send_message(&mut self, format: OutputFormat, bytes: Vec<u8>) {
        if let Err(e) = self.writer.write_all(&bytes) {
            log::warn!("Failed to write {} message: {}", format, e);
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}
