//! CAN Translate Library
//!
//! The signal-translation core of a vehicle interface: raw CAN frames go in,
//! rate-limited application messages come out in JSON or protobuf.
//!
//! # Architecture
//!
//! Each frame runs to completion before the next one is accepted:
//! - Frames with signal definitions are decoded bit by bit, scaled, gated by
//!   each signal's sampling clock and transformed by its handler
//! - Frames without definitions are forwarded raw on buses that allow it,
//!   gated by a bounded registry of message definitions
//! - The pipeline serializes every message with its single encoder and
//!   hands the bytes to a sink
//!
//! Nothing in the frame path returns an error: encode failures and registry
//! exhaustion are logged and the message is dropped.
//!
//! # Example Usage
//!
//! ```no_run
//! use can_translate::{
//!     BufferSink, BusConfig, CanFrame, MessageConfig, SignalConfig, Translator, VehicleConfig,
//! };
//!
//! let config = VehicleConfig::new()
//!     .add_bus(BusConfig::new(1).with_raw_passthrough(true))
//!     .add_message(
//!         MessageConfig::new(1, 0x100).add_signal(SignalConfig::new("engine_speed", 0, 16)),
//!     );
//!
//! let sink = BufferSink::new();
//! let mut translator = Translator::from_config(&config, sink.clone()).unwrap();
//! translator.process_frame(&CanFrame::new(1, 0x100, 0x05DC_0000_0000_0000));
//!
//! for message in sink.take() {
//!     print!("{}", String::from_utf8_lossy(&message));
//! }
//! ```

// Public modules
pub mod bitfield;
pub mod clock;
pub mod config;
pub mod fields;
pub mod formats;
pub mod pipeline;
pub mod registry;
pub mod sampling;
pub mod signals;
pub mod translator;
pub mod types;

// Re-export main types for convenience
pub use clock::{FrequencyClock, ManualClock, SystemClock, TimeSource};
pub use config::{BusConfig, MessageConfig, RawMessageConfig, SignalConfig, VehicleConfig};
pub use formats::{MessageEncoder, OutputFormat};
pub use pipeline::{BufferSink, Pipeline, PipelineStats, Sink, WriterSink};
pub use registry::{MessageDefinition, MessageRegistry};
pub use signals::{CanSignal, SignalHandler, SignalState, TranslatedValue};
pub use translator::{Translator, TranslatorStats};
pub use types::{BusAddress, CanFrame, EventValue, Result, TranslateError, VehicleMessage};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
