//! Protobuf envelope encoder
//!
//! Messages are wrapped in a tagged envelope whose sub-messages use proto2
//! optional fields, so every populated field carries explicit presence.
//! Envelopes are written length-delimited into a fixed buffer sized for the
//! largest possible encoding.
//!
//! ```text
//! message VehicleMessage {
//!     enum Type { RAW = 1; STRING = 2; NUM = 3; BOOL = 4;
//!                 EVENTED_STRING = 5; EVENTED_NUM = 6; EVENTED_BOOL = 7; }
//!     optional Type type = 1;
//!     optional RawMessage raw_message = 2;
//!     optional StringMessage string_message = 3;
//!     optional NumericMessage numerical_message = 4;
//!     optional BooleanMessage boolean_message = 5;
//!     optional EventedStringMessage evented_string_message = 6;
//!     optional EventedNumericMessage evented_numerical_message = 7;
//!     optional EventedBooleanMessage evented_boolean_message = 8;
//! }
//! ```

use super::{MessageEncoder, OutputFormat};
use crate::fields::{MAX_NAME_LENGTH, MAX_STRING_VALUE_LENGTH};
use crate::types::{EventValue, Result, TranslateError, VehicleMessage};
use prost::Message;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum MessageType {
    Raw = 1,
    String = 2,
    Num = 3,
    Bool = 4,
    EventedString = 5,
    EventedNum = 6,
    EventedBool = 7,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Envelope {
    #[prost(enumeration = "MessageType", optional, tag = "1")]
    pub r#type: Option<i32>,
    #[prost(message, optional, tag = "2")]
    pub raw_message: Option<RawMessage>,
    #[prost(message, optional, tag = "3")]
    pub string_message: Option<StringMessage>,
    #[prost(message, optional, tag = "4")]
    pub numerical_message: Option<NumericMessage>,
    #[prost(message, optional, tag = "5")]
    pub boolean_message: Option<BooleanMessage>,
    #[prost(message, optional, tag = "6")]
    pub evented_string_message: Option<EventedStringMessage>,
    #[prost(message, optional, tag = "7")]
    pub evented_numerical_message: Option<EventedNumericMessage>,
    #[prost(message, optional, tag = "8")]
    pub evented_boolean_message: Option<EventedBooleanMessage>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RawMessage {
    #[prost(int32, optional, tag = "1")]
    pub bus: Option<i32>,
    #[prost(uint32, optional, tag = "2")]
    pub message_id: Option<u32>,
    #[prost(uint64, optional, tag = "3")]
    pub data: Option<u64>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StringMessage {
    #[prost(string, optional, tag = "1")]
    pub name: Option<String>,
    #[prost(string, optional, tag = "2")]
    pub value: Option<String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct NumericMessage {
    #[prost(string, optional, tag = "1")]
    pub name: Option<String>,
    #[prost(double, optional, tag = "2")]
    pub value: Option<f64>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BooleanMessage {
    #[prost(string, optional, tag = "1")]
    pub name: Option<String>,
    #[prost(bool, optional, tag = "2")]
    pub value: Option<bool>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct EventedStringMessage {
    #[prost(string, optional, tag = "1")]
    pub name: Option<String>,
    #[prost(string, optional, tag = "2")]
    pub value: Option<String>,
    #[prost(string, optional, tag = "3")]
    pub event: Option<String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct EventedNumericMessage {
    #[prost(string, optional, tag = "1")]
    pub name: Option<String>,
    #[prost(string, optional, tag = "2")]
    pub value: Option<String>,
    #[prost(double, optional, tag = "3")]
    pub event: Option<f64>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct EventedBooleanMessage {
    #[prost(string, optional, tag = "1")]
    pub name: Option<String>,
    #[prost(string, optional, tag = "2")]
    pub value: Option<String>,
    #[prost(bool, optional, tag = "3")]
    pub event: Option<bool>,
}

const fn varint_len(value: u64) -> usize {
    let mut len = 1;
    let mut rest = value >> 7;
    while rest != 0 {
        len += 1;
        rest >>= 7;
    }
    len
}

const fn string_field(max: usize) -> usize {
    1 + varint_len(max as u64) + max
}

const fn nested(inner: usize) -> usize {
    1 + varint_len(inner as u64) + inner
}

const NAME_FIELD: usize = string_field(MAX_NAME_LENGTH);
const STRING_VALUE_FIELD: usize = string_field(MAX_STRING_VALUE_LENGTH);
const DOUBLE_FIELD: usize = 1 + 8;
const BOOL_FIELD: usize = 1 + 1;
const TYPE_FIELD: usize = 1 + varint_len(MessageType::EventedBool as u64);

const RAW_MESSAGE_SIZE: usize = (1 + 10) + (1 + 5) + (1 + 10);
const STRING_MESSAGE_SIZE: usize = NAME_FIELD + STRING_VALUE_FIELD;
const NUMERIC_MESSAGE_SIZE: usize = NAME_FIELD + DOUBLE_FIELD;
const BOOLEAN_MESSAGE_SIZE: usize = NAME_FIELD + BOOL_FIELD;
const EVENTED_STRING_MESSAGE_SIZE: usize = NAME_FIELD + 2 * STRING_VALUE_FIELD;
const EVENTED_NUMERIC_MESSAGE_SIZE: usize = NAME_FIELD + STRING_VALUE_FIELD + DOUBLE_FIELD;
const EVENTED_BOOLEAN_MESSAGE_SIZE: usize = NAME_FIELD + STRING_VALUE_FIELD + BOOL_FIELD;

const ENVELOPE_MAX_SIZE: usize = TYPE_FIELD
    + nested(RAW_MESSAGE_SIZE)
    + nested(STRING_MESSAGE_SIZE)
    + nested(NUMERIC_MESSAGE_SIZE)
    + nested(BOOLEAN_MESSAGE_SIZE)
    + nested(EVENTED_STRING_MESSAGE_SIZE)
    + nested(EVENTED_NUMERIC_MESSAGE_SIZE)
    + nested(EVENTED_BOOLEAN_MESSAGE_SIZE);

/// Largest possible length-delimited envelope, prefix included
pub const VEHICLE_MESSAGE_MAX_SIZE: usize = varint_len(ENVELOPE_MAX_SIZE as u64) + ENVELOPE_MAX_SIZE;

impl From<&VehicleMessage> for Envelope {
    fn from(message: &VehicleMessage) -> Self {
        let mut envelope = Envelope::default();
        let message_type = match message {
            VehicleMessage::Numeric { name, value } => {
                envelope.numerical_message = Some(NumericMessage {
                    name: Some(name.clone()),
                    value: Some(*value),
                });
                MessageType::Num
            }
            VehicleMessage::Boolean { name, value } => {
                envelope.boolean_message = Some(BooleanMessage {
                    name: Some(name.clone()),
                    value: Some(*value),
                });
                MessageType::Bool
            }
            VehicleMessage::String { name, value } => {
                envelope.string_message = Some(StringMessage {
                    name: Some(name.clone()),
                    value: Some(value.clone()),
                });
                MessageType::String
            }
            VehicleMessage::Evented { name, value, event } => match event {
                EventValue::String(event) => {
                    envelope.evented_string_message = Some(EventedStringMessage {
                        name: Some(name.clone()),
                        value: Some(value.clone()),
                        event: Some(event.clone()),
                    });
                    MessageType::EventedString
                }
                EventValue::Numeric(event) => {
                    envelope.evented_numerical_message = Some(EventedNumericMessage {
                        name: Some(name.clone()),
                        value: Some(value.clone()),
                        event: Some(*event),
                    });
                    MessageType::EventedNum
                }
                EventValue::Boolean(event) => {
                    envelope.evented_boolean_message = Some(EventedBooleanMessage {
                        name: Some(name.clone()),
                        value: Some(value.clone()),
                        event: Some(*event),
                    });
                    MessageType::EventedBool
                }
            },
            VehicleMessage::Raw {
                bus,
                message_id,
                data,
            } => {
                envelope.raw_message = Some(RawMessage {
                    bus: Some(*bus as i32),
                    message_id: Some(*message_id),
                    data: Some(*data),
                });
                MessageType::Raw
            }
        };
        envelope.r#type = Some(message_type as i32);
        envelope
    }
}

fn missing(field: &str) -> TranslateError {
    TranslateError::UnsupportedMessage(format!("envelope is missing {}", field))
}

impl TryFrom<Envelope> for VehicleMessage {
    type Error = TranslateError;

    fn try_from(envelope: Envelope) -> Result<Self> {
        let raw_type = envelope.r#type.ok_or_else(|| missing("type"))?;
        let message_type = MessageType::try_from(raw_type).map_err(|_| {
            TranslateError::UnsupportedMessage(format!("unknown message type {}", raw_type))
        })?;

        let message = match message_type {
            MessageType::Num => {
                let m = envelope.numerical_message.ok_or_else(|| missing("numerical_message"))?;
                VehicleMessage::Numeric {
                    name: m.name.ok_or_else(|| missing("name"))?,
                    value: m.value.ok_or_else(|| missing("value"))?,
                }
            }
            MessageType::Bool => {
                let m = envelope.boolean_message.ok_or_else(|| missing("boolean_message"))?;
                VehicleMessage::Boolean {
                    name: m.name.ok_or_else(|| missing("name"))?,
                    value: m.value.ok_or_else(|| missing("value"))?,
                }
            }
            MessageType::String => {
                let m = envelope.string_message.ok_or_else(|| missing("string_message"))?;
                VehicleMessage::String {
                    name: m.name.ok_or_else(|| missing("name"))?,
                    value: m.value.ok_or_else(|| missing("value"))?,
                }
            }
            MessageType::EventedString => {
                let m = envelope
                    .evented_string_message
                    .ok_or_else(|| missing("evented_string_message"))?;
                VehicleMessage::Evented {
                    name: m.name.ok_or_else(|| missing("name"))?,
                    value: m.value.ok_or_else(|| missing("value"))?,
                    event: EventValue::String(m.event.ok_or_else(|| missing("event"))?),
                }
            }
            MessageType::EventedNum => {
                let m = envelope
                    .evented_numerical_message
                    .ok_or_else(|| missing("evented_numerical_message"))?;
                VehicleMessage::Evented {
                    name: m.name.ok_or_else(|| missing("name"))?,
                    value: m.value.ok_or_else(|| missing("value"))?,
                    event: EventValue::Numeric(m.event.ok_or_else(|| missing("event"))?),
                }
            }
            MessageType::EventedBool => {
                let m = envelope
                    .evented_boolean_message
                    .ok_or_else(|| missing("evented_boolean_message"))?;
                VehicleMessage::Evented {
                    name: m.name.ok_or_else(|| missing("name"))?,
                    value: m.value.ok_or_else(|| missing("value"))?,
                    event: EventValue::Boolean(m.event.ok_or_else(|| missing("event"))?),
                }
            }
            MessageType::Raw => {
                let m = envelope.raw_message.ok_or_else(|| missing("raw_message"))?;
                let bus = m.bus.ok_or_else(|| missing("bus"))?;
                VehicleMessage::Raw {
                    bus: u8::try_from(bus).map_err(|_| {
                        TranslateError::UnsupportedMessage(format!("bus {} out of range", bus))
                    })?,
                    message_id: m.message_id.ok_or_else(|| missing("message_id"))?,
                    data: m.data.ok_or_else(|| missing("data"))?,
                }
            }
        };
        Ok(message)
    }
}

/// Decode one length-delimited envelope back into a message
pub fn decode_envelope(bytes: &[u8]) -> Result<VehicleMessage> {
    let envelope = Envelope::decode_length_delimited(bytes)?;
    VehicleMessage::try_from(envelope)
}

/// Encoder for the binary-envelope format
#[derive(Debug, Clone, Copy, Default)]
pub struct ProtobufEncoder;

impl MessageEncoder for ProtobufEncoder {
    fn format(&self) -> OutputFormat {
        OutputFormat::Proto
    }

    fn encode(&self, message: &VehicleMessage) -> Result<Vec<u8>> {
        message.check_field_lengths()?;
        let envelope = Envelope::from(message);

        let mut buffer = [0u8; VEHICLE_MESSAGE_MAX_SIZE];
        let mut cursor: &mut [u8] = &mut buffer;
        envelope.encode_length_delimited(&mut cursor)?;
        let written = VEHICLE_MESSAGE_MAX_SIZE - cursor.len();

        Ok(buffer[..written].to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(message: VehicleMessage) -> VehicleMessage {
        let bytes = ProtobufEncoder.encode(&message).unwrap();
        decode_envelope(&bytes).unwrap()
    }

    #[test]
    fn test_numeric_round_trip() {
        let bytes = ProtobufEncoder
            .encode(&VehicleMessage::numeric("engine_speed", 1500.0))
            .unwrap();
        let envelope = Envelope::decode_length_delimited(&bytes[..]).unwrap();
        assert_eq!(envelope.r#type, Some(MessageType::Num as i32));
        let numeric = envelope.numerical_message.unwrap();
        assert_eq!(numeric.name.as_deref(), Some("engine_speed"));
        assert_eq!(numeric.value, Some(1500.0));
        assert!(envelope.boolean_message.is_none());
    }

    #[test]
    fn test_known_raw_encoding() {
        let bytes = ProtobufEncoder.encode(&VehicleMessage::raw(1, 256, 8)).unwrap();
        // len=11, type=RAW, raw_message{bus=1, message_id=256, data=8}
        assert_eq!(
            bytes,
            vec![0x0B, 0x08, 0x01, 0x12, 0x07, 0x08, 0x01, 0x10, 0x80, 0x02, 0x18, 0x08]
        );
    }

    #[test]
    fn test_raw_round_trip_preserves_payload() {
        let message = VehicleMessage::raw(2, 0x7E8, 0xFFFF_FFFF_FFFF_FFFF);
        assert_eq!(round_trip(message.clone()), message);
    }

    #[test]
    fn test_other_variants_round_trip() {
        let messages = vec![
            VehicleMessage::boolean("parking_brake_status", false),
            VehicleMessage::string("transmission_gear_position", "third"),
            VehicleMessage::evented("door_status", "passenger", EventValue::Boolean(true)),
            VehicleMessage::evented("button_event", "up", EventValue::String("pressed".into())),
            VehicleMessage::evented("window_position", "driver", EventValue::Numeric(0.5)),
        ];
        for message in messages {
            assert_eq!(round_trip(message.clone()), message);
        }
    }

    #[test]
    fn test_largest_message_fits_buffer() {
        let name = "n".repeat(MAX_NAME_LENGTH);
        let value = "v".repeat(MAX_STRING_VALUE_LENGTH);
        let event = EventValue::String("e".repeat(MAX_STRING_VALUE_LENGTH));
        let bytes = ProtobufEncoder
            .encode(&VehicleMessage::evented(name, value, event))
            .unwrap();
        assert!(bytes.len() <= VEHICLE_MESSAGE_MAX_SIZE);
    }

    #[test]
    fn test_decode_rejects_missing_type() {
        let mut bytes = Vec::new();
        Envelope::default().encode_length_delimited(&mut bytes).unwrap();
        assert!(matches!(
            decode_envelope(&bytes),
            Err(TranslateError::UnsupportedMessage(_))
        ));
    }

    #[test]
    fn test_decode_rejects_mismatched_payload() {
        let envelope = Envelope {
            r#type: Some(MessageType::Bool as i32),
            ..Default::default()
        };
        let mut bytes = Vec::new();
        envelope.encode_length_delimited(&mut bytes).unwrap();
        assert!(decode_envelope(&bytes).is_err());
    }
}
