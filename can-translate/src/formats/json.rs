//! JSON document encoder
//!
//! Translated signals become `{"name":..,"value":..,"event":..}` and raw
//! frames become `{"bus":..,"id":..,"data":"0x.."}`, each serialized on a
//! single line and terminated by `\r\n`.

use super::{MessageEncoder, OutputFormat};
use crate::fields::MESSAGE_DELIMITER;
use crate::types::{EventValue, Result, VehicleMessage};
use byteorder::{BigEndian, ByteOrder};
use serde::Serialize;
use serde_json::{Number, Value};
use std::fmt::Write;

/// Field order follows declaration order
#[derive(Serialize)]
struct TranslatedDocument<'a> {
    name: &'a str,
    value: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    event: Option<Value>,
}

#[derive(Serialize)]
struct RawDocument {
    bus: u8,
    id: u32,
    data: String,
}

/// Encoder for the structured-document format
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonEncoder;

impl MessageEncoder for JsonEncoder {
    fn format(&self) -> OutputFormat {
        OutputFormat::Json
    }

    fn encode(&self, message: &VehicleMessage) -> Result<Vec<u8>> {
        message.check_field_lengths()?;

        let mut bytes = match message {
            VehicleMessage::Numeric { name, value } => serde_json::to_vec(&TranslatedDocument {
                name,
                value: number_value(*value),
                event: None,
            })?,
            VehicleMessage::Boolean { name, value } => serde_json::to_vec(&TranslatedDocument {
                name,
                value: Value::Bool(*value),
                event: None,
            })?,
            VehicleMessage::String { name, value } => serde_json::to_vec(&TranslatedDocument {
                name,
                value: Value::String(value.clone()),
                event: None,
            })?,
            VehicleMessage::Evented { name, value, event } => {
                serde_json::to_vec(&TranslatedDocument {
                    name,
                    value: Value::String(value.clone()),
                    event: Some(event_value(event)),
                })?
            }
            VehicleMessage::Raw {
                bus,
                message_id,
                data,
            } => serde_json::to_vec(&RawDocument {
                bus: *bus,
                id: *message_id,
                data: encode_data(*data),
            })?,
        };

        bytes.extend_from_slice(MESSAGE_DELIMITER);
        Ok(bytes)
    }
}

/// Render a payload as `0x` followed by 16 lowercase hex digits, MSB first
pub fn encode_data(payload: u64) -> String {
    let mut bytes = [0u8; 8];
    BigEndian::write_u64(&mut bytes, payload);

    let mut encoded = String::with_capacity(18);
    encoded.push_str("0x");
    for byte in bytes {
        // Writing to a String cannot fail
        let _ = write!(encoded, "{:02x}", byte);
    }
    encoded
}

/// Integral values print without a fractional part; non-finite values as null
fn number_value(value: f64) -> Value {
    const MAX_EXACT: f64 = 9_007_199_254_740_992.0; // 2^53

    if value.fract() == 0.0 && value.abs() < MAX_EXACT {
        Value::Number(Number::from(value as i64))
    } else {
        Number::from_f64(value).map_or(Value::Null, Value::Number)
    }
}

fn event_value(event: &EventValue) -> Value {
    match event {
        EventValue::Numeric(v) => number_value(*v),
        EventValue::Boolean(v) => Value::Bool(*v),
        EventValue::String(v) => Value::String(v.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(message: VehicleMessage) -> String {
        let bytes = JsonEncoder.encode(&message).unwrap();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn test_raw_document() {
        let text = encode(VehicleMessage::raw(1, 256, 0x0102_0304_0506_0708));
        assert_eq!(text, "{\"bus\":1,\"id\":256,\"data\":\"0x0102030405060708\"}\r\n");
    }

    #[test]
    fn test_encode_data_padding() {
        assert_eq!(encode_data(0), "0x0000000000000000");
        assert_eq!(encode_data(0xDEAD_BEEF_0000_00FF), "0xdeadbeef000000ff");
    }

    #[test]
    fn test_numeric_document() {
        assert_eq!(
            encode(VehicleMessage::numeric("engine_speed", 1500.0)),
            "{\"name\":\"engine_speed\",\"value\":1500}\r\n"
        );
        assert_eq!(
            encode(VehicleMessage::numeric("fuel_level", 42.5)),
            "{\"name\":\"fuel_level\",\"value\":42.5}\r\n"
        );
    }

    #[test]
    fn test_boolean_and_string_documents() {
        assert_eq!(
            encode(VehicleMessage::boolean("brake_pedal_status", true)),
            "{\"name\":\"brake_pedal_status\",\"value\":true}\r\n"
        );
        assert_eq!(
            encode(VehicleMessage::string("ignition_status", "run")),
            "{\"name\":\"ignition_status\",\"value\":\"run\"}\r\n"
        );
    }

    #[test]
    fn test_evented_document() {
        assert_eq!(
            encode(VehicleMessage::evented("door_status", "driver", EventValue::Boolean(true))),
            "{\"name\":\"door_status\",\"value\":\"driver\",\"event\":true}\r\n"
        );
        assert_eq!(
            encode(VehicleMessage::evented("button_event", "left", EventValue::Numeric(2.0))),
            "{\"name\":\"button_event\",\"value\":\"left\",\"event\":2}\r\n"
        );
    }

    #[test]
    fn test_non_finite_value_is_null() {
        assert_eq!(
            encode(VehicleMessage::numeric("bad", f64::NAN)),
            "{\"name\":\"bad\",\"value\":null}\r\n"
        );
    }

    #[test]
    fn test_oversized_name_rejected() {
        let name = "n".repeat(crate::fields::MAX_NAME_LENGTH + 1);
        assert!(JsonEncoder.encode(&VehicleMessage::numeric(name, 1.0)).is_err());
    }
}
