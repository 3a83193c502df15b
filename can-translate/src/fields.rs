//! Output field names and size limits
//!
//! The JSON field names are part of the wire format and must match
//! byte-for-byte what existing consumers parse.

/// Bus address of a passthrough message
pub const BUS_FIELD_NAME: &str = "bus";
/// Arbitration ID of a passthrough message
pub const ID_FIELD_NAME: &str = "id";
/// Hex-encoded payload of a passthrough message
pub const DATA_FIELD_NAME: &str = "data";
/// Generic name of a translated signal
pub const NAME_FIELD_NAME: &str = "name";
/// Value of a translated signal
pub const VALUE_FIELD_NAME: &str = "value";
/// Optional event qualifier of a translated signal
pub const EVENT_FIELD_NAME: &str = "event";

/// Terminator appended to every JSON document
pub const MESSAGE_DELIMITER: &[u8] = b"\r\n";

/// Maximum length in bytes of a signal's generic name
pub const MAX_NAME_LENGTH: usize = 100;
/// Maximum length in bytes of a string value or string event
pub const MAX_STRING_VALUE_LENGTH: usize = 100;
