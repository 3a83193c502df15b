//! Frame input parsing
//!
//! Reads candump-style lines:
//!
//! ```text
//! (1436509052.249713) can0 044#2A366C2BBA
//! can1 100#0102030405060708
//! 1 7E8#0241
//! ```
//!
//! The optional leading timestamp is in seconds. Data bytes fill the payload
//! from its most significant byte; missing bytes are zero.

use anyhow::{bail, Context, Result};
use byteorder::{BigEndian, ByteOrder};
use can_translate::CanFrame;

const MAX_EXTENDED_ID: u32 = 0x1FFF_FFFF;

/// Parse one input line; blank lines and `;` comments yield `None`
pub fn parse_frame_line(line: &str) -> Result<Option<CanFrame>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with(';') {
        return Ok(None);
    }

    let mut tokens = line.split_whitespace().peekable();

    let timestamp_ms = match tokens.peek() {
        Some(token) if token.starts_with('(') => {
            let token = tokens.next().unwrap_or_default();
            Some(parse_timestamp(token)?)
        }
        _ => None,
    };

    let bus_token = tokens.next().context("Missing bus")?;
    let frame_token = tokens.next().context("Missing frame")?;
    if tokens.next().is_some() {
        bail!("Unexpected trailing input: {:?}", line);
    }

    let bus = parse_bus(bus_token)?;
    let (id_text, data_text) = frame_token
        .split_once('#')
        .with_context(|| format!("Frame {:?} has no '#' separator", frame_token))?;

    let id = u32::from_str_radix(id_text, 16)
        .with_context(|| format!("Invalid CAN ID: {:?}", id_text))?;
    if id > MAX_EXTENDED_ID {
        bail!("CAN ID 0x{:X} exceeds 29 bits", id);
    }

    let frame = CanFrame::new(bus, id, parse_payload(data_text)?);
    Ok(Some(match timestamp_ms {
        Some(ts) => frame.with_timestamp(ts),
        None => frame,
    }))
}

fn parse_timestamp(token: &str) -> Result<u64> {
    let inner = token
        .strip_prefix('(')
        .and_then(|t| t.strip_suffix(')'))
        .with_context(|| format!("Malformed timestamp: {:?}", token))?;
    let seconds: f64 = inner
        .parse()
        .with_context(|| format!("Invalid timestamp: {:?}", inner))?;
    if !seconds.is_finite() || seconds < 0.0 {
        bail!("Invalid timestamp: {:?}", inner);
    }
    Ok((seconds * 1000.0).round() as u64)
}

/// Accepts `can0`, `vcan1`, or a bare number
fn parse_bus(token: &str) -> Result<u8> {
    let digits = token.trim_start_matches(|c: char| !c.is_ascii_digit());
    digits
        .parse()
        .with_context(|| format!("Invalid bus: {:?}", token))
}

fn parse_payload(data: &str) -> Result<u64> {
    if data.starts_with('R') {
        bail!("Remote frames carry no data");
    }
    if data.len() % 2 != 0 || data.len() > 16 {
        bail!("Data {:?} must be 0-8 whole bytes", data);
    }

    let mut bytes = [0u8; 8];
    for (i, chunk) in data.as_bytes().chunks(2).enumerate() {
        let text = std::str::from_utf8(chunk).context("Data is not ASCII")?;
        bytes[i] = u8::from_str_radix(text, 16)
            .with_context(|| format!("Invalid data byte: {:?}", text))?;
    }
    Ok(BigEndian::read_u64(&bytes))
}
