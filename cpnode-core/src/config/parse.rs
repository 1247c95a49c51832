//! Simple text parser for node configuration
//!
//! Handles the small TOML-like subset a node needs. It does NOT support the
//! full TOML grammar.
//!
//! Supported features:
//! - Key = value pairs (integer, boolean, string)
//! - Decimal and `0x` hexadecimal integers
//! - An optional `[node]` section header
//! - Comments (# ...)
//!
//! ```text
//! [node]
//! address = 5          # 'F' on the wire
//! input_bytes = 2
//! output_bytes = 2
//! invert_inputs = true
//! trace = "announce, poll"
//! ```

use super::types::{clamp_io_bytes, NodeConfig, TraceFlags};
use cpnode_protocol::clamp_address;

/// Parse error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseError {
    /// Line is neither a section, a comment, nor `key = value`
    InvalidLine { line: usize },
    /// Section other than `[node]`
    InvalidSection { line: usize },
    /// Key not recognized
    UnknownKey { line: usize },
    /// Value has the wrong type or is out of range
    InvalidValue { line: usize },
}

/// Parse text configuration into a [`NodeConfig`]
///
/// Keys that are not present keep their defaults. Out-of-range addresses
/// and I/O counts are clamped, as the setters do.
pub fn parse_config(input: &str) -> Result<NodeConfig, ParseError> {
    let mut config = NodeConfig::default();

    for (index, raw) in input.lines().enumerate() {
        let line_no = index + 1;
        let line = strip_comment(raw).trim();

        // Skip empty lines and comments
        if line.is_empty() {
            continue;
        }

        if line.starts_with('[') && line.ends_with(']') {
            if line[1..line.len() - 1].trim() != "node" {
                return Err(ParseError::InvalidSection { line: line_no });
            }
            continue;
        }

        let (key, value) =
            parse_key_value(line).ok_or(ParseError::InvalidLine { line: line_no })?;
        apply_value(&mut config, key, value, line_no)?;
    }

    Ok(config)
}

/// Remove a trailing `# comment`, leaving `#` inside quotes alone
fn strip_comment(line: &str) -> &str {
    let mut in_string = false;
    for (i, c) in line.char_indices() {
        match c {
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..i],
            _ => {}
        }
    }
    line
}

/// Split `key = value`
fn parse_key_value(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once('=')?;
    let key = key.trim();
    let value = value.trim();
    if key.is_empty() || value.is_empty() {
        return None;
    }
    Some((key, value))
}

fn apply_value(
    config: &mut NodeConfig,
    key: &str,
    value: &str,
    line: usize,
) -> Result<(), ParseError> {
    let invalid = ParseError::InvalidValue { line };

    match key {
        "address" => config.address = clamp_address(parse_u8(value).ok_or(invalid)?),
        "input_bytes" => config.input_bytes = clamp_io_bytes(parse_u8(value).ok_or(invalid)?),
        "output_bytes" => config.output_bytes = clamp_io_bytes(parse_u8(value).ok_or(invalid)?),
        "invert_inputs" => config.invert_inputs = parse_bool(value).ok_or(invalid)?,
        "invert_outputs" => config.invert_outputs = parse_bool(value).ok_or(invalid)?,
        "trace" => config.trace = parse_trace(value).ok_or(invalid)?,
        _ => return Err(ParseError::UnknownKey { line }),
    }
    Ok(())
}

fn parse_u8(value: &str) -> Option<u8> {
    match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16).ok(),
        None => value.parse().ok(),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

/// Trace categories as a quoted, comma-separated list or a raw bitmask
fn parse_trace(value: &str) -> Option<TraceFlags> {
    let Some(names) = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
    else {
        return parse_u8(value).map(TraceFlags::from_bits);
    };

    let mut flags = TraceFlags::NONE;
    for name in names.split(',').map(str::trim).filter(|n| !n.is_empty()) {
        flags.insert(TraceFlags::from_name(name)?);
    }
    Some(flags)
}
