//! Message types for the CMRI serial protocol
//!
//! Host → Node: Initialize, Poll, Transmit
//! Node → Host: Read (the answer to a poll)

use heapless::Vec;

use crate::frame::{FrameError, MAX_PAYLOAD_SIZE};

// Message type bytes
pub const MSG_INIT: u8 = b'I';
pub const MSG_POLL: u8 = b'P';
pub const MSG_READ: u8 = b'R';
pub const MSG_TRANSMIT: u8 = b'T';

/// Node definition parameter identifying a cpNode in the init message
pub const NDP_CPNODE: u8 = b'C';

/// Message type selector, the byte after the address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MessageType {
    /// Initialize: node type, transmit delay, options
    Init,
    /// Poll for input data
    Poll,
    /// Input data, node to host
    Read,
    /// Output data, host to node
    Transmit,
}

impl MessageType {
    /// Parse a message type from its wire byte
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            MSG_INIT => Some(MessageType::Init),
            MSG_POLL => Some(MessageType::Poll),
            MSG_READ => Some(MessageType::Read),
            MSG_TRANSMIT => Some(MessageType::Transmit),
            _ => None,
        }
    }

    /// Convert to wire byte
    pub fn to_byte(self) -> u8 {
        match self {
            MessageType::Init => MSG_INIT,
            MessageType::Poll => MSG_POLL,
            MessageType::Read => MSG_READ,
            MessageType::Transmit => MSG_TRANSMIT,
        }
    }
}

/// Per-character transmit delay requested by the host
///
/// Carried on the wire as a big-endian count of 10 µs units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TransmitDelay(u16);

impl TransmitDelay {
    /// No pacing
    pub const NONE: Self = Self(0);

    /// Create from a count of 10 µs units
    pub const fn from_units(units: u16) -> Self {
        Self(units)
    }

    /// Decode the two wire bytes, high byte first
    pub const fn from_be_bytes(bytes: [u8; 2]) -> Self {
        Self(u16::from_be_bytes(bytes))
    }

    /// The two wire bytes, high byte first
    pub const fn to_be_bytes(self) -> [u8; 2] {
        self.0.to_be_bytes()
    }

    /// Delay in 10 µs units
    pub const fn units(self) -> u16 {
        self.0
    }

    /// Delay in microseconds
    pub const fn as_micros(self) -> u32 {
        self.0 as u32 * 10
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }
}

/// Body of an Initialize message
///
/// ```text
/// <NDP> <DLH> <DLL> <options...>
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitMessage<'a> {
    /// Node definition parameter ('C' for a cpNode)
    pub node_type: u8,
    /// Transmit delay
    pub delay: TransmitDelay,
    /// Node-type specific option bytes
    pub options: &'a [u8],
}

impl<'a> InitMessage<'a> {
    /// Parse the body of an Initialize message
    pub fn parse(payload: &'a [u8]) -> Result<Self, FrameError> {
        match payload {
            [node_type, hi, lo, options @ ..] => Ok(Self {
                node_type: *node_type,
                delay: TransmitDelay::from_be_bytes([*hi, *lo]),
                options,
            }),
            _ => Err(FrameError::Truncated),
        }
    }

    /// Whether this message configures a cpNode
    pub fn is_cpnode(&self) -> bool {
        self.node_type == NDP_CPNODE
    }

    /// Encode the body (for host simulation and tests)
    pub fn to_payload(&self) -> Result<Vec<u8, MAX_PAYLOAD_SIZE>, FrameError> {
        let mut payload = Vec::new();
        payload
            .push(self.node_type)
            .map_err(|_| FrameError::PayloadTooLarge)?;
        payload
            .extend_from_slice(&self.delay.to_be_bytes())
            .map_err(|_| FrameError::PayloadTooLarge)?;
        payload
            .extend_from_slice(self.options)
            .map_err(|_| FrameError::PayloadTooLarge)?;
        Ok(payload)
    }
}
