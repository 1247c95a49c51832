//! Frame encoding for the CMRI serial protocol.
//!
//! Frame format:
//! - SYN SYN (2 bytes): 0xFF line fill, lets the receiver's UART settle
//! - STX (1 byte): 0x02 start of message
//! - UA (1 byte): node address + 65 ('A' for node 0)
//! - TYPE (1 byte): 'I', 'P', 'R' or 'T'
//! - BODY (0-260 bytes before escaping): DLE-escaped data
//! - ETX (1 byte): 0x03 end of message
//!
//! Body bytes equal to STX, ETX or DLE are preceded by DLE. SYN is never
//! escaped.

use heapless::Vec;

use crate::messages::MessageType;

/// Line fill byte, sent twice before every STX
pub const SYN: u8 = 0xFF;

/// Start of message
pub const STX: u8 = 0x02;

/// End of message
pub const ETX: u8 = 0x03;

/// Data link escape: the next byte is data even if it is a protocol byte
pub const DLE: u8 = 0x10;

/// Offset added to a node address on the wire
pub const ADDRESS_OFFSET: u8 = b'A';

/// Highest valid node address ('A' + 64 = DEL)
pub const MAX_ADDRESS: u8 = 64;

/// Maximum unescaped body size in bytes (largest SUSIC node plus padding)
pub const MAX_PAYLOAD_SIZE: usize = 260;

/// Bytes around the body: SYN SYN STX UA TYPE ... ETX
pub const FRAME_OVERHEAD: usize = 6;

/// Maximum complete frame size (every body byte escaped)
pub const MAX_FRAME_SIZE: usize = FRAME_OVERHEAD + 2 * MAX_PAYLOAD_SIZE;

/// Errors that can occur while building, encoding or decoding frames
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Payload exceeds maximum allowed size
    PayloadTooLarge,
    /// Buffer too small for encoding
    BufferTooSmall,
    /// Message body is shorter than its type requires
    Truncated,
}

/// Clamp a node address into the valid 0..=64 range
pub fn clamp_address(address: u8) -> u8 {
    address.min(MAX_ADDRESS)
}

/// Encode a node address for the wire (clamped first)
pub fn encode_address(address: u8) -> u8 {
    clamp_address(address) + ADDRESS_OFFSET
}

/// Decode a wire address byte, `None` if it is outside 'A'..=DEL
pub fn decode_address(byte: u8) -> Option<u8> {
    match byte.checked_sub(ADDRESS_OFFSET) {
        Some(address) if address <= MAX_ADDRESS => Some(address),
        _ => None,
    }
}

/// Whether a body byte must be preceded by DLE on the wire
pub fn needs_escape(byte: u8) -> bool {
    matches!(byte, STX | ETX | DLE)
}

/// A frame ready for encoding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Node address (0..=64, not offset)
    pub address: u8,
    /// Message type
    pub msg_type: MessageType,
    /// Unescaped body
    pub payload: Vec<u8, MAX_PAYLOAD_SIZE>,
}

impl Frame {
    /// Create a new frame with the given body
    pub fn new(address: u8, msg_type: MessageType, payload: &[u8]) -> Result<Self, FrameError> {
        let mut payload_vec = Vec::new();
        payload_vec
            .extend_from_slice(payload)
            .map_err(|_| FrameError::PayloadTooLarge)?;

        Ok(Self {
            address: clamp_address(address),
            msg_type,
            payload: payload_vec,
        })
    }

    /// Create a frame with no body
    pub fn empty(address: u8, msg_type: MessageType) -> Self {
        Self {
            address: clamp_address(address),
            msg_type,
            payload: Vec::new(),
        }
    }

    /// Build the node's answer to a poll from latched input bytes
    ///
    /// Every input byte is cleared to zero once copied, so a value is
    /// reported exactly once. Nothing is cleared if the inputs do not fit.
    pub fn read_response(address: u8, inputs: &mut [u8]) -> Result<Self, FrameError> {
        if inputs.len() > MAX_PAYLOAD_SIZE {
            return Err(FrameError::PayloadTooLarge);
        }

        let mut frame = Self::empty(address, MessageType::Read);
        for input in inputs.iter_mut() {
            frame
                .payload
                .push(*input)
                .map_err(|_| FrameError::PayloadTooLarge)?;
            *input = 0;
        }
        Ok(frame)
    }

    /// Number of bytes [`Frame::encode`] will write
    pub fn encoded_len(&self) -> usize {
        let escapes = self.payload.iter().filter(|&&b| needs_escape(b)).count();
        FRAME_OVERHEAD + self.payload.len() + escapes
    }

    /// Encode this frame into a byte buffer
    ///
    /// Returns the number of bytes written
    pub fn encode(&self, buffer: &mut [u8]) -> Result<usize, FrameError> {
        let frame_len = self.encoded_len();
        if buffer.len() < frame_len {
            return Err(FrameError::BufferTooSmall);
        }

        buffer[0] = SYN;
        buffer[1] = SYN;
        buffer[2] = STX;
        buffer[3] = encode_address(self.address);
        buffer[4] = self.msg_type.to_byte();

        let mut i = 5;
        for &byte in &self.payload {
            if needs_escape(byte) {
                buffer[i] = DLE;
                i += 1;
            }
            buffer[i] = byte;
            i += 1;
        }
        buffer[i] = ETX;

        Ok(frame_len)
    }

    /// Encode this frame into a heapless Vec
    pub fn encode_to_vec(&self) -> Result<Vec<u8, MAX_FRAME_SIZE>, FrameError> {
        let mut buffer = [0u8; MAX_FRAME_SIZE];
        let len = self.encode(&mut buffer)?;
        let mut vec = Vec::new();
        vec.extend_from_slice(&buffer[..len])
            .map_err(|_| FrameError::BufferTooSmall)?;
        Ok(vec)
    }
}
