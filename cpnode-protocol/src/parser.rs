//! Receive-side state machine for CMRI frames.
//!
//! [`transition`] is a pure function of (state, byte, node address), so the
//! framing rules can be exercised from a recorded byte sequence. The
//! [`FrameParser`] applies the resulting actions to its message buffer, and
//! [`FrameParser::read_packet`] drives it from a [`SerialPort`].

use cpnode_hal::SerialPort;
use heapless::Vec;

use crate::frame::{DLE, ETX, MAX_PAYLOAD_SIZE, STX, SYN};
use crate::messages::MessageType;

/// Classification of one parse cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Packet {
    /// No byte was waiting
    None,
    /// Malformed message or buffer overrun
    Error,
    /// Well-formed header for another node
    Ignore,
    /// "I" message
    Init,
    /// "P" message
    Poll,
    /// "R" message
    Read,
    /// "T" message
    Transmit,
}

impl Packet {
    /// Whether the node drains the bus to the next ETX after this packet
    ///
    /// A node never acts on a Read, so it is handled like any other
    /// message it does not accept.
    pub fn needs_flush(self) -> bool {
        matches!(self, Packet::Error | Packet::Ignore | Packet::Read)
    }
}

impl From<MessageType> for Packet {
    fn from(msg_type: MessageType) -> Self {
        match msg_type {
            MessageType::Init => Packet::Init,
            MessageType::Poll => Packet::Poll,
            MessageType::Read => Packet::Read,
            MessageType::Transmit => Packet::Transmit,
        }
    }
}

/// Parser states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseState {
    /// Before any header; SYN is line fill here
    Idle,
    /// Got STX, next byte is the node address
    HeaderAddress,
    /// Address matched, next byte is the message type
    HeaderType,
    /// Reading the message body
    Payload,
    /// Got DLE, next byte is data
    Escaped {
        /// Whether to resume in `Payload` (otherwise `Idle`)
        in_payload: bool,
    },
}

/// What the parser does with the byte that caused a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Action {
    /// Consume the byte, nothing else
    Skip,
    /// Append the byte to the message buffer
    Store(u8),
    /// Header resolved; keep reading the body
    Classify(Packet),
    /// Stop reading now with this classification
    Finish(Packet),
    /// ETX: message complete
    End,
}

/// Pure transition function
///
/// `unit_address` is this node's address as it appears on the wire
/// (address + 65).
pub fn transition(state: ParseState, byte: u8, unit_address: u8) -> (ParseState, Action) {
    match state {
        ParseState::Idle | ParseState::Payload => {
            let in_payload = state == ParseState::Payload;
            match byte {
                STX => (ParseState::HeaderAddress, Action::Skip),
                ETX => (state, Action::End),
                DLE => (ParseState::Escaped { in_payload }, Action::Skip),
                SYN if !in_payload => (state, Action::Skip),
                _ => (state, Action::Store(byte)),
            }
        }
        ParseState::HeaderAddress => {
            if byte == unit_address {
                (ParseState::HeaderType, Action::Skip)
            } else {
                // Not for us; the caller flushes to ETX
                (ParseState::Idle, Action::Finish(Packet::Ignore))
            }
        }
        ParseState::HeaderType => match MessageType::from_byte(byte) {
            Some(msg_type) => (ParseState::Payload, Action::Classify(msg_type.into())),
            None => (ParseState::Payload, Action::Finish(Packet::Error)),
        },
        ParseState::Escaped { in_payload } => {
            let next = if in_payload {
                ParseState::Payload
            } else {
                ParseState::Idle
            };
            (next, Action::Store(byte))
        }
    }
}

/// Frame parser with its message buffer
#[derive(Debug, Clone)]
pub struct FrameParser {
    state: ParseState,
    packet: Packet,
    payload: Vec<u8, MAX_PAYLOAD_SIZE>,
    complete: bool,
    overrun: bool,
}

impl Default for FrameParser {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameParser {
    /// Create a new frame parser
    pub fn new() -> Self {
        Self {
            state: ParseState::Idle,
            packet: Packet::Error,
            payload: Vec::new(),
            complete: false,
            overrun: false,
        }
    }

    /// Reset the parser state and clear the message buffer
    ///
    /// A message that ends without a valid header is an error, so the
    /// pending classification starts as [`Packet::Error`].
    pub fn reset(&mut self) {
        self.state = ParseState::Idle;
        self.packet = Packet::Error;
        self.payload.clear();
        self.complete = false;
        self.overrun = false;
    }

    /// Whether the last message ended because the buffer was full
    pub fn overrun(&self) -> bool {
        self.overrun
    }

    /// Current state
    pub fn state(&self) -> ParseState {
        self.state
    }

    /// Unescaped body of the last (or current) message
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Feed a single byte to the parser
    ///
    /// Returns `Some(packet)` when the message is finished. The next call
    /// after that starts a fresh message.
    pub fn feed(&mut self, byte: u8, unit_address: u8) -> Option<Packet> {
        if self.complete {
            self.reset();
        }

        let (next, action) = transition(self.state, byte, unit_address);
        self.state = next;

        match action {
            Action::Skip => None,
            Action::Store(byte) => {
                if self.payload.push(byte).is_err() {
                    self.overrun = true;
                    return Some(self.finish(Packet::Error));
                }
                None
            }
            Action::Classify(packet) => {
                self.packet = packet;
                None
            }
            Action::Finish(packet) => Some(self.finish(packet)),
            Action::End => Some(self.finish(self.packet)),
        }
    }

    /// Feed bytes until a message finishes
    ///
    /// Returns the number of bytes consumed and the classification, if a
    /// message finished. Bytes after the end of the message are not consumed.
    pub fn feed_bytes(&mut self, bytes: &[u8], unit_address: u8) -> (usize, Option<Packet>) {
        for (i, &byte) in bytes.iter().enumerate() {
            if let Some(packet) = self.feed(byte, unit_address) {
                return (i + 1, Some(packet));
            }
        }
        (bytes.len(), None)
    }

    /// Read one complete message from the port
    ///
    /// Returns [`Packet::None`] without blocking when no byte is waiting.
    /// Otherwise blocks on the port until the message finishes.
    pub fn read_packet<P: SerialPort>(
        &mut self,
        port: &mut P,
        unit_address: u8,
    ) -> Result<Packet, P::Error> {
        if port.available()? == 0 {
            return Ok(Packet::None);
        }

        self.reset();
        loop {
            let byte = port.read_byte()?;
            if let Some(packet) = self.feed(byte, unit_address) {
                return Ok(packet);
            }
        }
    }

    fn finish(&mut self, packet: Packet) -> Packet {
        self.packet = packet;
        self.complete = true;
        packet
    }
}

/// Discard bytes until ETX is consumed or nothing more is waiting
///
/// Used after an ignored or malformed message so the next parse starts at a
/// message boundary. Returns the number of bytes discarded.
pub fn flush_to_etx<P: SerialPort>(port: &mut P) -> Result<usize, P::Error> {
    let mut discarded = 0;
    while port.available()? > 0 {
        discarded += 1;
        if port.read_byte()? == ETX {
            break;
        }
    }
    Ok(discarded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{encode_address, Frame};

    const UA: u8 = b'A';

    /// Scripted port: reads come from a slice, writes are dropped
    struct ScriptPort<'a> {
        rx: &'a [u8],
    }

    #[derive(Debug, PartialEq)]
    struct Exhausted;

    impl SerialPort for ScriptPort<'_> {
        type Error = Exhausted;

        fn available(&mut self) -> Result<usize, Self::Error> {
            Ok(self.rx.len())
        }

        fn read_byte(&mut self) -> Result<u8, Self::Error> {
            let (&byte, rest) = self.rx.split_first().ok_or(Exhausted)?;
            self.rx = rest;
            Ok(byte)
        }

        fn write_byte(&mut self, _byte: u8) -> Result<(), Self::Error> {
            Ok(())
        }

        fn flush(&mut self) -> Result<(), Self::Error> {
            Ok(())
        }
    }

    #[test]
    fn test_transition_header() {
        let (state, action) = transition(ParseState::Idle, STX, UA);
        assert_eq!((state, action), (ParseState::HeaderAddress, Action::Skip));

        let (state, action) = transition(state, UA, UA);
        assert_eq!((state, action), (ParseState::HeaderType, Action::Skip));

        let (state, action) = transition(state, b'T', UA);
        assert_eq!(
            (state, action),
            (ParseState::Payload, Action::Classify(Packet::Transmit))
        );
    }

    #[test]
    fn test_transition_sync_depends_on_mode() {
        assert_eq!(
            transition(ParseState::Idle, SYN, UA),
            (ParseState::Idle, Action::Skip)
        );
        assert_eq!(
            transition(ParseState::Payload, SYN, UA),
            (ParseState::Payload, Action::Store(SYN))
        );
    }

    #[test]
    fn test_transition_escape_returns_to_mode() {
        let (state, _) = transition(ParseState::Payload, DLE, UA);
        assert_eq!(state, ParseState::Escaped { in_payload: true });
        assert_eq!(
            transition(state, ETX, UA),
            (ParseState::Payload, Action::Store(ETX))
        );

        let (state, _) = transition(ParseState::Idle, DLE, UA);
        assert_eq!(
            transition(state, STX, UA),
            (ParseState::Idle, Action::Store(STX))
        );
    }

    #[test]
    fn test_transition_foreign_address() {
        assert_eq!(
            transition(ParseState::HeaderAddress, b'B', UA),
            (ParseState::Idle, Action::Finish(Packet::Ignore))
        );
    }

    #[test]
    fn test_transition_unknown_type() {
        assert_eq!(
            transition(ParseState::HeaderType, b'Q', UA),
            (ParseState::Payload, Action::Finish(Packet::Error))
        );
    }

    #[test]
    fn test_parse_poll() {
        let mut parser = FrameParser::new();
        let (used, packet) = parser.feed_bytes(&[SYN, SYN, STX, b'A', b'P', ETX], UA);

        assert_eq!(used, 6);
        assert_eq!(packet, Some(Packet::Poll));
        assert!(parser.payload().is_empty());
    }

    #[test]
    fn test_parse_transmit_unescapes_body() {
        let frame = Frame::new(0, MessageType::Transmit, &[STX, SYN, ETX, DLE, 0x42]).unwrap();
        let encoded = frame.encode_to_vec().unwrap();

        let mut parser = FrameParser::new();
        let (_, packet) = parser.feed_bytes(&encoded, UA);

        assert_eq!(packet, Some(Packet::Transmit));
        assert_eq!(parser.payload(), &[STX, SYN, ETX, DLE, 0x42]);
    }

    #[test]
    fn test_parse_foreign_address_stops_at_address() {
        let mut parser = FrameParser::new();
        let bytes = [SYN, SYN, STX, b'C', b'T', 0x01, ETX];
        let (used, packet) = parser.feed_bytes(&bytes, UA);

        assert_eq!(packet, Some(Packet::Ignore));
        assert_eq!(used, 4);
    }

    #[test]
    fn test_etx_without_header_is_error() {
        let mut parser = FrameParser::new();
        let (_, packet) = parser.feed_bytes(&[0x55, ETX], UA);
        assert_eq!(packet, Some(Packet::Error));
    }

    #[test]
    fn test_overrun_is_error() {
        let mut bytes = [0x55u8; 5 + MAX_PAYLOAD_SIZE + 10];
        bytes[..5].copy_from_slice(&[SYN, SYN, STX, b'A', b'T']);

        let mut parser = FrameParser::new();
        let (used, packet) = parser.feed_bytes(&bytes, UA);

        assert_eq!(packet, Some(Packet::Error));
        assert_eq!(used, 5 + MAX_PAYLOAD_SIZE + 1);
        assert_eq!(parser.payload().len(), MAX_PAYLOAD_SIZE);
        assert!(parser.overrun());
    }

    #[test]
    fn test_overrun_cleared_by_next_message() {
        let mut bytes = [0x55u8; 5 + MAX_PAYLOAD_SIZE + 1];
        bytes[..5].copy_from_slice(&[SYN, SYN, STX, b'A', b'T']);
        let mut parser = FrameParser::new();
        parser.feed_bytes(&bytes, UA);
        assert!(parser.overrun());

        let (_, packet) = parser.feed_bytes(&[SYN, SYN, STX, b'A', b'X', ETX], UA);
        assert_eq!(packet, Some(Packet::Error));
        assert!(!parser.overrun());
    }

    #[test]
    fn test_parser_restarts_after_complete() {
        let mut parser = FrameParser::new();
        let (_, first) = parser.feed_bytes(&[STX, b'A', b'T', 0x11, ETX], UA);
        assert_eq!(first, Some(Packet::Transmit));

        let (_, second) = parser.feed_bytes(&[STX, b'A', b'P', ETX], UA);
        assert_eq!(second, Some(Packet::Poll));
        assert!(parser.payload().is_empty());
    }

    #[test]
    fn test_read_packet_idle_port() {
        let mut port = ScriptPort { rx: &[] };
        let mut parser = FrameParser::new();
        assert_eq!(parser.read_packet(&mut port, UA), Ok(Packet::None));
    }

    #[test]
    fn test_read_packet_blocks_until_etx() {
        let ua = encode_address(5);
        let mut port = ScriptPort {
            rx: &[SYN, SYN, STX, b'F', b'T', 0x01, DLE, 0x02, ETX, SYN],
        };
        let mut parser = FrameParser::new();

        assert_eq!(parser.read_packet(&mut port, ua), Ok(Packet::Transmit));
        assert_eq!(parser.payload(), &[0x01, 0x02]);
        assert_eq!(port.rx, &[SYN]);
    }

    #[test]
    fn test_read_packet_truncated_message_surfaces_transport_error() {
        let mut port = ScriptPort {
            rx: &[SYN, SYN, STX, b'A', b'T', 0x01],
        };
        let mut parser = FrameParser::new();
        assert_eq!(parser.read_packet(&mut port, UA), Err(Exhausted));
    }

    #[test]
    fn test_packets_needing_flush() {
        assert!(Packet::Error.needs_flush());
        assert!(Packet::Ignore.needs_flush());
        assert!(Packet::Read.needs_flush());
        assert!(!Packet::None.needs_flush());
        assert!(!Packet::Poll.needs_flush());
        assert!(!Packet::Transmit.needs_flush());
    }

    #[test]
    fn test_flush_to_etx() {
        let mut port = ScriptPort {
            rx: &[b'T', 0x01, DLE, ETX, SYN, SYN],
        };
        assert_eq!(flush_to_etx(&mut port), Ok(4));
        assert_eq!(port.rx, &[SYN, SYN]);
    }

    #[test]
    fn test_flush_stops_when_port_drains() {
        let mut port = ScriptPort { rx: &[0x01, 0x02] };
        assert_eq!(flush_to_etx(&mut port), Ok(2));
        assert!(port.rx.is_empty());
    }
}
