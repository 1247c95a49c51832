//! The node session
//!
//! [`Node`] owns everything one CMRI node needs: the serial port, the
//! application's I/O, a delay source for pacing, the configuration and the
//! I/O byte buffers. Call [`Node::process`] from the main loop; each call
//! handles at most one message.
//!
//! ```text
//! process() ──> FrameParser::read_packet ──> Packet
//!                                              │
//!     Init ──> transmit delay, options         │
//!     Poll ──> NodeIo::pack ──> 'R' response ──┤
//!     Transmit ──> NodeIo::unpack              │
//!     Read / Error / Ignore ──> flush to ETX ──┘
//! ```

mod monitor;

pub use monitor::NoMonitor;

use core::fmt::Write;

use cpnode_hal::SerialPort;
use cpnode_protocol::{
    clamp_address, encode_address, flush_to_etx, Frame, FrameError, FrameParser, InitMessage,
    Packet, TransmitDelay,
};
use embedded_hal::delay::DelayNs;

use crate::config::{clamp_io_bytes, NodeConfig, TraceFlags, IO_BUFFER_SIZE};
use crate::traits::NodeIo;
use monitor::Tracer;

/// Largest poll response: every input byte escaped
pub const RESPONSE_BUFFER_SIZE: usize = cpnode_protocol::frame::FRAME_OVERHEAD + 2 * IO_BUFFER_SIZE;

/// Errors surfaced by [`Node::process`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NodeError<E> {
    /// The serial port failed
    Transport(E),
    /// A response could not be framed
    Frame(FrameError),
}

impl<E> From<FrameError> for NodeError<E> {
    fn from(e: FrameError) -> Self {
        NodeError::Frame(e)
    }
}

/// A CMRI node on the bus
pub struct Node<P, H, D, W = NoMonitor> {
    port: P,
    io: H,
    delay: D,
    config: NodeConfig,
    tx_delay: TransmitDelay,
    parser: FrameParser,
    inputs: [u8; IO_BUFFER_SIZE],
    outputs: [u8; IO_BUFFER_SIZE],
    monitor: Tracer<W>,
}

impl<P, H, D> Node<P, H, D, NoMonitor>
where
    P: SerialPort,
    H: NodeIo,
    D: DelayNs,
{
    /// Create a node with no monitor attached
    ///
    /// Out-of-range config values are clamped.
    pub fn new(config: NodeConfig, port: P, io: H, delay: D) -> Self {
        let config = config.normalized();
        let monitor = Tracer::new(None, config.trace);
        Self {
            port,
            io,
            delay,
            config,
            tx_delay: TransmitDelay::NONE,
            parser: FrameParser::new(),
            inputs: [0; IO_BUFFER_SIZE],
            outputs: [0; IO_BUFFER_SIZE],
            monitor,
        }
    }
}

impl<P, H, D, W> Node<P, H, D, W>
where
    P: SerialPort,
    H: NodeIo,
    D: DelayNs,
    W: Write,
{
    /// Attach a text monitor
    ///
    /// Lines are written for the categories in the config's trace flags.
    pub fn with_monitor<W2: Write>(self, sink: W2) -> Node<P, H, D, W2> {
        Node {
            port: self.port,
            io: self.io,
            delay: self.delay,
            config: self.config,
            tx_delay: self.tx_delay,
            parser: self.parser,
            inputs: self.inputs,
            outputs: self.outputs,
            monitor: Tracer::new(Some(sink), self.monitor.flags()),
        }
    }

    /// Set the node address, returning the (possibly clamped) value
    pub fn set_address(&mut self, address: u8) -> u8 {
        self.config.address = clamp_address(address);
        self.config.address
    }

    pub fn address(&self) -> u8 {
        self.config.address
    }

    /// Set the input byte count, returning the (possibly clamped) value
    pub fn set_input_bytes(&mut self, count: u8) -> u8 {
        self.config.input_bytes = clamp_io_bytes(count);
        self.config.input_bytes
    }

    pub fn input_bytes(&self) -> u8 {
        self.config.input_bytes
    }

    /// Set the output byte count, returning the (possibly clamped) value
    pub fn set_output_bytes(&mut self, count: u8) -> u8 {
        self.config.output_bytes = clamp_io_bytes(count);
        self.config.output_bytes
    }

    pub fn output_bytes(&self) -> u8 {
        self.config.output_bytes
    }

    /// Complement input bytes before they are reported
    pub fn invert_inputs(&mut self, invert: bool) {
        self.config.invert_inputs = invert;
    }

    /// Complement output bytes before they are applied
    pub fn invert_outputs(&mut self, invert: bool) {
        self.config.invert_outputs = invert;
    }

    /// Select the trace categories written to the monitor
    pub fn set_trace(&mut self, flags: TraceFlags) {
        self.config.trace = flags;
        self.monitor.set_flags(flags);
    }

    /// Per-character delay set by the last Initialize message
    pub fn transmit_delay(&self) -> TransmitDelay {
        self.tx_delay
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    /// Input buffer (zero after each poll response)
    pub fn inputs(&self) -> &[u8] {
        &self.inputs[..usize::from(self.config.input_bytes)]
    }

    /// Output bytes from the last transmit, after inversion
    pub fn outputs(&self) -> &[u8] {
        &self.outputs[..usize::from(self.config.output_bytes)]
    }

    pub fn port_mut(&mut self) -> &mut P {
        &mut self.port
    }

    pub fn io_mut(&mut self) -> &mut H {
        &mut self.io
    }

    /// Give back the port, the I/O and the delay source
    pub fn release(self) -> (P, H, D) {
        (self.port, self.io, self.delay)
    }

    /// Report the configuration
    ///
    /// Both the defmt log and the monitor line follow
    /// [`TraceFlags::ANNOUNCE`].
    pub fn announce(&mut self) {
        if !self.config.trace.contains(TraceFlags::ANNOUNCE) {
            return;
        }
        let config = &self.config;
        info!(
            "cpNode address={=u8} inputs={=u8} outputs={=u8}",
            config.address,
            config.input_bytes,
            config.output_bytes
        );
        self.monitor.emit(
            TraceFlags::ANNOUNCE,
            format_args!(
                "cpNode address={} ua=0x{:02x} inputs={} outputs={} invert_in={} invert_out={} delay={}us\n",
                config.address,
                encode_address(config.address),
                config.input_bytes,
                config.output_bytes,
                config.invert_inputs,
                config.invert_outputs,
                self.tx_delay.as_micros(),
            ),
        );
    }

    /// Handle at most one message from the bus
    ///
    /// Returns [`Packet::None`] without blocking when nothing is waiting.
    /// Once a byte is waiting, blocks until the whole message has arrived.
    pub fn process(&mut self) -> Result<Packet, NodeError<P::Error>> {
        let unit_address = encode_address(self.config.address);
        let packet = self
            .parser
            .read_packet(&mut self.port, unit_address)
            .map_err(NodeError::Transport)?;

        if packet == Packet::None {
            return Ok(packet);
        }

        if self.parser.overrun() {
            warn!("buffer overrun after {=usize} bytes", self.parser.payload().len());
            self.monitor.emit(
                TraceFlags::PROTOCOL,
                format_args!("Buffer Overrun len={}\n", self.parser.payload().len()),
            );
        }
        self.monitor.emit(
            TraceFlags::PROTOCOL,
            format_args!("{:?} len={}\n", packet, self.parser.payload().len()),
        );

        match packet {
            Packet::Init => self.initialize(),
            Packet::Poll => self.respond_to_poll()?,
            Packet::Transmit => self.apply_outputs(),
            _ if packet.needs_flush() => {
                let discarded = flush_to_etx(&mut self.port).map_err(NodeError::Transport)?;
                debug!("{} flushed {=usize} bytes", packet, discarded);
            }
            _ => {}
        }

        Ok(packet)
    }

    fn initialize(&mut self) {
        let init = match InitMessage::parse(self.parser.payload()) {
            Ok(init) => init,
            Err(e) => {
                warn!("init message dropped: {}", e);
                return;
            }
        };

        self.tx_delay = init.delay;
        let [dlh, dll] = init.delay.to_be_bytes();
        self.monitor.emit(
            TraceFlags::INIT,
            format_args!(
                "INIT: DLH={} DLL={} DL/10={} DL={}\n",
                dlh,
                dll,
                init.delay.units(),
                init.delay.as_micros()
            ),
        );

        if init.is_cpnode() {
            self.io.apply_options(init.options);
        }
    }

    fn respond_to_poll(&mut self) -> Result<(), NodeError<P::Error>> {
        let count = usize::from(self.config.input_bytes);
        let inputs = &mut self.inputs[..count];

        self.io.pack(inputs);
        if self.config.invert_inputs {
            complement(inputs);
        }

        let frame = Frame::read_response(self.config.address, inputs)?;
        let mut buffer = [0u8; RESPONSE_BUFFER_SIZE];
        let len = frame.encode(&mut buffer)?;
        let response = &buffer[..len];

        for &byte in response {
            self.port.write_byte(byte).map_err(NodeError::Transport)?;
            if !self.tx_delay.is_zero() {
                self.delay.delay_us(self.tx_delay.as_micros());
            }
        }
        self.port.flush().map_err(NodeError::Transport)?;

        if self.monitor.enabled(TraceFlags::POLL) {
            self.monitor
                .emit(TraceFlags::POLL, format_args!("Poll Response nIB={} ", count));
            self.monitor.emit_hex(TraceFlags::POLL, response);
        }
        Ok(())
    }

    fn apply_outputs(&mut self) {
        let count = usize::from(self.config.output_bytes);
        let payload = self.parser.payload();
        let copied = count.min(payload.len());

        let outputs = &mut self.outputs[..count];
        outputs[..copied].copy_from_slice(&payload[..copied]);
        outputs[copied..].fill(0);
        if self.config.invert_outputs {
            complement(outputs);
        }

        self.io.unpack(outputs);
    }
}

fn complement(bytes: &mut [u8]) {
    for byte in bytes {
        *byte = !*byte;
    }
}
