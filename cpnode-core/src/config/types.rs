//! Configuration type definitions
//!
//! These types describe one node on the bus. They can be built in code,
//! parsed from text, or stored in flash as postcard-serialized binary data.

use core::ops::BitOr;

use cpnode_protocol::clamp_address;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Current binary config layout version
pub const CONFIG_VERSION: u8 = 1;

/// Capacity of the input and output byte buffers
///
/// Two onboard bytes plus eight expander ports of two bytes, plus padding.
pub const IO_BUFFER_SIZE: usize = (2 + 16) + 4;

/// Clamp an I/O byte count to the buffer capacity
pub fn clamp_io_bytes(count: u8) -> u8 {
    count.min(IO_BUFFER_SIZE as u8)
}

/// Diagnostic trace categories
///
/// Bitmask selecting which text trace lines reach the monitor sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TraceFlags(u8);

impl TraceFlags {
    pub const NONE: Self = Self(0);
    /// Configuration summary at startup
    pub const ANNOUNCE: Self = Self(0x01);
    /// Every parsed message
    pub const PROTOCOL: Self = Self(0x02);
    /// Poll responses
    pub const POLL: Self = Self(0x04);
    /// Initialize messages
    pub const INIT: Self = Self(0x08);
    pub const ALL: Self = Self(0x0F);

    /// Create from raw bits; unknown bits are dropped
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & Self::ALL.0)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Whether every category in `other` is enabled
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Look up a category by name ("announce", "protocol", "poll", "init", "all")
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "announce" => Some(Self::ANNOUNCE),
            "protocol" => Some(Self::PROTOCOL),
            "poll" => Some(Self::POLL),
            "init" => Some(Self::INIT),
            "all" => Some(Self::ALL),
            "none" => Some(Self::NONE),
            _ => None,
        }
    }
}

impl BitOr for TraceFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Node configuration
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NodeConfig {
    /// Config layout version
    pub version: u8,
    /// Node address (0-64)
    pub address: u8,
    /// Input bytes reported per poll
    pub input_bytes: u8,
    /// Output bytes taken from each transmit
    pub output_bytes: u8,
    /// Complement inputs before sending (active-low inputs)
    pub invert_inputs: bool,
    /// Complement outputs after receiving (active-low outputs)
    pub invert_outputs: bool,
    /// Diagnostic trace categories
    pub trace: TraceFlags,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            address: 0,
            input_bytes: 0,
            output_bytes: 0,
            invert_inputs: false,
            invert_outputs: false,
            trace: TraceFlags::NONE,
        }
    }
}

impl NodeConfig {
    /// Create a config for the given address with no I/O
    pub fn new(address: u8) -> Self {
        Self {
            address: clamp_address(address),
            ..Self::default()
        }
    }

    /// Builder-style I/O byte counts (clamped to the buffer capacity)
    pub fn with_io(mut self, input_bytes: u8, output_bytes: u8) -> Self {
        self.input_bytes = clamp_io_bytes(input_bytes);
        self.output_bytes = clamp_io_bytes(output_bytes);
        self
    }

    /// Builder-style polarity
    pub fn with_inversion(mut self, invert_inputs: bool, invert_outputs: bool) -> Self {
        self.invert_inputs = invert_inputs;
        self.invert_outputs = invert_outputs;
        self
    }

    /// Builder-style trace categories
    pub fn with_trace(mut self, trace: TraceFlags) -> Self {
        self.trace = trace;
        self
    }

    /// Bring every field into its valid range
    pub fn normalized(mut self) -> Self {
        self.address = clamp_address(self.address);
        self.input_bytes = clamp_io_bytes(self.input_bytes);
        self.output_bytes = clamp_io_bytes(self.output_bytes);
        self
    }
}
