//! Node logic for a cpNode on the CMRI serial bus
//!
//! This crate contains everything between the serial port and the
//! application's I/O:
//!
//! - Node configuration, its text form and its flash form
//! - The [`NodeIo`] trait the application implements to sample inputs and
//!   drive outputs
//! - [`Node`], which parses one message per call and answers polls
//!
//! ```ignore
//! let config = NodeConfig::new(0).with_io(2, 2);
//! let mut node = Node::new(config, port, io_fn(pack, unpack), delay);
//! node.announce();
//! loop {
//!     node.process()?;
//! }
//! ```

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

#[macro_use]
mod fmt;

pub mod config;
pub mod node;
pub mod traits;

pub use config::{parse_config, NodeConfig, TraceFlags};
pub use node::{Node, NodeError, NoMonitor};
pub use traits::{io_fn, NodeIo};
