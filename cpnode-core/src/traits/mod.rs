//! Hardware abstraction traits
//!
//! The serial side lives in `cpnode-hal`; these traits define the interface
//! between the node logic and the application's I/O.

pub mod io;

pub use io::{io_fn, IoFn, NodeIo};
