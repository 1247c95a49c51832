//! I/O implementations
//!
//! This crate provides concrete implementations of the
//! [`NodeIo`](cpnode_core::NodeIo) trait defined in cpnode-core:
//!
//! - Pin banks packed one bit per pin ([`io::PinPort`])
//! - Adapters for `embedded-hal` 1.0 digital pins ([`io::Digital`])

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod io;

pub use io::{Digital, PinPort};
