//! Node I/O implementations

pub mod digital;
pub mod pins;

pub use digital::Digital;
pub use pins::PinPort;
