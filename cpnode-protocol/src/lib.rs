//! CMRI Serial Protocol
//!
//! This crate implements the framing of the CMRI bus (published by Dr. Bruce
//! Chubb) as seen from a node: the host polls, nodes answer only when
//! addressed. The link is RS485, half duplex.
//!
//! # Protocol Overview
//!
//! ```text
//! ┌─────┬─────┬─────┬──────┬──────┬─────────────────┬─────┐
//! │ SYN │ SYN │ STX │ UA   │ TYPE │ BODY (escaped)  │ ETX │
//! │ FF  │ FF  │ 02  │ 'A'+ │ IPRT │ 0–260B          │ 03  │
//! └─────┴─────┴─────┴──────┴──────┴─────────────────┴─────┘
//! ```
//!
//! - `I` Initialize, host → node: `<NDP> <DLH> <DLL> <options...>`
//! - `P` Poll, host → node: no body
//! - `R` Read, node → host: input bytes
//! - `T` Transmit, host → node: output bytes
//!
//! Body bytes equal to STX, ETX or DLE (0x10) are preceded by DLE.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod frame;
pub mod messages;
pub mod parser;

pub use frame::{
    clamp_address, decode_address, encode_address, Frame, FrameError, DLE, ETX, MAX_ADDRESS,
    MAX_FRAME_SIZE, MAX_PAYLOAD_SIZE, STX, SYN,
};
pub use messages::{InitMessage, MessageType, TransmitDelay, NDP_CPNODE};
pub use parser::{flush_to_etx, transition, Action, FrameParser, Packet, ParseState};
