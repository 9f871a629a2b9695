#![allow(missing_docs)]
//! Wire formats.
//!
//! Everything here turns bytes into typed values or back, and nothing
//! else: no state, no I/O, no cryptography.  Parsing goes through
//! [`codec::Reader`], which can never read past the end of its slice, so
//! a truncated or over-long field becomes an [`InvalidMessage`] rather
//! than an out-of-bounds read.
//!
//! Records come off the wire via [`deframer`], handshake messages are
//! reassembled from records in [`hsjoiner`], and outgoing messages are
//! cut into records by [`fragmenter`].
//!
//! [`InvalidMessage`]: crate::InvalidMessage

#[macro_use]
mod macros;

pub mod alert;
pub mod base;
pub mod ccs;
pub mod codec;
pub mod deframer;
pub mod enums;
pub mod fragmenter;
pub mod handshake;
pub mod hsjoiner;
pub mod message;
