//! This crate is the layer between a JTAG protocol stack and the cable that drives the TAP
//! lines.  Every adapter, from a bit-banged FT232R to an FT2232 running its MPSSE engine,
//! implements the `Cable` trait, and the stack talks to it through a `JtagCable` handle.
//!
//! A cable only has to know how to put one `SignalWord` on its output lines (`out`) and how to do
//! that while sampling TDO (`inout`).  Single bits and whole bit streams are then clocked by the
//! generic routines in `bitbang`.  Adapters with a faster way of shifting data override the
//! stream methods; cables that buffer commands override `flush`.
//!
//! Streams are slices of `u32`.  Bits go out LSB first, `stream[0]` before `stream[1]`, and the
//! final bit can carry TMS high to leave the Shift-DR/Shift-IR state.
//!
//! Cables are picked by name from a `Registry` and configured through their option table before
//! `init` opens the hardware.
//!
//! # Example
//! ```no_run
//! use jtag_cable::dispatch::JtagCable;
//! use jtag_cable::registry::Registry;
//!
//! let registry = Registry::builtin();
//! let mut cable = JtagCable::open(&registry, "jtagkey:freq=1000000,port=A").expect("cable");
//!
//! // 32 bits of IDCODE out of Shift-DR, leaving through Exit1-DR
//! let mut idcode = [0u32; 1];
//! cable.read_write_stream(&[0xffff_ffff], &mut idcode, 32, true).expect("shift");
//! cable.flush().expect("flush");
//! println!("idcode {:08x}", idcode[0]);
//! ```


#![no_std]

#[cfg(feature = "std")]
extern crate std;

extern crate alloc;

pub mod bitbang;
pub mod cable;
pub mod dispatch;
pub mod error;
pub mod registry;
pub mod signal;

#[cfg(test)]
mod mock;

pub use cable::{Cable, CableOption};
pub use dispatch::JtagCable;
pub use error::{Error, Result};
pub use signal::{Packet, SignalWord};
