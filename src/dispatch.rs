//! `JtagCable` is the handle a JTAG stack talks to.  It owns exactly one cable driver and forwards
//! every operation to it; whether the driver uses its own fast path or the generic bit-bang
//! routines is up to the driver.
//!
//! Nothing here is shared: every operation takes `&mut self`, so one owner drives the cable for
//! as long as it holds the handle.  Nothing is retried either; errors come back exactly as the
//! driver reported them.
use alloc::boxed::Box;
use alloc::string::ToString;

use crate::cable::{Cable, CableOption};
use crate::error::{Error, Result};
use crate::registry::{parse_cable_string, Registry};
use crate::signal::Packet;

pub struct JtagCable {
    cable: Box<dyn Cable>,
}

impl JtagCable {
    /// Wrap an already constructed cable
    pub fn new(cable: Box<dyn Cable>) -> Self {
        Self { cable }
    }

    /// Select the cable called `name` from `registry`.  The hardware is not touched until `init`.
    pub fn setup(registry: &Registry, name: &str) -> Result<Self> {
        let info = registry
            .find(name)
            .ok_or_else(|| Error::UnknownCable(name.to_string()))?;
        log::debug!("selected cable {} ({})", info.name, info.description);
        Ok(Self::new((info.constructor)()))
    }

    /// Select a cable from a `name:option=value,...` string, apply the options and initialize it.
    pub fn open(registry: &Registry, spec: &str) -> Result<Self> {
        let (name, options) = parse_cable_string(spec);
        let mut cable = Self::setup(registry, name)?;
        for (option, value) in options {
            cable.set_option(option, value)?;
        }
        cable.init()?;
        Ok(cable)
    }

    pub fn init(&mut self) -> Result<()> {
        log::debug!("initializing cable");
        self.cable.init()
    }

    /// Pass one option to the cable.  Codes outside the cable's option table are rejected here,
    /// without calling into the driver.
    pub fn parse_option(&mut self, code: char, value: &str) -> Result<()> {
        if !self.args().iter().any(|o| o.code == code) {
            return Err(Error::UnknownOption(code));
        }
        log::debug!("cable option -{} {}", code, value);
        self.cable.parse_option(code, value)
    }

    /// Like `parse_option`, looking the option up by its long name
    pub fn set_option(&mut self, name: &str, value: &str) -> Result<()> {
        let code = self
            .args()
            .iter()
            .find(|o| o.name == name)
            .map(|o| o.code)
            .ok_or_else(|| Error::UnknownOptionName(name.to_string()))?;
        self.parse_option(code, value)
    }

    /// The option table of the active cable
    pub fn args(&self) -> &'static [CableOption] {
        self.cable.options()
    }

    pub fn write_stream(&mut self, stream: &[u32], len_bits: usize, set_last_bit: bool) -> Result<()> {
        self.cable.write_stream(stream, len_bits, set_last_bit)
    }

    pub fn read_write_stream(&mut self, outstream: &[u32], instream: &mut [u32], len_bits: usize, set_last_bit: bool) -> Result<()> {
        self.cable.read_write_stream(outstream, instream, len_bits, set_last_bit)
    }

    pub fn write_bit(&mut self, packet: Packet) -> Result<()> {
        self.cable.write_bit(packet)
    }

    pub fn read_write_bit(&mut self, packet: Packet) -> Result<bool> {
        self.cable.read_write_bit(packet)
    }

    pub fn flush(&mut self) -> Result<()> {
        self.cable.flush()
    }

    /// Put the target in system reset, or take it out.  Fails with `Error::Unsupported` on
    /// cables without an SRST line.
    pub fn set_srst(&mut self, asserted: bool) -> Result<()> {
        log::debug!("SRST {}", if asserted { "asserted" } else { "released" });
        self.cable.set_srst(asserted)
    }
}
