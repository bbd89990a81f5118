//! Implementations for different JTAG hardware adapters live here.  Hardware adapters should
//! implement the `Cable` trait.  Only `init`, `out` and `inout` are mandatory; everything above
//! them falls back to the generic bit-bang routines in [`crate::bitbang`], so a new adapter gets
//! full bit and stream support by implementing the two raw primitives.
pub mod gpio;
#[cfg(feature = "std")]
pub mod ft232r;
#[cfg(feature = "std")]
pub mod mpsse;
#[cfg(feature = "std")]
pub mod usbblaster;

use crate::bitbang;
use crate::error::{Error, Result};
use crate::signal::{Packet, SignalWord};

/// One entry of a cable's option table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CableOption {
    /// Short option code passed to `parse_option`
    pub code: char,
    /// Long name, used by `name:opt=value` cable strings
    pub name: &'static str,
    pub help: &'static str,
}

pub trait Cable {
    /// Bring up the hardware.  Options must be parsed before this is called.
    fn init(&mut self) -> Result<()>;

    /// The options this cable understands.
    fn options(&self) -> &'static [CableOption] {
        &[]
    }

    /// Apply one option from this cable's option table.
    fn parse_option(&mut self, code: char, _value: &str) -> Result<()> {
        Err(Error::UnknownOption(code))
    }

    /// Put one signal word on the output lines.
    fn out(&mut self, word: SignalWord) -> Result<()>;

    /// Put one signal word on the output lines and sample TDO.
    fn inout(&mut self, word: SignalWord) -> Result<bool>;

    /// Clock one bit out.  The clock is left high.
    fn write_bit(&mut self, packet: Packet) -> Result<()> {
        bitbang::write_bit(self, packet)
    }

    /// Clock one bit out and return the bit sampled from TDO on the rising edge.
    fn read_write_bit(&mut self, packet: Packet) -> Result<bool> {
        bitbang::read_write_bit(self, packet)
    }

    /// Shift `len_bits` bits of `stream` out, LSB of `stream[0]` first.  If `set_last_bit` is
    /// true, TMS is raised on the final bit.
    fn write_stream(&mut self, stream: &[u32], len_bits: usize, set_last_bit: bool) -> Result<()> {
        bitbang::write_stream(self, stream, len_bits, set_last_bit)
    }

    /// Like `write_stream`, collecting the bits shifted out of the chain into `instream`.
    fn read_write_stream(&mut self, outstream: &[u32], instream: &mut [u32], len_bits: usize, set_last_bit: bool) -> Result<()> {
        bitbang::read_write_stream(self, outstream, instream, len_bits, set_last_bit)
    }

    /// Push any buffered commands to the hardware.  Cables that don't buffer have nothing to do.
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    /// Drive the target's system reset line.  Only some adapters wire SRST up.
    fn set_srst(&mut self, _asserted: bool) -> Result<()> {
        Err(Error::Unsupported("SRST"))
    }
}

/// Parse a numeric option value, accepting a `0x` prefix for hex
pub(crate) fn parse_number(code: char, value: &str) -> Result<u32> {
    let value = value.trim();
    let parsed = match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => value.parse(),
    };
    parsed.map_err(|_| Error::InvalidOption { code, value: value.into() })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_number_accepts_hex_and_decimal() {
        assert_eq!(parse_number('f', "1000000").unwrap(), 1_000_000);
        assert_eq!(parse_number('v', "0x16c0").unwrap(), 0x16c0);
        assert!(matches!(
            parse_number('f', "fast"),
            Err(Error::InvalidOption { code: 'f', .. })
        ));
    }
}
