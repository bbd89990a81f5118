//! A cable that records what it is asked to do, for unit tests.
use alloc::vec::Vec;

use embedded_hal::digital::ErrorKind;

use crate::bitbang;
use crate::cable::{Cable, CableOption};
use crate::error::{Error, Result};
use crate::signal::{Packet, SignalWord};

const OPTIONS: &[CableOption] = &[
    CableOption { code: 'd', name: "description", help: "device description" },
    CableOption { code: 'f', name: "freq", help: "TCK frequency" },
];

#[derive(Default)]
pub(crate) struct MockCable {
    /// Every word passed to `out` or `inout`, in order
    pub words: Vec<SignalWord>,
    /// Words passed to `inout`
    pub sampled: Vec<SignalWord>,
    /// Packets seen by the bit layer when `bit_level` is set
    pub packets: Vec<Packet>,
    /// Options accepted by `parse_option`
    pub parsed: Vec<(char, alloc::string::String)>,
    /// Answer `inout` with the TDI line of the word being driven
    pub loopback: bool,
    /// Take over the bit operations instead of falling back to `bitbang`
    pub bit_level: bool,
    /// Fail the emission with this index
    pub fail_at: Option<usize>,
    pub also_fail_at: Option<usize>,
    pub inits: usize,
}

impl MockCable {
    pub fn loopback() -> Self {
        Self { loopback: true, ..Default::default() }
    }

    pub fn bit_level() -> Self {
        Self { loopback: true, bit_level: true, ..Default::default() }
    }

    /// Number of calls that reached the hardware primitives
    pub fn driver_calls(&self) -> usize {
        self.words.len() + self.packets.len() + self.parsed.len() + self.inits
    }

    fn emit(&mut self, word: SignalWord) -> Result<()> {
        let index = self.words.len();
        self.words.push(word);
        if self.fail_at == Some(index) || self.also_fail_at == Some(index) {
            return Err(Error::Pin(ErrorKind::Other));
        }
        Ok(())
    }
}

impl Cable for MockCable {
    fn init(&mut self) -> Result<()> {
        self.inits += 1;
        Ok(())
    }

    fn options(&self) -> &'static [CableOption] {
        OPTIONS
    }

    fn parse_option(&mut self, code: char, value: &str) -> Result<()> {
        self.parsed.push((code, value.into()));
        Ok(())
    }

    fn out(&mut self, word: SignalWord) -> Result<()> {
        self.emit(word)
    }

    fn inout(&mut self, word: SignalWord) -> Result<bool> {
        self.sampled.push(word);
        self.emit(word)?;
        Ok(self.loopback && word.contains(SignalWord::TDI))
    }

    fn write_bit(&mut self, packet: Packet) -> Result<()> {
        if self.bit_level {
            self.packets.push(packet);
            Ok(())
        } else {
            bitbang::write_bit(self, packet)
        }
    }

    fn read_write_bit(&mut self, packet: Packet) -> Result<bool> {
        if self.bit_level {
            self.packets.push(packet);
            Ok(self.loopback && packet.contains(Packet::TDO))
        } else {
            bitbang::read_write_bit(self, packet)
        }
    }
}
