//! Generic bit-bang transfers.
//!
//! These build single-bit and multi-bit JTAG transfers out of nothing more than a cable's
//! `out` and `inout` primitives.  They are the defaults behind the `Cable` trait, so any driver
//! without a faster way of shifting bits uses them automatically.
//!
//! The bit routines make no assumption about the starting state of the clock, and they leave it
//! HIGH.  Drivers with a byte-shift mode that expects new data at TDO (which only appears after a
//! falling edge of TCK) have to drop the clock themselves before handing over to such a mode.
//!
//! Streams are sequences of `u32` words: bit `i` is bit `i % 32` of word `i / 32`, so the LSB of
//! `stream[0]` goes out first, followed by the rest of `stream[0]`, then `stream[1]` and so on.
use alloc::boxed::Box;
use core::fmt;

use crate::cable::Cable;
use crate::error::{Error, Result};
use crate::signal::{Packet, SignalWord};

/// Write one bit: put the data on the lines with the clock low, then raise the clock.
///
/// Both phases are always driven; the first failure is the one reported.
pub fn write_bit<C: Cable + ?Sized>(cable: &mut C, packet: Packet) -> Result<()> {
    let word = SignalWord::from(packet);

    // Write data, drop clock
    let low = cable.out(word);
    // Raise clock, to do write
    let high = cable.out(word.clock_high());

    low.and(high)
}

/// Write one bit and sample TDO while raising the clock.
pub fn read_write_bit<C: Cable + ?Sized>(cable: &mut C, packet: Packet) -> Result<bool> {
    let word = SignalWord::from(packet);

    let low = cable.out(word);
    let sample = cable.inout(word.clock_high());

    low.and(sample)
}

/// Shift `len_bits` bits of `stream` through `cable.write_bit`, raising TMS on the final bit if
/// `set_last_bit` is set.
///
/// Every bit is shifted even if an earlier one fails; the error names the first failing bit.
/// A zero-length stream is a no-op.
pub fn write_stream<C: Cable + ?Sized>(cable: &mut C, stream: &[u32], len_bits: usize, set_last_bit: bool) -> Result<()> {
    if len_bits == 0 {
        return Ok(());
    }
    check_len(stream, len_bits)?;

    let mut shift = Shift::default();
    for i in 0..len_bits {
        let packet = stream_packet(stream, i, len_bits, set_last_bit);
        shift.record(i, cable.write_bit(packet));
    }

    log::trace!("write stream {}({})", len_bits, Bits { stream, len_bits });
    shift.finish()
}

/// Shift `outstream` out through `cable.read_write_bit`, collecting the sampled bits into
/// `instream` with the same layout.
///
/// Each word of `instream` is cleared right before its first bit is stored, so nothing above bit
/// `len_bits - 1` of the last word survives from before the call.  Words past the last one
/// touched are left alone.  Bits whose transfer failed read back as zero.
pub fn read_write_stream<C: Cable + ?Sized>(cable: &mut C, outstream: &[u32], instream: &mut [u32], len_bits: usize, set_last_bit: bool) -> Result<()> {
    if len_bits == 0 {
        return Ok(());
    }
    check_len(outstream, len_bits)?;
    check_len(instream, len_bits)?;

    let mut shift = Shift::default();
    for i in 0..len_bits {
        let (index, bit) = (i / 32, i % 32);
        if bit == 0 {
            instream[index] = 0;
        }

        let packet = stream_packet(outstream, i, len_bits, set_last_bit);
        if let Some(true) = shift.record(i, cable.read_write_bit(packet)) {
            instream[index] |= 1 << bit;
        }
    }

    log::trace!(
        "read stream {}({}) = ({})",
        len_bits,
        Bits { stream: outstream, len_bits },
        Bits { stream: instream, len_bits },
    );
    shift.finish()
}

/// Number of `u32` words needed to hold `len_bits` bits
pub fn words_for(len_bits: usize) -> usize {
    len_bits.div_ceil(32)
}

/// Read bit `index` of a stream
pub fn stream_bit(stream: &[u32], index: usize) -> bool {
    (stream[index / 32] >> (index % 32)) & 1 != 0
}

fn stream_packet(stream: &[u32], index: usize, len_bits: usize, set_last_bit: bool) -> Packet {
    let mut packet = Packet::data(stream_bit(stream, index));
    if set_last_bit && index == len_bits - 1 {
        packet |= Packet::TMS;
    }
    packet
}

fn check_len(stream: &[u32], len_bits: usize) -> Result<()> {
    if stream.len() < words_for(len_bits) {
        return Err(Error::StreamTooShort { len_bits, words: stream.len() });
    }
    Ok(())
}

/// Keeps the first failure of a shift and where it happened
#[derive(Default)]
struct Shift {
    failure: Option<(usize, Error)>,
}

impl Shift {
    fn record<T>(&mut self, bit: usize, result: Result<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                if self.failure.is_none() {
                    log::warn!("shift failed at bit {}: {}", bit, err);
                    self.failure = Some((bit, err));
                }
                None
            }
        }
    }

    fn finish(self) -> Result<()> {
        match self.failure {
            None => Ok(()),
            Some((bit, source)) => Err(Error::Shift { bit, source: Box::new(source) }),
        }
    }
}

/// Renders a stream as `0`/`1` characters in shift order
struct Bits<'a> {
    stream: &'a [u32],
    len_bits: usize,
}

impl fmt::Display for Bits<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in 0..self.len_bits {
            f.write_str(if stream_bit(self.stream, i) { "1" } else { "0" })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockCable;
    use alloc::vec;
    use alloc::vec::Vec;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test]
    fn write_bit_drops_then_raises_clock() {
        for bits in 0..8u8 {
            let packet = Packet::from_bits_truncate(bits);
            let mut cable = MockCable::default();
            write_bit(&mut cable, packet).unwrap();

            assert_eq!(cable.words.len(), 2);
            let (low, high) = (cable.words[0], cable.words[1]);
            assert!(!low.contains(SignalWord::TCLK));
            assert_eq!(high, low | SignalWord::TCLK);
            assert_eq!(low, SignalWord::from(packet));
        }
    }

    #[test]
    fn read_write_bit_samples_on_rising_edge() {
        let mut cable = MockCable::loopback();
        assert!(read_write_bit(&mut cable, Packet::TDO).unwrap());
        assert!(!read_write_bit(&mut cable, Packet::TMS).unwrap());

        assert_eq!(cable.words.len(), 4);
        assert_eq!(cable.sampled, vec![cable.words[1], cable.words[3]]);
        assert!(cable.sampled.iter().all(|w| w.contains(SignalWord::TCLK)));
    }

    #[test]
    fn bit_failure_still_drives_both_phases() {
        let mut cable = MockCable::default();
        cable.fail_at = Some(0);
        assert!(write_bit(&mut cable, Packet::TDO).is_err());
        assert_eq!(cable.words.len(), 2);
    }

    #[test]
    fn write_stream_abcd() {
        let mut cable = MockCable::bit_level();
        write_stream(&mut cable, &[0xABCD], 16, false).unwrap();

        assert_eq!(cable.packets.len(), 16);
        let expected: Vec<Packet> = (0..16).map(|i| Packet::data((0xABCD >> i) & 1 != 0)).collect();
        assert_eq!(cable.packets, expected);
        assert!(cable.packets.iter().all(|p| !p.contains(Packet::TMS)));
    }

    #[test_case(1 ; "single bit")]
    #[test_case(32 ; "one word")]
    #[test_case(33 ; "spills into second word")]
    #[test_case(70 ; "three words")]
    fn tms_only_on_last_bit(len_bits: usize) {
        let stream = vec![0x5555_5555; words_for(len_bits)];
        let mut cable = MockCable::bit_level();
        write_stream(&mut cable, &stream, len_bits, true).unwrap();

        assert_eq!(cable.packets.len(), len_bits);
        for (i, packet) in cable.packets.iter().enumerate() {
            assert_eq!(packet.contains(Packet::TMS), i == len_bits - 1, "bit {}", i);
            assert_eq!(packet.contains(Packet::TDO), stream_bit(&stream, i), "bit {}", i);
        }
    }

    #[test]
    fn last_bit_comes_from_its_own_word() {
        // bit 39 is bit 7 of the second word
        let stream = [0, 0x80];
        let mut cable = MockCable::bit_level();
        write_stream(&mut cable, &stream, 40, true).unwrap();

        assert_eq!(cable.packets[39], Packet::TDO | Packet::TMS);
        assert!(cable.packets[..39].iter().all(|p| p.is_empty()));
    }

    #[test]
    fn write_stream_reaches_the_wire_lsb_first() {
        let mut cable = MockCable::default();
        write_stream(&mut cable, &[0b0110], 4, false).unwrap();

        let data: Vec<bool> = cable.words.iter().step_by(2).map(|w| w.contains(SignalWord::TDI)).collect();
        assert_eq!(data, vec![false, true, true, false]);
    }

    #[test]
    fn loopback_round_trip() {
        let source: Vec<u32> = vec![0xDEAD_BEEF, 0x0123_4567, 0x89AB_CDEF, 0xF0F0_A5A5, 0x3];
        for len_bits in 1..=130 {
            let mut cable = MockCable::loopback();
            let mut instream = vec![0; words_for(len_bits)];
            read_write_stream(&mut cable, &source, &mut instream, len_bits, false).unwrap();

            for i in 0..len_bits {
                assert_eq!(stream_bit(&instream, i), stream_bit(&source, i), "len {} bit {}", len_bits, i);
            }
            let tail = len_bits % 32;
            if tail != 0 {
                assert_eq!(instream[instream.len() - 1] >> tail, 0, "len {}", len_bits);
            }
        }
    }

    #[test]
    fn write_stream_round_trips_through_loopback_wire() {
        let source = [0xCAFE_F00D, 0x1357_9BDF];
        let len_bits = 50;
        let mut cable = MockCable::default();
        write_stream(&mut cable, &source, len_bits, false).unwrap();

        let mut decoded = vec![0u32; 2];
        for (i, word) in cable.words.iter().skip(1).step_by(2).enumerate() {
            if word.contains(SignalWord::TDI) {
                decoded[i / 32] |= 1 << (i % 32);
            }
        }
        assert_eq!(decoded, vec![0xCAFE_F00D, 0x1357_9BDF & ((1 << 18) - 1)]);
    }

    #[test]
    fn read_stream_clears_stale_input() {
        let mut cable = MockCable::loopback();
        let mut instream = vec![0xFFFF_FFFF; 4];
        read_write_stream(&mut cable, &[0x1, 0x0, 0x2], &mut instream, 66, true).unwrap();

        assert_eq!(instream, vec![0x1, 0x0, 0x2, 0xFFFF_FFFF]);
    }

    #[test]
    fn read_stream_raises_tms_on_last_bit() {
        let mut cable = MockCable::bit_level();
        let mut instream = [0u32; 1];
        read_write_stream(&mut cable, &[0xF], &mut instream, 4, true).unwrap();

        assert_eq!(cable.packets.len(), 4);
        assert_eq!(cable.packets[3], Packet::TDO | Packet::TMS);
        assert!(cable.packets[..3].iter().all(|p| *p == Packet::TDO));
        assert_eq!(instream[0], 0xF);
    }

    #[test]
    fn zero_length_is_a_noop() {
        let mut cable = MockCable::default();
        write_stream(&mut cable, &[], 0, true).unwrap();
        read_write_stream(&mut cable, &[], &mut [], 0, true).unwrap();
        assert!(cable.words.is_empty());
    }

    #[test]
    fn short_buffers_are_rejected_before_shifting() {
        let mut cable = MockCable::default();
        let err = write_stream(&mut cable, &[0], 33, false).unwrap_err();
        assert!(matches!(err, Error::StreamTooShort { len_bits: 33, words: 1 }));

        let mut instream = [0u32; 1];
        let err = read_write_stream(&mut cable, &[0, 0], &mut instream, 40, false).unwrap_err();
        assert!(matches!(err, Error::StreamTooShort { len_bits: 40, words: 1 }));
        assert!(cable.words.is_empty());
    }

    #[test]
    fn failure_reports_first_bit_and_keeps_shifting() {
        let mut cable = MockCable::loopback();
        // bit 5's clock-high phase, then bit 9's data phase
        cable.fail_at = Some(11);
        cable.also_fail_at = Some(18);

        let mut instream = [0u32; 1];
        let err = read_write_stream(&mut cable, &[0xFFF], &mut instream, 12, false).unwrap_err();

        match err {
            Error::Shift { bit, .. } => assert_eq!(bit, 5),
            other => panic!("unexpected error {:?}", other),
        }
        assert_eq!(cable.words.len(), 24);
        assert_eq!(instream[0], 0xFFF & !(1 << 5) & !(1 << 9));
    }
}
