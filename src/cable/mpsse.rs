//! Implement the `Cable` trait for "jtagkey" compatible hardware adapters like the Bus Blaster.
//!
//! These run the FT2232's MPSSE engine, so whole streams are shifted by the chip instead of
//! being bit-banged: `write_stream` and `read_write_stream` are overridden, and commands are
//! buffered until a read needs an answer or the cable is flushed.  Single bits still go through
//! the generic routines, driving the pins as GPIOs.
use crate::bitbang::{stream_bit, words_for};
use crate::cable::{parse_number, Cable, CableOption};
use crate::error::{Error, Result};
use crate::signal::SignalWord;

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;
use std::time::Duration;

use libftd2xx::{Ft2232h, Ftdi, FtdiCommon, FtdiMpsse, MpsseCmdBuilder, MpsseCmdExecutor};
use ftdi_mpsse::{ClockTMS, ClockTMSOut};
use libftd2xx::{ClockBits, ClockBitsOut, ClockData, ClockDataOut};

// Commands queued before they are pushed to the adapter
const MAX_BUFFER: usize = 4096;
// Bytes per clock_data command
const MAX_CHUNK: usize = 4096;

pub struct Mpsse<T> {
    ft: T,
    // Data to send to the adapter
    buffer: Vec<u8>,
}

impl<T: FtdiMpsse + MpsseCmdExecutor> Mpsse<T>
    where Error: From<<T as MpsseCmdExecutor>::Error>
{
    pub fn new(mut ft: T, clock: u32) -> Result<Self>
    {
        ft.initialize_mpsse_default()?;
        ft.set_clock(clock)?;

        let builder = MpsseCmdBuilder::new()
            .disable_3phase_data_clocking()
            .disable_adaptive_data_clocking();
        ft.send(builder.as_slice())?;

        Ok(Self {
            ft,
            buffer: Vec::new(),
        })
    }
}

impl<T: MpsseCmdExecutor> Mpsse<T>
    where Error: From<<T as MpsseCmdExecutor>::Error>
{
    /// Queue commands that produce no response
    fn queue(&mut self, builder: MpsseCmdBuilder) -> Result<()> {
        let len = builder.as_slice().len();
        if len + self.buffer.len() > MAX_BUFFER {
            self.flush()?;
        }
        self.buffer.extend_from_slice(builder.as_slice());
        Ok(())
    }

    /// Send everything queued plus `builder`, and read back `read_bytes` bytes of response
    fn xfer(&mut self, builder: MpsseCmdBuilder, read_bytes: usize) -> Result<Vec<u8>> {
        let builder = builder.send_immediate();
        self.buffer.extend_from_slice(builder.as_slice());

        let mut recv = alloc::vec![0; read_bytes];
        let result = self.ft.xfer(&self.buffer, &mut recv);
        self.buffer.clear();
        result?;
        Ok(recv)
    }

    fn flush(&mut self) -> Result<()> {
        if !self.buffer.is_empty() {
            let result = self.ft.send(&self.buffer);
            self.buffer.clear();
            result?;
        }
        Ok(())
    }
}

/// Pack the first `bits` bits of a stream into bytes, LSB first
fn stream_bytes(stream: &[u32], bits: usize) -> Vec<u8> {
    (0..bits.div_ceil(8))
        .map(|i| (stream[i / 4] >> (8 * (i % 4))) as u8)
        .collect()
}

/// Build the commands shifting `len_bits` bits.  All but the last bit go out with clock_data /
/// clock_bits; the last one goes out with a TMS command so that TMS can rise with it.  Returns
/// the number of response bytes when `read` is set.
fn shift_commands(stream: &[u32], len_bits: usize, set_last_bit: bool, read: bool) -> (MpsseCmdBuilder, usize) {
    let body = len_bits - 1;
    let bytes = stream_bytes(stream, body);
    let (full, rem) = (body / 8, body % 8);
    let mut builder = MpsseCmdBuilder::new();
    let mut read_bytes = 0;

    for chunk in bytes[..full].chunks(MAX_CHUNK) {
        builder = if read {
            builder.clock_data(ClockData::LsbPosIn, chunk)
        } else {
            builder.clock_data_out(ClockDataOut::LsbNeg, chunk)
        };
        read_bytes += chunk.len();
    }

    if rem > 0 {
        builder = if read {
            builder.clock_bits(ClockBits::LsbPosIn, bytes[full], rem as u8)
        } else {
            builder.clock_bits_out(ClockBitsOut::LsbNeg, bytes[full], rem as u8)
        };
        read_bytes += 1;
    }

    let last_bit = stream_bit(stream, len_bits - 1);
    let tms = u8::from(set_last_bit);
    builder = if read {
        builder.clock_tms(ClockTMS::NegTMSPosTDO, tms, last_bit, 1)
    } else {
        builder.clock_tms_out(ClockTMSOut::NegEdge, tms, last_bit, 1)
    };
    read_bytes += 1;

    (builder, if read { read_bytes } else { 0 })
}

/// Unpack the response to `shift_commands` into `instream`.  Bits from clock_bits arrive in the
/// top of their byte, and the bit from the TMS command is bit 7 of the final byte.
fn unpack_response(recv: &[u8], instream: &mut [u32], len_bits: usize) {
    let body = len_bits - 1;
    let (full, rem) = (body / 8, body % 8);

    for word in instream[..words_for(len_bits)].iter_mut() {
        *word = 0;
    }

    let mut set = |i: usize, bit: bool| {
        if bit {
            instream[i / 32] |= 1 << (i % 32);
        }
    };

    for i in 0..full * 8 {
        set(i, (recv[i / 8] >> (i % 8)) & 1 != 0);
    }
    if rem > 0 {
        let partial = recv[full] >> (8 - rem);
        for b in 0..rem {
            set(full * 8 + b, (partial >> b) & 1 != 0);
        }
    }
    set(body, recv[recv.len() - 1] & 0x80 != 0);
}

fn check_len(stream: &[u32], len_bits: usize) -> Result<()> {
    if stream.len() < words_for(len_bits) {
        return Err(Error::StreamTooShort { len_bits, words: stream.len() });
    }
    Ok(())
}

// Lower pins
const PIN_TCK: u8 = 1;
const PIN_TDI: u8 = 1 << 1;
const PIN_TDO: u8 = 1 << 2;
const PIN_TMS: u8 = 1 << 3;
const PIN_N_OE: u8 = 1 << 4;
const LOWER_OUTPUT_PINS: u8 = PIN_TCK | PIN_TDI | PIN_TMS | PIN_N_OE;

// Upper pins
const PIN_N_TRST: u8 = 1;
const PIN_N_SRST: u8 = 1 << 1;
const PIN_N_TRST_OE: u8 = 1 << 2;
const PIN_N_SRST_OE: u8 = 1 << 3;
const UPPER_OUTPUT_PINS: u8 = PIN_N_TRST | PIN_N_SRST | PIN_N_TRST_OE | PIN_N_SRST_OE;

const OPTIONS: &[CableOption] = &[
    CableOption { code: 'd', name: "description", help: "USB description, without the interface letter" },
    CableOption { code: 'f', name: "freq", help: "TCK frequency in Hz" },
    CableOption { code: 'p', name: "port", help: "FT2232 interface, A or B" },
];

/// An MPSSE capable device the JtagKey can be opened on
pub trait MpssePort: MpsseCmdExecutor + Sized {
    /// Open the interface called `description` with TCK running at `clock` hertz
    fn open(description: &str, clock: u32) -> Result<Mpsse<Self>>;
}

impl MpssePort for Ft2232h {
    fn open(description: &str, clock: u32) -> Result<Mpsse<Self>> {
        let ft = Ftdi::with_description(description)?;
        let ft = Ft2232h::try_from(ft)?;
        let mut ft = Mpsse::new(ft, clock)?;
        ft.ft.set_latency_timer(Duration::from_millis(0))?;
        Ok(ft)
    }
}

pub struct JtagKey<T = Ft2232h> {
    description: String,
    clock: u32,
    primary: bool,
    ft: Option<Mpsse<T>>,
    // Last state driven on the GPIO pins
    lower: u8,
    upper: u8,
}

impl Default for JtagKey {
    fn default() -> Self {
        Self::new(1_000_000, true)
    }
}

impl JtagKey {
    /// Create a new JtagKey.  FT2232-based adapters like JtagKey have both an "A" interface and a
    /// "B" interface.  `primary` controls which to use. `clock` controls the speed of TCLK in hertz.
    /// The adapter is opened by `init`.
    pub fn new(clock: u32, primary: bool) -> Self {
        Self::unopened(clock, primary)
    }
}

impl<T: MpssePort> JtagKey<T>
    where Error: From<<T as MpsseCmdExecutor>::Error>
{
    fn unopened(clock: u32, primary: bool) -> Self {
        JtagKey {
            description: "Dual RS232-HS".into(),
            clock,
            primary,
            ft: None,
            lower: PIN_TMS,
            upper: PIN_N_TRST | PIN_N_SRST,
        }
    }

    fn device_description(&self) -> String {
        let port = if self.primary { 'A' } else { 'B' };
        format!("{} {}", self.description, port)
    }

    fn mpsse(&mut self) -> Result<&mut Mpsse<T>> {
        self.ft.as_mut().ok_or(Error::NotInitialized)
    }

    // The cached state only changes once the command is queued
    fn set_lower(&mut self, lower: u8) -> Result<()> {
        let builder = MpsseCmdBuilder::new().set_gpio_lower(lower, LOWER_OUTPUT_PINS);
        self.mpsse()?.queue(builder)?;
        self.lower = lower;
        Ok(())
    }

    fn set_upper(&mut self, upper: u8) -> Result<()> {
        let builder = MpsseCmdBuilder::new().set_gpio_upper(upper, UPPER_OUTPUT_PINS);
        self.mpsse()?.queue(builder)?;
        self.upper = upper;
        Ok(())
    }

    /// The MPSSE clocks out data on falling edges, so TCK has to be low before a shift starts.
    fn drop_clock(&mut self) -> Result<()> {
        if self.lower & PIN_TCK != 0 {
            self.set_lower(self.lower & !PIN_TCK)?;
        }
        Ok(())
    }

    /// After a shift TCK idles low and TDI/TMS hold the values of the last bit
    fn after_shift(&mut self, stream: &[u32], len_bits: usize, set_last_bit: bool) {
        let mut lower = self.lower & !(PIN_TCK | PIN_TDI | PIN_TMS);
        if stream_bit(stream, len_bits - 1) {
            lower |= PIN_TDI;
        }
        if set_last_bit {
            lower |= PIN_TMS;
        }
        self.lower = lower;
    }
}

fn encode_lower(word: SignalWord) -> u8 {
    // nOE stays low to enable the output buffers
    let mut lower = 0;
    if word.contains(SignalWord::TCLK) {
        lower |= PIN_TCK;
    }
    if word.contains(SignalWord::TDI) {
        lower |= PIN_TDI;
    }
    if word.contains(SignalWord::TMS) {
        lower |= PIN_TMS;
    }
    lower
}

impl<T: MpssePort> Cable for JtagKey<T>
    where Error: From<<T as MpsseCmdExecutor>::Error>
{
    fn init(&mut self) -> Result<()> {
        let description = self.device_description();
        self.ft = Some(T::open(&description, self.clock)?);
        log::debug!("opened {:?} with TCK at {} Hz", description, self.clock);

        self.set_upper(PIN_N_TRST | PIN_N_SRST)?;
        self.set_lower(PIN_TMS)?;
        self.flush()
    }

    fn options(&self) -> &'static [CableOption] {
        OPTIONS
    }

    fn parse_option(&mut self, code: char, value: &str) -> Result<()> {
        match code {
            'd' => self.description = value.into(),
            'f' => self.clock = parse_number(code, value)?,
            'p' => {
                self.primary = match value.trim() {
                    "A" | "a" => true,
                    "B" | "b" => false,
                    _ => return Err(Error::InvalidOption { code, value: value.into() }),
                }
            }
            _ => return Err(Error::UnknownOption(code)),
        }
        Ok(())
    }

    fn out(&mut self, word: SignalWord) -> Result<()> {
        let upper = if word.contains(SignalWord::TRST) {
            self.upper | PIN_N_TRST
        } else {
            self.upper & !PIN_N_TRST
        };
        if upper != self.upper {
            self.set_upper(upper)?;
        }
        self.set_lower(encode_lower(word))
    }

    fn inout(&mut self, word: SignalWord) -> Result<bool> {
        self.out(word)?;
        let recv = self.mpsse()?.xfer(MpsseCmdBuilder::new().gpio_lower(), 1)?;
        Ok(recv[0] & PIN_TDO != 0)
    }

    fn write_stream(&mut self, stream: &[u32], len_bits: usize, set_last_bit: bool) -> Result<()> {
        if len_bits == 0 {
            return Ok(());
        }
        check_len(stream, len_bits)?;
        self.drop_clock()?;

        let (builder, _) = shift_commands(stream, len_bits, set_last_bit, false);
        self.mpsse()?.queue(builder)?;
        self.after_shift(stream, len_bits, set_last_bit);
        Ok(())
    }

    fn read_write_stream(&mut self, outstream: &[u32], instream: &mut [u32], len_bits: usize, set_last_bit: bool) -> Result<()> {
        if len_bits == 0 {
            return Ok(());
        }
        check_len(outstream, len_bits)?;
        check_len(instream, len_bits)?;
        self.drop_clock()?;

        let (builder, read_bytes) = shift_commands(outstream, len_bits, set_last_bit, true);
        let recv = self.mpsse()?.xfer(builder, read_bytes)?;
        unpack_response(&recv, instream, len_bits);
        self.after_shift(outstream, len_bits, set_last_bit);
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        match self.ft.as_mut() {
            Some(ft) => ft.flush(),
            None => Ok(()),
        }
    }

    /// SRST sits on the upper bank next to TRST and is pushed out at once
    fn set_srst(&mut self, asserted: bool) -> Result<()> {
        let upper = if asserted {
            self.upper & !PIN_N_SRST
        } else {
            self.upper | PIN_N_SRST
        };
        self.set_upper(upper)?;
        self.flush()
    }
}
