//! Implement the `Cable` trait for Altera USB Blaster and clones, driven in bit-bang mode.
//!
//! Each byte sent to the blaster sets the output lines; setting `READ_CMD` makes it answer with
//! one byte holding the sampled TDO.  Output-only bytes are buffered until something needs an
//! answer or the cable is flushed.
use crate::cable::{Cable, CableOption};
use crate::error::{Error, Result};
use crate::signal::SignalWord;

use alloc::string::String;
use alloc::vec::Vec;
use libftd2xx::{Ftdi, FtdiCommon};

const TCK: u8 = 1 << 0;
const TMS: u8 = 1 << 1;
const N_CE: u8 = 1 << 2;
const N_CS: u8 = 1 << 3;
const TDI: u8 = 1 << 4;
const OE: u8 = 1 << 5;
const READ_CMD: u8 = 1 << 6;

const TDO: u8 = 1 << 0;

// FT245 FIFO depth
const MAX_BUFFER: usize = 64;

const OPTIONS: &[CableOption] = &[
    CableOption { code: 'd', name: "description", help: "USB description of the blaster" },
];

/// The byte pipe to a blaster
pub trait BlasterPort: Sized {
    fn open(description: &str, vid_pid: Option<(u16, u16)>) -> Result<Self>;
    fn send(&mut self, data: &[u8]) -> Result<()>;
    fn recv(&mut self, data: &mut [u8]) -> Result<()>;
}

impl BlasterPort for Ftdi {
    fn open(description: &str, vid_pid: Option<(u16, u16)>) -> Result<Self> {
        if let Some((vid, pid)) = vid_pid {
            libftd2xx::set_vid_pid(vid, pid)?;
        }
        let mut ft = Ftdi::with_description(description)?;
        ft.purge_all()?;
        Ok(ft)
    }

    fn send(&mut self, data: &[u8]) -> Result<()> {
        self.write_all(data)?;
        Ok(())
    }

    fn recv(&mut self, data: &mut [u8]) -> Result<()> {
        self.read_all(data)?;
        Ok(())
    }
}

pub struct UsbBlaster<P = Ftdi> {
    description: String,
    vid_pid: Option<(u16, u16)>,
    ft: Option<P>,
    buffer: Vec<u8>,
}

impl Default for UsbBlaster {
    fn default() -> Self {
        Self::new("USB-JTAG-IF")
    }
}

impl UsbBlaster {
    /// Create a new UsbBlaster for the clone with VID:PID 16c0:06ad.  Nothing is opened until
    /// `init`.
    pub fn new(description: &str) -> Self {
        Self::unopened(description, Some((0x16c0, 0x06ad)))
    }

    /// An original Altera blaster, which the D2XX driver already knows about
    pub fn altera() -> Self {
        Self::unopened("USB-Blaster", None)
    }
}

impl<P: BlasterPort> UsbBlaster<P> {
    fn unopened(description: &str, vid_pid: Option<(u16, u16)>) -> Self {
        Self {
            description: description.into(),
            vid_pid,
            ft: None,
            buffer: Vec::new(),
        }
    }

    fn encode(word: SignalWord) -> u8 {
        // TRST is not wired on the blaster
        let mut byte = OE | N_CE | N_CS;
        if word.contains(SignalWord::TCLK) {
            byte |= TCK;
        }
        if word.contains(SignalWord::TMS) {
            byte |= TMS;
        }
        if word.contains(SignalWord::TDI) {
            byte |= TDI;
        }
        byte
    }

    fn ft(&mut self) -> Result<&mut P> {
        self.ft.as_mut().ok_or(Error::NotInitialized)
    }

    fn send_buffer(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let buffer = core::mem::take(&mut self.buffer);
        self.ft()?.send(&buffer)
    }
}

impl<P: BlasterPort> Cable for UsbBlaster<P> {
    fn init(&mut self) -> Result<()> {
        self.ft = Some(P::open(&self.description, self.vid_pid)?);
        self.buffer.clear();
        log::debug!("opened USB Blaster {:?}", self.description);
        Ok(())
    }

    fn options(&self) -> &'static [CableOption] {
        OPTIONS
    }

    fn parse_option(&mut self, code: char, value: &str) -> Result<()> {
        match code {
            'd' => {
                self.description = value.into();
                Ok(())
            }
            _ => Err(Error::UnknownOption(code)),
        }
    }

    fn out(&mut self, word: SignalWord) -> Result<()> {
        if self.ft.is_none() {
            return Err(Error::NotInitialized);
        }
        self.buffer.push(Self::encode(word));
        if self.buffer.len() >= MAX_BUFFER {
            self.send_buffer()?;
        }
        Ok(())
    }

    fn inout(&mut self, word: SignalWord) -> Result<bool> {
        if self.ft.is_none() {
            return Err(Error::NotInitialized);
        }
        self.buffer.push(Self::encode(word) | READ_CMD);
        self.send_buffer()?;

        let mut recv = [0; 1];
        self.ft()?.recv(&mut recv)?;
        Ok(recv[0] & TDO != 0)
    }

    fn flush(&mut self) -> Result<()> {
        self.send_buffer()
    }
}
