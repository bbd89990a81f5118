//! Implement the `Cable` trait for FTDI FT232R-based adapters in synchronous bit-bang mode
use crate::cable::{parse_number, Cable, CableOption};
use crate::error::{Error, Result};
use crate::signal::SignalWord;

use alloc::string::String;
use libftd2xx::{BitMode, Ftdi, FtdiCommon};

const OPTIONS: &[CableOption] = &[
    CableOption { code: 'd', name: "description", help: "USB description of the adapter" },
    CableOption { code: 'b', name: "baud", help: "bit-bang baud rate" },
    CableOption { code: 'c', name: "tck", help: "pin number driving TCK" },
    CableOption { code: 'i', name: "tdi", help: "pin number driving TDI" },
    CableOption { code: 'o', name: "tdo", help: "pin number sampling TDO" },
    CableOption { code: 'm', name: "tms", help: "pin number driving TMS" },
    CableOption { code: 'r', name: "trst", help: "pin number driving nTRST" },
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ft232rConfig {
    /// Value passed to `Ftdi::with_description` to select which hardware to use
    pub description: String,
    /// Non-standard VID/PID to register with the D2XX driver before opening
    pub vid_pid: Option<(u16, u16)>,
    pub baud: u32,
    pub tck: u8,
    pub tdi: u8,
    pub tdo: u8,
    pub tms: u8,
    pub trst: Option<u8>,
}

impl Default for Ft232rConfig {
    /// The usual FT232R wiring: TCK on TXD, TDI on RXD, nTRST on RTS, TDO on CTS, TMS on DTR
    fn default() -> Self {
        Self {
            description: "FT232R USB UART".into(),
            vid_pid: None,
            baud: 1_000_000,
            tck: 0,
            tdi: 1,
            trst: Some(2),
            tdo: 3,
            tms: 4,
        }
    }
}

pub struct Ft232r {
    config: Ft232rConfig,
    ft: Option<Ftdi>,
}

impl Default for Ft232r {
    fn default() -> Self {
        Self::new(Ft232rConfig::default())
    }
}

impl Ft232r {
    /// Create a new Ft232r.  Nothing is opened until `init`.
    pub fn new(config: Ft232rConfig) -> Self {
        Self { config, ft: None }
    }

    /// The JTAG port of an EasyFlash 3 cartridge
    pub fn easyflash3() -> Self {
        Self::new(Ft232rConfig {
            description: "EasyFlash 3".into(),
            vid_pid: Some((0x0403, 0x8738)),
            tck: 2,
            tdi: 0,
            tdo: 3,
            tms: 1,
            trst: None,
            ..Default::default()
        })
    }

    pub fn config(&self) -> &Ft232rConfig {
        &self.config
    }

    fn output_mask(&self) -> u8 {
        let c = &self.config;
        let trst = c.trst.map_or(0, |pin| 1 << pin);
        1 << c.tck | 1 << c.tdi | 1 << c.tms | trst
    }

    fn encode(&self, word: SignalWord) -> u8 {
        let c = &self.config;
        let mut byte = 0;
        if word.contains(SignalWord::TCLK) {
            byte |= 1 << c.tck;
        }
        if word.contains(SignalWord::TDI) {
            byte |= 1 << c.tdi;
        }
        if word.contains(SignalWord::TMS) {
            byte |= 1 << c.tms;
        }
        if let Some(pin) = c.trst {
            if word.contains(SignalWord::TRST) {
                byte |= 1 << pin;
            }
        }
        byte
    }

    // In synchronous bit-bang mode every byte written clocks one sample of the pins back
    fn transfer(&mut self, word: SignalWord) -> Result<u8> {
        let byte = self.encode(word);
        let ft = self.ft.as_mut().ok_or(Error::NotInitialized)?;

        let mut recv = [0; 1];
        ft.write_all(&[byte])?;
        ft.read_all(&mut recv)?;
        Ok(recv[0])
    }
}

fn parse_pin(code: char, value: &str) -> Result<u8> {
    match parse_number(code, value)? {
        pin @ 0..=7 => Ok(pin as u8),
        _ => Err(Error::InvalidOption { code, value: value.into() }),
    }
}

impl Cable for Ft232r {
    fn init(&mut self) -> Result<()> {
        if let Some((vid, pid)) = self.config.vid_pid {
            libftd2xx::set_vid_pid(vid, pid)?;
        }
        let mut ft = Ftdi::with_description(&self.config.description)?;
        ft.set_baud_rate(self.config.baud)?;
        ft.set_bit_mode(self.output_mask(), BitMode::SyncBitbang)?;
        ft.purge_all()?;
        log::debug!("opened FT232R {:?} at {} baud", self.config.description, self.config.baud);

        self.ft = Some(ft);
        Ok(())
    }

    fn options(&self) -> &'static [CableOption] {
        OPTIONS
    }

    fn parse_option(&mut self, code: char, value: &str) -> Result<()> {
        match code {
            'd' => self.config.description = value.into(),
            'b' => self.config.baud = parse_number(code, value)?,
            'c' => self.config.tck = parse_pin(code, value)?,
            'i' => self.config.tdi = parse_pin(code, value)?,
            'o' => self.config.tdo = parse_pin(code, value)?,
            'm' => self.config.tms = parse_pin(code, value)?,
            'r' => self.config.trst = Some(parse_pin(code, value)?),
            _ => return Err(Error::UnknownOption(code)),
        }
        Ok(())
    }

    fn out(&mut self, word: SignalWord) -> Result<()> {
        self.transfer(word).map(|_| ())
    }

    fn inout(&mut self, word: SignalWord) -> Result<bool> {
        let sample = self.transfer(word)?;
        Ok(sample & (1 << self.config.tdo) != 0)
    }
}
