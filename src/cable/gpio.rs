//! Implement the `Cable` trait on plain GPIO pins through `embedded-hal`.  Everything above the
//! two raw primitives comes from the generic bit-bang routines.
use core::convert::Infallible;

use embedded_hal::{delay::DelayNs, digital::{self, ErrorType, InputPin, OutputPin, PinState}};

use crate::cable::{parse_number, Cable, CableOption};
use crate::error::{Error, Result};
use crate::signal::SignalWord;

const OPTIONS: &[CableOption] = &[
    CableOption { code: 'f', name: "freq", help: "TCK frequency in kHz" },
];

/// Stands in for the TRST pin on targets that don't wire it up
pub struct NoPin;

impl ErrorType for NoPin {
    type Error = Infallible;
}

impl OutputPin for NoPin {
    fn set_low(&mut self) -> core::result::Result<(), Infallible> {
        Ok(())
    }

    fn set_high(&mut self) -> core::result::Result<(), Infallible> {
        Ok(())
    }
}

fn pin_error<E: digital::Error>(e: E) -> Error {
    Error::Pin(e.kind())
}

pub struct Gpio<Clk, Tdi, Tdo, Tms, Trst, Delay> where Clk: OutputPin, Tdi: OutputPin, Tdo: InputPin, Tms: OutputPin, Trst: OutputPin, Delay: DelayNs {
    half_period: u32,
    delay: Delay,
    clock: Clk,
    tdi: Tdi,
    tdo: Tdo,
    tms: Tms,
    trst: Trst,
}

impl<Clk, Tdi, Tdo, Tms, Trst, Delay> Gpio<Clk, Tdi, Tdo, Tms, Trst, Delay> where Clk: OutputPin, Tdi: OutputPin, Tdo: InputPin, Tms: OutputPin, Trst: OutputPin, Delay: DelayNs {
    /// Create a new Gpio cable clocking TCK at `freq_khz`.  Pass `NoPin` for `trst` if the
    /// target has no TRST line.
    pub fn new(freq_khz: u32, clock: Clk, tdi: Tdi, tdo: Tdo, tms: Tms, trst: Trst, delay: Delay) -> Gpio<Clk, Tdi, Tdo, Tms, Trst, Delay> {
        Gpio { half_period: half_period(freq_khz), clock, tdi, tdo, tms, trst, delay }
    }

    // Data lines first so they are stable before the clock edge
    fn drive(&mut self, word: SignalWord) -> Result<()> {
        self.tdi.set_state(PinState::from(word.contains(SignalWord::TDI))).map_err(pin_error)?;
        self.tms.set_state(PinState::from(word.contains(SignalWord::TMS))).map_err(pin_error)?;
        self.trst.set_state(PinState::from(word.contains(SignalWord::TRST))).map_err(pin_error)?;
        self.clock.set_state(PinState::from(word.contains(SignalWord::TCLK))).map_err(pin_error)
    }
}

fn half_period(freq_khz: u32) -> u32 {
    let period_ns = 1_000_000 / freq_khz.max(1);
    period_ns / 2
}

impl<Clk, Tdi, Tdo, Tms, Trst, Delay> Cable for Gpio<Clk, Tdi, Tdo, Tms, Trst, Delay> where Clk: OutputPin, Tdi: OutputPin, Tdo: InputPin, Tms: OutputPin, Trst: OutputPin, Delay: DelayNs {
    fn init(&mut self) -> Result<()> {
        // clock starts low, TMS high keeps the TAPs where they are
        self.out(SignalWord::TRST | SignalWord::TMS)
    }

    fn options(&self) -> &'static [CableOption] {
        OPTIONS
    }

    fn parse_option(&mut self, code: char, value: &str) -> Result<()> {
        match code {
            'f' => {
                let freq = parse_number(code, value)?;
                if freq == 0 {
                    return Err(Error::InvalidOption { code, value: value.into() });
                }
                self.half_period = half_period(freq);
                Ok(())
            }
            _ => Err(Error::UnknownOption(code)),
        }
    }

    fn out(&mut self, word: SignalWord) -> Result<()> {
        self.drive(word)?;
        self.delay.delay_ns(self.half_period);
        Ok(())
    }

    fn inout(&mut self, word: SignalWord) -> Result<bool> {
        self.drive(word)?;
        // Sample the tdo line
        let bit = self.tdo.is_high().map_err(pin_error)?;
        self.delay.delay_ns(self.half_period);
        Ok(bit)
    }
}
