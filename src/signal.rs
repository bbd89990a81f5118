//! Encoding of the TAP output lines.
//!
//! Callers describe one bit transfer with a [`Packet`]. The bit-bang layer turns that into a
//! [`SignalWord`], the packed state of the four output lines a cable driver puts on the wire.
use bitflags::bitflags;

bitflags! {
    /// Caller-facing flags for a single bit transfer.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Packet: u8 {
        /// Data bit for this clock.
        ///
        /// Note the name: this flag is what the target will see on its TDI input, so it drives
        /// [`SignalWord::TDI`]. Drivers and the stream layer have always called it `TDO`, and it
        /// is kept that way until a hardware trace settles which end of the wire the name is
        /// meant to describe.
        const TDO  = 0x01;
        /// Drive TMS high for this clock
        const TMS  = 0x02;
        /// Assert the (active low) TRST line for this clock
        const TRST = 0x04;
    }
}

bitflags! {
    /// Packed state of the TAP output lines at one clock phase.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SignalWord: u8 {
        const TCLK = 0x01;
        /// Active low: set means the target is *not* held in reset
        const TRST = 0x02;
        const TDI  = 0x04;
        const TMS  = 0x08;
    }
}

impl Packet {
    /// Packet carrying a single data bit and nothing else
    pub fn data(bit: bool) -> Self {
        if bit {
            Packet::TDO
        } else {
            Packet::empty()
        }
    }
}

impl From<Packet> for SignalWord {
    /// Encode the data phase of a bit transfer. The clock is left low; TRST is released unless
    /// the packet asks for reset.
    fn from(packet: Packet) -> Self {
        let mut word = SignalWord::TRST;

        if packet.contains(Packet::TDO) {
            word |= SignalWord::TDI;
        }
        if packet.contains(Packet::TMS) {
            word |= SignalWord::TMS;
        }
        if packet.contains(Packet::TRST) {
            word.remove(SignalWord::TRST);
        }
        word
    }
}

impl SignalWord {
    /// The same line state with the clock raised
    pub fn clock_high(self) -> Self {
        self | SignalWord::TCLK
    }

    /// Whether the reset line is being held low
    pub fn in_reset(self) -> bool {
        !self.contains(SignalWord::TRST)
    }
}
