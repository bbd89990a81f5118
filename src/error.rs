//! Error type shared by the dispatch layer, the generic bit-bang layer and the cable drivers.
use alloc::boxed::Box;
use alloc::string::String;

use embedded_hal::digital::ErrorKind;

/// Crate-wide result alias
pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The FTDI driver or device failed
    #[error(transparent)]
    Ftdi(#[from] FtdiError),

    /// A GPIO pin could not be driven or sampled
    #[error("GPIO pin error: {0}")]
    Pin(ErrorKind),

    /// A transfer was attempted before `init`
    #[error("cable has not been initialized")]
    NotInitialized,

    /// The cable has no such line or capability
    #[error("{0} is not supported by this cable")]
    Unsupported(&'static str),

    /// No cable with this name is registered
    #[error("unknown cable: {0}")]
    UnknownCable(String),

    /// The option code is not in the active cable's option table
    #[error("option '{0}' is not supported by this cable")]
    UnknownOption(char),

    /// No option with this long name in the active cable's option table
    #[error("option {0:?} is not supported by this cable")]
    UnknownOptionName(String),

    /// The option is known but its value could not be used
    #[error("invalid value {value:?} for option '{code}'")]
    InvalidOption { code: char, value: String },

    /// A bit stream buffer holds fewer words than `len_bits` needs
    #[error("stream of {words} words cannot hold {len_bits} bits")]
    StreamTooShort { len_bits: usize, words: usize },

    /// A multi-bit shift ran to completion but at least one bit failed; `bit` is the first one
    #[error("shift failed at bit {bit}: {source}")]
    Shift {
        bit: usize,
        #[source]
        source: Box<Error>,
    },
}

/// Failures reported through the D2XX driver
#[cfg(feature = "std")]
#[derive(Debug, thiserror::Error)]
pub enum FtdiError {
    #[error("FTDI driver error: {0}")]
    Status(#[from] libftd2xx::FtStatus),

    /// A read or write did not move the expected number of bytes
    #[error("FTDI transfer error: {0}")]
    Transfer(#[from] libftd2xx::TimeoutError),

    /// The opened device is not of the type the cable needs
    #[error("wrong FTDI device type: {0}")]
    DeviceType(#[from] libftd2xx::DeviceTypeError),
}

/// Without the std feature there are no FTDI cables, so there is nothing to report
#[cfg(not(feature = "std"))]
#[derive(Debug)]
pub enum FtdiError {}

#[cfg(not(feature = "std"))]
impl core::fmt::Display for FtdiError {
    fn fmt(&self, _: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match *self {}
    }
}

#[cfg(not(feature = "std"))]
impl core::error::Error for FtdiError {}

#[cfg(feature = "std")]
impl From<libftd2xx::FtStatus> for Error {
    fn from(e: libftd2xx::FtStatus) -> Self {
        Error::Ftdi(e.into())
    }
}

#[cfg(feature = "std")]
impl From<libftd2xx::TimeoutError> for Error {
    fn from(e: libftd2xx::TimeoutError) -> Self {
        Error::Ftdi(e.into())
    }
}

#[cfg(feature = "std")]
impl From<libftd2xx::DeviceTypeError> for Error {
    fn from(e: libftd2xx::DeviceTypeError) -> Self {
        Error::Ftdi(e.into())
    }
}
