#![allow(clippy::uninlined_format_args)]

//! Error related data structures to be shared and used.
//!
//! This module contains the [`Error`] enum, which is used to represent
//! errors that can occur within Gbxtal domain.

use std::fmt::{self, Display, Formatter};
use std::io;

/// Top level enum for error handling within Gbxtal.
///
/// Most of the time, you will want to use the `CustomError` variant
/// to provide a more detailed error message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    InvalidData,
    RomSize,
    IncompatibleBootRom,
    InvalidParameter(String),

    /// The ROM file is shorter than the size its header declares
    /// (`banks × 16 KiB`). Fatal: loading must not proceed.
    FileSizeMismatch,

    /// The cartridge type byte at 0x0147 names a mapper that is not
    /// implemented by this build. Fatal.
    UnsupportedMapper(u8),

    /// The RAM size byte at 0x0149 names a bank count this build
    /// cannot allocate for the selected mapper. Fatal.
    UnsupportedRamSize(u8),

    /// The header checksum at 0x014D does not match the bytes it
    /// covers. Non-fatal; load continues with a logged warning.
    ChecksumMismatch,

    /// The Nintendo logo bitmap at 0x0104-0x0133 does not match the
    /// canonical pattern. Non-fatal.
    LogoMismatch,

    /// The CPU fetched one of the eleven undefined LR35902 opcodes
    /// (D3, DB, DD, E3, E4, EB, EC, ED, F4, FC, FD). Traps to the
    /// debugger and halts execution without unwinding the process.
    UndefinedOpcode(u8),

    /// An RTC persistence read or write failed; the save proceeds
    /// with the RAM banks only and the RTC state is left untouched.
    RtcIoError,

    CustomError(String),
}

impl Error {
    pub fn description(&self) -> String {
        match self {
            Error::InvalidData => String::from("Invalid data format"),
            Error::RomSize => String::from("Invalid ROM size"),
            Error::IncompatibleBootRom => String::from("Incompatible Boot ROM"),
            Error::InvalidParameter(message) => format!("Invalid parameter: {}", message),
            Error::FileSizeMismatch => {
                String::from("ROM file size does not match the size declared in its header")
            }
            Error::UnsupportedMapper(kind) => {
                format!("Unsupported cartridge mapper (type=0x{:02x})", kind)
            }
            Error::UnsupportedRamSize(kind) => {
                format!("Unsupported cartridge RAM size (0x{:02x})", kind)
            }
            Error::ChecksumMismatch => String::from("Cartridge header checksum mismatch"),
            Error::LogoMismatch => String::from("Cartridge Nintendo logo mismatch"),
            Error::UndefinedOpcode(opcode) => {
                format!("Undefined opcode trapped (0x{:02x})", opcode)
            }
            Error::RtcIoError => String::from("Failed to persist or restore RTC state"),
            Error::CustomError(message) => String::from(message),
        }
    }

    /// Whether this error kind should prevent a cartridge from
    /// entering `run_for` altogether, as opposed to being surfaced
    /// through `debug_message` while execution continues.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::FileSizeMismatch | Error::UnsupportedMapper(_) | Error::UnsupportedRamSize(_)
        )
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

impl std::error::Error for Error {}

impl From<io::Error> for Error {
    fn from(value: io::Error) -> Self {
        Error::CustomError(format!("I/O error: {}", value))
    }
}
