use std::{
    error::Error as StdError,
    fmt::{self, Display, Formatter},
};

use crate::address::{AddressError, MissingRecipient};

/// Error type for email content
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Missing from in envelope
    MissingFrom,
    /// Missing to in envelope
    MissingTo,
    /// A sender or recipient could not be parsed
    InvalidAddress {
        /// The rejected input
        input: String,
        /// Why it was rejected
        source: AddressError,
    },
}

impl Display for Error {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Error::MissingFrom => fmt.write_str("missing source address, invalid envelope"),
            Error::MissingTo => fmt.write_str("missing destination address, invalid envelope"),
            Error::InvalidAddress { input, source } => {
                write!(fmt, "invalid address {input:?}: {source}")
            }
        }
    }
}

impl From<MissingRecipient> for Error {
    fn from(_: MissingRecipient) -> Error {
        Error::MissingTo
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::InvalidAddress { source, .. } => Some(source),
            Error::MissingFrom | Error::MissingTo => None,
        }
    }
}
