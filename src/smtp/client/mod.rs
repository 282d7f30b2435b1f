//! SMTP client
//!
//! `SmtpConnection` allows manually sending SMTP commands.
//!
//! ```rust,no_run
//! use std::{str::FromStr, time::Duration};
//!
//! use gomtp::{
//!     address::Address,
//!     smtp::{client::SmtpConnection, commands::Command, extension::ClientId},
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let hello = ClientId::from("my_hostname");
//! let from = Address::from_str("user@example.com")?;
//! let to = Address::from_str("user@example.org")?;
//!
//! let mut client = SmtpConnection::connect(
//!     ("localhost", 25),
//!     Some(Duration::from_secs(10)),
//!     None,
//! )?;
//! client.ehlo(&hello)?;
//! client.command(Command::Mail { from: Some(&from), parameters: &[] })?;
//! client.command(Command::Rcpt(&to))?;
//! client.command(Command::Data)?;
//! client.message("Test email".as_bytes())?;
//! client.quit()?;
//! # Ok(())
//! # }
//! ```

pub use self::{
    connection::SmtpConnection,
    net::NetworkStream,
    tls::{CertificateInfo, Tls, TlsInfo, TlsParameters, TlsParametersBuilder},
};

mod connection;
mod net;
mod tls;

/// The codec used for transparency
#[derive(Debug, Clone, Copy)]
struct ClientCodec {
    escape_count: u8,
}

impl Default for ClientCodec {
    fn default() -> Self {
        // the message starts at the beginning of a line
        ClientCodec { escape_count: 2 }
    }
}

impl ClientCodec {
    /// Creates a new client codec
    fn new() -> Self {
        ClientCodec::default()
    }

    /// Adds transparency
    ///
    /// An empty frame ends the message with the `.` terminator line.
    fn encode(&mut self, frame: &[u8], buf: &mut Vec<u8>) {
        match frame.len() {
            0 => {
                match self.escape_count {
                    0 => buf.extend_from_slice(b"\r\n.\r\n"),
                    1 => buf.extend_from_slice(b"\n.\r\n"),
                    2 => buf.extend_from_slice(b".\r\n"),
                    _ => unreachable!(),
                }
                self.escape_count = 0;
            }
            _ => {
                let mut start = 0;
                for (idx, byte) in frame.iter().enumerate() {
                    match self.escape_count {
                        0 => self.escape_count = if *byte == b'\r' { 1 } else { 0 },
                        1 => {
                            self.escape_count = match *byte {
                                b'\n' => 2,
                                b'\r' => 1,
                                _ => 0,
                            }
                        }
                        2 => {
                            self.escape_count = match *byte {
                                b'.' => 3,
                                b'\r' => 1,
                                _ => 0,
                            }
                        }
                        _ => unreachable!(),
                    }
                    if self.escape_count == 3 {
                        self.escape_count = 0;
                        buf.extend_from_slice(&frame[start..idx]);
                        buf.extend_from_slice(b".");
                        start = idx;
                    }
                }
                buf.extend_from_slice(&frame[start..]);
            }
        }
    }
}

/// Returns the string replacing all the CRLF with "\<CRLF\>"
///
/// Used for debug displays
fn escape_crlf(string: &str) -> String {
    string.replace("\r\n", "<CRLF>")
}
