//! The SMTP transport sends emails using the SMTP protocol.
//!
//! One [`SmtpTransport::send_raw`] call runs one complete session on a
//! fresh connection:
//!
//! ```text
//! connect -> EHLO/HELO -> [STARTTLS + EHLO] -> [AUTH] -> MAIL FROM -> RCPT TO x N -> DATA -> QUIT
//! ```
//!
//! Phases never go backwards and the first failure ends the session. The
//! error carries the [`Phase`] it happened in, and a reply rejected by the
//! server keeps the server's own text. QUIT is attempted on every exit
//! path once the connection exists, and never replaces an earlier error.
//!
//! #### Security
//!
//! [`Tls`] selects between a plaintext session, an upgrade with
//! `STARTTLS` that fails when the server does not offer it, and implicit
//! TLS where the handshake happens before the server banner.
//!
//! ```rust,no_run
//! use std::str::FromStr;
//!
//! use gomtp::{
//!     address::{Address, Envelope},
//!     smtp::{authentication::Credentials, client::{Tls, TlsParameters}, SmtpTransport},
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let envelope = Envelope::new(
//!     Some(Address::from_str("from@example.com")?),
//!     vec![Address::from_str("to@example.com")?],
//! )?;
//!
//! let transport = SmtpTransport::builder("smtp.example.com")
//!     .port(587)
//!     .tls(Tls::Required(TlsParameters::new("smtp.example.com".to_owned())?))
//!     .credentials(Credentials::from(("user", "password")))
//!     .build();
//!
//! let response = transport.send_raw(&envelope, b"Subject: hi\r\n\r\nHello\r\n")?;
//! println!("{response}");
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

pub use self::{
    error::{Error, Phase},
    transport::{SmtpTransport, SmtpTransportBuilder},
};
use self::{
    authentication::{Credentials, Mechanism, DEFAULT_MECHANISMS},
    client::Tls,
    extension::ClientId,
};

pub mod authentication;
pub mod client;
pub mod commands;
mod error;
pub mod extension;
pub mod response;
mod transport;

/// Default smtp port
pub const SMTP_PORT: u16 = 25;
/// Default submission port
pub const SUBMISSION_PORT: u16 = 587;
/// Default submission over TLS port
///
/// https://tools.ietf.org/html/rfc8314
pub const SUBMISSIONS_PORT: u16 = 465;

/// Default timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
struct SmtpInfo {
    /// Name sent during EHLO
    hello_name: ClientId,
    /// Server we are connecting to
    server: String,
    /// Port to connect to
    port: u16,
    /// TLS security configuration
    tls: Tls,
    /// Mechanisms tried in order when the server advertises AUTH
    authentication: Vec<Mechanism>,
    /// Credentials
    credentials: Option<Credentials>,
    /// Bounds the TCP connect and every read and write
    timeout: Option<Duration>,
}

impl Default for SmtpInfo {
    fn default() -> Self {
        Self {
            server: "localhost".to_owned(),
            port: SMTP_PORT,
            hello_name: ClientId::default(),
            credentials: None,
            authentication: DEFAULT_MECHANISMS.into(),
            timeout: Some(DEFAULT_TIMEOUT),
            tls: Tls::None,
        }
    }
}
