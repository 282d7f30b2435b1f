//! Client commands, written to the wire with `Display`

use std::fmt::{self, Debug, Display, Formatter};

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::{
    address::Address,
    smtp::{
        authentication::{Credentials, Mechanism},
        error::{self, Error},
        extension::ClientId,
        response::Response,
    },
};

/// Every command of a session except the SASL exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command<'a> {
    Ehlo(&'a ClientId),
    Helo(&'a ClientId),
    StartTls,
    /// `MAIL FROM`, an empty sender gives the null reverse path `<>`
    Mail {
        from: Option<&'a Address>,
        parameters: &'a [MailParameter],
    },
    Rcpt(&'a Address),
    Data,
    Quit,
}

impl Display for Command<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Command::Ehlo(id) => write!(f, "EHLO {id}")?,
            Command::Helo(id) => write!(f, "HELO {id}")?,
            Command::StartTls => f.write_str("STARTTLS")?,
            Command::Mail { from, parameters } => {
                f.write_str("MAIL FROM:<")?;
                if let Some(from) = from {
                    Display::fmt(from, f)?;
                }
                f.write_str(">")?;
                for parameter in *parameters {
                    write!(f, " {parameter}")?;
                }
            }
            Command::Rcpt(to) => write!(f, "RCPT TO:<{to}>")?,
            Command::Data => f.write_str("DATA")?,
            Command::Quit => f.write_str("QUIT")?,
        }
        f.write_str("\r\n")
    }
}

/// A `MAIL FROM` parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailParameter {
    /// `BODY=8BITMIME`, [RFC 6152](https://tools.ietf.org/html/rfc6152)
    EightBitMime,
    /// `SMTPUTF8`, [RFC 6531](https://tools.ietf.org/html/rfc6531)
    SmtpUtf8,
}

impl Display for MailParameter {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MailParameter::EightBitMime => "BODY=8BITMIME",
            MailParameter::SmtpUtf8 => "SMTPUTF8",
        })
    }
}

/// One client line of a SASL exchange
///
/// `Display` gives the line with the encoded secret. Logs get
/// [`Auth::redacted`], and so does `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct Auth {
    line: String,
    redacted: String,
}

impl Auth {
    /// The `AUTH` command opening the exchange
    pub fn start(mechanism: Mechanism, credentials: &Credentials) -> Auth {
        match mechanism.initial_response(credentials) {
            Some(response) => Auth {
                line: format!("AUTH {mechanism} {}", STANDARD.encode(response)),
                redacted: format!("AUTH {mechanism} <redacted>"),
            },
            None => Auth {
                line: format!("AUTH {mechanism}"),
                redacted: format!("AUTH {mechanism}"),
            },
        }
    }

    /// Answers a `334` reply carrying a base64 challenge
    pub fn answer(
        mechanism: Mechanism,
        credentials: &Credentials,
        challenge: &Response,
    ) -> Result<Auth, Error> {
        if !challenge.has_code(334) {
            return Err(error::response(format!(
                "expected a 334 challenge, got {}",
                challenge.code()
            )));
        }

        let encoded = challenge.first_word().unwrap_or_default();
        let decoded = STANDARD
            .decode(encoded)
            .ok()
            .and_then(|bytes| String::from_utf8(bytes).ok())
            .ok_or_else(|| error::response(format!("undecodable challenge {encoded:?}")))?;
        tracing::debug!("auth challenge: {decoded}");

        let answer = mechanism.answer(credentials, &decoded)?;
        Ok(Auth {
            line: STANDARD.encode(answer),
            redacted: "<redacted>".to_owned(),
        })
    }

    pub fn redacted(&self) -> &str {
        &self.redacted
    }
}

impl Display for Auth {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}\r\n", self.line)
    }
}

impl Debug for Auth {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Auth").field(&self.redacted).finish()
    }
}
