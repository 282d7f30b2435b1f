//! Error type of the SMTP session

use std::{error::Error as StdError, fmt, io};

use crate::{
    smtp::response::{Code, Response, Severity},
    BoxError,
};

/// Why a session failed, and in which [`Phase`]
///
/// A reply refused by the server keeps the server's text as its source,
/// so `Display` shows it unchanged after the code.
pub struct Error {
    inner: Box<Inner>,
}

struct Inner {
    kind: Kind,
    phase: Option<Phase>,
    source: Option<BoxError>,
}

/// Step of the session an error was raised in
///
/// Phases run in declaration order and never go backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    /// TCP connect, implicit TLS handshake and the server banner
    Connect,
    /// EHLO, or HELO when EHLO is refused
    Greeting,
    /// STARTTLS command and the TLS upgrade that follows it
    StartTls,
    /// SASL exchange
    Auth,
    /// MAIL FROM
    Mail,
    /// RCPT TO, once per recipient
    Rcpt,
    /// DATA and the message content
    Data,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::Connect => "connect",
            Phase::Greeting => "greeting",
            Phase::StartTls => "starttls",
            Phase::Auth => "auth",
            Phase::Mail => "mail",
            Phase::Rcpt => "rcpt",
            Phase::Data => "data",
        })
    }
}

#[derive(Debug)]
pub(crate) enum Kind {
    /// The server answered with a `4yz` or `5yz` reply
    Rejected(Code),
    /// The server sent something that is not a reply
    Response,
    /// The session cannot go on with what the server offered
    Client,
    /// Server lacks an extension the configuration depends on
    Unsupported,
    /// Resolving or connecting to the server
    Connection,
    /// Reading or writing an established connection
    Network,
    Tls,
}

impl Error {
    fn new(kind: Kind, source: Option<BoxError>) -> Error {
        Error {
            inner: Box::new(Inner {
                kind,
                phase: None,
                source,
            }),
        }
    }

    /// Tags the error with the session phase it happened in
    ///
    /// The first tag wins, so an error raised deep inside a phase keeps
    /// its origin when it bubbles through an outer one.
    pub(crate) fn during(mut self, phase: Phase) -> Error {
        self.inner.phase = self.inner.phase.or(Some(phase));
        self
    }

    /// The session phase the error was raised in, if it happened inside a session
    pub fn phase(&self) -> Option<Phase> {
        self.inner.phase
    }

    /// The reply code, if the server refused a command
    pub fn status(&self) -> Option<Code> {
        match self.inner.kind {
            Kind::Rejected(code) => Some(code),
            _ => None,
        }
    }

    /// A `4yz` reply
    pub fn is_transient(&self) -> bool {
        self.severity() == Some(Severity::TransientFailure)
    }

    /// A `5yz` reply
    pub fn is_permanent(&self) -> bool {
        self.severity() == Some(Severity::PermanentFailure)
    }

    /// The server sent something that could not be parsed as a reply
    pub fn is_response(&self) -> bool {
        matches!(self.inner.kind, Kind::Response)
    }

    /// The client gave up, for example when no authentication mechanism fits
    pub fn is_client(&self) -> bool {
        matches!(self.inner.kind, Kind::Client)
    }

    pub fn is_tls(&self) -> bool {
        matches!(self.inner.kind, Kind::Tls)
    }

    /// Returns true if the server did not advertise a required extension
    pub fn is_unsupported(&self) -> bool {
        matches!(self.inner.kind, Kind::Unsupported)
    }

    /// Returns true if an i/o timeout appears anywhere in the source chain
    pub fn is_timeout(&self) -> bool {
        let mut source = self.source();

        while let Some(err) = source {
            if let Some(io_err) = err.downcast_ref::<io::Error>() {
                return matches!(
                    io_err.kind(),
                    io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
                );
            }
            source = err.source();
        }

        false
    }

    fn severity(&self) -> Option<Severity> {
        self.status().map(Code::severity)
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut builder = f.debug_struct("gomtp::smtp::Error");
        builder.field("kind", &self.inner.kind);
        if let Some(phase) = self.inner.phase {
            builder.field("phase", &phase);
        }
        if let Some(source) = &self.inner.source {
            builder.field("source", source);
        }
        builder.finish()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(phase) = self.inner.phase {
            write!(f, "{phase}: ")?;
        }

        match self.inner.kind {
            Kind::Rejected(code) => match code.severity() {
                Severity::TransientFailure => write!(f, "transient error ({code})")?,
                _ => write!(f, "permanent error ({code})")?,
            },
            Kind::Response => f.write_str("malformed reply")?,
            Kind::Client => f.write_str("client error")?,
            Kind::Unsupported => f.write_str("unsupported")?,
            Kind::Connection => f.write_str("connection error")?,
            Kind::Network => f.write_str("network error")?,
            Kind::Tls => f.write_str("tls error")?,
        }

        match &self.inner.source {
            Some(source) => write!(f, ": {source}"),
            None => Ok(()),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.inner
            .source
            .as_deref()
            .map(|e| e as &(dyn StdError + 'static))
    }
}

/// The server refused a command, its reply text becomes the source
pub(crate) fn rejected(response: &Response) -> Error {
    Error::new(
        Kind::Rejected(response.code()),
        Some(response.text().into()),
    )
}

pub(crate) fn response<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Response, Some(e.into()))
}

pub(crate) fn client<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Client, Some(e.into()))
}

pub(crate) fn unsupported<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Unsupported, Some(e.into()))
}

pub(crate) fn connection<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Connection, Some(e.into()))
}

pub(crate) fn network<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Network, Some(e.into()))
}

pub(crate) fn tls<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Tls, Some(e.into()))
}
