//! Builds the plain text messages sent by gomtp
//!
//! ## Usage
//!
//! ```rust
//! use gomtp::message::Message;
//!
//! # use std::error::Error;
//! # fn main() -> Result<(), Box<dyn Error>> {
//! let m = Message::builder()
//!     .from("NoBody <nobody@domain.tld>".parse()?)
//!     .to("Hei <hei@domain.tld>".parse()?)
//!     .cc("Yuin <yuin@domain.tld>".parse()?)
//!     .subject("Happy new year")
//!     .body("Be happy!")?;
//! # Ok(())
//! # }
//! ```
//!
//! Which produces:
//!
//! ```sh
//! Date: Sat, 12 Dec 2020 16:33:19 -0000
//! From: NoBody <nobody@domain.tld>
//! To: Hei <hei@domain.tld>
//! Cc: Yuin <yuin@domain.tld>
//! Subject: Happy new year
//! Message-ID: <5c9e3f0c-7b5e-4a4a-9d1e-2f4bb1b8a0a4@domain.tld>
//! MIME-Version: 1.0
//! Content-Type: text/plain; charset=utf-8
//! Content-Transfer-Encoding: 7bit
//!
//! Be happy!
//! ```
//!
//! The unicode header data is encoded using _UTF8-Base64_ encoding, when necessary.
//!
//! The `Content-Transfer-Encoding` is chosen based on the best encoding
//! available for the given body, between `7bit`, `quoted-printable` and `base64`.

pub use body::Body;
pub use mailbox::Mailbox;

mod body;
pub mod header;
mod mailbox;

use uuid::Uuid;

use crate::{
    address::{AddressError, Envelope},
    message::header::{Date, Headers},
    Error as EmailError,
};

/// A builder for messages
#[derive(Debug, Clone, Default)]
pub struct MessageBuilder {
    headers: Headers,
}

impl MessageBuilder {
    /// Creates a new default message builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `Date` header to message
    ///
    /// The current time is used when not set.
    pub fn date(mut self, date: Date) -> Self {
        self.headers.set_date(date);
        self
    }

    /// Set `Subject` header to message
    pub fn subject<S: Into<String>>(mut self, subject: S) -> Self {
        self.headers.set_subject(subject);
        self
    }

    /// Set `From` header to message
    pub fn from(mut self, mbox: Mailbox) -> Self {
        self.headers.set_from(mbox);
        self
    }

    /// Set `To` header to message
    pub fn to(mut self, mbox: Mailbox) -> Self {
        self.headers.set_to(mbox);
        self
    }

    /// Add a mailbox to the `Cc` header
    pub fn cc(mut self, mbox: Mailbox) -> Self {
        let mut cc = self.headers.cc().to_vec();
        cc.push(mbox);
        self.headers.set_cc(cc);
        self
    }

    /// Set `Message-ID` header to message
    ///
    /// When not set, a random one is generated on the domain of the
    /// `From` address.
    pub fn message_id(mut self, id: String) -> Self {
        self.headers.set_message_id(id);
        self
    }

    /// Create [`Message`] using a plain text body
    ///
    /// Automatically gets encoded with `7bit`, `quoted-printable` or `base64`
    /// `Content-Transfer-Encoding`, based on the most efficient and valid encoding
    /// for `body`.
    pub fn body<S: Into<String>>(mut self, body: S) -> Result<Message, EmailError> {
        let body = Body::new(body);

        let Some(from) = self.headers.from() else {
            return Err(EmailError::MissingFrom);
        };
        if self.headers.message_id().is_none() {
            let id = format!("<{}@{}>", Uuid::new_v4(), from.email.domain());
            self.headers.set_message_id(id);
        }
        if self.headers.date().is_none() {
            self.headers.set_date(Date::now());
        }
        self.headers.set_content_transfer_encoding(body.encoding());

        let envelope = Envelope::try_from(&self.headers)?;
        Ok(Message {
            headers: self.headers,
            body: body.into_vec(),
            envelope,
        })
    }
}

/// Email message which can be formatted
#[derive(Clone, Debug)]
pub struct Message {
    headers: Headers,
    body: Vec<u8>,
    envelope: Envelope,
}

impl Message {
    /// Create a new message builder without headers
    pub fn builder() -> MessageBuilder {
        MessageBuilder::new()
    }

    /// Get the headers from the Message
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Get `Message` envelope
    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    /// Get message content formatted for SMTP
    pub fn formatted(&self) -> Vec<u8> {
        let headers = self.headers.to_string();

        let mut out = Vec::with_capacity(headers.len() + 2 + self.body.len());
        out.extend_from_slice(headers.as_bytes());
        out.extend_from_slice(b"\r\n");
        out.extend_from_slice(&self.body);
        out
    }
}

/// The fields of the message to send, after defaults and overrides
/// have been applied
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageEnvelope {
    /// `From` mailbox
    pub from: String,
    /// Primary recipient
    pub to: String,
    /// Copy recipients, empty entries are ignored
    pub cc: Vec<String>,
    pub subject: String,
    /// Plain text body
    pub body: String,
}

impl MessageEnvelope {
    /// Builds the message, the envelope recipients are `to` followed by
    /// every `cc` entry
    pub fn compose(&self) -> Result<Message, EmailError> {
        if self.from.trim().is_empty() {
            return Err(EmailError::MissingFrom);
        }

        let mut builder = Message::builder()
            .from(mailbox(&self.from)?)
            .subject(self.subject.as_str());
        if !self.to.trim().is_empty() {
            builder = builder.to(mailbox(&self.to)?);
        }
        for cc in self.cc.iter().filter(|cc| !cc.trim().is_empty()) {
            builder = builder.cc(mailbox(cc)?);
        }

        builder.body(self.body.as_str())
    }
}

fn mailbox(input: &str) -> Result<Mailbox, EmailError> {
    input
        .parse()
        .map_err(|source: AddressError| EmailError::InvalidAddress {
            input: input.to_owned(),
            source,
        })
}
