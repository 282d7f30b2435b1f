//! Headers of a plain text message

use std::{
    fmt::{Display, Formatter, Result as FmtResult, Write},
    time::SystemTime,
};

use email_encoding::headers::{rfc2047, writer::EmailWriter};
use httpdate::HttpDate;

use super::Mailbox;

/// `Content-Transfer-Encoding` of a message body
///
/// Defined in [RFC2045](https://tools.ietf.org/html/rfc2045#section-6)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentTransferEncoding {
    SevenBit,
    QuotedPrintable,
    Base64,
}

impl Display for ContentTransferEncoding {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(match *self {
            Self::SevenBit => "7bit",
            Self::QuotedPrintable => "quoted-printable",
            Self::Base64 => "base64",
        })
    }
}

/// Message `Date` header
///
/// Defined in [RFC2822](https://tools.ietf.org/html/rfc2822#section-3.3)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Date(HttpDate);

impl Date {
    /// Build a `Date` from [`SystemTime`]
    pub fn new(st: SystemTime) -> Self {
        Self(st.into())
    }

    /// Get the current date
    pub fn now() -> Self {
        Self::new(SystemTime::now())
    }
}

impl Display for Date {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let s = self.0.to_string();
        match s.strip_suffix("GMT") {
            // `GMT` is an obsolete zone for email
            // https://tools.ietf.org/html/rfc2822#appendix-A.6.2
            Some(s) => write!(f, "{s}-0000"),
            None => f.write_str(&s),
        }
    }
}

impl From<SystemTime> for Date {
    fn from(st: SystemTime) -> Self {
        Self::new(st)
    }
}

/// The headers of a plain text message
///
/// Only the fields a single part text message needs are supported, they
/// are always rendered in the same order.
#[derive(Debug, Clone, Default)]
pub struct Headers {
    date: Option<Date>,
    from: Option<Mailbox>,
    to: Option<Mailbox>,
    cc: Vec<Mailbox>,
    subject: Option<String>,
    message_id: Option<String>,
    content_transfer_encoding: Option<ContentTransferEncoding>,
}

impl Headers {
    /// Create an empty set of headers
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_date(&mut self, date: Date) {
        self.date = Some(date);
    }

    pub fn set_from(&mut self, from: Mailbox) {
        self.from = Some(from);
    }

    pub fn set_to(&mut self, to: Mailbox) {
        self.to = Some(to);
    }

    /// Replaces the whole `Cc` list
    pub fn set_cc(&mut self, cc: Vec<Mailbox>) {
        self.cc = cc;
    }

    pub fn set_subject<S: Into<String>>(&mut self, subject: S) {
        self.subject = Some(subject.into());
    }

    /// `id` is written as is, including its angle brackets
    pub fn set_message_id(&mut self, id: String) {
        self.message_id = Some(id);
    }

    pub(super) fn set_content_transfer_encoding(&mut self, encoding: ContentTransferEncoding) {
        self.content_transfer_encoding = Some(encoding);
    }

    pub fn date(&self) -> Option<&Date> {
        self.date.as_ref()
    }

    pub fn from(&self) -> Option<&Mailbox> {
        self.from.as_ref()
    }

    pub fn to(&self) -> Option<&Mailbox> {
        self.to.as_ref()
    }

    pub fn cc(&self) -> &[Mailbox] {
        &self.cc
    }

    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    pub fn message_id(&self) -> Option<&str> {
        self.message_id.as_deref()
    }

    pub fn content_transfer_encoding(&self) -> Option<ContentTransferEncoding> {
        self.content_transfer_encoding
    }
}

impl Display for Headers {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        if let Some(date) = &self.date {
            write!(f, "Date: {date}\r\n")?;
        }
        if let Some(from) = &self.from {
            write_header(f, "From", |w| from.encode(w))?;
        }
        if let Some(to) = &self.to {
            write_header(f, "To", |w| to.encode(w))?;
        }
        if !self.cc.is_empty() {
            write_header(f, "Cc", |w| {
                for (i, mailbox) in self.cc.iter().enumerate() {
                    if i > 0 {
                        w.write_char(',')?;
                        w.space();
                    }
                    mailbox.encode(w)?;
                }
                Ok(())
            })?;
        }
        if let Some(subject) = &self.subject {
            write_header(f, "Subject", |w| {
                if subject.bytes().all(|b| matches!(b, b' '..=b'~')) {
                    w.write_str(subject)
                } else {
                    rfc2047::encode(subject, w)
                }
            })?;
        }
        if let Some(id) = &self.message_id {
            write!(f, "Message-ID: {id}\r\n")?;
        }
        if let Some(encoding) = &self.content_transfer_encoding {
            f.write_str("MIME-Version: 1.0\r\n")?;
            f.write_str("Content-Type: text/plain; charset=utf-8\r\n")?;
            write!(f, "Content-Transfer-Encoding: {encoding}\r\n")?;
        }
        Ok(())
    }
}

/// Writes `name: value\r\n`, `value` knows how long the line already is
fn write_header<F>(f: &mut Formatter<'_>, name: &str, value: F) -> FmtResult
where
    F: FnOnce(&mut EmailWriter<'_>) -> FmtResult,
{
    write!(f, "{name}: ")?;
    {
        let mut w = EmailWriter::new(&mut *f, name.len() + 2, 0, false);
        value(&mut w)?;
    }
    f.write_str("\r\n")
}

#[cfg(test)]
mod test {
    use std::time::{Duration, SystemTime};

    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn format_date() {
        // Tue, 15 Nov 1994 08:12:31 GMT
        let date = Date::from(SystemTime::UNIX_EPOCH + Duration::from_secs(784887151));
        assert_eq!(date.to_string(), "Tue, 15 Nov 1994 08:12:31 -0000");
    }

    #[test]
    fn empty_headers() {
        assert_eq!(Headers::new().to_string(), "");
    }

    #[test]
    fn headers_order() {
        let mut headers = Headers::new();
        headers.set_content_transfer_encoding(ContentTransferEncoding::SevenBit);
        headers.set_subject("Hello");
        headers.set_cc(vec![
            "cc1@example.com".parse().unwrap(),
            "Second Copy <cc2@example.com>".parse().unwrap(),
        ]);
        headers.set_to("to@example.com".parse().unwrap());
        headers.set_from("Sender <from@example.com>".parse().unwrap());
        headers.set_message_id("<id@example.com>".to_owned());
        headers.set_date(Date::from(
            SystemTime::UNIX_EPOCH + Duration::from_secs(784887151),
        ));

        assert_eq!(
            headers.to_string(),
            concat!(
                "Date: Tue, 15 Nov 1994 08:12:31 -0000\r\n",
                "From: Sender <from@example.com>\r\n",
                "To: to@example.com\r\n",
                "Cc: cc1@example.com, \"Second Copy\" <cc2@example.com>\r\n",
                "Subject: Hello\r\n",
                "Message-ID: <id@example.com>\r\n",
                "MIME-Version: 1.0\r\n",
                "Content-Type: text/plain; charset=utf-8\r\n",
                "Content-Transfer-Encoding: 7bit\r\n",
            )
        );
    }

    #[test]
    fn empty_cc_is_omitted() {
        let mut headers = Headers::new();
        headers.set_to("to@example.com".parse().unwrap());
        headers.set_cc(vec![]);

        assert_eq!(headers.to_string(), "To: to@example.com\r\n");
    }

    #[test]
    fn non_ascii_subject_is_encoded() {
        let mut headers = Headers::new();
        headers.set_subject("яңа ел белән!");

        assert_eq!(
            headers.to_string(),
            "Subject: =?utf-8?b?0Y/So9CwINC10Lsg0LHQtdC705nQvSE=?=\r\n"
        );
    }

    fn decode_words(value: &str) -> String {
        use base64::{engine::general_purpose::STANDARD, Engine};

        let bytes = value
            .split("\r\n ")
            .flat_map(|word| {
                let encoded = word
                    .trim()
                    .strip_prefix("=?utf-8?b?")
                    .and_then(|w| w.strip_suffix("?="))
                    .unwrap();
                STANDARD.decode(encoded).unwrap()
            })
            .collect();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn long_subject_is_folded() {
        let subject = "Тестовое письмо от gomtp, проверка длинной темы";
        let mut headers = Headers::new();
        headers.set_subject(subject);

        let rendered = headers.to_string();
        let value = rendered
            .strip_prefix("Subject: ")
            .and_then(|v| v.strip_suffix("\r\n"))
            .unwrap();

        assert!(value.contains("\r\n "));
        for line in rendered.split("\r\n") {
            assert!(line.len() <= 76, "{line:?} is too long");
        }
        assert_eq!(decode_words(value), subject);
    }

    #[test]
    fn ascii_subject_is_kept() {
        let mut headers = Headers::new();
        headers.set_subject("GOMTP Test Subject");

        assert_eq!(headers.to_string(), "Subject: GOMTP Test Subject\r\n");
    }
}
