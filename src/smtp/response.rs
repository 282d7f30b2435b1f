//! Server replies
//!
//! A reply is one or more lines sharing the same three digit code. Every
//! line but the last has a `-` after the code. The text after the code is
//! optional, `250\r\n` is a complete reply.

use std::{
    fmt::{self, Display, Formatter},
    str::FromStr,
};

use nom::{
    branch::alt,
    bytes::streaming::{tag, take, take_until},
    character::streaming::char,
    combinator::{map_opt, peek, value},
    error::ErrorKind,
    sequence::terminated,
    IResult,
};

use crate::smtp::{error, Error};

/// What the first digit of a reply code says about the command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// `2yz`, the command succeeded
    Completed,
    /// `3yz`, the server waits for more input
    Intermediate,
    /// `4yz`, retrying later may work
    TransientFailure,
    /// `5yz`, retrying will not help
    PermanentFailure,
}

/// A reply code between `200` and `559`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Code(u16);

impl Code {
    /// Returns `None` for anything RFC 5321 does not define as a reply code
    pub fn new(value: u16) -> Option<Code> {
        let valid = (200..600).contains(&value) && (value / 10) % 10 <= 5;
        valid.then_some(Code(value))
    }

    pub fn severity(self) -> Severity {
        match self.0 / 100 {
            2 => Severity::Completed,
            3 => Severity::Intermediate,
            4 => Severity::TransientFailure,
            _ => Severity::PermanentFailure,
        }
    }
}

impl From<Code> for u16 {
    fn from(code: Code) -> Self {
        code.0
    }
}

impl Display for Code {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

/// A complete reply, with the text of each of its lines
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    code: Code,
    lines: Vec<String>,
}

impl Response {
    pub fn new(code: Code, lines: Vec<String>) -> Response {
        Response { code, lines }
    }

    pub fn code(&self) -> Code {
        self.code
    }

    /// `2yz` and `3yz` replies
    pub fn is_positive(&self) -> bool {
        matches!(
            self.code.severity(),
            Severity::Completed | Severity::Intermediate
        )
    }

    pub fn has_code(&self, code: u16) -> bool {
        u16::from(self.code) == code
    }

    /// Text of each line, without the code and separator
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    pub fn first_line(&self) -> Option<&str> {
        self.lines().next()
    }

    /// First word of the first line, the server name after EHLO or the
    /// challenge during AUTH
    pub fn first_word(&self) -> Option<&str> {
        self.first_line()
            .and_then(|line| line.split_whitespace().next())
    }

    /// The reply text exactly as the server sent it, lines joined with `\n`
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

impl Display for Response {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code, self.text())
    }
}

impl FromStr for Response {
    type Err = Error;

    fn from_str(s: &str) -> Result<Response, Error> {
        parse_response(s)
            .map(|(_, response)| response)
            .map_err(|e| error::response(e.to_string()))
    }
}

fn code(i: &str) -> IResult<&str, Code> {
    map_opt(take(3usize), |digits: &str| {
        if digits.bytes().all(|b| b.is_ascii_digit()) {
            digits.parse().ok().and_then(Code::new)
        } else {
            None
        }
    })(i)
}

/// `code ("-" / SP) text CRLF`, text may be missing on any line
///
/// Yields whether more lines follow.
fn reply_line(i: &str) -> IResult<&str, (Code, bool, &str)> {
    let (i, code) = code(i)?;
    let (i, more) = alt((
        value(true, char('-')),
        value(false, char(' ')),
        value(false, peek(tag("\r\n"))),
    ))(i)?;
    let (i, text) = terminated(take_until("\r\n"), tag("\r\n"))(i)?;

    Ok((i, (code, more, text)))
}

/// Parses one complete, possibly multi-line, reply
///
/// Returns `Incomplete` until the last line has been received, so callers
/// can keep appending to the buffer.
pub(crate) fn parse_response(mut i: &str) -> IResult<&str, Response> {
    let mut first: Option<Code> = None;
    let mut lines = Vec::new();

    loop {
        let (rest, (code, more, text)) = reply_line(i)?;
        if *first.get_or_insert(code) != code {
            return Err(nom::Err::Failure(nom::error::Error::new(
                i,
                ErrorKind::Verify,
            )));
        }
        lines.push(text.to_owned());
        i = rest;

        if !more {
            return Ok((i, Response { code, lines }));
        }
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    fn parse(raw: &str) -> Response {
        raw.parse().unwrap()
    }

    #[test]
    fn codes() {
        assert_eq!(Code::new(421).map(u16::from), Some(421));
        assert_eq!(Code::new(421).unwrap().to_string(), "421");
        assert_eq!(Code::new(354).unwrap().severity(), Severity::Intermediate);
        assert_eq!(Code::new(535).unwrap().severity(), Severity::PermanentFailure);
        assert_eq!(Code::new(199), None);
        assert_eq!(Code::new(260), None);
        assert_eq!(Code::new(600), None);
    }

    #[test]
    fn multi_line_reply() {
        let response = parse("250-me\r\n250-8BITMIME\r\n250-SIZE 42\r\n250 AUTH PLAIN LOGIN\r\n");

        assert!(response.has_code(250));
        assert_eq!(
            response.lines().collect::<Vec<_>>(),
            ["me", "8BITMIME", "SIZE 42", "AUTH PLAIN LOGIN"]
        );
        assert_eq!(response.first_word(), Some("me"));
    }

    #[test]
    fn text_is_optional() {
        let response = parse("250\r\n");
        assert!(response.has_code(250));
        assert_eq!(response.first_line(), Some(""));
        assert_eq!(response.first_word(), None);

        let response = parse("250-\r\n250-PIPELINING\r\n250\r\n");
        assert_eq!(
            response.lines().collect::<Vec<_>>(),
            ["", "PIPELINING", ""]
        );
    }

    #[test]
    fn malformed_replies() {
        assert!("2506-me\r\n250 ok\r\n".parse::<Response>().is_err());
        assert!("250-me\r\n251 AUTH PLAIN\r\n".parse::<Response>().is_err());
        assert!("25x ok\r\n".parse::<Response>().is_err());
        assert!("150 ok\r\n".parse::<Response>().is_err());
        assert!("250_ok\r\n".parse::<Response>().is_err());
    }

    #[test]
    fn incomplete_until_last_line() {
        for partial in ["", "25", "250", "250-smtp.example.org\r\n", "250 ok\r"] {
            assert!(
                matches!(parse_response(partial), Err(nom::Err::Incomplete(_))),
                "{partial:?}"
            );
        }
    }

    #[test]
    fn positive_replies() {
        assert!(parse("250 ok\r\n").is_positive());
        assert!(parse("334 VXNlcm5hbWU6\r\n").is_positive());
        assert!(!parse("450 mailbox busy\r\n").is_positive());
        assert!(!parse("535 5.7.8 Authentication failed\r\n").is_positive());
    }

    #[test]
    fn server_wording_is_kept() {
        let response = parse(concat!(
            "535-5.7.8 Username and Password not accepted. For more information, go to\r\n",
            "535 5.7.8  https://support.google.com/mail/?p=BadCredentials\r\n",
        ));
        assert_eq!(
            response.text(),
            "5.7.8 Username and Password not accepted. For more information, go to\n\
             5.7.8  https://support.google.com/mail/?p=BadCredentials"
        );
        assert_eq!(
            parse("250 2.0.0 Ok: queued as 1234\r\n").to_string(),
            "250 2.0.0 Ok: queued as 1234"
        );
    }
}
