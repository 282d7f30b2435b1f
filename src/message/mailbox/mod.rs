use std::{
    fmt::{Display, Formatter, Result as FmtResult, Write},
    str::FromStr,
};

use chumsky::Parser;
use email_encoding::headers::{quoted_string, writer::EmailWriter};

use crate::address::{Address, AddressError};

mod grammar;

/// Represents an email address with an optional name for the sender/recipient.
///
/// This type contains email address and the sender/recipient name (_Some Name \<user@domain.tld\>_ or _withoutname@domain.tld_).
///
/// # Examples
///
/// You can create a `Mailbox` from a string and an [`Address`]:
///
/// ```
/// # use gomtp::{address::Address, message::Mailbox};
/// # use std::error::Error;
/// # fn main() -> Result<(), Box<dyn Error>> {
/// let address = Address::new("example", "email.com")?;
/// let mailbox = Mailbox::new(None, address);
/// # Ok(())
/// # }
/// ```
///
/// You can also create one from a string literal:
///
/// ```
/// # use gomtp::message::Mailbox;
/// # use std::error::Error;
/// # fn main() -> Result<(), Box<dyn Error>> {
/// let mailbox: Mailbox = "John Smith <example@email.com>".parse()?;
/// assert_eq!(mailbox.name.as_deref(), Some("John Smith"));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mailbox {
    /// The name associated with the address.
    pub name: Option<String>,

    /// The email address itself.
    pub email: Address,
}

impl Mailbox {
    /// Creates a new `Mailbox` using an email address and the name of the recipient if there is one.
    pub fn new(name: Option<String>, email: Address) -> Self {
        Mailbox { name, email }
    }

    /// Writes the mailbox as a header value
    ///
    /// The name is left as is when it is a plain word, quoted when it
    /// needs to be, and encoded when it isn't ASCII.
    pub(crate) fn encode(&self, w: &mut EmailWriter<'_>) -> FmtResult {
        match self.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => {
                quoted_string::encode(name, w)?;
                w.space();
                write!(w, "<{}>", self.email)
            }
            _ => w.write_str(self.email.as_ref()),
        }
    }
}

impl Display for Mailbox {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        self.encode(&mut EmailWriter::new(f, 0, 0, false))
    }
}

impl FromStr for Mailbox {
    type Err = AddressError;

    /// Accepts `user@domain` and `Name <user@domain>`, the name may be quoted
    fn from_str(src: &str) -> Result<Mailbox, Self::Err> {
        let (name, (local, domain)) = grammar::mailbox()
            .parse(src)
            .map_err(|_| AddressError::InvalidInput)?;

        Ok(Mailbox::new(name, Address::new(&local, &domain)?))
    }
}

impl From<Address> for Mailbox {
    fn from(value: Address) -> Self {
        Self::new(None, value)
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    fn mailbox(name: Option<&str>) -> Mailbox {
        Mailbox::new(name.map(Into::into), "ops@relay.test".parse().unwrap())
    }

    #[test]
    fn display_quotes_or_encodes_the_name() {
        for (name, expected) in [
            (None, "ops@relay.test"),
            (Some("   "), "ops@relay.test"),
            (Some("Ops"), "Ops <ops@relay.test>"),
            (Some("N.O.C."), "N.O.C. <ops@relay.test>"),
            (Some("On Call"), r#""On Call" <ops@relay.test>"#),
            (Some("Ops \"B\""), r#""Ops \"B\"" <ops@relay.test>"#),
            (Some("Ops, Team"), "=?utf-8?b?T3BzLCBUZWFt?= <ops@relay.test>"),
            (Some("Жора"), "=?utf-8?b?0JbQvtGA0LA=?= <ops@relay.test>"),
        ] {
            assert_eq!(mailbox(name).to_string(), expected, "{name:?}");
        }
    }

    #[test]
    fn parse_accepted_forms() {
        for (src, name) in [
            ("ops@relay.test", None),
            ("<ops@relay.test>", None),
            ("Ops <ops@relay.test>", Some("Ops")),
            ("  On Call   <ops@relay.test> ", Some("On Call")),
            (r#""Ops, \"Team\"" <ops@relay.test>"#, Some(r#"Ops, "Team""#)),
        ] {
            assert_eq!(src.parse(), Ok(mailbox(name)), "{src:?}");
        }
    }

    #[test]
    fn parse_rejects_broken_brackets() {
        for src in ["Ops <ops@relay.test", "ops@relay.test>", "Ops <not an address>"] {
            assert_eq!(src.parse::<Mailbox>(), Err(AddressError::InvalidInput), "{src:?}");
        }
        assert_eq!(
            "Ops <ops@[not.an.ip]>".parse::<Mailbox>(),
            Err(AddressError::InvalidDomain)
        );
    }
}
