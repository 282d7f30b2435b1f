//! Validated `local@domain` addresses

use std::{
    error::Error,
    fmt::{self, Display, Formatter},
    net::IpAddr,
    str::FromStr,
};

use email_address::EmailAddress;

/// An address usable both in headers and in `MAIL FROM`/`RCPT TO`
///
/// The local part must be a valid RFC 5322 local part. The domain is a
/// host name, possibly internationalized, or an IP literal such as
/// `[192.0.2.1]`.
///
/// ```
/// use gomtp::address::Address;
///
/// # fn main() -> Result<(), gomtp::address::AddressError> {
/// let address: Address = "postmaster@example.org".parse()?;
/// assert_eq!(address.domain(), "example.org");
/// assert_eq!(address, Address::new("postmaster", "example.org")?);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address {
    text: String,
    at: usize,
}

impl Address {
    /// Joins an already split local part and domain
    pub fn new(local: &str, domain: &str) -> Result<Self, AddressError> {
        validate_local(local)?;
        validate_domain(domain)?;

        Ok(Address {
            text: format!("{local}@{domain}"),
            at: local.len(),
        })
    }

    /// The part after the last `@`
    pub fn domain(&self) -> &str {
        &self.text[self.at + 1..]
    }

    /// `false` when `SMTPUTF8` is needed to send this address
    pub(crate) fn is_ascii(&self) -> bool {
        self.text.is_ascii()
    }
}

fn validate_local(local: &str) -> Result<(), AddressError> {
    if EmailAddress::is_valid_local_part(local) {
        Ok(())
    } else {
        Err(AddressError::InvalidUser)
    }
}

fn validate_domain(domain: &str) -> Result<(), AddressError> {
    if let Some(literal) = domain.strip_prefix('[').and_then(|d| d.strip_suffix(']')) {
        return literal
            .parse::<IpAddr>()
            .map(drop)
            .map_err(|_| AddressError::InvalidDomain);
    }

    if EmailAddress::is_valid_domain(domain) {
        return Ok(());
    }

    // IDNs are checked in their punycode form
    match idna::domain_to_ascii(domain) {
        Ok(ascii) if EmailAddress::is_valid_domain(&ascii) => Ok(()),
        _ => Err(AddressError::InvalidDomain),
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (local, domain) = s.rsplit_once('@').ok_or(AddressError::MissingParts)?;
        Address::new(local, domain)
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl AsRef<str> for Address {
    fn as_ref(&self) -> &str {
        &self.text
    }
}

/// Why a string was refused as an address or mailbox
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[non_exhaustive]
pub enum AddressError {
    /// No `@` separating user and domain
    MissingParts,
    /// The local part is not valid
    InvalidUser,
    /// The domain is neither a host name nor an IP literal
    InvalidDomain,
    /// Not shaped like `addr` or `Name <addr>`
    InvalidInput,
}

impl Error for AddressError {}

impl Display for AddressError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AddressError::MissingParts => "missing '@' between user and domain",
            AddressError::InvalidUser => "invalid user",
            AddressError::InvalidDomain => "invalid domain",
            AddressError::InvalidInput => "expected `user@domain` or `Name <user@domain>`",
        })
    }
}
