use super::Address;
use crate::message::{header::Headers, Mailbox};

/// Simple email envelope representation
///
/// We only accept mailboxes, and do not support source routes (as per RFC).
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Envelope {
    /// The envelope recipients' addresses
    ///
    /// This can not be empty.
    forward_path: Vec<Address>,
    /// The envelope sender address
    reverse_path: Option<Address>,
}

/// The envelope has no recipient
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MissingRecipient;

impl std::fmt::Display for MissingRecipient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("missing destination address, invalid envelope")
    }
}

impl std::error::Error for MissingRecipient {}

impl Envelope {
    /// Creates a new envelope, which may fail if `to` is empty.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::str::FromStr;
    /// # use gomtp::address::{Address, Envelope};
    ///
    /// # use std::error::Error;
    /// # fn main() -> Result<(), Box<dyn Error>> {
    /// let sender = Address::from_str("from@email.com")?;
    /// let recipients = vec![Address::from_str("to@email.com")?];
    ///
    /// let envelope = Envelope::new(Some(sender), recipients.clone())?;
    /// assert_eq!(envelope.to(), recipients.as_slice());
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    ///
    /// If `to` has no elements in it.
    pub fn new(from: Option<Address>, to: Vec<Address>) -> Result<Envelope, MissingRecipient> {
        if to.is_empty() {
            return Err(MissingRecipient);
        }
        Ok(Envelope {
            forward_path: to,
            reverse_path: from,
        })
    }

    /// Gets the destination addresses of the envelope.
    pub fn to(&self) -> &[Address] {
        self.forward_path.as_slice()
    }

    /// Gets the sender of the envelope.
    pub fn from(&self) -> Option<&Address> {
        self.reverse_path.as_ref()
    }

    /// Check if any of the addresses in the envelope contains non-ascii chars
    pub(crate) fn has_non_ascii_addresses(&self) -> bool {
        self.reverse_path
            .iter()
            .chain(self.forward_path.iter())
            .any(|a| !a.is_ascii())
    }
}

impl TryFrom<&Headers> for Envelope {
    type Error = MissingRecipient;

    /// Sender is the `From` mailbox, recipients are `To` then every `Cc`
    fn try_from(headers: &Headers) -> Result<Self, Self::Error> {
        let from = headers.from().map(|mailbox| mailbox.email.clone());

        let to = headers
            .to()
            .into_iter()
            .chain(headers.cc())
            .map(|mailbox: &Mailbox| mailbox.email.clone())
            .collect();

        Self::new(from, to)
    }
}
