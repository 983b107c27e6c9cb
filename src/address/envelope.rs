use super::Address;
use crate::error::{self, Error};

/// Simple email envelope representation
///
/// Holds the reverse path given to `MAIL FROM` and the forward path given
/// to `RCPT TO`. Recipients are kept in first-seen order without duplicates.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Envelope {
    /// The envelope recipients' addresses
    ///
    /// This can not be empty.
    forward_path: Vec<Address>,
    /// The envelope sender address
    reverse_path: Address,
}

impl Envelope {
    /// Creates a new envelope, which may fail if `to` is empty.
    ///
    /// # Examples
    ///
    /// ```
    /// # use smtp_xoauth2::{Address, Envelope};
    /// # use std::error::Error;
    /// # fn main() -> Result<(), Box<dyn Error>> {
    /// let sender: Address = "from@email.com".parse()?;
    /// let recipients: Vec<Address> = vec!["to@email.com".parse()?, "to@email.com".parse()?];
    ///
    /// let envelope = Envelope::new(sender, recipients)?;
    /// assert_eq!(envelope.to().len(), 1);
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    ///
    /// If `to` has no elements in it. The error is a send error.
    pub fn new<I>(from: Address, to: I) -> Result<Envelope, Error>
    where
        I: IntoIterator<Item = Address>,
    {
        let mut forward_path: Vec<Address> = Vec::new();
        for address in to {
            if !forward_path.contains(&address) {
                forward_path.push(address);
            }
        }

        if forward_path.is_empty() {
            return Err(error::send("missing destination address, invalid envelope"));
        }
        Ok(Envelope {
            forward_path,
            reverse_path: from,
        })
    }

    /// Gets the destination addresses of the envelope.
    pub fn to(&self) -> &[Address] {
        self.forward_path.as_slice()
    }

    /// Gets the sender of the envelope.
    pub fn from(&self) -> &Address {
        &self.reverse_path
    }

    /// Check if any of the addresses in the envelope contains non-ascii chars
    pub(crate) fn has_non_ascii_addresses(&self) -> bool {
        !self.reverse_path.is_ascii() || self.forward_path.iter().any(|a| !a.is_ascii())
    }
}
