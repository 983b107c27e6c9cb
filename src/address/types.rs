//! Representation of an email address

use std::{
    error::Error,
    fmt::{Display, Formatter, Result as FmtResult},
    net::IpAddr,
    str::FromStr,
};

use email_address::EmailAddress;

/// Represents an email address with a user and a domain name.
///
/// This type contains email in canonical form (_user@domain.tld_).
///
/// # Examples
///
/// ```
/// use smtp_xoauth2::Address;
///
/// # use std::error::Error;
/// # fn main() -> Result<(), Box<dyn Error>> {
/// let address = "user@email.com".parse::<Address>()?;
/// assert_eq!(address.user(), "user");
/// assert_eq!(address.domain(), "email.com");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialOrd, Ord, PartialEq, Eq, Hash)]
pub struct Address {
    /// Complete address
    serialized: String,
    /// Index into `serialized` before the '@'
    at_start: usize,
}

impl Address {
    /// Creates a new email address from a user and domain.
    pub fn new<U: AsRef<str>, D: AsRef<str>>(user: U, domain: D) -> Result<Self, AddressError> {
        let user = user.as_ref();
        Address::check_user(user)?;

        let domain = domain.as_ref();
        Address::check_domain(domain)?;

        Ok(Address {
            serialized: format!("{user}@{domain}"),
            at_start: user.len(),
        })
    }

    /// Gets the user portion of the `Address`.
    pub fn user(&self) -> &str {
        &self.serialized[..self.at_start]
    }

    /// Gets the domain portion of the `Address`.
    pub fn domain(&self) -> &str {
        &self.serialized[self.at_start + 1..]
    }

    fn check_user(user: &str) -> Result<(), AddressError> {
        if EmailAddress::is_valid_local_part(user) {
            Ok(())
        } else {
            Err(AddressError::InvalidUser)
        }
    }

    fn check_domain(domain: &str) -> Result<(), AddressError> {
        if EmailAddress::is_valid_domain(domain) {
            return Ok(());
        }

        // Address literal
        let ip = domain
            .strip_prefix('[')
            .and_then(|ip| ip.strip_suffix(']'))
            .unwrap_or(domain);
        let ip = ip.strip_prefix("IPv6:").unwrap_or(ip);

        if ip.parse::<IpAddr>().is_ok() {
            return Ok(());
        }

        Err(AddressError::InvalidDomain)
    }

    /// Check if the address contains non-ascii chars
    pub(crate) fn is_ascii(&self) -> bool {
        self.serialized.is_ascii()
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.serialized)
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(val: &str) -> Result<Self, AddressError> {
        let at_start = check_address(val)?;
        Ok(Address {
            serialized: val.into(),
            at_start,
        })
    }
}

impl TryFrom<String> for Address {
    type Error = AddressError;

    fn try_from(serialized: String) -> Result<Self, AddressError> {
        let at_start = check_address(&serialized)?;
        Ok(Address {
            serialized,
            at_start,
        })
    }
}

impl AsRef<str> for Address {
    fn as_ref(&self) -> &str {
        &self.serialized
    }
}

fn check_address(val: &str) -> Result<usize, AddressError> {
    let mut parts = val.rsplitn(2, '@');
    let domain = parts.next().ok_or(AddressError::MissingParts)?;
    let user = parts.next().ok_or(AddressError::MissingParts)?;

    Address::check_user(user)?;
    Address::check_domain(domain)?;
    Ok(user.len())
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[non_exhaustive]
/// Errors in email addresses parsing
pub enum AddressError {
    /// Missing domain or user
    MissingParts,
    /// Invalid email user
    InvalidUser,
    /// Invalid email domain
    InvalidDomain,
}

impl Error for AddressError {}

impl Display for AddressError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            AddressError::MissingParts => f.write_str("Missing domain or user"),
            AddressError::InvalidUser => f.write_str("Invalid email user"),
            AddressError::InvalidDomain => f.write_str("Invalid email domain"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_address() {
        let addr = Address::from_str("sender@outlook.com").unwrap();
        let addr2 = Address::new("sender", "outlook.com").unwrap();
        assert_eq!(addr, addr2);
        assert_eq!(addr.user(), "sender");
        assert_eq!(addr.domain(), "outlook.com");
        assert!(addr.is_ascii());
    }

    #[test]
    fn address_literal() {
        let addr = Address::from_str("postmaster@[127.0.0.1]").unwrap();
        assert_eq!(addr.domain(), "[127.0.0.1]");

        let addr = Address::from_str("postmaster@[IPv6:2606:4700:4700::1111]").unwrap();
        assert_eq!(addr.domain(), "[IPv6:2606:4700:4700::1111]");
    }

    #[test]
    fn invalid_addresses() {
        assert_eq!(
            Address::from_str("no-at-sign"),
            Err(AddressError::MissingParts)
        );
        assert_eq!(
            Address::from_str("@example.com"),
            Err(AddressError::InvalidUser)
        );
        assert_eq!(
            Address::from_str("user@exa mple.com"),
            Err(AddressError::InvalidDomain)
        );
    }
}
