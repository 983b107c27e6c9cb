//! SASL authentication
//!
//! The session drives any [`Authenticator`]; [`Xoauth2`] is the mechanism
//! implemented here.

use std::fmt::{self, Debug, Display, Formatter};

use crate::error::{self, Error};

/// Contains the account and its OAuth2 access token
#[derive(PartialEq, Eq, Clone, Hash)]
pub struct Credentials {
    from_address: String,
    access_token: String,
}

impl Credentials {
    /// Create a `Credentials` struct from the account address and an access token
    pub fn new(from_address: impl Into<String>, access_token: impl Into<String>) -> Credentials {
        Credentials {
            from_address: from_address.into(),
            access_token: access_token.into(),
        }
    }

    /// The account address, used as SASL identity and envelope sender
    pub fn from_address(&self) -> &str {
        &self.from_address
    }
}

impl<S, T> From<(S, T)> for Credentials
where
    S: Into<String>,
    T: Into<String>,
{
    fn from((from_address, access_token): (S, T)) -> Self {
        Credentials::new(from_address, access_token)
    }
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("from_address", &self.from_address)
            .finish_non_exhaustive()
    }
}

/// Represents authentication mechanisms
#[derive(PartialEq, Eq, Copy, Clone, Hash, Debug)]
#[non_exhaustive]
pub enum Mechanism {
    /// Non-standard XOAUTH2 mechanism, defined in
    /// [xoauth2-protocol](https://developers.google.com/gmail/imap/xoauth2-protocol)
    Xoauth2,
}

impl Display for Mechanism {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match *self {
            Mechanism::Xoauth2 => "XOAUTH2",
        })
    }
}

/// Client side of a SASL exchange
///
/// Payloads are raw bytes: the connection takes care of the base64 framing
/// used on the wire.
pub trait Authenticator {
    /// Mechanism name sent with `AUTH`
    fn mechanism(&self) -> Mechanism;

    /// Initial response, sent along with the `AUTH` command
    fn start(&mut self) -> Result<Vec<u8>, Error>;

    /// Answers a server challenge
    ///
    /// `more_expected` is true when the server sent a `334` continuation and
    /// waits for an answer. Returns `None` when there is nothing to send.
    fn next(&mut self, challenge: &[u8], more_expected: bool) -> Result<Option<Vec<u8>>, Error>;

    /// Error details the server sent during the exchange, if any
    fn server_error(&self) -> Option<&str> {
        None
    }
}

/// XOAUTH2 authenticator
///
/// On failure the server sends a `334` continuation carrying a JSON error
/// document and expects an empty response, after which it sends the final
/// rejection. The token is sent only once, in the initial response.
#[derive(Debug, Clone)]
pub struct Xoauth2 {
    credentials: Credentials,
    server_error: Option<String>,
}

impl Xoauth2 {
    /// Creates an authenticator for the given account
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            server_error: None,
        }
    }
}

impl Authenticator for Xoauth2 {
    fn mechanism(&self) -> Mechanism {
        Mechanism::Xoauth2
    }

    fn start(&mut self) -> Result<Vec<u8>, Error> {
        self.server_error = None;
        Ok(format!(
            "user={}\x01auth=Bearer {}\x01\x01",
            self.credentials.from_address, self.credentials.access_token
        )
        .into_bytes())
    }

    fn next(&mut self, challenge: &[u8], more_expected: bool) -> Result<Option<Vec<u8>>, Error> {
        match (&self.server_error, more_expected) {
            (None, false) => return Ok(None),
            (Some(details), false) => {
                return Err(error::authentication(format!(
                    "server accepted XOAUTH2 after reporting a failure: {details}"
                )))
            }
            (Some(details), true) => {
                return Err(error::authentication(format!(
                    "unexpected challenge after XOAUTH2 failure: {details}"
                )))
            }
            (None, true) => {}
        }

        self.server_error = Some(String::from_utf8_lossy(challenge).into_owned());
        Ok(Some(Vec::new()))
    }

    fn server_error(&self) -> Option<&str> {
        self.server_error.as_deref()
    }
}
