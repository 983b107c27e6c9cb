//! SMTP commands

use std::fmt::{self, Debug, Display, Formatter};

use crate::{
    base64,
    transport::smtp::{
        authentication::Mechanism,
        extension::{ClientId, MailParameter},
    },
    Address,
};

/// EHLO command
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Ehlo {
    client_id: ClientId,
}

impl Display for Ehlo {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "EHLO {}\r\n", self.client_id)
    }
}

impl Ehlo {
    /// Creates a EHLO command
    pub fn new(client_id: ClientId) -> Ehlo {
        Ehlo { client_id }
    }
}

/// STARTTLS command
#[derive(PartialEq, Eq, Clone, Debug, Copy)]
pub struct Starttls;

impl Display for Starttls {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("STARTTLS\r\n")
    }
}

/// MAIL command
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Mail {
    sender: Address,
    parameters: Vec<MailParameter>,
}

impl Display for Mail {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "MAIL FROM:<{}>", self.sender)?;
        for parameter in &self.parameters {
            write!(f, " {parameter}")?;
        }
        f.write_str("\r\n")
    }
}

impl Mail {
    /// Creates a MAIL command
    pub fn new(sender: Address, parameters: Vec<MailParameter>) -> Mail {
        Mail { sender, parameters }
    }
}

/// RCPT command
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Rcpt {
    recipient: Address,
}

impl Display for Rcpt {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "RCPT TO:<{}>\r\n", self.recipient)
    }
}

impl Rcpt {
    /// Creates an RCPT command
    pub fn new(recipient: Address) -> Rcpt {
        Rcpt { recipient }
    }
}

/// DATA command
#[derive(PartialEq, Eq, Clone, Debug, Copy)]
pub struct Data;

impl Display for Data {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("DATA\r\n")
    }
}

/// QUIT command
#[derive(PartialEq, Eq, Clone, Debug, Copy)]
pub struct Quit;

impl Display for Quit {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("QUIT\r\n")
    }
}

/// AUTH command, with its initial response
///
/// Defined in [RFC 4954](https://tools.ietf.org/html/rfc4954#section-4)
#[derive(PartialEq, Eq, Clone)]
pub struct Auth {
    mechanism: Mechanism,
    initial_response: Vec<u8>,
}

impl Display for Auth {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.initial_response.is_empty() {
            // A zero-length initial response is sent as a single equals sign
            write!(f, "AUTH {} =\r\n", self.mechanism)
        } else {
            write!(
                f,
                "AUTH {} {}\r\n",
                self.mechanism,
                base64::encode(&self.initial_response)
            )
        }
    }
}

impl Debug for Auth {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Auth")
            .field("mechanism", &self.mechanism)
            .finish_non_exhaustive()
    }
}

impl Auth {
    /// Creates an AUTH command
    pub fn new(mechanism: Mechanism, initial_response: Vec<u8>) -> Auth {
        Auth {
            mechanism,
            initial_response,
        }
    }
}

/// Answer to a `334` challenge during an AUTH exchange
#[derive(PartialEq, Eq, Clone)]
pub struct AuthResponse {
    response: Vec<u8>,
}

impl Display for AuthResponse {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}\r\n", base64::encode(&self.response))
    }
}

impl Debug for AuthResponse {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthResponse")
            .field("len", &self.response.len())
            .finish()
    }
}

impl AuthResponse {
    /// Creates a response line, empty responses are allowed
    pub fn new(response: Vec<u8>) -> AuthResponse {
        AuthResponse { response }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_display() {
        let email = Address::new("test", "example.com").unwrap();
        let id = ClientId::Domain("localhost".to_owned());

        assert_eq!(format!("{}", Ehlo::new(id)), "EHLO localhost\r\n");
        assert_eq!(format!("{Starttls}"), "STARTTLS\r\n");
        assert_eq!(
            format!("{}", Mail::new(email.clone(), vec![])),
            "MAIL FROM:<test@example.com>\r\n"
        );
        assert_eq!(
            format!(
                "{}",
                Mail::new(email.clone(), vec![MailParameter::SmtpUtfEight])
            ),
            "MAIL FROM:<test@example.com> SMTPUTF8\r\n"
        );
        assert_eq!(format!("{}", Rcpt::new(email)), "RCPT TO:<test@example.com>\r\n");
        assert_eq!(format!("{Data}"), "DATA\r\n");
        assert_eq!(format!("{Quit}"), "QUIT\r\n");
    }

    #[test]
    fn test_auth() {
        let auth = Auth::new(
            Mechanism::Xoauth2,
            b"user=a@b.com\x01auth=Bearer T\x01\x01".to_vec(),
        );
        assert_eq!(
            format!("{auth}"),
            "AUTH XOAUTH2 dXNlcj1hQGIuY29tAWF1dGg9QmVhcmVyIFQBAQ==\r\n"
        );
        assert!(!format!("{auth:?}").contains("dXNlcj1h"));

        assert_eq!(
            format!("{}", Auth::new(Mechanism::Xoauth2, Vec::new())),
            "AUTH XOAUTH2 =\r\n"
        );
        assert_eq!(format!("{}", AuthResponse::new(Vec::new())), "\r\n");
    }
}
