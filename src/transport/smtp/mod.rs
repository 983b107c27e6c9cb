//! The SMTP transport submits emails with the SMTP protocol.
//!
//! This SMTP client follows [RFC 5321](https://tools.ietf.org/html/rfc5321)
//! and targets submission servers that require OAuth2, such as
//! `smtp.office365.com` or `smtp.gmail.com`.
//!
//! It implements the following extensions:
//!
//! * STARTTLS ([RFC 2487](http://tools.ietf.org/html/rfc2487)), always required
//! * AUTH ([RFC 4954](http://tools.ietf.org/html/rfc4954)) with the XOAUTH2 mechanism
//! * SMTPUTF8 ([RFC 6531](https://tools.ietf.org/html/rfc6531)) when the envelope needs it
//!
//! A session is established in this order: TCP connection, greeting,
//! `EHLO`, `STARTTLS`, TLS handshake, `EHLO` again, then `AUTH XOAUTH2`.
//! Each send is then a `MAIL FROM`, one `RCPT TO` per recipient and `DATA`.
//!
//! Every blocking step has a deadline: [`DEFAULT_CONNECT_TIMEOUT`] for
//! the TCP connection and [`DEFAULT_COMMAND_TIMEOUT`] for each
//! command/response pair, the TLS handshake and each SASL round trip.
//!
//! #### Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//!
//! use smtp_xoauth2::{transport::smtp::authentication::Credentials, Message, SmtpSession};
//!
//! # use std::error::Error;
//! # fn main() -> Result<(), Box<dyn Error>> {
//! let mut email = Message::new();
//! email
//!     .to(vec!["hei@domain.tld".parse()?])
//!     .subject("Happy new year")
//!     .body("text/plain", "Be happy!");
//!
//! let mut session = SmtpSession::builder("smtp.office365.com")
//!     .command_timeout(Some(Duration::from_secs(30)))
//!     .connect(Credentials::new("nobody@domain.tld", "access-token"))?;
//!
//! session.send(&email)?;
//! session.quit()?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

pub use self::session::{SmtpSession, SmtpSessionBuilder};

pub mod authentication;
pub mod client;
pub mod commands;
pub mod extension;
pub mod response;
mod session;

/// Default message submission port
///
/// Defined in [RFC6409](https://tools.ietf.org/html/rfc6409)
pub const SUBMISSION_PORT: u16 = 587;

/// Default deadline to open the TCP connection
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default deadline for each command and its response
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(60);
