//! SMTP submission client for providers that only accept OAuth2 bearer tokens.
//!
//! The crate pairs two pieces:
//!
//! * a [`Message`] builder rendering headers, a body and file attachments
//!   into a `multipart/mixed` MIME document
//! * an [`SmtpSession`] that connects, upgrades the connection with
//!   `STARTTLS`, authenticates with the `XOAUTH2` SASL mechanism
//!   and submits messages
//!
//! Obtaining the access token from the identity provider is left to the
//! caller: the session only consumes an opaque bearer token.
//!
//! ## Example
//!
//! ```rust,no_run
//! use smtp_xoauth2::{transport::smtp::authentication::Credentials, Message, SmtpSession};
//!
//! # use std::error::Error;
//! # fn main() -> Result<(), Box<dyn Error>> {
//! let mut message = Message::new();
//! message.to(vec!["test@example.com".parse()?]);
//! message.subject("test");
//! message.body("text/plain", "Test Mail");
//! message.attach_with_type(b"hello".to_vec(), "/tmp/hello.txt", "text/plain");
//!
//! let credentials = Credentials::new("sender@outlook.com", "access-token");
//! let mut session = SmtpSession::builder("smtp.office365.com")
//!     .port(587)
//!     .connect(credentials)?;
//! session.send(&message)?;
//! session.quit()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Features
//!
//! * **tracing** (default): log the SMTP exchange with the `tracing` crate.
//!   Bearer tokens never appear in the logs.

#![doc(html_root_url = "https://docs.rs/smtp-xoauth2/0.1.0")]
#![forbid(unsafe_code)]
#![deny(missing_debug_implementations, missing_docs, rust_2018_idioms)]

pub mod address;
mod base64;
pub mod config;
pub mod error;
pub mod message;
pub mod transport;

pub use crate::{
    address::{Address, Envelope},
    error::Error,
    message::Message,
    transport::smtp::SmtpSession,
};

pub(crate) type BoxError = Box<dyn std::error::Error + Send + Sync>;
