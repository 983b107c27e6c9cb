//! Error and result type for message encoding and SMTP submission

use std::{error::Error as StdError, fmt, io};

use crate::{
    transport::smtp::response::{Code, Severity},
    BoxError,
};

// Inspired by https://github.com/seanmonstar/reqwest/blob/a8566383168c0ef06c21f38cbc9213af6ff6db31/src/error.rs

/// The Errors that may occur when encoding or sending an email
pub struct Error {
    inner: Box<Inner>,
}

struct Inner {
    kind: Kind,
    source: Option<BoxError>,
}

impl Error {
    pub(crate) fn new<E>(kind: Kind, source: Option<E>) -> Error
    where
        E: Into<BoxError>,
    {
        Error {
            inner: Box::new(Inner {
                kind,
                source: source.map(Into::into),
            }),
        }
    }

    /// Returns true if the TCP connection to the server could not be opened
    pub fn is_connection(&self) -> bool {
        matches!(self.inner.kind, Kind::Connection)
    }

    /// Returns true if `EHLO`, `STARTTLS` or the TLS handshake failed
    pub fn is_negotiation(&self) -> bool {
        matches!(self.inner.kind, Kind::Negotiation(_))
    }

    /// Returns true if the server rejected the SASL exchange
    pub fn is_authentication(&self) -> bool {
        matches!(self.inner.kind, Kind::Authentication(_))
    }

    /// Returns true if `MAIL FROM`, `RCPT TO` or `DATA` was rejected,
    /// or if the message had no recipient
    pub fn is_send(&self) -> bool {
        matches!(self.inner.kind, Kind::Send(_))
    }

    /// Returns true if the message could not be serialized
    pub fn is_encoding(&self) -> bool {
        matches!(self.inner.kind, Kind::Encoding)
    }

    /// Returns true if the error is from response parsing
    pub fn is_response(&self) -> bool {
        matches!(self.inner.kind, Kind::Response)
    }

    /// Returns true if the error is from client
    pub fn is_client(&self) -> bool {
        matches!(self.inner.kind, Kind::Client)
    }

    /// Returns true if a blocking network step exceeded its deadline
    pub fn is_timeout(&self) -> bool {
        if matches!(self.inner.kind, Kind::Timeout) {
            return true;
        }

        let mut source = self.source();

        while let Some(err) = source {
            if let Some(io_err) = err.downcast_ref::<io::Error>() {
                return is_timeout_kind(io_err.kind());
            }

            source = err.source();
        }

        false
    }

    /// Returns true if the server replied with a transient error (4xx)
    pub fn is_transient(&self) -> bool {
        self.status()
            .is_some_and(|code| code.severity == Severity::TransientNegativeCompletion)
    }

    /// Returns true if the server replied with a permanent error (5xx)
    pub fn is_permanent(&self) -> bool {
        self.status()
            .is_some_and(|code| code.severity == Severity::PermanentNegativeCompletion)
    }

    /// Returns the status code, if the error was generated from a response.
    pub fn status(&self) -> Option<Code> {
        match self.inner.kind {
            Kind::Transient(code) | Kind::Permanent(code) => Some(code),
            Kind::Negotiation(code) | Kind::Authentication(code) | Kind::Send(code) => code,
            _ => None,
        }
    }

    /// Attributes a rejected or unreadable reply to the protocol step it answered
    ///
    /// Errors that are not about the reply itself (timeouts, broken
    /// connections) are returned unchanged.
    pub(crate) fn during(self, step: Step) -> Error {
        let code = match self.inner.kind {
            Kind::Transient(code) | Kind::Permanent(code) => Some(code),
            Kind::Response => None,
            _ => return self,
        };

        let mut inner = self.inner;
        inner.kind = match step {
            Step::Negotiation => Kind::Negotiation(code),
            Step::Authentication => Kind::Authentication(code),
            Step::Send => Kind::Send(code),
        };
        Error { inner }
    }

    /// Appends server-provided details to the error message
    pub(crate) fn with_detail(mut self, detail: &str) -> Error {
        let message = match self.inner.source.take() {
            Some(source) => format!("{source} ({detail})"),
            None => detail.to_owned(),
        };
        self.inner.source = Some(message.into());
        self
    }
}

/// The protocol steps errors are attributed to
#[derive(Debug, Clone, Copy)]
pub(crate) enum Step {
    Negotiation,
    Authentication,
    Send,
}

#[derive(Debug)]
pub(crate) enum Kind {
    /// Transient SMTP error, 4xx reply code
    ///
    /// [RFC 5321, section 4.2.1](https://tools.ietf.org/html/rfc5321#section-4.2.1)
    Transient(Code),
    /// Permanent SMTP error, 5xx reply code
    ///
    /// [RFC 5321, section 4.2.1](https://tools.ietf.org/html/rfc5321#section-4.2.1)
    Permanent(Code),
    /// Error parsing a response
    Response,
    /// Internal client error
    Client,
    /// Connection error
    Connection,
    /// Underlying network i/o error
    Network,
    /// Deadline exceeded
    Timeout,
    /// EHLO, STARTTLS or TLS handshake failure
    Negotiation(Option<Code>),
    /// SASL exchange failure
    Authentication(Option<Code>),
    /// Mail transaction failure
    Send(Option<Code>),
    /// Message serialization failure
    Encoding,
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut builder = f.debug_struct("smtp_xoauth2::Error");

        builder.field("kind", &self.inner.kind);

        if let Some(ref source) = self.inner.source {
            builder.field("source", source);
        }

        builder.finish()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.kind {
            Kind::Response => f.write_str("response error")?,
            Kind::Client => f.write_str("internal client error")?,
            Kind::Network => f.write_str("network error")?,
            Kind::Connection => f.write_str("connection error")?,
            Kind::Timeout => f.write_str("timed out")?,
            Kind::Encoding => f.write_str("message encoding error")?,
            Kind::Transient(ref code) => {
                write!(f, "transient error ({code})")?;
            }
            Kind::Permanent(ref code) => {
                write!(f, "permanent error ({code})")?;
            }
            Kind::Negotiation(code) => write_step(f, "protocol negotiation error", code)?,
            Kind::Authentication(code) => write_step(f, "authentication error", code)?,
            Kind::Send(code) => write_step(f, "send error", code)?,
        };

        if let Some(ref e) = self.inner.source {
            write!(f, ": {e}")?;
        }

        Ok(())
    }
}

fn write_step(f: &mut fmt::Formatter<'_>, what: &str, code: Option<Code>) -> fmt::Result {
    match code {
        Some(code) => write!(f, "{what} ({code})"),
        None => f.write_str(what),
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.inner.source.as_ref().map(|e| {
            let r: &(dyn StdError + 'static) = &**e;
            r
        })
    }
}

fn is_timeout_kind(kind: io::ErrorKind) -> bool {
    // Unix sockets report an expired read timeout as `WouldBlock`
    matches!(kind, io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock)
}

pub(crate) fn code(c: Code, s: Option<String>) -> Error {
    match c.severity {
        Severity::TransientNegativeCompletion => Error::new(Kind::Transient(c), s),
        Severity::PermanentNegativeCompletion => Error::new(Kind::Permanent(c), s),
        _ => client("Unknown error code"),
    }
}

pub(crate) fn response<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Response, Some(e))
}

pub(crate) fn client<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Client, Some(e))
}

/// Wraps an i/o error, turning expired socket deadlines into timeouts
pub(crate) fn network(e: io::Error) -> Error {
    if is_timeout_kind(e.kind()) {
        Error::new(Kind::Timeout, Some(e))
    } else {
        Error::new(Kind::Network, Some(e))
    }
}

pub(crate) fn connection(e: io::Error) -> Error {
    if is_timeout_kind(e.kind()) {
        Error::new(Kind::Timeout, Some(e))
    } else {
        Error::new(Kind::Connection, Some(e))
    }
}

pub(crate) fn timeout<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Timeout, Some(e))
}

pub(crate) fn negotiation<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Negotiation(None), Some(e))
}

pub(crate) fn authentication<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Authentication(None), Some(e))
}

pub(crate) fn send<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Send(None), Some(e))
}

pub(crate) fn encoding<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Encoding, Some(e))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::transport::smtp::response::{Category, Detail};

    fn rejected() -> Error {
        code(
            Code::new(
                Severity::PermanentNegativeCompletion,
                Category::Unspecified3,
                Detail::Five,
            ),
            Some("5.7.3 Authentication unsuccessful".to_owned()),
        )
    }

    #[test]
    fn rejection_is_attributed_to_step() {
        let err = rejected().during(Step::Authentication);
        assert!(err.is_authentication());
        assert!(err.is_permanent());
        assert_eq!(err.status().map(u16::from), Some(535));
        assert_eq!(
            err.to_string(),
            "authentication error (535): 5.7.3 Authentication unsuccessful"
        );
    }

    #[test]
    fn timeout_is_not_reattributed() {
        let err = network(io::Error::new(io::ErrorKind::WouldBlock, "deadline"));
        assert!(err.is_timeout());

        let err = err.during(Step::Send);
        assert!(err.is_timeout());
        assert!(!err.is_send());
    }

    #[test]
    fn network_errors_are_not_timeouts() {
        let err = network(io::Error::new(io::ErrorKind::ConnectionReset, "reset"));
        assert!(!err.is_timeout());
        assert!(!err.is_connection());

        let err = connection(io::Error::new(io::ErrorKind::ConnectionRefused, "refused"));
        assert!(err.is_connection());
        assert!(!err.is_timeout());
    }

    #[test]
    fn encoding_display() {
        let err = encoding("attachment \"a.bin\" has no Content-Type");
        assert!(err.is_encoding());
        assert_eq!(
            err.to_string(),
            "message encoding error: attachment \"a.bin\" has no Content-Type"
        );
    }
}
