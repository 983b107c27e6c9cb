//! SMTP client
//!
//! `SmtpConnection` runs the protocol over any [`Connector`]: a TCP or TLS
//! [`NetworkStream`] in production, a scripted [`MockStream`](mock::MockStream)
//! in tests.

pub use self::{
    connection::SmtpConnection,
    net::{Connector, NetworkStream},
    tls::{Certificate, TlsParameters, TlsParametersBuilder, TlsVersion},
};

mod connection;
pub mod mock;
mod net;
mod tls;

/// The codec used for transparency
///
/// Doubles the dot starting a line so that the message cannot end the
/// `DATA` section early.
/// [RFC 5321, section 4.5.2](https://tools.ietf.org/html/rfc5321#section-4.5.2)
#[derive(Clone, Copy, Debug)]
pub struct ClientCodec {
    escape_count: u8,
}

impl Default for ClientCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientCodec {
    /// Creates a new client codec, positioned at the start of a line
    pub fn new() -> Self {
        ClientCodec { escape_count: 2 }
    }

    /// Adds transparency
    pub fn encode(&mut self, frame: &[u8], buf: &mut Vec<u8>) {
        let mut start = 0;
        for (idx, byte) in frame.iter().enumerate() {
            self.escape_count = match (self.escape_count, *byte) {
                (0, b'\r') => 1,
                (1, b'\n') => 2,
                (2, b'.') => 3,
                (_, b'\r') => 1,
                _ => 0,
            };
            if self.escape_count == 3 {
                self.escape_count = 0;
                buf.extend_from_slice(&frame[start..idx]);
                buf.push(b'.');
                start = idx;
            }
        }
        buf.extend_from_slice(&frame[start..]);
    }
}

/// Returns the string replacing all the CRLF with "\<CRLF\>"
/// Used for debug displays
#[cfg(feature = "tracing")]
pub(super) fn escape_crlf(string: &str) -> String {
    string.replace("\r\n", "<CRLF>")
}
