use std::time::Duration;

use super::{
    authentication::{Credentials, Xoauth2},
    client::{Connector, NetworkStream, SmtpConnection, TlsParameters},
    extension::{ClientId, ServerInfo},
    response::Response,
    DEFAULT_COMMAND_TIMEOUT, DEFAULT_CONNECT_TIMEOUT, SUBMISSION_PORT,
};
use crate::{
    address::{Address, Envelope},
    error::{self, Error},
    message::Message,
};

/// Authenticated SMTP session
///
/// Obtained from [`SmtpSession::builder`]. Messages are sent one at a time
/// on the same connection. Any failure during a mail transaction closes
/// the connection and later sends are refused; a new session is needed.
///
/// The connection is closed when the session is dropped, [`quit`] closes
/// it gracefully and reports the server answer.
///
/// [`quit`]: SmtpSession::quit
#[derive(Debug)]
pub struct SmtpSession<S: Connector = NetworkStream> {
    connection: SmtpConnection<S>,
    from: Address,
    host: String,
    port: u16,
}

impl SmtpSession {
    /// Creates a builder for a session with `host`
    ///
    /// Defaults to the submission port, 587.
    pub fn builder<T: Into<String>>(host: T) -> SmtpSessionBuilder {
        SmtpSessionBuilder::new(host)
    }
}

impl<S: Connector> SmtpSession<S> {
    /// Sends a message
    ///
    /// The sender is the authenticated account, recipients are the `to`,
    /// `cc` and `bcc` addresses of the message. A message that cannot be
    /// rendered or has no recipient is refused before anything is sent,
    /// and the session stays usable.
    pub fn send(&mut self, message: &Message) -> Result<Response, Error> {
        let envelope = message.envelope(self.from.clone())?;
        let email = message.formatted()?;
        self.send_raw(&envelope, &email)
    }

    /// Sends an already rendered message
    pub fn send_raw(&mut self, envelope: &Envelope, email: &[u8]) -> Result<Response, Error> {
        if self.connection.has_broken() {
            return Err(error::send("the session is closed"));
        }

        let response = self.connection.send(envelope, email)?;

        #[cfg(feature = "tracing")]
        tracing::debug!(
            "message to {} recipient(s) accepted: {}",
            envelope.to().len(),
            response.text()
        );
        Ok(response)
    }

    /// Ends the session with `QUIT` and closes the connection
    pub fn quit(mut self) -> Result<Response, Error> {
        if self.connection.has_broken() {
            return Err(error::send("the session is closed"));
        }
        let result = self.connection.quit();
        self.connection.abort();
        result
    }

    /// The authenticated account, used as envelope sender
    pub fn from(&self) -> &Address {
        &self.from
    }

    /// The server host name
    pub fn host(&self) -> &str {
        &self.host
    }

    /// The server port
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Capabilities announced by the server after `STARTTLS`
    pub fn server_info(&self) -> &ServerInfo {
        self.connection.server_info()
    }

    /// Tells if the connection is encrypted
    pub fn is_encrypted(&self) -> bool {
        self.connection.is_encrypted()
    }

    /// Tells if the session can no longer send
    pub fn is_closed(&self) -> bool {
        self.connection.has_broken()
    }
}

impl<S: Connector> Drop for SmtpSession<S> {
    fn drop(&mut self) {
        self.connection.abort();
    }
}

/// Builder for [`SmtpSession`]
#[derive(Debug, Clone)]
pub struct SmtpSessionBuilder {
    host: String,
    port: u16,
    hello_name: ClientId,
    connect_timeout: Option<Duration>,
    command_timeout: Option<Duration>,
    tls: Option<TlsParameters>,
}

impl SmtpSessionBuilder {
    fn new<T: Into<String>>(host: T) -> Self {
        Self {
            host: host.into(),
            port: SUBMISSION_PORT,
            hello_name: ClientId::default(),
            connect_timeout: Some(DEFAULT_CONNECT_TIMEOUT),
            command_timeout: Some(DEFAULT_COMMAND_TIMEOUT),
            tls: None,
        }
    }

    /// Set the port to use
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the name used during EHLO
    pub fn hello_name(mut self, name: ClientId) -> Self {
        self.hello_name = name;
        self
    }

    /// Set the deadline to open the TCP connection, `None` to wait forever
    pub fn connect_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the deadline of each command/response pair, `None` to wait forever
    pub fn command_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Set the TLS parameters used for `STARTTLS`
    ///
    /// Defaults to the system trust store, checking the certificate against
    /// the host name.
    pub fn tls(mut self, tls: TlsParameters) -> Self {
        self.tls = Some(tls);
        self
    }

    /// Connects, upgrades the connection with `STARTTLS` and authenticates
    pub fn connect(self, credentials: Credentials) -> Result<SmtpSession, Error> {
        let (from, tls) = self.prepare(&credentials)?;
        let stream = NetworkStream::connect((self.host.as_str(), self.port), self.connect_timeout)?;
        self.establish(stream, from, tls, credentials)
    }

    /// Runs the session on an already open stream
    ///
    /// The stream must be positioned before the server greeting.
    pub fn connect_stream<S: Connector>(
        self,
        stream: S,
        credentials: Credentials,
    ) -> Result<SmtpSession<S>, Error> {
        let (from, tls) = self.prepare(&credentials)?;
        self.establish(stream, from, tls, credentials)
    }

    fn prepare(&self, credentials: &Credentials) -> Result<(Address, TlsParameters), Error> {
        let from = credentials
            .from_address()
            .parse::<Address>()
            .map_err(error::client)?;
        let tls = match self.tls {
            Some(ref tls) => tls.clone(),
            None => TlsParameters::new(self.host.clone())?,
        };
        Ok((from, tls))
    }

    fn establish<S: Connector>(
        self,
        stream: S,
        from: Address,
        tls: TlsParameters,
        credentials: Credentials,
    ) -> Result<SmtpSession<S>, Error> {
        let mut connection =
            SmtpConnection::from_stream(stream, self.command_timeout, &self.hello_name)?;
        connection.starttls(&tls, &self.hello_name)?;
        connection.auth(&mut Xoauth2::new(credentials))?;

        #[cfg(feature = "tracing")]
        tracing::debug!("session established with {}:{} as {}", self.host, self.port, from);

        Ok(SmtpSession {
            connection,
            from,
            host: self.host,
            port: self.port,
        })
    }
}
