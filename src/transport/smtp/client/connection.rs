use std::{
    fmt::Display,
    io::{BufRead, BufReader, Write},
    time::{Duration, Instant},
};

#[cfg(feature = "tracing")]
use super::escape_crlf;
use super::{ClientCodec, Connector, NetworkStream, TlsParameters};
use crate::{
    address::Envelope,
    base64,
    error::{self, Error, Step},
    transport::smtp::{
        authentication::Authenticator,
        commands::{Auth, AuthResponse, Data, Ehlo, Mail, Quit, Rcpt, Starttls},
        extension::{ClientId, Extension, MailParameter, ServerInfo},
        response::{parse_response, Response},
    },
};

/// Limit challenges to avoid blocking
const MAX_CHALLENGES: u8 = 10;

macro_rules! try_smtp (
    ($err: expr, $client: ident) => ({
        match $err {
            Ok(val) => val,
            Err(err) => {
                $client.abort();
                return Err(err)
            },
        }
    })
);

/// Structure that implements the SMTP client
///
/// Every failure during the handshake, the authentication or a mail
/// transaction aborts the connection: `QUIT` is sent if possible and the
/// stream is shut down.
#[derive(Debug)]
pub struct SmtpConnection<S: Connector = NetworkStream> {
    /// Stream between client and server
    stream: BufReader<S>,
    /// Whether the connection was aborted
    panic: bool,
    /// Whether QUIT has been sent
    sent_quit: bool,
    /// Information about the server
    server_info: ServerInfo,
    /// Deadline given to each command/response pair
    command_timeout: Option<Duration>,
}

impl<S: Connector> SmtpConnection<S> {
    /// Starts an SMTP exchange on an open stream
    ///
    /// Reads the greeting, sends EHLO and parses server information
    pub fn from_stream(
        stream: S,
        command_timeout: Option<Duration>,
        hello_name: &ClientId,
    ) -> Result<SmtpConnection<S>, Error> {
        let mut conn = SmtpConnection {
            stream: BufReader::new(stream),
            panic: false,
            sent_quit: false,
            server_info: ServerInfo::default(),
            command_timeout,
        };

        let deadline = conn.deadline();
        let greeting = try_smtp!(
            conn.read_response(deadline)
                .map_err(|e| e.during(Step::Negotiation)),
            conn
        );
        #[cfg(feature = "tracing")]
        tracing::debug!("greeting: {}", greeting.text());
        #[cfg(not(feature = "tracing"))]
        let _ = greeting;

        try_smtp!(conn.ehlo(hello_name), conn);

        // Print server information
        #[cfg(feature = "tracing")]
        tracing::debug!("server {}", conn.server_info);
        Ok(conn)
    }

    /// Get information about the server
    pub fn server_info(&self) -> &ServerInfo {
        &self.server_info
    }

    /// Tells if the connection was aborted or closed
    pub fn has_broken(&self) -> bool {
        self.panic || self.sent_quit
    }

    /// Tells if the underlying stream is currently encrypted
    pub fn is_encrypted(&self) -> bool {
        self.stream.get_ref().is_encrypted()
    }

    /// Upgrades the connection with `STARTTLS`, then sends EHLO again
    ///
    /// Servers that do not offer `STARTTLS` are refused.
    pub fn starttls(
        &mut self,
        tls_parameters: &TlsParameters,
        hello_name: &ClientId,
    ) -> Result<(), Error> {
        if !self.server_info.supports_feature(Extension::StartTls) {
            self.abort();
            return Err(error::negotiation("STARTTLS is not supported on this server"));
        }

        try_smtp!(
            self.command(Starttls)
                .map_err(|e| e.during(Step::Negotiation)),
            self
        );

        // The handshake gets its own deadline
        try_smtp!(self.set_timeout(self.command_timeout), self);
        try_smtp!(
            self.stream.get_mut().upgrade_tls(tls_parameters),
            self
        );
        #[cfg(feature = "tracing")]
        tracing::debug!("connection encrypted");

        // Send EHLO again
        try_smtp!(self.ehlo(hello_name), self);
        Ok(())
    }

    /// Send EHLO and update server info
    fn ehlo(&mut self, hello_name: &ClientId) -> Result<(), Error> {
        let ehlo_response = self
            .command(Ehlo::new(hello_name.clone()))
            .map_err(|e| e.during(Step::Negotiation))?;
        self.server_info =
            ServerInfo::from_response(&ehlo_response).map_err(|e| e.during(Step::Negotiation))?;
        Ok(())
    }

    /// Runs a SASL exchange with the given authenticator
    ///
    /// Each `334` continuation is passed, base64-decoded, to the
    /// authenticator, whose answer is sent back. Fails if the server does
    /// not advertise the mechanism or rejects the exchange.
    pub fn auth(&mut self, authenticator: &mut dyn Authenticator) -> Result<Response, Error> {
        let mechanism = authenticator.mechanism();
        if !self.server_info.supports_auth_mechanism(mechanism) {
            self.abort();
            return Err(error::authentication(format!(
                "{mechanism} is not supported on this server"
            )));
        }

        let result = self.auth_exchange(authenticator);
        let result = match (result, authenticator.server_error()) {
            (Err(err), Some(detail)) if err.status().is_some() => Err(err.with_detail(detail)),
            (result, _) => result,
        };
        Ok(try_smtp!(result, self))
    }

    fn auth_exchange(&mut self, authenticator: &mut dyn Authenticator) -> Result<Response, Error> {
        let initial_response = authenticator.start()?;
        let mut response = self
            .sasl_command(Auth::new(authenticator.mechanism(), initial_response))
            .map_err(|e| e.during(Step::Authentication))?;

        let mut challenges = MAX_CHALLENGES;
        while response.has_code(334) {
            if challenges == 0 {
                return Err(error::authentication("Unexpected number of challenges"));
            }
            challenges -= 1;

            let encoded = response.first_line().unwrap_or_default();
            let challenge = base64::decode(encoded).unwrap_or_else(|_| encoded.as_bytes().to_vec());

            let answer = authenticator.next(&challenge, true)?.ok_or_else(|| {
                error::authentication("the mechanism has no answer to the server challenge")
            })?;
            response = self
                .sasl_command(AuthResponse::new(answer))
                .map_err(|e| e.during(Step::Authentication))?;
        }

        authenticator.next(&[], false)?;

        #[cfg(feature = "tracing")]
        tracing::debug!("authenticated with {}", authenticator.mechanism());
        Ok(response)
    }

    /// Sends a message: `MAIL FROM`, one `RCPT TO` per recipient, `DATA`
    /// and the dot-stuffed content
    pub fn send(&mut self, envelope: &Envelope, email: &[u8]) -> Result<Response, Error> {
        // Mail
        let mut mail_options = vec![];

        // Check for non-ascii addresses and use the SMTPUTF8 option if any.
        // https://tools.ietf.org/html/rfc6531
        if envelope.has_non_ascii_addresses() {
            if !self.server_info.supports_feature(Extension::SmtpUtfEight) {
                // don't try to send non-ascii addresses (per RFC)
                return Err(error::send(
                    "Envelope contains non-ascii chars but server does not support SMTPUTF8",
                ));
            }
            mail_options.push(MailParameter::SmtpUtfEight);
        }

        try_smtp!(
            self.command(Mail::new(envelope.from().clone(), mail_options))
                .map_err(|e| e.during(Step::Send)),
            self
        );

        // Recipient
        for to_address in envelope.to() {
            try_smtp!(
                self.command(Rcpt::new(to_address.clone()))
                    .map_err(|e| e.during(Step::Send)),
                self
            );
        }

        // Data
        try_smtp!(
            self.command(Data).map_err(|e| e.during(Step::Send)),
            self
        );

        // Message content
        let result = try_smtp!(
            self.message(email).map_err(|e| e.during(Step::Send)),
            self
        );
        Ok(result)
    }

    /// Sends `QUIT`
    pub fn quit(&mut self) -> Result<Response, Error> {
        self.sent_quit = true;
        self.command(Quit)
    }

    /// Closes the connection, ignoring errors
    pub fn abort(&mut self) {
        // Only try to quit if we are not already broken
        if !self.panic {
            self.panic = true;
            if !self.sent_quit {
                let _ = self.quit();
            }
            let _ = self.stream.get_mut().shutdown();
        }
    }

    /// Sends the message content
    fn message(&mut self, message: &[u8]) -> Result<Response, Error> {
        let deadline = self.deadline();

        let mut codec = ClientCodec::new();
        let mut out_buf = Vec::with_capacity(message.len());
        codec.encode(message, &mut out_buf);
        self.write(&out_buf, deadline)?;
        self.write(b"\r\n.\r\n", deadline)?;

        #[cfg(feature = "tracing")]
        tracing::debug!(">> message of {} bytes", out_buf.len());

        self.read_response(deadline)
    }

    /// Sends an SMTP command
    fn command<C: Display>(&mut self, command: C) -> Result<Response, Error> {
        let line = command.to_string();
        #[cfg(feature = "tracing")]
        tracing::debug!(">> {}", escape_crlf(&line));

        let deadline = self.deadline();
        self.write(line.as_bytes(), deadline)?;
        self.read_response(deadline)
    }

    /// Sends an SASL line, keeping its content out of the logs
    fn sasl_command<C: Display>(&mut self, command: C) -> Result<Response, Error> {
        #[cfg(feature = "tracing")]
        tracing::debug!(">> <redacted SASL payload>");

        let deadline = self.deadline();
        self.write(command.to_string().as_bytes(), deadline)?;
        self.read_response(deadline)
    }

    fn deadline(&self) -> Option<Instant> {
        self.command_timeout
            .map(|timeout| Instant::now() + timeout)
    }

    /// Time left before `deadline`, fails once it has passed
    fn remaining(deadline: Option<Instant>) -> Result<Option<Duration>, Error> {
        match deadline {
            Some(deadline) => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    Err(error::timeout("command deadline exceeded"))
                } else {
                    Ok(Some(remaining))
                }
            }
            None => Ok(None),
        }
    }

    fn set_timeout(&mut self, duration: Option<Duration>) -> Result<(), Error> {
        let stream = self.stream.get_mut();
        stream.set_read_timeout(duration).map_err(error::network)?;
        stream.set_write_timeout(duration).map_err(error::network)
    }

    /// Writes a string to the server
    fn write(&mut self, bytes: &[u8], deadline: Option<Instant>) -> Result<(), Error> {
        let remaining = Self::remaining(deadline)?;
        let stream = self.stream.get_mut();
        stream
            .set_write_timeout(remaining)
            .map_err(error::network)?;
        stream.write_all(bytes).map_err(error::network)?;
        stream.flush().map_err(error::network)
    }

    /// Gets the SMTP response
    fn read_response(&mut self, deadline: Option<Instant>) -> Result<Response, Error> {
        let mut buffer = String::with_capacity(100);

        loop {
            let remaining = Self::remaining(deadline)?;
            self.stream
                .get_mut()
                .set_read_timeout(remaining)
                .map_err(error::network)?;

            if self
                .stream
                .read_line(&mut buffer)
                .map_err(error::network)?
                == 0
            {
                return Err(error::response("incomplete response"));
            }

            #[cfg(feature = "tracing")]
            tracing::debug!("<< {}", escape_crlf(&buffer));
            match parse_response(&buffer) {
                Ok((_remaining, response)) => {
                    return if response.is_positive() {
                        Ok(response)
                    } else {
                        Err(error::code(response.code(), Some(response.text())))
                    };
                }
                Err(nom::Err::Incomplete(_)) => { /* read more */ }
                Err(nom::Err::Failure(e)) | Err(nom::Err::Error(e)) => {
                    return Err(error::response(e.to_string()));
                }
            }
        }
    }
}
