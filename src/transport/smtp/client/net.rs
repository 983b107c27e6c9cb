//! A trait to represent a stream

use std::{
    fmt::{self, Debug, Formatter},
    io::{self, Read, Write},
    mem,
    net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs},
    time::Duration,
};

use native_tls::{HandshakeError, TlsStream};

use super::tls::TlsParameters;
use crate::error::{self, Error};

/// A stream an SMTP session can run on
///
/// Implemented by [`NetworkStream`] for real servers and by
/// [`MockStream`](super::mock::MockStream) for scripted exchanges.
pub trait Connector: Read + Write {
    /// Upgrades the stream to TLS after a successful `STARTTLS`
    fn upgrade_tls(&mut self, tls_parameters: &TlsParameters) -> Result<(), Error>;
    /// Is the stream encrypted
    fn is_encrypted(&self) -> bool;
    /// Set read timeout for IO calls
    fn set_read_timeout(&mut self, duration: Option<Duration>) -> io::Result<()>;
    /// Set write timeout for IO calls
    fn set_write_timeout(&mut self, duration: Option<Duration>) -> io::Result<()>;
    /// Closes both directions of the stream
    fn shutdown(&mut self) -> io::Result<()>;
}

/// Represents the different types of underlying network streams
pub enum NetworkStream {
    /// Plain TCP stream
    Tcp(TcpStream),
    /// Encrypted TCP stream
    Tls(TlsStream<TcpStream>),
    /// Placeholder while the stream is being upgraded, or after a failed upgrade
    None,
}

impl NetworkStream {
    /// Opens a TCP connection, trying every resolved address in turn
    pub fn connect<T: ToSocketAddrs>(
        server: T,
        timeout: Option<Duration>,
    ) -> Result<NetworkStream, Error> {
        fn try_connect(addr: &SocketAddr, timeout: Option<Duration>) -> io::Result<TcpStream> {
            match timeout {
                Some(timeout) => TcpStream::connect_timeout(addr, timeout),
                None => TcpStream::connect(addr),
            }
        }

        let addrs = server.to_socket_addrs().map_err(error::connection)?;

        let mut last_err = None;
        for addr in addrs {
            #[cfg(feature = "tracing")]
            tracing::debug!("connecting to {}", addr);

            match try_connect(&addr, timeout) {
                Ok(stream) => return Ok(NetworkStream::Tcp(stream)),
                Err(err) => last_err = Some(err),
            }
        }

        Err(error::connection(last_err.unwrap_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                "could not resolve to any address",
            )
        })))
    }

    fn upgrade_tls_impl(
        tcp_stream: TcpStream,
        tls_parameters: &TlsParameters,
    ) -> Result<TlsStream<TcpStream>, Error> {
        tls_parameters
            .connector
            .connect(&tls_parameters.domain, tcp_stream)
            .map_err(|err| match err {
                HandshakeError::Failure(err) => error::negotiation(err),
                // The socket timeouts expired in the middle of the handshake
                HandshakeError::WouldBlock(_) => error::timeout("TLS handshake timed out"),
            })
    }

    fn tcp_stream(&self) -> io::Result<&TcpStream> {
        match *self {
            NetworkStream::Tcp(ref s) => Ok(s),
            NetworkStream::Tls(ref s) => Ok(s.get_ref()),
            NetworkStream::None => Err(not_connected()),
        }
    }
}

impl Connector for NetworkStream {
    fn upgrade_tls(&mut self, tls_parameters: &TlsParameters) -> Result<(), Error> {
        match mem::replace(self, NetworkStream::None) {
            NetworkStream::Tcp(tcp_stream) => {
                *self = NetworkStream::Tls(Self::upgrade_tls_impl(tcp_stream, tls_parameters)?);
                Ok(())
            }
            other => {
                *self = other;
                Ok(())
            }
        }
    }

    fn is_encrypted(&self) -> bool {
        matches!(*self, NetworkStream::Tls(_))
    }

    fn set_read_timeout(&mut self, duration: Option<Duration>) -> io::Result<()> {
        self.tcp_stream()?.set_read_timeout(duration)
    }

    fn set_write_timeout(&mut self, duration: Option<Duration>) -> io::Result<()> {
        self.tcp_stream()?.set_write_timeout(duration)
    }

    fn shutdown(&mut self) -> io::Result<()> {
        if let NetworkStream::Tls(ref mut s) = *self {
            // close_notify, the TCP shutdown below closes the socket anyway
            let _ = s.shutdown();
        }
        self.tcp_stream()?.shutdown(Shutdown::Both)
    }
}

impl Debug for NetworkStream {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match *self {
            NetworkStream::Tcp(_) => f.write_str("NetworkStream::Tcp(_)"),
            NetworkStream::Tls(_) => f.write_str("NetworkStream::Tls(_)"),
            NetworkStream::None => f.write_str("NetworkStream::None"),
        }
    }
}

impl Read for NetworkStream {
    #[inline]
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match *self {
            NetworkStream::Tcp(ref mut s) => s.read(buf),
            NetworkStream::Tls(ref mut s) => s.read(buf),
            NetworkStream::None => Err(not_connected()),
        }
    }
}

impl Write for NetworkStream {
    #[inline]
    fn write(&mut self, msg: &[u8]) -> io::Result<usize> {
        match *self {
            NetworkStream::Tcp(ref mut s) => s.write(msg),
            NetworkStream::Tls(ref mut s) => s.write(msg),
            NetworkStream::None => Err(not_connected()),
        }
    }

    #[inline]
    fn flush(&mut self) -> io::Result<()> {
        match *self {
            NetworkStream::Tcp(ref mut s) => s.flush(),
            NetworkStream::Tls(ref mut s) => s.flush(),
            NetworkStream::None => Err(not_connected()),
        }
    }
}

fn not_connected() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "stream is closed")
}

#[cfg(test)]
mod test {
    use std::net::TcpListener;

    use super::*;

    #[test]
    fn connect_refused() {
        // Bind then drop to get a local port nobody listens on
        let port = TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();

        let err = NetworkStream::connect(("127.0.0.1", port), Some(Duration::from_secs(5)))
            .unwrap_err();
        assert!(err.is_connection());
    }

    #[test]
    fn connect_plain() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let mut stream = NetworkStream::connect(addr, Some(Duration::from_secs(5))).unwrap();
        assert!(!stream.is_encrypted());
        listener.accept().unwrap();
        stream.shutdown().unwrap();
    }

    #[test]
    fn placeholder_is_not_connected() {
        let mut stream = NetworkStream::None;
        assert_eq!(
            stream.write(b"EHLO").unwrap_err().kind(),
            io::ErrorKind::NotConnected
        );
        assert!(stream.set_read_timeout(None).is_err());
    }
}
