//! In-memory stream replaying a scripted server
// Comes from https://github.com/inre/rust-mq/blob/master/netopt

use std::{
    io::{self, Cursor, Read, Write},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use super::{net::Connector, tls::TlsParameters};
use crate::error::{self, Error};

type MockCursor = Cursor<Vec<u8>>;

/// A [`Connector`] reading the server side from a buffer and recording
/// what the client writes
///
/// Clones share their buffers, so a clone kept by a test sees everything
/// written through the session.
///
/// ```rust
/// use std::io::{Read, Write};
///
/// use smtp_xoauth2::transport::smtp::client::mock::MockStream;
///
/// let mut mock = MockStream::with_vec(b"220 ready\r\n".to_vec());
/// let mut recorder = mock.clone();
///
/// mock.write_all(b"QUIT\r\n").unwrap();
/// assert_eq!(recorder.take_vec(), b"QUIT\r\n");
/// ```
#[derive(Clone, Debug, Default)]
pub struct MockStream {
    reader: Arc<Mutex<MockCursor>>,
    writer: Arc<Mutex<MockCursor>>,
    encrypted: bool,
    reject_tls: bool,
    block_at_end: bool,
}

impl MockStream {
    /// Creates a stream with nothing to read
    pub fn new() -> MockStream {
        MockStream::default()
    }

    /// Creates a stream replaying `vec` as the server side
    pub fn with_vec(vec: Vec<u8>) -> MockStream {
        MockStream {
            reader: Arc::new(Mutex::new(MockCursor::new(vec))),
            ..MockStream::default()
        }
    }

    /// Makes the TLS upgrade fail as a rejected handshake would
    pub fn reject_tls(mut self) -> MockStream {
        self.reject_tls = true;
        self
    }

    /// Reading past the script fails like an expired socket timeout,
    /// instead of reporting the end of the stream
    pub fn block_at_end(mut self) -> MockStream {
        self.block_at_end = true;
        self
    }

    /// Takes everything written so far
    pub fn take_vec(&mut self) -> Vec<u8> {
        let mut cursor = lock(&self.writer);
        let vec = cursor.get_ref().to_vec();
        cursor.set_position(0);
        cursor.get_mut().clear();
        vec
    }

    /// Replaces the server side with `vec`
    pub fn next_vec(&mut self, vec: &[u8]) {
        let mut cursor = lock(&self.reader);
        cursor.set_position(0);
        cursor.get_mut().clear();
        cursor.get_mut().extend_from_slice(vec);
    }
}

fn lock(cursor: &Mutex<MockCursor>) -> MutexGuard<'_, MockCursor> {
    cursor.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Write for MockStream {
    fn write(&mut self, msg: &[u8]) -> io::Result<usize> {
        lock(&self.writer).write(msg)
    }

    fn flush(&mut self) -> io::Result<()> {
        lock(&self.writer).flush()
    }
}

impl Read for MockStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let read = lock(&self.reader).read(buf)?;
        if read == 0 && self.block_at_end && !buf.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::WouldBlock,
                "Resource temporarily unavailable",
            ));
        }
        Ok(read)
    }
}

impl Connector for MockStream {
    fn upgrade_tls(&mut self, _tls_parameters: &TlsParameters) -> Result<(), Error> {
        if self.reject_tls {
            return Err(error::negotiation("certificate verify failed"));
        }
        self.encrypted = true;
        Ok(())
    }

    fn is_encrypted(&self) -> bool {
        self.encrypted
    }

    fn set_read_timeout(&mut self, _duration: Option<Duration>) -> io::Result<()> {
        Ok(())
    }

    fn set_write_timeout(&mut self, _duration: Option<Duration>) -> io::Result<()> {
        Ok(())
    }

    fn shutdown(&mut self) -> io::Result<()> {
        Ok(())
    }
}
