//! Owned OS-level I/O handles.
//!
//! A [`Handle`] owns exactly one open file or socket together with the mode it
//! was opened with and the URI it was opened from. Dropping the handle releases
//! the resource.

use std::fmt;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::mem::MaybeUninit;
use std::net::{Shutdown, TcpStream};
#[cfg(unix)]
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, RawFd};
#[cfg(unix)]
use std::os::unix::net::UnixStream;

use socket2::SockRef;

use crate::mode::Mode;

/// The kind of resource a [`Handle`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandleKind {
    /// A file, fifo or device opened from the filesystem.
    File,
    /// A TCP socket.
    Tcp,
    /// A unix-domain stream socket.
    #[cfg(unix)]
    Unix,
}

enum Transport {
    File(File),
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(UnixStream),
}

/// An owned, open I/O resource.
pub struct Handle {
    transport: Transport,
    mode: String,
    uri: Option<String>,
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut dbg = f.debug_struct("Handle");
        match &self.transport {
            Transport::File(file) => dbg.field("file", file),
            Transport::Tcp(stream) => dbg.field("tcp", stream),
            #[cfg(unix)]
            Transport::Unix(stream) => dbg.field("unix", stream),
        };
        dbg.field("mode", &self.mode)
            .field("uri", &self.uri)
            .finish()
    }
}

impl Handle {
    /// Wrap an open file, recording the mode it was opened with.
    ///
    /// The mode is reported verbatim in stream metadata and decides whether the
    /// stream permits reads and writes.
    pub fn file<M: Into<String>>(file: File, mode: M) -> Self {
        Self {
            transport: Transport::File(file),
            mode: mode.into(),
            uri: None,
        }
    }

    /// Wrap a connected TCP socket.
    pub fn tcp(stream: TcpStream) -> Self {
        Self {
            transport: Transport::Tcp(stream),
            mode: Mode::SOCKET.to_string(),
            uri: None,
        }
    }

    /// Wrap a connected unix-domain socket.
    #[cfg(unix)]
    pub fn unix(stream: UnixStream) -> Self {
        Self {
            transport: Transport::Unix(stream),
            mode: Mode::SOCKET.to_string(),
            uri: None,
        }
    }

    /// Record the URI this handle was opened from.
    pub fn with_uri<U: Into<String>>(mut self, uri: U) -> Self {
        self.uri = Some(uri.into());
        self
    }

    /// The kind of resource behind this handle.
    pub fn kind(&self) -> HandleKind {
        match self.transport {
            Transport::File(_) => HandleKind::File,
            Transport::Tcp(_) => HandleKind::Tcp,
            #[cfg(unix)]
            Transport::Unix(_) => HandleKind::Unix,
        }
    }

    /// The mode string this handle was opened with.
    pub fn mode(&self) -> &str {
        &self.mode
    }

    /// The URI this handle was opened from, if known.
    pub fn uri(&self) -> Option<&str> {
        self.uri.as_deref()
    }

    /// Whether this handle is a socket.
    pub fn is_socket(&self) -> bool {
        !matches!(self.transport, Transport::File(_))
    }

    /// Check that the descriptor is open, returning whether it supports
    /// random-access positioning.
    pub(crate) fn probe(&self) -> io::Result<bool> {
        match &self.transport {
            Transport::File(file) => file.metadata().map(|meta| meta.is_file()),
            Transport::Tcp(stream) => SockRef::from(stream).r#type().map(|_| false),
            #[cfg(unix)]
            Transport::Unix(stream) => SockRef::from(stream).r#type().map(|_| false),
        }
    }

    pub(crate) fn stream_type(&self) -> &'static str {
        match self.transport {
            Transport::File(_) => "STDIO",
            Transport::Tcp(_) => "tcp_socket",
            #[cfg(unix)]
            Transport::Unix(_) => "unix_socket",
        }
    }

    pub(crate) fn wrapper_type(&self) -> Option<&'static str> {
        if self.is_socket() {
            None
        } else {
            Some("plainfile")
        }
    }

    pub(crate) fn is_local(&self) -> bool {
        match &self.transport {
            Transport::File(_) => true,
            Transport::Tcp(stream) => stream
                .peer_addr()
                .map(crate::info::make_canonical)
                .is_ok_and(|addr| addr.ip().is_loopback()),
            #[cfg(unix)]
            Transport::Unix(_) => true,
        }
    }

    pub(crate) fn tcp_stream(&self) -> Option<&TcpStream> {
        match &self.transport {
            Transport::Tcp(stream) => Some(stream),
            _ => None,
        }
    }

    #[cfg(unix)]
    pub(crate) fn unix_stream(&self) -> Option<&UnixStream> {
        match &self.transport {
            Transport::Unix(stream) => Some(stream),
            _ => None,
        }
    }

    /// Current position of a file handle.
    pub(crate) fn position(&self) -> io::Result<u64> {
        match &self.transport {
            Transport::File(file) => {
                let mut file: &File = file;
                file.stream_position()
            }
            _ => Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "sockets have no position",
            )),
        }
    }

    /// Length of the underlying file.
    pub(crate) fn file_len(&self) -> io::Result<u64> {
        match &self.transport {
            Transport::File(file) => file.metadata().map(|meta| meta.len()),
            _ => Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "sockets have no length",
            )),
        }
    }

    /// Whether the peer of a socket has shut down its sending side with no data pending.
    ///
    /// Never blocks: when nothing is pending and the connection is still up, this is `false`.
    pub(crate) fn peer_closed(&self) -> io::Result<bool> {
        let socket = match &self.transport {
            Transport::File(_) => return Ok(false),
            Transport::Tcp(stream) => SockRef::from(stream),
            #[cfg(unix)]
            Transport::Unix(stream) => SockRef::from(stream),
        };

        let mut probe = [MaybeUninit::<u8>::uninit(); 1];
        socket.set_nonblocking(true)?;
        let peeked = socket.peek(&mut probe);
        socket.set_nonblocking(false)?;

        match peeked {
            Ok(n) => Ok(n == 0),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Flush pending writes and shut down sockets in both directions.
    pub(crate) fn shutdown(&mut self) -> io::Result<()> {
        self.flush()?;
        let result = match &self.transport {
            Transport::File(_) => Ok(()),
            Transport::Tcp(stream) => stream.shutdown(Shutdown::Both),
            #[cfg(unix)]
            Transport::Unix(stream) => stream.shutdown(Shutdown::Both),
        };

        match result {
            Err(e) if e.kind() == io::ErrorKind::NotConnected => Ok(()),
            result => result,
        }
    }
}

impl From<TcpStream> for Handle {
    fn from(stream: TcpStream) -> Self {
        Handle::tcp(stream)
    }
}

#[cfg(unix)]
impl From<UnixStream> for Handle {
    fn from(stream: UnixStream) -> Self {
        Handle::unix(stream)
    }
}

impl Read for Handle {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match &mut self.transport {
            Transport::File(file) => file.read(buf),
            Transport::Tcp(stream) => stream.read(buf),
            #[cfg(unix)]
            Transport::Unix(stream) => stream.read(buf),
        }
    }
}

impl Write for Handle {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match &mut self.transport {
            Transport::File(file) => file.write(buf),
            Transport::Tcp(stream) => stream.write(buf),
            #[cfg(unix)]
            Transport::Unix(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut self.transport {
            Transport::File(file) => file.flush(),
            Transport::Tcp(stream) => stream.flush(),
            #[cfg(unix)]
            Transport::Unix(stream) => stream.flush(),
        }
    }
}

impl Seek for Handle {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        match &mut self.transport {
            Transport::File(file) => file.seek(pos),
            _ => Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "sockets can't be positioned",
            )),
        }
    }
}

#[cfg(unix)]
impl AsFd for Handle {
    fn as_fd(&self) -> BorrowedFd<'_> {
        match &self.transport {
            Transport::File(file) => file.as_fd(),
            Transport::Tcp(stream) => stream.as_fd(),
            Transport::Unix(stream) => stream.as_fd(),
        }
    }
}

#[cfg(unix)]
impl AsRawFd for Handle {
    fn as_raw_fd(&self) -> RawFd {
        self.as_fd().as_raw_fd()
    }
}
