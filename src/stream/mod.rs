//! Binary-safe streams over files and sockets.
//!
//! A [`Stream`] owns one open [`Handle`] and exposes the same read, write,
//! positioning and metadata operations whatever the transport behind it is.
//! Streams are normally produced by one of the factories:
//!
//! - [`FileStream`] opens a filesystem path with an `fopen`-style mode.
//! - [`NetworkStream`] connects to a `tcp://` or `unix://` address.
//!
//! # Examples
//!
//! ```rust,no_run
//! use streamer::{FileStream, NetworkStream};
//!
//! # fn example() -> Result<(), streamer::Error> {
//! let mut source = FileStream::create("/var/log/syslog", "r")?;
//! let mut sink = NetworkStream::create("tcp://127.0.0.1:5140")?;
//!
//! while !source.is_eof() {
//!     let line = source.read_line(None)?;
//!     sink.write(&line, None)?;
//!     sink.write(b"\n", None)?;
//! }
//! sink.close()?;
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::io::{self, Read as _, Seek as _, SeekFrom, Write as _};

use bytes::{Buf as _, Bytes, BytesMut};
use tracing::{debug, trace};

use crate::Error;
use crate::handle::Handle;
use crate::mode::{is_readable_mode, is_writable_mode};

pub mod file;
mod metadata;
pub mod net;

pub use self::file::{FileContext, FileStream};
pub use self::metadata::{Metadata, MetadataValue};
pub use self::net::{ConnectFlags, NetworkStream, SocketContext};

/// Default number of bytes returned by reads without an explicit length.
pub const DEFAULT_BUFFER_SIZE: usize = 4096;

/// Largest single transport read.
const READ_CHUNK: usize = 64 * 1024;

/// A binary-safe stream which exclusively owns one open [`Handle`].
///
/// All operations block the calling thread. The handle is released exactly once,
/// either by [`Stream::close`] or when the stream is dropped.
pub struct Stream {
    handle: Option<Handle>,
    seekable: bool,
    buffer_size: usize,
    read_buffer: BytesMut,
    eof: bool,
}

impl fmt::Debug for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stream")
            .field("handle", &self.handle)
            .field("seekable", &self.seekable)
            .field("buffer_size", &self.buffer_size)
            .field("unread", &self.read_buffer.len())
            .field("eof", &self.eof)
            .finish()
    }
}

impl Stream {
    /// Take ownership of an open handle.
    ///
    /// Fails with [`Error::InvalidArgument`] when the handle doesn't refer to an
    /// open descriptor of its kind. A descriptor which isn't open at all is not
    /// closed, since it isn't known to own anything; any other rejected handle is
    /// released.
    pub fn new(handle: Handle) -> Result<Self, Error> {
        let seekable = match handle.probe() {
            Ok(seekable) => seekable,
            Err(error) => {
                debug!(%error, "handle failed the open probe");
                if is_bad_descriptor(&error) {
                    std::mem::forget(handle);
                } else {
                    drop(handle);
                }
                return Err(Error::invalid_argument(
                    "A Stream object requires an open handle as constructor argument",
                ));
            }
        };

        trace!(kind = ?handle.kind(), mode = handle.mode(), seekable, "stream opened");
        Ok(Self {
            handle: Some(handle),
            seekable,
            buffer_size: DEFAULT_BUFFER_SIZE,
            read_buffer: BytesMut::new(),
            eof: false,
        })
    }

    /// The owned handle, or `None` once the stream is closed.
    pub fn resource(&self) -> Option<&Handle> {
        self.handle.as_ref()
    }

    /// Descriptive metadata for the stream.
    pub fn metadata(&self) -> Result<Metadata, Error> {
        let handle = self
            .handle
            .as_ref()
            .ok_or_else(|| Error::logic("Cannot inspect a closed stream"))?;

        Ok(Metadata {
            uri: handle.uri().map(ToOwned::to_owned),
            stream_type: handle.stream_type(),
            wrapper_type: handle.wrapper_type(),
            wrapper_data: None,
            mode: handle.mode().to_owned(),
            seekable: self.seekable,
            eof: self.eof && self.read_buffer.is_empty(),
            unread_bytes: self.read_buffer.len(),
        })
    }

    /// A single metadata field. Unknown keys yield `Ok(None)`.
    pub fn metadata_for_key(&self, key: &str) -> Result<Option<MetadataValue>, Error> {
        Ok(self.metadata()?.get(key))
    }

    /// The path or address the stream was opened from.
    pub fn uri(&self) -> Option<&str> {
        self.handle.as_ref().and_then(Handle::uri)
    }

    /// The transport type, e.g. `STDIO` or `tcp_socket`.
    pub fn stream_type(&self) -> Option<&'static str> {
        self.handle.as_ref().map(Handle::stream_type)
    }

    /// The wrapper which opened the stream, if any.
    pub fn wrapper_type(&self) -> Option<&'static str> {
        self.handle.as_ref().and_then(Handle::wrapper_type)
    }

    /// Wrapper-specific data, if the wrapper attached any.
    pub fn wrapper_data(&self) -> Option<String> {
        self.metadata().ok().and_then(|meta| meta.wrapper_data)
    }

    /// The mode the handle was opened with.
    pub fn mode(&self) -> Option<&str> {
        self.handle.as_ref().map(Handle::mode)
    }

    /// Whether the stream refers to a resource on this machine.
    pub fn is_local(&self) -> bool {
        self.handle.as_ref().is_some_and(Handle::is_local)
    }

    /// Whether the current mode permits reading.
    pub fn is_readable(&self) -> bool {
        self.mode().is_some_and(is_readable_mode)
    }

    /// Whether the current mode permits writing.
    pub fn is_writable(&self) -> bool {
        self.mode().is_some_and(is_writable_mode)
    }

    /// Whether the stream supports random-access positioning.
    pub fn is_seekable(&self) -> bool {
        self.handle.is_some() && self.seekable
    }

    /// Whether the stream is still open.
    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    /// Set the number of bytes returned by reads without an explicit length.
    pub fn set_buffer_size(&mut self, size: usize) -> Result<(), Error> {
        if size == 0 {
            return Err(Error::invalid_argument("Buffer size must be positive"));
        }
        self.buffer_size = size;
        Ok(())
    }

    /// The number of bytes returned by reads without an explicit length.
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Read up to `length` bytes, or up to the buffer size when `length` is `None`.
    /// `Some(0)` reads nothing and returns an empty result; only `None` selects the
    /// buffer size.
    ///
    /// Files are read until `length` bytes or the end of the file; sockets return
    /// whatever the first successful read delivers. An empty result means the end
    /// of the stream was reached.
    pub fn read(&mut self, length: Option<usize>) -> Result<Bytes, Error> {
        let Stream {
            handle,
            seekable,
            buffer_size,
            read_buffer,
            eof,
        } = self;
        let handle = readable(handle)?;
        let length = length.unwrap_or(*buffer_size);

        let mut out = read_buffer.split_to(length.min(read_buffer.len()));
        while out.len() < length {
            if !out.is_empty() && !*seekable {
                break;
            }

            let want = (length - out.len()).min(chunk_limit(*buffer_size));
            let n = read_transport(handle, &mut out, want)
                .map_err(Error::io("Cannot read stream"))?;
            if n == 0 {
                *eof = true;
                break;
            }
        }

        Ok(out.freeze())
    }

    /// Read one line, ending at a `\n` which is consumed but not returned.
    pub fn read_line(&mut self, length: Option<usize>) -> Result<Bytes, Error> {
        self.get_line(length, b"\n")
    }

    /// Read until `length` bytes have been read, `ending` is found, or the end of
    /// the stream, whichever comes first.
    ///
    /// The ending is consumed but not included in the result. An empty ending
    /// reads `length` bytes.
    pub fn get_line(&mut self, length: Option<usize>, ending: &[u8]) -> Result<Bytes, Error> {
        let Stream {
            handle,
            buffer_size,
            read_buffer,
            eof,
            ..
        } = self;
        let handle = readable(handle)?;
        let limit = length.unwrap_or(*buffer_size);
        let mut exhausted = false;

        loop {
            if !ending.is_empty() {
                let window = read_buffer.len().min(limit.saturating_add(ending.len()));
                if let Some(idx) = find(&read_buffer[..window], ending) {
                    let line = read_buffer.split_to(idx).freeze();
                    read_buffer.advance(ending.len());
                    return Ok(line);
                }
            }

            if read_buffer.len() >= limit || exhausted {
                let n = limit.min(read_buffer.len());
                return Ok(read_buffer.split_to(n).freeze());
            }

            let n = read_transport(handle, read_buffer, chunk_limit(*buffer_size))
                .map_err(Error::io("Cannot read stream"))?;
            if n == 0 {
                *eof = true;
                exhausted = true;
            }
        }
    }

    /// Read everything remaining until the end of the stream.
    pub fn get_content(&mut self) -> Result<Bytes, Error> {
        let Stream {
            handle,
            read_buffer,
            eof,
            ..
        } = self;
        let handle = readable(handle)?;

        let mut content = read_buffer.to_vec();
        read_buffer.clear();
        handle
            .read_to_end(&mut content)
            .map_err(Error::io("Cannot read stream"))?;
        *eof = true;

        Ok(Bytes::from(content))
    }

    /// Whether the stream has no more data to give.
    ///
    /// For files this compares the position with the file length. For sockets it
    /// reports whether a read already ran into the end, or whether the peer has
    /// shut down with nothing left pending. Closed streams are always at the end.
    pub fn is_eof(&self) -> bool {
        let Some(handle) = self.handle.as_ref() else {
            return true;
        };
        if !self.read_buffer.is_empty() {
            return false;
        }

        if self.seekable {
            match (handle.position(), handle.file_len()) {
                (Ok(position), Ok(len)) => position >= len,
                _ => self.eof,
            }
        } else {
            self.eof || handle.peer_closed().unwrap_or(true)
        }
    }

    /// Write `data`, stopping after `length` bytes when given.
    ///
    /// Returns the number of bytes written, which is short only when the
    /// transport stopped accepting data part-way through.
    pub fn write(&mut self, data: &[u8], length: Option<usize>) -> Result<usize, Error> {
        let handle = self
            .handle
            .as_mut()
            .ok_or_else(|| Error::logic("Cannot write on a closed stream"))?;
        if !is_writable_mode(handle.mode()) {
            return Err(Error::logic(format!(
                "Cannot write on a non-writable stream (current mode is {})",
                handle.mode()
            )));
        }

        let data = match length {
            Some(length) => &data[..length.min(data.len())],
            None => data,
        };

        if self.seekable {
            unread(handle, &mut self.read_buffer).map_err(Error::io("Cannot write on stream"))?;
            self.eof = false;
        }

        let mut written = 0;
        while written < data.len() {
            match handle.write(&data[written..]) {
                Ok(0) => break,
                Ok(n) => written += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(error) if written > 0 => {
                    debug!(%error, written, "short write");
                    break;
                }
                Err(error) => return Err(Error::io("Cannot write on stream")(error)),
            }
        }

        Ok(written)
    }

    /// Flush any data buffered by the transport.
    pub fn flush(&mut self) -> Result<(), Error> {
        self.handle
            .as_mut()
            .ok_or_else(|| Error::logic("Cannot flush a closed stream"))?
            .flush()
            .map_err(Error::io("Cannot flush stream"))
    }

    /// Copy everything remaining in this stream into `destination`, returning the
    /// number of bytes copied.
    ///
    /// Modes aren't checked here; a destination which can't be written surfaces
    /// the transport's own error.
    pub fn pipe(&mut self, destination: &mut Stream) -> Result<u64, Error> {
        let source = self
            .handle
            .as_mut()
            .ok_or_else(|| Error::logic("Cannot pipe from a closed stream"))?;
        let target = destination
            .handle
            .as_mut()
            .ok_or_else(|| Error::logic("Cannot pipe into a closed stream"))?;

        if destination.seekable {
            unread(target, &mut destination.read_buffer).map_err(Error::io("Cannot pipe stream"))?;
        }

        let mut total = 0;
        if !self.read_buffer.is_empty() {
            target
                .write_all(&self.read_buffer)
                .map_err(Error::io("Cannot pipe stream"))?;
            total += self.read_buffer.len() as u64;
            self.read_buffer.clear();
        }

        total += io::copy(source, target).map_err(Error::io("Cannot pipe stream"))?;
        self.eof = true;

        trace!(bytes = total, "stream piped");
        Ok(total)
    }

    /// Move back to the start of the stream.
    ///
    /// Sockets can't be rewound; they fail with [`Error::Logic`].
    pub fn rewind(&mut self) -> Result<(), Error> {
        self.seek(SeekFrom::Start(0)).map(|_| ())
    }

    /// Move to a new position, returning it as an offset from the start.
    pub fn seek(&mut self, pos: SeekFrom) -> Result<u64, Error> {
        let handle = self
            .handle
            .as_mut()
            .ok_or_else(|| Error::logic("Cannot seek on a closed stream"))?;
        if !self.seekable {
            return Err(Error::logic(format!(
                "Cannot seek on a non-seekable stream (stream type is {})",
                handle.stream_type()
            )));
        }

        let pos = match pos {
            SeekFrom::Current(offset) => i64::try_from(self.read_buffer.len())
                .ok()
                .and_then(|unread| offset.checked_sub(unread))
                .map(SeekFrom::Current)
                .ok_or_else(|| Error::invalid_argument("Seek offset out of range"))?,
            pos => pos,
        };
        let position = handle.seek(pos).map_err(Error::io("Cannot seek stream"))?;
        self.read_buffer.clear();
        self.eof = false;

        Ok(position)
    }

    /// The current position as an offset from the start.
    pub fn tell(&mut self) -> Result<u64, Error> {
        self.seek(SeekFrom::Current(0))
    }

    /// Close the stream, releasing its handle.
    ///
    /// Closing twice is an error. When the transport fails to shut down, the
    /// stream stays open and closing may be retried.
    pub fn close(&mut self) -> Result<(), Error> {
        let Some(handle) = self.handle.as_mut() else {
            return Err(Error::logic("Stream is already closed"));
        };
        handle.shutdown().map_err(Error::io("Cannot close stream"))?;

        self.handle = None;
        self.read_buffer.clear();
        trace!("stream closed");
        Ok(())
    }
}

impl Drop for Stream {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            trace!(kind = ?handle.kind(), "releasing unclosed stream");
            drop(handle);
        }
    }
}

/// Borrow the handle for reading, checking the stream is open and readable.
fn readable(handle: &mut Option<Handle>) -> Result<&mut Handle, Error> {
    let handle = handle
        .as_mut()
        .ok_or_else(|| Error::logic("Cannot read from a closed stream"))?;
    if !is_readable_mode(handle.mode()) {
        return Err(Error::logic(format!(
            "Cannot read on a non readable stream (current mode is {})",
            handle.mode()
        )));
    }
    Ok(handle)
}

#[cfg(unix)]
fn is_bad_descriptor(error: &io::Error) -> bool {
    error.raw_os_error() == Some(libc::EBADF)
}

#[cfg(not(unix))]
fn is_bad_descriptor(_error: &io::Error) -> bool {
    false
}

fn chunk_limit(buffer_size: usize) -> usize {
    buffer_size.min(READ_CHUNK)
}

/// Append up to `max` bytes from the transport to `buf`, retrying interrupted reads.
fn read_transport(handle: &mut Handle, buf: &mut BytesMut, max: usize) -> io::Result<usize> {
    let start = buf.len();
    buf.resize(start + max, 0);
    loop {
        match handle.read(&mut buf[start..]) {
            Ok(n) => {
                buf.truncate(start + n);
                return Ok(n);
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                buf.truncate(start);
                return Err(e);
            }
        }
    }
}

/// Hand read-ahead bytes back to a seekable handle by moving its position back.
fn unread(handle: &mut Handle, read_buffer: &mut BytesMut) -> io::Result<()> {
    if !read_buffer.is_empty() {
        handle.seek(SeekFrom::Current(-(read_buffer.len() as i64)))?;
        read_buffer.clear();
    }
    Ok(())
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

impl io::Read for Stream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let Stream {
            handle,
            read_buffer,
            eof,
            ..
        } = self;
        let handle = readable(handle)?;

        if !read_buffer.is_empty() {
            let n = buf.len().min(read_buffer.len());
            buf[..n].copy_from_slice(&read_buffer[..n]);
            read_buffer.advance(n);
            return Ok(n);
        }

        let n = loop {
            match handle.read(buf) {
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                result => break result?,
            }
        };
        if n == 0 && !buf.is_empty() {
            *eof = true;
        }
        Ok(n)
    }
}

impl io::Write for Stream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(Stream::write(self, buf, None)?)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(Stream::flush(self)?)
    }
}

impl io::Seek for Stream {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        Ok(Stream::seek(self, pos)?)
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Seek as _, Write as _};
    use std::net::{TcpListener, TcpStream};

    use super::*;
    use crate::ErrorKind;

    static_assertions::assert_impl_all!(Stream: Send);

    fn scratch(mode: &str, contents: &[u8]) -> Stream {
        let mut file = tempfile::tempfile().unwrap();
        file.write_all(contents).unwrap();
        file.rewind().unwrap();
        Stream::new(Handle::file(file, mode)).unwrap()
    }

    fn socket_pair() -> (Stream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let client = TcpStream::connect(listener.local_addr().unwrap()).unwrap();
        let (server, _) = listener.accept().unwrap();
        (Stream::new(Handle::tcp(client)).unwrap(), server)
    }

    #[test]
    fn new_stream_is_open() {
        let stream = scratch("r", b"");
        assert!(stream.is_open());
        assert!(stream.resource().is_some());
        assert_eq!(stream.buffer_size(), DEFAULT_BUFFER_SIZE);
        assert!(stream.is_seekable());
        assert!(stream.is_local());
    }

    #[cfg(unix)]
    #[test]
    fn resource_is_the_constructed_handle() {
        use std::os::fd::AsRawFd as _;

        let file = tempfile::tempfile().unwrap();
        let fd = file.as_raw_fd();
        let stream = Stream::new(Handle::file(file, "r")).unwrap();
        assert_eq!(stream.resource().unwrap().as_raw_fd(), fd);
    }

    #[cfg(unix)]
    #[test]
    fn rejects_descriptor_which_is_not_open() {
        use std::os::fd::FromRawFd as _;

        // SAFETY: this descriptor number is far beyond any process limit, so it is never
        // open, and `Stream::new` does not close handles whose probe reports EBADF.
        let file = unsafe { std::fs::File::from_raw_fd(0x3fff_fff0) };
        let err = Stream::new(Handle::file(file, "r")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[cfg(unix)]
    #[test]
    fn releases_open_descriptor_of_the_wrong_kind() {
        use std::io::Read as _;
        use std::os::fd::OwnedFd;

        let (mut reader, writer) = std::io::pipe().unwrap();
        let not_a_socket = TcpStream::from(OwnedFd::from(writer));

        let err = Stream::new(Handle::tcp(not_a_socket)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        // End of file only arrives once the write end has been closed.
        let mut rest = Vec::new();
        assert_eq!(reader.read_to_end(&mut rest).unwrap(), 0);
    }

    #[test]
    fn huge_buffer_size_reads_short_file() {
        let mut stream = scratch("r", b"abc
def");
        stream.set_buffer_size(usize::MAX).unwrap();
        assert_eq!(stream.read(None).unwrap(), &b"abc
def"[..]);
        assert!(stream.is_eof());

        let mut stream = scratch("r", b"abc
def");
        stream.set_buffer_size(1 << 40).unwrap();
        assert_eq!(stream.read_line(None).unwrap(), &b"abc"[..]);
        assert_eq!(stream.read_line(None).unwrap(), &b"def"[..]);
    }

    #[test]
    fn read_of_zero_bytes_is_empty() {
        let mut stream = scratch("r", b"data");
        assert!(stream.read(Some(0)).unwrap().is_empty());
        assert_eq!(stream.read(None).unwrap(), &b"data"[..]);
    }

    #[test]
    fn seek_offset_overflow_is_rejected() {
        let mut stream = scratch("r", b"abc
def");
        assert_eq!(stream.read_line(None).unwrap(), &b"abc"[..]);

        let err = stream.seek(SeekFrom::Current(i64::MIN)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(stream.read_line(None).unwrap(), &b"def"[..]);
    }

    #[test]
    fn failing_transport_is_a_runtime_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("one-way");
        std::fs::write(&path, b"content").unwrap();

        // The handle claims update access but the descriptor only allows reads.
        let read_only = std::fs::File::open(&path).unwrap();
        let mut stream = Stream::new(Handle::file(read_only, "r+")).unwrap();
        let err = stream.write(b"x", None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Runtime);
        assert!(err.io_error().is_some());

        let write_only = std::fs::OpenOptions::new().write(true).open(&path).unwrap();
        let mut stream = Stream::new(Handle::file(write_only, "r+")).unwrap();
        let err = stream.read(None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Runtime);
    }

    #[test]
    fn write_to_reset_peer_is_a_runtime_error() {
        let (mut stream, server) = socket_pair();
        socket2::SockRef::from(&server)
            .set_linger(Some(std::time::Duration::ZERO))
            .unwrap();
        drop(server);

        let mut last = None;
        for _ in 0..100 {
            match stream.write(&[0u8; 1024], None) {
                Ok(_) => std::thread::sleep(std::time::Duration::from_millis(10)),
                Err(err) => {
                    last = Some(err);
                    break;
                }
            }
        }

        let err = last.expect("writes to a reset connection should fail");
        assert_eq!(err.kind(), ErrorKind::Runtime);
    }

    #[test]
    fn mode_decides_direction() {
        let stream = scratch("r", b"");
        assert!(stream.is_readable());
        assert!(!stream.is_writable());

        let stream = scratch("a", b"");
        assert!(!stream.is_readable());
        assert!(stream.is_writable());

        let stream = scratch("c+b", b"");
        assert!(stream.is_readable());
        assert!(stream.is_writable());

        let stream = scratch("rw", b"");
        assert!(!stream.is_readable());
        assert!(!stream.is_writable());
    }

    #[test]
    fn write_rewind_read() {
        let mut stream = scratch("w+", b"");
        let payload = b"binary\0safe\xff\n";
        assert_eq!(stream.write(payload, None).unwrap(), payload.len());

        stream.rewind().unwrap();
        assert_eq!(stream.read(Some(payload.len())).unwrap(), &payload[..]);
        assert!(stream.is_eof());
    }

    #[test]
    fn write_respects_length() {
        let mut stream = scratch("w+", b"");
        assert_eq!(stream.write(b"abcdef", Some(3)).unwrap(), 3);
        assert_eq!(stream.write(b"gh", Some(10)).unwrap(), 2);
        stream.rewind().unwrap();
        assert_eq!(stream.get_content().unwrap(), &b"abcgh"[..]);
    }

    #[test]
    fn buffer_size_bounds_default_reads() {
        let mut stream = scratch("r", &[7u8; 25]);
        stream.set_buffer_size(10).unwrap();
        assert_eq!(stream.read(None).unwrap().len(), 10);
        assert_eq!(stream.read(None).unwrap().len(), 10);
        assert_eq!(stream.read(None).unwrap().len(), 5);
        assert!(stream.read(None).unwrap().is_empty());
        assert!(stream.is_eof());
    }

    #[test]
    fn zero_buffer_size_is_rejected() {
        let mut stream = scratch("r", b"");
        let err = stream.set_buffer_size(0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(stream.buffer_size(), DEFAULT_BUFFER_SIZE);
    }

    #[test]
    fn get_line_splits_on_ending() {
        let mut stream = scratch("r", b"abc\ndef");
        assert_eq!(stream.read_line(None).unwrap(), &b"abc"[..]);
        assert_eq!(stream.read_line(None).unwrap(), &b"def"[..]);
        assert!(stream.read_line(None).unwrap().is_empty());
    }

    #[test]
    fn get_line_with_custom_ending_and_length() {
        let mut stream = scratch("r", b"one\r\ntwo\r\nthree-four");
        assert_eq!(stream.get_line(None, b"\r\n").unwrap(), &b"one"[..]);
        assert_eq!(stream.get_line(Some(2), b"\r\n").unwrap(), &b"tw"[..]);
        assert_eq!(stream.get_line(None, b"\r\n").unwrap(), &b"o"[..]);
        assert_eq!(stream.get_line(Some(5), b"\r\n").unwrap(), &b"three"[..]);
        assert_eq!(stream.get_line(None, b"").unwrap(), &b"-four"[..]);
    }

    #[test]
    fn read_after_get_line_sees_read_ahead() {
        let mut stream = scratch("r+", b"head\nbody");
        assert_eq!(stream.read_line(None).unwrap(), &b"head"[..]);
        assert_eq!(stream.metadata().unwrap().unread_bytes, 4);
        assert!(!stream.is_eof());
        assert_eq!(stream.tell().unwrap(), 5);
        assert_eq!(stream.read(None).unwrap(), &b"body"[..]);
    }

    #[test]
    fn write_after_get_line_lands_at_logical_position() {
        let mut stream = scratch("r+", b"head\nbody");
        stream.read_line(None).unwrap();
        stream.write(b"BO", None).unwrap();
        stream.rewind().unwrap();
        assert_eq!(stream.get_content().unwrap(), &b"head\nBOdy"[..]);
    }

    #[test]
    fn reading_requires_readable_mode() {
        let mut stream = scratch("w", b"");
        let err = stream.read(None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Logic);
        assert!(err.to_string().contains("current mode is w"));

        assert!(stream.read_line(None).is_err());
        assert!(stream.get_content().is_err());
    }

    #[test]
    fn writing_requires_writable_mode() {
        let mut stream = scratch("rb", b"data");
        let err = stream.write(b"x", None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Logic);
        assert!(err.to_string().contains("current mode is rb"));
    }

    #[test]
    fn closed_stream_rejects_io() {
        let mut stream = scratch("r+", b"data");
        stream.close().unwrap();
        assert!(!stream.is_open());
        assert!(stream.resource().is_none());
        assert!(!stream.is_readable());
        assert!(stream.is_eof());

        let err = stream.read(None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Logic);
        assert_eq!(err.to_string(), "Cannot read from a closed stream");
        assert_eq!(
            stream.write(b"x", None).unwrap_err().kind(),
            ErrorKind::Logic
        );
        assert_eq!(stream.metadata().unwrap_err().kind(), ErrorKind::Logic);
    }

    #[test]
    fn double_close_is_an_error() {
        let mut stream = scratch("r", b"");
        stream.close().unwrap();
        let err = stream.close().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Logic);
        assert_eq!(err.to_string(), "Stream is already closed");
    }

    #[test]
    fn pipe_copies_everything() {
        let payload: Vec<u8> = (0..20_000u32).map(|i| (i % 251) as u8).collect();
        let mut source = scratch("r", &payload);
        let mut destination = scratch("w+", b"");

        assert_eq!(source.pipe(&mut destination).unwrap(), payload.len() as u64);
        destination.rewind().unwrap();
        assert_eq!(destination.get_content().unwrap(), payload);
    }

    #[test]
    fn pipe_includes_read_ahead() {
        let mut source = scratch("r", b"first\nrest of it");
        let mut destination = scratch("w+", b"");
        source.read_line(None).unwrap();

        assert_eq!(source.pipe(&mut destination).unwrap(), 10);
        destination.rewind().unwrap();
        assert_eq!(destination.get_content().unwrap(), &b"rest of it"[..]);
    }

    #[test]
    fn pipe_from_closed_stream() {
        let mut source = scratch("r", b"data");
        let mut destination = scratch("w", b"");
        source.close().unwrap();
        assert_eq!(
            source.pipe(&mut destination).unwrap_err().kind(),
            ErrorKind::Logic
        );
    }

    #[test]
    fn metadata_of_file() {
        let stream = scratch("a+", b"");
        let meta = stream.metadata().unwrap();
        assert_eq!(meta.mode, "a+");
        assert_eq!(meta.stream_type, "STDIO");
        assert_eq!(meta.wrapper_type, Some("plainfile"));
        assert!(meta.seekable);
        assert_eq!(
            stream.metadata_for_key("mode").unwrap(),
            Some(MetadataValue::Str("a+".into()))
        );
        assert_eq!(stream.metadata_for_key("bogus").unwrap(), None);
        assert_eq!(stream.uri(), None);
        assert_eq!(stream.wrapper_data(), None);
    }

    #[test]
    fn seek_and_tell() {
        let mut stream = scratch("r", b"0123456789");
        assert_eq!(stream.seek(SeekFrom::Start(4)).unwrap(), 4);
        assert_eq!(stream.read(Some(2)).unwrap(), &b"45"[..]);
        assert_eq!(stream.tell().unwrap(), 6);
        assert_eq!(stream.seek(SeekFrom::End(-1)).unwrap(), 9);
        assert_eq!(stream.read(None).unwrap(), &b"9"[..]);
    }

    #[test]
    fn std_io_traits() {
        use std::io::{Read as _, Seek as _, Write as _};

        let mut stream = scratch("w+", b"");
        stream.write_all(b"through std::io").unwrap();
        stream.flush().unwrap();
        io::Seek::rewind(&mut stream).unwrap();

        let mut text = String::new();
        stream.read_to_string(&mut text).unwrap();
        assert_eq!(text, "through std::io");
        assert_eq!(stream.stream_position().unwrap(), 15);
    }

    #[test]
    fn socket_reads_return_available_data() {
        let (mut stream, mut server) = socket_pair();
        assert!(!stream.is_seekable());
        assert_eq!(stream.mode(), Some("r+"));
        assert_eq!(stream.stream_type(), Some("tcp_socket"));

        server.write_all(b"hello").unwrap();
        assert_eq!(stream.read(Some(5)).unwrap(), &b"hello"[..]);

        assert_eq!(stream.write(b"ping", None).unwrap(), 4);
        let mut buf = [0u8; 4];
        io::Read::read_exact(&mut server, &mut buf).unwrap();
        assert_eq!(&buf, b"ping");
    }

    #[test]
    fn socket_lines_and_eof() {
        let (mut stream, mut server) = socket_pair();
        server.write_all(b"abc\ndef").unwrap();
        drop(server);

        assert_eq!(stream.read_line(None).unwrap(), &b"abc"[..]);
        assert!(!stream.is_eof());
        assert_eq!(stream.read_line(None).unwrap(), &b"def"[..]);
        assert!(stream.is_eof());
        assert!(stream.read(None).unwrap().is_empty());
    }

    #[test]
    fn sockets_cannot_rewind() {
        let (mut stream, _server) = socket_pair();
        let err = stream.rewind().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Logic);
        assert!(stream.is_open());
    }

    #[test]
    fn close_socket_shuts_down_peer() {
        let (mut stream, mut server) = socket_pair();
        stream.write(b"bye", None).unwrap();
        stream.close().unwrap();

        let mut received = Vec::new();
        io::Read::read_to_end(&mut server, &mut received).unwrap();
        assert_eq!(received, b"bye");
    }
}
