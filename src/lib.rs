//! # Streamer: binary-safe blocking streams over files and sockets
//!
//! Streamer wraps an open file or socket in a single [`Stream`] type which
//! offers the same read, write, positioning and metadata operations whatever
//! the transport underneath is. Every operation is binary-safe and blocks the
//! calling thread until the transport completes or fails.
//!
//! ## Architecture Overview
//!
//! - **Handle**: owns exactly one OS-level resource, tagged with the mode and
//!   URI it was opened with. Dropping a handle releases the resource.
//! - **Stream**: owns a handle and implements buffered reads, line reads, bulk
//!   reads, writes, copying into another stream, and the open/closed lifecycle.
//! - **Factories**: [`FileStream`] opens filesystem paths and [`NetworkStream`]
//!   opens client connections. Both return a plain [`Stream`]; once opened,
//!   streams behave the same whatever produced them.
//!
//! ## Modes
//!
//! Whether a stream may be read or written is decided by its open mode, using
//! the `fopen(3)` grammar: `r`, `w`, `a`, `x` or `c`, an optional `+`, and an
//! optional `b` or `t` suffix. Sockets always report `r+`. See [`mode`].
//!
//! ## Errors
//!
//! Every failure is an [`Error`], whose [`kind`](Error::kind) tells misuse
//! ([`ErrorKind::Logic`], e.g. reading a closed stream) apart from bad input
//! ([`ErrorKind::InvalidArgument`]) and transport failures
//! ([`ErrorKind::Runtime`]). Reaching the end of a stream is never an error.
//!
//! ## Example
//!
//! ```rust,no_run
//! use streamer::FileStream;
//!
//! # fn example() -> Result<(), streamer::Error> {
//! let mut stream = FileStream::create("/tmp/notes.txt", "w+")?;
//! stream.write(b"first line\nsecond line\n", None)?;
//! stream.rewind()?;
//!
//! assert_eq!(stream.read_line(None)?, &b"first line"[..]);
//! stream.close()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Logging
//!
//! Opening, connecting, piping and closing emit [`tracing`] events at the
//! `trace` level, and failures at `debug`. No subscriber is installed.

mod error;
pub mod handle;
pub mod info;
pub mod mode;
pub mod stream;

pub use self::error::{ConnectError, Error, ErrorKind};
pub use self::handle::{Handle, HandleKind};
pub use self::mode::Mode;
pub use self::stream::{
    ConnectFlags, FileContext, FileStream, Metadata, MetadataValue, NetworkStream, SocketContext,
    Stream,
};

/// Test fixtures
#[cfg(test)]
#[allow(dead_code)]
pub(crate) mod fixtures {

    use std::sync::Once;

    /// Registers a global default tracing subscriber when called for the first time. This is intended
    /// for use in tests.
    pub fn subscribe() {
        static INSTALL_TRACING_SUBSCRIBER: Once = Once::new();
        INSTALL_TRACING_SUBSCRIBER.call_once(|| {
            let subscriber = tracing_subscriber::FmtSubscriber::builder()
                .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
                .with_test_writer()
                .finish();
            tracing::subscriber::set_global_default(subscriber).unwrap();
        });
    }
}
