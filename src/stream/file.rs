//! Streams opened from filesystem paths.
//!
//! [`FileStream`] opens a path with an `fopen`-style mode string and hands the
//! resulting handle to a [`Stream`]. Paths may be plain paths or `file://` URIs.
//! A [`FileContext`] can configure include-path lookup and the permissions of
//! newly created files.

use std::env;
use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use crate::handle::Handle;
use crate::mode::Mode;
use crate::{Error, Stream};

/// Environment variable holding the default include path, in the platform's
/// path-list format.
pub const INCLUDE_PATH_ENV: &str = "STREAMER_INCLUDE_PATH";

/// Configuration for opening files.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct FileContext {
    /// Search the include path for relative paths.
    pub use_include_path: bool,

    /// Directories searched, in order, when `use_include_path` is set.
    pub include_path: Vec<PathBuf>,

    /// Permission bits for files created by the open, before the umask applies.
    pub permissions: Option<u32>,
}

impl Default for FileContext {
    fn default() -> Self {
        Self {
            use_include_path: false,
            include_path: vec![PathBuf::from(".")],
            permissions: None,
        }
    }
}

impl FileContext {
    /// A context whose include path is read from [`INCLUDE_PATH_ENV`], falling
    /// back to the current directory.
    pub fn from_env() -> Self {
        let include_path = env::var_os(INCLUDE_PATH_ENV)
            .map(|paths| env::split_paths(&paths).collect::<Vec<_>>())
            .filter(|paths| !paths.is_empty())
            .unwrap_or_else(|| vec![PathBuf::from(".")]);

        Self {
            include_path,
            ..Default::default()
        }
    }

    /// Enable or disable include-path lookup.
    pub fn with_include_path(mut self, use_include_path: bool) -> Self {
        self.use_include_path = use_include_path;
        self
    }

    /// Set the permission bits for newly created files.
    pub fn with_permissions(mut self, permissions: u32) -> Self {
        self.permissions = Some(permissions);
        self
    }

    /// Find the path to open for `path` given the mode.
    ///
    /// The first include directory holding the file wins. When none does, modes
    /// which create files use the first include directory.
    fn resolve(&self, path: &Path, mode: &Mode) -> PathBuf {
        if !self.use_include_path || path.is_absolute() {
            return path.to_path_buf();
        }

        if let Some(found) = self
            .include_path
            .iter()
            .map(|dir| dir.join(path))
            .find(|candidate| candidate.exists())
        {
            return found;
        }

        match self.include_path.first() {
            Some(dir) if mode.creates() => dir.join(path),
            _ => path.to_path_buf(),
        }
    }
}

/// Factory for streams over filesystem paths.
#[derive(Debug, Clone, Copy)]
pub struct FileStream;

impl FileStream {
    /// Open `path` with `mode` using the default [`FileContext`].
    pub fn create<P: AsRef<Path>>(path: P, mode: &str) -> Result<Stream, Error> {
        Self::create_with(path, mode, &FileContext::default())
    }

    /// Open `path` with `mode` and the given context.
    ///
    /// Fails with [`Error::InvalidArgument`] for a malformed mode or a URI scheme
    /// other than `file://`, and with [`Error::Runtime`] when the open itself fails.
    pub fn create_with<P: AsRef<Path>>(
        path: P,
        mode: &str,
        context: &FileContext,
    ) -> Result<Stream, Error> {
        let parsed: Mode = mode.parse()?;
        let path = strip_file_scheme(path.as_ref())?;
        let path = context.resolve(path, &parsed);

        let _span = tracing::trace_span!("file", path = %path.display(), mode).entered();

        let mut options = parsed.open_options();
        #[cfg(unix)]
        if let Some(permissions) = context.permissions {
            use std::os::unix::fs::OpenOptionsExt as _;
            options.mode(permissions);
        }

        let file = options.open(&path).map_err(|error| {
            debug!(%error, "file open failed");
            Error::io(format!("Failed to open stream \"{}\"", path.display()))(error)
        })?;
        trace!("file opened");

        Stream::new(Handle::file(file, mode).with_uri(path.to_string_lossy()))
    }
}

/// Strip a `file://` scheme, rejecting any other URI scheme.
fn strip_file_scheme(path: &Path) -> Result<&Path, Error> {
    let Some(text) = path.to_str() else {
        return Ok(path);
    };

    match text.split_once("://") {
        Some(("file", rest)) => Ok(Path::new(rest)),
        Some((scheme, _)) if is_scheme(scheme) => Err(Error::invalid_argument(format!(
            "Unable to find the wrapper \"{scheme}\""
        ))),
        _ => Ok(path),
    }
}

fn is_scheme(candidate: &str) -> bool {
    let mut chars = candidate.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}
