//! Open mode strings.
//!
//! Modes follow the `fopen(3)` family: a base of `r`, `w`, `a`, `x` or `c`,
//! an optional `+` to open in both directions, and an optional `b` (binary) or
//! `t` (text) suffix. Any other string is valid as a *reported* mode but is
//! neither readable nor writable.

use std::fmt;
use std::fs::OpenOptions;
use std::str::FromStr;

use crate::Error;

/// The base access of an open mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Access {
    /// `r`: read from the start of an existing file.
    Read,
    /// `w`: truncate or create, then write.
    Write,
    /// `a`: create if needed, append every write.
    Append,
    /// `x`: create exclusively, failing if the file exists.
    Exclusive,
    /// `c`: create if needed, write from the start without truncating.
    Create,
}

/// Text or binary interpretation requested by the mode suffix.
///
/// Streams are always binary-safe, so this only round-trips the mode string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Translation {
    /// No suffix.
    #[default]
    Unspecified,
    /// `b` suffix.
    Binary,
    /// `t` suffix.
    Text,
}

/// A parsed open mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Mode {
    access: Access,
    plus: bool,
    translation: Translation,
}

impl Mode {
    /// The mode reported by socket handles.
    pub const SOCKET: Mode = Mode::new(Access::Read, true, Translation::Unspecified);

    /// Create a mode from its parts.
    pub const fn new(access: Access, plus: bool, translation: Translation) -> Self {
        Self {
            access,
            plus,
            translation,
        }
    }

    /// Parse a mode string, returning `None` for anything outside the mode grammar.
    pub fn parse(mode: &str) -> Option<Mode> {
        let bytes = mode.as_bytes();
        let (&base, rest) = bytes.split_first()?;

        let access = match base {
            b'r' => Access::Read,
            b'w' => Access::Write,
            b'a' => Access::Append,
            b'x' => Access::Exclusive,
            b'c' => Access::Create,
            _ => return None,
        };

        let (plus, rest) = match rest.split_first() {
            Some((b'+', rest)) => (true, rest),
            _ => (false, rest),
        };

        let translation = match rest {
            [] => Translation::Unspecified,
            [b'b'] => Translation::Binary,
            [b't'] => Translation::Text,
            _ => return None,
        };

        Some(Mode::new(access, plus, translation))
    }

    /// The base access of this mode.
    pub fn access(&self) -> Access {
        self.access
    }

    /// Whether the mode carries `+`.
    pub fn is_update(&self) -> bool {
        self.plus
    }

    /// The suffix of this mode.
    pub fn translation(&self) -> Translation {
        self.translation
    }

    /// Whether handles opened with this mode may be read.
    pub fn is_readable(&self) -> bool {
        self.is_update() || self.access == Access::Read
    }

    /// Whether handles opened with this mode may be written.
    pub fn is_writable(&self) -> bool {
        self.is_update() || self.access != Access::Read
    }

    /// Translate this mode into filesystem open options.
    pub fn open_options(&self) -> OpenOptions {
        let mut options = OpenOptions::new();
        options.read(self.is_readable());
        match self.access {
            Access::Read => {
                options.write(self.plus);
            }
            Access::Write => {
                options.write(true).create(true).truncate(true);
            }
            Access::Append => {
                options.append(true).create(true);
            }
            Access::Exclusive => {
                options.write(true).create_new(true);
            }
            Access::Create => {
                options.write(true).create(true);
            }
        }
        options
    }

    /// Whether opening with this mode may create a file which doesn't exist yet.
    pub fn creates(&self) -> bool {
        self.access != Access::Read
    }
}

impl FromStr for Mode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Mode::parse(s).ok_or_else(|| Error::invalid_argument(format!("Invalid mode \"{s}\"")))
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let base = match self.access {
            Access::Read => "r",
            Access::Write => "w",
            Access::Append => "a",
            Access::Exclusive => "x",
            Access::Create => "c",
        };
        f.write_str(base)?;
        if self.plus {
            f.write_str("+")?;
        }
        match self.translation {
            Translation::Unspecified => Ok(()),
            Translation::Binary => f.write_str("b"),
            Translation::Text => f.write_str("t"),
        }
    }
}

/// Whether a reported mode string permits reading.
pub fn is_readable_mode(mode: &str) -> bool {
    Mode::parse(mode).is_some_and(|mode| mode.is_readable())
}

/// Whether a reported mode string permits writing.
pub fn is_writable_mode(mode: &str) -> bool {
    Mode::parse(mode).is_some_and(|mode| mode.is_writable())
}
