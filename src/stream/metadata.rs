//! Descriptive metadata for an open stream.

use std::fmt;

/// Metadata describing an open stream.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct Metadata {
    /// The path or address the stream was opened from.
    pub uri: Option<String>,

    /// The kind of transport: `STDIO`, `tcp_socket` or `unix_socket`.
    pub stream_type: &'static str,

    /// The wrapper which opened the stream, `plainfile` for filesystem paths.
    pub wrapper_type: Option<&'static str>,

    /// Wrapper-specific data. None of the wrappers in this crate attach any.
    pub wrapper_data: Option<String>,

    /// The mode the handle was opened with.
    pub mode: String,

    /// Whether the stream supports random-access positioning.
    pub seekable: bool,

    /// Whether a read has run into the end of the stream.
    pub eof: bool,

    /// Bytes read ahead from the transport but not yet returned to the caller.
    pub unread_bytes: usize,
}

/// A single metadata value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataValue {
    /// A textual value.
    Str(String),
    /// A flag.
    Bool(bool),
    /// A byte count.
    Size(usize),
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataValue::Str(value) => f.write_str(value),
            MetadataValue::Bool(value) => write!(f, "{value}"),
            MetadataValue::Size(value) => write!(f, "{value}"),
        }
    }
}

impl Metadata {
    /// Look up one field by its key. Unknown or unset keys yield `None`.
    pub fn get(&self, key: &str) -> Option<MetadataValue> {
        match key {
            "uri" => self.uri.clone().map(MetadataValue::Str),
            "stream_type" => Some(MetadataValue::Str(self.stream_type.to_owned())),
            "wrapper_type" => self
                .wrapper_type
                .map(|wrapper| MetadataValue::Str(wrapper.to_owned())),
            "wrapper_data" => self.wrapper_data.clone().map(MetadataValue::Str),
            "mode" => Some(MetadataValue::Str(self.mode.clone())),
            "seekable" => Some(MetadataValue::Bool(self.seekable)),
            "eof" => Some(MetadataValue::Bool(self.eof)),
            "unread_bytes" => Some(MetadataValue::Size(self.unread_bytes)),
            _ => None,
        }
    }
}
