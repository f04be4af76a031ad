//! Error types for netlink operations.
//!
//! Failures fall into four groups:
//!
//! - [`ValidationError`]: the request could not be built. Raised locally,
//!   before anything is sent.
//! - [`DecodeError`]: a reply could not be interpreted against its schema.
//! - [`ProtocolError`]: the kernel answered with an error frame, or the
//!   reply sequence ended early.
//! - Transport failures ([`Error::Io`], [`Error::Transport`]) pass through
//!   unchanged.

use std::io;

/// Result type for netlink operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during netlink operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Request could not be built.
    #[error("invalid request: {0}")]
    Validation(#[from] ValidationError),

    /// Reply could not be decoded.
    #[error("malformed reply: {0}")]
    Decode(#[from] DecodeError),

    /// Kernel rejected the request or the reply was cut short.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// I/O error from socket operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Failure reported by a caller-supplied transport.
    #[error("transport error: {0}")]
    Transport(Box<dyn std::error::Error + Send + Sync>),
}

/// A request that cannot be encoded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// The attribute name is not declared in the schema.
    #[error("unknown attribute '{name}' in {schema} schema")]
    UnknownAttribute {
        /// Schema the lookup ran against.
        schema: &'static str,
        /// Name that was not found.
        name: String,
    },

    /// A string does not fit in its bounded field.
    #[error("string of {len} bytes does not fit, limit is {max} including terminator")]
    StringTooLong {
        /// Length of the string without terminator.
        len: usize,
        /// Field size including the terminator.
        max: usize,
    },

    /// A command was built without one of the attributes it requires.
    #[error("{command} requires attribute {name}")]
    MissingAttribute {
        /// Command being built.
        command: &'static str,
        /// Attribute that is missing.
        name: &'static str,
    },

    /// The value variant does not match the attribute's codec.
    #[error("{value} value cannot be encoded as {codec}")]
    TypeMismatch {
        /// Codec of the attribute.
        codec: &'static str,
        /// Variant of the supplied value.
        value: &'static str,
    },

    /// The value is of the right kind but not acceptable.
    #[error("invalid value for {name}: {reason}")]
    InvalidValue {
        /// Attribute or field name.
        name: &'static str,
        /// What is wrong with it.
        reason: String,
    },

    /// The payload does not fit in a 16-bit attribute length.
    #[error("attribute payload of {len} bytes exceeds the netlink limit")]
    AttributeTooLarge {
        /// Payload length.
        len: usize,
    },
}

/// A reply that cannot be interpreted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// Buffer is shorter than a header or declared length requires.
    #[error("buffer truncated: expected {expected} bytes, got {actual}")]
    Truncated {
        /// Bytes required.
        expected: usize,
        /// Bytes available.
        actual: usize,
    },

    /// A header declares a length smaller than the header itself.
    #[error("invalid length {len} in header")]
    InvalidLength {
        /// Declared length.
        len: usize,
    },

    /// A fixed-width payload has the wrong size.
    #[error("payload length mismatch: expected {expected} bytes, got {actual}")]
    LengthMismatch {
        /// Width the codec requires.
        expected: usize,
        /// Width received.
        actual: usize,
    },

    /// A NUL-terminated string has no terminator.
    #[error("string is not NUL-terminated")]
    Unterminated,

    /// A string is not valid ASCII/UTF-8.
    #[error("string is not valid text")]
    InvalidString,

    /// An address union carries neither an IPv4 nor an IPv6 address.
    #[error("unknown address variant {id}")]
    UnknownVariant {
        /// Nested attribute identifier found.
        id: u16,
    },

    /// Bytes left over that cannot form another record.
    #[error("{len} trailing bytes after last record")]
    TrailingBytes {
        /// Leftover length.
        len: usize,
    },

    /// Attributes are nested deeper than the decoder follows.
    #[error("attributes nested deeper than {limit} levels")]
    TooDeep {
        /// Maximum nesting depth.
        limit: usize,
    },

    /// An error or done frame carries a value that is not a negative errno.
    #[error("invalid error code {value} in reply")]
    InvalidErrno {
        /// Value found in the frame.
        value: i32,
    },

    /// A datagram did not fit in the receive buffer and was cut.
    #[error("datagram of {len} bytes exceeds the {capacity}-byte receive buffer")]
    DatagramTruncated {
        /// Datagram size reported by the kernel.
        len: usize,
        /// Receive buffer size.
        capacity: usize,
    },

    /// A reply frame does not belong to the expected subsystem.
    #[error("unexpected message type {msg_type:#06x}")]
    UnexpectedMessage {
        /// The netlink message type received.
        msg_type: u16,
    },
}

/// The kernel refused the request, or the reply ended early.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// Kernel returned an error frame.
    #[error("kernel error: {message} (errno {code})")]
    Kernel {
        /// Positive error code from the kernel.
        code: i32,
        /// Human-readable error message.
        message: String,
    },

    /// A dump ended before its completion marker, or the kernel flagged it
    /// as interrupted.
    #[error("reply sequence incomplete")]
    Incomplete,
}

impl ProtocolError {
    /// Create a kernel error from the (negative) value of an error frame.
    ///
    /// Zero, positive values and `i32::MIN` are not errnos and are
    /// rejected.
    pub fn from_errno(errno: i32) -> std::result::Result<Self, DecodeError> {
        let code = negate_errno(errno)?;
        Ok(Self::Kernel {
            code,
            message: io::Error::from_raw_os_error(code).to_string(),
        })
    }

    /// The kernel error code, if this is a kernel error.
    pub fn code(&self) -> Option<i32> {
        match self {
            Self::Kernel { code, .. } => Some(*code),
            Self::Incomplete => None,
        }
    }
}

/// Turn the negative errno of an error or done frame into a positive code.
pub fn negate_errno(errno: i32) -> std::result::Result<i32, DecodeError> {
    match errno.checked_neg() {
        Some(code) if code > 0 => Ok(code),
        _ => Err(DecodeError::InvalidErrno { value: errno }),
    }
}

impl Error {
    /// Wrap an error produced by a custom transport.
    pub fn transport(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Transport(Box::new(err))
    }

    /// Get the errno value if this is a kernel error.
    pub fn errno(&self) -> Option<i32> {
        match self {
            Self::Protocol(err) => err.code(),
            _ => None,
        }
    }

    /// Check if this is a "not found" error (ENOENT).
    pub fn is_not_found(&self) -> bool {
        self.errno() == Some(libc::ENOENT)
    }

    /// Check if this is a permission error (EPERM, EACCES).
    pub fn is_permission_denied(&self) -> bool {
        matches!(self.errno(), Some(libc::EPERM) | Some(libc::EACCES))
    }

    /// Check if this is an "already exists" error (EEXIST).
    pub fn is_already_exists(&self) -> bool {
        self.errno() == Some(libc::EEXIST)
    }

    /// Check if the reply sequence was cut short.
    pub fn is_incomplete(&self) -> bool {
        matches!(self, Self::Protocol(ProtocolError::Incomplete))
    }
}
