//! Netlink message header and parsing.

use super::error::{DecodeError, Result};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Netlink message header alignment.
pub const NLMSG_ALIGNTO: usize = 4;

/// Align a length to NLMSG_ALIGNTO boundary.
#[inline]
pub const fn nlmsg_align(len: usize) -> usize {
    (len + NLMSG_ALIGNTO - 1) & !(NLMSG_ALIGNTO - 1)
}

/// Size of the netlink message header.
pub const NLMSG_HDRLEN: usize = nlmsg_align(std::mem::size_of::<NlMsgHdr>());

/// Netlink message header (mirrors struct nlmsghdr).
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct NlMsgHdr {
    /// Length of message including header.
    pub nlmsg_len: u32,
    /// Message type.
    pub nlmsg_type: u16,
    /// Additional flags.
    pub nlmsg_flags: u16,
    /// Sequence number.
    pub nlmsg_seq: u32,
    /// Sending process port ID.
    pub nlmsg_pid: u32,
}

impl NlMsgHdr {
    /// Create a new message header.
    pub fn new(msg_type: u16, flags: u16) -> Self {
        Self {
            nlmsg_len: NLMSG_HDRLEN as u32,
            nlmsg_type: msg_type,
            nlmsg_flags: flags,
            nlmsg_seq: 0,
            nlmsg_pid: 0,
        }
    }

    /// Get the payload length (total length minus header).
    pub fn payload_len(&self) -> usize {
        (self.nlmsg_len as usize).saturating_sub(NLMSG_HDRLEN)
    }

    /// Check if this is an error message.
    pub fn is_error(&self) -> bool {
        self.nlmsg_type == NlMsgType::ERROR
    }

    /// Check if this is a done message.
    pub fn is_done(&self) -> bool {
        self.nlmsg_type == NlMsgType::DONE
    }

    /// Check if this message has the multi flag.
    pub fn is_multi(&self) -> bool {
        self.nlmsg_flags & NLM_F_MULTI != 0
    }

    /// Check if the kernel flagged the dump as inconsistent.
    pub fn is_dump_interrupted(&self) -> bool {
        self.nlmsg_flags & NLM_F_DUMP_INTR != 0
    }

    /// Convert header to bytes.
    pub fn as_bytes(&self) -> &[u8] {
        <Self as IntoBytes>::as_bytes(self)
    }

    /// Parse header from bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Self::read_from_prefix(data)
            .map(|(hdr, _)| hdr)
            .map_err(|_| {
                DecodeError::Truncated {
                    expected: NLMSG_HDRLEN,
                    actual: data.len(),
                }
                .into()
            })
    }
}

/// Standard netlink message types.
pub struct NlMsgType;

impl NlMsgType {
    /// No operation, message must be discarded.
    pub const NOOP: u16 = 1;
    /// Error message or ACK.
    pub const ERROR: u16 = 2;
    /// End of multipart message.
    pub const DONE: u16 = 3;
    /// Data lost, request resend.
    pub const OVERRUN: u16 = 4;
}

/// Netlink message flags.
pub const NLM_F_REQUEST: u16 = 0x01;
pub const NLM_F_MULTI: u16 = 0x02;
pub const NLM_F_ACK: u16 = 0x04;
pub const NLM_F_DUMP_INTR: u16 = 0x10;

// Dump request (NLM_F_ROOT | NLM_F_MATCH)
pub const NLM_F_DUMP: u16 = 0x300;

// Fail if the object already exists
pub const NLM_F_EXCL: u16 = 0x200;

/// One complete message inside a receive buffer.
#[derive(Debug, Clone, Copy)]
pub struct RawMessage<'a> {
    /// Parsed header.
    pub header: NlMsgHdr,
    /// The whole message, header included, without trailing alignment.
    pub bytes: &'a [u8],
}

impl<'a> RawMessage<'a> {
    /// Bytes following the header.
    pub fn payload(&self) -> &'a [u8] {
        &self.bytes[NLMSG_HDRLEN..]
    }
}

/// Iterator over netlink messages in a buffer.
pub struct MessageIter<'a> {
    data: &'a [u8],
}

impl<'a> MessageIter<'a> {
    /// Create a new message iterator.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }
}

impl<'a> Iterator for MessageIter<'a> {
    type Item = Result<RawMessage<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.data.len() < NLMSG_HDRLEN {
            return None;
        }

        let header = match NlMsgHdr::from_bytes(self.data) {
            Ok(h) => h,
            Err(e) => return Some(Err(e)),
        };

        let msg_len = header.nlmsg_len as usize;
        if msg_len < NLMSG_HDRLEN {
            self.data = &[];
            return Some(Err(DecodeError::InvalidLength { len: msg_len }.into()));
        }
        if msg_len > self.data.len() {
            let actual = self.data.len();
            self.data = &[];
            return Some(Err(DecodeError::Truncated {
                expected: msg_len,
                actual,
            }
            .into()));
        }

        let bytes = &self.data[..msg_len];
        let aligned_len = nlmsg_align(msg_len);

        // Move to next message
        if aligned_len >= self.data.len() {
            self.data = &[];
        } else {
            self.data = &self.data[aligned_len..];
        }

        Some(Ok(RawMessage { header, bytes }))
    }
}

/// Netlink error message payload.
#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, Immutable, KnownLayout)]
pub struct NlMsgError {
    /// Error code (negative errno or 0 for ACK).
    pub error: i32,
    /// Original message header that caused the error.
    pub msg: NlMsgHdr,
}

impl NlMsgError {
    /// Parse error message from payload.
    ///
    /// Only the error code is required; the echoed request header is
    /// zero-filled when the kernel truncated it.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if let Ok((err, _)) = Self::read_from_prefix(data) {
            return Ok(err);
        }
        let (error, _) = i32::read_from_prefix(data).map_err(|_| DecodeError::Truncated {
            expected: std::mem::size_of::<i32>(),
            actual: data.len(),
        })?;
        Ok(Self {
            error,
            msg: NlMsgHdr::default(),
        })
    }

    /// Check if this is an ACK (no error).
    pub fn is_ack(&self) -> bool {
        self.error == 0
    }

    /// Parse the status of an `NLMSG_DONE` payload.
    ///
    /// A failed dump ends with a negative errno; an empty payload counts as
    /// success.
    pub fn from_done(data: &[u8]) -> Result<Self> {
        if data.is_empty() {
            return Ok(Self {
                error: 0,
                msg: NlMsgHdr::default(),
            });
        }
        Self::from_bytes(data)
    }
}
