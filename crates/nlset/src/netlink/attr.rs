//! Netlink attribute (nlattr) framing.
//!
//! Every attribute is a 4-byte header followed by its payload and zero
//! padding up to the next 4-byte boundary:
//!
//! ```text
//! ┌──────────────┬──────────────┬─────────────────────┬─────────┐
//! │ nla_len: u16 │ nla_type: u16│ payload             │ padding │
//! └──────────────┴──────────────┴─────────────────────┴─────────┘
//!   len = 4 + payload length (padding not included)
//! ```
//!
//! The two top bits of `nla_type` are flags: [`NLA_F_NESTED`] marks a
//! payload that is itself a list of attributes, [`NLA_F_NET_BYTEORDER`]
//! marks a payload in network byte order.

use super::error::{DecodeError, Result, ValidationError};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Netlink attribute alignment.
pub const NLA_ALIGNTO: usize = 4;

/// Align a length to NLA_ALIGNTO boundary.
#[inline]
pub const fn nla_align(len: usize) -> usize {
    (len + NLA_ALIGNTO - 1) & !(NLA_ALIGNTO - 1)
}

/// Size of the attribute header.
pub const NLA_HDRLEN: usize = 4; // nla_align(size_of::<NlAttr>())

/// Netlink attribute header (mirrors struct nlattr).
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct NlAttr {
    /// Length including header.
    pub nla_len: u16,
    /// Attribute type.
    pub nla_type: u16,
}

/// Attribute type flags.
pub const NLA_F_NESTED: u16 = 1 << 15;
pub const NLA_F_NET_BYTEORDER: u16 = 1 << 14;
pub const NLA_TYPE_MASK: u16 = !(NLA_F_NESTED | NLA_F_NET_BYTEORDER);

impl NlAttr {
    /// Create a new attribute header.
    pub fn new(attr_type: u16, data_len: usize) -> Result<Self> {
        let total = NLA_HDRLEN + data_len;
        let nla_len = u16::try_from(total)
            .map_err(|_| ValidationError::AttributeTooLarge { len: data_len })?;
        Ok(Self {
            nla_len,
            nla_type: attr_type,
        })
    }

    /// Get the attribute type without flags.
    pub fn kind(&self) -> u16 {
        self.nla_type & NLA_TYPE_MASK
    }

    /// Check if this is a nested attribute.
    pub fn is_nested(&self) -> bool {
        self.nla_type & NLA_F_NESTED != 0
    }

    /// Check if the payload is in network byte order.
    pub fn is_net_byteorder(&self) -> bool {
        self.nla_type & NLA_F_NET_BYTEORDER != 0
    }

    /// Get the payload length (total length minus header).
    pub fn payload_len(&self) -> usize {
        (self.nla_len as usize).saturating_sub(NLA_HDRLEN)
    }

    /// Convert to bytes.
    pub fn as_bytes(&self) -> &[u8] {
        <Self as IntoBytes>::as_bytes(self)
    }

    /// Parse from bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Self::read_from_prefix(data)
            .map(|(attr, _)| attr)
            .map_err(|_| {
                DecodeError::Truncated {
                    expected: NLA_HDRLEN,
                    actual: data.len(),
                }
                .into()
            })
    }
}

/// Append one attribute (header, payload, padding) to `buf`.
pub fn put(buf: &mut Vec<u8>, attr_type: u16, data: &[u8]) -> Result<()> {
    let attr = NlAttr::new(attr_type, data.len())?;
    buf.extend_from_slice(attr.as_bytes());
    buf.extend_from_slice(data);
    // Pad to alignment
    let aligned = nla_align(buf.len());
    buf.resize(aligned, 0);
    Ok(())
}

/// One attribute as found on the wire, before schema resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawAttr<'a> {
    /// Type field including flag bits.
    pub nla_type: u16,
    /// Payload without header or padding.
    pub payload: &'a [u8],
}

impl RawAttr<'_> {
    /// Attribute type without flags.
    pub fn kind(&self) -> u16 {
        self.nla_type & NLA_TYPE_MASK
    }

    /// Check if the nested flag is set.
    pub fn is_nested(&self) -> bool {
        self.nla_type & NLA_F_NESTED != 0
    }
}

/// Iterator over netlink attributes in a buffer.
///
/// Unlike a lenient walk, malformed framing is reported: a header whose
/// length is below [`NLA_HDRLEN`] or past the end of the buffer, and
/// leftover bytes too short to hold another header, each yield an error
/// and end the iteration.
pub struct AttrIter<'a> {
    data: &'a [u8],
}

impl<'a> AttrIter<'a> {
    /// Create a new attribute iterator.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    /// Check if there are no more attributes.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl<'a> Iterator for AttrIter<'a> {
    type Item = Result<RawAttr<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.data.is_empty() {
            return None;
        }

        if self.data.len() < NLA_HDRLEN {
            let len = self.data.len();
            self.data = &[];
            return Some(Err(DecodeError::TrailingBytes { len }.into()));
        }

        let attr = match NlAttr::from_bytes(self.data) {
            Ok(a) => a,
            Err(e) => {
                self.data = &[];
                return Some(Err(e));
            }
        };

        let len = attr.nla_len as usize;
        if len < NLA_HDRLEN {
            self.data = &[];
            return Some(Err(DecodeError::InvalidLength { len }.into()));
        }
        if len > self.data.len() {
            let actual = self.data.len();
            self.data = &[];
            return Some(Err(DecodeError::Truncated {
                expected: len,
                actual,
            }
            .into()));
        }

        let payload = &self.data[NLA_HDRLEN..len];
        let aligned_len = nla_align(len);

        // The last attribute may omit its padding
        if aligned_len >= self.data.len() {
            self.data = &[];
        } else {
            self.data = &self.data[aligned_len..];
        }

        Some(Ok(RawAttr {
            nla_type: attr.nla_type,
            payload,
        }))
    }
}
