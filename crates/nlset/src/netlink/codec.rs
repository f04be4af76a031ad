//! Payload codecs for attribute values.
//!
//! Each [`CodecKind`] describes how one attribute payload is laid out on
//! the wire. Scalar kinds are handled here; [`CodecKind::Nested`] and
//! [`CodecKind::AddressUnion`] recurse into the tree engine.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use super::attr::{NLA_F_NESTED, NLA_F_NET_BYTEORDER};
use super::error::{DecodeError, Result, ValidationError};
use super::schema::Schema;
use super::tree::{self, Attr};

/// Wire layout of an attribute payload.
#[derive(Clone, Copy)]
pub enum CodecKind {
    /// Empty payload.
    None,
    /// One byte.
    UInt8,
    /// Two bytes, network order.
    UInt16BigEndian,
    /// Four bytes, network order.
    UInt32BigEndian,
    /// Four bytes, network order; flags, counters and line numbers.
    HexScalar,
    /// NUL-terminated string, at most `max_len` bytes including the NUL.
    AsciiZ(usize),
    /// Uninterpreted bytes.
    OpaqueBytes,
    /// Four-byte IPv4 address.
    Ipv4,
    /// Sixteen-byte IPv6 address.
    Ipv6,
    /// Payload is a list of attributes of another schema.
    Nested(&'static Schema),
    /// Payload is exactly one address attribute of the given schema.
    AddressUnion(&'static Schema),
}

impl CodecKind {
    /// Short name used in diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::UInt8 => "uint8",
            Self::UInt16BigEndian => "be16",
            Self::UInt32BigEndian => "be32",
            Self::HexScalar => "hex",
            Self::AsciiZ(_) => "asciiz",
            Self::OpaqueBytes => "bytes",
            Self::Ipv4 => "ip4addr",
            Self::Ipv6 => "ip6addr",
            Self::Nested(_) => "nested",
            Self::AddressUnion(_) => "ipaddr",
        }
    }

    /// Payload width for fixed-size kinds.
    pub fn fixed_width(&self) -> Option<usize> {
        match self {
            Self::None => Some(0),
            Self::UInt8 => Some(1),
            Self::UInt16BigEndian => Some(2),
            Self::UInt32BigEndian | Self::HexScalar | Self::Ipv4 => Some(4),
            Self::Ipv6 => Some(16),
            _ => None,
        }
    }

    /// Flag bits to set in the attribute type when encoding this kind.
    pub fn type_flags(&self) -> u16 {
        match self {
            Self::Nested(_) | Self::AddressUnion(_) => NLA_F_NESTED,
            Self::UInt16BigEndian
            | Self::UInt32BigEndian
            | Self::HexScalar
            | Self::Ipv4
            | Self::Ipv6 => NLA_F_NET_BYTEORDER,
            _ => 0,
        }
    }

    /// Encode a value into a payload (no attribute header).
    pub fn encode(&self, value: &AttrValue) -> Result<Vec<u8>> {
        match (self, value) {
            (Self::None, AttrValue::None) => Ok(Vec::new()),
            (Self::UInt8, AttrValue::U8(v)) => Ok(encode_u8(*v).to_vec()),
            (Self::UInt16BigEndian, AttrValue::U16(v)) => Ok(encode_u16_be(*v).to_vec()),
            (Self::UInt32BigEndian | Self::HexScalar, AttrValue::U32(v)) => {
                Ok(encode_u32_be(*v).to_vec())
            }
            (Self::AsciiZ(max_len), AttrValue::Str(s)) => encode_asciiz(s, *max_len),
            (Self::OpaqueBytes, AttrValue::Bytes(b)) => Ok(b.clone()),
            (Self::Ipv4, AttrValue::Addr(IpAddr::V4(addr))) => Ok(addr.octets().to_vec()),
            (Self::Ipv6, AttrValue::Addr(IpAddr::V6(addr))) => Ok(addr.octets().to_vec()),
            (Self::Nested(schema), AttrValue::Nested(children)) => {
                tree::encode_attrs(schema, children)
            }
            (Self::AddressUnion(schema), AttrValue::Addr(addr)) => {
                tree::encode_address(schema, *addr)
            }
            (codec, value) => Err(ValidationError::TypeMismatch {
                codec: codec.name(),
                value: value.kind(),
            }
            .into()),
        }
    }

    /// Decode a payload (no attribute header) into a value.
    pub fn decode(&self, data: &[u8]) -> Result<AttrValue> {
        self.decode_at(data, 0)
    }

    /// Decode a payload found `depth` levels below the top-level list.
    pub(crate) fn decode_at(&self, data: &[u8], depth: usize) -> Result<AttrValue> {
        Ok(match self {
            Self::None => {
                check_width(data, 0)?;
                AttrValue::None
            }
            Self::UInt8 => AttrValue::U8(decode_u8(data)?),
            Self::UInt16BigEndian => AttrValue::U16(decode_u16_be(data)?),
            Self::UInt32BigEndian | Self::HexScalar => AttrValue::U32(decode_u32_be(data)?),
            Self::AsciiZ(_) => AttrValue::Str(decode_asciiz(data)?),
            Self::OpaqueBytes => AttrValue::Bytes(data.to_vec()),
            Self::Ipv4 => AttrValue::Addr(IpAddr::V4(decode_ipv4(data)?)),
            Self::Ipv6 => AttrValue::Addr(IpAddr::V6(decode_ipv6(data)?)),
            Self::Nested(schema) => {
                AttrValue::Nested(tree::decode_attrs_at(schema, data, depth + 1)?)
            }
            Self::AddressUnion(schema) => AttrValue::Addr(tree::decode_address(schema, data)?),
        })
    }
}

impl fmt::Debug for CodecKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Schemas may be recursive; print the name only.
            Self::Nested(schema) => write!(f, "Nested({})", schema.name()),
            Self::AddressUnion(schema) => write!(f, "AddressUnion({})", schema.name()),
            Self::AsciiZ(max) => write!(f, "AsciiZ({max})"),
            other => f.write_str(other.name()),
        }
    }
}

/// A decoded (or to-be-encoded) attribute value.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum AttrValue {
    /// Flag attribute without payload.
    None,
    /// 8-bit integer.
    U8(u8),
    /// 16-bit integer.
    U16(u16),
    /// 32-bit integer.
    U32(u32),
    /// Text.
    Str(String),
    /// Raw bytes, also used for attributes the schema does not know.
    Bytes(Vec<u8>),
    /// IPv4 or IPv6 address.
    Addr(IpAddr),
    /// Child attribute list.
    Nested(Vec<Attr>),
}

impl AttrValue {
    /// Variant name used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::U8(_) => "u8",
            Self::U16(_) => "u16",
            Self::U32(_) => "u32",
            Self::Str(_) => "string",
            Self::Bytes(_) => "bytes",
            Self::Addr(_) => "address",
            Self::Nested(_) => "nested",
        }
    }

    /// Get the value as a u8.
    pub fn as_u8(&self) -> Option<u8> {
        match self {
            Self::U8(v) => Some(*v),
            _ => None,
        }
    }

    /// Get the value as a u16.
    pub fn as_u16(&self) -> Option<u16> {
        match self {
            Self::U16(v) => Some(*v),
            _ => None,
        }
    }

    /// Get the value as a u32, widening smaller integers.
    pub fn as_u32(&self) -> Option<u32> {
        match self {
            Self::U8(v) => Some(u32::from(*v)),
            Self::U16(v) => Some(u32::from(*v)),
            Self::U32(v) => Some(*v),
            _ => None,
        }
    }

    /// Get the value as a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Get the value as raw bytes.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Get the value as an address.
    pub fn as_addr(&self) -> Option<IpAddr> {
        match self {
            Self::Addr(a) => Some(*a),
            _ => None,
        }
    }

    /// Get the child attributes of a nested value.
    pub fn as_nested(&self) -> Option<&[Attr]> {
        match self {
            Self::Nested(children) => Some(children),
            _ => None,
        }
    }
}

impl From<u8> for AttrValue {
    fn from(v: u8) -> Self {
        Self::U8(v)
    }
}

impl From<u16> for AttrValue {
    fn from(v: u16) -> Self {
        Self::U16(v)
    }
}

impl From<u32> for AttrValue {
    fn from(v: u32) -> Self {
        Self::U32(v)
    }
}

impl From<&str> for AttrValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<Vec<u8>> for AttrValue {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(v)
    }
}

impl From<IpAddr> for AttrValue {
    fn from(v: IpAddr) -> Self {
        Self::Addr(v)
    }
}

impl From<Ipv4Addr> for AttrValue {
    fn from(v: Ipv4Addr) -> Self {
        Self::Addr(IpAddr::V4(v))
    }
}

impl From<Ipv6Addr> for AttrValue {
    fn from(v: Ipv6Addr) -> Self {
        Self::Addr(IpAddr::V6(v))
    }
}

impl From<Vec<Attr>> for AttrValue {
    fn from(v: Vec<Attr>) -> Self {
        Self::Nested(v)
    }
}

fn check_width(data: &[u8], expected: usize) -> Result<()> {
    if data.len() != expected {
        return Err(DecodeError::LengthMismatch {
            expected,
            actual: data.len(),
        }
        .into());
    }
    Ok(())
}

/// Encode a u8.
pub fn encode_u8(value: u8) -> [u8; 1] {
    [value]
}

/// Decode a u8; the payload must be exactly one byte.
pub fn decode_u8(data: &[u8]) -> Result<u8> {
    check_width(data, 1)?;
    Ok(data[0])
}

/// Encode a u16 in network order.
pub fn encode_u16_be(value: u16) -> [u8; 2] {
    value.to_be_bytes()
}

/// Decode a network-order u16; the payload must be exactly two bytes.
pub fn decode_u16_be(data: &[u8]) -> Result<u16> {
    check_width(data, 2)?;
    Ok(u16::from_be_bytes([data[0], data[1]]))
}

/// Encode a u32 in network order.
pub fn encode_u32_be(value: u32) -> [u8; 4] {
    value.to_be_bytes()
}

/// Decode a network-order u32; the payload must be exactly four bytes.
pub fn decode_u32_be(data: &[u8]) -> Result<u32> {
    check_width(data, 4)?;
    Ok(u32::from_be_bytes([data[0], data[1], data[2], data[3]]))
}

/// Encode a NUL-terminated ASCII string into a field of `max_len` bytes.
///
/// The string must leave room for the terminator: a 32-byte field holds
/// at most 31 characters.
pub fn encode_asciiz(value: &str, max_len: usize) -> Result<Vec<u8>> {
    if value.len() >= max_len {
        return Err(ValidationError::StringTooLong {
            len: value.len(),
            max: max_len,
        }
        .into());
    }
    if !value.is_ascii() || value.bytes().any(|b| b == 0) {
        return Err(ValidationError::InvalidValue {
            name: "asciiz",
            reason: format!("{value:?} is not a plain ASCII string"),
        }
        .into());
    }
    let mut data = Vec::with_capacity(value.len() + 1);
    data.extend_from_slice(value.as_bytes());
    data.push(0);
    Ok(data)
}

/// Decode a NUL-terminated string. Bytes after the first NUL are ignored.
pub fn decode_asciiz(data: &[u8]) -> Result<String> {
    let len = data
        .iter()
        .position(|&b| b == 0)
        .ok_or(DecodeError::Unterminated)?;
    std::str::from_utf8(&data[..len])
        .map(str::to_string)
        .map_err(|_| DecodeError::InvalidString.into())
}

/// Decode an IPv4 address; the payload must be exactly four bytes.
pub fn decode_ipv4(data: &[u8]) -> Result<Ipv4Addr> {
    check_width(data, 4)?;
    Ok(Ipv4Addr::new(data[0], data[1], data[2], data[3]))
}

/// Decode an IPv6 address; the payload must be exactly sixteen bytes.
pub fn decode_ipv6(data: &[u8]) -> Result<Ipv6Addr> {
    check_width(data, 16)?;
    let mut octets = [0u8; 16];
    octets.copy_from_slice(data);
    Ok(Ipv6Addr::from(octets))
}
