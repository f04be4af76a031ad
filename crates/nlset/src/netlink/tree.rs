//! Schema-driven encoding and decoding of attribute trees.
//!
//! Encoding resolves each attribute by name, encodes its payload with the
//! descriptor's codec (recursing for nested kinds), and frames it with a
//! header carrying the codec's flag bits. Decoding walks the framing,
//! resolves identifiers first-match, and keeps identifiers the schema does
//! not know as raw `unknown:<id>` attributes so newer kernels do not break
//! older clients. A known identifier whose payload does not fit its codec
//! is an error.

use std::fmt;
use std::net::IpAddr;

use tracing::{debug, trace};

use super::attr::{self, AttrIter};
use super::codec::{AttrValue, CodecKind};
use super::error::{DecodeError, Result, ValidationError};
use super::schema::Schema;

/// Deepest nesting level the decoder follows.
///
/// Recursive schemas would otherwise let a reply drive the decoder as deep
/// as a 64 KiB attribute allows.
pub const MAX_DEPTH: usize = 32;

/// Name of a resolved attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttrName {
    /// Declared in the schema.
    Known(&'static str),
    /// Identifier absent from the schema, kept as raw bytes.
    Unknown(u16),
}

impl AttrName {
    /// The schema name, if known.
    pub fn known(&self) -> Option<&'static str> {
        match self {
            Self::Known(name) => Some(name),
            Self::Unknown(_) => None,
        }
    }
}

impl fmt::Display for AttrName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Known(name) => f.write_str(name),
            Self::Unknown(id) => write!(f, "unknown:{id}"),
        }
    }
}

impl PartialEq<&str> for AttrName {
    fn eq(&self, other: &&str) -> bool {
        match self {
            Self::Known(name) => name == other,
            Self::Unknown(_) => self.to_string() == *other,
        }
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for AttrName {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A named attribute value.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Attr {
    /// Attribute name.
    pub name: AttrName,
    /// Attribute value.
    pub value: AttrValue,
}

impl Attr {
    /// Create an attribute addressed by schema name.
    pub fn new(name: &'static str, value: impl Into<AttrValue>) -> Self {
        Self {
            name: AttrName::Known(name),
            value: value.into(),
        }
    }

    /// Create a nested attribute from its children.
    pub fn nested(name: &'static str, children: Vec<Attr>) -> Self {
        Self::new(name, AttrValue::Nested(children))
    }
}

/// Find the first attribute with the given name.
pub fn find<'a>(attrs: &'a [Attr], name: &str) -> Option<&'a AttrValue> {
    attrs.iter().find(|a| a.name == name).map(|a| &a.value)
}

/// Encode an attribute list against a schema.
///
/// The output is a sequence of aligned attributes; its length is always a
/// multiple of four.
pub fn encode_attrs(schema: &Schema, attrs: &[Attr]) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    for attr in attrs {
        encode_attr(schema, attr, &mut buf)?;
    }
    Ok(buf)
}

fn encode_attr(schema: &Schema, attr: &Attr, buf: &mut Vec<u8>) -> Result<()> {
    let desc = attr
        .name
        .known()
        .and_then(|name| schema.by_name(name))
        .ok_or_else(|| ValidationError::UnknownAttribute {
            schema: schema.name(),
            name: attr.name.to_string(),
        })?;

    let payload = desc.codec.encode(&attr.value)?;
    trace!(
        schema = schema.name(),
        attr = desc.name,
        len = payload.len(),
        "encoded attribute"
    );
    attr::put(buf, desc.id | desc.codec.type_flags(), &payload)
}

/// Decode an attribute list against a schema.
///
/// Fails with [`DecodeError::TooDeep`] if nested containers go more than
/// [`MAX_DEPTH`] levels down.
pub fn decode_attrs(schema: &Schema, data: &[u8]) -> Result<Vec<Attr>> {
    decode_attrs_at(schema, data, 0)
}

pub(crate) fn decode_attrs_at(schema: &Schema, data: &[u8], depth: usize) -> Result<Vec<Attr>> {
    if depth > MAX_DEPTH {
        return Err(DecodeError::TooDeep { limit: MAX_DEPTH }.into());
    }

    let mut attrs = Vec::new();
    for raw in AttrIter::new(data) {
        let raw = raw?;
        let id = raw.kind();
        let attr = match schema.by_id(id) {
            Some(desc) => Attr {
                name: AttrName::Known(desc.name),
                value: desc.codec.decode_at(raw.payload, depth)?,
            },
            None => {
                debug!(
                    schema = schema.name(),
                    id,
                    len = raw.payload.len(),
                    "keeping unknown attribute"
                );
                Attr {
                    name: AttrName::Unknown(id),
                    value: AttrValue::Bytes(raw.payload.to_vec()),
                }
            }
        };
        attrs.push(attr);
    }
    Ok(attrs)
}

/// Encode an address as the single matching member of an address-union
/// schema (the descriptor whose codec is [`CodecKind::Ipv4`] or
/// [`CodecKind::Ipv6`]).
pub fn encode_address(schema: &Schema, addr: IpAddr) -> Result<Vec<u8>> {
    let desc = schema
        .descriptors()
        .iter()
        .find(|d| match addr {
            IpAddr::V4(_) => matches!(d.codec, CodecKind::Ipv4),
            IpAddr::V6(_) => matches!(d.codec, CodecKind::Ipv6),
        })
        .ok_or_else(|| ValidationError::TypeMismatch {
            codec: "ipaddr",
            value: if addr.is_ipv4() { "ipv4" } else { "ipv6" },
        })?;

    let mut buf = Vec::new();
    let payload = desc.codec.encode(&AttrValue::Addr(addr))?;
    attr::put(&mut buf, desc.id | desc.codec.type_flags(), &payload)?;
    Ok(buf)
}

/// Decode an address-union payload: exactly one IPv4 or IPv6 attribute.
pub fn decode_address(schema: &Schema, data: &[u8]) -> Result<IpAddr> {
    let mut iter = AttrIter::new(data);
    let raw = iter.next().ok_or(DecodeError::Truncated {
        expected: attr::NLA_HDRLEN,
        actual: 0,
    })??;

    let id = raw.kind();
    let addr = match schema.by_id(id).map(|d| d.codec) {
        Some(codec @ (CodecKind::Ipv4 | CodecKind::Ipv6)) => codec.decode(raw.payload)?,
        _ => return Err(DecodeError::UnknownVariant { id }.into()),
    };

    if !iter.is_empty() {
        let consumed = attr::nla_align(attr::NLA_HDRLEN + raw.payload.len());
        return Err(DecodeError::TrailingBytes {
            len: data.len().saturating_sub(consumed),
        }
        .into());
    }

    match addr {
        AttrValue::Addr(addr) => Ok(addr),
        _ => Err(DecodeError::UnknownVariant { id }.into()),
    }
}
