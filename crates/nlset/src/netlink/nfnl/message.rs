//! A complete nfnetlink payload: header plus top-level attributes.

use super::header::{NFGEN_HDRLEN, NfGenMsg};
use crate::netlink::codec::AttrValue;
use crate::netlink::error::Result;
use crate::netlink::schema::Schema;
use crate::netlink::tree::{self, Attr};

/// nfnetlink message body, without the netlink header.
///
/// Attributes keep their order; a name may appear more than once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct NfMessage {
    /// Address family.
    pub family: u8,
    /// nfnetlink version.
    pub version: u8,
    /// Resource id.
    pub res_id: u16,
    /// Top-level attributes.
    pub attrs: Vec<Attr>,
}

impl NfMessage {
    /// Create an empty message for the given family.
    pub fn new(family: u8) -> Self {
        Self::from_header(NfGenMsg::new(family))
    }

    fn from_header(hdr: NfGenMsg) -> Self {
        Self {
            family: hdr.family,
            version: hdr.version,
            res_id: hdr.res_id,
            attrs: Vec::new(),
        }
    }

    /// The subsystem header of this message.
    pub fn header(&self) -> NfGenMsg {
        NfGenMsg {
            family: self.family,
            version: self.version,
            res_id: self.res_id,
        }
    }

    /// Append an attribute (builder style).
    pub fn attr(mut self, name: &'static str, value: impl Into<AttrValue>) -> Self {
        self.push(Attr::new(name, value));
        self
    }

    /// Append an attribute.
    pub fn push(&mut self, attr: Attr) {
        self.attrs.push(attr);
    }

    /// First value with the given name.
    pub fn get(&self, name: &str) -> Option<&AttrValue> {
        tree::find(&self.attrs, name)
    }

    /// Serialize header and attributes against `schema`.
    pub fn to_bytes(&self, schema: &Schema) -> Result<Vec<u8>> {
        let attrs = tree::encode_attrs(schema, &self.attrs)?;
        let mut buf = Vec::with_capacity(NFGEN_HDRLEN + attrs.len());
        buf.extend_from_slice(&self.header().to_bytes());
        buf.extend_from_slice(&attrs);
        Ok(buf)
    }

    /// Parse header and attributes against `schema`.
    pub fn from_bytes(data: &[u8], schema: &Schema) -> Result<Self> {
        let mut msg = Self::from_header(NfGenMsg::from_bytes(data)?);
        msg.attrs = tree::decode_attrs(schema, &data[NFGEN_HDRLEN..])?;
        Ok(msg)
    }
}
