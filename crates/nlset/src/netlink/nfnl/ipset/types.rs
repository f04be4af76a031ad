//! Typed views over ipset attribute lists.

use std::net::IpAddr;

use super::schema::attr;
use crate::netlink::codec::AttrValue;
use crate::netlink::nfnl::NfMessage;
use crate::netlink::tree::{self, Attr};

/// Address family of a set (`NFPROTO_*`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Family {
    /// Unspecified, used by family-less types such as `list:set`.
    Unspec,
    /// IPv4.
    #[default]
    Inet,
    /// IPv6.
    Inet6,
}

impl Family {
    /// Wire value.
    pub fn as_u8(self) -> u8 {
        match self {
            Self::Unspec => libc::NFPROTO_UNSPEC as u8,
            Self::Inet => libc::NFPROTO_IPV4 as u8,
            Self::Inet6 => libc::NFPROTO_IPV6 as u8,
        }
    }

    /// Parse a wire value.
    pub fn from_u8(value: u8) -> Option<Self> {
        match i32::from(value) {
            libc::NFPROTO_UNSPEC => Some(Self::Unspec),
            libc::NFPROTO_IPV4 => Some(Self::Inet),
            libc::NFPROTO_IPV6 => Some(Self::Inet6),
            _ => None,
        }
    }

    /// Family of an address.
    pub fn of(addr: IpAddr) -> Self {
        match addr {
            IpAddr::V4(_) => Self::Inet,
            IpAddr::V6(_) => Self::Inet6,
        }
    }
}

/// Options for creating a set.
///
/// # Example
///
/// ```ignore
/// let opts = CreateOptions::new("hash:net")
///     .family(Family::Inet6)
///     .hashsize(4096)
///     .timeout(600);
/// ipset.create("v6nets", opts).await?;
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateOptions {
    typename: String,
    revision: u8,
    family: Family,
    hashsize: Option<u32>,
    maxelem: Option<u32>,
    timeout: Option<u32>,
    netmask: Option<u8>,
}

impl CreateOptions {
    /// Options for a set of the given type, e.g. `hash:ip`.
    pub fn new(typename: impl Into<String>) -> Self {
        Self {
            typename: typename.into(),
            revision: 0,
            family: Family::Inet,
            hashsize: None,
            maxelem: None,
            timeout: None,
            netmask: None,
        }
    }

    /// Set type revision.
    pub fn revision(mut self, revision: u8) -> Self {
        self.revision = revision;
        self
    }

    /// Address family.
    pub fn family(mut self, family: Family) -> Self {
        self.family = family;
        self
    }

    /// Initial hash size.
    pub fn hashsize(mut self, hashsize: u32) -> Self {
        self.hashsize = Some(hashsize);
        self
    }

    /// Maximum number of elements.
    pub fn maxelem(mut self, maxelem: u32) -> Self {
        self.maxelem = Some(maxelem);
        self
    }

    /// Default timeout of elements, in seconds.
    pub fn timeout(mut self, secs: u32) -> Self {
        self.timeout = Some(secs);
        self
    }

    /// Netmask applied to stored addresses.
    pub fn netmask(mut self, prefix: u8) -> Self {
        self.netmask = Some(prefix);
        self
    }

    /// Set type name.
    pub fn typename(&self) -> &str {
        &self.typename
    }

    pub(crate) fn to_attrs(&self) -> Vec<Attr> {
        let mut data = Vec::new();
        if let Some(v) = self.hashsize {
            data.push(Attr::new(attr::HASHSIZE, v));
        }
        if let Some(v) = self.maxelem {
            data.push(Attr::new(attr::MAXELEM, v));
        }
        if let Some(v) = self.timeout {
            data.push(Attr::new(attr::TIMEOUT, v));
        }
        if let Some(v) = self.netmask {
            data.push(Attr::new(attr::NETMASK, v));
        }

        vec![
            Attr::new(attr::TYPENAME, self.typename.as_str()),
            Attr::new(attr::REVISION, self.revision),
            Attr::new(attr::FAMILY, self.family.as_u8()),
            Attr::nested(attr::DATA, data),
        ]
    }
}

/// One set member: an address with optional prefix, range, port and
/// timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct IpsetEntry {
    /// Address, or start of the range.
    pub addr: IpAddr,
    /// End of an address range.
    pub addr_to: Option<IpAddr>,
    /// Prefix length.
    pub cidr: Option<u8>,
    /// Port, or start of the port range.
    pub port: Option<u16>,
    /// End of a port range.
    pub port_to: Option<u16>,
    /// Timeout in seconds.
    pub timeout: Option<u32>,
}

impl IpsetEntry {
    /// An entry for a single address.
    pub fn new(addr: IpAddr) -> Self {
        Self {
            addr,
            addr_to: None,
            cidr: None,
            port: None,
            port_to: None,
            timeout: None,
        }
    }

    /// Prefix length, for `hash:net` style sets.
    pub fn cidr(mut self, cidr: u8) -> Self {
        self.cidr = Some(cidr);
        self
    }

    /// Address range `addr..=to`.
    pub fn range(mut self, to: IpAddr) -> Self {
        self.addr_to = Some(to);
        self
    }

    /// Port, for `hash:ip,port` style sets.
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Port range `from..=to`.
    pub fn port_range(mut self, from: u16, to: u16) -> Self {
        self.port = Some(from);
        self.port_to = Some(to);
        self
    }

    /// Per-entry timeout in seconds.
    pub fn timeout(mut self, secs: u32) -> Self {
        self.timeout = Some(secs);
        self
    }

    /// Encode as the children of a DATA attribute.
    ///
    /// Ranges use the `_FROM`/`_TO` names; the wire ids are the same.
    pub fn to_attrs(&self) -> Vec<Attr> {
        let mut attrs = Vec::new();
        match self.addr_to {
            Some(to) => {
                attrs.push(Attr::new(attr::IP_FROM, self.addr));
                attrs.push(Attr::new(attr::IP_TO, to));
            }
            None => attrs.push(Attr::new(attr::IP, self.addr)),
        }
        if let Some(cidr) = self.cidr {
            attrs.push(Attr::new(attr::CIDR, cidr));
        }
        match (self.port, self.port_to) {
            (Some(from), Some(to)) => {
                attrs.push(Attr::new(attr::PORT_FROM, from));
                attrs.push(Attr::new(attr::PORT_TO, to));
            }
            (Some(port), None) => attrs.push(Attr::new(attr::PORT, port)),
            _ => {}
        }
        if let Some(timeout) = self.timeout {
            attrs.push(Attr::new(attr::TIMEOUT, timeout));
        }
        attrs
    }

    /// Read an entry from decoded DATA children. Returns `None` for members
    /// without an address.
    pub fn from_attrs(attrs: &[Attr]) -> Option<Self> {
        let addr = tree::find(attrs, attr::IP)
            .or_else(|| tree::find(attrs, attr::IP_FROM))?
            .as_addr()?;
        Some(Self {
            addr,
            addr_to: tree::find(attrs, attr::IP_TO).and_then(AttrValue::as_addr),
            cidr: tree::find(attrs, attr::CIDR).and_then(AttrValue::as_u8),
            port: tree::find(attrs, attr::PORT)
                .or_else(|| tree::find(attrs, attr::PORT_FROM))
                .and_then(AttrValue::as_u16),
            port_to: tree::find(attrs, attr::PORT_TO).and_then(AttrValue::as_u16),
            timeout: tree::find(attrs, attr::TIMEOUT).and_then(AttrValue::as_u32),
        })
    }
}

impl From<IpAddr> for IpsetEntry {
    fn from(addr: IpAddr) -> Self {
        Self::new(addr)
    }
}

/// Protocol versions reported by the kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ProtocolVersion {
    /// Protocol version the kernel speaks.
    pub version: u8,
    /// Oldest version the kernel still accepts, if reported.
    pub min: Option<u32>,
}

impl ProtocolVersion {
    pub(crate) fn from_message(msg: &NfMessage) -> Option<Self> {
        Some(Self {
            version: msg.get(attr::PROTOCOL)?.as_u8()?,
            min: msg.get(attr::PROTOCOL_MIN).and_then(AttrValue::as_u32),
        })
    }
}

/// Revisions of a set type supported by the kernel.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SetType {
    /// Type name.
    pub typename: String,
    /// Family the query was made for.
    pub family: Option<Family>,
    /// Newest supported revision.
    pub revision: u8,
    /// Oldest supported revision.
    pub revision_min: Option<u8>,
}

impl SetType {
    pub(crate) fn from_message(msg: &NfMessage) -> Option<Self> {
        Some(Self {
            typename: msg.get(attr::TYPENAME)?.as_str()?.to_string(),
            family: msg
                .get(attr::FAMILY)
                .and_then(AttrValue::as_u8)
                .and_then(Family::from_u8),
            revision: msg.get(attr::REVISION)?.as_u8()?,
            revision_min: msg.get(attr::REVISION_MIN).and_then(AttrValue::as_u8),
        })
    }
}

/// A set as reported by a list or save dump.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct IpsetInfo {
    /// Set name.
    pub name: String,
    /// Set type, e.g. `hash:ip`.
    pub typename: String,
    /// Type revision.
    pub revision: u8,
    /// Address family.
    pub family: Option<Family>,
    /// Header DATA block (hashsize, maxelem, references, memsize...).
    pub header: Vec<Attr>,
    /// DATA block of each member, in kernel order.
    pub members: Vec<Vec<Attr>>,
}

impl IpsetInfo {
    fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Group dump frames into sets.
    ///
    /// The kernel splits a large set over several frames; only the first
    /// carries the type and header, the rest repeat the name and carry more
    /// members.
    pub fn from_messages(messages: &[NfMessage]) -> Vec<Self> {
        let mut sets: Vec<Self> = Vec::new();
        for msg in messages {
            let Some(name) = msg.get(attr::SETNAME).and_then(AttrValue::as_str) else {
                continue;
            };
            let continues = msg.get(attr::TYPENAME).is_none()
                && sets.last().is_some_and(|last| last.name == name);
            if !continues {
                sets.push(Self::named(name));
            }
            if let Some(set) = sets.last_mut() {
                set.merge(msg);
            }
        }
        sets
    }

    fn merge(&mut self, msg: &NfMessage) {
        for a in &msg.attrs {
            let Some(name) = a.name.known() else { continue };
            match name {
                attr::TYPENAME => {
                    if let Some(v) = a.value.as_str() {
                        self.typename = v.to_string();
                    }
                }
                attr::REVISION => {
                    if let Some(v) = a.value.as_u8() {
                        self.revision = v;
                    }
                }
                attr::FAMILY => self.family = a.value.as_u8().and_then(Family::from_u8),
                attr::DATA => {
                    if let Some(children) = a.value.as_nested() {
                        self.header = children.to_vec();
                    }
                }
                attr::ADT => {
                    let members = a.value.as_nested().unwrap_or_default();
                    self.members.extend(
                        members
                            .iter()
                            .filter_map(|m| m.value.as_nested())
                            .map(<[Attr]>::to_vec),
                    );
                }
                _ => {}
            }
        }
    }

    fn header_u32(&self, name: &str) -> Option<u32> {
        tree::find(&self.header, name).and_then(AttrValue::as_u32)
    }

    /// Hash size, for hash types.
    pub fn hashsize(&self) -> Option<u32> {
        self.header_u32(attr::HASHSIZE)
    }

    /// Maximum number of elements.
    pub fn maxelem(&self) -> Option<u32> {
        self.header_u32(attr::MAXELEM)
    }

    /// Default timeout, if the set supports timeouts.
    pub fn timeout(&self) -> Option<u32> {
        self.header_u32(attr::TIMEOUT)
    }

    /// Number of references from iptables rules or `list:set` sets.
    pub fn references(&self) -> Option<u32> {
        self.header_u32(attr::REFERENCES)
    }

    /// Kernel memory used by the set, in bytes.
    pub fn memsize(&self) -> Option<u32> {
        self.header_u32(attr::MEMSIZE)
    }

    /// Members that carry an address.
    pub fn entries(&self) -> impl Iterator<Item = IpsetEntry> + '_ {
        self.members.iter().filter_map(|m| IpsetEntry::from_attrs(m))
    }
}
