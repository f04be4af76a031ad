//! ipset attribute schemas.
//!
//! Four tables: the top level ([`IPSET`]), the set/element data block
//! ([`DATA`]), the member list of a list reply ([`ADT`]) and the address
//! union ([`IPADDR`]). Identifiers are reused inside [`DATA`] (`IP` and
//! `IP_FROM` are both 1, `PORT` and `PORT_FROM` both 4) and at the top level
//! (`TYPENAME` and `SETNAME2` are both 3); the first declaration is what a
//! decoder reports.
//!
//! Replies to the protocol and type queries reuse top-level ids with other
//! layouts and are decoded against their own tables.

use crate::netlink::codec::CodecKind::{
    AddressUnion, AsciiZ, HexScalar, Ipv4, Ipv6, Nested, None as Empty, UInt8, UInt16BigEndian,
    UInt32BigEndian,
};
use crate::netlink::schema::{AttrDescriptor, Schema};

use super::IPSET_MAXNAMELEN;

/// Attribute names, shared by all ipset schemas.
pub mod attr {
    pub const UNSPEC: &str = "UNSPEC";

    // Top level
    pub const PROTOCOL: &str = "PROTOCOL";
    pub const SETNAME: &str = "SETNAME";
    pub const TYPENAME: &str = "TYPENAME";
    pub const SETNAME2: &str = "SETNAME2";
    pub const REVISION: &str = "REVISION";
    pub const FAMILY: &str = "FAMILY";
    pub const FLAGS: &str = "FLAGS";
    pub const DATA: &str = "DATA";
    pub const ADT: &str = "ADT";
    pub const LINENO: &str = "LINENO";
    pub const PROTOCOL_MIN: &str = "PROTOCOL_MIN";
    pub const REVISION_MIN: &str = "REVISION_MIN";

    // DATA block
    pub const IP: &str = "IP";
    pub const IP_FROM: &str = "IP_FROM";
    pub const IP_TO: &str = "IP_TO";
    pub const CIDR: &str = "CIDR";
    pub const PORT: &str = "PORT";
    pub const PORT_FROM: &str = "PORT_FROM";
    pub const PORT_TO: &str = "PORT_TO";
    pub const TIMEOUT: &str = "TIMEOUT";
    pub const PROTO: &str = "PROTO";
    pub const CADT_FLAGS: &str = "CADT_FLAGS";
    pub const CADT_LINENO: &str = "CADT_LINENO";
    pub const MARK: &str = "MARK";
    pub const MARKMASK: &str = "MARKMASK";
    pub const GC: &str = "GC";
    pub const HASHSIZE: &str = "HASHSIZE";
    pub const MAXELEM: &str = "MAXELEM";
    pub const NETMASK: &str = "NETMASK";
    pub const PROBES: &str = "PROBES";
    pub const RESIZE: &str = "RESIZE";
    pub const SIZE: &str = "SIZE";
    pub const ELEMENTS: &str = "ELEMENTS";
    pub const REFERENCES: &str = "REFERENCES";
    pub const MEMSIZE: &str = "MEMSIZE";

    // Address union
    pub const IPADDR_IPV4: &str = "IPADDR_IPV4";
    pub const IPADDR_IPV6: &str = "IPADDR_IPV6";
}

static IPSET_ATTRS: [AttrDescriptor; 12] = [
    AttrDescriptor::new(0, attr::UNSPEC, Empty),
    AttrDescriptor::new(1, attr::PROTOCOL, UInt8),
    AttrDescriptor::new(2, attr::SETNAME, AsciiZ(IPSET_MAXNAMELEN)),
    AttrDescriptor::new(3, attr::TYPENAME, AsciiZ(IPSET_MAXNAMELEN)),
    AttrDescriptor::new(3, attr::SETNAME2, AsciiZ(IPSET_MAXNAMELEN)),
    AttrDescriptor::new(4, attr::REVISION, UInt8),
    AttrDescriptor::new(5, attr::FAMILY, UInt8),
    AttrDescriptor::new(6, attr::FLAGS, HexScalar),
    AttrDescriptor::new(7, attr::DATA, Nested(&DATA)),
    AttrDescriptor::new(8, attr::ADT, Nested(&ADT)),
    AttrDescriptor::new(9, attr::LINENO, HexScalar),
    AttrDescriptor::new(10, attr::PROTOCOL_MIN, HexScalar),
];

/// Top-level ipset attributes.
pub static IPSET: Schema = Schema::new("ipset", &IPSET_ATTRS);

static DATA_ATTRS: [AttrDescriptor; 24] = [
    AttrDescriptor::new(0, attr::UNSPEC, Empty),
    AttrDescriptor::new(1, attr::IP, AddressUnion(&IPADDR)),
    AttrDescriptor::new(1, attr::IP_FROM, AddressUnion(&IPADDR)),
    AttrDescriptor::new(2, attr::IP_TO, AddressUnion(&IPADDR)),
    AttrDescriptor::new(3, attr::CIDR, UInt8),
    AttrDescriptor::new(4, attr::PORT, UInt16BigEndian),
    AttrDescriptor::new(4, attr::PORT_FROM, UInt16BigEndian),
    AttrDescriptor::new(5, attr::PORT_TO, UInt16BigEndian),
    AttrDescriptor::new(6, attr::TIMEOUT, HexScalar),
    AttrDescriptor::new(7, attr::PROTO, Nested(&DATA)),
    AttrDescriptor::new(8, attr::CADT_FLAGS, HexScalar),
    AttrDescriptor::new(9, attr::CADT_LINENO, HexScalar),
    AttrDescriptor::new(10, attr::MARK, HexScalar),
    AttrDescriptor::new(11, attr::MARKMASK, HexScalar),
    AttrDescriptor::new(17, attr::GC, HexScalar),
    AttrDescriptor::new(18, attr::HASHSIZE, UInt32BigEndian),
    AttrDescriptor::new(19, attr::MAXELEM, UInt32BigEndian),
    AttrDescriptor::new(20, attr::NETMASK, UInt8),
    AttrDescriptor::new(21, attr::PROBES, UInt8),
    AttrDescriptor::new(22, attr::RESIZE, UInt8),
    AttrDescriptor::new(23, attr::SIZE, HexScalar),
    AttrDescriptor::new(24, attr::ELEMENTS, HexScalar),
    AttrDescriptor::new(25, attr::REFERENCES, UInt32BigEndian),
    AttrDescriptor::new(26, attr::MEMSIZE, UInt32BigEndian),
];

/// Set header and element data (`IPSET_ATTR_DATA`).
pub static DATA: Schema = Schema::new("ipset data", &DATA_ATTRS);

static ADT_ATTRS: [AttrDescriptor; 1] = [AttrDescriptor::new(7, attr::DATA, Nested(&DATA))];

/// Member list of a list reply (`IPSET_ATTR_ADT`), one `DATA` per member.
pub static ADT: Schema = Schema::new("ipset adt", &ADT_ATTRS);

static IPADDR_ATTRS: [AttrDescriptor; 3] = [
    AttrDescriptor::new(0, attr::UNSPEC, Empty),
    AttrDescriptor::new(1, attr::IPADDR_IPV4, Ipv4),
    AttrDescriptor::new(2, attr::IPADDR_IPV6, Ipv6),
];

/// Address union: exactly one IPv4 or IPv6 address.
pub static IPADDR: Schema = Schema::new("ipset ipaddr", &IPADDR_ATTRS);

static PROTOCOL_REPLY_ATTRS: [AttrDescriptor; 2] = [
    AttrDescriptor::new(1, attr::PROTOCOL, UInt8),
    AttrDescriptor::new(10, attr::PROTOCOL_MIN, UInt8),
];

/// Reply to a protocol query. The kernel sends `PROTOCOL_MIN` as one byte.
pub static PROTOCOL_REPLY: Schema = Schema::new("ipset protocol reply", &PROTOCOL_REPLY_ATTRS);

static TYPE_REPLY_ATTRS: [AttrDescriptor; 5] = [
    AttrDescriptor::new(1, attr::PROTOCOL, UInt8),
    AttrDescriptor::new(3, attr::TYPENAME, AsciiZ(IPSET_MAXNAMELEN)),
    AttrDescriptor::new(4, attr::REVISION, UInt8),
    AttrDescriptor::new(5, attr::FAMILY, UInt8),
    AttrDescriptor::new(7, attr::REVISION_MIN, UInt8),
];

/// Reply to a type query. Id 7 is the oldest supported revision here, not
/// a DATA block.
pub static TYPE_REPLY: Schema = Schema::new("ipset type reply", &TYPE_REPLY_ATTRS);
