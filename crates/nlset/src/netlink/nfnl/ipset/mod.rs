//! ipset over nfnetlink.
//!
//! ipset is the nfnetlink subsystem 6. Every request carries the protocol
//! version attribute; the rest of the contract depends on the command.
//!
//! # Example
//!
//! ```no_run
//! use nlset::netlink::nfnl::ipset::{CreateOptions, IpsetConnection, IpsetEntry};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let ipset = IpsetConnection::new()?;
//!
//! ipset.create("blacklist", CreateOptions::new("hash:ip").timeout(300)).await?;
//! ipset.add("blacklist", IpsetEntry::new("192.0.2.1".parse()?)).await?;
//!
//! for set in ipset.list_sets().await? {
//!     println!("{} ({}): {} entries", set.name, set.typename, set.members.len());
//! }
//! # Ok(())
//! # }
//! ```

mod connection;
pub mod schema;
mod types;

pub use connection::{IpsetConnection, decode_replies, validate};
pub use schema::{ADT, DATA, IPADDR, IPSET, PROTOCOL_REPLY, TYPE_REPLY};
pub use types::{CreateOptions, Family, IpsetEntry, IpsetInfo, ProtocolVersion, SetType};

use super::{NFNL_SUBSYS_IPSET, qualify};
use crate::netlink::error::Error;
use crate::netlink::message::{NLM_F_ACK, NLM_F_DUMP, NLM_F_EXCL, NLM_F_REQUEST};
use crate::netlink::schema::Schema;
use schema::attr;

/// Protocol version sent with every request.
pub const IPSET_PROTOCOL: u8 = 6;

/// Size of set and type name fields, including the terminator.
pub const IPSET_MAXNAMELEN: usize = 32;

/// ipset commands.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IpsetCmd {
    /// Query the protocol version.
    Protocol = 1,
    /// Create a new, empty set.
    Create = 2,
    /// Destroy one set, or all sets.
    Destroy = 3,
    /// Remove all members of one set, or of all sets.
    Flush = 4,
    /// Rename a set.
    Rename = 5,
    /// Exchange two sets.
    Swap = 6,
    /// List sets with their members.
    List = 7,
    /// Same as list, in restorable form.
    Save = 8,
    /// Add a member.
    Add = 9,
    /// Delete a member.
    Del = 10,
    /// Test membership.
    Test = 11,
    /// Get the header of one set.
    Header = 12,
    /// Query the revisions of a set type.
    Type = 13,
}

impl IpsetCmd {
    /// All commands in code order.
    pub const ALL: [Self; 13] = [
        Self::Protocol,
        Self::Create,
        Self::Destroy,
        Self::Flush,
        Self::Rename,
        Self::Swap,
        Self::List,
        Self::Save,
        Self::Add,
        Self::Del,
        Self::Test,
        Self::Header,
        Self::Type,
    ];

    /// Command code.
    #[inline]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Look up a command by code.
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|cmd| cmd.code() == code)
    }

    /// Netlink message type of this command.
    #[inline]
    pub const fn message_type(self) -> u16 {
        qualify(self.code(), NFNL_SUBSYS_IPSET)
    }

    /// Whether the kernel answers with a multipart dump.
    #[inline]
    pub const fn is_dump(self) -> bool {
        matches!(self, Self::List | Self::Save)
    }

    /// Request flags: dumps ask for a dump, everything else for an ack.
    ///
    /// CREATE, ADD and DEL also carry `NLM_F_EXCL`; without it the kernel
    /// ignores an existing set or element on create/add and a missing one
    /// on delete.
    #[inline]
    pub const fn flags(self) -> u16 {
        match self {
            _ if self.is_dump() => NLM_F_REQUEST | NLM_F_DUMP,
            Self::Create | Self::Add | Self::Del => NLM_F_REQUEST | NLM_F_ACK | NLM_F_EXCL,
            _ => NLM_F_REQUEST | NLM_F_ACK,
        }
    }

    /// Attributes that must be present (and non-empty) in the request.
    pub fn required(self) -> &'static [&'static str] {
        match self {
            Self::Protocol | Self::Destroy | Self::Flush | Self::List | Self::Save => {
                &[attr::PROTOCOL]
            }
            Self::Create => &[
                attr::PROTOCOL,
                attr::SETNAME,
                attr::TYPENAME,
                attr::REVISION,
                attr::FAMILY,
            ],
            Self::Rename | Self::Swap => &[attr::PROTOCOL, attr::SETNAME, attr::SETNAME2],
            Self::Add | Self::Del | Self::Test => &[attr::PROTOCOL, attr::SETNAME, attr::DATA],
            Self::Header => &[attr::PROTOCOL, attr::SETNAME],
            Self::Type => &[attr::PROTOCOL, attr::TYPENAME, attr::FAMILY],
        }
    }

    /// Schema reply frames are decoded against.
    pub fn reply_schema(self) -> &'static Schema {
        match self {
            Self::Protocol => &PROTOCOL_REPLY,
            Self::Type => &TYPE_REPLY,
            _ => &IPSET,
        }
    }

    /// Upper-case command name, for diagnostics.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Protocol => "PROTOCOL",
            Self::Create => "CREATE",
            Self::Destroy => "DESTROY",
            Self::Flush => "FLUSH",
            Self::Rename => "RENAME",
            Self::Swap => "SWAP",
            Self::List => "LIST",
            Self::Save => "SAVE",
            Self::Add => "ADD",
            Self::Del => "DEL",
            Self::Test => "TEST",
            Self::Header => "HEADER",
            Self::Type => "TYPE",
        }
    }
}

// ipset-specific kernel error codes (include/uapi/linux/netfilter/ipset/ip_set.h)

/// The kernel does not speak the requested protocol version.
pub const IPSET_ERR_PROTOCOL: i32 = 4097;
/// Cannot load the set type.
pub const IPSET_ERR_FIND_TYPE: i32 = 4098;
/// Maximal number of sets reached.
pub const IPSET_ERR_MAX_SETS: i32 = 4099;
/// Set is busy (dump in progress).
pub const IPSET_ERR_BUSY: i32 = 4100;
/// The second set of a rename or swap already exists.
pub const IPSET_ERR_EXIST_SETNAME2: i32 = 4101;
/// Swap across incompatible set types.
pub const IPSET_ERR_TYPE_MISMATCH: i32 = 4102;
/// Element is already present (add), or missing (test, del).
pub const IPSET_ERR_EXIST: i32 = 4103;
/// Invalid CIDR.
pub const IPSET_ERR_INVALID_CIDR: i32 = 4104;
/// Invalid netmask.
pub const IPSET_ERR_INVALID_NETMASK: i32 = 4105;
/// Invalid protocol family.
pub const IPSET_ERR_INVALID_FAMILY: i32 = 4106;
/// Timeout on a set created without timeout support.
pub const IPSET_ERR_TIMEOUT: i32 = 4107;
/// Set is referenced and cannot be destroyed or renamed.
pub const IPSET_ERR_REFERENCED: i32 = 4108;
/// Expected an IPv4 address.
pub const IPSET_ERR_IPADDR_IPV4: i32 = 4109;
/// Expected an IPv6 address.
pub const IPSET_ERR_IPADDR_IPV6: i32 = 4110;
/// Counters on a set created without counter support.
pub const IPSET_ERR_COUNTER: i32 = 4111;
/// Comment on a set created without comment support.
pub const IPSET_ERR_COMMENT: i32 = 4112;
/// Invalid markmask.
pub const IPSET_ERR_INVALID_MARKMASK: i32 = 4113;
/// skbinfo on a set created without skbinfo support.
pub const IPSET_ERR_SKBINFO: i32 = 4114;
/// Bitmask and netmask are mutually exclusive.
pub const IPSET_ERR_BITMASK_NETMASK_EXCL: i32 = 4115;

/// Human-readable text for an ipset-specific error code.
pub fn describe_error(code: i32) -> Option<&'static str> {
    Some(match code {
        IPSET_ERR_PROTOCOL => "kernel does not support the requested protocol version",
        IPSET_ERR_FIND_TYPE => "set type not supported by the kernel",
        IPSET_ERR_MAX_SETS => "maximal number of sets reached",
        IPSET_ERR_BUSY => "set is busy",
        IPSET_ERR_EXIST_SETNAME2 => "a set with the second name already exists",
        IPSET_ERR_TYPE_MISMATCH => "set types are incompatible",
        IPSET_ERR_EXIST => "element already added or missing",
        IPSET_ERR_INVALID_CIDR => "invalid CIDR",
        IPSET_ERR_INVALID_NETMASK => "invalid netmask",
        IPSET_ERR_INVALID_FAMILY => "invalid protocol family",
        IPSET_ERR_TIMEOUT => "set was created without timeout support",
        IPSET_ERR_REFERENCED => "set is referenced",
        IPSET_ERR_IPADDR_IPV4 => "an IPv4 address is expected",
        IPSET_ERR_IPADDR_IPV6 => "an IPv6 address is expected",
        IPSET_ERR_COUNTER => "set was created without counter support",
        IPSET_ERR_COMMENT => "set was created without comment support",
        IPSET_ERR_INVALID_MARKMASK => "invalid markmask",
        IPSET_ERR_SKBINFO => "set was created without skbinfo support",
        IPSET_ERR_BITMASK_NETMASK_EXCL => "bitmask and netmask are mutually exclusive",
        _ => return None,
    })
}

impl Error {
    /// Check if the kernel reported an element as already present or
    /// absent (`IPSET_ERR_EXIST`).
    pub fn is_element_exists(&self) -> bool {
        self.errno() == Some(IPSET_ERR_EXIST)
    }

    /// Check if the set is still referenced (`IPSET_ERR_REFERENCED`).
    pub fn is_set_referenced(&self) -> bool {
        self.errno() == Some(IPSET_ERR_REFERENCED)
    }
}
