//! nfnetlink (`NETLINK_NETFILTER`) message model.
//!
//! Every nfnetlink message carries a 4-byte `nfgenmsg` header after the
//! standard netlink header, followed by the subsystem's attributes:
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │ nlmsghdr (16 bytes)                     │
//! │   nlmsg_type = command | subsystem << 8 │
//! ├─────────────────────────────────────────┤
//! │ nfgenmsg (4 bytes)                      │
//! │   family (u8), version (u8),            │
//! │   res_id (be16)                         │
//! ├─────────────────────────────────────────┤
//! │ Attributes (TLV format)                 │
//! └─────────────────────────────────────────┘
//! ```
//!
//! Subsystems are addressed by folding their id into the message type with
//! [`qualify`]; there is no registry to populate.

mod header;
mod message;

pub mod ipset;

pub use header::{NFGEN_HDRLEN, NfGenMsg};
pub use message::NfMessage;

/// nfnetlink protocol version carried in `nfgenmsg.version`.
pub const NFNETLINK_V0: u8 = 0;

/// Subsystem id of conntrack.
pub const NFNL_SUBSYS_CTNETLINK: u8 = 1;
/// Subsystem id of ipset.
pub const NFNL_SUBSYS_IPSET: u8 = 6;

/// Combine a subsystem command code with its subsystem id into a netlink
/// message type.
#[inline]
pub const fn qualify(command: u8, subsystem: u8) -> u16 {
    (command as u16) | ((subsystem as u16) << 8)
}

/// Subsystem id of a netlink message type.
#[inline]
pub const fn subsystem_of(msg_type: u16) -> u8 {
    (msg_type >> 8) as u8
}

/// Command code of a netlink message type.
#[inline]
pub const fn command_of(msg_type: u16) -> u8 {
    (msg_type & 0xff) as u8
}
