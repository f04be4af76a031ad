//! Netlink attribute codec and nfnetlink/ipset protocol.
//!
//! # Layers
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │ IpsetConnection                         │
//! │ (commands, request validation, replies) │
//! └────────────────┬────────────────────────┘
//!                  │
//! ┌────────────────▼────────────────────────┐
//! │ NfMessage + Schema                      │
//! │ (nfgenmsg header, attribute trees)      │
//! └────────────────┬────────────────────────┘
//!                  │
//! ┌────────────────▼────────────────────────┐
//! │ Transport (Connection: NETLINK_NETFILTER)│
//! └─────────────────────────────────────────┘
//! ```
//!
//! Attribute trees are described by static [`Schema`] tables and encoded or
//! decoded by the functions in [`tree`]. The ipset tables live in
//! [`nfnl::ipset::schema`].
//!
//! # Quick Start
//!
//! ```ignore
//! use nlset::netlink::nfnl::ipset::{IpsetConnection, IpsetEntry};
//!
//! let ipset = IpsetConnection::new()?;
//! let version = ipset.protocol().await?;
//! println!("kernel speaks ipset protocol {}", version.version);
//!
//! let present = ipset.test("blacklist", IpsetEntry::new("10.0.0.1".parse()?)).await?;
//! ```
//!
//! # Custom transports
//!
//! Anything implementing [`Transport`] can carry requests:
//!
//! ```ignore
//! use nlset::netlink::{Reply, Result, Transport};
//!
//! struct Recorded(Vec<Vec<u8>>);
//!
//! impl Transport for Recorded {
//!     async fn request(&self, _msg: &[u8], _ty: u16, _flags: u16) -> Result<Reply> {
//!         Ok(Reply::new(self.0.clone()))
//!     }
//! }
//! ```

pub mod attr;
mod builder;
pub mod codec;
pub mod connection;
mod error;
#[cfg(test)]
mod fixtures;
pub mod message;
pub mod nfnl;
pub mod schema;
pub mod socket;
pub mod tree;

pub use builder::MessageBuilder;
pub use codec::{AttrValue, CodecKind};
pub use connection::{Connection, Reply, Transport};
pub use error::{DecodeError, Error, ProtocolError, Result, ValidationError};
pub use message::{MessageIter, NlMsgError, NlMsgHdr, NlMsgType};
pub use schema::{AttrDescriptor, Schema};
pub use socket::NetlinkSocket;
pub use tree::{Attr, AttrName};
