//! Async ipset client for Linux over nfnetlink.
//!
//! This crate encodes and decodes netlink attribute trees against static,
//! possibly recursive schemas, wraps them in nfnetlink messages, and drives
//! the ipset subsystem with them: protocol query, list/save, create,
//! destroy, flush, rename, swap, and add/del/test of members.
//!
//! # Features
//!
//! - `serde` - `Serialize` on decoded attributes, messages and set summaries
//! - `integration` - tests against the running kernel (root required)
//!
//! # Example
//!
//! ```ignore
//! use nlset::netlink::nfnl::ipset::{CreateOptions, IpsetConnection, IpsetEntry};
//!
//! #[tokio::main]
//! async fn main() -> nlset::Result<()> {
//!     let ipset = IpsetConnection::new()?;
//!
//!     ipset.create("blacklist", CreateOptions::new("hash:ip")).await?;
//!     ipset.add("blacklist", IpsetEntry::new("192.0.2.7".parse().unwrap())).await?;
//!
//!     for set in ipset.list_sets().await? {
//!         println!("{}: {} members", set.name, set.members.len());
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Logging
//!
//! Requests, replies and kernel errors are reported through [`tracing`] at
//! `debug` and `trace` level. The crate never installs a subscriber.

pub mod netlink;

// Re-export common types at crate root for convenience
pub use netlink::nfnl::ipset::IpsetConnection;
pub use netlink::{Connection, Error, Result};
