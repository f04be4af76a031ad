//! Create a set, manage its members, and clean up.
//!
//! Demonstrates create/add/test/del/destroy and how kernel errors map to
//! the error helpers.
//!
//! Run with: sudo cargo run -p nlset --example ipset_manage
//!
//! Note: Requires root (CAP_NET_ADMIN) and the ip_set module.

use std::net::{IpAddr, Ipv4Addr};

use nlset::netlink::nfnl::ipset::{CreateOptions, Family, IpsetConnection, IpsetEntry};

const SET: &str = "nlset-demo";

#[tokio::main]
async fn main() -> nlset::Result<()> {
    // RUST_LOG=nlset=debug shows requests and replies
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let ipset = IpsetConnection::new()?;

    let set_type = ipset.get_type("hash:ip", Family::Inet).await?;
    println!(
        "hash:ip supports revisions {}..={}",
        set_type.revision_min.unwrap_or(0),
        set_type.revision
    );

    match ipset
        .create(
            SET,
            CreateOptions::new("hash:ip")
                .revision(set_type.revision)
                .hashsize(1024)
                .timeout(600),
        )
        .await
    {
        Ok(()) => println!("created {SET}"),
        Err(e) if e.is_already_exists() => println!("{SET} already exists"),
        Err(e) if e.is_permission_denied() => {
            eprintln!("permission denied, run as root");
            return Err(e);
        }
        Err(e) => return Err(e),
    }

    let member = IpsetEntry::new(IpAddr::V4(Ipv4Addr::new(192, 0, 2, 7))).timeout(60);
    match ipset.add(SET, member).await {
        Ok(()) => println!("added {}", member.addr),
        Err(e) if e.is_element_exists() => println!("{} already present", member.addr),
        Err(e) => return Err(e),
    }

    println!(
        "{} present: {}",
        member.addr,
        ipset.test(SET, IpsetEntry::new(member.addr)).await?
    );

    ipset.del(SET, IpsetEntry::new(member.addr)).await?;
    println!(
        "{} present after delete: {}",
        member.addr,
        ipset.test(SET, IpsetEntry::new(member.addr)).await?
    );

    ipset.destroy(Some(SET)).await?;
    println!("destroyed {SET}");

    Ok(())
}
