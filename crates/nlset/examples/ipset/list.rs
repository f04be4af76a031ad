//! List ipset sets and their members.
//!
//! This example queries the kernel's ipset protocol version and prints
//! every set with its type, header options and members, like
//! `ipset list`.
//!
//! Run with: cargo run -p nlset --example ipset_list [SETNAME]
//!
//! Note: Requires root (CAP_NET_ADMIN) and the ip_set module.

use nlset::netlink::AttrValue;
use nlset::netlink::nfnl::ipset::IpsetConnection;

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

    let version = ipset.protocol().await?;
    println!("ipset protocol {}", version.version);
    if let Some(min) = version.min {
        println!("(oldest supported: {min})");
    }
    println!();

    let sets = match std::env::args().nth(1) {
        Some(name) => ipset.list_set(&name).await?.into_iter().collect(),
        None => ipset.list_sets().await?,
    };

    if sets.is_empty() {
        println!("No sets defined.");
        return Ok(());
    }

    for set in &sets {
        println!("Name: {}", set.name);
        println!("Type: {} (revision {})", set.typename, set.revision);
        if let Some(family) = set.family {
            println!("Family: {family:?}");
        }

        let header: Vec<_> = set
            .header
            .iter()
            .map(|a| match &a.value {
                AttrValue::None => a.name.to_string(),
                v => format!("{} {}", a.name, format_value(v)),
            })
            .collect();
        println!("Header: {}", header.join(" "));

        println!("Members:");
        for entry in set.entries() {
            let mut line = entry.addr.to_string();
            if let Some(to) = entry.addr_to {
                line.push_str(&format!("-{to}"));
            }
            if let Some(cidr) = entry.cidr {
                line.push_str(&format!("/{cidr}"));
            }
            if let Some(port) = entry.port {
                line.push_str(&format!(",{port}"));
            }
            if let Some(timeout) = entry.timeout {
                line.push_str(&format!(" timeout {timeout}"));
            }
            println!("  {line}");
        }
        println!();
    }

    Ok(())
}

fn format_value(value: &AttrValue) -> String {
    match value {
        AttrValue::U8(v) => v.to_string(),
        AttrValue::U16(v) => v.to_string(),
        AttrValue::U32(v) => v.to_string(),
        AttrValue::Str(s) => s.clone(),
        AttrValue::Addr(a) => a.to_string(),
        other => format!("{other:?}"),
    }
}
