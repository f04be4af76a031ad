//! Kernel integration tests.
//!
//! Round trips against the running kernel's ip_set module.

use nlset::Result;
use nlset::netlink::nfnl::ipset::{CreateOptions, Family, IpsetConnection, IpsetEntry};
use std::net::{IpAddr, Ipv4Addr};

use crate::common::unique_set_name;

/// Destroys the set when dropped so failed assertions do not leak sets.
struct SetGuard(String);

impl Drop for SetGuard {
    fn drop(&mut self) {
        let name = self.0.clone();
        // Best effort, the test itself already destroyed it on success
        let _ = std::thread::spawn(move || {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .ok()?;
            rt.block_on(async {
                let ipset = IpsetConnection::new().ok()?;
                ipset.destroy(Some(&name)).await.ok()
            })
        })
        .join();
    }
}

#[tokio::test]
async fn test_protocol_version() -> Result<()> {
    require_root!();

    let ipset = IpsetConnection::new()?;
    let version = ipset.protocol().await?;
    assert!(version.version >= 6);

    Ok(())
}

#[tokio::test]
async fn test_type_revisions() -> Result<()> {
    require_root!();

    let ipset = IpsetConnection::new()?;
    let set_type = ipset.get_type("hash:ip", Family::Inet).await?;
    assert_eq!(set_type.typename, "hash:ip");
    assert!(set_type.revision >= set_type.revision_min.unwrap_or(0));

    Ok(())
}

#[tokio::test]
async fn test_set_lifecycle() -> Result<()> {
    require_root!();

    let ipset = IpsetConnection::new()?;
    let name = unique_set_name("nlset");
    let _guard = SetGuard(name.clone());

    ipset
        .create(&name, CreateOptions::new("hash:ip").hashsize(1024))
        .await?;

    let member = IpsetEntry::new(IpAddr::V4(Ipv4Addr::new(192, 0, 2, 7)));
    let other = IpsetEntry::new(IpAddr::V4(Ipv4Addr::new(192, 0, 2, 8)));
    ipset.add(&name, member).await?;

    assert!(ipset.test(&name, member).await?);
    assert!(!ipset.test(&name, other).await?);

    let set = ipset.list_set(&name).await?.expect("set is listed");
    assert_eq!(set.typename, "hash:ip");
    assert_eq!(set.family, Some(Family::Inet));
    let addrs: Vec<_> = set.entries().map(|e| e.addr).collect();
    assert_eq!(addrs, [member.addr]);

    let header = ipset.header(&name).await?;
    assert_eq!(header.typename, "hash:ip");

    // Adding twice is rejected
    let err = ipset.add(&name, member).await.unwrap_err();
    assert!(err.is_element_exists());

    ipset.del(&name, member).await?;
    assert!(!ipset.test(&name, member).await?);

    ipset.destroy(Some(&name)).await?;
    assert!(ipset.list(Some(&name)).await.unwrap_err().is_not_found());

    Ok(())
}

#[tokio::test]
async fn test_rename_and_swap() -> Result<()> {
    require_root!();

    let ipset = IpsetConnection::new()?;
    let first = unique_set_name("nlset");
    let second = unique_set_name("nlset");
    let renamed = unique_set_name("nlset");
    let _guards = [
        SetGuard(first.clone()),
        SetGuard(second.clone()),
        SetGuard(renamed.clone()),
    ];

    ipset.create(&first, CreateOptions::new("hash:ip")).await?;
    ipset.create(&second, CreateOptions::new("hash:ip")).await?;
    let member = IpsetEntry::new(IpAddr::V4(Ipv4Addr::new(198, 51, 100, 1)));
    ipset.add(&first, member).await?;

    ipset.swap(&first, &second).await?;
    assert!(!ipset.test(&first, member).await?);
    assert!(ipset.test(&second, member).await?);

    ipset.rename(&second, &renamed).await?;
    assert!(ipset.test(&renamed, member).await?);

    ipset.flush(Some(&renamed)).await?;
    assert!(!ipset.test(&renamed, member).await?);

    ipset.destroy(Some(&first)).await?;
    ipset.destroy(Some(&renamed)).await?;

    Ok(())
}
