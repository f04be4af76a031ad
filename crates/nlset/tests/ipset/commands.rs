//! Command tests against the in-memory transport.

use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use nlset::netlink::message::{
    NLM_F_ACK, NLM_F_DUMP, NLM_F_DUMP_INTR, NLM_F_EXCL, NLM_F_MULTI, NLM_F_REQUEST, NlMsgType,
};
use nlset::netlink::nfnl::NfMessage;
use nlset::netlink::nfnl::ipset::schema::attr;
use nlset::netlink::nfnl::ipset::{
    CreateOptions, Family, IPSET_ERR_EXIST, IpsetCmd, IpsetConnection, IpsetEntry,
};
use nlset::netlink::{
    Attr, AttrValue, DecodeError, Error, ProtocolError, Reply, Result, ValidationError,
};

use crate::common::{MockTransport, ack, error, frame, ipset_frame};

fn connection(transport: MockTransport) -> IpsetConnection<MockTransport> {
    IpsetConnection::from_transport(transport)
}

fn list_frame(name: &str, typename: &str, members: &[Ipv4Addr]) -> Vec<u8> {
    let adt = members
        .iter()
        .map(|ip| Attr::nested(attr::DATA, vec![Attr::new(attr::IP, *ip)]))
        .collect::<Vec<_>>();
    let msg = NfMessage::new(2)
        .attr(attr::PROTOCOL, 6u8)
        .attr(attr::SETNAME, name)
        .attr(attr::TYPENAME, typename)
        .attr(attr::REVISION, 4u8)
        .attr(attr::FAMILY, 2u8)
        .attr(
            attr::DATA,
            vec![
                Attr::new(attr::HASHSIZE, 1024u32),
                Attr::new(attr::MAXELEM, 65536u32),
            ],
        )
        .attr(attr::ADT, adt);
    ipset_frame(IpsetCmd::List, &msg)
}

#[tokio::test]
async fn test_list_without_filter() -> Result<()> {
    let ipset = connection(MockTransport::new().reply(Reply::new(vec![])));

    let messages = ipset.list(None).await?;
    assert!(messages.is_empty());

    let request = ipset.transport().single();
    assert_eq!(request.message_type, 7 | (6 << 8));
    assert_eq!(request.flags, NLM_F_REQUEST | NLM_F_DUMP);
    assert_eq!(request.message().attrs, [Attr::new(attr::PROTOCOL, 6u8)]);

    Ok(())
}

#[tokio::test]
async fn test_list_with_filter() -> Result<()> {
    let ipset = connection(MockTransport::new().reply(Reply::new(vec![])));

    ipset.list(Some("blacklist")).await?;

    let request = ipset.transport().single();
    assert_eq!(
        request.message().attrs,
        [
            Attr::new(attr::PROTOCOL, 6u8),
            Attr::new(attr::SETNAME, "blacklist")
        ]
    );
    // nfgenmsg + PROTOCOL (8) + SETNAME (4 + 10, padded to 16)
    assert_eq!(request.body.len(), 4 + 8 + 16);

    Ok(())
}

#[tokio::test]
async fn test_list_preserves_reply_order() -> Result<()> {
    let ipset = connection(MockTransport::new().reply(Reply::new(vec![
        list_frame("zeta", "hash:ip", &[Ipv4Addr::new(10, 0, 0, 1)]),
        list_frame("alpha", "hash:net", &[]),
    ])));

    let messages = ipset.list(None).await?;
    let names: Vec<_> = messages
        .iter()
        .filter_map(|m| m.get(attr::SETNAME).and_then(AttrValue::as_str))
        .collect();
    assert_eq!(names, ["zeta", "alpha"]);

    Ok(())
}

#[tokio::test]
async fn test_list_sets_summaries() -> Result<()> {
    let ipset = connection(MockTransport::new().reply(Reply::new(vec![list_frame(
        "blacklist",
        "hash:ip",
        &[Ipv4Addr::new(192, 0, 2, 1), Ipv4Addr::new(192, 0, 2, 2)],
    )])));

    let sets = ipset.list_sets().await?;
    assert_eq!(sets.len(), 1);
    let set = &sets[0];
    assert_eq!(set.name, "blacklist");
    assert_eq!(set.typename, "hash:ip");
    assert_eq!(set.family, Some(Family::Inet));
    assert_eq!(set.hashsize(), Some(1024));
    assert_eq!(set.maxelem(), Some(65536));
    let addrs: Vec<_> = set.entries().map(|e| e.addr).collect();
    assert_eq!(
        addrs,
        [
            IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1)),
            IpAddr::V4(Ipv4Addr::new(192, 0, 2, 2))
        ]
    );

    Ok(())
}

#[tokio::test]
async fn test_list_kernel_error() {
    let ipset = connection(MockTransport::new().reply(Reply::new(vec![error(-libc::ENOENT)])));

    let err = ipset.list(Some("missing")).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Protocol(ProtocolError::Kernel { code: 2, .. })
    ));
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_partial_dump_is_an_error() {
    let ipset = connection(MockTransport::new().reply(Reply::incomplete(vec![list_frame(
        "blacklist",
        "hash:ip",
        &[],
    )])));

    let err = ipset.list(None).await.unwrap_err();
    assert!(err.is_incomplete());
}

#[tokio::test]
async fn test_interrupted_dump_is_an_error() {
    let body = NfMessage::new(2)
        .attr(attr::SETNAME, "blacklist")
        .to_bytes(&nlset::netlink::nfnl::ipset::IPSET)
        .unwrap();
    let interrupted = frame(IpsetCmd::List.message_type(), NLM_F_DUMP_INTR, &body);
    let ipset = connection(MockTransport::new().reply(Reply::new(vec![interrupted])));

    let err = ipset.list(None).await.unwrap_err();
    assert!(err.is_incomplete());
}

#[tokio::test]
async fn test_malformed_reply() {
    // SETNAME without its terminator
    let mut body = vec![0x02, 0x00, 0x00, 0x00];
    body.extend_from_slice(&[0x07, 0x00, 0x02, 0x00, b'a', b'b', b'c', 0x00]);
    let ipset = connection(MockTransport::new().reply(Reply::new(vec![frame(
        IpsetCmd::List.message_type(),
        0,
        &body,
    )])));

    let err = ipset.list(None).await.unwrap_err();
    assert!(matches!(err, Error::Decode(DecodeError::Unterminated)));
}

#[tokio::test]
async fn test_unknown_attribute_in_reply_is_kept() -> Result<()> {
    let mut body = NfMessage::new(2)
        .attr(attr::SETNAME, "s")
        .to_bytes(&nlset::netlink::nfnl::ipset::IPSET)?;
    // Attribute 30 is not in the table
    body.extend_from_slice(&[0x06, 0x00, 0x1e, 0x00, 0xab, 0xcd, 0x00, 0x00]);
    let ipset = connection(MockTransport::new().reply(Reply::new(vec![frame(
        IpsetCmd::List.message_type(),
        0,
        &body,
    )])));

    let messages = ipset.list(None).await?;
    let unknown = &messages[0].attrs[1];
    assert_eq!(unknown.name.to_string(), "unknown:30");
    assert_eq!(unknown.value, AttrValue::Bytes(vec![0xab, 0xcd]));

    Ok(())
}

#[tokio::test]
async fn test_create_request() -> Result<()> {
    let ipset = connection(MockTransport::new());

    ipset
        .create(
            "blacklist",
            CreateOptions::new("hash:ip")
                .revision(4)
                .hashsize(1024)
                .maxelem(65536)
                .timeout(300),
        )
        .await?;

    let request = ipset.transport().single();
    assert_eq!(request.message_type, IpsetCmd::Create.message_type());
    assert_eq!(request.flags, NLM_F_REQUEST | NLM_F_ACK | NLM_F_EXCL);
    assert_eq!(
        request.message().attrs,
        [
            Attr::new(attr::PROTOCOL, 6u8),
            Attr::new(attr::SETNAME, "blacklist"),
            Attr::new(attr::TYPENAME, "hash:ip"),
            Attr::new(attr::REVISION, 4u8),
            Attr::new(attr::FAMILY, 2u8),
            Attr::nested(
                attr::DATA,
                vec![
                    Attr::new(attr::HASHSIZE, 1024u32),
                    Attr::new(attr::MAXELEM, 65536u32),
                    Attr::new(attr::TIMEOUT, 300u32),
                ]
            ),
        ]
    );

    Ok(())
}

#[tokio::test]
async fn test_create_existing_set() {
    let ipset = connection(MockTransport::new().reply(Reply::new(vec![error(-libc::EEXIST)])));

    let err = ipset
        .create("blacklist", CreateOptions::new("hash:ip"))
        .await
        .unwrap_err();
    assert!(err.is_already_exists());
}

#[tokio::test]
async fn test_name_too_long_is_rejected_before_sending() {
    let ipset = connection(MockTransport::new());

    let name = "x".repeat(32);
    let err = ipset
        .create(&name, CreateOptions::new("hash:ip"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Validation(ValidationError::StringTooLong { len: 32, max: 32 })
    ));
    assert!(ipset.transport().requests().is_empty());

    // 31 bytes fit
    ipset
        .create(&"x".repeat(31), CreateOptions::new("hash:ip"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_missing_name_is_rejected_before_sending() {
    let ipset = connection(MockTransport::new());
    let entry = IpsetEntry::new(IpAddr::V4(Ipv4Addr::LOCALHOST));

    let err = ipset.add("", entry).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Validation(ValidationError::MissingAttribute {
            command: "ADD",
            name: "SETNAME"
        })
    ));

    let err = ipset
        .create("s", CreateOptions::new(""))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Validation(ValidationError::MissingAttribute {
            name: "TYPENAME",
            ..
        })
    ));

    assert!(ipset.transport().requests().is_empty());
}

#[tokio::test]
async fn test_execute_rejects_incomplete_message() {
    let ipset = connection(MockTransport::new());
    let msg = NfMessage::new(2).attr(attr::SETNAME, "a");

    let err = ipset.execute(IpsetCmd::Swap, &msg).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Validation(ValidationError::MissingAttribute {
            command: "SWAP",
            name: "PROTOCOL"
        })
    ));
}

#[tokio::test]
async fn test_add_request() -> Result<()> {
    let ipset = connection(MockTransport::new());
    let entry = IpsetEntry::new(IpAddr::V4(Ipv4Addr::new(10, 1, 0, 0)))
        .cidr(16)
        .timeout(60);

    ipset.add("nets", entry).await?;

    let request = ipset.transport().single();
    assert_eq!(request.message_type, 0x0609);
    assert_eq!(request.flags, NLM_F_REQUEST | NLM_F_ACK | NLM_F_EXCL);
    assert_eq!(
        request.message().attrs,
        [
            Attr::new(attr::PROTOCOL, 6u8),
            Attr::new(attr::SETNAME, "nets"),
            Attr::nested(
                attr::DATA,
                vec![
                    Attr::new(attr::IP, Ipv4Addr::new(10, 1, 0, 0)),
                    Attr::new(attr::CIDR, 16u8),
                    Attr::new(attr::TIMEOUT, 60u32),
                ]
            ),
        ]
    );

    Ok(())
}

#[tokio::test]
async fn test_add_ipv6_range_with_ports() -> Result<()> {
    let ipset = connection(MockTransport::new());
    let from: Ipv6Addr = "2001:db8::1".parse().unwrap();
    let to: Ipv6Addr = "2001:db8::ff".parse().unwrap();
    let entry = IpsetEntry::new(IpAddr::V6(from))
        .range(IpAddr::V6(to))
        .port_range(8000, 8080);

    ipset.add("v6", entry).await?;

    // Decoded names are the first declared for each shared id
    let request = ipset.transport().single();
    let msg = request.message();
    let data = msg.get(attr::DATA).and_then(AttrValue::as_nested).unwrap();
    let names: Vec<_> = data.iter().map(|a| a.name.to_string()).collect();
    assert_eq!(names, ["IP", "IP_TO", "PORT", "PORT_TO"]);
    assert_eq!(IpsetEntry::from_attrs(data), Some(entry));

    Ok(())
}

#[tokio::test]
async fn test_add_existing_element() {
    let ipset = connection(MockTransport::new().reply(Reply::new(vec![error(-IPSET_ERR_EXIST)])));

    let err = ipset
        .add("s", IpsetEntry::new(IpAddr::V4(Ipv4Addr::LOCALHOST)))
        .await
        .unwrap_err();
    assert!(err.is_element_exists());
    assert_eq!(err.errno(), Some(4103));
}

#[tokio::test]
async fn test_add_without_ack_is_incomplete() {
    let ipset = connection(MockTransport::new().reply(Reply::new(vec![])));

    let err = ipset
        .add("s", IpsetEntry::new(IpAddr::V4(Ipv4Addr::LOCALHOST)))
        .await
        .unwrap_err();
    assert!(err.is_incomplete());
}

#[tokio::test]
async fn test_failed_dump_reports_done_errno() {
    let done = frame(NlMsgType::DONE, NLM_F_MULTI, &(-libc::ENOBUFS).to_ne_bytes());
    let ipset = connection(MockTransport::new().reply(Reply::new(vec![
        list_frame("blacklist", "hash:ip", &[]),
        done,
    ])));

    let err = ipset.list(None).await.unwrap_err();
    assert_eq!(err.errno(), Some(libc::ENOBUFS));
}

#[tokio::test]
async fn test_membership() -> Result<()> {
    let ipset = connection(
        MockTransport::new()
            .reply(Reply::new(vec![ack()]))
            .reply(Reply::new(vec![error(-IPSET_ERR_EXIST)]))
            .reply(Reply::new(vec![error(-libc::ENOENT)])),
    );
    let entry = IpsetEntry::new(IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1)));

    assert!(ipset.test("s", entry).await?);
    assert!(!ipset.test("s", entry).await?);
    let err = ipset.test("missing", entry).await.unwrap_err();
    assert!(err.is_not_found());

    let requests = ipset.transport().requests();
    assert!(requests.iter().all(|r| {
        r.message_type == IpsetCmd::Test.message_type() && r.flags == NLM_F_REQUEST | NLM_F_ACK
    }));

    Ok(())
}

#[tokio::test]
async fn test_del_request() -> Result<()> {
    let ipset = connection(MockTransport::new());

    ipset
        .del("s", IpsetEntry::new(IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1))).port(22))
        .await?;

    let request = ipset.transport().single();
    assert_eq!(request.message_type, IpsetCmd::Del.message_type());
    assert_eq!(request.attr_names(), ["PROTOCOL", "SETNAME", "DATA"]);

    Ok(())
}

#[tokio::test]
async fn test_rename_and_swap() -> Result<()> {
    let ipset = connection(MockTransport::new());

    ipset.rename("old", "new").await?;
    ipset.swap("a", "b").await?;

    let requests = ipset.transport().requests();
    assert_eq!(requests[0].message_type, IpsetCmd::Rename.message_type());
    assert_eq!(requests[1].message_type, IpsetCmd::Swap.message_type());

    // SETNAME2 shares id 3 with TYPENAME, which wins on decode
    let msg = requests[0].message();
    assert_eq!(msg.get(attr::SETNAME).and_then(AttrValue::as_str), Some("old"));
    assert_eq!(msg.get(attr::TYPENAME).and_then(AttrValue::as_str), Some("new"));

    Ok(())
}

#[tokio::test]
async fn test_destroy_and_flush_all() -> Result<()> {
    let ipset = connection(MockTransport::new());

    ipset.destroy(None).await?;
    ipset.flush(Some("s")).await?;

    let requests = ipset.transport().requests();
    assert_eq!(requests[0].message_type, IpsetCmd::Destroy.message_type());
    assert_eq!(requests[0].attr_names(), ["PROTOCOL"]);
    assert_eq!(requests[1].message_type, IpsetCmd::Flush.message_type());
    assert_eq!(requests[1].attr_names(), ["PROTOCOL", "SETNAME"]);

    Ok(())
}

#[tokio::test]
async fn test_save_is_a_dump() -> Result<()> {
    let ipset = connection(MockTransport::new().reply(Reply::new(vec![])));

    ipset.save(Some("s")).await?;

    let request = ipset.transport().single();
    assert_eq!(request.message_type, IpsetCmd::Save.message_type());
    assert_eq!(request.flags, NLM_F_REQUEST | NLM_F_DUMP);

    Ok(())
}

#[tokio::test]
async fn test_protocol_query() -> Result<()> {
    let body = [
        0x02, 0x00, 0x00, 0x00, // nfgenmsg
        0x05, 0x00, 0x01, 0x00, 0x07, 0x00, 0x00, 0x00, // PROTOCOL = 7
        0x05, 0x00, 0x0a, 0x00, 0x06, 0x00, 0x00, 0x00, // PROTOCOL_MIN = 6
    ];
    let reply = frame(IpsetCmd::Protocol.message_type(), 0, &body);
    let ipset = connection(MockTransport::new().reply(Reply::new(vec![reply, ack()])));

    let version = ipset.protocol().await?;
    assert_eq!(version.version, 7);
    assert_eq!(version.min, Some(6));

    let request = ipset.transport().single();
    assert_eq!(request.message_type, 0x0601);
    assert_eq!(request.attr_names(), ["PROTOCOL"]);

    Ok(())
}

#[tokio::test]
async fn test_protocol_without_reply() {
    let ipset = connection(MockTransport::new().reply(Reply::new(vec![ack()])));

    let err = ipset.protocol().await.unwrap_err();
    assert!(err.is_incomplete());
}

#[tokio::test]
async fn test_header_query() -> Result<()> {
    let msg = NfMessage::new(2)
        .attr(attr::PROTOCOL, 6u8)
        .attr(attr::SETNAME, "blacklist")
        .attr(attr::TYPENAME, "hash:ip")
        .attr(attr::REVISION, 4u8)
        .attr(attr::FAMILY, 2u8);
    let ipset = connection(
        MockTransport::new().reply(Reply::new(vec![ipset_frame(IpsetCmd::Header, &msg), ack()])),
    );

    let info = ipset.header("blacklist").await?;
    assert_eq!(info.name, "blacklist");
    assert_eq!(info.typename, "hash:ip");
    assert_eq!(info.revision, 4);
    assert!(info.members.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_type_query() -> Result<()> {
    let body = [
        0x02, 0x00, 0x00, 0x00, // nfgenmsg
        0x05, 0x00, 0x01, 0x00, 0x06, 0x00, 0x00, 0x00, // PROTOCOL = 6
        0x0c, 0x00, 0x03, 0x00, b'h', b'a', b's', b'h', b':', b'i', b'p', 0x00, // TYPENAME
        0x05, 0x00, 0x05, 0x00, 0x02, 0x00, 0x00, 0x00, // FAMILY = NFPROTO_IPV4
        0x05, 0x00, 0x04, 0x00, 0x06, 0x00, 0x00, 0x00, // REVISION = 6
        0x05, 0x00, 0x07, 0x00, 0x00, 0x00, 0x00, 0x00, // REVISION_MIN = 0
    ];
    let reply = frame(IpsetCmd::Type.message_type(), 0, &body);
    let ipset = connection(MockTransport::new().reply(Reply::new(vec![reply, ack()])));

    let set_type = ipset.get_type("hash:ip", Family::Inet).await?;
    assert_eq!(set_type.typename, "hash:ip");
    assert_eq!(set_type.family, Some(Family::Inet));
    assert_eq!(set_type.revision, 6);
    assert_eq!(set_type.revision_min, Some(0));

    let request = ipset.transport().single();
    assert_eq!(request.attr_names(), ["PROTOCOL", "TYPENAME", "FAMILY"]);

    Ok(())
}

#[tokio::test]
async fn test_transport_error_passes_through() {
    let failure = io::Error::new(io::ErrorKind::ConnectionReset, "peer went away");
    let ipset = connection(MockTransport::new().fail(Error::transport(failure)));

    let err = ipset.list(None).await.unwrap_err();
    assert!(matches!(err, Error::Transport(_)));
    assert!(err.to_string().contains("peer went away"));
}

#[cfg(feature = "serde")]
#[tokio::test]
async fn test_list_sets_serialize() -> Result<()> {
    let ipset = connection(MockTransport::new().reply(Reply::new(vec![list_frame(
        "blacklist",
        "hash:ip",
        &[Ipv4Addr::new(10, 0, 0, 1)],
    )])));

    let sets = ipset.list_sets().await?;
    let json = serde_json::to_value(&sets).unwrap();
    assert_eq!(json[0]["name"], "blacklist");
    assert_eq!(json[0]["typename"], "hash:ip");
    assert_eq!(json[0]["header"][0]["name"], "HASHSIZE");
    assert_eq!(json[0]["header"][0]["value"], 1024);
    assert_eq!(json[0]["members"][0][0]["value"], "10.0.0.1");

    Ok(())
}
