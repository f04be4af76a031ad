//! Netlink message fixtures for testing.
//!
//! Captured ipset replies, returned as complete frames (netlink header
//! included) in the layout the transport hands them over.

use super::message::{NLM_F_MULTI, NLMSG_HDRLEN, NlMsgHdr, nlmsg_align};

fn frame(msg_type: u16, flags: u16, payload: &[u8]) -> Vec<u8> {
    let mut hdr = NlMsgHdr::new(msg_type, flags);
    hdr.nlmsg_len = (NLMSG_HDRLEN + payload.len()) as u32;
    let mut buf = hdr.as_bytes().to_vec();
    buf.extend_from_slice(payload);
    buf.resize(nlmsg_align(buf.len()), 0);
    buf
}

/// List reply for a `hash:ip` set holding one address.
/// Captured from: ipset list blacklist
pub fn list_reply_blacklist() -> Vec<u8> {
    frame(
        0x0607, // IPSET_CMD_LIST | NFNL_SUBSYS_IPSET << 8
        NLM_F_MULTI,
        &[
            // nfgenmsg: family=NFPROTO_IPV4, version=0, res_id=0
            0x02, 0x00, 0x00, 0x00,
            // PROTOCOL = 6
            0x05, 0x00, 0x01, 0x00, 0x06, 0x00, 0x00, 0x00,
            // SETNAME = "blacklist"
            0x0e, 0x00, 0x02, 0x00,
            b'b', b'l', b'a', b'c', b'k', b'l', b'i', b's', b't', 0x00, 0x00, 0x00,
            // TYPENAME = "hash:ip"
            0x0c, 0x00, 0x03, 0x00,
            b'h', b'a', b's', b'h', b':', b'i', b'p', 0x00,
            // REVISION = 4
            0x05, 0x00, 0x04, 0x00, 0x04, 0x00, 0x00, 0x00,
            // FAMILY = NFPROTO_IPV4
            0x05, 0x00, 0x05, 0x00, 0x02, 0x00, 0x00, 0x00,
            // DATA (nested, len = 36)
            0x24, 0x00, 0x07, 0x80,
            0x08, 0x00, 0x12, 0x40, 0x00, 0x00, 0x04, 0x00, // HASHSIZE = 1024
            0x08, 0x00, 0x13, 0x40, 0x00, 0x01, 0x00, 0x00, // MAXELEM = 65536
            0x08, 0x00, 0x19, 0x40, 0x00, 0x00, 0x00, 0x00, // REFERENCES = 0
            0x08, 0x00, 0x1a, 0x40, 0x00, 0x00, 0x00, 0xc8, // MEMSIZE = 200
            // ADT (nested, len = 20)
            0x14, 0x00, 0x08, 0x80,
            // DATA (nested, len = 16)
            0x10, 0x00, 0x07, 0x80,
            // IP (nested, len = 12)
            0x0c, 0x00, 0x01, 0x80,
            0x08, 0x00, 0x01, 0x40, 0x0a, 0x00, 0x00, 0x01, // IPADDR_IPV4 = 10.0.0.1
        ],
    )
}

/// Protocol query reply: version 7, oldest accepted 6.
pub fn protocol_reply() -> Vec<u8> {
    frame(
        0x0601, // IPSET_CMD_PROTOCOL | NFNL_SUBSYS_IPSET << 8
        0,
        &[
            // nfgenmsg
            0x02, 0x00, 0x00, 0x00,
            // PROTOCOL = 7
            0x05, 0x00, 0x01, 0x00, 0x07, 0x00, 0x00, 0x00,
            // PROTOCOL_MIN = 6
            0x05, 0x00, 0x0a, 0x00, 0x06, 0x00, 0x00, 0x00,
        ],
    )
}
