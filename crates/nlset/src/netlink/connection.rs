//! Request/reply exchange over netlink.
//!
//! The command layer talks to the kernel through [`Transport`]: hand over a
//! message body with its netlink type and flags, get back every reply frame
//! for that request. [`Connection`] is the socket-backed implementation.

use std::future::Future;

use tracing::trace;

use super::builder::MessageBuilder;
use super::error::Result;
use super::message::{MessageIter, NLM_F_ACK, NLM_F_DUMP, NlMsgError, NlMsgType};
use super::socket::NetlinkSocket;

/// Reply frames of one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reply {
    /// Complete netlink messages (header included) in arrival order,
    /// including error/ack frames. The `NLMSG_DONE` marker is included only
    /// when it carries an errno.
    pub frames: Vec<Vec<u8>>,
    /// False if the sequence ended before its end marker, or the end
    /// marker was flagged as interrupted.
    pub complete: bool,
}

impl Reply {
    /// A finished reply.
    pub fn new(frames: Vec<Vec<u8>>) -> Self {
        Self {
            frames,
            complete: true,
        }
    }

    /// A reply that was cut short.
    pub fn incomplete(frames: Vec<Vec<u8>>) -> Self {
        Self {
            frames,
            complete: false,
        }
    }
}

/// Sends one request and collects its replies.
pub trait Transport {
    /// Frame `message` with a netlink header of the given type and flags,
    /// send it, and return every reply frame belonging to it.
    ///
    /// Returns once the kernel has finished: on `NLMSG_DONE` for dumps, on
    /// the ack or error frame when `NLM_F_ACK` is set, and after the first
    /// reply otherwise.
    fn request(
        &self,
        message: &[u8],
        message_type: u16,
        flags: u16,
    ) -> impl Future<Output = Result<Reply>> + Send;
}

/// Socket-backed transport.
pub struct Connection {
    socket: NetlinkSocket,
}

impl Connection {
    /// Open a netfilter connection.
    pub fn new() -> Result<Self> {
        Ok(Self {
            socket: NetlinkSocket::new()?,
        })
    }

    /// Open a netfilter connection with a custom receive buffer size.
    pub fn with_recv_buffer(size: usize) -> Result<Self> {
        Ok(Self {
            socket: NetlinkSocket::with_recv_buffer(size)?,
        })
    }

    /// Get the underlying socket.
    pub fn socket(&self) -> &NetlinkSocket {
        &self.socket
    }
}

impl Transport for Connection {
    async fn request(&self, message: &[u8], message_type: u16, flags: u16) -> Result<Reply> {
        let seq = self.socket.next_seq();
        let mut builder = MessageBuilder::new(message_type, flags);
        builder.append_bytes(message);
        builder.set_seq(seq);
        builder.set_pid(self.socket.pid());

        let msg = builder.finish();
        self.socket.send(&msg).await?;

        let mut collector = ReplyCollector::new(seq, flags);
        loop {
            let data = self.socket.recv_msg().await?;
            if let Some(reply) = collector.feed(&data)? {
                return Ok(reply);
            }
        }
    }
}

/// Gathers the frames of one request across datagrams.
struct ReplyCollector {
    seq: u32,
    dump: bool,
    ack: bool,
    frames: Vec<Vec<u8>>,
}

impl ReplyCollector {
    fn new(seq: u32, flags: u16) -> Self {
        Self {
            seq,
            dump: flags & NLM_F_DUMP == NLM_F_DUMP,
            ack: flags & NLM_F_ACK != 0,
            frames: Vec::new(),
        }
    }

    /// Feed one datagram. Returns the reply once the request is finished.
    fn feed(&mut self, data: &[u8]) -> Result<Option<Reply>> {
        for result in MessageIter::new(data) {
            let msg = result?;
            let header = msg.header;

            if header.nlmsg_seq != self.seq {
                trace!(seq = header.nlmsg_seq, expected = self.seq, "skipping foreign frame");
                continue;
            }

            trace!(
                msg_type = header.nlmsg_type,
                flags = header.nlmsg_flags,
                len = header.nlmsg_len,
                "received frame"
            );

            match header.nlmsg_type {
                NlMsgType::DONE => {
                    let mut frames = std::mem::take(&mut self.frames);
                    if header.is_dump_interrupted() {
                        return Ok(Some(Reply::incomplete(frames)));
                    }
                    if !NlMsgError::from_done(msg.payload())?.is_ack() {
                        frames.push(msg.bytes.to_vec());
                    }
                    return Ok(Some(Reply::new(frames)));
                }
                NlMsgType::NOOP => continue,
                NlMsgType::ERROR => {
                    self.frames.push(msg.bytes.to_vec());
                    return Ok(Some(Reply::new(std::mem::take(&mut self.frames))));
                }
                _ => self.frames.push(msg.bytes.to_vec()),
            }

            if !self.dump && !self.ack {
                return Ok(Some(Reply::new(std::mem::take(&mut self.frames))));
            }
        }
        Ok(None)
    }
}
