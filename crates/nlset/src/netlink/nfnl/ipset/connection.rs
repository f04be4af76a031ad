//! ipset connection: request construction and reply decoding.

use tracing::{debug, trace};

use super::schema::{IPSET, attr};
use super::types::{CreateOptions, Family, IpsetEntry, IpsetInfo, ProtocolVersion, SetType};
use super::{IPSET_PROTOCOL, IpsetCmd, describe_error};
use crate::netlink::codec::AttrValue;
use crate::netlink::connection::{Connection, Reply, Transport};
use crate::netlink::error::{DecodeError, ProtocolError, Result, ValidationError, negate_errno};
use crate::netlink::message::{MessageIter, NlMsgError, NlMsgType};
use crate::netlink::nfnl::{NFNL_SUBSYS_IPSET, NfMessage, subsystem_of};

/// Connection for managing ipset sets.
///
/// Generic over the [`Transport`] so requests can be served by something
/// other than a kernel socket.
pub struct IpsetConnection<T = Connection> {
    transport: T,
}

impl IpsetConnection<Connection> {
    /// Open a netfilter socket for ipset.
    pub fn new() -> Result<Self> {
        Ok(Self::from_transport(Connection::new()?))
    }
}

impl<T: Transport> IpsetConnection<T> {
    /// Use an existing transport.
    pub fn from_transport(transport: T) -> Self {
        Self { transport }
    }

    /// Get the underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Validate, encode and send a request, then decode its replies.
    ///
    /// Nothing is sent if the message lacks an attribute the command
    /// requires or does not encode.
    pub async fn execute(&self, cmd: IpsetCmd, message: &NfMessage) -> Result<Vec<NfMessage>> {
        validate(cmd, message)?;
        let body = message.to_bytes(&IPSET)?;

        debug!(
            command = cmd.name(),
            msg_type = cmd.message_type(),
            flags = cmd.flags(),
            len = body.len(),
            "dispatching ipset request"
        );
        let reply = self
            .transport
            .request(&body, cmd.message_type(), cmd.flags())
            .await?;
        debug!(
            command = cmd.name(),
            frames = reply.frames.len(),
            complete = reply.complete,
            "received ipset reply"
        );

        decode_replies(cmd, &reply)
    }

    /// Query the kernel's protocol version.
    pub async fn protocol(&self) -> Result<ProtocolVersion> {
        let replies = self.execute(IpsetCmd::Protocol, &base()).await?;
        replies
            .iter()
            .find_map(ProtocolVersion::from_message)
            .ok_or_else(|| ProtocolError::Incomplete.into())
    }

    /// List all sets, or the named one, as raw messages in kernel order.
    pub async fn list(&self, name: Option<&str>) -> Result<Vec<NfMessage>> {
        self.execute(IpsetCmd::List, &named(name)).await
    }

    /// List all sets.
    pub async fn list_sets(&self) -> Result<Vec<IpsetInfo>> {
        Ok(IpsetInfo::from_messages(&self.list(None).await?))
    }

    /// List one set with its members.
    pub async fn list_set(&self, name: &str) -> Result<Option<IpsetInfo>> {
        let messages = self.list(Some(name)).await?;
        Ok(IpsetInfo::from_messages(&messages).into_iter().next())
    }

    /// Dump all sets, or the named one, in save form.
    pub async fn save(&self, name: Option<&str>) -> Result<Vec<NfMessage>> {
        self.execute(IpsetCmd::Save, &named(name)).await
    }

    /// Create a set.
    pub async fn create(&self, name: &str, options: CreateOptions) -> Result<()> {
        let mut msg = base().attr(attr::SETNAME, name);
        msg.attrs.extend(options.to_attrs());
        self.execute(IpsetCmd::Create, &msg).await?;
        Ok(())
    }

    /// Destroy the named set, or every set not referenced by the kernel.
    pub async fn destroy(&self, name: Option<&str>) -> Result<()> {
        self.execute(IpsetCmd::Destroy, &named(name)).await?;
        Ok(())
    }

    /// Remove all members of the named set, or of every set.
    pub async fn flush(&self, name: Option<&str>) -> Result<()> {
        self.execute(IpsetCmd::Flush, &named(name)).await?;
        Ok(())
    }

    /// Rename a set.
    pub async fn rename(&self, from: &str, to: &str) -> Result<()> {
        self.execute(IpsetCmd::Rename, &pair(from, to)).await?;
        Ok(())
    }

    /// Exchange the contents of two sets.
    pub async fn swap(&self, first: &str, second: &str) -> Result<()> {
        self.execute(IpsetCmd::Swap, &pair(first, second)).await?;
        Ok(())
    }

    /// Add a member.
    pub async fn add(&self, name: &str, entry: IpsetEntry) -> Result<()> {
        self.execute(IpsetCmd::Add, &element(name, &entry)).await?;
        Ok(())
    }

    /// Delete a member.
    pub async fn del(&self, name: &str, entry: IpsetEntry) -> Result<()> {
        self.execute(IpsetCmd::Del, &element(name, &entry)).await?;
        Ok(())
    }

    /// Test membership.
    ///
    /// The kernel reports absence as `IPSET_ERR_EXIST`; that maps to
    /// `Ok(false)`, every other error is returned.
    pub async fn test(&self, name: &str, entry: IpsetEntry) -> Result<bool> {
        match self.execute(IpsetCmd::Test, &element(name, &entry)).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_element_exists() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Get the header of a set: type, revision and family.
    pub async fn header(&self, name: &str) -> Result<IpsetInfo> {
        let msg = base().attr(attr::SETNAME, name);
        let replies = self.execute(IpsetCmd::Header, &msg).await?;
        IpsetInfo::from_messages(&replies)
            .into_iter()
            .next()
            .ok_or_else(|| ProtocolError::Incomplete.into())
    }

    /// Query the revisions the kernel supports for a set type.
    pub async fn get_type(&self, typename: &str, family: Family) -> Result<SetType> {
        let msg = base()
            .attr(attr::TYPENAME, typename)
            .attr(attr::FAMILY, family.as_u8());
        let replies = self.execute(IpsetCmd::Type, &msg).await?;
        replies
            .iter()
            .find_map(SetType::from_message)
            .ok_or_else(|| ProtocolError::Incomplete.into())
    }
}

fn base() -> NfMessage {
    NfMessage::new(Family::Inet.as_u8()).attr(attr::PROTOCOL, IPSET_PROTOCOL)
}

fn named(name: Option<&str>) -> NfMessage {
    let msg = base();
    match name {
        Some(name) => msg.attr(attr::SETNAME, name),
        None => msg,
    }
}

fn pair(first: &str, second: &str) -> NfMessage {
    base()
        .attr(attr::SETNAME, first)
        .attr(attr::SETNAME2, second)
}

fn element(name: &str, entry: &IpsetEntry) -> NfMessage {
    base()
        .attr(attr::SETNAME, name)
        .attr(attr::DATA, entry.to_attrs())
}

/// Check that every attribute `cmd` requires is present and non-empty.
pub fn validate(cmd: IpsetCmd, message: &NfMessage) -> Result<()> {
    for &name in cmd.required() {
        match message.get(name) {
            None => {}
            Some(AttrValue::Str(s)) if s.is_empty() => {}
            Some(_) => continue,
        }
        return Err(ValidationError::MissingAttribute {
            command: cmd.name(),
            name,
        }
        .into());
    }
    Ok(())
}

/// Decode the reply frames of one request.
///
/// Acks are skipped, a kernel error frame (or a done frame carrying an
/// errno) becomes [`ProtocolError::Kernel`], an interrupted or unfinished
/// sequence becomes [`ProtocolError::Incomplete`], and every other frame
/// must be an ipset message, decoded against the command's reply schema.
/// Non-dump commands must end with an ack or error frame.
pub fn decode_replies(cmd: IpsetCmd, reply: &Reply) -> Result<Vec<NfMessage>> {
    let schema = cmd.reply_schema();
    let mut messages = Vec::with_capacity(reply.frames.len());
    let mut acked = false;

    'frames: for frame in &reply.frames {
        for raw in MessageIter::new(frame) {
            let raw = raw?;
            let header = raw.header;
            trace!(
                command = cmd.name(),
                msg_type = header.nlmsg_type,
                flags = header.nlmsg_flags,
                len = header.nlmsg_len,
                "decoding frame"
            );

            if header.is_dump_interrupted() {
                return Err(ProtocolError::Incomplete.into());
            }

            match header.nlmsg_type {
                NlMsgType::ERROR => {
                    let err = NlMsgError::from_bytes(raw.payload())?;
                    if err.is_ack() {
                        acked = true;
                        continue;
                    }
                    let err = kernel_error(err.error)?;
                    debug!(command = cmd.name(), error = %err, "kernel rejected ipset request");
                    return Err(err.into());
                }
                NlMsgType::DONE => {
                    let done = NlMsgError::from_done(raw.payload())?;
                    if !done.is_ack() {
                        let err = kernel_error(done.error)?;
                        debug!(command = cmd.name(), error = %err, "ipset dump failed");
                        return Err(err.into());
                    }
                    break 'frames;
                }
                NlMsgType::NOOP => continue,
                NlMsgType::OVERRUN => return Err(ProtocolError::Incomplete.into()),
                msg_type if subsystem_of(msg_type) != NFNL_SUBSYS_IPSET => {
                    return Err(DecodeError::UnexpectedMessage { msg_type }.into());
                }
                _ => messages.push(NfMessage::from_bytes(raw.payload(), schema)?),
            }
        }
    }

    if !reply.complete || (!cmd.is_dump() && !acked) {
        return Err(ProtocolError::Incomplete.into());
    }
    Ok(messages)
}

fn kernel_error(errno: i32) -> Result<ProtocolError> {
    let code = negate_errno(errno)?;
    Ok(match describe_error(code) {
        Some(message) => ProtocolError::Kernel {
            code,
            message: message.to_string(),
        },
        None => ProtocolError::from_errno(errno)?,
    })
}
