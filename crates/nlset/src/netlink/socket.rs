//! Low-level async netfilter netlink socket.

use std::os::unix::io::{AsRawFd, RawFd};
use std::sync::atomic::{AtomicU32, Ordering};

use bytes::BytesMut;
use netlink_sys::{Socket, SocketAddr, protocols};
use tokio::io::Interest;
use tokio::io::unix::AsyncFd;
use tracing::trace;

use super::error::{DecodeError, Result};

/// Receive buffer size used unless configured otherwise.
pub const DEFAULT_RECV_BUFFER: usize = 32768;

/// Async `NETLINK_NETFILTER` socket.
pub struct NetlinkSocket {
    /// The underlying async file descriptor.
    fd: AsyncFd<Socket>,
    /// Sequence number counter.
    seq: AtomicU32,
    /// Local port ID (assigned by kernel).
    pid: u32,
    /// Bytes reserved per receive call.
    recv_buffer: usize,
}

impl NetlinkSocket {
    /// Open a netfilter socket with the default receive buffer.
    pub fn new() -> Result<Self> {
        Self::with_recv_buffer(DEFAULT_RECV_BUFFER)
    }

    /// Open a netfilter socket that reads up to `size` bytes per receive.
    ///
    /// Dumps of large sets arrive in datagrams of up to a page or more. A
    /// datagram larger than the buffer fails the receive with
    /// [`DecodeError::DatagramTruncated`] instead of being cut short.
    pub fn with_recv_buffer(size: usize) -> Result<Self> {
        let mut socket = Socket::new(protocols::NETLINK_NETFILTER)?;
        socket.set_non_blocking(true)?;

        // Bind to get a port ID
        let mut addr = SocketAddr::new(0, 0);
        socket.bind(&addr)?;
        socket.get_address(&mut addr)?;
        let pid = addr.port_number();

        // Extended ACK is optional
        socket.set_ext_ack(true).ok();

        let fd = AsyncFd::new(socket)?;
        trace!(pid, recv_buffer = size, "opened netfilter socket");

        Ok(Self {
            fd,
            seq: AtomicU32::new(1),
            pid,
            recv_buffer: size,
        })
    }

    /// Get the next sequence number.
    pub fn next_seq(&self) -> u32 {
        self.seq.fetch_add(1, Ordering::Relaxed)
    }

    /// Get the local port ID.
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Send a message.
    pub async fn send(&self, msg: &[u8]) -> Result<()> {
        loop {
            let mut guard = self.fd.ready(Interest::WRITABLE).await?;

            match guard.try_io(|inner| inner.get_ref().send(msg, 0)) {
                Ok(result) => {
                    result?;
                    return Ok(());
                }
                Err(_would_block) => continue,
            }
        }
    }

    /// Receive one datagram.
    pub async fn recv_msg(&self) -> Result<Vec<u8>> {
        let mut buf = BytesMut::with_capacity(self.recv_buffer);

        loop {
            let mut guard = self.fd.ready(Interest::READABLE).await?;

            // MSG_TRUNC makes recv report the full datagram length
            match guard.try_io(|inner| inner.get_ref().recv(&mut buf, libc::MSG_TRUNC)) {
                Ok(result) => {
                    check_datagram(result?, self.recv_buffer)?;
                    return Ok(buf.to_vec());
                }
                Err(_would_block) => continue,
            }
        }
    }
}

impl AsRawFd for NetlinkSocket {
    fn as_raw_fd(&self) -> RawFd {
        self.fd.get_ref().as_raw_fd()
    }
}

fn check_datagram(len: usize, capacity: usize) -> Result<()> {
    if len > capacity {
        return Err(DecodeError::DatagramTruncated { len, capacity }.into());
    }
    Ok(())
}
