//! nfnetlink subsystem header.

use winnow::binary::{be_u16, le_u8};
use winnow::error::{ContextError, ErrMode};

use super::NFNETLINK_V0;
use crate::netlink::error::{DecodeError, Result};

type PResult<T> = std::result::Result<T, ErrMode<ContextError>>;

/// Size of the nfgenmsg header in bytes.
pub const NFGEN_HDRLEN: usize = 4;

/// nfgenmsg header.
///
/// `res_id` is big-endian on the wire; the other fields are single bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NfGenMsg {
    /// Address family (`NFPROTO_*`), or 0 for unspecified.
    pub family: u8,
    /// nfnetlink version, [`NFNETLINK_V0`].
    pub version: u8,
    /// Resource id, subsystem-defined.
    pub res_id: u16,
}

impl NfGenMsg {
    /// Create a header for the given family with version 0.
    #[inline]
    pub const fn new(family: u8) -> Self {
        Self {
            family,
            version: NFNETLINK_V0,
            res_id: 0,
        }
    }

    /// Parse the header, advancing `input` past it.
    pub fn parse(input: &mut &[u8]) -> PResult<Self> {
        let family = le_u8::<_, ErrMode<ContextError>>(input)?;
        let version = le_u8::<_, ErrMode<ContextError>>(input)?;
        let res_id = be_u16::<_, ErrMode<ContextError>>(input)?;
        Ok(Self {
            family,
            version,
            res_id,
        })
    }

    /// Parse the header from the start of `data`.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let mut input = data;
        Self::parse(&mut input).map_err(|_| {
            DecodeError::Truncated {
                expected: NFGEN_HDRLEN,
                actual: data.len(),
            }
            .into()
        })
    }

    /// Serialize the header.
    pub fn to_bytes(&self) -> [u8; NFGEN_HDRLEN] {
        let [hi, lo] = self.res_id.to_be_bytes();
        [self.family, self.version, hi, lo]
    }
}
