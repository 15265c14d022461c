//
// Copyright (c) The RipSim Core Contributors
//
// SPDX-License-Identifier: MIT
//

use bytes::{Buf, BufMut, Bytes, BytesMut};
use derive_new::new;
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use serde::{Deserialize, Serialize};

use crate::route::{Metric, RouterId};

//
// The packet format is:
//
//  0                   1                   2                   3
//  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |  command (1)  |  version (1)  |      source router (2)        |
// +---------------+---------------+-------------------------------+
// |                                                               |
// ~                         Route Entry (20)                      ~
// |                                                               |
// +---------------+---------------+---------------+---------------+
//
// The protocol's must-be-zero header field carries the sending router's id,
// which is how receivers identify the neighbor an update came from.
//
#[derive(Clone, Copy, Debug, Eq, FromPrimitive, PartialEq)]
#[derive(Deserialize, Serialize)]
pub enum Command {
    Response = 2,
}

#[derive(Clone, Debug, Deserialize, Eq, new, PartialEq, Serialize)]
pub struct Pdu {
    // PDU command.
    pub command: Command,
    // PDU version.
    #[new(value = "Pdu::VERSION")]
    pub version: u8,
    // Sending router id.
    pub src: RouterId,
    // List of RTEs.
    pub rtes: Vec<Rte>,
    // List of RTEs that failed to be decoded.
    #[new(default)]
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rte_errors: Vec<DecodeError>,
}

//
// The format of a 20-octet route table entry (RTE) is:
//
//  0                   1                   2                   3
//  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// | Address Family Identifier (2) |        Route Tag (2)          |
// +-------------------------------+-------------------------------+
// |                      Router Address (4)                       |
// +---------------------------------------------------------------+
// |                         Subnet Mask (4)                       |
// +---------------------------------------------------------------+
// |                         Next Hop (4)                          |
// +---------------------------------------------------------------+
// |                         Metric (4)                            |
// +---------------------------------------------------------------+
//
// Addresses and next hops are symbolic router ids. The route tag and subnet
// mask are carried as zero.
//
#[derive(Clone, Debug, Deserialize, Eq, new, PartialEq, Serialize)]
pub struct Rte {
    #[new(value = "Rte::AFI")]
    pub afi: u16,
    #[new(default)]
    pub tag: u16,
    pub addr: RouterId,
    #[new(default)]
    pub mask: u32,
    pub next_hop: RouterId,
    pub metric: Metric,
}

// PDU decode errors.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum DecodeError {
    InvalidLength(usize),
    InvalidCommand(u8),
    InvalidVersion(u8),
    InvalidRteAddressFamily(u16),
    InvalidRteAddress(u32),
    InvalidRteNexthop(u32),
    InvalidRteMetric(u32),
}

// Type aliases.
pub type DecodeResult<T> = Result<T, DecodeError>;

// ===== impl Pdu =====

impl Pdu {
    pub const VERSION: u8 = 2;
    pub const HDR_LENGTH: usize = 4;
    // Received datagrams are capped at 1024 bytes.
    pub const MAX_ENTRIES: usize = (1024 - Self::HDR_LENGTH) / Rte::LENGTH;

    // Encode PDU into a bytes buffer.
    pub fn encode(&self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(
            Self::HDR_LENGTH + self.rtes.len() * Rte::LENGTH,
        );

        // Encode PDU header.
        buf.put_u8(self.command as u8);
        buf.put_u8(self.version);
        buf.put_u16(self.src);

        // Encode RTEs.
        for rte in &self.rtes {
            rte.encode(&mut buf);
        }

        buf
    }

    // Decode PDU from a bytes buffer.
    pub fn decode(data: &[u8]) -> DecodeResult<Pdu> {
        let mut buf = Bytes::copy_from_slice(data);

        // Validate the packet length.
        let buf_size = data.len();
        if buf_size < Self::HDR_LENGTH
            || (buf_size - Self::HDR_LENGTH) % Rte::LENGTH != 0
        {
            return Err(DecodeError::InvalidLength(buf_size));
        }

        // Parse and validate the command.
        let command = buf.get_u8();
        let command = Command::from_u8(command)
            .ok_or(DecodeError::InvalidCommand(command))?;

        // Parse and validate the version.
        let version = buf.get_u8();
        if version < Self::VERSION {
            return Err(DecodeError::InvalidVersion(version));
        }

        // Parse the sending router id.
        let src = buf.get_u16();

        // Decode RTEs. Entries that fail validation are collected separately
        // so one bad entry doesn't discard the rest of the datagram.
        let mut rtes = vec![];
        let mut rte_errors = vec![];
        while buf.remaining() >= Rte::LENGTH {
            match Rte::decode(&mut buf, src) {
                Ok(rte) => rtes.push(rte),
                Err(error) => rte_errors.push(error),
            }
        }

        Ok(Pdu {
            command,
            version,
            src,
            rtes,
            rte_errors,
        })
    }
}

// ===== impl Rte =====

impl Rte {
    pub const LENGTH: usize = 20;
    pub const AFI: u16 = 2;

    pub(crate) fn encode(&self, buf: &mut BytesMut) {
        buf.put_u16(self.afi);
        buf.put_u16(self.tag);
        buf.put_u32(self.addr.into());
        buf.put_u32(self.mask);
        buf.put_u32(self.next_hop.into());
        buf.put_u32(self.metric.get().into());
    }

    // Decode one RTE, resolving a zero next hop to the sending router.
    //
    // The cursor always advances by the full entry length, keeping the
    // remaining entries aligned even when this one is invalid.
    pub(crate) fn decode(buf: &mut Bytes, src: RouterId) -> DecodeResult<Self> {
        let afi = buf.get_u16();
        let tag = buf.get_u16();
        let addr = buf.get_u32();
        let mask = buf.get_u32();
        let next_hop = buf.get_u32();
        let metric = buf.get_u32();

        // Validate address family.
        if afi != Self::AFI {
            return Err(DecodeError::InvalidRteAddressFamily(afi));
        }

        // Validate the router address.
        let addr = RouterId::try_from(addr)
            .map_err(|_| DecodeError::InvalidRteAddress(addr))?;

        // Validate the next hop.
        let next_hop = match next_hop {
            0 => src,
            next_hop => RouterId::try_from(next_hop)
                .map_err(|_| DecodeError::InvalidRteNexthop(next_hop))?,
        };

        // Validate the metric.
        let metric = Metric::new(metric)
            .map_err(|_| DecodeError::InvalidRteMetric(metric))?;

        Ok(Rte {
            afi,
            tag,
            addr,
            mask,
            next_hop,
            metric,
        })
    }
}

// ===== impl DecodeError =====

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeError::InvalidLength(length) => {
                write!(f, "Invalid Length: {}", length)
            }
            DecodeError::InvalidCommand(command) => {
                write!(f, "Invalid command: {}", command)
            }
            DecodeError::InvalidVersion(version) => {
                write!(f, "Invalid version: {}", version)
            }
            DecodeError::InvalidRteAddressFamily(afi) => {
                write!(f, "Invalid address-family: {}", afi)
            }
            DecodeError::InvalidRteAddress(addr) => {
                write!(f, "Invalid RTE address: {}", addr)
            }
            DecodeError::InvalidRteNexthop(next_hop) => {
                write!(f, "Invalid RTE nexthop: {}", next_hop)
            }
            DecodeError::InvalidRteMetric(metric) => {
                write!(f, "Invalid RTE metric: {}", metric)
            }
        }
    }
}

impl std::error::Error for DecodeError {}
