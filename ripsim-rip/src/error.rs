//
// Copyright (c) The RipSim Core Contributors
//
// SPDX-License-Identifier: MIT
//

use tracing::{error, warn};

use crate::packet::DecodeError;
use crate::route::RouterId;

// Router errors.
#[derive(Debug)]
pub enum Error {
    IoError(IoError),
    UdpPduDecodeError(DecodeError),
    UdpUnknownNeighbor(RouterId),
}

// Router I/O errors.
#[derive(Debug)]
pub enum IoError {
    UdpSocketError(std::io::Error),
    UdpRecvError(std::io::Error),
    UdpSendError(std::io::Error),
    LogIoError(std::io::Error),
}

// Metric errors.
#[derive(Debug)]
pub enum MetricError {
    InvalidValue,
}

// ===== impl Error =====

impl Error {
    pub(crate) fn log(&self) {
        match self {
            Error::IoError(error) => {
                error.log();
            }
            Error::UdpPduDecodeError(error) => {
                warn!(%error, "{}", self);
            }
            Error::UdpUnknownNeighbor(src) => {
                warn!(source = %src, "{}", self);
            }
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::IoError(error) => error.fmt(f),
            Error::UdpPduDecodeError(..) => {
                write!(f, "failed to decode PDU")
            }
            Error::UdpUnknownNeighbor(..) => {
                write!(f, "update from unknown neighbor")
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IoError(error) => Some(error),
            Error::UdpPduDecodeError(error) => Some(error),
            _ => None,
        }
    }
}

impl From<IoError> for Error {
    fn from(error: IoError) -> Error {
        Error::IoError(error)
    }
}

// ===== impl IoError =====

impl IoError {
    pub(crate) fn log(&self) {
        match self {
            IoError::UdpSocketError(error) => {
                error!(error = %with_source(error), "{}", self);
            }
            IoError::UdpRecvError(error)
            | IoError::UdpSendError(error)
            | IoError::LogIoError(error) => {
                warn!(error = %with_source(error), "{}", self);
            }
        }
    }
}

impl std::fmt::Display for IoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IoError::UdpSocketError(..) => {
                write!(f, "failed to create UDP socket")
            }
            IoError::UdpRecvError(..) => {
                write!(f, "failed to receive UDP packet")
            }
            IoError::UdpSendError(..) => {
                write!(f, "failed to send UDP packet")
            }
            IoError::LogIoError(..) => {
                write!(f, "failed to write routing table log")
            }
        }
    }
}

impl std::error::Error for IoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            IoError::UdpSocketError(error)
            | IoError::UdpRecvError(error)
            | IoError::UdpSendError(error)
            | IoError::LogIoError(error) => Some(error),
        }
    }
}

// ===== impl MetricError =====

impl std::fmt::Display for MetricError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetricError::InvalidValue => {
                write!(f, "invalid metric")
            }
        }
    }
}

impl std::error::Error for MetricError {}

// ===== global functions =====

fn with_source<E: std::error::Error>(error: E) -> String {
    if let Some(source) = error.source() {
        format!("{} ({})", error, with_source(source))
    } else {
        error.to_string()
    }
}
