//
// Copyright (c) The RipSim Core Contributors
//
// SPDX-License-Identifier: MIT
//

use tracing::{debug, debug_span};

use crate::packet::{DecodeError, Pdu};
use crate::route::{Metric, RouterId};

// Router debug messages.
#[derive(Debug)]
pub enum Debug<'a> {
    InstanceStart,
    InstanceStop,
    UpdateInterval,
    TriggeredUpdate,
    PduRx(&'a Result<Pdu, DecodeError>),
    PduTx(RouterId, &'a Pdu),
    RouteCreate(RouterId, RouterId, &'a Metric),
    RouteUpdate(RouterId, RouterId, &'a Metric),
    RouteInvalidate(RouterId),
    RouteTimeout(RouterId),
    RouteGcTimeout(RouterId),
}

// ===== impl Debug =====

impl Debug<'_> {
    // Log debug message using the tracing API.
    pub(crate) fn log(&self) {
        match self {
            Debug::InstanceStart | Debug::InstanceStop => {
                // Parent span(s): router
                debug!("{}", self);
            }
            Debug::UpdateInterval | Debug::TriggeredUpdate => {
                // Parent span(s): router
                debug!("{}", self);
            }
            Debug::PduRx(pdu) => {
                // Parent span(s): router
                debug_span!("network").in_scope(|| {
                    debug_span!("input").in_scope(|| {
                        let data = serde_json::to_string(&pdu).unwrap();
                        debug!(%data, "{}", self);
                    });
                });
            }
            Debug::PduTx(neighbor, pdu) => {
                // Parent span(s): router
                debug_span!("network").in_scope(|| {
                    debug_span!("output", %neighbor).in_scope(|| {
                        let data = serde_json::to_string(&pdu).unwrap();
                        debug!(%data, "{}", self);
                    });
                });
            }
            Debug::RouteCreate(dest, nexthop, metric)
            | Debug::RouteUpdate(dest, nexthop, metric) => {
                // Parent span(s): router
                debug!(%dest, %nexthop, metric = %metric.get(), "{}", self);
            }
            Debug::RouteInvalidate(dest)
            | Debug::RouteTimeout(dest)
            | Debug::RouteGcTimeout(dest) => {
                // Parent span(s): router
                debug!(%dest, "{}", self);
            }
        }
    }
}

impl std::fmt::Display for Debug<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Debug::InstanceStart => {
                write!(f, "starting instance")
            }
            Debug::InstanceStop => {
                write!(f, "stopping instance")
            }
            Debug::UpdateInterval => {
                write!(f, "update interval")
            }
            Debug::TriggeredUpdate => {
                write!(f, "triggered update")
            }
            Debug::PduRx(..) | Debug::PduTx(..) => {
                write!(f, "pdu")
            }
            Debug::RouteCreate(..) => {
                write!(f, "route created")
            }
            Debug::RouteUpdate(..) => {
                write!(f, "route updated")
            }
            Debug::RouteInvalidate(..) => {
                write!(f, "route invalidated")
            }
            Debug::RouteTimeout(..) => {
                write!(f, "route timed out")
            }
            Debug::RouteGcTimeout(..) => {
                write!(f, "route deleted")
            }
        }
    }
}
