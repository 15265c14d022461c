//
// Copyright (c) The RipSim Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::time::{Duration, Instant};

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::error::MetricError;
use crate::packet::Rte;

// Simulated routers are identified by small integers rather than IP
// addresses. The id also fits the header's 16-bit source field.
pub type RouterId = u16;

#[derive(Clone, Debug)]
pub struct Route {
    pub dest: RouterId,
    pub nexthop: RouterId,
    pub metric: Metric,
    pub flags: RouteFlags,
    // Last refresh time or, once poisoned, the time the route entered the
    // garbage state. Imported routes never age.
    pub refreshed_at: Option<Instant>,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Metric(u8);

bitflags! {
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    pub struct RouteFlags: u8 {
        const CHANGED = 0x01;
        const IMPORTED = 0x02;
        const GARBAGE = 0x04;
    }
}

// ===== impl Route =====

impl Route {
    // Route learned from a neighbor's update.
    pub(crate) fn new(dest: RouterId, nexthop: RouterId, metric: Metric) -> Route {
        Route {
            dest,
            nexthop,
            metric,
            flags: RouteFlags::CHANGED,
            refreshed_at: Some(Instant::now()),
        }
    }

    // The router's own entry, exempt from aging and deletion.
    pub(crate) fn new_imported(dest: RouterId) -> Route {
        Route {
            dest,
            nexthop: 0,
            metric: Metric::from(0),
            flags: RouteFlags::IMPORTED,
            refreshed_at: None,
        }
    }

    pub fn is_imported(&self) -> bool {
        self.flags.contains(RouteFlags::IMPORTED)
    }

    pub fn is_garbage(&self) -> bool {
        self.flags.contains(RouteFlags::GARBAGE)
    }

    pub fn is_changed(&self) -> bool {
        self.flags.contains(RouteFlags::CHANGED)
    }

    // Time since the last refresh (or since poisoning).
    pub(crate) fn age(&self, now: Instant) -> Option<Duration> {
        self.refreshed_at
            .map(|refreshed_at| now.saturating_duration_since(refreshed_at))
    }

    // Wire representation of this route.
    pub fn as_rte(&self) -> Rte {
        Rte::new(self.dest, self.nexthop, self.metric)
    }
}

// ===== impl Metric =====

impl Metric {
    pub const INFINITE: u8 = 16;

    pub fn new(metric: impl TryInto<u8>) -> Result<Self, MetricError> {
        match metric.try_into() {
            Ok(metric) if metric <= Self::INFINITE => Ok(Metric(metric)),
            _ => Err(MetricError::InvalidValue),
        }
    }

    pub fn get(&self) -> u8 {
        self.0
    }

    // Adds the cost of the link the update arrived on, saturating at
    // infinity.
    pub fn add(&mut self, metric: Metric) {
        self.0 = std::cmp::min(self.0 + metric.0, Self::INFINITE);
    }

    pub fn set_infinite(&mut self) {
        self.0 = Self::INFINITE
    }

    pub fn is_infinite(&self) -> bool {
        self.0 == Self::INFINITE
    }
}

impl From<u8> for Metric {
    // This function panics on error. It should only be used when the metric
    // has already been previously validated.
    fn from(metric: u8) -> Metric {
        Metric::new(metric).expect("Invalid metric value")
    }
}
