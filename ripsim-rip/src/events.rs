//
// Copyright (c) The RipSim Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use crate::debug::Debug;
use crate::error::Error;
use crate::instance::Output;
use crate::packet::Pdu;
use crate::route::RouterId;
use crate::table::RoutingTable;

// ===== UDP packet receipt =====

// Applies the distance-vector update rules for one received datagram.
//
// The caller is responsible for reacting to the table-level change flag
// (snapshot logging and triggered-update scheduling).
pub(crate) fn update_routing_table(
    table: &mut RoutingTable,
    outputs: &BTreeMap<RouterId, Output>,
    pdu: &Pdu,
) {
    // The sender must be a configured neighbor, otherwise there is no link
    // cost to apply to its advertisements.
    let Some(output) = outputs.get(&pdu.src) else {
        Error::UdpUnknownNeighbor(pdu.src).log();
        return;
    };

    for rte in &pdu.rtes {
        // Ignore the sender's copy of this router's own entry.
        if rte.addr == table.router_id() {
            continue;
        }

        // Advertised routes are reached through their sender, at the
        // advertised metric plus the cost of the link it arrived on.
        let nexthop = pdu.src;
        let mut metric = rte.metric;
        metric.add(output.cost);

        let current = table
            .get(rte.addr)
            .map(|route| (route.nexthop, route.metric, route.is_garbage()));
        match current {
            Some((cur_nexthop, cur_metric, cur_garbage)) => {
                if nexthop == cur_nexthop {
                    // Update from the current next hop.
                    if metric.is_infinite() && cur_metric != metric {
                        // The route became unreachable.
                        Debug::RouteInvalidate(rte.addr).log();
                        table.poison(rte.addr);
                    } else if metric != cur_metric {
                        Debug::RouteUpdate(rte.addr, nexthop, &metric).log();
                        table.update(rte.addr, nexthop, metric);
                    } else if !cur_garbage {
                        // Nothing changed, restart the aging timer.
                        table.refresh(rte.addr);
                    }
                } else if metric.get() < cur_metric.get() {
                    // Strictly better path through another neighbor.
                    Debug::RouteUpdate(rte.addr, nexthop, &metric).log();
                    table.update(rte.addr, nexthop, metric);
                }
            }
            None => {
                // Unreachable routes are not installed from scratch.
                if metric.is_infinite() {
                    continue;
                }

                Debug::RouteCreate(rte.addr, nexthop, &metric).log();
                table.insert(rte.addr, nexthop, metric);
            }
        }
    }
}

// ===== route timeout =====

// Poisons every live route that hasn't been refreshed within the invalid
// interval. Returns whether any route timed out.
//
// Ages are measured against the single `now` the scan was fired at.
pub(crate) fn route_timeout_scan(
    table: &mut RoutingTable,
    now: Instant,
    invalid_interval: Duration,
) -> bool {
    let expired: Vec<RouterId> = table
        .iter_non_self()
        .filter(|route| !route.is_garbage())
        .filter(|route| {
            route
                .age(now)
                .is_some_and(|age| age >= invalid_interval)
        })
        .map(|route| route.dest)
        .collect();

    for dest in &expired {
        Debug::RouteTimeout(*dest).log();
        table.poison(*dest);
    }

    !expired.is_empty()
}

// ===== route garbage collection =====

// Deletes every poisoned route that has been garbage for at least the flush
// interval. Returns whether any route was deleted.
pub(crate) fn route_gc_scan(
    table: &mut RoutingTable,
    now: Instant,
    flush_interval: Duration,
) -> bool {
    let expired: Vec<RouterId> = table
        .iter_non_self()
        .filter(|route| route.is_garbage())
        .filter(|route| {
            route.age(now).is_some_and(|age| age >= flush_interval)
        })
        .map(|route| route.dest)
        .collect();

    for dest in &expired {
        Debug::RouteGcTimeout(*dest).log();
        table.remove(*dest);
    }

    !expired.is_empty()
}

// ===== tests =====
