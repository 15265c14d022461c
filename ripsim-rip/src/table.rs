//
// Copyright (c) The RipSim Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::collections::BTreeMap;
use std::time::Instant;

use crate::packet::Rte;
use crate::route::{Metric, Route, RouteFlags, RouterId};

// Routing table indexed by destination router id.
//
// The table always contains an imported entry for the owning router. That
// entry is created at construction time, never ages and is never removed.
#[derive(Debug)]
pub struct RoutingTable {
    router_id: RouterId,
    routes: BTreeMap<RouterId, Route>,
    // At least one route was mutated since the last triggered snapshot.
    changed: bool,
}

// ===== impl RoutingTable =====

impl RoutingTable {
    pub fn new(router_id: RouterId) -> RoutingTable {
        let mut routes = BTreeMap::new();
        routes.insert(router_id, Route::new_imported(router_id));

        RoutingTable {
            router_id,
            routes,
            changed: false,
        }
    }

    pub fn router_id(&self) -> RouterId {
        self.router_id
    }

    pub fn get(&self, dest: RouterId) -> Option<&Route> {
        self.routes.get(&dest)
    }

    // Install a newly learned route.
    pub fn insert(&mut self, dest: RouterId, nexthop: RouterId, metric: Metric) {
        debug_assert_ne!(dest, self.router_id);
        debug_assert!(!metric.is_infinite());

        self.routes.insert(dest, Route::new(dest, nexthop, metric));
        self.changed = true;
    }

    // Replace an existing route's metric and next hop, reviving it if it was
    // awaiting deletion.
    pub fn update(&mut self, dest: RouterId, nexthop: RouterId, metric: Metric) {
        if let Some(route) = self.routes.get_mut(&dest) {
            route.metric = metric;
            route.nexthop = nexthop;
            route.flags.remove(RouteFlags::GARBAGE);
            route.flags.insert(RouteFlags::CHANGED);
            route.refreshed_at = Some(Instant::now());
            self.changed = true;
        }
    }

    // Mark a route unreachable and start its deletion countdown.
    pub fn poison(&mut self, dest: RouterId) {
        if let Some(route) = self.routes.get_mut(&dest)
            && !route.is_imported()
        {
            route.metric.set_infinite();
            route.flags.insert(RouteFlags::GARBAGE | RouteFlags::CHANGED);
            route.refreshed_at = Some(Instant::now());
            self.changed = true;
        }
    }

    // Restart the aging timer of a live route.
    pub fn refresh(&mut self, dest: RouterId) {
        if let Some(route) = self.routes.get_mut(&dest)
            && !route.is_imported()
            && !route.is_garbage()
        {
            route.refreshed_at = Some(Instant::now());
        }
    }

    pub fn remove(&mut self, dest: RouterId) {
        if dest != self.router_id {
            self.routes.remove(&dest);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Route> {
        self.routes.values()
    }

    pub fn iter_non_self(&self) -> impl Iterator<Item = &Route> {
        self.routes
            .values()
            .filter(move |route| route.dest != self.router_id)
    }

    pub fn is_changed(&self) -> bool {
        self.changed
    }

    // Snapshot the changed routes as wire RTEs and clear both levels of
    // change flags.
    pub fn take_changed_rtes(&mut self) -> Vec<Rte> {
        let mut rtes = vec![];
        for route in self
            .routes
            .values_mut()
            .filter(|route| route.is_changed())
        {
            rtes.push(route.as_rte());
            route.flags.remove(RouteFlags::CHANGED);
        }
        self.changed = false;
        rtes
    }

    // Human-readable snapshot, with the router's own entry first.
    pub fn dump(&self) -> String {
        const RULE: &str =
            "+-------------+----------+------------+--------------+------------+\n";

        let mut out = String::new();
        out.push_str(RULE);
        out.push_str(&format!(
            "|                  Router #{}  Routing Table                       |\n",
            self.router_id
        ));
        out.push_str(RULE);
        out.push_str(
            "| destination |  metric  |  next hop  |  is changed  | is garbage |\n",
        );
        out.push_str(RULE);
        if let Some(route) = self.routes.get(&self.router_id) {
            out.push_str(&format_row(route));
        }
        out.push_str(
            "|_____________|__________|____________|______________|____________|\n",
        );
        out.push_str(RULE);
        for route in self.iter_non_self() {
            out.push_str(&format_row(route));
            out.push_str(RULE);
        }
        out
    }
}

fn format_row(route: &Route) -> String {
    format!(
        "|{:^13}|{:^10}|{:^12}|{:^14}|{:^12}|\n",
        route.dest,
        route.metric.get(),
        route.nexthop,
        route.is_changed(),
        route.is_garbage(),
    )
}

// ===== tests =====

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> RoutingTable {
        RoutingTable::new(1)
    }

    #[test]
    fn self_entry_at_construction() {
        let table = table();
        let route = table.get(1).unwrap();
        assert!(route.is_imported());
        assert!(!route.is_garbage());
        assert!(!route.is_changed());
        assert_eq!(route.nexthop, 0);
        assert_eq!(route.metric.get(), 0);
        assert!(route.refreshed_at.is_none());
        assert!(!table.is_changed());
    }

    #[test]
    fn insert_sets_change_flags() {
        let mut table = table();
        table.insert(2, 2, Metric::from(1));

        let route = table.get(2).unwrap();
        assert!(route.is_changed());
        assert!(!route.is_garbage());
        assert!(route.refreshed_at.is_some());
        assert!(table.is_changed());
    }

    #[test]
    fn one_route_per_destination() {
        let mut table = table();
        table.insert(2, 2, Metric::from(1));
        table.update(2, 3, Metric::from(4));
        assert_eq!(table.iter().count(), 2);

        let route = table.get(2).unwrap();
        assert_eq!(route.nexthop, 3);
        assert_eq!(route.metric.get(), 4);
    }

    #[test]
    fn poison_marks_garbage() {
        let mut table = table();
        table.insert(2, 2, Metric::from(1));
        table.take_changed_rtes();
        table.poison(2);

        let route = table.get(2).unwrap();
        assert!(route.metric.is_infinite());
        assert!(route.is_garbage());
        assert!(route.is_changed());
        assert!(table.is_changed());
    }

    #[test]
    fn update_revives_garbage_route() {
        let mut table = table();
        table.insert(2, 2, Metric::from(1));
        table.poison(2);
        table.update(2, 3, Metric::from(2));

        let route = table.get(2).unwrap();
        assert!(!route.is_garbage());
        assert_eq!(route.metric.get(), 2);
        assert_eq!(route.nexthop, 3);
    }

    #[test]
    fn self_entry_is_protected() {
        let mut table = table();
        table.poison(1);
        table.refresh(1);
        table.remove(1);

        let route = table.get(1).unwrap();
        assert!(route.is_imported());
        assert!(!route.is_garbage());
        assert_eq!(route.metric.get(), 0);
        assert!(route.refreshed_at.is_none());
        assert!(!table.is_changed());
    }

    #[test]
    fn take_changed_rtes_clears_flags() {
        let mut table = table();
        table.insert(2, 2, Metric::from(1));
        table.insert(3, 2, Metric::from(2));

        let rtes = table.take_changed_rtes();
        assert_eq!(rtes.len(), 2);
        assert!(!table.is_changed());
        assert!(table.iter().all(|route| !route.is_changed()));

        // Nothing left to snapshot.
        assert!(table.take_changed_rtes().is_empty());
    }

    #[test]
    fn dump_lists_self_entry_first() {
        let mut table = table();
        table.insert(2, 2, Metric::from(1));

        let dump = table.dump();
        let self_row = dump.lines().position(|l| l.contains("      1      "));
        let peer_row = dump.lines().position(|l| l.contains("      2      "));
        assert!(self_row.unwrap() < peer_row.unwrap());
    }
}
