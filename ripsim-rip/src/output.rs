//
// Copyright (c) The RipSim Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::collections::BTreeMap;

use itertools::Itertools;
use tokio::sync::mpsc::UnboundedSender;

use crate::debug::Debug;
use crate::instance::Output;
use crate::packet::{Command, Pdu, Rte};
use crate::route::{Metric, RouterId};
use crate::tasks::messages::output::UdpTxPduMsg;

// ===== global functions =====

// Queue the candidate RTEs toward every configured neighbor, applying split
// horizon with poisoned reverse per neighbor.
pub(crate) fn send_response(
    src: RouterId,
    outputs: &BTreeMap<RouterId, Output>,
    rtes: &[Rte],
    udp_tx_pdup: &UnboundedSender<UdpTxPduMsg>,
) {
    for (nbr_id, output) in outputs {
        // Split-horizon processing: a route learned through this neighbor is
        // advertised back to it as unreachable.
        let rtes = rtes.iter().map(|rte| {
            let mut rte = rte.clone();
            if rte.next_hop == *nbr_id {
                rte.metric = Metric::from(Metric::INFINITE);
            }
            rte
        });

        // Send as many PDUs as necessary.
        for rtes in rtes
            .chunks(Pdu::MAX_ENTRIES)
            .into_iter()
            .map(|chunk| chunk.collect())
        {
            let pdu = Pdu::new(Command::Response, src, rtes);
            Debug::PduTx(*nbr_id, &pdu).log();
            let msg = UdpTxPduMsg {
                dst_port: output.port,
                pdu,
            };
            let _ = udp_tx_pdup.send(msg);
        }
    }
}

// ===== tests =====

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;

    fn outputs(neighbors: &[(RouterId, u16)]) -> BTreeMap<RouterId, Output> {
        neighbors
            .iter()
            .map(|&(id, port)| (id, Output::new(port, Metric::from(1))))
            .collect()
    }

    // A middle router advertising to one end of a chain: the route learned
    // from that end is poisoned, the route learned from the other end is not.
    #[test]
    fn split_horizon_poisoned_reverse() {
        let outputs = outputs(&[(1, 10001), (3, 10003)]);
        let rtes = vec![
            Rte::new(2, 0, Metric::from(0)),
            Rte::new(1, 1, Metric::from(1)),
            Rte::new(3, 3, Metric::from(1)),
        ];
        let (udp_txp, mut udp_txc) = mpsc::unbounded_channel();

        send_response(2, &outputs, &rtes, &udp_txp);

        // First PDU goes to router 1.
        let msg = udp_txc.try_recv().unwrap();
        assert_eq!(msg.dst_port, 10001);
        let pdu = msg.pdu;
        assert_eq!(pdu.src, 2);
        assert_eq!(pdu.rtes.len(), 3);

        let for_1 = pdu.rtes.iter().find(|rte| rte.addr == 1).unwrap();
        assert!(for_1.metric.is_infinite());
        let for_3 = pdu.rtes.iter().find(|rte| rte.addr == 3).unwrap();
        assert_eq!(for_3.metric.get(), 1);
        assert_eq!(for_3.next_hop, 3);
        let own = pdu.rtes.iter().find(|rte| rte.addr == 2).unwrap();
        assert_eq!(own.metric.get(), 0);
        assert_eq!(own.next_hop, 0);

        // No reachable route is ever advertised back through its next hop.
        for rte in &pdu.rtes {
            assert!(rte.metric.is_infinite() || rte.next_hop != 1);
        }

        // Second PDU goes to router 3, with the mirror poisoning.
        let msg = udp_txc.try_recv().unwrap();
        assert_eq!(msg.dst_port, 10003);
        let for_3 = msg.pdu.rtes.iter().find(|rte| rte.addr == 3).unwrap();
        assert!(for_3.metric.is_infinite());
        let for_1 = msg.pdu.rtes.iter().find(|rte| rte.addr == 1).unwrap();
        assert_eq!(for_1.metric.get(), 1);

        assert!(udp_txc.try_recv().is_err());
    }

    #[test]
    fn large_tables_are_chunked() {
        let outputs = outputs(&[(1, 10001)]);
        let rtes: Vec<_> = (2..=121)
            .map(|dest| Rte::new(dest, 1, Metric::from(1)))
            .collect();
        let (udp_txp, mut udp_txc) = mpsc::unbounded_channel();

        send_response(5, &outputs, &rtes, &udp_txp);

        let mut sizes = vec![];
        while let Ok(msg) = udp_txc.try_recv() {
            assert!(msg.pdu.rtes.len() <= Pdu::MAX_ENTRIES);
            sizes.push(msg.pdu.rtes.len());
        }
        assert_eq!(sizes, vec![51, 51, 18]);
    }

    #[test]
    fn nothing_sent_without_candidates() {
        let outputs = outputs(&[(1, 10001)]);
        let (udp_txp, mut udp_txc) = mpsc::unbounded_channel();

        send_response(2, &outputs, &[], &udp_txp);

        assert!(udp_txc.try_recv().is_err());
    }
}
