//
// Copyright (c) The RipSim Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::sync::Arc;
use std::time::Duration;

use ripsim_utils::task::{IntervalTask, Task, TimeoutTask};
use tokio::net::UdpSocket;
use tokio::sync::mpsc::{Sender, UnboundedReceiver};
use tracing::{Instrument, debug_span};

use crate::network;

//
// Router tasks diagram:
//
//                 udp_rx (Nx) -> +--------------+
//        update_interval (1x) -> |              |
//          route_timeout (1x) -> |              |
//       route_gc_timeout (1x) -> |   instance   | -> (1x) udp_tx
// triggered_upd_timeout (0/1x)-> |              |
//                                +--------------+
//

// Router inter-task message types.
pub mod messages {
    use crate::packet::{DecodeError, Pdu};

    // Input messages (child task -> main task).
    pub mod input {
        use super::*;

        #[derive(Debug)]
        pub struct UdpRxPduMsg {
            pub pdu: Result<Pdu, DecodeError>,
        }

        #[derive(Debug)]
        pub struct UpdateIntervalMsg {}

        #[derive(Debug)]
        pub struct RouteTimeoutMsg {}

        #[derive(Debug)]
        pub struct RouteGcTimeoutMsg {}

        #[derive(Debug)]
        pub struct TriggeredUpdTimeoutMsg {}
    }

    // Output messages (main task -> child task).
    pub mod output {
        use super::*;

        #[derive(Debug)]
        pub struct UdpTxPduMsg {
            pub dst_port: u16,
            pub pdu: Pdu,
        }
    }
}

// ===== router tasks =====

// UDP Rx task.
pub(crate) fn udp_rx(
    socket: &Arc<UdpSocket>,
    udp_pdu_rxp: &Sender<messages::input::UdpRxPduMsg>,
) -> Task<()> {
    let span1 = debug_span!("network");
    let _span1_guard = span1.enter();
    let span2 = debug_span!("input");
    let _span2_guard = span2.enter();

    let socket = socket.clone();
    let udp_pdu_rxp = udp_pdu_rxp.clone();

    Task::spawn_supervised(move || {
        let socket = socket.clone();
        let udp_pdu_rxp = udp_pdu_rxp.clone();
        async move {
            let _ = network::read_loop(socket, udp_pdu_rxp).await;
        }
        .in_current_span()
    })
}

// UDP Tx task.
pub(crate) fn udp_tx(
    socket: &Arc<UdpSocket>,
    udp_pdu_txc: UnboundedReceiver<messages::output::UdpTxPduMsg>,
) -> Task<()> {
    let span1 = debug_span!("network");
    let _span1_guard = span1.enter();
    let span2 = debug_span!("output");
    let _span2_guard = span2.enter();

    let socket = socket.clone();
    Task::spawn(
        async move {
            network::write_loop(socket, udp_pdu_txc).await;
        }
        .in_current_span(),
    )
}

// Periodic update interval.
pub(crate) fn update_interval(
    interval: Duration,
    update_intervalp: &Sender<messages::input::UpdateIntervalMsg>,
) -> IntervalTask {
    let update_intervalp = update_intervalp.clone();
    IntervalTask::new(interval, true, move || {
        let update_intervalp = update_intervalp.clone();
        async move {
            let msg = messages::input::UpdateIntervalMsg {};
            let _ = update_intervalp.send(msg).await;
        }
    })
}

// Route timeout scan interval.
pub(crate) fn route_timeout_interval(
    interval: Duration,
    route_timeoutp: &Sender<messages::input::RouteTimeoutMsg>,
) -> IntervalTask {
    let route_timeoutp = route_timeoutp.clone();
    IntervalTask::new(interval, true, move || {
        let route_timeoutp = route_timeoutp.clone();
        async move {
            let msg = messages::input::RouteTimeoutMsg {};
            let _ = route_timeoutp.send(msg).await;
        }
    })
}

// Route garbage-collection scan interval.
pub(crate) fn route_gc_interval(
    interval: Duration,
    route_gc_timeoutp: &Sender<messages::input::RouteGcTimeoutMsg>,
) -> IntervalTask {
    let route_gc_timeoutp = route_gc_timeoutp.clone();
    IntervalTask::new(interval, true, move || {
        let route_gc_timeoutp = route_gc_timeoutp.clone();
        async move {
            let msg = messages::input::RouteGcTimeoutMsg {};
            let _ = route_gc_timeoutp.send(msg).await;
        }
    })
}

// Triggered update delay.
pub(crate) fn triggered_upd_timeout(
    timeout: Duration,
    triggered_upd_timeoutp: &Sender<messages::input::TriggeredUpdTimeoutMsg>,
) -> TimeoutTask {
    let triggered_upd_timeoutp = triggered_upd_timeoutp.clone();
    TimeoutTask::new(timeout, move || async move {
        let msg = messages::input::TriggeredUpdTimeoutMsg {};
        let _ = triggered_upd_timeoutp.send(msg).await;
    })
}
