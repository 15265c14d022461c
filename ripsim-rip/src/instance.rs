//
// Copyright (c) The RipSim Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use derive_new::new;
use ripsim_utils::socket::UdpSocketExt;
use ripsim_utils::task::TimeoutTask;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::sync::mpsc::{Sender, UnboundedSender};
use tokio::time;

use crate::debug::Debug;
use crate::error::{Error, IoError};
use crate::network::HOST;
use crate::packet::Rte;
use crate::route::{Metric, Route, RouterId};
use crate::table::RoutingTable;
use crate::tasks;
use crate::tasks::messages::input::{TriggeredUpdTimeoutMsg, UdpRxPduMsg};
use crate::tasks::messages::output::UdpTxPduMsg;
use crate::{events, output};

// Grace period after the event loop exits, absorbing in-flight firings
// before the sockets and the log sink are released.
const SHUTDOWN_GRACE: Duration = Duration::from_millis(100);

// Link toward a directly connected neighbor.
#[derive(Clone, Copy, Debug, Eq, PartialEq, new)]
pub struct Output {
    // The neighbor's input port.
    pub port: u16,
    // Cost of the link.
    pub cost: Metric,
}

// Protocol timing knobs. The topology file cannot override these; tests
// compress them to converge quickly.
#[derive(Clone, Copy, Debug)]
pub struct TimersCfg {
    // Cadence shared by the periodic update and both aging scans.
    pub update_interval: Duration,
    // Unrefreshed routes are poisoned after this long.
    pub invalid_interval: Duration,
    // Poisoned routes are deleted after this long.
    pub flush_interval: Duration,
    // Delay between a table change and the triggered update it causes.
    pub triggered_update_delay: Duration,
    // How long the simulated router lives.
    pub lifespan: Duration,
}

// Router configuration, one per topology file stanza.
#[derive(Clone, Debug)]
pub struct InstanceCfg {
    pub id: RouterId,
    // Input ports, each backed by its own UDP socket.
    pub inputs: Vec<u16>,
    // Directly connected neighbors.
    pub outputs: BTreeMap<RouterId, Output>,
    pub timers: TimersCfg,
}

#[derive(Debug)]
pub struct Instance {
    // Router configuration.
    pub config: InstanceCfg,
    // Router state.
    pub state: InstanceState,
    // Input sockets. Outgoing updates are sent from the first one.
    sockets: Vec<Arc<UdpSocket>>,
    // Routing table snapshot sink.
    log: LogSink,
}

#[derive(Debug)]
pub struct InstanceState {
    // Routing table.
    pub table: RoutingTable,
    // Changed routes awaiting the delayed triggered update.
    pending_rtes: Vec<Rte>,
    // Triggered update delay task.
    triggered_upd_task: Option<TimeoutTask>,
}

// Append-only sink for routing table snapshots. Write failures are logged
// and never abort the router.
#[derive(Debug)]
struct LogSink {
    file: Option<File>,
}

// ===== impl TimersCfg =====

impl Default for TimersCfg {
    fn default() -> TimersCfg {
        TimersCfg {
            update_interval: Duration::from_secs(5),
            invalid_interval: Duration::from_secs(30),
            flush_interval: Duration::from_secs(30),
            triggered_update_delay: Duration::from_secs(2),
            lifespan: Duration::from_secs(60),
        }
    }
}

// ===== impl Instance =====

impl Instance {
    // Binds the router's input sockets, creates its log sink and writes the
    // startup snapshot.
    //
    // All routers are bound before any engine starts emitting, so must be
    // called from within the async runtime.
    pub fn bind(config: InstanceCfg, log_dir: &Path) -> Result<Instance, Error> {
        debug_assert!(!config.inputs.is_empty());

        // Input sockets.
        let mut sockets = Vec::with_capacity(config.inputs.len());
        for port in &config.inputs {
            let addr = SocketAddr::from((HOST, *port));
            let socket = UdpSocket::bind_reuseaddr(addr)
                .map_err(|error| Error::from(IoError::UdpSocketError(error)))?;
            sockets.push(Arc::new(socket));
        }

        let mut log = LogSink::create(log_dir, config.id);
        let state = InstanceState {
            table: RoutingTable::new(config.id),
            pending_rtes: vec![],
            triggered_upd_task: None,
        };

        // Startup snapshot.
        log.write(&state.table.dump());

        Ok(Instance {
            config,
            state,
            sockets,
            log,
        })
    }

    // Runs the router until its lifespan elapses, then returns the final
    // routing table.
    pub async fn run(mut self) -> RoutingTable {
        Debug::InstanceStart.log();

        // In-process queues feeding the instance task. All table access goes
        // through this task, which serializes receive processing, timer
        // firings and emissions.
        let (udp_pdu_rxp, mut udp_pdu_rxc) = mpsc::channel(4);
        let (update_intervalp, mut update_intervalc) = mpsc::channel(4);
        let (route_timeoutp, mut route_timeoutc) = mpsc::channel(4);
        let (route_gc_timeoutp, mut route_gc_timeoutc) = mpsc::channel(4);
        let (triggered_upd_timeoutp, mut triggered_upd_timeoutc) =
            mpsc::channel(4);
        let (udp_tx_pdup, udp_tx_pduc) = mpsc::unbounded_channel();

        // Network tasks.
        let mut io_tasks = vec![];
        for socket in &self.sockets {
            io_tasks.push(tasks::udp_rx(socket, &udp_pdu_rxp));
        }
        io_tasks.push(tasks::udp_tx(&self.sockets[0], udp_tx_pduc));

        // Timer supervisor: periodic update and both aging scans share one
        // cadence.
        let interval = self.config.timers.update_interval;
        let update_interval_task =
            tasks::update_interval(interval, &update_intervalp);
        let route_timeout_task =
            tasks::route_timeout_interval(interval, &route_timeoutp);
        let route_gc_task =
            tasks::route_gc_interval(interval, &route_gc_timeoutp);

        // Event loop, bounded by the router's lifespan.
        let end = time::Instant::now() + self.config.timers.lifespan;
        loop {
            tokio::select! {
                Some(msg) = udp_pdu_rxc.recv() => {
                    self.process_pdu(msg, &triggered_upd_timeoutp);
                }
                Some(_) = update_intervalc.recv() => {
                    self.process_update_interval(&udp_tx_pdup);
                }
                Some(_) = route_timeoutc.recv() => {
                    self.process_route_timeout();
                }
                Some(_) = route_gc_timeoutc.recv() => {
                    self.process_route_gc_timeout();
                }
                Some(_) = triggered_upd_timeoutc.recv() => {
                    self.process_triggered_update(&udp_tx_pdup);
                }
                _ = time::sleep_until(end) => break,
            }
        }

        // End of life: stop re-arming the timers, absorb in-flight firings,
        // then release the sockets and the log sink.
        Debug::InstanceStop.log();
        drop(update_interval_task);
        drop(route_timeout_task);
        drop(route_gc_task);
        self.state.triggered_upd_task = None;
        time::sleep(SHUTDOWN_GRACE).await;
        drop(io_tasks);
        self.log.flush();

        self.state.table
    }

    fn process_pdu(
        &mut self,
        msg: UdpRxPduMsg,
        triggered_upd_timeoutp: &Sender<TriggeredUpdTimeoutMsg>,
    ) {
        Debug::PduRx(&msg.pdu).log();

        // Malformed datagrams are dropped at the datagram boundary.
        let pdu = match msg.pdu {
            Ok(pdu) => pdu,
            Err(error) => {
                Error::UdpPduDecodeError(error).log();
                return;
            }
        };

        // Log entries that failed to decode; the valid ones are still
        // processed.
        for error in &pdu.rte_errors {
            Error::UdpPduDecodeError(error.clone()).log();
        }

        events::update_routing_table(
            &mut self.state.table,
            &self.config.outputs,
            &pdu,
        );

        if self.state.table.is_changed() {
            self.log.write(&self.state.table.dump());
            self.schedule_triggered_update(triggered_upd_timeoutp);
        }
    }

    // Snapshots the changed routes and arms the delayed emission. Further
    // changes inside the delay window coalesce into the pending snapshot.
    fn schedule_triggered_update(
        &mut self,
        triggered_upd_timeoutp: &Sender<TriggeredUpdTimeoutMsg>,
    ) {
        for rte in self.state.table.take_changed_rtes() {
            self.state
                .pending_rtes
                .retain(|pending| pending.addr != rte.addr);
            self.state.pending_rtes.push(rte);
        }

        if self.state.triggered_upd_task.is_none() {
            self.state.triggered_upd_task =
                Some(tasks::triggered_upd_timeout(
                    self.config.timers.triggered_update_delay,
                    triggered_upd_timeoutp,
                ));
        }
    }

    fn process_triggered_update(
        &mut self,
        udp_tx_pdup: &UnboundedSender<UdpTxPduMsg>,
    ) {
        Debug::TriggeredUpdate.log();
        self.state.triggered_upd_task = None;

        let rtes = std::mem::take(&mut self.state.pending_rtes);
        output::send_response(
            self.config.id,
            &self.config.outputs,
            &rtes,
            udp_tx_pdup,
        );
    }

    fn process_update_interval(
        &mut self,
        udp_tx_pdup: &UnboundedSender<UdpTxPduMsg>,
    ) {
        Debug::UpdateInterval.log();

        // Periodic updates advertise the full table. Peers learn the sender
        // through its own entry, which split horizon never rewrites.
        let rtes: Vec<_> =
            self.state.table.iter().map(Route::as_rte).collect();
        output::send_response(
            self.config.id,
            &self.config.outputs,
            &rtes,
            udp_tx_pdup,
        );
    }

    fn process_route_timeout(&mut self) {
        if events::route_timeout_scan(
            &mut self.state.table,
            Instant::now(),
            self.config.timers.invalid_interval,
        ) {
            self.log.write(&self.state.table.dump());
        }
    }

    fn process_route_gc_timeout(&mut self) {
        if events::route_gc_scan(
            &mut self.state.table,
            Instant::now(),
            self.config.timers.flush_interval,
        ) {
            self.log.write(&self.state.table.dump());
        }
    }
}

// ===== impl LogSink =====

impl LogSink {
    fn create(dir: &Path, id: RouterId) -> LogSink {
        let path = dir.join(format!("{}_log.txt", id));
        let file = match File::create(&path) {
            Ok(file) => Some(file),
            Err(error) => {
                IoError::LogIoError(error).log();
                None
            }
        };

        LogSink { file }
    }

    fn write(&mut self, snapshot: &str) {
        // Snapshots are separated by one blank line.
        if let Some(file) = &mut self.file
            && let Err(error) = writeln!(file, "{}", snapshot)
        {
            IoError::LogIoError(error).log();
        }
    }

    fn flush(&mut self) {
        if let Some(file) = &mut self.file {
            let _ = file.flush();
        }
    }
}
