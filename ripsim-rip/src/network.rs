//
// Copyright (c) The RipSim Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

use tokio::net::UdpSocket;
use tokio::sync::mpsc::error::SendError;
use tokio::sync::mpsc::{Sender, UnboundedReceiver};

use crate::error::IoError;
use crate::packet::Pdu;
use crate::tasks::messages::input::UdpRxPduMsg;
use crate::tasks::messages::output::UdpTxPduMsg;

// All simulated traffic stays on loopback.
pub const HOST: Ipv4Addr = Ipv4Addr::LOCALHOST;

// Maximum size of a received datagram.
pub const MAX_DGRAM_SIZE: usize = 1024;

// ===== global functions =====

pub(crate) async fn send_packet(
    socket: &UdpSocket,
    pdu: Pdu,
    dst_port: u16,
) -> Result<(), std::io::Error> {
    // Encode PDU.
    let buf = pdu.encode();

    // Send packet.
    let dst = SocketAddr::from((HOST, dst_port));
    socket.send_to(&buf, dst).await?;

    Ok(())
}

pub(crate) async fn write_loop(
    socket: Arc<UdpSocket>,
    mut udp_tx_pduc: UnboundedReceiver<UdpTxPduMsg>,
) {
    while let Some(UdpTxPduMsg { dst_port, pdu }) = udp_tx_pduc.recv().await {
        if let Err(error) = send_packet(&socket, pdu, dst_port).await {
            IoError::UdpSendError(error).log();
        }
    }
}

pub(crate) async fn read_loop(
    socket: Arc<UdpSocket>,
    udp_pdu_rxp: Sender<UdpRxPduMsg>,
) -> Result<(), SendError<UdpRxPduMsg>> {
    let mut buf = [0; MAX_DGRAM_SIZE];

    loop {
        // Receive data from the network. The sending router is identified by
        // the header's source field, not by the datagram's source address.
        let num_bytes = match socket.recv_from(&mut buf).await {
            Ok((num_bytes, _)) => num_bytes,
            Err(error) => {
                IoError::UdpRecvError(error).log();
                continue;
            }
        };

        // Decode packet.
        let pdu = Pdu::decode(&buf[0..num_bytes]);
        let msg = UdpRxPduMsg { pdu };
        udp_pdu_rxp.send(msg).await?;
    }
}
