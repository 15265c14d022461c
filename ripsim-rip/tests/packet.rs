//
// Copyright (c) The RipSim Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::sync::LazyLock as Lazy;

use ripsim_rip::packet::{Command, DecodeError, DecodeResult, Pdu, Rte};
use ripsim_rip::route::Metric;

//
// Helper functions.
//

fn test_encode_pdu(bytes_expected: &[u8], pdu: &DecodeResult<Pdu>) {
    let bytes_actual = pdu.as_ref().unwrap().encode();
    assert_eq!(bytes_expected, bytes_actual);
}

fn test_decode_pdu(bytes: &[u8], pdu_expected: &DecodeResult<Pdu>) {
    let pdu_actual = Pdu::decode(bytes);
    assert_eq!(*pdu_expected, pdu_actual);
}

//
// Test PDUs.
//

static RESPONSE1: Lazy<(Vec<u8>, DecodeResult<Pdu>)> = Lazy::new(|| {
    (
        vec![
            0x02, 0x02, 0x00, 0x01, 0x00, 0x02, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01,
            0x00, 0x00, 0x00, 0x01, 0x00, 0x02, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x03, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01,
            0x00, 0x00, 0x00, 0x04,
        ],
        Ok(Pdu {
            command: Command::Response,
            version: 2,
            src: 1,
            rtes: vec![
                Rte {
                    afi: 2,
                    tag: 0,
                    addr: 2,
                    mask: 0,
                    next_hop: 1,
                    metric: Metric::from(1),
                },
                Rte {
                    afi: 2,
                    tag: 0,
                    addr: 3,
                    mask: 0,
                    next_hop: 1,
                    metric: Metric::from(4),
                },
            ],
            rte_errors: vec![],
        }),
    )
});

// A zero next hop on the wire resolves to the sending router.
static RESPONSE2: Lazy<(Vec<u8>, DecodeResult<Pdu>)> = Lazy::new(|| {
    (
        vec![
            0x02, 0x02, 0x00, 0x07, 0x00, 0x02, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x07, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00,
        ],
        Ok(Pdu {
            command: Command::Response,
            version: 2,
            src: 7,
            rtes: vec![Rte {
                afi: 2,
                tag: 0,
                addr: 7,
                mask: 0,
                next_hop: 7,
                metric: Metric::from(0),
            }],
            rte_errors: vec![],
        }),
    )
});

static RESPONSE3: Lazy<(Vec<u8>, DecodeResult<Pdu>)> = Lazy::new(|| {
    (
        vec![
            0x02, 0x02, 0x00, 0x01, 0x00, 0x02, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x02, 0x00, 0x00,
        ],
        Err(DecodeError::InvalidLength(14)),
    )
});

static RESPONSE4: Lazy<(Vec<u8>, DecodeResult<Pdu>)> = Lazy::new(|| {
    (
        vec![0x01, 0x02, 0x00, 0x01],
        Err(DecodeError::InvalidCommand(1)),
    )
});

static RESPONSE5: Lazy<(Vec<u8>, DecodeResult<Pdu>)> = Lazy::new(|| {
    (
        vec![0x02, 0x01, 0x00, 0x01],
        Err(DecodeError::InvalidVersion(1)),
    )
});

// Invalid entries are collected without discarding the valid ones.
static RESPONSE6: Lazy<(Vec<u8>, DecodeResult<Pdu>)> = Lazy::new(|| {
    (
        vec![
            0x02, 0x02, 0x00, 0x02, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x05, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x01, 0x00, 0x02, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x02, 0x00, 0x02, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x06, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x14,
        ],
        Ok(Pdu {
            command: Command::Response,
            version: 2,
            src: 2,
            rtes: vec![Rte {
                afi: 2,
                tag: 0,
                addr: 4,
                mask: 0,
                next_hop: 2,
                metric: Metric::from(2),
            }],
            rte_errors: vec![
                DecodeError::InvalidRteAddressFamily(1),
                DecodeError::InvalidRteMetric(20),
            ],
        }),
    )
});

// An empty response is just the header.
static RESPONSE7: Lazy<(Vec<u8>, DecodeResult<Pdu>)> = Lazy::new(|| {
    (
        vec![0x02, 0x02, 0x00, 0x03],
        Ok(Pdu {
            command: Command::Response,
            version: 2,
            src: 3,
            rtes: vec![],
            rte_errors: vec![],
        }),
    )
});

//
// Tests.
//

#[test]
fn test_encode_response1() {
    let (ref bytes, ref pdu) = *RESPONSE1;
    test_encode_pdu(bytes, pdu);
}

#[test]
fn test_decode_response1() {
    let (ref bytes, ref pdu) = *RESPONSE1;
    test_decode_pdu(bytes, pdu);
}

#[test]
fn test_decode_response2() {
    let (ref bytes, ref pdu) = *RESPONSE2;
    test_decode_pdu(bytes, pdu);
}

#[test]
fn test_decode_response3() {
    let (ref bytes, ref pdu) = *RESPONSE3;
    test_decode_pdu(bytes, pdu);
}

#[test]
fn test_decode_response4() {
    let (ref bytes, ref pdu) = *RESPONSE4;
    test_decode_pdu(bytes, pdu);
}

#[test]
fn test_decode_response5() {
    let (ref bytes, ref pdu) = *RESPONSE5;
    test_decode_pdu(bytes, pdu);
}

#[test]
fn test_decode_response6() {
    let (ref bytes, ref pdu) = *RESPONSE6;
    test_decode_pdu(bytes, pdu);
}

#[test]
fn test_encode_response7() {
    let (ref bytes, ref pdu) = *RESPONSE7;
    test_encode_pdu(bytes, pdu);
}

#[test]
fn test_decode_response7() {
    let (ref bytes, ref pdu) = *RESPONSE7;
    test_decode_pdu(bytes, pdu);
}

// A datagram with k entries encodes to exactly 4 + 20k bytes.
#[test]
fn test_wire_size() {
    for count in 0..=3 {
        let rtes = (0..count)
            .map(|i| Rte::new(10 + i, 2, Metric::from(1)))
            .collect();
        let pdu = Pdu::new(Command::Response, 1, rtes);
        assert_eq!(
            pdu.encode().len(),
            Pdu::HDR_LENGTH + count as usize * Rte::LENGTH
        );
    }
}

// Locally constructed entries survive the wire byte-for-byte.
#[test]
fn test_rte_round_trip() {
    let pdu = Pdu::new(
        Command::Response,
        5,
        vec![
            Rte::new(2, 3, Metric::from(7)),
            Rte::new(9, 5, Metric::from(16)),
        ],
    );

    let decoded = Pdu::decode(&pdu.encode()).unwrap();
    assert_eq!(pdu, decoded);
}
