//! Integration tests for the reliudp-peer crate.
//!
//! Two connections exchange framed datagrams directly, with the test playing
//! the role of the network.

use std::time::{Duration, Instant};

use reliudp_core::config::Config;
use reliudp_peer::{Connection, Incoming};
use reliudp_protocol::{packet::Frame, SequenceSpace};

fn pair(config: &Config, time: Instant) -> (Connection, Connection) {
    let a = Connection::new("127.0.0.1:4000".parse().unwrap(), config, time).unwrap();
    let b = Connection::new("127.0.0.1:5000".parse().unwrap(), config, time).unwrap();
    (a, b)
}

fn deliver(receiver: &mut Connection, datagram: &[u8], time: Instant) -> Option<Vec<u8>> {
    let space = *receiver.space();
    let frame = Frame::decode(&space, datagram).unwrap();
    match receiver.process_frame(frame, time).incoming {
        Incoming::Deliver(payload) => Some(payload.to_vec()),
        _ => None,
    }
}

#[test]
fn test_in_order_stream_round_trips() {
    let time = Instant::now();
    let (mut sender, mut receiver) = pair(&Config::default(), time);

    let messages: Vec<Vec<u8>> = (0..20u8).map(|i| vec![i; i as usize]).collect();
    let mut received = Vec::new();
    for message in &messages {
        let datagram = sender.frame_reliable(message, time).unwrap();
        received.push(deliver(&mut receiver, &datagram, time).unwrap());
    }

    assert_eq!(received, messages);
    assert_eq!(receiver.last_received_seq(), sender.last_sent_seq());
    assert!(receiver.missing_sequences().is_empty());
}

#[test]
fn test_lost_datagram_recovered_through_nak() {
    let time = Instant::now();
    let (mut sender, mut receiver) = pair(&Config::default(), time);

    let datagrams: Vec<Vec<u8>> =
        (1..=7u8).map(|i| sender.frame_reliable(&[i], time).unwrap()).collect();

    // Sequence 6 never arrives.
    for (index, datagram) in datagrams.iter().enumerate() {
        if index != 5 {
            deliver(&mut receiver, datagram, time);
        }
    }
    assert_eq!(receiver.missing_sequences(), vec![6]);

    let nak = receiver.frame_nak(time).unwrap();
    let space = *sender.space();
    let frame = Frame::decode(&space, &nak).unwrap();
    let resend = match sender.process_frame(frame, time).incoming {
        Incoming::Retransmit(resend) => resend,
        other => panic!("expected retransmission, got {:?}", other),
    };
    assert_eq!(resend, vec![datagrams[5].clone()]);

    assert_eq!(deliver(&mut receiver, &resend[0], time), Some(vec![6]));
    assert!(receiver.missing_sequences().is_empty());
    assert_eq!(deliver(&mut receiver, &resend[0], time), None);
}

#[test]
fn test_ping_keeps_link_alive_without_sequence() {
    let start = Instant::now();
    let config = Config::default();
    let (mut sender, mut receiver) = pair(&config, start);

    sender.frame_reliable(b"one", start).unwrap();
    let later = start + config.ping_interval + Duration::from_millis(1);
    assert!(sender.ping_due(later));
    let ping = sender.frame_ping(later);
    assert_eq!(sender.last_sent_seq(), 1);

    let space = SequenceSpace::new(config.sequence_width).unwrap();
    let frame = Frame::decode(&space, &ping).unwrap();
    assert_eq!(receiver.process_frame(frame, later).incoming, Incoming::Ping);
    assert_eq!(receiver.last_receive_time(), later);
    assert!(!receiver.is_timed_out(later + config.disconnect_timeout));
}

#[test]
fn test_single_byte_header_wraps() {
    let time = Instant::now();
    let config = Config { sequence_width: 1, history_capacity: 64, ..Config::default() };
    let (mut sender, mut receiver) = pair(&config, time);

    // 300 sends cross the 253 wrap point.
    for i in 0..300u32 {
        let payload = i.to_be_bytes();
        let datagram = sender.frame_reliable(&payload, time).unwrap();
        assert_eq!(deliver(&mut receiver, &datagram, time), Some(payload.to_vec()));
    }
    assert_eq!(sender.last_sent_seq(), 300 % 253);
    assert!(receiver.missing_sequences().is_empty());
}
