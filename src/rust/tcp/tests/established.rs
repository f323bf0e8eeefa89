// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

use crate::tcp::{
    connection::TcpConnection,
    segment::TcpSegment,
    tests::{
        deliver,
        drain,
        establish,
        new_connection,
        read_all,
    },
};
use ::anyhow::Result;

const RTO: u16 = 100;

//======================================================================================================================

/// Pushes a stream much larger than the receive window through, reading on the other end as it arrives.
#[test]
fn test_send_recv_loop() -> Result<()> {
    let mut client: TcpConnection = new_connection(1, RTO, None);
    let mut server: TcpConnection = new_connection(2, RTO, Some(1500));
    establish(&mut client, &mut server);

    let data: Vec<u8> = (0..20_000).map(|i: u32| (i % 251) as u8).collect();
    let mut written: usize = 0;
    let mut received: Vec<u8> = Vec::new();
    let mut rounds: usize = 0;
    while received.len() < data.len() {
        written += client.write(&data[written..]);
        deliver(&mut client, &mut server);
        received.extend(read_all(&mut server));
        deliver(&mut server, &mut client);

        // Reading opens the window, but the server only says so when it has a reason to send.
        client.tick(RTO as u64);
        rounds += 1;
        crate::ensure_neq!(rounds > 1000, true);
    }
    crate::ensure_eq!(received, data);
    crate::ensure_eq!(client.unassembled_bytes(), 0);
    crate::ensure_eq!(server.unassembled_bytes(), 0);

    Ok(())
}

//======================================================================================================================

/// A full receive window stalls the sender until the application reads, with a one-byte probe in between.
#[test]
fn test_zero_window_probe() -> Result<()> {
    let mut client: TcpConnection = new_connection(0, RTO, None);
    let mut server: TcpConnection = new_connection(0, RTO, Some(10));
    establish(&mut client, &mut server);

    crate::ensure_eq!(client.write(b"0123456789abcdefghij"), 20);
    let segments: Vec<TcpSegment> = drain(&mut client);
    crate::ensure_eq!(segments.len(), 1);
    crate::ensure_eq!(segments[0].payload, b"0123456789".to_vec());
    server.segment_received(&segments[0]);

    // The window is now closed.
    let acks: Vec<TcpSegment> = drain(&mut server);
    crate::ensure_eq!(acks.len(), 1);
    crate::ensure_eq!(acks[0].header.window_size, 0);
    client.segment_received(&acks[0]);

    // So the client probes with a single byte.
    let probe: Vec<TcpSegment> = drain(&mut client);
    crate::ensure_eq!(probe.len(), 1);
    crate::ensure_eq!(probe[0].payload, b"a".to_vec());

    // Which the server has no room for.
    server.segment_received(&probe[0]);
    crate::ensure_eq!(server.inbound_stream().buffer_size(), 10);
    deliver(&mut server, &mut client);
    crate::ensure_eq!(drain(&mut client).len(), 0);

    crate::ensure_eq!(read_all(&mut server), b"0123456789".to_vec());

    // Probing a closed window does not count as a failed retransmission.
    client.tick(RTO as u64);
    crate::ensure_eq!(client.sender().consecutive_retransmissions(), 0);
    crate::ensure_eq!(deliver(&mut client, &mut server), 1);
    deliver(&mut server, &mut client);
    deliver(&mut client, &mut server);
    crate::ensure_eq!(read_all(&mut server), b"abcdefghij".to_vec());
    crate::ensure_eq!(client.bytes_in_flight(), 9);

    deliver(&mut server, &mut client);
    crate::ensure_eq!(client.bytes_in_flight(), 0);

    Ok(())
}

//======================================================================================================================

/// A lost segment is recovered by retransmission, with the timer backing off in between.
#[test]
fn test_retransmit_lost_segment() -> Result<()> {
    let mut client: TcpConnection = new_connection(7, RTO, None);
    let mut server: TcpConnection = new_connection(9, RTO, None);
    establish(&mut client, &mut server);

    client.write(b"lost in transit");
    crate::ensure_eq!(drain(&mut client).len(), 1);

    client.tick(RTO as u64 - 1);
    crate::ensure_eq!(drain(&mut client).len(), 0);
    client.tick(1);
    crate::ensure_eq!(drain(&mut client).len(), 1);
    crate::ensure_eq!(client.sender().consecutive_retransmissions(), 1);

    // Second attempt waits twice as long.
    client.tick(2 * RTO as u64 - 1);
    crate::ensure_eq!(drain(&mut client).len(), 0);
    client.tick(1);
    crate::ensure_eq!(deliver(&mut client, &mut server), 1);
    crate::ensure_eq!(client.sender().consecutive_retransmissions(), 2);

    crate::ensure_eq!(read_all(&mut server), b"lost in transit".to_vec());
    deliver(&mut server, &mut client);
    crate::ensure_eq!(client.bytes_in_flight(), 0);
    crate::ensure_eq!(client.sender().consecutive_retransmissions(), 0);

    Ok(())
}

//======================================================================================================================

/// Out-of-order arrival is held back until the gap is filled.
#[test]
fn test_out_of_order_delivery() -> Result<()> {
    let mut client: TcpConnection = new_connection(0, RTO, None);
    let mut server: TcpConnection = new_connection(0, RTO, None);
    establish(&mut client, &mut server);

    client.write(b"first ");
    client.write(b"second");
    let segments: Vec<TcpSegment> = drain(&mut client);
    crate::ensure_eq!(segments.len(), 2);

    server.segment_received(&segments[1]);
    crate::ensure_eq!(server.unassembled_bytes(), 6);
    crate::ensure_eq!(server.inbound_stream().buffer_size(), 0);

    // Duplicate acknowledgment of what was in order so far.
    let acks: Vec<TcpSegment> = drain(&mut server);
    crate::ensure_eq!(acks.len(), 1);
    crate::ensure_eq!(acks[0].header.ack_num, segments[0].header.seq_num);

    server.segment_received(&segments[0]);
    crate::ensure_eq!(server.unassembled_bytes(), 0);
    crate::ensure_eq!(read_all(&mut server), b"first second".to_vec());

    Ok(())
}

//======================================================================================================================

/// Both directions carry data at once, with acknowledgments piggybacked on data.
#[test]
fn test_bidirectional_transfer() -> Result<()> {
    let mut client: TcpConnection = new_connection(0xffff_fff0, RTO, None);
    let mut server: TcpConnection = new_connection(0xffff_ffff, RTO, None);
    establish(&mut client, &mut server);

    client.write(b"ping");
    server.write(b"pong");
    let from_client: Vec<TcpSegment> = drain(&mut client);
    let from_server: Vec<TcpSegment> = drain(&mut server);
    for segment in &from_client {
        server.segment_received(segment);
    }
    for segment in &from_server {
        client.segment_received(segment);
    }
    crate::ensure_eq!(read_all(&mut server), b"ping".to_vec());
    crate::ensure_eq!(read_all(&mut client), b"pong".to_vec());

    deliver(&mut client, &mut server);
    deliver(&mut server, &mut client);
    crate::ensure_eq!(client.bytes_in_flight(), 0);
    crate::ensure_eq!(server.bytes_in_flight(), 0);
    crate::ensure_eq!(client.remaining_outbound_capacity(), client.sender().stream_in().capacity());

    Ok(())
}
