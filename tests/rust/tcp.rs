// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//======================================================================================================================
// Imports
//======================================================================================================================

use ::anyhow::Result;
use ::crossbeam_channel::{
    self,
    Receiver,
    Sender,
};
use ::minitcp::{
    config::Config,
    runtime::logging,
    Fail,
    TcpConfig,
    TcpConnection,
    TcpSegment,
};
use ::std::{
    thread::{
        self,
        JoinHandle,
    },
    time::Duration,
};

//======================================================================================================================
// Constants
//======================================================================================================================

const ALICE_PORT: u16 = 80;
const BOB_PORT: u16 = 49152;

const CONFIG: &str = "
tcp:
  rt_timeout: 50
  recv_capacity: 2000
  max_payload_size: 700
";

//======================================================================================================================
// Helper Functions
//======================================================================================================================

fn new_connection(fixed_isn: u32) -> Result<TcpConnection> {
    logging::initialize();
    let config: Config = format!("{}  fixed_isn: {}\n", CONFIG, fixed_isn).parse()?;
    let tcp_config: TcpConfig = config.tcp_config()?;
    anyhow::ensure!(tcp_config.get_rt_timeout() == 50);
    Ok(TcpConnection::new(tcp_config))
}

/// Serializes and sends everything `connection` has queued.
fn transmit(connection: &mut TcpConnection, tx: &Sender<Vec<u8>>, src_port: u16, dst_port: u16) {
    for mut segment in connection.segments_out().drain(..) {
        segment.header.src_port = src_port;
        segment.header.dst_port = dst_port;
        // The peer may already be gone.
        tx.send(segment.serialize()).ok();
    }
}

/// Receives whatever arrives within one millisecond and advances the clock by as much.
fn poll(connection: &mut TcpConnection, rx: &Receiver<Vec<u8>>) -> Result<()> {
    if let Ok(bytes) = rx.recv_timeout(Duration::from_millis(1)) {
        let segment: TcpSegment = TcpSegment::parse(&bytes)?;
        connection.segment_received(&segment);
        for bytes in rx.try_iter() {
            let segment: TcpSegment = TcpSegment::parse(&bytes)?;
            connection.segment_received(&segment);
        }
    }
    connection.tick(1);
    Ok(())
}

fn read_all(connection: &mut TcpConnection) -> Vec<u8> {
    let len: usize = connection.inbound_stream().buffer_size();
    connection.inbound_stream_mut().read(len)
}

//======================================================================================================================
// Tests
//======================================================================================================================

/// Alice echoes back, upper-cased, everything Bob sends, and closes once Bob is done.
#[test]
fn tcp_echo_over_channels() -> Result<()> {
    let (alice_tx, alice_rx): (Sender<Vec<u8>>, Receiver<Vec<u8>>) = crossbeam_channel::unbounded();
    let (bob_tx, bob_rx): (Sender<Vec<u8>>, Receiver<Vec<u8>>) = crossbeam_channel::unbounded();

    let message: Vec<u8> = b"the quick brown fox jumps over the lazy dog. ".repeat(200);
    let expected: Vec<u8> = message.to_ascii_uppercase();

    let alice: JoinHandle<Result<()>> = thread::spawn(move || {
        let mut connection: TcpConnection = new_connection(1000)?;
        let mut pending: Vec<u8> = Vec::new();
        while connection.active() {
            poll(&mut connection, &bob_rx)?;
            pending.extend(read_all(&mut connection).to_ascii_uppercase());
            let nbytes: usize = connection.write(&pending);
            pending.drain(..nbytes);
            if pending.is_empty() && connection.inbound_stream().eof() {
                connection.end_input_stream();
            }
            transmit(&mut connection, &alice_tx, ALICE_PORT, BOB_PORT);
        }
        anyhow::ensure!(!connection.inbound_stream().error(), "alice was reset");
        Ok(())
    });

    let bob: JoinHandle<Result<Vec<u8>>> = thread::spawn(move || {
        let mut connection: TcpConnection = new_connection(2000)?;
        let mut sent: usize = 0;
        let mut received: Vec<u8> = Vec::new();
        connection.connect();
        transmit(&mut connection, &bob_tx, BOB_PORT, ALICE_PORT);
        while connection.active() {
            poll(&mut connection, &alice_rx)?;
            if sent < message.len() {
                sent += connection.write(&message[sent..]);
                if sent == message.len() {
                    connection.end_input_stream();
                }
            }
            received.extend(read_all(&mut connection));
            transmit(&mut connection, &bob_tx, BOB_PORT, ALICE_PORT);
        }
        anyhow::ensure!(!connection.inbound_stream().error(), "bob was reset");
        received.extend(read_all(&mut connection));
        Ok(received)
    });

    match alice.join() {
        Ok(result) => result?,
        Err(_) => anyhow::bail!("alice panicked"),
    }
    let received: Vec<u8> = match bob.join() {
        Ok(result) => result?,
        Err(_) => anyhow::bail!("bob panicked"),
    };
    anyhow::ensure!(received == expected, "echo mismatch ({} bytes received)", received.len());

    Ok(())
}

/// Corrupted segments fail to decode, are dropped, and the data gets through on retransmission.
#[test]
fn tcp_corrupted_segment_is_retransmitted() -> Result<()> {
    let (tx, rx): (Sender<Vec<u8>>, Receiver<Vec<u8>>) = crossbeam_channel::unbounded();
    let mut client: TcpConnection = new_connection(10)?;
    let mut server: TcpConnection = new_connection(20)?;

    // Handshake.
    client.connect();
    for _ in 0..2 {
        transmit(&mut client, &tx, BOB_PORT, ALICE_PORT);
        for bytes in rx.try_iter() {
            server.segment_received(&TcpSegment::parse(&bytes)?);
        }
        transmit(&mut server, &tx, ALICE_PORT, BOB_PORT);
        for bytes in rx.try_iter() {
            client.segment_received(&TcpSegment::parse(&bytes)?);
        }
    }
    anyhow::ensure!(client.bytes_in_flight() == 0 && server.bytes_in_flight() == 0);

    // Flip a payload bit in transit.
    client.write(b"fragile payload");
    transmit(&mut client, &tx, BOB_PORT, ALICE_PORT);
    let mut bytes: Vec<u8> = rx.try_recv()?;
    let last: usize = bytes.len() - 1;
    bytes[last] ^= 0x01;
    match TcpSegment::parse(&bytes) {
        Err(Fail { errno, .. }) => anyhow::ensure!(errno == libc::EBADMSG),
        Ok(_) => anyhow::bail!("corrupted segment decoded"),
    }

    // Retransmission.
    client.tick(50);
    transmit(&mut client, &tx, BOB_PORT, ALICE_PORT);
    let segment: TcpSegment = TcpSegment::parse(&rx.try_recv()?)?;
    anyhow::ensure!(segment.header.src_port == BOB_PORT);
    server.segment_received(&segment);
    anyhow::ensure!(read_all(&mut server) == b"fragile payload".to_vec());

    Ok(())
}
