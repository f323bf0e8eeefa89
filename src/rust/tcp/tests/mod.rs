// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

pub mod established;

use crate::{
    runtime::{
        logging,
        network::config::TcpConfig,
    },
    tcp::{
        connection::TcpConnection,
        segment::TcpSegment,
        SeqNumber,
    },
};

//======================================================================================================================

/// Creates a connection with a fixed ISN.
pub fn new_connection(isn: u32, rt_timeout: u16, recv_capacity: Option<usize>) -> TcpConnection {
    logging::initialize();
    let config: TcpConfig = TcpConfig::new(
        None,
        recv_capacity,
        Some(rt_timeout),
        None,
        None,
        Some(SeqNumber::from(isn)),
    );
    TcpConnection::new(config)
}

/// Takes everything `connection` wants to send.
pub fn drain(connection: &mut TcpConnection) -> Vec<TcpSegment> {
    connection.segments_out().drain(..).collect()
}

/// Delivers everything `from` wants to send to `to`. Returns the number of segments delivered.
pub fn deliver(from: &mut TcpConnection, to: &mut TcpConnection) -> usize {
    let segments: Vec<TcpSegment> = drain(from);
    for segment in &segments {
        to.segment_received(segment);
    }
    segments.len()
}

/// Reads everything that has arrived on the inbound stream of `connection`.
pub fn read_all(connection: &mut TcpConnection) -> Vec<u8> {
    let len: usize = connection.inbound_stream().buffer_size();
    connection.inbound_stream_mut().read(len)
}

/// Runs the three-way handshake between `client` and `server`.
pub fn establish(client: &mut TcpConnection, server: &mut TcpConnection) {
    client.connect();
    deliver(client, server);
    deliver(server, client);
    deliver(client, server);
}
