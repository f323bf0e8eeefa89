// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//======================================================================================================================
// Imports
//======================================================================================================================

use crate::{
    collections::byte_stream::ByteStream,
    runtime::network::{
        config::TcpConfig,
        consts::{
            LINGER_RTO_MULTIPLIER,
            MAX_WINDOW_SIZE,
        },
    },
    tcp::{
        isn_generator::IsnGenerator,
        receiver::TcpReceiver,
        segment::TcpSegment,
        sender::TcpSender,
        SeqNumber,
    },
};
use ::std::{
    cmp,
    collections::VecDeque,
};

//======================================================================================================================
// Structures
//======================================================================================================================

/// One endpoint of a connection: a [TcpSender] and a [TcpReceiver] glued together.
///
/// The connection is driven from the outside. Inbound segments go to [TcpConnection::segment_received], the passage
/// of time to [TcpConnection::tick], and application data to [TcpConnection::write]. Whatever has to go on the wire
/// shows up in [TcpConnection::segments_out]. Nothing here blocks or reads a clock.
///
/// There is no explicit state variable. Where we are in the handshake or teardown follows from what the sender has
/// sent, what the receiver has seen, and the end-of-input flags of both streams.
pub struct TcpConnection {
    config: TcpConfig,
    sender: TcpSender,
    receiver: TcpReceiver,
    // Segments ready for the wire, already stamped with our acknowledgment and window.
    segments_out: VecDeque<TcpSegment>,
    // Cleared when the peer finishes its stream before we finish ours.
    linger_after_streams_finish: bool,
    active: bool,
    time_since_last_segment_received: u64,
}

//======================================================================================================================
// Associated Functions
//======================================================================================================================

impl TcpConnection {
    pub fn new(config: TcpConfig) -> Self {
        let isn: SeqNumber = IsnGenerator::new(config.get_fixed_isn()).generate();
        let sender: TcpSender = TcpSender::new(&config, isn);
        let receiver: TcpReceiver = TcpReceiver::new(config.get_recv_capacity());
        Self {
            config,
            sender,
            receiver,
            segments_out: VecDeque::new(),
            linger_after_streams_finish: true,
            active: true,
            time_since_last_segment_received: 0,
        }
    }

    /// Active open: sends our SYN.
    pub fn connect(&mut self) {
        self.sender.fill_window();
        self.send_sender_segments();
    }

    /// Processes a segment that arrived from the peer.
    pub fn segment_received(&mut self, segment: &TcpSegment) {
        if !self.active {
            return;
        }
        self.time_since_last_segment_received = 0;

        // LISTEN: nothing sent, nothing received. Only a SYN gets us going.
        if self.receiver.ackno().is_none() && self.sender.next_seqno_absolute() == 0 {
            if !segment.header.syn {
                trace!("segment_received(): dropping non-SYN segment while listening");
                return;
            }
            self.receiver.segment_received(segment);
            self.connect();
            return;
        }

        // SYN_SENT: our SYN is out and unacknowledged, and we have not heard from the peer.
        if self.sender.next_seqno_absolute() > 0
            && self.sender.bytes_in_flight() == self.sender.next_seqno_absolute()
            && self.receiver.ackno().is_none()
        {
            if !segment.payload.is_empty() {
                trace!("segment_received(): dropping segment with payload while in SYN_SENT");
                return;
            }
            if !segment.header.ack {
                // Simultaneous open.
                if segment.header.syn {
                    self.receiver.segment_received(segment);
                    self.sender.send_empty_segment();
                    self.send_sender_segments();
                }
                return;
            }
            if segment.header.rst {
                warn!("segment_received(): connection refused by peer");
                self.receiver.stream_out_mut().set_error();
                self.sender.stream_in_mut().set_error();
                self.active = false;
                return;
            }
        }

        self.receiver.segment_received(segment);

        match segment.header.ackno() {
            Some(ackno) => self.sender.ack_received(ackno, segment.header.window_size),
            None => self.sender.fill_window(),
        }

        // Data with nothing to piggyback the acknowledgment on still needs acknowledging.
        if self.sender.stream_in().buffer_empty() && segment.length_in_sequence_space() > 0 {
            self.sender.send_empty_segment();
        }

        if segment.header.rst {
            warn!("segment_received(): connection reset by peer");
            self.unclean_shutdown();
            return;
        }

        self.send_sender_segments();
    }

    /// Queues application data for sending. Returns how many bytes were accepted.
    pub fn write(&mut self, data: &[u8]) -> usize {
        if data.is_empty() || !self.active {
            return 0;
        }
        let nbytes: usize = self.sender.stream_in_mut().write(data);
        self.sender.fill_window();
        self.send_sender_segments();
        nbytes
    }

    /// Signals that the application has nothing more to send.
    pub fn end_input_stream(&mut self) {
        if !self.active {
            return;
        }
        self.sender.stream_in_mut().end_input();
        self.sender.fill_window();
        self.send_sender_segments();
    }

    /// Advances time by `ms_since_last_tick` milliseconds.
    pub fn tick(&mut self, ms_since_last_tick: u64) {
        if !self.active {
            return;
        }
        self.time_since_last_segment_received += ms_since_last_tick;
        self.sender.tick(ms_since_last_tick);

        if self.sender.consecutive_retransmissions() > self.config.get_max_retx_attempts() {
            warn!(
                "tick(): giving up after {} consecutive retransmissions",
                self.sender.consecutive_retransmissions()
            );
            self.unclean_shutdown();
            return;
        }

        self.send_sender_segments();
    }

    /// Segments ready for the wire. The caller is expected to drain this.
    pub fn segments_out(&mut self) -> &mut VecDeque<TcpSegment> {
        &mut self.segments_out
    }

    /// Bytes the application can still write right now.
    pub fn remaining_outbound_capacity(&self) -> usize {
        self.sender.stream_in().remaining_capacity()
    }

    pub fn bytes_in_flight(&self) -> u64 {
        self.sender.bytes_in_flight()
    }

    pub fn unassembled_bytes(&self) -> usize {
        self.receiver.unassembled_bytes()
    }

    pub fn time_since_last_segment_received(&self) -> u64 {
        self.time_since_last_segment_received
    }

    /// Whether the connection is still alive, i.e. neither closed cleanly nor reset.
    pub fn active(&self) -> bool {
        self.active
    }

    /// Bytes received from the peer, in order.
    pub fn inbound_stream(&self) -> &ByteStream {
        self.receiver.stream_out()
    }

    pub fn inbound_stream_mut(&mut self) -> &mut ByteStream {
        self.receiver.stream_out_mut()
    }

    pub fn sender(&self) -> &TcpSender {
        &self.sender
    }

    pub fn receiver(&self) -> &TcpReceiver {
        &self.receiver
    }

    /// Moves everything the sender produced to our outbound queue, stamping acknowledgment and window on the way.
    fn send_sender_segments(&mut self) {
        while let Some(mut segment) = self.sender.segments_out().pop_front() {
            self.stamp(&mut segment);
            self.segments_out.push_back(segment);
        }
        self.clean_shutdown();
    }

    fn stamp(&self, segment: &mut TcpSegment) {
        if let Some(ackno) = self.receiver.ackno() {
            segment.header.ack = true;
            segment.header.ack_num = ackno;
            segment.header.window_size = cmp::min(self.receiver.window_size(), MAX_WINDOW_SIZE) as u16;
        }
    }

    /// Aborts the connection and tells the peer with a RST.
    fn unclean_shutdown(&mut self) {
        self.receiver.stream_out_mut().set_error();
        self.sender.stream_in_mut().set_error();
        self.active = false;

        // Anything the sender still had queued is moot now.
        self.sender.segments_out().clear();
        let mut segment: TcpSegment = self.sender.empty_segment();
        segment.header.rst = true;
        self.stamp(&mut segment);
        warn!("unclean_shutdown(): sending RST (seq={})", segment.header.seq_num);
        self.segments_out.push_back(segment);
    }

    /// Deactivates the connection once both streams are finished and everything we sent has been acknowledged.
    fn clean_shutdown(&mut self) {
        if !self.receiver.stream_out().input_ended() {
            return;
        }

        // The peer finished first, so it is the one that lingers.
        if !self.sender.stream_in().eof() {
            self.linger_after_streams_finish = false;
            return;
        }

        if !self.sender.fin_sent() || self.sender.bytes_in_flight() != 0 {
            return;
        }

        let linger_timeout: u64 = LINGER_RTO_MULTIPLIER * self.config.get_rt_timeout() as u64;
        if !self.linger_after_streams_finish || self.time_since_last_segment_received >= linger_timeout {
            debug!(
                "clean_shutdown(): connection closed (lingered={})",
                self.linger_after_streams_finish
            );
            self.active = false;
        }
    }
}

//======================================================================================================================
// Trait Implementations
//======================================================================================================================

impl Drop for TcpConnection {
    fn drop(&mut self) {
        if self.active {
            warn!("drop(): unclean shutdown of active connection");
            self.unclean_shutdown();
        }
    }
}

//======================================================================================================================
// Unit Tests
//======================================================================================================================
