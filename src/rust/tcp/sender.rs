// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//======================================================================================================================
// Imports
//======================================================================================================================

use crate::{
    collections::byte_stream::ByteStream,
    runtime::network::config::TcpConfig,
    tcp::{
        segment::TcpSegment,
        SeqNumber,
    },
};
use ::std::{
    cmp,
    collections::VecDeque,
    fmt,
};

//======================================================================================================================
// Structures
//======================================================================================================================

// Entry on the unacknowledged (a.k.a. retransmission) queue.
struct UnackedSegment {
    // Absolute sequence number of the first position this segment occupies.
    seq_no: u64,
    segment: TcpSegment,
}

/// The sending half of a connection.
///
/// Reads bytes from an outbound [ByteStream], cuts them into segments that fit the peer's advertised window, keeps
/// every sent segment until it is acknowledged, and retransmits the oldest one when the retransmission timer expires.
pub struct TcpSender {
    //
    // Send Sequence Space (absolute):
    //
    //          next_seqno - bytes_in_flight        next_seqno
    //                     v                         v
    // ... ----------------|-------------------------|--------------------------------
    //       acknowledged  |      unacknowledged     |  not yet sent
    //

    // Our initial sequence number, the number of our SYN.
    isn: SeqNumber,

    // Segments ready to go out. The connection drains these and stamps them with acknowledgment information.
    segments_out: VecDeque<TcpSegment>,

    // Sent but not yet acknowledged, oldest first.
    unacked_queue: VecDeque<UnackedSegment>,

    // Bytes the application wants sent.
    stream: ByteStream,

    // Absolute sequence number of the next position to be sent.
    next_seqno: u64,

    syn_sent: bool,
    fin_sent: bool,

    // Sequence space occupied by unacknowledged segments.
    bytes_in_flight: u64,

    // Window most recently advertised by the peer.
    window_size: u16,

    // Worst-case estimate of how much more the peer can take. Goes negative after a zero-window probe.
    free_space: i64,

    // Retransmission timer.
    initial_rto: u64,
    rto: u64,
    time_elapsed: u64,
    timer_running: bool,
    consecutive_retransmissions: u32,

    max_payload_size: usize,
}

//======================================================================================================================
// Associated Functions
//======================================================================================================================

impl TcpSender {
    pub fn new(config: &TcpConfig, isn: SeqNumber) -> Self {
        let initial_rto: u64 = config.get_rt_timeout() as u64;
        Self {
            isn,
            segments_out: VecDeque::new(),
            unacked_queue: VecDeque::new(),
            stream: ByteStream::new(config.get_send_capacity()),
            next_seqno: 0,
            syn_sent: false,
            fin_sent: false,
            bytes_in_flight: 0,
            window_size: 0,
            free_space: 0,
            initial_rto,
            rto: initial_rto,
            time_elapsed: 0,
            timer_running: false,
            consecutive_retransmissions: 0,
            max_payload_size: config.get_max_payload_size(),
        }
    }

    /// Sends as much as the peer's window allows.
    pub fn fill_window(&mut self) {
        if !self.syn_sent {
            self.syn_sent = true;
            let mut segment: TcpSegment = TcpSegment::default();
            segment.header.syn = true;
            self.send_segment(segment);
            return;
        }

        // Nothing goes out until our SYN is acknowledged.
        if let Some(head) = self.unacked_queue.front() {
            if head.segment.header.syn {
                return;
            }
        }

        // Wait for the application to provide more.
        if self.stream.buffer_empty() && !self.stream.eof() {
            return;
        }

        if self.fin_sent {
            return;
        }

        if self.window_size > 0 {
            while self.free_space > 0 {
                let payload_size: usize = cmp::min(
                    cmp::min(self.stream.buffer_size(), self.free_space as usize),
                    self.max_payload_size,
                );
                let mut segment: TcpSegment = TcpSegment::default();
                segment.payload = self.stream.read(payload_size);

                // FIN also takes a position in the window, so it only fits if the window is strictly larger than the
                // payload.
                if self.stream.eof() && self.free_space > payload_size as i64 {
                    segment.header.fin = true;
                    self.fin_sent = true;
                }
                if segment.length_in_sequence_space() == 0 {
                    break;
                }
                self.send_segment(segment);

                if self.stream.buffer_empty() {
                    break;
                }
            }
        } else if self.free_space == 0 {
            // Zero window: probe with one byte (or a bare FIN) so the peer eventually tells us it has room again.
            let mut segment: TcpSegment = TcpSegment::default();
            if self.stream.eof() {
                segment.header.fin = true;
                self.fin_sent = true;
            } else if !self.stream.buffer_empty() {
                segment.payload = self.stream.read(1);
            } else {
                return;
            }
            trace!("fill_window(): probing zero window");
            self.send_segment(segment);
        }
    }

    /// Processes an acknowledgment and window advertisement from the peer.
    pub fn ack_received(&mut self, ackno: SeqNumber, window_size: u16) {
        let abs_ackno: u64 = ackno.unwrap(self.isn, self.next_seqno);
        if !self.ack_valid(abs_ackno) {
            trace!(
                "ack_received(): ignoring ack {} outside [{}, {}]",
                abs_ackno,
                self.next_seqno - self.bytes_in_flight,
                self.next_seqno
            );
            return;
        }

        self.window_size = window_size;
        self.free_space = window_size as i64;

        while let Some(head) = self.unacked_queue.front() {
            let len: u64 = head.segment.length_in_sequence_space() as u64;
            if head.seq_no + len > abs_ackno {
                break;
            }
            self.bytes_in_flight -= len;
            self.unacked_queue.pop_front();

            // New data was acknowledged, so restart the timer from scratch.
            self.time_elapsed = 0;
            self.rto = self.initial_rto;
            self.consecutive_retransmissions = 0;
        }

        // The peer may have buffered everything still in flight; assume it did.
        if let Some(head) = self.unacked_queue.front() {
            self.free_space = abs_ackno as i64 + window_size as i64 - head.seq_no as i64 - self.bytes_in_flight as i64;
        }

        if self.bytes_in_flight == 0 {
            self.timer_running = false;
        }

        debug!(
            "ack_received(): ack={} window={} free_space={} in_flight={}",
            abs_ackno, self.window_size, self.free_space, self.bytes_in_flight
        );

        self.fill_window();
    }

    /// Advances the retransmission timer by `ms_since_last_tick` milliseconds.
    pub fn tick(&mut self, ms_since_last_tick: u64) {
        if !self.timer_running {
            return;
        }

        self.time_elapsed += ms_since_last_tick;
        if self.time_elapsed < self.rto {
            return;
        }

        let head: &UnackedSegment = match self.unacked_queue.front() {
            Some(head) => head,
            None => {
                self.timer_running = false;
                return;
            },
        };
        trace!("tick(): retransmitting segment at {} (rto={})", head.seq_no, self.rto);
        self.segments_out.push_back(head.segment.clone());

        // A peer advertising a zero window is not unreachable, so probing it must not back off.
        if self.window_size > 0 || head.segment.header.syn {
            self.consecutive_retransmissions += 1;
            self.rto = self.rto.saturating_mul(2);
        }
        self.time_elapsed = 0;
    }

    /// Queues a segment that occupies no sequence space (used for bare acknowledgments).
    pub fn send_empty_segment(&mut self) {
        let segment: TcpSegment = self.empty_segment();
        self.segments_out.push_back(segment);
    }

    /// Builds a segment carrying only the current sequence number.
    pub fn empty_segment(&self) -> TcpSegment {
        let mut segment: TcpSegment = TcpSegment::default();
        segment.header.seq_num = self.next_seqno();
        segment
    }

    pub fn stream_in(&self) -> &ByteStream {
        &self.stream
    }

    pub fn stream_in_mut(&mut self) -> &mut ByteStream {
        &mut self.stream
    }

    /// Segments waiting to be handed to the connection.
    pub fn segments_out(&mut self) -> &mut VecDeque<TcpSegment> {
        &mut self.segments_out
    }

    /// Sequence space occupied by segments sent but not yet acknowledged.
    pub fn bytes_in_flight(&self) -> u64 {
        self.bytes_in_flight
    }

    pub fn consecutive_retransmissions(&self) -> u32 {
        self.consecutive_retransmissions
    }

    /// Absolute sequence number of the next position to be sent.
    pub fn next_seqno_absolute(&self) -> u64 {
        self.next_seqno
    }

    pub fn next_seqno(&self) -> SeqNumber {
        SeqNumber::wrap(self.next_seqno, self.isn)
    }

    pub fn isn(&self) -> SeqNumber {
        self.isn
    }

    pub fn fin_sent(&self) -> bool {
        self.fin_sent
    }

    /// An acknowledgment may neither confirm something we have not sent nor go back before the oldest unacknowledged
    /// position.
    fn ack_valid(&self, abs_ackno: u64) -> bool {
        abs_ackno <= self.next_seqno && abs_ackno >= self.next_seqno - self.bytes_in_flight
    }

    fn send_segment(&mut self, mut segment: TcpSegment) {
        segment.header.seq_num = SeqNumber::wrap(self.next_seqno, self.isn);
        let len: u64 = segment.length_in_sequence_space() as u64;

        self.unacked_queue.push_back(UnackedSegment {
            seq_no: self.next_seqno,
            segment: segment.clone(),
        });
        self.segments_out.push_back(segment);

        self.next_seqno += len;
        self.bytes_in_flight += len;
        self.free_space -= len as i64;

        if !self.timer_running {
            self.timer_running = true;
            self.time_elapsed = 0;
        }
    }
}

//======================================================================================================================
// Trait Implementations
//======================================================================================================================

impl fmt::Debug for TcpSender {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("TcpSender")
            .field("isn", &self.isn)
            .field("next_seqno", &self.next_seqno)
            .field("bytes_in_flight", &self.bytes_in_flight)
            .field("window_size", &self.window_size)
            .field("free_space", &self.free_space)
            .field("rto", &self.rto)
            .field("consecutive_retransmissions", &self.consecutive_retransmissions)
            .finish()
    }
}

//======================================================================================================================
// Unit Tests
//======================================================================================================================
