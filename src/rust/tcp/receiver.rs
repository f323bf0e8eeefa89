// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//======================================================================================================================
// Imports
//======================================================================================================================

use crate::{
    collections::byte_stream::ByteStream,
    tcp::{
        reassembler::StreamReassembler,
        segment::TcpSegment,
        SeqNumber,
    },
};

//======================================================================================================================
// Structures
//======================================================================================================================

/// The receiving half of a connection.
///
/// Latches the peer's ISN from its SYN, places every acceptable segment in the reassembler, and derives the
/// acknowledgment number and window advertised back to the peer.
pub struct TcpReceiver {
    reassembler: StreamReassembler,
    // Peer's initial sequence number, known once its SYN arrives.
    isn: Option<SeqNumber>,
    // Absolute sequence number just past the peer's FIN, known once a FIN fits in our window.
    fin_abs_seq: Option<u64>,
}

//======================================================================================================================
// Associated Functions
//======================================================================================================================

impl TcpReceiver {
    pub fn new(capacity: usize) -> Self {
        Self {
            reassembler: StreamReassembler::new(capacity),
            isn: None,
            fin_abs_seq: None,
        }
    }

    /// Processes an inbound segment. Returns whether any part of it was acceptable.
    pub fn segment_received(&mut self, segment: &TcpSegment) -> bool {
        let old_abs_ackno: u64 = match self.isn {
            Some(_) => self.abs_ackno(),
            None => 0,
        };

        if segment.header.syn && self.isn.is_none() {
            self.isn = Some(segment.header.seq_num);
        }
        let isn: SeqNumber = match self.isn {
            Some(isn) => isn,
            None => {
                trace!("segment_received(): dropping segment before SYN");
                return false;
            },
        };

        let checkpoint: u64 = self.reassembler.stream_out().bytes_written();
        let abs_seq: u64 = segment.header.seq_num.unwrap(isn, checkpoint);
        let len: u64 = segment.length_in_sequence_space() as u64;
        let window: u64 = self.window_size() as u64;

        // Bare acknowledgment once the peer's FIN has been seen.
        if let Some(fin_abs_seq) = self.fin_abs_seq {
            if len == 0 && abs_seq >= fin_abs_seq {
                return true;
            }
        }

        let in_window: bool = abs_seq < old_abs_ackno + window && abs_seq + len > old_abs_ackno;
        if !in_window {
            if len == 0 && abs_seq == old_abs_ackno {
                return true;
            }
            trace!(
                "segment_received(): dropping segment [{}, {}) outside window [{}, {})",
                abs_seq,
                abs_seq + len,
                old_abs_ackno,
                old_abs_ackno + window
            );
            return false;
        }

        // Only trust a FIN whose position falls inside the window.
        if segment.header.fin && abs_seq + len <= old_abs_ackno + window {
            self.fin_abs_seq = Some(abs_seq + len);
        }

        // The SYN occupies absolute index 0 but no stream index.
        let stream_index: u64 = abs_seq.saturating_sub(1);
        let stream_end: u64 = stream_index + segment.payload.len() as u64;
        let eof: bool = match self.fin_abs_seq {
            Some(fin_abs_seq) => stream_end + 2 == fin_abs_seq,
            None => false,
        };
        self.reassembler.push_substring(&segment.payload, stream_index, eof);

        true
    }

    /// Acknowledgment number to advertise, once the peer's ISN is known.
    pub fn ackno(&self) -> Option<SeqNumber> {
        self.isn.map(|isn| SeqNumber::wrap(self.abs_ackno(), isn))
    }

    /// Room left in the output stream.
    pub fn window_size(&self) -> usize {
        self.reassembler.stream_out().remaining_capacity()
    }

    pub fn unassembled_bytes(&self) -> usize {
        self.reassembler.unassembled_bytes()
    }

    pub fn stream_out(&self) -> &ByteStream {
        self.reassembler.stream_out()
    }

    pub fn stream_out_mut(&mut self) -> &mut ByteStream {
        self.reassembler.stream_out_mut()
    }

    fn abs_ackno(&self) -> u64 {
        let abs_ackno: u64 = 1 + self.reassembler.stream_out().bytes_written();
        match self.fin_abs_seq {
            // Every byte before the FIN is in, so the FIN is acknowledged as well.
            Some(fin_abs_seq) if abs_ackno + 1 == fin_abs_seq => fin_abs_seq,
            _ => abs_ackno,
        }
    }
}

//======================================================================================================================
// Unit Tests
//======================================================================================================================
