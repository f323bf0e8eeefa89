// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//======================================================================================================================
// Imports
//======================================================================================================================

use crate::collections::byte_stream::ByteStream;
use ::std::cmp;

//======================================================================================================================
// Structures
//======================================================================================================================

/// Reassembles possibly out-of-order, overlapping, or duplicated substrings of a byte stream into an in-order
/// [ByteStream].
///
/// The reassembler only holds bytes inside a window of `capacity` stream indices starting at the first index not yet
/// delivered (`rpos`):
///
/// ```text
///               rpos                                  rpos + capacity
///                 v                                          v
/// ... delivered  |  held here (circular buffer + bitmap)    |  discarded
/// ```
///
/// Bytes below the window were already delivered; bytes past it are dropped and must be sent again later.
pub struct StreamReassembler {
    // Where in-order bytes end up.
    output: ByteStream,
    // Size of the reorder window.
    capacity: usize,
    // Circular storage for the window. Stream index i lives at slot i % capacity.
    buffer: Vec<u8>,
    // Which slots of `buffer` hold valid bytes.
    bitmap: Vec<bool>,
    // First stream index not yet delivered to `output`.
    rpos: u64,
    // Number of set slots in `bitmap`.
    unassembled_bytes: usize,
    // Stream index one past the last byte, once some substring has told us.
    eof_index: Option<u64>,
}

//======================================================================================================================
// Associated Functions
//======================================================================================================================

impl StreamReassembler {
    /// Creates a reassembler whose reorder window and output stream both hold `capacity` bytes.
    pub fn new(capacity: usize) -> Self {
        Self {
            output: ByteStream::new(capacity),
            capacity,
            buffer: vec![0; capacity],
            bitmap: vec![false; capacity],
            rpos: 0,
            unassembled_bytes: 0,
            eof_index: None,
        }
    }

    /// Accepts the substring `data` that starts at stream index `index`. When `eof` is set, the stream ends right
    /// after `data`.
    pub fn push_substring(&mut self, data: &[u8], index: u64, eof: bool) {
        let window_end: u64 = self.rpos + self.capacity as u64;
        let start: u64 = cmp::max(self.rpos, index);
        let end: u64 = cmp::min(window_end, index + data.len() as u64);

        // Store whatever part of the substring fits in the window. Rewriting an occupied slot is harmless: the byte
        // is the same.
        for i in start..end {
            let slot: usize = (i % self.capacity as u64) as usize;
            self.buffer[slot] = data[(i - index) as usize];
            if !self.bitmap[slot] {
                self.bitmap[slot] = true;
                self.unassembled_bytes += 1;
            }
        }

        self.flush();

        if eof {
            self.eof_index = Some(index + data.len() as u64);
        }
        if self.eof_index == Some(self.output.bytes_written()) {
            self.output.end_input();
        }
    }

    /// Number of bytes held but not yet written to the output.
    pub fn unassembled_bytes(&self) -> usize {
        self.unassembled_bytes
    }

    pub fn empty(&self) -> bool {
        self.unassembled_bytes == 0
    }

    /// First stream index not yet written to the output.
    pub fn first_unassembled(&self) -> u64 {
        self.rpos
    }

    pub fn stream_out(&self) -> &ByteStream {
        &self.output
    }

    pub fn stream_out_mut(&mut self) -> &mut ByteStream {
        &mut self.output
    }

    /// Writes the longest contiguous run starting at `rpos` into the output stream. If the output is short on room,
    /// the rest stays here for a later flush.
    fn flush(&mut self) {
        let window_end: u64 = self.rpos + self.capacity as u64;
        let mut avail_end: u64 = self.rpos;
        while avail_end < window_end && self.bitmap[(avail_end % self.capacity as u64) as usize] {
            avail_end += 1;
        }
        if avail_end == self.rpos {
            return;
        }

        let run: Vec<u8> = (self.rpos..avail_end)
            .map(|i| self.buffer[(i % self.capacity as u64) as usize])
            .collect();
        let written: usize = self.output.write(&run);
        for i in self.rpos..(self.rpos + written as u64) {
            self.bitmap[(i % self.capacity as u64) as usize] = false;
        }
        self.rpos += written as u64;
        self.unassembled_bytes -= written;
    }
}

//======================================================================================================================
// Unit Tests
//======================================================================================================================
