// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//======================================================================================================================
// Imports
//======================================================================================================================

use ::std::{
    cmp,
    collections::VecDeque,
    fmt,
};

//======================================================================================================================
// Structures
//======================================================================================================================

/// A capacity-bounded, in-memory FIFO of bytes.
///
/// The writer side appends with [ByteStream::write] and eventually calls [ByteStream::end_input]. The reader side
/// consumes with [ByteStream::peek_output], [ByteStream::pop_output] or [ByteStream::read]. Neither side ever blocks:
/// writes are truncated to the remaining capacity and reads return whatever is buffered.
pub struct ByteStream {
    // Buffered bytes, oldest first.
    buffer: VecDeque<u8>,
    // Maximum number of buffered bytes.
    capacity: usize,
    // Total number of bytes ever accepted by write().
    bytes_written: u64,
    // Total number of bytes ever popped.
    bytes_read: u64,
    // The writer is done.
    input_ended: bool,
    // The stream suffered an unrecoverable fault.
    error: bool,
}

//======================================================================================================================
// Associated Functions
//======================================================================================================================

impl ByteStream {
    /// Creates a byte stream that buffers at most `capacity` bytes.
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: VecDeque::with_capacity(capacity),
            capacity,
            bytes_written: 0,
            bytes_read: 0,
            input_ended: false,
            error: false,
        }
    }

    /// Appends as much of `data` as fits and returns the number of bytes accepted.
    pub fn write(&mut self, data: &[u8]) -> usize {
        if self.error || self.input_ended {
            trace!("write(): stream closed, dropping {} bytes", data.len());
            return 0;
        }

        let len: usize = cmp::min(data.len(), self.remaining_capacity());
        self.buffer.extend(&data[..len]);
        self.bytes_written += len as u64;
        len
    }

    /// Copies up to `len` bytes from the front of the stream without consuming them.
    pub fn peek_output(&self, len: usize) -> Vec<u8> {
        let len: usize = cmp::min(len, self.buffer.len());
        self.buffer.iter().take(len).copied().collect()
    }

    /// Discards up to `len` bytes from the front of the stream.
    pub fn pop_output(&mut self, len: usize) {
        let len: usize = cmp::min(len, self.buffer.len());
        self.buffer.drain(..len);
        self.bytes_read += len as u64;
    }

    /// Reads (i.e. copies and then pops) up to `len` bytes from the front of the stream.
    pub fn read(&mut self, len: usize) -> Vec<u8> {
        let data: Vec<u8> = self.peek_output(len);
        self.pop_output(data.len());
        data
    }

    /// Signals that the writer is done. Idempotent.
    pub fn end_input(&mut self) {
        self.input_ended = true;
    }

    /// Flags the stream as failed. Idempotent.
    pub fn set_error(&mut self) {
        self.error = true;
    }

    pub fn input_ended(&self) -> bool {
        self.input_ended
    }

    pub fn error(&self) -> bool {
        self.error
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of bytes currently buffered.
    pub fn buffer_size(&self) -> usize {
        self.buffer.len()
    }

    pub fn buffer_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// The writer is done and every byte has been read.
    pub fn eof(&self) -> bool {
        self.input_ended && self.buffer.is_empty()
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Number of additional bytes that could be buffered right now.
    pub fn remaining_capacity(&self) -> usize {
        self.capacity - self.buffer.len()
    }
}

//======================================================================================================================
// Trait Implementations
//======================================================================================================================

impl fmt::Debug for ByteStream {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ByteStream")
            .field("capacity", &self.capacity)
            .field("buffered", &self.buffer.len())
            .field("bytes_written", &self.bytes_written)
            .field("bytes_read", &self.bytes_read)
            .field("input_ended", &self.input_ended)
            .field("error", &self.error)
            .finish()
    }
}

//======================================================================================================================
// Unit Tests
//======================================================================================================================
