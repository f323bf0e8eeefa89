// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//======================================================================================================================
// Imports
//======================================================================================================================

use crate::{
    runtime::fail::Fail,
    tcp::SeqNumber,
};
use ::libc::EBADMSG;
use ::std::slice::ChunksExact;

//======================================================================================================================
// Constants
//======================================================================================================================

pub const MIN_TCP_HEADER_SIZE: usize = 20;
pub const MAX_TCP_HEADER_SIZE: usize = 60;

//======================================================================================================================
// Structures
//======================================================================================================================

/// Header fields the state machine reads and writes.
///
/// The acknowledgment number is only meaningful when `ack` is set. Ports are carried for the transport's benefit and
/// are never interpreted here.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TcpHeader {
    pub src_port: u16,
    pub dst_port: u16,
    pub seq_num: SeqNumber,
    pub ack_num: SeqNumber,
    pub ack: bool,
    pub rst: bool,
    pub syn: bool,
    pub fin: bool,
    pub window_size: u16,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TcpSegment {
    pub header: TcpHeader,
    pub payload: Vec<u8>,
}

//======================================================================================================================
// Associated Functions
//======================================================================================================================

impl TcpHeader {
    /// Acknowledgment number, if the ACK flag is set.
    pub fn ackno(&self) -> Option<SeqNumber> {
        if self.ack {
            Some(self.ack_num)
        } else {
            None
        }
    }

    fn serialize(&self) -> [u8; MIN_TCP_HEADER_SIZE] {
        let mut fixed_buf: [u8; MIN_TCP_HEADER_SIZE] = [0; MIN_TCP_HEADER_SIZE];

        fixed_buf[0..2].copy_from_slice(&self.src_port.to_be_bytes());
        fixed_buf[2..4].copy_from_slice(&self.dst_port.to_be_bytes());
        fixed_buf[4..8].copy_from_slice(&u32::from(self.seq_num).to_be_bytes());
        fixed_buf[8..12].copy_from_slice(&u32::from(self.ack_num).to_be_bytes());

        // Data offset (in 32-bit words), no options.
        fixed_buf[12] = ((MIN_TCP_HEADER_SIZE / 4) as u8) << 4;

        let mut flags: u8 = 0;
        if self.ack {
            flags |= 1 << 4;
        }
        if self.rst {
            flags |= 1 << 2;
        }
        if self.syn {
            flags |= 1 << 1;
        }
        if self.fin {
            flags |= 1 << 0;
        }
        fixed_buf[13] = flags;

        fixed_buf[14..16].copy_from_slice(&self.window_size.to_be_bytes());

        // Checksum is filled in by the caller once the payload is in place.
        fixed_buf[16..18].copy_from_slice(&[0, 0]);

        // Urgent pointer.
        fixed_buf[18..20].copy_from_slice(&[0, 0]);

        fixed_buf
    }
}

impl TcpSegment {
    /// Number of sequence numbers this segment occupies: its payload plus one each for SYN and FIN.
    pub fn length_in_sequence_space(&self) -> usize {
        self.payload.len() + self.header.syn as usize + self.header.fin as usize
    }

    /// Encodes this segment as a standard 20-byte TCP header (no options) followed by the payload.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf: Vec<u8> = Vec::with_capacity(MIN_TCP_HEADER_SIZE + self.payload.len());
        buf.extend_from_slice(&self.header.serialize());
        buf.extend_from_slice(&self.payload);

        let checksum: u16 = tcp_checksum(&buf[..MIN_TCP_HEADER_SIZE], &self.payload);
        buf[16..18].copy_from_slice(&checksum.to_be_bytes());
        buf
    }

    /// Decodes a segment. Options are validated for length and then skipped.
    pub fn parse(buf: &[u8]) -> Result<Self, Fail> {
        if buf.len() < MIN_TCP_HEADER_SIZE {
            return Err(Fail::new(EBADMSG, "TCP segment too small"));
        }
        let data_offset: usize = (buf[12] >> 4) as usize * 4;
        if buf.len() < data_offset {
            return Err(Fail::new(EBADMSG, "TCP segment smaller than data offset"));
        }
        if data_offset < MIN_TCP_HEADER_SIZE {
            return Err(Fail::new(EBADMSG, "TCP data offset too small"));
        }
        if data_offset > MAX_TCP_HEADER_SIZE {
            return Err(Fail::new(EBADMSG, "TCP data offset too large"));
        }
        let (hdr_buf, data_buf): (&[u8], &[u8]) = buf.split_at(data_offset);

        let checksum: u16 = u16::from_be_bytes([hdr_buf[16], hdr_buf[17]]);
        if checksum != tcp_checksum(hdr_buf, data_buf) {
            return Err(Fail::new(EBADMSG, "TCP checksum mismatch"));
        }

        let header: TcpHeader = TcpHeader {
            src_port: u16::from_be_bytes([hdr_buf[0], hdr_buf[1]]),
            dst_port: u16::from_be_bytes([hdr_buf[2], hdr_buf[3]]),
            seq_num: SeqNumber::from(u32::from_be_bytes([hdr_buf[4], hdr_buf[5], hdr_buf[6], hdr_buf[7]])),
            ack_num: SeqNumber::from(u32::from_be_bytes([hdr_buf[8], hdr_buf[9], hdr_buf[10], hdr_buf[11]])),
            ack: (hdr_buf[13] & (1 << 4)) != 0,
            rst: (hdr_buf[13] & (1 << 2)) != 0,
            syn: (hdr_buf[13] & (1 << 1)) != 0,
            fin: (hdr_buf[13] & (1 << 0)) != 0,
            window_size: u16::from_be_bytes([hdr_buf[14], hdr_buf[15]]),
        };

        Ok(Self {
            header,
            payload: data_buf.to_vec(),
        })
    }
}

//======================================================================================================================
// Standalone Functions
//======================================================================================================================

/// Internet checksum over the header (with its checksum field treated as zero) and the payload.
///
/// Without an IP layer underneath there is no pseudo-header to fold in.
fn tcp_checksum(header: &[u8], data: &[u8]) -> u16 {
    let mut state: u32 = 0xffff;

    // Everything up to the checksum field.
    for chunk in header[..16].chunks_exact(2) {
        state += u16::from_be_bytes([chunk[0], chunk[1]]) as u32;
    }

    // Skip the checksum field itself and continue with the urgent pointer and options.
    for chunk in header[18..].chunks_exact(2) {
        state += u16::from_be_bytes([chunk[0], chunk[1]]) as u32;
    }

    let mut chunks_iter: ChunksExact<u8> = data.chunks_exact(2);
    while let Some(chunk) = chunks_iter.next() {
        state += u16::from_be_bytes([chunk[0], chunk[1]]) as u32;
        // Fold eagerly so large payloads cannot overflow the accumulator.
        state = (state & 0xffff) + (state >> 16);
    }
    if let Some(&b) = chunks_iter.remainder().first() {
        state += u16::from_be_bytes([b, 0]) as u32;
    }

    while state > 0xffff {
        state -= 0xffff;
    }
    !state as u16
}

//======================================================================================================================
// Unit Tests
//======================================================================================================================
