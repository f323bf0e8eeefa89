// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//==============================================================================
// Imports
//==============================================================================

use crate::{
    runtime::network::consts::{
        DEFAULT_CAPACITY,
        MAX_PAYLOAD_SIZE,
        MAX_RETX_ATTEMPTS,
        TIMEOUT_DFLT,
    },
    tcp::SeqNumber,
};

//==============================================================================
// Structures
//==============================================================================

/// TCP Configuration Descriptor
#[derive(Clone, Debug)]
pub struct TcpConfig {
    /// Capacity of the outbound byte stream.
    send_capacity: usize,
    /// Capacity of the inbound byte stream (and thus the largest window we advertise).
    recv_capacity: usize,
    /// Initial retransmission timeout, in milliseconds.
    rt_timeout: u16,
    /// Consecutive retransmissions tolerated before the connection is reset.
    max_retx_attempts: u32,
    /// Payload bytes per segment.
    max_payload_size: usize,
    /// Initial sequence number to use instead of a random one.
    fixed_isn: Option<SeqNumber>,
}

//==============================================================================
// Associate Functions
//==============================================================================

/// Associate Functions for TCP Configuration Descriptor
impl TcpConfig {
    /// Creates a TCP Configuration Descriptor.
    pub fn new(
        send_capacity: Option<usize>,
        recv_capacity: Option<usize>,
        rt_timeout: Option<u16>,
        max_retx_attempts: Option<u32>,
        max_payload_size: Option<usize>,
        fixed_isn: Option<SeqNumber>,
    ) -> Self {
        let mut options = Self::default();

        if let Some(value) = send_capacity {
            options = options.set_send_capacity(value);
        }
        if let Some(value) = recv_capacity {
            options = options.set_recv_capacity(value);
        }
        if let Some(value) = rt_timeout {
            options = options.set_rt_timeout(value);
        }
        if let Some(value) = max_retx_attempts {
            options.max_retx_attempts = value;
        }
        if let Some(value) = max_payload_size {
            options = options.set_max_payload_size(value);
        }
        options.fixed_isn = fixed_isn;

        options
    }

    /// Gets the outbound stream capacity in the target [TcpConfig].
    pub fn get_send_capacity(&self) -> usize {
        self.send_capacity
    }

    /// Gets the inbound stream capacity in the target [TcpConfig].
    pub fn get_recv_capacity(&self) -> usize {
        self.recv_capacity
    }

    /// Gets the initial retransmission timeout (in milliseconds) in the target [TcpConfig].
    pub fn get_rt_timeout(&self) -> u16 {
        self.rt_timeout
    }

    /// Gets the maximum number of consecutive retransmissions in the target [TcpConfig].
    pub fn get_max_retx_attempts(&self) -> u32 {
        self.max_retx_attempts
    }

    /// Gets the maximum payload size in the target [TcpConfig].
    pub fn get_max_payload_size(&self) -> usize {
        self.max_payload_size
    }

    /// Gets the fixed initial sequence number in the target [TcpConfig], if any.
    pub fn get_fixed_isn(&self) -> Option<SeqNumber> {
        self.fixed_isn
    }

    /// Sets the outbound stream capacity in the target [TcpConfig].
    fn set_send_capacity(mut self, value: usize) -> Self {
        assert!(value > 0);
        self.send_capacity = value;
        self
    }

    /// Sets the inbound stream capacity in the target [TcpConfig].
    fn set_recv_capacity(mut self, value: usize) -> Self {
        assert!(value > 0);
        self.recv_capacity = value;
        self
    }

    /// Sets the initial retransmission timeout in the target [TcpConfig].
    fn set_rt_timeout(mut self, value: u16) -> Self {
        assert!(value > 0);
        self.rt_timeout = value;
        self
    }

    /// Sets the maximum payload size in the target [TcpConfig].
    fn set_max_payload_size(mut self, value: usize) -> Self {
        assert!(value > 0);
        self.max_payload_size = value;
        self
    }
}

//==============================================================================
// Trait Implementations
//==============================================================================

/// Default Trait Implementation for TCP Configuration Descriptor
impl Default for TcpConfig {
    /// Creates a TCP Configuration Descriptor with the default values.
    fn default() -> Self {
        TcpConfig {
            send_capacity: DEFAULT_CAPACITY,
            recv_capacity: DEFAULT_CAPACITY,
            rt_timeout: TIMEOUT_DFLT,
            max_retx_attempts: MAX_RETX_ATTEMPTS,
            max_payload_size: MAX_PAYLOAD_SIZE,
            fixed_isn: None,
        }
    }
}

//==============================================================================
// Unit Tests
//==============================================================================
