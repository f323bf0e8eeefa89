// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//======================================================================================================================
// Constants
//======================================================================================================================

/// Default capacity (in bytes) of the inbound and outbound byte streams.
pub const DEFAULT_CAPACITY: usize = 64000;

/// Maximum number of payload bytes carried by a single segment.
pub const MAX_PAYLOAD_SIZE: usize = 1000;

/// Default initial retransmission timeout, in milliseconds.
pub const TIMEOUT_DFLT: u16 = 1000;

/// Maximum number of consecutive retransmissions before the connection is abandoned.
pub const MAX_RETX_ATTEMPTS: u32 = 8;

/// How long (as a multiple of the initial retransmission timeout) the endpoint that closes first lingers before it
/// deactivates.
pub const LINGER_RTO_MULTIPLIER: u64 = 10;

/// Largest window the 16-bit header field can advertise.
pub const MAX_WINDOW_SIZE: usize = u16::MAX as usize;
