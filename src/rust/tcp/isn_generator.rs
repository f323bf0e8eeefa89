// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

use crate::tcp::SeqNumber;
use ::std::num::Wrapping;

/// Source of initial sequence numbers.
///
/// A fixed ISN (from configuration) is handed out verbatim, which keeps tests deterministic. Otherwise each ISN is a
/// CRC-32 digest of a per-generator random nonce plus a counter, so one generator never repeats itself back to back.
pub struct IsnGenerator {
    nonce: u32,
    counter: Wrapping<u16>,
    fixed_isn: Option<SeqNumber>,
}

impl IsnGenerator {
    pub fn new(fixed_isn: Option<SeqNumber>) -> Self {
        Self::with_nonce(::rand::random::<u32>(), fixed_isn)
    }

    pub fn with_nonce(nonce: u32, fixed_isn: Option<SeqNumber>) -> Self {
        Self {
            nonce,
            counter: Wrapping(0),
            fixed_isn,
        }
    }

    pub fn generate(&mut self) -> SeqNumber {
        if let Some(isn) = self.fixed_isn {
            return isn;
        }

        let crc: crc::Crc<u32> = crc::Crc::<u32>::new(&crc::CRC_32_CKSUM);
        let mut digest = crc.digest();
        digest.update(&self.nonce.to_be_bytes());
        digest.update(&self.counter.0.to_be_bytes());
        let isn = SeqNumber::from(digest.finalize().wrapping_add(self.counter.0 as u32));
        self.counter += Wrapping(1);
        isn
    }
}
