// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

// This file defines a type to represent a TCP Sequence Number.
//
// The wire carries 32-bit sequence numbers that wrap around modulo 2^32, while the state machine counts positions in
// a 64-bit "absolute" space that never wraps: index 0 is the SYN, each payload byte takes the next index, and a FIN
// takes one final index. Each direction of a connection has its own initial sequence number (ISN). [SeqNumber::wrap]
// and [SeqNumber::unwrap] translate between the two spaces.
//
// Excluding equality, comparisons between wrapping sequence numbers are non-transitive: a < b < c < a is possible.
// That is why they are their own type instead of a bare u32.
//

use ::std::{
    cmp::Ordering,
    convert::From,
    fmt,
};

// Internally, we store sequence numbers as unsigned 32-bit integers.
//
// We allow our sequence numbers to be cloned, copied, created, and checked for equality the same as for u32.  We
// restrict all other behaviors to those we explicitly define below.
//
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct SeqNumber {
    value: u32,
}

impl SeqNumber {
    /// Converts an absolute (64-bit, zero-indexed) sequence number into its on-the-wire form.
    pub fn wrap(absolute: u64, isn: SeqNumber) -> SeqNumber {
        isn + SeqNumber::from(absolute as u32)
    }

    /// Converts this on-the-wire sequence number into the absolute sequence number that wraps to it and lies closest
    /// to `checkpoint`.
    pub fn unwrap(self, isn: SeqNumber, checkpoint: u64) -> u64 {
        let diff: u32 = (self - SeqNumber::wrap(checkpoint, isn)).into();

        // Stepping backwards is closer, unless it would take us below zero.
        if diff & 0x8000_0000 != 0 && (diff as u64).wrapping_add(checkpoint) <= u32::MAX as u64 {
            return checkpoint.wrapping_add(diff as u64);
        }
        checkpoint.wrapping_add(diff as i32 as i64 as u64)
    }
}

// To create a u32 from a sequence number.
impl From<SeqNumber> for u32 {
    #[inline]
    fn from(item: SeqNumber) -> u32 {
        item.value
    }
}

// To create a sequence number from a u32.
impl From<u32> for SeqNumber {
    #[inline]
    fn from(item: u32) -> Self {
        SeqNumber { value: item }
    }
}

// Display a sequence number.
impl fmt::Display for SeqNumber {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.value.fmt(f)
    }
}

// Add two sequence numbers together.
impl ::std::ops::Add for SeqNumber {
    type Output = SeqNumber;

    #[inline]
    fn add(self, other: SeqNumber) -> SeqNumber {
        (self.value.wrapping_add(other.value)).into()
    }
}

// Subtract a sequence number from another one.
impl ::std::ops::Sub for SeqNumber {
    type Output = SeqNumber;

    #[inline]
    fn sub(self, other: SeqNumber) -> SeqNumber {
        (self.value.wrapping_sub(other.value)).into()
    }
}

// The "<", "<=", ">", and ">=" operators compare by signed distance, which only makes sense for numbers less than 2^31
// apart. Sequence numbers are not totally ordered, so partial_cmp answers the same way and never claims equality for
// distinct values.
impl ::std::cmp::PartialOrd for SeqNumber {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        (self.value.wrapping_sub(other.value) as i32).partial_cmp(&0)
    }

    #[inline]
    fn lt(&self, other: &Self) -> bool {
        (self.value.wrapping_sub(other.value) as i32) < 0
    }

    #[inline]
    fn le(&self, other: &Self) -> bool {
        (self.value.wrapping_sub(other.value) as i32) <= 0
    }

    #[inline]
    fn gt(&self, other: &Self) -> bool {
        (self.value.wrapping_sub(other.value) as i32) > 0
    }

    #[inline]
    fn ge(&self, other: &Self) -> bool {
        (self.value.wrapping_sub(other.value) as i32) >= 0
    }
}
