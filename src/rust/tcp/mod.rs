// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

pub mod connection;
pub mod isn_generator;
pub mod reassembler;
pub mod receiver;
pub mod segment;
pub mod sender;
mod sequence_number;

#[cfg(test)]
mod tests;

pub use self::{
    segment::{
        MAX_TCP_HEADER_SIZE,
        MIN_TCP_HEADER_SIZE,
    },
    sequence_number::SeqNumber,
};
