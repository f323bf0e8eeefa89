// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

#![cfg_attr(feature = "strict", deny(warnings))]
#![deny(clippy::all)]

#[macro_use]
extern crate log;

//======================================================================================================================
// Exports
//======================================================================================================================

pub mod collections;
pub mod config;
pub mod runtime;
pub mod tcp;

pub use self::{
    collections::byte_stream::ByteStream,
    runtime::{
        fail::Fail,
        network::config::TcpConfig,
    },
    tcp::{
        connection::TcpConnection,
        receiver::TcpReceiver,
        reassembler::StreamReassembler,
        segment::{
            TcpHeader,
            TcpSegment,
        },
        sender::TcpSender,
        SeqNumber,
    },
};

//======================================================================================================================
// Macros
//======================================================================================================================

/// Ensures that two expressions are equivalent, bailing out of the enclosing function with an [anyhow::Error]
/// otherwise.
#[macro_export]
macro_rules! ensure_eq {
    ($left:expr, $right:expr $(,)?) => {{
        match (&$left, &$right) {
            (left_val, right_val) => {
                if !(*left_val == *right_val) {
                    ::anyhow::bail!(
                        "ensure failed: `(left == right)`\n  left: `{:?}`,\n right: `{:?}` ({}:{})",
                        left_val,
                        right_val,
                        file!(),
                        line!()
                    )
                }
            },
        }
    }};
}

/// Ensures that two expressions are not equivalent, bailing out of the enclosing function with an [anyhow::Error]
/// otherwise.
#[macro_export]
macro_rules! ensure_neq {
    ($left:expr, $right:expr $(,)?) => {{
        match (&$left, &$right) {
            (left_val, right_val) => {
                if *left_val == *right_val {
                    ::anyhow::bail!(
                        "ensure failed: `(left != right)`\n  left: `{:?}`,\n right: `{:?}` ({}:{})",
                        left_val,
                        right_val,
                        file!(),
                        line!()
                    )
                }
            },
        }
    }};
}
