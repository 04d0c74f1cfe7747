//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! # Teletty Telnet Protocol Engine
//!
//! This crate implements the byte level half of a Telnet session (RFC 854/855): it
//! separates command sequences from application data, negotiates options and decodes
//! the subnegotiations a remote login session needs.
//!
//! ## Overview
//!
//! - **Command grammar**: [`consts`] holds the command bytes and option codes.
//! - **Option registry**: [`TelnetOption`] is the canonical option table and
//!   [`NegotiationState`] the per session supported and enabled sets.
//! - **Negotiation**: [`NegotiationEngine`] scans inbound buffers and applies the
//!   decisions of a [`Resolver`]. The two roles, [`ClientResolver`] and
//!   [`ServerResolver`], are selected once through [`Role`].
//! - **Subnegotiation**: [`WindowSize`] (NAWS), [`TerminalTypeCommand`] (TERMINAL-TYPE)
//!   and [`TerminalSpeedCommand`] (TERMINAL-SPEED).
//!
//! ## Negotiation rules
//!
//! A reply is suppressed when the option's enabled state already equals the state the
//! reply would establish, which prevents WILL/DO loops between two agreeing peers.
//! Refusals of unsupported options and the server's `WILL ECHO` answer to `WONT ECHO`
//! do not change state and are therefore always sent.
//!
//! ## Usage Example
//!
//! ```rust
//! use teletty_telnetcodec::{ClientResolver, NegotiationEngine, Role, consts};
//!
//! let mut engine = NegotiationEngine::new(Role::Client(ClientResolver::default()));
//! let hello = engine.initial_requests().unwrap();
//! assert_eq!(hello[0], consts::IAC);
//!
//! // The server asks for our terminal type in the middle of a prompt.
//! let inbound = engine
//!     .process_inbound(&[b'$', b' ', 255, 250, 24, 1, 255, 240])
//!     .unwrap();
//! assert_eq!(&inbound.data[..], b"$ ");
//! assert!(inbound.responses.ends_with(&[b'V', b'T', b'1', b'0', b'0', 255, 240]));
//! ```

#![warn(
    clippy::cargo,
    missing_docs,
    clippy::pedantic,
    future_incompatible,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc
)]

mod args;
pub mod consts;
mod engine;
mod frame;
mod options;
mod resolver;
mod result;

pub use self::args::TelnetArgument;
pub use self::args::naws::WindowSize;
pub use self::args::tspeed::{TerminalSpeed, TerminalSpeedCommand};
pub use self::args::ttype::TerminalTypeCommand;
pub use self::engine::{Inbound, NegotiationEngine};
pub use self::frame::{TelnetFrame, escape_iac};
pub use self::options::{NegotiationState, TelnetOption};
pub use self::resolver::{
    CLIENT_OPTIONS, ClientResolver, DEL, ETX, NAK, Resolution, Resolver, Role, SERVER_OPTIONS,
    ServerResolver, SessionEffect, wire_terminal_type,
};
pub use self::result::{SubnegotiationErrorKind, TelnetCodecError, TelnetCodecResult};
