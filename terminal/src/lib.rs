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

//! # Teletty Terminal
//!
//! The operating system side of a Telnet session.
//!
//! - [`RawTerminal`] puts the client's controlling terminal into raw mode so every
//!   keystroke can be forwarded byte for byte, and restores it afterwards.
//! - [`PtyHost`] starts the server's login program on a pseudo-terminal.
//!   [`NativePtyHost`] uses the system's pty devices; tests substitute their own.
//! - [`PtyTerminal`] is a server session's terminal: it holds window size and line
//!   speed until the program starts and applies later changes live.
//! - [`set_baud_rate`] applies a negotiated line speed to a terminal descriptor.

#![warn(
    clippy::cargo,
    missing_docs,
    clippy::pedantic,
    future_incompatible,
    rust_2018_idioms
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]

mod pty;
#[cfg(unix)]
mod raw;
mod result;
mod session;
#[cfg(unix)]
mod speed;

pub use self::pty::{
    NativePtyHost, PtyCommand, PtyEndpoint, PtyHost, PtyOutput, PtySession, READ_BUFFER_SIZE,
    SpawnRequest,
};
#[cfg(unix)]
pub use self::raw::{
    DEFAULT_TERMINAL_TYPE, RawTerminal, default_terminal_type, raw_settings, window_size_of,
};
pub use self::result::{TerminalError, TerminalResult};
pub use self::session::PtyTerminal;
#[cfg(unix)]
pub use self::speed::{baud_rate_of, set_baud_rate};
