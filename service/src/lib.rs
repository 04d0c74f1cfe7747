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

//! # Teletty Service
//!
//! Remote login sessions over Telnet. The server side accepts connections and ties
//! each one to a login program on a pseudo terminal. The client side puts the local
//! terminal in raw mode and relays it to a remote host.
//!
//! # Architecture
//!
//! ```text
//! TelnetServer
//!     ↓
//! SessionManager
//!     ↓
//! ServerSession → TelnetConnection + PtyTerminal
//!
//! TelnetClient → ClientSession → TelnetConnection
//! ```
//!
//! Both sides share [`TelnetConnection`], which pairs a split transport with a
//! negotiation engine and answers negotiations in stream order.
//!
//! # Example
//!
//! ```no_run
//! use teletty_service::{ServerConfig, TelnetServer};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig::new("127.0.0.1:2323".parse()?).with_login_program("/bin/login");
//!     let server = TelnetServer::bind(config).await?;
//!     server.start().await?;
//!     tokio::signal::ctrl_c().await?;
//!     server.shutdown().await?;
//!     Ok(())
//! }
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
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

mod client;
mod config;
mod connection;
mod error;
mod local_echo;
mod manager;
mod relay;
mod server;
mod session;
pub mod transport;
mod types;

pub use client::{ClientControl, ClientSession, TelnetClient};
pub use config::{ClientConfig, DEFAULT_PORT, DEFAULT_READ_BUFFER_SIZE, ServerConfig};
pub use connection::TelnetConnection;
pub use error::{Result, SessionError};
pub use local_echo::LocalEcho;
pub use manager::SessionManager;
pub use relay::EchoRelay;
pub use server::TelnetServer;
pub use session::{ControlMessage, ServerSession};
pub use types::{ServerSnapshot, SessionId, SessionInfo};
