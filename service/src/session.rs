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

//! Server session: one client logged into one pty program.
//!
//! ```text
//! socket ──► inbound task ──► NegotiationEngine ──► PtyTerminal ──► program
//!                 │ input written while the client echoes
//!                 ▼
//!             EchoRelay ◄── outbound task ◄── pty output
//!                 │
//! socket ◄────────┘
//! ```
//!
//! Each direction runs as its own task. The first to finish, or a close request from
//! the session manager, decides the session's outcome; teardown then stops the other
//! task, which drops the terminal and kills the program.

use crate::relay::EchoRelay;
use crate::transport::TransportWriter;
use crate::types::SessionId;
use crate::{Result, TelnetConnection};
use bytes::Bytes;
use metrics::counter;
use std::net::SocketAddr;
use teletty_telnetcodec::{SessionEffect, TelnetOption, escape_iac};
use teletty_terminal::{PtyOutput, PtyTerminal, TerminalError};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::select;
use tokio::sync::{mpsc, oneshot};
use tracing::{Instrument, debug, info, instrument, warn};

/// Control messages for a running session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMessage {
    /// Close the session
    Close,
}

/// A server side Telnet session
pub struct ServerSession<R, W> {
    id: SessionId,
    peer_addr: SocketAddr,
    connection: TelnetConnection<R, W>,
    terminal: PtyTerminal,
    default_terminal_type: String,
    control_rx: mpsc::Receiver<ControlMessage>,
}

impl<R, W> ServerSession<R, W>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    /// Create a session and the sender that controls it.
    pub fn new(
        id: SessionId,
        peer_addr: SocketAddr,
        connection: TelnetConnection<R, W>,
        terminal: PtyTerminal,
        default_terminal_type: &str,
    ) -> (Self, mpsc::Sender<ControlMessage>) {
        let (control_tx, control_rx) = mpsc::channel(4);
        let session = Self {
            id,
            peer_addr,
            connection,
            terminal,
            default_terminal_type: default_terminal_type.to_string(),
            control_rx,
        };
        (session, control_tx)
    }

    /// Run the session until the client disconnects, the program exits or a close
    /// is requested.
    #[instrument(name = "session", skip(self), fields(id = %self.id, peer = %self.peer_addr))]
    pub async fn run(self) -> Result<()> {
        let ServerSession {
            mut connection,
            terminal,
            default_terminal_type,
            mut control_rx,
            ..
        } = self;

        connection.request_options().await?;
        let writer = connection.writer();

        let (echo_tx, echo_rx) = mpsc::unbounded_channel();
        let (output_tx, output_rx) = oneshot::channel();
        let (exit_tx, mut exit_rx) = mpsc::channel::<Result<()>>(2);

        let inbound = tokio::spawn({
            let exit_tx = exit_tx.clone();
            let mut inbound = Inbound {
                connection,
                terminal,
                default_terminal_type,
                echo_tx,
                output_tx: Some(output_tx),
            };
            async move {
                let result = inbound.run().await;
                let _ = exit_tx.send(result).await;
            }
            .in_current_span()
        });
        let outbound = tokio::spawn({
            let writer = writer.clone();
            async move {
                let result = relay_output(writer, output_rx, echo_rx).await;
                let _ = exit_tx.send(result).await;
            }
            .in_current_span()
        });

        let result = select! {
            Some(result) = exit_rx.recv() => result,
            Some(message) = control_rx.recv() => {
                debug!(?message, "Close requested");
                Ok(())
            }
            else => Ok(()),
        };

        inbound.abort();
        outbound.abort();
        let _ = inbound.await;
        let _ = outbound.await;
        if let Err(error) = writer.close().await {
            debug!("Socket already closed: {}", error);
        }
        result
    }
}

impl<R, W> std::fmt::Debug for ServerSession<R, W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerSession")
            .field("id", &self.id)
            .field("peer_addr", &self.peer_addr)
            .field("terminal", &self.terminal)
            .finish_non_exhaustive()
    }
}

/// State owned by the inbound direction.
struct Inbound<R, W> {
    connection: TelnetConnection<R, W>,
    terminal: PtyTerminal,
    default_terminal_type: String,
    echo_tx: mpsc::UnboundedSender<Bytes>,
    output_tx: Option<oneshot::Sender<mpsc::UnboundedReceiver<PtyOutput>>>,
}

impl<R, W> Inbound<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    async fn run(&mut self) -> Result<()> {
        while let Some(chunk) = self.connection.read_chunk().await? {
            let inbound = self.connection.handle_chunk(&chunk).await?;
            for effect in inbound.effects {
                self.apply(effect)?;
            }
            if inbound.data.is_empty() {
                continue;
            }
            if !self.terminal.is_open() {
                let default = self.default_terminal_type.clone();
                self.open(&default)?;
            }
            let data = inbound.data.freeze();
            if !self.connection.is_enabled(TelnetOption::Echo) {
                let _ = self.echo_tx.send(data.clone());
            }
            self.terminal.write(data)?;
        }
        info!("Client disconnected");
        Ok(())
    }

    fn apply(&mut self, effect: SessionEffect) -> Result<()> {
        match effect {
            SessionEffect::TerminalType(name) => self.open(&name)?,
            SessionEffect::WindowSize(size) => {
                if let Err(error) = self.terminal.set_size(size) {
                    warn!("Failed to apply window size {}: {}", size, error);
                }
            }
            SessionEffect::TerminalSpeed(speed) => {
                if let Err(error) = self.terminal.set_speed(speed) {
                    warn!("Failed to apply terminal speed {}: {}", speed, error);
                }
            }
        }
        Ok(())
    }

    fn open(&mut self, terminal_type: &str) -> Result<()> {
        match self.terminal.spawn(terminal_type) {
            Ok(output) => {
                if let Some(output_tx) = self.output_tx.take() {
                    let _ = output_tx.send(output);
                }
                Ok(())
            }
            Err(TerminalError::AlreadyOpened) => {
                warn!("Ignoring terminal type {}: pty already opened", terminal_type);
                Ok(())
            }
            Err(error) => Err(error.into()),
        }
    }
}

/// Forward pty output to the client until the program exits.
async fn relay_output<W: AsyncWrite + Unpin>(
    writer: TransportWriter<W>,
    output_rx: oneshot::Receiver<mpsc::UnboundedReceiver<PtyOutput>>,
    mut echo_rx: mpsc::UnboundedReceiver<Bytes>,
) -> Result<()> {
    let Ok(mut output) = output_rx.await else {
        // No program was started; the inbound direction decides the outcome.
        return std::future::pending().await;
    };

    let mut relay = EchoRelay::new();
    while let Some(event) = output.recv().await {
        match event {
            PtyOutput::Data(data) => {
                while let Ok(input) = echo_rx.try_recv() {
                    relay.record(&input);
                }
                let forward = escape_iac(relay.reconcile(&data));
                if !forward.is_empty() {
                    counter!("teletty.bytes.outbound").increment(forward.len() as u64);
                    writer.write_bytes(&forward).await?;
                }
            }
            PtyOutput::Exited => break,
        }
    }
    info!("Login program exited");
    Ok(())
}
